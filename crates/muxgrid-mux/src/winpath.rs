//! Cross-boundary path translation for the Windows/WSL split filesystem.
//!
//! A pane's working directory may be expressed in the other side's notation
//! (a `\\wsl.localhost\...` UNC path seen from Windows, or a `C:\...` path
//! seen from WSL). Before handing a directory to the multiplexer it has to be
//! translated into the owning side's convention, or the new pane's shell will
//! fail to change into it.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use muxgrid_mux_core::MuxError;
use regex::Regex;

use crate::env::env_string;
use crate::proc;

const WSLPATH_TIMEOUT: Duration = Duration::from_secs(2);

/// Whether this process runs inside a WSL distribution.
pub fn is_wsl() -> bool {
    std::fs::read_to_string("/proc/version")
        .map(|v| v.to_lowercase().contains("microsoft"))
        .unwrap_or(false)
}

fn unc_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?:[/\\]{1,2})(?:wsl\.localhost|wsl\$)[/\\]([^/\\]+)(.*)$")
            .expect("static pattern")
    })
}

/// Convert a UNC-style WSL path into the WSL-internal absolute path.
///
/// Handles the forms seen from Git Bash/MSYS and Windows:
/// `/wsl.localhost/Ubuntu-24.04/home/user/...`,
/// `\\wsl.localhost\Ubuntu-24.04\home\user\...`,
/// `/wsl$/Ubuntu-24.04/home/user/...`, all yielding `/home/user/...`.
/// Returns `None` for anything that does not carry the marker segment, so the
/// translation is idempotent on already-native paths.
pub fn extract_wsl_path(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let caps = unc_pattern().captures(raw)?;
    let remainder = caps.get(2).map(|m| m.as_str()).unwrap_or("").replace('\\', "/");
    if remainder.is_empty() {
        return Some("/".to_string());
    }
    if remainder.starts_with('/') {
        Some(remainder)
    } else {
        Some(format!("/{remainder}"))
    }
}

/// Heuristic for a path expressed in Windows notation: a drive-letter prefix
/// or backslash separators.
pub fn looks_like_windows_path(raw: &str) -> bool {
    if raw.contains('\\') {
        return true;
    }
    let bytes = raw.as_bytes();
    bytes.len() > 2 && bytes[1] == b':' && bytes[0].is_ascii_alphabetic()
}

/// Translate a foreign-looking path through the `wslpath` utility, using its
/// output verbatim. Inside WSL the utility is invoked directly; on native
/// Windows it is reached through `wsl.exe`.
pub fn to_wsl_path(raw: &str) -> Result<String, MuxError> {
    let argv = if is_wsl() {
        proc::argv(["wslpath", "-a", raw])
    } else {
        proc::argv(["wsl.exe", "wslpath", "-a", raw])
    };
    let out = proc::run_checked(&argv, None, WSLPATH_TIMEOUT, None)?;
    Ok(out.stdout_trimmed())
}

/// Safe working directory for invoking a Windows-hosted `wezterm.exe` from
/// inside WSL.
///
/// Launching a Windows binary from a WSL cwd makes Windows see the process
/// cwd as a `\\wsl.localhost\...` UNC path, which confuses WezTerm's WSL
/// relay and produces spurious chdir errors. A Windows-mounted path such as
/// `/mnt/c` avoids that.
pub fn control_cwd() -> Option<PathBuf> {
    let mut candidates: Vec<String> = Vec::new();
    if let Some(override_dir) = env_string("MUXGRID_WEZTERM_CLI_CWD") {
        candidates.push(override_dir);
    }
    candidates.extend(["/mnt/c", "/mnt/d", "/mnt"].iter().map(|s| s.to_string()));

    candidates
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.is_dir())
}

/// Resolve the working directory a pane should start in when launching
/// across the WSL boundary: UNC extraction first, then `wslpath` for paths
/// that still look foreign, otherwise the input unchanged.
pub fn pane_cwd_for_wsl(cwd: &Path) -> String {
    let raw = cwd.to_string_lossy();
    if let Some(native) = extract_wsl_path(&raw) {
        return native;
    }
    if looks_like_windows_path(&raw) {
        if let Ok(translated) = to_wsl_path(&raw) {
            return translated;
        }
    }
    raw.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_wsl_localhost_forward_slashes() {
        assert_eq!(
            extract_wsl_path("/wsl.localhost/Ubuntu-24.04/home/user/project"),
            Some("/home/user/project".to_string())
        );
    }

    #[test]
    fn test_extract_wsl_unc_backslashes() {
        assert_eq!(
            extract_wsl_path(r"\\wsl.localhost\Ubuntu-24.04\home\user\project"),
            Some("/home/user/project".to_string())
        );
    }

    #[test]
    fn test_extract_wsl_dollar_form() {
        assert_eq!(
            extract_wsl_path("/wsl$/Debian/srv/data"),
            Some("/srv/data".to_string())
        );
    }

    #[test]
    fn test_extract_distro_root() {
        assert_eq!(extract_wsl_path("/wsl.localhost/Ubuntu"), Some("/".to_string()));
    }

    #[test]
    fn test_extract_is_none_for_native_paths() {
        assert_eq!(extract_wsl_path("/home/user/project"), None);
        assert_eq!(extract_wsl_path(""), None);
    }

    // Translating an already-native working directory a second time returns
    // the same string.
    #[test]
    fn test_translation_idempotent_on_native_paths() {
        let native = extract_wsl_path("/wsl.localhost/Ubuntu/home/u/repo").unwrap();
        assert_eq!(native, "/home/u/repo");
        assert_eq!(extract_wsl_path(&native), None);
        assert_eq!(pane_cwd_for_wsl(Path::new(&native)), native);
    }

    #[test]
    fn test_marker_round_trip() {
        let input = "/wsl.localhost/distro-name/rest/of/path";
        assert_eq!(extract_wsl_path(input), Some("/rest/of/path".to_string()));
    }

    #[test]
    fn test_windows_path_heuristic() {
        assert!(looks_like_windows_path(r"C:\Users\dev"));
        assert!(looks_like_windows_path(r"relative\mixed/path"));
        assert!(!looks_like_windows_path("/home/user"));
        assert!(!looks_like_windows_path("c"));
    }

    #[test]
    fn test_case_insensitive_marker() {
        assert_eq!(
            extract_wsl_path(r"\\WSL.LOCALHOST\Ubuntu\opt"),
            Some("/opt".to_string())
        );
    }
}
