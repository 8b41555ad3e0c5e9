//! Launch specifications for the hosted instances.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Env var each pane receives so the hosted process knows which instance
/// slot it occupies.
pub const INSTANCE_ENV: &str = "MUXGRID_INSTANCE";

/// Immutable description of one instance to launch: consumed once by pane
/// creation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstanceLaunchSpec {
    pub instance_id: String,
    /// Free text shown next to the instance in titles and status output.
    pub role: String,
    pub title: String,
    pub env_overrides: BTreeMap<String, String>,
}

impl InstanceLaunchSpec {
    pub fn new(instance_id: &str, role: &str) -> Self {
        let title = if instance_id == "default" {
            "MUXGRID".to_string()
        } else {
            format!("MUXGRID-{}", capitalize(instance_id))
        };
        let mut env_overrides = BTreeMap::new();
        env_overrides.insert(INSTANCE_ENV.to_string(), instance_id.to_string());
        Self {
            instance_id: instance_id.to_string(),
            role: role.to_string(),
            title,
            env_overrides,
        }
    }

    /// Spec with an explicit role-as-title form, used by tab mode where the
    /// tab bar has room for both.
    pub fn tab_title(&self) -> String {
        if self.role.is_empty() {
            self.instance_id.clone()
        } else {
            format!("{} - {}", self.instance_id, self.role)
        }
    }

    /// Shell command line for this instance: the env overrides as leading
    /// assignments, then `base`. Empty when there is nothing to launch.
    pub fn command_line(&self, base: &str) -> String {
        if base.is_empty() {
            return String::new();
        }
        let mut line = String::new();
        for (key, value) in &self.env_overrides {
            line.push_str(key);
            line.push('=');
            line.push_str(value);
            line.push(' ');
        }
        line.push_str(base);
        line
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Split a comma-separated instance list, trimming entries and dropping
/// duplicates while preserving first-seen order.
pub fn parse_instance_list(raw: &str) -> Vec<String> {
    let mut seen = std::collections::BTreeSet::new();
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter(|s| seen.insert(s.to_string()))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_derivation() {
        let spec = InstanceLaunchSpec::new("ui", "frontend");
        assert_eq!(spec.title, "MUXGRID-Ui");
        assert_eq!(spec.tab_title(), "ui - frontend");
        assert_eq!(spec.env_overrides.get(INSTANCE_ENV).unwrap(), "ui");

        let default = InstanceLaunchSpec::new("default", "");
        assert_eq!(default.title, "MUXGRID");
        assert_eq!(default.tab_title(), "default");
    }

    #[test]
    fn test_command_line_env_prefix() {
        let spec = InstanceLaunchSpec::new("ui", "frontend");
        assert_eq!(spec.command_line("claude"), format!("{INSTANCE_ENV}=ui claude"));
        assert_eq!(spec.command_line(""), "");
    }

    #[test]
    fn test_parse_instance_list() {
        assert_eq!(
            parse_instance_list("ui, coder ,test"),
            vec!["ui", "coder", "test"]
        );
        assert_eq!(parse_instance_list("a,,a, b,a"), vec!["a", "b"]);
        assert!(parse_instance_list(" , ").is_empty());
    }
}
