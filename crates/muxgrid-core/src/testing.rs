//! Call-recording fake backend for orchestration tests.

use std::cell::RefCell;
use std::path::Path;

use muxgrid_mux_core::{MuxError, Multiplexer, PaneId, PaneOptions, PaneRecord, SplitDirection};

#[derive(Clone, Debug)]
pub enum Call {
    CreatePane {
        parent: Option<String>,
        direction: SplitDirection,
        percent: u8,
    },
    CreateContainer {
        name: String,
    },
    SpawnTab,
    SendText {
        pane: String,
        text: String,
    },
    SetTitle {
        pane: String,
        title: String,
    },
    Kill(String),
    Activate(String),
}

/// In-memory spy: every operation that would reach the multiplexer CLI is
/// recorded instead.
pub struct FakeBackend {
    current: Option<PaneId>,
    supports_container: bool,
    calls: RefCell<Vec<Call>>,
    panes: RefCell<Vec<PaneRecord>>,
    next_id: RefCell<u64>,
}

impl FakeBackend {
    /// Backend that believes it runs inside a multiplexer with `current` as
    /// the current pane.
    pub fn inside(current: &str) -> Self {
        Self {
            current: Some(current.to_string()),
            supports_container: false,
            calls: RefCell::new(Vec::new()),
            panes: RefCell::new(vec![PaneRecord {
                pane_id: current.to_string(),
                ..PaneRecord::default()
            }]),
            next_id: RefCell::new(1),
        }
    }

    /// Backend with no current pane but container-session support.
    pub fn detached() -> Self {
        Self {
            current: None,
            supports_container: true,
            calls: RefCell::new(Vec::new()),
            panes: RefCell::new(Vec::new()),
            next_id: RefCell::new(1),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    fn allocate(&self) -> PaneId {
        let mut next = self.next_id.borrow_mut();
        let id = format!("fake-{}", *next);
        *next += 1;
        self.panes.borrow_mut().push(PaneRecord {
            pane_id: id.clone(),
            ..PaneRecord::default()
        });
        id
    }
}

impl Multiplexer for FakeBackend {
    fn id(&self) -> &'static str {
        "fake"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn create_pane(&self, opts: &PaneOptions) -> Result<PaneId, MuxError> {
        self.calls.borrow_mut().push(Call::CreatePane {
            parent: opts.parent.map(str::to_string),
            direction: opts.direction,
            percent: opts.percent,
        });
        Ok(self.allocate())
    }

    fn spawn_tab(&self, _cwd: &Path) -> Result<PaneId, MuxError> {
        self.calls.borrow_mut().push(Call::SpawnTab);
        Ok(self.allocate())
    }

    fn send_text(&self, pane: &str, text: &str) -> Result<(), MuxError> {
        self.calls.borrow_mut().push(Call::SendText {
            pane: pane.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    fn send_key(&self, _pane: &str, _key: &str) -> bool {
        true
    }

    fn is_alive(&self, pane: &str) -> bool {
        self.panes.borrow().iter().any(|p| p.pane_id == pane)
    }

    fn kill_pane(&self, pane: &str) {
        self.calls.borrow_mut().push(Call::Kill(pane.to_string()));
        self.panes.borrow_mut().retain(|p| p.pane_id != pane);
    }

    fn activate(&self, pane: &str) {
        self.calls.borrow_mut().push(Call::Activate(pane.to_string()));
    }

    fn get_text(&self, _pane: &str) -> Option<String> {
        None
    }

    fn set_title(&self, pane: &str, title: &str) -> Result<(), MuxError> {
        self.calls.borrow_mut().push(Call::SetTitle {
            pane: pane.to_string(),
            title: title.to_string(),
        });
        if let Some(record) = self
            .panes
            .borrow_mut()
            .iter_mut()
            .find(|p| p.pane_id == pane)
        {
            record.title = title.to_string();
        }
        Ok(())
    }

    fn list_panes(&self) -> Result<Vec<PaneRecord>, MuxError> {
        Ok(self.panes.borrow().clone())
    }

    fn current_pane(&self) -> Option<PaneId> {
        self.current.clone()
    }

    fn create_container(&self, name: &str, _cwd: &Path) -> Result<PaneId, MuxError> {
        if !self.supports_container {
            return Err(MuxError::Other(
                "fake cannot create a detached container session".to_string(),
            ));
        }
        self.calls
            .borrow_mut()
            .push(Call::CreateContainer { name: name.to_string() });
        let id = "fake-root".to_string();
        self.panes.borrow_mut().push(PaneRecord {
            pane_id: id.clone(),
            ..PaneRecord::default()
        });
        Ok(id)
    }
}
