use std::collections::VecDeque;

use crate::shared::Geometry;
use crate::wm::client_flags::{ClientFlags, WmProtocols};
use crate::wm::display::WindowId;
use crate::wm::hints::{RawSizeHints, SizeConstraints};

/// Prior names kept per client, most recent last
pub const NAME_HISTORY_CAP: usize = 5;

/// Stable key of a client record in the registry arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(pub(crate) u64);

/// ICCCM WM_STATE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Withdrawn,
    Normal,
    Iconic,
}

impl ClientState {
    pub fn from_wire(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Withdrawn),
            1 => Some(Self::Normal),
            3 => Some(Self::Iconic),
            _ => None,
        }
    }

    pub fn to_wire(self) -> u32 {
        match self {
            Self::Withdrawn => 0,
            Self::Normal => 1,
            Self::Iconic => 3,
        }
    }
}

/// Border highlight used while a group operation is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Highlight {
    #[default]
    None,
    Group,
    Ungroup,
}

/// Bounded history of the names a window has carried
///
/// Touching a name already in the history moves it to the most-recent
/// slot instead of duplicating it; the oldest entry is evicted once the
/// cap is exceeded.
#[derive(Debug, Clone)]
pub struct NameHistory {
    names: VecDeque<String>,
    cap: usize,
}

impl NameHistory {
    pub fn new(cap: usize) -> Self {
        Self {
            names: VecDeque::with_capacity(cap + 1),
            cap: cap.max(1),
        }
    }

    /// Record `name` as the current name.
    pub fn push(&mut self, name: String) {
        if let Some(pos) = self.names.iter().position(|n| *n == name) {
            if let Some(hit) = self.names.remove(pos) {
                self.names.push_back(hit);
            }
        } else {
            self.names.push_back(name);
        }

        while self.names.len() > self.cap {
            self.names.pop_front();
        }
    }

    /// Most recently touched name, empty if none was ever recorded.
    pub fn current(&self) -> &str {
        self.names.back().map(String::as_str).unwrap_or("")
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// A managed top-level window
#[derive(Debug)]
pub struct Client {
    /// X11 window ID
    pub window: WindowId,

    /// Index of the owning screen
    pub screen: usize,

    pub state: ClientState,

    /// Current geometry, border excluded
    pub geometry: Geometry,

    /// Geometry to return to when a maximize axis is undone
    pub saved_geometry: Geometry,

    pub border_width: i32,

    /// Border width restored after maximize (0 for borderless MOTIF clients)
    pub default_border_width: i32,

    pub flags: ClientFlags,

    /// Is this the process-wide active client?
    pub active: bool,

    pub highlight: Highlight,

    pub protocols: WmProtocols,

    /// Hints as read from WM_NORMAL_HINTS (placement needs the raw flags)
    pub size_hints: RawSizeHints,

    /// Normalized size constraints
    pub constraints: SizeConstraints,

    /// Saved pointer position relative to the window
    pub pointer: Option<(i32, i32)>,

    names: NameHistory,

    /// Group index, looked up in the screen's group list
    pub group: Option<usize>,

    pub app_name: String,
    pub app_class: String,

    pub colormap: u32,
}

impl Client {
    pub fn new(window: WindowId, screen: usize, border_width: i32) -> Self {
        Self {
            window,
            screen,
            state: ClientState::Normal,
            geometry: Geometry::default(),
            saved_geometry: Geometry::default(),
            border_width,
            default_border_width: border_width,
            flags: ClientFlags::empty(),
            active: false,
            highlight: Highlight::None,
            protocols: WmProtocols::empty(),
            size_hints: RawSizeHints::absent(),
            constraints: SizeConstraints::default(),
            pointer: None,
            names: NameHistory::new(NAME_HISTORY_CAP),
            group: None,
            app_name: String::new(),
            app_class: String::new(),
            colormap: 0,
        }
    }

    /// Current display name.
    pub fn name(&self) -> &str {
        self.names.current()
    }

    pub fn names(&self) -> &NameHistory {
        &self.names
    }

    pub fn set_name(&mut self, name: String) {
        self.names.push(name);
    }

    pub fn set_size_hints(&mut self, raw: RawSizeHints) {
        self.constraints = SizeConstraints::normalize(&raw);
        self.size_hints = raw;
    }

    pub fn is_hidden(&self) -> bool {
        self.flags.contains(ClientFlags::HIDDEN)
    }

    /// Whether a window-relative point lies inside the client area.
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.geometry.width && y >= 0 && y < self.geometry.height
    }

    /// Outer right edge, border included.
    pub fn right(&self) -> i32 {
        self.geometry.x + self.geometry.width + 2 * self.border_width
    }

    /// Outer bottom edge, border included.
    pub fn bottom(&self) -> i32 {
        self.geometry.y + self.geometry.height + 2 * self.border_width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_history_moves_hit_to_end() {
        let mut history = NameHistory::new(NAME_HISTORY_CAP);
        history.push("X".into());
        history.push("Y".into());
        history.push("X".into());

        let names: Vec<&str> = history.iter().collect();
        assert_eq!(names, vec!["Y", "X"]);
        assert_eq!(history.current(), "X");
    }

    #[test]
    fn test_name_history_evicts_oldest() {
        let mut history = NameHistory::new(NAME_HISTORY_CAP);
        for i in 0..NAME_HISTORY_CAP + 2 {
            history.push(format!("name{i}"));
        }
        assert_eq!(history.len(), NAME_HISTORY_CAP);
        assert_eq!(history.iter().next(), Some("name2"));
        assert_eq!(history.current(), format!("name{}", NAME_HISTORY_CAP + 1));
    }

    #[test]
    fn test_empty_history_has_empty_name() {
        let client = Client::new(7, 0, 1);
        assert_eq!(client.name(), "");
        assert!(client.names().is_empty());
    }

    #[test]
    fn test_contains_point_bounds() {
        let mut client = Client::new(7, 0, 1);
        client.geometry = Geometry::new(100, 100, 50, 40);
        assert!(client.contains_point(0, 0));
        assert!(client.contains_point(49, 39));
        assert!(!client.contains_point(50, 10));
        assert!(!client.contains_point(-1, 10));
    }

    #[test]
    fn test_wm_state_wire_values() {
        for state in [ClientState::Withdrawn, ClientState::Normal, ClientState::Iconic] {
            assert_eq!(ClientState::from_wire(state.to_wire()), Some(state));
        }
        assert_eq!(ClientState::from_wire(2), None);
    }
}
