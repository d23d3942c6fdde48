//! Screen Module
//!
//! Per-screen state: root window, extent, reserved gaps, the monitor list
//! gathered from RandR at startup, group set and the cycling latch.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::shared::Rect;
use crate::wm::display::WindowId;
use crate::wm::group::GroupSet;

/// Space reserved at the screen edges (panels, docks)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Gap {
    pub top: i32,
    pub bottom: i32,
    pub left: i32,
    pub right: i32,
}

/// Monitor/Output device information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub name: String,
    pub primary: bool,
}

impl Monitor {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    fn contains(&self, x: i32, y: i32) -> bool {
        self.rect().contains(x, y)
    }
}

#[derive(Debug)]
pub struct Screen {
    pub index: usize,
    pub root: WindowId,

    /// Extent of the whole screen (all outputs combined)
    pub width: i32,
    pub height: i32,

    pub gap: Gap,
    pub monitors: Vec<Monitor>,

    /// Set while an interactive cycle is in progress so focus changes don't
    /// reorder the MRU list on every step
    pub alt_persist: bool,

    pub groups: GroupSet,
}

impl Screen {
    pub fn new(index: usize, root: WindowId, width: i32, height: i32) -> Self {
        Self {
            index,
            root,
            width,
            height,
            gap: Gap::default(),
            monitors: Vec::new(),
            alt_persist: false,
            groups: GroupSet::new(),
        }
    }

    pub fn set_monitors(&mut self, monitors: Vec<Monitor>) {
        debug!("Screen {} has {} monitor(s)", self.index, monitors.len());
        self.monitors = monitors;
    }

    /// Monitor containing the point, if any.
    pub fn find_monitor(&self, x: i32, y: i32) -> Option<&Monitor> {
        self.monitors.iter().find(|m| m.contains(x, y))
    }

    /// Bounds of the monitor containing the point, or of the whole screen.
    pub fn bounds_at(&self, x: i32, y: i32) -> Rect {
        self.find_monitor(x, y)
            .map(Monitor::rect)
            .unwrap_or_else(|| self.bounds())
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dual_head() -> Screen {
        let mut screen = Screen::new(0, 1, 3840, 1080);
        screen.set_monitors(vec![
            Monitor {
                x: 0,
                y: 0,
                width: 1920,
                height: 1080,
                name: "DP-1".into(),
                primary: true,
            },
            Monitor {
                x: 1920,
                y: 0,
                width: 1920,
                height: 1080,
                name: "DP-2".into(),
                primary: false,
            },
        ]);
        screen
    }

    #[test]
    fn test_find_monitor() {
        let screen = dual_head();
        assert_eq!(screen.find_monitor(10, 10).map(|m| m.name.as_str()), Some("DP-1"));
        assert_eq!(screen.find_monitor(1920, 10).map(|m| m.name.as_str()), Some("DP-2"));
        assert!(screen.find_monitor(4000, 10).is_none());
    }

    #[test]
    fn test_bounds_fall_back_to_screen() {
        let screen = dual_head();
        assert_eq!(screen.bounds_at(2000, 500), Rect::new(1920, 0, 1920, 1080));
        assert_eq!(screen.bounds_at(-5, 500), Rect::new(0, 0, 3840, 1080));

        let bare = Screen::new(0, 1, 800, 600);
        assert_eq!(bare.bounds_at(10, 10), Rect::new(0, 0, 800, 600));
    }
}
