//! Window Manager Module
//!
//! The [`WindowManager`] context owns the screens, the client registry and
//! the process-wide active client. Its operations are spread across the
//! submodules: `manage` (client lifecycle), `focus` (activation and
//! visibility), `maximize` (geometry commands) and `cycle`.

pub mod client;
pub mod client_flags;
pub mod cycle;
pub mod display;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod group;
pub mod hints;
pub mod keyboard;
pub mod manage;
pub mod maximize;
pub mod menu;
pub mod placement;
pub mod registry;
pub mod screen;
pub mod search;
pub mod x11;

#[cfg(test)]
pub(crate) mod testing;

use tracing::debug;

use crate::config::{AutogroupRule, Config, WindowColors};
use crate::wm::client::{Client, ClientId};
use crate::wm::display::{Display, WindowId};
use crate::wm::registry::ClientRegistry;
use crate::wm::screen::Screen;

/// The part of [`Config`] the client machinery consumes at runtime
#[derive(Debug, Clone)]
pub struct WmSettings {
    pub border_width: i32,
    pub snap_distance: i32,
    pub sticky_groups: bool,
    pub ignore: Vec<String>,
    pub autogroup: Vec<AutogroupRule>,
    pub colors: WindowColors,
}

impl Default for WmSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for WmSettings {
    fn from(config: &Config) -> Self {
        let wm = &config.window_manager;
        Self {
            border_width: wm.border_width.max(0),
            snap_distance: wm.snap_distance.max(0),
            sticky_groups: wm.sticky_groups,
            ignore: wm.ignore.clone(),
            autogroup: wm.autogroup.clone(),
            colors: config.colors,
        }
    }
}

/// Application context for the client machinery
pub struct WindowManager<D: Display> {
    pub display: D,
    pub settings: WmSettings,
    pub screens: Vec<Screen>,
    pub clients: ClientRegistry,
    active: Option<ClientId>,
    focused_screen: usize,
}

impl<D: Display> WindowManager<D> {
    pub fn new(display: D, settings: WmSettings, screens: Vec<Screen>) -> Self {
        debug!("Window manager context with {} screen(s)", screens.len());
        Self {
            display,
            settings,
            screens,
            clients: ClientRegistry::new(),
            active: None,
            focused_screen: 0,
        }
    }

    /// The process-wide active client.
    pub fn active(&self) -> Option<ClientId> {
        self.active
    }

    pub fn active_client(&self) -> Option<&Client> {
        self.active.and_then(|id| self.clients.get(id))
    }

    pub fn focused_screen(&self) -> usize {
        self.focused_screen
    }

    pub fn set_focused_screen(&mut self, index: usize) {
        if index < self.screens.len() {
            self.focused_screen = index;
        }
    }

    pub fn client(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn find_client(&self, window: WindowId) -> Option<ClientId> {
        self.clients.find(window)
    }

    /// Screen index whose root window is `root`.
    pub fn screen_for_root(&self, root: WindowId) -> Option<usize> {
        self.screens.iter().position(|s| s.root == root)
    }
}
