//! Events Module
//!
//! Window-system events, already decoded by the X11 layer, and their
//! dispatch into the [`WindowManager`]. Key presses are resolved to
//! [`KeyboardAction`]s through the [`KeyboardManager`].

use anyhow::Result;
use tracing::{debug, trace, warn};

use crate::wm::WindowManager;
use crate::wm::client::{ClientId, ClientState};
use crate::wm::client_flags::ClientFlags;
use crate::wm::display::{Display, WindowId};
use crate::wm::keyboard::{KeyModifiers, KeyboardAction, KeyboardManager, Keysym, is_cycle_modifier};
use crate::wm::menu::{MenuOptions, MenuResult, MenuSurface, menu_filter};
use crate::wm::registry::CycleDirection;
use crate::wm::search::ClientMatcher;

/// Client properties whose change the manager tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Name,
    NormalHints,
    TransientFor,
    Protocols,
}

/// Requested geometry fields of a ConfigureRequest; `None` means unchanged
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigureChanges {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub border_width: Option<i32>,
}

/// Events the manager reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WmEvent {
    MapRequest { window: WindowId, parent: WindowId },
    /// `synthetic` is set for the ICCCM withdraw request sent by clients
    UnmapNotify { window: WindowId, synthetic: bool },
    DestroyNotify { window: WindowId },
    PropertyNotify { window: WindowId, property: PropertyKind },
    EnterNotify { window: WindowId },
    ButtonPress { window: WindowId },
    ConfigureRequest { window: WindowId, changes: ConfigureChanges },
    KeyPress { root: WindowId, keysym: Keysym, modifiers: KeyModifiers },
    KeyRelease { root: WindowId, keysym: Keysym },
}

/// Result of event handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Handled,
    /// Not about anything we manage
    Ignore,
}

impl<D: Display> WindowManager<D> {
    /// Dispatch one event.
    pub fn handle_event<S: MenuSurface>(
        &mut self,
        event: WmEvent,
        keys: &KeyboardManager,
        menu: &mut S,
    ) -> Result<EventResult> {
        trace!("Event {:?}", event);
        match event {
            WmEvent::MapRequest { window, parent } => self.handle_map_request(window, parent),
            WmEvent::UnmapNotify { window, synthetic } => {
                let Some(id) = self.find_client(window) else {
                    return Ok(EventResult::Ignore);
                };
                if synthetic {
                    self.display.set_wm_state(window, ClientState::Withdrawn)?;
                } else if !self.client(id).is_some_and(|c| c.is_hidden()) {
                    self.unmanage(id)?;
                }
                Ok(EventResult::Handled)
            }
            WmEvent::DestroyNotify { window } => {
                let Some(id) = self.find_client(window) else {
                    return Ok(EventResult::Ignore);
                };
                self.unmanage(id)?;
                Ok(EventResult::Handled)
            }
            WmEvent::PropertyNotify { window, property } => {
                let Some(id) = self.find_client(window) else {
                    return Ok(EventResult::Ignore);
                };
                match property {
                    PropertyKind::Name => self.update_name(id),
                    PropertyKind::NormalHints => self.update_size_hints(id),
                    PropertyKind::TransientFor => self.update_transient(id)?,
                    PropertyKind::Protocols => self.update_protocols(id)?,
                }
                Ok(EventResult::Handled)
            }
            WmEvent::EnterNotify { window } => {
                let Some(id) = self.find_client(window) else {
                    return Ok(EventResult::Ignore);
                };
                self.set_active(id, true)?;
                Ok(EventResult::Handled)
            }
            WmEvent::ButtonPress { window } => {
                let Some(id) = self.find_client(window) else {
                    return Ok(EventResult::Ignore);
                };
                self.set_active(id, true)?;
                self.raise(id)?;
                Ok(EventResult::Handled)
            }
            WmEvent::ConfigureRequest { window, changes } => {
                self.handle_configure_request(window, changes)
            }
            WmEvent::KeyPress {
                root,
                keysym,
                modifiers,
            } => {
                let Some(action) = keys.lookup(modifiers, keysym) else {
                    return Ok(EventResult::Ignore);
                };
                if let Some(screen) = self.screen_for_root(root) {
                    self.set_focused_screen(screen);
                }
                self.run_action(action, menu)?;
                Ok(EventResult::Handled)
            }
            WmEvent::KeyRelease { root, keysym } => {
                if !is_cycle_modifier(keysym) {
                    return Ok(EventResult::Ignore);
                }
                let screen = self.screen_for_root(root).unwrap_or(self.focused_screen());
                self.cycle_finish(screen);
                Ok(EventResult::Handled)
            }
        }
    }

    fn handle_map_request(&mut self, window: WindowId, parent: WindowId) -> Result<EventResult> {
        if let Some(previous) = self.active() {
            self.save_pointer(previous)?;
        }

        let id = match self.find_client(window) {
            Some(id) => id,
            None => {
                let screen = self.screen_for_root(parent).unwrap_or(self.focused_screen());
                match self.manage_window(window, screen, true)? {
                    Some(id) => id,
                    None => return Ok(EventResult::Ignore),
                }
            }
        };

        let ignored = self
            .client(id)
            .is_some_and(|c| c.flags.contains(ClientFlags::IGNORE));
        if !ignored {
            self.warp_pointer_to(id)?;
        }
        Ok(EventResult::Handled)
    }

    fn handle_configure_request(
        &mut self,
        window: WindowId,
        changes: ConfigureChanges,
    ) -> Result<EventResult> {
        let Some(id) = self.find_client(window) else {
            // not ours: grant the request as asked
            let mut geometry = self.display.window_attributes(window)?.geometry;
            geometry.x = changes.x.unwrap_or(geometry.x);
            geometry.y = changes.y.unwrap_or(geometry.y);
            geometry.width = changes.width.unwrap_or(geometry.width);
            geometry.height = changes.height.unwrap_or(geometry.height);
            self.display.move_resize_window(window, &geometry)?;
            return Ok(EventResult::Ignore);
        };

        if let Some(client) = self.clients.get_mut(id) {
            let g = &mut client.geometry;
            g.x = changes.x.unwrap_or(g.x);
            g.y = changes.y.unwrap_or(g.y);
            g.width = changes.width.unwrap_or(g.width);
            g.height = changes.height.unwrap_or(g.height);
            let applied = client.constraints.apply(&client.geometry);
            client.geometry.width = applied.width.max(1);
            client.geometry.height = applied.height.max(1);
            if let Some(bw) = changes.border_width {
                client.border_width = bw.max(0);
            }
            debug!("Configured 0x{:x} to {:?}", window, client.geometry);
        }
        self.resize(id)?;
        Ok(EventResult::Handled)
    }

    /// Run a bound action against the active client or the focused screen.
    pub fn run_action<S: MenuSurface>(&mut self, action: KeyboardAction, menu: &mut S) -> Result<()> {
        let screen = self.focused_screen();
        let cycling = match action {
            KeyboardAction::Cycle => Some((CycleDirection::Forward, false)),
            KeyboardAction::ReverseCycle => Some((CycleDirection::Reverse, false)),
            KeyboardAction::CycleInGroup => Some((CycleDirection::Forward, true)),
            KeyboardAction::ReverseCycleInGroup => Some((CycleDirection::Reverse, true)),
            _ => None,
        };
        if let Some((direction, in_group)) = cycling {
            return self.cycle(screen, direction, in_group);
        }

        if action == KeyboardAction::SearchWindows {
            return self.search_windows(screen, menu);
        }

        let Some(id) = self.active() else {
            debug!("No active client for {:?}", action);
            return Ok(());
        };
        match action {
            KeyboardAction::Maximize => self.maximize(id),
            KeyboardAction::VertMaximize => self.vert_maximize(id),
            KeyboardAction::HorizMaximize => self.horiz_maximize(id),
            KeyboardAction::Hide => self.hide(id),
            KeyboardAction::Close => self.close(id),
            KeyboardAction::Raise => self.raise(id),
            KeyboardAction::Lower => self.lower(id),
            KeyboardAction::ToggleFreeze => {
                self.toggle_freeze(id);
                Ok(())
            }
            KeyboardAction::Move(direction, amount) => self.move_by(id, direction, amount),
            KeyboardAction::Resize(direction, amount) => self.resize_by(id, direction, amount),
            KeyboardAction::Cycle
            | KeyboardAction::ReverseCycle
            | KeyboardAction::CycleInGroup
            | KeyboardAction::ReverseCycleInGroup
            | KeyboardAction::SearchWindows => Ok(()),
        }
    }

    /// Let the user pick a window by name and bring it forward.
    pub fn search_windows<S: MenuSurface>(&mut self, screen: usize, menu: &mut S) -> Result<()> {
        let matcher = ClientMatcher::new(self, screen);
        if matcher.is_empty() {
            return Ok(());
        }
        let entries = matcher.entries();
        let Some(sc) = self.screens.get(screen) else {
            warn!("No screen {} to search on", screen);
            return Ok(());
        };

        let options = MenuOptions {
            prompt: Some("window"),
            ..MenuOptions::default()
        };
        let picked: Option<ClientId> = match menu_filter(menu, sc, &entries, &matcher, options)? {
            Some(MenuResult::Selected { index, .. }) => matcher.client(index),
            _ => None,
        };
        let Some(id) = picked else {
            return Ok(());
        };

        if let Some(previous) = self.active() {
            self.save_pointer(previous)?;
        }
        if self.client(id).is_some_and(|c| c.is_hidden()) {
            self.unhide(id)?;
        }
        self.warp_pointer_to(id)
    }
}
