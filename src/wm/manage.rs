//! Client lifecycle
//!
//! Taking a raw top-level window under management, reading the properties
//! the manager cares about, and letting go of it again.

use anyhow::Result;
use tracing::{debug, info, warn};

use crate::shared::Geometry;
use crate::wm::WindowManager;
use crate::wm::client::{Client, ClientId, ClientState};
use crate::wm::client_flags::{ClientFlags, WmProtocols};
use crate::wm::display::{Display, TextProperty, WindowId};
use crate::wm::hints::RawSizeHints;
use crate::wm::placement::place_client;

impl<D: Display> WindowManager<D> {
    /// Start managing `window` on `screen`.
    ///
    /// `mapped` is true for a window asking to be mapped now and false for
    /// one found at startup that should keep whatever state it had.
    pub fn manage_window(
        &mut self,
        window: WindowId,
        screen: usize,
        mapped: bool,
    ) -> Result<Option<ClientId>> {
        if window == 0 || screen >= self.screens.len() {
            return Ok(None);
        }
        if let Some(existing) = self.clients.find(window) {
            return Ok(Some(existing));
        }

        self.display.grab_server()?;
        let managed = self.manage_grabbed(window, screen, mapped);
        self.display.ungrab_server()?;
        let id = managed?;

        if let Err(e) = self.publish_managed(id, window, screen) {
            self.abandon(id);
            return Err(e);
        }

        if mapped {
            self.autogroup(id);
        }

        info!("Managing window 0x{:x} on screen {}", window, screen);
        Ok(Some(id))
    }

    fn publish_managed(&mut self, id: ClientId, window: WindowId, screen: usize) -> Result<()> {
        let root = self.screens[screen].root;
        self.display.append_client_list(root, window)?;
        self.update_class_and_motif(id)?;
        self.update_protocols(id)
    }

    /// Drop a client whose setup failed half way, leaving no trace of it.
    fn abandon(&mut self, id: ClientId) {
        let Some(client) = self.clients.remove(id) else {
            return;
        };
        warn!("Giving up on window 0x{:x}", client.window);
        if let Some(sc) = self.screens.get_mut(client.screen) {
            sc.groups.remove(id);
        }
        if let Err(e) = self.display.set_save_set(client.window, false) {
            debug!("Failed to drop 0x{:x} from the save-set: {:#}", client.window, e);
        }
        if let Some(root) = self.screens.get(client.screen).map(|s| s.root) {
            if let Err(e) = self.display.set_client_list(root, &self.clients.windows()) {
                debug!("Failed to republish the client list: {:#}", e);
            }
        }
    }

    fn manage_grabbed(&mut self, window: WindowId, screen: usize, mapped: bool) -> Result<ClientId> {
        let mut client = Client::new(window, screen, self.settings.border_width);
        client.state = if mapped {
            ClientState::Normal
        } else {
            ClientState::Iconic
        };
        client.set_size_hints(self.fetch_size_hints(window));
        client.set_name(self.fetch_name(window));

        if self.settings.ignore.iter().any(|n| n == client.name()) {
            debug!("Ignoring window 0x{:x} ({})", window, client.name());
            client.flags.insert(ClientFlags::IGNORE);
        }

        let attributes = self.display.window_attributes(window)?;
        client.geometry = attributes.geometry;
        client.colormap = attributes.colormap;

        if !attributes.viewable {
            let root = self.screens[screen].root;
            let pointer = self.display.pointer_position(root).unwrap_or_else(|e| {
                debug!("No pointer position for placement: {:#}", e);
                (0, 0)
            });
            client.geometry = place_client(
                client.geometry,
                client.border_width,
                &client.size_hints,
                &self.screens[screen],
                pointer,
            );

            let initial = match self.display.wm_hints(window) {
                Ok(hints) => hints.and_then(|h| h.initial_state()),
                Err(e) => {
                    debug!("Failed to read WM_HINTS of 0x{:x}: {:#}", window, e);
                    None
                }
            };
            if let Some(state) = initial {
                client.state = state;
                self.display.set_wm_state(window, state)?;
            }
            self.display
                .move_window(window, client.geometry.x, client.geometry.y)?;
            self.display
                .send_configure_notify(window, &client.geometry, client.border_width)?;
        }

        let state = match self.display.wm_state(window) {
            Ok(Some(state)) => state,
            Ok(None) => ClientState::Normal,
            Err(e) => {
                debug!("Failed to read WM_STATE of 0x{:x}: {:#}", window, e);
                ClientState::Normal
            }
        };

        self.display.select_client_input(window)?;
        self.display.set_save_set(window, true)?;

        let geometry = client.geometry;
        let border_width = client.border_width;
        let id = self.clients.insert(client);
        if let Err(e) = self.settle_new_client(id, window, &geometry, border_width, state) {
            self.abandon(id);
            return Err(e);
        }
        Ok(id)
    }

    fn settle_new_client(
        &mut self,
        id: ClientId,
        window: WindowId,
        geometry: &Geometry,
        border_width: i32,
        state: ClientState,
    ) -> Result<()> {
        self.draw_border(id)?;
        self.update_transient(id)?;
        self.display
            .send_configure_notify(window, geometry, border_width)?;
        if state == ClientState::Iconic {
            self.hide(id)
        } else {
            self.unhide(id)
        }
    }

    /// Stop managing a client and drop its record.
    pub fn unmanage(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let (window, screen) = (client.window, client.screen);

        if let Some(group) = client.group {
            debug!("Removing 0x{:x} from group {}", window, group);
        }
        if let Some(sc) = self.screens.get_mut(screen) {
            sc.groups.remove(id);
        }

        self.display.grab_server()?;
        let withdrawn = self
            .display
            .set_wm_state(window, ClientState::Withdrawn)
            .and_then(|_| self.display.set_save_set(window, false));
        self.display.ungrab_server()?;
        if let Err(e) = withdrawn {
            // the window is usually gone already
            debug!("Failed to withdraw 0x{:x}: {:#}", window, e);
        }

        self.clients.remove(id);

        if let Some(root) = self.screens.get(screen).map(|s| s.root) {
            self.display.set_client_list(root, &self.clients.windows())?;
        }

        if self.active == Some(id) {
            self.clear_active(screen)?;
        }

        info!("Unmanaged window 0x{:x}", window);
        Ok(())
    }

    /// Politely ask a client to close, or kill it if it can't be asked.
    pub fn close(&self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        if client.protocols.contains(WmProtocols::DELETE) {
            debug!("Sending WM_DELETE_WINDOW to 0x{:x}", client.window);
            self.display.send_delete(client.window)
        } else {
            debug!("Killing client 0x{:x}", client.window);
            self.display.kill_client(client.window)
        }
    }

    /// Re-read the window name into the name history.
    pub fn update_name(&mut self, id: ClientId) {
        let Some(window) = self.clients.get(id).map(|c| c.window) else {
            return;
        };
        let name = self.fetch_name(window);
        if let Some(client) = self.clients.get_mut(id) {
            client.set_name(name);
        }
    }

    pub fn update_size_hints(&mut self, id: ClientId) {
        let Some(window) = self.clients.get(id).map(|c| c.window) else {
            return;
        };
        let hints = self.fetch_size_hints(window);
        if let Some(client) = self.clients.get_mut(id) {
            client.set_size_hints(hints);
        }
    }

    pub fn update_protocols(&mut self, id: ClientId) -> Result<()> {
        let Some(window) = self.clients.get(id).map(|c| c.window) else {
            return Ok(());
        };
        let protocols = self.display.protocols(window).unwrap_or_else(|e| {
            debug!("Failed to read WM_PROTOCOLS of 0x{:x}: {:#}", window, e);
            WmProtocols::empty()
        });
        if let Some(client) = self.clients.get_mut(id) {
            client.protocols = protocols;
        }
        Ok(())
    }

    /// A window transient for a grouped client joins that group and
    /// inherits its Ignore flag.
    pub fn update_transient(&mut self, id: ClientId) -> Result<()> {
        let Some(window) = self.clients.get(id).map(|c| c.window) else {
            return Ok(());
        };
        let parent = match self.display.transient_for(window) {
            Ok(Some(parent)) => parent,
            Ok(None) => return Ok(()),
            Err(e) => {
                debug!("Failed to read WM_TRANSIENT_FOR of 0x{:x}: {:#}", window, e);
                return Ok(());
            }
        };

        let Some(parent) = self.clients.find(parent).and_then(|p| self.clients.get(p)) else {
            return Ok(());
        };
        let Some(group) = parent.group else {
            return Ok(());
        };
        let ignored = parent.flags.contains(ClientFlags::IGNORE);

        self.move_to_group(id, group);
        if ignored {
            if let Some(client) = self.clients.get_mut(id) {
                client.flags.insert(ClientFlags::IGNORE);
            }
        }
        Ok(())
    }

    /// Put a client into group `index` on its screen.
    pub fn move_to_group(&mut self, id: ClientId, index: usize) {
        let Some(client) = self.clients.get_mut(id) else {
            return;
        };
        let Some(screen) = self.screens.get_mut(client.screen) else {
            return;
        };
        if screen.groups.add(index, id) {
            client.group = Some(index);
        } else {
            warn!("No group {} for window 0x{:x}", index, client.window);
        }
    }

    /// Place a freshly mapped client into its configured group.
    pub fn autogroup(&mut self, id: ClientId) {
        let Some(client) = self.clients.get(id) else {
            return;
        };

        let rule = self.settings.autogroup.iter().find(|rule| {
            rule.class == client.app_class
                && rule.name.as_ref().is_none_or(|name| *name == client.app_name)
        });

        let target = match rule {
            Some(rule) => Some(rule.group),
            None if self.settings.sticky_groups => {
                self.screens.get(client.screen).map(|s| s.groups.active)
            }
            None => None,
        };

        if let Some(group) = target {
            debug!("Autogrouping 0x{:x} into group {}", client.window, group);
            self.move_to_group(id, group);
        }
    }

    fn update_class_and_motif(&mut self, id: ClientId) -> Result<()> {
        let Some(window) = self.clients.get(id).map(|c| c.window) else {
            return Ok(());
        };

        let class = self.display.class_hint(window).unwrap_or_else(|e| {
            debug!("Failed to read WM_CLASS of 0x{:x}: {:#}", window, e);
            None
        });
        let borderless = match self.display.motif_hints(window) {
            Ok(hints) => hints.is_some_and(|h| h.wants_no_border()),
            Err(e) => {
                debug!("Failed to read _MOTIF_WM_HINTS of 0x{:x}: {:#}", window, e);
                false
            }
        };

        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        if let Some((name, class)) = class {
            client.app_name = name;
            client.app_class = class;
        }
        if borderless {
            debug!("Window 0x{:x} asked for no border", window);
            client.border_width = 0;
            client.default_border_width = 0;
            return self.draw_border(id);
        }
        Ok(())
    }

    fn fetch_name(&self, window: WindowId) -> String {
        for property in [TextProperty::NetWmName, TextProperty::WmName] {
            match self.display.text_property(window, property) {
                Ok(Some(name)) => return name,
                Ok(None) => {}
                Err(e) => debug!("Failed to read {:?} of 0x{:x}: {:#}", property, window, e),
            }
        }
        String::new()
    }

    fn fetch_size_hints(&self, window: WindowId) -> RawSizeHints {
        match self.display.size_hints(window) {
            Ok(Some(hints)) => hints,
            Ok(None) => RawSizeHints::absent(),
            Err(e) => {
                debug!("Failed to read WM_NORMAL_HINTS of 0x{:x}: {:#}", window, e);
                RawSizeHints::absent()
            }
        }
    }
}
