//! Focus Module
//!
//! Activation of clients, hide/unhide, border colors and the saved pointer
//! position used when cycling between windows.

use anyhow::Result;
use tracing::{debug, trace};

use crate::config::WindowColors;
use crate::wm::WindowManager;
use crate::wm::client::{Client, ClientId, ClientState, Highlight};
use crate::wm::client_flags::ClientFlags;
use crate::wm::display::Display;

/// Border pixel for a client given its activation and highlight.
pub fn border_pixel(client: &Client, colors: &WindowColors) -> u32 {
    if !client.active {
        return colors.inactive;
    }
    match client.highlight {
        Highlight::Group => colors.group,
        Highlight::Ungroup => colors.ungroup,
        Highlight::None => colors.active,
    }
}

impl<D: Display> WindowManager<D> {
    /// Make `id` the foreground client, or push it to the background.
    ///
    /// Foregrounding installs the colormap, moves input focus, arms the
    /// click-to-raise grab and (outside an interactive cycle) moves the
    /// client to the head of its MRU list. A different previously active
    /// client is backgrounded first.
    pub fn set_active(&mut self, id: ClientId, foreground: bool) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let window = client.window;
        let screen = client.screen;

        if foreground {
            self.display.install_colormap(client.colormap)?;
            self.display.set_input_focus(window)?;
            self.display.grab_buttons(window)?;
            if !self.screens.get(screen).is_some_and(|s| s.alt_persist) {
                self.clients.move_to_front(id);
            }
        } else {
            self.display.ungrab_buttons(window)?;
        }

        if foreground && self.active != Some(id) {
            if let Some(previous) = self.active {
                self.set_active(previous, false)?;
            }
            self.active = Some(id);
            self.focused_screen = screen;
            if let Some(root) = self.screens.get(screen).map(|s| s.root) {
                self.display.set_active_window(root, Some(window))?;
            }
            debug!("Active client is now 0x{:x}", window);
        }

        if let Some(client) = self.clients.get_mut(id) {
            client.active = foreground;
        }
        self.draw_border(id)
    }

    /// Forget the active client and tell the world nothing is active.
    pub(crate) fn clear_active(&mut self, screen: usize) -> Result<()> {
        self.active = None;
        if let Some(root) = self.screens.get(screen).map(|s| s.root) {
            self.display.set_active_window(root, None)?;
        }
        Ok(())
    }

    /// Unmap a client and mark it Iconic.
    pub fn hide(&mut self, id: ClientId) -> Result<()> {
        let Some((window, screen)) = self.clients.get(id).map(|c| (c.window, c.screen)) else {
            return Ok(());
        };
        self.display.unmap(window)?;

        if let Some(client) = self.clients.get_mut(id) {
            client.active = false;
            client.flags.insert(ClientFlags::HIDDEN);
            client.state = ClientState::Iconic;
        }
        self.display.set_wm_state(window, ClientState::Iconic)?;
        debug!("Hid window 0x{:x}", window);

        if self.active == Some(id) {
            self.clear_active(screen)?;
        }
        Ok(())
    }

    /// Map and raise a client and mark it Normal.
    pub fn unhide(&mut self, id: ClientId) -> Result<()> {
        let Some(window) = self.clients.get(id).map(|c| c.window) else {
            return Ok(());
        };
        self.display.map_raised(window)?;

        if let Some(client) = self.clients.get_mut(id) {
            client.highlight = Highlight::None;
            client.flags.remove(ClientFlags::HIDDEN);
            client.state = ClientState::Normal;
        }
        self.display.set_wm_state(window, ClientState::Normal)?;
        debug!("Unhid window 0x{:x}", window);
        self.draw_border(id)
    }

    pub fn draw_border(&self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let pixel = border_pixel(client, &self.settings.colors);
        trace!(
            "Border of 0x{:x}: width {} pixel 0x{:06x}",
            client.window, client.border_width, pixel
        );
        self.display
            .set_border(client.window, client.border_width, pixel)
    }

    pub fn raise(&self, id: ClientId) -> Result<()> {
        match self.clients.get(id) {
            Some(client) => self.display.raise(client.window),
            None => Ok(()),
        }
    }

    pub fn lower(&self, id: ClientId) -> Result<()> {
        match self.clients.get(id) {
            Some(client) => self.display.lower(client.window),
            None => Ok(()),
        }
    }

    /// Remember where the pointer sits inside the client, if it does.
    pub fn save_pointer(&mut self, id: ClientId) -> Result<()> {
        let Some(window) = self.clients.get(id).map(|c| c.window) else {
            return Ok(());
        };
        let (x, y) = self.display.pointer_position(window)?;
        if let Some(client) = self.clients.get_mut(id) {
            client.pointer = client.contains_point(x, y).then_some((x, y));
        }
        Ok(())
    }

    /// Bring a client forward and put the pointer on it.
    ///
    /// The pointer lands on the saved position, or the window centre when
    /// none was saved. Iconic clients are unhidden, others raised.
    pub fn warp_pointer_to(&mut self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let (x, y) = client
            .pointer
            .unwrap_or((client.geometry.width / 2, client.geometry.height / 2));
        let window = client.window;

        if client.state == ClientState::Iconic {
            self.unhide(id)?;
        } else {
            self.raise(id)?;
        }
        self.display.warp_pointer(window, x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::{Call, managed_wm};

    #[test]
    fn test_border_pixel_selection() {
        let colors = WindowColors::default();
        let mut client = Client::new(1, 0, 1);
        assert_eq!(border_pixel(&client, &colors), colors.inactive);

        client.active = true;
        assert_eq!(border_pixel(&client, &colors), colors.active);
        client.highlight = Highlight::Group;
        assert_eq!(border_pixel(&client, &colors), colors.group);
        client.highlight = Highlight::Ungroup;
        assert_eq!(border_pixel(&client, &colors), colors.ungroup);

        client.active = false;
        assert_eq!(border_pixel(&client, &colors), colors.inactive);
    }

    #[test]
    fn test_single_active_client() {
        let (mut wm, ids) = managed_wm(&[0x100, 0x200]);

        wm.set_active(ids[0], true).unwrap();
        assert_eq!(wm.active(), Some(ids[0]));

        wm.set_active(ids[1], true).unwrap();
        assert_eq!(wm.active(), Some(ids[1]));
        assert!(!wm.client(ids[0]).unwrap().active);
        assert!(wm.client(ids[1]).unwrap().active);
        assert!(wm.display.called(&Call::ActiveWindow(Some(0x200))));
        assert!(wm.display.called(&Call::UngrabButtons(0x100)));
        assert!(wm.display.called(&Call::InputFocus(0x200)));

        // activation moves to the MRU head
        assert_eq!(wm.clients.mru(0).next(), Some(ids[1]));
    }

    #[test]
    fn test_alt_persist_keeps_mru_order() {
        let (mut wm, ids) = managed_wm(&[0x100, 0x200, 0x300]);
        wm.screens[0].alt_persist = true;

        wm.set_active(ids[2], true).unwrap();
        assert_eq!(wm.clients.mru(0).collect::<Vec<_>>(), ids);
        assert_eq!(wm.active(), Some(ids[2]));
    }

    #[test]
    fn test_hide_clears_active() {
        let (mut wm, ids) = managed_wm(&[0x100]);
        wm.set_active(ids[0], true).unwrap();

        wm.hide(ids[0]).unwrap();
        let client = wm.client(ids[0]).unwrap();
        assert!(client.is_hidden());
        assert_eq!(client.state, ClientState::Iconic);
        assert_eq!(wm.active(), None);
        assert!(wm.display.called(&Call::ActiveWindow(None)));
        assert_eq!(wm.display.wm_state_of(0x100), Some(ClientState::Iconic));

        wm.unhide(ids[0]).unwrap();
        let client = wm.client(ids[0]).unwrap();
        assert!(!client.is_hidden());
        assert_eq!(client.state, ClientState::Normal);
        assert!(wm.display.called(&Call::MapRaised(0x100)));
    }

    #[test]
    fn test_failed_unmap_keeps_client_visible() {
        let (mut wm, ids) = managed_wm(&[0x100]);
        wm.display.fail_when(|call| matches!(call, Call::Unmap(_) | Call::MapRaised(_)));

        assert!(wm.hide(ids[0]).is_err());
        let client = wm.client(ids[0]).unwrap();
        assert!(!client.is_hidden());
        assert_eq!(client.state, ClientState::Normal);
        assert_eq!(wm.display.wm_state_of(0x100), Some(ClientState::Normal));
    }

    #[test]
    fn test_failed_map_keeps_client_hidden() {
        let (mut wm, ids) = managed_wm(&[0x100]);
        wm.hide(ids[0]).unwrap();
        wm.display.fail_when(|call| matches!(call, Call::MapRaised(_)));

        assert!(wm.unhide(ids[0]).is_err());
        let client = wm.client(ids[0]).unwrap();
        assert!(client.is_hidden());
        assert_eq!(client.state, ClientState::Iconic);
    }

    #[test]
    fn test_pointer_save_and_warp() {
        let (mut wm, ids) = managed_wm(&[0x100]);
        // managed windows are 200x100 in the mock

        wm.display.set_pointer(0x100, (20, 30));
        wm.save_pointer(ids[0]).unwrap();
        assert_eq!(wm.client(ids[0]).unwrap().pointer, Some((20, 30)));

        wm.display.set_pointer(0x100, (500, 30));
        wm.save_pointer(ids[0]).unwrap();
        assert_eq!(wm.client(ids[0]).unwrap().pointer, None);

        wm.warp_pointer_to(ids[0]).unwrap();
        assert!(wm.display.called(&Call::Raise(0x100)));
        assert!(wm.display.called(&Call::WarpPointer(0x100, 100, 50)));
    }
}
