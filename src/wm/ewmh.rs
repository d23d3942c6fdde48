//! EWMH and ICCCM atoms
//!
//! Interned once at startup and shared by the X11 display layer.

use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ClientMessageEvent, ConnectionExt as _, EventMask, PropMode, Window,
};
use x11rb::wrapper::ConnectionExt as _;

/// Holds all interned atoms
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub net_supported: Atom,
    pub net_supporting_wm_check: Atom,
    pub net_client_list: Atom,
    pub net_active_window: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub wm_protocols: Atom,
    pub wm_delete_window: Atom,
    pub wm_take_focus: Atom,
    pub wm_state: Atom,
    pub motif_wm_hints: Atom,
}

impl Atoms {
    /// Intern all required atoms
    pub fn new<C: Connection>(conn: &C) -> Result<Self> {
        let intern = |name: &str| -> Result<Atom> {
            Ok(conn
                .intern_atom(false, name.as_bytes())?
                .reply()
                .with_context(|| format!("Failed to intern {name}"))?
                .atom)
        };

        Ok(Self {
            net_supported: intern("_NET_SUPPORTED")?,
            net_supporting_wm_check: intern("_NET_SUPPORTING_WM_CHECK")?,
            net_client_list: intern("_NET_CLIENT_LIST")?,
            net_active_window: intern("_NET_ACTIVE_WINDOW")?,
            net_wm_name: intern("_NET_WM_NAME")?,
            utf8_string: intern("UTF8_STRING")?,
            wm_protocols: intern("WM_PROTOCOLS")?,
            wm_delete_window: intern("WM_DELETE_WINDOW")?,
            wm_take_focus: intern("WM_TAKE_FOCUS")?,
            wm_state: intern("WM_STATE")?,
            motif_wm_hints: intern("_MOTIF_WM_HINTS")?,
        })
    }

    /// Advertise what we support and point _NET_SUPPORTING_WM_CHECK at
    /// `check`, which carries our name.
    pub fn setup_supported<C: Connection>(&self, conn: &C, root: Window, check: Window) -> Result<()> {
        let supported = [
            self.net_supported,
            self.net_supporting_wm_check,
            self.net_client_list,
            self.net_active_window,
            self.net_wm_name,
        ];
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_supported,
            AtomEnum::ATOM,
            &supported,
        )?;

        for window in [root, check] {
            conn.change_property32(
                PropMode::REPLACE,
                window,
                self.net_supporting_wm_check,
                AtomEnum::WINDOW,
                &[check],
            )?;
        }
        conn.change_property8(
            PropMode::REPLACE,
            check,
            self.net_wm_name,
            self.utf8_string,
            env!("CARGO_PKG_NAME").as_bytes(),
        )?;
        Ok(())
    }

    /// Update _NET_ACTIVE_WINDOW
    pub fn update_active_window<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        window: Option<Window>,
    ) -> Result<()> {
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_active_window,
            AtomEnum::WINDOW,
            &[window.unwrap_or(0)],
        )?;
        Ok(())
    }

    /// Replace _NET_CLIENT_LIST with `windows`
    pub fn update_client_list<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        windows: &[Window],
    ) -> Result<()> {
        conn.change_property32(
            PropMode::REPLACE,
            root,
            self.net_client_list,
            AtomEnum::WINDOW,
            windows,
        )?;
        Ok(())
    }

    /// Append one window to _NET_CLIENT_LIST
    pub fn append_client_list<C: Connection>(
        &self,
        conn: &C,
        root: Window,
        window: Window,
    ) -> Result<()> {
        conn.change_property32(
            PropMode::APPEND,
            root,
            self.net_client_list,
            AtomEnum::WINDOW,
            &[window],
        )?;
        Ok(())
    }

    /// Send WM_DELETE_WINDOW to close a window gracefully
    pub fn send_delete_window<C: Connection>(&self, conn: &C, window: Window) -> Result<()> {
        let event = ClientMessageEvent::new(
            32,
            window,
            self.wm_protocols,
            [self.wm_delete_window, x11rb::CURRENT_TIME, 0, 0, 0],
        );
        if let Err(e) = conn.send_event(false, window, EventMask::NO_EVENT, event) {
            // the window may already be gone
            debug!("Failed to send WM_DELETE_WINDOW to 0x{:x}: {}", window, e);
        }
        Ok(())
    }
}
