//! Display Module
//!
//! The window-system contract the client machinery is written against.
//! The X11 implementation lives in [`crate::wm::x11`]; tests use a recording
//! in-memory implementation.

use anyhow::Result;

use crate::shared::Geometry;
use crate::wm::client::ClientState;
use crate::wm::client_flags::WmProtocols;
use crate::wm::hints::{MotifWmHints, RawSizeHints, WmHints};

/// X11 window ID
pub type WindowId = u32;

/// Attributes read once when a window is first managed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    pub geometry: Geometry,
    pub colormap: u32,
    /// Already mapped and viewable (pre-existing windows at startup)
    pub viewable: bool,
    pub override_redirect: bool,
}

/// Text properties a window name can come from, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextProperty {
    NetWmName,
    WmName,
}

/// Window-system operations consumed by the window manager
///
/// Property getters return `Ok(None)` when the property is absent; callers
/// treat both absence and errors as "feature not present".
pub trait Display {
    fn window_attributes(&self, window: WindowId) -> Result<WindowAttributes>;

    fn move_window(&self, window: WindowId, x: i32, y: i32) -> Result<()>;
    fn move_resize_window(&self, window: WindowId, geometry: &Geometry) -> Result<()>;
    /// Synthetic ConfigureNotify telling the client where it really is.
    fn send_configure_notify(
        &self,
        window: WindowId,
        geometry: &Geometry,
        border_width: i32,
    ) -> Result<()>;

    fn map_raised(&self, window: WindowId) -> Result<()>;
    fn unmap(&self, window: WindowId) -> Result<()>;
    fn raise(&self, window: WindowId) -> Result<()>;
    fn lower(&self, window: WindowId) -> Result<()>;
    fn set_border(&self, window: WindowId, width: i32, pixel: u32) -> Result<()>;

    fn set_input_focus(&self, window: WindowId) -> Result<()>;
    fn install_colormap(&self, colormap: u32) -> Result<()>;
    fn grab_buttons(&self, window: WindowId) -> Result<()>;
    fn ungrab_buttons(&self, window: WindowId) -> Result<()>;

    fn select_client_input(&self, window: WindowId) -> Result<()>;
    fn set_save_set(&self, window: WindowId, insert: bool) -> Result<()>;
    fn grab_server(&self) -> Result<()>;
    fn ungrab_server(&self) -> Result<()>;

    fn wm_state(&self, window: WindowId) -> Result<Option<ClientState>>;
    fn set_wm_state(&self, window: WindowId, state: ClientState) -> Result<()>;

    fn text_property(&self, window: WindowId, property: TextProperty) -> Result<Option<String>>;
    fn size_hints(&self, window: WindowId) -> Result<Option<RawSizeHints>>;
    fn wm_hints(&self, window: WindowId) -> Result<Option<WmHints>>;
    fn protocols(&self, window: WindowId) -> Result<WmProtocols>;
    /// WM_CLASS as (res_name, res_class).
    fn class_hint(&self, window: WindowId) -> Result<Option<(String, String)>>;
    fn motif_hints(&self, window: WindowId) -> Result<Option<MotifWmHints>>;
    fn transient_for(&self, window: WindowId) -> Result<Option<WindowId>>;

    fn send_delete(&self, window: WindowId) -> Result<()>;
    fn kill_client(&self, window: WindowId) -> Result<()>;

    /// Pointer position relative to `window`.
    fn pointer_position(&self, window: WindowId) -> Result<(i32, i32)>;
    fn warp_pointer(&self, window: WindowId, x: i32, y: i32) -> Result<()>;

    fn set_client_list(&self, root: WindowId, windows: &[WindowId]) -> Result<()>;
    fn append_client_list(&self, root: WindowId, window: WindowId) -> Result<()>;
    fn set_active_window(&self, root: WindowId, window: Option<WindowId>) -> Result<()>;
}
