//! X11 backend
//!
//! [`X11Display`] implements the [`Display`] contract on an x11rb
//! connection, [`X11Menu`] is the menu window. The free functions handle
//! startup: taking the WM selection, RandR monitors, the keyboard map and
//! key grabs.

use std::collections::VecDeque;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::randr::ConnectionExt as _;
use x11rb::protocol::xproto::{
    Allow, Atom, AtomEnum, ButtonIndex, ChangeWindowAttributesAux, Char2b, ConfigWindow,
    ConfigureNotifyEvent, ConfigureWindowAux, ConnectionExt as _, CreateGCAux, CreateWindowAux,
    EventMask, Font, Gcontext, GrabMode, GrabStatus, InputFocus, MapState, ModMask, NotifyMode,
    PropMode, Rectangle, SetMode, StackMode, Window, WindowClass, CONFIGURE_NOTIFY_EVENT,
};
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::config::{Config, WindowColors};
use crate::shared::Geometry;
use crate::wm::client::ClientState;
use crate::wm::client_flags::WmProtocols;
use crate::wm::display::{Display, TextProperty, WindowAttributes, WindowId};
use crate::wm::events::{ConfigureChanges, PropertyKind, WmEvent};
use crate::wm::ewmh::Atoms;
use crate::wm::hints::{MotifWmHints, RawSizeHints, WmHints};
use crate::wm::keyboard::{KeyModifiers, KeyboardManager, KeyboardMap};
use crate::wm::menu::{MenuCursor, MenuEvent, MenuFrame, MenuSurface};
use crate::wm::screen::Monitor;

const ANY_KEY: u8 = 0;

// Cursor font glyphs
const XC_LEFT_PTR: u16 = 68;
const XC_HAND2: u16 = 60;
const XC_QUESTION_ARROW: u16 = 92;

fn to_i16(v: i32) -> i16 {
    v.clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}

/// X sizes are unsigned and never zero.
fn to_dim(v: i32) -> u32 {
    u32::try_from(v.max(1)).unwrap_or(1)
}

fn to_dim16(v: i32) -> u16 {
    u16::try_from(v.max(1)).unwrap_or(u16::MAX)
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn string_to_latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Property text up to the first NUL, `None` when empty.
fn decode_text(value: &[u8], utf8: bool) -> Option<String> {
    let end = value.iter().position(|&b| b == 0).unwrap_or(value.len());
    let value = &value[..end];
    if value.is_empty() {
        return None;
    }
    Some(if utf8 {
        String::from_utf8_lossy(value).into_owned()
    } else {
        latin1_to_string(value)
    })
}

/// Window-system calls on an x11rb connection
pub struct X11Display {
    conn: Rc<RustConnection>,
    atoms: Atoms,
    keymap: KeyboardMap,
}

impl X11Display {
    pub fn new(conn: Rc<RustConnection>, atoms: Atoms) -> Result<Self> {
        let keymap = load_keyboard_map(&conn)?;
        Ok(Self {
            conn,
            atoms,
            keymap,
        })
    }

    pub fn keymap(&self) -> &KeyboardMap {
        &self.keymap
    }

    /// Re-read the keyboard map after a MappingNotify.
    pub fn reload_keymap(&mut self) -> Result<()> {
        self.keymap = load_keyboard_map(&self.conn)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.conn.flush()?;
        Ok(())
    }

    fn property32(
        &self,
        window: WindowId,
        property: impl Into<Atom>,
        type_: impl Into<Atom>,
        length: u32,
    ) -> Result<Option<Vec<u32>>> {
        let reply = self
            .conn
            .get_property(false, window, property, type_, 0, length)?
            .reply()?;
        Ok(reply
            .value32()
            .map(|values| values.collect::<Vec<_>>())
            .filter(|values| !values.is_empty()))
    }

    /// Top-level windows present at startup worth managing, with whether
    /// they are currently viewable.
    pub fn existing_windows(&self, root: WindowId) -> Result<Vec<(WindowId, bool)>> {
        let tree = self.conn.query_tree(root)?.reply()?;
        let mut windows = Vec::new();
        for window in tree.children {
            let attributes = match self.window_attributes(window) {
                Ok(attributes) => attributes,
                Err(e) => {
                    debug!("Skipping 0x{:x}: {:#}", window, e);
                    continue;
                }
            };
            if attributes.override_redirect {
                continue;
            }
            let iconic = matches!(self.wm_state(window), Ok(Some(ClientState::Iconic)));
            if attributes.viewable || iconic {
                windows.push((window, attributes.viewable));
            }
        }
        Ok(windows)
    }

    /// Decode an X event into what the manager reacts to.
    pub fn translate(&self, event: &Event) -> Option<WmEvent> {
        match event {
            Event::MapRequest(e) => Some(WmEvent::MapRequest {
                window: e.window,
                parent: e.parent,
            }),
            Event::UnmapNotify(e) => Some(WmEvent::UnmapNotify {
                window: e.window,
                synthetic: e.response_type & 0x80 != 0,
            }),
            Event::DestroyNotify(e) => Some(WmEvent::DestroyNotify { window: e.window }),
            Event::PropertyNotify(e) => {
                let property = if e.atom == Atom::from(AtomEnum::WM_NAME)
                    || e.atom == self.atoms.net_wm_name
                {
                    PropertyKind::Name
                } else if e.atom == Atom::from(AtomEnum::WM_NORMAL_HINTS) {
                    PropertyKind::NormalHints
                } else if e.atom == Atom::from(AtomEnum::WM_TRANSIENT_FOR) {
                    PropertyKind::TransientFor
                } else if e.atom == self.atoms.wm_protocols {
                    PropertyKind::Protocols
                } else {
                    return None;
                };
                Some(WmEvent::PropertyNotify {
                    window: e.window,
                    property,
                })
            }
            Event::EnterNotify(e) if e.mode == NotifyMode::NORMAL => {
                Some(WmEvent::EnterNotify { window: e.event })
            }
            Event::ButtonPress(e) => {
                // hand the click on to the client
                if let Err(e) = self.conn.allow_events(Allow::REPLAY_POINTER, x11rb::CURRENT_TIME) {
                    debug!("Failed to replay pointer: {}", e);
                }
                Some(WmEvent::ButtonPress { window: e.event })
            }
            Event::ConfigureRequest(e) => {
                let has = |flag| e.value_mask.contains(flag);
                Some(WmEvent::ConfigureRequest {
                    window: e.window,
                    changes: ConfigureChanges {
                        x: has(ConfigWindow::X).then_some(i32::from(e.x)),
                        y: has(ConfigWindow::Y).then_some(i32::from(e.y)),
                        width: has(ConfigWindow::WIDTH).then_some(i32::from(e.width)),
                        height: has(ConfigWindow::HEIGHT).then_some(i32::from(e.height)),
                        border_width: has(ConfigWindow::BORDER_WIDTH)
                            .then_some(i32::from(e.border_width)),
                    },
                })
            }
            Event::KeyPress(e) => {
                let modifiers = KeyModifiers::from_bits_truncate(u16::from(e.state));
                Some(WmEvent::KeyPress {
                    root: e.root,
                    keysym: self.keymap.lookup(e.detail, modifiers),
                    modifiers,
                })
            }
            Event::KeyRelease(e) => Some(WmEvent::KeyRelease {
                root: e.root,
                keysym: self.keymap.keysym(e.detail, 0),
            }),
            Event::Error(e) => {
                // windows vanish under us all the time
                debug!("X11 error: {:?}", e);
                None
            }
            _ => None,
        }
    }
}

impl Display for X11Display {
    fn window_attributes(&self, window: WindowId) -> Result<WindowAttributes> {
        let attributes = self.conn.get_window_attributes(window)?.reply()?;
        let geometry = self.conn.get_geometry(window)?.reply()?;
        Ok(WindowAttributes {
            geometry: Geometry::new(
                i32::from(geometry.x),
                i32::from(geometry.y),
                i32::from(geometry.width),
                i32::from(geometry.height),
            ),
            colormap: attributes.colormap,
            viewable: attributes.map_state == MapState::VIEWABLE,
            override_redirect: attributes.override_redirect,
        })
    }

    fn move_window(&self, window: WindowId, x: i32, y: i32) -> Result<()> {
        self.conn
            .configure_window(window, &ConfigureWindowAux::new().x(x).y(y))?;
        Ok(())
    }

    fn move_resize_window(&self, window: WindowId, geometry: &Geometry) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new()
                .x(geometry.x)
                .y(geometry.y)
                .width(to_dim(geometry.width))
                .height(to_dim(geometry.height)),
        )?;
        Ok(())
    }

    fn send_configure_notify(
        &self,
        window: WindowId,
        geometry: &Geometry,
        border_width: i32,
    ) -> Result<()> {
        let event = ConfigureNotifyEvent {
            response_type: CONFIGURE_NOTIFY_EVENT,
            sequence: 0,
            event: window,
            window,
            above_sibling: x11rb::NONE,
            x: to_i16(geometry.x),
            y: to_i16(geometry.y),
            width: to_dim16(geometry.width),
            height: to_dim16(geometry.height),
            border_width: u16::try_from(border_width.max(0)).unwrap_or(0),
            override_redirect: false,
        };
        self.conn
            .send_event(false, window, EventMask::STRUCTURE_NOTIFY, event)?;
        Ok(())
    }

    fn map_raised(&self, window: WindowId) -> Result<()> {
        self.raise(window)?;
        self.conn.map_window(window)?;
        Ok(())
    }

    fn unmap(&self, window: WindowId) -> Result<()> {
        self.conn.unmap_window(window)?;
        Ok(())
    }

    fn raise(&self, window: WindowId) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn lower(&self, window: WindowId) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().stack_mode(StackMode::BELOW),
        )?;
        Ok(())
    }

    fn set_border(&self, window: WindowId, width: i32, pixel: u32) -> Result<()> {
        self.conn.configure_window(
            window,
            &ConfigureWindowAux::new().border_width(u32::try_from(width.max(0)).unwrap_or(0)),
        )?;
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().border_pixel(pixel),
        )?;
        Ok(())
    }

    fn set_input_focus(&self, window: WindowId) -> Result<()> {
        self.conn
            .set_input_focus(InputFocus::POINTER_ROOT, window, x11rb::CURRENT_TIME)?;
        Ok(())
    }

    fn install_colormap(&self, colormap: u32) -> Result<()> {
        if colormap != x11rb::NONE {
            self.conn.install_colormap(colormap)?;
        }
        Ok(())
    }

    fn grab_buttons(&self, window: WindowId) -> Result<()> {
        self.conn.grab_button(
            false,
            window,
            EventMask::BUTTON_PRESS,
            GrabMode::SYNC,
            GrabMode::ASYNC,
            x11rb::NONE,
            x11rb::NONE,
            ButtonIndex::ANY,
            ModMask::ANY,
        )?;
        Ok(())
    }

    fn ungrab_buttons(&self, window: WindowId) -> Result<()> {
        self.conn
            .ungrab_button(ButtonIndex::ANY, window, ModMask::ANY)?;
        Ok(())
    }

    fn select_client_input(&self, window: WindowId) -> Result<()> {
        self.conn.change_window_attributes(
            window,
            &ChangeWindowAttributesAux::new().event_mask(
                EventMask::ENTER_WINDOW | EventMask::PROPERTY_CHANGE | EventMask::KEY_RELEASE,
            ),
        )?;
        Ok(())
    }

    fn set_save_set(&self, window: WindowId, insert: bool) -> Result<()> {
        let mode = if insert {
            SetMode::INSERT
        } else {
            SetMode::DELETE
        };
        self.conn.change_save_set(mode, window)?;
        Ok(())
    }

    fn grab_server(&self) -> Result<()> {
        self.conn.grab_server()?;
        Ok(())
    }

    fn ungrab_server(&self) -> Result<()> {
        self.conn.ungrab_server()?;
        Ok(())
    }

    fn wm_state(&self, window: WindowId) -> Result<Option<ClientState>> {
        let values = self.property32(window, self.atoms.wm_state, self.atoms.wm_state, 2)?;
        Ok(values
            .and_then(|v| v.first().copied())
            .and_then(ClientState::from_wire))
    }

    fn set_wm_state(&self, window: WindowId, state: ClientState) -> Result<()> {
        self.conn.change_property32(
            PropMode::REPLACE,
            window,
            self.atoms.wm_state,
            self.atoms.wm_state,
            &[state.to_wire(), x11rb::NONE],
        )?;
        Ok(())
    }

    fn text_property(&self, window: WindowId, property: TextProperty) -> Result<Option<String>> {
        let (atom, type_) = match property {
            TextProperty::NetWmName => (self.atoms.net_wm_name, self.atoms.utf8_string),
            TextProperty::WmName => (Atom::from(AtomEnum::WM_NAME), Atom::from(AtomEnum::ANY)),
        };
        let reply = self
            .conn
            .get_property(false, window, atom, type_, 0, 256)?
            .reply()?;
        let utf8 = reply.type_ == self.atoms.utf8_string;
        Ok(decode_text(&reply.value, utf8))
    }

    fn size_hints(&self, window: WindowId) -> Result<Option<RawSizeHints>> {
        let values = self.property32(
            window,
            AtomEnum::WM_NORMAL_HINTS,
            AtomEnum::WM_SIZE_HINTS,
            18,
        )?;
        Ok(values.and_then(|v| RawSizeHints::from_property(&v)))
    }

    fn wm_hints(&self, window: WindowId) -> Result<Option<WmHints>> {
        let values = self.property32(window, AtomEnum::WM_HINTS, AtomEnum::WM_HINTS, 9)?;
        Ok(values.and_then(|v| WmHints::from_property(&v)))
    }

    fn protocols(&self, window: WindowId) -> Result<WmProtocols> {
        let atoms = self
            .property32(window, self.atoms.wm_protocols, AtomEnum::ATOM, 64)?
            .unwrap_or_default();
        let mut protocols = WmProtocols::empty();
        for atom in atoms {
            if atom == self.atoms.wm_delete_window {
                protocols |= WmProtocols::DELETE;
            } else if atom == self.atoms.wm_take_focus {
                protocols |= WmProtocols::TAKE_FOCUS;
            }
        }
        Ok(protocols)
    }

    fn class_hint(&self, window: WindowId) -> Result<Option<(String, String)>> {
        let reply = self
            .conn
            .get_property(false, window, AtomEnum::WM_CLASS, AtomEnum::STRING, 0, 256)?
            .reply()?;
        let mut parts = reply.value.split(|&b| b == 0).map(latin1_to_string);
        match (parts.next(), parts.next()) {
            (Some(name), Some(class)) => Ok(Some((name, class))),
            _ => Ok(None),
        }
    }

    fn motif_hints(&self, window: WindowId) -> Result<Option<MotifWmHints>> {
        let values = self.property32(
            window,
            self.atoms.motif_wm_hints,
            self.atoms.motif_wm_hints,
            MotifWmHints::ELEMENTS as u32,
        )?;
        Ok(values.and_then(|v| MotifWmHints::from_property(&v)))
    }

    fn transient_for(&self, window: WindowId) -> Result<Option<WindowId>> {
        let values = self.property32(window, AtomEnum::WM_TRANSIENT_FOR, AtomEnum::WINDOW, 1)?;
        Ok(values
            .and_then(|v| v.first().copied())
            .filter(|&w| w != x11rb::NONE))
    }

    fn send_delete(&self, window: WindowId) -> Result<()> {
        self.atoms.send_delete_window(self.conn.as_ref(), window)
    }

    fn kill_client(&self, window: WindowId) -> Result<()> {
        self.conn.kill_client(window)?;
        Ok(())
    }

    fn pointer_position(&self, window: WindowId) -> Result<(i32, i32)> {
        let reply = self.conn.query_pointer(window)?.reply()?;
        Ok((i32::from(reply.win_x), i32::from(reply.win_y)))
    }

    fn warp_pointer(&self, window: WindowId, x: i32, y: i32) -> Result<()> {
        self.conn
            .warp_pointer(x11rb::NONE, window, 0, 0, 0, 0, to_i16(x), to_i16(y))?;
        Ok(())
    }

    fn set_client_list(&self, root: WindowId, windows: &[WindowId]) -> Result<()> {
        self.atoms
            .update_client_list(self.conn.as_ref(), root, windows)
    }

    fn append_client_list(&self, root: WindowId, window: WindowId) -> Result<()> {
        self.atoms
            .append_client_list(self.conn.as_ref(), root, window)
    }

    fn set_active_window(&self, root: WindowId, window: Option<WindowId>) -> Result<()> {
        self.atoms
            .update_active_window(self.conn.as_ref(), root, window)
    }
}

/// Take the ICCCM `WM_S<n>` selection and SubstructureRedirect on the root.
///
/// With `replace`, an existing owner is asked to leave by taking the
/// selection from it; we then wait for its selection window to go away.
/// Returns the window holding the selection.
pub fn acquire_wm_selection(
    conn: &RustConnection,
    screen_num: usize,
    atoms: &Atoms,
    replace: bool,
) -> Result<Window> {
    let screen = &conn.setup().roots[screen_num];
    let root = screen.root;

    let selection_name = format!("WM_S{screen_num}");
    let selection = conn
        .intern_atom(false, selection_name.as_bytes())?
        .reply()
        .context("Failed to intern WM selection atom")?
        .atom;

    let previous = conn
        .get_selection_owner(selection)?
        .reply()
        .context("Failed to get current WM selection owner")?
        .owner;
    if previous != x11rb::NONE {
        if !replace {
            bail!(
                "Another window manager is already running (window 0x{:x}). \
                 Use --replace to replace it.",
                previous
            );
        }
        info!("Replacing window manager owning 0x{:x}", previous);
        conn.change_window_attributes(
            previous,
            &ChangeWindowAttributesAux::new().event_mask(EventMask::STRUCTURE_NOTIFY),
        )?;
    }

    let owner = conn.generate_id()?;
    conn.create_window(
        x11rb::COPY_DEPTH_FROM_PARENT,
        owner,
        root,
        -1,
        -1,
        1,
        1,
        0,
        WindowClass::INPUT_ONLY,
        x11rb::COPY_FROM_PARENT,
        &CreateWindowAux::new().override_redirect(1),
    )?;
    conn.set_selection_owner(owner, selection, x11rb::CURRENT_TIME)?
        .check()
        .context("Failed to set WM selection owner")?;

    let now_owner = conn.get_selection_owner(selection)?.reply()?.owner;
    if now_owner != owner {
        bail!(
            "Failed to acquire WM selection (expected 0x{:x}, got 0x{:x})",
            owner,
            now_owner
        );
    }

    if previous != x11rb::NONE {
        let timeout = Duration::from_secs(15);
        let start = Instant::now();
        while conn.get_window_attributes(previous)?.reply().is_ok() {
            if start.elapsed() >= timeout {
                warn!("Timeout waiting for previous WM to exit, proceeding anyway");
                break;
            }
            std::thread::sleep(Duration::from_millis(100));
        }
    }

    conn.change_window_attributes(
        root,
        &ChangeWindowAttributesAux::new().event_mask(
            EventMask::SUBSTRUCTURE_REDIRECT
                | EventMask::SUBSTRUCTURE_NOTIFY
                | EventMask::PROPERTY_CHANGE
                | EventMask::ENTER_WINDOW
                | EventMask::KEY_RELEASE,
        ),
    )?
    .check()
    .context("Failed to select SubstructureRedirect on the root window")?;

    atoms.setup_supported(conn, root, owner)?;
    conn.flush()?;
    info!("Acquired {} on root 0x{:x}", selection_name, root);
    Ok(owner)
}

/// Monitors reported by RandR; empty when the extension is missing.
pub fn query_monitors(conn: &RustConnection, root: Window) -> Vec<Monitor> {
    let reply = match conn
        .randr_get_monitors(root, true)
        .map_err(anyhow::Error::from)
        .and_then(|cookie| cookie.reply().map_err(anyhow::Error::from))
    {
        Ok(reply) => reply,
        Err(e) => {
            debug!("RandR monitors unavailable: {:#}", e);
            return Vec::new();
        }
    };

    reply
        .monitors
        .iter()
        .map(|m| {
            let name = conn
                .get_atom_name(m.name)
                .ok()
                .and_then(|cookie| cookie.reply().ok())
                .map(|r| String::from_utf8_lossy(&r.name).into_owned())
                .unwrap_or_default();
            Monitor {
                x: i32::from(m.x),
                y: i32::from(m.y),
                width: i32::from(m.width),
                height: i32::from(m.height),
                name,
                primary: m.primary,
            }
        })
        .collect()
}

pub fn load_keyboard_map(conn: &RustConnection) -> Result<KeyboardMap> {
    let setup = conn.setup();
    let (min, max) = (setup.min_keycode, setup.max_keycode);
    let mapping = conn
        .get_keyboard_mapping(min, max - min + 1)?
        .reply()
        .context("Failed to read the keyboard mapping")?;
    Ok(KeyboardMap::new(
        min,
        mapping.keysyms_per_keycode,
        mapping.keysyms,
    ))
}

/// Grab every bound key on `root`, under all Lock/NumLock combinations.
pub fn grab_keys(
    conn: &RustConnection,
    root: Window,
    keys: &KeyboardManager,
    keymap: &KeyboardMap,
) -> Result<()> {
    conn.ungrab_key(ANY_KEY, root, ModMask::ANY)?;
    let mut grabbed = 0;
    for (modifiers, sym) in keys.bindings() {
        let keycodes = keymap.keycodes_for(sym);
        if keycodes.is_empty() {
            debug!("No keycode for keysym 0x{:x}", sym);
        }
        for keycode in keycodes {
            for variant in modifiers.lock_variants() {
                conn.grab_key(
                    true,
                    root,
                    ModMask::from(variant.bits()),
                    keycode,
                    GrabMode::ASYNC,
                    GrabMode::ASYNC,
                )?;
            }
            grabbed += 1;
        }
    }
    debug!("Grabbed {} key(s)", grabbed);
    Ok(())
}

/// The menu window, its graphics contexts and cursors
pub struct X11Menu {
    conn: Rc<RustConnection>,
    root: Window,
    window: Window,
    font: Font,
    gc: Gcontext,
    gc_inverted: Gcontext,
    ascent: i32,
    line_height: i32,
    char_width: i32,
    cursors: [u32; 3],
    saved_focus: Option<(Window, InputFocus)>,
    keymap: KeyboardMap,
    deferred: VecDeque<Event>,
}

impl X11Menu {
    pub fn new(
        conn: Rc<RustConnection>,
        screen_num: usize,
        config: &Config,
        keymap: KeyboardMap,
    ) -> Result<Self> {
        let root = conn.setup().roots[screen_num].root;
        let colors: WindowColors = config.colors;

        let font = conn.generate_id()?;
        let opened = conn
            .open_font(font, config.menu.font.as_bytes())?
            .check();
        if let Err(e) = opened {
            warn!("Failed to open font '{}': {}, using 'fixed'", config.menu.font, e);
            conn.open_font(font, b"fixed")?
                .check()
                .context("Failed to open font 'fixed'")?;
        }
        let info = conn.query_font(font)?.reply()?;
        let ascent = i32::from(info.font_ascent);
        let line_height = (ascent + i32::from(info.font_descent)).max(1);
        let char_width = i32::from(info.max_bounds.character_width).max(1);

        let window = conn.generate_id()?;
        conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            root,
            0,
            0,
            1,
            1,
            1,
            WindowClass::INPUT_OUTPUT,
            x11rb::COPY_FROM_PARENT,
            &CreateWindowAux::new()
                .background_pixel(colors.menu_background)
                .border_pixel(colors.menu_foreground)
                .override_redirect(1)
                .event_mask(
                    EventMask::EXPOSURE
                        | EventMask::KEY_PRESS
                        | EventMask::BUTTON_PRESS
                        | EventMask::BUTTON_RELEASE
                        | EventMask::POINTER_MOTION,
                ),
        )?;

        let gc = conn.generate_id()?;
        conn.create_gc(
            gc,
            window,
            &CreateGCAux::new()
                .foreground(colors.menu_foreground)
                .background(colors.menu_background)
                .font(font),
        )?;
        let gc_inverted = conn.generate_id()?;
        conn.create_gc(
            gc_inverted,
            window,
            &CreateGCAux::new()
                .foreground(colors.menu_background)
                .background(colors.menu_foreground)
                .font(font),
        )?;

        let cursor_font = conn.generate_id()?;
        conn.open_font(cursor_font, b"cursor")?;
        let mut cursors = [0; 3];
        for (slot, glyph) in cursors
            .iter_mut()
            .zip([XC_LEFT_PTR, XC_HAND2, XC_QUESTION_ARROW])
        {
            let cursor = conn.generate_id()?;
            conn.create_glyph_cursor(
                cursor,
                cursor_font,
                cursor_font,
                glyph,
                glyph + 1,
                0,
                0,
                0,
                0xffff,
                0xffff,
                0xffff,
            )?;
            *slot = cursor;
        }
        conn.close_font(cursor_font)?;

        Ok(Self {
            conn,
            root,
            window,
            font,
            gc,
            gc_inverted,
            ascent,
            line_height,
            char_width,
            cursors,
            saved_focus: None,
            keymap,
            deferred: VecDeque::new(),
        })
    }

    pub fn set_keymap(&mut self, keymap: KeyboardMap) {
        self.keymap = keymap;
    }

    /// Next event the menu pulled off the connection but did not consume.
    pub fn take_deferred(&mut self) -> Option<Event> {
        self.deferred.pop_front()
    }

    fn cursor(&self, cursor: MenuCursor) -> u32 {
        match cursor {
            MenuCursor::Idle => self.cursors[0],
            MenuCursor::Select => self.cursors[1],
            MenuCursor::Question => self.cursors[2],
        }
    }

    fn menu_event_mask() -> EventMask {
        EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::POINTER_MOTION
    }

    fn draw_line(&self, width: i32, row: usize, text: &str, inverted: bool) -> Result<()> {
        let top = i32::try_from(row).unwrap_or(i32::MAX / 2) * self.line_height;
        let gc = if inverted {
            self.conn.poly_fill_rectangle(
                self.window,
                self.gc,
                &[Rectangle {
                    x: 0,
                    y: to_i16(top),
                    width: to_dim16(width),
                    height: to_dim16(self.line_height),
                }],
            )?;
            self.gc_inverted
        } else {
            self.conn.clear_area(
                false,
                self.window,
                0,
                to_i16(top),
                to_dim16(width),
                to_dim16(self.line_height),
            )?;
            self.gc
        };
        let bytes = string_to_latin1(text);
        self.conn
            .image_text8(self.window, gc, 0, to_i16(top + self.ascent), &bytes)?;
        Ok(())
    }
}

impl MenuSurface for X11Menu {
    fn pointer_position(&mut self) -> Result<(i32, i32)> {
        let reply = self.conn.query_pointer(self.root)?.reply()?;
        Ok((i32::from(reply.root_x), i32::from(reply.root_y)))
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.conn
            .warp_pointer(x11rb::NONE, self.root, 0, 0, 0, 0, to_i16(x), to_i16(y))?;
        Ok(())
    }

    fn line_height(&self) -> i32 {
        self.line_height
    }

    fn text_width(&self, text: &str) -> i32 {
        let chars: Vec<Char2b> = string_to_latin1(text)
            .into_iter()
            .map(|b| Char2b { byte1: 0, byte2: b })
            .collect();
        let fallback = i32::try_from(chars.len()).unwrap_or(0) * self.char_width;
        match self
            .conn
            .query_text_extents(self.font, &chars)
            .map_err(anyhow::Error::from)
            .and_then(|cookie| cookie.reply().map_err(anyhow::Error::from))
        {
            Ok(reply) => reply.overall_width,
            Err(e) => {
                debug!("Text extents unavailable: {:#}", e);
                fallback
            }
        }
    }

    fn open(&mut self, x: i32, y: i32, width: i32, keyboard: bool) -> Result<bool> {
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new()
                .x(x)
                .y(y)
                .width(to_dim(width))
                .height(to_dim(self.line_height))
                .stack_mode(StackMode::ABOVE),
        )?;
        self.conn.map_window(self.window)?;

        let grab = self
            .conn
            .grab_pointer(
                false,
                self.window,
                Self::menu_event_mask(),
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                self.cursor(MenuCursor::Question),
                x11rb::CURRENT_TIME,
            )?
            .reply()?;
        if grab.status != GrabStatus::SUCCESS {
            self.conn.unmap_window(self.window)?;
            self.conn.flush()?;
            return Ok(false);
        }

        if keyboard {
            let focus = self.conn.get_input_focus()?.reply()?;
            self.saved_focus = Some((focus.focus, focus.revert_to));
            self.conn
                .set_input_focus(InputFocus::PARENT, self.window, x11rb::CURRENT_TIME)?;
            self.conn.grab_keyboard(
                false,
                self.window,
                x11rb::CURRENT_TIME,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
            )?;
        }
        self.conn.flush()?;
        Ok(true)
    }

    fn close(&mut self) -> Result<()> {
        if let Some((focus, revert_to)) = self.saved_focus.take() {
            self.conn
                .set_input_focus(revert_to, focus, x11rb::CURRENT_TIME)?;
            self.conn.ungrab_keyboard(x11rb::CURRENT_TIME)?;
        }
        self.conn.ungrab_pointer(x11rb::CURRENT_TIME)?;
        self.conn.unmap_window(self.window)?;
        self.conn.flush()?;
        Ok(())
    }

    fn set_cursor(&mut self, cursor: MenuCursor) -> Result<()> {
        self.conn.change_active_pointer_grab(
            self.cursor(cursor),
            x11rb::CURRENT_TIME,
            Self::menu_event_mask(),
        )?;
        Ok(())
    }

    fn draw(&mut self, frame: &MenuFrame) -> Result<()> {
        self.conn.configure_window(
            self.window,
            &ConfigureWindowAux::new()
                .x(frame.x)
                .y(frame.y)
                .width(to_dim(frame.width))
                .height(to_dim(frame.height)),
        )?;
        self.conn.clear_area(false, self.window, 0, 0, 0, 0)?;
        for (row, line) in frame.lines.iter().enumerate() {
            self.draw_line(frame.width, row, &line.text, line.inverted)?;
        }
        self.conn.flush()?;
        Ok(())
    }

    fn draw_row(&mut self, width: i32, row: usize, text: &str, inverted: bool) -> Result<()> {
        self.draw_line(width, row, text, inverted)?;
        self.conn.flush()?;
        Ok(())
    }

    fn next_event(&mut self) -> Result<MenuEvent> {
        loop {
            let event = self.conn.wait_for_event()?;
            let translated = match &event {
                Event::KeyPress(e) => {
                    let modifiers = KeyModifiers::from_bits_truncate(u16::from(e.state));
                    Some(MenuEvent::Key {
                        keysym: self.keymap.lookup(e.detail, modifiers),
                        modifiers,
                    })
                }
                Event::MotionNotify(e) if e.event == self.window => Some(MenuEvent::Motion {
                    x: i32::from(e.event_x),
                    y: i32::from(e.event_y),
                }),
                Event::ButtonRelease(e) => Some(MenuEvent::ButtonRelease {
                    x: i32::from(e.event_x),
                    y: i32::from(e.event_y),
                }),
                Event::Expose(e) if e.window == self.window && e.count == 0 => {
                    Some(MenuEvent::Expose)
                }
                Event::Expose(e) if e.window == self.window => None,
                Event::ButtonPress(e) if e.event == self.window => None,
                _ => {
                    self.deferred.push_back(event.clone());
                    None
                }
            };
            if let Some(menu_event) = translated {
                return Ok(menu_event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_text_stops_at_nul() {
        assert_eq!(decode_text(b"xterm\0junk", true).as_deref(), Some("xterm"));
        assert_eq!(decode_text(b"", true), None);
        assert_eq!(decode_text(b"\0", false), None);
        assert_eq!(decode_text(&[0x63, 0x61, 0x66, 0xe9], false).as_deref(), Some("café"));
    }

    #[test]
    fn test_latin1_encoding() {
        assert_eq!(string_to_latin1("a»b«"), vec![b'a', 0xbb, b'b', 0xab]);
        assert_eq!(string_to_latin1("→"), vec![b'?']);
    }

    #[test]
    fn test_dimensions_are_clamped() {
        assert_eq!(to_dim(0), 1);
        assert_eq!(to_dim(-5), 1);
        assert_eq!(to_dim(640), 640);
        assert_eq!(to_i16(70_000), i16::MAX);
        assert_eq!(to_dim16(100_000), u16::MAX);
    }
}
