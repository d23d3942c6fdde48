//! In-memory stand-ins for the window system, used by the unit tests.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use anyhow::{Result, anyhow, bail};

use crate::shared::Geometry;
use crate::wm::client::{ClientId, ClientState};
use crate::wm::client_flags::WmProtocols;
use crate::wm::display::{Display, TextProperty, WindowAttributes, WindowId};
use crate::wm::hints::{MotifWmHints, RawSizeHints, WmHints};
use crate::wm::menu::{MenuCursor, MenuEvent, MenuFrame, MenuSurface};
use crate::wm::screen::Screen;
use crate::wm::{WindowManager, WmSettings};

pub const ROOT: WindowId = 1;

/// A recorded window-system request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Move(WindowId, i32, i32),
    MoveResize(WindowId, Geometry),
    ConfigureNotify(WindowId, Geometry, i32),
    MapRaised(WindowId),
    Unmap(WindowId),
    Raise(WindowId),
    Lower(WindowId),
    Border(WindowId, i32, u32),
    InputFocus(WindowId),
    InstallColormap(u32),
    GrabButtons(WindowId),
    UngrabButtons(WindowId),
    SelectInput(WindowId),
    SaveSet(WindowId, bool),
    GrabServer,
    UngrabServer,
    SendDelete(WindowId),
    KillClient(WindowId),
    WarpPointer(WindowId, i32, i32),
    SetClientList(Vec<WindowId>),
    AppendClientList(WindowId),
    ActiveWindow(Option<WindowId>),
}

#[derive(Debug, Default)]
struct MockWindow {
    attributes: Option<WindowAttributes>,
    wm_state: Option<ClientState>,
    texts: HashMap<TextProperty, String>,
    size_hints: Option<RawSizeHints>,
    wm_hints: Option<WmHints>,
    protocols: WmProtocols,
    class: Option<(String, String)>,
    motif: Option<MotifWmHints>,
    transient_for: Option<WindowId>,
    pointer: (i32, i32),
}

/// Recording [`Display`] backed by a table of fake windows
#[derive(Debug, Default)]
pub struct MockDisplay {
    windows: RefCell<HashMap<WindowId, MockWindow>>,
    calls: RefCell<Vec<Call>>,
    fail_when: Option<fn(&Call) -> bool>,
}

impl MockDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// A 200x100 unmapped window at the origin.
    pub fn add_window(&mut self, window: WindowId) {
        self.windows.get_mut().insert(
            window,
            MockWindow {
                attributes: Some(WindowAttributes {
                    geometry: Geometry::new(0, 0, 200, 100),
                    colormap: 0,
                    viewable: false,
                    override_redirect: false,
                }),
                ..MockWindow::default()
            },
        );
    }

    fn window_mut(&mut self, window: WindowId) -> &mut MockWindow {
        self.windows.get_mut().entry(window).or_default()
    }

    pub fn set_text(&mut self, window: WindowId, property: TextProperty, text: &str) {
        self.window_mut(window)
            .texts
            .insert(property, text.to_string());
    }

    pub fn set_initial_state(&mut self, window: WindowId, state: ClientState) {
        let values = [2, 0, state.to_wire(), 0, 0, 0, 0, 0, 0];
        self.window_mut(window).wm_hints = WmHints::from_property(&values);
    }

    pub fn set_size_hints(&mut self, window: WindowId, hints: RawSizeHints) {
        self.window_mut(window).size_hints = Some(hints);
    }

    pub fn set_protocols(&mut self, window: WindowId, protocols: WmProtocols) {
        self.window_mut(window).protocols = protocols;
    }

    pub fn set_motif(&mut self, window: WindowId, hints: MotifWmHints) {
        self.window_mut(window).motif = Some(hints);
    }

    pub fn set_transient_for(&mut self, window: WindowId, parent: WindowId) {
        self.window_mut(window).transient_for = Some(parent);
    }

    pub fn set_class(&mut self, window: WindowId, name: &str, class: &str) {
        self.window_mut(window).class = Some((name.to_string(), class.to_string()));
    }

    /// Pointer position reported relative to `window`.
    pub fn set_pointer(&mut self, window: WindowId, pointer: (i32, i32)) {
        self.window_mut(window).pointer = pointer;
    }

    /// Make every request matching `when` fail with BadWindow.
    pub fn fail_when(&mut self, when: fn(&Call) -> bool) {
        self.fail_when = Some(when);
    }

    pub fn called(&self, call: &Call) -> bool {
        self.calls.borrow().contains(call)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn wm_state_of(&self, window: WindowId) -> Option<ClientState> {
        self.windows.borrow().get(&window).and_then(|w| w.wm_state)
    }

    fn record(&self, call: Call) -> Result<()> {
        let fails = self.fail_when.is_some_and(|when| when(&call));
        self.calls.borrow_mut().push(call);
        if fails {
            bail!("BadWindow");
        }
        Ok(())
    }

    fn read<T>(&self, window: WindowId, f: impl FnOnce(&MockWindow) -> T) -> Option<T> {
        self.windows.borrow().get(&window).map(f)
    }
}

impl Display for MockDisplay {
    fn window_attributes(&self, window: WindowId) -> Result<WindowAttributes> {
        self.read(window, |w| w.attributes)
            .flatten()
            .ok_or_else(|| anyhow!("BadWindow 0x{:x}", window))
    }

    fn move_window(&self, window: WindowId, x: i32, y: i32) -> Result<()> {
        self.record(Call::Move(window, x, y))
    }

    fn move_resize_window(&self, window: WindowId, geometry: &Geometry) -> Result<()> {
        self.record(Call::MoveResize(window, *geometry))
    }

    fn send_configure_notify(
        &self,
        window: WindowId,
        geometry: &Geometry,
        border_width: i32,
    ) -> Result<()> {
        self.record(Call::ConfigureNotify(window, *geometry, border_width))
    }

    fn map_raised(&self, window: WindowId) -> Result<()> {
        self.record(Call::MapRaised(window))
    }

    fn unmap(&self, window: WindowId) -> Result<()> {
        self.record(Call::Unmap(window))
    }

    fn raise(&self, window: WindowId) -> Result<()> {
        self.record(Call::Raise(window))
    }

    fn lower(&self, window: WindowId) -> Result<()> {
        self.record(Call::Lower(window))
    }

    fn set_border(&self, window: WindowId, width: i32, pixel: u32) -> Result<()> {
        self.record(Call::Border(window, width, pixel))
    }

    fn set_input_focus(&self, window: WindowId) -> Result<()> {
        self.record(Call::InputFocus(window))
    }

    fn install_colormap(&self, colormap: u32) -> Result<()> {
        self.record(Call::InstallColormap(colormap))
    }

    fn grab_buttons(&self, window: WindowId) -> Result<()> {
        self.record(Call::GrabButtons(window))
    }

    fn ungrab_buttons(&self, window: WindowId) -> Result<()> {
        self.record(Call::UngrabButtons(window))
    }

    fn select_client_input(&self, window: WindowId) -> Result<()> {
        self.record(Call::SelectInput(window))
    }

    fn set_save_set(&self, window: WindowId, insert: bool) -> Result<()> {
        self.record(Call::SaveSet(window, insert))
    }

    fn grab_server(&self) -> Result<()> {
        self.record(Call::GrabServer)
    }

    fn ungrab_server(&self) -> Result<()> {
        self.record(Call::UngrabServer)
    }

    fn wm_state(&self, window: WindowId) -> Result<Option<ClientState>> {
        Ok(self.wm_state_of(window))
    }

    fn set_wm_state(&self, window: WindowId, state: ClientState) -> Result<()> {
        self.windows
            .borrow_mut()
            .entry(window)
            .or_default()
            .wm_state = Some(state);
        Ok(())
    }

    fn text_property(&self, window: WindowId, property: TextProperty) -> Result<Option<String>> {
        Ok(self
            .read(window, |w| w.texts.get(&property).cloned())
            .flatten())
    }

    fn size_hints(&self, window: WindowId) -> Result<Option<RawSizeHints>> {
        Ok(self.read(window, |w| w.size_hints.clone()).flatten())
    }

    fn wm_hints(&self, window: WindowId) -> Result<Option<WmHints>> {
        Ok(self.read(window, |w| w.wm_hints.clone()).flatten())
    }

    fn protocols(&self, window: WindowId) -> Result<WmProtocols> {
        Ok(self.read(window, |w| w.protocols).unwrap_or_default())
    }

    fn class_hint(&self, window: WindowId) -> Result<Option<(String, String)>> {
        Ok(self.read(window, |w| w.class.clone()).flatten())
    }

    fn motif_hints(&self, window: WindowId) -> Result<Option<MotifWmHints>> {
        Ok(self.read(window, |w| w.motif).flatten())
    }

    fn transient_for(&self, window: WindowId) -> Result<Option<WindowId>> {
        Ok(self.read(window, |w| w.transient_for).flatten())
    }

    fn send_delete(&self, window: WindowId) -> Result<()> {
        self.record(Call::SendDelete(window))
    }

    fn kill_client(&self, window: WindowId) -> Result<()> {
        self.record(Call::KillClient(window))
    }

    fn pointer_position(&self, window: WindowId) -> Result<(i32, i32)> {
        Ok(self.read(window, |w| w.pointer).unwrap_or_default())
    }

    fn warp_pointer(&self, window: WindowId, x: i32, y: i32) -> Result<()> {
        self.record(Call::WarpPointer(window, x, y))
    }

    fn set_client_list(&self, _root: WindowId, windows: &[WindowId]) -> Result<()> {
        self.record(Call::SetClientList(windows.to_vec()))
    }

    fn append_client_list(&self, _root: WindowId, window: WindowId) -> Result<()> {
        self.record(Call::AppendClientList(window))
    }

    fn set_active_window(&self, _root: WindowId, window: Option<WindowId>) -> Result<()> {
        self.record(Call::ActiveWindow(window))
    }
}

/// A context with one 1920x1080 screen rooted at [`ROOT`].
pub fn test_wm(display: MockDisplay) -> WindowManager<MockDisplay> {
    WindowManager::new(
        display,
        WmSettings::default(),
        vec![Screen::new(0, ROOT, 1920, 1080)],
    )
}

/// A context managing one mapped window per entry of `windows`.
pub fn managed_wm(windows: &[WindowId]) -> (WindowManager<MockDisplay>, Vec<ClientId>) {
    let mut display = MockDisplay::new();
    for &window in windows {
        display.add_window(window);
    }
    let mut wm = test_wm(display);
    let ids = windows
        .iter()
        .map(|&w| wm.manage_window(w, 0, true).unwrap().unwrap())
        .collect();
    (wm, ids)
}

/// [`MenuSurface`] replaying a fixed list of events and recording output
///
/// Rows are 10 px high and every character is 6 px wide.
#[derive(Debug, Default)]
pub struct ScriptedMenu {
    pub events: VecDeque<MenuEvent>,
    pub pointer: (i32, i32),
    pub warps: Vec<(i32, i32)>,
    pub frames: Vec<MenuFrame>,
    pub rows_drawn: Vec<(usize, String, bool)>,
    pub cursors: Vec<MenuCursor>,
    pub keyboard: bool,
    pub closed: bool,
    pub grab_fails: bool,
}

impl ScriptedMenu {
    pub fn new(events: Vec<MenuEvent>) -> Self {
        Self {
            events: events.into(),
            ..Self::default()
        }
    }
}

impl MenuSurface for ScriptedMenu {
    fn pointer_position(&mut self) -> Result<(i32, i32)> {
        Ok(self.pointer)
    }

    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()> {
        self.pointer = (x, y);
        self.warps.push((x, y));
        Ok(())
    }

    fn line_height(&self) -> i32 {
        10
    }

    fn text_width(&self, text: &str) -> i32 {
        i32::try_from(text.chars().count()).unwrap_or(i32::MAX / 6) * 6
    }

    fn open(&mut self, _x: i32, _y: i32, _width: i32, keyboard: bool) -> Result<bool> {
        self.keyboard = keyboard;
        if !self.grab_fails {
            self.cursors.push(MenuCursor::Question);
        }
        Ok(!self.grab_fails)
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn set_cursor(&mut self, cursor: MenuCursor) -> Result<()> {
        self.cursors.push(cursor);
        Ok(())
    }

    fn draw(&mut self, frame: &MenuFrame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn draw_row(&mut self, _width: i32, row: usize, text: &str, inverted: bool) -> Result<()> {
        self.rows_drawn.push((row, text.to_string(), inverted));
        Ok(())
    }

    fn next_event(&mut self) -> Result<MenuEvent> {
        match self.events.pop_front() {
            Some(event) => Ok(event),
            None => bail!("menu script exhausted"),
        }
    }
}
