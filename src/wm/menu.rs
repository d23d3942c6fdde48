//! Menu Module
//!
//! A small modal menu: the caller hands over a set of entries and a
//! [`MenuMatcher`], the user filters them by typing and picks one with the
//! keyboard or the pointer. [`menu_filter`] blocks until a choice is made.
//!
//! Drawing and input go through a [`MenuSurface`], so the loop itself never
//! touches the window system.

use anyhow::Result;
use tracing::{debug, warn};

use crate::wm::keyboard::{KeyModifiers, Keysym, MenuControl, MenuKey, menu_key};
use crate::wm::screen::Screen;

/// Longest entry text and search string, in characters
pub const MENU_MAX_ENTRY: usize = 50;

const PROMPT_START: &str = "»";
const PROMPT_END: &str = "«";

fn truncate(text: &str) -> String {
    text.chars().take(MENU_MAX_ENTRY).collect()
}

/// One selectable line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MenuEntry {
    pub text: String,
    /// Precomputed display text, shown instead of `text` when set
    pub display: Option<String>,
    /// Synthesized by the menu rather than picked from the caller's set
    pub dummy: bool,
    pub abort: bool,
}

impl MenuEntry {
    pub fn new(text: &str) -> Self {
        Self {
            text: truncate(text),
            ..Self::default()
        }
    }

    fn typed(text: &str) -> Self {
        Self {
            text: truncate(text),
            dummy: true,
            ..Self::default()
        }
    }

    fn aborted() -> Self {
        Self {
            dummy: true,
            abort: true,
            ..Self::default()
        }
    }

    pub fn label(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.text)
    }
}

/// Filtering and rendering strategy for one menu invocation
pub trait MenuMatcher {
    /// Indices into `entries` matching `search`, in display order.
    fn filter(&self, entries: &[MenuEntry], search: &str) -> Vec<usize>;

    /// Row text for `entries[index]`; `listing` is true while the whole
    /// set is shown. `None` falls back to the entry's own label.
    fn render(&self, _index: usize, _entry: &MenuEntry, _listing: bool) -> Option<String> {
        None
    }
}

/// How the menu ended
#[derive(Debug, PartialEq, Eq)]
pub enum MenuResult<'a> {
    Selected { index: usize, entry: &'a MenuEntry },
    /// Free text typed by the user (possibly empty)
    Typed(MenuEntry),
    Aborted(MenuEntry),
}

impl MenuResult<'_> {
    pub fn entry(&self) -> &MenuEntry {
        match self {
            Self::Selected { entry, .. } => entry,
            Self::Typed(entry) | Self::Aborted(entry) => entry,
        }
    }
}

/// Input the menu reacts to, with coordinates relative to the menu window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuEvent {
    Key { keysym: Keysym, modifiers: KeyModifiers },
    Motion { x: i32, y: i32 },
    ButtonRelease { x: i32, y: i32 },
    Expose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCursor {
    /// Pointer over nothing selectable
    Idle,
    /// Pointer over an entry
    Select,
    /// While the menu holds the pointer grab
    Question,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuLine {
    pub text: String,
    pub inverted: bool,
}

/// Everything needed to paint the menu window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuFrame {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub line_height: i32,
    pub lines: Vec<MenuLine>,
}

/// The menu window and its event source
pub trait MenuSurface {
    /// Pointer position in root coordinates.
    fn pointer_position(&mut self) -> Result<(i32, i32)>;
    fn warp_pointer(&mut self, x: i32, y: i32) -> Result<()>;

    fn line_height(&self) -> i32;
    fn text_width(&self, text: &str) -> i32;

    /// Map the window at (`x`, `y`) and take the pointer (and, with
    /// `keyboard`, the keyboard and focus). Returns false if the pointer
    /// could not be grabbed.
    fn open(&mut self, x: i32, y: i32, width: i32, keyboard: bool) -> Result<bool>;
    /// Give focus and grabs back and unmap.
    fn close(&mut self) -> Result<()>;

    fn set_cursor(&mut self, cursor: MenuCursor) -> Result<()>;
    fn draw(&mut self, frame: &MenuFrame) -> Result<()>;
    /// Repaint a single row of the current frame.
    fn draw_row(&mut self, width: i32, row: usize, text: &str, inverted: bool) -> Result<()>;

    /// Block until the next menu event.
    fn next_event(&mut self) -> Result<MenuEvent>;
}

/// Options of one menu invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct MenuOptions<'a> {
    /// Without a prompt the menu takes no keyboard input and lists everything
    pub prompt: Option<&'a str>,
    pub initial: Option<&'a str>,
    /// Return typed text (and aborts) instead of nothing
    pub allow_typed: bool,
}

struct MenuSession<'a> {
    entries: &'a [MenuEntry],
    matcher: &'a dyn MenuMatcher,

    search: String,
    prompt: Option<String>,
    display: String,
    list: bool,
    listing: bool,
    changed: bool,
    no_result: bool,
    prev: Option<usize>,
    entry: Option<usize>,
    width: i32,
    num: usize,
    x: i32,
    y: i32,

    results: Vec<usize>,
    rows: Vec<String>,
}

impl<'a> MenuSession<'a> {
    fn new(
        entries: &'a [MenuEntry],
        matcher: &'a dyn MenuMatcher,
        options: &MenuOptions<'_>,
        origin: (i32, i32),
    ) -> Self {
        let prompt = options.prompt.map(|p| format!("{p}{PROMPT_START}"));
        let search = options.initial.map(truncate).unwrap_or_default();
        Self {
            entries,
            matcher,
            list: prompt.is_none(),
            display: prompt
                .as_deref()
                .map(|p| format!("{p}{search}{PROMPT_END}"))
                .unwrap_or_default(),
            prompt,
            search,
            listing: false,
            changed: false,
            no_result: false,
            prev: None,
            entry: None,
            width: 0,
            num: 0,
            x: origin.0,
            y: origin.1,
            results: Vec::new(),
            rows: Vec::new(),
        }
    }

    fn has_prompt(&self) -> bool {
        self.prompt.is_some()
    }

    fn prompt_rows(&self) -> usize {
        usize::from(self.has_prompt())
    }

    /// Apply a key press. Returns a result when the key ends the menu.
    fn handle_key(&mut self, key: MenuKey) -> Option<MenuOutcome> {
        match key {
            MenuKey::Control(MenuControl::EraseOne) => {
                if self.search.pop().is_some() {
                    self.changed = true;
                }
            }
            MenuKey::Control(MenuControl::Up) => {
                if !self.results.is_empty() {
                    self.results.rotate_right(1);
                }
            }
            MenuKey::Control(MenuControl::Down) => {
                if !self.results.is_empty() {
                    self.results.rotate_left(1);
                }
            }
            MenuKey::Control(MenuControl::Return) => {
                return Some(match self.results.first() {
                    Some(&index) => MenuOutcome::Selected(index),
                    None => MenuOutcome::Typed(self.search.clone()),
                });
            }
            MenuKey::Control(MenuControl::Wipe) => {
                self.search.clear();
                self.changed = true;
            }
            MenuKey::Control(MenuControl::All) => self.list = !self.list,
            MenuKey::Control(MenuControl::Abort) => return Some(MenuOutcome::Aborted),
            // without a prompt there is nowhere to show typed text
            MenuKey::Char(_) if !self.has_prompt() => return None,
            MenuKey::Char(c) => {
                if self.search.chars().count() < MENU_MAX_ENTRY {
                    self.search.push(c);
                }
                self.changed = true;
            }
        }

        self.no_result = false;
        if self.changed && !self.search.is_empty() {
            let count = self.entries.len();
            self.results = self.matcher.filter(self.entries, &self.search);
            self.results.retain(|&index| index < count);
            // an empty source set never counts as a failed search
            self.no_result = self.results.is_empty() && !self.entries.is_empty();
        } else if self.changed {
            self.results.clear();
        }

        if !self.list && self.listing && !self.changed {
            self.results.clear();
            self.listing = false;
        }

        None
    }

    fn row_text(&self, index: usize) -> String {
        let entry = &self.entries[index];
        let text = self
            .matcher
            .render(index, entry, self.listing)
            .unwrap_or_else(|| entry.label().to_string());
        truncate(&text)
    }

    /// Lay the menu out and paint it.
    fn draw<S: MenuSurface>(&mut self, surface: &mut S, screen: &Screen) -> Result<()> {
        if self.list {
            if self.results.is_empty() {
                self.results = (0..self.entries.len()).collect();
                self.listing = true;
            } else if self.changed {
                self.listing = false;
            }
        }

        let line_height = surface.line_height();
        self.num = 0;
        self.width = 0;
        let mut dy = 0;

        if let Some(prompt) = &self.prompt {
            self.display = format!("{prompt}{}{PROMPT_END}", self.search);
            self.width = surface.text_width(&self.display);
            dy = line_height;
            self.num = 1;
        }

        self.rows = self.results.iter().map(|&i| self.row_text(i)).collect();
        for row in &self.rows {
            self.width = self.width.max(surface.text_width(row));
            dy += line_height;
            self.num += 1;
        }

        let bounds = screen.bounds_at(self.x, self.y);
        let (xsave, ysave) = (self.x, self.y);

        if self.x < bounds.left {
            self.x = bounds.left;
        } else if self.x + self.width >= bounds.right {
            self.x = bounds.right - self.width;
        }

        if self.y + dy >= bounds.bottom {
            self.y = bounds.bottom - dy;
        }
        // never hide the top of the menu
        if self.y < bounds.top {
            self.y = bounds.top;
            dy = bounds.height();
        }

        if self.x != xsave || self.y != ysave {
            surface.warp_pointer(self.x, self.y)?;
        }

        let highlight_first =
            self.has_prompt() && !self.results.is_empty() && !self.search.is_empty();

        let mut lines = Vec::with_capacity(self.num);
        if self.has_prompt() {
            lines.push(MenuLine {
                text: self.display.clone(),
                inverted: self.no_result,
            });
        }
        lines.extend(self.rows.iter().enumerate().map(|(i, text)| MenuLine {
            text: text.clone(),
            inverted: highlight_first && i == 0,
        }));

        surface.draw(&MenuFrame {
            x: self.x,
            y: self.y,
            width: self.width,
            height: dy,
            line_height,
            lines,
        })
    }

    /// Window row under a point, prompt row excluded.
    fn calc_entry(&self, x: i32, y: i32, line_height: i32) -> Option<usize> {
        if line_height <= 0 || x <= 0 || x > self.width || y <= 0 {
            return None;
        }
        let num = i32::try_from(self.num).ok()?;
        if y > line_height * num {
            return None;
        }
        let row = usize::try_from(y / line_height).ok()?;
        if row >= self.num || (self.has_prompt() && row == 0) {
            return None;
        }
        Some(row)
    }

    fn row_label(&self, row: usize) -> Option<&str> {
        row.checked_sub(self.prompt_rows())
            .and_then(|i| self.rows.get(i))
            .map(String::as_str)
    }

    fn handle_motion<S: MenuSurface>(&mut self, surface: &mut S, x: i32, y: i32) -> Result<()> {
        self.prev = self.entry;
        self.entry = self.calc_entry(x, y, surface.line_height());

        if let Some(prev) = self.prev {
            if let Some(text) = self.row_label(prev) {
                surface.draw_row(self.width, prev, text, false)?;
            }
        }
        match self.entry {
            Some(row) => {
                surface.set_cursor(MenuCursor::Select)?;
                if let Some(text) = self.row_label(row) {
                    surface.draw_row(self.width, row, text, true)?;
                }
            }
            None => surface.set_cursor(MenuCursor::Idle)?,
        }
        Ok(())
    }

    fn handle_release(&self, x: i32, y: i32, line_height: i32) -> MenuOutcome {
        self.calc_entry(x, y, line_height)
            .and_then(|row| row.checked_sub(self.prompt_rows()))
            .and_then(|i| self.results.get(i))
            .map(|&index| MenuOutcome::Selected(index))
            .unwrap_or(MenuOutcome::Typed(String::new()))
    }
}

enum MenuOutcome {
    Selected(usize),
    Typed(String),
    Aborted,
}

/// Run the menu until the user picks something.
///
/// Returns `Ok(None)` when the pointer could not be grabbed, or when the
/// user typed free text or aborted and `allow_typed` is off.
pub fn menu_filter<'e, S: MenuSurface>(
    surface: &mut S,
    screen: &Screen,
    entries: &'e [MenuEntry],
    matcher: &dyn MenuMatcher,
    options: MenuOptions<'_>,
) -> Result<Option<MenuResult<'e>>> {
    let origin = surface.pointer_position()?;
    let mut session = MenuSession::new(entries, matcher, &options, origin);

    let width = if session.has_prompt() {
        surface.text_width(&session.display)
    } else {
        0
    };
    if !surface.open(origin.0, origin.1, width, session.has_prompt())? {
        debug!("Menu could not grab the pointer");
        return Ok(None);
    }

    let outcome = run(surface, screen, &mut session);

    // put the pointer back unless the user moved it
    let restored = surface.pointer_position().and_then(|current| {
        if current == (session.x, session.y) {
            surface.warp_pointer(origin.0, origin.1)
        } else {
            Ok(())
        }
    });
    surface.close()?;
    restored?;

    let result = match outcome? {
        MenuOutcome::Selected(index) => match entries.get(index) {
            Some(entry) => MenuResult::Selected { index, entry },
            None => {
                warn!("Menu selected missing entry {}", index);
                return Ok(None);
            }
        },
        MenuOutcome::Typed(text) => MenuResult::Typed(MenuEntry::typed(&text)),
        MenuOutcome::Aborted => MenuResult::Aborted(MenuEntry::aborted()),
    };

    if !options.allow_typed && result.entry().dummy {
        return Ok(None);
    }
    debug!("Menu returned {:?}", result.entry().text);
    Ok(Some(result))
}

fn run<S: MenuSurface>(
    surface: &mut S,
    screen: &Screen,
    session: &mut MenuSession<'_>,
) -> Result<MenuOutcome> {
    loop {
        session.changed = false;

        match surface.next_event()? {
            MenuEvent::Key { keysym, modifiers } => {
                if let Some(key) = menu_key(keysym, modifiers) {
                    if let Some(outcome) = session.handle_key(key) {
                        return Ok(outcome);
                    }
                }
                session.draw(surface, screen)?;
            }
            MenuEvent::Expose => session.draw(surface, screen)?,
            MenuEvent::Motion { x, y } => session.handle_motion(surface, x, y)?,
            MenuEvent::ButtonRelease { x, y } => {
                return Ok(session.handle_release(x, y, surface.line_height()));
            }
        }
    }
}
