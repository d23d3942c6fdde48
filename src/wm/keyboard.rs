//! Keyboard Module
//!
//! Modifier masks, the keysyms the window manager cares about, the
//! keycode-to-keysym table, the menu's control-key table and the global
//! key bindings.

use std::collections::HashMap;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use bitflags::bitflags;
use tracing::{debug, warn};

use crate::config::KeyBindingConfig;
use crate::wm::client_flags::MoveDirection;

bitflags! {
    /// X11 key/button state mask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct KeyModifiers: u16 {
        const SHIFT   = 1 << 0;
        const LOCK    = 1 << 1;
        const CONTROL = 1 << 2;
        const MOD1    = 1 << 3;
        const MOD2    = 1 << 4;
        const MOD4    = 1 << 6;
    }
}

impl KeyModifiers {
    /// Modifiers that take part in binding lookups; Lock and NumLock don't.
    pub fn significant(self) -> Self {
        self & (Self::SHIFT | Self::CONTROL | Self::MOD1 | Self::MOD4)
    }

    /// Lock/NumLock combinations a grab must also cover.
    pub fn lock_variants(self) -> [Self; 4] {
        [
            self,
            self | Self::LOCK,
            self | Self::MOD2,
            self | Self::LOCK | Self::MOD2,
        ]
    }
}

pub type Keysym = u32;

pub mod keysym {
    use super::Keysym;

    pub const SPACE: Keysym = 0x0020;
    pub const SLASH: Keysym = 0x002f;
    pub const EQUAL: Keysym = 0x003d;
    pub const BACKSPACE: Keysym = 0xff08;
    pub const TAB: Keysym = 0xff09;
    pub const RETURN: Keysym = 0xff0d;
    pub const ESCAPE: Keysym = 0xff1b;
    pub const LEFT: Keysym = 0xff51;
    pub const UP: Keysym = 0xff52;
    pub const RIGHT: Keysym = 0xff53;
    pub const DOWN: Keysym = 0xff54;
    pub const CONTROL_L: Keysym = 0xffe3;
    pub const CONTROL_R: Keysym = 0xffe4;
    pub const ALT_L: Keysym = 0xffe9;
    pub const ALT_R: Keysym = 0xffea;
    pub const SUPER_L: Keysym = 0xffeb;
    pub const SUPER_R: Keysym = 0xffec;
    pub const DELETE: Keysym = 0xffff;
}

/// Releasing one of these ends an interactive cycle.
pub fn is_cycle_modifier(sym: Keysym) -> bool {
    matches!(
        sym,
        keysym::ALT_L
            | keysym::ALT_R
            | keysym::SUPER_L
            | keysym::SUPER_R
            | keysym::CONTROL_L
            | keysym::CONTROL_R
    )
}

/// Resolve a key name as written in the configuration file.
pub fn keysym_from_name(name: &str) -> Option<Keysym> {
    let sym = match name {
        "space" => keysym::SPACE,
        "slash" => keysym::SLASH,
        "equal" => keysym::EQUAL,
        "BackSpace" => keysym::BACKSPACE,
        "Tab" => keysym::TAB,
        "Return" => keysym::RETURN,
        "Escape" => keysym::ESCAPE,
        "Left" => keysym::LEFT,
        "Up" => keysym::UP,
        "Right" => keysym::RIGHT,
        "Down" => keysym::DOWN,
        "Delete" => keysym::DELETE,
        _ => {
            let mut chars = name.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_ascii_graphic() => c.to_ascii_lowercase() as Keysym,
                _ => return None,
            }
        }
    };
    Some(sym)
}

/// Keycode to keysym table from GetKeyboardMapping
#[derive(Debug, Clone, Default)]
pub struct KeyboardMap {
    min_keycode: u8,
    per_keycode: usize,
    keysyms: Vec<Keysym>,
}

impl KeyboardMap {
    pub fn new(min_keycode: u8, per_keycode: u8, keysyms: Vec<Keysym>) -> Self {
        Self {
            min_keycode,
            per_keycode: usize::from(per_keycode),
            keysyms,
        }
    }

    /// Keysym in `column` (0 plain, 1 shifted) of a keycode.
    ///
    /// A missing shifted symbol falls back to the plain one, uppercased for
    /// Latin letters as Xlib does.
    pub fn keysym(&self, keycode: u8, column: usize) -> Keysym {
        if keycode < self.min_keycode || self.per_keycode == 0 {
            return 0;
        }
        let base = usize::from(keycode - self.min_keycode) * self.per_keycode;
        let lookup = |col: usize| {
            if col < self.per_keycode {
                self.keysyms.get(base + col).copied().unwrap_or(0)
            } else {
                0
            }
        };

        match lookup(column) {
            0 if column == 1 => {
                let plain = lookup(0);
                match u8::try_from(plain) {
                    Ok(b) if b.is_ascii_lowercase() => Keysym::from(b.to_ascii_uppercase()),
                    _ => plain,
                }
            }
            sym => sym,
        }
    }

    /// Keysym for a key event, honouring Shift.
    pub fn lookup(&self, keycode: u8, state: KeyModifiers) -> Keysym {
        let column = usize::from(state.contains(KeyModifiers::SHIFT));
        self.keysym(keycode, column)
    }

    /// Every keycode producing `sym` in the plain column.
    pub fn keycodes_for(&self, sym: Keysym) -> Vec<u8> {
        if self.per_keycode == 0 {
            return Vec::new();
        }
        self.keysyms
            .chunks(self.per_keycode)
            .enumerate()
            .filter(|(_, syms)| syms.first() == Some(&sym))
            .filter_map(|(i, _)| u8::try_from(usize::from(self.min_keycode) + i).ok())
            .collect()
    }
}

/// Menu editing commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuControl {
    EraseOne,
    Wipe,
    Up,
    Down,
    Return,
    Abort,
    All,
}

/// What a key press means to the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    Control(MenuControl),
    Char(char),
}

/// Translate a key press for the menu.
///
/// Plain control keys come first, then Emacs-style Control chords, then
/// vi-style Alt chords; anything else must be a printable Latin-1 symbol.
pub fn menu_key(sym: Keysym, state: KeyModifiers) -> Option<MenuKey> {
    let plain = match sym {
        keysym::BACKSPACE => Some(MenuControl::EraseOne),
        keysym::RETURN => Some(MenuControl::Return),
        keysym::UP => Some(MenuControl::Up),
        keysym::DOWN => Some(MenuControl::Down),
        keysym::ESCAPE => Some(MenuControl::Abort),
        _ => None,
    };

    let letter = u8::try_from(sym).ok().map(|b| b.to_ascii_lowercase());

    let control = plain
        .or_else(|| {
            if !state.contains(KeyModifiers::CONTROL) {
                return None;
            }
            match letter? {
                b's' => Some(MenuControl::Down),
                b'r' => Some(MenuControl::Up),
                b'u' => Some(MenuControl::Wipe),
                b'h' => Some(MenuControl::EraseOne),
                b'a' => Some(MenuControl::All),
                _ => None,
            }
        })
        .or_else(|| {
            if !state.contains(KeyModifiers::MOD1) {
                return None;
            }
            match letter? {
                b'j' => Some(MenuControl::Down),
                b'k' => Some(MenuControl::Up),
                _ => None,
            }
        });

    if let Some(control) = control {
        return Some(MenuKey::Control(control));
    }

    match sym {
        0x20..=0x7e | 0xa0..=0xff => char::from_u32(sym).map(MenuKey::Char),
        _ => None,
    }
}

/// Keyboard shortcut action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardAction {
    Cycle,
    ReverseCycle,
    CycleInGroup,
    ReverseCycleInGroup,
    Maximize,
    VertMaximize,
    HorizMaximize,
    Hide,
    Close,
    Raise,
    Lower,
    ToggleFreeze,
    SearchWindows,
    Move(MoveDirection, i32),
    Resize(MoveDirection, i32),
}

/// Pixels per keyboard move step, and with Shift
pub const MOVE_STEP: i32 = 1;
pub const BIG_MOVE_STEP: i32 = 10;

impl FromStr for KeyboardAction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let action = match s {
            "cycle" => Self::Cycle,
            "rcycle" => Self::ReverseCycle,
            "cycleingroup" => Self::CycleInGroup,
            "rcycleingroup" => Self::ReverseCycleInGroup,
            "maximize" => Self::Maximize,
            "vmaximize" => Self::VertMaximize,
            "hmaximize" => Self::HorizMaximize,
            "hide" => Self::Hide,
            "delete" => Self::Close,
            "raise" => Self::Raise,
            "lower" => Self::Lower,
            "freeze" => Self::ToggleFreeze,
            "search" => Self::SearchWindows,
            _ => return parse_move_action(s).ok_or_else(|| anyhow!("unknown action '{s}'")),
        };
        Ok(action)
    }
}

fn parse_move_action(s: &str) -> Option<KeyboardAction> {
    let (big, rest) = match s.strip_prefix("big") {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let step = if big { BIG_MOVE_STEP } else { MOVE_STEP };

    let (resize, dir) = if let Some(dir) = rest.strip_prefix("move") {
        (false, dir)
    } else if let Some(dir) = rest.strip_prefix("resize") {
        (true, dir)
    } else {
        return None;
    };

    let direction = match dir {
        "up" => MoveDirection::UP,
        "down" => MoveDirection::DOWN,
        "left" => MoveDirection::LEFT,
        "right" => MoveDirection::RIGHT,
        _ => return None,
    };

    Some(if resize {
        KeyboardAction::Resize(direction, step)
    } else {
        KeyboardAction::Move(direction, step)
    })
}

/// Key binding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBinding {
    pub modifiers: KeyModifiers,
    pub keysym: Keysym,
    pub action: KeyboardAction,
}

impl KeyBinding {
    fn new(modifiers: KeyModifiers, keysym: Keysym, action: KeyboardAction) -> Self {
        Self {
            modifiers,
            keysym,
            action,
        }
    }

    /// Build a binding from its configuration form.
    pub fn from_config(config: &KeyBindingConfig) -> Result<Self> {
        let mut modifiers = KeyModifiers::empty();
        for name in &config.modifiers {
            modifiers |= match name.to_ascii_lowercase().as_str() {
                "shift" => KeyModifiers::SHIFT,
                "control" | "ctrl" => KeyModifiers::CONTROL,
                "mod1" | "alt" => KeyModifiers::MOD1,
                "mod4" | "super" => KeyModifiers::MOD4,
                other => bail!("unknown modifier '{other}'"),
            };
        }
        let keysym = keysym_from_name(&config.key)
            .with_context(|| format!("unknown key '{}'", config.key))?;
        let action = config.action.parse()?;
        Ok(Self::new(modifiers, keysym, action))
    }
}

/// Built-in key table
pub fn default_bindings() -> Vec<KeyBinding> {
    use KeyboardAction as A;
    use MoveDirection as D;

    let m = KeyModifiers::MOD1;
    let ms = KeyModifiers::MOD1 | KeyModifiers::SHIFT;
    let cm = KeyModifiers::CONTROL | KeyModifiers::MOD1;
    let cms = cm | KeyModifiers::SHIFT;
    let s = KeyModifiers::MOD4;
    let ss = KeyModifiers::MOD4 | KeyModifiers::SHIFT;

    let mut bindings = vec![
        KeyBinding::new(m, keysym::TAB, A::Cycle),
        KeyBinding::new(ms, keysym::TAB, A::ReverseCycle),
        KeyBinding::new(s, keysym::TAB, A::CycleInGroup),
        KeyBinding::new(ss, keysym::TAB, A::ReverseCycleInGroup),
        KeyBinding::new(cm, b'f'.into(), A::Maximize),
        KeyBinding::new(cm, keysym::EQUAL, A::VertMaximize),
        KeyBinding::new(cms, keysym::EQUAL, A::HorizMaximize),
        KeyBinding::new(m, keysym::RETURN, A::Hide),
        KeyBinding::new(cm, b'x'.into(), A::Close),
        KeyBinding::new(m, keysym::UP, A::Raise),
        KeyBinding::new(m, keysym::DOWN, A::Lower),
        KeyBinding::new(cm, b'z'.into(), A::ToggleFreeze),
        KeyBinding::new(m, keysym::SLASH, A::SearchWindows),
    ];

    for (key, dir) in [(b'h', D::LEFT), (b'j', D::DOWN), (b'k', D::UP), (b'l', D::RIGHT)] {
        let sym = Keysym::from(key);
        bindings.push(KeyBinding::new(m, sym, A::Move(dir, MOVE_STEP)));
        bindings.push(KeyBinding::new(ms, sym, A::Move(dir, BIG_MOVE_STEP)));
        bindings.push(KeyBinding::new(cm, sym, A::Resize(dir, MOVE_STEP)));
        bindings.push(KeyBinding::new(cms, sym, A::Resize(dir, BIG_MOVE_STEP)));
    }

    bindings
}

/// Active key bindings, looked up by (modifiers, keysym)
#[derive(Debug, Clone, Default)]
pub struct KeyboardManager {
    bindings: HashMap<(KeyModifiers, Keysym), KeyboardAction>,
}

impl KeyboardManager {
    /// Built-in table with the configured bindings layered on top.
    /// Invalid entries are skipped with a warning.
    pub fn new(overrides: &[KeyBindingConfig]) -> Self {
        let mut manager = Self::default();
        for binding in default_bindings() {
            manager.add_binding(binding);
        }
        for config in overrides {
            match KeyBinding::from_config(config) {
                Ok(binding) => manager.add_binding(binding),
                Err(e) => warn!("Ignoring key binding {:?}: {:#}", config, e),
            }
        }
        manager
    }

    pub fn add_binding(&mut self, binding: KeyBinding) {
        debug!(
            "Binding modifiers={:?} keysym=0x{:x} to {:?}",
            binding.modifiers, binding.keysym, binding.action
        );
        self.bindings
            .insert((binding.modifiers, binding.keysym), binding.action);
    }

    pub fn lookup(&self, state: KeyModifiers, sym: Keysym) -> Option<KeyboardAction> {
        self.bindings.get(&(state.significant(), sym)).copied()
    }

    pub fn bindings(&self) -> impl Iterator<Item = (KeyModifiers, Keysym)> + '_ {
        self.bindings.keys().copied()
    }
}
