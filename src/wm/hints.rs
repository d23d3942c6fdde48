//! Hints Module
//!
//! ICCCM hint decoding (XSizeHints, XWMHints, MWM hints), size-hint
//! normalization and the ICCCM 4.1.2.3 resize adjustment.

use crate::shared::Geometry;
use crate::wm::client::ClientState;
use crate::wm::client_flags::SizeHintFlags;

/// Size hints as the client wrote them (XSizeHints equivalent)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSizeHints {
    pub flags: SizeHintFlags,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect_num: i32,
    pub min_aspect_den: i32,
    pub max_aspect_num: i32,
    pub max_aspect_den: i32,
    pub base_width: i32,
    pub base_height: i32,
    pub win_gravity: u32,
}

impl RawSizeHints {
    /// Hints used when the window has no WM_NORMAL_HINTS at all.
    pub fn absent() -> Self {
        Self {
            flags: SizeHintFlags::P_SIZE,
            ..Self::default()
        }
    }

    /// Decode the WM_NORMAL_HINTS property (up to 18 CARD32 values).
    ///
    /// Pre-ICCCM clients write only 15 values; base size and gravity are
    /// then left at zero.
    pub fn from_property(values: &[u32]) -> Option<Self> {
        if values.len() < 15 {
            return None;
        }
        let get = |i: usize| values.get(i).copied().unwrap_or(0) as i32;
        Some(Self {
            flags: SizeHintFlags::from_bits_truncate(values[0]),
            x: get(1),
            y: get(2),
            width: get(3),
            height: get(4),
            min_width: get(5),
            min_height: get(6),
            max_width: get(7),
            max_height: get(8),
            width_inc: get(9),
            height_inc: get(10),
            min_aspect_num: get(11),
            min_aspect_den: get(12),
            max_aspect_num: get(13),
            max_aspect_den: get(14),
            base_width: get(15),
            base_height: get(16),
            win_gravity: values.get(17).copied().unwrap_or(0),
        })
    }

    /// Whether the client asked for a specific position.
    pub fn has_position(&self) -> bool {
        self.flags
            .intersects(SizeHintFlags::US_POSITION | SizeHintFlags::P_POSITION)
    }
}

/// Normalized size constraints derived from [`RawSizeHints`]
///
/// Aspect ratios are stored as height/width bounds; 0.0 means unset.
/// A max of 0 means unbounded on that axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeConstraints {
    pub base_width: i32,
    pub base_height: i32,
    pub min_width: i32,
    pub min_height: i32,
    pub max_width: i32,
    pub max_height: i32,
    pub width_inc: i32,
    pub height_inc: i32,
    pub min_aspect: f32,
    pub max_aspect: f32,
}

impl Default for SizeConstraints {
    fn default() -> Self {
        Self {
            base_width: 0,
            base_height: 0,
            min_width: 0,
            min_height: 0,
            max_width: 0,
            max_height: 0,
            width_inc: 1,
            height_inc: 1,
            min_aspect: 0.0,
            max_aspect: 0.0,
        }
    }
}

impl SizeConstraints {
    /// Derive constraints from raw hints.
    ///
    /// Base falls back to min and min falls back to base; increments are
    /// clamped to at least one pixel.
    pub fn normalize(raw: &RawSizeHints) -> Self {
        let mut hint = Self::default();
        let flags = raw.flags;

        if flags.contains(SizeHintFlags::P_BASE_SIZE) {
            hint.base_width = raw.base_width;
            hint.base_height = raw.base_height;
        } else if flags.contains(SizeHintFlags::P_MIN_SIZE) {
            hint.base_width = raw.min_width;
            hint.base_height = raw.min_height;
        }

        if flags.contains(SizeHintFlags::P_MIN_SIZE) {
            hint.min_width = raw.min_width;
            hint.min_height = raw.min_height;
        } else if flags.contains(SizeHintFlags::P_BASE_SIZE) {
            hint.min_width = raw.base_width;
            hint.min_height = raw.base_height;
        }

        if flags.contains(SizeHintFlags::P_MAX_SIZE) {
            hint.max_width = raw.max_width;
            hint.max_height = raw.max_height;
        }

        if flags.contains(SizeHintFlags::P_RESIZE_INC) {
            hint.width_inc = raw.width_inc;
            hint.height_inc = raw.height_inc;
        }
        hint.width_inc = hint.width_inc.max(1);
        hint.height_inc = hint.height_inc.max(1);

        if flags.contains(SizeHintFlags::P_ASPECT) {
            if raw.min_aspect_num > 0 {
                hint.min_aspect = raw.min_aspect_den as f32 / raw.min_aspect_num as f32;
            }
            if raw.max_aspect_den > 0 {
                hint.max_aspect = raw.max_aspect_num as f32 / raw.max_aspect_den as f32;
            }
        }

        hint
    }

    /// Adjust width and height per ICCCM 4.1.2.3.
    ///
    /// Increments are rounded after the aspect clamp and before the base
    /// size is added back.
    pub fn apply(&self, geometry: &Geometry) -> Geometry {
        let mut geom = *geometry;
        let base_is_min =
            self.base_width == self.min_width && self.base_height == self.min_height;

        // temporarily remove base dimensions
        if !base_is_min {
            geom.width -= self.base_width;
            geom.height -= self.base_height;
        }

        // aspect limits
        if self.min_aspect > 0.0 && self.max_aspect > 0.0 {
            if self.max_aspect < geom.width as f32 / geom.height as f32 {
                geom.width = (geom.height as f32 * self.max_aspect) as i32;
            } else if self.min_aspect < geom.height as f32 / geom.width as f32 {
                geom.height = (geom.width as f32 * self.min_aspect) as i32;
            }
        }

        // remove base dimensions for increment
        if base_is_min {
            geom.width -= self.base_width;
            geom.height -= self.base_height;
        }

        geom.width -= geom.width % self.width_inc;
        geom.height -= geom.height % self.height_inc;

        geom.width += self.base_width;
        geom.height += self.base_height;

        geom.width = geom.width.max(self.min_width);
        geom.height = geom.height.max(self.min_height);

        if self.max_width > 0 {
            geom.width = geom.width.min(self.max_width);
        }
        if self.max_height > 0 {
            geom.height = geom.height.min(self.max_height);
        }

        geom
    }
}

/// WM hints (XWMHints equivalent), reduced to what the manager consumes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WmHints {
    pub flags: u32,
    pub input: bool,
    pub initial_state: u32,
    pub window_group: Option<u32>,
}

impl WmHints {
    const INPUT_HINT: u32 = 1 << 0;
    const STATE_HINT: u32 = 1 << 1;
    const WINDOW_GROUP_HINT: u32 = 1 << 6;
    const URGENCY_HINT: u32 = 1 << 8;

    /// Decode the WM_HINTS property (9 CARD32 values).
    pub fn from_property(values: &[u32]) -> Option<Self> {
        if values.len() < 9 {
            return None;
        }
        let flags = values[0];
        Some(Self {
            flags,
            input: flags & Self::INPUT_HINT == 0 || values[1] != 0,
            initial_state: values[2],
            window_group: (flags & Self::WINDOW_GROUP_HINT != 0 && values[8] != 0)
                .then_some(values[8]),
        })
    }

    /// The state the client wants to start in, if it said.
    pub fn initial_state(&self) -> Option<ClientState> {
        if self.flags & Self::STATE_HINT == 0 {
            return None;
        }
        ClientState::from_wire(self.initial_state)
    }

    pub fn is_urgent(&self) -> bool {
        self.flags & Self::URGENCY_HINT != 0
    }
}

/// MOTIF WM Hints structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotifWmHints {
    pub flags: u32,
    pub functions: u32,
    pub decorations: u32,
}

impl MotifWmHints {
    pub const ELEMENTS: usize = 5;
    pub const HINTS_DECORATIONS: u32 = 1 << 1;
    pub const DECOR_ALL: u32 = 1 << 0;
    pub const DECOR_BORDER: u32 = 1 << 1;

    /// Decode _MOTIF_WM_HINTS; anything shorter than the full record is ignored.
    pub fn from_property(values: &[u32]) -> Option<Self> {
        if values.len() < Self::ELEMENTS {
            return None;
        }
        Some(Self {
            flags: values[0],
            functions: values[1],
            decorations: values[2],
        })
    }

    /// True when the client asked for decorations that include no border.
    pub fn wants_no_border(&self) -> bool {
        self.flags & Self::HINTS_DECORATIONS != 0
            && self.decorations & Self::DECOR_ALL == 0
            && self.decorations & Self::DECOR_BORDER == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terminal_hints() -> RawSizeHints {
        RawSizeHints {
            flags: SizeHintFlags::P_MIN_SIZE
                | SizeHintFlags::P_BASE_SIZE
                | SizeHintFlags::P_RESIZE_INC,
            min_width: 25,
            min_height: 28,
            base_width: 4,
            base_height: 2,
            width_inc: 7,
            height_inc: 13,
            ..RawSizeHints::default()
        }
    }

    #[test]
    fn test_normalize_falls_back_between_base_and_min() {
        let only_min = RawSizeHints {
            flags: SizeHintFlags::P_MIN_SIZE,
            min_width: 40,
            min_height: 30,
            ..RawSizeHints::default()
        };
        let hint = SizeConstraints::normalize(&only_min);
        assert_eq!((hint.base_width, hint.base_height), (40, 30));
        assert_eq!((hint.min_width, hint.min_height), (40, 30));

        let only_base = RawSizeHints {
            flags: SizeHintFlags::P_BASE_SIZE,
            base_width: 10,
            base_height: 12,
            ..RawSizeHints::default()
        };
        let hint = SizeConstraints::normalize(&only_base);
        assert_eq!((hint.min_width, hint.min_height), (10, 12));
        assert_eq!((hint.width_inc, hint.height_inc), (1, 1));
        assert_eq!((hint.max_width, hint.max_height), (0, 0));
    }

    #[test]
    fn test_normalize_clamps_increment_and_aspect() {
        let raw = RawSizeHints {
            flags: SizeHintFlags::P_RESIZE_INC | SizeHintFlags::P_ASPECT,
            width_inc: 0,
            height_inc: -3,
            min_aspect_num: 2,
            min_aspect_den: 1,
            max_aspect_num: 0,
            max_aspect_den: 0,
            ..RawSizeHints::default()
        };
        let hint = SizeConstraints::normalize(&raw);
        assert_eq!((hint.width_inc, hint.height_inc), (1, 1));
        assert_eq!(hint.min_aspect, 0.5);
        assert_eq!(hint.max_aspect, 0.0);
    }

    #[test]
    fn test_apply_rounds_to_increments_above_base() {
        let hint = SizeConstraints::normalize(&terminal_hints());
        for (w, h) in [(500, 400), (24, 20), (31, 33), (1000, 17), (5, 5)] {
            let out = hint.apply(&Geometry::new(0, 0, w, h));
            assert_eq!((out.width - hint.base_width) % hint.width_inc, 0, "width {w}");
            assert_eq!((out.height - hint.base_height) % hint.height_inc, 0, "height {h}");
            assert!(out.width >= hint.min_width);
            assert!(out.height >= hint.min_height);
        }
        let out = hint.apply(&Geometry::new(3, 4, 500, 400));
        assert_eq!((out.x, out.y), (3, 4));
        assert_eq!(out.width, 4 + 70 * 7);
        assert_eq!(out.height, 2 + 30 * 13);
    }

    #[test]
    fn test_apply_clamps_to_max() {
        let raw = RawSizeHints {
            flags: SizeHintFlags::P_MAX_SIZE,
            max_width: 300,
            max_height: 0,
            ..RawSizeHints::default()
        };
        let hint = SizeConstraints::normalize(&raw);
        let out = hint.apply(&Geometry::new(0, 0, 800, 900));
        assert_eq!(out.width, 300);
        assert_eq!(out.height, 900);
    }

    #[test]
    fn test_apply_aspect_shrinks_wide_window() {
        let raw = RawSizeHints {
            flags: SizeHintFlags::P_ASPECT,
            min_aspect_num: 1,
            min_aspect_den: 1,
            max_aspect_num: 1,
            max_aspect_den: 1,
            ..RawSizeHints::default()
        };
        let hint = SizeConstraints::normalize(&raw);
        let out = hint.apply(&Geometry::new(0, 0, 400, 200));
        assert_eq!((out.width, out.height), (200, 200));
        let out = hint.apply(&Geometry::new(0, 0, 200, 400));
        assert_eq!((out.width, out.height), (200, 200));
    }

    #[test]
    fn test_size_hints_property_decoding() {
        let mut values = vec![0u32; 18];
        values[0] = (SizeHintFlags::P_MIN_SIZE | SizeHintFlags::P_POSITION).bits();
        values[1] = 15;
        values[5] = 100;
        values[6] = 50;
        let raw = RawSizeHints::from_property(&values).unwrap();
        assert!(raw.has_position());
        assert_eq!(raw.x, 15);
        assert_eq!((raw.min_width, raw.min_height), (100, 50));

        assert!(RawSizeHints::from_property(&values[..10]).is_none());
        assert!(RawSizeHints::from_property(&values[..15]).is_some());
    }

    #[test]
    fn test_wm_hints_initial_state() {
        let iconic = WmHints::from_property(&[1 << 1, 0, 3, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(iconic.initial_state(), Some(ClientState::Iconic));
        assert!(iconic.input);

        let silent = WmHints::from_property(&[0, 0, 3, 0, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(silent.initial_state(), None);
    }

    #[test]
    fn test_motif_border_request() {
        let none = MotifWmHints::from_property(&[MotifWmHints::HINTS_DECORATIONS, 0, 0, 0, 0]).unwrap();
        assert!(none.wants_no_border());
        let all = MotifWmHints::from_property(&[MotifWmHints::HINTS_DECORATIONS, 0, 1, 0, 0]).unwrap();
        assert!(!all.wants_no_border());
        assert!(MotifWmHints::from_property(&[2, 0, 0]).is_none());
    }
}
