//! Client Flags
//!
//! Bitfield flags for client state, supported protocols and ICCCM hint masks.

use bitflags::bitflags;

bitflags! {
    /// Window manager state flags for a client
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ClientFlags: u32 {
        const HIDDEN     = 1 << 0;
        const IGNORE     = 1 << 1;
        const VMAXIMIZED = 1 << 2;
        const HMAXIMIZED = 1 << 3;
        const FREEZE     = 1 << 4;

        /// Union of both maximize axes. Never stored on its own.
        const MAXIMIZED = Self::VMAXIMIZED.bits() | Self::HMAXIMIZED.bits();
    }
}

impl ClientFlags {
    /// Only the maximize axis bits.
    pub fn max_axes(&self) -> Self {
        *self & Self::MAXIMIZED
    }

    pub fn is_maximized(&self) -> bool {
        self.contains(Self::MAXIMIZED)
    }
}

bitflags! {
    /// WM_PROTOCOLS the client advertises
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct WmProtocols: u32 {
        const DELETE     = 1 << 0;
        const TAKE_FOCUS = 1 << 1;
    }
}

bitflags! {
    /// WM_NORMAL_HINTS flags (XSizeHints.flags)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SizeHintFlags: u32 {
        const US_POSITION = 1 << 0;
        const US_SIZE     = 1 << 1;
        const P_POSITION  = 1 << 2;
        const P_SIZE      = 1 << 3;
        const P_MIN_SIZE  = 1 << 4;
        const P_MAX_SIZE  = 1 << 5;
        const P_RESIZE_INC = 1 << 6;
        const P_ASPECT    = 1 << 7;
        const P_BASE_SIZE = 1 << 8;
        const P_WIN_GRAVITY = 1 << 9;
    }
}

bitflags! {
    /// Direction of a keyboard move or resize
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MoveDirection: u8 {
        const UP    = 1 << 0;
        const DOWN  = 1 << 1;
        const LEFT  = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maximized_is_union_of_axes() {
        let mut flags = ClientFlags::HIDDEN | ClientFlags::VMAXIMIZED;
        assert!(!flags.is_maximized());
        assert_eq!(flags.max_axes(), ClientFlags::VMAXIMIZED);

        flags |= ClientFlags::HMAXIMIZED;
        assert!(flags.is_maximized());
        assert_eq!(flags.max_axes(), ClientFlags::MAXIMIZED);
    }
}
