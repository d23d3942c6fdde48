//! Placement Module
//!
//! Geometry engine for window positions: initial placement of new windows,
//! edge snapping for pointer moves and pixel alignment for keyboard moves.
//! Everything here is pure computation over plain values.

use tracing::debug;

use crate::shared::{Geometry, Rect};
use crate::wm::client_flags::MoveDirection;
use crate::wm::hints::RawSizeHints;
use crate::wm::screen::{Gap, Screen};

/// Compute the initial geometry of a newly managed window.
///
/// Windows carrying a user or program position keep it, pulled inside the
/// monitor holding that point (or the whole desktop) minus border and gaps.
/// Everything else is centred on the pointer's monitor, kept clear of the
/// gaps.
pub fn place_client(
    geometry: Geometry,
    border_width: i32,
    hints: &RawSizeHints,
    screen: &Screen,
    pointer: (i32, i32),
) -> Geometry {
    let mut placed = geometry;
    let gap = screen.gap;

    if hints.has_position() {
        let bounds = screen.bounds_at(hints.x, hints.y);
        let xslack = bounds.right - geometry.width - border_width * 2 - gap.right;
        let yslack = bounds.bottom - geometry.height - border_width * 2 - gap.bottom;
        placed.x = hints.x.min(xslack).max(bounds.left + gap.left);
        placed.y = hints.y.min(yslack).max(bounds.top + gap.top);
        debug!("Placing at requested position {},{}", placed.x, placed.y);
        return placed;
    }

    let bounds = screen.bounds_at(pointer.0, pointer.1);

    let xmouse = (pointer.0.max(bounds.left) - geometry.width / 2).max(bounds.left);
    let ymouse = (pointer.1.max(bounds.top) - geometry.height / 2).max(bounds.top);

    let xslack = bounds.right - geometry.width - border_width * 2;
    let yslack = bounds.bottom - geometry.height - border_width * 2;

    if xslack >= bounds.left {
        placed.x = xmouse.min(xslack).max(bounds.left + gap.left);
        if placed.x > xslack - gap.right {
            placed.x -= gap.right;
        }
    } else {
        placed.x = bounds.left + gap.left;
        placed.width = bounds.right - gap.left;
    }

    if yslack >= bounds.top {
        placed.y = ymouse.min(yslack).max(bounds.top + gap.top);
        if placed.y > yslack - gap.bottom {
            placed.y -= gap.bottom;
        }
    } else {
        placed.y = bounds.top + gap.top;
        placed.height = bounds.bottom - gap.top;
    }

    debug!(
        "Placed around pointer {:?}: {}x{}+{}+{}",
        pointer, placed.width, placed.height, placed.x, placed.y
    );
    placed
}

/// Signed correction that snaps a moving span to `0` or `max`.
///
/// `pos` is the leading edge, `size` the span length (border excluded).
/// When both edges are within `snap_distance` the smaller correction wins.
pub fn snap_offset(pos: i32, size: i32, max: i32, border_width: i32, snap_distance: i32) -> i32 {
    let near = pos;
    let far = pos + size + border_width * 2;

    let to_start = if near.abs() <= snap_distance { -near } else { 0 };
    let to_end = if max - snap_distance <= far && far <= max + snap_distance {
        max - far
    } else {
        0
    };

    match (to_start, to_end) {
        (0, 0) => 0,
        (s, 0) => s,
        (0, e) => e,
        (s, e) if s.abs() < e.abs() => s,
        (_, e) => e,
    }
}

/// Outer edges of a window or of a synthetic boundary line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edges {
    pub top: i32,
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
}

impl Edges {
    /// Edges of a window, border included on the right and bottom.
    pub fn of(geometry: &Geometry, border_width: i32) -> Self {
        Self {
            top: geometry.y,
            left: geometry.x,
            right: geometry.x + geometry.width + 2 * border_width,
            bottom: geometry.y + geometry.height + 2 * border_width,
        }
    }

    fn horizontal_line(left: i32, right: i32, y: i32) -> Self {
        Self {
            top: y,
            left,
            right,
            bottom: y,
        }
    }

    fn vertical_line(top: i32, bottom: i32, x: i32) -> Self {
        Self {
            top,
            left: x,
            right: x,
            bottom,
        }
    }
}

/// Synthetic windows lying along each edge of `bounds` (and, where a gap is
/// reserved, along the inner gap line too), in the order they are tried.
pub fn boundary_candidates(bounds: Rect, gap: Gap) -> Vec<Edges> {
    let mut edges = Vec::with_capacity(8);
    let horizontal = |y| Edges::horizontal_line(bounds.left, bounds.right, y);
    let vertical = |x| Edges::vertical_line(bounds.top, bounds.bottom, x);

    if gap.top != 0 {
        edges.push(horizontal(bounds.top + gap.top));
    }
    edges.push(horizontal(bounds.top));
    if gap.bottom != 0 {
        edges.push(horizontal(bounds.bottom - gap.bottom));
    }
    edges.push(horizontal(bounds.bottom));

    if gap.left != 0 {
        edges.push(vertical(bounds.left + gap.left));
    }
    edges.push(vertical(bounds.left));
    if gap.right != 0 {
        edges.push(vertical(bounds.right - gap.right));
    }
    edges.push(vertical(bounds.right));

    edges
}

fn diff(a: i32, b: i32) -> i32 {
    (a.abs() - b.abs()).abs()
}

/// Shrink `amount` so a keyboard move stops flush against the first
/// candidate edge it would otherwise overshoot.
///
/// Candidates are tried in order and the first one closer than the
/// current amount wins, even if a later one would be closer still.
pub fn align_adjust(
    mover: Edges,
    direction: MoveDirection,
    amount: i32,
    candidates: impl IntoIterator<Item = Edges>,
) -> Option<i32> {
    candidates
        .into_iter()
        .find_map(|to| align_to(&mover, &to, direction, amount))
}

fn align_to(mover: &Edges, to: &Edges, direction: MoveDirection, amount: i32) -> Option<i32> {
    if direction.contains(MoveDirection::UP)
        && mover.top > to.bottom
        && diff(mover.top, to.bottom) < amount
    {
        return Some(diff(mover.top, to.bottom));
    }
    if direction.contains(MoveDirection::LEFT)
        && mover.left > to.right
        && diff(mover.left, to.right) < amount
    {
        return Some(diff(mover.left, to.right));
    }
    if direction.contains(MoveDirection::RIGHT)
        && mover.right < to.left
        && diff(mover.right, to.left) < amount
    {
        return Some(diff(mover.right, to.left));
    }
    if direction.contains(MoveDirection::DOWN)
        && mover.bottom < to.top
        && diff(mover.bottom, to.top) < amount
    {
        return Some(diff(mover.bottom, to.top));
    }
    None
}
