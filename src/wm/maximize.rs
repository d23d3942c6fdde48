//! Geometry commands
//!
//! Maximize toggles, freeze, and the keyboard/pointer move and resize
//! commands. Every command ends by pushing the new geometry to the window
//! and telling the client where it is.

use anyhow::Result;
use tracing::debug;

use crate::shared::Rect;
use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::client_flags::{ClientFlags, MoveDirection};
use crate::wm::display::Display;
use crate::wm::placement::{Edges, align_adjust, boundary_candidates, snap_offset};

impl<D: Display> WindowManager<D> {
    /// Area a client maximizes into: the monitor holding its centre, or
    /// the whole screen.
    fn maximize_bounds(&self, id: ClientId) -> Option<Rect> {
        let client = self.clients.get(id)?;
        let screen = self.screens.get(client.screen)?;
        let (cx, cy) = client.geometry.center();
        Some(screen.bounds_at(cx, cy))
    }

    fn is_frozen(&self, id: ClientId) -> bool {
        self.clients
            .get(id)
            .is_some_and(|c| c.flags.contains(ClientFlags::FREEZE))
    }

    pub fn toggle_freeze(&mut self, id: ClientId) {
        if let Some(client) = self.clients.get_mut(id) {
            client.flags.toggle(ClientFlags::FREEZE);
            debug!(
                "Window 0x{:x} frozen: {}",
                client.window,
                client.flags.contains(ClientFlags::FREEZE)
            );
        }
    }

    /// Toggle full maximization.
    pub fn maximize(&mut self, id: ClientId) -> Result<()> {
        if self.is_frozen(id) {
            return Ok(());
        }
        let Some(bounds) = self.maximize_bounds(id) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let gap = self.screens[client.screen].gap;

        if client.flags.max_axes() == ClientFlags::MAXIMIZED {
            client.flags.remove(ClientFlags::MAXIMIZED);
            client.geometry = client.saved_geometry;
            client.border_width = client.default_border_width;
        } else {
            // an axis already maximized on its own keeps its older saved value
            if !client.flags.contains(ClientFlags::VMAXIMIZED) {
                client.saved_geometry.y = client.geometry.y;
                client.saved_geometry.height = client.geometry.height;
            }
            if !client.flags.contains(ClientFlags::HMAXIMIZED) {
                client.saved_geometry.x = client.geometry.x;
                client.saved_geometry.width = client.geometry.width;
            }

            client.geometry.x = bounds.left + gap.left;
            client.geometry.y = bounds.top + gap.top;
            client.geometry.width = bounds.width() - (gap.left + gap.right);
            client.geometry.height = bounds.height() - (gap.top + gap.bottom);
            client.border_width = 0;
            client.flags.insert(ClientFlags::MAXIMIZED);
        }

        self.resize(id)
    }

    /// Toggle vertical maximization.
    pub fn vert_maximize(&mut self, id: ClientId) -> Result<()> {
        if self.is_frozen(id) {
            return Ok(());
        }
        let Some(bounds) = self.maximize_bounds(id) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let gap = self.screens[client.screen].gap;

        if client.flags.contains(ClientFlags::VMAXIMIZED) {
            client.geometry.y = client.saved_geometry.y;
            client.geometry.height = client.saved_geometry.height;
            client.border_width = client.default_border_width;
            if client.flags.contains(ClientFlags::HMAXIMIZED) {
                client.geometry.width -= client.border_width * 2;
            }
            client.flags.remove(ClientFlags::VMAXIMIZED);
        } else {
            client.saved_geometry.y = client.geometry.y;
            client.saved_geometry.height = client.geometry.height;

            // becoming fully maximized: the border goes away
            if client.flags.max_axes() == ClientFlags::HMAXIMIZED {
                client.geometry.width += client.border_width * 2;
                client.border_width = 0;
            }

            client.geometry.y = bounds.top + gap.top;
            client.geometry.height =
                bounds.height() - client.border_width * 2 - (gap.top + gap.bottom);
            client.flags.insert(ClientFlags::VMAXIMIZED);
        }

        self.resize(id)
    }

    /// Toggle horizontal maximization.
    pub fn horiz_maximize(&mut self, id: ClientId) -> Result<()> {
        if self.is_frozen(id) {
            return Ok(());
        }
        let Some(bounds) = self.maximize_bounds(id) else {
            return Ok(());
        };
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let gap = self.screens[client.screen].gap;

        if client.flags.contains(ClientFlags::HMAXIMIZED) {
            client.geometry.x = client.saved_geometry.x;
            client.geometry.width = client.saved_geometry.width;
            client.border_width = client.default_border_width;
            if client.flags.contains(ClientFlags::VMAXIMIZED) {
                client.geometry.height -= client.border_width * 2;
            }
            client.flags.remove(ClientFlags::HMAXIMIZED);
        } else {
            client.saved_geometry.x = client.geometry.x;
            client.saved_geometry.width = client.geometry.width;

            if client.flags.max_axes() == ClientFlags::VMAXIMIZED {
                client.geometry.height += client.border_width * 2;
                client.border_width = 0;
            }

            client.geometry.x = bounds.left + gap.left;
            client.geometry.width =
                bounds.width() - client.border_width * 2 - (gap.left + gap.right);
            client.flags.insert(ClientFlags::HMAXIMIZED);
        }

        self.resize(id)
    }

    /// Push the current size and position to the window.
    pub fn resize(&self, id: ClientId) -> Result<()> {
        self.draw_border(id)?;
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        self.display
            .move_resize_window(client.window, &client.geometry)?;
        self.display
            .send_configure_notify(client.window, &client.geometry, client.border_width)
    }

    /// Push the current position to the window.
    pub fn move_client(&self, id: ClientId) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        self.display
            .move_window(client.window, client.geometry.x, client.geometry.y)?;
        self.display
            .send_configure_notify(client.window, &client.geometry, client.border_width)
    }

    /// Keyboard move by `amount` pixels, stopping flush against the first
    /// window or screen edge in the way. The pointer moves along.
    pub fn move_by(&mut self, id: ClientId, direction: MoveDirection, amount: i32) -> Result<()> {
        let Some(client) = self.clients.get(id) else {
            return Ok(());
        };
        let screen = &self.screens[client.screen];
        let mover = Edges::of(&client.geometry, client.border_width);

        let siblings = self
            .clients
            .iter()
            .filter(|&(other, c)| other != id && c.screen == client.screen && !c.is_hidden())
            .map(|(_, other)| Edges::of(&other.geometry, other.border_width));

        let (cx, cy) = client.geometry.center();
        let boundaries = boundary_candidates(screen.bounds_at(cx, cy), screen.gap);

        let amount = align_adjust(mover, direction, amount, siblings.chain(boundaries))
            .unwrap_or(amount);
        let (extent_w, extent_h) = (screen.width, screen.height);
        let window = client.window;

        let (dx, dy) = direction_delta(direction, amount);
        let pointer = self.display.pointer_position(window)?;

        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let geom = &mut client.geometry;

        geom.y += dy;
        if geom.y + geom.height < 0 {
            geom.y = -geom.height;
        }
        if geom.y > extent_h - 1 {
            geom.y = extent_h - 1;
        }
        geom.x += dx;
        if geom.x + geom.width < 0 {
            geom.x = -geom.width;
        }
        if geom.x > extent_w - 1 {
            geom.x = extent_w - 1;
        }
        debug!("Moved 0x{:x} to {},{}", window, geom.x, geom.y);

        self.move_client(id)?;
        self.display.warp_pointer(window, pointer.0, pointer.1)
    }

    /// Keyboard resize by `amount` pixels, honouring size hints. The pointer
    /// is kept inside the window.
    pub fn resize_by(&mut self, id: ClientId, direction: MoveDirection, amount: i32) -> Result<()> {
        let (dx, dy) = direction_delta(direction, amount);
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let window = client.window;

        client.geometry.width = (client.geometry.width + dx).max(1);
        client.geometry.height = (client.geometry.height + dy).max(1);
        client.geometry = client.constraints.apply(&client.geometry);
        debug!(
            "Resized 0x{:x} to {}x{}",
            window, client.geometry.width, client.geometry.height
        );

        self.resize(id)?;

        let (mut x, mut y) = self.display.pointer_position(window)?;
        if let Some(client) = self.clients.get(id) {
            if x > client.geometry.width {
                x = client.geometry.width - client.border_width;
            }
            if y > client.geometry.height {
                y = client.geometry.height - client.border_width;
            }
        }
        self.display.warp_pointer(window, x, y)
    }

    /// Pointer-driven move to (`x`, `y`), snapping to the screen edges.
    pub fn move_to(&mut self, id: ClientId, x: i32, y: i32) -> Result<()> {
        let snap = self.settings.snap_distance;
        let Some(client) = self.clients.get_mut(id) else {
            return Ok(());
        };
        let Some(screen) = self.screens.get(client.screen) else {
            return Ok(());
        };
        let bw = client.border_width;

        client.geometry.x = x;
        client.geometry.y = y;
        client.geometry.x += snap_offset(x, client.geometry.width, screen.width, bw, snap);
        client.geometry.y += snap_offset(y, client.geometry.height, screen.height, bw, snap);

        self.move_client(id)
    }
}

fn direction_delta(direction: MoveDirection, amount: i32) -> (i32, i32) {
    let mut delta = (0, 0);
    if direction.contains(MoveDirection::UP) {
        delta.1 -= amount;
    }
    if direction.contains(MoveDirection::DOWN) {
        delta.1 += amount;
    }
    if direction.contains(MoveDirection::LEFT) {
        delta.0 -= amount;
    }
    if direction.contains(MoveDirection::RIGHT) {
        delta.0 += amount;
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::Geometry;
    use crate::wm::screen::{Gap, Monitor};
    use crate::wm::testing::{Call, managed_wm};

    const START: Geometry = Geometry {
        x: 100,
        y: 100,
        width: 400,
        height: 300,
    };

    fn wm_with_window() -> (crate::wm::WindowManager<crate::wm::testing::MockDisplay>, ClientId) {
        let (mut wm, ids) = managed_wm(&[0x100]);
        wm.clients.get_mut(ids[0]).unwrap().geometry = START;
        (wm, ids[0])
    }

    #[test]
    fn test_maximize_fills_screen_without_border() {
        let (mut wm, id) = wm_with_window();
        wm.maximize(id).unwrap();

        let client = wm.client(id).unwrap();
        assert_eq!(client.geometry, Geometry::new(0, 0, 1920, 1080));
        assert_eq!(client.border_width, 0);
        assert!(client.flags.is_maximized());
        assert!(wm.display.called(&Call::MoveResize(0x100, Geometry::new(0, 0, 1920, 1080))));
    }

    #[test]
    fn test_maximize_then_vert_then_undo_restores() {
        let (mut wm, id) = wm_with_window();
        wm.maximize(id).unwrap();
        wm.vert_maximize(id).unwrap();
        assert_eq!(wm.client(id).unwrap().flags.max_axes(), ClientFlags::HMAXIMIZED);

        wm.horiz_maximize(id).unwrap();
        let client = wm.client(id).unwrap();
        assert_eq!(client.geometry, START);
        assert_eq!(client.border_width, 1);
        assert!(client.flags.max_axes().is_empty());
    }

    #[test]
    fn test_maximize_round_trip_through_full_toggle() {
        let (mut wm, id) = wm_with_window();
        wm.maximize(id).unwrap();
        wm.vert_maximize(id).unwrap();
        wm.maximize(id).unwrap();
        assert!(wm.client(id).unwrap().flags.is_maximized());

        wm.maximize(id).unwrap();
        let client = wm.client(id).unwrap();
        assert_eq!(client.geometry, START);
        assert_eq!(client.border_width, 1);
        assert!(client.flags.max_axes().is_empty());
    }

    #[test]
    fn test_axes_compose_into_full_maximize() {
        let (mut wm, id) = wm_with_window();
        wm.vert_maximize(id).unwrap();
        let client = wm.client(id).unwrap();
        assert_eq!(client.geometry, Geometry::new(100, 0, 400, 1078));
        assert_eq!(client.border_width, 1);

        wm.horiz_maximize(id).unwrap();
        let client = wm.client(id).unwrap();
        assert!(client.flags.is_maximized());
        assert_eq!(client.border_width, 0);
        assert_eq!(client.geometry, Geometry::new(0, 0, 1920, 1080));

        wm.horiz_maximize(id).unwrap();
        wm.vert_maximize(id).unwrap();
        let client = wm.client(id).unwrap();
        assert_eq!(client.geometry, START);
        assert_eq!(client.border_width, 1);
    }

    #[test]
    fn test_maximize_uses_monitor_and_gap() {
        let (mut wm, id) = wm_with_window();
        wm.screens[0].set_monitors(vec![
            Monitor {
                x: 0,
                y: 0,
                width: 960,
                height: 1080,
                name: "left".into(),
                primary: true,
            },
            Monitor {
                x: 960,
                y: 0,
                width: 960,
                height: 1080,
                name: "right".into(),
                primary: false,
            },
        ]);
        wm.screens[0].gap = Gap {
            top: 24,
            ..Gap::default()
        };
        wm.clients.get_mut(id).unwrap().geometry = Geometry::new(1000, 100, 400, 300);

        wm.maximize(id).unwrap();
        assert_eq!(
            wm.client(id).unwrap().geometry,
            Geometry::new(960, 24, 960, 1056)
        );
    }

    #[test]
    fn test_frozen_window_ignores_maximize() {
        let (mut wm, id) = wm_with_window();
        wm.toggle_freeze(id);
        wm.maximize(id).unwrap();
        wm.vert_maximize(id).unwrap();
        wm.horiz_maximize(id).unwrap();
        assert_eq!(wm.client(id).unwrap().geometry, START);

        wm.toggle_freeze(id);
        wm.maximize(id).unwrap();
        assert!(wm.client(id).unwrap().flags.is_maximized());
    }

    #[test]
    fn test_move_by_aligns_to_sibling() {
        let (mut wm, ids) = managed_wm(&[0x100, 0x200]);
        wm.clients.get_mut(ids[0]).unwrap().geometry = Geometry::new(300, 100, 100, 100);
        // sibling's right edge (border included) sits at 295
        wm.clients.get_mut(ids[1]).unwrap().geometry = Geometry::new(93, 100, 200, 100);

        wm.move_by(ids[0], MoveDirection::LEFT, 10).unwrap();
        assert_eq!(wm.client(ids[0]).unwrap().geometry.x, 295);

        wm.move_by(ids[0], MoveDirection::UP, 10).unwrap();
        assert_eq!(wm.client(ids[0]).unwrap().geometry.y, 90);
    }

    #[test]
    fn test_move_by_takes_first_sibling_in_registry_order() {
        let (mut wm, ids) = managed_wm(&[0x100, 0x200, 0x300]);
        wm.clients.get_mut(ids[0]).unwrap().geometry = Geometry::new(300, 100, 100, 100);
        // registered first but further away: right edge at 292
        wm.clients.get_mut(ids[1]).unwrap().geometry = Geometry::new(90, 100, 200, 100);
        // nearer: right edge at 296
        wm.clients.get_mut(ids[2]).unwrap().geometry = Geometry::new(94, 300, 200, 100);
        // put the nearer sibling at the MRU head and in a group
        wm.move_to_group(ids[2], 2);
        wm.clients.move_to_front(ids[2]);

        wm.move_by(ids[0], MoveDirection::LEFT, 10).unwrap();
        assert_eq!(wm.client(ids[0]).unwrap().geometry.x, 292);
    }

    #[test]
    fn test_resize_by_applies_hints() {
        let (mut wm, id) = wm_with_window();
        {
            let client = wm.clients.get_mut(id).unwrap();
            client.constraints.width_inc = 10;
            client.constraints.height_inc = 10;
        }
        wm.resize_by(id, MoveDirection::RIGHT, 7).unwrap();
        assert_eq!(wm.client(id).unwrap().geometry.width, 400);
        wm.resize_by(id, MoveDirection::RIGHT, 10).unwrap();
        assert_eq!(wm.client(id).unwrap().geometry.width, 410);
    }

    #[test]
    fn test_move_to_snaps_to_edges() {
        let (mut wm, id) = wm_with_window();
        wm.settings.snap_distance = 8;

        wm.move_to(id, 5, 200).unwrap();
        assert_eq!(wm.client(id).unwrap().geometry.x, 0);
        assert_eq!(wm.client(id).unwrap().geometry.y, 200);

        // bottom edge lands 3 px above the screen bottom
        wm.move_to(id, 300, 1080 - 300 - 2 - 3).unwrap();
        assert_eq!(wm.client(id).unwrap().geometry.y, 1080 - 302);
    }
}
