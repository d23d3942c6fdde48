//! Cycle Module
//!
//! Alt-Tab style cycling through a screen's most-recently-used list.
//! While the cycle modifier is held the screen's `alt_persist` latch keeps
//! focus changes from reordering the list; releasing it ends the cycle.

use anyhow::Result;
use tracing::debug;

use crate::wm::WindowManager;
use crate::wm::display::Display;
use crate::wm::registry::CycleDirection;

impl<D: Display> WindowManager<D> {
    /// Move to the next eligible client on `screen`.
    ///
    /// The pointer position inside the client being left is remembered and
    /// the pointer is warped into the target, which focus then follows.
    pub fn cycle(&mut self, screen: usize, direction: CycleDirection, in_group: bool) -> Result<()> {
        let origin = match self
            .active
            .filter(|&id| self.clients.get(id).is_some_and(|c| c.screen == screen))
        {
            Some(id) => id,
            None => {
                let mut mru = self.clients.mru(screen);
                let end = match direction {
                    CycleDirection::Forward => mru.next(),
                    CycleDirection::Reverse => mru.last(),
                };
                match end {
                    Some(id) => id,
                    None => return Ok(()),
                }
            }
        };

        let Some(target) = self
            .clients
            .cycle_target(screen, Some(origin), direction, in_group)
        else {
            debug!("Nothing to cycle to on screen {}", screen);
            return Ok(());
        };

        if let Some(sc) = self.screens.get_mut(screen) {
            sc.alt_persist = true;
        }
        self.save_pointer(origin)?;
        self.warp_pointer_to(target)
    }

    /// The cycle modifier was released: commit the active client to the
    /// head of the MRU list.
    pub fn cycle_finish(&mut self, screen: usize) {
        let Some(sc) = self.screens.get_mut(screen) else {
            return;
        };
        if !sc.alt_persist {
            return;
        }
        sc.alt_persist = false;
        if let Some(active) = self.active {
            self.clients.move_to_front(active);
        }
    }
}
