//! Client Registry
//!
//! Owns every managed client record in a single arena keyed by [`ClientId`]
//! and keeps two orderings over it: the global insertion order (exported
//! as `_NET_CLIENT_LIST`) and a most-recently-used list per screen.
//! Group membership is the third ordering and lives in [`crate::wm::group`].

use std::collections::{HashMap, VecDeque};

use tracing::debug;

use crate::wm::client::{Client, ClientId};
use crate::wm::client_flags::ClientFlags;
use crate::wm::display::WindowId;

/// Cycle direction through the MRU list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Forward,
    Reverse,
}

#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: HashMap<ClientId, Client>,
    order: Vec<ClientId>,
    mru: HashMap<usize, VecDeque<ClientId>>,
    next_id: u64,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the client managing `window`.
    pub fn find(&self, window: WindowId) -> Option<ClientId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.clients.get(id).is_some_and(|c| c.window == window))
    }

    pub fn get(&self, id: ClientId) -> Option<&Client> {
        self.clients.get(&id)
    }

    pub fn get_mut(&mut self, id: ClientId) -> Option<&mut Client> {
        self.clients.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Register a client at the tail of the global list and of its screen's
    /// MRU list.
    pub fn insert(&mut self, client: Client) -> ClientId {
        let id = ClientId(self.next_id);
        self.next_id += 1;

        debug!("Registering window 0x{:x} as {:?}", client.window, id);
        self.order.push(id);
        self.mru.entry(client.screen).or_default().push_back(id);
        self.clients.insert(id, client);
        id
    }

    /// Drop a client from every ordering and hand the record back.
    pub fn remove(&mut self, id: ClientId) -> Option<Client> {
        let client = self.clients.remove(&id)?;
        self.order.retain(|&c| c != id);
        if let Some(mru) = self.mru.get_mut(&client.screen) {
            mru.retain(|&c| c != id);
        }
        debug!("Deregistered window 0x{:x}", client.window);
        Some(client)
    }

    /// Splice a client to the head of its screen's MRU list.
    pub fn move_to_front(&mut self, id: ClientId) {
        let Some(screen) = self.clients.get(&id).map(|c| c.screen) else {
            return;
        };
        let mru = self.mru.entry(screen).or_default();
        mru.retain(|&c| c != id);
        mru.push_front(id);
    }

    /// All clients in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ClientId, &Client)> {
        self.order
            .iter()
            .filter_map(|id| self.clients.get(id).map(|c| (*id, c)))
    }

    pub fn ids(&self) -> &[ClientId] {
        &self.order
    }

    /// Window handles in insertion order, as published in the client list.
    pub fn windows(&self) -> Vec<WindowId> {
        self.iter().map(|(_, c)| c.window).collect()
    }

    /// A screen's MRU list, most recent first.
    pub fn mru(&self, screen: usize) -> impl Iterator<Item = ClientId> + '_ {
        self.mru.get(&screen).into_iter().flatten().copied()
    }

    /// Pick the next client to cycle to on `screen`.
    ///
    /// Walks the MRU list from `start` (or from the head, or the tail when
    /// reversing, if there is no start client), wrapping around and skipping
    /// Hidden or Ignore clients, and with `in_group` clients outside the start
    /// client's group. Coming back to `start` yields `start` if it is itself
    /// eligible and `None` otherwise.
    pub fn cycle_target(
        &self,
        screen: usize,
        start: Option<ClientId>,
        direction: CycleDirection,
        in_group: bool,
    ) -> Option<ClientId> {
        let mru = self.mru.get(&screen)?;
        if mru.is_empty() {
            return None;
        }

        let start_pos = start
            .and_then(|id| mru.iter().position(|&c| c == id))
            .unwrap_or(match direction {
                CycleDirection::Forward => 0,
                CycleDirection::Reverse => mru.len() - 1,
            });
        let origin = mru[start_pos];
        let origin_group = self.clients.get(&origin).and_then(|c| c.group);

        let len = mru.len();
        let mut pos = start_pos;
        loop {
            pos = match direction {
                CycleDirection::Forward => (pos + 1) % len,
                CycleDirection::Reverse => (pos + len - 1) % len,
            };
            let candidate = mru[pos];
            let eligible = self.clients.get(&candidate).is_some_and(|c| {
                !c.flags.intersects(ClientFlags::HIDDEN | ClientFlags::IGNORE)
                    && (!in_group || c.group == origin_group)
            });

            if candidate == origin {
                return eligible.then_some(origin);
            }
            if eligible {
                return Some(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(windows: &[WindowId]) -> (ClientRegistry, Vec<ClientId>) {
        let mut registry = ClientRegistry::new();
        let ids = windows
            .iter()
            .map(|&w| registry.insert(Client::new(w, 0, 1)))
            .collect();
        (registry, ids)
    }

    #[test]
    fn test_insert_find_remove() {
        let (mut registry, ids) = registry_with(&[10, 20, 30]);
        assert_eq!(registry.find(20), Some(ids[1]));
        assert_eq!(registry.find(99), None);
        assert_eq!(registry.windows(), vec![10, 20, 30]);

        let removed = registry.remove(ids[1]).unwrap();
        assert_eq!(removed.window, 20);
        assert_eq!(registry.find(20), None);
        assert_eq!(registry.windows(), vec![10, 30]);
        assert_eq!(registry.mru(0).collect::<Vec<_>>(), vec![ids[0], ids[2]]);
        assert!(registry.remove(ids[1]).is_none());
    }

    #[test]
    fn test_insert_appends_to_mru_tail_and_front_moves() {
        let (mut registry, ids) = registry_with(&[1, 2, 3]);
        assert_eq!(registry.mru(0).collect::<Vec<_>>(), ids);

        registry.move_to_front(ids[2]);
        assert_eq!(
            registry.mru(0).collect::<Vec<_>>(),
            vec![ids[2], ids[0], ids[1]]
        );
        // global order is untouched by focus
        assert_eq!(registry.windows(), vec![1, 2, 3]);
    }

    #[test]
    fn test_cycle_visits_in_mru_order_and_wraps() {
        let (registry, ids) = registry_with(&[1, 2, 3]);
        let (a, b, c) = (ids[0], ids[1], ids[2]);

        let next = |from| registry.cycle_target(0, Some(from), CycleDirection::Forward, false);
        assert_eq!(next(a), Some(b));
        assert_eq!(next(b), Some(c));
        assert_eq!(next(c), Some(a));

        let prev = registry.cycle_target(0, Some(a), CycleDirection::Reverse, false);
        assert_eq!(prev, Some(c));
    }

    #[test]
    fn test_cycle_skips_hidden_and_ignored() {
        let (mut registry, ids) = registry_with(&[1, 2, 3, 4]);
        registry.get_mut(ids[1]).unwrap().flags |= ClientFlags::HIDDEN;
        registry.get_mut(ids[2]).unwrap().flags |= ClientFlags::IGNORE;

        let target = registry.cycle_target(0, Some(ids[0]), CycleDirection::Forward, false);
        assert_eq!(target, Some(ids[3]));
    }

    #[test]
    fn test_cycle_with_everything_filtered() {
        let (mut registry, ids) = registry_with(&[1, 2]);
        registry.get_mut(ids[1]).unwrap().flags |= ClientFlags::HIDDEN;

        // only the start client is visible: cycling lands back on it
        let target = registry.cycle_target(0, Some(ids[0]), CycleDirection::Forward, false);
        assert_eq!(target, Some(ids[0]));

        registry.get_mut(ids[0]).unwrap().flags |= ClientFlags::HIDDEN;
        let target = registry.cycle_target(0, Some(ids[0]), CycleDirection::Forward, false);
        assert_eq!(target, None);
    }

    #[test]
    fn test_cycle_in_group_only() {
        let (mut registry, ids) = registry_with(&[1, 2, 3]);
        registry.get_mut(ids[0]).unwrap().group = Some(2);
        registry.get_mut(ids[1]).unwrap().group = Some(3);
        registry.get_mut(ids[2]).unwrap().group = Some(2);

        let target = registry.cycle_target(0, Some(ids[0]), CycleDirection::Forward, true);
        assert_eq!(target, Some(ids[2]));
    }

    #[test]
    fn test_cycle_without_start_uses_list_ends() {
        let (registry, ids) = registry_with(&[1, 2, 3]);
        assert_eq!(
            registry.cycle_target(0, None, CycleDirection::Forward, false),
            Some(ids[1])
        );
        assert_eq!(
            registry.cycle_target(0, None, CycleDirection::Reverse, false),
            Some(ids[1])
        );
        assert_eq!(registry.cycle_target(1, None, CycleDirection::Forward, false), None);
    }
}
