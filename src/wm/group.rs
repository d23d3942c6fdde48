//! Groups
//!
//! Fixed set of numbered window groups per screen. A client is a member of
//! at most one group; the group list only stores client ids, the client
//! record keeps the back reference as a plain index.

use tracing::debug;

use crate::wm::client::ClientId;

/// Number of groups per screen, group 0 included
pub const GROUP_COUNT: usize = 10;

const GROUP_NAMES: [&str; GROUP_COUNT] = [
    "nogroup", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine",
];

#[derive(Debug, Clone)]
pub struct Group {
    pub index: usize,
    pub name: &'static str,
    pub members: Vec<ClientId>,
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct GroupSet {
    groups: Vec<Group>,
    /// Group new windows join when sticky groups are enabled
    pub active: usize,
}

impl Default for GroupSet {
    fn default() -> Self {
        Self::new()
    }
}

impl GroupSet {
    pub fn new() -> Self {
        let groups = GROUP_NAMES
            .iter()
            .enumerate()
            .map(|(index, name)| Group {
                index,
                name,
                members: Vec::new(),
                hidden: false,
            })
            .collect();
        Self { groups, active: 0 }
    }

    /// Resolve a group by index.
    pub fn get(&self, index: usize) -> Option<&Group> {
        self.groups.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Add a client to `index`, dropping any previous membership first.
    /// Returns false for an out-of-range group.
    pub fn add(&mut self, index: usize, id: ClientId) -> bool {
        if index >= self.groups.len() {
            return false;
        }
        self.remove(id);
        self.groups[index].members.push(id);
        debug!("{:?} joined group {}", id, self.groups[index].name);
        true
    }

    /// Remove a client from whatever group holds it.
    pub fn remove(&mut self, id: ClientId) -> Option<usize> {
        for group in &mut self.groups {
            if let Some(pos) = group.members.iter().position(|&m| m == id) {
                group.members.remove(pos);
                return Some(group.index);
            }
        }
        None
    }

    pub fn members(&self, index: usize) -> &[ClientId] {
        self.groups
            .get(index)
            .map(|g| g.members.as_slice())
            .unwrap_or(&[])
    }

    pub fn name(&self, index: usize) -> &'static str {
        self.groups.get(index).map(|g| g.name).unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_membership_is_exclusive() {
        let mut groups = GroupSet::new();
        let id = ClientId(4);

        assert!(groups.add(2, id));
        assert!(groups.add(5, id));
        assert!(groups.members(2).is_empty());
        assert_eq!(groups.members(5), &[id]);

        assert_eq!(groups.remove(id), Some(5));
        assert_eq!(groups.remove(id), None);
    }

    #[test]
    fn test_out_of_range_group() {
        let mut groups = GroupSet::new();
        assert!(!groups.add(GROUP_COUNT, ClientId(1)));
        assert!(groups.get(GROUP_COUNT).is_none());
        assert_eq!(groups.name(0), "nogroup");
        assert_eq!(groups.name(3), "three");
    }
}
