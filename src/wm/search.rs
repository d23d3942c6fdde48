//! Search Module
//!
//! Matching strategies plugged into [`menu_filter`](crate::wm::menu::menu_filter).

use crate::wm::WindowManager;
use crate::wm::client::ClientId;
use crate::wm::display::Display;
use crate::wm::menu::{MenuEntry, MenuMatcher};

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Case-insensitive substring filter, results in source order
#[derive(Debug, Clone, Copy, Default)]
pub struct TextMatcher;

impl MenuMatcher for TextMatcher {
    fn filter(&self, entries: &[MenuEntry], search: &str) -> Vec<usize> {
        entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| contains_ignore_case(&entry.text, search))
            .map(|(i, _)| i)
            .collect()
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    id: ClientId,
    name: String,
    /// Names the client carried before the current one
    previous: Vec<String>,
    class: String,
    group: usize,
    active: bool,
    hidden: bool,
}

impl Candidate {
    /// Lower is better; `None` means no match.
    fn tier(&self, search: &str) -> Option<usize> {
        let tier = if contains_ignore_case(&self.name, search) {
            0
        } else if self.previous.iter().any(|n| contains_ignore_case(n, search)) {
            1
        } else if contains_ignore_case(&self.class, search) {
            2
        } else {
            return None;
        };
        Some(if self.hidden { tier + 3 } else { tier })
    }
}

/// Window search over the clients of one screen
///
/// Entries are produced by [`ClientMatcher::entries`] and line up with the
/// candidates by index.
#[derive(Debug, Clone, Default)]
pub struct ClientMatcher {
    candidates: Vec<Candidate>,
}

impl ClientMatcher {
    /// Snapshot the clients of `screen` in registry order.
    pub fn new<D: Display>(wm: &WindowManager<D>, screen: usize) -> Self {
        let candidates = wm
            .clients
            .iter()
            .filter(|(_, c)| c.screen == screen)
            .map(|(id, c)| {
                let name = c.name().to_string();
                let mut previous: Vec<String> =
                    c.names().iter().rev().skip(1).map(str::to_string).collect();
                previous.retain(|n| *n != name);
                Candidate {
                    id,
                    name,
                    previous,
                    class: c.app_class.clone(),
                    group: c.group.unwrap_or(0),
                    active: wm.active() == Some(id),
                    hidden: c.is_hidden(),
                }
            })
            .collect();
        Self { candidates }
    }

    pub fn entries(&self) -> Vec<MenuEntry> {
        self.candidates
            .iter()
            .map(|c| MenuEntry::new(&c.name))
            .collect()
    }

    pub fn client(&self, index: usize) -> Option<ClientId> {
        self.candidates.get(index).map(|c| c.id)
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl MenuMatcher for ClientMatcher {
    fn filter(&self, entries: &[MenuEntry], search: &str) -> Vec<usize> {
        let mut ranked: Vec<(usize, usize)> = self
            .candidates
            .iter()
            .take(entries.len())
            .enumerate()
            .filter_map(|(i, c)| c.tier(search).map(|tier| (tier, i)))
            .collect();
        // stable: equal tiers keep registry order
        ranked.sort_by_key(|&(tier, _)| tier);
        ranked.into_iter().map(|(_, i)| i).collect()
    }

    fn render(&self, index: usize, entry: &MenuEntry, _listing: bool) -> Option<String> {
        let candidate = self.candidates.get(index)?;
        let flag = if candidate.active {
            '!'
        } else if candidate.hidden {
            '&'
        } else {
            ' '
        };
        Some(format!("({}) {}{}", candidate.group, flag, entry.text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wm::testing::managed_wm;

    #[test]
    fn test_text_matcher_is_case_insensitive() {
        let entries: Vec<MenuEntry> = ["Firefox", "xterm", "FIREWALL"]
            .iter()
            .map(|n| MenuEntry::new(n))
            .collect();
        assert_eq!(TextMatcher.filter(&entries, "fire"), vec![0, 2]);
        assert_eq!(TextMatcher.filter(&entries, "TERM"), vec![1]);
        assert!(TextMatcher.filter(&entries, "emacs").is_empty());
    }

    #[test]
    fn test_client_tiers() {
        let (mut wm, ids) = managed_wm(&[0x100, 0x200, 0x300, 0x400]);
        {
            let c = wm.clients.get_mut(ids[0]).unwrap();
            c.set_name("mail".into());
            c.app_class = "Editor".into();
        }
        {
            let c = wm.clients.get_mut(ids[1]).unwrap();
            c.set_name("editor: notes".into());
            c.app_class = "Term".into();
        }
        {
            let c = wm.clients.get_mut(ids[2]).unwrap();
            c.set_name("vim editor".into());
            c.set_name("shell".into());
            c.app_class = "Term".into();
        }
        {
            let c = wm.clients.get_mut(ids[3]).unwrap();
            c.set_name("editor".into());
        }
        wm.hide(ids[3]).unwrap();

        let matcher = ClientMatcher::new(&wm, 0);
        let entries = matcher.entries();
        let order: Vec<_> = matcher
            .filter(&entries, "EDITOR")
            .into_iter()
            .map(|i| matcher.client(i).unwrap())
            .collect();
        // name, previous name, class, then hidden
        assert_eq!(order, vec![ids[1], ids[2], ids[0], ids[3]]);
    }

    #[test]
    fn test_client_render_flags() {
        let (mut wm, ids) = managed_wm(&[0x100, 0x200, 0x300]);
        for (i, id) in ids.iter().enumerate() {
            wm.clients.get_mut(*id).unwrap().set_name(format!("win{i}"));
        }
        wm.set_active(ids[0], true).unwrap();
        wm.hide(ids[1]).unwrap();
        wm.move_to_group(ids[2], 3);

        let matcher = ClientMatcher::new(&wm, 0);
        let entries = matcher.entries();
        let rendered: Vec<_> = (0..entries.len())
            .map(|i| matcher.render(i, &entries[i], true).unwrap())
            .collect();
        assert_eq!(rendered, vec!["(0) !win0", "(0) &win1", "(3)  win2"]);
    }

    #[test]
    fn test_other_screens_are_skipped() {
        let (wm, _) = managed_wm(&[0x100]);
        assert!(!ClientMatcher::new(&wm, 0).is_empty());
        assert!(ClientMatcher::new(&wm, 1).is_empty());
    }
}
