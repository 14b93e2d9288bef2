// Copyright (C) 2021  Anthony DeDominic <adedomin@gmail.com>

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.

use crate::state::history::HistInfo;
use crate::state::nick::Nick;

/// A channel or query buffer. Queries reuse this same type (per the
/// glossary) but live in `Server::queries` instead of `Server::channels`.
#[derive(Debug)]
pub struct Channel {
    pub name: String,
    pub mode: Option<String>,
    pub topic: Option<String>,
    pub is_query: bool,
    /// Retained after PART/KICK/self-QUIT so scrollback stays browsable;
    /// re-activates (cleared) on rejoin.
    pub old: bool,
    pub nicks: Vec<Nick>,
    pub history: HistInfo,
}

impl Channel {
    pub fn new(name: &str, is_query: bool) -> Self {
        Channel {
            name: name.to_string(),
            mode: None,
            topic: None,
            is_query,
            old: false,
            nicks: Vec::new(),
            history: HistInfo::new(),
        }
    }

    pub fn set_old(&mut self, old: bool) {
        self.old = old;
        if !old {
            // rejoin: nick list is rebuilt from a fresh RPL_NAMREPLY, not
            // carried over from the stale membership.
            self.nicks.clear();
        }
    }

    pub fn nick_get(&self, nick: &str) -> Option<&Nick> {
        self.nicks.iter().find(|n| n.nick == nick)
    }

    pub fn nick_get_mut(&mut self, nick: &str) -> Option<&mut Nick> {
        self.nicks.iter_mut().find(|n| n.nick == nick)
    }

    pub fn nick_add(&mut self, nick: Nick) {
        if self.nick_get(&nick.nick).is_none() {
            self.nicks.push(nick);
        }
    }

    pub fn nick_remove(&mut self, nick: &str) -> bool {
        let before = self.nicks.len();
        self.nicks.retain(|n| n.nick != nick);
        self.nicks.len() != before
    }

    /// Renames a member in place, preserving its `priv` (§8 invariant 6).
    pub fn nick_rename(&mut self, from: &str, to: &str) {
        if let Some(n) = self.nick_get_mut(from) {
            n.nick = to.to_string();
        }
    }
}

/// A list of channels or queries, keyed by name (case-sensitive; the
/// casemapping-aware lookup lives at the handler layer where the
/// server's `CaseMapping` is in scope).
#[derive(Debug, Default)]
pub struct ChannelList {
    channels: Vec<Channel>,
}

impl ChannelList {
    pub fn new() -> Self {
        ChannelList {
            channels: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.name == name)
    }

    /// `chan_get`-style lookup honoring the `old` filter: `None` matches
    /// regardless of the `old` flag, `Some(b)` requires an exact match.
    pub fn get_with_old(&self, name: &str, old: Option<bool>) -> Option<&Channel> {
        self.channels
            .iter()
            .find(|c| c.name == name && old.map(|o| c.old == o).unwrap_or(true))
    }

    pub fn add(&mut self, name: &str, is_query: bool) -> &mut Channel {
        if self.get(name).is_none() {
            self.channels.push(Channel::new(name, is_query));
        }
        self.get_mut(name).unwrap()
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.channels.len();
        self.channels.retain(|c| c.name != name);
        self.channels.len() != before
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Channel> {
        self.channels.iter_mut()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut l = ChannelList::new();
        l.add("#x", false);
        l.add("#x", false);
        assert_eq!(l.iter().count(), 1);
    }

    #[test]
    fn rejoin_clears_nicks_and_old_flag() {
        let mut l = ChannelList::new();
        let c = l.add("#x", false);
        c.nick_add(Nick::new("alice", None, None, ' ', false));
        c.set_old(true);
        assert!(c.old);
        c.set_old(false);
        assert!(!c.old);
        assert!(c.nicks.is_empty());
    }

    #[test]
    fn nick_rename_preserves_priv() {
        let mut l = ChannelList::new();
        let c = l.add("#c", false);
        c.nick_add(Nick::new("me", None, None, '@', true));
        c.nick_rename("me", "newme");
        let n = c.nick_get("newme").unwrap();
        assert_eq!(n.priv_, '@');
        assert!(c.nick_get("me").is_none());
    }

    #[test]
    fn get_with_old_filter() {
        let mut l = ChannelList::new();
        let c = l.add("#x", false);
        c.set_old(true);
        assert!(l.get_with_old("#x", Some(false)).is_none());
        assert!(l.get_with_old("#x", Some(true)).is_some());
        assert!(l.get_with_old("#x", None).is_some());
    }

    /// Seeded channel-name generation, the way the teacher's
    /// `mass_channel_join` builds its fixture list.
    #[test]
    fn mass_add_of_random_channel_names_round_trips() {
        use rand::{prelude::SmallRng, Rng, SeedableRng};

        let mut prng = SmallRng::seed_from_u64(123456789);
        let mut names = Vec::new();
        while names.len() < 256 {
            let mut name = "#".to_owned();
            for _ in 0..prng.gen_range(5..30) {
                name.push(prng.gen_range('a'..'z'));
            }
            names.push(name);
        }

        let mut l = ChannelList::new();
        for name in &names {
            l.add(name, false);
        }
        let unique: std::collections::HashSet<&String> = names.iter().collect();
        assert_eq!(l.iter().count(), unique.len());
        for name in &names {
            assert!(l.get(name).is_some());
        }
    }
}
