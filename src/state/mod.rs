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

pub mod channel;
pub mod history;
pub mod nick;
pub mod server;
pub mod support;

use crate::config::Config;
use crate::state::history::HistInfo;
use crate::state::server::Server;

/// Aggregate, UI-agnostic client state (§5's "shared resources"): every
/// server the user configured plus the single global main buffer they all
/// fan writes into via `Server::hist_add`.
#[derive(Debug)]
pub struct Core {
    pub servers: Vec<Server>,
    pub main: HistInfo,
    pub selected: Selection,
}

/// What buffer the UI layer currently has focused; owned here rather than
/// by the (not-in-scope) UI so that unread/activity bumping can check it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Main,
    Server(usize),
    Channel(usize, String),
    Query(usize, String),
}

impl Core {
    pub fn from_config(cfg: &Config) -> Self {
        let servers = cfg
            .servers
            .iter()
            .map(|sc| {
                Server::from_config(
                    &cfg.def.chantypes,
                    &cfg.def.prefixes,
                    sc,
                    &cfg.def.nick,
                    &cfg.def.user,
                    &cfg.def.real,
                )
            })
            .collect();
        Core {
            servers,
            main: HistInfo::new(),
            selected: Selection::Main,
        }
    }

    pub fn server(&self, idx: usize) -> Option<&Server> {
        self.servers.get(idx)
    }

    pub fn server_mut(&mut self, idx: usize) -> Option<&mut Server> {
        self.servers.get_mut(idx)
    }

    pub fn server_by_name(&self, name: &str) -> Option<&Server> {
        self.servers.iter().find(|s| s.name == name)
    }

    pub fn server_by_name_mut(&mut self, name: &str) -> Option<&mut Server> {
        self.servers.iter_mut().find(|s| s.name == name)
    }

    /// Whether `target` is currently the user's selected buffer, the value
    /// `hist_add`'s `selected`/`main_selected` flags need.
    pub fn is_selected(&self, idx: usize, target: Option<&str>) -> bool {
        match (&self.selected, target) {
            (Selection::Server(i), None) => *i == idx,
            (Selection::Channel(i, n), Some(t)) => *i == idx && n == t,
            (Selection::Query(i, n), Some(t)) => *i == idx && n == t,
            _ => false,
        }
    }

    pub fn main_selected(&self) -> bool {
        self.selected == Selection::Main
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::Config;

    fn cfg() -> Config {
        Config::from_str(
            r#"
            [[server]]
            name = "net"
            host = "irc.example"
            "#,
        )
        .unwrap()
    }

    #[test]
    fn core_builds_one_server_per_config_entry() {
        let core = Core::from_config(&cfg());
        assert_eq!(core.servers.len(), 1);
        assert_eq!(core.server_by_name("net").unwrap().host, "irc.example");
    }

    #[test]
    fn selection_tracks_focused_buffer() {
        let mut core = Core::from_config(&cfg());
        assert!(core.main_selected());
        core.selected = Selection::Channel(0, "#chan".to_string());
        assert!(core.is_selected(0, Some("#chan")));
        assert!(!core.is_selected(0, Some("#other")));
        assert!(!core.main_selected());
    }
}
