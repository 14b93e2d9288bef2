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

use crate::config::ServerConfig;
use crate::expect::ExpectRegister;
use crate::schedule::Scheduler;
use crate::state::channel::ChannelList;
use crate::state::history::{log_append, AddParams, Activity, HistInfo, HistOpt};
use crate::state::nick::{CaseMapping, Nick};
use crate::state::support::Support;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnStatus {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug, Clone)]
pub struct Identity {
    pub nick: String,
    pub user: String,
    pub real: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub struct TlsOpts {
    pub enabled: bool,
    pub verify: bool,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Timers {
    pub last_recv: Option<i64>,
    pub ping_sent: Option<i64>,
    pub last_connected: i64,
    pub connect_fail_count: u32,
}

/// Per-connection record (§3). Owns its channels, queries, history, and
/// scheduling state directly rather than through back-pointers (§9):
/// callers that need "the server a channel belongs to" already have the
/// `&Server` in hand, since every lookup goes `server.channels.get(name)`.
#[derive(Debug)]
pub struct Server {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub identity: Identity,
    pub tls: TlsOpts,
    pub status: ConnStatus,
    pub self_nick: String,
    pub supports: Support,
    pub casemapping: CaseMapping,
    pub channels: ChannelList,
    pub queries: ChannelList,
    pub schedule: Scheduler,
    pub expect: ExpectRegister,
    pub history: HistInfo,
    pub autocmds: Vec<String>,
    pub timers: Timers,
    pub reconnect_wanted: bool,
    /// Cleared once RPL_WELCOME (or the ENDOFMOTD fallback) arrives;
    /// autocmds and deferred `Connected`-triggered writes wait on this.
    pub really_connected: bool,
}

impl Server {
    pub fn from_config(def_chantypes: &str, def_prefixes: &str, cfg: &ServerConfig, def_nick: &str, def_user: &str, def_real: &str) -> Self {
        let mut supports = Support::new();
        supports.apply_token(&format!("CHANTYPES={}", def_chantypes));
        supports.apply_token(&format!("PREFIX={}", def_prefixes));
        let nick = cfg.nick.clone().unwrap_or_else(|| def_nick.to_string());
        Server {
            name: cfg.name.clone(),
            host: cfg.host.clone(),
            port: cfg.port,
            identity: Identity {
                nick: nick.clone(),
                user: cfg.user.clone().unwrap_or_else(|| def_user.to_string()),
                real: cfg.real.clone().unwrap_or_else(|| def_real.to_string()),
                password: cfg.password.clone(),
            },
            tls: TlsOpts {
                enabled: cfg.tls,
                verify: cfg.tls_verify,
            },
            status: ConnStatus::Disconnected,
            self_nick: nick,
            supports,
            casemapping: CaseMapping::Rfc1459,
            channels: ChannelList::new(),
            queries: ChannelList::new(),
            schedule: Scheduler::new(),
            expect: ExpectRegister::new(),
            history: HistInfo::new(),
            autocmds: cfg.autocmds.clone(),
            timers: Timers::default(),
            reconnect_wanted: true,
            really_connected: false,
        }
    }

    pub fn is_channel(&self, target: &str, def_chantypes: &str) -> bool {
        let types = self.supports.chantypes(def_chantypes);
        target
            .chars()
            .next()
            .map(|c| types.contains(c))
            .unwrap_or(false)
    }

    pub fn modes_per_line(&self, def_modes: u32) -> u32 {
        self.supports.modes(def_modes)
    }

    fn resolve_self_from(&self, channel: Option<&str>) -> Nick {
        if let Some(c) = channel.and_then(|n| self.channels.get(n).or_else(|| self.queries.get(n))) {
            if let Some(n) = c.nick_get(&self.self_nick) {
                return n.clone();
            }
        }
        Nick::new(&self.self_nick, None, None, ' ', true)
    }

    /// Implements the full §4.6 `add` contract: SELF nick resolution, the
    /// SHOW/IGN unread bump (delegated to `HistInfo::add`), LOG append,
    /// and the recursive MAIN copy into the global main buffer.
    #[allow(clippy::too_many_arguments)]
    pub fn hist_add(
        &mut self,
        main_buf: &mut HistInfo,
        main_selected: bool,
        log_dir: &str,
        channel: Option<&str>,
        mut from: Option<Nick>,
        raw: &str,
        params: Vec<String>,
        activity: Activity,
        timestamp: i64,
        options: HistOpt,
        selected: bool,
    ) {
        if options.contains(HistOpt::SELF) {
            from = Some(self.resolve_self_from(channel));
        }

        let target = match channel {
            None => &mut self.history,
            Some(name) => {
                if let Some(c) = self.channels.get_mut(name) {
                    &mut c.history
                } else if let Some(c) = self.queries.get_mut(name) {
                    &mut c.history
                } else {
                    &mut self.history
                }
            }
        };

        let entry = target
            .add(
                selected,
                AddParams {
                    from: from.clone(),
                    raw,
                    params: params.clone(),
                    activity,
                    timestamp,
                    options,
                },
            )
            .clone();

        if options.contains(HistOpt::LOG) {
            let _ = log_append(log_dir, &self.name, channel, &entry);
        }

        if options.contains(HistOpt::MAIN) {
            main_buf.add(
                main_selected,
                AddParams {
                    from,
                    raw,
                    params,
                    activity,
                    timestamp,
                    options: HistOpt::SHOW,
                },
            );
        }
    }

    pub fn disconnect(&mut self, reconnect: bool) {
        self.status = ConnStatus::Disconnected;
        self.really_connected = false;
        self.timers.last_recv = None;
        self.timers.ping_sent = None;
        self.reconnect_wanted = reconnect;
        for c in self.channels.iter_mut() {
            c.set_old(true);
        }
    }
}

/// `min(max_interval, fail_count * base_interval)`, the monotone backoff
/// from §4.3/§8 invariant 7. `fail_count == 0` reconnects immediately.
pub fn reconnect_delay(fail_count: u32, base_interval: u64, max_interval: u64) -> u64 {
    (fail_count as u64 * base_interval).min(max_interval)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ServerConfig;

    fn server() -> Server {
        let cfg = ServerConfig {
            name: "net".to_string(),
            host: "irc.example".to_string(),
            port: 6667,
            nick: Some("me".to_string()),
            user: None,
            real: None,
            password: None,
            tls: false,
            tls_verify: true,
            autocmds: Vec::new(),
        };
        Server::from_config("#&!+", "(ov)@+", &cfg, "d", "d", "d")
    }

    #[test]
    fn is_channel_uses_chantypes() {
        let s = server();
        assert!(s.is_channel("#chan", "#&"));
        assert!(!s.is_channel("alice", "#&"));
    }

    #[test]
    fn reconnect_backoff_is_monotone_and_capped() {
        assert_eq!(reconnect_delay(0, 10, 300), 0);
        assert_eq!(reconnect_delay(1, 10, 300), 10);
        assert_eq!(reconnect_delay(5, 10, 300), 50);
        assert_eq!(reconnect_delay(100, 10, 300), 300);
    }

    #[test]
    fn hist_add_main_copies_into_main_buffer() {
        let mut s = server();
        let mut main = HistInfo::new();
        s.hist_add(
            &mut main,
            false,
            "/tmp/hirc-test-logs-unused",
            None,
            None,
            "SELF_CONNECTING net :connecting",
            Vec::new(),
            Activity::Status,
            1,
            HistOpt::SHOW | HistOpt::MAIN,
            false,
        );
        assert_eq!(main.len(), 1);
        assert_eq!(s.history.len(), 1);
    }

    #[test]
    fn hist_add_self_resolves_own_channel_priv() {
        let mut s = server();
        s.channels.add("#c", false);
        s.channels
            .get_mut("#c")
            .unwrap()
            .nick_add(Nick::new("me", None, None, '@', true));
        let mut main = HistInfo::new();
        s.hist_add(
            &mut main,
            false,
            "/tmp/hirc-test-logs-unused",
            Some("#c"),
            None,
            "me!x@y PART #c",
            Vec::new(),
            Activity::Status,
            1,
            HistOpt::SHOW | HistOpt::SELF,
            true,
        );
        let chan = s.channels.get("#c").unwrap();
        let entry = chan.history.iter().next().unwrap();
        assert_eq!(entry.from.as_ref().unwrap().priv_, '@');
    }

    #[test]
    fn disconnect_marks_all_channels_old() {
        let mut s = server();
        s.channels.add("#a", false);
        s.channels.add("#b", false);
        s.disconnect(true);
        assert_eq!(s.status, ConnStatus::Disconnected);
        assert!(s.reconnect_wanted);
        assert!(s.channels.iter().all(|c| c.old));
    }
}
