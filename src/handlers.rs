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

use crate::expect::ExpectKind;
use crate::irc::parse::Message;
use crate::schedule::Trigger;
use crate::state::history::{Activity, HistInfo, HistOpt};
use crate::state::nick::Nick;
use crate::state::server::{ConnStatus, Server};

/// Lines dispatch wants written to the wire right now; deferred writes go
/// through `server.schedule` instead and are pulled by the poll loop.
pub type Outbound = Vec<String>;

fn bstr(b: Option<&[u8]>) -> String {
    b.map(|b| String::from_utf8_lossy(b).into_owned()).unwrap_or_default()
}

fn param(msg: &Message, idx: usize) -> String {
    msg.params.get(idx).map(|p| String::from_utf8_lossy(p).into_owned()).unwrap_or_default()
}

fn opt_bstr(b: Option<&[u8]>) -> Option<String> {
    b.map(|b| String::from_utf8_lossy(b).into_owned())
}

fn from_nick(msg: &Message) -> Option<Nick> {
    msg.nick.map(|_| Nick::new(&bstr(msg.nick), opt_bstr(msg.ident).as_deref(), opt_bstr(msg.host).as_deref(), ' ', false))
}

/// Keywords that make an `ERROR` line non-recoverable (§4.3); matched
/// case-insensitively against the whole raw line.
const ERROR_FATAL_KEYWORDS: [&str; 8] = [
    "unauthorized",
    "invalid",
    "kill",
    "ban",
    "kline",
    "gline",
    "k-line",
    "g-line",
];

pub fn error_is_fatal(raw: &str) -> bool {
    let lower = raw.to_lowercase();
    ERROR_FATAL_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Parameters every dispatch call needs beyond the message and server.
pub struct DispatchCtx<'a> {
    pub main: &'a mut HistInfo,
    pub main_selected: bool,
    pub def_chantypes: &'a str,
    pub log_dir: &'a str,
    pub motd_removedash: bool,
    pub now: i64,
    pub is_selected: &'a dyn Fn(Option<&str>) -> bool,
}

fn log_server(server: &mut Server, ctx: &mut DispatchCtx, raw: &str, from: Option<Nick>, activity: Activity, opts: HistOpt) {
    let selected = (ctx.is_selected)(None);
    server.hist_add(
        ctx.main,
        ctx.main_selected,
        ctx.log_dir,
        None,
        from,
        raw,
        Vec::new(),
        activity,
        ctx.now,
        opts,
        selected,
    );
}

fn log_channel(server: &mut Server, ctx: &mut DispatchCtx, chan: &str, raw: &str, from: Option<Nick>, activity: Activity, opts: HistOpt) {
    let selected = (ctx.is_selected)(Some(chan));
    server.hist_add(
        ctx.main,
        ctx.main_selected,
        ctx.log_dir,
        Some(chan),
        from,
        raw,
        Vec::new(),
        activity,
        ctx.now,
        opts,
        selected,
    );
}

/// Dispatches one parsed message against `server`'s state, returning any
/// lines that should be written to the wire immediately (§4.3). Deferred
/// writes are pushed onto `server.schedule` and fired by the poll loop.
pub fn dispatch(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) -> Outbound {
    let mut out = Outbound::new();
    let cmd = bstr(msg.command);

    // scheduler fires for the raw command tag before the handler runs, so
    // a deferred JOIN keyed on "376" goes out alongside this message's own
    // reaction to it.
    out.extend(server.schedule.pull(&Trigger::Command(cmd.clone())));

    if msg.is_numeric() {
        dispatch_numeric(&cmd, msg, server, ctx, &mut out);
        return out;
    }

    match cmd.as_str() {
        "PING" => out.push(format!("PONG :{}", param(msg, 0))),
        "PONG" => {
            let arg = param(msg, msg.params.len().saturating_sub(1));
            server.expect.take_if_matches(ExpectKind::Pong, &arg);
            log_server(server, ctx, "PONG", from_nick(msg), Activity::Status, HistOpt::LOG);
        }
        "JOIN" => handle_join(msg, server, ctx),
        "PART" => handle_part(msg, server, ctx),
        "KICK" => handle_kick(msg, server, ctx),
        "QUIT" => handle_quit(msg, server, ctx),
        "NICK" => handle_nick(msg, server, ctx),
        "MODE" => handle_mode(msg, server, ctx, &mut out),
        "TOPIC" => handle_topic(msg, server, ctx),
        "PRIVMSG" | "NOTICE" => handle_privmsg(&cmd, msg, server, ctx),
        "INVITE" => handle_invite(msg, server, ctx),
        "ERROR" => handle_error(msg, server, ctx),
        "CAP" => handle_cap(msg, server, &mut out),
        _ => {
            log_server(server, ctx, &cmd, from_nick(msg), Activity::Status, HistOpt::DFL);
        }
    }
    out
}

fn handle_join(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let chan_name = param(msg, 0);
    let nick = bstr(msg.nick);
    let is_self = nick == server.self_nick;
    let chan = server.channels.add(&chan_name, false);
    chan.set_old(false);
    chan.nick_add(Nick::new(&nick, opt_bstr(msg.ident).as_deref(), opt_bstr(msg.host).as_deref(), ' ', is_self));
    if is_self {
        server.expect.clear(ExpectKind::Join);
    }
    log_server(server, ctx, &format!("JOIN {} {}", chan_name, nick), from_nick(msg), Activity::Status, HistOpt::LOG);
    log_channel(server, ctx, &chan_name, &format!("JOIN {}", nick), from_nick(msg), Activity::Status, HistOpt::SHOW);
}

fn handle_part(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let chan_name = param(msg, 0);
    let nick = bstr(msg.nick);
    let is_self = nick == server.self_nick;
    if is_self {
        if let Some(chan) = server.channels.get_mut(&chan_name) {
            chan.set_old(true);
        }
        server.expect.clear(ExpectKind::Part);
    } else if let Some(chan) = server.channels.get_mut(&chan_name) {
        chan.nick_remove(&nick);
    }
    log_server(server, ctx, &format!("PART {} {}", chan_name, nick), from_nick(msg), Activity::Status, HistOpt::LOG);
    log_channel(server, ctx, &chan_name, &format!("PART {}", nick), from_nick(msg), Activity::Status, HistOpt::SHOW);
}

fn handle_kick(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let chan_name = param(msg, 0);
    let target = param(msg, 1);
    let is_self = target == server.self_nick;
    if is_self {
        if let Some(chan) = server.channels.get_mut(&chan_name) {
            chan.set_old(true);
        }
    } else if let Some(chan) = server.channels.get_mut(&chan_name) {
        chan.nick_remove(&target);
    }
    let raw = format!("KICK {} {} :{}", chan_name, target, param(msg, 2));
    log_server(server, ctx, &raw, from_nick(msg), Activity::Status, HistOpt::LOG);
    log_channel(server, ctx, &chan_name, &raw, from_nick(msg), Activity::Status, HistOpt::SHOW);
}

fn handle_quit(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let nick = bstr(msg.nick);
    let is_self = nick == server.self_nick;
    if is_self {
        server.disconnect(false);
        log_server(server, ctx, "QUIT (self)", from_nick(msg), Activity::Status, HistOpt::LOG);
        return;
    }
    let affected: Vec<String> = server
        .channels
        .iter()
        .filter(|c| c.nick_get(&nick).is_some())
        .map(|c| c.name.clone())
        .collect();
    for name in &affected {
        if let Some(c) = server.channels.get_mut(name) {
            c.nick_remove(&nick);
        }
    }
    let raw = format!("QUIT {} :{}", nick, param(msg, 0));
    log_server(server, ctx, &raw, from_nick(msg), Activity::Status, HistOpt::LOG);
    for name in &affected {
        log_channel(server, ctx, name, &raw, from_nick(msg), Activity::Status, HistOpt::SHOW);
    }
}

fn handle_nick(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let old = bstr(msg.nick);
    let new = param(msg, 0);
    let is_self = old == server.self_nick;
    if is_self {
        server.self_nick = new.clone();
        server.expect.clear(ExpectKind::NicknameInUse);
    }
    let affected: Vec<String> = server
        .channels
        .iter()
        .filter(|c| c.nick_get(&old).is_some())
        .map(|c| c.name.clone())
        .collect();
    for name in &affected {
        if let Some(c) = server.channels.get_mut(name) {
            c.nick_rename(&old, &new);
        }
    }
    let raw = format!("NICK {} {}", old, new);
    log_server(server, ctx, &raw, from_nick(msg), Activity::Status, HistOpt::LOG);
    for name in &affected {
        log_channel(server, ctx, name, &raw, from_nick(msg), Activity::Status, HistOpt::SHOW);
    }
}

fn handle_mode(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx, out: &mut Outbound) {
    let target = param(msg, 0);
    let raw = format!("MODE {}", msg.params.iter().map(|p| String::from_utf8_lossy(p).into_owned()).collect::<Vec<_>>().join(" "));
    if server.is_channel(&target, ctx.def_chantypes) {
        server.expect.clear(ExpectKind::NoSuchNick);
        log_channel(server, ctx, &target, &raw, from_nick(msg), Activity::Status, HistOpt::LOG);
        out.push(format!("MODE {}", target));
        out.push(format!("NAMES {}", target));
    } else {
        log_server(server, ctx, &raw, from_nick(msg), Activity::Status, HistOpt::LOG);
    }
}

fn handle_topic(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let chan_name = param(msg, 0);
    let topic = param(msg, 1);
    if let Some(chan) = server.channels.get_mut(&chan_name) {
        chan.topic = Some(topic.clone());
    }
    log_channel(server, ctx, &chan_name, &format!("TOPIC {} :{}", chan_name, topic), from_nick(msg), Activity::Status, HistOpt::DFL);
}

fn handle_privmsg(cmd: &str, msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let target = param(msg, 0);
    let body = param(msg, 1);
    let nick = bstr(msg.nick);
    let is_self_source = nick == server.self_nick;
    let is_directed_at_self = target == server.self_nick;
    let raw = format!("{} {} :{}", cmd, target, body);

    let is_server_source = msg.ident.is_none() && msg.host.is_none() || nick.contains('.');
    if is_server_source {
        log_server(server, ctx, &raw, from_nick(msg), Activity::Status, HistOpt::LOG);
        return;
    }

    let mentions_self = body.contains(&server.self_nick);
    let notice = cmd == "NOTICE";
    let base_activity = if notice { Activity::Status } else { Activity::Message };
    let activity = if (is_directed_at_self || mentions_self) && !notice {
        Activity::Hilight
    } else {
        base_activity
    };

    if !server.is_channel(&target, ctx.def_chantypes) {
        // query: target == self (incoming DM) or self-sourced (outgoing, mirrored)
        let query_with = if is_directed_at_self { nick.clone() } else { target.clone() };
        server.queries.add(&query_with, true);
        log_channel(server, ctx, &query_with, &raw, from_nick(msg), activity, HistOpt::DFL);
        return;
    }

    if is_self_source {
        log_channel(server, ctx, &target, &raw, from_nick(msg), Activity::Message, HistOpt::DFL);
        return;
    }

    log_channel(server, ctx, &target, &raw, from_nick(msg), activity, HistOpt::DFL);
}

fn handle_invite(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let inviter = bstr(msg.nick);
    let chan = param(msg, 1);
    let raw = format!("INVITE {} :{}", bstr(msg.nick), chan);
    if server.queries.get(&inviter).is_some() {
        log_channel(server, ctx, &inviter, &raw, from_nick(msg), Activity::Status, HistOpt::DFL);
    } else {
        log_server(server, ctx, &raw, from_nick(msg), Activity::Status, HistOpt::DFL);
    }
}

fn handle_error(msg: &Message, server: &mut Server, ctx: &mut DispatchCtx) {
    let text = param(msg, 0);
    let raw = format!("ERROR :{}", text);
    let fatal = error_is_fatal(&raw);
    server.disconnect(!fatal);
    log_server(server, ctx, &raw, None, Activity::Error, HistOpt::DFL | HistOpt::SERR);
}

fn handle_cap(msg: &Message, server: &mut Server, out: &mut Outbound) {
    let sub = param(msg, 1);
    if sub.eq_ignore_ascii_case("ACK") {
        let caps = param(msg, 2);
        let _multi_prefix = caps.split_whitespace().any(|c| c == "multi-prefix");
    }
    out.push("CAP END".to_string());
    let _ = server;
}

fn dispatch_numeric(cmd: &str, msg: &Message, server: &mut Server, ctx: &mut DispatchCtx, out: &mut Outbound) {
    match cmd {
        "001" => {
            server.status = ConnStatus::Connected;
            server.really_connected = true;
            server.timers.connect_fail_count = 0;
            for line in server.autocmds.clone() {
                out.push(line);
            }
            log_server(server, ctx, "RPL_WELCOME", None, Activity::Status, HistOpt::DFL);
        }
        "005" => {
            for p in msg.params.iter().skip(1) {
                let s = String::from_utf8_lossy(p);
                if s.starts_with("are supported") {
                    continue;
                }
                server.supports.apply_token(&s);
            }
            let cm = server.supports.get("CASEMAPPING").map(str::to_string);
            server.casemapping = crate::state::nick::CaseMapping::from_isupport(cm.as_deref());
            log_server(server, ctx, "RPL_ISUPPORT", None, Activity::Status, HistOpt::LOG);
        }
        "324" => {
            let chan_name = param(msg, 1);
            let mode = param(msg, 2);
            if let Some(c) = server.channels.get_mut(&chan_name) {
                c.mode = Some(mode.clone());
            }
            let show = server.expect.take_if_matches(ExpectKind::ChannelModeIs, &chan_name);
            let opts = if show { HistOpt::DFL } else { HistOpt::LOG };
            log_channel(server, ctx, &chan_name, &format!("324 {} {}", chan_name, mode), None, Activity::Status, opts);
        }
        "331" | "332" => {
            let chan_name = param(msg, 1);
            let topic = if cmd == "332" { param(msg, 2) } else { String::new() };
            if let Some(c) = server.channels.get_mut(&chan_name) {
                c.topic = Some(topic.clone());
            }
            let show = server.expect.take_if_matches(ExpectKind::Topic, &chan_name);
            if cmd == "332" {
                server.expect.set(ExpectKind::TopicWhoTime, &chan_name);
            }
            let opts = if show { HistOpt::DFL } else { HistOpt::LOG };
            log_channel(server, ctx, &chan_name, &format!("{} {} :{}", cmd, chan_name, topic), None, Activity::Status, opts);
        }
        "333" => {
            let chan_name = param(msg, 1);
            if server.expect.take_if_matches(ExpectKind::TopicWhoTime, &chan_name) {
                log_channel(server, ctx, &chan_name, &format!("333 {}", chan_name), None, Activity::Status, HistOpt::DFL);
            }
        }
        "341" => {
            let chan_name = param(msg, 1);
            log_channel(server, ctx, &chan_name, &format!("341 {}", chan_name), None, Activity::Status, HistOpt::DFL);
        }
        "353" => {
            let chan_name = param(msg, 2);
            let names = param(msg, 3);
            let symbols = server.supports.prefix_symbols("@+");
            let chan = server.channels.add(&chan_name, false);
            for n in names.split_whitespace() {
                let mut priv_ = ' ';
                let mut rest = n;
                if let Some(c) = n.chars().next() {
                    if symbols.contains(c) {
                        priv_ = c;
                        rest = &n[c.len_utf8()..];
                    }
                }
                let is_self = rest == server.self_nick;
                if let Some(existing) = chan.nick_get_mut(rest) {
                    existing.priv_ = priv_;
                } else {
                    chan.nick_add(Nick::new(rest, None, None, priv_, is_self));
                }
            }
            log_server(server, ctx, &format!("353 {} :{}", chan_name, names), None, Activity::Status, HistOpt::LOG);
        }
        "366" => {
            let chan_name = param(msg, 1);
            server.expect.take_if_matches(ExpectKind::Names, &chan_name);
            log_server(server, ctx, &format!("366 {}", chan_name), None, Activity::Status, HistOpt::LOG);
        }
        "372" | "375" | "376" => {
            let mut text = param(msg, msg.params.len().saturating_sub(1));
            if ctx.motd_removedash {
                if let Some(stripped) = text.strip_prefix("- ") {
                    text = stripped.to_string();
                }
            }
            if cmd == "376" && server.status != ConnStatus::Connected {
                server.status = ConnStatus::Connected;
            }
            if cmd == "376" && !server.really_connected {
                server.really_connected = true;
                for line in server.autocmds.clone() {
                    out.push(line);
                }
            }
            log_server(server, ctx, &format!("{} :{}", cmd, text), None, Activity::Status, HistOpt::DFL);
        }
        "401" => {
            let target = param(msg, 1);
            if server.expect.take_if_matches(ExpectKind::NoSuchNick, &target) {
                if server.channels.get(&target).is_some() {
                    log_channel(server, ctx, &target, "401 no such nick", None, Activity::Error, HistOpt::DFL | HistOpt::ERR);
                } else {
                    log_server(server, ctx, "401 no such nick", None, Activity::Error, HistOpt::DFL | HistOpt::ERR);
                }
            }
        }
        "433" => {
            if server.expect.take_if_matches(ExpectKind::NicknameInUse, &server.self_nick.clone()) {
                log_server(server, ctx, "433 nickname in use", None, Activity::Error, HistOpt::DFL);
            } else {
                let attempted = format!("{}_", server.self_nick);
                server.expect.set(ExpectKind::NicknameInUse, &attempted);
                server.self_nick = attempted.clone();
                out.push(format!("NICK {}", attempted));
            }
        }
        _ => {
            let head = cmd.as_bytes().first().copied().unwrap_or(b'0');
            let activity = if head == b'4' || head == b'5' { Activity::Error } else { Activity::Status };
            let opts = if head == b'4' || head == b'5' { HistOpt::DFL | HistOpt::ERR } else { HistOpt::DFL };
            log_server(server, ctx, cmd, None, activity, opts);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config::ServerConfig;
    use crate::state::history::HistInfo;

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
            autocmds: vec!["JOIN #home".to_string()],
        };
        Server::from_config("#&!+", "(ov)@+", &cfg, "d", "d", "d")
    }

    fn run(msg_raw: &[u8], server: &mut Server, main: &mut HistInfo) -> Outbound {
        let msg = Message::new(msg_raw);
        let always_false = |_: Option<&str>| false;
        let mut ctx = DispatchCtx {
            main,
            main_selected: false,
            def_chantypes: "#&",
            log_dir: "/tmp/hirc-test-handlers-unused",
            motd_removedash: false,
            now: 1,
            is_selected: &always_false,
        };
        dispatch(&msg, server, &mut ctx)
    }

    #[test]
    fn ping_replies_pong() {
        let mut s = server();
        let mut main = HistInfo::new();
        let out = run(b"PING :abc123", &mut s, &mut main);
        assert_eq!(out, vec!["PONG :abc123".to_string()]);
    }

    #[test]
    fn self_join_adds_channel_and_clears_expect() {
        let mut s = server();
        s.expect.set(ExpectKind::Join, "#chan");
        let mut main = HistInfo::new();
        run(b":me!u@h JOIN #chan", &mut s, &mut main);
        assert!(s.channels.get("#chan").is_some());
        assert_eq!(s.expect.get(ExpectKind::Join), None);
    }

    #[test]
    fn welcome_flushes_autocmds() {
        let mut s = server();
        let mut main = HistInfo::new();
        let out = run(b":srv 001 me :welcome", &mut s, &mut main);
        assert_eq!(s.status, ConnStatus::Connected);
        assert_eq!(out, vec!["JOIN #home".to_string()]);
    }

    #[test]
    fn welcome_resets_connect_fail_count() {
        let mut s = server();
        s.timers.connect_fail_count = 3;
        let mut main = HistInfo::new();
        run(b":srv 001 me :welcome", &mut s, &mut main);
        assert_eq!(s.timers.connect_fail_count, 0);
    }

    #[test]
    fn notice_from_server_prefix_does_not_create_query() {
        let mut s = server();
        let mut main = HistInfo::new();
        run(b":irc.libera.chat NOTICE * :*** Checking ident", &mut s, &mut main);
        assert!(s.queries.get("*").is_none());
    }

    #[test]
    fn isupport_populates_support_table() {
        let mut s = server();
        let mut main = HistInfo::new();
        run(b":srv 005 me CHANTYPES=# PREFIX=(ov)@+ :are supported", &mut s, &mut main);
        assert_eq!(s.supports.chantypes("x"), "#");
    }

    #[test]
    fn nick_change_preserves_priv_in_channel() {
        let mut s = server();
        s.channels.add("#c", false).nick_add(Nick::new("bob", None, None, '@', false));
        let mut main = HistInfo::new();
        run(b":bob!u@h NICK newbob", &mut s, &mut main);
        let n = s.channels.get("#c").unwrap().nick_get("newbob").unwrap();
        assert_eq!(n.priv_, '@');
    }

    #[test]
    fn nickname_in_use_auto_retries_with_underscore() {
        let mut s = server();
        let mut main = HistInfo::new();
        let out = run(b":srv 433 * me :Nickname is already in use.", &mut s, &mut main);
        assert_eq!(s.self_nick, "me_");
        assert_eq!(out, vec!["NICK me_".to_string()]);
    }

    /// Seeded nick-collision-suffix property test: whatever the starting
    /// nick, each successive `433` appends exactly one more `_` and the
    /// wire output always asks for that same nick.
    #[test]
    fn nickname_in_use_appends_one_underscore_per_collision_for_random_nicks() {
        use rand::{prelude::SmallRng, Rng, SeedableRng};

        let mut prng = SmallRng::seed_from_u64(987654321);
        for _ in 0..64 {
            let len = prng.gen_range(2..10);
            let base: String = (0..len).map(|_| prng.gen_range('a'..'z')).collect();
            let collisions = prng.gen_range(1..5);

            let mut s = server();
            s.self_nick = base.clone();
            let mut main = HistInfo::new();
            for i in 0..collisions {
                let expected = format!("{}{}", base, "_".repeat(i + 1));
                let line = format!(":srv 433 * {} :Nickname is already in use.", s.self_nick);
                let out = run(line.as_bytes(), &mut s, &mut main);
                assert_eq!(s.self_nick, expected);
                assert_eq!(out, vec![format!("NICK {}", expected)]);
            }
        }
    }

    #[test]
    fn error_with_fatal_keyword_disables_reconnect() {
        let mut s = server();
        let mut main = HistInfo::new();
        run(b"ERROR :Closing Link: (K-Lined)", &mut s, &mut main);
        assert!(!s.reconnect_wanted);
    }

    #[test]
    fn error_without_fatal_keyword_requests_reconnect() {
        let mut s = server();
        let mut main = HistInfo::new();
        run(b"ERROR :Ping timeout", &mut s, &mut main);
        assert!(s.reconnect_wanted);
    }

    #[test]
    fn privmsg_to_self_creates_query() {
        let mut s = server();
        let mut main = HistInfo::new();
        run(b":alice!a@h PRIVMSG me :hi there", &mut s, &mut main);
        assert!(s.queries.get("alice").is_some());
    }

    #[test]
    fn cap_ack_ends_negotiation() {
        let mut s = server();
        let mut main = HistInfo::new();
        let out = run(b"CAP * ACK :multi-prefix", &mut s, &mut main);
        assert_eq!(out, vec!["CAP END".to_string()]);
    }
}
