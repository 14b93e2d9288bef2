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

use std::io;
use std::net::ToSocketAddrs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, error, info, warn};
use mio::net::TcpStream as MioTcpStream;
use mio::{Events, Interest, Poll, Token};
use mio_signals::{SignalSet, Signals};

use crate::config::Config;
use crate::error::CoreError;
use crate::handlers::{self, DispatchCtx};
use crate::irc::parse::Message;
use crate::schedule::Trigger;
use crate::state::history::{Activity, HistOpt};
use crate::state::server::{reconnect_delay, ConnStatus};
use crate::state::Core;
use crate::transport::Transport;

const SIGNAL_TOKEN: Token = Token(usize::MAX);
const POLL_BUDGET: Duration = Duration::from_millis(25);

fn now() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs() as i64).unwrap_or(0)
}

fn server_token(idx: usize) -> Token {
    Token(idx)
}

fn open_conn(host: &str, port: u16) -> io::Result<MioTcpStream> {
    let mut addrs = (host, port).to_socket_addrs()?;
    let mut last_err = io::Error::new(io::ErrorKind::Other, "no addresses resolved");
    loop {
        match addrs.next() {
            Some(addr) => match MioTcpStream::connect(addr) {
                Ok(s) => return Ok(s),
                Err(e) => last_err = e,
            },
            None => return Err(last_err),
        }
    }
}

/// Owns the live transports the poll loop multiplexes over; `Core` owns
/// only protocol state (§5: core holds no I/O handles of its own).
struct Conns {
    transports: Vec<Option<Transport>>,
}

impl Conns {
    fn new(n: usize) -> Self {
        let mut transports = Vec::with_capacity(n);
        transports.resize_with(n, || None);
        Conns { transports }
    }
}

fn connect_server(poll: &Poll, conns: &mut Conns, core: &mut Core, idx: usize, _cfg: &Config) {
    let server = &mut core.servers[idx];
    info!("connecting to {} ({}:{})", server.name, server.host, server.port);
    server.status = ConnStatus::Connecting;
    match open_conn(&server.host, server.port) {
        Ok(sock) => {
            let result = if server.tls.enabled {
                Transport::tls(sock, &server.host, server.tls.verify)
            } else {
                Ok(Transport::plain(sock))
            };
            match result {
                Ok(mut t) => {
                    if let Err(e) = t.register(poll.registry(), server_token(idx), Interest::READABLE | Interest::WRITABLE) {
                        warn!("register failed for {}: {}", server.name, e);
                    }
                    conns.transports[idx] = Some(t);
                }
                Err(e) => {
                    error!("tls setup failed for {}: {}", server.name, e);
                    server.status = ConnStatus::Disconnected;
                    server.timers.connect_fail_count += 1;
                }
            }
        }
        Err(e) => {
            error!("connect failed for {}: {}", server.name, e);
            server.status = ConnStatus::Disconnected;
            server.timers.connect_fail_count += 1;
            server.timers.last_connected = now();
        }
    }
}

fn send_registration(server: &crate::state::server::Server, out: &mut Vec<String>) {
    out.push("CAP LS".to_string());
    out.push("CAP REQ :multi-prefix".to_string());
    if let Some(pass) = &server.identity.password {
        out.push(format!("PASS {}", pass));
    }
    out.push(format!("NICK {}", server.identity.nick));
    out.push(format!("USER {} 0 * :{}", server.identity.user, server.identity.real));
}

fn disconnect_with_entry(core: &mut Core, idx: usize, cfg: &Config, reconnect: bool, reason: &str) {
    let n = now();
    let server = &mut core.servers[idx];
    warn!("{} disconnected: {}", server.name, reason);
    server.disconnect(reconnect);
    server.timers.last_connected = n;
    let selected = core.selected == crate::state::Selection::Server(idx);
    let main_selected = core.main_selected();
    core.servers[idx].hist_add(
        &mut core.main,
        main_selected,
        &cfg.log_dir(),
        None,
        None,
        &format!("CONNECTLOST {}", reason),
        Vec::new(),
        Activity::Error,
        n,
        HistOpt::DFL | HistOpt::SERR,
        selected,
    );
}

fn pump_server(poll: &Poll, conns: &mut Conns, core: &mut Core, idx: usize, cfg: &Config) {
    let handshake = match conns.transports[idx].as_mut() {
        Some(t) => t.try_complete_handshake(),
        None => return,
    };
    match handshake {
        Ok(true) => {}
        Ok(false) => return,
        Err(e) => {
            disconnect_with_entry(core, idx, cfg, true, &e.to_string());
            conns.transports[idx] = None;
            return;
        }
    }

    let readable = conns.transports[idx].as_mut().unwrap().read_lines();
    match readable {
        Ok(lines) => {
            for line in lines {
                debug!("[{}] <- {}", core.servers[idx].name, String::from_utf8_lossy(&line));
                process_line(core, idx, cfg, &line);
                let out_lines = drain_now_writes(core, idx);
                if let Some(t) = conns.transports[idx].as_mut() {
                    for out_line in out_lines {
                        let _ = t.write_line(&out_line);
                    }
                }
            }
            core.servers[idx].timers.ping_sent = None;
            core.servers[idx].timers.last_recv = Some(now());
        }
        Err(e) => {
            disconnect_with_entry(core, idx, cfg, true, &e.to_string());
            if let Some(mut t) = conns.transports[idx].take() {
                let _ = t.deregister(poll.registry());
            }
        }
    }
}

fn drain_now_writes(core: &mut Core, idx: usize) -> Vec<String> {
    core.servers[idx].schedule.pull(&Trigger::Now)
}

fn process_line(core: &mut Core, idx: usize, cfg: &Config, line: &[u8]) {
    let msg = Message::new(line);
    if msg.is_empty() {
        return;
    }
    let selection = core.selected.clone();
    let is_selected = move |target: Option<&str>| -> bool {
        match (&selection, target) {
            (crate::state::Selection::Server(i), None) => *i == idx,
            (crate::state::Selection::Channel(i, n), Some(t)) => *i == idx && n == t,
            (crate::state::Selection::Query(i, n), Some(t)) => *i == idx && n == t,
            _ => false,
        }
    };
    let log_dir = cfg.log_dir();
    let main_selected = core.main_selected();
    let n = now();
    let mut outbound = {
        let server = &mut core.servers[idx];
        let mut ctx = DispatchCtx {
            main: &mut core.main,
            main_selected,
            def_chantypes: &cfg.def.chantypes,
            log_dir: &log_dir,
            motd_removedash: cfg.motd.removedash,
            now: n,
            is_selected: &is_selected,
        };
        handlers::dispatch(&msg, server, &mut ctx)
    };
    // queue dispatch-produced lines through `Now` so the same ordering
    // guarantee (§5c) covers both handler output and user-submitted writes.
    for line in outbound.drain(..) {
        core.servers[idx].schedule.push(Trigger::Now, &line);
    }
}

fn maybe_ping_or_reconnect(poll: &Poll, conns: &mut Conns, core: &mut Core, idx: usize, cfg: &Config) {
    let t = now();
    let status = core.servers[idx].status;
    match status {
        ConnStatus::Connected => {
            let ping_sent = core.servers[idx].timers.ping_sent;
            match ping_sent {
                None => {
                    if let Some(last) = core.servers[idx].timers.last_recv {
                        if t - last >= cfg.misc.pingtime as i64 {
                            core.servers[idx].timers.ping_sent = Some(t);
                            core.servers[idx].schedule.push(Trigger::Now, &format!("PING :{}", t));
                        }
                    }
                }
                Some(sent) if t - sent >= cfg.misc.pingtime as i64 => {
                    disconnect_with_entry(core, idx, cfg, true, "no ping reply");
                    if let Some(mut tr) = conns.transports[idx].take() {
                        let _ = tr.deregister(poll.registry());
                    }
                }
                Some(_) => {}
            }
        }
        ConnStatus::Disconnected => {
            let reconnect_wanted = core.servers[idx].reconnect_wanted;
            if reconnect_wanted {
                let fail_count = core.servers[idx].timers.connect_fail_count;
                let last_connected = core.servers[idx].timers.last_connected;
                let delay = reconnect_delay(fail_count, cfg.reconnect.interval, cfg.reconnect.maxinterval);
                if t - last_connected >= delay {
                    connect_server(poll, conns, core, idx, cfg);
                    if core.servers[idx].status == ConnStatus::Connecting {
                        let mut lines = Vec::new();
                        send_registration(&core.servers[idx], &mut lines);
                        for l in lines {
                            core.servers[idx].schedule.push(Trigger::Now, &l);
                        }
                    }
                }
            }
        }
        ConnStatus::Connecting => {}
    }
}

fn flush_scheduled_now(conns: &mut Conns, core: &mut Core, idx: usize) {
    let lines = core.servers[idx].schedule.pull(&Trigger::Now);
    if let Some(t) = conns.transports[idx].as_mut() {
        for line in lines {
            let _ = t.write_line(&line);
        }
        let _ = t.flush();
    }
}

/// Runs the single-threaded cooperative loop (§4.8) until a terminating
/// signal arrives, then issues a best-effort `QUIT` on every connected
/// server before returning.
pub fn run(core: &mut Core, cfg: &Config, quit_message: &str) -> Result<(), CoreError> {
    let mut poll = Poll::new()?;
    let mut events = Events::with_capacity(128);
    let mut signals = Signals::new(SignalSet::all())?;
    poll.registry().register(&mut signals, SIGNAL_TOKEN, Interest::READABLE)?;

    let mut conns = Conns::new(core.servers.len());
    for idx in 0..core.servers.len() {
        if core.servers[idx].reconnect_wanted {
            connect_server(&poll, &mut conns, core, idx, cfg);
            if core.servers[idx].status == ConnStatus::Connecting {
                let mut lines = Vec::new();
                send_registration(&core.servers[idx], &mut lines);
                for l in lines {
                    core.servers[idx].schedule.push(Trigger::Now, &l);
                }
            }
        }
    }

    'outer: loop {
        poll.poll(&mut events, Some(POLL_BUDGET))?;
        for event in &events {
            if event.token() == SIGNAL_TOKEN {
                info!("shutdown signal received");
                break 'outer;
            }
            let idx = event.token().0;
            if idx >= core.servers.len() {
                continue;
            }
            pump_server(&poll, &mut conns, core, idx, cfg);
        }

        for idx in 0..core.servers.len() {
            maybe_ping_or_reconnect(&poll, &mut conns, core, idx, cfg);
            flush_scheduled_now(&mut conns, core, idx);
        }
    }

    for idx in 0..core.servers.len() {
        if core.servers[idx].status == ConnStatus::Connected {
            if let Some(t) = conns.transports[idx].as_mut() {
                let _ = t.write_line(&format!("QUIT :{}", quit_message));
                let _ = t.flush();
            }
        }
    }
    Ok(())
}
