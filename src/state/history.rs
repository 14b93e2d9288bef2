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

use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::ops::{BitAnd, BitOr};
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

use crate::state::nick::Nick;

/// Real maximum per buffer; the original C comment notes the practical
/// memory bound is `HIST_MAX * (channels + servers + queries)`.
pub const HIST_MAX: usize = 8192;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Activity {
    None,
    /// Doubles as "notice" the way the original client's enum collapsed
    /// status and notice into one ordinal.
    Status,
    Error,
    Message,
    Hilight,
}

impl Default for Activity {
    fn default() -> Self {
        Activity::None
    }
}

/// Bitset of per-entry history options. Hand-rolled rather than pulling in
/// a crate for twelve flags nothing else in the workspace needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistOpt(u16);

impl HistOpt {
    pub const NONE: HistOpt = HistOpt(0);
    pub const SHOW: HistOpt = HistOpt(1 << 0);
    pub const LOG: HistOpt = HistOpt(1 << 1);
    pub const MAIN: HistOpt = HistOpt(1 << 2);
    pub const SELF: HistOpt = HistOpt(1 << 3);
    pub const TMP: HistOpt = HistOpt(1 << 4);
    pub const GREP: HistOpt = HistOpt(1 << 5);
    pub const ERR: HistOpt = HistOpt(1 << 6);
    pub const SERR: HistOpt = HistOpt(1 << 7);
    pub const RLOG: HistOpt = HistOpt(1 << 8);
    pub const IGN: HistOpt = HistOpt(1 << 9);
    pub const UI: HistOpt = HistOpt(1 << 10);
    pub const NIGN: HistOpt = HistOpt(1 << 11);
    pub const ALL: HistOpt = HistOpt(0xFFFF);
    /// Default for most protocol-driven entries: shown and logged.
    pub const DFL: HistOpt = HistOpt(Self::SHOW.0 | Self::LOG.0);

    pub fn contains(self, other: HistOpt) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn intersects(self, other: HistOpt) -> bool {
        self.0 & other.0 != 0
    }
}

impl BitOr for HistOpt {
    type Output = HistOpt;
    fn bitor(self, rhs: HistOpt) -> HistOpt {
        HistOpt(self.0 | rhs.0)
    }
}

impl BitAnd for HistOpt {
    type Output = HistOpt;
    fn bitand(self, rhs: HistOpt) -> HistOpt {
        HistOpt(self.0 & rhs.0)
    }
}

#[derive(Debug, Clone)]
pub struct History {
    pub timestamp: i64,
    pub activity: Activity,
    pub options: HistOpt,
    pub raw: String,
    pub params: Vec<String>,
    pub from: Option<Nick>,
}

/// Owns the ring of `History` entries for one buffer (server, channel,
/// query, or the global main buffer) plus its activity bookkeeping.
#[derive(Debug, Default)]
pub struct HistInfo {
    pub activity: Activity,
    pub unread: u32,
    pub ignored: u32,
    /// Newest-first ring, capped at `HIST_MAX`.
    entries: VecDeque<History>,
}

pub struct AddParams<'a> {
    pub from: Option<Nick>,
    pub raw: &'a str,
    pub params: Vec<String>,
    pub activity: Activity,
    pub timestamp: i64,
    pub options: HistOpt,
}

impl HistInfo {
    pub fn new() -> Self {
        HistInfo::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates newest-first, the ring's native order.
    pub fn iter(&self) -> impl Iterator<Item = &History> {
        self.entries.iter()
    }

    pub fn select(&mut self) {
        self.activity = Activity::None;
        self.unread = 0;
        self.ignored = 0;
    }

    /// Appends an entry honoring SHOW/IGN activity bookkeeping. Does not
    /// itself perform MAIN-copy or LOG-append side effects; callers that
    /// need the full semantics of spec §4.6 should go through
    /// `crate::state::server::Server::hist_add`, which wires those in.
    pub fn add(&mut self, selected: bool, p: AddParams) -> &History {
        if !selected && p.options.contains(HistOpt::SHOW) {
            if p.options.contains(HistOpt::IGN) {
                self.ignored += 1;
            } else {
                self.unread += 1;
            }
            if p.activity > self.activity {
                self.activity = p.activity;
            }
        }

        let entry = History {
            timestamp: p.timestamp,
            activity: p.activity,
            options: p.options,
            raw: p.raw.to_string(),
            params: p.params,
            from: p.from,
        };
        self.entries.push_front(entry);
        while self.entries.len() > HIST_MAX {
            self.entries.pop_back();
        }
        self.entries.front().unwrap()
    }

    pub fn purge_by_opt(&mut self, mask: HistOpt) {
        self.entries.retain(|e| !e.options.intersects(mask));
    }
}

/// Builds the on-disk log path `<logdir>/<server>[,<channel>].log`.
pub fn log_path(log_dir: &str, server: &str, channel: Option<&str>) -> PathBuf {
    let mut name = server.to_string();
    if let Some(c) = channel {
        name.push(',');
        name.push_str(c);
    }
    name.push_str(".log");
    PathBuf::from(log_dir).join(name)
}

fn opt_field(value: &Option<String>) -> &str {
    match value {
        Some(v) if !v.is_empty() => v.as_str(),
        _ => " ",
    }
}

/// Appends one tab-separated line to the buffer's log file, creating the
/// log directory (mode 0700) on first write.
pub fn log_append(
    log_dir: &str,
    server: &str,
    channel: Option<&str>,
    entry: &History,
) -> io::Result<()> {
    let dir = PathBuf::from(log_dir);
    if !dir.exists() {
        fs::create_dir_all(&dir)?;
        fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
    }
    let path = log_path(log_dir, server, channel);
    let mut f = OpenOptions::new().create(true).append(true).open(path)?;

    let nick = entry.from.as_ref().map(|n| n.nick.clone());
    let ident = entry.from.as_ref().and_then(|n| n.ident.clone());
    let host = entry.from.as_ref().and_then(|n| n.host.clone());
    let priv_ = entry
        .from
        .as_ref()
        .map(|n| n.priv_.to_string())
        .unwrap_or_else(|| " ".to_string());
    let is_self = entry.from.as_ref().map(|n| n.is_self).unwrap_or(false);

    writeln!(
        f,
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        entry.timestamp,
        activity_code(entry.activity),
        if entry.options.contains(HistOpt::SHOW) { 1 } else { 0 },
        if is_self { 1 } else { 0 },
        priv_,
        opt_field(&nick),
        opt_field(&ident),
        opt_field(&host),
        entry.raw,
    )
}

fn activity_code(a: Activity) -> u8 {
    match a {
        Activity::None => 0,
        Activity::Status => 1,
        Activity::Error => 2,
        Activity::Message => 3,
        Activity::Hilight => 4,
    }
}

fn activity_from_code(c: u8) -> Activity {
    match c {
        1 => Activity::Status,
        2 => Activity::Error,
        3 => Activity::Message,
        4 => Activity::Hilight,
        _ => Activity::None,
    }
}

/// Reads back up to `HIST_MAX` lines from the log, oldest-kept-newest
/// trimmed, reconstructs `History` entries tagged `RLOG`, and prepends a
/// synthetic "log restored up to T" marker. Entries are returned oldest
/// first (chronological), the order callers should re-insert them in so
/// the ring ends up newest-first after inserting each at the front.
pub fn load_log(log_dir: &str, server: &str, channel: Option<&str>) -> io::Result<Vec<History>> {
    let path = log_path(log_dir, server, channel);
    let f = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };
    let reader = BufReader::new(f);
    let mut lines: VecDeque<String> = VecDeque::new();
    for line in reader.lines() {
        let line = line?;
        lines.push_back(line);
        if lines.len() > HIST_MAX {
            lines.pop_front();
        }
    }

    let mut out = Vec::with_capacity(lines.len() + 1);
    let mut last_ts = 0i64;
    for line in lines {
        let fields: Vec<&str> = line.splitn(9, '\t').collect();
        if fields.len() != 9 {
            continue;
        }
        let timestamp: i64 = fields[0].parse().unwrap_or(0);
        let activity = activity_from_code(fields[1].parse().unwrap_or(0));
        let show = fields[2] == "1";
        let is_self = fields[3] == "1";
        let priv_ = fields[4].chars().next().unwrap_or(' ');
        let nick = non_blank(fields[5]);
        let ident = non_blank(fields[6]);
        let host = non_blank(fields[7]);
        let raw = fields[8].to_string();
        last_ts = timestamp;

        let from = nick.map(|n| Nick::new(&n, ident.as_deref(), host.as_deref(), priv_, is_self));
        let mut options = HistOpt::RLOG;
        if show {
            options = options | HistOpt::SHOW;
        }
        out.push(History {
            timestamp,
            activity,
            options,
            raw,
            params: Vec::new(),
            from,
        });
    }

    if !out.is_empty() {
        out.insert(
            0,
            History {
                timestamp: last_ts,
                activity: Activity::Status,
                options: HistOpt::SHOW,
                raw: format!("SELF_LOG_RESTORE {} :log restored up to", last_ts),
                params: Vec::new(),
                from: None,
            },
        );
    }
    Ok(out)
}

fn non_blank(s: &str) -> Option<String> {
    if s == " " || s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
