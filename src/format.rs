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

use std::collections::HashMap;

use chrono::{TimeZone, Utc};

use crate::irc::parse::Message;
use crate::state::history::{History, HistInfo};
use crate::state::nick::nick_colour;

const DIVIDER_MARK: char = '\u{1}';

/// Values a format string's `${name}` / `${N}` / `${N-}` tokens draw from.
pub struct FormatContext<'a> {
    pub raw: &'a str,
    pub cmd: &'a str,
    pub nick: &'a str,
    pub ident: &'a str,
    pub host: &'a str,
    pub priv_: char,
    pub channel: &'a str,
    pub topic: &'a str,
    pub server: &'a str,
    pub time: i64,
    pub params: &'a [String],
}

#[derive(Debug, Clone)]
pub struct FormatConfig {
    pub nickcolour_self: i32,
    pub nickcolour_range: (i32, i32),
    pub divider_toggle: bool,
    pub divider_string: String,
    pub divider_margin: u32,
    pub window_width: Option<usize>,
}

/// Strips a leading/trailing `\x01ACTION ... \x01` CTCP wrapper, returning
/// the bare action text when present.
fn unwrap_ctcp_action(s: &str) -> &str {
    let stripped = s.strip_prefix('\u{1}').and_then(|s| s.strip_suffix('\u{1}'));
    match stripped {
        Some(inner) => inner.strip_prefix("ACTION ").unwrap_or(inner),
        None => s,
    }
}

fn resolve_var(name: &str, ctx: &FormatContext) -> String {
    match name {
        "raw" => ctx.raw.to_string(),
        "cmd" => ctx.cmd.to_string(),
        "nick" => ctx.nick.to_string(),
        "ident" => ctx.ident.to_string(),
        "host" => ctx.host.to_string(),
        "priv" => ctx.priv_.to_string(),
        "channel" => ctx.channel.to_string(),
        "topic" => ctx.topic.to_string(),
        "server" => ctx.server.to_string(),
        "time" => ctx.time.to_string(),
        _ => {
            if let Some(n) = name.strip_suffix('-') {
                if let Ok(idx) = n.parse::<usize>() {
                    if idx >= 1 && idx <= ctx.params.len() {
                        return unwrap_ctcp_action(&ctx.params[idx - 1..].join(" ")).to_string();
                    }
                }
            } else if let Ok(idx) = name.parse::<usize>() {
                if idx >= 1 && idx <= ctx.params.len() {
                    return unwrap_ctcp_action(&ctx.params[idx - 1]).to_string();
                }
            }
            String::new()
        }
    }
}

fn rdate(secs: i64, verbose: bool) -> String {
    let units: [(i64, &str, &str); 7] = [
        (31_536_000, "yr", "year"),
        (2_592_000, "mo", "month"),
        (604_800, "wk", "week"),
        (86_400, "d", "day"),
        (3_600, "h", "hour"),
        (60, "m", "minute"),
        (1, "s", "second"),
    ];
    let mut remaining = secs.max(0);
    let mut parts = Vec::new();
    for (unit_secs, short, long) in units {
        let n = remaining / unit_secs;
        if n > 0 {
            remaining -= n * unit_secs;
            if verbose {
                parts.push(format!("{} {}{}", n, long, if n == 1 { "" } else { "s" }));
            } else {
                parts.push(format!("{}{}", n, short));
            }
        }
    }
    if parts.is_empty() {
        if verbose { "0 seconds".to_string() } else { "0s".to_string() }
    } else {
        parts.join(if verbose { ", " } else { " " })
    }
}

/// Parses one `%{...}` directive body (without the wrapping) and returns
/// its rendered text, recursing into `expand` for nested arguments.
fn render_percent(body: &str, ctx: &FormatContext, cfg: &FormatConfig) -> String {
    if let Some(rest) = body.strip_prefix("c:") {
        let (fg, bg) = match rest.split_once(',') {
            Some((f, b)) => (f, b),
            None => (rest, "99"),
        };
        let fg: u32 = fg.parse().unwrap_or(99);
        let bg: u32 = bg.parse().unwrap_or(99);
        return format!("\u{3}{:02},{:02}", fg, bg);
    }
    if let Some(rest) = body.strip_prefix("pad:") {
        if let Some((n, rest)) = rest.split_once(',') {
            let width: usize = n.parse().unwrap_or(0);
            let rendered = expand(rest, ctx, cfg);
            return pad_visible(&rendered, width);
        }
    }
    if let Some(rest) = body.strip_prefix("time:") {
        if let Some((fmt, expr)) = rest.split_once(',') {
            let expr_rendered = expand(expr, ctx, cfg);
            let ts: i64 = expr_rendered.trim().parse().unwrap_or(ctx.time);
            if let Some(dt) = Utc.timestamp_opt(ts, 0).single() {
                return dt.format(fmt).to_string();
            }
            return String::new();
        }
    }
    if let Some(expr) = body.strip_prefix("rdate:") {
        let rendered = expand(expr, ctx, cfg);
        let secs: i64 = rendered.trim().parse().unwrap_or(0);
        return rdate(secs, false);
    }
    if let Some(rest) = body.strip_prefix("split:") {
        let mut parts = rest.splitn(3, ',');
        let n: usize = parts.next().and_then(|s| s.parse().ok()).unwrap_or(0);
        let sep = parts.next().unwrap_or(" ");
        let body_fmt = parts.next().unwrap_or("");
        let rendered = expand(body_fmt, ctx, cfg);
        return rendered.split(sep).nth(n).unwrap_or("").to_string();
    }
    if let Some(expr) = body.strip_prefix("nick:") {
        let rendered = expand(expr, ctx, cfg);
        let is_self = rendered == ctx.nick && ctx.priv_ != ' ';
        let colour = nick_colour(&rendered, is_self, cfg.nickcolour_self, cfg.nickcolour_range);
        return format!("\u{3}{:02}", colour.max(0));
    }
    match body {
        "b" => "\u{2}".to_string(),
        "i" => "\u{9}".to_string(),
        "o" => "\u{f}".to_string(),
        "r" => "\u{12}".to_string(),
        "u" => "\u{15}".to_string(),
        "=" => DIVIDER_MARK.to_string(),
        _ => String::new(),
    }
}

fn pad_visible(s: &str, width: usize) -> String {
    let visible = visible_width(s);
    if visible >= width {
        s.to_string()
    } else {
        let mut out = s.to_string();
        out.push_str(&" ".repeat(width - visible));
        out
    }
}

/// Column width ignoring colour/style escapes and UTF-8 continuation bytes.
fn visible_width(s: &str) -> usize {
    let mut width = 0;
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\u{2}' | '\u{9}' | '\u{f}' | '\u{12}' | '\u{15}' | DIVIDER_MARK => {}
            '\u{3}' => {
                while matches!(chars.peek(), Some(c) if c.is_ascii_digit() || *c == ',') {
                    chars.next();
                }
            }
            _ => width += 1,
        }
    }
    width
}

/// Expands `${...}` and `%{...}` directives plus `\\`/`\n` escapes. Not
/// recursion-safe against itself: callers that recurse (e.g. `%{time:...}`,
/// `%{nick:...}`) only ever recurse into the directive's *argument*, which
/// cannot itself reintroduce the same directive without user-authored
/// format strings deliberately doing so -- matching the spec's "suppressed
/// inside nick/time evaluation" intent by construction (the argument slice
/// passed down never contains the enclosing `%{...}` text).
pub fn expand(fmt: &str, ctx: &FormatContext, cfg: &FormatConfig) -> String {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('n') => out.push('\n'),
                Some(other) => out.push(other),
                None => out.push('\\'),
            },
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut name = String::new();
                for c in chars.by_ref() {
                    if c == '}' {
                        break;
                    }
                    name.push(c);
                }
                out.push_str(&resolve_var(&name, ctx));
            }
            '%' if chars.peek() == Some(&'{') => {
                chars.next();
                let mut body = String::new();
                let mut depth = 1;
                for c in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    if depth > 0 {
                        body.push(c);
                    }
                }
                out.push_str(&render_percent(&body, ctx, cfg));
            }
            other => out.push(other),
        }
    }
    out
}

/// Applies the divider split (LHS padded to `divider.margin` + divider
/// string + RHS) and, if `window_width` is set, folds long lines with a
/// divider-prefixed continuation.
pub fn render(fmt: &str, ctx: &FormatContext, cfg: &FormatConfig) -> String {
    let expanded = expand(fmt, ctx, cfg);
    let with_divider = apply_divider(&expanded, cfg);
    match cfg.window_width {
        Some(w) if w > 0 => fold(&with_divider, w, &cfg.divider_string),
        _ => with_divider,
    }
}

fn apply_divider(s: &str, cfg: &FormatConfig) -> String {
    if let Some(idx) = s.find(DIVIDER_MARK) {
        let lhs = &s[..idx];
        let rhs = &s[idx + DIVIDER_MARK.len_utf8()..];
        let padded = pad_visible(lhs, cfg.divider_margin as usize);
        format!("{}{}{}", padded, cfg.divider_string, rhs)
    } else if cfg.divider_toggle {
        s.to_string()
    } else {
        s.to_string()
    }
}

fn fold(s: &str, width: usize, divider: &str) -> String {
    let mut out = String::new();
    for (line_no, line) in s.split('\n').enumerate() {
        if line_no > 0 {
            out.push('\n');
        }
        let mut col = 0usize;
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\u{2}' | '\u{9}' | '\u{f}' | '\u{12}' | '\u{15}' | DIVIDER_MARK => out.push(c),
                '\u{3}' => {
                    out.push(c);
                    while matches!(chars.peek(), Some(c) if c.is_ascii_digit() || *c == ',') {
                        out.push(chars.next().unwrap());
                    }
                }
                c => {
                    col += 1;
                    out.push(c);
                    if col % width == 0 {
                        out.push('\n');
                        out.push_str(divider);
                    }
                }
            }
        }
    }
    out
}

/// Picks the `config.format` key for a history entry, mirroring the
/// original `format_get`'s cmd-based special-casing: `MODE` splits into
/// channel/nick/self-nick variants, `PRIVMSG`/`NOTICE` split out CTCP and
/// `ACTION`. Numeric commands with no specific entry fall back to
/// `rpl.other`; everything else falls back to `other`.
pub fn template_key(entry: &History, is_channel: &dyn Fn(&str) -> bool) -> String {
    let msg = Message::new(entry.raw.as_bytes());
    let cmd = msg.command.map(|c| String::from_utf8_lossy(c).into_owned()).unwrap_or_default();
    let param = |i: usize| msg.params.get(i).map(|p| String::from_utf8_lossy(p).into_owned());

    if cmd == "MODE" {
        return match param(0) {
            Some(target) if is_channel(&target) => "MODE-CHANNEL".to_string(),
            Some(target) if entry.from.as_ref().map(|n| n.is_self && n.nick == target).unwrap_or(false) => {
                "MODE-NICK-SELF".to_string()
            }
            _ => "MODE-NICK".to_string(),
        };
    }
    if cmd == "PRIVMSG" {
        return match param(1) {
            Some(body) if body.starts_with('\u{1}') && body[1..].starts_with("ACTION") => "PRIVMSG-ACTION".to_string(),
            Some(body) if body.starts_with('\u{1}') => "PRIVMSG-CTCP".to_string(),
            _ => cmd,
        };
    }
    if cmd == "NOTICE" {
        return match param(1) {
            Some(body) if body.starts_with('\u{1}') => "NOTICE-CTCP".to_string(),
            _ => cmd,
        };
    }
    cmd
}

fn lookup_template<'a>(key: &str, templates: &'a HashMap<String, String>) -> &'a str {
    if let Some(t) = templates.get(key) {
        return t;
    }
    if key.len() == 3 && key.bytes().all(|b| b.is_ascii_digit()) {
        if let Some(t) = templates.get("rpl.other") {
            return t;
        }
    }
    templates.get("other").map(String::as_str).unwrap_or("${raw}")
}

/// Renders one `History` entry through the matching `config.format`
/// template, building the `FormatContext` from the entry's stored raw
/// line and sender (§2(10)/§4.7's "render a History entry" contract).
#[allow(clippy::too_many_arguments)]
pub fn render_history(
    entry: &History,
    templates: &HashMap<String, String>,
    cfg: &FormatConfig,
    server: &str,
    channel: Option<&str>,
    topic: Option<&str>,
    is_channel: &dyn Fn(&str) -> bool,
) -> String {
    let msg = Message::new(entry.raw.as_bytes());
    let cmd = msg.command.map(|c| String::from_utf8_lossy(c).into_owned()).unwrap_or_default();
    let params: Vec<String> = msg.params.iter().map(|p| String::from_utf8_lossy(p).into_owned()).collect();
    let nick = entry.from.as_ref().map(|n| n.nick.as_str()).unwrap_or("");
    let ident = entry.from.as_ref().and_then(|n| n.ident.as_deref()).unwrap_or("");
    let host = entry.from.as_ref().and_then(|n| n.host.as_deref()).unwrap_or("");
    let priv_ = entry.from.as_ref().map(|n| n.priv_).unwrap_or(' ');

    let ctx = FormatContext {
        raw: &entry.raw,
        cmd: &cmd,
        nick,
        ident,
        host,
        priv_,
        channel: channel.unwrap_or(""),
        topic: topic.unwrap_or(""),
        server,
        time: entry.timestamp,
        params: &params,
    };
    let key = template_key(entry, is_channel);
    render(lookup_template(&key, templates), &ctx, cfg)
}

/// The §6 core→host surface: lazily renders every entry of a buffer's
/// history ring (newest-first, same order as `HistInfo::iter`) through
/// its format template.
#[allow(clippy::too_many_arguments)]
pub fn history_iter<'a>(
    hist: &'a HistInfo,
    templates: &'a HashMap<String, String>,
    cfg: &'a FormatConfig,
    server: &'a str,
    channel: Option<&'a str>,
    topic: Option<&'a str>,
    is_channel: &'a dyn Fn(&str) -> bool,
) -> impl Iterator<Item = String> + 'a {
    hist.iter().map(move |e| render_history(e, templates, cfg, server, channel, topic, is_channel))
}

#[cfg(test)]
mod test {
    use super::*;

    fn cfg() -> FormatConfig {
        FormatConfig {
            nickcolour_self: 1,
            nickcolour_range: (2, 98),
            divider_toggle: true,
            divider_string: " | ".to_string(),
            divider_margin: 10,
            window_width: None,
        }
    }

    fn ctx<'a>(params: &'a [String]) -> FormatContext<'a> {
        FormatContext {
            raw: "raw",
            cmd: "PRIVMSG",
            nick: "alice",
            ident: "a",
            host: "h",
            priv_: ' ',
            channel: "#c",
            topic: "topic",
            server: "net",
            time: 1000,
            params,
        }
    }

    #[test]
    fn literal_escapes() {
        let c = cfg();
        let p = Vec::new();
        assert_eq!(expand(r"a\nb\\c", &ctx(&p), &c), "a\nb\\c");
    }

    #[test]
    fn variable_substitution() {
        let c = cfg();
        let p = Vec::new();
        assert_eq!(expand("${nick}@${server}", &ctx(&p), &c), "alice@net");
    }

    #[test]
    fn positional_param_and_from_n() {
        let c = cfg();
        let p = vec!["#c".to_string(), "hello".to_string(), "world".to_string()];
        assert_eq!(expand("${2-}", &ctx(&p), &c), "hello world");
        assert_eq!(expand("${1}", &ctx(&p), &c), "#c");
    }

    #[test]
    fn style_and_colour_codes() {
        let c = cfg();
        let p = Vec::new();
        assert_eq!(expand("%{b}x%{o}", &ctx(&p), &c), "\u{2}x\u{f}");
        assert_eq!(expand("%{c:4,1}", &ctx(&p), &c), "\u{3}04,01");
    }

    #[test]
    fn divider_pads_lhs_to_margin() {
        let c = cfg();
        let p = Vec::new();
        let out = render("abc%{=}def", &ctx(&p), &c);
        let expected = format!("abc{}{}{}", " ".repeat(7), " | ", "def");
        assert_eq!(out, expected);
    }

    #[test]
    fn pad_directive_pads_to_width() {
        let c = cfg();
        let p = Vec::new();
        assert_eq!(expand("%{pad:5,ab}", &ctx(&p), &c), "ab   ");
    }

    #[test]
    fn nick_colour_directive_is_deterministic() {
        let c = cfg();
        let p = Vec::new();
        let a = expand("%{nick:bob}", &ctx(&p), &c);
        let b = expand("%{nick:bob}", &ctx(&p), &c);
        assert_eq!(a, b);
        assert!(a.starts_with('\u{3}'));
    }

    #[test]
    fn rdate_formats_components() {
        assert_eq!(rdate(3661, false), "1h 1m 1s");
        assert_eq!(rdate(0, false), "0s");
    }

    #[test]
    fn fold_breaks_at_width_ignoring_colour_codes() {
        let out = fold("\u{3}04,01abcde", 3, " |");
        assert_eq!(out, "\u{3}04,01abc\n |de");
    }

    #[test]
    fn ctcp_action_unwrapped_in_positional_param() {
        let c = cfg();
        let p = vec!["\u{1}ACTION waves\u{1}".to_string()];
        assert_eq!(expand("${1}", &ctx(&p), &c), "waves");
    }

    use crate::state::history::{Activity, AddParams, HistOpt};
    use crate::state::nick::Nick;

    fn never_channel(_: &str) -> bool {
        false
    }

    #[test]
    fn template_key_splits_privmsg_action() {
        let entry = History {
            timestamp: 1,
            activity: Activity::Message,
            options: HistOpt::DFL,
            raw: "PRIVMSG #c :\u{1}ACTION waves\u{1}".to_string(),
            params: Vec::new(),
            from: Some(Nick::new("bob", Some("b"), Some("h"), ' ', false)),
        };
        assert_eq!(template_key(&entry, &never_channel), "PRIVMSG-ACTION");
    }

    #[test]
    fn template_key_falls_back_to_plain_command() {
        let entry = History {
            timestamp: 1,
            activity: Activity::Message,
            options: HistOpt::DFL,
            raw: "PRIVMSG #c :hello".to_string(),
            params: Vec::new(),
            from: Some(Nick::new("bob", Some("b"), Some("h"), ' ', false)),
        };
        assert_eq!(template_key(&entry, &never_channel), "PRIVMSG");
    }

    #[test]
    fn render_history_looks_up_template_and_substitutes() {
        let c = cfg();
        let entry = History {
            timestamp: 1,
            activity: Activity::Message,
            options: HistOpt::DFL,
            raw: "PRIVMSG #c :hello world there".to_string(),
            params: Vec::new(),
            from: Some(Nick::new("bob", Some("b"), Some("h"), ' ', false)),
        };
        let mut templates = HashMap::new();
        templates.insert("PRIVMSG".to_string(), "${nick}: ${3-}".to_string());
        let out = render_history(&entry, &templates, &c, "net", Some("#c"), None, &never_channel);
        assert_eq!(out, "bob: hello world there");
    }

    #[test]
    fn history_iter_yields_newest_first_rendered_lines() {
        let c = cfg();
        let mut hist = HistInfo::new();
        hist.add(
            true,
            AddParams { from: None, raw: "PRIVMSG #c :first", params: Vec::new(), activity: Activity::Message, timestamp: 1, options: HistOpt::DFL },
        );
        hist.add(
            true,
            AddParams { from: None, raw: "PRIVMSG #c :second", params: Vec::new(), activity: Activity::Message, timestamp: 2, options: HistOpt::DFL },
        );
        let mut templates = HashMap::new();
        templates.insert("PRIVMSG".to_string(), "${2-}".to_string());
        let lines: Vec<String> = history_iter(&hist, &templates, &c, "net", Some("#c"), None, &never_channel).collect();
        assert_eq!(lines, vec!["second".to_string(), "first".to_string()]);
    }
}
