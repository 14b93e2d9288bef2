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

/// IRC casemapping variants; affects how nicknames/channels compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseMapping {
    Ascii,
    Rfc1459,
    Unicode,
}

impl CaseMapping {
    pub fn from_isupport(value: Option<&str>) -> Self {
        match value {
            Some("ascii") => CaseMapping::Ascii,
            Some("unicode") | Some("utf-8") => CaseMapping::Unicode,
            _ => CaseMapping::Rfc1459,
        }
    }
}

/// Uppercases a string under the given casemapping. Used for nick/channel
/// comparison, not for display.
pub fn irc_uppercase(casemap: CaseMapping, s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'a'..='z' => (c as u8 - 32u8) as char,
            '{' | '|' | '}' if casemap == CaseMapping::Rfc1459 => (c as u8 - 32u8) as char,
            '^' if casemap == CaseMapping::Rfc1459 => (c as u8 + 32u8) as char,
            _ => c,
        })
        .collect()
}

pub fn case_cmp(casemap: CaseMapping, lhs: &str, rhs: &str) -> bool {
    irc_uppercase(casemap, lhs) == irc_uppercase(casemap, rhs)
}

/// A single entry in a channel's nick list, or a server's self-identity.
#[derive(Debug, Clone)]
pub struct Nick {
    pub nick: String,
    pub ident: Option<String>,
    pub host: Option<String>,
    /// Privilege prefix character, ' ' when the nick holds no channel status.
    pub priv_: char,
    pub is_self: bool,
}

impl Nick {
    pub fn new(nick: &str, ident: Option<&str>, host: Option<&str>, priv_: char, is_self: bool) -> Self {
        Nick {
            nick: nick.to_string(),
            ident: ident.map(str::to_string),
            host: host.map(str::to_string),
            priv_,
            is_self,
        }
    }

    /// Builds a `nick!ident@host`-shaped prefix, leaving out the parts that
    /// are missing, same as `prefix_tokenize`'s inverse.
    pub fn prefix(&self) -> String {
        let mut s = self.nick.clone();
        if let Some(ident) = &self.ident {
            s.push('!');
            s.push_str(ident);
        }
        if let Some(host) = &self.host {
            s.push('@');
            s.push_str(host);
        }
        s
    }
}

/// Deterministic nick colour, derived from the sum of
/// `char[i] * (i+1) XOR char[i]` over the nick, ignoring one trailing `_`
/// or digit character, folded into `[low, high]`.
pub fn nick_colour(nick: &str, self_: bool, self_colour: i32, range: (i32, i32)) -> i32 {
    if self_ {
        return self_colour;
    }
    let (low, high) = range;
    if low < 0 || high > 99 || low > high {
        return -1;
    }
    let bytes = nick.as_bytes();
    let end = match bytes.last() {
        Some(b) if b.is_ascii_digit() || *b == b'_' => bytes.len() - 1,
        _ => bytes.len(),
    };
    let mut sum: i64 = 0;
    for (i, &b) in bytes[..end].iter().enumerate() {
        sum += (b as i64 * (i as i64 + 1)) ^ b as i64;
    }
    let span = (high - low) as i64;
    if span == 0 {
        return low;
    }
    (sum.rem_euclid(span) + (low as i64) - 1) as i32
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn uppercase_rfc1459_folds_braces_and_pipe() {
        assert!(case_cmp(CaseMapping::Rfc1459, "^{|}", "~[\\]"));
        assert!(case_cmp(CaseMapping::Rfc1459, "^{|}abc", "~[\\]ABC"));
        assert!(!case_cmp(CaseMapping::Ascii, "^{|}abc", "~[\\]ABC"));
    }

    #[test]
    fn prefix_roundtrip_parts_present() {
        let n = Nick::new("alice", Some("a"), Some("h"), ' ', false);
        assert_eq!(n.prefix(), "alice!a@h");
    }

    #[test]
    fn prefix_missing_ident_and_host() {
        let n = Nick::new("alice", None, None, ' ', false);
        assert_eq!(n.prefix(), "alice");
    }

    #[test]
    fn colour_is_deterministic() {
        let a = nick_colour("alice", false, 1, (2, 98));
        let b = nick_colour("alice", false, 1, (2, 98));
        assert_eq!(a, b);
        assert!((1..=96).contains(&a));
    }

    #[test]
    fn colour_self_uses_self_colour() {
        assert_eq!(nick_colour("alice", true, 7, (2, 98)), 7);
    }

    #[test]
    fn colour_out_of_range_is_error() {
        assert_eq!(nick_colour("alice", false, 1, (-1, 200)), -1);
    }
}
