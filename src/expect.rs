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

/// Kinds of asynchronous reply a handler may be waiting to correlate with
/// something the user (or the core itself) did earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectKind {
    Join,
    Part,
    Pong,
    Names,
    Topic,
    TopicWhoTime,
    ChannelModeIs,
    NicknameInUse,
    NoSuchNick,
}

const COUNT: usize = 9;

fn slot(kind: ExpectKind) -> usize {
    match kind {
        ExpectKind::Join => 0,
        ExpectKind::Part => 1,
        ExpectKind::Pong => 2,
        ExpectKind::Names => 3,
        ExpectKind::Topic => 4,
        ExpectKind::TopicWhoTime => 5,
        ExpectKind::ChannelModeIs => 6,
        ExpectKind::NicknameInUse => 7,
        ExpectKind::NoSuchNick => 8,
    }
}

/// Fixed-slot, one-shot expectation register (§4.4). Each slot holds an
/// optional correlation string; a matching `take` clears it.
#[derive(Debug, Default, Clone)]
pub struct ExpectRegister {
    slots: [Option<String>; COUNT],
}

impl ExpectRegister {
    pub fn new() -> Self {
        ExpectRegister {
            slots: Default::default(),
        }
    }

    pub fn set(&mut self, kind: ExpectKind, correlation: &str) {
        self.slots[slot(kind)] = Some(correlation.to_string());
    }

    pub fn get(&self, kind: ExpectKind) -> Option<&str> {
        self.slots[slot(kind)].as_deref()
    }

    pub fn clear(&mut self, kind: ExpectKind) {
        self.slots[slot(kind)] = None;
    }

    /// Returns true and clears the slot if `candidate` matches (exact,
    /// case-sensitive byte compare); leaves the slot untouched otherwise.
    pub fn take_if_matches(&mut self, kind: ExpectKind, candidate: &str) -> bool {
        let matched = self.slots[slot(kind)].as_deref() == Some(candidate);
        if matched {
            self.slots[slot(kind)] = None;
        }
        matched
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_then_get() {
        let mut e = ExpectRegister::new();
        e.set(ExpectKind::Join, "#chan");
        assert_eq!(e.get(ExpectKind::Join), Some("#chan"));
    }

    #[test]
    fn matching_event_clears_one_shot() {
        let mut e = ExpectRegister::new();
        e.set(ExpectKind::NicknameInUse, "alice");
        assert!(e.take_if_matches(ExpectKind::NicknameInUse, "alice"));
        assert_eq!(e.get(ExpectKind::NicknameInUse), None);
    }

    #[test]
    fn non_matching_event_leaves_slot_set() {
        let mut e = ExpectRegister::new();
        e.set(ExpectKind::NicknameInUse, "alice");
        assert!(!e.take_if_matches(ExpectKind::NicknameInUse, "bob"));
        assert_eq!(e.get(ExpectKind::NicknameInUse), Some("alice"));
    }

    #[test]
    fn independent_slots() {
        let mut e = ExpectRegister::new();
        e.set(ExpectKind::Join, "#a");
        e.set(ExpectKind::Part, "#b");
        assert_eq!(e.get(ExpectKind::Join), Some("#a"));
        assert_eq!(e.get(ExpectKind::Part), Some("#b"));
    }
}
