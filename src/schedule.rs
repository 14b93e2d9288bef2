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

/// Gate an enqueued write waits on before it is flushed to the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Write immediately; used by callers that still want the FIFO's
    /// ordering guarantee relative to other scheduled entries.
    Now,
    /// Write once the server reaches `connected` status.
    Connected,
    /// Write when the next incoming message with this command name (or
    /// numeric, e.g. `"376"`) is processed.
    Command(String),
}

#[derive(Debug, Clone)]
struct Entry {
    trigger: Trigger,
    payload: String,
}

/// Per-server FIFO of deferred outbound lines (§4.5).
#[derive(Debug, Default)]
pub struct Scheduler {
    entries: VecDeque<Entry>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            entries: VecDeque::new(),
        }
    }

    pub fn push(&mut self, trigger: Trigger, payload: &str) {
        self.entries.push_back(Entry {
            trigger,
            payload: payload.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes and returns every payload whose trigger fires for `event`,
    /// preserving relative enqueue order.
    pub fn pull(&mut self, event: &Trigger) -> Vec<String> {
        let mut fired = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.entries.len());
        for e in self.entries.drain(..) {
            if &e.trigger == event {
                fired.push(e.payload);
            } else {
                remaining.push_back(e);
            }
        }
        self.entries = remaining;
        fired
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fifo_order_preserved_for_same_trigger() {
        let mut s = Scheduler::new();
        s.push(Trigger::Command("376".to_string()), "JOIN #a");
        s.push(Trigger::Command("376".to_string()), "JOIN #b");
        let fired = s.pull(&Trigger::Command("376".to_string()));
        assert_eq!(fired, vec!["JOIN #a".to_string(), "JOIN #b".to_string()]);
        assert!(s.is_empty());
    }

    #[test]
    fn non_matching_trigger_left_in_place() {
        let mut s = Scheduler::new();
        s.push(Trigger::Connected, "NICK x");
        s.push(Trigger::Command("376".to_string()), "JOIN #a");
        let fired = s.pull(&Trigger::Connected);
        assert_eq!(fired, vec!["NICK x".to_string()]);
        assert!(!s.is_empty());
        let fired2 = s.pull(&Trigger::Command("376".to_string()));
        assert_eq!(fired2, vec!["JOIN #a".to_string()]);
    }

    #[test]
    fn deferred_join_fires_exactly_once() {
        let mut s = Scheduler::new();
        s.push(Trigger::Command("376".to_string()), "JOIN #x");
        let first = s.pull(&Trigger::Command("376".to_string()));
        assert_eq!(first.len(), 1);
        let second = s.pull(&Trigger::Command("376".to_string()));
        assert!(second.is_empty());
    }
}
