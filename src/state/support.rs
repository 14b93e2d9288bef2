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

/// RPL_ISUPPORT (005) key/value table. Values are optional since some keys
/// (e.g. `EXCEPTS`) are bare flags with no `=value` part.
#[derive(Debug, Default, Clone)]
pub struct Support {
    map: HashMap<String, Option<String>>,
}

impl Support {
    pub fn new() -> Self {
        Support {
            map: HashMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: Option<&str>) {
        self.map
            .insert(key.to_string(), value.map(|v| v.to_string()));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).and_then(|v| v.as_deref())
    }

    /// Parses one RPL_ISUPPORT parameter token (`KEY` or `KEY=VALUE`).
    pub fn apply_token(&mut self, token: &str) {
        match token.split_once('=') {
            Some((k, v)) => self.set(k, Some(v)),
            None => self.set(token, None),
        }
    }

    pub fn chantypes(&self, default: &str) -> String {
        self.get("CHANTYPES").unwrap_or(default).to_string()
    }

    pub fn prefixes(&self, default: &str) -> String {
        self.get("PREFIX").unwrap_or(default).to_string()
    }

    /// Valid privilege-prefix characters (the symbol half of `(modes)symbols`).
    pub fn prefix_symbols(&self, default: &str) -> String {
        let p = self.prefixes(default);
        match p.find(')') {
            Some(idx) => p[idx + 1..].to_string(),
            None => String::new(),
        }
    }

    pub fn modes(&self, default: u32) -> u32 {
        self.get("MODES")
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod test {
    use super::Support;

    #[test]
    fn apply_token_with_and_without_value() {
        let mut s = Support::new();
        s.apply_token("CHANTYPES=#&");
        s.apply_token("EXCEPTS");
        assert_eq!(s.get("CHANTYPES"), Some("#&"));
        assert_eq!(s.get("EXCEPTS"), None);
        assert!(s.map.contains_key("EXCEPTS"));
    }

    #[test]
    fn prefix_symbols_extracted_after_paren() {
        let mut s = Support::new();
        s.apply_token("PREFIX=(ov)@+");
        assert_eq!(s.prefix_symbols("@+"), "@+");
    }

    #[test]
    fn defaults_used_when_absent() {
        let s = Support::new();
        assert_eq!(s.chantypes("#&!+"), "#&!+");
        assert_eq!(s.modes(4), 4);
    }
}
