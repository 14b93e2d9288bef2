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

pub mod cmdline;

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use crate::error::CoreError;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(rename = "default", default)]
    pub def: Default_,
    #[serde(default)]
    pub log: Log,
    #[serde(default)]
    pub misc: Misc,
    #[serde(default)]
    pub reconnect: Reconnect,
    #[serde(default)]
    pub motd: Motd,
    #[serde(default)]
    pub nickcolour: NickColour,
    #[serde(default)]
    pub format: HashMap<String, String>,
    #[serde(default)]
    pub divider: Divider,
    #[serde(rename = "server", default)]
    pub servers: Vec<ServerConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Default_ {
    #[serde(default = "default_nick")]
    pub nick: String,
    #[serde(default = "default_user")]
    pub user: String,
    #[serde(default = "default_real")]
    pub real: String,
    #[serde(default = "default_chantypes")]
    pub chantypes: String,
    #[serde(default = "default_prefixes")]
    pub prefixes: String,
    #[serde(default = "default_modes")]
    pub modes: u32,
    #[serde(default = "default_quitmessage")]
    pub quitmessage: String,
    #[serde(default = "default_partmessage")]
    pub partmessage: String,
    #[serde(default = "default_killmessage")]
    pub killmessage: String,
}

impl Default for Default_ {
    fn default() -> Self {
        Default_ {
            nick: default_nick(),
            user: default_user(),
            real: default_real(),
            chantypes: default_chantypes(),
            prefixes: default_prefixes(),
            modes: default_modes(),
            quitmessage: default_quitmessage(),
            partmessage: default_partmessage(),
            killmessage: default_killmessage(),
        }
    }
}

fn default_nick() -> String {
    "hirc".to_string()
}
fn default_user() -> String {
    "hirc".to_string()
}
fn default_real() -> String {
    "hirc user".to_string()
}
fn default_chantypes() -> String {
    "#&!+".to_string()
}
fn default_prefixes() -> String {
    "(ov)@+".to_string()
}
fn default_modes() -> u32 {
    4
}
fn default_quitmessage() -> String {
    "bye".to_string()
}
fn default_partmessage() -> String {
    "bye".to_string()
}
fn default_killmessage() -> String {
    "bye".to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct Log {
    #[serde(default)]
    pub toggle: bool,
    #[serde(default = "default_logdir")]
    pub dir: String,
}

impl Default for Log {
    fn default() -> Self {
        Log {
            toggle: false,
            dir: default_logdir(),
        }
    }
}

fn default_logdir() -> String {
    "~/.hirc/log".to_string()
}

/// Expands a single leading `~` to `$HOME`, same convention as the shell.
pub fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        if let Ok(home) = std::env::var("HOME") {
            return format!("{}{}", home, rest);
        }
    }
    path.to_string()
}

#[derive(Deserialize, Debug, Clone)]
pub struct Misc {
    #[serde(default = "default_pingtime")]
    pub pingtime: u64,
}

impl Default for Misc {
    fn default() -> Self {
        Misc {
            pingtime: default_pingtime(),
        }
    }
}

fn default_pingtime() -> u64 {
    180
}

#[derive(Deserialize, Debug, Clone)]
pub struct Reconnect {
    #[serde(default = "default_reconnect_interval")]
    pub interval: u64,
    #[serde(default = "default_reconnect_maxinterval")]
    pub maxinterval: u64,
}

impl Default for Reconnect {
    fn default() -> Self {
        Reconnect {
            interval: default_reconnect_interval(),
            maxinterval: default_reconnect_maxinterval(),
        }
    }
}

fn default_reconnect_interval() -> u64 {
    10
}
fn default_reconnect_maxinterval() -> u64 {
    300
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Motd {
    #[serde(default)]
    pub removedash: bool,
}

#[derive(Deserialize, Debug, Clone)]
pub struct NickColour {
    #[serde(default = "default_nickcolour_self")]
    #[serde(rename = "self")]
    pub self_: i32,
    #[serde(default = "default_nickcolour_range")]
    pub range: (i32, i32),
}

impl Default for NickColour {
    fn default() -> Self {
        NickColour {
            self_: default_nickcolour_self(),
            range: default_nickcolour_range(),
        }
    }
}

fn default_nickcolour_self() -> i32 {
    1
}
fn default_nickcolour_range() -> (i32, i32) {
    (2, 98)
}

#[derive(Deserialize, Debug, Clone)]
pub struct Divider {
    #[serde(default = "default_divider_toggle")]
    pub toggle: bool,
    #[serde(default = "default_divider_string")]
    pub string: String,
    #[serde(default = "default_divider_margin")]
    pub margin: u32,
}

impl Default for Divider {
    fn default() -> Self {
        Divider {
            toggle: default_divider_toggle(),
            string: default_divider_string(),
            margin: default_divider_margin(),
        }
    }
}

fn default_divider_toggle() -> bool {
    true
}
fn default_divider_string() -> String {
    " | ".to_string()
}
fn default_divider_margin() -> u32 {
    12
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub name: String,
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    #[serde(default)]
    pub nick: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub real: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub tls: bool,
    #[serde(default = "default_tls_verify")]
    pub tls_verify: bool,
    #[serde(default)]
    pub autocmds: Vec<String>,
}

fn default_server_port() -> u16 {
    6667
}
fn default_tls_verify() -> bool {
    true
}

impl Config {
    pub fn from_str(c: &str) -> Result<Config, CoreError> {
        toml::from_str::<Config>(c).map_err(CoreError::from)
    }

    pub fn from_path(p: &Path) -> Result<Config, CoreError> {
        let mut f = File::open(p)?;
        let mut c = String::new();
        f.read_to_string(&mut c)?;
        Config::from_str(c.as_ref())
    }

    pub fn log_dir(&self) -> String {
        expand_home(&self.log.dir)
    }
}

#[cfg(test)]
mod test {
    use super::Config;

    #[test]
    fn minimal_config_has_defaults() {
        let c = Config::from_str(
            r#"
            [[server]]
            name = "libera"
            host = "irc.libera.chat"
            "#,
        )
        .unwrap();
        assert_eq!(c.def.nick, "hirc");
        assert_eq!(c.misc.pingtime, 180);
        assert_eq!(c.servers.len(), 1);
        assert_eq!(c.servers[0].port, 6667);
        assert!(c.servers[0].tls_verify);
    }

    #[test]
    fn server_overrides_identity() {
        let c = Config::from_str(
            r#"
            [default]
            nick = "def"

            [[server]]
            name = "x"
            host = "h"
            nick = "override"
            tls = true
            tls_verify = false
            "#,
        )
        .unwrap();
        assert_eq!(c.def.nick, "def");
        assert_eq!(c.servers[0].nick.as_deref(), Some("override"));
        assert!(c.servers[0].tls);
        assert!(!c.servers[0].tls_verify);
    }

    #[test]
    fn bad_toml_is_a_config_error() {
        assert!(Config::from_str("not valid = [[[").is_err());
    }

    #[test]
    fn home_expansion() {
        std::env::set_var("HOME", "/home/test");
        assert_eq!(super::expand_home("~/.hirc/log"), "/home/test/.hirc/log");
        assert_eq!(super::expand_home("/abs/path"), "/abs/path");
    }
}
