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

/// Error taxonomy for the core. Handlers and transport code return these;
/// the poll loop decides whether an error is fatal to the process (never,
/// outside of startup) or just to one server connection.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("tls error: {0}")]
    Tls(#[from] native_tls::Error),

    #[error("tls handshake error: {0}")]
    TlsHandshake(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("state error: {0}")]
    State(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("invalid config toml: {0}")]
    ConfigToml(#[from] toml::de::Error),

    #[error("user error: {0}")]
    User(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl<T> From<native_tls::HandshakeError<T>> for CoreError {
    fn from(e: native_tls::HandshakeError<T>) -> Self {
        CoreError::TlsHandshake(e.to_string())
    }
}

/// CLI argument parsing errors, kept separate from `CoreError` because they
/// occur before any server/core state exists and may need to carry a
/// help message instead of a failure.
#[derive(thiserror::Error, Debug)]
pub enum ParsedArgsError {
    #[error("{0}")]
    Message(String),
}

/// Top-level error returned by `main`.
#[derive(thiserror::Error, Debug)]
pub enum MainError {
    #[error("{0}")]
    Args(#[from] ParsedArgsError),
    #[error("{0}")]
    Core(#[from] CoreError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
