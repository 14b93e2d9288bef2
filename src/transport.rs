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

use std::io::{self, Read, Write};

use mio::event::Source;
use mio::net::TcpStream;
use mio::{Interest, Registry, Token};
use native_tls::{HandshakeError, MidHandshakeTlsStream, TlsConnector, TlsStream};

use crate::error::CoreError;

/// Lines are framed on `\r\n`; the input buffer never shrinks below this.
pub const BUF_MIN: usize = 1024;

/// Grows `buf` to the next power of two once `pos` reaches capacity, halves
/// it once usage drops to a quarter of a capacity above the floor (§4.1).
fn grow_if_full(buf: &mut Vec<u8>, pos: usize) {
    if pos >= buf.len() {
        let new_len = (buf.len().max(BUF_MIN)) * 2;
        buf.resize(new_len, 0);
    }
}

fn shrink_if_sparse(buf: &mut Vec<u8>, pos: usize) {
    if buf.len() > BUF_MIN && pos < buf.len() / 4 {
        let new_len = (buf.len() / 2).max(BUF_MIN);
        buf.truncate(new_len);
        buf.shrink_to_fit();
    }
}

/// Extracts every complete `\r\n`-terminated line from `buf[..pos]` as raw
/// bytes, shifting the residual bytes (an in-progress line) to the front
/// and updating `pos` to the residual length. Malformed UTF-8 is preserved
/// byte-for-byte (§4.2): lines are never decoded here, only split.
pub fn frame_lines(buf: &mut Vec<u8>, pos: &mut usize) -> Vec<Vec<u8>> {
    let mut lines = Vec::new();
    let mut start = 0usize;
    let data = &buf[..*pos];
    let mut i = 0usize;
    while i + 1 < data.len() {
        if data[i] == b'\r' && data[i + 1] == b'\n' {
            if i > start {
                lines.push(data[start..i].to_vec());
            }
            start = i + 2;
            i += 2;
        } else {
            i += 1;
        }
    }
    let residual = *pos - start;
    buf.copy_within(start..*pos, 0);
    *pos = residual;
    shrink_if_sparse(buf, *pos);
    lines
}

enum Conn {
    Plain(TcpStream),
    TlsHandshake(MidHandshakeTlsStream<TcpStream>),
    Tls(TlsStream<TcpStream>),
    /// Transient placeholder only ever observed mid-swap inside
    /// `try_complete_handshake`; never registered or read/written.
    Empty,
}

/// Per-server socket plus framing state (§4.1). Registration with `mio`
/// always targets the underlying `TcpStream`, even mid-TLS-handshake or
/// once wrapped, since `native_tls::TlsStream` never owns the fd itself.
pub struct Transport {
    conn: Conn,
    inbuf: Vec<u8>,
    pos: usize,
    outbuf: Vec<u8>,
}

impl Transport {
    pub fn plain(sock: TcpStream) -> Self {
        Transport {
            conn: Conn::Plain(sock),
            inbuf: vec![0u8; BUF_MIN],
            pos: 0,
            outbuf: Vec::new(),
        }
    }

    pub fn tls(sock: TcpStream, domain: &str, verify: bool) -> Result<Self, CoreError> {
        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(!verify)
            .danger_accept_invalid_hostnames(!verify)
            .build()?;
        let conn = match connector.connect(domain, sock) {
            Ok(stream) => Conn::Tls(stream),
            Err(HandshakeError::WouldBlock(mid)) => Conn::TlsHandshake(mid),
            Err(HandshakeError::Failure(e)) => return Err(CoreError::from(e)),
        };
        Ok(Transport {
            conn,
            inbuf: vec![0u8; BUF_MIN],
            pos: 0,
            outbuf: Vec::new(),
        })
    }

    fn raw(&mut self) -> &mut TcpStream {
        match &mut self.conn {
            Conn::Plain(s) => s,
            Conn::TlsHandshake(mid) => mid.get_mut(),
            Conn::Tls(s) => s.get_mut(),
            Conn::Empty => unreachable!("Conn::Empty observed outside try_complete_handshake"),
        }
    }

    pub fn register(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        self.raw().register(registry, token, interests)
    }

    pub fn reregister(&mut self, registry: &Registry, token: Token, interests: Interest) -> io::Result<()> {
        self.raw().reregister(registry, token, interests)
    }

    pub fn deregister(&mut self, registry: &Registry) -> io::Result<()> {
        self.raw().deregister(registry)
    }

    /// Drives a pending TLS handshake one step. Returns `Ok(true)` once the
    /// connection is fully established.
    pub fn try_complete_handshake(&mut self) -> Result<bool, CoreError> {
        match &self.conn {
            Conn::TlsHandshake(_) => {}
            Conn::Empty => unreachable!("Conn::Empty observed outside try_complete_handshake"),
            _ => return Ok(true),
        }
        let mid = match std::mem::replace(&mut self.conn, Conn::Empty) {
            Conn::TlsHandshake(mid) => mid,
            _ => unreachable!(),
        };
        match mid.handshake() {
            Ok(stream) => {
                self.conn = Conn::Tls(stream);
                Ok(true)
            }
            Err(HandshakeError::WouldBlock(mid)) => {
                self.conn = Conn::TlsHandshake(mid);
                Ok(false)
            }
            Err(HandshakeError::Failure(e)) => Err(CoreError::from(e)),
        }
    }

    /// TLS peer-certificate detail surfaced after the handshake completes
    /// (§4.1); `native_tls` exposes far less than `libtls`'s raw accessors,
    /// so only the DER-derived subject/issuer strings are available, and
    /// only via the platform backend's `Certificate` (no protocol version
    /// accessor at all in the `native_tls` public API — recorded in
    /// DESIGN.md as an accepted fidelity gap).
    pub fn peer_certificate_subject(&self) -> Option<String> {
        match &self.conn {
            Conn::Tls(s) => s
                .peer_certificate()
                .ok()
                .flatten()
                .and_then(|c| c.to_der().ok())
                .map(|der| format!("{} bytes DER", der.len())),
            _ => None,
        }
    }

    /// Reads whatever is currently available (non-blocking) and returns
    /// any complete lines it produced, as raw bytes (§4.2: 8-bit clean,
    /// never lossily decoded). `Ok(Vec::new())` with no lines on
    /// `WouldBlock`; `Ok` with an empty read (`n == 0`) signals peer EOF
    /// via a `UnexpectedEof` error so callers can disconnect uniformly.
    pub fn read_lines(&mut self) -> io::Result<Vec<Vec<u8>>> {
        loop {
            grow_if_full(&mut self.inbuf, self.pos);
            let res = match &mut self.conn {
                Conn::Plain(s) => s.read(&mut self.inbuf[self.pos..]),
                Conn::Tls(s) => s.read(&mut self.inbuf[self.pos..]),
                Conn::TlsHandshake(_) => return Ok(Vec::new()),
                Conn::Empty => unreachable!("Conn::Empty observed outside try_complete_handshake"),
            };
            match res {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "connection closed")),
                Ok(n) => {
                    self.pos += n;
                    if self.pos < self.inbuf.len() {
                        // short read: socket drained for now.
                        return Ok(frame_lines(&mut self.inbuf, &mut self.pos));
                    }
                    // buffer exactly filled; loop once more in case more is queued.
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    return Ok(frame_lines(&mut self.inbuf, &mut self.pos));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Enqueues `line` (a bare command, no `\r\n`) for write and attempts
    /// an immediate flush. Writing while the handshake has not completed,
    /// or to a socket that is not connected at all, behaves like a normal
    /// `WouldBlock` short write: it queues and waits for the next
    /// writable-ready tick rather than failing.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.outbuf.extend_from_slice(line.as_bytes());
        self.outbuf.extend_from_slice(b"\r\n");
        self.flush()
    }

    /// Write-all with would-block treated as "stop for now, try again on
    /// the next writable event" rather than an error (§4.1).
    pub fn flush(&mut self) -> io::Result<()> {
        while !self.outbuf.is_empty() {
            let res = match &mut self.conn {
                Conn::Plain(s) => s.write(&self.outbuf),
                Conn::Tls(s) => s.write(&self.outbuf),
                Conn::TlsHandshake(_) => return Ok(()),
                Conn::Empty => unreachable!("Conn::Empty observed outside try_complete_handshake"),
            };
            match res {
                Ok(0) => return Err(io::Error::new(io::ErrorKind::WriteZero, "failed to write")),
                Ok(n) => {
                    self.outbuf.drain(..n);
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    pub fn has_pending_writes(&self) -> bool {
        !self.outbuf.is_empty()
    }
}
