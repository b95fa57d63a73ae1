//! Pull-mode JSON emitter.
//!
//! A [`Serializer`] walks a [`Value`] tree with an explicit cursor stack and
//! copies output into caller-supplied buffers on demand, so partial output
//! never materializes the whole document.

use crate::error::{Error, Result};
use crate::object;
use crate::value::{Repr, Value};

/// Staging area for the token currently being emitted. Large enough for the
/// longest number ryu or itoa can produce, and for any escape sequence.
struct Chip {
    buf: [u8; 32],
    len: u8,
    off: u8,
}

impl Chip {
    fn new() -> Self {
        Self {
            buf: [0; 32],
            len: 0,
            off: 0,
        }
    }

    fn is_empty(&self) -> bool {
        self.off == self.len
    }

    fn load(&mut self, bytes: &[u8]) {
        debug_assert!(self.is_empty() && bytes.len() <= self.buf.len());
        self.buf[..bytes.len()].copy_from_slice(bytes);
        self.len = bytes.len() as u8;
        self.off = 0;
    }

    fn load_escape(&mut self, byte: u8) {
        match byte {
            b'"' => self.load(b"\\\""),
            b'\\' => self.load(b"\\\\"),
            0x08 => self.load(b"\\b"),
            0x0C => self.load(b"\\f"),
            b'\n' => self.load(b"\\n"),
            b'\r' => self.load(b"\\r"),
            b'\t' => self.load(b"\\t"),
            _ => {
                const HEX: &[u8; 16] = b"0123456789abcdef";
                let seq = [
                    b'\\',
                    b'u',
                    b'0',
                    b'0',
                    HEX[(byte >> 4) as usize],
                    HEX[(byte & 0x0F) as usize],
                ];
                self.load(&seq);
            }
        }
    }

    fn drain(&mut self, out: &mut [u8]) -> usize {
        let pending = &self.buf[self.off as usize..self.len as usize];
        let take = pending.len().min(out.len());
        out[..take].copy_from_slice(&pending[..take]);
        self.off += take as u8;
        if self.off == self.len {
            self.off = 0;
            self.len = 0;
        }
        take
    }
}

/// Only `"`, `\` and the C0 control range are escaped; `/`, DEL and
/// non-ASCII bytes pass through verbatim.
fn needs_escape(byte: u8) -> bool {
    matches!(byte, b'"' | b'\\' | 0x00..=0x1F)
}

enum Frame<'a> {
    Value(&'a Value),
    Array {
        iter: std::slice::Iter<'a, Value>,
        first: bool,
    },
    Object {
        iter: object::Iter<'a>,
        first: bool,
    },
    /// A string body in flight; `close` carries the closing quote (plus the
    /// colon for keys).
    Text {
        bytes: &'a [u8],
        pos: usize,
        close: &'static [u8],
    },
}

/// A pull-mode serializer over a [`Value`] (or any sub-value).
///
/// Repeated [`read`](Serializer::read) calls fill the caller's buffer with
/// the next bytes of canonical output: no insignificant whitespace, shortest
/// round-trip doubles, minimal escaping.
pub struct Serializer<'a> {
    stack: Vec<Frame<'a>>,
    chip: Chip,
    done: bool,
    err: Option<Error>,
}

impl<'a> Serializer<'a> {
    pub fn new(value: &'a Value) -> Self {
        Self {
            stack: vec![Frame::Value(value)],
            chip: Chip::new(),
            done: false,
            err: None,
        }
    }

    /// Whether the final byte has been emitted.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Copy up to `out.len()` bytes of output into `out`, returning how many
    /// were written. Serializing a non-finite double fails with
    /// [`Error::NotNumber`]; the error then repeats on every call.
    pub fn read(&mut self, out: &mut [u8]) -> Result<usize> {
        if let Some(err) = self.err {
            return Err(err);
        }
        let mut n = 0;
        while n < out.len() {
            if !self.chip.is_empty() {
                n += self.chip.drain(&mut out[n..]);
                continue;
            }
            if let Some(Frame::Text { .. }) = self.stack.last() {
                n += self.emit_text(&mut out[n..]);
                continue;
            }
            match self.stack.pop() {
                None => break,
                Some(frame) => {
                    if let Err(err) = self.step(frame) {
                        self.err = Some(err);
                        return Err(err);
                    }
                }
            }
        }
        if self.chip.is_empty() && self.stack.is_empty() {
            self.done = true;
        }
        Ok(n)
    }

    fn step(&mut self, frame: Frame<'a>) -> Result<()> {
        match frame {
            Frame::Value(value) => match value.repr() {
                Repr::Null => self.chip.load(b"null"),
                Repr::Bool(true) => self.chip.load(b"true"),
                Repr::Bool(false) => self.chip.load(b"false"),
                Repr::Int64(v) => {
                    let mut fmt = itoa::Buffer::new();
                    self.chip.load(fmt.format(v).as_bytes());
                }
                Repr::UInt64(v) => {
                    let mut fmt = itoa::Buffer::new();
                    self.chip.load(fmt.format(v).as_bytes());
                }
                Repr::Float64(v) => {
                    if !v.is_finite() {
                        return Err(Error::NotNumber);
                    }
                    let mut fmt = ryu::Buffer::new();
                    self.chip.load(fmt.format_finite(v).as_bytes());
                }
                Repr::String(s) => {
                    self.chip.load(b"\"");
                    self.stack.push(Frame::Text {
                        bytes: s.as_bytes(),
                        pos: 0,
                        close: b"\"",
                    });
                }
                Repr::Array(a) => {
                    self.chip.load(b"[");
                    self.stack.push(Frame::Array {
                        iter: a.as_slice().iter(),
                        first: true,
                    });
                }
                Repr::Object(o) => {
                    self.chip.load(b"{");
                    self.stack.push(Frame::Object {
                        iter: o.iter(),
                        first: true,
                    });
                }
            },
            Frame::Array { mut iter, first } => match iter.next() {
                None => self.chip.load(b"]"),
                Some(value) => {
                    if !first {
                        self.chip.load(b",");
                    }
                    self.stack.push(Frame::Array { iter, first: false });
                    self.stack.push(Frame::Value(value));
                }
            },
            Frame::Object { mut iter, first } => match iter.next() {
                None => self.chip.load(b"}"),
                Some((key, value)) => {
                    self.chip.load(if first { b"\"".as_slice() } else { b",\"" });
                    self.stack.push(Frame::Object { iter, first: false });
                    self.stack.push(Frame::Value(value));
                    self.stack.push(Frame::Text {
                        bytes: key.as_bytes(),
                        pos: 0,
                        close: b"\":",
                    });
                }
            },
            Frame::Text { .. } => unreachable!("text frames are handled by emit_text"),
        }
        Ok(())
    }

    fn emit_text(&mut self, out: &mut [u8]) -> usize {
        let Some(Frame::Text { bytes, pos, close }) = self.stack.last_mut() else {
            return 0;
        };
        let mut n = 0;
        loop {
            let rest = &bytes[*pos..];
            if rest.is_empty() {
                let close = *close;
                self.stack.pop();
                self.chip.load(close);
                break;
            }
            if n == out.len() {
                break;
            }
            let span = rest
                .iter()
                .position(|&b| needs_escape(b))
                .unwrap_or(rest.len());
            if span > 0 {
                let take = span.min(out.len() - n);
                out[n..n + take].copy_from_slice(&rest[..take]);
                *pos += take;
                n += take;
                continue;
            }
            let byte = rest[0];
            *pos += 1;
            self.chip.load_escape(byte);
            break;
        }
        n
    }
}

/// Serialize `value` into a fresh byte vector.
pub fn to_vec(value: &Value) -> Result<Vec<u8>> {
    let mut serializer = Serializer::new(value);
    let mut out = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = serializer.read(&mut buf)?;
        out.extend_from_slice(&buf[..n]);
        if serializer.is_done() {
            return Ok(out);
        }
    }
}

/// Serialize `value` into a `String`.
///
/// Model strings are byte sequences; if one holds invalid UTF-8 the textual
/// rendition is refused with [`Error::NotString`]. Use [`to_vec`] for the
/// raw bytes.
pub fn to_string(value: &Value) -> Result<std::string::String> {
    let bytes = to_vec(value)?;
    std::string::String::from_utf8(bytes).map_err(|_| Error::NotString)
}
