// src/parser.rs
use serde::Serialize;

use crate::errors::{Result, TagError};

/// One `value=arg1 arg2` unit of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Clause {
    pub value: String,
    pub args: Vec<String>,
}

/// Parse an annotation in the pattern `valA=argA1 argA2,valB=argB1 argB2` into
///
/// ```text
/// [Clause { value: "valA", args: ["argA1", "argA2"] },
///  Clause { value: "valB", args: ["argB1", "argB2"] }]
/// ```
///
/// Clauses with an empty value are dropped, as are empty argument tokens.
pub fn parse_clauses(tag: &str) -> Result<Vec<Clause>> {
    let mut out = Vec::new();

    for sec in tag.split(',') {
        if sec.is_empty() {
            continue;
        }

        let (value, args) = match sec.split_once('=') {
            Some((_, rest)) if rest.contains('=') => {
                return Err(TagError::InvalidTagPattern(format!(
                    "sections more than 2 in `{sec}`"
                )));
            }
            Some((value, rest)) => (value, Some(rest)),
            None => (sec, None),
        };

        if value.is_empty() {
            continue;
        }

        let args = args
            .map(|rest| {
                rest.split(' ')
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        out.push(Clause {
            value: value.to_string(),
            args,
        });
    }

    Ok(out)
}

/// A raw struct tag in the conventional `key:"value" other:"value"` form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StructTag<'a>(&'a str);

impl<'a> StructTag<'a> {
    pub const fn new(raw: &'a str) -> Self {
        Self(raw)
    }

    pub fn as_str(&self) -> &'a str {
        self.0
    }

    /// Value stored under `key`, or `None` if the key is absent.
    /// Scanning stops at the first malformed pair.
    ///
    /// Values are double-quoted and accept the usual escapes: `\a \b \f \n \r
    /// \t \v \\ \"`, `\xHH`, three-digit octal `\OOO`, `\uHHHH` and
    /// `\UHHHHHHHH`. `\'` is not an escape inside double quotes.
    pub fn lookup(&self, key: &str) -> Option<String> {
        let mut p = Parser::new(self.0);
        loop {
            p.skip_spaces();
            if p.eof() {
                return None;
            }
            let name = p.parse_tag_key()?;
            if !p.consume_char(':') {
                return None;
            }
            let value = p.parse_quoted_string()?;
            if name == key {
                return Some(value);
            }
        }
    }

    /// Like [`lookup`](Self::lookup) but absent keys read as empty.
    pub fn get(&self, key: &str) -> String {
        self.lookup(key).unwrap_or_default()
    }
}

struct Parser<'a> {
    s: &'a str,
    i: usize,
}

impl<'a> Parser<'a> {
    fn new(s: &'a str) -> Self {
        Self { s, i: 0 }
    }

    // key chars: anything printable except space, quote and colon
    fn parse_tag_key(&mut self) -> Option<&'a str> {
        let start = self.i;
        while let Some(c) = self.peek_char() {
            if c > ' ' && c != ':' && c != '"' && c != '\u{7f}' {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
        if self.i == start {
            return None;
        }
        Some(&self.s[start..self.i])
    }

    // `\x` and octal escapes write raw bytes; the result must still be valid UTF-8.
    fn parse_quoted_string(&mut self) -> Option<String> {
        if !self.consume_char('"') {
            return None;
        }
        let mut out = Vec::new();
        while let Some(c) = self.peek_char() {
            self.i += c.len_utf8();
            match c {
                '"' => return String::from_utf8(out).ok(),
                '\\' => self.parse_escape(&mut out)?,
                _ => push_char(&mut out, c),
            }
        }
        None
    }

    fn parse_escape(&mut self, out: &mut Vec<u8>) -> Option<()> {
        let c = self.peek_char()?;
        self.i += c.len_utf8();
        match c {
            'a' => out.push(0x07),
            'b' => out.push(0x08),
            'f' => out.push(0x0c),
            'n' => out.push(b'\n'),
            'r' => out.push(b'\r'),
            't' => out.push(b'\t'),
            'v' => out.push(0x0b),
            '\\' => out.push(b'\\'),
            '"' => out.push(b'"'),
            'x' => out.push(u8::try_from(self.parse_digits(2, 16)?).ok()?),
            '0'..='7' => {
                self.i -= 1;
                out.push(u8::try_from(self.parse_digits(3, 8)?).ok()?);
            }
            'u' => push_char(out, char::from_u32(self.parse_digits(4, 16)?)?),
            'U' => push_char(out, char::from_u32(self.parse_digits(8, 16)?)?),
            _ => return None,
        }
        Some(())
    }

    // exactly `n` digits in `radix`
    fn parse_digits(&mut self, n: usize, radix: u32) -> Option<u32> {
        let raw = self.s.get(self.i..self.i + n)?;
        if !raw.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        self.i += n;
        u32::from_str_radix(raw, radix).ok()
    }

    fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    fn skip_spaces(&mut self) {
        while self.consume_char(' ') {}
    }

    fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}

fn push_char(out: &mut Vec<u8>, c: char) {
    out.extend_from_slice(c.encode_utf8(&mut [0; 4]).as_bytes());
}
