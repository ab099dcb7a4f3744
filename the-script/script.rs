//! The diff-script wire format.
//!
//! A script is a left to right sequence of tokens with no separators:
//!
//! - **`=N`** - keep the next `N` characters of the source
//! - **`-N`** - delete the next `N` characters of the source
//! - **`+N/text`** - insert `text`, which is exactly the `N` characters that
//!   follow the `/`
//!
//! Inserted text is never escaped. It is located purely by its declared
//! length, so it may itself contain `=`, `-`, `+`, `/` or digits.
//!
//! `N` counts `char`s, not bytes. For non-ASCII text this is not compatible
//! with scripts produced by tools that count UTF-8 bytes: `+6/世界` from such
//! a tool is rejected here as running past the end of the script.
//!
//! [`decode`] validates a script against the length of the text it will be
//! applied to and yields [`Change`]s positioned in that text's coordinates.
//! [`encode`] turns the hunks of a text diff back into a script.

use std::fmt;

use thiserror::Error;

use crate::{
  Tendril,
  diff::DiffHunk,
};

pub type Result<T> = std::result::Result<T, ScriptError>;

#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScriptError {
  #[error("diff-script syntax error at offset {offset}")]
  Syntax { offset: usize },
  #[error(
    "insert at offset {offset} declares {declared} characters but only {available} remain in the \
     script"
  )]
  PatchOutOfBounds {
    offset:    usize,
    declared:  usize,
    available: usize,
  },
  #[error("diff-script spans {required} characters but the text has only {len}")]
  TextOutOfBounds { required: usize, len: usize },
  #[error("change {from}..{to} is out of bounds for text length {len}")]
  ApplyOutOfBounds { from: usize, to: usize, len: usize },
}

/// A single token of a diff-script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation<'a> {
  /// Keep n characters.
  Retain(usize),

  /// Delete n characters.
  Delete(usize),

  /// Insert text at the current position.
  Insert(&'a str),
}

impl fmt::Display for Operation<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Operation::Retain(n) => write!(f, "={n}"),
      Operation::Delete(n) => write!(f, "-{n}"),
      Operation::Insert(text) => write!(f, "+{}/{text}", text.chars().count()),
    }
  }
}

/// A decoded edit, positioned in the coordinates of the source text.
///
/// `from..to` is the half-open source range being replaced by `text`.
/// Deletions carry an empty `text`, insertions an empty range (`from == to`)
/// meaning "insert before `from`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
  pub from: usize,
  pub to:   usize,
  pub text: Tendril,
}

impl Change {
  pub fn delete(from: usize, to: usize) -> Self {
    debug_assert!(from <= to);
    Self {
      from,
      to,
      text: Tendril::new(),
    }
  }

  pub fn insert(at: usize, text: impl Into<Tendril>) -> Self {
    Self {
      from: at,
      to:   at,
      text: text.into(),
    }
  }

  #[inline]
  pub fn is_insert(&self) -> bool {
    self.from == self.to && !self.text.is_empty()
  }

  /// Whether applying this change is a no-op, as decoded from `-0` or `+0/`.
  #[inline]
  pub fn is_empty(&self) -> bool {
    self.from == self.to && self.text.is_empty()
  }

  /// Signed change in overall text length contributed by this change.
  pub fn len_delta(&self) -> isize {
    self.text.chars().count() as isize - (self.to - self.from) as isize
  }

  /// Move this change by `offset` characters.
  pub fn shift(&mut self, offset: isize) {
    debug_assert!(self.from.checked_add_signed(offset).is_some());
    self.from = self.from.saturating_add_signed(offset);
    self.to = self.to.saturating_add_signed(offset);
  }
}

/// Scanner over the tokens of a script.
///
/// Each call to `next` is one pass through the states
/// `sigil -> length -> ('/' -> payload)?` and ends in either a token or an
/// error. After the first error the scanner is exhausted.
pub struct Tokens<'a> {
  script: &'a str,
  pos:    usize,
}

pub fn tokens(script: &str) -> Tokens<'_> {
  Tokens { script, pos: 0 }
}

impl<'a> Tokens<'a> {
  fn token(&mut self, sigil: u8) -> Result<Operation<'a>> {
    let start = self.pos;
    self.pos += 1;
    match sigil {
      b'=' => Ok(Operation::Retain(self.length(start)?)),
      b'-' => Ok(Operation::Delete(self.length(start)?)),
      b'+' => {
        let declared = self.length(start)?;
        if self.script.as_bytes().get(self.pos) != Some(&b'/') {
          return Err(ScriptError::Syntax { offset: self.pos });
        }
        self.pos += 1;
        self.payload(start, declared).map(Operation::Insert)
      },
      _ => Err(ScriptError::Syntax { offset: start }),
    }
  }

  fn length(&mut self, start: usize) -> Result<usize> {
    let digits = self.script.as_bytes()[self.pos..]
      .iter()
      .take_while(|b| b.is_ascii_digit())
      .count();
    if digits == 0 {
      return Err(ScriptError::Syntax { offset: self.pos });
    }

    let mut n: usize = 0;
    for &digit in &self.script.as_bytes()[self.pos..self.pos + digits] {
      n = n
        .checked_mul(10)
        .and_then(|n| n.checked_add(usize::from(digit - b'0')))
        .ok_or(ScriptError::Syntax { offset: start })?;
    }
    self.pos += digits;
    Ok(n)
  }

  fn payload(&mut self, start: usize, declared: usize) -> Result<&'a str> {
    let rest = &self.script[self.pos..];
    let end = rest
      .char_indices()
      .map(|(idx, _)| idx)
      .chain(std::iter::once(rest.len()))
      .nth(declared)
      .ok_or_else(|| {
        ScriptError::PatchOutOfBounds {
          offset: start,
          declared,
          available: rest.chars().count(),
        }
      })?;
    self.pos += end;
    Ok(&rest[..end])
  }
}

impl<'a> Iterator for Tokens<'a> {
  type Item = Result<Operation<'a>>;

  fn next(&mut self) -> Option<Self::Item> {
    let sigil = *self.script.as_bytes().get(self.pos)?;
    let token = self.token(sigil);
    if token.is_err() {
      self.pos = self.script.len();
    }
    Some(token)
  }
}

/// Decode `script` against a source text of `len` characters.
///
/// Changes are produced in strictly increasing source order, which both the
/// apply engine and rebasing rely on. Keeps produce no change; a trailing
/// region not covered by the script is implicitly kept.
pub fn decode(script: &str, len: usize) -> Result<Vec<Change>> {
  let mut changes = Vec::new();
  let mut pos = 0;

  for token in tokens(script) {
    match token? {
      Operation::Retain(n) => pos = advance(pos, n, len)?,
      Operation::Delete(n) => {
        let end = advance(pos, n, len)?;
        changes.push(Change::delete(pos, end));
        pos = end;
      },
      Operation::Insert(text) => changes.push(Change::insert(pos, text)),
    }
  }

  log::trace!(
    "decoded {} changes from {} byte script",
    changes.len(),
    script.len()
  );
  Ok(changes)
}

fn advance(pos: usize, n: usize, len: usize) -> Result<usize> {
  match pos.checked_add(n) {
    Some(end) if end <= len => Ok(end),
    _ => {
      Err(ScriptError::TextOutOfBounds {
        required: pos.saturating_add(n),
        len,
      })
    },
  }
}

/// Encode diff hunks as a script, one token per non-empty hunk, in order.
pub fn encode<'a>(hunks: impl IntoIterator<Item = &'a DiffHunk>) -> String {
  use std::fmt::Write;

  let mut script = String::new();
  for hunk in hunks {
    if hunk.is_empty() {
      continue;
    }
    let op = match hunk {
      DiffHunk::Equal(text) => Operation::Retain(text.chars().count()),
      DiffHunk::Delete(text) => Operation::Delete(text.chars().count()),
      DiffHunk::Insert(text) => Operation::Insert(text.as_str()),
    };
    // Writing into a String cannot fail.
    let _ = write!(script, "{op}");
  }
  script
}
