//! Materializing decoded changes.
//!
//! Changes must be sorted by ascending `from` and must not overlap, which is
//! exactly what [`decode`](crate::script::decode) produces. They are applied
//! in a single left to right pass that tracks the running length offset, so
//! each change is addressed in the coordinates of the *original* text.

use ropey::Rope;

use crate::script::{
  Change,
  Result,
  ScriptError,
};

/// Apply `changes` to `text` and return the new text.
pub fn apply(text: &str, changes: &[Change]) -> Result<String> {
  if changes.is_empty() {
    return Ok(text.to_owned());
  }

  let mut doc = Rope::from_str(text);
  apply_in_place(&mut doc, changes)?;
  Ok(doc.to_string())
}

/// Apply `changes` to a rope and return the updated rope.
pub fn apply_to(doc: &Rope, changes: &[Change]) -> Result<Rope> {
  let mut doc = doc.clone();
  apply_in_place(&mut doc, changes)?;
  Ok(doc)
}

fn apply_in_place(doc: &mut Rope, changes: &[Change]) -> Result<()> {
  let mut offset: isize = 0;

  for change in changes {
    let len = doc.len_chars();
    let out_of_bounds = || {
      ScriptError::ApplyOutOfBounds {
        from: change.from,
        to: change.to,
        len,
      }
    };

    let from = change
      .from
      .checked_add_signed(offset)
      .ok_or_else(out_of_bounds)?;
    let to = change
      .to
      .checked_add_signed(offset)
      .ok_or_else(out_of_bounds)?;
    if from > to || to > len {
      return Err(out_of_bounds());
    }

    doc.try_remove(from..to).map_err(|_| out_of_bounds())?;
    if !change.text.is_empty() {
      doc
        .try_insert(from, &change.text)
        .map_err(|_| out_of_bounds())?;
    }
    offset += change.len_delta();
  }

  Ok(())
}
