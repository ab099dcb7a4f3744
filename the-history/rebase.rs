//! Moving proposals across concurrently accepted patches.
//!
//! A proposal is computed against its base. Every patch accepted after that
//! base shifts the coordinates the proposal's changes are addressed in. As
//! long as no change of the proposal touches a region edited by one of those
//! patches, the changes can simply be shifted by the length delta of the
//! patch edits in front of them. Any overlap is rejected outright, no attempt
//! at merging is made.

use std::ops::Range;

use the_script::{
  Change,
  apply,
  decode,
  diff,
};

use crate::{
  Document,
  History,
  Proposal,
  document::rewind,
  error::{
    HistoryError,
    Result,
  },
  store::HistoryStore,
};

/// A proposal change overlapping a change of a concurrent patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
  pub mine:   Range<usize>,
  pub theirs: Range<usize>,
}

/// Re-address `mine` as if `theirs` had been applied first.
///
/// Both lists must be sorted and decoded against the same text. Touching
/// ranges are ordered, with an insertion at the boundary of a concurrent edit
/// landing on the side it was made on. When both sides insert at the same
/// point the concurrent insertion comes first.
pub fn transform(
  mine: &mut [Change],
  theirs: &[Change],
) -> std::result::Result<(), Conflict> {
  let mut cursor = 0;
  let mut offset: isize = 0;

  for real in theirs.iter().filter(|change| !change.is_empty()) {
    while let Some(my) = mine.get_mut(cursor) {
      if my.from >= real.to {
        break;
      }
      if real.from >= my.to {
        my.shift(offset);
        cursor += 1;
        continue;
      }
      return Err(Conflict {
        mine:   my.from..my.to,
        theirs: real.from..real.to,
      });
    }
    offset += real.len_delta();
  }

  for my in &mut mine[cursor..] {
    my.shift(offset);
  }
  Ok(())
}

impl<S: HistoryStore> History<S> {
  /// Re-express `proposal` against the head of `document`.
  ///
  /// The returned proposal keeps the id, owner and message but is based on
  /// the current head. Nothing is persisted. Fails with
  /// [`HistoryError::PatchIncompatible`] if any change of the proposal
  /// overlaps a change of a patch accepted after its base.
  pub fn rebase(&self, document: &Document, proposal: &Proposal) -> Result<Proposal> {
    if proposal.document != document.id {
      return Err(HistoryError::ForeignProposal {
        document: document.id,
        proposal: proposal.document,
      });
    }

    let patches = self.patches(document)?;
    if patches.is_empty() || proposal.base == document.head {
      return Ok(proposal.clone());
    }
    let base = proposal.base.ok_or(HistoryError::TimelineMismatch {
      base: None,
      head: document.head,
    })?;
    let idx = patches
      .iter()
      .rposition(|patch| patch.id == base)
      .ok_or(HistoryError::PatchNotFound(base))?;
    let later = &patches[idx + 1..];

    let mut old = rewind(&document.content, later)?;
    let mut mine = decode(&proposal.script, old.chars().count())?;
    mine.retain(|change| !change.is_empty());

    for patch in later {
      let theirs = decode(&patch.script, old.chars().count())?;
      transform(&mut mine, &theirs).map_err(|conflict| {
        log::warn!(
          "proposal for {} conflicts with patch {}: {:?} overlaps {:?}",
          document.id,
          patch.id,
          conflict.mine,
          conflict.theirs
        );
        HistoryError::PatchIncompatible {
          patch:   patch.id,
          ranking: patch.ranking,
          mine:    conflict.mine,
          theirs:  conflict.theirs,
        }
      })?;
      old = apply(&old, &theirs)?;
    }

    let result = apply(&document.content, &mine)?;
    let script = diff::script_with_options(&document.content, &result, self.diff_options());
    log::info!(
      "rebased proposal for {} across {} patches",
      document.id,
      later.len()
    );

    Ok(Proposal {
      base: document.head,
      script,
      ..proposal.clone()
    })
  }
}
