use std::ops::Range;

use the_script::ScriptError;
use thiserror::Error;

use crate::{
  DocumentId,
  PatchId,
  ProposalId,
};

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
  #[error("rejected diff-script: {0}")]
  Script(#[from] ScriptError),
  #[error(
    "timeline mismatch: proposal is based on {} but the head is {}",
    display_patch(.base),
    display_patch(.head)
  )]
  TimelineMismatch {
    base: Option<PatchId>,
    head: Option<PatchId>,
  },
  #[error(
    "proposal edit {mine:?} overlaps edit {theirs:?} of patch {patch} (ranking {ranking})"
  )]
  PatchIncompatible {
    patch:   PatchId,
    ranking: u64,
    mine:    Range<usize>,
    theirs:  Range<usize>,
  },
  #[error("patch ranking {ranking} does not follow the current maximum {max}")]
  RankingOutOfOrder { ranking: u64, max: u64 },
  #[error("proposal belongs to document {proposal} but was used with {document}")]
  ForeignProposal {
    document: DocumentId,
    proposal: DocumentId,
  },
  #[error("replaying the patches of {0} does not reproduce its content")]
  ChainDiverged(DocumentId),
  #[error("document {0} already exists")]
  DocumentExists(DocumentId),
  #[error("document {0} not found")]
  DocumentNotFound(DocumentId),
  #[error("patch {0} not found")]
  PatchNotFound(PatchId),
  #[error("proposal {0} not found")]
  ProposalNotFound(ProposalId),
  #[error("store i/o failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("store data is malformed: {0}")]
  Serde(#[from] serde_json::Error),
}

impl HistoryError {
  /// Whether the caller can recover by rebasing or retrying with a fresh base.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self,
      HistoryError::TimelineMismatch { .. } | HistoryError::PatchIncompatible { .. }
    )
  }

  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      HistoryError::DocumentNotFound(_)
        | HistoryError::PatchNotFound(_)
        | HistoryError::ProposalNotFound(_)
    )
  }
}

fn display_patch(id: &Option<PatchId>) -> String {
  match id {
    Some(id) => format!("patch {id}"),
    None => "the empty history".to_owned(),
  }
}
