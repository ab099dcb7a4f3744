//! Versioned documents with a linear, replayable patch history.
//!
//! A [`Document`] owns its current content. Every accepted edit is recorded as
//! an immutable, ranked [`Patch`] carrying a forward and a reverse
//! diff-script, so replaying the chain from the empty string always yields the
//! current content. Edits start out as a [`Proposal`] computed against the
//! head at the time; a proposal whose base went stale can be rebased across
//! the patches accepted since, as long as none of them touched the same text.
//!
//! All persistence goes through [`HistoryStore`].

mod id;

pub mod document;
pub mod error;
pub mod proposal;
pub mod rebase;
pub mod store;

pub use document::{
  Applied,
  Document,
  History,
  Patch,
  apply_proposal,
  replay,
};
pub use error::{
  HistoryError,
  Result,
};
pub use id::{
  DocumentId,
  OwnerId,
  ParseIdError,
  PatchId,
  ProposalId,
};
pub use proposal::Proposal;
pub use rebase::{
  Conflict,
  transform,
};
pub use store::{
  DocumentRecord,
  FileStore,
  HistoryStore,
  MemoryStore,
  NewPatch,
};
