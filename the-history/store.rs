//! Persistence boundary for documents, patches and proposals.
//!
//! The chain logic never talks to a database directly. Everything it needs is
//! expressed by [`HistoryStore`], and any backend that honours the contract of
//! [`HistoryStore::commit`] keeps the history consistent under concurrent
//! writers:
//!
//! - Patches are immutable and append-only. Rankings within a document are
//!   strictly increasing, and a document's head is the patch with the highest
//!   ranking.
//! - `commit` checks the head, appends the patch, replaces the content and
//!   drops the consumed proposal as a single all-or-nothing step. A losing
//!   writer observes [`HistoryError::TimelineMismatch`].
//!
//! Two backends are provided: [`MemoryStore`] and the JSON backed
//! [`FileStore`].

use std::sync::Arc;

use serde::{
  Deserialize,
  Serialize,
};

use crate::{
  DocumentId,
  OwnerId,
  Patch,
  PatchId,
  Proposal,
  ProposalId,
  error::Result,
};

mod file;
mod memory;
mod state;

pub use file::FileStore;
pub use memory::MemoryStore;

/// The persisted part of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
  pub content: String,
  pub head:    Option<PatchId>,
  pub owner:   OwnerId,
}

/// A patch about to be appended; the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPatch {
  pub script:  String,
  pub reverse: String,
  pub owner:   OwnerId,
  pub message: String,
}

pub trait HistoryStore: Send + Sync {
  fn insert_document(&self, document: DocumentId, owner: OwnerId) -> Result<()>;

  /// Drop a document together with its patches and pending proposals.
  fn remove_document(&self, document: DocumentId) -> Result<()>;

  /// Current content, head and owner of a document.
  fn document(&self, document: DocumentId) -> Result<DocumentRecord>;

  fn update_content(&self, document: DocumentId, content: &str) -> Result<()>;

  /// Append a patch with an explicit ranking, which must exceed
  /// [`max_ranking`](Self::max_ranking).
  fn append_patch(&self, document: DocumentId, ranking: u64, patch: NewPatch) -> Result<Patch>;

  /// Highest ranking of the document's patches, `0` if there are none.
  fn max_ranking(&self, document: DocumentId) -> Result<u64>;

  fn patch(&self, patch: PatchId) -> Result<Patch>;

  /// Patches with a ranking up to and including `max_ranking`, ascending.
  fn patches_up_to(&self, document: DocumentId, max_ranking: u64) -> Result<Vec<Patch>>;

  /// Persist a proposal; its `id` is ignored and the assigned one returned.
  fn insert_proposal(&self, proposal: &Proposal) -> Result<ProposalId>;

  fn proposal(&self, proposal: ProposalId) -> Result<Proposal>;

  fn delete_proposal(&self, proposal: ProposalId) -> Result<()>;

  /// Delete `old` and store `proposal` in its place as one step.
  ///
  /// Fails with [`ProposalNotFound`](crate::HistoryError::ProposalNotFound)
  /// without storing anything if `old` is gone.
  fn replace_proposal(&self, old: ProposalId, proposal: &Proposal) -> Result<ProposalId>;

  /// Pending proposals ordered by the ranking of their base patch.
  fn proposals(&self, document: DocumentId) -> Result<Vec<Proposal>>;

  /// Atomically accept a patch into the chain.
  ///
  /// Fails with [`TimelineMismatch`](crate::HistoryError::TimelineMismatch)
  /// unless the document head still equals `expected_head`. On success the
  /// patch is appended with `max_ranking + 1`, the content replaced by
  /// `content` and `consumed` (if any) deleted. On failure nothing changes.
  fn commit(
    &self,
    document: DocumentId,
    expected_head: Option<PatchId>,
    patch: NewPatch,
    content: &str,
    consumed: Option<ProposalId>,
  ) -> Result<Patch>;
}

macro_rules! forward_store {
  ($($ty:ty),*) => {
    $(
      impl<T: HistoryStore + ?Sized> HistoryStore for $ty {
        fn insert_document(&self, document: DocumentId, owner: OwnerId) -> Result<()> {
          (**self).insert_document(document, owner)
        }

        fn remove_document(&self, document: DocumentId) -> Result<()> {
          (**self).remove_document(document)
        }

        fn document(&self, document: DocumentId) -> Result<DocumentRecord> {
          (**self).document(document)
        }

        fn update_content(&self, document: DocumentId, content: &str) -> Result<()> {
          (**self).update_content(document, content)
        }

        fn append_patch(&self, document: DocumentId, ranking: u64, patch: NewPatch) -> Result<Patch> {
          (**self).append_patch(document, ranking, patch)
        }

        fn max_ranking(&self, document: DocumentId) -> Result<u64> {
          (**self).max_ranking(document)
        }

        fn patch(&self, patch: PatchId) -> Result<Patch> {
          (**self).patch(patch)
        }

        fn patches_up_to(&self, document: DocumentId, max_ranking: u64) -> Result<Vec<Patch>> {
          (**self).patches_up_to(document, max_ranking)
        }

        fn insert_proposal(&self, proposal: &Proposal) -> Result<ProposalId> {
          (**self).insert_proposal(proposal)
        }

        fn proposal(&self, proposal: ProposalId) -> Result<Proposal> {
          (**self).proposal(proposal)
        }

        fn delete_proposal(&self, proposal: ProposalId) -> Result<()> {
          (**self).delete_proposal(proposal)
        }

        fn replace_proposal(&self, old: ProposalId, proposal: &Proposal) -> Result<ProposalId> {
          (**self).replace_proposal(old, proposal)
        }

        fn proposals(&self, document: DocumentId) -> Result<Vec<Proposal>> {
          (**self).proposals(document)
        }

        fn commit(
          &self,
          document: DocumentId,
          expected_head: Option<PatchId>,
          patch: NewPatch,
          content: &str,
          consumed: Option<ProposalId>,
        ) -> Result<Patch> {
          (**self).commit(document, expected_head, patch, content, consumed)
        }
      }
    )*
  };
}

forward_store!(&T, Arc<T>, Box<T>);
