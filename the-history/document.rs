//! Documents and their patch chain.

use serde::{
  Deserialize,
  Serialize,
};
use the_script::{
  DiffOptions,
  apply,
  decode,
  diff,
};

use crate::{
  DocumentId,
  OwnerId,
  PatchId,
  Proposal,
  error::{
    HistoryError,
    Result,
  },
  store::{
    DocumentRecord,
    HistoryStore,
    NewPatch,
  },
};

/// A snapshot of a document as loaded from its store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
  pub id:      DocumentId,
  pub content: String,
  /// The last accepted patch, `None` only before the initial patch exists.
  pub head:    Option<PatchId>,
  pub owner:   OwnerId,
}

impl Document {
  fn from_record(id: DocumentId, record: DocumentRecord) -> Self {
    Self {
      id,
      content: record.content,
      head: record.head,
      owner: record.owner,
    }
  }
}

/// An accepted, immutable edit of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patch {
  pub id:       PatchId,
  pub document: DocumentId,
  /// Strictly increasing within a document.
  pub ranking:  u64,
  pub script:   String,
  /// Script undoing this patch, decoded against the text after it.
  pub reverse:  String,
  pub owner:    OwnerId,
  pub message:  String,
}

/// The outcome of applying a proposal script to a text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
  pub text:    String,
  pub script:  String,
  pub reverse: String,
}

/// Apply `script` to `text`, computing the script that undoes it.
pub fn apply_proposal(text: &str, script: &str, options: &DiffOptions) -> Result<Applied> {
  let changes = decode(script, text.chars().count())?;
  let new_text = apply(text, &changes)?;
  let reverse = diff::script_with_options(&new_text, text, options);
  Ok(Applied {
    text: new_text,
    script: script.to_owned(),
    reverse,
  })
}

/// Replay `patches` in order, starting from the empty text.
pub fn replay<'a>(patches: impl IntoIterator<Item = &'a Patch>) -> Result<String> {
  patches
    .into_iter()
    .try_fold(String::new(), |text, patch| forward(&text, &patch.script))
}

pub(crate) fn forward(text: &str, script: &str) -> Result<String> {
  let changes = decode(script, text.chars().count())?;
  Ok(apply(text, &changes)?)
}

/// Undo `patches` (ascending ranking) from `content`, newest first.
pub(crate) fn rewind(content: &str, patches: &[Patch]) -> Result<String> {
  patches
    .iter()
    .rev()
    .try_fold(content.to_owned(), |text, patch| forward(&text, &patch.reverse))
}

/// Document operations on top of a [`HistoryStore`].
#[derive(Debug)]
pub struct History<S> {
  store: S,
  diff:  DiffOptions,
}

impl<S: HistoryStore> History<S> {
  pub fn new(store: S) -> Self {
    Self {
      store,
      diff: DiffOptions::default(),
    }
  }

  pub fn with_diff_options(mut self, diff: DiffOptions) -> Self {
    self.diff = diff;
    self
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn diff_options(&self) -> &DiffOptions {
    &self.diff
  }

  /// Create an empty document owned by `owner`.
  ///
  /// The document immediately receives an empty initial patch so that it
  /// always has a head. If that patch cannot be stored the document is
  /// removed again.
  pub fn create(&self, owner: OwnerId) -> Result<Document> {
    let id = DocumentId::new();
    self.store.insert_document(id, owner)?;

    let mut document = Document {
      id,
      content: String::new(),
      head: None,
      owner,
    };
    let init = Proposal::unsaved(&document, String::new(), owner, "initial version");
    if let Err(err) = self.accept(&mut document, &init) {
      log::warn!("failed to store initial patch of {id}: {err}");
      if let Err(cleanup) = self.store.remove_document(id) {
        log::error!("document {id} is left without a head: {cleanup}");
      }
      return Err(err);
    }
    Ok(document)
  }

  pub fn open(&self, id: DocumentId) -> Result<Document> {
    let record = self.store.document(id)?;
    Ok(Document::from_record(id, record))
  }

  /// Accept `proposal` as the next patch of `document`.
  ///
  /// The proposal must be based on the current head. On success `document`
  /// holds the new content and head and the proposal record is consumed. On
  /// failure neither `document` nor the store change.
  pub fn accept(&self, document: &mut Document, proposal: &Proposal) -> Result<Patch> {
    if proposal.document != document.id {
      return Err(HistoryError::ForeignProposal {
        document: document.id,
        proposal: proposal.document,
      });
    }
    if proposal.base != document.head {
      log::warn!(
        "refusing stale proposal for {}: based on {:?}, head is {:?}",
        document.id,
        proposal.base,
        document.head
      );
      return Err(HistoryError::TimelineMismatch {
        base: proposal.base,
        head: document.head,
      });
    }

    let applied = apply_proposal(&document.content, &proposal.script, &self.diff)?;
    let patch = NewPatch {
      script:  applied.script,
      reverse: applied.reverse,
      owner:   proposal.owner,
      message: proposal.message.clone(),
    };
    let patch = self
      .store
      .commit(document.id, document.head, patch, &applied.text, proposal.id)
      .inspect_err(|err| {
        if err.is_conflict() {
          log::warn!("lost accept race on {}: {err}", document.id);
        }
      })?;

    log::info!(
      "accepted patch {} (ranking {}) into {}",
      patch.id,
      patch.ranking,
      document.id
    );
    document.content = applied.text;
    document.head = Some(patch.id);
    Ok(patch)
  }

  /// Patches of `document` up to and including its head, ascending.
  pub fn patches(&self, document: &Document) -> Result<Vec<Patch>> {
    let Some(head) = document.head else {
      return Ok(Vec::new());
    };
    let ranking = self.store.patch(head)?.ranking;
    self.store.patches_up_to(document.id, ranking)
  }

  /// The document as it was right after `target` was accepted.
  ///
  /// Walks back from the head undoing every later patch, so the cost grows
  /// with the distance to the head.
  pub fn reconstruct_at(&self, document: &Document, target: PatchId) -> Result<Document> {
    let patches = self.patches(document)?;
    let idx = patches
      .iter()
      .rposition(|patch| patch.id == target)
      .ok_or(HistoryError::PatchNotFound(target))?;

    let later = &patches[idx + 1..];
    log::debug!(
      "reconstructing {} at patch {target} by undoing {} patches",
      document.id,
      later.len()
    );
    Ok(Document {
      id:      document.id,
      content: rewind(&document.content, later)?,
      head:    Some(target),
      owner:   document.owner,
    })
  }

  /// Check that the chain replays to the content and unwinds back to the
  /// empty text.
  pub fn verify(&self, document: &Document) -> Result<()> {
    let patches = self.patches(document)?;
    let replayed = replay(&patches)?;
    if replayed != document.content {
      return Err(HistoryError::ChainDiverged(document.id));
    }
    if !rewind(&document.content, &patches)?.is_empty() {
      return Err(HistoryError::ChainDiverged(document.id));
    }
    Ok(())
  }
}

#[cfg(test)]
mod test {
  use quickcheck::quickcheck;

  use super::*;
  use crate::{
    MemoryStore,
    ProposalId,
  };

  /// Delegates to a [`MemoryStore`] but refuses every commit.
  #[derive(Default)]
  struct ReadOnlyChain(MemoryStore, parking_lot::Mutex<Vec<DocumentId>>);

  impl HistoryStore for ReadOnlyChain {
    fn insert_document(&self, document: DocumentId, owner: OwnerId) -> Result<()> {
      self.0.insert_document(document, owner)?;
      self.1.lock().push(document);
      Ok(())
    }

    fn remove_document(&self, document: DocumentId) -> Result<()> {
      self.0.remove_document(document)
    }

    fn document(&self, document: DocumentId) -> Result<DocumentRecord> {
      self.0.document(document)
    }

    fn update_content(&self, document: DocumentId, content: &str) -> Result<()> {
      self.0.update_content(document, content)
    }

    fn append_patch(&self, document: DocumentId, ranking: u64, patch: NewPatch) -> Result<Patch> {
      self.0.append_patch(document, ranking, patch)
    }

    fn max_ranking(&self, document: DocumentId) -> Result<u64> {
      self.0.max_ranking(document)
    }

    fn patch(&self, patch: PatchId) -> Result<Patch> {
      self.0.patch(patch)
    }

    fn patches_up_to(&self, document: DocumentId, max_ranking: u64) -> Result<Vec<Patch>> {
      self.0.patches_up_to(document, max_ranking)
    }

    fn insert_proposal(&self, proposal: &Proposal) -> Result<ProposalId> {
      self.0.insert_proposal(proposal)
    }

    fn proposal(&self, proposal: ProposalId) -> Result<Proposal> {
      self.0.proposal(proposal)
    }

    fn delete_proposal(&self, proposal: ProposalId) -> Result<()> {
      self.0.delete_proposal(proposal)
    }

    fn replace_proposal(&self, old: ProposalId, proposal: &Proposal) -> Result<ProposalId> {
      self.0.replace_proposal(old, proposal)
    }

    fn proposals(&self, document: DocumentId) -> Result<Vec<Proposal>> {
      self.0.proposals(document)
    }

    fn commit(
      &self,
      _document: DocumentId,
      _expected_head: Option<PatchId>,
      _patch: NewPatch,
      _content: &str,
      _consumed: Option<ProposalId>,
    ) -> Result<Patch> {
      Err(std::io::Error::other("read-only").into())
    }
  }

  quickcheck! {
    fn reverse_script_restores_text(a: String, b: String) -> bool {
      let options = DiffOptions::default();
      let script = diff::script(&a, &b);
      let applied = apply_proposal(&a, &script, &options).unwrap();
      applied.text == b && forward(&applied.text, &applied.reverse).unwrap() == a
    }
  }

  #[test]
  fn apply_proposal_rejects_bad_scripts() {
    let options = DiffOptions::default();
    assert!(matches!(
      apply_proposal("abc", "=4", &options),
      Err(HistoryError::Script(_))
    ));
    assert!(matches!(
      apply_proposal("abc", "?", &options),
      Err(HistoryError::Script(_))
    ));
  }

  #[test]
  fn create_starts_with_empty_patch() {
    let history = History::new(MemoryStore::new());
    let document = history.create(OwnerId(3)).unwrap();
    assert_eq!(document.content, "");

    let patches = history.patches(&document).unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(Some(patches[0].id), document.head);
    assert_eq!(patches[0].ranking, 1);
    assert_eq!(patches[0].script, "");
    assert_eq!(patches[0].reverse, "");
    assert_eq!(patches[0].owner, OwnerId(3));

    assert_eq!(history.open(document.id).unwrap(), document);
  }

  #[test]
  fn failed_create_leaves_no_document() {
    let history = History::new(ReadOnlyChain::default());
    assert!(matches!(
      history.create(OwnerId(1)),
      Err(HistoryError::Io(_))
    ));

    let inserted = history.store().1.lock().clone();
    assert_eq!(inserted.len(), 1);
    assert!(matches!(
      history.open(inserted[0]),
      Err(HistoryError::DocumentNotFound(_))
    ));
  }

  #[test]
  fn accept_rejects_foreign_proposal() {
    let history = History::new(MemoryStore::new());
    let mut a = history.create(OwnerId(1)).unwrap();
    let b = history.create(OwnerId(1)).unwrap();
    let proposal = history.propose(&b, "text", "for b", OwnerId(1)).unwrap();

    let err = history.accept(&mut a, &proposal).unwrap_err();
    assert!(matches!(err, HistoryError::ForeignProposal { .. }));
    assert_eq!(a.content, "");
  }

  #[test]
  fn reconstruct_unknown_patch() {
    let history = History::new(MemoryStore::new());
    let a = history.create(OwnerId(1)).unwrap();
    let b = history.create(OwnerId(1)).unwrap();

    let foreign = b.head.unwrap();
    let err = history.reconstruct_at(&a, foreign).unwrap_err();
    assert!(matches!(err, HistoryError::PatchNotFound(id) if id == foreign));
  }

  #[test]
  fn verify_detects_divergence() {
    let history = History::new(MemoryStore::new());
    let mut document = history.create(OwnerId(1)).unwrap();
    let proposal = history
      .propose(&document, "one\ntwo\n", "lines", OwnerId(1))
      .unwrap();
    history.accept(&mut document, &proposal).unwrap();
    history.verify(&document).unwrap();

    history.store().update_content(document.id, "tampered").unwrap();
    let tampered = history.open(document.id).unwrap();
    assert!(matches!(
      history.verify(&tampered),
      Err(HistoryError::ChainDiverged(_))
    ));
  }
}
