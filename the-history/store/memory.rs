use parking_lot::Mutex;

use super::{
  DocumentRecord,
  HistoryStore,
  NewPatch,
  state::State,
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

/// A store that keeps everything in memory behind a single lock.
#[derive(Debug, Default)]
pub struct MemoryStore {
  state: Mutex<State>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl HistoryStore for MemoryStore {
  fn insert_document(&self, document: DocumentId, owner: OwnerId) -> Result<()> {
    self.state.lock().insert_document(document, owner)
  }

  fn remove_document(&self, document: DocumentId) -> Result<()> {
    self.state.lock().remove_document(document)
  }

  fn document(&self, document: DocumentId) -> Result<DocumentRecord> {
    self.state.lock().document(document)
  }

  fn update_content(&self, document: DocumentId, content: &str) -> Result<()> {
    self.state.lock().update_content(document, content)
  }

  fn append_patch(&self, document: DocumentId, ranking: u64, patch: NewPatch) -> Result<Patch> {
    self.state.lock().append_patch(document, ranking, patch)
  }

  fn max_ranking(&self, document: DocumentId) -> Result<u64> {
    self.state.lock().max_ranking(document)
  }

  fn patch(&self, patch: PatchId) -> Result<Patch> {
    self.state.lock().patch(patch)
  }

  fn patches_up_to(&self, document: DocumentId, max_ranking: u64) -> Result<Vec<Patch>> {
    self.state.lock().patches_up_to(document, max_ranking)
  }

  fn insert_proposal(&self, proposal: &Proposal) -> Result<ProposalId> {
    self.state.lock().insert_proposal(proposal)
  }

  fn proposal(&self, proposal: ProposalId) -> Result<Proposal> {
    self.state.lock().proposal(proposal)
  }

  fn delete_proposal(&self, proposal: ProposalId) -> Result<()> {
    self.state.lock().delete_proposal(proposal)
  }

  fn replace_proposal(&self, old: ProposalId, proposal: &Proposal) -> Result<ProposalId> {
    self.state.lock().replace_proposal(old, proposal)
  }

  fn proposals(&self, document: DocumentId) -> Result<Vec<Proposal>> {
    self.state.lock().proposals(document)
  }

  fn commit(
    &self,
    document: DocumentId,
    expected_head: Option<PatchId>,
    patch: NewPatch,
    content: &str,
    consumed: Option<ProposalId>,
  ) -> Result<Patch> {
    self
      .state
      .lock()
      .commit(document, expected_head, patch, content, consumed)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::HistoryError;

  fn new_patch(script: &str) -> NewPatch {
    NewPatch {
      script:  script.into(),
      reverse: String::new(),
      owner:   OwnerId(1),
      message: String::new(),
    }
  }

  #[test]
  fn rankings_must_increase() {
    let store = MemoryStore::new();
    let doc = DocumentId::new();
    store.insert_document(doc, OwnerId(1)).unwrap();
    assert_eq!(store.max_ranking(doc).unwrap(), 0);

    store.append_patch(doc, 1, new_patch("")).unwrap();
    store.append_patch(doc, 3, new_patch("+1/a")).unwrap();
    assert_eq!(store.max_ranking(doc).unwrap(), 3);
    assert!(matches!(
      store.append_patch(doc, 3, new_patch("")),
      Err(HistoryError::RankingOutOfOrder { ranking: 3, max: 3 })
    ));

    let patches = store.patches_up_to(doc, 2).unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].ranking, 1);
  }

  #[test]
  fn commit_checks_head() {
    let store = MemoryStore::new();
    let doc = DocumentId::new();
    store.insert_document(doc, OwnerId(1)).unwrap();
    let first = store.commit(doc, None, new_patch(""), "", None).unwrap();
    assert_eq!(first.ranking, 1);

    let err = store
      .commit(doc, None, new_patch("+1/a"), "a", None)
      .unwrap_err();
    assert!(matches!(err, HistoryError::TimelineMismatch { base: None, head } if head == Some(first.id)));

    let record = store.document(doc).unwrap();
    assert_eq!(record.content, "");
    assert_eq!(record.head, Some(first.id));
  }

  #[test]
  fn commit_with_missing_proposal_changes_nothing() {
    let store = MemoryStore::new();
    let doc = DocumentId::new();
    store.insert_document(doc, OwnerId(1)).unwrap();
    let missing = "9".parse().unwrap();

    let err = store
      .commit(doc, None, new_patch("+1/a"), "a", Some(missing))
      .unwrap_err();
    assert!(matches!(err, HistoryError::ProposalNotFound(_)));
    assert_eq!(store.max_ranking(doc).unwrap(), 0);
    assert_eq!(store.document(doc).unwrap().content, "");
  }

  fn proposal(doc: DocumentId, script: &str) -> Proposal {
    Proposal {
      id:       None,
      document: doc,
      base:     None,
      script:   script.into(),
      owner:    OwnerId(1),
      message:  String::new(),
    }
  }

  #[test]
  fn replace_proposal_is_all_or_nothing() {
    let store = MemoryStore::new();
    let doc = DocumentId::new();
    store.insert_document(doc, OwnerId(1)).unwrap();
    let old = store.insert_proposal(&proposal(doc, "+1/a")).unwrap();

    let new = store.replace_proposal(old, &proposal(doc, "+1/b")).unwrap();
    assert!(new > old);
    assert!(matches!(
      store.proposal(old),
      Err(HistoryError::ProposalNotFound(_))
    ));
    assert_eq!(store.proposal(new).unwrap().script, "+1/b");

    // The old record is gone now, so nothing may be stored.
    assert!(matches!(
      store.replace_proposal(old, &proposal(doc, "+1/c")),
      Err(HistoryError::ProposalNotFound(id)) if id == old
    ));
    let pending = store.proposals(doc).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, Some(new));
  }

  #[test]
  fn remove_document_drops_its_proposals() {
    let store = MemoryStore::new();
    let doc = DocumentId::new();
    let other = DocumentId::new();
    store.insert_document(doc, OwnerId(1)).unwrap();
    store.insert_document(other, OwnerId(1)).unwrap();
    store.insert_proposal(&proposal(doc, "+1/a")).unwrap();
    let kept = store.insert_proposal(&proposal(other, "+1/b")).unwrap();

    store.remove_document(doc).unwrap();
    assert!(matches!(
      store.document(doc),
      Err(HistoryError::DocumentNotFound(_))
    ));
    assert!(matches!(
      store.remove_document(doc),
      Err(HistoryError::DocumentNotFound(_))
    ));
    assert_eq!(store.proposal(kept).unwrap().document, other);
    // The id can be used again.
    store.insert_document(doc, OwnerId(2)).unwrap();
    assert!(store.proposals(doc).unwrap().is_empty());
  }

  #[test]
  fn unknown_document() {
    let store = MemoryStore::new();
    let doc = DocumentId::new();
    assert!(matches!(
      store.document(doc),
      Err(HistoryError::DocumentNotFound(id)) if id == doc
    ));
    store.insert_document(doc, OwnerId(1)).unwrap();
    assert!(matches!(
      store.insert_document(doc, OwnerId(2)),
      Err(HistoryError::DocumentExists(_))
    ));
  }
}
