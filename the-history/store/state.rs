use std::{
  collections::BTreeMap,
  num::NonZeroU64,
};

use serde::{
  Deserialize,
  Serialize,
};

use super::{
  DocumentRecord,
  NewPatch,
};
use crate::{
  DocumentId,
  OwnerId,
  Patch,
  PatchId,
  Proposal,
  ProposalId,
  error::{
    HistoryError,
    Result,
  },
};

/// Backend independent store state shared by the in-memory and file stores.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct State {
  documents:     BTreeMap<DocumentId, Entry>,
  /// Ordered by id.
  proposals:     Vec<Proposal>,
  next_patch:    u64,
  next_proposal: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
  owner:   OwnerId,
  content: String,
  /// Ordered by ranking, and therefore also by id.
  patches: Vec<Patch>,
}

impl Entry {
  fn head(&self) -> Option<PatchId> {
    self.patches.last().map(|patch| patch.id)
  }

  fn max_ranking(&self) -> u64 {
    self.patches.last().map_or(0, |patch| patch.ranking)
  }

  fn ranking_of(&self, id: PatchId) -> Option<u64> {
    self
      .patches
      .binary_search_by_key(&id, |patch| patch.id)
      .ok()
      .map(|idx| self.patches[idx].ranking)
  }
}

fn allocate(counter: &mut u64) -> NonZeroU64 {
  let id = NonZeroU64::MIN.saturating_add(*counter);
  *counter += 1;
  id
}

impl State {
  fn entry(&self, document: DocumentId) -> Result<&Entry> {
    self
      .documents
      .get(&document)
      .ok_or(HistoryError::DocumentNotFound(document))
  }

  fn entry_mut(&mut self, document: DocumentId) -> Result<&mut Entry> {
    self
      .documents
      .get_mut(&document)
      .ok_or(HistoryError::DocumentNotFound(document))
  }

  fn proposal_index(&self, proposal: ProposalId) -> Result<usize> {
    self
      .proposals
      .binary_search_by_key(&Some(proposal), |p| p.id)
      .map_err(|_| HistoryError::ProposalNotFound(proposal))
  }

  pub(super) fn insert_document(&mut self, document: DocumentId, owner: OwnerId) -> Result<()> {
    if self.documents.contains_key(&document) {
      return Err(HistoryError::DocumentExists(document));
    }
    self.documents.insert(document, Entry {
      owner,
      content: String::new(),
      patches: Vec::new(),
    });
    Ok(())
  }

  pub(super) fn remove_document(&mut self, document: DocumentId) -> Result<()> {
    self
      .documents
      .remove(&document)
      .ok_or(HistoryError::DocumentNotFound(document))?;
    self.proposals.retain(|proposal| proposal.document != document);
    Ok(())
  }

  pub(super) fn document(&self, document: DocumentId) -> Result<DocumentRecord> {
    let entry = self.entry(document)?;
    Ok(DocumentRecord {
      content: entry.content.clone(),
      head:    entry.head(),
      owner:   entry.owner,
    })
  }

  pub(super) fn update_content(&mut self, document: DocumentId, content: &str) -> Result<()> {
    let entry = self.entry_mut(document)?;
    entry.content.clear();
    entry.content.push_str(content);
    Ok(())
  }

  pub(super) fn append_patch(
    &mut self,
    document: DocumentId,
    ranking: u64,
    patch: NewPatch,
  ) -> Result<Patch> {
    let max = self.entry(document)?.max_ranking();
    if ranking <= max {
      return Err(HistoryError::RankingOutOfOrder { ranking, max });
    }

    let patch = Patch {
      id: PatchId::new(allocate(&mut self.next_patch)),
      document,
      ranking,
      script: patch.script,
      reverse: patch.reverse,
      owner: patch.owner,
      message: patch.message,
    };
    self.entry_mut(document)?.patches.push(patch.clone());
    Ok(patch)
  }

  pub(super) fn max_ranking(&self, document: DocumentId) -> Result<u64> {
    Ok(self.entry(document)?.max_ranking())
  }

  pub(super) fn patch(&self, id: PatchId) -> Result<Patch> {
    self
      .documents
      .values()
      .find_map(|entry| {
        entry
          .patches
          .binary_search_by_key(&id, |patch| patch.id)
          .ok()
          .map(|idx| entry.patches[idx].clone())
      })
      .ok_or(HistoryError::PatchNotFound(id))
  }

  pub(super) fn patches_up_to(&self, document: DocumentId, max_ranking: u64) -> Result<Vec<Patch>> {
    Ok(
      self
        .entry(document)?
        .patches
        .iter()
        .take_while(|patch| patch.ranking <= max_ranking)
        .cloned()
        .collect(),
    )
  }

  pub(super) fn insert_proposal(&mut self, proposal: &Proposal) -> Result<ProposalId> {
    self.entry(proposal.document)?;
    let id = ProposalId::new(allocate(&mut self.next_proposal));
    self.proposals.push(Proposal {
      id: Some(id),
      ..proposal.clone()
    });
    Ok(id)
  }

  pub(super) fn proposal(&self, id: ProposalId) -> Result<Proposal> {
    let idx = self.proposal_index(id)?;
    Ok(self.proposals[idx].clone())
  }

  pub(super) fn delete_proposal(&mut self, id: ProposalId) -> Result<()> {
    let idx = self.proposal_index(id)?;
    self.proposals.remove(idx);
    Ok(())
  }

  pub(super) fn replace_proposal(
    &mut self,
    old: ProposalId,
    proposal: &Proposal,
  ) -> Result<ProposalId> {
    let idx = self.proposal_index(old)?;
    self.entry(proposal.document)?;
    self.proposals.remove(idx);
    // Fresh ids are the largest, so pushing keeps the order.
    self.insert_proposal(proposal)
  }

  pub(super) fn proposals(&self, document: DocumentId) -> Result<Vec<Proposal>> {
    let entry = self.entry(document)?;
    let mut proposals: Vec<_> = self
      .proposals
      .iter()
      .filter(|proposal| proposal.document == document)
      .cloned()
      .collect();
    // Proposals whose base was never part of this chain sort last.
    proposals.sort_by_key(|proposal| {
      proposal
        .base
        .map_or(Some(0), |base| entry.ranking_of(base))
        .unwrap_or(u64::MAX)
    });
    Ok(proposals)
  }

  pub(super) fn commit(
    &mut self,
    document: DocumentId,
    expected_head: Option<PatchId>,
    patch: NewPatch,
    content: &str,
    consumed: Option<ProposalId>,
  ) -> Result<Patch> {
    let entry = self.entry(document)?;
    let head = entry.head();
    if head != expected_head {
      return Err(HistoryError::TimelineMismatch {
        base: expected_head,
        head,
      });
    }
    let ranking = entry.max_ranking() + 1;
    let consumed = consumed
      .map(|proposal| self.proposal_index(proposal))
      .transpose()?;

    // Everything is validated, nothing below can fail.
    let patch = self.append_patch(document, ranking, patch)?;
    self.update_content(document, content)?;
    if let Some(idx) = consumed {
      self.proposals.remove(idx);
    }
    Ok(patch)
  }
}
