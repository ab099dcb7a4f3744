use serde::{
  Deserialize,
  Serialize,
};
use the_script::diff;

use crate::{
  Document,
  DocumentId,
  History,
  OwnerId,
  PatchId,
  ProposalId,
  error::Result,
  store::HistoryStore,
};

/// A pending edit, expressed against the head it was computed from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
  /// `None` until the proposal is persisted.
  pub id:       Option<ProposalId>,
  pub document: DocumentId,
  /// Head of the document when `script` was computed.
  pub base:     Option<PatchId>,
  pub script:   String,
  pub owner:    OwnerId,
  pub message:  String,
}

impl Proposal {
  /// A proposal against the current head of `document` that is not stored.
  pub fn unsaved(
    document: &Document,
    script: impl Into<String>,
    owner: OwnerId,
    message: impl Into<String>,
  ) -> Self {
    Self {
      id: None,
      document: document.id,
      base: document.head,
      script: script.into(),
      owner,
      message: message.into(),
    }
  }
}

impl<S: HistoryStore> History<S> {
  /// Store a proposal turning the content of `document` into `text`.
  pub fn propose(
    &self,
    document: &Document,
    text: &str,
    message: impl Into<String>,
    owner: OwnerId,
  ) -> Result<Proposal> {
    let script = diff::script_with_options(&document.content, text, self.diff_options());
    let mut proposal = Proposal::unsaved(document, script, owner, message);
    let id = self.store().insert_proposal(&proposal)?;
    proposal.id = Some(id);

    log::debug!(
      "stored proposal {id} for {} ({} byte script)",
      document.id,
      proposal.script.len()
    );
    Ok(proposal)
  }

  /// Pending proposals of `document`, oldest base first.
  pub fn proposals(&self, document: &Document) -> Result<Vec<Proposal>> {
    self.store().proposals(document.id)
  }

  pub fn proposal(&self, id: ProposalId) -> Result<Proposal> {
    self.store().proposal(id)
  }

  /// Drop a pending proposal without accepting it.
  pub fn withdraw(&self, id: ProposalId) -> Result<()> {
    self.store().delete_proposal(id)?;
    log::info!("withdrew proposal {id}");
    Ok(())
  }

  /// Rebase `proposal` onto the head of `document` and replace its stored
  /// record with the rebased one.
  pub fn refresh(&self, document: &Document, proposal: &Proposal) -> Result<Proposal> {
    let mut rebased = self.rebase(document, proposal)?;
    if rebased == *proposal && proposal.id.is_some() {
      return Ok(rebased);
    }

    let id = match proposal.id {
      Some(old) => self.store().replace_proposal(old, &rebased)?,
      None => self.store().insert_proposal(&rebased)?,
    };
    rebased.id = Some(id);
    Ok(rebased)
  }
}
