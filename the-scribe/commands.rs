use std::{
  fmt::Display,
  io::Write,
};

use anyhow::{
  Context,
  Result,
};
use the_history::{
  Document,
  DocumentId,
  History,
  HistoryStore,
  OwnerId,
};

use crate::cli::Command;

fn or_dash<T: Display>(value: Option<T>) -> String {
  value.map_or_else(|| "-".to_owned(), |value| value.to_string())
}

fn open<S: HistoryStore>(history: &History<S>, id: DocumentId) -> Result<Document> {
  history
    .open(id)
    .with_context(|| format!("failed to open document {id}"))
}

pub fn run<S: HistoryStore>(
  history: &History<S>,
  owner: OwnerId,
  command: &Command,
  out: &mut impl Write,
) -> Result<()> {
  match command {
    Command::Init => {
      let document = history.create(owner)?;
      writeln!(out, "{}", document.id)?;
    },
    Command::Show { document, at } => {
      let document = open(history, *document)?;
      let document = match at {
        Some(patch) => history.reconstruct_at(&document, *patch)?,
        None => document,
      };
      write!(out, "{}", document.content)?;
    },
    Command::Log { document } => {
      let document = open(history, *document)?;
      for patch in history.patches(&document)? {
        writeln!(
          out,
          "{}\t{}\t{}\t{}\t{}",
          patch.id, patch.ranking, patch.owner, patch.message, patch.script
        )?;
      }
    },
    Command::Propose {
      document,
      input,
      message,
    } => {
      let document = open(history, *document)?;
      let text = input.read()?;
      let proposal = history.propose(&document, &text, message.as_str(), owner)?;
      writeln!(out, "{}\t{}", or_dash(proposal.id), proposal.script)?;
    },
    Command::Proposals { document } => {
      let document = open(history, *document)?;
      for proposal in history.proposals(&document)? {
        writeln!(
          out,
          "{}\t{}\t{}\t{}\t{}",
          or_dash(proposal.id),
          or_dash(proposal.base),
          proposal.owner,
          proposal.message,
          proposal.script
        )?;
      }
    },
    Command::Accept {
      document,
      proposal,
      rebase,
    } => {
      let mut document = open(history, *document)?;
      let mut proposal = history.proposal(*proposal)?;
      if *rebase && proposal.base != document.head {
        proposal = history
          .refresh(&document, &proposal)
          .context("failed to rebase proposal")?;
      }
      let patch = history
        .accept(&mut document, &proposal)
        .context("failed to accept proposal")?;
      writeln!(out, "{}\t{}", patch.id, patch.ranking)?;
    },
    Command::Rebase { document, proposal } => {
      let document = open(history, *document)?;
      let proposal = history.proposal(*proposal)?;
      let rebased = history.refresh(&document, &proposal)?;
      writeln!(out, "{}\t{}", or_dash(rebased.id), rebased.script)?;
    },
    Command::Withdraw { proposal } => history.withdraw(*proposal)?,
    Command::Verify { document } => {
      let document = open(history, *document)?;
      history.verify(&document)?;
      writeln!(out, "ok")?;
    },
  }
  Ok(())
}
