use std::{
  io::Read,
  path::PathBuf,
};

use anyhow::{
  Context,
  Result,
  ensure,
};
use clap::{
  ArgAction,
  Parser,
  Subcommand,
};
use the_history::{
  DocumentId,
  OwnerId,
  PatchId,
  ProposalId,
};

#[derive(Clone, Debug)]
pub struct CliOptions {
  pub verbosity:   u8,
  pub log_file:    Option<PathBuf>,
  pub config_file: Option<PathBuf>,
  pub store:       Option<PathBuf>,
  pub owner:       Option<OwnerId>,
  pub command:     Command,
}

impl CliOptions {
  pub fn parse() -> Result<Self> {
    let raw = RawCli::parse();
    raw.try_into()
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
  Init,
  Show {
    document: DocumentId,
    at:       Option<PatchId>,
  },
  Log {
    document: DocumentId,
  },
  Propose {
    document: DocumentId,
    input:    Input,
    message:  String,
  },
  Proposals {
    document: DocumentId,
  },
  Accept {
    document: DocumentId,
    proposal: ProposalId,
    rebase:   bool,
  },
  Rebase {
    document: DocumentId,
    proposal: ProposalId,
  },
  Withdraw {
    proposal: ProposalId,
  },
  Verify {
    document: DocumentId,
  },
}

/// Where the text of a new proposal comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
  Stdin,
  File(PathBuf),
}

impl Input {
  pub fn read(&self) -> Result<String> {
    match self {
      Input::Stdin => {
        let mut text = String::new();
        std::io::stdin()
          .read_to_string(&mut text)
          .context("failed to read stdin")?;
        Ok(text)
      },
      Input::File(path) => {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
      },
    }
  }
}

#[derive(Parser, Debug)]
#[command(name = "the-scribe", about, long_about = None, version)]
struct RawCli {
  /// Increase logging verbosity (repeat for more detail)
  #[arg(short = 'v', action = ArgAction::Count, global = true)]
  verbosity: u8,

  /// Save logs to a specific file
  #[arg(long = "log", value_name = "FILE", global = true)]
  log_file: Option<PathBuf>,

  /// Load configuration from a specific file
  #[arg(short = 'c', long = "config", value_name = "FILE", global = true)]
  config_file: Option<PathBuf>,

  /// History file to operate on
  #[arg(long = "store", value_name = "FILE", global = true)]
  store: Option<PathBuf>,

  /// Principal recorded for new records
  #[arg(long = "owner", value_name = "ID", global = true)]
  owner: Option<u64>,

  #[command(subcommand)]
  command: RawCommand,
}

#[derive(Subcommand, Debug)]
enum RawCommand {
  /// Create an empty document and print its id
  Init,
  /// Print the content of a document
  Show {
    document: DocumentId,
    /// Print the content as of this patch instead
    #[arg(long = "at", value_name = "PATCH")]
    at:       Option<PatchId>,
  },
  /// List the patches of a document
  Log { document: DocumentId },
  /// Propose new content for a document, read from FILE or `-` for stdin
  Propose {
    document: DocumentId,
    #[arg(value_name = "FILE")]
    input:    PathBuf,
    /// Describe the change
    #[arg(short = 'm', long = "message")]
    message:  String,
  },
  /// List the pending proposals of a document
  Proposals { document: DocumentId },
  /// Accept a proposal into the history
  Accept {
    document: DocumentId,
    proposal: ProposalId,
    /// Rebase the proposal first if its base is stale
    #[arg(long = "rebase")]
    rebase:   bool,
  },
  /// Rebase a proposal onto the current head
  Rebase {
    document: DocumentId,
    proposal: ProposalId,
  },
  /// Drop a pending proposal
  Withdraw { proposal: ProposalId },
  /// Check that the patch chain reproduces the content
  Verify { document: DocumentId },
}

impl TryFrom<RawCli> for CliOptions {
  type Error = anyhow::Error;

  fn try_from(raw: RawCli) -> Result<Self> {
    let command = match raw.command {
      RawCommand::Init => Command::Init,
      RawCommand::Show { document, at } => Command::Show { document, at },
      RawCommand::Log { document } => Command::Log { document },
      RawCommand::Propose {
        document,
        input,
        message,
      } => {
        let input = if input.as_os_str() == "-" {
          Input::Stdin
        } else {
          ensure!(input.is_file(), "'{}' is not a file", input.display());
          Input::File(input)
        };
        Command::Propose {
          document,
          input,
          message,
        }
      },
      RawCommand::Proposals { document } => Command::Proposals { document },
      RawCommand::Accept {
        document,
        proposal,
        rebase,
      } => {
        Command::Accept {
          document,
          proposal,
          rebase,
        }
      },
      RawCommand::Rebase { document, proposal } => Command::Rebase { document, proposal },
      RawCommand::Withdraw { proposal } => Command::Withdraw { proposal },
      RawCommand::Verify { document } => Command::Verify { document },
    };

    Ok(Self {
      verbosity: raw.verbosity,
      log_file: raw.log_file,
      config_file: raw.config_file,
      store: raw.store,
      owner: raw.owner.map(OwnerId),
      command,
    })
  }
}
