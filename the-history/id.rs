use std::{
  fmt,
  num::NonZeroU64,
  str::FromStr,
};

use serde::{
  Deserialize,
  Serialize,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid {kind} id '{value}'")]
pub struct ParseIdError {
  kind:  &'static str,
  value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
  /// Generate a fresh random id.
  pub fn new() -> Self {
    Self(Uuid::new_v4())
  }

  pub const fn from_uuid(uuid: Uuid) -> Self {
    Self(uuid)
  }
}

impl Default for DocumentId {
  fn default() -> Self {
    Self::new()
  }
}

impl fmt::Display for DocumentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.hyphenated().fmt(f)
  }
}

impl FromStr for DocumentId {
  type Err = ParseIdError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Uuid::parse_str(s).map(Self).map_err(|_| {
      ParseIdError {
        kind:  "document",
        value: s.to_owned(),
      }
    })
  }
}

macro_rules! store_id {
  ($(#[$attr:meta])* $name:ident, $kind:literal) => {
    $(#[$attr])*
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct $name(NonZeroU64);

    impl $name {
      pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
      }

      pub const fn get(self) -> u64 {
        self.0.get()
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
      }
    }

    impl FromStr for $name {
      type Err = ParseIdError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<NonZeroU64>().map(Self).map_err(|_| {
          ParseIdError {
            kind:  $kind,
            value: s.to_owned(),
          }
        })
      }
    }
  };
}

store_id!(
  /// Store-assigned id of an accepted patch.
  PatchId,
  "patch"
);

store_id!(
  /// Store-assigned id of a pending proposal.
  ProposalId,
  "proposal"
);

/// Opaque id of the principal that created a record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub u64);

impl fmt::Display for OwnerId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.fmt(f)
  }
}
