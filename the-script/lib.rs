//! Diff-script codec, apply engine and text diffing.
//!
//! A diff-script is a compact wire encoding of a text transformation:
//!
//! - `=N` keeps the next `N` characters of the source
//! - `-N` deletes the next `N` characters of the source
//! - `+N/text` inserts the `N` characters following the `/`
//!
//! Lengths count `char`s. [`script::decode`] turns a script into positioned
//! [`Change`]s, [`apply::apply`] materializes them and [`diff::script`]
//! produces a script from two full texts.

use smartstring::{
  LazyCompact,
  SmartString,
};

pub mod apply;
pub mod diff;
pub mod script;

pub use apply::apply;
pub use diff::{
  DiffHunk,
  DiffOptions,
};
pub use script::{
  Change,
  ScriptError,
  decode,
  encode,
};

pub type Tendril = SmartString<LazyCompact>;
