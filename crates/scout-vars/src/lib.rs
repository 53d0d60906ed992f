//! Canonical variable records and rendering
//!
//! Every remote store Scout talks to is normalized into the same in-memory
//! shape: a [`Variable`] holding a key, a value, a [`Source`] tag, and a
//! bag of provenance metadata. This crate owns that shape plus the two
//! operations that act on sets of it:
//!
//! - [`merge`]: fold per-backend maps into one, later maps winning on
//!   key collisions
//! - [`format`]: render a merged set as env-file lines or shell `export`
//!   statements

mod error;
pub mod format;
mod merge;
mod variable;

pub use error::FormatError;
pub use format::{env_namify, CaseMode};
pub use merge::merge;
pub use variable::{Source, Variable};
