//! seqn-interchange: the typed sequence document and its JSON form.
//!
//! Provides typed structs for every part of a sequence document (steps,
//! requests, variable declarations, metadata, models) and a single
//! `from_interchange()` entry point that reads a `serde_json::Value`
//! into a [`Document`].
//!
//! The SeqN compiler in `seqn-core` produces these types from text and
//! renders them back; anything exchanging documents with the compiler
//! speaks the JSON shape defined here.

pub mod deserialize;
pub mod types;

pub use deserialize::{from_interchange, to_interchange, InterchangeError};
pub use types::*;
