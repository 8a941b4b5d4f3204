//! seqn-core: SeqN compiler and decompiler core.
//!
//! Converts between SeqN text and the typed sequence document of
//! `seqn-interchange`, and provides the time-tag and duration arithmetic
//! both directions rely on.
//!
//! # Public API
//!
//! - [`seqn_to_document()`] -- text to document (grammar parser + extractor)
//! - [`document_to_seqn()`] -- document to canonical text
//! - [`check_round_trip()`] -- verify text is already canonical
//! - [`grammar()`] -- the shared compiled grammar, for CST access
//! - [`SeqnError`] -- error type for every stage
//! - [`time`] -- time-tag validation, durations and day-of-year helpers

pub mod convert;
pub mod cst;
pub mod error;
pub mod extract;
pub mod grammar;
pub mod lexer;
pub mod serialize;
pub mod time;

// ── Convenience re-exports: key types ────────────────────────────────

pub use cst::SyntaxTree;
pub use error::SeqnError;
pub use grammar::{grammar, Grammar};
pub use seqn_interchange::Document;
pub use crate::time::{
    parse_duration_string, validate_time, DurationUnit, ParsedDurationString, TimeKind,
};

// ── Convenience re-exports: pipeline entry points ────────────────────

pub use convert::{check_round_trip, document_to_seqn, seqn_to_document};
pub use extract::extract;
pub use serialize::serialize;
