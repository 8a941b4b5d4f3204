//! SeqN <-> sequence document, end to end.
//!
//! Thin orchestrators over the grammar parser, extractor and serializer.

use seqn_interchange::Document;

use crate::error::SeqnError;
use crate::extract;
use crate::grammar::grammar;
use crate::serialize;

/// Compile SeqN text into a sequence document.
pub fn seqn_to_document(src: &str) -> Result<Document, SeqnError> {
    // Grammar: text -> CST
    let tree = grammar().parse(src)?;

    // Extraction: CST -> typed document
    extract::extract(&tree)
}

/// Render a sequence document as canonical SeqN text.
pub fn document_to_seqn(doc: &Document) -> Result<String, SeqnError> {
    serialize::serialize(doc)
}

/// Check that `src` survives text -> document -> text byte for byte.
/// Returns the compiled document on success.
pub fn check_round_trip(src: &str) -> Result<Document, SeqnError> {
    let doc = seqn_to_document(src)?;
    let text = document_to_seqn(&doc)?;
    if text != src {
        let line = src
            .lines()
            .zip(text.lines())
            .position(|(a, b)| a != b)
            .unwrap_or_else(|| src.lines().count().min(text.lines().count()))
            + 1;
        return Err(SeqnError::serialization(format!(
            "canonical text differs from input at line {}",
            line
        )));
    }
    Ok(doc)
}
