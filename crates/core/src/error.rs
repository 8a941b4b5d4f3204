/// A SeqN compile, decompile or time-tag error.
///
/// Every failure is local and synchronous: when a conversion returns an
/// error it has produced no partial document or text.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeqnError {
    /// Text matched none of the recognized time or duration forms.
    #[error("invalid time '{input}': {message}")]
    Format { input: String, message: String },

    /// SeqN text violates the grammar.
    #[error("parse error at {line}:{column}: {message}")]
    Parse {
        line: u32,
        column: u32,
        message: String,
    },

    /// The syntax tree does not map to a valid document.
    #[error("line {line}: {message}")]
    Extraction { line: u32, message: String },

    /// The document violates an invariant needed to render it as SeqN.
    #[error("cannot serialize: {message}")]
    Serialization { message: String },
}

impl SeqnError {
    pub fn format(input: &str, message: impl Into<String>) -> Self {
        SeqnError::Format {
            input: input.to_owned(),
            message: message.into(),
        }
    }

    pub fn parse(line: u32, column: u32, message: impl Into<String>) -> Self {
        SeqnError::Parse {
            line,
            column,
            message: message.into(),
        }
    }

    pub fn extraction(line: u32, message: impl Into<String>) -> Self {
        SeqnError::Extraction {
            line,
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        SeqnError::Serialization {
            message: message.into(),
        }
    }

    /// Short name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            SeqnError::Format { .. } => "format",
            SeqnError::Parse { .. } => "parse",
            SeqnError::Extraction { .. } => "extraction",
            SeqnError::Serialization { .. } => "serialization",
        }
    }

    /// Serialize for machine-readable CLI output.
    /// Position fields are always present (null when the error has none).
    pub fn to_json_value(&self) -> serde_json::Value {
        let (line, column) = match self {
            SeqnError::Parse { line, column, .. } => (Some(*line), Some(*column)),
            SeqnError::Extraction { line, .. } => (Some(*line), None),
            _ => (None, None),
        };
        serde_json::json!({
            "column":  column,
            "kind":    self.kind(),
            "line":    line,
            "message": self.to_string(),
        })
    }
}
