use crate::runtime::heap::Handle;
use thiserror::Error;

pub type CodecResult<T> = Result<T, CodecError>;

/// Errors surfaced by encode and decode. Every failure aborts the whole operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("cannot encode value of type {type_name}")]
    UnsupportedType { type_name: String },

    #[error("handle {0} does not belong to the heap being encoded")]
    InvalidHandle(Handle),

    #[error("malformed wire text: {0}")]
    MalformedWireText(String),

    #[error("unknown wire kind: {0}")]
    UnknownWireKind(String),

    #[error("unknown native reference: {0}")]
    UnknownNativeReference(String),

    #[error("unresolved reference to id {0}")]
    UnresolvedReference(String),

    #[error("decoding source-defined functions is disabled (set trusted_source to enable)")]
    SourceEvaluationDisabled,

    #[error("invalid function source: {reason}")]
    InvalidFunctionSource { reason: String },
}

/// Coarse grouping of [`CodecError`] so callers can tell caller bugs from rejected input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The value handed to the encoder cannot be represented.
    InvalidValue,
    /// The wire text is not acceptable.
    InvalidInput,
    /// The wire text is well formed but its references do not resolve.
    BrokenGraph,
}

impl CodecError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CodecError::UnsupportedType { .. } | CodecError::InvalidHandle(_) => {
                ErrorCategory::InvalidValue
            }
            CodecError::MalformedWireText(_)
            | CodecError::UnknownWireKind(_)
            | CodecError::SourceEvaluationDisabled
            | CodecError::InvalidFunctionSource { .. } => ErrorCategory::InvalidInput,
            CodecError::UnknownNativeReference(_) | CodecError::UnresolvedReference(_) => {
                ErrorCategory::BrokenGraph
            }
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        CodecError::MalformedWireText(message.into())
    }
}

impl From<serde_json::Error> for CodecError {
    fn from(err: serde_json::Error) -> Self {
        CodecError::MalformedWireText(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_separate_caller_bugs_from_bad_input() {
        let unsupported = CodecError::UnsupportedType {
            type_name: "symbol".to_string(),
        };
        assert_eq!(unsupported.category(), ErrorCategory::InvalidValue);
        assert_eq!(unsupported.to_string(), "cannot encode value of type symbol");
        assert_eq!(
            CodecError::SourceEvaluationDisabled.category(),
            ErrorCategory::InvalidInput
        );
        assert_eq!(
            CodecError::UnresolvedReference("7".into()).category(),
            ErrorCategory::BrokenGraph
        );
    }
}
