use doc_tree::Span;
use smol_str::SmolStr;
use thiserror::Error;

use crate::registry::TransformError;
use crate::scripts::ScriptError;
use crate::validate::PlacementViolation;

/// Errors that abort an expansion. No partially-expanded tree is returned
/// alongside any of these.
#[derive(Debug, Error)]
pub enum ExpandError {
    #[error("transform for component `{name}` failed: {source}")]
    Transform {
        name: SmolStr,
        #[source]
        source: TransformError,
    },
    #[error("transform for component `{name}` panicked")]
    TransformPanicked { name: SmolStr },
    #[error("placement validation failed: {0}")]
    Placement(PlacementViolation),
    #[error(transparent)]
    ScriptEmit(#[from] ScriptError),
}

/// Non-fatal conditions found during expansion. The build continues and the
/// offending markers are left in the output as written.
#[derive(Debug, Clone)]
pub struct ExpandWarning {
    pub kind: ExpandWarningKind,
    pub span: Span,
}

#[derive(Debug, Clone, Error)]
pub enum ExpandWarningKind {
    #[error("unknown component `{name}`")]
    UnknownComponent { name: SmolStr },
    #[error("malformed marker: {message}")]
    MalformedMarker { message: String },
    #[error("missing `::end:{name}` marker")]
    MissingEndMarker { name: SmolStr },
    #[error("unmatched `::end:{name}` marker")]
    StrayEndMarker { name: SmolStr },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_messages_name_the_component() {
        let kind = ExpandWarningKind::UnknownComponent { name: "quizz".into() };
        assert_eq!(kind.to_string(), "unknown component `quizz`");
        let kind = ExpandWarningKind::MissingEndMarker { name: "tabs".into() };
        assert_eq!(kind.to_string(), "missing `::end:tabs` marker");
    }
}
