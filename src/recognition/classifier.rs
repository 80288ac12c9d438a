use super::proto::{final_refinement, streaming_response, AlternativeUpdate, StreamingResponse};
use serde::{Deserialize, Serialize};

/// Whether a result may still change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultKind {
    /// Interim hypothesis for the utterance in progress
    Partial,
    /// Settled text for a finished utterance
    Final,
}

/// A transcript extracted from one recognizer response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionResult {
    pub kind: ResultKind,

    /// Best alternative, trimmed; never empty
    pub text: String,
}

impl RecognitionResult {
    pub fn partial(text: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Partial,
            text: text.into(),
        }
    }

    pub fn final_text(text: impl Into<String>) -> Self {
        Self {
            kind: ResultKind::Final,
            text: text.into(),
        }
    }
}

/// Map a raw recognizer response to at most one result.
///
/// Partial updates become `Partial`; plain finals and normalized final
/// refinements both become `Final`. Responses without a usable best
/// alternative (no event, no alternatives, blank text) produce nothing.
pub fn classify(response: &StreamingResponse) -> Option<RecognitionResult> {
    let (kind, update) = match response.event.as_ref()? {
        streaming_response::Event::Partial(update) => (ResultKind::Partial, update),
        streaming_response::Event::Final(update) => (ResultKind::Final, update),
        streaming_response::Event::FinalRefinement(refinement) => match refinement.r#type.as_ref()? {
            final_refinement::Type::NormalizedText(update) => (ResultKind::Final, update),
        },
    };

    let text = best_text(update)?;
    Some(RecognitionResult {
        kind,
        text: text.to_string(),
    })
}

fn best_text(update: &AlternativeUpdate) -> Option<&str> {
    let text = update.alternatives.first()?.text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}
