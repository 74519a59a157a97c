mod ollama;

pub use ollama::{OllamaClassifier, DEFAULT_MODEL, DEFAULT_OLLAMA_URL};

/// Number of body characters handed to the classifier.
pub const BODY_PREVIEW_CHARS: usize = 500;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageSummary {
    /// Raw `From` header, e.g. `Jane <jane@example.com>`
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierVerdict {
    pub is_spam: bool,
    pub rationale: String,
}

impl ClassifierVerdict {
    /// Verdict used whenever the classifier can't give a real answer.
    pub fn ham_fallback(rationale: impl Into<String>) -> Self {
        ClassifierVerdict {
            is_spam: false,
            rationale: rationale.into(),
        }
    }
}

/// Content based spam judgement, consulted only when the lists have no opinion.
///
/// Implementations must bound their own latency and fall back to
/// [`ClassifierVerdict::ham_fallback`] instead of failing.
#[allow(async_fn_in_trait)]
pub trait SpamClassifier {
    async fn classify(&self, sender: &str, subject: &str, body: &str) -> ClassifierVerdict;
}
