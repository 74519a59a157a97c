use std::time::Duration;

use anyhow::Context as _;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::{ClassifierVerdict, SpamClassifier, BODY_PREVIEW_CHARS};
use crate::util::http_client;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434/api/generate";
pub const DEFAULT_MODEL: &str = "qwen2.5:14b-instruct";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: String,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Classifier backed by a local Ollama `/api/generate` endpoint.
pub struct OllamaClassifier {
    client: reqwest::Client,
    url: Url,
    model: String,
}

impl OllamaClassifier {
    pub fn new(url: &str, model: impl Into<String>) -> anyhow::Result<Self> {
        OllamaClassifier::with_timeout(url, model, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(url: &str, model: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        OllamaClassifier::with_client(http_client(timeout)?, url, model)
    }

    pub fn with_client(client: reqwest::Client, url: &str, model: impl Into<String>) -> anyhow::Result<Self> {
        Ok(OllamaClassifier {
            client,
            url: Url::parse(url).with_context(|| format!("invalid classifier URL '{}'", url))?,
            model: model.into(),
        })
    }

    /// Probes `/api/tags` on the same host.
    pub async fn is_available(&self) -> bool {
        let mut tags_url = self.url.clone();
        tags_url.set_path("/api/tags");

        match self.client.get(tags_url).timeout(AVAILABILITY_TIMEOUT).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::warn!(url = %self.url, "Classifier is unreachable: {}", e);
                false
            }
        }
    }

    async fn generate(&self, prompt: String) -> reqwest::Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: 0.1,
                num_predict: 50,
            },
        };

        let response: GenerateResponse = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.response)
    }
}

impl SpamClassifier for OllamaClassifier {
    async fn classify(&self, sender: &str, subject: &str, body: &str) -> ClassifierVerdict {
        match self.generate(build_prompt(sender, subject, body)).await {
            Ok(reply) => {
                let rationale = reply.trim().to_uppercase();
                ClassifierVerdict {
                    is_spam: reply_is_spam(&rationale),
                    rationale,
                }
            }
            Err(e) if e.is_timeout() => {
                tracing::warn!("Classifier request timed out, treating as ham");
                ClassifierVerdict::ham_fallback("LLM timeout (treated as ham)")
            }
            Err(e) if e.is_connect() => {
                tracing::error!(url = %self.url, "Classifier is unreachable, is 'ollama serve' running?");
                ClassifierVerdict::ham_fallback("Ollama offline (treated as ham)")
            }
            Err(e) => {
                tracing::error!("Classifier error: {}", e);
                ClassifierVerdict::ham_fallback(format!("Classifier error: {}", e))
            }
        }
    }
}

fn build_prompt(sender: &str, subject: &str, body: &str) -> String {
    let preview: String = body.chars().take(BODY_PREVIEW_CHARS).collect();
    format!(
        "Analyze this email for spam indicators.\n\n\
         From: {}\n\
         Subject: {}\n\
         Content: {}\n\n\
         Answer only with \"SPAM\" or \"HAM\".\n",
        sender, subject, preview
    )
}

/// Only the start of the reply counts, models tend to ramble afterwards.
fn reply_is_spam(reply: &str) -> bool {
    reply.chars().take(20).collect::<String>().to_uppercase().contains("SPAM")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{test_client, unreachable_url, TestServer};

    fn classifier_at(url: &str) -> OllamaClassifier {
        OllamaClassifier::with_client(test_client(DEFAULT_TIMEOUT), url, DEFAULT_MODEL)
            .expect("shouldn't have failed")
    }

    #[test]
    fn rejects_invalid_url() {
        assert!(OllamaClassifier::new("not a url", DEFAULT_MODEL).is_err());
        assert!(OllamaClassifier::new(DEFAULT_OLLAMA_URL, DEFAULT_MODEL).is_ok());
    }

    #[test]
    fn reply_interpretation() {
        assert!(reply_is_spam("SPAM"));
        assert!(reply_is_spam("spam - phishing link"));
        assert!(!reply_is_spam("HAM"));
        assert!(!reply_is_spam("HAM. This is clearly not SPAM at all"));
    }

    #[test]
    fn prompt_truncates_body() {
        let body = "x".repeat(2000);
        let prompt = build_prompt("a@b.com", "Hello", &body);
        assert!(prompt.contains("From: a@b.com"));
        assert!(prompt.contains(&"x".repeat(BODY_PREVIEW_CHARS)));
        assert!(!prompt.contains(&"x".repeat(BODY_PREVIEW_CHARS + 1)));
    }

    #[tokio::test]
    async fn spam_reply_from_service() {
        let server = TestServer::start(200, r#"{"response": " spam\n"}"#).await;
        let classifier = classifier_at(&server.url("/api/generate"));

        let verdict = classifier.classify("x@y.com", "WIN NOW", "click").await;
        assert_eq!(
            verdict,
            ClassifierVerdict {
                is_spam: true,
                rationale: "SPAM".into()
            }
        );
        assert!(classifier.is_available().await);
    }

    #[tokio::test]
    async fn offline_service_degrades_to_ham() {
        let url = unreachable_url("/api/generate").await;
        let classifier = classifier_at(&url);

        let verdict = classifier.classify("x@y.com", "Hi", "").await;
        assert!(!verdict.is_spam);
        assert_eq!(verdict.rationale, "Ollama offline (treated as ham)");
        assert!(!classifier.is_available().await);
    }

    #[tokio::test]
    async fn malformed_reply_degrades_to_ham() {
        let server = TestServer::start(200, "not json").await;
        let classifier = classifier_at(&server.url("/api/generate"));

        let verdict = classifier.classify("x@y.com", "Hi", "").await;
        assert!(!verdict.is_spam);
        assert!(verdict.rationale.starts_with("Classifier error"));
    }
}
