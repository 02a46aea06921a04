//! AI commentary on a predicted rating.
//!
//! Commentary is decoration around the rating itself, so [`fetch_commentary`]
//! never fails: any error turns into a fixed fallback text.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use crate::config::GeminiConfig;

pub const ANALYSIS_FALLBACK: &str = "Could not generate analysis at this time.";
pub const CONFIDENCE_FALLBACK: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentaryMode {
    Analysis,
    Confidence,
}

impl CommentaryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentaryMode::Analysis => "analysis",
            CommentaryMode::Confidence => "confidence",
        }
    }

    pub fn system_message(&self) -> &'static str {
        match self {
            CommentaryMode::Analysis => "You are a helpful movie critic.\n",
            CommentaryMode::Confidence => "You are a helpful data scientist.\n",
        }
    }

    pub fn fallback(&self) -> &'static str {
        match self {
            CommentaryMode::Analysis => ANALYSIS_FALLBACK,
            CommentaryMode::Confidence => CONFIDENCE_FALLBACK,
        }
    }

    pub fn prompt(&self, title: &str, rating: f64) -> String {
        match self {
            CommentaryMode::Analysis => format!(
                "You are a movie critic.\n\
                 Given a movie named \"{title}\" with a predicted IMDb rating of {rating:.1}, \
                 write a short \"rating analysis\" paragraph that:\n\
                 • Uses the movie name in the text.\n\
                 • Places that rating in context of its genre's typical range.\n\
                 • Mentions whether it will have weak/strong audience appeal.\n\
                 Make sure to keep it short and concise (1–2 sentences)."
            ),
            CommentaryMode::Confidence => format!(
                "You are a data scientist.\n\
                 Given a predicted IMDb rating of {rating:.1} for a movie called \"{title}\", \
                 compare that rating to typical IMDb ratings of movies in the same genre released \
                 around the same year (± 2 years). Return a confidence percentage (0–100%) \
                 indicating how likely that rating is accurate. \
                 Output ONLY the percentage as \"XX% confidence\"."
            ),
        }
    }
}

impl fmt::Display for CommentaryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommentaryMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "analysis" => Ok(CommentaryMode::Analysis),
            "confidence" => Ok(CommentaryMode::Confidence),
            _ => Err(()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CommentaryError {
    #[error("Google API key not configured. Please set GOOGLE_API_KEY.")]
    MissingCredential,
    #[error("Google API error ({status}): {body}")]
    Upstream { status: u16, body: String },
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Produces the raw candidate envelope for a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, mode: CommentaryMode) -> Result<Value, CommentaryError>;
}

/// `{ candidates: [ { content: { parts: [ { text } ] } } ] }`
#[derive(Debug, Default, Deserialize)]
pub struct CandidateEnvelope {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CandidatePart {
    #[serde(default)]
    pub text: Option<String>,
}

impl CandidateEnvelope {
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()?
            .text
            .as_deref()
    }
}

/// Pull the commentary text out of an envelope; `None` if there is none.
pub fn extract_text(envelope: Value, mode: CommentaryMode) -> Option<String> {
    let envelope: CandidateEnvelope = serde_json::from_value(envelope).ok()?;
    let text = envelope.first_text()?.trim();
    let text = match mode {
        CommentaryMode::Analysis => text,
        CommentaryMode::Confidence => text.lines().next().unwrap_or_default().trim(),
    };
    (!text.is_empty()).then(|| text.to_string())
}

pub async fn fetch_commentary<G>(
    generator: &G,
    mode: CommentaryMode,
    title: &str,
    rating: f64,
) -> String
where
    G: TextGenerator + ?Sized,
{
    let prompt = mode.prompt(title, rating);
    match generator.generate(&prompt, mode).await {
        Ok(envelope) => extract_text(envelope, mode).unwrap_or_else(|| {
            warn!(mode = %mode, "Commentary response had no text");
            mode.fallback().to_string()
        }),
        Err(e) => {
            warn!(mode = %mode, error = %e, "Commentary request failed");
            mode.fallback().to_string()
        }
    }
}

/// Talks to the Gemini `generateContent` API directly.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        if config.api_key.is_none() {
            warn!("No Google API key configured, AI commentary is disabled");
        }
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str, mode: CommentaryMode) -> Result<Value, CommentaryError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CommentaryError::MissingCredential)?;

        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{
                "parts": [{ "text": format!("{}{}", mode.system_message(), prompt) }]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_output_tokens,
                "candidateCount": 1
            }
        });

        debug!(mode = %mode, model = %self.model, "Calling Gemini");

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = status.as_u16(), body = %body, "Gemini returned error status");
            return Err(CommentaryError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// Goes through an `/api/ai-analysis` style proxy that takes
/// `{prompt, mode}` and answers with the raw envelope.
pub struct ProxyGenerator {
    http: reqwest::Client,
    endpoint: String,
}

impl ProxyGenerator {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl TextGenerator for ProxyGenerator {
    async fn generate(&self, prompt: &str, mode: CommentaryMode) -> Result<Value, CommentaryError> {
        let response = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "prompt": prompt, "mode": mode }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CommentaryError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGenerator(Result<Value, u16>);

    #[async_trait]
    impl TextGenerator for FixedGenerator {
        async fn generate(&self, _prompt: &str, _mode: CommentaryMode) -> Result<Value, CommentaryError> {
            match &self.0 {
                Ok(value) => Ok(value.clone()),
                Err(status) => Err(CommentaryError::Upstream {
                    status: *status,
                    body: String::new(),
                }),
            }
        }
    }

    fn envelope(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn test_prompts_mention_title_and_rating() {
        let analysis = CommentaryMode::Analysis.prompt("Heat", 8.25);
        assert!(analysis.contains("\"Heat\""));
        assert!(analysis.contains("rating of 8.2") || analysis.contains("rating of 8.3"));

        let confidence = CommentaryMode::Confidence.prompt("Heat", 7.0);
        assert!(confidence.contains("rating of 7.0 for a movie called \"Heat\""));
        assert!(confidence.contains("XX% confidence"));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("analysis".parse::<CommentaryMode>(), Ok(CommentaryMode::Analysis));
        assert_eq!("confidence".parse::<CommentaryMode>(), Ok(CommentaryMode::Confidence));
        assert!("summary".parse::<CommentaryMode>().is_err());
        assert_eq!(serde_json::to_value(CommentaryMode::Confidence).unwrap(), json!("confidence"));
    }

    #[test]
    fn test_extract_text() {
        assert_eq!(
            extract_text(envelope("  A strong crowd pleaser.  "), CommentaryMode::Analysis).as_deref(),
            Some("A strong crowd pleaser.")
        );
        assert_eq!(
            extract_text(envelope("75% confidence\nBecause reasons."), CommentaryMode::Confidence)
                .as_deref(),
            Some("75% confidence")
        );
        assert_eq!(extract_text(json!({ "candidates": [] }), CommentaryMode::Analysis), None);
        assert_eq!(extract_text(json!({ "error": "nope" }), CommentaryMode::Analysis), None);
        assert_eq!(extract_text(envelope("   "), CommentaryMode::Confidence), None);
    }

    #[tokio::test]
    async fn test_fetch_commentary_success() {
        let generator = FixedGenerator(Ok(envelope("Heat is a classic.")));
        let text = fetch_commentary(&generator, CommentaryMode::Analysis, "Heat", 8.3).await;
        assert_eq!(text, "Heat is a classic.");
    }

    #[tokio::test]
    async fn test_fetch_commentary_fallbacks() {
        let failing = FixedGenerator(Err(500));
        assert_eq!(
            fetch_commentary(&failing, CommentaryMode::Analysis, "Heat", 8.3).await,
            ANALYSIS_FALLBACK
        );
        assert_eq!(
            fetch_commentary(&failing, CommentaryMode::Confidence, "Heat", 8.3).await,
            CONFIDENCE_FALLBACK
        );

        let empty = FixedGenerator(Ok(json!({})));
        assert_eq!(
            fetch_commentary(&empty, CommentaryMode::Confidence, "Heat", 8.3).await,
            CONFIDENCE_FALLBACK
        );
    }

    #[tokio::test]
    async fn test_gemini_without_key() {
        let client = GeminiClient::new(&GeminiConfig::default()).unwrap();
        let result = client.generate("hi", CommentaryMode::Analysis).await;
        assert!(matches!(result, Err(CommentaryError::MissingCredential)));
    }
}
