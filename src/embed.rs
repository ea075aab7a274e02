//! Remote text embeddings via the Google Generative Language API
//!
//! One `embedContent` request per call. No batching, caching or retries.

use crate::error::{snippet, EmbeddingError};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Instant;
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com";
const API_KEY_HEADER: &str = "x-goog-api-key";
/// Task type used for single-text (query) embeddings
const TASK_TYPE: &str = "RETRIEVAL_QUERY";

/// Anything that turns text into a vector
pub trait TextEmbedder {
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'static str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

/// Normalize a model id to the `models/<name>` resource form
pub fn model_resource(model: &str) -> String {
    let model = model.trim();
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

fn decode_embedding(body: &str) -> Result<Vec<f32>, EmbeddingError> {
    let parsed: EmbedContentResponse =
        serde_json::from_str(body).map_err(|e| EmbeddingError::Decode(e.to_string()))?;
    if parsed.embedding.values.is_empty() {
        return Err(EmbeddingError::EmptyVector);
    }
    Ok(parsed.embedding.values)
}

pub struct GeminiEmbedder {
    client: reqwest::Client,
    model: String,
    url: String,
}

impl GeminiEmbedder {
    /// Build a client for `model` authenticated with `api_key`
    pub fn new(api_key: &str, model: &str) -> Result<Self, EmbeddingError> {
        let mut headers = HeaderMap::new();
        let mut key =
            HeaderValue::from_str(api_key.trim()).map_err(|_| EmbeddingError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        let model = model_resource(model);
        let url = format!("{}/v1beta/{}:embedContent", API_BASE, model);

        Ok(Self { client, model, url })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.url
    }
}

impl TextEmbedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let started = Instant::now();
        let request = EmbedContentRequest {
            model: &self.model,
            content: Content {
                parts: [Part { text }],
            },
            task_type: TASK_TYPE,
        };

        let resp = self.client.post(&self.url).json(&request).send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        if !status.is_success() {
            return Err(EmbeddingError::HttpStatus {
                status,
                snippet: snippet(&body),
            });
        }

        let values = decode_embedding(&body)?;
        debug!(
            dims = values.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding generated"
        );
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_resource_prefixes_bare_names() {
        assert_eq!(model_resource("text-embedding-004"), "models/text-embedding-004");
        assert_eq!(model_resource("models/text-embedding-004"), "models/text-embedding-004");
        assert_eq!(model_resource("tunedModels/mine"), "tunedModels/mine");
    }

    #[test]
    fn test_endpoint_uses_model_resource() {
        let embedder = GeminiEmbedder::new("key", "text-embedding-004").unwrap();
        assert_eq!(embedder.model(), "models/text-embedding-004");
        assert_eq!(
            embedder.endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let request = EmbedContentRequest {
            model: "models/text-embedding-004",
            content: Content {
                parts: [Part { text: "A heist." }],
            },
            task_type: TASK_TYPE,
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "models/text-embedding-004",
                "content": {"parts": [{"text": "A heist."}]},
                "taskType": "RETRIEVAL_QUERY"
            })
        );
    }

    #[test]
    fn test_decode_embedding() {
        let values = decode_embedding(r#"{"embedding":{"values":[0.1,-0.2,0.3]}}"#).unwrap();
        assert_eq!(values, vec![0.1, -0.2, 0.3]);
    }

    #[test]
    fn test_decode_empty_vector_is_error() {
        let err = decode_embedding(r#"{"embedding":{}}"#).unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyVector));
    }

    #[test]
    fn test_decode_garbage_is_error() {
        let err = decode_embedding("<html>oops</html>").unwrap_err();
        assert!(matches!(err, EmbeddingError::Decode(_)));
    }

    #[test]
    fn test_invalid_api_key_rejected() {
        assert!(matches!(
            GeminiEmbedder::new("bad\nkey", "text-embedding-004"),
            Err(EmbeddingError::InvalidApiKey)
        ));
    }

    #[tokio::test]
    async fn test_blank_text_fails_before_request() {
        let embedder = GeminiEmbedder::new("key", "text-embedding-004").unwrap();
        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyInput));
    }
}
