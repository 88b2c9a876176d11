//! 远程意图识别服务
//!
//! POST `{ "text": ... }`，响应 `{ "intents": [{ "label": ..., "score": ... }] }`。
//! 失败不重试，错误直接交给路由让本轮失败。

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::classifier::IntentClassifier;
use super::types::{Classification, IntentScore};
use crate::core::ClassifierError;

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    #[serde(default)]
    intents: Vec<IntentScore>,
}

pub struct HttpClassifier {
    client: Client,
    endpoint: String,
}

impl HttpClassifier {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn parse_response(body: &str) -> Result<Classification, ClassifierError> {
    let parsed: ClassifyResponse = serde_json::from_str(body)
        .map_err(|e| ClassifierError::InvalidResponse(e.to_string()))?;
    Classification::new(parsed.intents)
}

#[async_trait]
impl IntentClassifier for HttpClassifier {
    async fn classify(&self, text: &str) -> Result<Classification, ClassifierError> {
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { text })
            .send()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("Request failed: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ClassifierError::Unavailable(format!("HTTP {}", resp.status())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ClassifierError::Unavailable(format!("Read body: {}", e)))?;
        let result = parse_response(&body)?;
        tracing::debug!(top = %result.top().label, score = result.top().score, "Remote classification");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Intent;

    #[test]
    fn test_parse_response_sorts() {
        let result = parse_response(
            r#"{"intents":[{"label":"none","score":0.1},{"label":"GreetingIntent","score":0.91}]}"#,
        )
        .unwrap();
        assert_eq!(result.top_intent(), Intent::Greeting);
        assert_eq!(result.intents().len(), 2);
    }

    #[test]
    fn test_parse_response_errors() {
        assert!(matches!(parse_response(r#"{"intents":[]}"#), Err(ClassifierError::EmptyResult)));
        assert!(matches!(parse_response("<html>"), Err(ClassifierError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unavailable() {
        let classifier = HttpClassifier::new("http://127.0.0.1:9/classify", 2);
        let err = classifier.classify("hello").await.unwrap_err();
        assert!(matches!(err, ClassifierError::Unavailable(_)));
    }
}
