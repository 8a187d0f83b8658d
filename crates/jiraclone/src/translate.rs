//! Google Translate backend for summary translation

use jiraclone_core::translate::{TranslateError, Translator};
use serde_json::Value;

use crate::prelude::*;

pub const GOOGLE_TRANSLATE_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

/// Client for the public `translate_a/single` endpoint (`client=gtx`).
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(GOOGLE_TRANSLATE_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| eyre!("Failed to build translation client: {e}"))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

/// Join the translated sentence chunks found at `[0][i][0]`.
fn parse_translation(body: &Value) -> Result<String, TranslateError> {
    let sentences = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| TranslateError::Response(body.to_string()))?;

    Ok(sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .collect())
}

impl Translator for GoogleTranslator {
    async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> Result<String, TranslateError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", source),
                ("tl", target),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(|e| TranslateError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslateError::Request(format!("HTTP {status}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| TranslateError::Response(e.to_string()))?;

        let translated = parse_translation(&body)?;
        log::debug!("Translated '{text}' -> '{translated}'");
        Ok(translated)
    }
}
