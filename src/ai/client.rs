use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::ai::prompt;
use crate::api::latency::LatencyStats;
use crate::error::{AppError, Result};
use crate::types::AnalysisRequest;

// ---------------------------------------------------------------------------
// generateContent wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

#[derive(Debug, Serialize, PartialEq)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Prompt parts in send order: instructions, image, barcode, price/condition.
pub fn build_request(req: &AnalysisRequest) -> GenerateRequest {
    let mut parts = vec![Part::Text {
        text: prompt::system_prompt(req.condition),
    }];
    if let Some(image) = &req.image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        });
    }
    if let Some(barcode) = &req.barcode {
        parts.push(Part::Text {
            text: prompt::barcode_line(barcode),
        });
    }
    parts.push(Part::Text {
        text: prompt::price_line(req.store_price, req.condition),
    });
    GenerateRequest {
        contents: vec![Content { parts }],
    }
}

/// Client for the generative-AI endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_url: String,
    latency: Arc<LatencyStats>,
}

impl GeminiClient {
    pub fn new(api_url: &str, timeout: Duration, latency: Arc<LatencyStats>) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            latency,
        })
    }

    /// Send one analysis request and return the model's reply text.
    pub async fn analyze(&self, api_key: &str, req: &AnalysisRequest) -> Result<String> {
        let payload = build_request(req);
        info!(
            has_image = req.image.is_some(),
            has_barcode = req.barcode.is_some(),
            store_price = req.store_price,
            condition = %req.condition,
            "calling AI endpoint"
        );

        let started = Instant::now();
        let resp = self
            .client
            .post(&self.api_url)
            .query(&[("key", api_key)])
            .json(&payload)
            .send()
            .await?;
        self.latency.record(started.elapsed());

        let status = resp.status();
        info!(status = status.as_u16(), elapsed_ms = started.elapsed().as_millis() as u64, "AI endpoint responded");

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            error!(status = status.as_u16(), "AI endpoint error: {body}");
            return Err(AppError::Upstream {
                status: status.as_u16(),
                details: upstream_details(&body),
            });
        }

        let data: GenerateResponse = resp.json().await?;
        reply_text(data).ok_or(AppError::EmptyReply)
    }
}

/// `candidates[0].content.parts[0].text`, if non-empty.
fn reply_text(data: GenerateResponse) -> Option<String> {
    data.candidates?
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
        .filter(|t| !t.trim().is_empty())
}

/// Best human-readable message from an upstream error body.
fn upstream_details(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        let msg = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .or_else(|| v.get("message").and_then(|m| m.as_str()));
        if let Some(m) = msg {
            return m.to_string();
        }
    }
    if body.trim().is_empty() {
        "Unknown AI endpoint error".to_string()
    } else {
        body.to_string()
    }
}
