use serde::{Deserialize, Serialize};

use crate::models::sentiment::{clamp_confidence, Sentiment, SentimentLabel};
use crate::services::sentiment_service::ClassifyError;

/// Request body for POST /chat/completions
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f64,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// Response from POST /chat/completions
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: ReplyMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplyMessage {
    pub content: Option<String>,
}

impl ChatResponse {
    pub fn into_content(self) -> Option<String> {
        self.choices.into_iter().next().and_then(|c| c.message.content)
    }
}

/// One element of the model's JSON array, before validation
#[derive(Debug, Clone, Deserialize)]
struct RawLabel {
    ts: Option<f64>,
    sentiment: Option<String>,
    confidence: Option<f64>,
    reason: Option<String>,
    #[serde(rename = "isPriceNews")]
    is_price_news: Option<bool>,
    timeframe: Option<String>,
}

impl RawLabel {
    fn into_label(self) -> SentimentLabel {
        SentimentLabel {
            ts: self.ts.unwrap_or(0.0) as i64,
            sentiment: self.sentiment.as_deref().map(Sentiment::parse).unwrap_or(Sentiment::Neutral),
            confidence: self.confidence.map(clamp_confidence).unwrap_or(0.5),
            reason: self.reason.unwrap_or_default(),
            is_price_news: self.is_price_news.unwrap_or(false),
            timeframe: self.timeframe.filter(|t| !t.is_empty()),
        }
    }
}

/// Parse the model reply into labels
///
/// Tolerates a markdown code fence or prose around the array.
pub fn parse_labels(reply: &str) -> Result<Vec<SentimentLabel>, ClassifyError> {
    let start = reply.find('[');
    let end = reply.rfind(']');
    let body = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => return Err(ClassifyError::Malformed("no JSON array in reply".to_string())),
    };

    let raw: Vec<RawLabel> =
        serde_json::from_str(body).map_err(|e| ClassifyError::Malformed(e.to_string()))?;
    Ok(raw.into_iter().map(RawLabel::into_label).collect())
}
