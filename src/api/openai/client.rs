use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::{debug, info};

use super::models::{parse_labels, ChatMessage, ChatRequest, ChatResponse};
use crate::api::fetcher::ResilientFetcher;
use crate::models::{NewsItem, SentimentLabel};
use crate::services::sentiment_service::{Classifier, ClassifyError};

const SYSTEM_PROMPT: &str = "You are a crypto market analyst. Classify each news item for the given coin \
as bullish, bearish, or neutral for the next 24 hours. Focus on the coin-specific impact. \
If unclear or mixed, choose neutral. Return a confidence value between 0 and 1 and a concise \
reason (<= 200 chars) explaining your judgement for each item.";

const FORMAT_INSTRUCTIONS: &str = "Reply with only a JSON array, one object per news item: \
{\"ts\": number (copy the item's ts), \"title\": string, \"link\": string, \
\"sentiment\": \"bullish\" | \"bearish\" | \"neutral\", \"confidence\": number, \
\"reason\": string, \"isPriceNews\": boolean, \
\"timeframe\": \"short_term\" | \"medium_term\" | \"long_term\"}";

/// Sentiment classifier backed by an OpenAI-compatible chat completions API
pub struct LlmClassifier {
    fetcher: ResilientFetcher,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmClassifier {
    pub fn new(fetcher: ResilientFetcher, api_key: String, base_url: String, model: String) -> Self {
        Self {
            fetcher,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn create_headers(&self) -> Result<HeaderMap, ClassifyError> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", self.api_key))
            .map_err(|e| ClassifyError::Malformed(format!("Failed to create auth header: {}", e)))?;
        headers.insert(AUTHORIZATION, value);
        Ok(headers)
    }

    fn build_request(&self, coin: &str, items: &[NewsItem]) -> ChatRequest {
        let user = format!(
            "Coin: {}\nNews items (one per line):\n{}\n{}",
            coin,
            item_lines(items),
            FORMAT_INSTRUCTIONS
        );
        ChatRequest {
            model: self.model.clone(),
            temperature: 0.0,
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user)],
        }
    }
}

/// `- ts=<ms> | <title> (<source>) <link>`, one line per item
pub fn item_lines(items: &[NewsItem]) -> String {
    items
        .iter()
        .map(|it| format!("- ts={} | {} ({}) {}", it.pub_date.timestamp_millis(), it.title, it.source, it.link))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Classifier for LlmClassifier {
    async fn classify(&self, coin: &str, items: &[NewsItem]) -> Result<Vec<SentimentLabel>, ClassifyError> {
        if self.api_key.is_empty() {
            return Err(ClassifyError::MissingApiKey);
        }
        if items.is_empty() {
            return Ok(Vec::new());
        }

        info!("Classifying {} items for {} with {}", items.len(), coin, self.model);
        let url = format!("{}/chat/completions", self.base_url);
        let request = self.build_request(coin, items);
        let response: ChatResponse = self.fetcher.post_json(&url, &self.create_headers()?, &request).await?;

        let reply = response.into_content().ok_or(ClassifyError::EmptyReply)?;
        let labels = parse_labels(&reply)?;
        debug!("Classifier returned {} labels for {} items", labels.len(), items.len());
        Ok(labels)
    }
}
