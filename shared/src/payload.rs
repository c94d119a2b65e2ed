//! Typed views over chat-completion payloads.
//!
//! Upstream chunks are loosely shaped: a frame may carry a text delta, the
//! trailing usage/timings statistics, both, or neither. [`StreamDelta`] names
//! those cases instead of leaving callers to dig through optional fields.

use std::fmt;

use serde_json::Value;

use crate::ChatMessage;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Usage {
    pub prompt_tokens: Option<u64>,
    pub completion_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl Usage {
    /// Fields of the wrong type read as absent; only a non-object is rejected.
    fn from_value(value: &Value) -> Option<Self> {
        let usage = value.as_object()?;
        let count = |key: &str| usage.get(key).and_then(token_count);
        Some(Self {
            prompt_tokens: count("prompt_tokens"),
            completion_tokens: count("completion_tokens"),
            total_tokens: count("total_tokens"),
        })
    }
}

/// llama.cpp-style generation timings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timings {
    pub prompt_ms: Option<f64>,
    pub predicted_ms: Option<f64>,
    pub predicted_per_second: Option<f64>,
}

impl Timings {
    fn from_value(value: &Value) -> Option<Self> {
        let timings = value.as_object()?;
        let number = |key: &str| timings.get(key).and_then(Value::as_f64);
        Some(Self {
            prompt_ms: number("prompt_ms"),
            predicted_ms: number("predicted_ms"),
            predicted_per_second: number("predicted_per_second"),
        })
    }
}

/// Accepts `42` as well as `42.0`.
fn token_count(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0)
            .map(|f| f.round() as u64)
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub usage: Option<Usage>,
    pub timings: Option<Timings>,
}

impl Metadata {
    fn from_parts(usage: Option<Usage>, timings: Option<Timings>) -> Option<Self> {
        if usage.is_none() && timings.is_none() {
            None
        } else {
            Some(Self { usage, timings })
        }
    }

    fn from_payload(payload: &Value) -> Option<Self> {
        Self::from_parts(
            payload.get("usage").and_then(Usage::from_value),
            payload.get("timings").and_then(Timings::from_value),
        )
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timings = self.timings.clone().unwrap_or_default();
        write!(
            f,
            "Prompt: {}ms | Generation: {}ms | Speed: {} tok/s",
            fixed(timings.prompt_ms, 0),
            fixed(timings.predicted_ms, 0),
            fixed(timings.predicted_per_second, 1),
        )?;
        if let Some(total) = self.usage.as_ref().and_then(|u| u.total_tokens) {
            write!(f, " | Tokens: {total}")?;
        }
        Ok(())
    }
}

/// Fixed-point rendering with ties rounded away from zero (`120.5` -> `121`).
fn fixed(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => {
            let scale = 10f64.powi(decimals as i32);
            let rounded = (v * scale).round() / scale;
            format!("{rounded:.decimals$}")
        }
        None => "0".to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextDelta {
    pub content: Option<String>,
    /// `reasoning_content` emitted by reasoning models ahead of the answer.
    pub thinking: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamDelta {
    Delta(TextDelta),
    Metadata(Metadata),
    DeltaWithMetadata(TextDelta, Metadata),
    Unrecognized,
}

fn first_choice<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
    payload.get("choices")?.get(0)?.get(key)
}

fn text_field(value: Option<&Value>, key: &str) -> Option<String> {
    value?
        .get(key)?
        .as_str()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl StreamDelta {
    /// Parse one `data: ` payload. Only invalid JSON is an error; callers
    /// drop such frames. Text and statistics are read independently, so an
    /// odd `usage` never costs the frame its text.
    pub fn parse(data: &str) -> Result<Self, serde_json::Error> {
        let payload: Value = serde_json::from_str(data)?;

        let delta = first_choice(&payload, "delta");
        let text = TextDelta {
            content: text_field(delta, "content"),
            thinking: text_field(delta, "reasoning_content"),
        };
        let has_text = text.content.is_some() || text.thinking.is_some();

        Ok(match (has_text, Metadata::from_payload(&payload)) {
            (true, Some(m)) => StreamDelta::DeltaWithMetadata(text, m),
            (true, None) => StreamDelta::Delta(text),
            (false, Some(m)) => StreamDelta::Metadata(m),
            (false, None) => StreamDelta::Unrecognized,
        })
    }

    pub fn text(&self) -> Option<&TextDelta> {
        match self {
            StreamDelta::Delta(d) | StreamDelta::DeltaWithMetadata(d, _) => Some(d),
            _ => None,
        }
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        match self {
            StreamDelta::Metadata(m) | StreamDelta::DeltaWithMetadata(_, m) => Some(m),
            _ => None,
        }
    }
}

/// Buffered (non-streaming) completion body.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    /// `choices[0].message`, if there was one.
    pub message: Option<TextDelta>,
    pub metadata: Option<Metadata>,
}

impl ChatCompletion {
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let payload: Value = serde_json::from_str(body)?;
        let message = first_choice(&payload, "message").map(|m| TextDelta {
            content: text_field(Some(m), "content"),
            thinking: text_field(Some(m), "reasoning_content"),
        });
        Ok(Self {
            message,
            metadata: Metadata::from_payload(&payload),
        })
    }

    /// `None` when the body has no choices at all.
    pub fn into_reply(self) -> Option<Reply> {
        let message = self.message?;
        Some(Reply {
            content: message.content.unwrap_or_default(),
            thinking: message.thinking,
            metadata: self.metadata,
        })
    }
}

/// A finished assistant answer, from either mode.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reply {
    pub content: String,
    pub thinking: Option<String>,
    pub metadata: Option<Metadata>,
}

impl Reply {
    pub fn into_message(self) -> ChatMessage {
        let mut message = ChatMessage::assistant(self.content);
        message.thinking = self.thinking;
        message.metadata = self.metadata.map(|m| m.to_string());
        message
    }
}
