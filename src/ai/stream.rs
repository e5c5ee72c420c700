//! Streaming support.
//!
//! Providers speak one of two SSE dialects:
//! - OpenAI-compatible: `data: {"choices":[{"delta":{"content":"..."}}]}`
//!   with `data: [DONE]` to signal stream end
//! - Anthropic messages: `data: {"type":"content_block_delta","delta":{"text":"..."}}`
//!   with a terminal `message_stop` event
//!
//! Both are decoded into plain text deltas here.

use super::error::{AiError, AiResult, ProviderFailure};
use super::provider::{ProgressSink, TextStream};
use futures::stream::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::Deserialize;

/// One SSE data frame, covering both dialects.
#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    choices: Vec<StreamChoice>,
    delta: Option<BlockDelta>,
    error: Option<StreamError>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: ChoiceDelta,
}

#[derive(Debug, Deserialize)]
struct ChoiceDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BlockDelta {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamError {
    #[serde(rename = "type")]
    kind: Option<String>,
    message: Option<String>,
}

/// Decode one chunk into text deltas, or an in-band error event.
fn process_chunk(chunk: StreamChunk) -> AiResult<Vec<String>> {
    if chunk.kind.as_deref() == Some("error") || chunk.error.is_some() {
        let err = chunk.error.unwrap_or(StreamError {
            kind: None,
            message: None,
        });
        return Err(AiError::provider_error(ProviderFailure {
            status: None,
            error_type: chunk.kind,
            nested_type: err.kind,
            message: err.message.unwrap_or_else(|| "provider stream error".to_string()),
        }));
    }

    let mut deltas = Vec::new();

    // Anthropic content_block_delta
    if let Some(delta) = chunk.delta {
        if let Some(text) = delta.text {
            if !text.is_empty() {
                deltas.push(text);
            }
        }
    }

    // OpenAI-compatible choices
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content {
            if !content.is_empty() {
                deltas.push(content);
            }
        }
    }

    Ok(deltas)
}

/// Turn an SSE connection into a stream of text deltas.
pub(crate) fn sse_text_stream(mut event_source: EventSource) -> TextStream {
    Box::pin(async_stream::stream! {
        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => continue,
                Ok(Event::Message(message)) => {
                    if message.data == "[DONE]" {
                        break;
                    }
                    if message.event == "message_stop" {
                        break;
                    }
                    match serde_json::from_str::<StreamChunk>(&message.data) {
                        Ok(chunk) => match process_chunk(chunk) {
                            Ok(deltas) => {
                                for delta in deltas {
                                    yield Ok(delta);
                                }
                            }
                            Err(e) => {
                                yield Err(e);
                                break;
                            }
                        },
                        Err(e) => {
                            yield Err(AiError::stream_error(format!(
                                "failed to parse stream chunk: {}", e
                            )));
                            break;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    let body = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "unable to read error body".to_string());
                    yield Err(AiError::provider_error(ProviderFailure::from_http(
                        status.as_u16(),
                        &body,
                    )));
                    break;
                }
                Err(e) => {
                    yield Err(AiError::stream_error(format!("stream error: {}", e)));
                    break;
                }
            }
        }

        event_source.close();
    })
}

/// Accumulate a stream chunk-by-chunk, reporting heuristic progress:
/// `(bytes received / max token budget) x 100`, clamped to 100.
pub async fn collect_stream(
    mut stream: TextStream,
    max_tokens: u32,
    progress: Option<&dyn ProgressSink>,
) -> AiResult<String> {
    let mut accumulated = String::new();
    while let Some(item) = stream.next().await {
        let delta = item?;
        accumulated.push_str(&delta);
        if let Some(sink) = progress {
            let pct = (accumulated.len() as f64 / max_tokens.max(1) as f64 * 100.0).min(100.0);
            sink.report(pct);
        }
    }
    Ok(accumulated)
}
