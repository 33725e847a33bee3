//! Response text extraction
//!
//! Completion services disagree on where the generated text lives. Each
//! extractor below deserializes one known layout; they are tried in order and
//! the first match wins.

use serde::Deserialize;
use serde_json::Value;

use crate::constants::generation::DIAGNOSTIC_SNIPPET_CHARS;
use crate::types::{RepoDocError, Result};

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<Message>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Message {
    content: String,
}

#[derive(Deserialize)]
struct FlatResponse {
    response: String,
}

#[derive(Deserialize)]
struct FlatContent {
    content: String,
}

#[derive(Deserialize)]
struct BlockContent {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct MessageEnvelope {
    message: Message,
}

type Extractor = fn(&Value) -> Option<String>;

/// Priority order: chat choice, legacy completion choice, flat `response`,
/// flat `content`, content blocks, bare `message`.
const EXTRACTORS: &[(&str, Extractor)] = &[
    ("choices[0].message.content", chat_message),
    ("choices[0].text", completion_text),
    ("response", flat_response),
    ("content", flat_content),
    ("content[].text", content_blocks),
    ("message.content", message_content),
];

fn chat_message(value: &Value) -> Option<String> {
    let response = ChatResponse::deserialize(value).ok()?;
    response.choices.into_iter().next()?.message.map(|m| m.content)
}

fn completion_text(value: &Value) -> Option<String> {
    let response = ChatResponse::deserialize(value).ok()?;
    response.choices.into_iter().next()?.text
}

fn flat_response(value: &Value) -> Option<String> {
    FlatResponse::deserialize(value).ok().map(|r| r.response)
}

fn flat_content(value: &Value) -> Option<String> {
    FlatContent::deserialize(value).ok().map(|r| r.content)
}

fn content_blocks(value: &Value) -> Option<String> {
    let blocks = BlockContent::deserialize(value).ok()?;
    let text: Vec<String> = blocks.content.into_iter().filter_map(|b| b.text).collect();
    if text.is_empty() {
        None
    } else {
        Some(text.join(""))
    }
}

fn message_content(value: &Value) -> Option<String> {
    MessageEnvelope::deserialize(value).ok().map(|e| e.message.content)
}

/// First `max_chars` characters of a body, for diagnostics
pub fn snippet(body: &str, max_chars: usize) -> String {
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Pull generated text out of a response body
pub fn extract_text(body: &str) -> Result<String> {
    let unexpected =
        || RepoDocError::UnexpectedResponseShape(snippet(body, DIAGNOSTIC_SNIPPET_CHARS));

    let value: Value = serde_json::from_str(body).map_err(|_| unexpected())?;
    EXTRACTORS
        .iter()
        .find_map(|(_, extract)| extract(&value))
        .ok_or_else(unexpected)
}

/// Name of the layout that matched, for debugging probe results
pub fn matching_layout(body: &str) -> Option<&'static str> {
    let value: Value = serde_json::from_str(body).ok()?;
    EXTRACTORS
        .iter()
        .find(|(_, extract)| extract(&value).is_some())
        .map(|(name, _)| *name)
}
