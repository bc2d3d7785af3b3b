//! Argument autocompletion: `completion/complete` (spec.md §4.11).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ArgumentInfo {
    pub name: String,
    pub value: String,
}

/// What is being completed: a prompt argument or a resource-template variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum CompletionReference {
    #[serde(rename = "ref/prompt")]
    Prompt { name: String },
    #[serde(rename = "ref/resource")]
    ResourceTemplate { uri: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CompletionContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<std::collections::HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompleteRequest {
    pub argument: ArgumentInfo,
    #[serde(rename = "ref")]
    pub reference: CompletionReference,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<CompletionContext>,
}

/// Up to 100 suggestions, capped server-side (spec.md §4.11 "Result cap").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionData {
    pub values: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<u32>,
    #[serde(rename = "hasMore", skip_serializing_if = "Option::is_none")]
    pub has_more: Option<bool>,
}

impl CompletionData {
    pub const MAX_VALUES: usize = 100;

    pub fn new(mut values: Vec<String>) -> Self {
        let total = values.len() as u32;
        let has_more = values.len() > Self::MAX_VALUES;
        values.truncate(Self::MAX_VALUES);
        Self {
            values,
            total: Some(total),
            has_more: Some(has_more),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompleteResult {
    pub completion: CompletionData,
}
