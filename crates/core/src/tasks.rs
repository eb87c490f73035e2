//! Task envelopes placed on the broker for AI workers.
//!
//! The wire form is JSON:
//!
//! ```json
//! { "job_id": "...", "task_type": "generate_content", "topic": "Cells", "source_refs": ["f1.pdf"] }
//! { "job_id": "...", "task_type": "create_product", "content_ref": "c1", "type": "video", "output_config": { "voice": "alloy" } }
//! ```
//!
//! Queue selection is keyed off `task_type`.

use serde::{Deserialize, Serialize};

use crate::status::ProductType;
use crate::types::JobId;

/// Discriminator for task messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    GenerateContent,
    CreateProduct,
}

impl TaskType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GenerateContent => "generate_content",
            Self::CreateProduct => "create_product",
        }
    }
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Voice and rendering options for product creation.
///
/// `voice` and `language` are understood by every worker; anything else is
/// carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Immutable envelope handed to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    pub job_id: JobId,
    pub task_type: TaskType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub source_refs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_config: Option<OutputConfig>,
}

impl TaskMessage {
    /// Ask a worker to generate intermediate content from the topic and sources.
    pub fn generate_content(job_id: JobId, topic: &str, source_refs: &[String]) -> Self {
        Self {
            job_id,
            task_type: TaskType::GenerateContent,
            topic: Some(topic.to_string()),
            source_refs: source_refs.to_vec(),
            content_ref: None,
            product_type: None,
            output_config: None,
        }
    }

    /// Ask a worker to render the confirmed product from generated content.
    pub fn create_product(
        job_id: JobId,
        content_ref: &str,
        product_type: ProductType,
        output_config: OutputConfig,
    ) -> Self {
        Self {
            job_id,
            task_type: TaskType::CreateProduct,
            topic: None,
            source_refs: Vec::new(),
            content_ref: Some(content_ref.to_string()),
            product_type: Some(product_type),
            output_config: Some(output_config),
        }
    }
}
