//! Task value and its opaque generation input.

use super::{TaskDomainError, TaskId, truncate_for_log};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of prompt characters included in log lines.
pub const PROMPT_PREVIEW_CHARS: usize = 80;

/// A reference image or clip supplied alongside the prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferencePayload {
    /// Where the provider can fetch the payload (URL or storage key).
    pub location: String,
    /// MIME type, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl ReferencePayload {
    /// Creates a reference payload without a media type.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            media_type: None,
        }
    }

    /// Sets the media type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }
}

/// Generation input carried by a task.
///
/// The queue never looks inside; providers and capability predicates do.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskInput {
    prompt: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    references: Vec<ReferencePayload>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    settings: Map<String, Value>,
}

impl TaskInput {
    /// Creates a text-only input.
    #[must_use]
    pub fn from_prompt(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            references: Vec::new(),
            settings: Map::new(),
        }
    }

    /// Adds a reference payload.
    #[must_use]
    pub fn with_reference(mut self, reference: ReferencePayload) -> Self {
        self.references.push(reference);
        self
    }

    /// Sets a provider-specific generation setting.
    #[must_use]
    pub fn with_setting(mut self, key: impl Into<String>, value: Value) -> Self {
        self.settings.insert(key.into(), value);
        self
    }

    /// Returns the prompt text.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Returns the reference payloads.
    #[must_use]
    pub fn references(&self) -> &[ReferencePayload] {
        &self.references
    }

    /// Returns the generation settings.
    #[must_use]
    pub const fn settings(&self) -> &Map<String, Value> {
        &self.settings
    }

    /// Returns `true` when at least one reference payload is attached.
    #[must_use]
    pub fn has_reference(&self) -> bool {
        !self.references.is_empty()
    }

    /// Returns the prompt truncated for diagnostics.
    #[must_use]
    pub fn preview(&self) -> String {
        truncate_for_log(&self.prompt, PROMPT_PREVIEW_CHARS)
    }

    fn validate(&self) -> Result<(), TaskDomainError> {
        if self.prompt.trim().is_empty() && self.references.is_empty() {
            return Err(TaskDomainError::EmptyInput);
        }
        if let Some(index) = self
            .references
            .iter()
            .position(|reference| reference.location.trim().is_empty())
        {
            return Err(TaskDomainError::EmptyReference { index });
        }
        Ok(())
    }
}

/// One unit of generation work.
///
/// Tasks are immutable once built. Retries and fallbacks reuse the same
/// identifier and input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    input: TaskInput,
}

impl Task {
    /// Creates a task with a fresh identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] when the input carries neither a prompt nor
    /// a reference payload, or a reference has an empty location.
    pub fn new(input: TaskInput) -> Result<Self, TaskDomainError> {
        Self::with_id(TaskId::new(), input)
    }

    /// Creates a task with a caller-assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError`] under the same conditions as [`Task::new`].
    pub fn with_id(id: TaskId, input: TaskInput) -> Result<Self, TaskDomainError> {
        input.validate()?;
        Ok(Self { id, input })
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the generation input.
    #[must_use]
    pub const fn input(&self) -> &TaskInput {
        &self.input
    }
}
