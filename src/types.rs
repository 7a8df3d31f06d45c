use serde::{Serialize, Serializer};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::ModelScopeError;

pub const DEFAULT_MODEL: &str = "Qwen/Qwen-Image-2512";
pub const DEFAULT_SIZE: &str = "1024x1024";
pub const DEFAULT_OUTPUT_FILENAME: &str = "result_image.jpg";
pub const DEFAULT_OUTPUT_DIR: &str = "./outputs";
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

/// Parse a `"WxH"` size string into positive pixel dimensions.
pub fn parse_size(size: &str) -> Option<(u32, u32)> {
    let (w, h) = size.trim().split_once(['x', 'X'])?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
}

/// One image generation job.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: String,
    /// Requested size as `"WxH"`. Carried as metadata, never sent upstream.
    pub size: String,
    pub output_filename: String,
    pub output_dir: PathBuf,
    pub max_wait: Duration,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            model: DEFAULT_MODEL.to_string(),
            size: DEFAULT_SIZE.to_string(),
            output_filename: DEFAULT_OUTPUT_FILENAME.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn output_filename(mut self, filename: impl Into<String>) -> Self {
        self.output_filename = filename.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Pixel dimensions of [`size`](Self::size), if it is well formed.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        parse_size(&self.size)
    }
}

/// Identifier of a submitted remote task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote task state as reported by `task_status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Any value other than the two terminal ones. The raw string is kept.
    Pending(String),
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "SUCCEED" => TaskStatus::Succeeded,
            "FAILED" => TaskStatus::Failed,
            other => TaskStatus::Pending(other.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending(_))
    }
}

/// A single status poll.
#[derive(Debug, Clone)]
pub struct TaskSnapshot {
    pub status: TaskStatus,
    pub output_images: Vec<String>,
    /// Upstream error payload, when the API includes one.
    pub errors: Option<String>,
}

/// Outcome of waiting for a task to finish.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome {
    /// Task succeeded; first output image.
    Succeeded { image_url: String },
    /// Task reported success with an empty `output_images` list.
    NoImage,
    /// Task reached `FAILED`.
    Failed { details: Option<String> },
    /// The local wait budget ran out. The remote task is left running.
    TimedOut { waited: Duration },
}

/// Entry in the static model catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    pub id: &'static str,
    pub description: &'static str,
}

/// Payload of a successful generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationSuccess {
    pub message: String,
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub file_path: PathBuf,
    pub image_url: String,
}

/// Category of a failed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Configuration,
    Validation,
    Transport,
    Http,
    InvalidResponse,
    TaskFailed,
    TimedOut,
    NoImage,
    Image,
    Io,
}

/// Payload of a failed generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    pub message: String,
    pub kind: FailureKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// HTTP status for upstream errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl GenerationFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            task_id: None,
            status: None,
            details: None,
        }
    }

    pub fn with_task(mut self, task: &TaskHandle) -> Self {
        self.task_id = Some(task.id().to_string());
        self
    }

    pub fn with_details(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }
}

impl From<ModelScopeError> for GenerationFailure {
    fn from(err: ModelScopeError) -> Self {
        match err {
            ModelScopeError::MissingApiKey { .. } | ModelScopeError::EmptyApiKey => {
                GenerationFailure::new(FailureKind::Configuration, err.to_string())
            }
            ModelScopeError::EmptyPrompt => {
                GenerationFailure::new(FailureKind::Validation, err.to_string())
            }
            ModelScopeError::Http { status, body } => {
                let mut failure = GenerationFailure::new(
                    FailureKind::Http,
                    format!("API request failed: {}", status),
                );
                failure.status = Some(status);
                failure.details = Some(body);
                failure
            }
            ModelScopeError::Network { ref context, .. } => GenerationFailure::new(
                FailureKind::Transport,
                format!("Image generation failed: {}", context),
            ),
            ModelScopeError::InvalidResponse(_) | ModelScopeError::Json(_) => {
                GenerationFailure::new(
                    FailureKind::InvalidResponse,
                    format!("Image generation failed: {}", err),
                )
            }
            ModelScopeError::Image(_) => GenerationFailure::new(
                FailureKind::Image,
                format!("Image generation failed: {}", err),
            ),
            ModelScopeError::Io { .. } | ModelScopeError::Join(_) => GenerationFailure::new(
                FailureKind::Io,
                format!("Image generation failed: {}", err),
            ),
        }
    }
}

/// Result of a full generate call. Never an error at the public boundary.
#[derive(Debug, Clone)]
pub enum GenerationResult {
    Success(GenerationSuccess),
    Failure(GenerationFailure),
}

impl GenerationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success(_))
    }

    pub fn message(&self) -> &str {
        match self {
            GenerationResult::Success(s) => &s.message,
            GenerationResult::Failure(f) => &f.message,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            GenerationResult::Success(_) => None,
            GenerationResult::Failure(f) => f.task_id.as_deref(),
        }
    }
}

impl From<ModelScopeError> for GenerationResult {
    fn from(err: ModelScopeError) -> Self {
        GenerationResult::Failure(err.into())
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    success: bool,
    #[serde(flatten)]
    body: &'a T,
}

impl Serialize for GenerationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            GenerationResult::Success(body) => Envelope {
                success: true,
                body,
            }
            .serialize(serializer),
            GenerationResult::Failure(body) => Envelope {
                success: false,
                body,
            }
            .serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_parsing() {
        assert_eq!(parse_size("1024x1024"), Some((1024, 1024)));
        assert_eq!(parse_size("768x1344"), Some((768, 1344)));
        assert_eq!(parse_size(" 512X256 "), Some((512, 256)));
    }

    #[test]
    fn test_malformed_sizes() {
        for size in ["", "1024", "x1024", "0x512", "-1x5", "big", "10x10x10"] {
            assert_eq!(parse_size(size), None, "{size}");
        }
    }

    #[test]
    fn test_malformed_size_is_kept_on_request() {
        let req = GenerationRequest::new("cat").size("huge");
        assert_eq!(req.size, "huge");
        assert_eq!(req.dimensions(), None);
    }

    #[test]
    fn test_request_defaults() {
        let req = GenerationRequest::new("a lighthouse at dusk");
        assert_eq!(req.model, DEFAULT_MODEL);
        assert_eq!(req.size, "1024x1024");
        assert_eq!(req.dimensions(), Some((1024, 1024)));
        assert_eq!(req.max_wait, Duration::from_secs(300));
        assert_eq!(req.output_dir, PathBuf::from("./outputs"));
        assert_eq!(req.output_filename, "result_image.jpg");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!(TaskStatus::parse("SUCCEED"), TaskStatus::Succeeded);
        assert_eq!(TaskStatus::parse("FAILED"), TaskStatus::Failed);
        assert_eq!(
            TaskStatus::parse("RUNNING"),
            TaskStatus::Pending("RUNNING".into())
        );
        assert!(!TaskStatus::parse("CANCELLED").is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn test_success_json_shape() {
        let result = GenerationResult::Success(GenerationSuccess {
            message: "Image generated successfully".into(),
            prompt: "cat".into(),
            model: "m".into(),
            size: "1x1".into(),
            file_path: PathBuf::from("out/cat.png"),
            image_url: "http://img/cat.png".into(),
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["file_path"], "out/cat.png");
        assert_eq!(json["image_url"], "http://img/cat.png");
    }

    #[test]
    fn test_failure_json_omits_empty_fields() {
        let result = GenerationResult::Failure(
            GenerationFailure::new(FailureKind::TaskFailed, "Image generation failed")
                .with_task(&TaskHandle::new("t-1")),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["kind"], "task_failed");
        assert_eq!(json["task_id"], "t-1");
        assert!(json.get("details").is_none());
        assert!(json.get("status").is_none());
    }

    #[test]
    fn test_http_error_conversion() {
        let failure: GenerationFailure = ModelScopeError::Http {
            status: 401,
            body: "unauthorized".into(),
        }
        .into();
        assert_eq!(failure.kind, FailureKind::Http);
        assert_eq!(failure.status, Some(401));
        assert_eq!(failure.details.as_deref(), Some("unauthorized"));
        assert!(failure.message.contains("401"));
    }

    #[test]
    fn test_empty_prompt_mentions_prompt() {
        let result: GenerationResult = ModelScopeError::EmptyPrompt.into();
        assert!(!result.is_success());
        assert!(result.message().to_lowercase().contains("prompt"));
    }
}
