use image::{DynamicImage, ImageFormat};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::ModelScopeConfig;
use crate::error::{ModelScopeError, Result};
use crate::types::*;

const MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "Qwen/Qwen-Image-2512",
        description: "Qwen image generation model",
    },
    ModelInfo {
        id: "Tongyi-MAI/Z-Image-Turbo",
        description: "Tongyi Z-Image Turbo model",
    },
];

/// The static catalog of supported model identifiers.
pub fn list_models() -> &'static [ModelInfo] {
    MODELS
}

fn normalize(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    task_status: String,
    #[serde(default)]
    output_images: Option<Vec<String>>,
    #[serde(default)]
    errors: Option<Value>,
}

fn parse_task_id(json: &Value) -> Result<TaskHandle> {
    match json.get("task_id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(TaskHandle::new(id.as_str())),
        Some(Value::Number(id)) => Ok(TaskHandle::new(id.to_string())),
        _ => Err(ModelScopeError::InvalidResponse(
            "Response missing task_id".into(),
        )),
    }
}

fn parse_task_snapshot(body: &str) -> Result<TaskSnapshot> {
    let resp: TaskResponse = serde_json::from_str(body)?;
    let errors = match resp.errors {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    };
    Ok(TaskSnapshot {
        status: TaskStatus::parse(&resp.task_status),
        output_images: resp.output_images.unwrap_or_default(),
        errors,
    })
}

/// Async client for the ModelScope image generation API.
///
/// Submits a prompt as an asynchronous task, polls the task endpoint at a
/// fixed interval, and saves the first output image to disk. The client
/// holds no per-task state; concurrent calls create independent tasks.
///
/// # Example
/// ```no_run
/// use modelscope_image::{GenerationRequest, ModelScopeClient, ModelScopeConfig};
///
/// # async fn example() -> modelscope_image::Result<()> {
/// let client = ModelScopeClient::new(ModelScopeConfig::from_env()?)?;
/// let result = client
///     .generate(&GenerationRequest::new("a red fox in the snow"))
///     .await;
/// println!("{}", result.message());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ModelScopeClient {
    http: Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    submit_timeout: Duration,
    poll_request_timeout: Duration,
    download_timeout: Duration,
}

impl ModelScopeClient {
    /// Create a client from resolved configuration.
    ///
    /// Fails before any network activity if the token is empty.
    pub fn new(config: ModelScopeConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ModelScopeError::EmptyApiKey);
        }
        Ok(Self {
            http: Client::new(),
            base_url: normalize(config.base_url),
            api_key: config.api_key,
            poll_interval: config.poll_interval,
            submit_timeout: config.submit_timeout,
            poll_request_timeout: config.poll_request_timeout,
            download_timeout: config.download_timeout,
        })
    }

    /// Resolve the token from the standard environment variables and build a client.
    pub fn from_env() -> Result<Self> {
        Self::new(ModelScopeConfig::from_env()?)
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the normalized API root.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the resolved bearer token.
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Returns the delay between status checks.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The static model catalog. Needs no network access.
    pub fn list_models(&self) -> &'static [ModelInfo] {
        list_models()
    }

    // ── Workflow ────────────────────────────────────────────────────

    /// Submit, wait, and download. Every failure becomes a
    /// [`GenerationResult::Failure`].
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let handle = match self.submit(request).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!(error = %e, "image generation request rejected");
                return e.into();
            }
        };
        self.poll(&handle, request).await
    }

    /// Wait for a submitted task and save its image.
    ///
    /// Uses `request.max_wait` as the local wait budget and the request's
    /// output location for the download.
    pub async fn poll(&self, handle: &TaskHandle, request: &GenerationRequest) -> GenerationResult {
        match self.finish(handle, request).await {
            Ok(result) => result,
            Err(e) => {
                warn!(task_id = %handle, error = %e, "image generation aborted");
                GenerationResult::Failure(GenerationFailure::from(e).with_task(handle))
            }
        }
    }

    async fn finish(
        &self,
        handle: &TaskHandle,
        request: &GenerationRequest,
    ) -> Result<GenerationResult> {
        let outcome = self.wait_for_completion(handle, request.max_wait).await?;
        let result = match outcome {
            TaskOutcome::Succeeded { image_url } => {
                let file_path = self
                    .fetch_and_save(&image_url, &request.output_dir, &request.output_filename)
                    .await?;
                info!(task_id = %handle, path = %file_path.display(), "image saved");
                GenerationResult::Success(GenerationSuccess {
                    message: "Image generated successfully".into(),
                    prompt: request.prompt.clone(),
                    model: request.model.clone(),
                    size: request.size.clone(),
                    file_path,
                    image_url,
                })
            }
            TaskOutcome::NoImage => {
                warn!(task_id = %handle, "task succeeded without output images");
                GenerationResult::Failure(
                    GenerationFailure::new(
                        FailureKind::NoImage,
                        "Task succeeded but returned no image",
                    )
                    .with_task(handle),
                )
            }
            TaskOutcome::Failed { details } => {
                warn!(task_id = %handle, details = ?details, "task failed");
                GenerationResult::Failure(
                    GenerationFailure::new(FailureKind::TaskFailed, "Image generation failed")
                        .with_task(handle)
                        .with_details(details),
                )
            }
            TaskOutcome::TimedOut { waited } => {
                warn!(task_id = %handle, waited_ms = waited.as_millis() as u64, "task timed out");
                GenerationResult::Failure(
                    GenerationFailure::new(
                        FailureKind::TimedOut,
                        format!(
                            "Task timed out (waited more than {}s)",
                            request.max_wait.as_secs_f64()
                        ),
                    )
                    .with_task(handle),
                )
            }
        };
        Ok(result)
    }

    // ── Submit ──────────────────────────────────────────────────────

    /// Create a remote generation task. Returns its handle.
    pub async fn submit(&self, request: &GenerationRequest) -> Result<TaskHandle> {
        if request.prompt.trim().is_empty() {
            return Err(ModelScopeError::EmptyPrompt);
        }

        let url = format!("{}/v1/images/generations", self.base_url);
        let body = serde_json::json!({
            "model": request.model,
            "prompt": request.prompt,
        });

        let resp = self
            .http
            .post(&url)
            .timeout(self.submit_timeout)
            .bearer_auth(&self.api_key)
            .header("X-ModelScope-Async-Mode", "true")
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelScopeError::Network {
                context: format!("Cannot reach ModelScope at {}", self.base_url),
                source: e,
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ModelScopeError::Network {
            context: "Failed to read ModelScope submit response".into(),
            source: e,
        })?;
        if !status.is_success() {
            return Err(ModelScopeError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let json: Value = serde_json::from_str(&text)?;
        let handle = parse_task_id(&json)?;
        info!(task_id = %handle, model = %request.model, "image generation task submitted");
        Ok(handle)
    }

    // ── Status ──────────────────────────────────────────────────────

    /// Query the task endpoint once.
    pub async fn task_status(&self, handle: &TaskHandle) -> Result<TaskSnapshot> {
        let url = format!("{}/v1/tasks/{}", self.base_url, handle.id());
        let resp = self
            .http
            .get(&url)
            .timeout(self.poll_request_timeout)
            .bearer_auth(&self.api_key)
            .header("X-ModelScope-Task-Type", "image_generation")
            .send()
            .await
            .map_err(|e| ModelScopeError::Network {
                context: format!("Failed to fetch status of task {}", handle),
                source: e,
            })?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| ModelScopeError::Network {
            context: "Failed to read ModelScope task response".into(),
            source: e,
        })?;
        if !status.is_success() {
            return Err(ModelScopeError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_task_snapshot(&text)
    }

    /// Poll the task endpoint until the task finishes or `max_wait` elapses.
    ///
    /// A failed status request ends the wait with that error; it is not
    /// retried. Timing out leaves the remote task running.
    pub async fn wait_for_completion(
        &self,
        handle: &TaskHandle,
        max_wait: Duration,
    ) -> Result<TaskOutcome> {
        let start = Instant::now();
        loop {
            let waited = start.elapsed();
            if waited >= max_wait {
                return Ok(TaskOutcome::TimedOut { waited });
            }

            let snapshot = self.task_status(handle).await?;
            match snapshot.status {
                TaskStatus::Succeeded => {
                    return Ok(match snapshot.output_images.into_iter().next() {
                        Some(image_url) => TaskOutcome::Succeeded { image_url },
                        None => TaskOutcome::NoImage,
                    });
                }
                TaskStatus::Failed => {
                    return Ok(TaskOutcome::Failed {
                        details: snapshot.errors,
                    });
                }
                TaskStatus::Pending(raw) => {
                    debug!(task_id = %handle, status = %raw, "task still running");
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    // ── Image download ──────────────────────────────────────────────

    /// Download an image and write it to `output_dir/output_filename`.
    ///
    /// The bytes are decoded and re-encoded in the format named by the
    /// filename extension, falling back to the source format. Creates
    /// `output_dir` if needed and overwrites an existing file.
    pub async fn fetch_and_save(
        &self,
        image_url: &str,
        output_dir: &Path,
        output_filename: &str,
    ) -> Result<PathBuf> {
        let resp = self
            .http
            .get(image_url)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(|e| ModelScopeError::Network {
                context: format!("Failed to download image {}", image_url),
                source: e,
            })?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.map_err(|e| ModelScopeError::Network {
                context: format!("Failed to read error response for image {}", image_url),
                source: e,
            })?;
            return Err(ModelScopeError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        let bytes = resp.bytes().await.map_err(|e| ModelScopeError::Network {
            context: "Failed to read image bytes".into(),
            source: e,
        })?;

        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| ModelScopeError::Io {
                path: output_dir.to_path_buf(),
                source: e,
            })?;

        let path = output_dir.join(output_filename);
        let encoded = {
            let path = path.clone();
            tokio::task::spawn_blocking(move || encode_image(&bytes, &path)).await??
        };
        tokio::fs::write(&path, &encoded)
            .await
            .map_err(|e| ModelScopeError::Io {
                path: path.clone(),
                source: e,
            })?;
        debug!(path = %path.display(), bytes = encoded.len(), "image written");
        Ok(path)
    }
}

/// Decode `bytes` and re-encode them in the format named by `path`.
fn encode_image(bytes: &[u8], path: &Path) -> Result<Vec<u8>> {
    let format = match ImageFormat::from_path(path) {
        Ok(format) => format,
        Err(_) => image::guess_format(bytes)?,
    };
    let img = image::load_from_memory(bytes)?;
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()),
        _ => img,
    };
    let mut out = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut out), format)?;
    Ok(out)
}
