//! # modelscope-image
//!
//! Async Rust client for the [ModelScope](https://modelscope.cn) image
//! generation API.
//!
//! A generation is a remote asynchronous task: the prompt is submitted,
//! the task endpoint is polled at a fixed interval until it reports
//! `SUCCEED` or `FAILED` (or the local wait budget runs out), and the first
//! output image is downloaded and saved. [`ModelScopeClient::generate`]
//! runs the whole workflow and never returns an error; every failure is a
//! [`GenerationResult::Failure`] with a message, a [`FailureKind`] and, where
//! known, the task id.
//!
//! ## Quick Start
//!
//! ```no_run
//! use modelscope_image::{GenerationRequest, GenerationResult, ModelScopeClient, ModelScopeConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> modelscope_image::Result<()> {
//! let config = ModelScopeConfig::from_env()?;
//! let client = ModelScopeClient::new(config)?;
//!
//! let request = GenerationRequest::new("a sunset over mountains")
//!     .model("Tongyi-MAI/Z-Image-Turbo")
//!     .output_dir("./outputs")
//!     .output_filename("sunset.jpg")
//!     .max_wait(Duration::from_secs(120));
//!
//! match client.generate(&request).await {
//!     GenerationResult::Success(s) => println!("saved {}", s.file_path.display()),
//!     GenerationResult::Failure(f) => eprintln!("{} ({:?})", f.message, f.task_id),
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod types;

pub use client::{list_models, ModelScopeClient};
pub use config::{ApiKeySource, ModelScopeConfig};
pub use error::{ModelScopeError, Result};
pub use types::{
    parse_size, FailureKind, GenerationFailure, GenerationRequest, GenerationResult,
    GenerationSuccess, ModelInfo, TaskHandle, TaskOutcome, TaskSnapshot, TaskStatus,
};
