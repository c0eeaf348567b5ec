//! difftide — streamed conventional-commit message generation.
//!
//! Resolves a configured LLM provider, composes an instruction prompt
//! from workspace rules, user configuration or bundled templates, and
//! streams one commit message for the current git diff into a
//! caller-supplied sink.
//!
//! # Quick Start
//!
//! ```no_run
//! use difftide::config::Settings;
//! use difftide::generation::{generate_commit_message, GenerationOptions};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> difftide::error::Result<()> {
//! let settings = Settings::load(None)?;
//! let message = generate_commit_message(
//!     &settings,
//!     &[std::path::PathBuf::from(".")],
//!     "diff --git a/src/lib.rs b/src/lib.rs\n...",
//!     &GenerationOptions::default(),
//!     |chunk| print!("{chunk}"),
//!     &CancellationToken::new(),
//! )
//! .await?;
//! println!("\n{message}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod generation;
pub mod git;
pub mod prompt;
pub mod provider;
pub mod registry;
