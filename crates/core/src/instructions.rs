//! User instructions: an optional markdown file used as the system preamble.
//!
//! The first file found in the working directory from the candidate list
//! wins (default order: `claude.md`, `gemini.md`, `instructions.md`).
//! A missing file is not an error; the conversation then starts empty.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Default instruction file names, checked in order.
pub const DEFAULT_INSTRUCTION_FILES: &[&str] = &["claude.md", "gemini.md", "instructions.md"];

/// Instructions loaded from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instructions {
    /// File the instructions were read from
    pub path: PathBuf,

    /// Raw file content
    pub content: String,
}

impl Instructions {
    /// Find and read the first existing candidate file under `dir`.
    ///
    /// Unreadable or blank files are skipped with a warning so a later
    /// candidate can still be used.
    pub fn discover<S: AsRef<str>>(dir: &Path, candidates: &[S]) -> Option<Self> {
        for name in candidates {
            let path = dir.join(name.as_ref());
            if !path.is_file() {
                continue;
            }

            match std::fs::read_to_string(&path) {
                Ok(content) if !content.trim().is_empty() => {
                    debug!(file = %path.display(), bytes = content.len(), "Loaded instructions");
                    return Some(Self { path, content });
                }
                Ok(_) => debug!(file = %path.display(), "Skipping blank instructions file"),
                Err(e) => warn!(file = %path.display(), error = %e, "Failed to read instructions file"),
            }
        }
        None
    }

    /// The bare file name, for display.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Estimate the token count (rough: 4 chars ≈ 1 token).
    pub fn estimated_tokens(&self) -> usize {
        self.content.len() / 4
    }
}
