//! Directory selection surface used by device scans
//!
//! `None` from a picker means the user dismissed it. That is a cancellation,
//! never an error.

use std::collections::VecDeque;
use std::path::PathBuf;

#[allow(async_fn_in_trait)]
pub trait DirectoryPicker {
    async fn pick_directory(&mut self) -> Option<PathBuf>;
}

/// Native folder dialog
#[derive(Debug, Default)]
pub struct RfdPicker;

impl DirectoryPicker for RfdPicker {
    async fn pick_directory(&mut self) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_title("Select a music folder")
            .pick_folder()
            .await
            .map(|handle| handle.path().to_path_buf())
    }
}

/// Hands out a fixed sequence of answers, then keeps returning `None`
///
/// Backs `--scan-dir` (one known directory, no dialog).
#[derive(Debug, Default)]
pub struct FixedPicker {
    answers: VecDeque<Option<PathBuf>>,
    calls: u32,
}

impl FixedPicker {
    pub fn new(answers: impl IntoIterator<Item = Option<PathBuf>>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            calls: 0,
        }
    }

    pub fn directory(path: impl Into<PathBuf>) -> Self {
        Self::new([Some(path.into())])
    }

    /// How many times a directory was requested
    pub fn calls(&self) -> u32 {
        self.calls
    }
}

impl DirectoryPicker for FixedPicker {
    async fn pick_directory(&mut self) -> Option<PathBuf> {
        self.calls += 1;
        self.answers.pop_front().flatten()
    }
}
