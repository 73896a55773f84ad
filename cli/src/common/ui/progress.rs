//! # Upload Progress Bar (`common::ui::progress`)
//!
//! File: cli/src/common/ui/progress.rs
//! Author: Christi Mahu
//!
//! A single `indicatif` bar reused for every upload of a deploy. The uploader
//! reports `(uploaded, total)` byte counts; when `total` changes a new transfer
//! has begun and the bar is reset to the new length.
//!
use crate::common::ssh::upload::ProgressCallback;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Arc;

const TEMPLATE: &str =
    "{msg:24} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta})";

#[derive(Clone)]
pub struct UploadProgress {
    bar: ProgressBar,
}

impl UploadProgress {
    /// A bar drawn to stderr.
    pub fn new() -> Self {
        Self::with_bar(ProgressBar::new(0))
    }

    /// A bar that draws nothing, for non-interactive runs.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden()))
    }

    fn with_bar(bar: ProgressBar) -> Self {
        if let Ok(style) = ProgressStyle::default_bar().template(TEMPLATE) {
            bar.set_style(style.progress_chars("#>-"));
        }
        Self { bar }
    }

    /// Sets the label shown in front of the bar.
    pub fn describe(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }

    /// Records `uploaded` out of `total` bytes.
    pub fn update(&self, uploaded: u64, total: u64) {
        if self.bar.length() != Some(total) {
            self.bar.set_length(total);
            self.bar.reset();
        }
        self.bar.set_position(uploaded);
        if uploaded >= total {
            self.bar.finish();
        }
    }

    /// Adapts the bar to the uploader's callback type.
    pub fn callback(&self) -> ProgressCallback {
        let progress = self.clone();
        Arc::new(move |uploaded, total| {
            progress.update(uploaded, total);
            Ok(())
        })
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    #[cfg(test)]
    pub fn length(&self) -> Option<u64> {
        self.bar.length()
    }
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_tracks_transfers() {
        let progress = UploadProgress::hidden();
        progress.describe("Uploading chain binary");
        let callback = progress.callback();

        callback(512, 2048).unwrap();
        assert_eq!(progress.length(), Some(2048));
        assert_eq!(progress.position(), 512);

        callback(2048, 2048).unwrap();
        assert_eq!(progress.position(), 2048);

        // A new transfer with a different size resets the bar.
        callback(10, 100).unwrap();
        assert_eq!(progress.length(), Some(100));
        assert_eq!(progress.position(), 10);
    }
}
