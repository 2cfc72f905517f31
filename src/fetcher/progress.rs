//! Progress bars for in-flight downloads.

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

const BAR_TEMPLATE: &str =
    "{msg:32!} [{bar:30.cyan/blue}] {bytes:>10}/{total_bytes:<10} {bytes_per_sec:>12}";
const SPINNER_TEMPLATE: &str = "{msg:32!} {spinner} {bytes:>10} {bytes_per_sec:>12}";

/// Shared set of progress bars, one per in-flight asset.
///
/// A hidden board keeps the same API but draws nothing.
#[derive(Clone, Debug)]
pub struct ProgressBoard {
    multi: MultiProgress,
}

impl ProgressBoard {
    pub fn new(enabled: bool) -> Self {
        let multi = if enabled {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };
        Self { multi }
    }

    pub fn hidden() -> Self {
        Self::new(false)
    }

    /// Add a bar for one download. `total` comes from Content-Length.
    pub fn start(&self, label: &str, total: Option<u64>) -> AssetProgress {
        let bar = match total {
            Some(len) => {
                let bar = ProgressBar::new(len);
                bar.set_style(
                    ProgressStyle::with_template(BAR_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_bar())
                        .progress_chars("=> "),
                );
                bar
            }
            None => {
                let bar = ProgressBar::new_spinner();
                bar.set_style(
                    ProgressStyle::with_template(SPINNER_TEMPLATE)
                        .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                );
                bar
            }
        };
        let bar = self.multi.add(bar);
        bar.set_message(label.to_string());
        AssetProgress { bar }
    }

    /// Run `f` with all bars temporarily cleared, so plain output does not
    /// interleave with bar redraws.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.multi.suspend(f)
    }
}

/// Handle to one bar; removed from the board when dropped.
pub struct AssetProgress {
    bar: ProgressBar,
}

impl AssetProgress {
    pub fn advance(&self, bytes: u64) {
        self.bar.inc(bytes);
    }
}

impl Drop for AssetProgress {
    fn drop(&mut self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_board_tracks_without_drawing() {
        let board = ProgressBoard::hidden();

        let progress = board.start("audio abc", Some(100));
        progress.advance(40);
        assert_eq!(progress.bar.position(), 40);

        let spinner = board.start("cover abc", None);
        spinner.advance(7);
        assert_eq!(spinner.bar.position(), 7);
    }

    #[test]
    fn test_suspend_returns_value() {
        let board = ProgressBoard::hidden();
        assert_eq!(board.suspend(|| 5), 5);
    }
}
