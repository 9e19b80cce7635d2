use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use once_cell::sync::Lazy;

const PROGRESS_STYLE: &str = "Progress: {pos}/{len}";

static PROGRESS_TEMPLATE: Lazy<Option<ProgressStyle>> =
    Lazy::new(|| ProgressStyle::with_template(PROGRESS_STYLE).ok());

/// Shared completed/total counter, rendered as a single overwritten
/// `Progress: <completed>/<total>` line.
///
/// Clones share the same count.
#[derive(Clone)]
pub struct ProgressCounter {
    pb: ProgressBar,
}

impl std::fmt::Debug for ProgressCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressCounter")
            .field("completed", &self.completed())
            .field("total", &self.total())
            .finish()
    }
}

impl ProgressCounter {
    /// A counter drawn on stdout.
    pub fn stdout(total: u64) -> Self {
        Self::with_target(total, ProgressDrawTarget::stdout())
    }

    /// A counter that is never drawn.
    pub fn hidden(total: u64) -> Self {
        Self::with_target(total, ProgressDrawTarget::hidden())
    }

    fn with_target(total: u64, target: ProgressDrawTarget) -> Self {
        let pb = ProgressBar::with_draw_target(Some(total), target);
        let pb = match PROGRESS_TEMPLATE.as_ref() {
            Some(style) => pb.with_style(style.clone()),
            None => pb,
        };
        Self { pb }
    }

    /// Records one finished unit of work and returns the new completed count.
    pub fn complete_one(&self) -> u64 {
        self.pb.inc(1);
        self.pb.position()
    }

    pub fn completed(&self) -> u64 { self.pb.position() }

    pub fn total(&self) -> u64 { self.pb.length().unwrap_or_default() }

    pub fn finish(&self) { self.pb.finish(); }
}
