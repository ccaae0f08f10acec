use std::fmt;

/// Progress events surfaced to the console while a pack operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// A mod file download is starting; `index` is 1-based manifest position.
    Fetching {
        filename: String,
        index: usize,
        total: usize,
    },
    /// The mod file was already on disk.
    Cached {
        filename: String,
        index: usize,
        total: usize,
    },
    /// An optional mod could not be resolved and was skipped.
    SkippedOptional { project_id: u64 },
    /// Free-form status line.
    Message(String),
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Fetching {
                filename,
                index,
                total,
            } => write!(f, "fetching {} ({}/{})", filename, index, total),
            ProgressEvent::Cached {
                filename,
                index,
                total,
            } => write!(f, "skipping {} ({}/{}): already present", filename, index, total),
            ProgressEvent::SkippedOptional { project_id } => write!(
                f,
                "warning: optional mod {} has no compatible file; skipping",
                project_id
            ),
            ProgressEvent::Message(msg) => f.write_str(msg),
        }
    }
}

/// Sink for progress events.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Prints every event as a line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleReporter;

impl ProgressReporter for ConsoleReporter {
    fn report(&self, event: ProgressEvent) {
        println!("{}", event);
    }
}
