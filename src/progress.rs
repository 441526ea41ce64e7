use crate::classify::SourceKind;
use crossbeam_channel::Sender;
use std::fmt;
use std::path::PathBuf;
use tracing::{info, warn};

/// Pipeline states, in the order a run moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Scanning,
    ConvertingPresentations,
    ConvertingImages,
    CopyingPdfs,
    Merging,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Stage(Stage),
    Found {
        presentations: usize,
        images: usize,
        pdfs: usize,
    },
    ConverterMissing {
        skipped: usize,
        hint: String,
    },
    FileStarted {
        index: usize,
        total: usize,
        kind: SourceKind,
        name: String,
    },
    FileConverted {
        name: String,
    },
    FileFailed {
        name: String,
        reason: String,
    },
    Merging {
        count: usize,
        failed: usize,
    },
    Finished {
        output: PathBuf,
        merged: usize,
        pages: usize,
    },
    Failed {
        reason: String,
    },
}

impl fmt::Display for ProgressEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressEvent::Stage(stage) => write!(f, "stage: {stage:?}"),
            ProgressEvent::Found {
                presentations,
                images,
                pdfs,
            } => write!(
                f,
                "found {} file(s): {presentations} presentation(s), {images} image(s), {pdfs} PDF(s)",
                presentations + images + pdfs
            ),
            ProgressEvent::ConverterMissing { skipped, hint } => write!(
                f,
                "warning: no office converter found, skipping {skipped} presentation(s) ({hint})"
            ),
            ProgressEvent::FileStarted {
                index,
                total,
                kind,
                name,
            } => {
                let verb = match kind {
                    SourceKind::Pdf => "adding",
                    _ => "converting",
                };
                write!(f, "[{index}/{total}] {verb} {}: {name}", kind.label())
            }
            ProgressEvent::FileConverted { name } => write!(f, "  ok: {name}"),
            ProgressEvent::FileFailed { name, reason } => write!(f, "  failed: {name}: {reason}"),
            ProgressEvent::Merging { count, failed } => {
                write!(f, "merging {count} PDF(s)")?;
                if *failed > 0 {
                    write!(f, " ({failed} file(s) left out)")?;
                }
                Ok(())
            }
            ProgressEvent::Finished {
                output,
                merged,
                pages,
            } => write!(
                f,
                "created {} ({merged} file(s), {pages} page(s))",
                output.display()
            ),
            ProgressEvent::Failed { reason } => write!(f, "error: {reason}"),
        }
    }
}

/// Receives progress from a running pipeline. Implementations must not
/// touch thread-affine state directly; the front end forwards events over a
/// channel instead.
pub trait ProgressSink: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(ProgressEvent) + Send + Sync,
{
    fn report(&self, event: ProgressEvent) {
        self(event)
    }
}

/// Writes every event to the tracing subscriber.
pub struct LogProgress;

impl ProgressSink for LogProgress {
    fn report(&self, event: ProgressEvent) {
        match &event {
            ProgressEvent::ConverterMissing { .. }
            | ProgressEvent::FileFailed { .. }
            | ProgressEvent::Failed { .. } => warn!("{event}"),
            ProgressEvent::Merging { failed, .. } if *failed > 0 => warn!("{event}"),
            _ => info!("{event}"),
        }
    }
}

/// Forwards events to another thread.
pub struct ChannelProgress(pub Sender<ProgressEvent>);

impl ProgressSink for ChannelProgress {
    fn report(&self, event: ProgressEvent) {
        // A closed receiver means nobody is watching any more.
        let _ = self.0.send(event);
    }
}

/// Discards everything.
pub struct Silent;

impl ProgressSink for Silent {
    fn report(&self, _event: ProgressEvent) {}
}
