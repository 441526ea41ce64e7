use std::path::PathBuf;
use thiserror::Error;

/// Conditions that abort a run. Nothing is written to the output directory
/// once one of these is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("input folder does not exist: {}", .0.display())]
    InputMissing(PathBuf),

    /// `converter_missing` is set when presentations were found but had to be
    /// dropped because no office converter is installed.
    #[error("no supported files to merge in {}", .dir.display())]
    NothingToDo { dir: PathBuf, converter_missing: bool },

    #[error("merge failed: {0}")]
    MergeFailure(String),

    #[error("could not create scratch directory: {0}")]
    Scratch(#[source] std::io::Error),
}

/// Why a single source file could not be turned into an intermediate PDF.
/// Always recoverable: the file is left out and the run continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct ConversionFailure {
    pub reason: String,
}

impl ConversionFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

pub type ConversionResult = Result<PathBuf, ConversionFailure>;
