pub mod classify;
pub mod cli;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod interactive;
pub mod merge;
pub mod pipeline;
pub mod progress;
pub mod report;
pub mod util;

pub use error::{ConversionFailure, ConversionResult, PipelineError};
pub use pipeline::{Pipeline, RunRequest};
