use crate::{
    classify::{self, SourceFile, SourceKind},
    config::Config,
    convert,
    engine::{PresentationConverter, intermediate_path, soffice::install_hint},
    error::{ConversionFailure, ConversionResult, PipelineError},
    merge,
    progress::{ProgressEvent, ProgressSink, Stage},
    report::{FileReport, FileStatus, RunReport},
    util::{now_rfc3339, with_pdf_extension},
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};

/// Where to read from and what to write.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_name: String,
}

impl RunRequest {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            input_dir: cfg.input_dir(),
            output_dir: cfg.output_dir(),
            output_name: cfg.paths.output_name.clone(),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.output_name)
    }

    /// Applies a user-supplied file name. A blank name keeps the current one.
    pub fn set_output_name(&mut self, name: &str) {
        if !name.trim().is_empty() {
            self.output_name = with_pdf_extension(name);
        }
    }
}

pub struct Pipeline<C: PresentationConverter> {
    cfg: Config,
    converter: Option<C>,
}

impl<C: PresentationConverter> Pipeline<C> {
    /// `converter` is `None` when no office converter is installed; presentations
    /// are then skipped instead of failing one by one.
    pub fn new(cfg: &Config, converter: Option<C>) -> Self {
        Self {
            cfg: cfg.clone(),
            converter,
        }
    }

    /// Runs one merge from scan to cleanup. The scratch directory is gone by
    /// the time this returns, whatever the outcome.
    pub fn run(
        &self,
        req: &RunRequest,
        progress: &dyn ProgressSink,
    ) -> Result<RunReport, PipelineError> {
        match self.run_stages(req, progress) {
            Ok(report) => {
                progress.report(ProgressEvent::Stage(Stage::Done));
                Ok(report)
            }
            Err(err) => {
                debug!("run failed: {err:?}");
                progress.report(ProgressEvent::Failed {
                    reason: err.to_string(),
                });
                progress.report(ProgressEvent::Stage(Stage::Failed));
                Err(err)
            }
        }
    }

    fn run_stages(
        &self,
        req: &RunRequest,
        progress: &dyn ProgressSink,
    ) -> Result<RunReport, PipelineError> {
        let started = now_rfc3339();

        progress.report(ProgressEvent::Stage(Stage::Scanning));
        let inventory = classify::scan_dir(&req.input_dir)?;
        debug!(
            "scanned {}: {} presentation(s), {} image(s), {} PDF(s)",
            req.input_dir.display(),
            inventory.presentations.len(),
            inventory.images.len(),
            inventory.pdfs.len()
        );
        progress.report(ProgressEvent::Found {
            presentations: inventory.presentations.len(),
            images: inventory.images.len(),
            pdfs: inventory.pdfs.len(),
        });

        let mut files = Vec::new();
        let mut presentations: &[SourceFile] = &inventory.presentations;
        let converter_missing = self.converter.is_none() && !presentations.is_empty();
        if converter_missing {
            debug!(
                "no office converter found; skipping {} presentation(s)",
                presentations.len()
            );
            progress.report(ProgressEvent::ConverterMissing {
                skipped: presentations.len(),
                hint: install_hint(),
            });
            for file in presentations {
                files.push(FileReport {
                    source: file.path.clone(),
                    kind: file.kind,
                    status: FileStatus::Skipped {
                        reason: "no office converter available".into(),
                    },
                });
            }
            presentations = &[];
        }

        let total = presentations.len() + inventory.images.len() + inventory.pdfs.len();
        if total == 0 {
            return Err(PipelineError::NothingToDo {
                dir: req.input_dir.clone(),
                converter_missing,
            });
        }

        let scratch = self.create_scratch()?;
        debug!("scratch dir {}", scratch.path().display());

        let stages = [
            (Stage::ConvertingPresentations, presentations),
            (Stage::ConvertingImages, inventory.images.as_slice()),
            (Stage::CopyingPdfs, inventory.pdfs.as_slice()),
        ];

        let mut intermediates = Vec::new();
        let mut index = 0;
        for (stage, batch) in stages {
            if batch.is_empty() {
                continue;
            }
            progress.report(ProgressEvent::Stage(stage));

            for file in batch {
                index += 1;
                let name = file.file_name();
                debug!("[{index}/{total}] {} {}", file.kind.label(), file.path.display());
                progress.report(ProgressEvent::FileStarted {
                    index,
                    total,
                    kind: file.kind,
                    name: name.clone(),
                });

                let status = match self.convert_one(file, scratch.path()) {
                    Ok(pdf) => {
                        progress.report(ProgressEvent::FileConverted { name });
                        let intermediate = pdf
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default();
                        intermediates.push(pdf);
                        FileStatus::Converted { intermediate }
                    }
                    Err(failure) => {
                        debug!("{}: {failure}", file.path.display());
                        progress.report(ProgressEvent::FileFailed {
                            name,
                            reason: failure.reason.clone(),
                        });
                        FileStatus::Failed {
                            reason: failure.reason,
                        }
                    }
                };
                files.push(FileReport {
                    source: file.path.clone(),
                    kind: file.kind,
                    status,
                });
            }
        }

        progress.report(ProgressEvent::Stage(Stage::Merging));
        if intermediates.is_empty() {
            return Err(PipelineError::MergeFailure(
                "no files were converted successfully".into(),
            ));
        }

        let left_out = files.len() - intermediates.len();
        progress.report(ProgressEvent::Merging {
            count: intermediates.len(),
            failed: left_out,
        });

        let output = req.output_path();
        let page_count = merge::merge_pdfs(&intermediates, &output)?;

        let scratch_path = scratch.path().to_path_buf();
        if let Err(e) = scratch.close() {
            warn!("could not remove scratch dir {}: {e}", scratch_path.display());
        }

        progress.report(ProgressEvent::Finished {
            output: output.clone(),
            merged: intermediates.len(),
            pages: page_count,
        });

        let report = RunReport {
            started,
            finished: now_rfc3339(),
            input_dir: req.input_dir.clone(),
            output: Some(output),
            page_count,
            files,
        };
        self.write_report(req, &report);
        Ok(report)
    }

    fn convert_one(&self, file: &SourceFile, scratch: &Path) -> ConversionResult {
        let target = match file.kind {
            SourceKind::Pdf => scratch.join(file.path.file_name().unwrap_or_default()),
            _ => intermediate_path(&file.path, scratch),
        };
        // Two inputs sharing a stem would otherwise overwrite each other.
        if target.exists() {
            return Err(ConversionFailure::new(format!(
                "another input already produced {}",
                target.file_name().unwrap_or_default().to_string_lossy()
            )));
        }

        match file.kind {
            SourceKind::Presentation => match &self.converter {
                Some(conv) => conv.convert(&file.path, scratch),
                None => Err(ConversionFailure::new("no office converter available")),
            },
            SourceKind::Image => convert::image_to_pdf(&file.path, scratch, self.cfg.image.dpi),
            SourceKind::Pdf => convert::stage_pdf(&file.path, scratch),
            SourceKind::Unsupported => Err(ConversionFailure::new("unsupported file type")),
        }
    }

    fn create_scratch(&self) -> Result<TempDir, PipelineError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("pdf-stitch-");
        match self.cfg.scratch_parent() {
            Some(parent) => {
                std::fs::create_dir_all(&parent).map_err(PipelineError::Scratch)?;
                builder.tempdir_in(parent).map_err(PipelineError::Scratch)
            }
            None => builder.tempdir().map_err(PipelineError::Scratch),
        }
    }

    fn write_report(&self, req: &RunRequest, report: &RunReport) {
        if !self.cfg.output.write_report_json {
            return;
        }
        let path = req.output_dir.join(&self.cfg.output.report_filename);
        let written = serde_json::to_string_pretty(report)
            .map_err(|e| e.to_string())
            .and_then(|json| std::fs::write(&path, json).map_err(|e| e.to_string()));
        if let Err(e) = written {
            warn!("could not write report {}: {e}", path.display());
        }
    }
}
