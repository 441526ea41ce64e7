use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const PRESENTATION_EXTS: &[&str] = &["pptx", "ppt"];
pub const IMAGE_EXTS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "tif"];
pub const PDF_EXTS: &[&str] = &["pdf"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Presentation,
    Image,
    Pdf,
    Unsupported,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> SourceKind {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return SourceKind::Unsupported;
        };
        let ext = ext.to_ascii_lowercase();
        if PRESENTATION_EXTS.contains(&ext.as_str()) {
            SourceKind::Presentation
        } else if IMAGE_EXTS.contains(&ext.as_str()) {
            SourceKind::Image
        } else if PDF_EXTS.contains(&ext.as_str()) {
            SourceKind::Pdf
        } else {
            SourceKind::Unsupported
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Presentation => "presentation",
            SourceKind::Image => "image",
            SourceKind::Pdf => "PDF",
            SourceKind::Unsupported => "unsupported",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Recognized files of one input folder, each list sorted by file name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub presentations: Vec<SourceFile>,
    pub images: Vec<SourceFile>,
    pub pdfs: Vec<SourceFile>,
}

impl Inventory {
    pub fn total(&self) -> usize {
        self.presentations.len() + self.images.len() + self.pdfs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Scans `dir` (non-recursively) and partitions regular files by extension.
pub fn scan_dir(dir: &Path) -> Result<Inventory, PipelineError> {
    if !dir.is_dir() {
        return Err(PipelineError::InputMissing(dir.to_path_buf()));
    }

    let entries =
        std::fs::read_dir(dir).map_err(|_| PipelineError::InputMissing(dir.to_path_buf()))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        // `is_file` follows symlinks, so dangling links and links to dirs drop out.
        .filter(|p| p.is_file())
        .collect();
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let mut inv = Inventory::default();
    for path in paths {
        let kind = SourceKind::from_path(&path);
        let file = SourceFile { path, kind };
        match kind {
            SourceKind::Presentation => inv.presentations.push(file),
            SourceKind::Image => inv.images.push(file),
            SourceKind::Pdf => inv.pdfs.push(file),
            SourceKind::Unsupported => {}
        }
    }
    Ok(inv)
}
