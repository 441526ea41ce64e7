pub mod soffice;
pub mod types;

use crate::error::ConversionResult;
use anyhow::Result;
use std::path::Path;

pub use types::ConverterDiag;

/// Turns one presentation into `<out_dir>/<stem>.pdf`.
pub trait PresentationConverter {
    fn convert(&self, input: &Path, out_dir: &Path) -> ConversionResult;
    fn doctor(&self) -> Result<ConverterDiag>;
}

impl<T: PresentationConverter + ?Sized> PresentationConverter for &T {
    fn convert(&self, input: &Path, out_dir: &Path) -> ConversionResult {
        (**self).convert(input, out_dir)
    }

    fn doctor(&self) -> Result<ConverterDiag> {
        (**self).doctor()
    }
}

/// Expected location of a converter's output for `input`.
pub fn intermediate_path(input: &Path, out_dir: &Path) -> std::path::PathBuf {
    let stem = input.file_stem().unwrap_or_default();
    let mut name = stem.to_os_string();
    name.push(".pdf");
    out_dir.join(name)
}
