#![allow(dead_code)]

use image::{Rgba, RgbaImage};
use lopdf::{Document, Object};
use pdf_stitch::{
    config::Config,
    convert::image_to_pdf,
    engine::{ConverterDiag, PresentationConverter, intermediate_path},
    error::{ConversionFailure, ConversionResult},
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Writes an opaque PNG of the given size.
pub fn write_png(path: &Path, width: u32, height: u32) {
    RgbaImage::from_pixel(width, height, Rgba([200, 30, 30, 255]))
        .save(path)
        .expect("write png");
}

/// Produces a one-page PDF `width` pixels wide (72pt per 100px).
pub fn fixture_pdf(dir: &Path, stem: &str, width: u32) -> PathBuf {
    let work = tempfile::tempdir().expect("tempdir");
    let png = work.path().join(format!("{stem}.png"));
    write_png(&png, width, 40);
    let pdf = image_to_pdf(&png, work.path(), 100.0).expect("fixture pdf");
    let dest = dir.join(format!("{stem}.pdf"));
    std::fs::copy(pdf, &dest).expect("copy fixture");
    dest
}

pub fn write_corrupt(path: &Path) {
    std::fs::write(path, b"\xFF\xD8\xFF\xE0 definitely not a real jpeg").expect("write");
}

/// Page widths in points, in page order.
pub fn page_widths(path: &Path) -> Vec<f32> {
    let doc = Document::load(path).expect("load pdf");
    doc.get_pages()
        .values()
        .map(|id| {
            let mut dict = doc.get_dictionary(*id).expect("page dict");
            loop {
                if let Ok(mb) = dict.get(b"MediaBox") {
                    let mb = mb.as_array().expect("MediaBox array");
                    return number(&mb[2]) - number(&mb[0]);
                }
                let parent = dict
                    .get(b"Parent")
                    .and_then(Object::as_reference)
                    .expect("page without MediaBox or parent");
                dict = doc.get_dictionary(parent).expect("parent dict");
            }
        })
        .collect()
}

pub fn page_count(path: &Path) -> usize {
    Document::load(path).expect("load pdf").get_pages().len()
}

/// Decoded content streams of every page, in page order.
pub fn page_contents(path: &Path) -> Vec<Vec<u8>> {
    let doc = Document::load(path).expect("load pdf");
    doc.get_pages()
        .values()
        .map(|id| doc.get_page_content(*id).expect("page content"))
        .collect()
}

fn number(o: &Object) -> f32 {
    match o {
        Object::Integer(i) => *i as f32,
        Object::Real(r) => *r as f32,
        other => panic!("not a number: {other:?}"),
    }
}

pub fn assert_width(actual: f32, expected: f32) {
    assert!(
        (actual - expected).abs() < 0.5,
        "page width {actual} != {expected}"
    );
}

/// Config whose scratch dirs land in `scratch_parent` and which never finds
/// a real office converter.
pub fn test_config(scratch_parent: &Path) -> Config {
    let mut cfg = Config::default();
    cfg.paths.scratch_dir = scratch_parent.display().to_string();
    cfg.converter.soffice_path = "/nonexistent/soffice".into();
    cfg.global.print_summary = false;
    cfg
}

pub fn dir_is_empty(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut it| it.next().is_none())
        .unwrap_or(true)
}

/// Stands in for soffice. A "presentation" file holds the page width in
/// pixels as text; the word `fail` makes the conversion fail.
pub struct StubConverter {
    work: TempDir,
}

impl StubConverter {
    pub fn new() -> Self {
        Self {
            work: tempfile::tempdir().expect("tempdir"),
        }
    }
}

impl PresentationConverter for StubConverter {
    fn convert(&self, input: &Path, out_dir: &Path) -> ConversionResult {
        let raw = std::fs::read_to_string(input)
            .map_err(|e| ConversionFailure::new(format!("read: {e}")))?;
        let width: u32 = raw
            .trim()
            .parse()
            .map_err(|_| ConversionFailure::new("stub: source file could not be loaded"))?;
        let stem = input.file_stem().unwrap().to_string_lossy().into_owned();
        let pdf = fixture_pdf(self.work.path(), &stem, width);
        let dest = intermediate_path(input, out_dir);
        std::fs::copy(pdf, &dest).map_err(|e| ConversionFailure::new(e.to_string()))?;
        Ok(dest)
    }

    fn doctor(&self) -> anyhow::Result<ConverterDiag> {
        Ok(ConverterDiag {
            converter_path: Some("stub".into()),
            version: Some("stub 1.0".into()),
            ok: true,
            error: None,
        })
    }
}
