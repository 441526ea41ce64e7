//! In-process converters: raster images become one-page PDFs, existing PDFs
//! are staged unchanged. Both write into the run's scratch directory using the
//! same `<stem>.pdf` naming the presentation converter produces.

use crate::engine::intermediate_path;
use crate::error::{ConversionFailure, ConversionResult};
use image::{DynamicImage, RgbImage};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObject, XObjectId, XObjectTransform,
};
use std::fs::{File, FileTimes};
use std::path::Path;
use tracing::{debug, warn};

const IMAGE_RESOURCE: &str = "Im0";

/// Decodes `input`, flattens any transparency onto white and writes a single
/// page sized to the image at `dpi`.
pub fn image_to_pdf(input: &Path, out_dir: &Path, dpi: f32) -> ConversionResult {
    let dest = intermediate_path(input, out_dir);

    let decoded = image::open(input)
        .map_err(|e| ConversionFailure::new(format!("cannot decode image: {e}")))?;
    debug!(
        width = decoded.width(),
        height = decoded.height(),
        color = ?decoded.color(),
        "image decoded"
    );
    if decoded.width() == 0 || decoded.height() == 0 {
        return Err(ConversionFailure::new("image has zero width or height"));
    }

    let rgb = normalize_to_rgb(decoded);
    let title = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let bytes = encode_single_page(rgb, &title, dpi);

    std::fs::write(&dest, bytes)
        .map_err(|e| ConversionFailure::new(format!("cannot write {}: {e}", dest.display())))?;
    Ok(dest)
}

/// Alpha-carrying images are composited onto opaque white; everything else is
/// converted straight to 8-bit RGB. Palette images arrive here already
/// expanded to RGB or RGBA by the decoder.
pub fn normalize_to_rgb(img: DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }

    let rgba = img.into_rgba8();
    let (w, h) = rgba.dimensions();
    let mut out = RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255]));
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a) + 127) / 255) as u8;
        *dst = image::Rgb([blend(r), blend(g), blend(b)]);
    }
    out
}

fn encode_single_page(rgb: RgbImage, title: &str, dpi: f32) -> Vec<u8> {
    let (w, h) = rgb.dimensions();
    let raw = RawImage {
        pixels: RawImageData::U8(rgb.into_raw()),
        width: w as usize,
        height: h as usize,
        data_format: RawImageFormat::RGB8,
        tag: Vec::new(),
    };

    // `add_image` picks a random resource name, which would leak into the
    // page's content stream and make reruns differ.
    let mut doc = PdfDocument::new(title);
    let xobject_id = XObjectId(IMAGE_RESOURCE.to_string());
    doc.resources
        .xobjects
        .map
        .insert(xobject_id.clone(), XObject::Image(raw));

    let page_w = Mm(w as f32 / dpi * 25.4);
    let page_h = Mm(h as f32 / dpi * 25.4);

    let ops = vec![Op::UseXobject {
        id: xobject_id,
        transform: XObjectTransform {
            translate_x: Some(Pt(0.0)),
            translate_y: Some(Pt(0.0)),
            scale_x: None,
            scale_y: None,
            dpi: Some(dpi),
            rotate: None,
        },
    }];
    doc.with_pages(vec![PdfPage::new(page_w, page_h, ops)]);

    let mut warnings: Vec<PdfWarnMsg> = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        debug!(count = warnings.len(), "printpdf emitted warnings");
    }
    bytes
}

/// Copies an existing PDF into `out_dir` under its own file name, keeping the
/// source timestamps.
pub fn stage_pdf(input: &Path, out_dir: &Path) -> ConversionResult {
    let name = input
        .file_name()
        .ok_or_else(|| ConversionFailure::new("input has no file name"))?;
    let dest = out_dir.join(name);

    std::fs::copy(input, &dest)
        .map_err(|e| ConversionFailure::new(format!("cannot copy to {}: {e}", dest.display())))?;

    if let Err(e) = copy_times(input, &dest) {
        warn!("could not preserve timestamps for {}: {e}", dest.display());
    }
    Ok(dest)
}

fn copy_times(src: &Path, dest: &Path) -> std::io::Result<()> {
    let meta = std::fs::metadata(src)?;
    let times = FileTimes::new()
        .set_accessed(meta.accessed()?)
        .set_modified(meta.modified()?);
    File::options().write(true).open(dest)?.set_times(times)
}
