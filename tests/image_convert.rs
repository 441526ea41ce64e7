mod common;

use common::{assert_width, page_contents, page_count, page_widths, write_corrupt, write_png};
use image::{Rgba, RgbaImage};
use pdf_stitch::convert::{image_to_pdf, normalize_to_rgb, stage_pdf};

#[test]
fn png_becomes_one_page_sized_at_100_dpi() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let png = src.path().join("photo.png");
    write_png(&png, 200, 100);

    let pdf = image_to_pdf(&png, out.path(), 100.0).unwrap();

    assert_eq!(pdf, out.path().join("photo.pdf"));
    assert_eq!(page_count(&pdf), 1);
    assert_width(page_widths(&pdf)[0], 144.0);
}

#[test]
fn transparent_gif_converts() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let gif = src.path().join("logo.gif");
    let mut img = RgbaImage::from_pixel(20, 20, Rgba([0, 0, 0, 0]));
    img.put_pixel(10, 10, Rgba([0, 0, 255, 255]));
    img.save(&gif).unwrap();

    let pdf = image_to_pdf(&gif, out.path(), 100.0).unwrap();
    assert_eq!(page_count(&pdf), 1);

    let flat = normalize_to_rgb(image::open(&gif).unwrap());
    assert_eq!(flat.get_pixel(0, 0).0, [255, 255, 255]);
    let [r, _, b] = flat.get_pixel(10, 10).0;
    assert!(b > 200 && r < 60, "opaque pixel lost its color: {r} {b}");
}

#[test]
fn same_image_gives_the_same_page_content() {
    let src = tempfile::tempdir().unwrap();
    let first = tempfile::tempdir().unwrap();
    let second = tempfile::tempdir().unwrap();
    let png = src.path().join("chart.png");
    write_png(&png, 120, 80);

    let a = image_to_pdf(&png, first.path(), 100.0).unwrap();
    let b = image_to_pdf(&png, second.path(), 100.0).unwrap();

    assert_eq!(page_contents(&a), page_contents(&b));
}

#[test]
fn corrupt_image_is_a_conversion_failure() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let jpg = src.path().join("broken.jpg");
    write_corrupt(&jpg);

    let err = image_to_pdf(&jpg, out.path(), 100.0).unwrap_err();
    assert!(err.reason.contains("cannot decode image"));
    assert!(!out.path().join("broken.pdf").exists());
}

#[test]
fn staged_pdf_is_byte_identical_with_same_mtime() {
    let src = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let original = common::fixture_pdf(src.path(), "Handout", 100);
    let old = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
    std::fs::File::options()
        .write(true)
        .open(&original)
        .unwrap()
        .set_modified(old)
        .unwrap();

    let staged = stage_pdf(&original, out.path()).unwrap();

    assert_eq!(staged, out.path().join("Handout.pdf"));
    assert_eq!(std::fs::read(&staged).unwrap(), std::fs::read(&original).unwrap());
    assert_eq!(std::fs::metadata(&staged).unwrap().modified().unwrap(), old);
}

#[test]
fn staging_a_missing_pdf_fails() {
    let out = tempfile::tempdir().unwrap();
    let err = stage_pdf(&out.path().join("absent.pdf"), &out.path().join("sub")).unwrap_err();
    assert!(err.reason.contains("cannot copy"));
}
