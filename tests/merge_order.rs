mod common;

use common::{assert_width, fixture_pdf, page_count, page_widths};
use pdf_stitch::{PipelineError, merge::merge_pdfs};

#[test]
fn pages_follow_stem_order_not_argument_order() {
    let dir = tempfile::tempdir().unwrap();
    let b = fixture_pdf(dir.path(), "b", 200);
    let a = fixture_pdf(dir.path(), "a", 100);
    let c = fixture_pdf(dir.path(), "c", 300);
    let out = dir.path().join("merged.pdf");

    let pages = merge_pdfs(&[b, a, c], &out).unwrap();

    assert_eq!(pages, 3);
    let widths = page_widths(&out);
    assert_eq!(widths.len(), 3);
    assert_width(widths[0], 72.0);
    assert_width(widths[1], 144.0);
    assert_width(widths[2], 216.0);
}

#[test]
fn multi_page_inputs_keep_their_internal_order() {
    let dir = tempfile::tempdir().unwrap();
    let first = fixture_pdf(dir.path(), "m1", 100);
    let second = fixture_pdf(dir.path(), "m2", 200);
    let two_pages = dir.path().join("deck.pdf");
    merge_pdfs(&[first, second], &two_pages).unwrap();

    let tail = fixture_pdf(dir.path(), "zz", 300);
    let out = dir.path().join("all.pdf");
    merge_pdfs(&[tail, two_pages], &out).unwrap();

    let widths = page_widths(&out);
    assert_eq!(widths.len(), 3);
    assert_width(widths[0], 72.0);
    assert_width(widths[1], 144.0);
    assert_width(widths[2], 216.0);
}

#[test]
fn single_input_is_written_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let only = fixture_pdf(dir.path(), "only", 150);
    let out = dir.path().join("nested").join("deeper").join("merged.pdf");

    merge_pdfs(&[only], &out).unwrap();

    assert_eq!(page_count(&out), 1);
    assert_width(page_widths(&out)[0], 108.0);
}

#[test]
fn one_corrupt_intermediate_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let good = fixture_pdf(dir.path(), "good", 100);
    let bad = dir.path().join("bad.pdf");
    std::fs::write(&bad, b"%PDF-1.4 truncated garbage").unwrap();
    let out_dir = dir.path().join("out");
    let out = out_dir.join("merged.pdf");

    let err = merge_pdfs(&[good, bad], &out).unwrap_err();

    assert!(matches!(err, PipelineError::MergeFailure(_)));
    assert!(!out.exists());
    assert!(!out_dir.join("merged.pdf.part").exists());
}

#[test]
fn missing_intermediate_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let good = fixture_pdf(dir.path(), "good", 100);
    let out = dir.path().join("merged.pdf");

    let err = merge_pdfs(&[good, dir.path().join("gone.pdf")], &out).unwrap_err();
    assert!(err.to_string().contains("gone.pdf"));
    assert!(!out.exists());
}
