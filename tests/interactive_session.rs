mod common;

use common::{StubConverter, assert_width, page_count, page_widths, test_config, write_png};
use pdf_stitch::interactive::{Prompter, session};
use std::io::Cursor;

#[test]
fn one_round_merges_with_the_given_converter() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("decks");
    let output = root.path().join("out");
    std::fs::create_dir_all(&input).unwrap();
    std::fs::write(input.join("a.pptx"), "100").unwrap();
    write_png(&input.join("b.png"), 200, 50);

    let cfg = test_config(&root.path().join("scratch"));
    let stub = StubConverter::new();
    let answers = format!("{}\n{}\nhandout\nn\n", input.display(), output.display());
    let mut printed = Vec::new();
    let mut prompter = Prompter::new(Cursor::new(answers), &mut printed);

    session(&cfg, Some(&stub), &mut prompter).unwrap();

    let printed = String::from_utf8(printed).unwrap();
    assert!(!printed.contains("presentations will be skipped"), "{printed}");
    assert!(printed.contains("[1/2] converting presentation: a.pptx"), "{printed}");
    assert!(printed.contains("PDF created"), "{printed}");

    let merged = output.join("handout.pdf");
    assert_eq!(page_count(&merged), 2);
    let widths = page_widths(&merged);
    assert_width(widths[0], 72.0);
    assert_width(widths[1], 144.0);
}

#[test]
fn second_round_reuses_previous_answers_as_defaults() {
    let root = tempfile::tempdir().unwrap();
    let input = root.path().join("decks");
    let output = root.path().join("out");
    std::fs::create_dir_all(&input).unwrap();
    write_png(&input.join("only.png"), 100, 100);

    let cfg = test_config(&root.path().join("scratch"));
    let stub = StubConverter::new();
    let answers = format!(
        "{}\n{}\nfirst\ny\n\n\nsecond.pdf\nn\n",
        input.display(),
        output.display()
    );
    let mut printed = Vec::new();
    let mut prompter = Prompter::new(Cursor::new(answers), &mut printed);

    session(&cfg, Some(&stub), &mut prompter).unwrap();

    assert_eq!(page_count(&output.join("first.pdf")), 1);
    assert_eq!(page_count(&output.join("second.pdf")), 1);
}
