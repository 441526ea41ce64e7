use crate::error::PipelineError;
use lopdf::{Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: &[&[u8]] = &[b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

/// Final page order: by file stem, case-sensitive, byte-wise. Where a page
/// came from (presentation, image, PDF) does not matter.
pub fn merge_order<P: AsRef<Path>>(files: &[P]) -> Vec<PathBuf> {
    let mut ordered: Vec<PathBuf> = files.iter().map(|p| p.as_ref().to_path_buf()).collect();
    ordered.sort_by(|a, b| a.file_stem().cmp(&b.file_stem()));
    ordered
}

/// Concatenates the pages of `files`, in [`merge_order`], into `output_path`.
///
/// Any file that fails to load aborts the merge; nothing is left at
/// `output_path` on failure. Returns the number of pages written.
pub fn merge_pdfs<P: AsRef<Path>>(files: &[P], output_path: &Path) -> Result<usize, PipelineError> {
    if files.is_empty() {
        return Err(PipelineError::MergeFailure(
            "no intermediate PDFs to merge".into(),
        ));
    }

    let start_time = Instant::now();
    let ordered = merge_order(files);

    let mut docs = Vec::with_capacity(ordered.len());
    for path in &ordered {
        let doc = Document::load(path).map_err(|e| {
            PipelineError::MergeFailure(format!("cannot read {}: {e}", path.display()))
        })?;
        if doc.get_pages().is_empty() {
            return Err(PipelineError::MergeFailure(format!(
                "{} has no pages",
                path.display()
            )));
        }
        docs.push(doc);
    }

    let mut merged = concatenate(docs)?;
    let page_count = merged.get_pages().len();

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            PipelineError::MergeFailure(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let mut part_name = output_path.file_name().unwrap_or_default().to_os_string();
    part_name.push(".part");
    let part_path = output_path.with_file_name(part_name);

    let written = merged
        .save(&part_path)
        .map_err(|e| e.to_string())
        .and_then(|_| std::fs::rename(&part_path, output_path).map_err(|e| e.to_string()));
    if let Err(e) = written {
        let _ = std::fs::remove_file(&part_path);
        return Err(PipelineError::MergeFailure(format!(
            "cannot write {}: {e}",
            output_path.display()
        )));
    }

    info!(
        "merged {} file(s), {} page(s) into {} in {:?}",
        ordered.len(),
        page_count,
        output_path.display(),
        start_time.elapsed()
    );
    Ok(page_count)
}

fn concatenate(docs: Vec<Document>) -> Result<Document, PipelineError> {
    let mut docs = docs.into_iter();
    let Some(mut merged) = docs.next() else {
        return Err(PipelineError::MergeFailure("no documents".into()));
    };

    let mut pages: Vec<(ObjectId, lopdf::Dictionary)> = flattened_pages(&merged)?;
    let mut max_id = merged.max_id + 1;

    for mut doc in docs {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        pages.extend(flattened_pages(&doc)?);

        for (object_id, object) in doc.objects.into_iter() {
            match object.type_name().unwrap_or(b"") {
                // Rebuilt below.
                b"Catalog" | b"Pages" => {}
                _ => {
                    merged.objects.insert(object_id, object);
                }
            }
        }
    }

    let pages_id = merged
        .catalog()
        .and_then(|c| c.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|e| PipelineError::MergeFailure(format!("missing page tree root: {e}")))?;

    let kids: Vec<Object> = pages.iter().map(|(id, _)| Object::Reference(*id)).collect();
    let count = pages.len() as i64;
    for (page_id, mut dict) in pages {
        dict.set("Parent", pages_id);
        merged.objects.insert(page_id, Object::Dictionary(dict));
    }

    let root = merged
        .get_object_mut(pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| PipelineError::MergeFailure(format!("invalid page tree root: {e}")))?;
    root.set("Kids", kids);
    root.set("Count", count);
    for key in INHERITABLE {
        root.remove(key);
    }

    merged.max_id = merged.objects.keys().map(|(id, _)| *id).max().unwrap_or(0);
    let pruned = merged.prune_objects();
    debug!(pruned = pruned.len(), "dropped unreferenced objects");
    merged.renumber_objects();
    Ok(merged)
}

/// Pages of `doc` in reading order, each with inherited attributes copied
/// onto the page itself so it no longer depends on its original ancestors.
fn flattened_pages(doc: &Document) -> Result<Vec<(ObjectId, lopdf::Dictionary)>, PipelineError> {
    let mut out = Vec::new();
    for (_, page_id) in doc.get_pages() {
        let mut dict = doc
            .get_dictionary(page_id)
            .map_err(|e| PipelineError::MergeFailure(format!("bad page object {page_id:?}: {e}")))?
            .clone();

        for key in INHERITABLE {
            if dict.has(key) {
                continue;
            }
            if let Some(value) = inherited(doc, &dict, key) {
                dict.set(key.to_vec(), value);
            }
        }
        out.push((page_id, dict));
    }
    Ok(out)
}

fn inherited(doc: &Document, page: &lopdf::Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded walk: malformed files can contain parent cycles.
    for _ in 0..64 {
        let node = doc.get_dictionary(parent?).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_follows_stems_not_input_order() {
        let files = ["/s/b.pdf", "/s/a.pdf", "/s/c.pdf"];
        let names: Vec<_> = merge_order(&files)
            .into_iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.pdf", "b.pdf", "c.pdf"]);
    }

    #[test]
    fn order_is_case_sensitive() {
        let files = ["b.pdf", "B.pdf", "a.pdf", "A.pdf"];
        let stems: Vec<_> = merge_order(&files)
            .into_iter()
            .map(|p| p.file_stem().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(stems, ["A", "B", "a", "b"]);
    }

    #[test]
    fn empty_input_is_a_merge_failure() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("merged.pdf");
        let err = merge_pdfs::<PathBuf>(&[], &out).unwrap_err();
        assert!(matches!(err, PipelineError::MergeFailure(_)));
        assert!(!out.exists());
    }
}
