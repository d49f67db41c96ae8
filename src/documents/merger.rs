//! PDF concatenation.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use lopdf::{Document, Object, ObjectId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("no usable PDF inputs to merge")]
    NoInputs,
    #[error("failed to load PDF {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
    #[error("input PDFs have no page tree")]
    MissingPageTree,
    #[error("failed to write merged PDF: {0}")]
    Write(#[source] std::io::Error),
}

/// Why an input did not make it into the merged document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Absent,
    NotFound,
    Empty,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedInput {
    pub position: usize,
    pub path: Option<PathBuf>,
    pub reason: SkipReason,
}

#[derive(Debug, Clone)]
pub struct MergeReport {
    pub output: PathBuf,
    pub merged: Vec<PathBuf>,
    pub skipped: Vec<SkippedInput>,
    pub pages: usize,
}

/// Split candidate inputs into usable paths and skipped entries.
pub fn filter_inputs(inputs: &[Option<PathBuf>]) -> (Vec<PathBuf>, Vec<SkippedInput>) {
    let mut usable = Vec::new();
    let mut skipped = Vec::new();

    for (position, input) in inputs.iter().enumerate() {
        let reason = match input {
            None => Some(SkipReason::Absent),
            Some(path) => match fs::metadata(path) {
                Err(_) => Some(SkipReason::NotFound),
                Ok(meta) if !meta.is_file() => Some(SkipReason::NotFound),
                Ok(meta) if meta.len() == 0 => Some(SkipReason::Empty),
                Ok(_) => None,
            },
        };

        match reason {
            None => {
                if let Some(path) = input {
                    usable.push(path.clone());
                }
            }
            Some(reason) => {
                log::warn!("Skipping merge input #{} ({:?}): {:?}", position, input, reason);
                skipped.push(SkippedInput {
                    position,
                    path: input.clone(),
                    reason,
                });
            }
        }
    }

    (usable, skipped)
}

/// Concatenate every usable input, in order, into `output`.
pub fn merge_pdfs(inputs: &[Option<PathBuf>], output: &Path) -> Result<MergeReport, MergeError> {
    let (usable, skipped) = filter_inputs(inputs);
    if usable.is_empty() {
        return Err(MergeError::NoInputs);
    }

    let mut documents = Vec::with_capacity(usable.len());
    for path in &usable {
        let doc = Document::load(path).map_err(|source| MergeError::Load {
            path: path.clone(),
            source,
        })?;
        documents.push(doc);
    }

    let mut merged = concatenate(documents)?;
    let pages = merged.get_pages().len();

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(MergeError::Write)?;
    }
    merged.save(output).map_err(MergeError::Write)?;

    log::info!(
        "Merged {} PDF(s) ({} pages, {} skipped) into {}",
        usable.len(),
        pages,
        skipped.len(),
        output.display()
    );

    Ok(MergeReport {
        output: output.to_path_buf(),
        merged: usable,
        skipped,
        pages,
    })
}

const INHERITABLE: [&[u8]; 4] = [b"MediaBox", b"CropBox", b"Resources", b"Rotate"];

fn type_of(object: &Object) -> Option<Vec<u8>> {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|t| t.as_name().ok())
        .map(<[u8]>::to_vec)
}

/// Copy attributes a page inherits from its ancestors onto the page itself,
/// since intermediate page tree nodes do not survive the merge.
fn with_inherited_attributes(doc: &Document, page: &Object) -> Object {
    let Ok(dict) = page.as_dict() else {
        return page.clone();
    };
    let mut dict = dict.clone();
    let mut parent = dict.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(parent_id) = parent {
        let Ok(node) = doc.get_dictionary(parent_id) else {
            break;
        };
        for key in INHERITABLE {
            if !dict.has(key) {
                if let Ok(value) = node.get(key) {
                    dict.set(key.to_vec(), value.clone());
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        depth += 1;
        if depth > 32 {
            break;
        }
    }

    Object::Dictionary(dict)
}

fn concatenate(documents: Vec<Document>) -> Result<Document, MergeError> {
    let mut max_id = 1;
    let mut page_order: Vec<ObjectId> = Vec::new();
    let mut pages: BTreeMap<ObjectId, Object> = BTreeMap::new();
    let mut objects: BTreeMap<ObjectId, Object> = BTreeMap::new();

    for mut doc in documents {
        doc.renumber_objects_with(max_id);
        max_id = doc.max_id + 1;

        for (_, page_id) in doc.get_pages() {
            if let Ok(page) = doc.get_object(page_id) {
                page_order.push(page_id);
                pages.insert(page_id, with_inherited_attributes(&doc, page));
            }
        }
        objects.extend(doc.objects);
    }

    let mut merged = Document::with_version("1.5");
    let mut catalog: Option<(ObjectId, Object)> = None;
    let mut page_tree: Option<(ObjectId, Object)> = None;

    for (object_id, object) in objects {
        match type_of(&object).as_deref() {
            Some(b"Catalog") => {
                if catalog.is_none() {
                    catalog = Some((object_id, object));
                }
            }
            Some(b"Pages") => {
                if let Ok(dict) = object.as_dict() {
                    let mut dict = dict.clone();
                    let id = match page_tree.take() {
                        Some((existing_id, existing)) => {
                            if let Ok(existing) = existing.as_dict() {
                                dict.extend(existing);
                            }
                            existing_id
                        }
                        None => object_id,
                    };
                    page_tree = Some((id, Object::Dictionary(dict)));
                }
            }
            Some(b"Page") | Some(b"Outlines") | Some(b"Outline") => {}
            _ => {
                merged.objects.insert(object_id, object);
            }
        }
    }

    let (pages_id, pages_object) = page_tree.ok_or(MergeError::MissingPageTree)?;
    let (catalog_id, catalog_object) = catalog.ok_or(MergeError::MissingPageTree)?;

    for page_id in &page_order {
        if let Some(Ok(dict)) = pages.get(page_id).map(Object::as_dict) {
            let mut dict = dict.clone();
            dict.set("Parent", pages_id);
            merged.objects.insert(*page_id, Object::Dictionary(dict));
        }
    }

    if let Ok(dict) = pages_object.as_dict() {
        let mut dict = dict.clone();
        dict.remove(b"Parent");
        dict.set("Count", page_order.len() as u32);
        dict.set(
            "Kids",
            page_order
                .iter()
                .map(|id| Object::Reference(*id))
                .collect::<Vec<_>>(),
        );
        merged.objects.insert(pages_id, Object::Dictionary(dict));
    }

    if let Ok(dict) = catalog_object.as_dict() {
        let mut dict = dict.clone();
        dict.set("Pages", pages_id);
        dict.remove(b"Outlines");
        merged.objects.insert(catalog_id, Object::Dictionary(dict));
    }

    merged.trailer.set("Root", catalog_id);
    merged.max_id = merged.objects.len() as u32;
    merged.renumber_objects();
    merged.adjust_zero_pages();
    merged.compress();

    Ok(merged)
}
