use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::selector::Selection;

/// Attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Read and parse a PDF from disk.
pub async fn load_pdf(path: &Path) -> Result<Document> {
    let data = match fs::read(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(Error::FileNotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };

    let document = Document::load_mem(&data).map_err(|source| Error::Pdf {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(
        "Loaded PDF with {} pages from {}",
        document.get_pages().len(),
        path.display()
    );
    Ok(document)
}

/// What went into an assembled document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssemblyReport {
    pub cover_pages: usize,
    pub selected_pages: usize,
    /// Selected indices that fell outside the source document.
    pub out_of_range: Vec<i64>,
}

impl AssemblyReport {
    pub fn total_pages(&self) -> usize {
        self.cover_pages + self.selected_pages
    }
}

#[derive(Debug)]
pub struct AssembledDocument {
    document: Document,
    pub report: AssemblyReport,
}

impl AssembledDocument {
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Serialize and write to `output_path`, replacing any existing file.
    pub async fn save(&mut self, output_path: &Path) -> Result<()> {
        let mut data = Vec::new();
        self.document
            .save_to(&mut data)
            .map_err(|e| Error::Pdf {
                path: output_path.to_path_buf(),
                source: e.into(),
            })?;

        fs::write(output_path, data).await?;

        info!(
            "Wrote {} pages to {}",
            self.report.total_pages(),
            output_path.display()
        );
        Ok(())
    }
}

/// Builds an output document from cover pages followed by selected source
/// pages. Neither input is modified.
pub struct DocumentAssembler<'a> {
    source: &'a Document,
    cover: Option<&'a Document>,
}

impl<'a> DocumentAssembler<'a> {
    pub fn new(source: &'a Document) -> Self {
        Self {
            source,
            cover: None,
        }
    }

    pub fn with_cover(mut self, cover: Option<&'a Document>) -> Self {
        self.cover = cover;
        self
    }

    pub fn assemble(&self, selection: &Selection) -> Result<AssembledDocument> {
        let mut merged = self.source.clone();
        let source_pages: Vec<ObjectId> = merged.get_pages().into_values().collect();
        let mut report = AssemblyReport::default();
        let mut kids = Vec::new();

        if let Some(cover) = self.cover {
            let mut cover = cover.clone();
            cover.renumber_objects_with(merged.max_id + 1);

            let cover_pages: Vec<ObjectId> = cover.get_pages().into_values().collect();
            for &page_id in &cover_pages {
                flatten_inherited(&mut cover, page_id);
            }
            debug!("Prepending {} cover pages", cover_pages.len());

            merged.max_id = merged.max_id.max(cover.max_id);
            merged.objects.extend(cover.objects);

            report.cover_pages = cover_pages.len();
            kids.extend(cover_pages);
        }

        for &index in &selection.indices {
            match usize::try_from(index).ok().and_then(|i| source_pages.get(i)) {
                Some(&page_id) => {
                    flatten_inherited(&mut merged, page_id);
                    kids.push(page_id);
                    report.selected_pages += 1;
                }
                None => report.out_of_range.push(index),
            }
        }

        if !report.out_of_range.is_empty() {
            warn!(
                "Skipped {} page(s) outside the {}-page source: {:?}",
                report.out_of_range.len(),
                source_pages.len(),
                report.out_of_range.iter().map(|i| i + 1).collect::<Vec<_>>()
            );
        }

        let pages_id = pages_root(&merged)?;
        for &page_id in &kids {
            if let Ok(page) = merged.get_dictionary_mut(page_id) {
                page.set("Parent", Object::Reference(pages_id));
            }
        }

        let pages = merged
            .get_dictionary_mut(pages_id)
            .map_err(Error::Structure)?;
        let count = kids.len();
        pages.set("Kids", Object::Array(kids.into_iter().map(Object::Reference).collect()));
        pages.set("Count", Object::Integer(count as i64));
        // Every kept page carries its own copy by now. Left on the root, the
        // source's Rotate or CropBox would leak onto cover pages.
        for key in INHERITABLE {
            pages.remove(key);
        }

        // Outlines and named destinations may point at dropped pages.
        if let Ok(root_id) = merged.trailer.get(b"Root").and_then(Object::as_reference) {
            if let Ok(catalog) = merged.get_dictionary_mut(root_id) {
                catalog.remove(b"Outlines");
                catalog.remove(b"Dests");
            }
        }

        let pruned = merged.prune_objects();
        debug!("Pruned {} unreachable objects", pruned.len());
        merged.renumber_objects();

        info!(
            "Assembled {} pages ({} cover, {} selected)",
            count, report.cover_pages, report.selected_pages
        );

        Ok(AssembledDocument {
            document: merged,
            report,
        })
    }
}

fn pages_root(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(Error::Structure)
}

/// Copy attributes inherited from intermediate page tree nodes onto the page
/// itself, so it can be re-parented directly under the root.
fn flatten_inherited(doc: &mut Document, page_id: ObjectId) {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return;
    };

    let missing: Vec<&[u8]> = INHERITABLE
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    if missing.is_empty() {
        return;
    }

    let mut inherited = Vec::new();
    for key in missing {
        if let Some(value) = find_inherited(doc, page, key) {
            inherited.push((key, value));
        }
    }

    if let Ok(page) = doc.get_dictionary_mut(page_id) {
        for (key, value) in inherited {
            page.set(key, value);
        }
    }
}

fn find_inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    // Bounded walk guards against cyclic Parent links.
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
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Stream};

    /// A document whose page N draws the text "<label> N".
    fn sample_pdf(label: &str, pages: usize) -> Document {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for n in 1..=pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(format!("{label} {n}"))]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(Dictionary::new(), content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
                "Resources" => resources_id,
                "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc
    }

    /// Text labels of each page, in page order.
    fn page_labels(doc: &Document) -> Vec<String> {
        doc.get_pages()
            .into_values()
            .map(|page_id| {
                let content = doc.get_page_content(page_id).unwrap();
                let content = Content::decode(&content).unwrap();
                content
                    .operations
                    .iter()
                    .find(|op| op.operator == "Tj")
                    .and_then(|op| op.operands.first())
                    .and_then(|o| o.as_str().ok())
                    .map(|s| String::from_utf8_lossy(s).into_owned())
                    .unwrap()
            })
            .collect()
    }

    fn selection(indices: &[i64]) -> Selection {
        Selection {
            indices: indices.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn test_selected_order_preserved() {
        let source = sample_pdf("src", 6);
        let assembled = DocumentAssembler::new(&source)
            .assemble(&selection(&[4, 0, 2]))
            .unwrap();
        assert_eq!(page_labels(assembled.document()), vec!["src 5", "src 1", "src 3"]);
        assert_eq!(assembled.report.selected_pages, 3);
    }

    #[test]
    fn test_out_of_range_skipped() {
        let source = sample_pdf("src", 3);
        let assembled = DocumentAssembler::new(&source)
            .assemble(&selection(&[1, 3, 10, -1, 2]))
            .unwrap();
        assert_eq!(assembled.page_count(), 2);
        assert_eq!(page_labels(assembled.document()), vec!["src 2", "src 3"]);
        assert_eq!(assembled.report.out_of_range, vec![3, 10, -1]);
    }

    #[test]
    fn test_cover_then_selected() {
        let source = sample_pdf("src", 10);
        let cover = sample_pdf("cover", 2);
        let assembled = DocumentAssembler::new(&source)
            .with_cover(Some(&cover))
            .assemble(&selection(&[7, 1]))
            .unwrap();

        assert_eq!(
            page_labels(assembled.document()),
            vec!["cover 1", "cover 2", "src 8", "src 2"]
        );
        assert_eq!(assembled.report.total_pages(), 4);
        assert_eq!(assembled.page_count(), 4);
    }

    #[test]
    fn test_inputs_untouched() {
        let source = sample_pdf("src", 4);
        let cover = sample_pdf("cover", 1);
        let source_before = source.objects.len();

        DocumentAssembler::new(&source)
            .with_cover(Some(&cover))
            .assemble(&selection(&[3]))
            .unwrap();

        assert_eq!(source.objects.len(), source_before);
        assert_eq!(page_labels(&source).len(), 4);
        assert_eq!(page_labels(&cover), vec!["cover 1"]);
    }

    #[test]
    fn test_inherited_attributes_flattened() {
        let source = sample_pdf("src", 2);
        let assembled = DocumentAssembler::new(&source)
            .assemble(&selection(&[1]))
            .unwrap();

        let doc = assembled.document();
        let page_id = *doc.get_pages().values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
    }

    #[test]
    fn test_cover_does_not_inherit_source_root() {
        let mut source = sample_pdf("src", 3);
        let root_id = pages_root(&source).unwrap();
        let root = source.get_dictionary_mut(root_id).unwrap();
        root.set("Rotate", Object::Integer(90));
        root.set(
            "CropBox",
            vec![Object::Integer(0), Object::Integer(0), Object::Integer(100), Object::Integer(100)],
        );
        let cover = sample_pdf("cover", 1);

        let assembled = DocumentAssembler::new(&source)
            .with_cover(Some(&cover))
            .assemble(&selection(&[1]))
            .unwrap();
        let doc = assembled.document();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        assert_eq!(page_labels(doc), vec!["cover 1", "src 2"]);

        let cover_page = doc.get_dictionary(pages[0]).unwrap();
        for key in [&b"Rotate"[..], &b"CropBox"[..]] {
            assert!(!cover_page.has(key));
            assert!(find_inherited(doc, cover_page, key).is_none());
        }
        assert!(cover_page.has(b"MediaBox"));

        let source_page = doc.get_dictionary(pages[1]).unwrap();
        assert_eq!(source_page.get(b"Rotate").unwrap().as_i64().unwrap(), 90);
        assert!(source_page.has(b"CropBox"));
    }

    #[test]
    fn test_missing_page_tree() {
        let source = Document::with_version("1.5");
        let err = DocumentAssembler::new(&source)
            .assemble(&Selection::default())
            .unwrap_err();
        assert!(matches!(err, Error::Structure(_)));
        assert!(err.to_string().starts_with("Malformed PDF page tree: "));
    }

    #[test]
    fn test_empty_selection_without_cover() {
        let source = sample_pdf("src", 2);
        let assembled = DocumentAssembler::new(&source)
            .assemble(&Selection::default())
            .unwrap();
        assert_eq!(assembled.page_count(), 0);
    }

    #[tokio::test]
    async fn test_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.pdf");
        std::fs::write(&out, b"stale").unwrap();

        let source = sample_pdf("src", 3);
        let mut assembled = DocumentAssembler::new(&source)
            .assemble(&selection(&[2, 0]))
            .unwrap();
        assembled.save(&out).await.unwrap();

        let reloaded = load_pdf(&out).await.unwrap();
        assert_eq!(page_labels(&reloaded), vec!["src 3", "src 1"]);
    }

    #[tokio::test]
    async fn test_load_missing_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.pdf");
        let err = load_pdf(&path).await.unwrap_err();
        assert!(matches!(err, Error::FileNotFound(p) if p == path));
    }
}
