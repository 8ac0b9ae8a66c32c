//! Reading and writing PDF outlines (bookmarks).

use std::collections::{HashMap, HashSet};
use std::path::Path;

use lopdf::{dictionary, Dictionary, Document as LopdfDocument, Object, ObjectId, StringFormat};

use crate::detect::pdf_version_of_file;
use crate::error::{Error, Result};
use crate::model::{Outline, OutlineItem, TocEntry, UNRESOLVED_PAGE};

/// Maximum outline depth followed when reading.
const MAX_OUTLINE_DEPTH: u32 = 64;

/// What [`write_bookmarks`] did with the entries it was given.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteReport {
    /// Bookmarks written
    pub written: usize,

    /// Entries without a resolved page
    pub skipped_unresolved: usize,

    /// Entries pointing past the last page
    pub skipped_out_of_range: usize,
}

impl WriteReport {
    /// Total number of entries not written.
    pub fn skipped(&self) -> usize {
        self.skipped_unresolved + self.skipped_out_of_range
    }
}

/// Replace the outline of `doc` with one built from `entries`.
///
/// Entries are nested by level (see [`Outline::from_entries`]). An empty
/// result removes the outline from the catalog.
pub fn write_bookmarks(doc: &mut LopdfDocument, entries: &[TocEntry]) -> Result<WriteReport> {
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    let page_count = page_ids.len() as i64;
    let mut report = WriteReport::default();

    let usable: Vec<TocEntry> = entries
        .iter()
        .filter(|entry| {
            if entry.is_unresolved() {
                report.skipped_unresolved += 1;
                false
            } else if entry.page < 1 || entry.page > page_count {
                log::warn!("Skipping bookmark {:?}: page {} does not exist", entry.title, entry.page);
                report.skipped_out_of_range += 1;
                false
            } else {
                true
            }
        })
        .cloned()
        .collect();

    let outline = Outline::from_entries(&usable);
    let catalog_id = catalog_id(doc)?;

    if outline.is_empty() {
        catalog_mut(doc, catalog_id)?.remove(b"Outlines");
        log::info!("No bookmarks to write");
        return Ok(report);
    }

    let root_id = doc.new_object_id();
    let (first, last) = write_items(doc, &outline.items, root_id, &page_ids)?;
    report.written = outline.total_items();

    doc.objects.insert(
        root_id,
        Object::Dictionary(dictionary! {
            "Type" => "Outlines",
            "First" => first,
            "Last" => last,
            "Count" => report.written as i64,
        }),
    );

    let catalog = catalog_mut(doc, catalog_id)?;
    catalog.set("Outlines", root_id);
    catalog.set("PageMode", "UseOutlines");

    log::info!(
        "Wrote {} bookmarks ({} skipped)",
        report.written,
        report.skipped()
    );
    Ok(report)
}

/// Write a sibling list, returning the ids of its first and last items.
fn write_items(
    doc: &mut LopdfDocument,
    items: &[OutlineItem],
    parent: ObjectId,
    page_ids: &[ObjectId],
) -> Result<(ObjectId, ObjectId)> {
    let ids: Vec<ObjectId> = items.iter().map(|_| doc.new_object_id()).collect();

    for (idx, item) in items.iter().enumerate() {
        let page_id = page_ids
            .get(item.page as usize - 1)
            .copied()
            .ok_or_else(|| Error::Bookmark(format!("no page {} for {:?}", item.page, item.title)))?;

        let mut dict = dictionary! {
            "Title" => text_string(&item.title),
            "Parent" => parent,
            "Dest" => vec![page_id.into(), "Fit".into()],
        };
        if idx > 0 {
            dict.set("Prev", ids[idx - 1]);
        }
        if let Some(next) = ids.get(idx + 1) {
            dict.set("Next", *next);
        }
        if !item.children.is_empty() {
            let (first, last) = write_items(doc, &item.children, ids[idx], page_ids)?;
            dict.set("First", first);
            dict.set("Last", last);
            dict.set("Count", item.descendant_count() as i64);
        }
        doc.objects.insert(ids[idx], Object::Dictionary(dict));
    }

    match (ids.first(), ids.last()) {
        (Some(first), Some(last)) => Ok((*first, *last)),
        _ => Err(Error::Bookmark("empty outline level".to_string())),
    }
}

/// Encode a title as a PDF text string: literal for ASCII, UTF-16BE otherwise.
fn text_string(title: &str) -> Object {
    if title.is_ascii() {
        return Object::string_literal(title);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in title.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

fn catalog_id(doc: &LopdfDocument) -> Result<ObjectId> {
    doc.trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| Error::Bookmark("document has no catalog".to_string()))
}

fn catalog_mut(doc: &mut LopdfDocument, id: ObjectId) -> Result<&mut Dictionary> {
    doc.get_object_mut(id)
        .and_then(Object::as_dict_mut)
        .map_err(|_| Error::Bookmark("catalog is not a dictionary".to_string()))
}

/// Load `input`, replace its outline, and save to `output`.
pub fn add_bookmarks<P: AsRef<Path>, Q: AsRef<Path>>(
    input: P,
    output: Q,
    entries: &[TocEntry],
) -> Result<WriteReport> {
    let input = input.as_ref();
    let output = output.as_ref();
    pdf_version_of_file(input)?;

    let mut doc = LopdfDocument::load(input)?;
    if doc.is_encrypted() {
        return Err(Error::Encrypted);
    }
    let report = write_bookmarks(&mut doc, entries)?;
    prune_unreferenced(&mut doc);

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    doc.save(output)?;
    log::info!("Saved {}", output.display());
    Ok(report)
}

/// Drop objects no longer reachable from the trailer, such as the items of
/// a replaced outline.
pub fn prune_unreferenced(doc: &mut LopdfDocument) {
    let pruned = doc.prune_objects();
    if !pruned.is_empty() {
        log::debug!("Pruned {} unreferenced objects", pruned.len());
    }
}

/// Read the existing outline of a PDF file as flat entries.
pub fn read_bookmarks<P: AsRef<Path>>(path: P) -> Result<Vec<TocEntry>> {
    let path = path.as_ref();
    pdf_version_of_file(path)?;
    let doc = LopdfDocument::load(path)?;
    Ok(outline_entries(&doc))
}

/// Flatten the outline of a loaded document.
///
/// Level is depth + 1. Destinations that do not resolve to a page give
/// [`UNRESOLVED_PAGE`].
pub fn outline_entries(doc: &LopdfDocument) -> Vec<TocEntry> {
    let reader = OutlineReader::new(doc);
    let mut entries = Vec::new();

    let first = doc
        .catalog()
        .ok()
        .and_then(|catalog| catalog.get(b"Outlines").ok())
        .and_then(|outlines| reader.dict(outlines))
        .and_then(|root| root.get(b"First").ok())
        .and_then(|first| first.as_reference().ok());

    if let Some(first) = first {
        let mut visited = HashSet::new();
        reader.walk(first, 1, &mut visited, &mut entries);
    }
    entries
}

struct OutlineReader<'a> {
    doc: &'a LopdfDocument,
    pages: HashMap<ObjectId, u32>,
}

impl<'a> OutlineReader<'a> {
    fn new(doc: &'a LopdfDocument) -> Self {
        let pages = doc
            .get_pages()
            .into_iter()
            .map(|(num, id)| (id, num))
            .collect();
        Self { doc, pages }
    }

    fn dict(&self, obj: &'a Object) -> Option<&'a Dictionary> {
        match obj {
            Object::Reference(id) => self.doc.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    fn walk(
        &self,
        first: ObjectId,
        level: u32,
        visited: &mut HashSet<ObjectId>,
        entries: &mut Vec<TocEntry>,
    ) {
        if level > MAX_OUTLINE_DEPTH {
            return;
        }

        let mut current = Some(first);
        while let Some(id) = current {
            if !visited.insert(id) {
                log::warn!("Outline cycle at object {:?}", id);
                return;
            }
            let Ok(item) = self.doc.get_dictionary(id) else {
                return;
            };

            if let Some(title) = decode_text(item.get(b"Title").ok()) {
                let page = self
                    .destination(item)
                    .map_or(UNRESOLVED_PAGE, i64::from);
                entries.push(TocEntry::new(title, page, level));
            }

            if let Some(child) = item.get(b"First").ok().and_then(|o| o.as_reference().ok()) {
                self.walk(child, level + 1, visited, entries);
            }
            current = item.get(b"Next").ok().and_then(|o| o.as_reference().ok());
        }
    }

    fn destination(&self, item: &'a Dictionary) -> Option<u32> {
        if let Ok(dest) = item.get(b"Dest") {
            return self.resolve(dest);
        }
        let action = self.dict(item.get(b"A").ok()?)?;
        self.resolve(action.get(b"D").ok()?)
    }

    fn resolve(&self, dest: &Object) -> Option<u32> {
        let dest = match dest {
            Object::Reference(id) => self.doc.get_object(*id).ok()?,
            other => other,
        };
        let first = dest.as_array().ok()?.first()?;
        self.pages.get(&first.as_reference().ok()?).copied()
    }
}

/// Decode a PDF text string (UTF-16BE with BOM, else UTF-8 or Latin-1).
fn decode_text(obj: Option<&Object>) -> Option<String> {
    let Object::String(bytes, _) = obj? else {
        return None;
    };
    let text = if bytes.starts_with(&[0xFE, 0xFF]) {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        String::from_utf8(bytes.clone()).unwrap_or_else(|_| bytes.iter().map(|&b| b as char).collect())
    };
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}
