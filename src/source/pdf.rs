//! [`PageSource`] backed by lopdf.

use std::io::Read;
use std::path::Path;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::PageSource;
use crate::detect::pdf_version_of_file;
use crate::error::{Error, Result};
use crate::model::PageImage;

/// Limit on `/Parent` hops when looking up inherited page resources.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Concrete [`PageSource`] backed by `lopdf::Document`.
pub struct LopdfSource {
    doc: LopdfDocument,
    page_ids: Vec<ObjectId>,
}

impl LopdfSource {
    /// Load from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let version = pdf_version_of_file(path)?;
        log::debug!("Opening {} (PDF {})", path.display(), version);

        let doc = LopdfDocument::load(path).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    /// Load from an in-memory byte slice.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data).map_err(|e| match e {
            lopdf::Error::Decryption(_) => Error::Encrypted,
            _ => Error::from(e),
        })?;
        Self::from_document(doc)
    }

    /// Load from a reader.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::from_bytes(&data)
    }

    /// Wrap an already loaded document.
    pub fn from_document(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::Encrypted);
        }
        let page_ids = doc.get_pages().into_values().collect();
        Ok(Self { doc, page_ids })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn document(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Give back the underlying document, e.g. to write bookmarks into it.
    pub fn into_document(self) -> LopdfDocument {
        self.doc
    }

    fn page_id(&self, index: u32) -> Result<ObjectId> {
        self.page_ids
            .get(index as usize)
            .copied()
            .ok_or(Error::PageOutOfRange(index + 1, self.page_count()))
    }

    /// Resources of a page, following `/Parent` inheritance.
    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        let mut current = self.doc.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(resources) = current.get(b"Resources") {
                return self.resolve_dict(resources);
            }
            let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
            current = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match obj {
            Object::Reference(r) => self.doc.get_dictionary(*r).ok(),
            Object::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Image XObjects of a page that a vision model can read as-is.
    fn embedded_images(&self, page_id: ObjectId) -> Vec<PageImage> {
        let Some(xobjects) = self
            .page_resources(page_id)
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|obj| self.resolve_dict(obj))
        else {
            return Vec::new();
        };

        xobjects
            .iter()
            .filter_map(|(_, obj)| obj.as_reference().ok())
            .filter_map(|id| self.doc.get_object(id).ok())
            .filter_map(|obj| match obj {
                Object::Stream(stream) => image_from_stream(stream),
                _ => None,
            })
            .collect()
    }
}

/// Convert an image XObject stream into a [`PageImage`] when its encoding is
/// a self-contained image format.
fn image_from_stream(stream: &lopdf::Stream) -> Option<PageImage> {
    let dict = &stream.dict;
    if dict.get(b"Subtype").ok()?.as_name_str().ok()? != "Image" {
        return None;
    }

    let filter = dict.get(b"Filter").ok()?;
    let filters: Vec<&str> = match filter {
        Object::Name(_) => vec![filter.as_name_str().ok()?],
        Object::Array(arr) => arr.iter().filter_map(|f| f.as_name_str().ok()).collect(),
        _ => return None,
    };

    let mime_type = match filters.as_slice() {
        ["DCTDecode"] => "image/jpeg",
        ["JPXDecode"] => "image/jp2",
        _ => return None,
    };

    let mut image = PageImage::new(stream.content.clone(), mime_type);
    let width = dict.get(b"Width").ok().and_then(|w| w.as_i64().ok());
    let height = dict.get(b"Height").ok().and_then(|h| h.as_i64().ok());
    if let (Some(w), Some(h)) = (width, height) {
        if let (Ok(w), Ok(h)) = (u32::try_from(w), u32::try_from(h)) {
            image = image.with_dimensions(w, h);
        }
    }
    Some(image)
}

impl PageSource for LopdfSource {
    fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    fn page_text(&self, index: u32) -> Result<String> {
        self.page_id(index)?;
        self.doc
            .extract_text(&[index + 1])
            .map_err(|e| Error::TextExtract(format!("Page {}: {}", index + 1, e)))
    }

    /// Returns the dominant embedded image of the page.
    ///
    /// Scanned books carry one JPEG per page, which is exactly what the
    /// model needs. Vector pages have no such image and yield
    /// [`Error::ImageUnavailable`]. Embedded images are returned at their
    /// native resolution regardless of `dpi`.
    fn page_image(&self, index: u32, dpi: u32) -> Result<PageImage> {
        let page_id = self.page_id(index)?;
        let image = self
            .embedded_images(page_id)
            .into_iter()
            .max_by_key(PageImage::area)
            .ok_or(Error::ImageUnavailable(index + 1))?;

        log::debug!(
            "Page {}: using embedded {} ({} bytes, requested {} dpi)",
            index + 1,
            image.mime_type,
            image.size(),
            dpi
        );
        Ok(image)
    }
}
