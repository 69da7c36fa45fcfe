use anyhow::{Context, Result};
use lopdf::{Dictionary, Object, ObjectId};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::model::{Document, Page, PageContent};
use crate::error::ExtractError;
use crate::parser::layout_builder::LayoutBuilder;
use crate::parser::text_extractor::ContentInterpreter;
use crate::parser::PdfBackend;

/// How deep indirect references are followed before giving up.
const MAX_REFERENCE_DEPTH: usize = 16;

/// Placement of a page's media box in user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageFrame {
    pub left: f64,
    pub bottom: f64,
    pub width: f64,
    pub height: f64,
}

impl PageFrame {
    /// Converts a user-space point to top-left-origin page points.
    pub fn to_top_left(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.left, self.bottom + self.height - y)
    }
}

pub struct PdfReader {
    path: PathBuf,
    inner: lopdf::Document,
    page_ids: Vec<ObjectId>,
}

impl std::fmt::Debug for PdfReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PdfReader")
            .field("path", &self.path)
            .field("page_count", &self.page_ids.len())
            .finish_non_exhaustive()
    }
}

impl PdfReader {
    pub fn new(path: PathBuf) -> Result<Self, ExtractError> {
        let inner = lopdf::Document::load(&path)?;
        // get_pages is keyed by 1-based page number, so values are in order.
        let page_ids = inner.get_pages().into_values().collect();
        Ok(Self {
            path,
            inner,
            page_ids,
        })
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    fn page_id(&self, page_idx: usize) -> Result<ObjectId, ExtractError> {
        self.page_ids.get(page_idx).copied().ok_or_else(|| {
            ExtractError::page(
                page_idx + 1,
                format!("page index out of range (0..{})", self.page_ids.len()),
            )
        })
    }

    pub fn page_frame(&self, page_idx: usize) -> Result<PageFrame, ExtractError> {
        let page = page_idx + 1;
        let page_id = self.page_id(page_idx)?;
        let media_box = resolve_inherited(&self.inner, page_id, b"MediaBox")
            .ok_or_else(|| ExtractError::page(page, "MediaBox not found on page or ancestors"))?;
        let values = resolve(&self.inner, media_box)
            .as_array()
            .map_err(|_| ExtractError::page(page, "MediaBox is not an array"))?
            .iter()
            .map(|obj| number(resolve(&self.inner, obj)))
            .collect::<Option<Vec<f64>>>()
            .ok_or_else(|| ExtractError::page(page, "MediaBox holds a non-numeric entry"))?;
        let [x0, y0, x1, y1] = values[..] else {
            return Err(ExtractError::page(
                page,
                format!("expected 4 MediaBox entries, got {}", values.len()),
            ));
        };
        Ok(PageFrame {
            left: x0.min(x1),
            bottom: y0.min(y1),
            width: (x1 - x0).abs(),
            height: (y1 - y0).abs(),
        })
    }

    /// Words, images, chars, lines and links for one page.
    pub fn page_content(&self, page_idx: usize, frame: &PageFrame) -> Result<PageContent, ExtractError> {
        let page = page_idx + 1;
        let page_id = self.page_id(page_idx)?;
        let page_dict = self
            .inner
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| ExtractError::page(page, format!("failed to get page dictionary: {e}")))?;

        let bytes = content_bytes(&self.inner, page_dict, page)?;
        let resources = resolve_inherited(&self.inner, page_id, b"Resources")
            .and_then(|obj| resolve(&self.inner, obj).as_dict().ok());

        let mut interpreter = ContentInterpreter::new(&self.inner, *frame, page);
        interpreter.run(resources, &bytes)?;
        let (chars, image_boxes) = interpreter.finish();

        let layout = LayoutBuilder::default();
        let words = layout.words(&chars);
        let lines = layout.lines(&words);
        let images = image_boxes
            .into_iter()
            .map(crate::core::model::GlyphBox::image)
            .collect();

        Ok(PageContent {
            words,
            images,
            chars,
            lines,
            hyperlinks: self.hyperlinks(page_dict),
        })
    }

    /// URI targets of the page's link annotations.
    fn hyperlinks(&self, page_dict: &Dictionary) -> Vec<String> {
        let Some(annots) = page_dict
            .get(b"Annots")
            .ok()
            .and_then(|obj| resolve(&self.inner, obj).as_array().ok())
        else {
            return Vec::new();
        };

        annots
            .iter()
            .filter_map(|entry| resolve(&self.inner, entry).as_dict().ok())
            .filter(|annot| {
                matches!(
                    annot.get(b"Subtype").ok().and_then(|obj| obj.as_name().ok()),
                    Some(b"Link")
                )
            })
            .filter_map(|annot| {
                let action = resolve(&self.inner, annot.get(b"A").ok()?).as_dict().ok()?;
                if action.get(b"S").ok()?.as_name().ok()? != b"URI" {
                    return None;
                }
                string_value(resolve(&self.inner, action.get(b"URI").ok()?))
            })
            .filter(|uri| !uri.is_empty())
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfBackend;

impl LopdfBackend {
    pub fn new() -> Self {
        Self
    }
}

impl PdfBackend for LopdfBackend {
    fn load(&self, pdf_path: &Path) -> Result<Document> {
        let reader = PdfReader::new(pdf_path.to_path_buf())
            .with_context(|| format!("failed to open PDF: {}", pdf_path.display()))?;

        let mut pages = Vec::with_capacity(reader.page_count());
        for page_idx in 0..reader.page_count() {
            let number = page_idx + 1;
            let page = match reader.page_frame(page_idx) {
                Ok(frame) => Page {
                    number,
                    width: frame.width,
                    height: frame.height,
                    content: reader.page_content(page_idx, &frame),
                },
                Err(err) => Page {
                    number,
                    width: 0.0,
                    height: 0.0,
                    content: Err(err),
                },
            };
            if let Err(err) = &page.content {
                debug!(page = number, error = %err, "page extraction failed");
            }
            pages.push(page);
        }

        Ok(Document {
            path: pdf_path.to_path_buf(),
            pages,
        })
    }
}

/// Follows indirect references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a lopdf::Document, obj: &'a Object) -> &'a Object {
    let mut current = obj;
    for _ in 0..MAX_REFERENCE_DEPTH {
        match current {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => current = next,
                Err(_) => return current,
            },
            _ => return current,
        }
    }
    current
}

pub(crate) fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(*f as f64),
        _ => None,
    }
}

pub(crate) fn string_value(obj: &Object) -> Option<String> {
    match obj {
        Object::String(bytes, _) => Some(decode_text_string(bytes)),
        Object::Name(name) => Some(String::from_utf8_lossy(name).into_owned()),
        _ => None,
    }
}

/// PDF text strings are UTF-16BE with a BOM or PDFDocEncoding, read here as Latin-1.
fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from(pair[0]) << 8 | u16::from(pair[1]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|b| char::from(*b)).collect()
    }
}

/// Looks a key up on the page, walking `/Parent` links for inherited attributes.
fn resolve_inherited<'a>(doc: &'a lopdf::Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut current = page_id;
    for _ in 0..MAX_REFERENCE_DEPTH {
        let dict = doc.get_object(current).and_then(Object::as_dict).ok()?;
        if let Ok(value) = dict.get(key) {
            return Some(value);
        }
        current = dict.get(b"Parent").and_then(Object::as_reference).ok()?;
    }
    None
}

pub(crate) fn stream_bytes(stream: &lopdf::Stream) -> Result<Vec<u8>, lopdf::Error> {
    if stream.dict.get(b"Filter").is_ok() {
        stream.decompressed_content()
    } else {
        Ok(stream.content.clone())
    }
}

fn content_bytes(doc: &lopdf::Document, page_dict: &Dictionary, page: usize) -> Result<Vec<u8>, ExtractError> {
    let Ok(contents) = page_dict.get(b"Contents") else {
        return Ok(Vec::new());
    };

    let streams: Vec<&Object> = match resolve(doc, contents) {
        Object::Array(items) => items.iter().map(|item| resolve(doc, item)).collect(),
        other => vec![other],
    };

    let mut content = Vec::new();
    for obj in streams {
        let stream = obj
            .as_stream()
            .map_err(|_| ExtractError::page(page, "/Contents entry is not a stream"))?;
        let bytes = stream_bytes(stream).map_err(|e| ExtractError::Content {
            page,
            reason: format!("failed to decompress content stream: {e}"),
        })?;
        if !content.is_empty() {
            content.push(b'\n');
        }
        content.extend_from_slice(&bytes);
    }
    Ok(content)
}
