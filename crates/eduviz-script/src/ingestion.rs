//! Stage A — Ingestion (spec §4.4): turn raw source bytes into gateway
//! content parts, slicing oversized PDFs down to a representative subset.

use eduviz_gateway::ContentPart;
use eduviz_models::SourceMaterial;
use tracing::{debug, info};

use crate::error::{ScriptError, ScriptResult};

/// Page count above which a PDF is sliced to a representative subset
/// before being attached to the gateway call.
pub const PDF_PAGE_THRESHOLD: usize = 15;

pub struct Ingested {
    pub content: ContentPart,
    pub page_count: Option<usize>,
    pub content_length: usize,
}

/// Ingest a source document per its declared kind. `bytes` carries the raw
/// PDF or image payload read from `path`; text content is read directly
/// from the material itself.
pub fn ingest(material: &SourceMaterial, bytes: Option<&[u8]>) -> ScriptResult<Ingested> {
    match material {
        SourceMaterial::Pdf { .. } => {
            let bytes = bytes.ok_or(ScriptError::UnsupportedMaterial)?;
            ingest_pdf(bytes)
        }
        SourceMaterial::Image { mime_type, .. } => {
            let bytes = bytes.ok_or(ScriptError::UnsupportedMaterial)?;
            Ok(Ingested {
                content: ContentPart::Binary {
                    mime_type: mime_type.clone(),
                    data: bytes.to_vec(),
                },
                page_count: None,
                content_length: bytes.len(),
            })
        }
        SourceMaterial::Text { content } => Ok(Ingested {
            content: ContentPart::Text(content.clone()),
            page_count: None,
            content_length: content.len(),
        }),
    }
}

fn ingest_pdf(bytes: &[u8]) -> ScriptResult<Ingested> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| ScriptError::Pdf(e.to_string()))?;
    let pages = doc.get_pages();
    let page_count = pages.len();

    info!(page_count, "ingested PDF");

    if page_count <= PDF_PAGE_THRESHOLD {
        return Ok(Ingested {
            content: ContentPart::Binary {
                mime_type: "application/pdf".to_string(),
                data: bytes.to_vec(),
            },
            page_count: Some(page_count),
            content_length: bytes.len(),
        });
    }

    let keep = representative_pages(page_count);
    debug!(?keep, "slicing oversized PDF to representative pages");
    let slice = slice_pdf(&doc, &keep)?;

    Ok(Ingested {
        content: ContentPart::Binary {
            mime_type: "application/pdf".to_string(),
            data: slice,
        },
        page_count: Some(page_count),
        content_length: bytes.len(),
    })
}

/// First two, two around the middle, and last two 1-based page numbers
/// (spec §4.4 Stage A), deduplicated and clamped to the document's range.
fn representative_pages(page_count: usize) -> Vec<u32> {
    let mid = (page_count / 2).max(1);
    let mut pages: Vec<u32> = vec![
        1,
        2,
        mid.saturating_sub(1) as u32,
        mid as u32,
        (page_count - 1) as u32,
        page_count as u32,
    ]
    .into_iter()
    .filter(|&p| p >= 1 && p <= page_count as u32)
    .collect();
    pages.sort_unstable();
    pages.dedup();
    pages
}

fn slice_pdf(doc: &lopdf::Document, keep: &[u32]) -> ScriptResult<Vec<u8>> {
    let mut sliced = doc.clone();
    let all_pages: Vec<u32> = sliced.get_pages().keys().copied().collect();
    let to_delete: Vec<u32> = all_pages.into_iter().filter(|p| !keep.contains(p)).collect();
    sliced.delete_pages(&to_delete);

    let mut buffer = Vec::new();
    sliced
        .save_to(&mut buffer)
        .map_err(|e| ScriptError::Pdf(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn representative_pages_stays_within_bounds() {
        let pages = representative_pages(40);
        assert!(pages.iter().all(|&p| p >= 1 && p <= 40));
        assert!(pages.len() <= 6);
        let mut sorted = pages.clone();
        sorted.sort_unstable();
        assert_eq!(pages, sorted);
    }

    #[test]
    fn representative_pages_handles_small_documents() {
        let pages = representative_pages(3);
        assert!(pages.iter().all(|&p| p <= 3));
    }

    #[test]
    fn ingest_text_passes_through() {
        let material = SourceMaterial::Text {
            content: "hello world".to_string(),
        };
        let ingested = ingest(&material, None).unwrap();
        assert_eq!(ingested.content_length, 11);
        assert!(matches!(ingested.content, ContentPart::Text(_)));
    }

    #[test]
    fn ingest_pdf_without_bytes_errors() {
        let material = SourceMaterial::Pdf { path: "x.pdf".into() };
        assert!(ingest(&material, None).is_err());
    }
}
