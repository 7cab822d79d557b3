use crate::error::Result;
use lopdf::Document;

/// Number of pages in an in-memory PDF.
pub fn page_count(bytes: &[u8]) -> Result<u32> {
    let doc = Document::load_mem(bytes)?;
    Ok(doc.get_pages().len() as u32)
}
