//! Attachment candidates.
//!
//! A candidate only lives while its message is being processed; nothing
//! here is persisted.

/// Decoded content of a candidate part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Transfer-decoded bytes, never empty.
    Bytes(Vec<u8>),
    /// The part decoded to zero bytes.
    Empty,
    /// The transfer encoding was broken and the parser could not decode it.
    Undecodable,
}

impl Payload {
    /// Decoded bytes, if there is anything to store.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(data) => Some(data),
            Self::Empty | Self::Undecodable => None,
        }
    }
}

/// A leaf MIME part that carries a disposition header and a usable filename.
#[derive(Debug, Clone)]
pub struct AttachmentCandidate {
    /// Position of the part within the message, in document order.
    pub part_index: usize,

    /// Filename exactly as declared in the headers (untrusted).
    pub declared_name: String,

    /// Filename after sanitisation; safe as a single path component.
    pub filename: String,

    /// MIME content type (e.g. `"image/jpeg"`, `"application/pdf"`).
    pub content_type: String,

    /// Decoded payload.
    pub payload: Payload,
}

impl AttachmentCandidate {
    /// Decoded size in bytes (0 when there is nothing to store).
    pub fn size(&self) -> u64 {
        self.payload.bytes().map_or(0, |b| b.len() as u64)
    }
}
