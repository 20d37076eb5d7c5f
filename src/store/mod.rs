//! Attachment storage: de-duplication registry and no-clobber file writer.

pub mod registry;
pub mod writer;
