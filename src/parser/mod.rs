//! Message parsing: MIME walking and declared-filename handling.

pub mod filename;
pub mod mime;
