//! MIME walking: turn a raw message into the attachment candidates it carries.

use mail_parser::decoders::base64::base64_decode;
use mail_parser::decoders::quoted_printable::quoted_printable_decode;
use mail_parser::{Encoding, Message, MessageParser, MessagePart, MimeHeaders, PartType};
use tracing::{debug, trace};

use crate::error::{GrabError, Result};
use crate::model::attachment::{AttachmentCandidate, Payload};
use crate::parser::filename::sanitize_filename;

/// Maximum nesting of embedded `message/rfc822` parts we descend into.
const MAX_DEPTH: usize = 10;

/// Parse a complete raw message and list its attachment candidates in document order.
///
/// A part becomes a candidate when it is a leaf (not a multipart
/// container), carries a `Content-Disposition` header and declares a
/// filename that survives sanitisation. Embedded messages are walked
/// like containers so files attached to forwarded mail are found too.
pub fn parse_candidates(raw_message: &[u8]) -> Result<Vec<AttachmentCandidate>> {
    let message_bytes = skip_from_line(raw_message);
    if message_bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(GrabError::Parse("message is empty".into()));
    }

    let msg = MessageParser::default()
        .parse(message_bytes)
        .ok_or_else(|| GrabError::Parse("not a MIME message".into()))?;

    let mut candidates = Vec::new();
    let mut position = 0usize;
    collect_candidates(&msg, 0, &mut position, &mut candidates);
    Ok(candidates)
}

fn collect_candidates(
    msg: &Message<'_>,
    depth: usize,
    position: &mut usize,
    out: &mut Vec<AttachmentCandidate>,
) {
    for part in &msg.parts {
        let index = *position;
        *position += 1;

        match &part.body {
            PartType::Multipart(_) => continue,
            PartType::Message(inner) => {
                if depth + 1 < MAX_DEPTH {
                    collect_candidates(inner, depth + 1, position, out);
                } else {
                    debug!(depth, "Embedded message nested too deeply, not descending");
                }
                continue;
            }
            _ => {}
        }

        if let Some(candidate) = candidate_from_part(msg, part, index) {
            out.push(candidate);
        }
    }
}

/// Build a candidate from a leaf part of `msg`, or `None` if it is not an attachment.
fn candidate_from_part(
    msg: &Message<'_>,
    part: &MessagePart<'_>,
    index: usize,
) -> Option<AttachmentCandidate> {
    // Parts without a disposition header are inline bodies.
    if part.content_disposition().is_none() {
        return None;
    }

    let Some(declared) = part.attachment_name() else {
        trace!(part = index, "Disposition without filename, skipping");
        return None;
    };
    let Some(filename) = sanitize_filename(declared) else {
        debug!(part = index, declared = ?declared, "Filename empty after sanitising, skipping");
        return None;
    };

    let payload = if part.is_encoding_problem {
        Payload::Undecodable
    } else {
        match transfer_decoded(msg, part) {
            Some(bytes) if bytes.is_empty() => Payload::Empty,
            Some(bytes) => Payload::Bytes(bytes),
            None => Payload::Undecodable,
        }
    };

    Some(AttachmentCandidate {
        part_index: index,
        declared_name: declared.to_string(),
        filename,
        content_type: content_type_of(part),
        payload,
    })
}

/// The part body with only its transfer encoding undone.
///
/// Binary parts are taken as the parser decoded them. Text parts are
/// re-decoded from the raw message, since the parser has already
/// converted their charset to UTF-8.
fn transfer_decoded(msg: &Message<'_>, part: &MessagePart<'_>) -> Option<Vec<u8>> {
    if let PartType::Binary(bytes) | PartType::InlineBinary(bytes) = &part.body {
        return Some(bytes.to_vec());
    }
    if part.offset_end <= part.offset_body {
        return Some(Vec::new());
    }

    // Offsets are relative to the message that owns the part.
    let raw = msg.raw_message.get(part.offset_body..part.offset_end)?;
    match part.encoding {
        Encoding::Base64 => base64_decode(raw),
        Encoding::QuotedPrintable => quoted_printable_decode(raw),
        Encoding::None => Some(raw.to_vec()),
    }
}

fn content_type_of(part: &MessagePart<'_>) -> String {
    part.content_type()
        .map(|ct: &mail_parser::ContentType| {
            let main = ct.ctype();
            match ct.subtype() {
                Some(sub) => format!("{main}/{sub}"),
                None => main.to_string(),
            }
        })
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Skip the `From ` separator line that mbox-style `.eml` dumps start with.
fn skip_from_line(data: &[u8]) -> &[u8] {
    // Handle BOM
    let data = if data.starts_with(&[0xEF, 0xBB, 0xBF]) {
        &data[3..]
    } else {
        data
    };

    if data.starts_with(b"From ") {
        if let Some(pos) = data.iter().position(|&b| b == b'\n') {
            return &data[pos + 1..];
        }
    }
    data
}
