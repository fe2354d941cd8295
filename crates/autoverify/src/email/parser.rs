//! Raw message decoding into the fields the poller needs.

use log::debug;
use mail_parser::decoders::charsets::map::charset_decoder;
use mail_parser::{Message, MessageParser, MessagePart, MimeHeaders, PartType};

use super::error::{EmailError, Result};

/// A decoded message. Missing headers are empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMessage {
    pub subject: String,
    pub sender: String,
    pub date: String,
    /// All `text/plain` parts joined in source order, or the first
    /// `text/html` part when there is no plain text.
    pub body: String,
    pub message_id: Option<String>,
}

/// Parses a raw RFC 822 message.
///
/// Never fails: a message that cannot be parsed at all yields an empty
/// `ParsedMessage`, and a body part that cannot be decoded contributes an
/// empty string.
pub fn parse(raw: &[u8]) -> ParsedMessage {
    let Some(message) = MessageParser::default().parse(raw) else {
        debug!("Unparseable message ({} bytes)", raw.len());
        return ParsedMessage::default();
    };

    ParsedMessage {
        subject: message.subject().unwrap_or_default().to_string(),
        sender: message
            .from()
            .and_then(|addr| addr.first().map(format_address))
            .unwrap_or_default(),
        date: message.date().map(|d| d.to_rfc3339()).unwrap_or_default(),
        body: extract_body(&message),
        message_id: message.message_id().map(|s| s.to_string()),
    }
}

fn extract_body(message: &Message) -> String {
    let mut plain = String::new();
    let mut has_plain = false;
    let mut first_html: Option<&MessagePart> = None;

    for part in message.parts.iter() {
        match text_subtype(part).as_deref() {
            Some("plain") => {
                has_plain = true;
                plain.push_str(&decode_or_empty(part));
            }
            Some("html") if first_html.is_none() => first_html = Some(part),
            _ => {}
        }
    }

    if has_plain {
        plain
    } else {
        first_html.map(decode_or_empty).unwrap_or_default()
    }
}

/// Returns the lowercased subtype of a `text/*` part. Parts without a
/// Content-Type header default to `text/plain`.
fn text_subtype(part: &MessagePart) -> Option<String> {
    match part.content_type() {
        Some(ct) if ct.ctype().eq_ignore_ascii_case("text") => Some(
            ct.subtype()
                .map(|s| s.to_ascii_lowercase())
                .unwrap_or_else(|| "plain".to_string()),
        ),
        Some(_) => None,
        None => match part.body {
            PartType::Text(_) => Some("plain".to_string()),
            PartType::Html(_) => Some("html".to_string()),
            _ => None,
        },
    }
}

fn decode_or_empty(part: &MessagePart) -> String {
    decode_text_part(part).unwrap_or_else(|e| {
        debug!("Skipping undecodable body part: {}", e);
        String::new()
    })
}

/// Decodes one body part to text.
///
/// `mail-parser` has already transfer-decoded and charset-converted the
/// text parts. It falls back to lossy UTF-8 for a charset it does not know,
/// so such parts are rejected here rather than returned as garbage. Invalid
/// bytes in a known charset still become replacement characters.
pub fn decode_text_part(part: &MessagePart) -> Result<String> {
    let charset = part
        .content_type()
        .and_then(|ct| ct.attribute("charset"))
        .unwrap_or("utf-8");

    match &part.body {
        PartType::Text(text) | PartType::Html(text) => {
            ensure_supported(charset)?;
            Ok(text.to_string())
        }
        PartType::Binary(data) | PartType::InlineBinary(data) => {
            if is_utf8_compatible(charset) {
                Ok(String::from_utf8_lossy(data).into_owned())
            } else {
                let decode = charset_decoder(charset.as_bytes())
                    .ok_or_else(|| EmailError::UnsupportedCharset(charset.to_string()))?;
                Ok(decode(data))
            }
        }
        PartType::Message(_) => Err(EmailError::NotText("embedded message".to_string())),
        _ => Err(EmailError::NotText("multipart container".to_string())),
    }
}

fn ensure_supported(charset: &str) -> Result<()> {
    if is_utf8_compatible(charset) || charset_decoder(charset.as_bytes()).is_some() {
        Ok(())
    } else {
        Err(EmailError::UnsupportedCharset(charset.to_string()))
    }
}

fn is_utf8_compatible(charset: &str) -> bool {
    matches!(
        charset.to_ascii_lowercase().as_str(),
        "utf-8" | "utf8" | "us-ascii" | "ascii"
    )
}

/// Formats an address as "Name <email@example.com>", or just the address.
fn format_address(addr: &mail_parser::Addr) -> String {
    if let Some(name) = addr.name() {
        format!("{} <{}>", name, addr.address().unwrap_or_default())
    } else {
        addr.address().unwrap_or_default().to_string()
    }
}
