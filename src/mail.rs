//! Raw mail → `IncomingMessage` conversion using mail-parser.

use std::path::Path;

use mail_parser::MessageParser;

use crate::error::MailError;
use crate::pipeline::types::IncomingMessage;

/// Parse a raw RFC 5322 message.
///
/// The plain-text body is preferred; an HTML-only message is reduced to
/// its text. A missing subject becomes the empty string.
pub fn parse_message(raw: &[u8]) -> Result<IncomingMessage, MailError> {
    let parsed = MessageParser::default()
        .parse(raw)
        .ok_or(MailError::Unparseable)?;

    let subject = parsed.subject().unwrap_or_default().to_string();
    let full_body = extract_text(&parsed);
    Ok(IncomingMessage { subject, full_body })
}

/// Read and parse a message file (e.g. an `.eml` export).
pub async fn read_message(path: &Path) -> Result<IncomingMessage, MailError> {
    let raw = tokio::fs::read(path).await.map_err(|source| MailError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_message(&raw)
}

fn extract_text(parsed: &mail_parser::Message) -> String {
    if let Some(text) = parsed.body_text(0) {
        return text.to_string();
    }
    if let Some(html) = parsed.body_html(0) {
        return strip_html(html.as_ref());
    }
    String::new()
}

/// Drop tags from HTML, keeping line structure.
pub fn strip_html(html: &str) -> String {
    let mut result = String::new();
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => result.push(ch),
            _ => {}
        }
    }
    result
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
