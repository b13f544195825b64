//! Email extraction: RFC 822 messages (EML), mbox archives and Outlook MSG files.
//!
//! EML and mbox are parsed with `mail-parser`; MSG with `msg_parser`. All three
//! produce an [`EmailMessage`] with one [`Message`] per mail. A `multipart/digest`
//! expands into its embedded `message/rfc822` parts.

use mail_parser::{Addr, Address, MessageParser, MimeHeaders, PartType};

use crate::core::config::ExtractionConfig;
use crate::core::extractor::is_supported_bytes;
use crate::core::format::FormatTag;
use crate::core::mime::{guess_mime_for_filename, tag_for_mime};
use crate::extraction::html::html_to_text;
use crate::extraction::normalize::normalize_text;
use crate::types::{Attachment, EmailHeaders, EmailMessage, Message, Metadata};
use crate::{Result, SharetextError};

pub fn read_eml(bytes: &[u8]) -> Result<EmailMessage> {
    read_eml_with_config(bytes, &ExtractionConfig::default())
}

/// Extract an RFC 822 message.
///
/// # Errors
///
/// `CorruptContainer` when the buffer is empty or has no parsable header block.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_eml_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<EmailMessage> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(SharetextError::corrupt_container("email content is empty"));
    }
    let parsed = MessageParser::default()
        .parse(bytes)
        .ok_or_else(|| SharetextError::corrupt_container("failed to parse EML: invalid email format"))?;
    Ok(email_content(FormatTag::Eml, expand_message(&parsed, config)))
}

pub fn read_mbox(bytes: &[u8]) -> Result<EmailMessage> {
    read_mbox_with_config(bytes, &ExtractionConfig::default())
}

/// Extract every message of an mbox archive.
///
/// Messages that fail to parse are skipped.
///
/// # Errors
///
/// `CorruptContainer` when the archive has no `From ` separator line.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_mbox_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<EmailMessage> {
    let chunks = split_mbox(bytes);
    if chunks.is_empty() {
        return Err(SharetextError::corrupt_container("mbox archive has no \"From \" separator"));
    }

    let parser = MessageParser::default();
    let mut messages = Vec::new();
    for (idx, chunk) in chunks.iter().enumerate() {
        match parser.parse(chunk.as_slice()) {
            Some(parsed) => messages.extend(expand_message(&parsed, config)),
            None => tracing::debug!("Skipping unparsable mbox message {}", idx + 1),
        }
    }
    Ok(email_content(FormatTag::Mbox, messages))
}

pub fn read_msg(bytes: &[u8]) -> Result<EmailMessage> {
    read_msg_with_config(bytes, &ExtractionConfig::default())
}

/// Extract an Outlook MSG file.
///
/// # Errors
///
/// `CorruptContainer` when the compound file is not an Outlook message.
#[tracing::instrument(skip_all, fields(size = bytes.len()))]
pub fn read_msg_with_config(bytes: &[u8], config: &ExtractionConfig) -> Result<EmailMessage> {
    let outlook = msg_parser::Outlook::from_slice(bytes)
        .map_err(|e| SharetextError::corrupt_container(format!("failed to parse MSG file: {}", e)))?;

    let person = |name: &str, email: &str| format_mailbox(Some(name), Some(email));
    let headers = EmailHeaders {
        from: person(&outlook.sender.name, &outlook.sender.email),
        to: outlook.to.iter().filter_map(|p| person(&p.name, &p.email)).collect(),
        cc: outlook.cc.iter().filter_map(|p| person(&p.name, &p.email)).collect(),
        bcc: outlook
            .bcc
            .split(';')
            .map(str::trim)
            .filter(|bcc| !bcc.is_empty())
            .map(String::from)
            .collect(),
        subject: non_empty(&outlook.subject),
        date: non_empty(&outlook.headers.date),
        message_id: non_empty(outlook.headers.message_id.trim_matches(['<', '>'])),
    };

    let attachments = outlook
        .attachments
        .iter()
        .enumerate()
        .filter_map(|(idx, att)| {
            let data = match hex::decode(&att.payload) {
                Ok(data) => data,
                Err(e) => {
                    tracing::debug!("Skipping MSG attachment {} with undecodable payload: {}", idx + 1, e);
                    return None;
                }
            };
            let filename = [&att.file_name, &att.display_name]
                .into_iter()
                .find(|name| !name.trim().is_empty())
                .cloned()
                .unwrap_or_else(|| format!("attachment{}{}", idx + 1, att.extension));
            Some(attachment(filename, non_empty(&att.mime_tag), data))
        })
        .collect();

    let message = Message {
        headers,
        body: normalize_text(outlook.body.trim(), config),
        body_html: None,
        attachments,
    };
    Ok(email_content(FormatTag::Msg, vec![message]))
}

fn email_content(format: FormatTag, messages: Vec<Message>) -> EmailMessage {
    let metadata = messages
        .first()
        .map(|first| Metadata {
            title: first.headers.subject.clone(),
            subject: first.headers.subject.clone(),
            author: first.headers.from.clone(),
            created: first.headers.date.clone(),
            ..Default::default()
        })
        .unwrap_or_default();
    EmailMessage {
        format,
        metadata,
        messages,
    }
}

fn is_digest(message: &mail_parser::Message) -> bool {
    message.root_part().content_type().is_some_and(|content_type| {
        content_type.ctype().eq_ignore_ascii_case("multipart")
            && content_type
                .subtype()
                .is_some_and(|subtype| subtype.eq_ignore_ascii_case("digest"))
    })
}

/// A digest becomes its embedded messages; anything else is a single message.
fn expand_message(message: &mail_parser::Message, config: &ExtractionConfig) -> Vec<Message> {
    if is_digest(message) {
        let embedded: Vec<Message> = message
            .attachments()
            .filter_map(|part| part.message())
            .flat_map(|inner| expand_message(inner, config))
            .collect();
        if !embedded.is_empty() {
            return embedded;
        }
        tracing::debug!("Digest without embedded messages, keeping the container");
    }
    vec![convert_message(message, config)]
}

fn convert_message(message: &mail_parser::Message, config: &ExtractionConfig) -> Message {
    let headers = EmailHeaders {
        from: message.from().and_then(Address::first).and_then(format_addr),
        to: addresses(message.to()),
        cc: addresses(message.cc()),
        bcc: addresses(message.bcc()),
        subject: message.subject().and_then(non_empty),
        date: message.date().map(|date| date.to_rfc3339()),
        message_id: message.message_id().and_then(non_empty),
    };

    let text = message.text_part(0).and_then(|part| match &part.body {
        PartType::Text(text) => Some(text.to_string()),
        _ => None,
    });
    let body_html = message.html_part(0).and_then(|part| match &part.body {
        PartType::Html(html) => Some(html.to_string()),
        _ => None,
    });
    let body = match (&text, &body_html) {
        (Some(text), _) => normalize_text(text.trim(), config),
        (None, Some(html)) => html_to_text(html, config),
        (None, None) => String::new(),
    };

    let attachments = message
        .attachments()
        .enumerate()
        .map(|(idx, part)| {
            let mime_type = part.content_type().map(|content_type| {
                format!(
                    "{}/{}",
                    content_type.ctype(),
                    content_type.subtype().unwrap_or("octet-stream")
                )
                .to_ascii_lowercase()
            });
            let filename = part
                .attachment_name()
                .and_then(non_empty)
                .unwrap_or_else(|| default_attachment_name(idx, mime_type.as_deref()));
            attachment(filename, mime_type, part.contents().to_vec())
        })
        .collect();

    Message {
        headers,
        body,
        body_html,
        attachments,
    }
}

fn attachment(filename: String, mime_type: Option<String>, data: Vec<u8>) -> Attachment {
    let mime_type = mime_type.unwrap_or_else(|| guess_mime_for_filename(&filename));
    let mut attachment = Attachment {
        filename,
        mime_type,
        data,
        is_extractable: false,
    };
    attachment.is_extractable = is_supported_bytes(Some(&attachment.dispatch_name()), &attachment.data);
    attachment
}

/// `attachmentN` plus an extension taken from the content type, preferring the
/// extension of a decodable format.
fn default_attachment_name(idx: usize, mime_type: Option<&str>) -> String {
    let extension = mime_type.and_then(|mime_type| {
        let tag = tag_for_mime(mime_type);
        if tag.is_supported() {
            return Some(tag.as_str());
        }
        mime_guess::get_mime_extensions_str(mime_type).and_then(|extensions| extensions.first().copied())
    });
    match extension {
        Some(extension) => format!("attachment{}.{}", idx + 1, extension),
        None => format!("attachment{}", idx + 1),
    }
}

fn addresses(address: Option<&Address>) -> Vec<String> {
    address
        .map(|address| address.iter().filter_map(format_addr).collect())
        .unwrap_or_default()
}

fn format_addr(addr: &Addr) -> Option<String> {
    format_mailbox(addr.name(), addr.address())
}

/// `Name <address>`, or whichever half is present.
fn format_mailbox(name: Option<&str>, address: Option<&str>) -> Option<String> {
    let name = name.map(str::trim).filter(|name| !name.is_empty());
    let address = address.map(str::trim).filter(|address| !address.is_empty());
    match (name, address) {
        (Some(name), Some(address)) if name != address => Some(format!("{} <{}>", name, address)),
        (_, Some(address)) => Some(address.to_string()),
        (Some(name), None) => Some(name.to_string()),
        (None, None) => None,
    }
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Split an mbox archive on its `From ` separator lines, undoing `>From `
/// quoting in the bodies. Text before the first separator is ignored.
fn split_mbox(bytes: &[u8]) -> Vec<Vec<u8>> {
    let mut messages = Vec::new();
    let mut current: Option<Vec<u8>> = None;

    for line in bytes.split_inclusive(|&b| b == b'\n') {
        if line.starts_with(b"From ") {
            messages.extend(current.take());
            current = Some(Vec::new());
            continue;
        }
        if let Some(message) = current.as_mut() {
            message.extend_from_slice(unquote_from(line));
        }
    }
    messages.extend(current);
    messages
}

fn unquote_from(line: &[u8]) -> &[u8] {
    let quotes = line.iter().take_while(|&&b| b == b'>').count();
    if quotes > 0 && line[quotes..].starts_with(b"From ") {
        &line[1..]
    } else {
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, ExtractedContent};

    const MIXED: &str = "From: Ana Silva <ana@example.com>\r\n\
To: Bob <bob@example.com>, carol@example.com\r\n\
Cc: dave@example.com\r\n\
Subject: Quarterly numbers\r\n\
Date: Mon, 15 Jan 2024 10:30:00 +0000\r\n\
Message-ID: <q1@example.com>\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
Numbers attached.\r\n\
--b1\r\n\
Content-Type: text/csv\r\n\
Content-Disposition: attachment; filename=\"q1.csv\"\r\n\
\r\n\
a,b\r\n\
1,2\r\n\
--b1--\r\n";

    #[test]
    fn test_eml_headers_body_and_attachments() {
        let email = read_eml(MIXED.as_bytes()).unwrap();
        assert_eq!(email.format, FormatTag::Eml);
        assert_eq!(email.messages.len(), 1);

        let message = &email.messages[0];
        let headers = &message.headers;
        assert_eq!(headers.from.as_deref(), Some("Ana Silva <ana@example.com>"));
        assert_eq!(headers.to, vec!["Bob <bob@example.com>", "carol@example.com"]);
        assert_eq!(headers.cc, vec!["dave@example.com"]);
        assert!(headers.bcc.is_empty());
        assert_eq!(headers.subject.as_deref(), Some("Quarterly numbers"));
        assert!(headers.date.as_deref().unwrap().starts_with("2024-01-15T10:30:00"));
        assert_eq!(headers.message_id.as_deref(), Some("q1@example.com"));
        assert_eq!(message.body, "Numbers attached.");
        assert_eq!(message.body_html, None);

        assert_eq!(message.attachments.len(), 1);
        let csv = &message.attachments[0];
        assert_eq!(csv.filename, "q1.csv");
        assert_eq!(csv.mime_type, "text/csv");
        assert!(csv.data.starts_with(b"a,b"));
        assert!(csv.is_extractable);
        assert_eq!(csv.extract().unwrap().format(), FormatTag::Csv);

        assert_eq!(email.metadata.title.as_deref(), Some("Quarterly numbers"));
        assert_eq!(email.metadata.author.as_deref(), Some("Ana Silva <ana@example.com>"));

        let text = email.full_text();
        assert!(text.starts_with("From: Ana Silva <ana@example.com>\nTo: Bob <bob@example.com>, carol@example.com\n"));
        assert!(text.contains("\nSubject: Quarterly numbers\n"));
        assert!(text.ends_with("\n\nNumbers attached."));
    }

    #[test]
    fn test_html_only_body_is_cleaned() {
        let eml = b"From: a@example.com\r\nSubject: Hi\r\nContent-Type: text/html; charset=utf-8\r\n\r\n<html><body><p>Hello <b>there</b></p><script>track()</script></body></html>\r\n";
        let email = read_eml(eml).unwrap();
        let message = &email.messages[0];
        assert_eq!(message.body, "Hello there");
        assert!(message.body_html.as_deref().unwrap().contains("<b>there</b>"));
    }

    #[test]
    fn test_digest_expands_embedded_messages() {
        let eml = "From: list@example.com\r\n\
Subject: Weekly digest\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/digest; boundary=\"d\"\r\n\
\r\n\
--d\r\n\
Content-Type: message/rfc822\r\n\
\r\n\
From: one@example.com\r\n\
Subject: First\r\n\
\r\n\
Body one\r\n\
--d\r\n\
Content-Type: message/rfc822\r\n\
\r\n\
From: two@example.com\r\n\
Subject: Second\r\n\
\r\n\
Body two\r\n\
--d--\r\n";
        let email = read_eml(eml.as_bytes()).unwrap();

        let subjects: Vec<_> = email.messages.iter().map(|m| m.headers.subject.as_deref()).collect();
        assert_eq!(subjects, vec![Some("First"), Some("Second")]);
        assert_eq!(email.messages[1].body, "Body two");
        assert_eq!(email.metadata.title.as_deref(), Some("First"));
        assert_eq!(email.units().count(), 2);
    }

    #[test]
    fn test_mbox_splits_on_from_lines() {
        let mbox = b"From one@example.com Mon Jan 15 10:30:00 2024\n\
From: one@example.com\n\
Subject: First\n\
\n\
Hello\n\
>From the archive\n\
\n\
From two@example.com Tue Jan 16 10:30:00 2024\n\
From: two@example.com\n\
Subject: Second\n\
\n\
Bye\n";
        let email = read_mbox(mbox).unwrap();

        assert_eq!(email.format, FormatTag::Mbox);
        assert_eq!(email.messages.len(), 2);
        assert_eq!(email.messages[0].body, "Hello\nFrom the archive");
        assert_eq!(email.messages[1].headers.subject.as_deref(), Some("Second"));
        assert_eq!(email.messages[1].body, "Bye");
    }

    #[test]
    fn test_mbox_without_separator() {
        let err = read_mbox(b"Subject: nope\n\nbody").unwrap_err();
        assert!(matches!(err, SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_empty_eml() {
        assert!(matches!(read_eml(b" \r\n").unwrap_err(), SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_msg_rejects_non_ole_bytes() {
        assert!(matches!(read_msg(b"not a msg file").unwrap_err(), SharetextError::CorruptContainer { .. }));
    }

    #[test]
    fn test_format_mailbox() {
        assert_eq!(format_mailbox(Some("Ana"), Some("ana@example.com")).as_deref(), Some("Ana <ana@example.com>"));
        assert_eq!(format_mailbox(Some(" "), Some("ana@example.com")).as_deref(), Some("ana@example.com"));
        assert_eq!(format_mailbox(Some("ana@example.com"), Some("ana@example.com")).as_deref(), Some("ana@example.com"));
        assert_eq!(format_mailbox(None, None), None);
    }

    #[test]
    fn test_default_attachment_names() {
        assert_eq!(default_attachment_name(0, Some("message/rfc822")), "attachment1.eml");
        assert_eq!(default_attachment_name(2, None), "attachment3");
        assert_eq!(default_attachment_name(1, Some("text/plain")), "attachment2.txt");
        assert_eq!(default_attachment_name(0, Some("application/vnd.ms-excel")), "attachment1.xls");
    }

    #[test]
    fn test_unnamed_attachment_dispatches_by_content_type() {
        let eml = b"From: ana@example.com\r\n\
Subject: Figures\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"b1\"\r\n\
\r\n\
--b1\r\n\
Content-Type: text/plain\r\n\
\r\n\
See attached.\r\n\
--b1\r\n\
Content-Type: text/csv\r\n\
Content-Disposition: attachment\r\n\
\r\n\
region,total\r\nnorth,12\r\nsouth,9\r\n\
--b1\r\n\
Content-Type: text/csv\r\n\
Content-Disposition: attachment; filename=\"export\"\r\n\
\r\n\
region,total\r\neast,4\r\n\
--b1--\r\n";
        let mail = read_eml(eml).unwrap();
        let attachments = &mail.messages[0].attachments;
        assert_eq!(attachments.len(), 2);

        assert_eq!(attachments[0].filename, "attachment1.csv");
        assert_eq!(attachments[0].mime_type, "text/csv");
        assert!(attachments[0].is_extractable);

        assert_eq!(attachments[1].filename, "export");
        assert!(attachments[1].is_extractable);
        match attachments[1].extract().unwrap() {
            ExtractedContent::PlainText(text) => {
                assert_eq!(text.format, FormatTag::Csv);
                assert!(text.text.contains("east,4"));
            }
            other => panic!("unexpected content {other:?}"),
        }
    }
}
