//! Outgoing email with file attachments.

pub mod smtp;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::Message;
use thiserror::Error;

pub use smtp::SmtpNotifier;

const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP credentials are not configured (SMTP_USER / SMTP_PASSWORD)")]
    MissingCredentials,
    #[error("no recipient configured (EMAIL_DESTINO / SMTP_USER)")]
    MissingRecipient,
    #[error("invalid email address '{address}': {reason}")]
    Address { address: String, reason: String },
    #[error("failed to read attachment {path}: {source}")]
    Attachment {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid attachment content type: {0}")]
    ContentType(String),
    #[error("failed to build email: {0}")]
    Build(#[from] lettre::error::Error),
    #[error("failed to send email: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
}

/// What to do with attachment paths that no longer exist on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentPolicy {
    SkipMissing,
    Require,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutgoingEmail {
    pub subject: String,
    pub body: String,
    pub to: String,
    pub attachments: Vec<PathBuf>,
    pub policy: AttachmentPolicy,
}

/// An attachment read into memory, ready to be placed in a message.
#[derive(Debug, Clone)]
pub struct LoadedAttachment {
    pub filename: String,
    pub data: Vec<u8>,
    pub content_type: ContentType,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError>;
}

/// Best-effort content type for a file, falling back to `application/octet-stream`.
pub fn content_type_for(path: &Path) -> Result<ContentType, NotifyError> {
    let guessed = mime_guess::from_path(path).first_or_octet_stream();
    ContentType::parse(guessed.essence_str())
        .or_else(|_| ContentType::parse(OCTET_STREAM))
        .map_err(|e| NotifyError::ContentType(e.to_string()))
}

/// Read every attachment of `email`, honouring its [`AttachmentPolicy`].
pub async fn load_attachments(email: &OutgoingEmail) -> Result<Vec<LoadedAttachment>, NotifyError> {
    let mut loaded = Vec::with_capacity(email.attachments.len());

    for path in &email.attachments {
        if email.policy == AttachmentPolicy::SkipMissing
            && !tokio::fs::try_exists(path).await.unwrap_or(false)
        {
            log::warn!("Attachment {} not found; skipping", path.display());
            continue;
        }

        let data = tokio::fs::read(path)
            .await
            .map_err(|source| NotifyError::Attachment {
                path: path.clone(),
                source,
            })?;

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "anexo".to_string());

        loaded.push(LoadedAttachment {
            filename,
            data,
            content_type: content_type_for(path)?,
        });
    }

    Ok(loaded)
}

pub fn parse_mailbox(address: &str) -> Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Assemble a multipart message: plain-text body followed by the attachments.
pub fn build_message(
    from: &str,
    email: &OutgoingEmail,
    attachments: Vec<LoadedAttachment>,
) -> Result<Message, NotifyError> {
    let mut parts = MultiPart::mixed().singlepart(SinglePart::plain(email.body.clone()));
    for attachment in attachments {
        parts = parts.singlepart(
            Attachment::new(attachment.filename).body(attachment.data, attachment.content_type),
        );
    }

    let message = Message::builder()
        .from(parse_mailbox(from)?)
        .to(parse_mailbox(&email.to)?)
        .subject(email.subject.clone())
        .multipart(parts)?;
    Ok(message)
}
