use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

use super::{build_message, load_attachments, Notifier, NotifyError, OutgoingEmail};
use crate::config::SmtpConfig;

/// Sends mail through an authenticated STARTTLS relay.
///
/// Without credentials the notifier is still constructed, so the server can
/// start; every send then fails with [`NotifyError::MissingCredentials`].
#[derive(Clone)]
pub struct SmtpNotifier {
    mailer: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Option<String>,
}

impl SmtpNotifier {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, NotifyError> {
        let (Some(user), Some(password)) = (config.user.clone(), config.password.clone()) else {
            log::warn!("SMTP_USER / SMTP_PASSWORD not set; contract emails will not be sent");
            return Ok(Self {
                mailer: None,
                from: None,
            });
        };

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(user.clone(), password))
            .build();

        log::info!("SMTP notifier configured for {}:{}", config.host, config.port);
        Ok(Self {
            mailer: Some(mailer),
            from: Some(user),
        })
    }
}

#[async_trait]
impl Notifier for SmtpNotifier {
    async fn send(&self, email: OutgoingEmail) -> Result<(), NotifyError> {
        let (Some(mailer), Some(from)) = (&self.mailer, &self.from) else {
            return Err(NotifyError::MissingCredentials);
        };

        let attachments = load_attachments(&email).await?;
        let count = attachments.len();
        let message = build_message(from, &email, attachments)?;

        mailer.send(message).await?;
        log::info!(
            "Sent '{}' to {} with {} attachment(s)",
            email.subject,
            email.to,
            count
        );
        Ok(())
    }
}
