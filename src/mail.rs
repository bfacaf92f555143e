//! Delivery of rendered reports through an SMTP relay.
//!
//! The [`ReportMailer`] trait is the seam the request handler depends on;
//! [`SmtpMailer`] is the lettre-backed production implementation. Delivery is
//! a single synchronous attempt, no retry.

use std::fs;
use std::path::PathBuf;

use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use tracing::info;

use crate::config::SmtpConfig;
use crate::scorecard::pdf::RenderedReport;

const SUBJECT: &str = "Your Cyber Resilience Scorecard Report";
const TEXT_BODY: &str = "Attached is your cyber resilience scorecard report.\n\n\
    The PDF contains your overall score, a category breakdown, and \
    recommendations for improvement.";
const HTML_BODY: &str = "<p>Attached is your cyber resilience scorecard report.</p>\
    <p>The PDF contains your overall score, a category breakdown, and \
    recommendations for improvement.</p>";

#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to attach report {path}: {source}")]
    Attach {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp relay rejected or unreachable: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// Dispatches one rendered report to one recipient.
pub trait ReportMailer: Send + Sync {
    fn deliver(&self, recipient: &str, report: &RenderedReport) -> Result<(), DeliveryError>;
}

/// Production mailer speaking STARTTLS to the configured relay.
/// Authentication is attempted only when both username and password were
/// configured at startup.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn from_config(config: &SmtpConfig) -> Result<Self, DeliveryError> {
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| DeliveryError::InvalidAddress(config.from.clone()))?;

        let mut builder = SmtpTransport::starttls_relay(&config.host)?.port(config.port);
        if let Some((user, pass)) = config.credentials() {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

impl ReportMailer for SmtpMailer {
    fn deliver(&self, recipient: &str, report: &RenderedReport) -> Result<(), DeliveryError> {
        let to: Mailbox = recipient
            .parse()
            .map_err(|_| DeliveryError::InvalidAddress(recipient.to_string()))?;

        let content = fs::read(report.path()).map_err(|source| DeliveryError::Attach {
            path: report.path().to_path_buf(),
            source,
        })?;

        let pdf_type = ContentType::parse("application/pdf")
            .map_err(|err| DeliveryError::Build(err.to_string()))?;
        let attachment = Attachment::new(report.file_name().to_string()).body(content, pdf_type);

        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(SUBJECT)
            .multipart(
                MultiPart::mixed()
                    .multipart(MultiPart::alternative_plain_html(
                        TEXT_BODY.to_string(),
                        HTML_BODY.to_string(),
                    ))
                    .singlepart(attachment),
            )
            .map_err(|err| DeliveryError::Build(err.to_string()))?;

        self.transport.send(&message)?;
        info!(%recipient, attachment = report.file_name(), "scorecard report delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(from: &str) -> SmtpConfig {
        SmtpConfig {
            host: "smtp.example.com".to_string(),
            port: 587,
            username: None,
            password: None,
            from: from.to_string(),
        }
    }

    #[test]
    fn builds_unauthenticated_mailer_without_credentials() {
        let mailer = SmtpMailer::from_config(&config("reports@example.com"));
        assert!(mailer.is_ok());
    }

    #[test]
    fn rejects_malformed_from_address() {
        let err = SmtpMailer::from_config(&config("not-an-address"))
            .err()
            .expect("malformed from must fail");
        assert!(matches!(err, DeliveryError::InvalidAddress(_)));
    }
}
