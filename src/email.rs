//! Outbound email delivery.
//!
//! Two transports are supported: SMTP for real deployments and a
//! file-based transport that writes each message to a directory, used in
//! development and tests.

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncFileTransport, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use tracing::{debug, warn};

use crate::config::{Config, EmailTransportConfig};
use crate::errors::{Error, Result};

enum EmailTransport {
    Smtp(AsyncSmtpTransport<Tokio1Executor>),
    File(AsyncFileTransport<Tokio1Executor>),
}

pub struct EmailService {
    transport: EmailTransport,
    from_email: String,
    from_name: String,
}

impl EmailService {
    pub fn new(config: &Config) -> Result<Self> {
        let transport = match &config.email.transport {
            EmailTransportConfig::Smtp {
                host,
                port,
                username,
                password,
                use_tls,
            } => {
                let mut builder = if *use_tls {
                    AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
                        .map_err(|e| Error::Other(anyhow::anyhow!("invalid SMTP host: {e}")))?
                } else {
                    warn!("SMTP transport configured without TLS");
                    AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(host)
                };
                builder = builder.port(*port);
                if !username.is_empty() {
                    builder =
                        builder.credentials(Credentials::new(username.clone(), password.clone()));
                }
                EmailTransport::Smtp(builder.build())
            }
            EmailTransportConfig::File { path } => {
                std::fs::create_dir_all(path).map_err(|e| {
                    Error::Other(anyhow::anyhow!(
                        "failed to create email output directory {path:?}: {e}"
                    ))
                })?;
                EmailTransport::File(AsyncFileTransport::new(path))
            }
        };

        Ok(Self {
            transport,
            from_email: config.email.from_email.clone(),
            from_name: config.email.from_name.clone(),
        })
    }

    /// Send a plain-text message.
    ///
    /// The error carries the transport's own message so callers can record
    /// it verbatim.
    pub async fn send_mail(&self, to_email: &str, subject: &str, body: &str) -> Result<()> {
        let from: Mailbox = format!("{} <{}>", self.from_name, self.from_email)
            .parse()
            .map_err(|e| Error::Other(anyhow::anyhow!("invalid from address: {e}")))?;
        let to: Mailbox = to_email
            .parse()
            .map_err(|e| Error::BadRequest {
                message: format!("invalid recipient address {to_email}: {e}"),
            })?;

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body.to_string())
            .map_err(|e| Error::Other(anyhow::anyhow!("failed to build message: {e}")))?;

        match &self.transport {
            EmailTransport::Smtp(transport) => {
                transport
                    .send(message)
                    .await
                    .map_err(|e| Error::Other(anyhow::anyhow!("{e}")))?;
            }
            EmailTransport::File(transport) => {
                transport
                    .send(message)
                    .await
                    .map_err(|e| Error::Other(anyhow::anyhow!("{e}")))?;
            }
        }

        debug!(to = %to_email, subject = %subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_config;

    #[tokio::test]
    async fn test_file_transport_writes_message() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path());
        let service = EmailService::new(&config).unwrap();

        service
            .send_mail("client@example.com", "Hello", "A plain text body")
            .await
            .unwrap();

        let files: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(files.len(), 1);
        let contents = std::fs::read_to_string(files[0].path()).unwrap();
        assert!(contents.contains("Subject: Hello"));
        assert!(contents.contains("A plain text body"));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = create_test_config(dir.path());
        let service = EmailService::new(&config).unwrap();

        let err = service
            .send_mail("not an address", "Hello", "body")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest { .. }));
    }
}
