/// Outbound email
///
/// Handlers depend on the [`EmailSender`] trait so tests can swap in an
/// in-memory outbox. Production uses [`SmtpEmailSender`], a pooled async
/// SMTP transport built with lettre.
///
/// # Example
///
/// ```no_run
/// use contacts_shared::services::email::{send_reset_password_email, SmtpConfig, SmtpEmailSender};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let sender = SmtpEmailSender::new(SmtpConfig {
///     server: "smtp.example.com".to_string(),
///     port: 587,
///     username: "mailer".to_string(),
///     password: "secret".to_string(),
///     from_address: "noreply@example.com".to_string(),
///     from_name: "Contacts".to_string(),
///     starttls: true,
///     ssl_tls: false,
/// })?;
///
/// send_reset_password_email(&sender, "http://localhost:8000", "user@example.com", "eyJ...").await?;
/// # Ok(())
/// # }
/// ```

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

/// Email delivery errors
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// Sender or recipient is not a valid mailbox
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to build message: {0}")]
    Build(String),

    #[error("SMTP transport error: {0}")]
    Transport(String),
}

/// A message ready to hand to an [`EmailSender`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Delivers email
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError>;
}

/// SMTP connection settings
#[derive(Clone)]
pub struct SmtpConfig {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub from_name: String,

    /// Upgrade a plain connection with STARTTLS
    pub starttls: bool,

    /// Connect over implicit TLS; takes precedence over `starttls`
    pub ssl_tls: bool,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("server", &self.server)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("from_address", &self.from_address)
            .field("starttls", &self.starttls)
            .field("ssl_tls", &self.ssl_tls)
            .finish()
    }
}

/// [`EmailSender`] backed by an SMTP relay
pub struct SmtpEmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpEmailSender {
    /// Builds the transport; no connection is made until the first send
    pub fn new(config: SmtpConfig) -> Result<Self, EmailError> {
        let from = parse_mailbox(&format!("{} <{}>", config.from_name, config.from_address))?;

        let builder = if config.ssl_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
                .map_err(|e| EmailError::Transport(e.to_string()))?
        } else if config.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
                .map_err(|e| EmailError::Transport(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.server)
        };

        let mut builder = builder.port(config.port);
        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(config.username, config.password));
        }

        let transport = builder.build();

        Ok(Self { transport, from })
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(parse_mailbox(&email.to)?)
            .subject(email.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(email.body)
            .map_err(|e| EmailError::Build(e.to_string()))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| EmailError::Transport(e.to_string()))?;

        tracing::info!(to = %email.to, "Email sent");
        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox, EmailError> {
    address.parse::<Mailbox>().map_err(|e| EmailError::InvalidAddress {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Builds the password reset message
pub fn reset_password_email(base_url: &str, to: &str, token: &str) -> OutgoingEmail {
    let link = format!("{}/reset-password?token={}", base_url.trim_end_matches('/'), token);

    OutgoingEmail {
        to: to.to_string(),
        subject: "Reset Your Password".to_string(),
        body: format!(
            "Hello,\n\n\
             A password reset was requested for {to}.\n\n\
             Follow this link to choose a new password:\n{link}\n\n\
             The link is valid for 15 minutes. If you did not ask for a reset, ignore this email.\n"
        ),
    }
}

/// Builds the email confirmation message
pub fn confirmation_email(base_url: &str, to: &str, token: &str) -> OutgoingEmail {
    let link = format!("{}/auth/confirmed-email/{}", base_url.trim_end_matches('/'), token);

    OutgoingEmail {
        to: to.to_string(),
        subject: "Confirm your email".to_string(),
        body: format!(
            "Hello,\n\n\
             Please confirm the address {to} by opening this link:\n{link}\n"
        ),
    }
}

/// Sends the password reset message through `sender`
pub async fn send_reset_password_email(
    sender: &dyn EmailSender,
    base_url: &str,
    to: &str,
    token: &str,
) -> Result<(), EmailError> {
    sender.send(reset_password_email(base_url, to, token)).await
}

/// Sends the email confirmation message through `sender`
pub async fn send_confirmation_email(
    sender: &dyn EmailSender,
    base_url: &str,
    to: &str,
    token: &str,
) -> Result<(), EmailError> {
    sender.send(confirmation_email(base_url, to, token)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<OutgoingEmail>>);

    #[async_trait]
    impl EmailSender for Outbox {
        async fn send(&self, email: OutgoingEmail) -> Result<(), EmailError> {
            self.0.lock().unwrap().push(email);
            Ok(())
        }
    }

    fn smtp_config() -> SmtpConfig {
        SmtpConfig {
            server: "localhost".to_string(),
            port: 1025,
            username: "user".to_string(),
            password: "hunter2".to_string(),
            from_address: "noreply@example.com".to_string(),
            from_name: "Contacts".to_string(),
            starttls: false,
            ssl_tls: false,
        }
    }

    #[test]
    fn test_reset_password_email_contains_link() {
        let email = reset_password_email("http://localhost:8000/", "user@example.com", "tok123");

        assert_eq!(email.to, "user@example.com");
        assert_eq!(email.subject, "Reset Your Password");
        assert!(email
            .body
            .contains("http://localhost:8000/reset-password?token=tok123"));
    }

    #[test]
    fn test_confirmation_email_contains_link() {
        let email = confirmation_email("https://contacts.example.com", "a@b.com", "abc");
        assert!(email
            .body
            .contains("https://contacts.example.com/auth/confirmed-email/abc"));
    }

    #[tokio::test]
    async fn test_send_reset_password_email_uses_sender() {
        let outbox = Outbox::default();

        send_reset_password_email(&outbox, "http://localhost:8000", "user@example.com", "t")
            .await
            .unwrap();

        let sent = outbox.0.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "user@example.com");
    }

    #[test]
    fn test_smtp_config_debug_redacts_password() {
        let debug = format!("{:?}", smtp_config());
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_smtp_sender_builds_without_connecting() {
        assert!(SmtpEmailSender::new(smtp_config()).is_ok());
    }

    #[tokio::test]
    async fn test_smtp_sender_rejects_bad_from_address() {
        let config = SmtpConfig {
            from_address: "not an address".to_string(),
            ..smtp_config()
        };

        assert!(matches!(
            SmtpEmailSender::new(config),
            Err(EmailError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_parse_mailbox_rejects_garbage() {
        assert!(parse_mailbox("user@example.com").is_ok());
        assert!(parse_mailbox("garbage").is_err());
    }
}
