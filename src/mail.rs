use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::config::MailConfig;

/// Outbound mail seam. Delivery is best-effort: callers surface an
/// enqueue failure as a warning and carry on.
#[async_trait]
pub trait MailDispatch: Send + Sync {
    async fn enqueue_verification(&self, recipient: &str, name: &str, link: &str) -> Result<()>;
}

const QUEUE_CAPACITY: usize = 64;
const RETRY_DELAY: std::time::Duration = std::time::Duration::from_secs(60);

#[derive(Debug)]
struct VerificationEmail {
    recipient: String,
    name: String,
    link: String,
}

/// Hands envelopes to a background worker so the request path never
/// waits on SMTP. A failed send is retried once after a delay, then
/// dropped with an error log.
pub struct MailQueue {
    tx: mpsc::Sender<VerificationEmail>,
}

impl MailQueue {
    pub fn start(config: &MailConfig) -> Result<Self> {
        let mailer = SmtpMailer::new(config)?;
        let (tx, mut rx) = mpsc::channel::<VerificationEmail>(QUEUE_CAPACITY);
        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                if let Err(e) = mailer.send_verification(&job).await {
                    warn!(error = %e, recipient = %job.recipient, "verification email failed, retrying once");
                    tokio::time::sleep(RETRY_DELAY).await;
                    if let Err(e) = mailer.send_verification(&job).await {
                        error!(error = %e, recipient = %job.recipient, "verification email dropped");
                    }
                }
            }
        });
        Ok(Self { tx })
    }
}

#[async_trait]
impl MailDispatch for MailQueue {
    async fn enqueue_verification(&self, recipient: &str, name: &str, link: &str) -> Result<()> {
        self.tx
            .try_send(VerificationEmail {
                recipient: recipient.to_string(),
                name: name.to_string(),
                link: link.to_string(),
            })
            .map_err(|e| anyhow::anyhow!("mail queue unavailable: {e}"))
    }
}

/// SMTP transport wrapper. An empty host switches it to no-op mode,
/// which logs the link instead of sending; local setups run without any
/// mail infrastructure that way.
struct SmtpMailer {
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
    from: Mailbox,
}

impl SmtpMailer {
    fn new(config: &MailConfig) -> Result<Self> {
        let from = format!("{} <{}>", config.from_name, config.from)
            .parse::<Mailbox>()
            .context("parse MAIL_FROM address")?;

        let transport = if config.smtp_host.trim().is_empty() {
            warn!("SMTP host not configured, mail runs in no-op mode");
            None
        } else {
            let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(
                &config.smtp_host,
            )
            .context("configure SMTP transport")?
            .port(config.smtp_port);
            if let (Some(username), Some(password)) = (&config.username, &config.password) {
                builder =
                    builder.credentials(Credentials::new(username.clone(), password.clone()));
            }
            Some(builder.build())
        };

        Ok(Self { transport, from })
    }

    async fn send_verification(&self, job: &VerificationEmail) -> Result<()> {
        let Some(transport) = &self.transport else {
            info!(recipient = %job.recipient, link = %job.link, "no-op mode, skipping send");
            return Ok(());
        };

        let to = job
            .recipient
            .parse::<Mailbox>()
            .context("parse recipient address")?;
        let body = format!(
            "Hi {},\n\nWelcome to Bookery! Please open the link below to verify your email address:\n\n{}\n\nIf you did not sign up, you can ignore this message.\n",
            job.name, job.link
        );
        let message = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject("Verify your email")
            .header(header::ContentType::TEXT_PLAIN)
            .body(body)
            .context("build email message")?;

        transport.send(message).await.context("send email")?;
        info!(recipient = %job.recipient, "verification email sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_op_config() -> MailConfig {
        MailConfig {
            smtp_host: String::new(),
            smtp_port: 587,
            username: None,
            password: None,
            from: "noreply@bookery.dev".into(),
            from_name: "Bookery".into(),
        }
    }

    #[tokio::test]
    async fn queue_accepts_mail_in_no_op_mode() {
        let queue = MailQueue::start(&no_op_config()).expect("start queue");
        queue
            .enqueue_verification("reader@example.com", "Jane", "http://localhost/verify/x")
            .await
            .expect("enqueue");
    }

    #[tokio::test]
    async fn no_op_send_succeeds_without_a_transport() {
        let mailer = SmtpMailer::new(&no_op_config()).expect("build mailer");
        mailer
            .send_verification(&VerificationEmail {
                recipient: "reader@example.com".into(),
                name: "Jane".into(),
                link: "http://localhost/verify/x".into(),
            })
            .await
            .expect("no-op send");
    }

    #[test]
    fn bad_from_address_fails_at_startup() {
        let mut config = no_op_config();
        config.from = "not an address".into();
        assert!(SmtpMailer::new(&config).is_err());
    }
}
