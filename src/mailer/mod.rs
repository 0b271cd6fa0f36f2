//! OTP email delivery over SMTP.
//!
//! When no SMTP relay is configured the mailer logs the code instead of
//! sending it, so local development works without a mail server.

use anyhow::{Context, Result};
use lettre::{
    message::{header::ContentType, Mailbox, Message},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Tokio1Executor,
};
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::otp::OtpPurpose;

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<SecretString>,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Clone)]
pub struct Mailer {
    config: Option<SmtpConfig>,
    transport: Option<AsyncSmtpTransport<Tokio1Executor>>,
}

impl Mailer {
    pub fn new(config: Option<SmtpConfig>) -> Result<Self> {
        let transport = match config {
            Some(ref smtp) => {
                let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&smtp.host)
                    .context("failed to build SMTP transport")?
                    .port(smtp.port);

                if let (Some(username), Some(password)) = (&smtp.username, &smtp.password) {
                    builder = builder.credentials(Credentials::new(
                        username.clone(),
                        password.expose_secret().to_string(),
                    ));
                }

                Some(builder.build())
            }
            None => None,
        };

        Ok(Self { config, transport })
    }

    /// Deliver a verification code. The HTTP response to the code request
    /// never contains the code itself.
    pub async fn send_otp(&self, to: &str, code: &str, purpose: OtpPurpose) -> Result<()> {
        let (Some(config), Some(transport)) = (&self.config, &self.transport) else {
            // Dev mode: surface the code in the logs so flows stay usable.
            warn!(%to, %code, purpose = purpose.as_str(), "SMTP not configured, logging OTP instead of sending");
            return Ok(());
        };

        let subject = subject_for(purpose);

        let from: Mailbox = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .context("invalid sender address")?;
        let to_mailbox: Mailbox = to.parse().context("invalid recipient address")?;

        let message = Message::builder()
            .from(from)
            .to(to_mailbox)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(otp_email_html(subject, code))
            .context("failed to build OTP email")?;

        transport
            .send(message)
            .await
            .context("failed to send OTP email")?;

        info!(%to, purpose = purpose.as_str(), "OTP email sent");

        Ok(())
    }
}

const fn subject_for(purpose: OtpPurpose) -> &'static str {
    match purpose {
        OtpPurpose::Login => "Código de verificación para inicio de sesión",
        OtpPurpose::Register => "Verifica tu correo electrónico",
        OtpPurpose::PasswordReset => "Código para restablecer contraseña",
    }
}

fn otp_email_html(subject: &str, code: &str) -> String {
    format!(
        r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
    <h2 style="color: #333;">{subject}</h2>
    <p>Tu código de verificación es:</p>
    <div style="background-color: #f4f4f4; padding: 20px; text-align: center; margin: 20px 0;">
        <h1 style="color: #007bff; font-size: 32px; margin: 0; letter-spacing: 5px;">{code}</h1>
    </div>
    <p>Este código expira en 10 minutos.</p>
    <p>Si no solicitaste este código, ignora este correo.</p>
</div>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_matches_purpose() {
        assert_eq!(
            subject_for(OtpPurpose::Login),
            "Código de verificación para inicio de sesión"
        );
        assert_eq!(
            subject_for(OtpPurpose::Register),
            "Verifica tu correo electrónico"
        );
        assert_eq!(
            subject_for(OtpPurpose::PasswordReset),
            "Código para restablecer contraseña"
        );
    }

    #[test]
    fn body_carries_the_code() {
        let html = otp_email_html("Verifica tu correo electrónico", "042137");
        assert!(html.contains("042137"));
        assert!(html.contains("Verifica tu correo electrónico"));
    }

    #[tokio::test]
    async fn unconfigured_mailer_is_a_no_op() {
        let mailer = Mailer::new(None).unwrap();
        mailer
            .send_otp("ana@x.com", "123456", OtpPurpose::Register)
            .await
            .unwrap();
    }
}
