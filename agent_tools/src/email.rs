// agent_tools/src/email.rs

use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ToolError;
use crate::registry::Tool;
use crate::EnvLookup;

#[derive(Debug, Deserialize)]
pub struct SendEmailArgs {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// SMTP settings, read fresh from the environment for every send.
#[derive(Debug, Clone)]
struct SmtpSettings {
    host: String,
    port: u16,
    username: String,
    password: String,
    from: String,
}

impl SmtpSettings {
    fn from_env(env: &EnvLookup) -> Result<Self, ToolError> {
        let username = env("SMTP_USERNAME")
            .ok_or_else(|| ToolError::NotConfigured("SMTP_USERNAME is not set".into()))?;
        let password = env("SMTP_PASSWORD")
            .ok_or_else(|| ToolError::NotConfigured("SMTP_PASSWORD is not set".into()))?;
        let port = match env("SMTP_PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ToolError::NotConfigured(format!("SMTP_PORT '{}' is not a port", raw)))?,
            None => 587,
        };
        Ok(Self {
            host: env("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".to_string()),
            port,
            from: env("SMTP_FROM").unwrap_or_else(|| username.clone()),
            username,
            password,
        })
    }
}

/// Sends one plain-text email. A single attempt; failures are reported,
/// never retried.
pub struct SendEmailTool {
    env: EnvLookup,
}

impl SendEmailTool {
    pub fn new(env: EnvLookup) -> Self {
        Self { env }
    }
}

fn invalid(reason: String) -> ToolError {
    ToolError::InvalidArguments {
        tool: "send_email".into(),
        reason,
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    type Args = SendEmailArgs;

    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Sends an email. Confirm recipient and subject with the user before calling."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "to": { "type": "string", "description": "Recipient email address" },
                "subject": { "type": "string" },
                "body": { "type": "string", "description": "Plain-text message body" }
            },
            "required": ["to", "subject", "body"]
        })
    }

    async fn call(&self, args: SendEmailArgs) -> Result<String, ToolError> {
        let to: Mailbox = args
            .to
            .trim()
            .parse()
            .map_err(|e| invalid(format!("recipient '{}' is not an email address: {}", args.to, e)))?;

        let settings = SmtpSettings::from_env(&self.env)?;
        let from: Mailbox = settings
            .from
            .parse()
            .map_err(|e| ToolError::NotConfigured(format!("SMTP_FROM is not an address: {}", e)))?;

        let email = Message::builder()
            .from(from)
            .to(to)
            .subject(args.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(args.body)
            .map_err(|e| invalid(e.to_string()))?;

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)
            .map_err(|e| ToolError::NotConfigured(format!("SMTP relay '{}': {}", settings.host, e)))?
            .port(settings.port)
            .credentials(Credentials::new(settings.username, settings.password))
            .build();

        mailer
            .send(email)
            .await
            .map_err(|e| ToolError::FetchFailed(format!("failed to send email: {}", e)))?;

        info!("[SendEmailTool] Email sent to {}", args.to.trim());
        Ok(format!(
            "Email sent successfully to {} with subject '{}'",
            args.to.trim(),
            args.subject
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn no_env() -> EnvLookup {
        Arc::new(|_: &str| None)
    }

    #[tokio::test]
    async fn bad_recipient_is_invalid_arguments() {
        let err = SendEmailTool::new(no_env())
            .call(SendEmailArgs {
                to: "not-an-address".into(),
                subject: "Hi".into(),
                body: "Hello".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "invalid_arguments");
    }

    #[tokio::test]
    async fn missing_credentials_are_reported() {
        let err = SendEmailTool::new(no_env())
            .call(SendEmailArgs {
                to: "friend@example.com".into(),
                subject: "Hi".into(),
                body: "Hello".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_configured");
        assert!(err.to_string().contains("SMTP_USERNAME"));
    }

    #[test]
    fn settings_default_host_port_and_sender() {
        let env: EnvLookup = Arc::new(|key: &str| match key {
            "SMTP_USERNAME" => Some("bot@example.com".to_string()),
            "SMTP_PASSWORD" => Some("secret".to_string()),
            _ => None,
        });
        let settings = SmtpSettings::from_env(&env).unwrap();
        assert_eq!(settings.host, "smtp.gmail.com");
        assert_eq!(settings.port, 587);
        assert_eq!(settings.from, "bot@example.com");
    }
}
