use std::time::Duration;
use serde::Serialize;
use tracing::{debug, warn};
use shared::models::VoterRecord;

const RESEND_ENDPOINT: &str = "https://api.resend.com/emails";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, thiserror::Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Mail provider rejected message ({status}): {body}")]
    Rejected { status: u16, body: String },
}

impl From<reqwest::Error> for MailError {
    fn from(e: reqwest::Error) -> Self {
        MailError::Transport(e.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Best-effort transactional delivery. Implementations do not retry.
#[rocket::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

pub struct ResendMailer {
    client: reqwest::Client,
    api_key: String,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: impl Into<String>, from: impl Into<String>) -> Result<Self, MailError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            from: from.into(),
        })
    }
}

#[rocket::async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let payload = ResendPayload {
            from: &self.from,
            to: [&email.to],
            subject: &email.subject,
            html: &email.html,
        };

        let response = self.client
            .post(RESEND_ENDPOINT)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailError::Rejected { status: status.as_u16(), body });
        }

        debug!("Mail accepted by provider for {}", email.to);
        Ok(())
    }
}

/// Used when no provider key is configured: nothing leaves the process.
pub struct LogMailer;

#[rocket::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        warn!("Mail delivery disabled - dropping \"{}\" for {}", email.subject, email.to);
        Ok(())
    }
}

pub fn otp_email(to: &str, code: &str, ttl_minutes: i64) -> Email {
    Email {
        to: to.to_string(),
        subject: "Your OTP for Voter Registration".into(),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #333;">Verify Your Email</h1>
  <p>Your OTP for voter registration is:</p>
  <div style="background-color: #f0f0f0; padding: 15px; border-radius: 5px; text-align: center;">
    <h2 style="margin: 0; color: #0066cc;">{code}</h2>
  </div>
  <p style="margin-top: 20px;">This OTP will expire in {ttl_minutes} minutes.</p>
  <p style="color: #666; font-size: 14px;">If you didn't request this OTP, please ignore this email.</p>
</div>"#
        ),
    }
}

pub fn credential_email(voter: &VoterRecord, vote_url: Option<&str>) -> Email {
    let greeting = voter
        .first_name
        .as_deref()
        .map(|name| format!("Dear {},", escape_html(name)))
        .unwrap_or_else(|| "Hello,".to_string());
    let link = vote_url
        .map(|url| format!(r#"<p>Cast your vote here: <a href="{url}">{url}</a></p>"#))
        .unwrap_or_default();

    Email {
        to: voter.email.clone(),
        subject: "Your Voting Code for the Election".into(),
        html: format!(
            r#"<div style="font-family: Arial, sans-serif; max-width: 600px; margin: 0 auto;">
  <h1 style="color: #333;">Your Voting Code</h1>
  <p>{greeting}</p>
  <p>Your voting code for the election is:</p>
  <div style="background-color: #f0f0f0; padding: 15px; border-radius: 5px; text-align: center;">
    <h2 style="margin: 0; color: #0066cc;">{code}</h2>
  </div>
  <p style="margin-top: 20px;">You will need this code to cast your vote.</p>
  {link}
  <p style="color: #666; font-size: 14px;">If you didn't register for voting, please ignore this email.</p>
</div>"#,
            code = voter.credential,
        ),
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
