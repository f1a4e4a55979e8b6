//! Outbound auth mail (password resets and magic links).
//!
//! The service does not speak SMTP. When `MAIL_HOOK_URL` is configured every
//! message is POSTed there as JSON, signed with HMAC-SHA256 so the relay can
//! verify it came from us. Without a hook the message is logged, which is
//! enough for local development.
//!
//! # Headers Sent
//!
//! - `Content-Type: application/json`
//! - `X-Mail-Signature: sha256=<hex>` (only when `MAIL_HOOK_SECRET` is set)
//! - `X-Mail-Id: <uuid>`

use std::time::Duration;

use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use url::Url;
use uuid::Uuid;

use crate::config::Config;

type HmacSha256 = Hmac<Sha256>;

/// A message ready to hand to the relay.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMail {
    pub id: Uuid,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub link: String,
}

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("invalid mail hook URL: {0}")]
    InvalidHookUrl(String),

    #[error("failed to serialize message: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("mail hook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("mail hook answered with status {0}")]
    Rejected(u16),
}

/// Delivers auth mail through the configured hook, or to the log.
#[derive(Debug, Clone)]
pub struct Mailer {
    client: reqwest::Client,
    hook_url: Option<Url>,
    hook_secret: Option<String>,
}

impl Mailer {
    /// Build a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the hook URL is malformed, or uses plain HTTP for anything
    /// but a loopback host.
    pub fn from_config(config: &Config) -> Result<Self, MailError> {
        let hook_url = config
            .mail_hook_url
            .as_deref()
            .map(validate_hook_url)
            .transpose()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            hook_url,
            hook_secret: config.mail_hook_secret.clone(),
        })
    }

    /// Deliver a message.
    pub async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        let Some(hook_url) = &self.hook_url else {
            tracing::info!(
                mail_id = %mail.id,
                to = %mail.to,
                subject = %mail.subject,
                link = %mail.link,
                "mail hook not configured, logging message instead"
            );
            return Ok(());
        };

        let payload = serde_json::to_string(mail)?;

        let mut request = self
            .client
            .post(hook_url.clone())
            .header("Content-Type", "application/json")
            .header("X-Mail-Id", mail.id.to_string());

        if let Some(secret) = &self.hook_secret {
            request = request.header("X-Mail-Signature", sign_payload(secret, &payload));
        }

        let response = request.body(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }

        tracing::debug!(mail_id = %mail.id, "mail handed to relay");
        Ok(())
    }
}

/// Build the password-reset message.
pub fn password_reset_mail(
    base_url: &str,
    to: &str,
    token: &str,
    ttl_minutes: i64,
) -> Result<OutboundMail, url::ParseError> {
    let link = auth_link(base_url, "/reset-password", token)?;
    Ok(OutboundMail {
        id: Uuid::new_v4(),
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        body: format!(
            "Someone asked to reset the password for this account. \
             Follow the link within {ttl_minutes} minutes to choose a new one:\n\n{link}\n\n\
             If this wasn't you, ignore this message."
        ),
        link,
    })
}

/// Build the magic sign-in message.
pub fn magic_link_mail(
    base_url: &str,
    to: &str,
    token: &str,
    ttl_minutes: i64,
) -> Result<OutboundMail, url::ParseError> {
    let link = auth_link(base_url, "/magic-link", token)?;
    Ok(OutboundMail {
        id: Uuid::new_v4(),
        to: to.to_string(),
        subject: "Your sign-in link".to_string(),
        body: format!(
            "Use this link to sign in. It works once and expires in {ttl_minutes} minutes:\n\n{link}"
        ),
        link,
    })
}

/// `<base>/<path>?token=<token>`
fn auth_link(base_url: &str, path: &str, token: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base_url)?.join(path)?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.into())
}

/// HMAC-SHA256 signature in `sha256=<hex>` form.
fn sign_payload(secret: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC key length is valid");
    mac.update(payload.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// # Rules
///
/// - Must be a valid absolute URL, at most 2048 characters
/// - Must be HTTPS (HTTP allowed for loopback hosts)
fn validate_hook_url(raw: &str) -> Result<Url, MailError> {
    if raw.len() > 2048 {
        return Err(MailError::InvalidHookUrl(
            "URL exceeds 2048 characters".to_string(),
        ));
    }

    let parsed =
        Url::parse(raw).map_err(|_| MailError::InvalidHookUrl("invalid URL format".to_string()))?;

    match parsed.scheme() {
        "https" => Ok(parsed),
        "http" if matches!(parsed.host_str(), Some("localhost" | "127.0.0.1" | "0.0.0.0")) => {
            Ok(parsed)
        }
        "http" => Err(MailError::InvalidHookUrl(
            "HTTP is only allowed for localhost".to_string(),
        )),
        _ => Err(MailError::InvalidHookUrl(
            "URL must use HTTP or HTTPS".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_link_carries_token_as_query() {
        let mail =
            password_reset_mail("https://keeper.example/app/", "a@b.com", "deadbeef", 60).unwrap();
        assert_eq!(mail.link, "https://keeper.example/reset-password?token=deadbeef");
        assert!(mail.body.contains(&mail.link));
        assert!(mail.body.contains("60 minutes"));
        assert_eq!(mail.to, "a@b.com");
    }

    #[test]
    fn magic_link_points_at_magic_link_page() {
        let mail = magic_link_mail("http://localhost:3000", "a@b.com", "cafe", 15).unwrap();
        assert_eq!(mail.link, "http://localhost:3000/magic-link?token=cafe");
    }

    #[test]
    fn bad_base_url_is_reported() {
        assert!(magic_link_mail("not a url", "a@b.com", "t", 15).is_err());
    }

    #[test]
    fn signature_is_hmac_sha256() {
        let sig = sign_payload("key", "The quick brown fox jumps over the lazy dog");
        assert_eq!(
            sig,
            "sha256=f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn hook_url_rules() {
        assert!(validate_hook_url("https://mail.example.com/hook").is_ok());
        assert!(validate_hook_url("http://localhost:8025/hook").is_ok());
        assert!(validate_hook_url("http://mail.example.com/hook").is_err());
        assert!(validate_hook_url("ftp://mail.example.com").is_err());
        assert!(validate_hook_url("nope").is_err());
    }

    #[tokio::test]
    async fn without_hook_mail_is_logged_and_succeeds() {
        let mailer = Mailer::from_config(&Config::for_tests()).unwrap();
        let mail = magic_link_mail("http://localhost:3000", "a@b.com", "t", 15).unwrap();
        assert!(mailer.send(&mail).await.is_ok());
    }
}
