use crate::core::MessagingGateway;
use crate::utils::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_TWILIO_API: &str = "https://api.twilio.com";

#[derive(Debug, Deserialize)]
struct TwilioErrorBody {
    code: Option<u32>,
    message: String,
}

#[derive(Clone)]
struct Credentials {
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
}

/// Sends SMS through the Twilio Messages REST endpoint.
///
/// Missing or blank credentials are tolerated at construction time; the
/// gateway then reports itself unauthenticated and the dispatcher refuses to
/// start.
#[derive(Clone)]
pub struct TwilioGateway {
    client: Client,
    api_base: String,
    credentials: Option<Credentials>,
}

impl TwilioGateway {
    pub fn new(
        api_base: impl Into<String>,
        account_sid: Option<String>,
        auth_token: Option<SecretString>,
        from_number: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let non_blank = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let credentials = match (
            non_blank(account_sid),
            auth_token.filter(|t| !t.expose_secret().trim().is_empty()),
            non_blank(from_number),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(Credentials {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };
        if credentials.is_none() {
            tracing::warn!("Twilio credentials are incomplete, sending is disabled");
        }

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_base: api_base.into(),
            credentials,
        })
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base.trim_end_matches('/'),
            account_sid
        )
    }
}

#[async_trait]
impl MessagingGateway for TwilioGateway {
    fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    fn sender(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.from_number.as_str())
    }

    async fn send(
        &self,
        body: &str,
        from: &str,
        to: &str,
    ) -> std::result::Result<(), GatewayError> {
        let credentials = self.credentials.as_ref().ok_or_else(|| GatewayError::Unexpected {
            message: "gateway is not authenticated".to_string(),
        })?;

        let response = self
            .client
            .post(self.messages_url(&credentials.account_sid))
            .basic_auth(
                &credentials.account_sid,
                Some(credentials.auth_token.expose_secret()),
            )
            .form(&[("Body", body), ("From", from), ("To", to)])
            .send()
            .await
            .map_err(|e| GatewayError::Unexpected {
                message: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let text = response.text().await.map_err(|e| GatewayError::Unexpected {
            message: e.to_string(),
        })?;
        match serde_json::from_str::<TwilioErrorBody>(&text) {
            Ok(err) => Err(GatewayError::Rejected {
                code: err.code,
                reason: err.message,
            }),
            Err(_) => Err(GatewayError::Unexpected {
                message: format!("HTTP {}: {}", status, text),
            }),
        }
    }
}
