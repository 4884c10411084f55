use crate::adapters::google_sheets::{GoogleSheetsSource, DEFAULT_RANGE, DEFAULT_SHEETS_API};
use crate::adapters::twilio::{TwilioGateway, DEFAULT_TWILIO_API};
use crate::core::campaign::DEFAULT_UNIT_COST;
use crate::core::dispatcher::DEFAULT_PACING;
use crate::utils::error::{CampaignError, Result};
use crate::utils::validation::{self, Validate};
use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::path::Path;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;
const MAX_PACING_MS: u64 = 60_000;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub sheets: SheetsConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub campaign: CampaignConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SheetsConfig {
    #[serde(default = "default_sheets_api")]
    pub api_base: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub access_token: Option<SecretString>,
    pub range: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            api_base: default_sheets_api(),
            access_token: None,
            range: None,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_api")]
    pub api_base: String,
    pub account_sid: Option<String>,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub auth_token: Option<SecretString>,
    pub from_number: Option<String>,
    pub timeout_seconds: Option<u64>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            api_base: default_gateway_api(),
            account_sid: None,
            auth_token: None,
            from_number: None,
            timeout_seconds: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CampaignConfig {
    pub pacing_ms: Option<u64>,
    pub unit_cost: Option<Decimal>,
}

fn default_sheets_api() -> String {
    DEFAULT_SHEETS_API.to_string()
}

fn default_gateway_api() -> String {
    DEFAULT_TWILIO_API.to_string()
}

/// Blank secrets count as absent.
fn deserialize_secret<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .filter(|s| !s.trim().is_empty())
        .map(SecretString::from))
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(CampaignError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| CampaignError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// Replaces `${VAR}` with the environment value. Unset variables become
    /// empty strings, so a missing secret reads as not configured.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        use std::sync::LazyLock;

        static ENV_VAR: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| {
                    tracing::debug!("Environment variable {} is not set", var_name);
                    String::new()
                })
            })
            .to_string()
    }

    pub fn pacing(&self) -> Duration {
        self.campaign
            .pacing_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_PACING)
    }

    pub fn unit_cost(&self) -> Decimal {
        self.campaign.unit_cost.unwrap_or(DEFAULT_UNIT_COST)
    }

    pub fn sheets_source(&self) -> Result<GoogleSheetsSource> {
        let token = self
            .sheets
            .access_token
            .clone()
            .ok_or_else(|| CampaignError::MissingConfigError {
                field: "sheets.access_token".to_string(),
            })?;
        let timeout =
            Duration::from_secs(self.sheets.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS));
        Ok(
            GoogleSheetsSource::with_timeout(&self.sheets.api_base, token, timeout)?
                .with_range(self.sheets.range.as_deref().unwrap_or(DEFAULT_RANGE)),
        )
    }

    /// Always succeeds for missing credentials; the gateway then reports
    /// itself unauthenticated.
    pub fn gateway(&self) -> Result<TwilioGateway> {
        TwilioGateway::new(
            &self.gateway.api_base,
            self.gateway.account_sid.clone(),
            self.gateway.auth_token.clone(),
            self.gateway.from_number.clone(),
            Duration::from_secs(self.gateway.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)),
        )
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_api_base("sheets.api_base", &self.sheets.api_base)?;
        validation::validate_api_base("gateway.api_base", &self.gateway.api_base)?;

        if let Some(timeout) = self.sheets.timeout_seconds {
            validation::validate_timeout("sheets.timeout_seconds", timeout)?;
        }
        if let Some(timeout) = self.gateway.timeout_seconds {
            validation::validate_timeout("gateway.timeout_seconds", timeout)?;
        }
        if let Some(range) = &self.sheets.range {
            validation::validate_not_blank("sheets.range", range)?;
        }
        if let Some(pacing) = self.campaign.pacing_ms {
            validation::validate_range("campaign.pacing_ms", pacing, 0, MAX_PACING_MS)?;
        }
        if let Some(cost) = self.campaign.unit_cost {
            validation::validate_range("campaign.unit_cost", cost, Decimal::ZERO, Decimal::MAX)?;
        }
        Ok(())
    }
}
