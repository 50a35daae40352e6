//! Checkout configuration: defaults, an optional JSON file, then environment
//! overrides.

use crate::domain::plan::{InstallmentCount, PlanCatalog};
use crate::error::{CheckoutError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

pub const CONFIG_PATH_ENV: &str = "CHECKOUT_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Tried in order until one loads.
    pub script_urls: Vec<String>,
    pub encryption_key: String,
    pub tokenize_url: String,
    pub retry_backoff_ms: u64,
    pub load_timeout_secs: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            script_urls: vec![
                "https://assets.pagar.me/pagarme-js/4.18.0/pagarme.min.js".to_string(),
                "https://assets.pagar.me/pagarme-js/4.0/pagarme.min.js".to_string(),
                "https://assets.pagar.me/js/pagarme.min.js".to_string(),
            ],
            encryption_key: String::new(),
            tokenize_url: "https://api.pagar.me/1/cards".to_string(),
            retry_backoff_ms: 1_000,
            load_timeout_secs: 15,
        }
    }
}

impl GatewayConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    pub credit_card_url: String,
    pub pix_url: String,
    pub request_timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            credit_card_url: "https://webhook.example/credit-card".to_string(),
            pix_url: "https://webhook.example/pix".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl WebhookConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PixConfig {
    pub validity_secs: u32,
    pub due_in_days: u32,
    pub copy_ack_secs: u64,
    pub tick_ms: u64,
}

impl Default for PixConfig {
    fn default() -> Self {
        Self {
            validity_secs: 900,
            due_in_days: 7,
            copy_ack_secs: 2,
            tick_ms: 1_000,
        }
    }
}

impl PixConfig {
    pub fn copy_ack(&self) -> Duration {
        Duration::from_secs(self.copy_ack_secs)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

/// Maps catalog plan ids to the identifiers each provider expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlanMapping {
    pub provider_plan_ids: BTreeMap<String, String>,
    pub default_provider_plan_id: String,
    pub pix_slugs: BTreeMap<String, String>,
    pub default_pix_slug: String,
}

impl Default for PlanMapping {
    fn default() -> Self {
        Self {
            provider_plan_ids: BTreeMap::from([("silver".to_string(), "6477917".to_string())]),
            default_provider_plan_id: "6477918".to_string(),
            pix_slugs: BTreeMap::from([("silver".to_string(), "silver".to_string())]),
            default_pix_slug: "padrao".to_string(),
        }
    }
}

impl PlanMapping {
    /// Plan identifier sent to the card payment webhook.
    pub fn provider_plan_id(&self, plan_id: &str) -> &str {
        self.provider_plan_ids
            .get(plan_id)
            .map_or(self.default_provider_plan_id.as_str(), String::as_str)
    }

    /// Plan slug sent to the PIX webhook and used in the external reference.
    pub fn pix_slug(&self, plan_id: &str) -> &str {
        self.pix_slugs
            .get(plan_id)
            .map_or(self.default_pix_slug.as_str(), String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallmentPolicy {
    pub max: InstallmentCount,
    pub default: InstallmentCount,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckoutConfig {
    pub gateway: GatewayConfig,
    pub webhooks: WebhookConfig,
    pub pix: PixConfig,
    pub installments: InstallmentPolicy,
    pub plans: PlanCatalog,
    pub plan_mapping: PlanMapping,
}

impl CheckoutConfig {
    /// Loads `.env`, then the JSON file at `path` (or `$CHECKOUT_CONFIG`),
    /// then applies `CHECKOUT_*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

        let mut config = match path {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading checkout configuration file");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
            .map_err(|e| CheckoutError::Config(format!("{}: {e}", path.display())))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("CHECKOUT_CARD_WEBHOOK_URL") {
            self.webhooks.credit_card_url = url;
        }
        if let Some(url) = lookup("CHECKOUT_PIX_WEBHOOK_URL") {
            self.webhooks.pix_url = url;
        }
        if let Some(key) = lookup("CHECKOUT_ENCRYPTION_KEY") {
            self.gateway.encryption_key = key;
        }
        if let Some(url) = lookup("CHECKOUT_TOKENIZE_URL") {
            self.gateway.tokenize_url = url;
        }
        if let Some(urls) = lookup("CHECKOUT_GATEWAY_URLS") {
            self.gateway.script_urls = urls
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.plans.is_empty() {
            return Err(CheckoutError::Config("plan catalog is empty".to_string()));
        }
        if self.gateway.script_urls.is_empty() {
            return Err(CheckoutError::Config(
                "at least one gateway script URL is required".to_string(),
            ));
        }
        if self.webhooks.credit_card_url.is_empty() || self.webhooks.pix_url.is_empty() {
            return Err(CheckoutError::Config("webhook URLs must be set".to_string()));
        }
        if self.installments.default > self.installments.max {
            return Err(CheckoutError::Config(format!(
                "default installments ({}) exceed the maximum ({})",
                self.installments.default.value(),
                self.installments.max.value()
            )));
        }
        if self.pix.validity_secs == 0 {
            return Err(CheckoutError::Config(
                "PIX validity must be positive".to_string(),
            ));
        }
        if self.pix.tick_ms == 0 {
            return Err(CheckoutError::Config(
                "PIX countdown tick must be positive".to_string(),
            ));
        }
        if self.gateway.encryption_key.is_empty() {
            tracing::warn!("CHECKOUT_ENCRYPTION_KEY not set - card tokenization will be rejected");
        }
        Ok(())
    }
}
