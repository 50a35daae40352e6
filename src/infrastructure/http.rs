use crate::config::{GatewayConfig, WebhookConfig};
use crate::domain::card::{CardPaymentRequest, CardTokenRequest};
use crate::domain::pix::PixChargeRequest;
use crate::domain::ports::{
    CheckoutWebhook, GatewayLibrary, GatewayLibraryRef, GatewayLoader, WebhookResponse,
};
use crate::error::{CheckoutError, GatewayLoadError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Added to the loader's request timeout so the gateway client's own load
/// timeout always fires first.
pub const LOADER_TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Fetches the tokenization library over HTTP.
///
/// A 2xx answer means the library is reachable; tokenization then goes to the
/// configured tokenize endpoint.
#[derive(Clone)]
pub struct HttpGatewayLoader {
    client: reqwest::Client,
    tokenize_url: String,
}

impl HttpGatewayLoader {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.load_timeout() + LOADER_TIMEOUT_MARGIN)?,
            tokenize_url: config.tokenize_url.clone(),
        })
    }
}

#[async_trait]
impl GatewayLoader for HttpGatewayLoader {
    async fn load(&self, url: &str) -> Result<GatewayLibraryRef> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url, status = status.as_u16(), "Gateway library unavailable");
            return Err(GatewayLoadError::Failed.into());
        }
        debug!(url, "Gateway library fetched");
        Ok(Arc::new(HttpCardTokenizer::new(
            self.client.clone(),
            self.tokenize_url.clone(),
        )))
    }
}

#[derive(Serialize)]
struct TokenizeBody<'a> {
    encryption_key: &'a str,
    #[serde(flatten)]
    card: &'a CardTokenRequest,
}

#[derive(Deserialize)]
struct TokenizeResponse {
    id: String,
}

/// Exchanges card data for a token at the provider's tokenize endpoint.
#[derive(Clone)]
pub struct HttpCardTokenizer {
    client: reqwest::Client,
    tokenize_url: String,
}

impl HttpCardTokenizer {
    pub fn new(client: reqwest::Client, tokenize_url: impl Into<String>) -> Self {
        Self {
            client,
            tokenize_url: tokenize_url.into(),
        }
    }
}

#[async_trait]
impl GatewayLibrary for HttpCardTokenizer {
    async fn create_card_token(
        &self,
        encryption_key: &str,
        card: &CardTokenRequest,
    ) -> Result<String> {
        let response = self
            .client
            .post(&self.tokenize_url)
            .json(&TokenizeBody {
                encryption_key,
                card,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(CheckoutError::Gateway(body));
        }

        let token: TokenizeResponse = serde_json::from_str(&body)?;
        Ok(token.id)
    }
}

/// Posts checkout requests to the payment-processing webhooks as JSON.
#[derive(Clone)]
pub struct HttpCheckoutWebhook {
    client: reqwest::Client,
    config: WebhookConfig,
}

impl HttpCheckoutWebhook {
    pub fn new(config: WebhookConfig) -> Result<Self> {
        Ok(Self {
            client: build_client(config.request_timeout())?,
            config,
        })
    }

    async fn post<T: Serialize + Sync>(&self, url: &str, body: &T) -> Result<WebhookResponse> {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(url, status, "Webhook answered");
        Ok(WebhookResponse { status, body })
    }
}

#[async_trait]
impl CheckoutWebhook for HttpCheckoutWebhook {
    async fn submit_card_payment(&self, request: &CardPaymentRequest) -> Result<WebhookResponse> {
        self.post(&self.config.credit_card_url, request).await
    }

    async fn request_pix_charge(&self, request: &PixChargeRequest) -> Result<WebhookResponse> {
        self.post(&self.config.pix_url, request).await
    }
}
