use super::card::{CardPaymentRequest, CardTokenRequest};
use super::pix::PixChargeRequest;
use crate::error::Result;
use async_trait::async_trait;
use std::io;
use std::sync::Arc;

/// Fetches the card tokenization library from one of its published URLs.
#[async_trait]
pub trait GatewayLoader: Send + Sync {
    async fn load(&self, url: &str) -> Result<GatewayLibraryRef>;
}

/// A loaded tokenization library.
///
/// Rejections come back as `CheckoutError::Gateway` carrying the provider's
/// raw message.
#[async_trait]
pub trait GatewayLibrary: Send + Sync {
    async fn create_card_token(
        &self,
        encryption_key: &str,
        card: &CardTokenRequest,
    ) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookResponse {
    pub status: u16,
    pub body: String,
}

impl WebhookResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The payment-processing endpoints. Any HTTP status is returned as a
/// response; only transport failures are errors.
#[async_trait]
pub trait CheckoutWebhook: Send + Sync {
    async fn submit_card_payment(&self, request: &CardPaymentRequest) -> Result<WebhookResponse>;
    async fn request_pix_charge(&self, request: &PixChargeRequest) -> Result<WebhookResponse>;
}

pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str) -> io::Result<()>;
}

pub type GatewayLoaderRef = Arc<dyn GatewayLoader>;
pub type GatewayLibraryRef = Arc<dyn GatewayLibrary>;
pub type CheckoutWebhookRef = Arc<dyn CheckoutWebhook>;
