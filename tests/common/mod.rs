#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use subscription_checkout::domain::card::{CardForm, CardPaymentRequest, CardTokenRequest, Field};
use subscription_checkout::domain::pix::{PixChargeRequest, PixForm};
use subscription_checkout::domain::plan::InstallmentCount;
use subscription_checkout::domain::ports::{
    CheckoutWebhook, Clipboard, GatewayLibrary, GatewayLibraryRef, GatewayLoader, WebhookResponse,
};
use subscription_checkout::error::{CheckoutError, Result};
use tokio::sync::oneshot;

pub const VALID_CPF: &str = "529.982.247-25";

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
}

pub fn filled_card_form(installments: u8) -> CardForm {
    let mut form = CardForm::new(InstallmentCount::new(installments).unwrap());
    form.set(Field::Name, "Ana Souza");
    form.set(Field::Email, "ana@example.com");
    form.set(Field::TaxId, VALID_CPF);
    form.set(Field::CardNumber, "4111 1111 1111 1111");
    form.set(Field::CardHolder, "ANA SOUZA");
    form.set(Field::Expiry, "12/30");
    form.set(Field::Cvv, "123");
    form
}

pub fn filled_pix_form() -> PixForm {
    PixForm {
        name: "Ana Souza".into(),
        email: "ana@example.com".into(),
        phone: "(11) 98765-4321".into(),
        tax_id: VALID_CPF.into(),
    }
}

pub fn response(status: u16, body: &str) -> WebhookResponse {
    WebhookResponse {
        status,
        body: body.to_string(),
    }
}

pub fn pix_success_body(expiration_date: &str) -> String {
    serde_json::json!({
        "success": true,
        "encodedImage": "iVBORw0KGgoAAAANSUhEUg==",
        "payload": "00020126580014BR.GOV.BCB.PIX0136abc",
        "expirationDate": expiration_date,
    })
    .to_string()
}

/// Tokenizer that returns `card_<last four>` or a scripted rejection.
pub struct FakeLibrary {
    rejection: Option<String>,
    pub calls: Mutex<Vec<CardTokenRequest>>,
}

impl FakeLibrary {
    pub fn accepting() -> Arc<Self> {
        Arc::new(Self {
            rejection: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn rejecting(raw: &str) -> Arc<Self> {
        Arc::new(Self {
            rejection: Some(raw.to_string()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl GatewayLibrary for FakeLibrary {
    async fn create_card_token(
        &self,
        _encryption_key: &str,
        card: &CardTokenRequest,
    ) -> Result<String> {
        self.calls.lock().unwrap().push(card.clone());
        match &self.rejection {
            Some(raw) => Err(CheckoutError::Gateway(raw.clone())),
            None => Ok(format!("card_{}", &card.number[card.number.len() - 4..])),
        }
    }
}

/// Loader that hands out the same library for every URL.
pub struct FakeLoader {
    library: Arc<FakeLibrary>,
}

impl FakeLoader {
    pub fn new(library: Arc<FakeLibrary>) -> Arc<Self> {
        Arc::new(Self { library })
    }
}

#[async_trait]
impl GatewayLoader for FakeLoader {
    async fn load(&self, _url: &str) -> Result<GatewayLibraryRef> {
        Ok(self.library.clone())
    }
}

/// Records every request and answers from scripted queues (200 `{}` when
/// empty). A queued PIX gate holds that call until it is released.
#[derive(Default)]
pub struct FakeWebhook {
    card_responses: Mutex<VecDeque<WebhookResponse>>,
    pix_responses: Mutex<VecDeque<WebhookResponse>>,
    pix_gates: Mutex<VecDeque<Option<oneshot::Receiver<()>>>>,
    pub card_requests: Mutex<Vec<CardPaymentRequest>>,
    pub pix_requests: Mutex<Vec<PixChargeRequest>>,
}

impl FakeWebhook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_card_response(&self, response: WebhookResponse) {
        self.card_responses.lock().unwrap().push_back(response);
    }

    pub fn push_pix_response(&self, response: WebhookResponse) {
        self.pix_responses.lock().unwrap().push_back(response);
    }

    /// The next PIX call waits until the returned sender fires.
    pub fn gate_next_pix(&self) -> oneshot::Sender<()> {
        let (release, gate) = oneshot::channel();
        self.pix_gates.lock().unwrap().push_back(Some(gate));
        release
    }

    pub fn pass_next_pix(&self) {
        self.pix_gates.lock().unwrap().push_back(None);
    }

    pub fn card_requests(&self) -> Vec<CardPaymentRequest> {
        self.card_requests.lock().unwrap().clone()
    }

    pub fn pix_requests(&self) -> Vec<PixChargeRequest> {
        self.pix_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckoutWebhook for FakeWebhook {
    async fn submit_card_payment(&self, request: &CardPaymentRequest) -> Result<WebhookResponse> {
        self.card_requests.lock().unwrap().push(request.clone());
        let next = self.card_responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| response(200, "{}")))
    }

    async fn request_pix_charge(&self, request: &PixChargeRequest) -> Result<WebhookResponse> {
        self.pix_requests.lock().unwrap().push(request.clone());
        let gate = self.pix_gates.lock().unwrap().pop_front().flatten();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        let next = self.pix_responses.lock().unwrap().pop_front();
        Ok(next.unwrap_or_else(|| response(200, "{}")))
    }
}

pub struct FailingClipboard;

impl Clipboard for FailingClipboard {
    fn write_text(&self, _text: &str) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "clipboard denied"))
    }
}
