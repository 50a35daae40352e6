use crate::application::gateway::GatewayClient;
use crate::config::PlanMapping;
use crate::domain::card::{CardForm, CardPaymentRequest, PaymentReceipt};
use crate::domain::plan::Plan;
use crate::domain::ports::CheckoutWebhookRef;
use crate::error::{CheckoutError, GatewayLoadError, HttpErrorKind, Result};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tracing::{error, info, warn};

pub const INVALID_CARD_MESSAGE: &str =
    "Dados do cartão inválidos. Verifique o número, validade e CVV.";
pub const DECLINED_CARD_MESSAGE: &str =
    "Cartão recusado. Verifique os dados ou tente outro cartão.";
pub const UNEXPECTED_ERROR_MESSAGE: &str = "Erro inesperado. Tente novamente em alguns minutos.";

/// Maps a tokenization rejection to the message shown to the customer.
pub fn tokenization_message(raw: &str) -> &'static str {
    if raw.contains("Invalid card") {
        INVALID_CARD_MESSAGE
    } else if raw.contains("card_declined") {
        DECLINED_CARD_MESSAGE
    } else {
        UNEXPECTED_ERROR_MESSAGE
    }
}

/// Validate, tokenize, submit, interpret: one card payment attempt.
///
/// Nothing is retried automatically. After a failure the customer fixes the
/// form (or reloads the gateway) and submits again.
pub struct CardPaymentWorkflow {
    gateway: Arc<GatewayClient>,
    webhook: CheckoutWebhookRef,
    mapping: PlanMapping,
}

impl CardPaymentWorkflow {
    pub fn new(
        gateway: Arc<GatewayClient>,
        webhook: CheckoutWebhookRef,
        mapping: PlanMapping,
    ) -> Self {
        Self {
            gateway,
            webhook,
            mapping,
        }
    }

    pub fn gateway(&self) -> &Arc<GatewayClient> {
        &self.gateway
    }

    pub async fn submit(&self, plan: &Plan, form: &mut CardForm) -> Result<PaymentReceipt> {
        self.submit_on(plan, form, Local::now().date_naive()).await
    }

    /// Same as [`submit`](Self::submit), judging card expiry against `today`.
    pub async fn submit_on(
        &self,
        plan: &Plan,
        form: &mut CardForm,
        today: NaiveDate,
    ) -> Result<PaymentReceipt> {
        if !self.gateway.is_loaded().await {
            warn!("Card submitted before the payment gateway finished loading");
            return Err(GatewayLoadError::NotLoaded.into());
        }

        if !form.validate(today) {
            info!(errors = %form.errors(), "Card form rejected");
            return Err(CheckoutError::Validation(form.errors().clone()));
        }

        let card_token = self
            .gateway
            .tokenize(&form.token_request())
            .await
            .map_err(|err| {
                error!(error = %err, "Card tokenization failed");
                match err {
                    CheckoutError::Gateway(raw) => {
                        CheckoutError::Gateway(tokenization_message(&raw).to_string())
                    }
                    CheckoutError::GatewayLoad(_) => err,
                    _ => CheckoutError::Gateway(UNEXPECTED_ERROR_MESSAGE.to_string()),
                }
            })?;

        let installments = form.installments();
        let request = CardPaymentRequest {
            plan_id: self.mapping.provider_plan_id(&plan.id).to_string(),
            card_token,
            installments: installments.value(),
            customer: form.customer(),
        };

        info!(
            plan = %plan.id,
            provider_plan = %request.plan_id,
            installments = request.installments,
            "Submitting card payment"
        );
        let response = self.webhook.submit_card_payment(&request).await?;

        if !response.is_success() {
            error!(status = response.status, body = %response.body, "Card payment rejected");
            return Err(CheckoutError::Http {
                kind: HttpErrorKind::from_status(response.status),
                status: response.status,
            });
        }

        let body = serde_json::from_str(&response.body).unwrap_or_else(|_| {
            warn!("Card payment response is not JSON, keeping raw body");
            serde_json::Value::String(response.body.clone())
        });

        info!(plan = %plan.id, "Card payment approved");
        form.clear();

        Ok(PaymentReceipt {
            plan_id: plan.id.clone(),
            plan_name: plan.name.clone(),
            quote: plan.quote(installments),
            response: body,
        })
    }
}
