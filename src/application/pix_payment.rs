use crate::config::{PixConfig, PlanMapping};
use crate::domain::pix::{
    CountdownClock, PixChargeRequest, PixChargeResponse, PixForm, Tick, parse_expiration,
};
use crate::domain::plan::Plan;
use crate::domain::ports::{CheckoutWebhookRef, Clipboard};
use crate::domain::validation::digits_only;
use crate::error::{CheckoutError, Result};
use chrono::{DateTime, Days, FixedOffset, Local, NaiveDate, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

pub const PIX_FAILED_MESSAGE: &str = "Erro ao gerar PIX. Tente novamente.";

/// Once-per-period countdown running on its own task.
///
/// Stopping or dropping the countdown aborts the task, so no tick outlives
/// the session that owns it.
pub struct Countdown {
    remaining: watch::Receiver<u32>,
    task: JoinHandle<()>,
}

impl Countdown {
    pub fn start(seconds: u32, period: Duration) -> Self {
        let (sender, remaining) = watch::channel(seconds);
        let task = tokio::spawn(async move {
            let mut clock = CountdownClock::new(seconds);
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            loop {
                interval.tick().await;
                match clock.tick() {
                    Tick::Running(left) => {
                        debug!(remaining = left, "PIX countdown tick");
                        if sender.send(left).is_err() {
                            break;
                        }
                    }
                    Tick::Expired => {
                        info!("PIX code expired");
                        let _ = sender.send(0);
                        break;
                    }
                    Tick::Idle => break,
                }
            }
        });
        Self { remaining, task }
    }

    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    pub fn is_expired(&self) -> bool {
        self.remaining() == 0
    }

    /// Resolves when the countdown hits zero. Returns false if it was stopped
    /// first.
    pub async fn expired(&mut self) -> bool {
        self.remaining.wait_for(|left| *left == 0).await.is_ok()
    }

    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixStatus {
    Active { remaining_secs: u32 },
    Expired,
}

/// A generated PIX charge waiting to be paid.
pub struct PixSession {
    qr_code_base64: String,
    payload: String,
    expires_at: Option<DateTime<FixedOffset>>,
    countdown: Countdown,
    copy_ack: Duration,
    copied_at: Option<Instant>,
}

impl PixSession {
    pub fn start(charge: PixChargeResponse, config: &PixConfig) -> Self {
        let expires_at = charge.expiration_date.as_deref().and_then(|value| {
            let parsed = parse_expiration(value);
            if parsed.is_none() {
                warn!(value, "Unrecognized PIX expiration timestamp, using local timer only");
            }
            parsed
        });

        Self {
            qr_code_base64: charge.encoded_image,
            payload: charge.payload,
            expires_at,
            countdown: Countdown::start(config.validity_secs, config.tick()),
            copy_ack: config.copy_ack(),
            copied_at: None,
        }
    }

    pub fn qr_code_base64(&self) -> &str {
        &self.qr_code_base64
    }

    pub fn payload(&self) -> &str {
        &self.payload
    }

    pub fn expires_at(&self) -> Option<DateTime<FixedOffset>> {
        self.expires_at
    }

    /// Seconds left: the local countdown capped by the server's expiration.
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs_at(Utc::now())
    }

    pub fn remaining_secs_at(&self, now: DateTime<Utc>) -> u32 {
        let local = self.countdown.remaining();
        match self.expires_at {
            Some(expires_at) => {
                let server = (expires_at.with_timezone(&Utc) - now).num_seconds().max(0);
                local.min(u32::try_from(server).unwrap_or(u32::MAX))
            }
            None => local,
        }
    }

    pub fn status(&self) -> PixStatus {
        match self.remaining_secs() {
            0 => PixStatus::Expired,
            remaining_secs => PixStatus::Active { remaining_secs },
        }
    }

    pub fn is_expired(&self) -> bool {
        self.status() == PixStatus::Expired
    }

    /// Resolves when the code expires, by the local countdown or the server
    /// expiration, whichever comes first. Returns false if the countdown was
    /// stopped before either.
    pub async fn expired(&mut self) -> bool {
        let Some(expires_at) = self.expires_at else {
            return self.countdown.expired().await;
        };
        let server_left = (expires_at.with_timezone(&Utc) - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        tokio::select! {
            done = self.countdown.expired() => done,
            _ = tokio::time::sleep(server_left) => {
                info!("PIX code reached its server expiration");
                true
            }
        }
    }

    /// Copies the payload. Clipboard failures are logged and reported as
    /// `Ok(false)`; only an expired code is an error.
    pub fn copy_payload(&mut self, clipboard: &dyn Clipboard) -> Result<bool> {
        if self.is_expired() {
            return Err(CheckoutError::Expired);
        }
        match clipboard.write_text(&self.payload) {
            Ok(()) => {
                self.copied_at = Some(Instant::now());
                Ok(true)
            }
            Err(err) => {
                warn!(error = %err, "Failed to copy PIX payload");
                Ok(false)
            }
        }
    }

    /// True for a short while after a successful copy.
    pub fn copy_acknowledged(&self) -> bool {
        self.copied_at
            .is_some_and(|copied_at| copied_at.elapsed() < self.copy_ack)
    }

    pub fn stop(&self) {
        self.countdown.stop();
    }
}

/// Requests PIX charges and hands back sessions with a running countdown.
///
/// Every generation gets a sequence number; a response arriving after a newer
/// generation started is discarded with `StaleResult`.
pub struct PixWorkflow {
    webhook: CheckoutWebhookRef,
    mapping: PlanMapping,
    config: PixConfig,
    generation: AtomicU64,
}

impl PixWorkflow {
    pub fn new(webhook: CheckoutWebhookRef, mapping: PlanMapping, config: PixConfig) -> Self {
        Self {
            webhook,
            mapping,
            config,
            generation: AtomicU64::new(0),
        }
    }

    pub fn build_request(&self, plan: &Plan, form: &PixForm, today: NaiveDate) -> PixChargeRequest {
        let slug = self.mapping.pix_slug(&plan.id);
        let due_date = today
            .checked_add_days(Days::new(u64::from(self.config.due_in_days)))
            .unwrap_or(today);

        PixChargeRequest {
            name: form.name.clone(),
            email: form.email.clone(),
            phone: digits_only(&form.phone),
            cpf: digits_only(&form.tax_id),
            plano: slug.to_string(),
            valor: plan.annual_price(),
            external_ref: format!("{}_{}", form.email, slug),
            due_date,
        }
    }

    pub async fn generate(&self, plan: &Plan, form: &PixForm) -> Result<PixSession> {
        self.generate_on(plan, form, Local::now().date_naive()).await
    }

    pub async fn generate_on(
        &self,
        plan: &Plan,
        form: &PixForm,
        today: NaiveDate,
    ) -> Result<PixSession> {
        form.validate()?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let request = self.build_request(plan, form, today);
        info!(
            plan = %plan.id,
            external_ref = %request.external_ref,
            due_date = %request.due_date,
            "Requesting PIX charge"
        );

        let response = self.webhook.request_pix_charge(&request).await?;

        if self.generation.load(Ordering::SeqCst) != generation {
            warn!(generation, "Discarding PIX response from a superseded request");
            return Err(CheckoutError::StaleResult);
        }

        if !response.is_success() {
            error!(status = response.status, body = %response.body, "PIX generation failed");
            return Err(CheckoutError::Gateway(format!(
                "Erro HTTP {}: {}",
                response.status, response.body
            )));
        }

        let charge: PixChargeResponse = serde_json::from_str(&response.body)?;
        if !charge.success {
            error!(body = %response.body, "PIX gateway reported failure");
            return Err(CheckoutError::Gateway(PIX_FAILED_MESSAGE.to_string()));
        }

        info!(plan = %plan.id, "PIX charge generated");
        Ok(PixSession::start(charge, &self.config))
    }
}
