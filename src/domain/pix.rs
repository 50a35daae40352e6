use crate::domain::card::{Field, FieldErrors};
use crate::error::{CheckoutError, Result};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Brasília time, used when the gateway sends a timestamp without an offset.
const GATEWAY_UTC_OFFSET_SECS: i32 = -3 * 3600;

/// Customer data collected before a PIX charge is generated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PixForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub tax_id: String,
}

impl PixForm {
    pub fn validate(&self) -> Result<()> {
        let mut errors = FieldErrors::new();
        if self.name.trim().is_empty() {
            errors.insert(Field::Name, "Nome é obrigatório");
        }
        if self.email.trim().is_empty() {
            errors.insert(Field::Email, "E-mail é obrigatório");
        }
        if self.phone.trim().is_empty() {
            errors.insert(Field::Phone, "Telefone é obrigatório");
        }
        if self.tax_id.trim().is_empty() {
            errors.insert(Field::TaxId, "CPF é obrigatório");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CheckoutError::Validation(errors))
        }
    }
}

/// Body posted to the PIX webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PixChargeRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub cpf: String,
    pub plano: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub valor: Decimal,
    pub external_ref: String,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PixChargeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub encoded_image: String,
    #[serde(default)]
    pub payload: String,
    #[serde(default)]
    pub expiration_date: Option<String>,
}

/// Parses the gateway's expiration timestamp.
///
/// Accepts RFC 3339 or `YYYY-MM-DD HH:MM:SS` in Brasília time.
pub fn parse_expiration(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed);
    }
    let naive = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S").ok()?;
    FixedOffset::east_opt(GATEWAY_UTC_OFFSET_SECS)?
        .from_local_datetime(&naive)
        .single()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Running(u32),
    Expired,
    Idle,
}

/// Seconds left on a PIX code. Never goes below zero and reports expiry once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownClock {
    remaining: u32,
}

impl CountdownClock {
    pub fn new(seconds: u32) -> Self {
        Self { remaining: seconds }
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    pub fn tick(&mut self) -> Tick {
        match self.remaining {
            0 => Tick::Idle,
            1 => {
                self.remaining = 0;
                Tick::Expired
            }
            _ => {
                self.remaining -= 1;
                Tick::Running(self.remaining)
            }
        }
    }
}
