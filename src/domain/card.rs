use crate::domain::plan::{InstallmentCount, InstallmentQuote};
use crate::domain::validation::{
    MAX_CARD_DIGITS, MIN_CARD_DIGITS, MIN_CVV_DIGITS, digits_only, format_card_number,
    format_cvv, format_expiry, format_tax_id, sanitize_name, validate_email, validate_expiry,
    validate_tax_id,
};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Input fields across the card and PIX forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Name,
    Email,
    TaxId,
    Phone,
    CardNumber,
    CardHolder,
    Expiry,
    Cvv,
    Installments,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Email => "email",
            Field::TaxId => "cpf",
            Field::Phone => "phone",
            Field::CardNumber => "cardNumber",
            Field::CardHolder => "cardName",
            Field::Expiry => "expiryDate",
            Field::Cvv => "cvv",
            Field::Installments => "installments",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field validation messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<Field, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: Field, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.insert(field, message);
        errors
    }

    pub fn insert(&mut self, field: Field, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        self.0.get(&field).map(String::as_str)
    }

    pub fn remove(&mut self, field: Field) {
        self.0.remove(&field);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (field, message)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
        }
        Ok(())
    }
}

/// Credit card form state, mutated keystroke by keystroke.
///
/// Setters apply the same masks the input fields show, so the stored values
/// are always display-ready. Digits are extracted when a request is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardForm {
    name: String,
    email: String,
    tax_id: String,
    card_number: String,
    card_holder: String,
    expiry: String,
    cvv: String,
    installments: InstallmentCount,
    errors: FieldErrors,
}

impl CardForm {
    pub fn new(installments: InstallmentCount) -> Self {
        Self {
            installments,
            ..Self::default()
        }
    }

    /// Applies one edit to `field`, masking the value and dropping the
    /// field's pending error.
    pub fn set(&mut self, field: Field, value: &str) {
        self.errors.remove(field);
        match field {
            Field::Name => self.name = sanitize_name(value),
            Field::Email => self.email = value.to_string(),
            Field::TaxId => self.tax_id = format_tax_id(value),
            Field::CardNumber => self.card_number = format_card_number(value),
            Field::CardHolder => self.card_holder = sanitize_name(value),
            Field::Expiry => self.expiry = format_expiry(value),
            Field::Cvv => self.cvv = format_cvv(value),
            Field::Phone | Field::Installments => {
                tracing::debug!(field = %field, "Ignoring field not present on the card form");
            }
        }
    }

    pub fn set_installments(&mut self, installments: InstallmentCount) {
        self.errors.remove(Field::Installments);
        self.installments = installments;
    }

    pub fn value(&self, field: Field) -> &str {
        match field {
            Field::Name => &self.name,
            Field::Email => &self.email,
            Field::TaxId => &self.tax_id,
            Field::CardNumber => &self.card_number,
            Field::CardHolder => &self.card_holder,
            Field::Expiry => &self.expiry,
            Field::Cvv => &self.cvv,
            Field::Phone | Field::Installments => "",
        }
    }

    pub fn installments(&self) -> InstallmentCount {
        self.installments
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// Recomputes every field error from scratch; true when none remain.
    pub fn validate(&mut self, today: NaiveDate) -> bool {
        self.errors = self.check(today);
        self.errors.is_empty()
    }

    /// Whether the form would pass validation, without touching its errors.
    pub fn is_complete(&self, today: NaiveDate) -> bool {
        self.check(today).is_empty()
    }

    fn check(&self, today: NaiveDate) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if self.name.trim().is_empty() {
            errors.insert(Field::Name, "Nome é obrigatório");
        }

        if self.email.trim().is_empty() {
            errors.insert(Field::Email, "E-mail é obrigatório");
        } else if !validate_email(&self.email) {
            errors.insert(Field::Email, "E-mail inválido");
        }

        let tax_id = digits_only(&self.tax_id);
        if tax_id.is_empty() {
            errors.insert(Field::TaxId, "CPF é obrigatório");
        } else if !validate_tax_id(&tax_id) {
            errors.insert(Field::TaxId, "CPF inválido");
        }

        let card_digits = digits_only(&self.card_number).len();
        if card_digits == 0 {
            errors.insert(Field::CardNumber, "Número do cartão é obrigatório");
        } else if !(MIN_CARD_DIGITS..=MAX_CARD_DIGITS).contains(&card_digits) {
            errors.insert(Field::CardNumber, "Número do cartão inválido");
        }

        if self.card_holder.trim().is_empty() {
            errors.insert(Field::CardHolder, "Nome no cartão é obrigatório");
        }

        if self.expiry.is_empty() {
            errors.insert(Field::Expiry, "Data de validade é obrigatória");
        } else if !validate_expiry(&self.expiry, today) {
            errors.insert(Field::Expiry, "Data de validade inválida ou expirada");
        }

        if self.cvv.is_empty() {
            errors.insert(Field::Cvv, "CVV é obrigatório");
        } else if self.cvv.len() < MIN_CVV_DIGITS {
            errors.insert(Field::Cvv, "CVV deve ter pelo menos 3 dígitos");
        }

        errors
    }

    /// Empties every field and error. The installment choice is kept.
    pub fn clear(&mut self) {
        *self = Self::new(self.installments);
    }

    pub fn token_request(&self) -> CardTokenRequest {
        CardTokenRequest {
            number: digits_only(&self.card_number),
            holder_name: self.card_holder.clone(),
            expiration_date: self.expiry.replace('/', ""),
            cvv: self.cvv.clone(),
        }
    }

    pub fn customer(&self) -> Customer {
        Customer {
            name: self.name.clone(),
            email: self.email.clone(),
            cpf: digits_only(&self.tax_id),
        }
    }
}

/// Raw card data handed to the tokenization library; never sent to the webhook.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CardTokenRequest {
    pub number: String,
    pub holder_name: String,
    pub expiration_date: String,
    pub cvv: String,
}

impl fmt::Debug for CardTokenRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let last_four = &self.number[self.number.len().saturating_sub(4)..];
        f.debug_struct("CardTokenRequest")
            .field("number", &format_args!("**** {last_four}"))
            .field("holder_name", &self.holder_name)
            .field("expiration_date", &self.expiration_date)
            .field("cvv", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub name: String,
    pub email: String,
    pub cpf: String,
}

/// Body posted to the card payment webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardPaymentRequest {
    pub plan_id: String,
    pub card_token: String,
    pub installments: u8,
    pub customer: Customer,
}

/// Outcome of an approved card payment.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub plan_id: String,
    pub plan_name: String,
    pub quote: InstallmentQuote,
    pub response: serde_json::Value,
}
