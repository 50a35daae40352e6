use crate::domain::card::{Field, FieldErrors};
use crate::domain::validation::format_brl;
use crate::error::{CheckoutError, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

pub const MONTHS_PER_YEAR: u32 = 12;
pub const MAX_INSTALLMENTS: u8 = 12;

/// A subscription plan offered at checkout.
///
/// Plans are configuration: the price is monthly, while every payment covers
/// a full year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub id: String,
    pub name: String,
    #[serde(alias = "price")]
    pub monthly_price: Decimal,
    pub description: String,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Plan {
    pub fn annual_price(&self) -> Decimal {
        self.monthly_price * Decimal::from(MONTHS_PER_YEAR)
    }

    pub fn quote(&self, installments: InstallmentCount) -> InstallmentQuote {
        InstallmentQuote::new(self.annual_price(), installments)
    }
}

/// Number of installments a card payment is split into (1 to 12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct InstallmentCount(u8);

impl InstallmentCount {
    pub const SINGLE: Self = Self(1);
    pub const MAX: Self = Self(MAX_INSTALLMENTS);

    pub fn new(count: u8) -> Result<Self> {
        if (1..=MAX_INSTALLMENTS).contains(&count) {
            Ok(Self(count))
        } else {
            Err(CheckoutError::Validation(FieldErrors::single(
                Field::Installments,
                format!("Parcelamento deve ser entre 1 e {MAX_INSTALLMENTS}x"),
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    pub fn is_lump_sum(&self) -> bool {
        self.0 == 1
    }
}

impl Default for InstallmentCount {
    fn default() -> Self {
        Self::MAX
    }
}

impl TryFrom<u8> for InstallmentCount {
    type Error = CheckoutError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<InstallmentCount> for u8 {
    fn from(count: InstallmentCount) -> Self {
        count.0
    }
}

/// Price breakdown of an annual charge split into installments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallmentQuote {
    pub count: InstallmentCount,
    pub total: Decimal,
    pub per_installment: Decimal,
}

impl InstallmentQuote {
    pub fn new(total: Decimal, count: InstallmentCount) -> Self {
        let per_installment = (total / Decimal::from(count.value()))
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        Self {
            count,
            total,
            per_installment,
        }
    }

    /// Summary line, e.g. `R$ 250,80 (à vista)` or `12x R$ 20,90`.
    pub fn summary(&self) -> String {
        if self.count.is_lump_sum() {
            format!("R$ {} (à vista)", format_brl(self.total))
        } else {
            format!(
                "{}x R$ {}",
                self.count.value(),
                format_brl(self.per_installment)
            )
        }
    }

    /// Selector label, e.g. `1x de R$ 250,80 (à vista)` or `3x de R$ 83,60`.
    pub fn option_label(&self) -> String {
        if self.count.is_lump_sum() {
            format!("1x de R$ {} (à vista)", format_brl(self.per_installment))
        } else {
            format!(
                "{}x de R$ {}",
                self.count.value(),
                format_brl(self.per_installment)
            )
        }
    }

    pub fn description(&self) -> String {
        if self.count.is_lump_sum() {
            "Pagamento à vista".to_string()
        } else {
            format!(
                "Assinatura anual parcelada em {}x sem juros",
                self.count.value()
            )
        }
    }
}

/// Every installment choice from 1x up to `max`.
pub fn installment_options(plan: &Plan, max: InstallmentCount) -> Vec<InstallmentQuote> {
    (1..=max.value())
        .map(|n| plan.quote(InstallmentCount(n)))
        .collect()
}

/// Ordered set of plans the customer can pick from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Self {
        Self { plans }
    }

    pub fn get(&self, id: &str) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.id == id)
    }

    pub fn require(&self, id: &str) -> Result<&Plan> {
        self.get(id)
            .ok_or_else(|| CheckoutError::UnknownPlan(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plan> {
        self.plans.iter()
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let features = |items: &[&str]| -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        };
        Self::new(vec![
            Plan {
                id: "silver".to_string(),
                name: "Plano Silver".to_string(),
                monthly_price: dec!(20.90),
                description: "Todos os cursos liberados".to_string(),
                features: features(&[
                    "Qualidade Boa",
                    "Suporte ao aluno",
                    "Carta para Estágio",
                    "Certificado",
                ]),
            },
            Plan {
                id: "premium".to_string(),
                name: "Plano Premium".to_string(),
                monthly_price: dec!(34.90),
                description: "Todos os cursos liberados".to_string(),
                features: features(&[
                    "Qualidade Fantástica",
                    "Suporte ao aluno",
                    "Com Carta para Estágio",
                    "Com Certificado",
                ]),
            },
        ])
    }
}
