use crate::domain::plan::Plan;
use crate::error::{CheckoutError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

pub const TOTAL_STEPS: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    CreditCard,
    Pix,
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaymentMethod::CreditCard => f.write_str("credit card"),
            PaymentMethod::Pix => f.write_str("PIX"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    PlanSelection,
    PaymentMethodSelection,
    CreditCardEntry,
    PixEntry,
}

impl Step {
    pub fn number(&self) -> u8 {
        match self {
            Step::PlanSelection => 1,
            Step::PaymentMethodSelection => 2,
            Step::CreditCardEntry => 3,
            Step::PixEntry => 4,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::PlanSelection => "plan selection",
            Step::PaymentMethodSelection => "payment method selection",
            Step::CreditCardEntry => "credit card entry",
            Step::PixEntry => "PIX entry",
        };
        write!(f, "step {} ({name})", self.number())
    }
}

/// Where the customer is in the checkout.
///
/// The selected plan lives inside the variants that require one, so a state
/// such as "card entry without a plan" cannot be built. Transitions that do
/// not apply to the current step fail with `InvalidTransition` and leave the
/// state as it was.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CheckoutState {
    #[default]
    PlanSelection,
    PaymentMethodSelection {
        plan: Plan,
    },
    CreditCardEntry {
        plan: Plan,
    },
    PixEntry {
        plan: Plan,
    },
}

impl CheckoutState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        match self {
            Self::PlanSelection => Step::PlanSelection,
            Self::PaymentMethodSelection { .. } => Step::PaymentMethodSelection,
            Self::CreditCardEntry { .. } => Step::CreditCardEntry,
            Self::PixEntry { .. } => Step::PixEntry,
        }
    }

    pub fn selected_plan(&self) -> Option<&Plan> {
        match self {
            Self::PlanSelection => None,
            Self::PaymentMethodSelection { plan }
            | Self::CreditCardEntry { plan }
            | Self::PixEntry { plan } => Some(plan),
        }
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        match self {
            Self::CreditCardEntry { .. } => Some(PaymentMethod::CreditCard),
            Self::PixEntry { .. } => Some(PaymentMethod::Pix),
            _ => None,
        }
    }

    /// Progress label shown above every step, e.g. `PASSO 2 DE 4`.
    pub fn step_indicator(&self) -> String {
        format!("PASSO {} DE {}", self.step().number(), TOTAL_STEPS)
    }

    pub fn select_plan(&mut self, plan: Plan) -> Result<()> {
        match std::mem::take(self) {
            Self::PlanSelection => {
                info!(plan = %plan.id, "Plan selected");
                *self = Self::PaymentMethodSelection { plan };
                Ok(())
            }
            other => self.reject(other, "select a plan"),
        }
    }

    pub fn select_payment_method(&mut self, method: PaymentMethod) -> Result<()> {
        match std::mem::take(self) {
            Self::PaymentMethodSelection { plan } => {
                info!(plan = %plan.id, method = %method, "Payment method selected");
                *self = match method {
                    PaymentMethod::CreditCard => Self::CreditCardEntry { plan },
                    PaymentMethod::Pix => Self::PixEntry { plan },
                };
                Ok(())
            }
            other => self.reject(other, "select a payment method"),
        }
    }

    /// Goes one step back, forgetting the choice made on the current step.
    pub fn back(&mut self) -> Result<()> {
        match std::mem::take(self) {
            Self::PaymentMethodSelection { plan } => {
                info!(plan = %plan.id, "Back to plan selection");
                *self = Self::PlanSelection;
                Ok(())
            }
            Self::CreditCardEntry { plan } | Self::PixEntry { plan } => {
                info!(plan = %plan.id, "Back to payment method selection");
                *self = Self::PaymentMethodSelection { plan };
                Ok(())
            }
            other => self.reject(other, "go back"),
        }
    }

    /// Returns to the first step, e.g. to make a new payment after a success.
    pub fn start_over(&mut self) {
        *self = Self::PlanSelection;
    }

    /// The plan being paid with `method`, if that payment step is active.
    pub fn plan_for(&self, method: PaymentMethod) -> Result<&Plan> {
        match (self, method) {
            (Self::CreditCardEntry { plan }, PaymentMethod::CreditCard)
            | (Self::PixEntry { plan }, PaymentMethod::Pix) => Ok(plan),
            _ => Err(CheckoutError::InvalidTransition {
                from: self.step().to_string(),
                action: "submit a payment",
            }),
        }
    }

    fn reject(&mut self, previous: Self, action: &'static str) -> Result<()> {
        let from = previous.step().to_string();
        *self = previous;
        Err(CheckoutError::InvalidTransition { from, action })
    }
}
