//! Checkout domain: plans, forms, validators, the step state machine and the
//! ports the workflows talk through.

pub mod card;
pub mod checkout;
pub mod pix;
pub mod plan;
pub mod ports;
pub mod validation;
