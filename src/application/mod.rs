//! Application layer: the workflows that drive a checkout.
//!
//! `GatewayClient` owns the tokenization library's load lifecycle,
//! `CardPaymentWorkflow` turns a validated card form into a payment, and
//! `PixWorkflow` requests PIX charges and tracks their expiry.

pub mod card_payment;
pub mod gateway;
pub mod pix_payment;
