//! Stripe integration: subscription checkout brokering and webhook
//! signature verification.
//!
//! The API surface is deliberately small. Checkout talks to Stripe over
//! HTTPS; webhook verification is pure computation over the raw request
//! body, so handlers can keep the body bytes untouched until the signature
//! has been checked.

pub mod checkout;
pub mod webhook;

pub use checkout::{BillingError, CheckoutClient, CheckoutSession};
pub use webhook::{StripeEvent, WebhookError};
