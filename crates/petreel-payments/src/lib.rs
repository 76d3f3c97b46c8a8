//! Stripe payment intents for the PetReel checkout.
//!
//! Pass-through only: the price is fixed by configuration and no payment
//! state is stored locally.

pub mod client;
pub mod error;

pub use client::{PaymentConfig, PaymentIntent, StripeClient, PRODUCT_TAG};
pub use error::{PaymentError, PaymentResult};
