//! Business logic shared by handlers.

pub mod reconcile;

pub use reconcile::{Correction, Reconciler};
