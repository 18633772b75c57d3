//! Integrity verification of received punches.
//!
//! Received punches are reconciled against the [`ReferenceStore`] of
//! transmitted punches under one of two [`MatchPolicy`] variants:
//! positional (strict order) or identifier-keyed (order-free, keyed on the
//! serial id carried in each punch).

pub mod error;
pub mod store;
pub mod verifier;

pub use error::{Result, VerifyError};
pub use store::ReferenceStore;
pub use verifier::{verify, MatchPolicy, Verified};
