//! Shared domain types and pure engines for Tally
//!
//! Everything in this crate is I/O free. The daemon owns storage and
//! transport, the CLI owns presentation; the scoring, streak, badge, and
//! projection rules live here so both binaries and their tests agree on
//! the math.

pub mod badges;
pub mod error;
pub mod grades;
pub mod points;
pub mod projection;
pub mod schemas;
pub mod streak;
pub mod types;

pub use error::CoreError;
pub use schemas::USER_HEADER;
