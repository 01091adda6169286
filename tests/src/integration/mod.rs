//! Cross-subsystem integration tests.

pub mod e2e_recovery;
pub mod flows;
