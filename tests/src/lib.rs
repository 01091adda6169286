//! # L2 Sequencer Core Test Suite
//!
//! Unified test crate for cross-subsystem choreography.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── flows.rs          # Consensus finalization → anchoring flow
//!     └── e2e_recovery.rs   # Full reorg detection and recovery pipeline
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p l2-core-tests
//!
//! # By category
//! cargo test -p l2-core-tests integration::
//! ```

#![allow(dead_code)]

pub mod integration;
