//! # Shared Types Crate
//!
//! Cross-subsystem entities for the L2 sequencer core.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: every type that crosses a subsystem
//!   boundary (consensus ⇄ reorg recovery ⇄ external collaborators) is
//!   defined here, once.
//! - **Plain data**: entities carry no behavior beyond hashing and
//!   validation helpers; all protocol logic lives in the subsystem crates.

pub mod entities;

pub use entities::*;
