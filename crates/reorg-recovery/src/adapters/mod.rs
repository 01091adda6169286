//! Adapter implementations for the outbound ports.

pub mod state_executor;

pub use state_executor::InMemoryStateExecutor;
