//! Application layer module
//!
//! This module contains the refresh orchestration, the concurrent worker
//! pool and the engine facade that tie the domain and infrastructure
//! layers together.

pub mod engine;
pub mod pool;
pub mod refresh;

// Re-export commonly used items
pub use engine::SyncEngine;
pub use pool::RefreshPool;
pub use refresh::{RefreshOrchestrator, RefreshState};
