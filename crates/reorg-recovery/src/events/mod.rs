//! Events delivered to reorg observers.

use crate::domain::{ReorgDetection, ReorgRecovery};
use serde::{Deserialize, Serialize};

/// Delivered after a recovery run completes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReorgEvent {
    pub detection: ReorgDetection,
    pub recovery: ReorgRecovery,
}
