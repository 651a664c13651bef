//! Crash-recovery port the coordinator consumes.

use async_trait::async_trait;
use std::time::Duration;

use crate::domain::errors::DomainResult;
use crate::domain::models::{RecoveryReport, StalledOwner};

/// Detects owners whose heartbeat lapsed and restores their molecules.
#[async_trait]
pub trait OwnerRecovery: Send + Sync {
    async fn detect_stalled_owners(&self, timeout: Duration) -> DomainResult<Vec<StalledOwner>>;

    async fn recover_owner(&self, owner: &str) -> DomainResult<RecoveryReport>;
}
