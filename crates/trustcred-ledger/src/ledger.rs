//! The credential ledger seam.
//!
//! [`CredentialLedger`] is implemented by [`StacksLedger`](crate::StacksLedger)
//! for a live node and by in-process fakes in tests. Implementations must be
//! `Send + Sync` so they can be shared across request tasks behind an `Arc`.

use async_trait::async_trait;
use serde::Serialize;
use trustcred_core::{Credential, CredentialId};

use crate::error::LedgerError;

/// Network and contract the ledger reads from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub network: String,
    pub contract_address: String,
}

/// Read-only access to credential records on the ledger.
#[async_trait]
pub trait CredentialLedger: Send + Sync {
    /// Read a credential. `Ok(None)` means the contract has no record under
    /// `id`; any `Err` means the ledger could not be read.
    async fn fetch_credential(&self, id: &CredentialId) -> Result<Option<Credential>, LedgerError>;

    /// Issue a cheap read-only call to confirm the ledger is reachable.
    async fn probe(&self) -> Result<(), LedgerError>;

    fn network_info(&self) -> NetworkInfo;
}
