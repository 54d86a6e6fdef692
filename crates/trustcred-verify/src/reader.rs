//! # Ledger Reader
//!
//! Cache-checked credential reads. A hit on `credential:{id}` is returned
//! without touching the ledger; a miss issues one read-only contract call
//! and caches the normalized record for [`CREDENTIAL_TTL`]. Ledger failures
//! go to the configured [`FallbackStrategy`]; substituted records are not
//! cached. Cache failures degrade to a miss.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use trustcred_core::{Credential, CredentialId};
use trustcred_ledger::{CredentialLedger, NetworkInfo};

use crate::cache::{CacheKeys, CacheStore, CREDENTIAL_TTL};
use crate::error::VerifyError;
use crate::fallback::FallbackStrategy;
use crate::observer::{CacheNamespace, VerificationObserver};

/// Outcome of a ledger read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRead {
    pub credential: Option<Credential>,
    /// The record came from the fallback strategy, not the ledger.
    pub substituted: bool,
}

/// Ledger connectivity report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerHealth {
    pub healthy: bool,
    pub network: String,
    /// Round-trip time of the probe call; absent when it failed.
    pub latency_ms: Option<u64>,
}

/// Cache-checked reader over a [`CredentialLedger`].
#[derive(Clone)]
pub struct LedgerReader {
    ledger: Arc<dyn CredentialLedger>,
    cache: Arc<dyn CacheStore>,
    keys: CacheKeys,
    fallback: Arc<dyn FallbackStrategy>,
    observer: Arc<dyn VerificationObserver>,
}

impl std::fmt::Debug for LedgerReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerReader")
            .field("network", &self.ledger.network_info())
            .field("cache", &self.cache.backend())
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl LedgerReader {
    pub fn new(
        ledger: Arc<dyn CredentialLedger>,
        cache: Arc<dyn CacheStore>,
        keys: CacheKeys,
        fallback: Arc<dyn FallbackStrategy>,
        observer: Arc<dyn VerificationObserver>,
    ) -> Self {
        Self {
            ledger,
            cache,
            keys,
            fallback,
            observer,
        }
    }

    /// Read a credential by its textual identifier.
    ///
    /// # Errors
    ///
    /// [`VerifyError::InvalidArgument`] for a malformed id (before any cache
    /// or ledger access); [`VerifyError::LedgerUnavailable`] when the ledger
    /// fails and the fallback strategy declines.
    pub async fn get_credential(&self, raw_id: &str) -> Result<Option<Credential>, VerifyError> {
        let id = CredentialId::new(raw_id)?;
        Ok(self.read(&id).await?.credential)
    }

    /// Read a credential by validated identifier.
    pub async fn read(&self, id: &CredentialId) -> Result<LedgerRead, VerifyError> {
        let key = self.keys.credential(id);

        if let Some(cached) = self.cached(&key).await {
            return Ok(LedgerRead {
                credential: Some(cached),
                substituted: false,
            });
        }

        match self.ledger.fetch_credential(id).await {
            Ok(Some(credential)) => {
                self.store(&key, &credential).await;
                Ok(LedgerRead {
                    credential: Some(credential),
                    substituted: false,
                })
            }
            Ok(None) => {
                tracing::info!(credential_id = %id, "credential not found on ledger");
                Ok(LedgerRead {
                    credential: None,
                    substituted: false,
                })
            }
            Err(err) => {
                self.observer.on_ledger_fallback(id, &err);
                let credential = self
                    .fallback
                    .on_ledger_error(id, err)
                    .map_err(VerifyError::LedgerUnavailable)?;
                Ok(LedgerRead {
                    credential: Some(credential),
                    substituted: true,
                })
            }
        }
    }

    /// Whether the credential exists. Every error maps to `false`.
    pub async fn credential_exists(&self, raw_id: &str) -> bool {
        match self.get_credential(raw_id).await {
            Ok(found) => found.is_some(),
            Err(err) => {
                tracing::warn!(error = %err, "existence check failed");
                false
            }
        }
    }

    /// Drop both cached entries for `id`. Failures are reported, not returned.
    pub async fn invalidate(&self, id: &CredentialId) {
        for key in [self.keys.credential(id), self.keys.verification(id)] {
            if let Err(err) = self.cache.del(&key).await {
                self.observer.on_store_degraded("cache_invalidate", &err.to_string());
            }
        }
        tracing::info!(credential_id = %id, "cache invalidated for credential");
    }

    /// Probe the ledger with a read-only call and time it.
    pub async fn health(&self) -> LedgerHealth {
        let network = self.ledger.network_info().network;
        let started = Instant::now();
        match self.ledger.probe().await {
            Ok(()) => LedgerHealth {
                healthy: true,
                network,
                latency_ms: Some(started.elapsed().as_millis() as u64),
            },
            Err(err) => {
                tracing::error!(error = %err, "ledger health check failed");
                LedgerHealth {
                    healthy: false,
                    network,
                    latency_ms: None,
                }
            }
        }
    }

    pub fn network_info(&self) -> NetworkInfo {
        self.ledger.network_info()
    }

    async fn cached(&self, key: &str) -> Option<Credential> {
        let hit = match self.cache.get(key).await {
            Ok(hit) => hit,
            Err(err) => {
                self.observer.on_store_degraded("cache_read", &err.to_string());
                None
            }
        };
        let decoded = hit.and_then(|raw| match serde_json::from_str::<Credential>(&raw) {
            Ok(c) => Some(c),
            Err(err) => {
                self.observer.on_store_degraded("cache_decode", &err.to_string());
                None
            }
        });
        self.observer
            .on_cache_lookup(CacheNamespace::Credential, decoded.is_some());
        decoded
    }

    async fn store(&self, key: &str, credential: &Credential) {
        let result = match serde_json::to_string(credential) {
            Ok(raw) => self.cache.set_ex(key, &raw, CREDENTIAL_TTL).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = result {
            self.observer.on_store_degraded("cache_write", &err.to_string());
        }
    }
}
