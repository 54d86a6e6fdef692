//! # Verification Service
//!
//! Composes the [`LedgerReader`], the relational [`MetadataStore`] and the
//! result cache into the public verification operations:
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | [`verify`](VerificationService::verify) | cached 60 s, audit row best-effort |
//! | [`verify_batch`](VerificationService::verify_batch) | 1..=50 ids, per-item isolation |
//! | [`verify_from_qr`](VerificationService::verify_from_qr) | JSON payload to `verify` |
//! | [`generate_qr`](VerificationService::generate_qr) | PNG data URL |
//! | [`public_info`](VerificationService::public_info) | shareable projection |
//! | [`search`](VerificationService::search) | active credentials by issuer/schema |
//!
//! ## Failure Policy
//!
//! Enrichment and cache failures never fail a verification: they degrade to
//! placeholders and are reported to the [`VerificationObserver`]. Ledger
//! failures always fail it, unless the fallback strategy substitutes a
//! record.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use trustcred_core::{BatchResult, CredentialId, PublicCredentialInfo, VerificationResult};
use trustcred_ledger::NetworkInfo;

use crate::cache::{CacheKeys, CacheStore, VERIFICATION_TTL};
use crate::error::VerifyError;
use crate::merge::{merge, Enrichment};
use crate::observer::{CacheNamespace, VerificationObserver};
use crate::qr::{self, QrOptions, QrPayload};
use crate::reader::{LedgerHealth, LedgerReader};
use crate::store::{AuditEntry, MetadataStore, SearchPage, SearchQuery, SEARCH_MAX_LIMIT};

/// Maximum number of identifiers in one batch.
pub const MAX_BATCH_SIZE: usize = 50;

const SEARCH_TERM_MIN: usize = 2;
const SEARCH_TERM_MAX: usize = 100;

/// The verification pipeline. Cheap to clone; all collaborators are shared.
#[derive(Clone)]
pub struct VerificationService {
    reader: LedgerReader,
    cache: Arc<dyn CacheStore>,
    keys: CacheKeys,
    store: Arc<dyn MetadataStore>,
    observer: Arc<dyn VerificationObserver>,
    base_url: String,
}

impl std::fmt::Debug for VerificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationService")
            .field("reader", &self.reader)
            .field("store", &self.store.backend())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl VerificationService {
    pub fn new(
        reader: LedgerReader,
        cache: Arc<dyn CacheStore>,
        keys: CacheKeys,
        store: Arc<dyn MetadataStore>,
        observer: Arc<dyn VerificationObserver>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            cache,
            keys,
            store,
            observer,
            base_url: base_url.into(),
        }
    }

    pub fn reader(&self) -> &LedgerReader {
        &self.reader
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    // -- Single verification ---------------------------------------------------

    /// Verify a credential by its textual identifier.
    ///
    /// A malformed id fails with [`VerifyError::InvalidArgument`] before any
    /// cache, ledger or database access.
    pub async fn verify(&self, raw_id: &str) -> Result<VerificationResult, VerifyError> {
        let id = CredentialId::new(raw_id)?;
        self.verify_id(&id).await
    }

    /// Verify a credential by validated identifier.
    pub async fn verify_id(&self, id: &CredentialId) -> Result<VerificationResult, VerifyError> {
        let key = self.keys.verification(id);

        if let Some(cached) = self.cached_result(&key).await {
            if cached.exists {
                self.audit(&cached).await;
            }
            return Ok(cached);
        }

        let read = self.reader.read(id).await?;
        let now = Utc::now();

        let Some(credential) = read.credential else {
            let result = VerificationResult::not_found(id.clone(), now);
            self.cache_result(&key, &result).await;
            self.observer.on_verified(&result);
            return Ok(result);
        };

        let enrichment = self.enrich(&credential).await;
        let result = merge(&credential, enrichment, now);

        self.audit(&result).await;
        if !read.substituted {
            self.cache_result(&key, &result).await;
        }
        self.observer.on_verified(&result);
        Ok(result)
    }

    async fn enrich(&self, credential: &trustcred_core::Credential) -> Enrichment {
        let row = match self.store.credential_row(&credential.credential_id).await {
            Ok(row) => row,
            Err(err) => {
                self.observer.on_store_degraded("credential_metadata", &err.to_string());
                None
            }
        };

        let issuer = match self.store.issuer(&credential.issuer).await {
            Ok(issuer) => issuer,
            Err(err) => {
                self.observer.on_store_degraded("issuer_lookup", &err.to_string());
                None
            }
        };

        let schema_id = row
            .as_ref()
            .and_then(|r| r.schema_id.clone())
            .unwrap_or_else(|| credential.schema_id.clone());
        let schema = if schema_id.is_empty() {
            None
        } else {
            match self.store.schema(&schema_id).await {
                Ok(schema) => schema,
                Err(err) => {
                    self.observer.on_store_degraded("schema_lookup", &err.to_string());
                    None
                }
            }
        };

        Enrichment { row, issuer, schema }
    }

    async fn audit(&self, result: &VerificationResult) {
        let entry = AuditEntry {
            credential_id: result.credential_id.clone(),
            valid: result.valid,
            revoked: result.revoked,
            expired: result.expired,
            verification_timestamp: result.verification_timestamp,
        };
        if let Err(err) = self.store.record_verification(&entry).await {
            self.observer.on_store_degraded("verification_log", &err.to_string());
        }
    }

    async fn cached_result(&self, key: &str) -> Option<VerificationResult> {
        let raw = match self.cache.get(key).await {
            Ok(raw) => raw,
            Err(err) => {
                self.observer.on_store_degraded("cache_read", &err.to_string());
                None
            }
        };
        let decoded = raw.and_then(|raw| serde_json::from_str(&raw).ok());
        self.observer
            .on_cache_lookup(CacheNamespace::Verification, decoded.is_some());
        decoded
    }

    async fn cache_result(&self, key: &str, result: &VerificationResult) {
        let outcome = match serde_json::to_string(result) {
            Ok(raw) => self.cache.set_ex(key, &raw, VERIFICATION_TTL).await,
            Err(err) => Err(err.into()),
        };
        if let Err(err) = outcome {
            self.observer.on_store_degraded("cache_write", &err.to_string());
        }
    }

    // -- Batch -------------------------------------------------------------------

    /// Verify up to [`MAX_BATCH_SIZE`] credentials concurrently.
    ///
    /// The whole batch is rejected if it is empty, too large, or contains a
    /// malformed id. Once started, a failing item becomes an error-flavored
    /// result in its slot; siblings are unaffected.
    pub async fn verify_batch(&self, raw_ids: &[String]) -> Result<BatchResult, VerifyError> {
        if raw_ids.is_empty() || raw_ids.len() > MAX_BATCH_SIZE {
            return Err(VerifyError::InvalidArgument(format!(
                "batch must contain between 1 and {MAX_BATCH_SIZE} credential IDs, got {}",
                raw_ids.len()
            )));
        }
        let ids = raw_ids
            .iter()
            .map(|raw| CredentialId::new(raw.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(count = ids.len(), "starting batch verification");

        let outcomes = join_all(ids.iter().map(|id| self.verify_id(id))).await;
        let now = Utc::now();
        let results = ids
            .into_iter()
            .zip(outcomes)
            .map(|(id, outcome)| match outcome {
                Ok(result) => result,
                Err(err) => {
                    self.observer.on_verify_failed(&id, &err.to_string());
                    VerificationResult::failed(id, now)
                }
            })
            .collect();

        let batch = BatchResult::new(results, now);
        tracing::info!(
            total = batch.summary.total,
            valid = batch.summary.valid,
            invalid = batch.summary.invalid,
            not_found = batch.summary.not_found,
            "batch verification completed"
        );
        Ok(batch)
    }

    // -- QR ------------------------------------------------------------------------

    /// The JSON text a QR code for `id` would carry.
    pub fn qr_payload(&self, id: &CredentialId) -> Result<String, VerifyError> {
        QrPayload::new(id, &self.base_url, Utc::now()).to_json()
    }

    /// Render a QR code for `raw_id` as a PNG data URL.
    pub fn generate_qr(&self, raw_id: &str, options: &QrOptions) -> Result<String, VerifyError> {
        let id = CredentialId::new(raw_id)?;
        let url = qr::render_data_url(&self.qr_payload(&id)?, options)?;
        tracing::info!(credential_id = %id, "QR code generated");
        Ok(url)
    }

    /// Verify the credential a scanned QR payload points at.
    pub async fn verify_from_qr(&self, payload: &str) -> Result<VerificationResult, VerifyError> {
        let id = qr::parse_payload(payload)?;
        tracing::info!(credential_id = %id, "verifying credential from QR code");
        self.verify_id(&id).await
    }

    // -- Public info & search ------------------------------------------------------

    /// Shareable projection of a credential.
    ///
    /// # Errors
    ///
    /// [`VerifyError::NotFound`] if the credential does not exist.
    pub async fn public_info(&self, raw_id: &str) -> Result<PublicCredentialInfo, VerifyError> {
        let result = self.verify(raw_id).await?;
        PublicCredentialInfo::from_verification(&result)
            .ok_or_else(|| VerifyError::NotFound(result.credential_id.to_string()))
    }

    /// Search active credentials by issuer and/or schema.
    pub async fn search(&self, mut query: SearchQuery) -> Result<SearchPage, VerifyError> {
        query.issuer = normalize_term("issuer", query.issuer)?;
        query.schema = normalize_term("schema", query.schema)?;
        if query.limit == 0 || query.limit > SEARCH_MAX_LIMIT {
            return Err(VerifyError::InvalidArgument(format!(
                "limit must be between 1 and {SEARCH_MAX_LIMIT}"
            )));
        }

        let page = self
            .store
            .search(&query)
            .await
            .map_err(|e| VerifyError::Internal(format!("search failed: {e}")))?;
        tracing::info!(
            issuer = ?query.issuer,
            schema = ?query.schema,
            result_count = page.credentials.len(),
            total = page.total,
            "public credential search completed"
        );
        Ok(page)
    }

    // -- Cache & health ----------------------------------------------------------------

    /// Drop cached entries for a credential after an external update.
    pub async fn invalidate(&self, raw_id: &str) -> Result<(), VerifyError> {
        let id = CredentialId::new(raw_id)?;
        self.reader.invalidate(&id).await;
        Ok(())
    }

    pub async fn ledger_health(&self) -> LedgerHealth {
        self.reader.health().await
    }

    pub fn network_info(&self) -> NetworkInfo {
        self.reader.network_info()
    }
}

fn normalize_term(field: &str, term: Option<String>) -> Result<Option<String>, VerifyError> {
    let Some(term) = term else {
        return Ok(None);
    };
    let trimmed = term.trim();
    let len = trimmed.chars().count();
    if !(SEARCH_TERM_MIN..=SEARCH_TERM_MAX).contains(&len) {
        return Err(VerifyError::InvalidArgument(format!(
            "{field} must be between {SEARCH_TERM_MIN} and {SEARCH_TERM_MAX} characters"
        )));
    }
    Ok(Some(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_terms_are_trimmed_and_bounded() {
        assert_eq!(
            normalize_term("issuer", Some("  MIT  ".into())).unwrap().as_deref(),
            Some("MIT")
        );
        assert!(normalize_term("issuer", Some(" a ".into())).is_err());
        assert!(normalize_term("schema", Some("x".repeat(101))).is_err());
        assert_eq!(normalize_term("schema", None).unwrap(), None);
    }
}
