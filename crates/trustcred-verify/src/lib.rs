//! # trustcred-verify
//!
//! The credential verification pipeline: a cache-checked [`LedgerReader`]
//! over a [`CredentialLedger`](trustcred_ledger::CredentialLedger), relational
//! enrichment through a [`MetadataStore`], and the [`VerificationService`]
//! that merges both into [`VerificationResult`](trustcred_core::VerificationResult)s.
//!
//! Caching, storage and fallback behavior are trait seams so the HTTP layer
//! can wire Redis and PostgreSQL in production and in-memory doubles in
//! tests.

pub mod cache;
pub mod error;
pub mod fallback;
pub mod merge;
pub mod observer;
pub mod qr;
pub mod reader;
pub mod service;
pub mod store;

pub use cache::{CacheKeys, CacheStore, MemoryCache, RedisCache, CREDENTIAL_TTL, VERIFICATION_TTL};
pub use error::{CacheError, StoreError, VerifyError};
pub use fallback::{FailOnError, FallbackStrategy, SyntheticCredential};
pub use merge::{merge, Enrichment};
pub use observer::{CacheNamespace, TracingObserver, VerificationObserver};
pub use qr::{ErrorCorrection, QrOptions, QrPayload};
pub use reader::{LedgerHealth, LedgerRead, LedgerReader};
pub use service::{VerificationService, MAX_BATCH_SIZE};
pub use store::{
    AuditEntry, CredentialRow, InMemoryMetadataStore, IndexedCredential, IssuerRecord,
    MetadataStore, SchemaRecord, SearchPage, SearchQuery,
};
