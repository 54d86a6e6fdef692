//! # trustcred-core: Foundational Types
//!
//! Domain primitives shared by every TrustCred crate:
//!
//! - [`CredentialId`]: the 64-hex-character credential identifier used as
//!   the ledger key, validated at construction.
//! - [`Credential`]: a normalized credential record as read from the ledger.
//! - [`VerificationResult`]: the derived, per-request verification judgment.
//! - [`BatchResult`] / [`BatchSummary`]: batch verification output.
//! - [`PublicCredentialInfo`]: the shareable public projection.
//!
//! ## Crate Policy
//!
//! This crate performs no I/O. Ledger access lives in `trustcred-ledger`,
//! caching and enrichment in `trustcred-verify`, HTTP in `trustcred-api`.

pub mod credential;
pub mod error;
pub mod identity;
pub mod verification;

pub use credential::{Credential, StatusFlags};
pub use error::ValidationError;
pub use identity::CredentialId;
pub use verification::{
    BatchResult, BatchSummary, CredentialStatus, IssuerSummary, PublicCredentialInfo,
    PublicIssuer, PublicSchema, RecipientSummary, SchemaSummary, VerificationMetadata,
    VerificationResult, VerificationSource,
};
