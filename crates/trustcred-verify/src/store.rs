//! # Relational Metadata Store
//!
//! Issuer organizations, credential schemas and off-chain credential rows
//! used to enrich ledger records, plus the `verification_logs` audit trail.
//!
//! The Postgres implementation lives in the API crate next to the pool and
//! migrations. [`InMemoryMetadataStore`] backs tests and runs without a
//! database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use trustcred_core::{CredentialId, CredentialStatus, PublicCredentialInfo, PublicIssuer, PublicSchema};

use crate::error::StoreError;

/// Off-chain columns of a `credentials` row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRow {
    pub recipient_address: Option<String>,
    pub metadata_uri: Option<String>,
    pub data_hash: Option<String>,
    pub schema_id: Option<String>,
}

/// An `organizations` row, looked up by issuer address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerRecord {
    pub name: String,
    pub kind: String,
    pub verified: bool,
}

/// A `credential_schemas` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaRecord {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

/// One `verification_logs` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(skip)]
    pub credential_id: CredentialId,
    pub valid: bool,
    pub revoked: bool,
    pub expired: bool,
    pub verification_timestamp: DateTime<Utc>,
}

/// Limits on search parameters.
pub const SEARCH_DEFAULT_LIMIT: u32 = 50;
pub const SEARCH_MAX_LIMIT: u32 = 100;

/// Filter for public credential search. At least one of `issuer` and
/// `schema` is usually set; with neither, all active credentials match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Issuer name substring (case-insensitive) or exact issuer address.
    pub issuer: Option<String>,
    /// Schema name substring (case-insensitive).
    pub schema: Option<String>,
    pub limit: u32,
    pub offset: u32,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            issuer: None,
            schema: None,
            limit: SEARCH_DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

/// One page of search results with the total match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub credentials: Vec<PublicCredentialInfo>,
    pub total: u64,
}

/// Read/write access to relational metadata.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    async fn credential_row(&self, id: &CredentialId) -> Result<Option<CredentialRow>, StoreError>;

    async fn issuer(&self, address: &str) -> Result<Option<IssuerRecord>, StoreError>;

    async fn schema(&self, schema_id: &str) -> Result<Option<SchemaRecord>, StoreError>;

    async fn record_verification(&self, entry: &AuditEntry) -> Result<(), StoreError>;

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;

    /// Backend name for health reporting.
    fn backend(&self) -> &'static str;
}

// -- In-memory implementation --------------------------------------------------

/// A credential known to the in-memory store, as returned by search.
#[derive(Debug, Clone)]
pub struct IndexedCredential {
    pub id: CredentialId,
    pub issuer_address: String,
    pub row: CredentialRow,
    pub issued_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub status: CredentialStatus,
}

#[derive(Debug, Default)]
struct Tables {
    credentials: HashMap<CredentialId, IndexedCredential>,
    organizations: HashMap<String, IssuerRecord>,
    schemas: HashMap<String, SchemaRecord>,
    audit: Vec<AuditEntry>,
}

/// Thread-safe in-memory metadata store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryMetadataStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_organization(&self, address: impl Into<String>, record: IssuerRecord) {
        self.tables.write().organizations.insert(address.into(), record);
    }

    pub fn insert_schema(&self, record: SchemaRecord) {
        self.tables.write().schemas.insert(record.id.clone(), record);
    }

    pub fn insert_credential(&self, credential: IndexedCredential) {
        self.tables
            .write()
            .credentials
            .insert(credential.id.clone(), credential);
    }

    /// Audit rows recorded so far, oldest first.
    pub fn audit_log(&self) -> Vec<AuditEntry> {
        self.tables.read().audit.clone()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn credential_row(&self, id: &CredentialId) -> Result<Option<CredentialRow>, StoreError> {
        Ok(self.tables.read().credentials.get(id).map(|c| c.row.clone()))
    }

    async fn issuer(&self, address: &str) -> Result<Option<IssuerRecord>, StoreError> {
        Ok(self.tables.read().organizations.get(address).cloned())
    }

    async fn schema(&self, schema_id: &str) -> Result<Option<SchemaRecord>, StoreError> {
        Ok(self.tables.read().schemas.get(schema_id).cloned())
    }

    async fn record_verification(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        // Mirrors the subselect on credentials: unknown ids are not logged.
        if tables.credentials.contains_key(&entry.credential_id) {
            tables.audit.push(entry.clone());
        }
        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StoreError> {
        let tables = self.tables.read();
        let mut matches: Vec<(&IndexedCredential, &IssuerRecord, Option<&SchemaRecord>)> =
            tables
                .credentials
                .values()
                .filter(|c| c.status == CredentialStatus::Active)
                .filter_map(|c| {
                    let org = tables.organizations.get(&c.issuer_address)?;
                    let schema = c.row.schema_id.as_ref().and_then(|s| tables.schemas.get(s));
                    Some((c, org, schema))
                })
                .filter(|(c, org, _)| match &query.issuer {
                    None => true,
                    Some(needle) => contains_ci(&org.name, needle) || c.issuer_address == *needle,
                })
                .filter(|(_, _, schema)| match &query.schema {
                    None => true,
                    Some(needle) => schema.is_some_and(|s| contains_ci(&s.name, needle)),
                })
                .collect();

        matches.sort_by(|a, b| b.0.issued_at.cmp(&a.0.issued_at));
        let total = matches.len() as u64;

        let credentials = matches
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .map(|(c, org, schema)| PublicCredentialInfo {
                credential_id: c.id.clone(),
                issuer: PublicIssuer {
                    name: org.name.clone(),
                    kind: org.kind.clone(),
                    verified: org.verified,
                },
                schema: PublicSchema::or_placeholder(
                    schema.map(|s| s.name.clone()),
                    schema.map(|s| s.version.clone()),
                ),
                issued_at: Some(c.issued_at),
                expires_at: c.expires_at,
                status: c.status,
            })
            .collect();

        Ok(SearchPage { credentials, total })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const UNIVERSITY: &str = "ST2CY5V39NHDPWSXMW9QDT3HC3GD6Q6XX4CFRK9AG";
    const BOOTCAMP: &str = "ST2JHG361ZXG51QTKY2NQCVBPPRRE2KZB1HR05NNC";

    fn seeded() -> InMemoryMetadataStore {
        let store = InMemoryMetadataStore::new();
        store.insert_organization(
            UNIVERSITY,
            IssuerRecord {
                name: "State University".into(),
                kind: "university".into(),
                verified: true,
            },
        );
        store.insert_organization(
            BOOTCAMP,
            IssuerRecord {
                name: "Code Bootcamp".into(),
                kind: "training".into(),
                verified: false,
            },
        );
        store.insert_schema(SchemaRecord {
            id: "degree".into(),
            name: "Bachelor Degree".into(),
            version: "2.0".into(),
            description: None,
        });
        let now = Utc::now();
        for (byte, issuer, schema, age, status) in [
            (1u8, UNIVERSITY, Some("degree"), 3, CredentialStatus::Active),
            (2, UNIVERSITY, None, 2, CredentialStatus::Active),
            (3, BOOTCAMP, None, 1, CredentialStatus::Active),
            (4, UNIVERSITY, Some("degree"), 0, CredentialStatus::Revoked),
        ] {
            store.insert_credential(IndexedCredential {
                id: CredentialId::from_bytes([byte; 32]),
                issuer_address: issuer.into(),
                row: CredentialRow {
                    schema_id: schema.map(str::to_string),
                    ..CredentialRow::default()
                },
                issued_at: now - Duration::days(age),
                expires_at: None,
                status,
            });
        }
        store
    }

    #[tokio::test]
    async fn search_by_issuer_name_is_case_insensitive_and_newest_first() {
        let store = seeded();
        let page = store
            .search(&SearchQuery {
                issuer: Some("state univ".into()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.credentials[0].credential_id, CredentialId::from_bytes([2; 32]));
        assert_eq!(page.credentials[1].schema.name, "Bachelor Degree");
        assert_eq!(page.credentials[0].schema.name, "Unknown Schema");
    }

    #[tokio::test]
    async fn search_by_exact_address_and_schema() {
        let store = seeded();
        let page = store
            .search(&SearchQuery {
                issuer: Some(BOOTCAMP.into()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);

        let page = store
            .search(&SearchQuery {
                schema: Some("degree".into()),
                ..SearchQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1, "revoked credential must be excluded");
    }

    #[tokio::test]
    async fn search_paginates_but_reports_full_total() {
        let store = seeded();
        let page = store
            .search(&SearchQuery {
                limit: 1,
                offset: 1,
                ..SearchQuery::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.credentials.len(), 1);
        assert_eq!(page.credentials[0].credential_id, CredentialId::from_bytes([2; 32]));
    }

    #[tokio::test]
    async fn audit_only_records_known_credentials() {
        let store = seeded();
        let entry = |byte| AuditEntry {
            credential_id: CredentialId::from_bytes([byte; 32]),
            valid: true,
            revoked: false,
            expired: false,
            verification_timestamp: Utc::now(),
        };
        store.record_verification(&entry(1)).await.unwrap();
        store.record_verification(&entry(99)).await.unwrap();
        assert_eq!(store.audit_log().len(), 1);
    }
}
