//! PostgreSQL implementation of [`MetadataStore`].
//!
//! Tables: `credentials`, `organizations`, `credential_schemas`,
//! `verification_logs` (see `migrations/0001_init.sql`). Every query is
//! parameterized.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use trustcred_core::{
    CredentialId, CredentialStatus, PublicCredentialInfo, PublicIssuer, PublicSchema,
};
use trustcred_verify::store::{
    AuditEntry, CredentialRow, IssuerRecord, MetadataStore, SchemaRecord, SearchPage, SearchQuery,
};
use trustcred_verify::StoreError;

/// Metadata store backed by a SQLx connection pool.
#[derive(Debug, Clone)]
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn store_err(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

/// `%term%` with LIKE wildcards in `term` escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn parse_status(raw: &str) -> Result<CredentialStatus, StoreError> {
    match raw {
        "active" => Ok(CredentialStatus::Active),
        "revoked" => Ok(CredentialStatus::Revoked),
        "expired" => Ok(CredentialStatus::Expired),
        other => Err(StoreError::CorruptRow {
            table: "credentials",
            reason: format!("unknown status {other:?}"),
        }),
    }
}

#[derive(sqlx::FromRow)]
struct CredentialMetaRow {
    recipient_address: Option<String>,
    metadata_uri: Option<String>,
    data_hash: Option<String>,
    schema_id: Option<String>,
}

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    name: String,
    #[sqlx(rename = "type")]
    kind: String,
    verified: bool,
}

#[derive(sqlx::FromRow)]
struct SchemaRow {
    id: String,
    name: String,
    version: String,
    description: Option<String>,
}

#[derive(sqlx::FromRow)]
struct SearchRow {
    credential_id: String,
    issued_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    status: String,
    issuer_name: String,
    issuer_type: String,
    issuer_verified: bool,
    schema_name: Option<String>,
    schema_version: Option<String>,
    total_count: i64,
}

impl SearchRow {
    fn into_public(self) -> Result<PublicCredentialInfo, StoreError> {
        let credential_id = CredentialId::new(&self.credential_id).map_err(|e| {
            StoreError::CorruptRow {
                table: "credentials",
                reason: e.to_string(),
            }
        })?;
        Ok(PublicCredentialInfo {
            credential_id,
            issuer: PublicIssuer {
                name: self.issuer_name,
                kind: self.issuer_type,
                verified: self.issuer_verified,
            },
            schema: PublicSchema::or_placeholder(self.schema_name, self.schema_version),
            issued_at: Some(self.issued_at),
            expires_at: self.expires_at,
            status: parse_status(&self.status)?,
        })
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn credential_row(&self, id: &CredentialId) -> Result<Option<CredentialRow>, StoreError> {
        let row = sqlx::query_as::<_, CredentialMetaRow>(
            "SELECT recipient_address, metadata_uri, data_hash, schema_id
             FROM credentials WHERE blockchain_id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|r| CredentialRow {
            recipient_address: r.recipient_address,
            metadata_uri: r.metadata_uri,
            data_hash: r.data_hash,
            schema_id: r.schema_id,
        }))
    }

    async fn issuer(&self, address: &str) -> Result<Option<IssuerRecord>, StoreError> {
        let row = sqlx::query_as::<_, OrganizationRow>(
            "SELECT name, type, verified FROM organizations WHERE stacks_address = $1",
        )
        .bind(address)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|r| IssuerRecord {
            name: r.name,
            kind: r.kind,
            verified: r.verified,
        }))
    }

    async fn schema(&self, schema_id: &str) -> Result<Option<SchemaRecord>, StoreError> {
        let row = sqlx::query_as::<_, SchemaRow>(
            "SELECT id, name, version, description FROM credential_schemas WHERE id = $1",
        )
        .bind(schema_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(row.map(|r| SchemaRecord {
            id: r.id,
            name: r.name,
            version: r.version,
            description: r.description,
        }))
    }

    async fn record_verification(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        let result = serde_json::to_value(entry).map_err(|e| StoreError::Backend(e.to_string()))?;

        // Unknown credentials have no row to reference; the insert is a no-op.
        sqlx::query(
            "INSERT INTO verification_logs
                 (credential_id, verification_result, verification_method, verified_at)
             SELECT id, $2, 'api', NOW() FROM credentials WHERE blockchain_id = $1",
        )
        .bind(entry.credential_id.as_str())
        .bind(&result)
        .execute(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(())
    }

    async fn search(&self, query: &SearchQuery) -> Result<SearchPage, StoreError> {
        let issuer_pattern = query.issuer.as_deref().map(like_pattern);
        let schema_pattern = query.schema.as_deref().map(like_pattern);

        let rows = sqlx::query_as::<_, SearchRow>(
            "SELECT
                 c.blockchain_id AS credential_id,
                 c.issued_at,
                 c.expires_at,
                 c.status,
                 o.name AS issuer_name,
                 o.type AS issuer_type,
                 o.verified AS issuer_verified,
                 cs.name AS schema_name,
                 cs.version AS schema_version,
                 COUNT(*) OVER() AS total_count
             FROM credentials c
             JOIN organizations o ON c.issuer_id = o.id
             LEFT JOIN credential_schemas cs ON c.schema_id = cs.id
             WHERE c.status = 'active'
               AND ($1::text IS NULL OR o.name ILIKE $1 OR o.stacks_address = $2)
               AND ($3::text IS NULL OR cs.name ILIKE $3)
             ORDER BY c.issued_at DESC
             LIMIT $4 OFFSET $5",
        )
        .bind(issuer_pattern)
        .bind(query.issuer.as_deref())
        .bind(schema_pattern)
        .bind(i64::from(query.limit))
        .bind(i64::from(query.offset))
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;

        let total = rows.first().map(|r| r.total_count.max(0) as u64).unwrap_or(0);
        let credentials = rows
            .into_iter()
            .map(SearchRow::into_public)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchPage { credentials, total })
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("MIT"), "%MIT%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn status_parsing() {
        assert_eq!(parse_status("active").unwrap(), CredentialStatus::Active);
        assert_eq!(parse_status("revoked").unwrap(), CredentialStatus::Revoked);
        assert!(matches!(
            parse_status("pending"),
            Err(StoreError::CorruptRow { table: "credentials", .. })
        ));
    }
}
