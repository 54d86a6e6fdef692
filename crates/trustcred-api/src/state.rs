//! # Application State
//!
//! Shared state passed to every handler through the `State` extractor.
//! All collaborators are constructed explicitly at startup and shared by
//! `Arc`; nothing is a global.
//!
//! [`AppState::connect`] wires production backends from the environment:
//!
//! | Concern | Configured | Absent |
//! |---------|-----------|--------|
//! | Ledger | `STACKS_*` | Hiro testnet defaults |
//! | Cache | `REDIS_URL` | in-process TTL map |
//! | Metadata | `DATABASE_URL` | empty in-memory store |

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use trustcred_ledger::{CredentialLedger, LedgerConfig, LedgerError, StacksLedger};
use trustcred_verify::{
    CacheError, CacheKeys, CacheStore, FailOnError, FallbackStrategy, InMemoryMetadataStore,
    LedgerReader, MemoryCache, MetadataStore, RedisCache, SyntheticCredential,
    VerificationService,
};

use crate::config::{AppConfig, ConfigError, FallbackMode};
use crate::db::{self, PgMetadataStore};
use crate::middleware::metrics::{ApiMetrics, MetricsObserver};

/// Startup failures. Any of these aborts the process.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("service configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("ledger configuration: {0}")]
    LedgerConfig(#[from] trustcred_ledger::config::ConfigError),

    #[error("ledger client: {0}")]
    Ledger(#[from] LedgerError),

    #[error("cache: {0}")]
    Cache(#[from] CacheError),

    #[error("database: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub service: VerificationService,
    pub metrics: ApiMetrics,
    pub started_at: Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Assemble state from already-constructed backends.
    pub fn new(
        config: AppConfig,
        ledger: Arc<dyn CredentialLedger>,
        cache: Arc<dyn CacheStore>,
        store: Arc<dyn MetadataStore>,
    ) -> Self {
        let metrics = ApiMetrics::new();
        let observer = Arc::new(MetricsObserver::new(metrics.clone()));
        let keys = CacheKeys::new(config.cache_key_prefix.clone());
        let fallback: Arc<dyn FallbackStrategy> = match config.fallback {
            FallbackMode::Fail => Arc::new(FailOnError),
            FallbackMode::Synthetic => Arc::new(SyntheticCredential),
        };

        let reader = LedgerReader::new(ledger, cache.clone(), keys.clone(), fallback, observer.clone());
        let service = VerificationService::new(
            reader,
            cache,
            keys,
            store,
            observer,
            config.base_url.clone(),
        );

        Self {
            config: Arc::new(config),
            service,
            metrics,
            started_at: Instant::now(),
        }
    }

    /// State over a given ledger with in-process cache and metadata store.
    pub fn in_memory(config: AppConfig, ledger: Arc<dyn CredentialLedger>) -> Self {
        Self::new(
            config,
            ledger,
            Arc::new(MemoryCache::new()),
            Arc::new(InMemoryMetadataStore::new()),
        )
    }

    /// Connect production backends described by `config` and the
    /// environment.
    pub async fn connect(config: AppConfig) -> Result<Self, StartupError> {
        let ledger_config = LedgerConfig::from_env()?;
        tracing::info!(
            network = ledger_config.network.as_str(),
            contract = %ledger_config.contract,
            "ledger client configured"
        );
        let ledger: Arc<dyn CredentialLedger> = Arc::new(StacksLedger::new(ledger_config)?);

        let cache: Arc<dyn CacheStore> = match &config.redis_url {
            Some(url) => match RedisCache::connect(url).await {
                Ok(redis) => {
                    tracing::info!("Redis cache connected");
                    Arc::new(redis)
                }
                Err(e) if !config.environment.is_production() => {
                    tracing::warn!(error = %e, "Redis connection failed, using in-process cache");
                    Arc::new(MemoryCache::new())
                }
                Err(e) => return Err(e.into()),
            },
            None => {
                tracing::warn!("REDIS_URL not set, using in-process cache");
                Arc::new(MemoryCache::new())
            }
        };

        let store: Arc<dyn MetadataStore> = match &config.database_url {
            Some(url) => {
                let pool = db::init_pool(url, config.db_max_connections).await?;
                Arc::new(PgMetadataStore::new(pool))
            }
            None => {
                tracing::warn!(
                    "DATABASE_URL not set, issuer and schema details will use placeholders"
                );
                Arc::new(InMemoryMetadataStore::new())
            }
        };

        Ok(Self::new(config, ledger, cache, store))
    }
}
