//! # Public Credential Search
//!
//! `GET /search/credentials?issuer=&schema=&limit=&offset=` over active
//! credentials in the metadata store. Responses carry a `pagination`
//! block next to `data`.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use trustcred_verify::store::{SEARCH_DEFAULT_LIMIT, SEARCH_MAX_LIMIT};
use trustcred_verify::{SearchPage, SearchQuery};
use utoipa::IntoParams;

use crate::error::AppError;
use crate::extractors::{extract_validated_query, Validate};
use crate::middleware::rate_limit::{rate_limit_middleware, RateLimitTier};
use crate::routes::{Envelope, Pagination};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search/credentials", get(search_credentials))
        .route_layer(from_fn_with_state(RateLimitTier::Search, rate_limit_middleware))
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
    /// Issuer name substring or exact issuer address (2..=100 characters).
    pub issuer: Option<String>,
    /// Schema name substring (2..=100 characters).
    pub schema: Option<String>,
    /// Page size, 1..=100 (default 50).
    pub limit: Option<u32>,
    /// Rows to skip (default 0).
    pub offset: Option<u32>,
}

impl Validate for SearchParams {
    fn validate(&self) -> Result<(), String> {
        match self.limit {
            Some(0) => Err("Limit must be at least 1".into()),
            Some(n) if n > SEARCH_MAX_LIMIT => {
                Err(format!("Limit must not exceed {SEARCH_MAX_LIMIT}"))
            }
            _ => Ok(()),
        }
    }
}

impl SearchParams {
    fn into_query(self) -> SearchQuery {
        SearchQuery {
            issuer: self.issuer,
            schema: self.schema,
            limit: self.limit.unwrap_or(SEARCH_DEFAULT_LIMIT),
            offset: self.offset.unwrap_or(0),
        }
    }
}

fn pagination(query_limit: u32, query_offset: u32, page: &SearchPage) -> Pagination {
    let seen = u64::from(query_offset) + page.credentials.len() as u64;
    Pagination {
        limit: query_limit,
        offset: query_offset,
        total: page.total,
        has_more: seen < page.total,
    }
}

/// GET /api/v1/search/credentials: Search active credentials.
#[utoipa::path(
    get,
    path = "/api/v1/search/credentials",
    params(SearchParams),
    responses(
        (status = 200, description = "Matching credentials with pagination", body = crate::routes::SuccessBody),
        (status = 400, description = "Invalid search parameters", body = crate::error::ErrorBody),
        (status = 429, description = "Rate limit exceeded"),
        (status = 500, description = "Metadata store failure", body = crate::error::ErrorBody),
    ),
    tag = "search"
)]
pub(crate) async fn search_credentials(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Envelope<SearchPage>>, AppError> {
    let query = extract_validated_query(params)?.into_query();
    let (limit, offset) = (query.limit, query.offset);

    let page = state.service.search(query).await.map_err(|e| {
        AppError::from(e).context("Search Failed", "Unable to search credentials at this time")
    })?;

    let pagination = pagination(limit, offset, &page);
    Ok(Envelope::paginated(page, pagination))
}
