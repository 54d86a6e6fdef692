//! HTTP client for a Stacks node's read-only contract call endpoint.
//!
//! | Function | Arguments | Returns |
//! |----------|-----------|---------|
//! | `get-credential` | `(buff 32)` | `(optional (tuple ...))` |
//! | `get-contract-info` | none | contract metadata (health probe) |

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use trustcred_core::{Credential, CredentialId};

use crate::clarity::ClarityValue;
use crate::config::{ConfigError, LedgerConfig};
use crate::error::LedgerError;
use crate::ledger::{CredentialLedger, NetworkInfo};
use crate::record::credential_from_value;

const GET_CREDENTIAL: &str = "get-credential";
const GET_CONTRACT_INFO: &str = "get-contract-info";

#[derive(Debug, Serialize)]
struct CallReadRequest<'a> {
    sender: &'a str,
    arguments: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CallReadResponse {
    okay: bool,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    cause: Option<String>,
}

/// Ledger client for a contract deployed on Stacks.
#[derive(Debug, Clone)]
pub struct StacksLedger {
    http: reqwest::Client,
    config: LedgerConfig,
}

impl StacksLedger {
    /// Create a client from configuration.
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(key) = &config.api_key {
            headers.insert(
                "x-api-key",
                reqwest::header::HeaderValue::from_str(key.as_str())
                    .map_err(|_| ConfigError::InvalidApiKey)?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| LedgerError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Call a read-only contract function and decode its Clarity result.
    ///
    /// Calls `POST {api}/v2/contracts/call-read/{address}/{name}/{function}`.
    pub async fn call_read_only(
        &self,
        function: &str,
        arguments: &[ClarityValue],
    ) -> Result<ClarityValue, LedgerError> {
        let contract = &self.config.contract;
        let endpoint = format!("POST /v2/contracts/call-read/{contract}/{function}");
        let url = format!(
            "{}/v2/contracts/call-read/{}/{}/{}",
            self.config.api_url.as_str().trim_end_matches('/'),
            contract.address,
            contract.name,
            function
        );

        let arguments = arguments
            .iter()
            .map(ClarityValue::to_hex)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| LedgerError::Clarity {
                function: function.to_string(),
                source,
            })?;
        let body = CallReadRequest {
            sender: &contract.address,
            arguments,
        };

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LedgerError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(LedgerError::ApiError {
                endpoint,
                status,
                body,
            });
        }

        let parsed: CallReadResponse =
            resp.json()
                .await
                .map_err(|e| LedgerError::Deserialization {
                    endpoint: endpoint.clone(),
                    source: e,
                })?;

        match (parsed.okay, parsed.result) {
            (true, Some(result)) => {
                ClarityValue::from_hex(&result).map_err(|source| LedgerError::Clarity {
                    function: function.to_string(),
                    source,
                })
            }
            (true, None) => Err(LedgerError::CallFailed {
                function: function.to_string(),
                cause: "response has no result".to_string(),
            }),
            (false, _) => Err(LedgerError::CallFailed {
                function: function.to_string(),
                cause: parsed.cause.unwrap_or_else(|| "unknown".to_string()),
            }),
        }
    }
}

#[async_trait]
impl CredentialLedger for StacksLedger {
    async fn fetch_credential(&self, id: &CredentialId) -> Result<Option<Credential>, LedgerError> {
        let argument = ClarityValue::Buffer(id.to_bytes().to_vec());
        let value = self.call_read_only(GET_CREDENTIAL, &[argument]).await?;
        let credential = credential_from_value(id, value, Utc::now())?;
        tracing::debug!(
            credential_id = %id,
            found = credential.is_some(),
            "ledger read"
        );
        Ok(credential)
    }

    async fn probe(&self) -> Result<(), LedgerError> {
        self.call_read_only(GET_CONTRACT_INFO, &[]).await.map(|_| ())
    }

    fn network_info(&self) -> NetworkInfo {
        NetworkInfo {
            network: self.config.network.to_string(),
            contract_address: self.config.contract.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_info_reflects_config() {
        let ledger = StacksLedger::new(LedgerConfig::local_mock("http://127.0.0.1:3999").unwrap()).unwrap();
        let info = ledger.network_info();
        assert_eq!(info.network, "testnet");
        assert_eq!(
            info.contract_address,
            "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM.digital-credentials"
        );
    }

    #[test]
    fn response_shapes_deserialize() {
        let ok: CallReadResponse = serde_json::from_str(r#"{"okay":true,"result":"0x09"}"#).unwrap();
        assert!(ok.okay);
        assert_eq!(ok.result.as_deref(), Some("0x09"));
        let failed: CallReadResponse =
            serde_json::from_str(r#"{"okay":false,"cause":"Unchecked(NoSuchContract)"}"#).unwrap();
        assert!(!failed.okay);
        assert!(failed.cause.unwrap().contains("NoSuchContract"));
    }
}
