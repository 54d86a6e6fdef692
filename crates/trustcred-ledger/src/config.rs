//! Ledger client configuration.
//!
//! Selects the Stacks network, the node API base URL and the credential
//! contract. Defaults target the Hiro testnet API and the public
//! `digital-credentials` deployment.

use url::Url;
use zeroize::Zeroizing;

/// Default contract identifier (`address.name`).
pub const DEFAULT_CONTRACT: &str =
    "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM.digital-credentials";

/// Which Stacks network the contract is deployed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StacksNetwork {
    Mainnet,
    Testnet,
}

impl StacksNetwork {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }

    /// Public Hiro node API for the network.
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Self::Mainnet => "https://api.hiro.so",
            Self::Testnet => "https://api.testnet.hiro.so",
        }
    }
}

impl std::str::FromStr for StacksNetwork {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(ConfigError::InvalidNetwork(other.to_string())),
        }
    }
}

impl std::fmt::Display for StacksNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A deployed contract, `address.name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractId {
    pub address: String,
    pub name: String,
}

impl std::str::FromStr for ContractId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, name) = s
            .trim()
            .split_once('.')
            .filter(|(a, n)| !a.is_empty() && !n.is_empty())
            .ok_or_else(|| ConfigError::InvalidContract(s.to_string()))?;
        crate::c32::c32_address_decode(address)
            .map_err(|_| ConfigError::InvalidContract(s.to_string()))?;
        Ok(Self {
            address: address.to_string(),
            name: name.to_string(),
        })
    }
}

impl std::fmt::Display for ContractId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.address, self.name)
    }
}

/// Configuration for the Stacks ledger client.
///
/// Custom `Debug` implementation redacts `api_key`.
#[derive(Clone)]
pub struct LedgerConfig {
    pub network: StacksNetwork,
    /// Node API base URL.
    pub api_url: Url,
    pub contract: ContractId,
    /// Optional `x-api-key` header value for hosted node APIs.
    pub api_key: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("network", &self.network)
            .field("api_url", &self.api_url)
            .field("contract", &self.contract)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LedgerConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `STACKS_NETWORK` (default: `testnet`)
    /// - `STACKS_API_URL` (default: Hiro API for the network)
    /// - `STACKS_CONTRACT_ADDRESS` (default: [`DEFAULT_CONTRACT`])
    /// - `STACKS_API_KEY` (optional)
    /// - `LEDGER_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let network: StacksNetwork = std::env::var("STACKS_NETWORK")
            .unwrap_or_else(|_| "testnet".to_string())
            .parse()?;
        let contract = std::env::var("STACKS_CONTRACT_ADDRESS")
            .unwrap_or_else(|_| DEFAULT_CONTRACT.to_string())
            .parse()?;

        Ok(Self {
            network,
            api_url: env_url("STACKS_API_URL", network.default_api_url())?,
            contract,
            api_key: std::env::var("STACKS_API_KEY")
                .ok()
                .filter(|k| !k.is_empty())
                .map(Zeroizing::new),
            timeout_secs: std::env::var("LEDGER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Configuration pointing at a local mock node (for testing).
    pub fn local_mock(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            network: StacksNetwork::Testnet,
            api_url: Url::parse(api_url)
                .map_err(|e| ConfigError::InvalidUrl("api_url".to_string(), e.to_string()))?,
            contract: DEFAULT_CONTRACT.parse()?,
            api_key: None,
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid STACKS_NETWORK {0:?}: expected mainnet or testnet")]
    InvalidNetwork(String),
    #[error("invalid contract identifier {0:?}: expected <address>.<name>")]
    InvalidContract(String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("STACKS_API_KEY is not a valid header value")]
    InvalidApiKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_contract_parses() {
        let c: ContractId = DEFAULT_CONTRACT.parse().unwrap();
        assert_eq!(c.address, "ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM");
        assert_eq!(c.name, "digital-credentials");
        assert_eq!(c.to_string(), DEFAULT_CONTRACT);
    }

    #[test]
    fn contract_requires_name_and_valid_address() {
        assert!("ST1PQHQKV0RJXZFY1DGX8MNSNYVE3VGZJSRTPGZGM".parse::<ContractId>().is_err());
        assert!("not-an-address.digital-credentials".parse::<ContractId>().is_err());
    }

    #[test]
    fn network_parsing() {
        assert_eq!("Mainnet".parse::<StacksNetwork>().unwrap(), StacksNetwork::Mainnet);
        assert_eq!(StacksNetwork::Testnet.default_api_url(), "https://api.testnet.hiro.so");
        assert!("regtest".parse::<StacksNetwork>().is_err());
    }

    #[test]
    fn debug_redacts_api_key() {
        let mut cfg = LedgerConfig::local_mock("http://127.0.0.1:3999").unwrap();
        cfg.api_key = Some(Zeroizing::new("super-secret".to_string()));
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn env_url_uses_default_when_var_absent() {
        let url = env_url("TRUSTCRED_NONEXISTENT_URL_VAR", "https://api.hiro.so").unwrap();
        assert_eq!(url.as_str(), "https://api.hiro.so/");
    }
}
