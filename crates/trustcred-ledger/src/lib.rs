//! # trustcred-ledger -- Read-only client for the credential contract
//!
//! Reads credential records from the `digital-credentials` Clarity contract
//! through a Stacks node's read-only call API:
//!
//! - [`clarity`] -- consensus binary codec for Clarity values.
//! - [`c32`] -- c32check encoding of principals as Stacks addresses.
//! - [`record`] -- normalization of the contract tuple into a
//!   [`Credential`](trustcred_core::Credential).
//! - [`StacksLedger`] -- the HTTP client, behind the [`CredentialLedger`]
//!   trait.
//!
//! ## Node API
//!
//! `POST {api}/v2/contracts/call-read/{address}/{name}/{function}` with
//! body `{"sender": ..., "arguments": ["0x..."]}`. The node answers
//! `{"okay": true, "result": "0x..."}` or `{"okay": false, "cause": ...}`.
//!
//! No retries are performed: a failed call surfaces immediately.

pub mod c32;
pub mod clarity;
pub mod config;
pub mod error;
pub mod ledger;
pub mod record;
pub mod stacks;

pub use clarity::{ClarityError, ClarityValue};
pub use config::{ContractId, LedgerConfig, StacksNetwork};
pub use error::LedgerError;
pub use ledger::{CredentialLedger, NetworkInfo};
pub use stacks::StacksLedger;
