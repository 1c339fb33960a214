//! Error taxonomy shared by every operation in the crate.

use bitcoin::Txid;

use crate::chain::ChainError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of [`Error`] for callers that only branch on the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input detected before any network call.
    Validation,
    /// Not enough confirmed value to cover amount plus fee.
    Funds,
    /// The chain-data service failed or had no answer.
    DataUnavailable,
    /// Submission rejected, or reveal retries exhausted.
    Broadcast,
    /// Signing or transaction construction failed.
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid {role} address: {address}")]
    InvalidAddress { role: &'static str, address: String },
    #[error("fromAddress {address} does not match with fromWIF")]
    KeyMismatch { address: String },
    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("insufficient confirmed balance: {balance} sats available, {amount} requested")]
    InsufficientBalance { balance: u64, amount: u64 },
    #[error("input UTXOs are not enough to send: need {needed} sats, have {available}")]
    InsufficientFunds { needed: u64, available: u64 },
    #[error("no UTXO found for network fee at {address}")]
    NoFundingUtxo { address: String },

    #[error("chain data unavailable: {0}")]
    DataUnavailable(String),
    #[error("cannot find proper hex for transaction {0}")]
    MissingRawTransaction(Txid),

    #[error("broadcast rejected: {0}")]
    BroadcastRejected(String),
    #[error("reveal broadcast failed after {attempts} attempts (commit {commit_txid} is already broadcast): {last_error}")]
    RevealBroadcastExhausted {
        commit_txid: Txid,
        attempts: u32,
        last_error: String,
    },

    #[error("reveal could not be built (commit {commit_txid} is already broadcast): {reason}")]
    RevealBuildFailed { commit_txid: Txid, reason: String },

    #[error("transaction build failed: {0}")]
    Build(String),
    #[error("signing failed: {0}")]
    Signing(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidAddress { .. } | Error::KeyMismatch { .. } | Error::InvalidKey(_) => {
                ErrorKind::Validation
            }
            Error::InsufficientBalance { .. }
            | Error::InsufficientFunds { .. }
            | Error::NoFundingUtxo { .. } => ErrorKind::Funds,
            Error::DataUnavailable(_) | Error::MissingRawTransaction(_) => ErrorKind::DataUnavailable,
            Error::BroadcastRejected(_) | Error::RevealBroadcastExhausted { .. } => ErrorKind::Broadcast,
            Error::Build(_) | Error::Signing(_) | Error::RevealBuildFailed { .. } => ErrorKind::Internal,
        }
    }

    /// Commit transaction id for failures that happen after the commit was broadcast.
    pub fn commit_txid(&self) -> Option<Txid> {
        match self {
            Error::RevealBroadcastExhausted { commit_txid, .. } | Error::RevealBuildFailed { commit_txid, .. } => {
                Some(*commit_txid)
            }
            _ => None,
        }
    }
}

impl From<ChainError> for Error {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Rejected(reason) => Error::BroadcastRejected(reason),
            other => Error::DataUnavailable(other.to_string()),
        }
    }
}
