//! Inscriptions - commit/reveal embedding of a payload in a taproot script path
//!
//! # Flow
//!
//! ```text
//! mnemonic ──► origin key  m/86'/0'/0'/0/0  (funds the commit)
//!          └─► reveal key  m/86'/0'/0'/0/1  (signs the reveal leaf)
//!
//! commit:  origin ──(reveal fee + 546)──► P2TR(reveal key, [envelope])
//! reveal:  commit:0 ──(546)──► recipient          witness = [sig, envelope, control block]
//!          └── broadcast retried per RetryPolicy until the commit is visible
//! ```
//!
//! | Item | Module |
//! |------|--------|
//! | envelope tapscript | `envelope` |
//! | reveal address + script-path spend | `reveal` |
//! | retry policy | `retry` |
//! | end-to-end flow | `orchestrator` |

mod envelope;
mod orchestrator;
mod retry;
mod reveal;

pub use envelope::{build_inscription_script, MAX_PUSH_SIZE};
pub use orchestrator::{inscribe, CommitTxResult, InscribePhase, InscribeResult, RevealTxResult};
pub use retry::{RetryExhausted, RetryPolicy};
pub use reveal::{build_reveal_transaction, RevealScript};

pub const TEXT_CONTENT_TYPE: &str = "text/plain;charset=utf-8";

/// A payload and its MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inscription {
    pub content_type: String,
    pub payload: Vec<u8>,
}

impl Inscription {
    pub fn new(content_type: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self { content_type: content_type.into(), payload: payload.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TEXT_CONTENT_TYPE, text.into().into_bytes())
    }

    /// Compact JSON text, inscribed as plain text.
    pub fn json(value: &serde_json::Value) -> Self {
        Self::text(value.to_string())
    }

    pub fn payload_len(&self) -> usize { self.payload.len() }
}

/// `<reveal txid>i<index>`; a reveal carries one inscription, so the index is 0.
pub fn inscription_id(reveal_txid: &bitcoin::Txid) -> String {
    format!("{}i0", reveal_txid)
}
