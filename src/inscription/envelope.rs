//! Ordinals envelope tapscript
//!
//! ```text
//! <x-only key> OP_CHECKSIG
//! OP_FALSE OP_IF
//!   "ord"
//!   0x01 <content type>
//!   OP_0 <payload chunk> <payload chunk> ...
//! OP_ENDIF
//! ```
//!
//! The envelope is never executed; it only commits the payload to the leaf
//! hash and exposes it in the witness when the leaf is spent.

use bitcoin::opcodes::all::{OP_CHECKSIG, OP_ENDIF, OP_IF, OP_PUSHBYTES_0};
use bitcoin::opcodes::OP_FALSE;
use bitcoin::script::{Builder, PushBytesBuf};
use bitcoin::secp256k1::XOnlyPublicKey;
use bitcoin::ScriptBuf;

use super::Inscription;
use crate::error::{Error, Result};

/// Tapscript push limit.
pub const MAX_PUSH_SIZE: usize = 520;

const PROTOCOL_ID: [u8; 3] = *b"ord";
const CONTENT_TYPE_TAG: [u8; 1] = [0x01];

fn push_data(data: &[u8]) -> Result<PushBytesBuf> {
    PushBytesBuf::try_from(data.to_vec()).map_err(|e| Error::Build(format!("envelope push: {}", e)))
}

pub fn build_inscription_script(key: &XOnlyPublicKey, inscription: &Inscription) -> Result<ScriptBuf> {
    let mut builder = Builder::new()
        .push_x_only_key(key)
        .push_opcode(OP_CHECKSIG)
        .push_opcode(OP_FALSE)
        .push_opcode(OP_IF)
        .push_slice(PROTOCOL_ID)
        .push_slice(CONTENT_TYPE_TAG)
        .push_slice(push_data(inscription.content_type.as_bytes())?)
        .push_opcode(OP_PUSHBYTES_0);

    for chunk in inscription.payload.chunks(MAX_PUSH_SIZE) {
        builder = builder.push_slice(push_data(chunk)?);
    }

    Ok(builder.push_opcode(OP_ENDIF).into_script())
}
