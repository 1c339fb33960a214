//! Size and fee estimation
//!
//! Sizes are byte-count proxies per script family, not weight-adjusted vsizes.
//! They are fee policy: changing a number here changes what every transaction pays.

use crate::address::AddressType;

/// Smallest output value created; anything below is absorbed into the fee.
pub const DUST_LIMIT: u64 = 546;
/// version + locktime + input/output counts.
pub const BASE_TX_SIZE: u64 = 10;

/// Per-input and per-output byte sizes for one script family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxSizes {
    pub input: u64,
    pub output: u64,
}

impl AddressType {
    pub const fn sizes(self) -> TxSizes {
        match self {
            AddressType::Legacy => TxSizes { input: 148, output: 34 },
            AddressType::NestedSegwit => TxSizes { input: 91, output: 31 },
            AddressType::NativeSegwit => TxSizes { input: 68, output: 31 },
            AddressType::Taproot => TxSizes { input: 58, output: 43 },
        }
    }
}

pub fn estimate_size(num_inputs: usize, num_outputs: usize, ty: AddressType) -> u64 {
    let sizes = ty.sizes();
    let inputs = (num_inputs as u64).saturating_mul(sizes.input);
    let outputs = (num_outputs as u64).saturating_mul(sizes.output);
    BASE_TX_SIZE.saturating_add(inputs).saturating_add(outputs)
}

/// `fee_rate` is in sat/vbyte.
pub fn estimate_fee(num_inputs: usize, num_outputs: usize, ty: AddressType, fee_rate: u64) -> u64 {
    estimate_size(num_inputs, num_outputs, ty).saturating_mul(fee_rate)
}

/// One taproot input, one taproot output, plus the raw payload length.
///
/// The payload is counted at full byte weight, no witness discount. This
/// overestimates on purpose; keep it unless the fee behavior is meant to change.
pub fn estimate_reveal_size(payload_len: usize) -> u64 {
    estimate_size(1, 1, AddressType::Taproot).saturating_add(payload_len as u64)
}

pub fn estimate_reveal_fee(payload_len: usize, fee_rate: u64) -> u64 {
    estimate_reveal_size(payload_len).saturating_mul(fee_rate)
}
