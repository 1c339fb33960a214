//! Smallest-first coin selection with fee feedback
//!
//! Inputs are accepted one at a time in ascending value order. After each
//! one the fee is re-estimated for the current input count and two outputs
//! (payment + change), and selection stops once the inputs cover
//! `amount + fee`.

use bitcoin::Address;

use crate::address::AddressType;
use crate::chain::UnspentOutput;
use crate::error::{Error, Result};
use crate::fees::{estimate_fee, DUST_LIMIT};

/// Outputs always budgeted for: payment and (possible) change.
const PLANNED_OUTPUTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub address: Address,
    pub value: u64,
}

/// Inputs and outputs of a transaction before any script data is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionPlan {
    pub inputs: Vec<UnspentOutput>,
    /// Payment first, change (if any) second.
    pub outputs: Vec<PlannedOutput>,
    pub estimated_fee: u64,
    pub fee_rate: u64,
}

impl TransactionPlan {
    pub fn total_input(&self) -> u64 { self.inputs.iter().map(|u| u.value).sum() }
    pub fn total_output(&self) -> u64 { self.outputs.iter().map(|o| o.value).sum() }

    /// Fee actually paid, including any remainder absorbed below the dust limit.
    pub fn fee(&self) -> u64 { self.total_input() - self.total_output() }

    pub fn change(&self) -> Option<u64> { self.outputs.get(1).map(|o| o.value) }
}

/// Choose inputs from `confirmed` to pay `amount` to `destination`.
///
/// `destination_type` drives the size table. Change goes to `change_address`
/// only when it exceeds [`DUST_LIMIT`]; otherwise it is left to the fee.
pub fn select_coins(
    confirmed: &[UnspentOutput],
    amount: u64,
    destination: &Address,
    destination_type: AddressType,
    change_address: &Address,
    fee_rate: u64,
) -> Result<TransactionPlan> {
    let mut candidates = confirmed.to_vec();
    candidates.sort_by_key(|u| u.value);

    let mut inputs = Vec::new();
    let mut total_input = 0u64;
    let mut estimated_fee = estimate_fee(1, PLANNED_OUTPUTS, destination_type, fee_rate);

    for utxo in candidates {
        total_input += utxo.value;
        inputs.push(utxo);
        estimated_fee = estimate_fee(inputs.len(), PLANNED_OUTPUTS, destination_type, fee_rate);

        if total_input >= amount + estimated_fee {
            let mut outputs = vec![PlannedOutput { address: destination.clone(), value: amount }];
            let remainder = total_input - amount - estimated_fee;
            if remainder > DUST_LIMIT {
                outputs.push(PlannedOutput { address: change_address.clone(), value: remainder });
            }
            return Ok(TransactionPlan { inputs, outputs, estimated_fee, fee_rate });
        }
    }

    Err(Error::InsufficientFunds { needed: amount + estimated_fee, available: total_input })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::parse_address;
    use crate::config::Network;
    use bitcoin::hashes::Hash;
    use bitcoin::Txid;

    const DEST: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";
    const CHANGE: &str = "1BgGZ9tcN4rm9KBzDn7KprQz87SZ26SAMH";
    const TAPROOT_DEST: &str = "bc1p5cyxnuxmeuwuvkwfem96lqzszd02n6xdcjrs20cac6yqjjwudpxqkedrcr";

    fn addr(s: &str) -> Address {
        parse_address(s, Network::Bitcoin, "test").expect("valid address").1
    }

    fn utxo(byte: u8, value: u64) -> UnspentOutput {
        UnspentOutput { txid: Txid::from_byte_array([byte; 32]), vout: 0, value, confirmed: true }
    }

    #[test]
    fn test_single_input_with_change() {
        let plan = select_coins(&[utxo(1, 10_000)], 2_000, &addr(DEST), AddressType::NativeSegwit, &addr(CHANGE), 5).unwrap();
        assert_eq!(plan.inputs.len(), 1);
        assert_eq!(plan.estimated_fee, 700);
        assert_eq!(plan.outputs[0], PlannedOutput { address: addr(DEST), value: 2_000 });
        assert_eq!(plan.outputs[1], PlannedOutput { address: addr(CHANGE), value: 7_300 });
        assert_eq!(plan.fee(), 700);
    }

    #[test]
    fn test_insufficient_after_fee() {
        let err = select_coins(&[utxo(1, 10_000)], 9_500, &addr(DEST), AddressType::NativeSegwit, &addr(CHANGE), 5).unwrap_err();
        match err {
            Error::InsufficientFunds { needed, available } => {
                assert_eq!(needed, 10_200);
                assert_eq!(available, 10_000);
            }
            other => panic!("expected InsufficientFunds, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_set_is_insufficient() {
        let err = select_coins(&[], 1, &addr(DEST), AddressType::NativeSegwit, &addr(CHANGE), 1).unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { available: 0, .. }));
    }

    #[test]
    fn test_dust_remainder_absorbed() {
        // taproot, 1 input 2 outputs: 10 + 58 + 86 = 154 bytes, at 2 sat/vB = 308
        let plan = select_coins(&[utxo(1, 3_808)], 3_000, &addr(TAPROOT_DEST), AddressType::Taproot, &addr(CHANGE), 2).unwrap();
        assert_eq!(plan.estimated_fee, 308);
        assert_eq!(plan.outputs.len(), 1);
        assert_eq!(plan.change(), None);
        assert_eq!(plan.fee(), 308 + 500);
    }

    #[test]
    fn test_change_exactly_at_dust_limit_dropped() {
        // remainder == 546 is not strictly above the limit
        let plan = select_coins(&[utxo(1, 2_000 + 700 + 546)], 2_000, &addr(DEST), AddressType::NativeSegwit, &addr(CHANGE), 5).unwrap();
        assert_eq!(plan.outputs.len(), 1);

        let plan = select_coins(&[utxo(1, 2_000 + 700 + 547)], 2_000, &addr(DEST), AddressType::NativeSegwit, &addr(CHANGE), 5).unwrap();
        assert_eq!(plan.change(), Some(547));
    }

    #[test]
    fn test_smallest_first_and_stops_when_sufficient() {
        let utxos = [utxo(1, 50_000), utxo(2, 1_000), utxo(3, 3_000), utxo(4, 2_000)];
        // fee per step at 1 sat/vB native segwit: 1 in = 140, 2 in = 208, 3 in = 276
        let plan = select_coins(&utxos, 5_000, &addr(DEST), AddressType::NativeSegwit, &addr(CHANGE), 1).unwrap();
        let values: Vec<u64> = plan.inputs.iter().map(|u| u.value).collect();
        assert_eq!(values, vec![1_000, 2_000, 3_000]);
        assert_eq!(plan.estimated_fee, 276);
        assert_eq!(plan.change(), Some(6_000 - 5_000 - 276));
    }

    #[test]
    fn test_plan_always_covers_amount_and_fee() {
        let utxos: Vec<UnspentOutput> = (1..=20).map(|i| utxo(i, i as u64 * 737)).collect();
        for ty in AddressType::ALL {
            for amount in [1u64, 546, 5_000, 40_000, 100_000, 200_000] {
                for rate in [1u64, 3, 25] {
                    match select_coins(&utxos, amount, &addr(DEST), ty, &addr(CHANGE), rate) {
                        Ok(plan) => {
                            assert!(plan.total_input() >= amount + plan.estimated_fee);
                            assert_eq!(plan.outputs[0].value, amount);
                            if let Some(change) = plan.change() {
                                assert!(change > DUST_LIMIT);
                                assert_eq!(change, plan.total_input() - amount - plan.estimated_fee);
                            } else {
                                assert!(plan.total_input() - amount - plan.estimated_fee <= DUST_LIMIT);
                            }
                        }
                        Err(Error::InsufficientFunds { needed, available }) => {
                            assert_eq!(available, utxos.iter().map(|u| u.value).sum::<u64>());
                            assert!(needed > available);
                        }
                        Err(other) => panic!("unexpected error {other:?}"),
                    }
                }
            }
        }
    }

    #[test]
    fn test_input_snapshot_not_mutated() {
        let utxos = vec![utxo(1, 9_000), utxo(2, 1_000)];
        let before = utxos.clone();
        let _ = select_coins(&utxos, 500, &addr(DEST), AddressType::NativeSegwit, &addr(CHANGE), 1).unwrap();
        assert_eq!(utxos, before);
    }
}
