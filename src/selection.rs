//! Coin selection
//!
//! Picks the inputs funding a transaction. The fee is recomputed after each
//! candidate is added since every input grows the transaction.

use std::cmp::Ordering;

use crate::error::{Result, WalletError};
use crate::fees::{Fee, SizeEstimator};
use crate::unspent::{total_amount, UnspentOutput};

/// Select unspents covering `target` plus the fee of the resulting
/// transaction (without change).
///
/// With `combine`, every unspent is spent in the order given. Otherwise the
/// largest are taken first, ties broken by txid then vout.
///
/// A transaction needs at least one input, so an empty set is always
/// `InsufficientFunds`, even when the target and fee are both zero.
pub fn select(
    unspents: &[UnspentOutput],
    target: u64,
    fee: Fee,
    combine: bool,
    estimator: &SizeEstimator,
) -> Result<Vec<UnspentOutput>> {
    if unspents.is_empty() {
        let required = target.saturating_add(fee.for_size(estimator.vsize(unspents, false)));
        return Err(insufficient(0, required.max(1)));
    }

    if combine {
        let available = total_amount(unspents).unwrap_or(u64::MAX);
        let required = target.saturating_add(fee.for_size(estimator.vsize(unspents, false)));
        if available < required {
            return Err(insufficient(available, required));
        }
        log::debug!(
            "Combining all {} unspents ({} sats) for target {}",
            unspents.len(),
            available,
            target
        );
        return Ok(unspents.to_vec());
    }

    let mut candidates: Vec<&UnspentOutput> = unspents.iter().collect();
    candidates.sort_by(|a, b| by_amount_desc(a, b));

    let mut selected: Vec<UnspentOutput> = Vec::new();
    let mut sum = 0u64;
    for utxo in candidates {
        selected.push(utxo.clone());
        sum = sum.saturating_add(utxo.amount);
        let required = target.saturating_add(fee.for_size(estimator.vsize(&selected, false)));
        if sum >= required {
            log::debug!(
                "Selected {} of {} unspents ({} sats) for target {} + fee {}",
                selected.len(),
                unspents.len(),
                sum,
                target,
                required - target
            );
            return Ok(selected);
        }
    }

    // Exhausted: the shortfall is against the fee of spending everything
    let required = target.saturating_add(fee.for_size(estimator.vsize(unspents, false)));
    Err(insufficient(sum, required))
}

fn by_amount_desc(a: &UnspentOutput, b: &UnspentOutput) -> Ordering {
    b.amount
        .cmp(&a.amount)
        .then_with(|| a.txid.cmp(&b.txid))
        .then_with(|| a.vout.cmp(&b.vout))
}

fn insufficient(available: u64, required: u64) -> WalletError {
    WalletError::InsufficientFunds {
        available,
        required,
        shortfall: required.saturating_sub(available),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fees::SpendProfile;
    use crate::script::p2pkh_script;
    use crate::transaction::TxOutput;
    use crate::unspent::ScriptType;

    fn utxo(tag: char, vout: u32, amount: u64) -> UnspentOutput {
        UnspentOutput::new(tag.to_string().repeat(64), vout, amount, ScriptType::P2pkh)
    }

    fn estimator() -> SizeEstimator {
        let outputs = [TxOutput::new(0, p2pkh_script(&[0x11; 20]))];
        SizeEstimator::new(SpendProfile::single(true), &outputs, 25)
    }

    #[test]
    fn picks_both_when_neither_suffices() {
        let unspents = vec![utxo('a', 0, 30_000), utxo('b', 0, 40_000)];
        let selected = select(&unspents, 65_000, Fee::PerByte(1), false, &estimator()).unwrap();
        assert_eq!(selected.len(), 2);
        // largest first
        assert_eq!(selected[0].amount, 40_000);
    }

    #[test]
    fn fails_when_sum_minus_fee_is_short() {
        let unspents = vec![utxo('a', 0, 30_000), utxo('b', 0, 40_000)];
        // two inputs, one output: 10 + 296 + 34 = 340 vbytes -> 17_000 at 50 sat/vB
        let err = select(&unspents, 65_000, Fee::PerByte(50), false, &estimator()).unwrap_err();
        match err {
            WalletError::InsufficientFunds {
                available,
                required,
                shortfall,
            } => {
                assert_eq!(available, 70_000);
                assert_eq!(required, 65_000 + 17_000);
                assert_eq!(shortfall, 12_000);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stops_as_soon_as_target_is_covered() {
        let unspents = vec![utxo('a', 0, 5_000), utxo('b', 0, 80_000), utxo('c', 0, 20_000)];
        let selected = select(&unspents, 50_000, Fee::PerByte(10), false, &estimator()).unwrap();
        assert_eq!(selected, vec![unspents[1].clone()]);
    }

    #[test]
    fn fee_growth_pulls_in_another_input() {
        // 1 input: 192 vbytes -> 1920; 2 inputs: 340 vbytes -> 3400
        let unspents = vec![utxo('a', 0, 51_000), utxo('b', 0, 10_000)];
        let selected = select(&unspents, 50_000, Fee::PerByte(10), false, &estimator()).unwrap();
        assert_eq!(selected.len(), 2);
    }

    #[test]
    fn ties_break_on_txid_then_vout() {
        let unspents = vec![utxo('b', 0, 10_000), utxo('a', 1, 10_000), utxo('a', 0, 10_000)];
        let selected = select(&unspents, 25_000, Fee::Absolute(0), false, &estimator()).unwrap();
        let order: Vec<_> = selected.iter().map(|u| (&u.txid[..1], u.vout)).collect();
        assert_eq!(order, vec![("a", 0), ("a", 1), ("b", 0)]);
    }

    #[test]
    fn combine_takes_everything_in_caller_order() {
        let unspents = vec![utxo('c', 0, 1_000), utxo('a', 0, 90_000), utxo('b', 3, 2_000)];
        let selected = select(&unspents, 10_000, Fee::PerByte(1), true, &estimator()).unwrap();
        assert_eq!(selected, unspents);
    }

    #[test]
    fn combine_still_checks_funds() {
        let unspents = vec![utxo('a', 0, 1_000)];
        assert!(matches!(
            select(&unspents, 10_000, Fee::PerByte(1), true, &estimator()),
            Err(WalletError::InsufficientFunds { .. })
        ));
    }

    #[test]
    fn empty_set_is_insufficient() {
        let err = select(&[], 1_000, Fee::PerByte(1), false, &estimator()).unwrap_err();
        assert!(matches!(err, WalletError::InsufficientFunds { available: 0, .. }));
    }

    #[test]
    fn empty_set_is_insufficient_even_for_free_outputs() {
        for combine in [true, false] {
            for fee in [Fee::PerByte(0), Fee::Absolute(0)] {
                let err = select(&[], 0, fee, combine, &estimator()).unwrap_err();
                match err {
                    WalletError::InsufficientFunds {
                        available,
                        required,
                        shortfall,
                    } => {
                        assert_eq!(available, 0);
                        assert_eq!(required, 1);
                        assert_eq!(shortfall, 1);
                    }
                    other => panic!("unexpected error: {other}"),
                }
            }
        }
    }
}
