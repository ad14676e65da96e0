use std::collections::{HashMap, HashSet};

use alloy::primitives::Address;

use crate::models::{ConditionMode, ConditionPolicy, TransferEvent};

/// Transfers observed per followed wallet within the window.
pub type EventsByWallet = HashMap<Address, Vec<TransferEvent>>;

/// Wallets that sent at least one transfer out in the window.
pub fn wallets_with_sells(events: &EventsByWallet) -> HashSet<Address> {
    events
        .iter()
        .filter(|(wallet, list)| list.iter().any(|e| e.is_sell_by(wallet)))
        .map(|(wallet, _)| *wallet)
        .collect()
}

/// Decide from a count of selling wallets.
///
/// `ALL` means "at least `count` wallets sold", not "every followed wallet".
pub fn is_satisfied(mode: ConditionMode, count: u32, selling_wallets: usize) -> bool {
    match mode {
        ConditionMode::Any => selling_wallets >= 1,
        ConditionMode::All => selling_wallets >= count.max(1) as usize,
    }
}

/// Pure trigger decision for one rule. No I/O.
pub fn evaluate(events: &EventsByWallet, condition: &ConditionPolicy) -> bool {
    is_satisfied(condition.mode, condition.count, wallets_with_sells(events).len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;
    use chrono::Utc;

    fn wallet(n: u8) -> Address {
        Address::with_last_byte(n)
    }

    fn token() -> Address {
        Address::repeat_byte(0xaa)
    }

    fn transfer(from: Address, to: Address) -> TransferEvent {
        TransferEvent {
            from,
            to,
            token_address: token(),
            value: U256::from(1u64),
            timestamp: Utc::now(),
            tx_hash: None,
        }
    }

    fn condition(mode: ConditionMode, count: u32) -> ConditionPolicy {
        ConditionPolicy {
            mode,
            count,
            time_window_seconds: 600,
        }
    }

    /// Wallets 1..=n, where the first `sellers` each sent one transfer out.
    fn events_with_sellers(n: u8, sellers: u8) -> EventsByWallet {
        (1..=n)
            .map(|i| {
                let list = if i <= sellers {
                    vec![transfer(wallet(i), wallet(200))]
                } else {
                    vec![]
                };
                (wallet(i), list)
            })
            .collect()
    }

    #[test]
    fn test_any_fires_with_one_seller() {
        let events = events_with_sellers(2, 1);
        assert!(evaluate(&events, &condition(ConditionMode::Any, 1)));
    }

    #[test]
    fn test_any_quiet_without_sells() {
        let events = events_with_sellers(3, 0);
        assert!(!evaluate(&events, &condition(ConditionMode::Any, 1)));
    }

    #[test]
    fn test_all_requires_count_not_every_wallet() {
        // 2 of 3 sold; ALL with count=2 fires even though wallet 3 did not sell.
        let events = events_with_sellers(3, 2);
        assert!(evaluate(&events, &condition(ConditionMode::All, 2)));
        assert!(!evaluate(&events, &condition(ConditionMode::All, 3)));
    }

    #[test]
    fn test_all_count_two_with_one_seller() {
        let events = events_with_sellers(2, 1);
        assert!(!evaluate(&events, &condition(ConditionMode::All, 2)));
    }

    #[test]
    fn test_all_count_zero_treated_as_one() {
        assert!(!is_satisfied(ConditionMode::All, 0, 0));
        assert!(is_satisfied(ConditionMode::All, 0, 1));
    }

    #[test]
    fn test_incoming_transfer_is_not_a_sell() {
        let mut events = EventsByWallet::new();
        events.insert(wallet(1), vec![transfer(wallet(9), wallet(1))]);
        assert!(wallets_with_sells(&events).is_empty());
        assert!(!evaluate(&events, &condition(ConditionMode::Any, 1)));
    }

    #[test]
    fn test_any_and_all_one_agree() {
        for n in 0..=4u8 {
            for sellers in 0..=n {
                let events = events_with_sellers(n, sellers);
                let any = evaluate(&events, &condition(ConditionMode::Any, 1));
                let all_one = evaluate(&events, &condition(ConditionMode::All, 1));
                assert_eq!(any, all_one, "n={n} sellers={sellers}");
            }
        }
    }
}
