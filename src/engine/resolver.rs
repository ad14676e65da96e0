use std::collections::{BTreeSet, HashSet};

use alloy::primitives::Address;

use super::trigger::EventsByWallet;

/// Tokens sold in-window by a triggering wallet that the follower also holds
/// under this rule. The result is always a subset of `mirrored`.
pub fn resolve(
    triggering: &HashSet<Address>,
    events: &EventsByWallet,
    mirrored: &HashSet<Address>,
) -> BTreeSet<Address> {
    triggering
        .iter()
        .filter_map(|wallet| events.get(wallet).map(|list| (wallet, list)))
        .flat_map(|(wallet, list)| list.iter().filter(move |e| e.is_sell_by(wallet)))
        .map(|e| e.token_address)
        .filter(|token| mirrored.contains(token))
        .collect()
}
