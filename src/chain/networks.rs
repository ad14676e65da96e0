use alloy::primitives::{address, Address};

/// Settlement stablecoin and Uniswap V3 periphery for a network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkDefaults {
    pub settlement_token: Address,
    pub swap_router: Address,
    pub quoter: Address,
}

impl NetworkDefaults {
    pub fn for_network(network: &str) -> Option<Self> {
        match network {
            "base-mainnet" => Some(Self {
                settlement_token: address!("833589fCD6eDb6E08f4c7C32D4f71b54bdA02913"),
                swap_router: address!("2626664c2603336E57B271c5C0b26F421741e481"),
                quoter: address!("3d4e44Eb1374240CE5F1B871ab261CD16335B76a"),
            }),
            "base-sepolia" => Some(Self {
                settlement_token: address!("036CbD53842c5426634e7929541eC2318f3dCF7e"),
                swap_router: address!("94cC0AaC535CCDB3C01d6787D6413C739ae12bc4"),
                quoter: address!("C5290058841028F1614F3A6F0F5816cAd0df5E27"),
            }),
            "ethereum-mainnet" => Some(Self {
                settlement_token: address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48"),
                swap_router: address!("68b3465833fb72A70ecDF485E0e4C7bD8665Fc45"),
                quoter: address!("61fFE014bA17989E743c5F6cB21bF9697530B21e"),
            }),
            _ => None,
        }
    }
}

/// Engine network id for an EVM chain id.
pub fn network_from_chain_id(chain_id: u64) -> String {
    match chain_id {
        1 => "ethereum-mainnet".into(),
        8453 => "base-mainnet".into(),
        84532 => "base-sepolia".into(),
        11155111 => "ethereum-sepolia".into(),
        other => format!("eip155:{other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_networks() {
        assert!(NetworkDefaults::for_network("base-mainnet").is_some());
        assert!(NetworkDefaults::for_network("base-sepolia").is_some());
        assert!(NetworkDefaults::for_network("ethereum-mainnet").is_some());
        assert!(NetworkDefaults::for_network("eip155:999").is_none());
    }

    #[test]
    fn test_network_from_chain_id() {
        assert_eq!(network_from_chain_id(8453), "base-mainnet");
        assert_eq!(network_from_chain_id(84532), "base-sepolia");
        assert_eq!(network_from_chain_id(42), "eip155:42");
    }
}
