use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// Closed enumeration of the native family's event kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NativeEventKind {
    Transfer,
    ContractDeployed,
}

impl std::fmt::Display for NativeEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NativeEventKind::Transfer => "transfer",
            NativeEventKind::ContractDeployed => "contract-deployed",
        };
        f.write_str(name)
    }
}

/// Native-currency activity reconstructed from full blocks.
///
/// There is no log to subscribe to for plain value transfers or deployments,
/// which is why this family is block-oriented: raw blocks are fetched whole
/// and each successful transaction is classified by shape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NativeEvent {
    Transfer {
        from: Address,
        to: Address,
        value: U256,
    },
    ContractDeployed {
        deployer: Address,
        contract: Address,
    },
}

impl NativeEvent {
    #[must_use]
    pub fn kind(&self) -> NativeEventKind {
        match self {
            NativeEvent::Transfer { .. } => NativeEventKind::Transfer,
            NativeEvent::ContractDeployed { .. } => NativeEventKind::ContractDeployed,
        }
    }
}
