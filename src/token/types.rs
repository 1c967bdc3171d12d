use alloy::primitives::{Address, U256};
use serde::{Deserialize, Serialize};

/// ERC20 surface this family watches and reads.
pub(crate) mod abi {
    use alloy::sol;

    sol! {
        #[sol(rpc)]
        interface IERC20 {
            event Transfer(address indexed from, address indexed to, uint256 value);
            event Approval(address indexed owner, address indexed spender, uint256 value);

            function totalSupply() external view returns (uint256);
        }
    }
}

/// Closed enumeration of the token family's event kinds.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenEventKind {
    Transfer,
    Approval,
}

impl std::fmt::Display for TokenEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TokenEventKind::Transfer => "transfer",
            TokenEventKind::Approval => "approval",
        };
        f.write_str(name)
    }
}

/// Fully-enriched payload of a token event.
///
/// `token` is the emitting contract; one listener commonly watches several
/// token contracts over a single endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TokenEvent {
    Transfer {
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    },
    Approval {
        token: Address,
        owner: Address,
        spender: Address,
        amount: U256,
    },
}

impl TokenEvent {
    #[must_use]
    pub fn kind(&self) -> TokenEventKind {
        match self {
            TokenEvent::Transfer { .. } => TokenEventKind::Transfer,
            TokenEvent::Approval { .. } => TokenEventKind::Approval,
        }
    }

    /// Addresses party to this event.
    #[must_use]
    pub fn participants(&self) -> [Address; 2] {
        match self {
            TokenEvent::Transfer { from, to, .. } => [*from, *to],
            TokenEvent::Approval { owner, spender, .. } => [*owner, *spender],
        }
    }
}
