//! Solidity bindings for the protocol contract and its relay adapter.
//!
//! Enum-typed fields (`TokenType`, `UnshieldType`) are declared as `uint8`,
//! which is how the ABI encodes them.

use alloy::primitives::{aliases::U120, Address, Bytes, FixedBytes, B256, U256};
use alloy::sol;
use shielded_account_lib::note as lib;

sol! {
    #[derive(Debug, PartialEq, Eq)]
    struct TokenData {
        uint8 tokenType;
        address tokenAddress;
        uint256 tokenSubID;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct CommitmentPreimage {
        bytes32 npk;
        TokenData token;
        uint120 value;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ShieldCiphertext {
        bytes32[3] encryptedBundle;
        bytes32 shieldKey;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ShieldRequest {
        CommitmentPreimage preimage;
        ShieldCiphertext ciphertext;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct G1Point {
        uint256 x;
        uint256 y;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct G2Point {
        uint256[2] x;
        uint256[2] y;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct SnarkProof {
        G1Point a;
        G2Point b;
        G1Point c;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct CommitmentCiphertext {
        bytes32[4] ciphertext;
        bytes32 blindedSenderViewingKey;
        bytes32 blindedReceiverViewingKey;
        bytes annotationData;
        bytes memo;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct BoundParams {
        uint16 treeNumber;
        uint72 minGasPrice;
        uint8 unshield;
        uint64 chainID;
        address adaptContract;
        bytes32 adaptParams;
        CommitmentCiphertext[] commitmentCiphertext;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Transaction {
        SnarkProof proof;
        bytes32 merkleRoot;
        bytes32[] nullifiers;
        bytes32[] commitments;
        BoundParams boundParams;
        CommitmentPreimage unshieldPreimage;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct Call {
        address to;
        bytes data;
        uint256 value;
    }

    #[derive(Debug, PartialEq, Eq)]
    struct ActionData {
        bytes31 random;
        bool requireSuccess;
        uint256 minGasLimit;
        Call[] calls;
    }

    #[sol(rpc)]
    interface RailgunSmartWallet {
        function shield(ShieldRequest[] _shieldRequests) external;
        function transact(Transaction[] _transactions) external;
    }

    #[sol(rpc)]
    interface RelayAdapt {
        function getAdaptParams(Transaction[] _transactions, ActionData _actionData) external pure returns (bytes32);
        function relay(Transaction[] _transactions, ActionData _actionData) external payable;
        function unwrapBase(uint256 _amount) external;
    }
}

/// `unshield` field of [`BoundParams`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum UnshieldType {
    None = 0,
    Normal = 1,
    Redirect = 2,
}

/// Largest value representable by a `uint120` note value.
pub const MAX_NOTE_VALUE: u128 = (1u128 << 120) - 1;

impl From<&lib::TokenData> for TokenData {
    fn from(token: &lib::TokenData) -> Self {
        TokenData {
            tokenType: token.token_type as u8,
            tokenAddress: token.token_address,
            tokenSubID: token.token_sub_id,
        }
    }
}

/// Convert a note value to `uint120`, or `None` when it does not fit.
pub fn note_value(value: u128) -> Option<U120> {
    (value <= MAX_NOTE_VALUE).then(|| U120::from(value))
}

fn zero_g1() -> G1Point {
    G1Point {
        x: U256::ZERO,
        y: U256::ZERO,
    }
}

/// Structurally valid transaction carrying only `nullifiers`.
///
/// Used to ask the relay adapter for adapt params before the real proof
/// exists; never submitted.
pub fn dummy_transaction(nullifiers: Vec<B256>) -> Transaction {
    Transaction {
        proof: SnarkProof {
            a: zero_g1(),
            b: G2Point {
                x: [U256::ZERO; 2],
                y: [U256::ZERO; 2],
            },
            c: zero_g1(),
        },
        merkleRoot: B256::ZERO,
        nullifiers,
        commitments: Vec::new(),
        boundParams: BoundParams {
            treeNumber: 0,
            minGasPrice: Default::default(),
            unshield: UnshieldType::None as u8,
            chainID: 0,
            adaptContract: Address::ZERO,
            adaptParams: B256::ZERO,
            commitmentCiphertext: Vec::new(),
        },
        unshieldPreimage: CommitmentPreimage {
            npk: B256::ZERO,
            token: TokenData {
                tokenType: 0,
                tokenAddress: Address::ZERO,
                tokenSubID: U256::ZERO,
            },
            value: U120::ZERO,
        },
    }
}

/// Two-call relay sequence: unwrap `amount` of the wrapped native token,
/// then send `amount` of native currency to `receiver`.
pub fn native_unshield_action_data(
    relay_adapt: Address,
    receiver: Address,
    amount: U256,
    random: FixedBytes<31>,
    min_gas_limit: U256,
) -> ActionData {
    let unwrap = RelayAdapt::unwrapBaseCall { _amount: amount };
    ActionData {
        random,
        requireSuccess: true,
        minGasLimit: min_gas_limit,
        calls: vec![
            Call {
                to: relay_adapt,
                data: Bytes::from(alloy::sol_types::SolCall::abi_encode(&unwrap)),
                value: U256::ZERO,
            },
            Call {
                to: receiver,
                data: Bytes::new(),
                value: amount,
            },
        ],
    }
}
