// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! ERC-20 `Transfer` log decoding.

use alloy::{
    primitives::{Address, U256},
    rpc::types::Log,
    sol,
    sol_types::SolEvent,
};

sol! {
    /// Standard ERC-20 transfer event.
    #[derive(Debug, PartialEq, Eq)]
    event Transfer(address indexed from, address indexed to, uint256 value);
}

/// A decoded token transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenTransfer {
    pub token: Address,
    pub from: Address,
    pub to: Address,
    pub value: U256,
}

/// Decode every `Transfer` event emitted by `token` in a receipt's logs.
///
/// Logs from other contracts, and logs that do not decode as a transfer,
/// are skipped.
pub fn token_transfers(logs: &[Log], token: Address) -> Vec<TokenTransfer> {
    logs.iter()
        .filter(|log| log.address() == token)
        .filter(|log| log.topics().first() == Some(&Transfer::SIGNATURE_HASH))
        .filter_map(|log| Transfer::decode_log_data(log.data()).ok())
        .map(|event| TokenTransfer {
            token,
            from: event.from,
            to: event.to,
            value: event.value,
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use alloy::primitives::{address, keccak256, LogData};

    pub(crate) fn transfer_log(token: Address, from: Address, to: Address, value: u64) -> Log {
        let event = Transfer {
            from,
            to,
            value: U256::from(value),
        };
        let data: LogData = event.encode_log_data();
        Log {
            inner: alloy::primitives::Log {
                address: token,
                data,
            },
            ..Default::default()
        }
    }

    #[test]
    fn transfer_topic_matches_signature() {
        assert_eq!(
            Transfer::SIGNATURE_HASH,
            keccak256("Transfer(address,address,uint256)")
        );
    }

    #[test]
    fn decodes_only_logs_from_the_token() {
        let usdc = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");
        let other = address!("0000000000000000000000000000000000000001");
        let from = address!("1111111111111111111111111111111111111111");
        let to = address!("2222222222222222222222222222222222222222");

        let logs = vec![
            transfer_log(usdc, from, to, 5_000_000),
            transfer_log(other, from, to, 9),
        ];

        let transfers = token_transfers(&logs, usdc);
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].to, to);
        assert_eq!(transfers[0].value, U256::from(5_000_000u64));
    }
}
