// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::{
    auth::SignatureVerifier,
    blockchain::PaymentVerifier,
    config::AppConfig,
    providers::{CustodialWallets, PaymentProcessor},
    storage::Store,
};

/// Shared, immutable application state.
///
/// External services sit behind traits so handlers can be exercised with
/// mocks.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub payments: Arc<dyn PaymentProcessor>,
    pub wallets: Arc<dyn CustodialWallets>,
    pub verifier: Arc<dyn PaymentVerifier>,
    pub signatures: Arc<dyn SignatureVerifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        store: Store,
        payments: Arc<dyn PaymentProcessor>,
        wallets: Arc<dyn CustodialWallets>,
        verifier: Arc<dyn PaymentVerifier>,
        signatures: Arc<dyn SignatureVerifier>,
        config: AppConfig,
    ) -> Self {
        Self {
            store: Arc::new(store),
            payments,
            wallets,
            verifier,
            signatures,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{
        auth::Eip191Verifier,
        blockchain::MockPaymentVerifier,
        config::tests::test_config,
        providers::{MockCustodialWallets, MockPaymentProcessor},
        storage::database::tests::temp_store,
    };

    /// Mocks injected into a test state; unset expectations panic when hit.
    #[derive(Default)]
    pub(crate) struct Mocks {
        pub payments: MockPaymentProcessor,
        pub wallets: MockCustodialWallets,
        pub verifier: MockPaymentVerifier,
    }

    pub(crate) fn state_with(mocks: Mocks) -> (AppState, tempfile::TempDir) {
        let (store, dir) = temp_store();
        let state = AppState::new(
            store,
            Arc::new(mocks.payments),
            Arc::new(mocks.wallets),
            Arc::new(mocks.verifier),
            Arc::new(Eip191Verifier),
            test_config(),
        );
        (state, dir)
    }

    /// State whose providers must not be called.
    pub(crate) fn test_state() -> (AppState, tempfile::TempDir) {
        state_with(Mocks::default())
    }
}
