use crate::auth::TokenVerifier;
use crate::config::ServerConfig;
use crate::coordinator::Coordinator;
use crate::ledger::LedgerHandle;
use crate::room::RoomRegistry;
use crate::signaling::SignalingService;
use crate::store::StreamStore;
use axum::extract::FromRef;
use std::sync::Arc;

/// Everything a request handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Coordinator,
    pub signaling: SignalingService,
    pub verifier: TokenVerifier,
}

impl AppState {
    pub fn new(
        config: &ServerConfig,
        verifier: TokenVerifier,
        streams: Arc<dyn StreamStore>,
        ledger: LedgerHandle,
    ) -> Self {
        let signaling = SignalingService::new(config.ice_servers.clone());
        let registry = RoomRegistry::new(Arc::new(signaling.clone()), config);

        Self {
            coordinator: Coordinator::new(registry, streams, ledger),
            signaling,
            verifier,
        }
    }
}

impl FromRef<AppState> for TokenVerifier {
    fn from_ref(state: &AppState) -> Self {
        state.verifier.clone()
    }
}
