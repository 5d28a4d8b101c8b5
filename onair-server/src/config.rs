use onair_core::IceServerConfig;

/// Runtime knobs of the coordinator and the real-time channel.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// A real-time `join` for an unknown room creates it on the spot.
    /// When disabled, rooms must be created through the control plane first.
    pub allow_lazy_rooms: bool,
    /// Upper bound on buffered candidates per room. `None` keeps all of them.
    pub max_pending_candidates: Option<usize>,
    /// Capacity of the chat ledger queue.
    pub ledger_queue: usize,
    /// Sent to every connection in its `welcome` frame.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            allow_lazy_rooms: true,
            max_pending_candidates: None,
            ledger_queue: 256,
            ice_servers: Vec::new(),
        }
    }
}
