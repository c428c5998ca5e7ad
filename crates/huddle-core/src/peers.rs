/// Projection of which remote peers are currently in the channel.
///
/// Updated by the session event loop, read by the rendering shell.
/// Insertion order is preserved so remote tiles keep a stable layout.
#[derive(Debug, Clone, Default)]
pub struct PeerRoster {
    peers: Vec<u32>,
}

impl PeerRoster {
    pub fn new() -> Self {
        Self { peers: Vec::new() }
    }

    /// Record a remote peer joining. Returns true when the roster changed.
    ///
    /// Join events are delivered at-least-once, so a uid already present is
    /// a silent no-op.
    pub fn on_user_joined(&mut self, uid: u32) -> bool {
        if self.peers.iter().any(|p| *p == uid) {
            return false;
        }
        self.peers.push(uid);
        true
    }

    /// Record a remote peer leaving. Returns true when the roster changed.
    ///
    /// Removing an absent uid is a silent no-op; offline events can arrive
    /// late, twice, or out of order.
    pub fn on_user_offline(&mut self, uid: u32) -> bool {
        let before = self.peers.len();
        self.peers.retain(|p| *p != uid);
        self.peers.len() != before
    }

    pub fn peers(&self) -> &[u32] {
        &self.peers
    }

    pub fn contains(&self, uid: u32) -> bool {
        self.peers.iter().any(|p| *p == uid)
    }

    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    /// Clear the roster. Called whenever the session leaves the channel.
    pub fn reset(&mut self) {
        self.peers.clear();
    }
}
