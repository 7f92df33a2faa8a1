use rand::random;

use crate::seq::SeqNo;

/// Upper bound of the 16-bit window advertisement.
pub const MAX_WINDOW_SIZE: u16 = u16::MAX;

/// Largest payload carried by a single segment.
pub const MAX_PAYLOAD_SIZE: usize = 1000;

/// Tunables for one connection endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TcpConfig {
    pub rx_buffer_size: usize,
    pub tx_buffer_size: usize,

    /// Starting retransmission timeout, in milliseconds.
    pub initial_rto_ms: u64,
    pub max_payload_size: usize,

    /// Fixed initial sequence number; drawn at random when absent.
    pub isn: Option<SeqNo>,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            rx_buffer_size: 0b1 << 15,
            tx_buffer_size: 0b1 << 15,

            initial_rto_ms: 1000,
            max_payload_size: MAX_PAYLOAD_SIZE,

            isn: None,
        }
    }
}

impl TcpConfig {
    pub(crate) fn initial_seqno(&self) -> SeqNo {
        self.isn.unwrap_or_else(|| SeqNo::new(random()))
    }
}
