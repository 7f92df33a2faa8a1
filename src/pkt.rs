use std::fmt::Display;

use bytes::Bytes;

use crate::seq::SeqNo;

/// A segment travelling from sender to receiver, minus whatever framing an
/// adapter wraps around it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TcpSegment {
    pub seqno: SeqNo,
    pub flags: TcpFlags,
    pub payload: Bytes,
}

/// Flags of a [`TcpSegment`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TcpFlags {
    pub syn: bool,
    pub fin: bool,
    pub rst: bool,
}

/// Receiver feedback travelling back to the sender: the cumulative
/// acknowledgement (absent until a SYN fixed the zero point) and the
/// current window advertisement.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TcpAck {
    pub ackno: Option<SeqNo>,
    pub window: u16,
    pub rst: bool,
}

macro_rules! fimpl {
    ($i:ident) => {
        pub fn $i(mut self, value: bool) -> Self {
            self.$i = value;
            self
        }
    };
}

impl TcpFlags {
    pub fn new() -> Self {
        Self::default()
    }
    fimpl!(syn);
    fimpl!(fin);
    fimpl!(rst);
}

impl TcpSegment {
    /// An empty segment carrying only a sequence number.
    pub fn empty(seqno: SeqNo) -> Self {
        Self {
            seqno,
            flags: TcpFlags::new(),
            payload: Bytes::new(),
        }
    }

    /// Footprint in the sequence space: payload bytes, plus one slot for
    /// SYN and one for FIN.
    pub fn sequence_length(&self) -> u64 {
        self.payload.len() as u64 + u64::from(self.flags.syn) + u64::from(self.flags.fin)
    }
}

impl Display for TcpFlags {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.syn {
            write!(f, "SYN")?
        }
        if self.fin {
            write!(f, "FIN")?
        }
        if self.rst {
            write!(f, "RST")?
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_length_counts_flags() {
        let mut seg = TcpSegment::empty(SeqNo::new(0));
        assert_eq!(seg.sequence_length(), 0);

        seg.flags = TcpFlags::new().syn(true);
        assert_eq!(seg.sequence_length(), 1);

        seg.payload = Bytes::from_static(b"abc");
        seg.flags = TcpFlags::new().syn(true).fin(true);
        assert_eq!(seg.sequence_length(), 5);

        // RST does not occupy a sequence slot.
        seg.flags = TcpFlags::new().rst(true);
        assert_eq!(seg.sequence_length(), 3);
    }
}
