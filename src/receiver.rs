use crate::config::{TcpConfig, MAX_WINDOW_SIZE};
use crate::pkt::{TcpAck, TcpSegment};
use crate::reassembler::Reassembler;
use crate::seq::SeqNo;
use crate::stream::{ByteStream, Reader};

/// The receiving half of a connection endpoint.
///
/// Consumes wire segments, resolves their sequence numbers against the
/// peer's ISN, and feeds payload bytes into the reassembler; produces the
/// acknowledgement and window advertisement travelling the other way.
#[derive(Debug)]
pub struct TcpReceiver {
    reassembler: Reassembler,
    isn: Option<SeqNo>,
}

impl TcpReceiver {
    pub fn new(reassembler: Reassembler) -> Self {
        Self {
            reassembler,
            isn: None,
        }
    }

    pub fn from_config(cfg: &TcpConfig) -> Self {
        Self::new(Reassembler::new(ByteStream::new(cfg.rx_buffer_size)))
    }

    pub fn receive(&mut self, segment: TcpSegment) {
        if segment.flags.rst {
            log::debug!(target: "utcp/rx", "peer reset, poisoning inbound stream");
            self.reassembler.stream_mut().set_error();
            return;
        }

        if segment.flags.syn && self.isn.is_none() {
            log::trace!(target: "utcp/rx", "learned peer isn {}", segment.seqno);
            self.isn = Some(segment.seqno);
        }
        let Some(isn) = self.isn else {
            // Nothing is interpretable before a SYN fixes the zero point.
            return;
        };

        // The next absolute seqno we expect; +1 for the SYN's slot.
        let checkpoint = self.reassembler.stream().bytes_pushed() + 1;
        let abs_seqno = segment.seqno.unwrap(isn, checkpoint);

        // Payload starts one behind the absolute seqno unless this very
        // segment carries the SYN. Wrapping: a bare repeat of the SYN's
        // seqno lands far past the acceptance window and is dropped there.
        let stream_index = abs_seqno
            .wrapping_sub(1)
            .wrapping_add(u64::from(segment.flags.syn));

        self.reassembler
            .insert(stream_index, segment.payload, segment.flags.fin);
    }

    pub fn send(&self) -> TcpAck {
        let stream = self.reassembler.stream();

        let ackno = self.isn.map(|isn| {
            // +1 for the SYN, and one more once the FIN made it through
            // the reassembler.
            let mut abs_ackno = stream.bytes_pushed() + 1;
            if stream.is_closed() {
                abs_ackno += 1;
            }
            SeqNo::wrap(abs_ackno, isn)
        });

        TcpAck {
            ackno,
            window: stream
                .available_capacity()
                .min(usize::from(MAX_WINDOW_SIZE)) as u16,
            rst: stream.has_error(),
        }
    }

    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    pub fn stream(&self) -> &ByteStream {
        self.reassembler.stream()
    }

    /// Read capability of the inbound stream, for the application.
    pub fn reader(&mut self) -> Reader<'_> {
        self.reassembler.reader()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkt::TcpFlags;
    use bytes::Bytes;

    fn receiver(capacity: usize) -> TcpReceiver {
        TcpReceiver::new(Reassembler::new(ByteStream::new(capacity)))
    }

    fn segment(seqno: u32, flags: TcpFlags, payload: &'static [u8]) -> TcpSegment {
        TcpSegment {
            seqno: SeqNo::new(seqno),
            flags,
            payload: Bytes::from_static(payload),
        }
    }

    #[test]
    fn no_ackno_before_syn() {
        let mut rx = receiver(16);
        let ack = rx.send();
        assert_eq!(ack.ackno, None);
        assert_eq!(ack.window, 16);

        // Data before the handshake is uninterpretable.
        rx.receive(segment(100, TcpFlags::new(), b"hello"));
        assert_eq!(rx.stream().bytes_pushed(), 0);
        assert_eq!(rx.send().ackno, None);
    }

    #[test]
    fn syn_fixes_the_zero_point() {
        let mut rx = receiver(16);
        rx.receive(segment(1000, TcpFlags::new().syn(true), b""));
        assert_eq!(rx.send().ackno, Some(SeqNo::new(1001)));

        rx.receive(segment(1001, TcpFlags::new(), b"abcd"));
        assert_eq!(rx.stream().bytes_pushed(), 4);
        assert_eq!(rx.send().ackno, Some(SeqNo::new(1005)));
    }

    #[test]
    fn payload_on_the_syn_segment() {
        let mut rx = receiver(16);
        rx.receive(segment(7, TcpFlags::new().syn(true), b"hi"));
        assert_eq!(rx.stream().bytes_pushed(), 2);
        assert_eq!(rx.send().ackno, Some(SeqNo::new(10)));
    }

    #[test]
    fn fin_advances_the_ackno_once_assembled() {
        let mut rx = receiver(16);
        rx.receive(segment(0, TcpFlags::new().syn(true), b""));
        rx.receive(segment(1, TcpFlags::new().fin(true), b"ab"));
        assert!(rx.stream().is_closed());
        // SYN + 2 payload bytes + FIN.
        assert_eq!(rx.send().ackno, Some(SeqNo::new(4)));
    }

    #[test]
    fn fin_waits_for_missing_data() {
        let mut rx = receiver(16);
        rx.receive(segment(0, TcpFlags::new().syn(true), b""));
        rx.receive(segment(3, TcpFlags::new().fin(true), b"cd"));
        assert!(!rx.stream().is_closed());
        assert_eq!(rx.send().ackno, Some(SeqNo::new(1)));

        rx.receive(segment(1, TcpFlags::new(), b"ab"));
        assert!(rx.stream().is_closed());
        assert_eq!(rx.send().ackno, Some(SeqNo::new(6)));
    }

    #[test]
    fn out_of_order_segments_reassemble() {
        let mut rx = receiver(32);
        rx.receive(segment(500, TcpFlags::new().syn(true), b""));
        rx.receive(segment(506, TcpFlags::new(), b"fghij"));
        assert_eq!(rx.stream().bytes_pushed(), 0);
        assert_eq!(rx.reassembler().count_bytes_pending(), 5);

        rx.receive(segment(501, TcpFlags::new(), b"abcde"));
        assert_eq!(rx.stream().bytes_pushed(), 10);

        let mut buf = [0u8; 10];
        rx.reader().read(&mut buf);
        assert_eq!(&buf, b"abcdefghij");
    }

    #[test]
    fn window_tracks_capacity_and_clamps() {
        let mut rx = receiver(100_000);
        assert_eq!(rx.send().window, u16::MAX);

        rx.receive(segment(0, TcpFlags::new().syn(true), b""));
        rx.receive(segment(1, TcpFlags::new(), b"abcd"));
        assert_eq!(rx.send().window, u16::MAX);

        let mut rx = receiver(10);
        rx.receive(segment(0, TcpFlags::new().syn(true), b""));
        rx.receive(segment(1, TcpFlags::new(), b"abcd"));
        assert_eq!(rx.send().window, 6);
    }

    #[test]
    fn rst_poisons_the_stream() {
        let mut rx = receiver(16);
        rx.receive(segment(0, TcpFlags::new().syn(true), b""));
        rx.receive(segment(1, TcpFlags::new().rst(true), b""));
        assert!(rx.stream().has_error());
        assert!(rx.send().rst);
    }
}
