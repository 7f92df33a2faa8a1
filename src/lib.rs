//! User-space TCP transport core.
//!
//! The in-order byte delivery pipeline and reliable-transmission state
//! machines for one connection endpoint: a bounded [`ByteStream`], the
//! [`Reassembler`] that collapses out-of-order fragments into it, and the
//! [`TcpReceiver`]/[`TcpSender`] pair that turns wire segments into stream
//! bytes and back under flow control and retransmission.
//!
//! The core is single-threaded and event-driven. Framing, adapters, and
//! the glue that shuttles segments between two endpoints live outside this
//! crate; they drive the core through [`TcpReceiver::receive`],
//! [`TcpSender::push`], and [`TcpSender::tick`] and carry segments away
//! through the transmit callbacks.

mod config;
pub use config::*;

mod stream;
pub use stream::*;

mod seq;
pub use seq::*;

mod pkt;
pub use pkt::*;

mod reassembler;
pub use reassembler::*;

mod receiver;
pub use receiver::*;

mod sender;
pub use sender::*;
