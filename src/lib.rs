//! Core protocol machinery for a user-space TCP endpoint: a bounded byte
//! stream, a reassembler, a receiver, a sender, and the sequence-number
//! codec tying them together.
//!
//! This crate deliberately stops short of wire framing, socket I/O,
//! checksumming, and the rest of a real stack -- those are external
//! collaborators that drive the types here through [`TcpSenderMessage`]
//! and [`TcpReceiverMessage`].

pub mod byte_stream;
pub mod error;
pub mod reassembler;
pub mod tcp;
pub mod wrap32;

pub use byte_stream::ByteStream;
pub use error::{Error, Result};
pub use reassembler::Reassembler;
pub use tcp::{TcpConfig, TcpReceiver, TcpReceiverMessage, TcpSender, TcpSenderMessage};
pub use wrap32::Wrap32;

/// Construct a connected pair of (sender, receiver) byte-stream endpoints
/// for one direction of data flow, wired together the way a single TCP
/// connection half would be.
///
/// This is a convenience for tests and the loopback demo in `main.rs`; a
/// real driver instead owns one `TcpSender` per outbound stream and one
/// `TcpReceiver` per inbound stream, feeding messages between them over
/// the network.
pub fn new_connection(isn: Wrap32, config: TcpConfig) -> Result<(TcpSender, TcpReceiver)> {
    let outbound = ByteStream::new(config.capacity)?;
    let inbound = ByteStream::new(config.capacity)?;
    let sender = TcpSender::new(&outbound, isn, config)?;
    let receiver = TcpReceiver::new(Reassembler::new(inbound.writer()));
    Ok((sender, receiver))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sender_and_receiver_exchange_a_byte_stream() {
        let isn = Wrap32::from_raw(7);
        let (mut sender, mut receiver) = new_connection(isn, TcpConfig::default()).unwrap();

        sender.writer().push(b"hello, world");
        sender.writer().close();
        sender.receive(TcpReceiverMessage {
            ackno: None,
            window_size: 4096,
            rst: false,
        });

        let mut in_flight = Vec::new();
        sender.push(|msg| in_flight.push(msg.clone()));

        for msg in in_flight {
            receiver.receive(msg);
        }

        let ack = receiver.send();
        assert!(ack.ackno.is_some());
    }
}
