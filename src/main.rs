//! Minimal in-memory loopback demo: one `TcpSender` talking to one
//! `TcpReceiver` via plain in-process function calls, with `tracing`
//! wired up so the protocol's internal decisions (segments sent, acks
//! accepted, RTO backoff) are visible.
//!
//! There is no TUN/TAP device, no IP/TCP header framing, and no
//! checksumming here -- those belong to a real packet driver built on top
//! of this crate, not to the crate itself.

use std::collections::VecDeque;

use tcpcore::{new_connection, TcpConfig, TcpReceiverMessage, TcpSenderMessage, Wrap32};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("tcpcore=debug")),
        )
        .init();

    let isn = Wrap32::from_raw(0x1234_5678);
    let config = TcpConfig::default();
    let (mut sender, mut receiver) = new_connection(isn, config).expect("valid configuration");

    sender
        .writer()
        .push(b"the quick brown fox jumps over the lazy dog");
    sender.writer().close();

    // The receiver hasn't spoken yet, so the sender doesn't know the peer's
    // window; feed back an initial window so push() has room to work with.
    sender.receive(TcpReceiverMessage {
        ackno: None,
        window_size: 4096,
        rst: false,
    });

    let mut wire: VecDeque<TcpSenderMessage> = VecDeque::new();
    sender.push(|msg| wire.push_back(msg.clone()));

    while let Some(msg) = wire.pop_front() {
        receiver.receive(msg);
        let ack = receiver.send();
        sender.receive(ack);
        sender.push(|msg| wire.push_back(msg.clone()));
    }

    tracing::info!(
        bytes_in_flight = sender.sequence_numbers_in_flight(),
        retransmissions = sender.consecutive_retransmissions(),
        "loopback demo finished"
    );
}
