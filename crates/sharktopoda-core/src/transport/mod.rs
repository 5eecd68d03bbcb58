//! UDP transport: the inbound command service and the outbound sender.

mod client_address;
pub(crate) mod inbound;
mod sender;
pub(crate) mod service;

pub use {
    client_address::ClientAddress,
    inbound::Inbound,
    sender::{SenderEvent, SentMessage, UdpSender},
    service::{ListenState, ServiceEvent, UdpService},
};
