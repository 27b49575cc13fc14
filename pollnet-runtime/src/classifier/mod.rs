//! # What are they for?
//!
//! Classifiers look at a packet by reference, without modifying it, and decide which part of the
//! stack should handle it next. They return an Enum; the layer that owns the packet matches on
//! that Enum and hands the packet to the handler for its class.
mod ether_type;
pub use self::ether_type::*;

mod ip_protocol;
pub use self::ip_protocol::*;

/// Determines the kind of packet we have. Classifier::Class is then consumed by the layer that
/// owns the packet to send it down the appropriate path.
pub trait Classifier {
    type Packet: Send + Clone;
    type Class: Sized;

    fn classify(&self, packet: &Self::Packet) -> Self::Class;
}
