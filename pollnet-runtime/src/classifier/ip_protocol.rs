use crate::classifier::Classifier;
use pollnet_packets::{IpProtocol, PacketBuffer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IpClass {
    Icmp,
    Udp,
    Unsupported(u8),
}

/// Sorts IPv4 packets by their protocol field. The window must start at the
/// IP header. TCP is not spoken here, so it is `Unsupported` like anything
/// else without a handler.
#[derive(Default)]
pub struct IpProtocolClassifier {}

impl IpProtocolClassifier {
    pub fn new() -> Self {
        IpProtocolClassifier {}
    }
}

impl Classifier for IpProtocolClassifier {
    type Packet = PacketBuffer;
    type Class = IpClass;

    fn classify(&self, packet: &Self::Packet) -> Self::Class {
        let protocol = match packet.as_slice().get(9) {
            Some(protocol) => *protocol,
            None => return IpClass::Unsupported(0),
        };
        match IpProtocol::from(protocol) {
            IpProtocol::ICMP => IpClass::Icmp,
            IpProtocol::UDP => IpClass::Udp,
            other => IpClass::Unsupported(u8::from(other)),
        }
    }
}
