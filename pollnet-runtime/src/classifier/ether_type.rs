use crate::classifier::Classifier;
use pollnet_packets::{EtherType, PacketBuffer};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EtherClass {
    Arp,
    Ipv4,
    Unsupported(u16),
}

/// Sorts frames by the EtherType of a buffer whose window starts at the
/// Ethernet header. A window too short to hold the field is `Unsupported(0)`.
#[derive(Default)]
pub struct EtherTypeClassifier {}

impl EtherTypeClassifier {
    pub fn new() -> Self {
        EtherTypeClassifier {}
    }
}

impl Classifier for EtherTypeClassifier {
    type Packet = PacketBuffer;
    type Class = EtherClass;

    fn classify(&self, packet: &Self::Packet) -> Self::Class {
        let ether_type = match packet.as_slice().get(12..14) {
            Some(field) => u16::from_be_bytes([field[0], field[1]]),
            None => return EtherClass::Unsupported(0),
        };
        match EtherType::from(ether_type) {
            EtherType::Arp => EtherClass::Arp,
            EtherType::Ipv4 => EtherClass::Ipv4,
            EtherType::Unknown(other) => EtherClass::Unsupported(other),
        }
    }
}
