use crate::*;
use std::convert::{TryFrom, TryInto};
use std::net::Ipv4Addr;

/// Size of an ARP message for the Ethernet/IPv4 profile.
pub const ARP_PACKET_LEN: usize = 28;
pub const ARP_HARDWARE_ETHERNET: u16 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

impl TryFrom<u16> for ArpOp {
    type Error = &'static str;

    fn try_from(opcode: u16) -> Result<Self, Self::Error> {
        match opcode {
            1 => Ok(ArpOp::Request),
            2 => Ok(ArpOp::Reply),
            _ => Err("Unknown ARP opcode"),
        }
    }
}

const HARDWARE_TYPE_RANGE: (usize, usize) = (0, 2);
const PROTOCOL_TYPE_RANGE: (usize, usize) = (2, 4);
const HARDWARE_ADDR_LEN_RANGE: (usize, usize) = (4, 5);
const PROTOCOL_ADDR_LEN_RANGE: (usize, usize) = (5, 6);
const OPCODE_RANGE: (usize, usize) = (6, 8);
const SENDER_HARDWARE_ADDR_RANGE: (usize, usize) = (8, 14);
const SENDER_PROTOCOL_ADDR_RANGE: (usize, usize) = (14, 18);
const TARGET_HARDWARE_ADDR_RANGE: (usize, usize) = (18, 24);
const TARGET_PROTOCOL_ADDR_RANGE: (usize, usize) = (24, 28);

///
/// Getters/setters for the packet structure described in RFC 826
/// https://tools.ietf.org/html/rfc826
///
/// Only the Ethernet/IPv4 profile is modelled, so every address has a fixed
/// offset. `new_checked` only verifies the length; use `is_ethernet_ipv4`
/// before trusting the address fields.
///
#[derive(Clone, Debug)]
pub struct ArpPacket<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> ArpPacket<T> {
    pub fn new_checked(buffer: T) -> Result<ArpPacket<T>, &'static str> {
        if buffer.as_ref().len() < ARP_PACKET_LEN {
            return Err("Payload is too small to be an ARP packet");
        }
        Ok(ArpPacket { buffer })
    }

    pub fn new_unchecked(buffer: T) -> ArpPacket<T> {
        ArpPacket { buffer }
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn hardware_type(&self) -> u16 {
        self.read_u16(HARDWARE_TYPE_RANGE)
    }

    pub fn protocol_type(&self) -> u16 {
        self.read_u16(PROTOCOL_TYPE_RANGE)
    }

    pub fn hardware_addr_len(&self) -> u8 {
        self.buffer.as_ref()[HARDWARE_ADDR_LEN_RANGE.0]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        self.buffer.as_ref()[PROTOCOL_ADDR_LEN_RANGE.0]
    }

    pub fn opcode(&self) -> u16 {
        self.read_u16(OPCODE_RANGE)
    }

    /// Hardware type Ethernet, protocol type IPv4, address lengths 6 and 4.
    pub fn is_ethernet_ipv4(&self) -> bool {
        self.hardware_type() == ARP_HARDWARE_ETHERNET
            && self.protocol_type() == IPV4_ETHER_TYPE
            && self.hardware_addr_len() == 6
            && self.protocol_addr_len() == 4
    }

    pub fn sender_hardware_addr(&self) -> MacAddr {
        let (start, end) = SENDER_HARDWARE_ADDR_RANGE;
        MacAddr::from_slice(&self.buffer.as_ref()[start..end])
    }

    pub fn sender_protocol_addr(&self) -> Ipv4Addr {
        self.read_ipv4(SENDER_PROTOCOL_ADDR_RANGE)
    }

    pub fn target_hardware_addr(&self) -> MacAddr {
        let (start, end) = TARGET_HARDWARE_ADDR_RANGE;
        MacAddr::from_slice(&self.buffer.as_ref()[start..end])
    }

    pub fn target_protocol_addr(&self) -> Ipv4Addr {
        self.read_ipv4(TARGET_PROTOCOL_ADDR_RANGE)
    }

    fn read_u16(&self, (start, end): (usize, usize)) -> u16 {
        u16::from_be_bytes(self.buffer.as_ref()[start..end].try_into().unwrap())
    }

    fn read_ipv4(&self, (start, end): (usize, usize)) -> Ipv4Addr {
        let octets: [u8; 4] = self.buffer.as_ref()[start..end].try_into().unwrap();
        Ipv4Addr::from(octets)
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> ArpPacket<T> {
    /// Writes the fixed Ethernet/IPv4 profile fields.
    pub fn init_ethernet_ipv4(&mut self) {
        self.write(HARDWARE_TYPE_RANGE, &ARP_HARDWARE_ETHERNET.to_be_bytes());
        self.write(PROTOCOL_TYPE_RANGE, &IPV4_ETHER_TYPE.to_be_bytes());
        self.write(HARDWARE_ADDR_LEN_RANGE, &[6]);
        self.write(PROTOCOL_ADDR_LEN_RANGE, &[4]);
    }

    pub fn set_opcode(&mut self, op: ArpOp) {
        self.write(OPCODE_RANGE, &(op as u16).to_be_bytes());
    }

    pub fn set_sender_hardware_addr(&mut self, addr: MacAddr) {
        self.write(SENDER_HARDWARE_ADDR_RANGE, &addr.bytes);
    }

    pub fn set_sender_protocol_addr(&mut self, addr: Ipv4Addr) {
        self.write(SENDER_PROTOCOL_ADDR_RANGE, &addr.octets());
    }

    pub fn set_target_hardware_addr(&mut self, addr: MacAddr) {
        self.write(TARGET_HARDWARE_ADDR_RANGE, &addr.bytes);
    }

    pub fn set_target_protocol_addr(&mut self, addr: Ipv4Addr) {
        self.write(TARGET_PROTOCOL_ADDR_RANGE, &addr.octets());
    }

    fn write(&mut self, (start, end): (usize, usize), bytes: &[u8]) {
        self.buffer.as_mut()[start..end].copy_from_slice(bytes);
    }
}
