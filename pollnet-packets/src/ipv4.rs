use crate::*;
use std::convert::TryInto;
use std::net::Ipv4Addr;

/// Header length without options.
pub const IPV4_HEADER_LEN: usize = 20;
pub const IPV4_DEFAULT_TTL: u8 = 64;
pub const IPV4_MAX_LEN: usize = 65535;

const FLAG_DONT_FRAGMENT: u8 = 0x40;
const FLAG_MORE_FRAGMENTS: u8 = 0x20;

///
/// Getters/setters over an IPv4 header and its payload (RFC 791).
///
/// `new_checked` validates the structure of the header: version, header
/// length and total length. The checksum is checked separately with
/// `verify_checksum` so a caller can tell the two failures apart.
///
#[derive(Clone, Debug)]
pub struct Ipv4Packet<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> Ipv4Packet<T> {
    pub fn new_checked(buffer: T) -> Result<Ipv4Packet<T>, &'static str> {
        let data = buffer.as_ref();
        if data.len() < IPV4_HEADER_LEN {
            return Err("Data is too short to be an IPv4 Packet");
        }

        let version = (data[0] & 0xF0) >> 4;
        if version != 4 {
            return Err("Packet has incorrect version, is not Ipv4Packet");
        }

        let packet = Ipv4Packet { buffer };
        let header_len = packet.header_len();
        let total_len = packet.total_len() as usize;
        if header_len < IPV4_HEADER_LEN || header_len > packet.buffer.as_ref().len() {
            return Err("Packet has invalid header length field");
        }
        if total_len < header_len || total_len > packet.buffer.as_ref().len() {
            return Err("Packet has invalid total length field");
        }

        Ok(packet)
    }

    pub fn new_unchecked(buffer: T) -> Ipv4Packet<T> {
        Ipv4Packet { buffer }
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn version(&self) -> u8 {
        self.buffer.as_ref()[0] >> 4
    }

    /// Header length in 32 bit words.
    pub fn ihl(&self) -> u8 {
        self.buffer.as_ref()[0] & 0x0F
    }

    pub fn header_len(&self) -> usize {
        self.ihl() as usize * 4
    }

    pub fn tos(&self) -> u8 {
        self.buffer.as_ref()[1]
    }

    pub fn total_len(&self) -> u16 {
        self.read_u16(2)
    }

    pub fn identification(&self) -> u16 {
        self.read_u16(4)
    }

    pub fn dont_fragment(&self) -> bool {
        self.buffer.as_ref()[6] & FLAG_DONT_FRAGMENT != 0
    }

    pub fn more_fragments(&self) -> bool {
        self.buffer.as_ref()[6] & FLAG_MORE_FRAGMENTS != 0
    }

    /// Offset of this fragment in 8 byte units.
    pub fn fragment_offset(&self) -> u16 {
        self.read_u16(6) & 0x1FFF
    }

    pub fn ttl(&self) -> u8 {
        self.buffer.as_ref()[8]
    }

    pub fn protocol(&self) -> IpProtocol {
        IpProtocol::from(self.buffer.as_ref()[9])
    }

    pub fn checksum(&self) -> u16 {
        self.read_u16(10)
    }

    pub fn src_addr(&self) -> Ipv4Addr {
        let octets: [u8; 4] = self.buffer.as_ref()[12..16].try_into().unwrap();
        Ipv4Addr::from(octets)
    }

    pub fn dest_addr(&self) -> Ipv4Addr {
        let octets: [u8; 4] = self.buffer.as_ref()[16..20].try_into().unwrap();
        Ipv4Addr::from(octets)
    }

    pub fn header(&self) -> &[u8] {
        &self.buffer.as_ref()[..self.header_len()]
    }

    /// The bytes between the header and the total length. Link layer padding
    /// past the total length is not part of the payload.
    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[self.header_len()..self.total_len() as usize]
    }

    /// What the checksum field should hold for the current header. The field
    /// itself is skipped, so the header is never modified.
    pub fn compute_checksum(&self) -> u16 {
        let header = self.header();
        Checksum::new()
            .add(&header[..10])
            .add(&header[12..])
            .finish()
    }

    pub fn verify_checksum(&self) -> bool {
        self.compute_checksum() == self.checksum()
    }

    fn read_u16(&self, at: usize) -> u16 {
        u16::from_be_bytes(self.buffer.as_ref()[at..at + 2].try_into().unwrap())
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> Ipv4Packet<T> {
    /// Sets version 4 and the header length, which must be a multiple of 4.
    pub fn set_header_len(&mut self, header_len: usize) {
        self.buffer.as_mut()[0] = 0x40 | (0x0F & (header_len / 4) as u8);
    }

    pub fn set_tos(&mut self, tos: u8) {
        self.buffer.as_mut()[1] = tos;
    }

    pub fn set_total_len(&mut self, total_len: u16) {
        self.write_u16(2, total_len);
    }

    pub fn set_identification(&mut self, ident: u16) {
        self.write_u16(4, ident);
    }

    /// Writes the flags and fragment offset word. `offset` is in 8 byte units
    /// and is masked to 13 bits. Don't Fragment is always cleared.
    pub fn set_fragment(&mut self, more_fragments: bool, offset: u16) {
        let mut word = offset & 0x1FFF;
        if more_fragments {
            word |= u16::from(FLAG_MORE_FRAGMENTS) << 8;
        }
        self.write_u16(6, word);
    }

    pub fn set_ttl(&mut self, ttl: u8) {
        self.buffer.as_mut()[8] = ttl;
    }

    pub fn set_protocol(&mut self, protocol: IpProtocol) {
        self.buffer.as_mut()[9] = u8::from(protocol);
    }

    pub fn set_checksum(&mut self, checksum: u16) {
        self.write_u16(10, checksum);
    }

    /// Sets checksum field to valid value
    pub fn fill_checksum(&mut self) {
        let checksum = self.compute_checksum();
        self.set_checksum(checksum);
    }

    pub fn set_src_addr(&mut self, addr: Ipv4Addr) {
        self.buffer.as_mut()[12..16].copy_from_slice(&addr.octets());
    }

    pub fn set_dest_addr(&mut self, addr: Ipv4Addr) {
        self.buffer.as_mut()[16..20].copy_from_slice(&addr.octets());
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        let (start, end) = (self.header_len(), self.total_len() as usize);
        &mut self.buffer.as_mut()[start..end]
    }

    fn write_u16(&mut self, at: usize, value: u16) {
        self.buffer.as_mut()[at..at + 2].copy_from_slice(&value.to_be_bytes());
    }
}
