use crate::*;
use std::convert::TryInto;

pub const ETHERNET_HEADER_LEN: usize = 14;
/// Frames whose payload is shorter than this are zero padded on the way out.
pub const ETHERNET_MIN_PAYLOAD: usize = 46;
pub const ETHERNET_MTU: usize = 1500;

const DEST_MAC_RANGE: (usize, usize) = (0, 6);
const SRC_MAC_RANGE: (usize, usize) = (6, 12);
const ETHER_TYPE_RANGE: (usize, usize) = (12, 14);

///
/// Getters/setters over an Ethernet II frame.
///
/// ```text
/// 0                    6                    12                  14
/// |---6 byte Dest_MAC--|---6 byte Src_MAC---|--2 Byte EtherType--|
/// ```
///
/// No FCS is carried; the driver owns that.
///
#[derive(Clone, Debug)]
pub struct EthernetFrame<T: AsRef<[u8]>> {
    buffer: T,
}

impl<T: AsRef<[u8]>> EthernetFrame<T> {
    pub fn new_checked(buffer: T) -> Result<EthernetFrame<T>, &'static str> {
        if buffer.as_ref().len() < ETHERNET_HEADER_LEN {
            return Err("Frame is less than the minimum of 14 bytes");
        }
        Ok(EthernetFrame { buffer })
    }

    /// Wraps `buffer` without a length check. Accessors panic if it is shorter
    /// than a header.
    pub fn new_unchecked(buffer: T) -> EthernetFrame<T> {
        EthernetFrame { buffer }
    }

    pub fn into_inner(self) -> T {
        self.buffer
    }

    pub fn dest_mac(&self) -> MacAddr {
        let (start, end) = DEST_MAC_RANGE;
        MacAddr::from_slice(&self.buffer.as_ref()[start..end])
    }

    pub fn src_mac(&self) -> MacAddr {
        let (start, end) = SRC_MAC_RANGE;
        MacAddr::from_slice(&self.buffer.as_ref()[start..end])
    }

    pub fn ether_type(&self) -> EtherType {
        let (start, end) = ETHER_TYPE_RANGE;
        EtherType::from(u16::from_be_bytes(
            self.buffer.as_ref()[start..end].try_into().unwrap(),
        ))
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer.as_ref()[ETHERNET_HEADER_LEN..]
    }
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> EthernetFrame<T> {
    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        let (start, end) = DEST_MAC_RANGE;
        self.buffer.as_mut()[start..end].copy_from_slice(&mac.bytes);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        let (start, end) = SRC_MAC_RANGE;
        self.buffer.as_mut()[start..end].copy_from_slice(&mac.bytes);
    }

    pub fn set_ether_type(&mut self, ether_type: EtherType) {
        let (start, end) = ETHER_TYPE_RANGE;
        self.buffer.as_mut()[start..end].copy_from_slice(&u16::from(ether_type).to_be_bytes());
    }

    pub fn payload_mut(&mut self) -> &mut [u8] {
        &mut self.buffer.as_mut()[ETHERNET_HEADER_LEN..]
    }
}

/// Frames are equal when their bytes are.
impl<T: AsRef<[u8]>> PartialEq for EthernetFrame<T> {
    fn eq(&self, other: &Self) -> bool {
        self.buffer.as_ref() == other.buffer.as_ref()
    }
}

impl<T: AsRef<[u8]>> Eq for EthernetFrame<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[rustfmt::skip]
    const ARP_REQUEST: [u8; 42] = [
        // Ethernet header
        0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
        0xde, 0xad, 0xbe, 0xef, 0xff, 0xff,
        0x08, 0x06,
        // ARP payload
        0x00, 0x01, 0x08, 0x00, 0x06, 0x04, 0x00, 0x01,
        0xde, 0xad, 0xbe, 0xef, 0xff, 0xff, 0x0a, 0x00, 0x00, 0x01,
        0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x02,
    ];

    #[test]
    fn ethernet_frame() {
        let frame = EthernetFrame::new_checked(&ARP_REQUEST[..]).unwrap();

        assert_eq!(frame.dest_mac(), MacAddr::BROADCAST);
        assert_eq!(
            frame.src_mac(),
            MacAddr::new([0xde, 0xad, 0xbe, 0xef, 0xff, 0xff])
        );
        assert_eq!(frame.ether_type(), EtherType::Arp);
        assert_eq!(frame.payload().len(), 28);
        assert_eq!(frame.payload()[..2], [0x00, 0x01]);
    }

    #[test]
    fn too_short() {
        assert!(EthernetFrame::new_checked(&ARP_REQUEST[..13]).is_err());
        assert!(EthernetFrame::new_checked(&ARP_REQUEST[..14]).is_ok());
    }

    #[test]
    fn set_header() {
        let mut data = [0u8; 20];
        let mut frame = EthernetFrame::new_checked(&mut data[..]).unwrap();
        let src = MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
        frame.set_dest_mac(MacAddr::BROADCAST);
        frame.set_src_mac(src);
        frame.set_ether_type(EtherType::Ipv4);
        frame.payload_mut().copy_from_slice(&[1, 2, 3, 4, 5, 6]);

        assert_eq!(frame.dest_mac(), MacAddr::BROADCAST);
        assert_eq!(frame.src_mac(), src);
        assert_eq!(frame.ether_type(), EtherType::Ipv4);
        assert_eq!(data[12..14], [0x08, 0x00]);
        assert_eq!(data[14..], [1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn unknown_ether_type() {
        let mut data = ARP_REQUEST;
        data[12..14].copy_from_slice(&[0x86, 0xdd]);
        let frame = EthernetFrame::new_checked(&data[..]).unwrap();
        assert_eq!(frame.ether_type(), EtherType::Unknown(0x86dd));
    }
}
