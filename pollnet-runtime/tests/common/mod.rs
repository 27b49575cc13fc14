//! Shared setup for the integration tests: a stack on an in-memory link and
//! builders for the frames its peer sends.

#![allow(dead_code)]

use pollnet_packets::*;
use pollnet_runtime::clock::ManualClock;
use pollnet_runtime::config::StackConfig;
use pollnet_runtime::driver::{channel_link, ChannelDriver, ChannelPeer};
use pollnet_runtime::NetStack;
use std::net::Ipv4Addr;
use std::sync::Once;

pub const HOST_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 1);
pub const HOST_MAC: MacAddr = MacAddr::new([0xaa; 6]);
pub const PEER_IP: Ipv4Addr = Ipv4Addr::new(192, 0, 2, 2);
pub const PEER_MAC: MacAddr = MacAddr::new([0xbb; 6]);

static TRACING: Once = Once::new();

/// Sends stack events to the test output. Set RUST_LOG=pollnet_runtime=trace
/// to see every dropped frame.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "pollnet_runtime=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn host_config() -> StackConfig {
    StackConfig::new(HOST_IP, HOST_MAC)
}

pub struct Host {
    pub stack: NetStack<ChannelDriver, ManualClock>,
    pub link: ChannelPeer,
    pub clock: ManualClock,
}

impl Host {
    /// Brings up a stack and discards its startup announcement.
    pub fn new(config: StackConfig) -> Host {
        init_tracing();
        let (driver, link) = channel_link();
        let clock = ManualClock::new();
        let stack = NetStack::with_clock(config, driver, clock.clone()).unwrap();
        assert_eq!(link.sent().len(), 1);
        Host { stack, link, clock }
    }

    pub fn receive(&mut self, frame: Vec<u8>) {
        self.link.inject(frame).unwrap();
        self.stack.poll_burst(16);
    }

    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.link.sent()
    }
}

pub fn frame(src: MacAddr, dst: MacAddr, ether_type: EtherType, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; ETHERNET_HEADER_LEN + payload.len()];
    let mut frame = EthernetFrame::new_unchecked(&mut bytes[..]);
    frame.set_dest_mac(dst);
    frame.set_src_mac(src);
    frame.set_ether_type(ether_type);
    frame.payload_mut().copy_from_slice(payload);
    bytes
}

pub fn arp_reply(from_mac: MacAddr, from_ip: Ipv4Addr, to_mac: MacAddr, to_ip: Ipv4Addr) -> Vec<u8> {
    let mut payload = vec![0u8; ARP_PACKET_LEN];
    let mut arp = ArpPacket::new_unchecked(&mut payload[..]);
    arp.init_ethernet_ipv4();
    arp.set_opcode(ArpOp::Reply);
    arp.set_sender_hardware_addr(from_mac);
    arp.set_sender_protocol_addr(from_ip);
    arp.set_target_hardware_addr(to_mac);
    arp.set_target_protocol_addr(to_ip);
    frame(from_mac, to_mac, EtherType::Arp, &payload)
}

pub fn datagram(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, protocol: IpProtocol, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; IPV4_HEADER_LEN + payload.len()];
    let mut packet = Ipv4Packet::new_unchecked(&mut bytes[..]);
    packet.set_header_len(IPV4_HEADER_LEN);
    packet.set_total_len(bytes_len(IPV4_HEADER_LEN, payload));
    packet.set_ttl(IPV4_DEFAULT_TTL);
    packet.set_protocol(protocol);
    packet.set_src_addr(src_ip);
    packet.set_dest_addr(dst_ip);
    packet.payload_mut().copy_from_slice(payload);
    packet.fill_checksum();
    bytes
}

pub fn udp(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; UDP_HEADER_LEN + payload.len()];
    let mut segment = UdpSegment::new_unchecked(&mut bytes[..]);
    segment.set_src_port(src_port);
    segment.set_dest_port(dst_port);
    segment.set_length(bytes_len(UDP_HEADER_LEN, payload));
    segment.payload_mut().copy_from_slice(payload);
    segment.fill_checksum(src_ip, dst_ip);
    datagram(src_ip, dst_ip, IpProtocol::UDP, &bytes)
}

pub fn echo_request(src_ip: Ipv4Addr, dst_ip: Ipv4Addr, ident: u16, seq_no: u16, data: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0u8; ICMP_HEADER_LEN + data.len()];
    let mut icmp = IcmpPacket::new_unchecked(&mut bytes[..]);
    icmp.set_icmp_type(IcmpType::EchoRequest);
    icmp.set_echo_ident(ident);
    icmp.set_echo_seq_no(seq_no);
    icmp.data_mut().copy_from_slice(data);
    icmp.fill_checksum();
    datagram(src_ip, dst_ip, IpProtocol::ICMP, &bytes)
}

/// The IPv4 datagram inside an Ethernet frame.
pub fn ip_of(frame: &[u8]) -> Ipv4Packet<&[u8]> {
    Ipv4Packet::new_checked(&frame[ETHERNET_HEADER_LEN..]).unwrap()
}

fn bytes_len(header_len: usize, payload: &[u8]) -> u16 {
    (header_len + payload.len()) as u16
}
