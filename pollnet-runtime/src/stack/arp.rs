//! Address resolution as described in RFC 826
//! https://tools.ietf.org/html/rfc826
//!
//! Each destination is in one of three states, driven purely by the two tables:
//!
//! - Unknown: no cache entry, no pending entry. `arp_out` queues the packet and broadcasts a
//!   request.
//! - Pending: a pending entry exists. More packets join its queue, and no request is sent until
//!   the entry expires after `arp_min_interval`.
//! - Resolved: a cache entry exists. Packets go straight to the link.

use crate::clock::Clock;
use crate::driver::Driver;
use crate::stack::NetStack;
use pollnet_packets::{
    ArpOp, ArpPacket, EtherType, MacAddr, PacketBuffer, ARP_PACKET_LEN,
};
use std::collections::VecDeque;
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// A resolved address as reported by `NetStack::arp_entries`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpEntry {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    /// Time since the mapping was last learned or refreshed.
    pub age: Duration,
}

impl<D: Driver, C: Clock> NetStack<D, C> {
    /// Handles a received ARP packet. `src_mac` is the Ethernet source of the
    /// frame it came in.
    pub fn arp_in(&mut self, buf: &mut PacketBuffer, src_mac: MacAddr) {
        let (op, sender_mac, sender_ip, target_ip) = {
            let packet = match ArpPacket::new_checked(buf.as_slice()) {
                Ok(packet) => packet,
                Err(reason) => {
                    trace!(reason, %src_mac, "dropping ARP packet");
                    return;
                }
            };
            if !packet.is_ethernet_ipv4() {
                trace!(%src_mac, "dropping ARP packet for an unsupported address profile");
                return;
            }
            let op = match ArpOp::try_from(packet.opcode()) {
                Ok(op) => op,
                Err(reason) => {
                    trace!(reason, %src_mac, "dropping ARP packet");
                    return;
                }
            };
            (
                op,
                packet.sender_hardware_addr(),
                packet.sender_protocol_addr(),
                packet.target_protocol_addr(),
            )
        };

        let now = self.clock.now();
        match self.arp_cache.insert(sender_ip, sender_mac, now) {
            Ok(None) => debug!(ip = %sender_ip, mac = %sender_mac, "learned ARP mapping"),
            Ok(Some(old)) if old != sender_mac => {
                debug!(ip = %sender_ip, old = %old, mac = %sender_mac, "ARP mapping changed")
            }
            Ok(Some(_)) => trace!(ip = %sender_ip, "refreshed ARP mapping"),
            Err(e) => warn!(error = %e, ip = %sender_ip, "could not cache ARP mapping"),
        }

        if self.arp_pending.contains(&sender_ip, now) {
            if let Some(queue) = self.arp_pending.remove(&sender_ip) {
                debug!(ip = %sender_ip, packets = queue.len(), "flushing packets awaiting ARP");
                for packet in queue {
                    self.frame_out(packet, sender_mac, EtherType::Ipv4);
                }
            }
        } else if op == ArpOp::Request && target_ip == self.iface.ip {
            self.arp_reply(sender_ip, sender_mac);
        }
    }

    /// Sends an IPv4 packet to `ip` on the local segment, resolving its
    /// hardware address first if needed. The packet is owned from here on:
    /// it goes out now, waits in the pending queue, or is dropped.
    pub fn arp_out(&mut self, buf: PacketBuffer, ip: Ipv4Addr) {
        let now = self.clock.now();
        if let Some(mac) = self.arp_cache.get(&ip, now).copied() {
            self.frame_out(buf, mac, EtherType::Ipv4);
            return;
        }

        let limit = self.config.arp_pending_limit;
        if let Some(queue) = self.arp_pending.get_mut(&ip, now) {
            if queue.len() < limit {
                queue.push_back(buf);
                trace!(%ip, queued = queue.len(), "queued packet awaiting ARP");
            } else {
                warn!(%ip, limit, "ARP pending queue full, dropping packet");
            }
            return;
        }

        let mut queue = VecDeque::with_capacity(1);
        queue.push_back(buf);
        if let Err(e) = self.arp_pending.insert(ip, queue, now) {
            warn!(error = %e, %ip, "could not queue packet for ARP");
            return;
        }
        self.arp_request(ip);
    }

    /// Broadcasts a request for the hardware address of `target_ip`.
    pub fn arp_request(&mut self, target_ip: Ipv4Addr) {
        let buf = self.arp_packet(ArpOp::Request, target_ip, MacAddr::default());
        trace!(%target_ip, "sending ARP request");
        self.frame_out(buf, MacAddr::BROADCAST, EtherType::Arp);
    }

    /// Tells `target_mac` that the interface address lives here.
    pub fn arp_reply(&mut self, target_ip: Ipv4Addr, target_mac: MacAddr) {
        let buf = self.arp_packet(ArpOp::Reply, target_ip, target_mac);
        trace!(%target_ip, %target_mac, "sending ARP reply");
        self.frame_out(buf, target_mac, EtherType::Arp);
    }

    /// Gratuitous ARP: a broadcast request for the interface's own address,
    /// so neighbours learn (or update) its mapping.
    pub fn announce(&mut self) {
        info!(ip = %self.iface.ip, mac = %self.iface.mac, "announcing interface address");
        self.arp_request(self.iface.ip);
    }

    /// The cached hardware address for `ip`, if it is still fresh.
    pub fn arp_lookup(&mut self, ip: Ipv4Addr) -> Option<MacAddr> {
        let now = self.clock.now();
        self.arp_cache.get(&ip, now).copied()
    }

    /// Live cache entries, sorted by address.
    pub fn arp_entries(&self) -> Vec<ArpEntry> {
        let mut entries: Vec<ArpEntry> = self
            .arp_cache
            .iter(self.clock.now())
            .map(|entry| ArpEntry {
                ip: *entry.key,
                mac: *entry.value,
                age: entry.age,
            })
            .collect();
        entries.sort_by_key(|entry| entry.ip);
        entries
    }

    /// Number of destinations currently waiting on a reply.
    pub fn arp_pending_len(&self) -> usize {
        self.arp_pending.iter(self.clock.now()).count()
    }

    pub fn log_arp_table(&self) {
        let entries = self.arp_entries();
        debug!(entries = entries.len(), "ARP table");
        for entry in entries {
            debug!(ip = %entry.ip, mac = %entry.mac, age = ?entry.age, "ARP entry");
        }
    }

    fn arp_packet(&self, op: ArpOp, target_ip: Ipv4Addr, target_mac: MacAddr) -> PacketBuffer {
        let mut buf = PacketBuffer::new(ARP_PACKET_LEN);
        let mut packet = ArpPacket::new_unchecked(buf.as_mut_slice());
        packet.init_ethernet_ipv4();
        packet.set_opcode(op);
        packet.set_sender_hardware_addr(self.iface.mac);
        packet.set_sender_protocol_addr(self.iface.ip);
        packet.set_target_hardware_addr(target_mac);
        packet.set_target_protocol_addr(target_ip);
        buf
    }
}

#[cfg(test)]
mod tests {
    use crate::utils::test::harness::*;
    use crate::utils::test::packet_generators::*;
    use pollnet_packets::*;
    use std::convert::TryFrom;
    use std::net::Ipv4Addr;
    use std::time::Duration;

    #[test]
    fn announce_on_startup() {
        let harness = TestHarness::new();
        let frame = EthernetFrame::new_checked(&harness.announcement[..]).unwrap();
        assert_eq!(frame.dest_mac(), MacAddr::BROADCAST);
        assert_eq!(frame.ether_type(), EtherType::Arp);

        let arp = ArpPacket::new_checked(frame.payload()).unwrap();
        assert_eq!(ArpOp::try_from(arp.opcode()), Ok(ArpOp::Request));
        assert_eq!(arp.sender_protocol_addr(), LOCAL_IP);
        assert_eq!(arp.target_protocol_addr(), LOCAL_IP);
        assert_eq!(arp.sender_hardware_addr(), LOCAL_MAC);
    }

    #[test]
    fn reply_to_request_for_local_ip() {
        let mut harness = TestHarness::new();
        harness.deliver(arp_request_frame(PEER_MAC, PEER_IP, LOCAL_IP));

        let sent = harness.sent();
        assert_eq!(sent.len(), 1);
        let frame = EthernetFrame::new_checked(&sent[0][..]).unwrap();
        assert_eq!(frame.dest_mac(), PEER_MAC);

        let arp = ArpPacket::new_checked(frame.payload()).unwrap();
        assert_eq!(ArpOp::try_from(arp.opcode()), Ok(ArpOp::Reply));
        assert_eq!(arp.sender_hardware_addr(), LOCAL_MAC);
        assert_eq!(arp.sender_protocol_addr(), LOCAL_IP);
        assert_eq!(arp.target_hardware_addr(), PEER_MAC);
        assert_eq!(arp.target_protocol_addr(), PEER_IP);

        // The requester was learned on the way
        assert_eq!(harness.stack.arp_lookup(PEER_IP), Some(PEER_MAC));
    }

    #[test]
    fn ignore_request_for_other_ip() {
        let mut harness = TestHarness::new();
        harness.deliver(arp_request_frame(
            PEER_MAC,
            PEER_IP,
            Ipv4Addr::new(192, 0, 2, 99),
        ));
        assert!(harness.sent().is_empty());
        assert_eq!(harness.stack.arp_lookup(PEER_IP), Some(PEER_MAC));
    }

    #[test]
    fn drop_unsupported_profiles() {
        let mut harness = TestHarness::new();

        let mut frame = arp_request_frame(PEER_MAC, PEER_IP, LOCAL_IP);
        // Protocol length 16
        frame[ETHERNET_HEADER_LEN + 5] = 16;
        harness.deliver(frame);

        let mut frame = arp_request_frame(PEER_MAC, PEER_IP, LOCAL_IP);
        // Opcode 3
        frame[ETHERNET_HEADER_LEN + 7] = 3;
        harness.deliver(frame);

        let frame = arp_request_frame(PEER_MAC, PEER_IP, LOCAL_IP);
        harness.deliver(frame[..ETHERNET_HEADER_LEN + 27].to_vec());

        assert!(harness.sent().is_empty());
        assert!(harness.stack.arp_entries().is_empty());
    }

    #[test]
    fn cache_entries_expire() {
        let mut harness = TestHarness::new();
        harness.deliver(arp_reply_frame(PEER_MAC, PEER_IP, LOCAL_MAC, LOCAL_IP));

        harness.advance(Duration::from_secs(59));
        assert_eq!(harness.stack.arp_lookup(PEER_IP), Some(PEER_MAC));
        let entries = harness.stack.arp_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].age, Duration::from_secs(59));

        harness.advance(Duration::from_secs(2));
        assert_eq!(harness.stack.arp_lookup(PEER_IP), None);
        assert!(harness.stack.arp_entries().is_empty());
    }

    #[test]
    fn pending_queue_is_bounded() {
        let mut harness = TestHarness::with_config(test_config().arp_pending_limit(2));
        for _ in 0..3 {
            harness
                .stack
                .arp_out(PacketBuffer::from_payload(&[0x45; 20]), PEER_IP);
        }
        // Only the first call asked
        assert_eq!(harness.sent().len(), 1);

        harness.deliver(arp_reply_frame(PEER_MAC, PEER_IP, LOCAL_MAC, LOCAL_IP));
        assert_eq!(harness.sent().len(), 2);
        assert_eq!(harness.stack.arp_pending_len(), 0);
    }

    #[test]
    fn pending_entry_expires_and_allows_new_request() {
        let mut harness = TestHarness::new();
        harness
            .stack
            .arp_out(PacketBuffer::from_payload(&[0x45; 20]), PEER_IP);
        assert_eq!(harness.sent().len(), 1);
        assert_eq!(harness.stack.arp_pending_len(), 1);

        harness.advance(Duration::from_millis(1500));
        // The next poll sweeps the abandoned packet
        assert!(!harness.stack.poll());
        assert_eq!(harness.stack.arp_pending_len(), 0);

        // A late reply has nothing to flush
        harness.deliver(arp_reply_frame(PEER_MAC, PEER_IP, LOCAL_MAC, LOCAL_IP));
        assert!(harness.sent().is_empty());

        // And now the destination resolves straight away
        harness
            .stack
            .arp_out(PacketBuffer::from_payload(&[0x45; 20]), PEER_IP);
        let sent = harness.sent();
        assert_eq!(sent.len(), 1);
        let frame = EthernetFrame::new_checked(&sent[0][..]).unwrap();
        assert_eq!(frame.ether_type(), EtherType::Ipv4);
        assert_eq!(frame.dest_mac(), PEER_MAC);
    }

    #[test]
    fn busy_link_still_sweeps_expired_state() {
        let mut harness = TestHarness::resolved();
        harness.deliver(arp_reply_frame(
            MacAddr::new([0xcc; 6]),
            Ipv4Addr::new(192, 0, 2, 50),
            LOCAL_MAC,
            LOCAL_IP,
        ));
        for host in 0..200u8 {
            harness.stack.arp_out(
                PacketBuffer::from_payload(&[0x45; 1400]),
                Ipv4Addr::new(10, 0, 0, host),
            );
        }
        assert_eq!(harness.sent().len(), 200);
        assert_eq!(harness.stack.arp_pending.len(), 200);

        harness.advance(Duration::from_secs(61));
        // Every poll finds a frame; the peer keeps refreshing its own entry
        for _ in 0..100 {
            harness.deliver(arp_request_frame(PEER_MAC, PEER_IP, Ipv4Addr::new(192, 0, 2, 99)));
        }

        assert_eq!(harness.stack.arp_pending.len(), 0);
        assert_eq!(harness.stack.arp_cache.len(), 1);
        assert_eq!(harness.stack.arp_lookup(PEER_IP), Some(PEER_MAC));
        assert!(harness.sent().is_empty());
    }

    #[test]
    fn cache_is_bounded() {
        let mut harness = TestHarness::with_config(test_config().arp_cache_limit(2));
        for host in 10..13u8 {
            harness.deliver(arp_reply_frame(
                MacAddr::new([host; 6]),
                Ipv4Addr::new(192, 0, 2, host),
                LOCAL_MAC,
                LOCAL_IP,
            ));
        }
        let entries = harness.stack.arp_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(harness.stack.arp_lookup(Ipv4Addr::new(192, 0, 2, 12)), None);

        // Known addresses still refresh
        harness.deliver(arp_reply_frame(
            MacAddr::new([10; 6]),
            Ipv4Addr::new(192, 0, 2, 10),
            LOCAL_MAC,
            LOCAL_IP,
        ));
        assert_eq!(harness.stack.arp_entries().len(), 2);

        // Expired entries make room
        harness.advance(Duration::from_secs(61));
        harness.deliver(arp_reply_frame(PEER_MAC, PEER_IP, LOCAL_MAC, LOCAL_IP));
        assert_eq!(harness.stack.arp_lookup(PEER_IP), Some(PEER_MAC));
    }
}
