//! The protocol layers of a single-interface host.
//!
//! A `NetStack` owns everything the layers share: the interface identity, the driver, the ARP
//! cache and pending queue, the UDP port table and the IP identification counter. Each layer is
//! an `impl` block in its own file. Inbound frames enter through `poll` or `frame_in` and travel
//! up; outbound data enters through `udp_send`, `udp_out` or `ip_out` and travels down. Every
//! call runs to completion on `&mut self`, nothing blocks.

use crate::classifier::{EtherTypeClassifier, IpProtocolClassifier};
use crate::clock::{Clock, SystemClock};
use crate::config::{InterfaceContext, StackConfig};
use crate::driver::Driver;
use crate::error::Result;
use crate::state::TimedTable;
use pollnet_packets::{MacAddr, PacketBuffer, ETHERNET_HEADER_LEN};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::time::Instant;
use tracing::{debug, info, warn};

mod arp;
pub use self::arp::*;

mod ethernet;

mod icmp;

mod ip;

mod udp;
pub use self::udp::*;

pub struct NetStack<D: Driver, C: Clock = SystemClock> {
    iface: InterfaceContext,
    config: StackConfig,
    driver: D,
    clock: C,
    ether_classifier: EtherTypeClassifier,
    ip_classifier: IpProtocolClassifier,
    arp_cache: TimedTable<Ipv4Addr, MacAddr>,
    arp_pending: TimedTable<Ipv4Addr, VecDeque<PacketBuffer>>,
    udp_ports: TimedTable<u16, Box<dyn DatagramHandler>>,
    ip_id: u16,
    rx_slot: PacketBuffer,
    last_sweep: Instant,
}

impl<D: Driver> NetStack<D, SystemClock> {
    pub fn new(config: StackConfig, driver: D) -> Result<Self> {
        NetStack::with_clock(config, driver, SystemClock)
    }
}

impl<D: Driver, C: Clock> NetStack<D, C> {
    /// Builds the stack and announces the interface address with a
    /// gratuitous ARP request.
    pub fn with_clock(config: StackConfig, driver: D, clock: C) -> Result<Self> {
        config.validate()?;
        let iface = config.interface();
        let last_sweep = clock.now();
        let mut stack = NetStack {
            iface,
            driver,
            clock,
            ether_classifier: EtherTypeClassifier::new(),
            ip_classifier: IpProtocolClassifier::new(),
            arp_cache: TimedTable::new(Some(config.arp_timeout))
                .with_capacity(config.arp_cache_limit),
            arp_pending: TimedTable::new(Some(config.arp_min_interval)),
            udp_ports: TimedTable::new(None).with_capacity(config.udp_port_limit),
            ip_id: 0,
            rx_slot: PacketBuffer::with_capacity(ETHERNET_HEADER_LEN + iface.mtu),
            last_sweep,
            config,
        };
        info!(ip = %iface.ip, mac = %iface.mac, mtu = iface.mtu, "interface up");
        stack.announce();
        Ok(stack)
    }

    pub fn interface(&self) -> &InterfaceContext {
        &self.iface
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Asks the driver for one frame and processes it. Returns whether a
    /// frame was there. Expired ARP state is swept at most once every
    /// `arp_min_interval`, busy link or not.
    pub fn poll(&mut self) -> bool {
        let mut slot = std::mem::take(&mut self.rx_slot);
        let processed = match self.driver.recv(&mut slot) {
            Ok(0) => false,
            Ok(_) => {
                self.frame_in(&mut slot);
                true
            }
            Err(e) => {
                warn!(error = %e, "driver receive failed");
                false
            }
        };
        self.rx_slot = slot;
        let now = self.clock.now();
        if now.saturating_duration_since(self.last_sweep) >= self.config.arp_min_interval {
            self.expire(now);
        }
        processed
    }

    /// Polls until the driver has nothing left or `limit` frames were
    /// processed. Returns the number processed.
    pub fn poll_burst(&mut self, limit: usize) -> usize {
        let mut processed = 0;
        while processed < limit && self.poll() {
            processed += 1;
        }
        processed
    }

    fn expire(&mut self, now: Instant) {
        self.last_sweep = now;
        self.arp_cache.purge_expired(now);
        for (ip, queue) in self.arp_pending.drain_expired(now) {
            debug!(%ip, dropped = queue.len(), "ARP resolution timed out");
        }
    }
}
