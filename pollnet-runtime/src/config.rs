use crate::error::{Result, StackError};
use pollnet_packets::{MacAddr, ETHERNET_MTU, IPV4_DEFAULT_TTL, IPV4_HEADER_LEN};
use std::net::Ipv4Addr;
use std::time::Duration;

/// Smallest MTU every IPv4 host must accept (RFC 791).
pub const MIN_MTU: usize = 68;

///
/// Settings for one `NetStack`. Start from `StackConfig::new` or `Default`
/// and adjust with the builder methods:
///
/// ```
/// use pollnet_packets::MacAddr;
/// use pollnet_runtime::config::StackConfig;
/// use std::time::Duration;
///
/// let config = StackConfig::new("10.0.0.2".parse().unwrap(), MacAddr::new([2, 0, 0, 0, 0, 2]))
///     .mtu(1400)
///     .arp_timeout(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
///
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StackConfig {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub mtu: usize,
    /// How long a learned IP to MAC mapping stays usable.
    pub arp_timeout: Duration,
    /// Most addresses the ARP cache holds at once.
    pub arp_cache_limit: usize,
    /// How long a destination waits for a reply before another ARP request
    /// may be sent for it. Packets still queued at that point are dropped.
    pub arp_min_interval: Duration,
    /// Packets held per unresolved destination.
    pub arp_pending_limit: usize,
    pub ip_ttl: u8,
    pub udp_port_limit: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        StackConfig {
            ip: Ipv4Addr::new(192, 0, 2, 1),
            mac: MacAddr::new([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
            mtu: ETHERNET_MTU,
            arp_timeout: Duration::from_secs(60),
            arp_cache_limit: 256,
            arp_min_interval: Duration::from_secs(1),
            arp_pending_limit: 16,
            ip_ttl: IPV4_DEFAULT_TTL,
            udp_port_limit: 16,
        }
    }
}

impl StackConfig {
    pub fn new(ip: Ipv4Addr, mac: MacAddr) -> Self {
        StackConfig {
            ip,
            mac,
            ..StackConfig::default()
        }
    }

    pub fn ip(mut self, ip: Ipv4Addr) -> Self {
        self.ip = ip;
        self
    }

    pub fn mac(mut self, mac: MacAddr) -> Self {
        self.mac = mac;
        self
    }

    pub fn mtu(mut self, mtu: usize) -> Self {
        self.mtu = mtu;
        self
    }

    pub fn arp_timeout(mut self, timeout: Duration) -> Self {
        self.arp_timeout = timeout;
        self
    }

    pub fn arp_cache_limit(mut self, limit: usize) -> Self {
        self.arp_cache_limit = limit;
        self
    }

    pub fn arp_min_interval(mut self, interval: Duration) -> Self {
        self.arp_min_interval = interval;
        self
    }

    pub fn arp_pending_limit(mut self, limit: usize) -> Self {
        self.arp_pending_limit = limit;
        self
    }

    pub fn ip_ttl(mut self, ttl: u8) -> Self {
        self.ip_ttl = ttl;
        self
    }

    pub fn udp_port_limit(mut self, limit: usize) -> Self {
        self.udp_port_limit = limit;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.mtu < MIN_MTU || self.mtu > usize::from(u16::MAX) {
            return Err(StackError::InvalidConfig("MTU must be between 68 and 65535"));
        }
        if self.mac.is_broadcast() {
            return Err(StackError::InvalidConfig(
                "interface MAC must not be the broadcast address",
            ));
        }
        if self.ip_ttl == 0 {
            return Err(StackError::InvalidConfig("IP TTL must be non-zero"));
        }
        if self.arp_cache_limit == 0 {
            return Err(StackError::InvalidConfig(
                "ARP cache limit must allow at least one entry",
            ));
        }
        if self.arp_pending_limit == 0 {
            return Err(StackError::InvalidConfig(
                "ARP pending limit must allow at least one packet",
            ));
        }
        Ok(())
    }

    pub fn interface(&self) -> InterfaceContext {
        InterfaceContext {
            ip: self.ip,
            mac: self.mac,
            mtu: self.mtu,
        }
    }
}

/// The identity of the single interface the stack owns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterfaceContext {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub mtu: usize,
}

impl InterfaceContext {
    /// Largest IP payload sent without fragmenting.
    pub fn max_ip_payload(&self) -> usize {
        self.mtu - IPV4_HEADER_LEN
    }

    /// Payload carried by each fragment but the last. Fragment offsets count
    /// 8 byte units, so this is rounded down to a multiple of 8.
    pub fn fragment_payload(&self) -> usize {
        self.max_ip_payload() & !7
    }
}
