//! Ordered set of collectors built from feature flags.

use std::sync::Arc;

use strum_macros::{AsRefStr, Display, EnumString};

use crate::collector::{
    BgpCollector, CapsmanCollector, Collector, ConntrackCollector, DhcpCollector,
    DhcpLeaseCollector, Dhcpv6Collector, FirmwareCollector, HealthCollector, InterfaceCollector,
    IpsecCollector, LteCollector, MonitorCollector, NetwatchCollector, OpticsCollector,
    PoeCollector, PoolCollector, ResourceCollector, RoutesCollector, W60gCollector,
    WlanStationCollector,
};
use crate::metrics::MetricDescriptor;

/// A collector that can be switched on per module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum Feature {
    Resource,
    Interface,
    Bgp,
    Conntrack,
    Dhcp,
    Dhcpl,
    Dhcpv6,
    Firmware,
    Health,
    Routes,
    Poe,
    Pools,
    Optics,
    W60g,
    Wlansta,
    Capsman,
    Monitor,
    Ipsec,
    Lte,
    Netwatch,
}

impl Feature {
    /// Every feature in registry order.
    pub const ALL: [Feature; 20] = [
        Self::Resource,
        Self::Interface,
        Self::Bgp,
        Self::Conntrack,
        Self::Dhcp,
        Self::Dhcpl,
        Self::Dhcpv6,
        Self::Firmware,
        Self::Health,
        Self::Routes,
        Self::Poe,
        Self::Pools,
        Self::Optics,
        Self::W60g,
        Self::Wlansta,
        Self::Capsman,
        Self::Monitor,
        Self::Ipsec,
        Self::Lte,
        Self::Netwatch,
    ];

    fn build(self) -> Arc<dyn Collector> {
        match self {
            Self::Resource => Arc::new(ResourceCollector::new()),
            Self::Interface => Arc::new(InterfaceCollector::new()),
            Self::Bgp => Arc::new(BgpCollector::new()),
            Self::Conntrack => Arc::new(ConntrackCollector::new()),
            Self::Dhcp => Arc::new(DhcpCollector::new()),
            Self::Dhcpl => Arc::new(DhcpLeaseCollector::new()),
            Self::Dhcpv6 => Arc::new(Dhcpv6Collector::new()),
            Self::Firmware => Arc::new(FirmwareCollector::new()),
            Self::Health => Arc::new(HealthCollector::new()),
            Self::Routes => Arc::new(RoutesCollector::new()),
            Self::Poe => Arc::new(PoeCollector::new()),
            Self::Pools => Arc::new(PoolCollector::new()),
            Self::Optics => Arc::new(OpticsCollector::new()),
            Self::W60g => Arc::new(W60gCollector::new()),
            Self::Wlansta => Arc::new(WlanStationCollector::new()),
            Self::Capsman => Arc::new(CapsmanCollector::new()),
            Self::Monitor => Arc::new(MonitorCollector::new()),
            Self::Ipsec => Arc::new(IpsecCollector::new()),
            Self::Lte => Arc::new(LteCollector::new()),
            Self::Netwatch => Arc::new(NetwatchCollector::new()),
        }
    }
}

/// Collectors run, in order, against each device session.
///
/// Built once per module and never modified afterwards.
#[derive(Clone, Default)]
pub struct CollectorRegistry {
    collectors: Vec<Arc<dyn Collector>>,
}

impl std::fmt::Debug for CollectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectorRegistry")
            .field("collectors", &self.names())
            .finish()
    }
}

impl CollectorRegistry {
    /// Registry running `collectors` in the given order.
    pub fn new(collectors: Vec<Arc<dyn Collector>>) -> Self {
        Self { collectors }
    }

    /// One collector per enabled feature, in [`Feature::ALL`] order.
    pub fn from_features(enabled: &[Feature]) -> Self {
        let collectors = Feature::ALL
            .iter()
            .filter(|f| enabled.contains(f))
            .map(|f| f.build())
            .collect();
        Self { collectors }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Collector>> {
        self.collectors.iter()
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.collectors.iter().map(|c| c.name()).collect()
    }

    /// Descriptors of every collector, in registry order.
    pub fn describe(&self) -> Vec<Arc<MetricDescriptor>> {
        self.collectors.iter().flat_map(|c| c.describe()).collect()
    }
}
