//! Collector Layer
//!
//! Collectors translate one category of device state into observations.
//! Each one issues its queries through a [`ScrapeContext`] and normalizes
//! the returned rows with the rules in [`crate::normalize`].
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait; `describe()` plus async `collect()`
//! - [`ScrapeContext`]: Session, sink and device identity for one scrape
//! - [`CollectorRegistry`]: Ordered collectors built from [`Feature`] flags
//!
//! # Example
//!
//! ```rust
//! use mikrotik_exporter::collector::{CollectorRegistry, Feature};
//!
//! let registry = CollectorRegistry::from_features(&[Feature::Resource, Feature::Interface]);
//! assert_eq!(registry.names(), vec!["resource", "interface"]);
//! ```

mod context;
mod registry;
mod table;
mod traits;

mod bgp;
mod capsman;
mod conntrack;
mod dhcp;
mod dhcp_lease;
mod dhcpv6;
mod firmware;
mod health;
mod interface;
mod ipsec;
mod lte;
mod monitor;
mod netwatch;
mod optics;
mod poe;
mod pools;
mod resource;
mod routes;
mod w60g;
mod wlansta;

pub use context::ScrapeContext;
pub use registry::{CollectorRegistry, Feature};
pub use traits::{Collector, CollectorError};

pub use bgp::BgpCollector;
pub use capsman::CapsmanCollector;
pub use conntrack::ConntrackCollector;
pub use dhcp::DhcpCollector;
pub use dhcp_lease::DhcpLeaseCollector;
pub use dhcpv6::Dhcpv6Collector;
pub use firmware::FirmwareCollector;
pub use health::HealthCollector;
pub use interface::InterfaceCollector;
pub use ipsec::IpsecCollector;
pub use lte::LteCollector;
pub use monitor::MonitorCollector;
pub use netwatch::NetwatchCollector;
pub use optics::OpticsCollector;
pub use poe::PoeCollector;
pub use pools::PoolCollector;
pub use resource::ResourceCollector;
pub use routes::RoutesCollector;
pub use w60g::W60gCollector;
pub use wlansta::WlanStationCollector;
