//! Gatehouse routing resources.
//!
//! These types express gateway, route, and reference-grant configuration as
//! plain data structures: which listeners a gateway exposes, which routes want
//! to attach to them, and which cross-namespace references are allowed. The
//! `kube` feature of this crate converts the upstream Kubernetes Gateway API
//! objects into these types.
//!
//! Use this crate directly if you're building or inspecting configuration. Use
//! the `gatehouse-core` crate to resolve which routes bind to which listeners
//! and to turn proxy configuration snapshots into static bootstrap documents.

#[cfg(feature = "kube")]
mod error;

#[cfg(feature = "kube")]
pub use error::Error;

pub mod gateway;
pub mod grant;
pub mod objects;
pub mod route;

mod shared;
pub use shared::{
    GroupKind, LabelSelector, LabelSelectorRequirement, SelectorOperator, GATEWAY_API_GROUP,
    GATEWAY_KIND, HTTP_ROUTE_KIND, SECRET_KIND, SERVICE_KIND, TCP_ROUTE_KIND, UDP_ROUTE_KIND,
};

#[cfg(feature = "kube")]
pub mod kube;

/// The fully qualified domain name of a network host, or a wildcard pattern
/// that begins with `*.` and matches any single leading DNS label.
pub type Hostname = String;

/// Defines a network port.
pub type PortNumber = u16;
