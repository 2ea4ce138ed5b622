//! The gatehouse control plane core.
//!
//! Two synchronous components, composed around the routing resources in
//! `gatehouse-api` and the xDS resources a proxy consumes:
//!
//! * a [Resolver] that computes, per gateway listener, the routes permitted
//!   to attach to it, and decides whether cross-namespace backend and secret
//!   references are authorized by a ReferenceGrant.
//! * a [bootstrap] converter that takes a dynamic configuration snapshot and
//!   produces a single static bootstrap document with every route and
//!   endpoint reference resolved in place, so a proxy can validate it with no
//!   control plane running.
//!
//! Neither component spawns threads, retries, or keeps state between calls.
//! Callers own scheduling and retry policy.

mod error;
pub use crate::error::{Error, Result};

mod store;
pub use crate::store::{MemoryStore, ResourceStore};

mod resolve;
pub use crate::resolve::{
    AttachedRoute, GatewayRoutes, RejectionReason, Resolver, RouteRejection,
};

mod xds;
pub use crate::xds::{ConfigSnapshot, ResourceType, ResourceVersion};

pub mod bootstrap;
