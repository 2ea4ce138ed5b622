//! Conversions from the upstream Kubernetes Gateway API objects into
//! gatehouse types.
//!
//! To keep dependency versions from drifting apart, this module re-exports
//! the [`gateway-api`](https://crates.io/crates/gateway-api) and
//! [`k8s-openapi`](https://crates.io/crates/k8s-openapi) crates it converts
//! from:
//!
//! ```no_run
//! use gatehouse_api::kube::k8s_openapi;
//!
//! use k8s_openapi::api::core::v1::Namespace;
//! let namespace = Namespace::default();
//! ```
//!
//! This crate does not pick a
//! [`k8s-openapi` version feature](https://docs.rs/k8s-openapi/latest/k8s_openapi/#crate-features)
//! on its own; application authors select one through the `kube_v1_*`
//! features.

mod gateway;
mod grant;
mod objects;
mod route;

pub use gateway_api;
pub use k8s_openapi;

use kube::api::ObjectMeta;

use crate::error::Error;

fn metadata_name(meta: &ObjectMeta) -> Result<String, Error> {
    meta.name
        .clone()
        .ok_or_else(|| Error::new_static("missing metadata.name"))
}

fn metadata_namespace(meta: &ObjectMeta) -> Result<String, Error> {
    meta.namespace
        .clone()
        .ok_or_else(|| Error::new_static("missing metadata.namespace"))
}

fn port_from_kube(port: i32) -> Result<crate::PortNumber, Error> {
    u16::try_from(port).map_err(|_| Error::new(format!("port out of range: {port}")))
}

macro_rules! option_from_kube {
    ($field:expr) => {
        $field.as_ref().map(|v| v.try_into()).transpose()
    };
}

macro_rules! vec_from_kube {
    ($opt_vec:expr) => {
        $opt_vec
            .iter()
            .flatten()
            .enumerate()
            .map(|(i, e)| e.try_into().with_index(i))
            .collect::<Result<Vec<_>, _>>()
    };
}

pub(crate) use option_from_kube;
pub(crate) use vec_from_kube;
