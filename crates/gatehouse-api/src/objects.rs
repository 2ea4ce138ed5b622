//! Minimal views of the core Kubernetes objects that reference resolution
//! touches. These carry only what resolution reads; the full objects stay in
//! whatever store backs the control plane.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shared::{GroupKind, SECRET_KIND, SERVICE_KIND};

/// A backend service, the usual target of a route's backend refs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub namespace: String,
}

impl Service {
    pub fn group_kind() -> GroupKind {
        GroupKind::core(SERVICE_KIND)
    }
}

/// A TLS secret, the usual target of a listener's certificate refs. The
/// certificate material itself never passes through resolution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Secret {
    pub name: String,
    pub namespace: String,
}

impl Secret {
    pub fn group_kind() -> GroupKind {
        GroupKind::core(SECRET_KIND)
    }
}

/// A namespace and its labels, read when a listener restricts attachment by
/// namespace selector.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}
