//! The dynamic configuration snapshot: the xDS resources a control plane
//! serves to proxies, keyed by name.
//!
//! A snapshot is eventually consistent by design. A listener may name a route
//! table that isn't present yet, and a cluster may point at endpoints that
//! haven't been discovered; proxies resolve those references over the
//! discovery protocol as the missing pieces arrive. Turning a snapshot into a
//! document with no such loose ends is [bootstrap][crate::bootstrap]'s job.

use std::collections::BTreeMap;
use std::ops::Deref;
use std::sync::Arc;

use enum_map::EnumMap;
use smol_str::SmolStr;
use xds_api::pb::envoy::config::{
    cluster::v3 as xds_cluster, endpoint::v3 as xds_endpoint, listener::v3 as xds_listener,
    route::v3 as xds_route,
};
use xds_api::pb::envoy::extensions::transport_sockets::tls::v3 as xds_tls;
use xds_api::pb::google::protobuf;
use xds_api::WellKnownTypes;

use crate::error::{Error, Result};


/// An opaque string used to version an xDS resource collection.
///
/// `ResourceVersion`s are immutable and cheap to `clone` and share.
#[derive(Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceVersion(SmolStr);

impl Deref for ResourceVersion {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl serde::Serialize for ResourceVersion {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl AsRef<str> for ResourceVersion {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_resource_version_from {
    ($from_ty:ty) => {
        impl From<$from_ty> for ResourceVersion {
            fn from(s: $from_ty) -> ResourceVersion {
                ResourceVersion(s.into())
            }
        }
    };
}

impl_resource_version_from!(&str);
impl_resource_version_from!(&mut str);
impl_resource_version_from!(String);
impl_resource_version_from!(&String);
impl_resource_version_from!(Arc<str>);
impl_resource_version_from!(Box<str>);

/// The kinds of resource a snapshot serves over the discovery protocol.
#[derive(Debug, Copy, Clone, PartialEq, Eq, enum_map::Enum, Hash)]
pub enum ResourceType {
    Listener,
    RouteConfiguration,
    Cluster,
    ClusterLoadAssignment,
    Secret,
}

impl ResourceType {
    fn as_well_known(&self) -> WellKnownTypes {
        match self {
            ResourceType::Listener => WellKnownTypes::Listener,
            ResourceType::RouteConfiguration => WellKnownTypes::RouteConfiguration,
            ResourceType::Cluster => WellKnownTypes::Cluster,
            ResourceType::ClusterLoadAssignment => WellKnownTypes::ClusterLoadAssignment,
            ResourceType::Secret => WellKnownTypes::Secret,
        }
    }

    fn from_well_known(wkt: WellKnownTypes) -> Option<Self> {
        match wkt {
            WellKnownTypes::Listener => Some(Self::Listener),
            WellKnownTypes::RouteConfiguration => Some(Self::RouteConfiguration),
            WellKnownTypes::Cluster => Some(Self::Cluster),
            WellKnownTypes::ClusterLoadAssignment => Some(Self::ClusterLoadAssignment),
            WellKnownTypes::Secret => Some(Self::Secret),
            _ => None,
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Cluster,
            Self::ClusterLoadAssignment,
            Self::Listener,
            Self::RouteConfiguration,
            Self::Secret,
        ]
    }

    pub fn type_url(&self) -> &'static str {
        self.as_well_known().type_url()
    }

    pub fn from_type_url(type_url: &str) -> Option<Self> {
        Self::from_well_known(WellKnownTypes::from_type_url(type_url)?)
    }
}

/// A named, versioned set of xDS resources.
///
/// Listeners may reference route configurations by name and clusters may
/// reference load assignments by service name without either resolving
/// inside the snapshot; that's the dynamic protocol working as intended.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigSnapshot {
    pub(crate) listeners: BTreeMap<String, xds_listener::Listener>,
    pub(crate) routes: BTreeMap<String, xds_route::RouteConfiguration>,
    pub(crate) clusters: BTreeMap<String, xds_cluster::Cluster>,
    pub(crate) endpoints: BTreeMap<String, xds_endpoint::ClusterLoadAssignment>,
    pub(crate) secrets: BTreeMap<String, xds_tls::Secret>,
    pub(crate) versions: EnumMap<ResourceType, ResourceVersion>,
}

impl ConfigSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_listener(&mut self, listener: xds_listener::Listener) {
        self.listeners.insert(listener.name.clone(), listener);
    }

    pub fn put_route(&mut self, route: xds_route::RouteConfiguration) {
        self.routes.insert(route.name.clone(), route);
    }

    pub fn put_cluster(&mut self, cluster: xds_cluster::Cluster) {
        self.clusters.insert(cluster.name.clone(), cluster);
    }

    pub fn put_endpoints(&mut self, endpoints: xds_endpoint::ClusterLoadAssignment) {
        self.endpoints
            .insert(endpoints.cluster_name.clone(), endpoints);
    }

    pub fn put_secret(&mut self, secret: xds_tls::Secret) {
        self.secrets.insert(secret.name.clone(), secret);
    }

    /// Insert a wire-format resource, dispatching on its type URL.
    ///
    /// Every resource must decode as the message its URL promises; anything
    /// else is an error rather than a silently-wrong entry.
    pub fn insert_any(&mut self, name: impl Into<String>, resource: protobuf::Any) -> Result<()> {
        let name = name.into();

        macro_rules! decode {
            ($resource:expr) => {
                $resource.to_msg().map_err(|e| Error::InvalidResource {
                    type_url: $resource.type_url.clone(),
                    name: name.clone(),
                    source: e,
                })?
            };
        }

        match ResourceType::from_type_url(&resource.type_url) {
            Some(ResourceType::Listener) => {
                let listener = decode!(resource);
                self.listeners.insert(name, listener);
            }
            Some(ResourceType::RouteConfiguration) => {
                let route = decode!(resource);
                self.routes.insert(name, route);
            }
            Some(ResourceType::Cluster) => {
                let cluster = decode!(resource);
                self.clusters.insert(name, cluster);
            }
            Some(ResourceType::ClusterLoadAssignment) => {
                let endpoints = decode!(resource);
                self.endpoints.insert(name, endpoints);
            }
            Some(ResourceType::Secret) => {
                let secret = decode!(resource);
                self.secrets.insert(name, secret);
            }
            None => {
                return Err(Error::UnknownResourceType {
                    type_url: resource.type_url,
                })
            }
        }

        Ok(())
    }

    pub fn listeners(&self) -> &BTreeMap<String, xds_listener::Listener> {
        &self.listeners
    }

    pub fn routes(&self) -> &BTreeMap<String, xds_route::RouteConfiguration> {
        &self.routes
    }

    pub fn clusters(&self) -> &BTreeMap<String, xds_cluster::Cluster> {
        &self.clusters
    }

    pub fn endpoints(&self) -> &BTreeMap<String, xds_endpoint::ClusterLoadAssignment> {
        &self.endpoints
    }

    pub fn secrets(&self) -> &BTreeMap<String, xds_tls::Secret> {
        &self.secrets
    }

    pub fn version(&self, resource_type: ResourceType) -> &ResourceVersion {
        &self.versions[resource_type]
    }

    pub fn set_version(&mut self, resource_type: ResourceType, version: impl Into<ResourceVersion>) {
        self.versions[resource_type] = version.into();
    }
}
