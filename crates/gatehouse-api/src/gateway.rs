//! Gateways and their listeners.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::shared::{
    GroupKind, LabelSelector, HTTP_ROUTE_KIND, SECRET_KIND, TCP_ROUTE_KIND, UDP_ROUTE_KIND,
};
use crate::{Hostname, PortNumber};

/// A logical ingress point: a namespaced object holding an ordered set of
/// [Listener]s that routes attach to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Gateway {
    pub name: String,
    pub namespace: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<Listener>,
}

impl Gateway {
    /// The `namespace/name` key that parent refs resolve to when they target
    /// this gateway.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// The group/kind of Gateway objects.
    pub fn group_kind() -> GroupKind {
        GroupKind::gateway_api(crate::shared::GATEWAY_KIND)
    }
}

/// One bound protocol/port/hostname combination on a [Gateway].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Listener {
    pub name: String,

    pub protocol: Protocol,

    pub port: PortNumber,

    /// The hostname this listener serves. May be an exact hostname, a
    /// wildcard pattern like `*.example.com`, or unset to match any host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<Hostname>,

    /// Which route kinds and namespaces may attach here. When unset, routes of
    /// the protocol's default kind from the gateway's own namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_routes: Option<AllowedRoutes>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<ListenerTls>,
}

/// A listener protocol.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    Http,
    Https,
    Tls,
    Tcp,
    Udp,
}

impl Protocol {
    /// The route kinds a listener with this protocol accepts when its
    /// [AllowedRoutes] don't name any explicitly.
    pub fn default_route_kinds(&self) -> Vec<GroupKind> {
        let kind = match self {
            Protocol::Http | Protocol::Https => HTTP_ROUTE_KIND,
            Protocol::Tls | Protocol::Tcp => TCP_ROUTE_KIND,
            Protocol::Udp => UDP_ROUTE_KIND,
        };
        vec![GroupKind::gateway_api(kind)]
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Protocol::Http => "HTTP",
            Protocol::Https => "HTTPS",
            Protocol::Tls => "TLS",
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
        };
        f.write_str(s)
    }
}

/// The policy controlling which routes may attach to a listener.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllowedRoutes {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespaces: Option<RouteNamespaces>,

    /// Route kinds allowed to attach. Taken verbatim when non-empty,
    /// overriding the protocol's defaults.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<GroupKind>,
}

/// Which namespaces routes may attach from.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteNamespaces {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<FromNamespaces>,

    /// Required when `from` is [FromNamespaces::Selector].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<LabelSelector>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FromNamespaces {
    All,
    Selector,
    #[default]
    Same,
}

/// TLS configuration for a listener.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ListenerTls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<TlsMode>,

    /// The certificates to serve, usually references to `Secret`s. A ref into
    /// another namespace needs a ReferenceGrant there.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub certificate_refs: Vec<SecretRef>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsMode {
    #[default]
    Terminate,
    Passthrough,
}

/// A reference to a TLS certificate, by default a core-group `Secret`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SecretRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub name: String,

    /// The namespace of the secret. Unset means the gateway's own namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl SecretRef {
    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(
            self.group.clone(),
            self.kind.as_deref().unwrap_or(SECRET_KIND),
        )
    }
}
