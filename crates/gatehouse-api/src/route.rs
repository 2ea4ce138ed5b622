//! Routes: rule sets binding request matching criteria to backends, attached
//! to gateways through parent references.

use serde::{Deserialize, Serialize};

use crate::shared::{GroupKind, GATEWAY_API_GROUP, GATEWAY_KIND, HTTP_ROUTE_KIND, SERVICE_KIND};
use crate::{Hostname, PortNumber};

/// An HTTP route. Attaches to the [Gateway][crate::gateway::Gateway]s named
/// by its parent refs and serves the hostnames it declares; no hostnames
/// means any host the listener serves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub name: String,
    pub namespace: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parent_refs: Vec<ParentRef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hostnames: Vec<Hostname>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RouteRule>,
}

impl Route {
    /// The group/kind of HTTP routes.
    pub fn group_kind() -> GroupKind {
        GroupKind::gateway_api(HTTP_ROUTE_KIND)
    }

    /// The `namespace/name` key of this route.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// A reference from a route to the parent it wants to attach to.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParentRef {
    /// The parent's API group. Unset means the Gateway API group; the empty
    /// string is the core group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// The parent's kind. Unset means `Gateway`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub name: String,

    /// The parent's namespace. Unset means the route's own namespace.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    /// Attach to the single listener with this name instead of every
    /// listener that allows it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,

    /// Attach only to listeners bound to this port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortNumber>,
}

impl ParentRef {
    /// Whether this ref names a Gateway rather than some other parent kind.
    pub fn is_gateway(&self) -> bool {
        let group_ok = match self.group.as_deref() {
            None => true,
            Some(group) => group == GATEWAY_API_GROUP,
        };
        let kind_ok = match self.kind.as_deref() {
            None => true,
            Some(kind) => kind == GATEWAY_KIND,
        };
        group_ok && kind_ok
    }

    /// The `namespace/name` this ref points at, defaulting the namespace to
    /// the referencing route's.
    pub fn qualified_name(&self, route_namespace: &str) -> String {
        format!(
            "{}/{}",
            self.namespace.as_deref().unwrap_or(route_namespace),
            self.name
        )
    }
}

/// One rule on a route: what to match and where to send it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matches: Vec<RouteMatch>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backend_refs: Vec<BackendRef>,
}

/// Request matching criteria. All present criteria must hold.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathMatch>,
}

/// A match against a request path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathMatch {
    Prefix { value: String },
    Exact { value: String },
}

/// A reference from a route rule to the backend that should receive traffic,
/// by default a core-group `Service`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendRef {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    pub name: String,

    /// The backend's namespace. Unset means the route's own namespace; a ref
    /// into another namespace needs a ReferenceGrant there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortNumber>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

impl BackendRef {
    pub fn group_kind(&self) -> GroupKind {
        GroupKind::new(
            self.group.clone(),
            self.kind.as_deref().unwrap_or(SERVICE_KIND),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parent_ref_is_gateway() {
        let by_default = ParentRef {
            name: "gw".to_string(),
            ..Default::default()
        };
        assert!(by_default.is_gateway());

        let explicit = ParentRef {
            group: Some(GATEWAY_API_GROUP.to_string()),
            kind: Some(GATEWAY_KIND.to_string()),
            name: "gw".to_string(),
            ..Default::default()
        };
        assert!(explicit.is_gateway());

        let core_parent = ParentRef {
            group: Some("".to_string()),
            kind: Some(SERVICE_KIND.to_string()),
            name: "svc".to_string(),
            ..Default::default()
        };
        assert!(!core_parent.is_gateway());
    }

    #[test]
    fn test_parent_ref_qualified_name() {
        let same_ns = ParentRef {
            name: "gw".to_string(),
            ..Default::default()
        };
        assert_eq!(same_ns.qualified_name("prod"), "prod/gw");

        let cross_ns = ParentRef {
            name: "gw".to_string(),
            namespace: Some("infra".to_string()),
            ..Default::default()
        };
        assert_eq!(cross_ns.qualified_name("prod"), "infra/gw");
    }

    #[test]
    fn test_backend_ref_group_kind() {
        let backend = BackendRef {
            group: String::new(),
            kind: None,
            name: "svc".to_string(),
            namespace: None,
            port: Some(8080),
            weight: None,
        };
        assert_eq!(backend.group_kind(), GroupKind::core(SERVICE_KIND));
    }

    #[test]
    fn test_path_match_serde() {
        let matched: PathMatch =
            serde_json::from_str(r#"{"type": "prefix", "value": "/api"}"#).unwrap();
        assert_eq!(
            matched,
            PathMatch::Prefix {
                value: "/api".to_string()
            }
        );
    }
}
