//! Reference grants: namespace-scoped capabilities allowing specific
//! cross-namespace references.

use serde::{Deserialize, Serialize};

use crate::shared::GroupKind;

/// A grant of access across namespace boundaries. A grant lives in the
/// namespace of the objects being referred TO and names which referring
/// objects, from which namespaces, may reach which target kinds. Grants are
/// not transitive, and a grant in the referrer's namespace means nothing.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReferenceGrant {
    pub name: String,
    pub namespace: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub from: Vec<GrantFrom>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub to: Vec<GrantTo>,
}

/// A kind of referring object, in a specific namespace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrantFrom {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    pub kind: String,

    pub namespace: String,
}

/// A kind of object that may be referred to, optionally narrowed to a single
/// name. No name means every object of that kind in the grant's namespace.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GrantTo {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,

    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ReferenceGrant {
    /// Whether this grant allows an object of kind `from` in `from_namespace`
    /// to reference the object of kind `to` named `to_name` in the grant's
    /// own namespace.
    pub fn allows(
        &self,
        from: &GroupKind,
        from_namespace: &str,
        to: &GroupKind,
        to_name: &str,
    ) -> bool {
        let from_allowed = self.from.iter().any(|f| {
            f.group == from.group && f.kind == from.kind && f.namespace == from_namespace
        });
        if !from_allowed {
            return false;
        }

        self.to.iter().any(|t| {
            t.group == to.group
                && t.kind == to.kind
                && t.name.as_deref().map_or(true, |name| name == to_name)
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::shared::{HTTP_ROUTE_KIND, SERVICE_KIND};

    fn grant(to_name: Option<&str>) -> ReferenceGrant {
        ReferenceGrant {
            name: "allow-routes".to_string(),
            namespace: "backends".to_string(),
            from: vec![GrantFrom {
                group: crate::GATEWAY_API_GROUP.to_string(),
                kind: HTTP_ROUTE_KIND.to_string(),
                namespace: "apps".to_string(),
            }],
            to: vec![GrantTo {
                group: String::new(),
                kind: SERVICE_KIND.to_string(),
                name: to_name.map(str::to_string),
            }],
        }
    }

    #[test]
    fn test_allows_matching_reference() {
        let grant = grant(None);
        assert!(grant.allows(
            &crate::route::Route::group_kind(),
            "apps",
            &GroupKind::core(SERVICE_KIND),
            "anything",
        ));
    }

    #[test]
    fn test_from_must_match_namespace_and_kind() {
        let grant = grant(None);
        let service = GroupKind::core(SERVICE_KIND);

        assert!(!grant.allows(&crate::route::Route::group_kind(), "other", &service, "svc"));
        assert!(!grant.allows(&GroupKind::gateway_api("TCPRoute"), "apps", &service, "svc"));
    }

    #[test]
    fn test_to_name_narrows_the_grant() {
        let grant = grant(Some("svc-a"));
        let from = crate::route::Route::group_kind();
        let service = GroupKind::core(SERVICE_KIND);

        assert!(grant.allows(&from, "apps", &service, "svc-a"));
        assert!(!grant.allows(&from, "apps", &service, "svc-b"));
    }
}
