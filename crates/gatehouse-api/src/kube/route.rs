use gateway_api::apis::experimental::httproutes::{
    HTTPRoute, HTTPRouteParentRefs, HTTPRouteRules, HTTPRouteRulesBackendRefs,
    HTTPRouteRulesMatches, HTTPRouteRulesMatchesPath, HTTPRouteRulesMatchesPathType,
};

use super::{metadata_name, metadata_namespace, option_from_kube, port_from_kube, vec_from_kube};
use crate::error::{Error, ErrorContext};
use crate::route::{BackendRef, ParentRef, PathMatch, Route, RouteMatch, RouteRule};

impl Route {
    /// Convert a Gateway API [HTTPRoute] into a [Route].
    #[inline]
    pub fn from_gateway_httproute(httproute: &HTTPRoute) -> Result<Route, Error> {
        httproute.try_into()
    }
}

impl TryFrom<&HTTPRoute> for Route {
    type Error = Error;

    fn try_from(route: &HTTPRoute) -> Result<Self, Error> {
        let name = metadata_name(&route.metadata).with_field("metadata")?;
        let namespace = metadata_namespace(&route.metadata).with_field("metadata")?;

        Ok(Route {
            name,
            namespace,
            parent_refs: vec_from_kube!(route.spec.parent_refs)
                .with_fields("spec", "parentRefs")?,
            hostnames: route.spec.hostnames.clone().unwrap_or_default(),
            rules: vec_from_kube!(route.spec.rules).with_fields("spec", "rules")?,
        })
    }
}

impl TryFrom<&HTTPRouteParentRefs> for ParentRef {
    type Error = Error;

    fn try_from(parent_ref: &HTTPRouteParentRefs) -> Result<Self, Error> {
        let port = parent_ref
            .port
            .map(port_from_kube)
            .transpose()
            .with_field("port")?;

        Ok(ParentRef {
            group: parent_ref.group.clone(),
            kind: parent_ref.kind.clone(),
            name: parent_ref.name.clone(),
            namespace: parent_ref.namespace.clone(),
            section_name: parent_ref.section_name.clone(),
            port,
        })
    }
}

impl TryFrom<&HTTPRouteRules> for RouteRule {
    type Error = Error;

    fn try_from(rule: &HTTPRouteRules) -> Result<Self, Error> {
        Ok(RouteRule {
            matches: vec_from_kube!(rule.matches).with_field("matches")?,
            backend_refs: vec_from_kube!(rule.backend_refs).with_field("backendRefs")?,
        })
    }
}

impl TryFrom<&HTTPRouteRulesMatches> for RouteMatch {
    type Error = Error;

    fn try_from(route_match: &HTTPRouteRulesMatches) -> Result<Self, Error> {
        Ok(RouteMatch {
            path: option_from_kube!(route_match.path).with_field("path")?,
        })
    }
}

impl TryFrom<&HTTPRouteRulesMatchesPath> for PathMatch {
    type Error = Error;

    fn try_from(path: &HTTPRouteRulesMatchesPath) -> Result<Self, Error> {
        // the Gateway API defaults an unset match to a "/" prefix.
        let value = path.value.clone().unwrap_or_else(|| "/".to_string());

        match path.r#type {
            None | Some(HTTPRouteRulesMatchesPathType::PathPrefix) => {
                Ok(PathMatch::Prefix { value })
            }
            Some(HTTPRouteRulesMatchesPathType::Exact) => Ok(PathMatch::Exact { value }),
            Some(HTTPRouteRulesMatchesPathType::RegularExpression) => Err(Error::new_static(
                "regular expression path matches are not supported",
            )),
        }
    }
}

impl TryFrom<&HTTPRouteRulesBackendRefs> for BackendRef {
    type Error = Error;

    fn try_from(backend_ref: &HTTPRouteRulesBackendRefs) -> Result<Self, Error> {
        let port = backend_ref
            .port
            .map(port_from_kube)
            .transpose()
            .with_field("port")?;

        Ok(BackendRef {
            group: backend_ref.group.clone().unwrap_or_default(),
            kind: backend_ref.kind.clone(),
            name: backend_ref.name.clone(),
            namespace: backend_ref.namespace.clone(),
            port,
            weight: backend_ref.weight,
        })
    }
}
