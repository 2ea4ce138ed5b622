//! Read access to routing resources.
//!
//! The resolver only ever reads, and it reads through [ResourceStore]. The
//! two list operations are reverse-index lookups: implementations are
//! expected to keep a route findable by every gateway it targets and a grant
//! findable by the namespace it lives in, however they choose to maintain
//! that (a watch-fed map, a database index, or a full scan at small scale).

use std::collections::{BTreeMap, BTreeSet};

use gatehouse_api::gateway::Gateway;
use gatehouse_api::grant::ReferenceGrant;
use gatehouse_api::objects::{Namespace, Secret, Service};
use gatehouse_api::route::Route;
use gatehouse_api::GroupKind;

use crate::error::{Error, Result};

pub trait ResourceStore {
    fn gateway(&self, namespace: &str, name: &str) -> Result<Gateway>;

    fn route(&self, namespace: &str, name: &str) -> Result<Route>;

    fn service(&self, namespace: &str, name: &str) -> Result<Service>;

    fn secret(&self, namespace: &str, name: &str) -> Result<Secret>;

    fn namespace(&self, name: &str) -> Result<Namespace>;

    /// Every route with a parent ref resolving to the gateway with this
    /// `namespace/name` key.
    fn routes_for_gateway(&self, qualified_name: &str) -> Vec<Route>;

    /// Every reference grant living in `namespace`.
    fn grants_in(&self, namespace: &str) -> Vec<ReferenceGrant>;
}

/// An in-memory [ResourceStore].
///
/// Writes keep two reverse indexes up to date: routes by the gateways their
/// parent refs target, and grants by the namespace they live in.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    gateways: BTreeMap<String, Gateway>,
    routes: BTreeMap<String, Route>,
    services: BTreeMap<String, Service>,
    secrets: BTreeMap<String, Secret>,
    namespaces: BTreeMap<String, Namespace>,
    grants: BTreeMap<String, ReferenceGrant>,

    // gateway "namespace/name" -> route keys
    routes_by_gateway: BTreeMap<String, BTreeSet<String>>,
    // namespace -> grant keys
    grants_by_namespace: BTreeMap<String, BTreeSet<String>>,
}

fn key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

fn not_found(group_kind: GroupKind, namespace: &str, name: &str) -> Error {
    Error::NotFound {
        group_kind,
        namespace: namespace.to_string(),
        name: name.to_string(),
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_gateway(&mut self, gateway: Gateway) {
        self.gateways.insert(gateway.qualified_name(), gateway);
    }

    pub fn put_route(&mut self, route: Route) {
        let route_key = route.qualified_name();
        self.unindex_route(&route_key);

        for parent_ref in route.parent_refs.iter().filter(|r| r.is_gateway()) {
            self.routes_by_gateway
                .entry(parent_ref.qualified_name(&route.namespace))
                .or_default()
                .insert(route_key.clone());
        }
        self.routes.insert(route_key, route);
    }

    pub fn remove_route(&mut self, namespace: &str, name: &str) {
        let route_key = key(namespace, name);
        self.unindex_route(&route_key);
        self.routes.remove(&route_key);
    }

    pub fn put_grant(&mut self, grant: ReferenceGrant) {
        let grant_key = key(&grant.namespace, &grant.name);
        self.unindex_grant(&grant_key);

        self.grants_by_namespace
            .entry(grant.namespace.clone())
            .or_default()
            .insert(grant_key.clone());
        self.grants.insert(grant_key, grant);
    }

    pub fn remove_grant(&mut self, namespace: &str, name: &str) {
        let grant_key = key(namespace, name);
        self.unindex_grant(&grant_key);
        self.grants.remove(&grant_key);
    }

    pub fn put_service(&mut self, service: Service) {
        self.services
            .insert(key(&service.namespace, &service.name), service);
    }

    pub fn put_secret(&mut self, secret: Secret) {
        self.secrets
            .insert(key(&secret.namespace, &secret.name), secret);
    }

    pub fn put_namespace(&mut self, namespace: Namespace) {
        self.namespaces.insert(namespace.name.clone(), namespace);
    }

    fn unindex_route(&mut self, route_key: &str) {
        let Some(old) = self.routes.get(route_key) else {
            return;
        };

        for parent_ref in old.parent_refs.iter().filter(|r| r.is_gateway()) {
            let gateway_key = parent_ref.qualified_name(&old.namespace);
            if let Some(keys) = self.routes_by_gateway.get_mut(&gateway_key) {
                keys.remove(route_key);
                if keys.is_empty() {
                    self.routes_by_gateway.remove(&gateway_key);
                }
            }
        }
    }

    fn unindex_grant(&mut self, grant_key: &str) {
        let Some(old) = self.grants.get(grant_key) else {
            return;
        };

        if let Some(keys) = self.grants_by_namespace.get_mut(&old.namespace) {
            keys.remove(grant_key);
            if keys.is_empty() {
                self.grants_by_namespace.remove(&old.namespace);
            }
        }
    }
}

impl ResourceStore for MemoryStore {
    fn gateway(&self, namespace: &str, name: &str) -> Result<Gateway> {
        self.gateways
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found(Gateway::group_kind(), namespace, name))
    }

    fn route(&self, namespace: &str, name: &str) -> Result<Route> {
        self.routes
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found(Route::group_kind(), namespace, name))
    }

    fn service(&self, namespace: &str, name: &str) -> Result<Service> {
        self.services
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found(Service::group_kind(), namespace, name))
    }

    fn secret(&self, namespace: &str, name: &str) -> Result<Secret> {
        self.secrets
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found(Secret::group_kind(), namespace, name))
    }

    fn namespace(&self, name: &str) -> Result<Namespace> {
        self.namespaces
            .get(name)
            .cloned()
            .ok_or_else(|| not_found(GroupKind::core("Namespace"), "", name))
    }

    fn routes_for_gateway(&self, qualified_name: &str) -> Vec<Route> {
        let Some(keys) = self.routes_by_gateway.get(qualified_name) else {
            return Vec::new();
        };

        keys.iter()
            .filter_map(|k| self.routes.get(k).cloned())
            .collect()
    }

    fn grants_in(&self, namespace: &str) -> Vec<ReferenceGrant> {
        let Some(keys) = self.grants_by_namespace.get(namespace) else {
            return Vec::new();
        };

        keys.iter()
            .filter_map(|k| self.grants.get(k).cloned())
            .collect()
    }
}
