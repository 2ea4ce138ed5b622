//! Route attachment and cross-namespace reference resolution.
//!
//! [Resolver::routes_for_gateway] answers "which routes serve traffic on
//! which listener": every candidate route passes a kind gate and a namespace
//! gate per listener, its parent refs are matched against listener name and
//! port, and its hostnames are intersected with the listener's. A route that
//! targeted the gateway but landed on no listener is reported with the reason
//! it missed, so callers can publish status conditions.
//!
//! [Resolver::resolve_backend] and [Resolver::resolve_secret] answer "may
//! this object reach that one": same-namespace references are always allowed,
//! cross-namespace references only when a ReferenceGrant in the target
//! namespace says so.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use gatehouse_api::gateway::{FromNamespaces, Gateway, Listener, SecretRef};
use gatehouse_api::objects::{Secret, Service};
use gatehouse_api::route::{BackendRef, ParentRef, Route};
use gatehouse_api::{GroupKind, Hostname, LabelSelector};
use tracing::debug;

use crate::error::{Error, Result};
use crate::store::ResourceStore;

/// Resolves route attachment and object references against a backing store.
///
/// Holds no state of its own: every operation is a pure function of the
/// store's current contents, so a resolver can be shared freely and called
/// once per reconciliation pass.
pub struct Resolver<S> {
    store: S,
}

/// The routes attached to one gateway, listener by listener.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GatewayRoutes {
    /// Every listener on the gateway, with the routes that attached to it in
    /// store order. Listeners nothing attached to map to an empty list.
    pub listeners: BTreeMap<String, Vec<AttachedRoute>>,

    /// Parent refs that targeted this gateway but attached to no listener,
    /// with the reason the last gate they failed gives.
    pub route_errors: Vec<RouteRejection>,
}

/// A route bound to a specific listener.
#[derive(Clone, Debug, PartialEq)]
pub struct AttachedRoute {
    pub route: Route,

    /// The subset of the route's hostnames this listener serves. Empty means
    /// both sides are catch-all and the route serves any host.
    pub hostnames: Vec<Hostname>,
}

/// A (route, parent ref) pair that failed to attach anywhere on the gateway
/// it targeted.
#[derive(Clone, Debug, PartialEq)]
pub struct RouteRejection {
    pub route: Route,
    pub parent_ref: ParentRef,
    pub reason: RejectionReason,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RejectionReason {
    /// No listener's allowed-routes policy admits this route's kind and
    /// namespace.
    NotAllowedByListeners,

    /// Some listener admits the route, but the parent ref's section name or
    /// port matched none of them.
    NoMatchingParent,

    /// A listener matched, but no route hostname overlaps its hostname.
    NoMatchingListenerHostname,
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            RejectionReason::NotAllowedByListeners => "NotAllowedByListeners",
            RejectionReason::NoMatchingParent => "NoMatchingParent",
            RejectionReason::NoMatchingListenerHostname => "NoMatchingListenerHostname",
        };
        f.write_str(reason)
    }
}

// A listener with its attachment policy unpacked: the kinds it admits and
// the namespace rule to test candidates against.
struct ListenerContext<'a> {
    listener: &'a Listener,
    kinds: Vec<GroupKind>,
    namespaces: NamespacePolicy,
}

enum NamespacePolicy {
    Same,
    All,
    Selector(LabelSelector),
}

fn listener_context(listener: &Listener) -> Result<ListenerContext<'_>> {
    let allowed = listener.allowed_routes.as_ref();

    let kinds = match allowed {
        Some(allowed) if !allowed.kinds.is_empty() => allowed.kinds.clone(),
        _ => listener.protocol.default_route_kinds(),
    };

    let namespaces = match allowed.and_then(|a| a.namespaces.as_ref()) {
        None => NamespacePolicy::Same,
        Some(namespaces) => match namespaces.from.unwrap_or_default() {
            FromNamespaces::Same => NamespacePolicy::Same,
            FromNamespaces::All => NamespacePolicy::All,
            FromNamespaces::Selector => match &namespaces.selector {
                Some(selector) => NamespacePolicy::Selector(selector.clone()),
                None => {
                    return Err(Error::MissingSelector {
                        listener: listener.name.clone(),
                    })
                }
            },
        },
    };

    Ok(ListenerContext {
        listener,
        kinds,
        namespaces,
    })
}

fn ref_matches_listener(parent_ref: &ParentRef, listener: &Listener) -> bool {
    let section_ok = parent_ref
        .section_name
        .as_deref()
        .map_or(true, |section| section == listener.name);
    let port_ok = parent_ref.port.map_or(true, |port| port == listener.port);
    section_ok && port_ok
}

// Namespace labels fetched so far this resolution, None = namespace absent.
type NamespaceLabels = BTreeMap<String, Option<BTreeMap<String, String>>>;

impl<S: ResourceStore> Resolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Compute the routes attached to every listener of a gateway.
    ///
    /// Fails on a self-contradictory gateway: duplicate listener names, or a
    /// listener that selects namespaces by label without declaring a
    /// selector. A route whose hostnames don't overlap one listener is
    /// silently omitted from that listener; a (route, parent ref) that lands
    /// on no listener at all is reported in
    /// [route_errors][GatewayRoutes::route_errors].
    pub fn routes_for_gateway(&self, gateway: &Gateway) -> Result<GatewayRoutes> {
        let mut names = BTreeSet::new();
        for listener in &gateway.listeners {
            if !names.insert(listener.name.as_str()) {
                return Err(Error::DuplicateListener {
                    gateway: gateway.qualified_name(),
                    listener: listener.name.clone(),
                });
            }
        }

        let contexts = gateway
            .listeners
            .iter()
            .map(listener_context)
            .collect::<Result<Vec<_>>>()?;

        let mut routes = GatewayRoutes::default();
        for listener in &gateway.listeners {
            routes.listeners.insert(listener.name.clone(), Vec::new());
        }

        let gateway_key = gateway.qualified_name();
        let route_kind = Route::group_kind();
        let mut labels = NamespaceLabels::new();

        for route in self.store.routes_for_gateway(&gateway_key) {
            // one attachment per listener even if several refs match it
            let mut attached = BTreeSet::new();

            for parent_ref in &route.parent_refs {
                if !parent_ref.is_gateway()
                    || parent_ref.qualified_name(&route.namespace) != gateway_key
                {
                    continue;
                }

                let mut allowed_by_any = false;
                let mut matched_any = false;
                let mut hosts_matched = false;

                for ctx in &contexts {
                    if !ctx.kinds.contains(&route_kind) {
                        continue;
                    }
                    if !self.namespace_allowed(
                        &ctx.namespaces,
                        &gateway.namespace,
                        &route.namespace,
                        &mut labels,
                    )? {
                        continue;
                    }
                    allowed_by_any = true;

                    if !ref_matches_listener(parent_ref, ctx.listener) {
                        continue;
                    }
                    matched_any = true;

                    let Some(hostnames) = hostname_intersection(
                        ctx.listener.hostname.as_deref(),
                        &route.hostnames,
                    ) else {
                        continue;
                    };
                    hosts_matched = true;

                    if attached.insert(ctx.listener.name.clone()) {
                        if let Some(listener_routes) = routes.listeners.get_mut(&ctx.listener.name)
                        {
                            listener_routes.push(AttachedRoute {
                                route: route.clone(),
                                hostnames,
                            });
                        }
                    }
                }

                if !(allowed_by_any && matched_any && hosts_matched) {
                    let reason = if !allowed_by_any {
                        RejectionReason::NotAllowedByListeners
                    } else if !matched_any {
                        RejectionReason::NoMatchingParent
                    } else {
                        RejectionReason::NoMatchingListenerHostname
                    };
                    debug!(
                        route = %route.qualified_name(),
                        gateway = %gateway_key,
                        %reason,
                        "route did not attach",
                    );
                    routes.route_errors.push(RouteRejection {
                        route: route.clone(),
                        parent_ref: parent_ref.clone(),
                        reason,
                    });
                }
            }
        }

        Ok(routes)
    }

    fn namespace_allowed(
        &self,
        policy: &NamespacePolicy,
        gateway_namespace: &str,
        route_namespace: &str,
        labels: &mut NamespaceLabels,
    ) -> Result<bool> {
        match policy {
            NamespacePolicy::Same => Ok(route_namespace == gateway_namespace),
            NamespacePolicy::All => Ok(true),
            NamespacePolicy::Selector(selector) => {
                if !labels.contains_key(route_namespace) {
                    let fetched = match self.store.namespace(route_namespace) {
                        Ok(namespace) => Some(namespace.labels),
                        Err(e) if e.is_not_found() => None,
                        Err(e) => return Err(e),
                    };
                    labels.insert(route_namespace.to_string(), fetched);
                }

                match &labels[route_namespace] {
                    Some(namespace_labels) => Ok(selector.matches(namespace_labels)),
                    None => Ok(false),
                }
            }
        }
    }

    /// Decide whether an object of kind `from` in `from_namespace` may
    /// reference the object of kind `to` named `to_name` in `to_namespace`.
    ///
    /// References within one namespace are always allowed and consult no
    /// grants. Across namespaces, some ReferenceGrant in the target namespace
    /// must cover the reference; when none does, the error satisfies
    /// [Error::is_missing_reference_grant] and the target is never fetched.
    pub fn reference_allowed(
        &self,
        from: &GroupKind,
        from_namespace: &str,
        to: &GroupKind,
        to_namespace: &str,
        to_name: &str,
    ) -> Result<()> {
        if from_namespace == to_namespace {
            return Ok(());
        }

        let granted = self
            .store
            .grants_in(to_namespace)
            .iter()
            .any(|grant| grant.allows(from, from_namespace, to, to_name));

        if granted {
            Ok(())
        } else {
            Err(Error::MissingReferenceGrant {
                from: from.clone(),
                to: to.clone(),
                namespace: to_namespace.to_string(),
                name: to_name.to_string(),
            })
        }
    }

    /// Resolve a route rule's backend ref to the Service it names.
    pub fn resolve_backend(&self, route: &Route, backend: &BackendRef) -> Result<Service> {
        let group_kind = backend.group_kind();
        if group_kind != Service::group_kind() {
            return Err(Error::UnsupportedKind { group_kind });
        }

        let namespace = backend.namespace.as_deref().unwrap_or(&route.namespace);
        self.reference_allowed(
            &Route::group_kind(),
            &route.namespace,
            &Service::group_kind(),
            namespace,
            &backend.name,
        )?;
        self.store.service(namespace, &backend.name)
    }

    /// Resolve a listener's certificate ref to the Secret it names.
    pub fn resolve_secret(&self, gateway: &Gateway, secret_ref: &SecretRef) -> Result<Secret> {
        let group_kind = secret_ref.group_kind();
        if group_kind != Secret::group_kind() {
            return Err(Error::UnsupportedKind { group_kind });
        }

        let namespace = secret_ref.namespace.as_deref().unwrap_or(&gateway.namespace);
        self.reference_allowed(
            &Gateway::group_kind(),
            &gateway.namespace,
            &Secret::group_kind(),
            namespace,
            &secret_ref.name,
        )?;
        self.store.secret(namespace, &secret_ref.name)
    }
}

/// The hostnames a listener and a route jointly serve, in route order.
///
/// `None` means no overlap at all and the route should not attach. An empty
/// `Some` means both sides are catch-all: the route attaches and serves any
/// host. A catch-all on one side only narrows to the other side's hostnames.
///
/// The result is a set: a host the listener serves appears once even when
/// several route hostnames produce it.
fn hostname_intersection(
    listener: Option<&str>,
    route_hostnames: &[Hostname],
) -> Option<Vec<Hostname>> {
    let Some(listener) = listener else {
        return Some(route_hostnames.to_vec());
    };
    if route_hostnames.is_empty() {
        return Some(vec![listener.to_string()]);
    }

    let mut seen = BTreeSet::new();
    let intersection: Vec<Hostname> = route_hostnames
        .iter()
        .filter_map(|route| hostnames_intersect(listener, route))
        .filter(|host| seen.insert(host.clone()))
        .collect();

    if intersection.is_empty() {
        None
    } else {
        Some(intersection)
    }
}

// Wildcards cover exactly one extra label: `*.foo.com` matches `bar.foo.com`
// but not `foo.com` or `a.b.foo.com`. The hostname kept is the more specific
// of the pair.
fn hostnames_intersect(listener: &str, route: &str) -> Option<Hostname> {
    match (listener.strip_prefix("*."), route.strip_prefix("*.")) {
        (Some(listener_suffix), Some(route_suffix)) => {
            (listener_suffix == route_suffix).then(|| route.to_string())
        }
        (Some(listener_suffix), None) => {
            let (_, route_suffix) = route.split_once('.')?;
            (listener_suffix == route_suffix).then(|| route.to_string())
        }
        (None, Some(route_suffix)) => {
            let (_, listener_suffix) = listener.split_once('.')?;
            (listener_suffix == route_suffix).then(|| listener.to_string())
        }
        (None, None) => (listener == route).then(|| route.to_string()),
    }
}
