//! One-shot static bootstrap generation.
//!
//! A dynamic snapshot leans on the discovery protocol. Listeners point at
//! route tables by name, and clusters fetch their endpoints on demand. A
//! proxy started in validate mode gets no discovery protocol, so everything
//! it needs has to be inline in the bootstrap it's handed.
//!
//! [from_snapshot] rewrites a snapshot into that closed form: route tables
//! are inlined into their connection managers, endpoint assignments are
//! inlined into their clusters, and every cluster the routes target that the
//! snapshot doesn't define becomes an empty stand-in so the proxy can parse
//! the config instead of rejecting it at the first dangling name.

use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use prost::Name;
use serde::Serialize;
use tracing::debug;
use xds_api::pb::envoy::config::{
    cluster::v3 as xds_cluster, core::v3 as xds_core, endpoint::v3 as xds_endpoint,
    listener::v3 as xds_listener, route::v3 as xds_route,
};
use xds_api::pb::envoy::extensions::filters::network::http_connection_manager::v3 as xds_http;
use xds_api::pb::envoy::extensions::transport_sockets::tls::v3 as xds_tls;
use xds_api::pb::google::protobuf;
use xds_http::http_connection_manager::RouteSpecifier;
use xds_route::route_action::ClusterSpecifier;

use crate::error::{Error, Result};
use crate::xds::ConfigSnapshot;

const HCM_FILTER_NAME: &str = "envoy.filters.network.http_connection_manager";

static HCM_TYPE_URL: Lazy<String> =
    Lazy::new(<xds_http::HttpConnectionManager as Name>::type_url);

/// The parts of a proxy bootstrap this module fills in. Serialized field
/// names follow the proxy's bootstrap schema.
#[derive(Debug, Serialize)]
struct Bootstrap {
    node: Node,
    static_resources: StaticResources,
}

#[derive(Debug, Serialize)]
struct Node {
    id: String,
    cluster: String,
}

#[derive(Debug, Serialize)]
struct StaticResources {
    listeners: Vec<xds_listener::Listener>,
    clusters: Vec<xds_cluster::Cluster>,
    secrets: Vec<xds_tls::Secret>,
}

fn validation_node() -> Node {
    Node {
        id: "validation-node-id".to_string(),
        cluster: "validation-cluster".to_string(),
    }
}

/// Convert a dynamic snapshot into a self-contained static bootstrap,
/// returned as a JSON document. The output is also valid YAML, so it can be
/// written straight to a bootstrap file.
///
/// The snapshot may be shared with live discovery streams. It is never
/// modified; all rewriting happens on a private copy.
pub fn from_snapshot(snapshot: &ConfigSnapshot) -> Result<String> {
    let ConfigSnapshot {
        listeners,
        routes,
        clusters,
        endpoints,
        secrets,
        versions: _,
    } = snapshot.clone();

    let mut listeners: Vec<_> = listeners.into_values().collect();
    let mut required_clusters = BTreeSet::new();
    inline_routes(&mut listeners, &routes, &mut required_clusters)?;

    let mut clusters: Vec<_> = clusters.into_values().collect();
    inline_endpoints(&mut clusters, &endpoints, &mut required_clusters);

    if !required_clusters.is_empty() {
        debug!(
            clusters = ?required_clusters,
            "routes target clusters missing from the snapshot"
        );
    }
    for name in required_clusters {
        clusters.push(blackhole_cluster(&name));
    }

    let bootstrap = Bootstrap {
        node: validation_node(),
        static_resources: StaticResources {
            listeners,
            clusters,
            secrets: secrets.into_values().collect(),
        },
    };
    Ok(serde_json::to_string(&bootstrap)?)
}

/// Wrap a single HTTP filter's typed config in a minimal bootstrap so the
/// filter can be validated in isolation.
///
/// The config rides as the typed per-filter config of a catch-all virtual
/// host on a placeholder listener. Everything else in the document is fixed
/// scaffolding.
pub fn from_http_filter(filter_name: &str, config: &protobuf::Any) -> Result<String> {
    let route_config = xds_route::RouteConfiguration {
        virtual_hosts: vec![xds_route::VirtualHost {
            name: "placeholder_host".to_string(),
            domains: vec!["*".to_string()],
            typed_per_filter_config: [(filter_name.to_string(), config.clone())].into(),
            ..Default::default()
        }],
        ..Default::default()
    };

    let hcm = xds_http::HttpConnectionManager {
        stat_prefix: "placeholder".to_string(),
        route_specifier: Some(RouteSpecifier::RouteConfig(route_config)),
        ..Default::default()
    };
    let typed_config = protobuf::Any::from_msg(&hcm).map_err(|e| Error::FilterEncode {
        listener: "placeholder_listener".to_string(),
        filter: HCM_FILTER_NAME.to_string(),
        source: e,
    })?;

    let listener = xds_listener::Listener {
        name: "placeholder_listener".to_string(),
        address: Some(xds_core::Address {
            address: Some(xds_core::address::Address::SocketAddress(
                xds_core::SocketAddress {
                    address: "0.0.0.0".to_string(),
                    port_specifier: Some(xds_core::socket_address::PortSpecifier::PortValue(8081)),
                    ..Default::default()
                },
            )),
        }),
        filter_chains: vec![xds_listener::FilterChain {
            name: "placeholder_filter_chain".to_string(),
            filters: vec![xds_listener::Filter {
                name: HCM_FILTER_NAME.to_string(),
                config_type: Some(xds_listener::filter::ConfigType::TypedConfig(typed_config)),
            }],
            ..Default::default()
        }],
        ..Default::default()
    };

    let bootstrap = Bootstrap {
        node: validation_node(),
        static_resources: StaticResources {
            listeners: vec![listener],
            clusters: Vec::new(),
            secrets: Vec::new(),
        },
    };
    Ok(serde_json::to_string(&bootstrap)?)
}

/// Replace every resolvable dynamic route reference with its inline table,
/// collecting the cluster names the inlined routes target.
///
/// Connection manager configs that claim the HCM type URL but don't decode
/// as one are an error. Chains with no connection manager, inline route
/// tables, and references to tables the snapshot doesn't carry are all left
/// exactly as they were.
fn inline_routes(
    listeners: &mut [xds_listener::Listener],
    routes: &BTreeMap<String, xds_route::RouteConfiguration>,
    required_clusters: &mut BTreeSet<String>,
) -> Result<()> {
    for listener in listeners {
        let listener_name = listener.name.clone();
        for chain in &mut listener.filter_chains {
            for filter in &mut chain.filters {
                let Some(xds_listener::filter::ConfigType::TypedConfig(typed_config)) =
                    &filter.config_type
                else {
                    continue;
                };
                if typed_config.type_url != *HCM_TYPE_URL {
                    continue;
                }

                let mut hcm: xds_http::HttpConnectionManager =
                    typed_config.to_msg().map_err(|e| Error::FilterType {
                        listener: listener_name.clone(),
                        filter: filter.name.clone(),
                        source: e,
                    })?;

                let route_config_name = match &hcm.route_specifier {
                    Some(RouteSpecifier::Rds(rds)) if !rds.route_config_name.is_empty() => {
                        rds.route_config_name.clone()
                    }
                    _ => continue,
                };
                let Some(route_config) = routes.get(&route_config_name) else {
                    debug!(
                        listener = %listener_name,
                        route_config = %route_config_name,
                        "route table is not in the snapshot, keeping the dynamic reference"
                    );
                    continue;
                };

                required_clusters.extend(routed_clusters(route_config));

                hcm.route_specifier = Some(RouteSpecifier::RouteConfig(route_config.clone()));
                let typed_config =
                    protobuf::Any::from_msg(&hcm).map_err(|e| Error::FilterEncode {
                        listener: listener_name.clone(),
                        filter: filter.name.clone(),
                        source: e,
                    })?;
                filter.config_type =
                    Some(xds_listener::filter::ConfigType::TypedConfig(typed_config));
            }
        }
    }

    Ok(())
}

// Every cluster named by a route action in this table, in both the
// single-cluster and weighted forms.
fn routed_clusters(route_config: &xds_route::RouteConfiguration) -> BTreeSet<String> {
    let mut clusters = BTreeSet::new();

    for vhost in &route_config.virtual_hosts {
        for route in &vhost.routes {
            let Some(xds_route::route::Action::Route(action)) = &route.action else {
                continue;
            };
            match &action.cluster_specifier {
                Some(ClusterSpecifier::Cluster(cluster)) if !cluster.is_empty() => {
                    clusters.insert(cluster.clone());
                }
                Some(ClusterSpecifier::WeightedClusters(weighted)) => {
                    for weighted_cluster in &weighted.clusters {
                        clusters.insert(weighted_cluster.name.clone());
                    }
                }
                _ => (),
            }
        }
    }

    clusters
}

/// Give every EDS cluster with a matching load assignment its endpoints
/// inline, and mark every cluster in the snapshot as accounted for.
///
/// Load assignments are keyed by the EDS service name when one is set and
/// by the cluster's own name otherwise. A cluster whose assignment isn't in
/// the snapshot keeps its EDS config untouched.
fn inline_endpoints(
    clusters: &mut [xds_cluster::Cluster],
    endpoints: &BTreeMap<String, xds_endpoint::ClusterLoadAssignment>,
    required_clusters: &mut BTreeSet<String>,
) {
    for cluster in clusters {
        required_clusters.remove(&cluster.name);

        let eds_key = match &cluster.eds_cluster_config {
            Some(eds) if !eds.service_name.is_empty() => eds.service_name.clone(),
            Some(_) => cluster.name.clone(),
            None => continue,
        };
        let Some(load_assignment) = endpoints.get(&eds_key) else {
            continue;
        };

        cluster.load_assignment = Some(load_assignment.clone());
        cluster.eds_cluster_config = None;
        // a static bootstrap can't carry an EDS cluster, and the proxy
        // rejects inline assignments on one. strict DNS re-resolves the
        // same hosts the assignment named.
        cluster.cluster_discovery_type = Some(xds_cluster::cluster::ClusterDiscoveryType::Type(
            xds_cluster::cluster::DiscoveryType::StrictDns as i32,
        ));
    }
}

// A named stand-in for a cluster the routes target but the snapshot doesn't
// define. The proxy accepts the config and fails requests to it at runtime.
fn blackhole_cluster(name: &str) -> xds_cluster::Cluster {
    xds_cluster::Cluster {
        name: name.to_string(),
        cluster_discovery_type: Some(xds_cluster::cluster::ClusterDiscoveryType::Type(
            xds_cluster::cluster::DiscoveryType::Static as i32,
        )),
        load_assignment: Some(xds_endpoint::ClusterLoadAssignment {
            cluster_name: name.to_string(),
            endpoints: Vec::new(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod test {
    use serde_json::{json, Value};

    use super::*;
    use crate::xds::test::*;
    use crate::xds::ResourceType;

    // The artifact is protojson: embedded Any values serialize in their
    // `@type`-expanded form, which the plain Any deserializer does not read
    // back. Assertions compare the parsed document against the protojson
    // serialization of the expected resources instead of round-tripping.
    fn artifact_json(snapshot: &ConfigSnapshot) -> Value {
        serde_json::from_str(&from_snapshot(snapshot).unwrap()).unwrap()
    }

    fn to_json<T: Serialize>(value: &T) -> Value {
        serde_json::to_value(value).unwrap()
    }

    fn strict_dns_cluster(
        name: &str,
        load_assignment: xds_endpoint::ClusterLoadAssignment,
    ) -> xds_cluster::Cluster {
        xds_cluster::Cluster {
            name: name.to_string(),
            cluster_discovery_type: Some(xds_cluster::cluster::ClusterDiscoveryType::Type(
                xds_cluster::cluster::DiscoveryType::StrictDns as i32,
            )),
            load_assignment: Some(load_assignment),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_snapshot_inlines_routes_and_endpoints() {
        let routes = route_config!(
            "foo-routes",
            [vhost!(
                "default",
                ["*"],
                [route_to_cluster("/foo", "foo"), route_to_cluster("/bar", "bar")],
            )],
        );

        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_cluster(eds_cluster("foo", "foo-eds"));
        snapshot.put_endpoints(cluster_load_assignment(
            "foo-eds",
            vec![lb_endpoint("10.0.0.1", 8080)],
        ));
        snapshot.put_route(routes.clone());
        snapshot.put_listener(listener!("gateway-proxy", rds = "foo-routes"));

        let bootstrap = artifact_json(&snapshot);

        assert_eq!(bootstrap["node"]["id"], "validation-node-id");
        assert_eq!(bootstrap["node"]["cluster"], "validation-cluster");

        // the dynamic route reference became an inline table
        assert_eq!(
            bootstrap["static_resources"]["listeners"],
            to_json(&[listener!("gateway-proxy", inline = routes)]),
        );

        // "foo" got its endpoints inline, "bar" was missing and became a
        // blackhole appended after the defined clusters
        assert_eq!(
            bootstrap["static_resources"]["clusters"],
            to_json(&[
                strict_dns_cluster(
                    "foo",
                    cluster_load_assignment("foo-eds", vec![lb_endpoint("10.0.0.1", 8080)]),
                ),
                blackhole_cluster("bar"),
            ]),
        );
    }

    #[test]
    fn test_from_snapshot_resolves_endpoints_by_cluster_name() {
        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_cluster(eds_cluster("web", ""));
        snapshot.put_endpoints(cluster_load_assignment(
            "web",
            vec![lb_endpoint("10.0.0.2", 80)],
        ));

        let bootstrap = artifact_json(&snapshot);

        assert_eq!(
            bootstrap["static_resources"]["clusters"],
            to_json(&[strict_dns_cluster(
                "web",
                cluster_load_assignment("web", vec![lb_endpoint("10.0.0.2", 80)]),
            )]),
        );
    }

    #[test]
    fn test_from_snapshot_keeps_unresolved_eds_clusters() {
        let cluster = eds_cluster("lonely", "lonely-eds");

        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_cluster(cluster.clone());

        let bootstrap = artifact_json(&snapshot);

        // no endpoints to inline, so the cluster rides through untouched
        assert_eq!(
            bootstrap["static_resources"]["clusters"],
            to_json(&[cluster]),
        );
    }

    #[test]
    fn test_from_snapshot_is_idempotent_on_static_input() {
        let listener = listener!(
            "static-listener",
            inline = route_config!(
                "local",
                [vhost!("default", ["*"], [route_to_cluster("/", "static-backend")])],
            ),
        );
        let cluster = static_cluster(
            "static-backend",
            cluster_load_assignment("static-backend", vec![lb_endpoint("127.0.0.1", 9000)]),
        );

        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_listener(listener.clone());
        snapshot.put_cluster(cluster.clone());

        let bootstrap = artifact_json(&snapshot);

        assert_eq!(
            bootstrap["static_resources"]["listeners"],
            to_json(&[listener]),
        );
        assert_eq!(
            bootstrap["static_resources"]["clusters"],
            to_json(&[cluster]),
        );
        assert_eq!(bootstrap["static_resources"]["secrets"], json!([]));
    }

    #[test]
    fn test_from_snapshot_does_not_mutate_input() {
        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_listener(listener!("gw", rds = "gw-routes"));
        snapshot.put_route(route_config!(
            "gw-routes",
            [vhost!("default", ["*"], [route_to_cluster("/", "missing")])],
        ));
        snapshot.put_cluster(eds_cluster("present", "present-eds"));
        snapshot.put_endpoints(cluster_load_assignment(
            "present-eds",
            vec![lb_endpoint("10.1.1.1", 443)],
        ));
        snapshot.put_secret(tls_secret());
        snapshot.set_version(ResourceType::Listener, "v1");

        let before = snapshot.clone();
        from_snapshot(&snapshot).unwrap();

        assert_eq!(snapshot, before);
    }

    #[test]
    fn test_blackhole_clusters_are_deduplicated_and_sorted() {
        let existing = static_cluster("existing", cluster_load_assignment("existing", vec![]));

        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_listener(listener!("gw", rds = "gw-routes"));
        snapshot.put_route(route_config!(
            "gw-routes",
            [vhost!(
                "default",
                ["*"],
                [
                    route_to_cluster("/a", "zeta"),
                    route_to_cluster("/b", "zeta"),
                    route_to_weighted("/c", &[("zeta", 90), ("alpha", 10)]),
                ],
            )],
        ));
        snapshot.put_cluster(existing.clone());

        let bootstrap = artifact_json(&snapshot);

        // one blackhole per missing name, after the defined clusters
        assert_eq!(
            bootstrap["static_resources"]["clusters"],
            to_json(&[existing, blackhole_cluster("alpha"), blackhole_cluster("zeta")]),
        );
    }

    #[test]
    fn test_chains_without_hcm_pass_through() {
        let tcp_listener = xds_listener::Listener {
            name: "tcp".to_string(),
            address: Some(socket_address("0.0.0.0", 9000)),
            filter_chains: vec![tcp_chain()],
            ..Default::default()
        };

        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_listener(tcp_listener.clone());

        let bootstrap = artifact_json(&snapshot);

        assert_eq!(
            bootstrap["static_resources"]["listeners"],
            to_json(&[tcp_listener]),
        );
        assert_eq!(bootstrap["static_resources"]["clusters"], json!([]));
    }

    #[test]
    fn test_missing_route_table_keeps_the_reference() {
        let waiting = listener!("gw", rds = "not-produced-yet");
        let unset = listener!("gw-unset", rds = "");

        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_listener(waiting.clone());
        snapshot.put_listener(unset.clone());

        let bootstrap = artifact_json(&snapshot);

        assert_eq!(
            bootstrap["static_resources"]["listeners"],
            to_json(&[waiting, unset]),
        );
        assert_eq!(bootstrap["static_resources"]["clusters"], json!([]));
    }

    #[test]
    fn test_hcm_with_undecodable_config_errors() {
        let listener = xds_listener::Listener {
            name: "broken".to_string(),
            address: Some(socket_address("0.0.0.0", 8080)),
            filter_chains: vec![xds_listener::FilterChain {
                filters: vec![xds_listener::Filter {
                    name: HCM_FILTER_NAME.to_string(),
                    config_type: Some(xds_listener::filter::ConfigType::TypedConfig(
                        protobuf::Any {
                            type_url: HCM_TYPE_URL.clone(),
                            value: vec![0xff, 0xff, 0xff],
                        },
                    )),
                }],
                ..Default::default()
            }],
            ..Default::default()
        };

        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_listener(listener);

        let err = from_snapshot(&snapshot).unwrap_err();
        assert!(matches!(err, Error::FilterType { .. }));
    }

    #[test]
    fn test_secrets_are_carried_through() {
        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_secret(tls_secret());

        let bootstrap = artifact_json(&snapshot);

        assert_eq!(
            bootstrap["static_resources"]["secrets"],
            to_json(&[tls_secret()]),
        );
        assert_eq!(
            bootstrap["static_resources"]["secrets"][0]["name"],
            "gateway-tls",
        );
    }

    #[test]
    fn test_bootstrap_is_valid_yaml() {
        let mut snapshot = ConfigSnapshot::new();
        snapshot.put_listener(listener!("gw", rds = "gw-routes"));
        snapshot.put_route(route_config!(
            "gw-routes",
            [vhost!("default", ["*"], [route_to_cluster("/", "web")])],
        ));

        let artifact = from_snapshot(&snapshot).unwrap();

        let as_yaml: serde_yml::Value = serde_yml::from_str(&artifact).unwrap();
        assert!(as_yaml.get("node").is_some());
        assert!(as_yaml.get("static_resources").is_some());
    }

    #[test]
    fn test_from_http_filter_wraps_config() {
        let config = protobuf::Any {
            type_url: "type.googleapis.com/envoy.extensions.filters.http.fault.v3.HTTPFault"
                .to_string(),
            value: b"\x0a\x02\x08\x01".to_vec(),
        };

        let artifact = from_http_filter("my-custom-filter", &config).unwrap();
        let bootstrap: Value = serde_json::from_str(&artifact).unwrap();

        assert_eq!(bootstrap["static_resources"]["clusters"], json!([]));
        assert_eq!(bootstrap["static_resources"]["secrets"], json!([]));

        let listeners = bootstrap["static_resources"]["listeners"]
            .as_array()
            .unwrap();
        assert_eq!(listeners.len(), 1);
        assert_eq!(listeners[0]["name"], "placeholder_listener");
        assert_eq!(
            listeners[0]["address"],
            to_json(&socket_address("0.0.0.0", 8081)),
        );

        let chain = &listeners[0]["filter_chains"][0];
        assert_eq!(chain["name"], "placeholder_filter_chain");
        assert_eq!(chain["filters"][0]["name"], HCM_FILTER_NAME);

        let hcm = &chain["filters"][0]["typed_config"];
        assert_eq!(hcm["@type"], *HCM_TYPE_URL);
        assert_eq!(hcm["stat_prefix"], "placeholder");

        let vhost = &hcm["route_config"]["virtual_hosts"][0];
        assert_eq!(vhost["name"], "placeholder_host");
        assert_eq!(vhost["domains"], json!(["*"]));
        // the fault config is not a well-known type, so it stays an opaque
        // @type + value pair
        assert_eq!(
            vhost["typed_per_filter_config"]["my-custom-filter"]["@type"],
            config.type_url,
        );
    }
}
