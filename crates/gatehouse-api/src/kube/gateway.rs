use gateway_api::apis::experimental::gateways::{
    Gateway, GatewayListeners, GatewayListenersAllowedRoutes,
    GatewayListenersAllowedRoutesKinds, GatewayListenersAllowedRoutesNamespaces,
    GatewayListenersAllowedRoutesNamespacesFrom,
    GatewayListenersAllowedRoutesNamespacesSelector,
    GatewayListenersAllowedRoutesNamespacesSelectorMatchExpressions, GatewayListenersTls,
    GatewayListenersTlsCertificateRefs, GatewayListenersTlsMode,
};

use super::{metadata_name, metadata_namespace, option_from_kube, port_from_kube, vec_from_kube};
use crate::error::{Error, ErrorContext};
use crate::gateway::{
    AllowedRoutes, FromNamespaces, Listener, ListenerTls, Protocol, RouteNamespaces, SecretRef,
    TlsMode,
};
use crate::shared::{
    GroupKind, LabelSelector, LabelSelectorRequirement, SelectorOperator, GATEWAY_API_GROUP,
};

impl TryFrom<&Gateway> for crate::gateway::Gateway {
    type Error = Error;

    fn try_from(gateway: &Gateway) -> Result<Self, Error> {
        let name = metadata_name(&gateway.metadata).with_field("metadata")?;
        let namespace = metadata_namespace(&gateway.metadata).with_field("metadata")?;

        let listeners = gateway
            .spec
            .listeners
            .iter()
            .enumerate()
            .map(|(i, listener)| listener.try_into().with_index(i))
            .collect::<Result<Vec<_>, _>>()
            .with_fields("spec", "listeners")?;

        Ok(crate::gateway::Gateway {
            name,
            namespace,
            listeners,
        })
    }
}

impl TryFrom<&GatewayListeners> for Listener {
    type Error = Error;

    fn try_from(listener: &GatewayListeners) -> Result<Self, Error> {
        Ok(Listener {
            name: listener.name.clone(),
            protocol: parse_protocol(&listener.protocol).with_field("protocol")?,
            port: port_from_kube(listener.port).with_field("port")?,
            hostname: listener.hostname.clone(),
            allowed_routes: option_from_kube!(listener.allowed_routes)
                .with_field("allowedRoutes")?,
            tls: option_from_kube!(listener.tls).with_field("tls")?,
        })
    }
}

fn parse_protocol(protocol: &str) -> Result<Protocol, Error> {
    match protocol {
        "HTTP" => Ok(Protocol::Http),
        "HTTPS" => Ok(Protocol::Https),
        "TLS" => Ok(Protocol::Tls),
        "TCP" => Ok(Protocol::Tcp),
        "UDP" => Ok(Protocol::Udp),
        other => Err(Error::new(format!("unrecognized protocol: {other}"))),
    }
}

impl TryFrom<&GatewayListenersAllowedRoutes> for AllowedRoutes {
    type Error = Error;

    fn try_from(allowed: &GatewayListenersAllowedRoutes) -> Result<Self, Error> {
        Ok(AllowedRoutes {
            namespaces: option_from_kube!(allowed.namespaces).with_field("namespaces")?,
            kinds: vec_from_kube!(allowed.kinds).with_field("kinds")?,
        })
    }
}

impl TryFrom<&GatewayListenersAllowedRoutesKinds> for GroupKind {
    type Error = Error;

    fn try_from(kind: &GatewayListenersAllowedRoutesKinds) -> Result<Self, Error> {
        // an unset group is the Gateway API group. the empty string stays
        // empty: that's an explicit reference to the core group.
        let group = match &kind.group {
            Some(group) => group.clone(),
            None => GATEWAY_API_GROUP.to_string(),
        };

        Ok(GroupKind {
            group,
            kind: kind.kind.clone(),
        })
    }
}

impl TryFrom<&GatewayListenersAllowedRoutesNamespaces> for RouteNamespaces {
    type Error = Error;

    fn try_from(namespaces: &GatewayListenersAllowedRoutesNamespaces) -> Result<Self, Error> {
        let from = namespaces.from.as_ref().map(|from| match from {
            GatewayListenersAllowedRoutesNamespacesFrom::All => FromNamespaces::All,
            GatewayListenersAllowedRoutesNamespacesFrom::Selector => FromNamespaces::Selector,
            GatewayListenersAllowedRoutesNamespacesFrom::Same => FromNamespaces::Same,
        });

        Ok(RouteNamespaces {
            from,
            selector: option_from_kube!(namespaces.selector).with_field("selector")?,
        })
    }
}

impl TryFrom<&GatewayListenersAllowedRoutesNamespacesSelector> for LabelSelector {
    type Error = Error;

    fn try_from(
        selector: &GatewayListenersAllowedRoutesNamespacesSelector,
    ) -> Result<Self, Error> {
        Ok(LabelSelector {
            match_labels: selector.match_labels.clone().unwrap_or_default(),
            match_expressions: vec_from_kube!(selector.match_expressions)
                .with_field("matchExpressions")?,
        })
    }
}

impl TryFrom<&GatewayListenersAllowedRoutesNamespacesSelectorMatchExpressions>
    for LabelSelectorRequirement
{
    type Error = Error;

    fn try_from(
        requirement: &GatewayListenersAllowedRoutesNamespacesSelectorMatchExpressions,
    ) -> Result<Self, Error> {
        let operator = match requirement.operator.as_str() {
            "In" => SelectorOperator::In,
            "NotIn" => SelectorOperator::NotIn,
            "Exists" => SelectorOperator::Exists,
            "DoesNotExist" => SelectorOperator::DoesNotExist,
            other => {
                return Err(Error::new(format!("unrecognized operator: {other}"))
                    .with_field("operator"))
            }
        };

        Ok(LabelSelectorRequirement {
            key: requirement.key.clone(),
            operator,
            values: requirement.values.clone().unwrap_or_default(),
        })
    }
}

impl TryFrom<&GatewayListenersTls> for ListenerTls {
    type Error = Error;

    fn try_from(tls: &GatewayListenersTls) -> Result<Self, Error> {
        let mode = tls.mode.as_ref().map(|mode| match mode {
            GatewayListenersTlsMode::Terminate => TlsMode::Terminate,
            GatewayListenersTlsMode::Passthrough => TlsMode::Passthrough,
        });

        Ok(ListenerTls {
            mode,
            certificate_refs: vec_from_kube!(tls.certificate_refs)
                .with_field("certificateRefs")?,
        })
    }
}

impl TryFrom<&GatewayListenersTlsCertificateRefs> for SecretRef {
    type Error = Error;

    fn try_from(cert_ref: &GatewayListenersTlsCertificateRefs) -> Result<Self, Error> {
        Ok(SecretRef {
            group: cert_ref.group.clone().unwrap_or_default(),
            kind: cert_ref.kind.clone(),
            name: cert_ref.name.clone(),
            namespace: cert_ref.namespace.clone(),
        })
    }
}

#[cfg(test)]
mod test {
    use gateway_api::apis::experimental::gateways::Gateway;

    use crate::gateway::{FromNamespaces, Protocol};

    #[test]
    fn test_gateway_from_yml() {
        let gateway_yaml = r#"
apiVersion: gateway.networking.k8s.io/v1
kind: Gateway
metadata:
  name: edge
  namespace: infra
spec:
  gatewayClassName: gatehouse
  listeners:
  - name: http
    protocol: HTTP
    port: 80
  - name: https
    protocol: HTTPS
    port: 443
    hostname: "*.example.com"
    allowedRoutes:
      namespaces:
        from: Selector
        selector:
          matchLabels:
            shared-gateway-access: "true"
    tls:
      mode: Terminate
      certificateRefs:
      - name: wildcard-cert
        namespace: certs
        "#;

        let kube_gateway: Gateway = serde_yml::from_str(gateway_yaml).unwrap();
        let gateway = crate::gateway::Gateway::try_from(&kube_gateway).unwrap();

        assert_eq!(gateway.qualified_name(), "infra/edge");
        assert_eq!(gateway.listeners.len(), 2);

        let http = &gateway.listeners[0];
        assert_eq!(http.protocol, Protocol::Http);
        assert_eq!(http.port, 80);
        assert_eq!(http.hostname, None);

        let https = &gateway.listeners[1];
        assert_eq!(https.protocol, Protocol::Https);
        assert_eq!(https.hostname.as_deref(), Some("*.example.com"));

        let namespaces = https
            .allowed_routes
            .as_ref()
            .and_then(|a| a.namespaces.as_ref())
            .unwrap();
        assert_eq!(namespaces.from, Some(FromNamespaces::Selector));
        assert!(namespaces.selector.is_some());

        let tls = https.tls.as_ref().unwrap();
        assert_eq!(tls.certificate_refs[0].name, "wildcard-cert");
        assert_eq!(tls.certificate_refs[0].namespace.as_deref(), Some("certs"));
    }

    #[test]
    fn test_unknown_protocol_is_an_error() {
        let gateway_yaml = r#"
metadata:
  name: edge
  namespace: infra
spec:
  gatewayClassName: gatehouse
  listeners:
  - name: funky
    protocol: CARRIER-PIGEON
    port: 9
        "#;

        let kube_gateway: Gateway = serde_yml::from_str(gateway_yaml).unwrap();
        let err = crate::gateway::Gateway::try_from(&kube_gateway).unwrap_err();
        assert_eq!(err.path(), "spec.listeners[0].protocol");
    }
}
