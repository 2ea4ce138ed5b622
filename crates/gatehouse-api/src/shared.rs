//! Shared identity types: group/kind pairs and label selectors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The API group of the Kubernetes Gateway API.
pub const GATEWAY_API_GROUP: &str = "gateway.networking.k8s.io";

/// The Gateway kind.
pub const GATEWAY_KIND: &str = "Gateway";

/// The HTTPRoute kind.
pub const HTTP_ROUTE_KIND: &str = "HTTPRoute";

/// The TCPRoute kind.
pub const TCP_ROUTE_KIND: &str = "TCPRoute";

/// The UDPRoute kind.
pub const UDP_ROUTE_KIND: &str = "UDPRoute";

/// The core-group Service kind.
pub const SERVICE_KIND: &str = "Service";

/// The core-group Secret kind.
pub const SECRET_KIND: &str = "Secret";

/// An API group and kind pair identifying a type of object. The empty group is
/// the Kubernetes core group.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKind {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub group: String,
    pub kind: String,
}

impl GroupKind {
    pub fn new(group: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            kind: kind.into(),
        }
    }

    /// A kind in the core group.
    pub fn core(kind: impl Into<String>) -> Self {
        Self::new("", kind)
    }

    /// A kind in the Gateway API group.
    pub fn gateway_api(kind: impl Into<String>) -> Self {
        Self::new(GATEWAY_API_GROUP, kind)
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.group.is_empty() {
            f.write_str(&self.kind)
        } else {
            write!(f, "{}.{}", self.kind, self.group)
        }
    }
}

/// A Kubernetes label selector: a conjunction of exact-match labels and
/// set-based requirements. An empty selector matches everything.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelector {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub match_labels: BTreeMap<String, String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub match_expressions: Vec<LabelSelectorRequirement>,
}

impl LabelSelector {
    /// Whether a label set satisfies every term of this selector.
    pub fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let labels_match = self
            .match_labels
            .iter()
            .all(|(k, v)| labels.get(k) == Some(v));

        labels_match && self.match_expressions.iter().all(|req| req.matches(labels))
    }
}

/// A single set-based selector requirement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSelectorRequirement {
    pub key: String,
    pub operator: SelectorOperator,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl LabelSelectorRequirement {
    // absent keys satisfy the negative operators, same as apimachinery.
    fn matches(&self, labels: &BTreeMap<String, String>) -> bool {
        let value = labels.get(&self.key);
        match self.operator {
            SelectorOperator::In => value.is_some_and(|v| self.values.contains(v)),
            SelectorOperator::NotIn => value.map_or(true, |v| !self.values.contains(v)),
            SelectorOperator::Exists => value.is_some(),
            SelectorOperator::DoesNotExist => value.is_none(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectorOperator {
    In,
    NotIn,
    Exists,
    DoesNotExist,
}

#[cfg(test)]
mod test {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_selector_matches_everything() {
        let selector = LabelSelector::default();
        assert!(selector.matches(&BTreeMap::new()));
        assert!(selector.matches(&labels(&[("team", "edge")])));
    }

    #[test]
    fn test_match_labels() {
        let selector = LabelSelector {
            match_labels: labels(&[("team", "edge")]),
            ..Default::default()
        };

        assert!(selector.matches(&labels(&[("team", "edge"), ("env", "prod")])));
        assert!(!selector.matches(&labels(&[("team", "core")])));
        assert!(!selector.matches(&BTreeMap::new()));
    }

    #[test]
    fn test_match_expressions() {
        let selector = LabelSelector {
            match_expressions: vec![
                LabelSelectorRequirement {
                    key: "env".to_string(),
                    operator: SelectorOperator::In,
                    values: vec!["prod".to_string(), "staging".to_string()],
                },
                LabelSelectorRequirement {
                    key: "legacy".to_string(),
                    operator: SelectorOperator::DoesNotExist,
                    values: vec![],
                },
            ],
            ..Default::default()
        };

        assert!(selector.matches(&labels(&[("env", "prod")])));
        assert!(!selector.matches(&labels(&[("env", "dev")])));
        assert!(!selector.matches(&labels(&[("env", "prod"), ("legacy", "true")])));
    }

    #[test]
    fn test_not_in_with_absent_key() {
        let selector = LabelSelector {
            match_expressions: vec![LabelSelectorRequirement {
                key: "env".to_string(),
                operator: SelectorOperator::NotIn,
                values: vec!["prod".to_string()],
            }],
            ..Default::default()
        };

        assert!(selector.matches(&BTreeMap::new()));
        assert!(selector.matches(&labels(&[("env", "dev")])));
        assert!(!selector.matches(&labels(&[("env", "prod")])));
    }
}
