use gatehouse_api::GroupKind;

/// A `Result` alias where the `Err` case is `gatehouse_core::Error`.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A cross-namespace reference that no ReferenceGrant in the target
    /// namespace allows. Distinct from [Error::NotFound]: the target was
    /// never looked up.
    #[error("no ReferenceGrant in \"{namespace}\" allows {from} to reference {to} \"{name}\"")]
    MissingReferenceGrant {
        from: GroupKind,
        to: GroupKind,
        namespace: String,
        name: String,
    },

    #[error("{group_kind} \"{namespace}/{name}\" not found")]
    NotFound {
        group_kind: GroupKind,
        namespace: String,
        name: String,
    },

    #[error("gateway \"{gateway}\" has more than one listener named \"{listener}\"")]
    DuplicateListener { gateway: String, listener: String },

    #[error("listener \"{listener}\" allows namespaces by selector but has no selector")]
    MissingSelector { listener: String },

    #[error("references to {group_kind} cannot be resolved")]
    UnsupportedKind { group_kind: GroupKind },

    #[error("invalid {type_url} resource \"{name}\"")]
    InvalidResource {
        type_url: String,
        name: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("unknown resource type: {type_url}")]
    UnknownResourceType { type_url: String },

    /// A filter claimed a type by URL but its payload doesn't decode as that
    /// type. The URL match alone is never trusted.
    #[error("filter \"{filter}\" on listener \"{listener}\" does not decode as its declared type")]
    FilterType {
        listener: String,
        filter: String,
        #[source]
        source: prost::DecodeError,
    },

    #[error("failed to re-encode filter \"{filter}\" on listener \"{listener}\"")]
    FilterEncode {
        listener: String,
        filter: String,
        #[source]
        source: prost::EncodeError,
    },

    #[error("failed to serialize bootstrap")]
    Serialize(#[from] serde_json::Error),
}

impl Error {
    /// Whether this is the missing-grant sentinel. Callers use this to tell
    /// "add a ReferenceGrant" apart from "check the name".
    pub fn is_missing_reference_grant(&self) -> bool {
        matches!(self, Error::MissingReferenceGrant { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
