use gateway_api::apis::experimental::referencegrants::{
    ReferenceGrant, ReferenceGrantFrom, ReferenceGrantTo,
};

use super::{metadata_name, metadata_namespace};
use crate::error::{Error, ErrorContext};
use crate::grant::{GrantFrom, GrantTo};

impl TryFrom<&ReferenceGrant> for crate::grant::ReferenceGrant {
    type Error = Error;

    fn try_from(grant: &ReferenceGrant) -> Result<Self, Error> {
        let name = metadata_name(&grant.metadata).with_field("metadata")?;
        let namespace = metadata_namespace(&grant.metadata).with_field("metadata")?;

        Ok(crate::grant::ReferenceGrant {
            name,
            namespace,
            from: grant.spec.from.iter().map(GrantFrom::from).collect(),
            to: grant.spec.to.iter().map(GrantTo::from).collect(),
        })
    }
}

impl From<&ReferenceGrantFrom> for GrantFrom {
    fn from(from: &ReferenceGrantFrom) -> Self {
        GrantFrom {
            group: from.group.clone(),
            kind: from.kind.clone(),
            namespace: from.namespace.clone(),
        }
    }
}

impl From<&ReferenceGrantTo> for GrantTo {
    fn from(to: &ReferenceGrantTo) -> Self {
        GrantTo {
            group: to.group.clone(),
            kind: to.kind.clone(),
            name: to.name.clone(),
        }
    }
}
