use k8s_openapi::api::core::v1::{Namespace, Secret, Service};

use super::{metadata_name, metadata_namespace};
use crate::error::{Error, ErrorContext};

impl TryFrom<&Namespace> for crate::objects::Namespace {
    type Error = Error;

    fn try_from(namespace: &Namespace) -> Result<Self, Error> {
        Ok(crate::objects::Namespace {
            name: metadata_name(&namespace.metadata).with_field("metadata")?,
            labels: namespace.metadata.labels.clone().unwrap_or_default(),
        })
    }
}

impl TryFrom<&Service> for crate::objects::Service {
    type Error = Error;

    fn try_from(service: &Service) -> Result<Self, Error> {
        Ok(crate::objects::Service {
            name: metadata_name(&service.metadata).with_field("metadata")?,
            namespace: metadata_namespace(&service.metadata).with_field("metadata")?,
        })
    }
}

impl TryFrom<&Secret> for crate::objects::Secret {
    type Error = Error;

    fn try_from(secret: &Secret) -> Result<Self, Error> {
        Ok(crate::objects::Secret {
            name: metadata_name(&secret.metadata).with_field("metadata")?,
            namespace: metadata_namespace(&secret.metadata).with_field("metadata")?,
        })
    }
}
