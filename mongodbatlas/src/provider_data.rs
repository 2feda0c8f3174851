//! Provider data structure passed to resources and data sources

use crate::api::Client;
use std::any::Any;
use std::sync::Arc;
use tfplug::types::Diagnostic;

#[derive(Clone)]
pub struct MongoDbAtlasProviderData {
    pub client: Arc<Client>,
}

impl MongoDbAtlasProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Recover the provider data handed to a resource or data source
    pub fn from_any(data: Option<Arc<dyn Any + Send + Sync>>) -> Result<Option<Self>, Diagnostic> {
        match data {
            None => Ok(None),
            Some(data) => data
                .downcast_ref::<Self>()
                .cloned()
                .map(Some)
                .ok_or_else(|| {
                    Diagnostic::error(
                        "Unexpected provider data type",
                        "Expected MongoDbAtlasProviderData. Please report this issue to the provider developers.",
                    )
                }),
        }
    }
}

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "The provider has not been configured with Atlas credentials",
    )
}
