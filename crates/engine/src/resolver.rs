//! Route resolution on top of the route-config port.

use connector_core::error::{Error, Result};
use connector_core::ports::RouteConfigPort;
use connector_core::route::RouteConfig;
use std::sync::Arc;
use tracing::debug;

/// Maps `(data_type, characteristic)` to the route that serves it.
///
/// Ranking is the store's job (exact characteristic first, then priority);
/// this layer turns "no row" into a client error. No caching.
#[derive(Clone)]
pub struct RouteResolver {
    routes: Arc<dyn RouteConfigPort>,
}

impl RouteResolver {
    pub fn new(routes: Arc<dyn RouteConfigPort>) -> Self {
        Self { routes }
    }

    pub async fn resolve(&self, data_type: &str, characteristic: &str) -> Result<RouteConfig> {
        let route = self
            .routes
            .resolve_route(data_type, characteristic)
            .await?
            .ok_or_else(|| Error::RouteNotFound {
                data_type: data_type.to_string(),
                characteristic: characteristic.to_string(),
            })?;

        debug!(
            data_type,
            characteristic,
            route_key = %route.route_key,
            provider = %route.provider,
            "Resolved route"
        );
        Ok(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use connector_store::{InMemoryStore, RouteAdmin};
    use crate::test_helpers::route_rule;

    #[tokio::test]
    async fn resolves_and_reports_missing_routes() {
        let store = Arc::new(InMemoryStore::new());
        store
            .add_route(&route_rule("SUPPORT_DEFAULT", "SUPPORT", "*", "OPENAI", None))
            .await
            .unwrap();
        let resolver = RouteResolver::new(store);

        let route = resolver.resolve("SUPPORT", "ANYTHING").await.unwrap();
        assert_eq!(route.route_key, "SUPPORT_DEFAULT");

        let err = resolver.resolve("BILLING", "FAQ").await.unwrap_err();
        assert!(matches!(err, Error::RouteNotFound { .. }));
        assert!(err.is_client_error());
        assert!(err.to_string().contains("dataType=BILLING"));
    }
}
