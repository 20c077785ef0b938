use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::{PriceApi, QueryBody};
use crate::config::PriceApiConfig;
use crate::errors::UpstreamError;

/// [`PriceApi`] backed by a shared reqwest client.
///
/// HTTP status codes are not inspected: whatever body comes back goes to the
/// parser, which rejects error pages on shape alone.
#[derive(Clone, Debug)]
pub struct HttpPriceApi {
    client: Client,
    endpoint: String,
}

impl HttpPriceApi {
    pub fn new(config: &PriceApiConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("pricebot/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| UpstreamError::ClientBuild(error.to_string()))?;

        Ok(Self { client, endpoint: config.endpoint.clone() })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl PriceApi for HttpPriceApi {
    async fn post_query(&self, body: &QueryBody) -> Result<String, UpstreamError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(body)
            .send()
            .await
            .map_err(|error| UpstreamError::Request(error.to_string()))?;

        debug!(
            event_name = "lookup.upstream.response",
            endpoint = %self.endpoint,
            status = %response.status(),
            "price api responded"
        );

        response.text().await.map_err(|error| UpstreamError::ReadBody(error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::HttpPriceApi;
    use crate::config::PriceApiConfig;
    use crate::errors::LookupErrorKind;
    use crate::lookup::{LookupResult, PriceLookupService};

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_failure() {
        // nothing listens on the loopback discard port
        let api = HttpPriceApi::new(&PriceApiConfig {
            endpoint: "http://127.0.0.1:9/graphql".to_owned(),
            timeout_secs: 2,
        })
        .expect("client should build");
        let service = PriceLookupService::new(api);

        let result = service.lookup("bitcoin").await;

        assert!(
            matches!(result, LookupResult::Failure(ref failure) if failure.kind == LookupErrorKind::Transport),
            "unexpected result: {result:?}"
        );
    }
}
