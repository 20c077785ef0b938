//! Price lookup against the upstream game-data API.
//!
//! A lookup is one POST of a GraphQL document followed by a typed parse of
//! the reply. Nothing is cached or retried; two identical lookups against the
//! same upstream answer produce identical results.

mod http;
mod query;
mod render;
mod response;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::errors::{LookupFailure, UpstreamError};

pub use http::HttpPriceApi;
pub use query::{build_item_query, graphql_string_literal, QueryBody};
pub use render::{render_price_line, render_prices, render_reply};
pub use response::parse_trader_prices;

#[derive(Clone, Debug, PartialEq)]
pub struct TraderPrice {
    pub trader_name: String,
    pub price: f64,
    pub currency: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LookupResult {
    Success { item_name: String, prices: Vec<TraderPrice> },
    Failure(LookupFailure),
}

impl LookupResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Transport seam for the price API: send a query body, get the raw response text.
#[async_trait]
pub trait PriceApi: Send + Sync {
    async fn post_query(&self, body: &QueryBody) -> Result<String, UpstreamError>;
}

pub struct PriceLookupService<A> {
    api: A,
}

impl<A> PriceLookupService<A>
where
    A: PriceApi,
{
    pub fn new(api: A) -> Self {
        Self { api }
    }

    pub async fn lookup(&self, item_name: &str) -> LookupResult {
        match self.fetch_prices(item_name).await {
            Ok(prices) => {
                info!(
                    event_name = "lookup.completed",
                    item_name,
                    price_count = prices.len(),
                    "price lookup completed"
                );
                LookupResult::Success { item_name: item_name.to_owned(), prices }
            }
            Err(failure) => {
                warn!(
                    event_name = "lookup.failed",
                    item_name,
                    kind = %failure.kind,
                    detail = %failure.detail,
                    "price lookup failed"
                );
                LookupResult::Failure(failure)
            }
        }
    }

    async fn fetch_prices(&self, item_name: &str) -> Result<Vec<TraderPrice>, LookupFailure> {
        let body = QueryBody::for_item(item_name);
        debug!(event_name = "lookup.upstream.request", item_name, "sending price query");

        let response = self.api.post_query(&body).await?;
        parse_trader_prices(&response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::{render_reply, LookupResult, PriceApi, PriceLookupService, QueryBody, TraderPrice};
    use crate::errors::{LookupErrorKind, UpstreamError};

    const PRAPOR_BITCOIN: &str = r#"{"data":{"items":[{"traderPrices":[{"trader":{"name":"Prapor"},"price":5000,"currency":"RUB"}]}]}}"#;

    struct FixedResponseApi {
        response: Result<String, UpstreamError>,
        seen_queries: Mutex<Vec<String>>,
    }

    impl FixedResponseApi {
        fn ok(body: &str) -> Self {
            Self { response: Ok(body.to_owned()), seen_queries: Mutex::new(Vec::new()) }
        }

        fn err(error: UpstreamError) -> Self {
            Self { response: Err(error), seen_queries: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl PriceApi for FixedResponseApi {
        async fn post_query(&self, body: &QueryBody) -> Result<String, UpstreamError> {
            self.seen_queries.lock().expect("query log lock").push(body.query.clone());
            self.response.clone()
        }
    }

    #[tokio::test]
    async fn successful_lookup_renders_trader_line() {
        let service = PriceLookupService::new(FixedResponseApi::ok(PRAPOR_BITCOIN));

        let result = service.lookup("bitcoin").await;

        assert_eq!(
            result,
            LookupResult::Success {
                item_name: "bitcoin".to_owned(),
                prices: vec![TraderPrice {
                    trader_name: "Prapor".to_owned(),
                    price: 5000.0,
                    currency: "RUB".to_owned(),
                }],
            }
        );
        assert_eq!(render_reply(&result), "Price of bitcoin:\nTrader: Prapor, Price: 5000 RUB");
    }

    #[tokio::test]
    async fn empty_item_list_is_no_items_found() {
        let service = PriceLookupService::new(FixedResponseApi::ok(r#"{"data":{"items":[]}}"#));

        let result = service.lookup("nonexistent").await;

        assert!(matches!(
            result,
            LookupResult::Failure(ref failure) if failure.kind == LookupErrorKind::NoItemsFound
        ));
    }

    #[tokio::test]
    async fn missing_data_is_invalid_response_format() {
        let service =
            PriceLookupService::new(FixedResponseApi::ok(r#"{"errors":[{"message":"x"}]}"#));

        let result = service.lookup("bitcoin").await;

        assert!(matches!(
            result,
            LookupResult::Failure(ref failure)
                if failure.kind == LookupErrorKind::InvalidResponseFormat
                    && failure.detail == "Invalid response format"
        ));
    }

    #[tokio::test]
    async fn transport_error_keeps_underlying_text_in_detail() {
        let service = PriceLookupService::new(FixedResponseApi::err(UpstreamError::Request(
            "operation timed out".to_owned(),
        )));

        let result = service.lookup("bitcoin").await;

        let LookupResult::Failure(failure) = result else {
            panic!("expected a failure");
        };
        assert_eq!(failure.kind, LookupErrorKind::Transport);
        assert!(failure.detail.contains("operation timed out"));
    }

    #[tokio::test]
    async fn identical_lookups_yield_identical_results() {
        let service = PriceLookupService::new(FixedResponseApi::ok(PRAPOR_BITCOIN));

        let first = service.lookup("bitcoin").await;
        let second = service.lookup("bitcoin").await;

        assert_eq!(first, second);
        assert!(first.is_success());
    }

    #[tokio::test]
    async fn every_lookup_hits_upstream_and_escapes_the_name() {
        let api = FixedResponseApi::ok(r#"{"data":{"items":[]}}"#);
        let service = PriceLookupService::new(api);

        service.lookup(r#"item"name"#).await;
        service.lookup(r#"item"name"#).await;

        let queries = service.api.seen_queries.lock().expect("query log lock").clone();
        assert_eq!(queries.len(), 2, "lookups must not be cached or coalesced");
        assert!(queries[0].contains(r#"items(name: "item\"name")"#));
    }
}
