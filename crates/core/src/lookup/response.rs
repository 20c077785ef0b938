use serde::Deserialize;
use serde_json::Value;

use super::TraderPrice;
use crate::errors::LookupFailure;

/// Top level of a GraphQL response. Every field is optional so that shape
/// problems surface as a [`LookupFailure`] kind instead of a decode error.
#[derive(Debug, Default, Deserialize)]
struct ResponseEnvelope {
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawTraderPrice {
    trader: RawTrader,
    price: f64,
    currency: String,
}

#[derive(Debug, Deserialize)]
struct RawTrader {
    name: String,
}

/// Decodes the price API's response body into the first item's trader prices.
///
/// Upstream order is preserved. A body that is not JSON at all is treated like
/// one without `data`.
pub fn parse_trader_prices(body: &str) -> Result<Vec<TraderPrice>, LookupFailure> {
    // serde would also read a top-level array positionally into the envelope
    let envelope = match serde_json::from_str::<Value>(body) {
        Ok(top @ Value::Object(_)) => ResponseEnvelope::deserialize(top).unwrap_or_default(),
        _ => ResponseEnvelope::default(),
    };

    let data = match envelope.data {
        Some(Value::Object(data)) => data,
        _ => return Err(LookupFailure::invalid_response_format()),
    };

    let first_item = match data.get("items") {
        Some(Value::Array(items)) => items.first().ok_or_else(LookupFailure::no_items_found)?,
        _ => return Err(LookupFailure::no_items_found()),
    };

    let entries = match first_item.get("traderPrices") {
        Some(Value::Array(entries)) => entries,
        _ => return Err(LookupFailure::no_trader_prices()),
    };

    entries.iter().enumerate().map(|(index, entry)| decode_entry(index, entry)).collect()
}

fn decode_entry(index: usize, entry: &Value) -> Result<TraderPrice, LookupFailure> {
    let raw = RawTraderPrice::deserialize(entry)
        .map_err(|error| LookupFailure::malformed_entry(index, error))?;

    if !raw.price.is_finite() || raw.price < 0.0 {
        return Err(LookupFailure::malformed_entry(
            index,
            format!("price {} is not a non-negative number", raw.price),
        ));
    }

    Ok(TraderPrice {
        trader_name: raw.trader.name,
        // normalises -0.0
        price: raw.price + 0.0,
        currency: raw.currency,
    })
}
