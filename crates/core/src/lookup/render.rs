use super::{LookupResult, TraderPrice};

pub fn render_price_line(price: &TraderPrice) -> String {
    format!("Trader: {}, Price: {:.0} {}", price.trader_name, price.price, price.currency)
}

pub fn render_prices(prices: &[TraderPrice]) -> String {
    prices.iter().map(render_price_line).collect::<Vec<_>>().join("\n")
}

/// Text posted back to the channel for a finished lookup.
///
/// Entries go on their own lines rather than in one bracketed, space-separated list.
pub fn render_reply(result: &LookupResult) -> String {
    match result {
        LookupResult::Success { item_name, prices } if prices.is_empty() => {
            format!("Price of {item_name}: no trader offers listed")
        }
        LookupResult::Success { item_name, prices } => {
            format!("Price of {item_name}:\n{}", render_prices(prices))
        }
        LookupResult::Failure(failure) => failure.user_message().to_owned(),
    }
}
