pub mod command;
pub mod config;
pub mod errors;
pub mod lookup;

pub use command::{extract_command, extract_command_with_prefix};
pub use errors::{LookupErrorKind, LookupFailure, UpstreamError, USER_FACING_LOOKUP_ERROR};
pub use lookup::{
    render_reply, HttpPriceApi, LookupResult, PriceApi, PriceLookupService, TraderPrice,
};
