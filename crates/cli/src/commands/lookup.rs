use pricebot_core::{
    config::{AppConfig, LoadOptions},
    lookup::{render_reply, HttpPriceApi, LookupResult, PriceLookupService},
};

use super::CommandResult;

const EXIT_LOOKUP_FAILED: u8 = 1;
const EXIT_CONFIG: u8 = 2;

/// One-shot lookup; needs no Discord token.
pub fn run(item_name: &str, json_output: bool) -> CommandResult {
    if item_name.trim().is_empty() {
        return CommandResult::failure(
            "lookup",
            "usage",
            "item name must not be empty",
            EXIT_CONFIG,
        );
    }

    let config = match AppConfig::load(LoadOptions {
        skip_discord_validation: true,
        ..LoadOptions::default()
    }) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "lookup",
                "config_validation",
                error.to_string(),
                EXIT_CONFIG,
            )
        }
    };

    let api = match HttpPriceApi::new(&config.price_api) {
        Ok(api) => api,
        Err(error) => {
            return CommandResult::failure("lookup", "transport", error.to_string(), EXIT_CONFIG)
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "lookup",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let result = runtime.block_on(PriceLookupService::new(api).lookup(item_name));
    render_result(&result, json_output)
}

fn render_result(result: &LookupResult, json_output: bool) -> CommandResult {
    let reply = render_reply(result);
    match (result, json_output) {
        (LookupResult::Success { .. }, true) => CommandResult::success("lookup", reply),
        (LookupResult::Success { .. }, false) => CommandResult { exit_code: 0, output: reply },
        (LookupResult::Failure(failure), true) => CommandResult::failure(
            "lookup",
            failure.kind.as_str(),
            failure.detail.clone(),
            EXIT_LOOKUP_FAILED,
        ),
        (LookupResult::Failure(failure), false) => CommandResult {
            exit_code: EXIT_LOOKUP_FAILED,
            output: format!("{reply} ({failure})"),
        },
    }
}
