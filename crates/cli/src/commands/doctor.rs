use pricebot_core::{
    config::{AppConfig, LoadOptions},
    lookup::{HttpPriceApi, PriceApi, QueryBody},
};
use serde::Serialize;
use serde_json::Value;

use super::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated (discord token present)".to_string(),
            });
            checks.push(check_price_api(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            checks.push(DoctorCheck {
                name: "price_api_reachability",
                status: CheckStatus::Skipped,
                details: "skipped because configuration did not load".to_string(),
            });
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_price_api(config: &AppConfig) -> DoctorCheck {
    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return DoctorCheck {
                name: "price_api_reachability",
                status: CheckStatus::Fail,
                details: format!("failed to initialize async runtime: {error}"),
            };
        }
    };

    let result = runtime.block_on(async {
        let api = HttpPriceApi::new(&config.price_api).map_err(|error| error.to_string())?;
        let typename_query = QueryBody { query: "{ __typename }".to_string() };
        let body = api.post_query(&typename_query).await.map_err(|error| error.to_string())?;
        graphql_data_present(&body)
    });

    match result {
        Ok(()) => DoctorCheck {
            name: "price_api_reachability",
            status: CheckStatus::Pass,
            details: format!("`{}` answered a `__typename` query", config.price_api.endpoint),
        },
        Err(details) => {
            DoctorCheck { name: "price_api_reachability", status: CheckStatus::Fail, details }
        }
    }
}

fn graphql_data_present(body: &str) -> Result<(), String> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| format!("price api did not return JSON: {error}"))?;
    if value.get("data").is_some_and(Value::is_object) {
        Ok(())
    } else {
        Err("price api response has no `data` object".to_string())
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::graphql_data_present;

    #[test]
    fn reachability_check_requires_a_data_object() {
        assert!(graphql_data_present(r#"{"data":{"__typename":"Query"}}"#).is_ok());
        assert!(graphql_data_present(r#"{"errors":[]}"#).is_err());
        assert!(graphql_data_present("upstream timeout").is_err());
    }
}
