use serde::Serialize;

/// Request body accepted by the price API: a JSON object with a single `query` field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QueryBody {
    pub query: String,
}

impl QueryBody {
    pub fn for_item(item_name: &str) -> Self {
        Self { query: build_item_query(item_name) }
    }
}

/// Builds the GraphQL document asking for an item's id, name and trader prices.
pub fn build_item_query(item_name: &str) -> String {
    format!(
        "{{ items(name: {name}) {{ id name traderPrices {{ trader {{ name }} price currency }} }} }}",
        name = graphql_string_literal(item_name)
    )
}

/// Encodes `value` as a quoted GraphQL string literal.
///
/// Quotes, backslashes and control characters are escaped; the output only
/// uses escapes that GraphQL and JSON string literals share.
pub fn graphql_string_literal(value: &str) -> String {
    let mut literal = String::with_capacity(value.len() + 2);
    literal.push('"');
    for ch in value.chars() {
        match ch {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\r' => literal.push_str("\\r"),
            '\t' => literal.push_str("\\t"),
            '\u{08}' => literal.push_str("\\b"),
            '\u{0C}' => literal.push_str("\\f"),
            ch if ch.is_control() => literal.push_str(&format!("\\u{:04X}", ch as u32)),
            ch => literal.push(ch),
        }
    }
    literal.push('"');
    literal
}

#[cfg(test)]
mod tests {
    use super::{build_item_query, graphql_string_literal, QueryBody};

    /// Pulls the `name:` argument back out of a query the way a GraphQL lexer
    /// would: scan to the closing unescaped quote, then decode the escapes.
    fn parse_name_argument(query: &str) -> Option<String> {
        let start = query.find("items(name: ")? + "items(name: ".len();
        let rest = &query[start..];
        let mut chars = rest.char_indices();
        if chars.next()?.1 != '"' {
            return None;
        }

        let mut escaped = false;
        let end = chars.find_map(|(index, ch)| {
            if escaped {
                escaped = false;
                None
            } else if ch == '\\' {
                escaped = true;
                None
            } else if ch == '"' {
                Some(index)
            } else {
                None
            }
        })?;

        let after = rest[end + 1..].trim_start();
        if !after.starts_with(')') {
            return None;
        }

        serde_json::from_str::<String>(&rest[..=end]).ok()
    }

    #[test]
    fn query_requests_id_name_and_trader_prices() {
        let query = build_item_query("bitcoin");

        assert!(query.contains(r#"items(name: "bitcoin")"#));
        for field in ["id", "name", "traderPrices", "trader { name }", "price", "currency"] {
            assert!(query.contains(field), "query is missing `{field}`");
        }
    }

    #[test]
    fn embedded_quote_cannot_break_out_of_the_literal() {
        let query = build_item_query(r#"item"name"#);

        assert!(query.contains(r#"items(name: "item\"name")"#));
        assert_eq!(parse_name_argument(&query).as_deref(), Some(r#"item"name"#));
    }

    #[test]
    fn injection_attempt_stays_inside_the_argument() {
        let hostile = r#"x") { id } other: items(name: "y"#;
        let query = build_item_query(hostile);

        assert_eq!(parse_name_argument(&query).as_deref(), Some(hostile));

        let literal = graphql_string_literal(hostile);
        assert!(query.contains(&literal));
        let outside_literal = query.replacen(&literal, "", 1);
        assert_eq!(outside_literal.matches("items(").count(), 1);
        assert_eq!(outside_literal.matches('{').count(), outside_literal.matches('}').count());
    }

    #[test]
    fn backslashes_and_control_characters_are_escaped() {
        assert_eq!(graphql_string_literal("a\\b"), r#""a\\b""#);
        assert_eq!(graphql_string_literal("line\nbreak\t"), r#""line\nbreak\t""#);
        assert_eq!(graphql_string_literal("bell\u{07}"), r#""bell\u0007""#);

        let tricky = "tab\t quote\" slash\\ nul\u{0} unicode ✓";
        let query = build_item_query(tricky);
        assert_eq!(parse_name_argument(&query).as_deref(), Some(tricky));
    }

    #[test]
    fn body_serializes_to_single_query_field() {
        let body = QueryBody::for_item("ledx");
        let value = serde_json::to_value(&body).expect("body should serialize");

        let object = value.as_object().expect("body should be an object");
        assert_eq!(object.len(), 1);
        assert_eq!(object["query"], build_item_query("ledx"));
    }
}
