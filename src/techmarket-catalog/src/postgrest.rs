//! Backend for a hosted PostgREST endpoint (Supabase projects expose one
//! under `/rest/v1`).

use crate::query::{Action, Query};
use crate::{Backend, Error};
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

const USER_AGENT: &str = concat!("techmarket-kiosk/", env!("CARGO_PKG_VERSION"));
const REST_PATH: &str = "rest/v1";

/// Error body returned by PostgREST on a failed request.
#[derive(Deserialize)]
struct PostgrestErrorBody {
    message: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

pub struct PostgrestBackend {
    client: reqwest::blocking::Client,
    rest_url: Url,
    api_key: String,
}

impl PostgrestBackend {
    /// Connect to the project at `project_url` (e.g. `https://xyz.supabase.co`)
    /// using its anonymous API key.
    pub fn new(project_url: &str, api_key: &str, timeout: Duration) -> Result<Self, Error> {
        let base = project_url.trim_end_matches('/');
        let rest_url = Url::parse(&format!("{base}/{REST_PATH}/"))
            .map_err(|e| Error::Config(format!("invalid backend URL '{project_url}': {e}")))?;
        if api_key.is_empty() {
            return Err(Error::Config("backend API key is empty".to_string()));
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            rest_url,
            api_key: api_key.to_string(),
        })
    }

    /// Full request URL for a query: table path, projection, ordering and
    /// `col=eq.value` filters.
    pub fn request_url(&self, query: &Query) -> Result<Url, Error> {
        let mut url = self
            .rest_url
            .join(query.table())
            .map_err(|e| Error::Config(format!("invalid table name '{}': {e}", query.table())))?;

        {
            let mut pairs = url.query_pairs_mut();
            if let Action::Select { columns } = query.action() {
                pairs.append_pair("select", columns);
            }
            if let Some(order) = query.ordering() {
                let direction = if order.ascending { "asc" } else { "desc" };
                pairs.append_pair("order", &format!("{}.{direction}", order.column));
            }
            for filter in query.filters() {
                pairs.append_pair(&filter.column, &format!("eq.{}", filter_text(&filter.value)));
            }
        }

        // An empty query string leaves a trailing `?`; drop it.
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url)
    }
}

fn filter_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Backend for PostgrestBackend {
    fn execute(&self, query: &Query) -> Result<Vec<Value>, Error> {
        let url = self.request_url(query)?;
        tracing::debug!(verb = query.verb(), %url, "sending request");

        let request = match query.action() {
            Action::Select { .. } => self.client.get(url),
            Action::Insert { rows } => self.client.post(url).json(rows),
            Action::Update { patch } => self.client.patch(url).json(patch),
            Action::Delete => self.client.delete(url),
        };

        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .header("Prefer", "return=representation")
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            return Err(Error::Remote {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }
        parse_rows(&body)
    }
}

/// The service's own `message` (or `details`), else the HTTP reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<PostgrestErrorBody>(body)
        .ok()
        .and_then(|b| b.message.or(b.details))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("request failed")
                .to_string()
        })
}

/// Rows from a success body. `return=representation` answers with an array;
/// an empty body or `null` means no rows.
fn parse_rows(body: &str) -> Result<Vec<Value>, Error> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str(body)? {
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![other]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> PostgrestBackend {
        PostgrestBackend::new("https://demo.supabase.co/", "anon-key", Duration::from_secs(5))
            .unwrap()
    }

    #[test]
    fn select_url_has_projection_and_order() {
        let query = Query::from("products").select("*").order("id", false);
        let url = backend().request_url(&query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/rest/v1/products?select=*&order=id.desc"
        );
    }

    #[test]
    fn mutation_url_has_eq_filter_only() {
        let query = Query::from("products").delete().eq("id", 7);
        let url = backend().request_url(&query).unwrap();
        assert_eq!(url.as_str(), "https://demo.supabase.co/rest/v1/products?id=eq.7");
    }

    #[test]
    fn insert_url_has_no_query_string() {
        let query = Query::from("products").insert(vec![serde_json::json!({ "title": "x" })]);
        let url = backend().request_url(&query).unwrap();
        assert_eq!(url.as_str(), "https://demo.supabase.co/rest/v1/products");
    }

    #[test]
    fn string_filters_are_not_quoted() {
        let query = Query::from("products").select("id,title").eq("title", "Mouse Pad");
        let url = backend().request_url(&query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://demo.supabase.co/rest/v1/products?select=id%2Ctitle&title=eq.Mouse+Pad"
        );
    }

    #[test]
    fn error_message_prefers_service_message() {
        let body = r#"{"code":"23505","details":"Key (id)=(7) already exists.","hint":null,"message":"duplicate key value violates unique constraint"}"#;
        assert_eq!(
            error_message(StatusCode::CONFLICT, body),
            "duplicate key value violates unique constraint"
        );
    }

    #[test]
    fn error_message_falls_back_to_details() {
        let body = r#"{"details":"Results contain 0 rows"}"#;
        assert_eq!(
            error_message(StatusCode::NOT_ACCEPTABLE, body),
            "Results contain 0 rows"
        );
    }

    #[test]
    fn error_message_falls_back_to_reason_phrase() {
        assert_eq!(error_message(StatusCode::UNAUTHORIZED, ""), "Unauthorized");
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "<html>upstream down</html>"),
            "Bad Gateway"
        );
    }

    #[test]
    fn parse_rows_handles_array_null_and_empty() {
        let rows = parse_rows(r#"[{"id":1},{"id":2}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["id"], 2);
        assert!(parse_rows("null").unwrap().is_empty());
        assert!(parse_rows("  ").unwrap().is_empty());
        assert_eq!(parse_rows(r#"{"id":3}"#).unwrap(), vec![serde_json::json!({ "id": 3 })]);
        assert!(matches!(parse_rows("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn rejects_bad_url_and_empty_key() {
        let err = PostgrestBackend::new("not a url", "key", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));

        let err = PostgrestBackend::new("https://demo.supabase.co", "", Duration::from_secs(1))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
