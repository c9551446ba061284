// 🌐 Knowledge-base client - Wikidata action API with bounded retries
//
// Payload parsing lives in free functions so schema checks run without a network.

use crate::config::FetchConfig;
use crate::error::{CompareError, CompareResult};
use crate::model::{DatatypeTag, Entity, RawStatement, SnakType, Suggestion};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// API error codes worth retrying
const RETRYABLE_API_CODES: &[&str] = &["maxlag", "ratelimited", "internal_api_error_DBQueryError"];

// ============================================================================
// KNOWLEDGE BASE SEAM
// ============================================================================

/// The three knowledge-base calls the pipeline needs
#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Entity metadata plus every main-snak, in API order
    async fn fetch_entity(&self, id: &str) -> CompareResult<(Entity, Vec<RawStatement>)>;

    /// One batch of id → label pairs; unresolved ids are simply absent
    async fn fetch_labels(&self, ids: &[String]) -> CompareResult<HashMap<String, String>>;

    /// Search suggestions for a free-text term
    async fn search(&self, term: &str) -> CompareResult<Vec<Suggestion>>;
}

// ============================================================================
// WIKIDATA CLIENT
// ============================================================================

pub struct WikidataClient {
    http: Client,
    config: FetchConfig,
}

/// Outcome of a single HTTP attempt
enum Attempt {
    Retry(String),
    Fatal(CompareError),
}

impl WikidataClient {
    pub fn new(config: FetchConfig) -> CompareResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| CompareError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// GET with bounded retries and exponential backoff
    async fn get_json(&self, params: &[(&str, String)], context: &str) -> CompareResult<Value> {
        let mut attempt: u32 = 0;

        loop {
            match self.try_get_json(params, context).await {
                Ok(value) => return Ok(value),
                Err(Attempt::Fatal(err)) => return Err(err),
                Err(Attempt::Retry(message)) if attempt < self.config.max_retries => {
                    let delay = self.config.backoff_delay(attempt);
                    warn!(
                        context,
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        "transient failure, retrying: {}",
                        message
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(Attempt::Retry(message)) => {
                    return Err(CompareError::TransientNetwork {
                        attempts: attempt + 1,
                        message,
                    })
                }
            }
        }
    }

    async fn try_get_json(
        &self,
        params: &[(&str, String)],
        context: &str,
    ) -> Result<Value, Attempt> {
        debug!(context, url = %self.config.api_url, "knowledge-base request");

        let response = self
            .http
            .get(&self.config.api_url)
            .query(params)
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    Attempt::Fatal(CompareError::Config(e.to_string()))
                } else {
                    Attempt::Retry(e.to_string())
                }
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            return Err(Attempt::Retry(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Attempt::Retry(format!("Failed to read response body: {}", e)))?;

        if !status.is_success() {
            error!(context, %status, payload = %snippet(&body), "unexpected HTTP status");
            return Err(Attempt::Fatal(CompareError::malformed(
                format!("{}: HTTP {}", context, status),
                &body,
            )));
        }

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            error!(context, payload = %snippet(&body), "response is not JSON: {}", e);
            Attempt::Fatal(CompareError::malformed(context, &body))
        })?;

        if let Some(code) = api_error_code(&value) {
            if RETRYABLE_API_CODES.contains(&code) {
                return Err(Attempt::Retry(format!("API error {}", code)));
            }
        }

        Ok(value)
    }
}

#[async_trait]
impl KnowledgeBase for WikidataClient {
    async fn fetch_entity(&self, id: &str) -> CompareResult<(Entity, Vec<RawStatement>)> {
        let params = [
            ("action", "wbgetentities".to_string()),
            ("ids", id.to_string()),
            ("props", "labels|descriptions|claims".to_string()),
            ("languages", self.config.language.clone()),
        ];

        let payload = self.get_json(&params, &format!("entity {}", id)).await?;
        parse_entity_payload(id, &payload, &self.config.language)
    }

    async fn fetch_labels(&self, ids: &[String]) -> CompareResult<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let params = [
            ("action", "wbgetentities".to_string()),
            ("ids", ids.join("|")),
            ("props", "labels".to_string()),
            ("languages", self.config.language.clone()),
        ];

        let payload = self
            .get_json(&params, &format!("labels for {} id(s)", ids.len()))
            .await?;
        parse_labels_payload(&payload, &self.config.language)
    }

    async fn search(&self, term: &str) -> CompareResult<Vec<Suggestion>> {
        let params = [
            ("action", "wbsearchentities".to_string()),
            ("search", term.to_string()),
            ("language", self.config.language.clone()),
            ("uselang", self.config.language.clone()),
            ("type", "item".to_string()),
            ("limit", self.config.suggestion_limit.to_string()),
        ];

        let payload = self.get_json(&params, &format!("search '{}'", term)).await?;
        parse_search_payload(&payload)
    }
}

// ============================================================================
// PAYLOAD PARSING
// ============================================================================

#[derive(Debug, Deserialize)]
struct WireClaim {
    mainsnak: WireSnak,
}

#[derive(Debug, Deserialize)]
struct WireSnak {
    snaktype: String,
    property: String,
    datatype: Option<String>,
    datavalue: Option<WireDataValue>,
}

#[derive(Debug, Deserialize)]
struct WireDataValue {
    value: Value,
}

fn api_error_code(payload: &Value) -> Option<&str> {
    payload
        .get("error")
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
}

fn snippet(body: &str) -> String {
    body.chars().take(crate::error::PAYLOAD_SNIPPET_LEN).collect()
}

/// Wikibase serializes empty maps as `[]`; accept both shapes
fn object_or_empty(
    value: Option<&Value>,
    context: &str,
    payload: &Value,
) -> CompareResult<Map<String, Value>> {
    match value {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(Value::Array(items)) if items.is_empty() => Ok(Map::new()),
        Some(_) => {
            let body = payload.to_string();
            error!(context, payload = %snippet(&body), "expected a map");
            Err(CompareError::malformed(context, &body))
        }
    }
}

fn term_value(terms: &Map<String, Value>, language: &str) -> Option<String> {
    terms
        .get(language)
        .and_then(|t| t.get("value"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Parse a `wbgetentities` response for one entity
pub fn parse_entity_payload(
    id: &str,
    payload: &Value,
    language: &str,
) -> CompareResult<(Entity, Vec<RawStatement>)> {
    if let Some(code) = api_error_code(payload) {
        if code == "no-such-entity" {
            return Err(CompareError::NotFound { id: id.to_string() });
        }
        error!(id, code, "knowledge-base returned an error");
        return Err(CompareError::malformed(
            format!("entity {}: API error {}", id, code),
            &payload.to_string(),
        ));
    }

    let entities = payload
        .get("entities")
        .and_then(Value::as_object)
        .ok_or_else(|| {
            let body = payload.to_string();
            error!(id, payload = %snippet(&body), "response has no 'entities'");
            CompareError::malformed(format!("entity {}: missing 'entities'", id), &body)
        })?;

    // A redirected id comes back keyed by its target
    let data = match entities.get(id) {
        Some(data) => data,
        None if entities.len() == 1 => entities.values().next().ok_or_else(|| {
            CompareError::NotFound { id: id.to_string() }
        })?,
        None => return Err(CompareError::NotFound { id: id.to_string() }),
    };

    if data.get("missing").is_some() {
        return Err(CompareError::NotFound { id: id.to_string() });
    }

    let resolved_id = data
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or(id)
        .to_string();

    let labels = object_or_empty(data.get("labels"), &format!("entity {}: labels", id), payload)?;
    let descriptions = object_or_empty(
        data.get("descriptions"),
        &format!("entity {}: descriptions", id),
        payload,
    )?;
    let claims = object_or_empty(data.get("claims"), &format!("entity {}: claims", id), payload)?;

    let entity = Entity {
        label: term_value(&labels, language).unwrap_or_else(|| resolved_id.clone()),
        description: term_value(&descriptions, language).unwrap_or_default(),
        id: resolved_id,
    };

    let mut statements = Vec::new();
    for (property_id, property_claims) in &claims {
        let property_claims: Vec<WireClaim> = serde_json::from_value(property_claims.clone())
            .map_err(|e| {
                error!(id, property_id = %property_id, "claim schema violation: {}", e);
                CompareError::malformed(
                    format!("entity {}: claims for {}: {}", id, property_id, e),
                    &property_claims.to_string(),
                )
            })?;

        for claim in property_claims {
            statements.push(parse_snak(id, claim.mainsnak)?);
        }
    }

    Ok((entity, statements))
}

fn parse_snak(entity_id: &str, snak: WireSnak) -> CompareResult<RawStatement> {
    let context = || format!("entity {}: snak for {}", entity_id, snak.property);

    let snak_type = SnakType::parse(&snak.snaktype).ok_or_else(|| {
        CompareError::malformed(context(), &format!("unknown snaktype '{}'", snak.snaktype))
    })?;

    // Snaks of deleted properties carry no datatype; they are never entity-valued
    let datatype = match snak.datatype.as_deref() {
        Some(tag) => DatatypeTag::parse(tag),
        None => {
            debug!(entity = entity_id, property = %snak.property, "snak without datatype tag");
            DatatypeTag::Other(String::new())
        }
    };

    let value_id = if datatype.is_entity_valued() && snak_type == SnakType::Value {
        let value = snak
            .datavalue
            .as_ref()
            .map(|dv| &dv.value)
            .ok_or_else(|| CompareError::malformed(context(), "value snak without datavalue"))?;
        Some(item_id_from_value(value).ok_or_else(|| {
            CompareError::malformed(context(), &value.to_string())
        })?)
    } else {
        None
    };

    Ok(RawStatement {
        property_id: snak.property,
        datatype,
        snak_type,
        value_id,
    })
}

/// `{"id": "Q5"}` or the older `{"numeric-id": 5}` form
fn item_id_from_value(value: &Value) -> Option<String> {
    if let Some(id) = value.get("id").and_then(Value::as_str) {
        return Some(id.to_string());
    }
    value
        .get("numeric-id")
        .and_then(Value::as_u64)
        .map(|n| format!("Q{}", n))
}

/// Parse a batched label lookup; ids without a label in `language` are omitted
pub fn parse_labels_payload(
    payload: &Value,
    language: &str,
) -> CompareResult<HashMap<String, String>> {
    if let Some(code) = api_error_code(payload) {
        // One unknown id fails the whole batch; callers fall back to raw ids
        if code == "no-such-entity" {
            warn!("label batch contained an unknown id, using placeholders");
            return Ok(HashMap::new());
        }
        let body = payload.to_string();
        error!(code, payload = %snippet(&body), "label lookup returned an error");
        return Err(CompareError::malformed(format!("labels: API error {}", code), &body));
    }

    let entities = object_or_empty(payload.get("entities"), "labels: entities", payload)?;

    let mut labels = HashMap::new();
    for (id, data) in &entities {
        if data.get("missing").is_some() {
            continue;
        }
        let terms = object_or_empty(data.get("labels"), &format!("labels: {}", id), payload)?;
        if let Some(label) = term_value(&terms, language) {
            labels.insert(id.clone(), label);
        }
    }

    Ok(labels)
}

/// Parse a `wbsearchentities` response
pub fn parse_search_payload(payload: &Value) -> CompareResult<Vec<Suggestion>> {
    if let Some(code) = api_error_code(payload) {
        let body = payload.to_string();
        error!(code, payload = %snippet(&body), "search returned an error");
        return Err(CompareError::malformed(format!("search: API error {}", code), &body));
    }

    let hits = match payload.get("search") {
        None => return Ok(Vec::new()),
        Some(Value::Array(hits)) => hits,
        Some(_) => {
            let body = payload.to_string();
            error!(payload = %snippet(&body), "search results are not a list");
            return Err(CompareError::malformed("search: 'search' is not a list", &body));
        }
    };

    hits.iter()
        .map(|hit| {
            let id = hit
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    let body = hit.to_string();
                    error!(payload = %snippet(&body), "search hit without id");
                    CompareError::malformed("search: hit without id", &body)
                })?;
            Ok(Suggestion {
                id: id.to_string(),
                label: hit
                    .get("label")
                    .and_then(Value::as_str)
                    .unwrap_or(id)
                    .to_string(),
                description: hit
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            })
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn item_claim(property: &str, value_id: &str) -> Value {
        json!({
            "mainsnak": {
                "snaktype": "value",
                "property": property,
                "datatype": "wikibase-item",
                "datavalue": {
                    "value": {"entity-type": "item", "numeric-id": 0, "id": value_id},
                    "type": "wikibase-entityid"
                }
            },
            "type": "statement",
            "rank": "normal"
        })
    }

    fn douglas_adams() -> Value {
        json!({
            "entities": {
                "Q42": {
                    "id": "Q42",
                    "labels": {"en": {"language": "en", "value": "Douglas Adams"}},
                    "descriptions": {"en": {"language": "en", "value": "English writer"}},
                    "claims": {
                        "P31": [item_claim("P31", "Q5")],
                        "P214": [{
                            "mainsnak": {
                                "snaktype": "value",
                                "property": "P214",
                                "datatype": "external-id",
                                "datavalue": {"value": "113230702", "type": "string"}
                            }
                        }],
                        "P106": [
                            item_claim("P106", "Q36180"),
                            item_claim("P106", "Q6625963"),
                            {"mainsnak": {"snaktype": "somevalue", "property": "P106", "datatype": "wikibase-item"}}
                        ]
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_entity_payload() {
        let (entity, statements) = parse_entity_payload("Q42", &douglas_adams(), "en").unwrap();

        assert_eq!(entity, Entity::new("Q42", "Douglas Adams", "English writer"));
        assert_eq!(statements.len(), 5);

        // Claim order is preserved from the payload
        let properties: Vec<&str> = statements.iter().map(|s| s.property_id.as_str()).collect();
        assert_eq!(properties, vec!["P31", "P214", "P106", "P106", "P106"]);

        assert_eq!(statements[0].value_id.as_deref(), Some("Q5"));
        assert_eq!(statements[1].datatype, DatatypeTag::ExternalId);
        assert_eq!(statements[1].value_id, None);
        assert_eq!(statements[4].snak_type, SnakType::SomeValue);
        assert_eq!(statements[4].value_id, None);
    }

    #[test]
    fn test_parse_entity_missing_label_falls_back_to_id() {
        let payload = json!({"entities": {"Q7": {"id": "Q7", "labels": {}, "descriptions": [], "claims": []}}});
        let (entity, statements) = parse_entity_payload("Q7", &payload, "en").unwrap();

        assert_eq!(entity.label, "Q7");
        assert_eq!(entity.description, "");
        assert!(statements.is_empty());
    }

    #[test]
    fn test_parse_entity_not_found() {
        let missing = json!({"entities": {"Q999999999": {"id": "Q999999999", "missing": ""}}});
        assert_eq!(
            parse_entity_payload("Q999999999", &missing, "en"),
            Err(CompareError::NotFound { id: "Q999999999".to_string() })
        );

        let api_error = json!({"error": {"code": "no-such-entity", "info": "Could not find an entity"}});
        assert!(matches!(
            parse_entity_payload("Qbogus", &api_error, "en"),
            Err(CompareError::NotFound { .. })
        ));
    }

    #[test]
    fn test_parse_entity_follows_redirect_key() {
        let payload = json!({"entities": {"Q100": {"id": "Q100", "labels": {}, "claims": {}}}});
        let (entity, _) = parse_entity_payload("Q99", &payload, "en").unwrap();
        assert_eq!(entity.id, "Q100");
    }

    #[test]
    fn test_parse_entity_rejects_schema_drift() {
        let no_entities = json!({"success": 1});
        assert!(matches!(
            parse_entity_payload("Q1", &no_entities, "en"),
            Err(CompareError::MalformedResponse { .. })
        ));

        let item_without_id = json!({"entities": {"Q1": {"id": "Q1", "claims": {
            "P31": [{"mainsnak": {"snaktype": "value", "property": "P31", "datatype": "wikibase-item",
                "datavalue": {"value": {"entity-type": "item"}, "type": "wikibase-entityid"}}}]
        }}}});
        assert!(matches!(
            parse_entity_payload("Q1", &item_without_id, "en"),
            Err(CompareError::MalformedResponse { .. })
        ));

        let claims_not_map = json!({"entities": {"Q1": {"id": "Q1", "claims": "oops"}}});
        assert!(parse_entity_payload("Q1", &claims_not_map, "en").is_err());
    }

    #[test]
    fn test_snak_without_datatype_is_kept_as_non_item() {
        let payload = json!({"entities": {"Q1": {"id": "Q1", "claims": {
            "P31": [item_claim("P31", "Q5")],
            "P9999999": [{"mainsnak": {"snaktype": "value", "property": "P9999999",
                "datavalue": {"value": "orphan", "type": "string"}}}]
        }}}});

        let (_, statements) = parse_entity_payload("Q1", &payload, "en").unwrap();
        assert_eq!(statements.len(), 2);
        assert_eq!(statements[1].datatype, DatatypeTag::Other(String::new()));
        assert_eq!(statements[1].value_id, None);

        let pairs = crate::normalizer::entity_pairs(&statements);
        assert_eq!(pairs, vec![crate::model::PairKey::new("P31", "Q5")]);
    }

    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Error-level log lines emitted while `f` runs
    fn captured_errors<F: FnOnce()>(f: F) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::ERROR)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_malformed_payloads_are_logged() {
        let logs = captured_errors(|| {
            assert!(parse_entity_payload("Q1", &json!({"success": 1}), "en").is_err());
        });
        assert!(logs.contains("response has no 'entities'"));
        assert!(logs.contains("success"));

        let logs = captured_errors(|| {
            let payload = json!({"error": {"code": "badvalue"}});
            assert!(matches!(
                parse_labels_payload(&payload, "en"),
                Err(CompareError::MalformedResponse { .. })
            ));
        });
        assert!(logs.contains("label lookup returned an error"));
        assert!(logs.contains("badvalue"));

        let logs = captured_errors(|| {
            assert!(parse_search_payload(&json!({"search": "oops"})).is_err());
        });
        assert!(logs.contains("search results are not a list"));
    }

    #[test]
    fn test_numeric_id_fallback() {
        let value = json!({"entity-type": "item", "numeric-id": 5});
        assert_eq!(item_id_from_value(&value), Some("Q5".to_string()));
    }

    #[test]
    fn test_parse_labels_payload() {
        let payload = json!({"entities": {
            "Q5": {"id": "Q5", "labels": {"en": {"language": "en", "value": "human"}}},
            "P31": {"id": "P31", "labels": {"en": {"language": "en", "value": "instance of"}}},
            "Q123": {"id": "Q123", "labels": {}},
            "Q404": {"id": "Q404", "missing": ""}
        }});

        let labels = parse_labels_payload(&payload, "en").unwrap();
        assert_eq!(labels.len(), 2);
        assert_eq!(labels["Q5"], "human");
        assert_eq!(labels["P31"], "instance of");
        assert!(!labels.contains_key("Q123"));
    }

    #[test]
    fn test_parse_labels_unknown_id_yields_placeholders() {
        let payload = json!({"error": {"code": "no-such-entity"}});
        assert!(parse_labels_payload(&payload, "en").unwrap().is_empty());
    }

    #[test]
    fn test_parse_search_payload() {
        let payload = json!({"search": [
            {"id": "Q42", "label": "Douglas Adams", "description": "English writer"},
            {"id": "Q28421831"}
        ]});

        let suggestions = parse_search_payload(&payload).unwrap();
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[0].label, "Douglas Adams");
        assert_eq!(suggestions[1].label, "Q28421831");
        assert_eq!(suggestions[1].description, "");

        assert!(parse_search_payload(&json!({})).unwrap().is_empty());
        assert!(parse_search_payload(&json!({"search": [{"label": "no id"}]})).is_err());
    }

    /// Serve canned HTTP responses, one per connection
    async fn serve_responses(responses: Vec<String>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            for response in responses {
                let (mut socket, _) = listener.accept().await.unwrap();
                let mut buf = vec![0u8; 8192];
                let mut read = Vec::new();
                loop {
                    let n = socket.read(&mut buf).await.unwrap();
                    read.extend_from_slice(&buf[..n]);
                    if n == 0 || read.windows(4).any(|w| w == b"\r\n\r\n") {
                        break;
                    }
                }
                socket.write_all(response.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
        });

        format!("http://{}/w/api.php", addr)
    }

    fn http_response(status: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        )
    }

    fn test_config(api_url: String, retries: u32) -> FetchConfig {
        FetchConfig::new()
            .with_api_url(api_url)
            .with_retries(retries, Duration::from_millis(5))
            .with_timeout(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_client_retries_server_errors() {
        let body = douglas_adams().to_string();
        let url = serve_responses(vec![
            http_response("503 Service Unavailable", ""),
            http_response("429 Too Many Requests", ""),
            http_response("200 OK", &body),
        ])
        .await;

        let client = WikidataClient::new(test_config(url, 3)).unwrap();
        let (entity, statements) = client.fetch_entity("Q42").await.unwrap();

        assert_eq!(entity.label, "Douglas Adams");
        assert_eq!(statements.len(), 5);
    }

    #[tokio::test]
    async fn test_client_escalates_after_retry_budget() {
        let url = serve_responses(vec![
            http_response("503 Service Unavailable", ""),
            http_response("503 Service Unavailable", ""),
        ])
        .await;

        let client = WikidataClient::new(test_config(url, 1)).unwrap();
        let err = client.fetch_entity("Q42").await.unwrap_err();

        assert!(matches!(err, CompareError::TransientNetwork { attempts: 2, .. }));
    }

    #[tokio::test]
    async fn test_client_retries_timeouts() {
        // Accept connections and never answer
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let config = FetchConfig::new()
            .with_api_url(format!("http://{}/w/api.php", addr))
            .with_timeout(Duration::from_millis(100))
            .with_retries(2, Duration::from_millis(5));
        let client = WikidataClient::new(config).unwrap();

        let err = client.fetch_entity("Q42").await.unwrap_err();
        assert!(matches!(err, CompareError::TransientNetwork { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_client_does_not_retry_malformed_body() {
        let url = serve_responses(vec![http_response("200 OK", "<html>not json</html>")]).await;

        let client = WikidataClient::new(test_config(url, 3)).unwrap();
        let err = client.search("Douglas").await.unwrap_err();

        assert!(matches!(err, CompareError::MalformedResponse { .. }));
    }

    #[tokio::test]
    async fn test_fetch_labels_empty_batch_skips_network() {
        let client = WikidataClient::new(test_config("http://127.0.0.1:9/".to_string(), 0)).unwrap();
        assert!(client.fetch_labels(&[]).await.unwrap().is_empty());
    }
}
