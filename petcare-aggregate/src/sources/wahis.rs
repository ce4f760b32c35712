//! Animal disease outbreak feed.
//!
//! `GET {base}/events?country=<code>&disease=<name>&limit=<n>` returning
//! `{"events": [...]}`. The term, when present, narrows by disease; the
//! `country` and `disease` filters are passed through as-is. Fields the
//! adapter does not map are kept in the record metadata.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::GatewayError;
use crate::http;
use crate::source::SourceClient;
use crate::types::{Query, Record, SourceDescriptor, SourceOutcome};

/// Client for an outbreak event feed.
pub struct WahisSource {
    descriptor: SourceDescriptor,
    client: reqwest::Client,
    events_url: Url,
}

impl WahisSource {
    /// Create a client that queries `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Config`] if `base_url` is not a valid URL.
    pub fn new(
        descriptor: SourceDescriptor,
        client: reqwest::Client,
        base_url: &str,
    ) -> Result<Self, GatewayError> {
        let events_url = http::endpoint(base_url, "events")?;
        Ok(Self {
            descriptor,
            client,
            events_url,
        })
    }

    fn url_for(&self, query: &Query) -> Url {
        let mut url = self.events_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(country) = query.filter("country") {
                pairs.append_pair("country", country);
            }
            let term = query.term_or_empty().trim();
            let disease = if term.is_empty() {
                query.filter("disease")
            } else {
                Some(term)
            };
            if let Some(disease) = disease {
                pairs.append_pair("disease", disease);
            }
            pairs.append_pair("limit", &query.limit.to_string());
        }
        url
    }
}

#[async_trait]
impl SourceClient for WahisSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, query: &Query, budget: Duration) -> SourceOutcome {
        let id = self.descriptor.id.as_str();
        let url = self.url_for(query);
        match http::get_json::<EventFeed>(&self.client, url, id, budget).await {
            Ok(Some(feed)) => SourceOutcome::records(id, parse_feed(feed, id)),
            Ok(None) => SourceOutcome::records(id, Vec::new()),
            Err(failure) => SourceOutcome::Failure(failure),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventFeed {
    #[serde(default)]
    events: Vec<OutbreakEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutbreakEvent {
    event_id: Option<serde_json::Value>,
    disease: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

/// Normalize an event feed. Events without an id or disease are dropped.
pub(crate) fn parse_feed(feed: EventFeed, source: &str) -> Vec<Record> {
    feed.events
        .into_iter()
        .filter_map(|event| {
            let id = match event.event_id? {
                serde_json::Value::String(s) if !s.is_empty() => s,
                serde_json::Value::Number(n) => n.to_string(),
                _ => return None,
            };
            let disease = event.disease.filter(|d| !d.trim().is_empty())?;
            let place = ["location", "country"]
                .iter()
                .find_map(|key| event.extra.get(*key).and_then(|v| v.as_str()))
                .unwrap_or("unknown location");
            let name = format!("{} ({place})", disease.trim());

            let mut record = Record::new(id, name, disease.trim(), source);
            for (key, value) in event.extra {
                record = record.with_metadata(&key, value);
            }
            Some(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ResultKind, SourceErrorKind};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(base: &str) -> WahisSource {
        let descriptor = SourceDescriptor {
            id: "woah".into(),
            name: "WOAH WAHIS".into(),
            url: base.into(),
            supports_live_query: true,
            result_kind: ResultKind::Alert,
            description: String::new(),
            country: None,
        };
        let client = http::build_client(Duration::from_secs(5)).expect("client");
        WahisSource::new(descriptor, client, base).expect("source")
    }

    #[test]
    fn parse_keeps_unmapped_fields() {
        let feed: EventFeed = serde_json::from_value(json!({
            "events": [
                {"eventId": 4411, "disease": "African swine fever", "country": "POL",
                 "location": "Lubuskie", "status": "ongoing", "startDate": "2026-09-01"},
                {"eventId": "E-2", "disease": "HPAI", "country": "POL"},
                {"eventId": 3},
                {"disease": "Rabies"}
            ]
        }))
        .expect("feed");

        let records = parse_feed(feed, "woah");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, "4411");
        assert_eq!(records[0].name, "African swine fever (Lubuskie)");
        assert_eq!(records[0].category, "African swine fever");
        assert_eq!(records[0].metadata["status"], "ongoing");
        assert_eq!(records[0].metadata["startDate"], "2026-09-01");
        assert_eq!(records[1].name, "HPAI (POL)");
    }

    #[tokio::test]
    async fn fetch_passes_country_and_disease() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/events"))
            .and(query_param("country", "POL"))
            .and(query_param("disease", "asf"))
            .and(query_param("limit", "50"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "events": [{"eventId": 1, "disease": "asf", "country": "POL"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let query = Query {
            term: None,
            ..Query::new("")
        }
        .with_filter("country", "POL")
        .with_filter("disease", "asf")
        .with_limit(50);
        let outcome = source(&server.uri())
            .fetch(&query, Duration::from_secs(2))
            .await;
        match outcome {
            SourceOutcome::Records { records, .. } => assert_eq!(records.len(), 1),
            SourceOutcome::Failure(f) => panic!("unexpected failure: {f:?}"),
        }
    }

    #[tokio::test]
    async fn term_takes_precedence_over_disease_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("disease", "rabies"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": []})))
            .expect(1)
            .mount(&server)
            .await;

        let query = Query::new("rabies").with_filter("disease", "asf");
        let outcome = source(&server.uri())
            .fetch(&query, Duration::from_secs(2))
            .await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn unexpected_shape_is_parse_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"events": "none"})))
            .mount(&server)
            .await;

        let outcome = source(&server.uri())
            .fetch(&Query::new("asf"), Duration::from_secs(2))
            .await;
        assert_eq!(outcome.error_kind(), Some(SourceErrorKind::ParseError));
    }
}
