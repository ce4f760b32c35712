//! End-to-end tests for the gateway HTTP surface.
//!
//! Each test starts a real server on `127.0.0.1:0` and talks to it with
//! `reqwest`. Upstream registries are stood in for by `wiremock`.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use petcare_aggregate::{SourceKind, SourceSpec};
use petcare_gateway::{GatewayConfig, GatewayServer, Profile};
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn local_config(profile: Profile, sources: Vec<SourceSpec>) -> GatewayConfig {
    let mut config = GatewayConfig::for_profile(profile);
    config.server.host = "127.0.0.1".into();
    config.server.port = Some(0);
    config.gateway.deadline_ms = Some(2_000);
    config.gateway.source_timeout_ms = Some(1_000);
    config.sources = sources;
    config
}

async fn start(config: &GatewayConfig) -> (GatewayServer, String) {
    let server = petcare_gateway::start(config).await.expect("server starts");
    let base = format!("http://{}", server.addr());
    (server, base)
}

async fn get(url: &str) -> (u16, Value) {
    let response = reqwest::get(url).await.expect("request");
    let status = response.status().as_u16();
    let body = response.json::<Value>().await.expect("json body");
    (status, body)
}

async fn urpl_mock() -> MockServer {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/medicinal-products/public"))
        .and(query_param("name", "amoxicillin"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "totalElements": 2,
            "content": [
                {"id": 1, "productName": "Amoxisol", "atcCode": "QJ01CA04"},
                {"id": 2, "productName": "Betamox", "atcCode": "QJ01CA04"}
            ]
        })))
        .mount(&upstream)
        .await;
    upstream
}

fn drug_sources(urpl_base: &str) -> Vec<SourceSpec> {
    vec![
        SourceSpec::new("urpl", SourceKind::Urpl, urpl_base).named("URPL"),
        SourceSpec::new("ema", SourceKind::Portal, "https://ema.test/vet").named("EMA"),
        SourceSpec::new("formulary", SourceKind::Formulary, "").named("Formulary"),
    ]
}

#[tokio::test]
async fn query_merges_sources_in_order() {
    let upstream = urpl_mock().await;
    let config = local_config(Profile::Drugs, drug_sources(&upstream.uri()));
    let (_server, base) = start(&config).await;

    let (status, body) = get(&format!("{base}/query?term=amoxicillin")).await;
    assert_eq!(status, 200);
    assert_eq!(body["cached"], false);

    let ids: Vec<_> = body["sources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_owned())
        .collect();
    assert_eq!(ids, vec!["urpl", "ema", "formulary"]);
    assert_eq!(body["sources"][0]["count"], 2);
    assert!(body["sources"][1]["note"].as_str().unwrap().contains("ema.test"));

    let results = body["results"].as_array().unwrap();
    assert_eq!(body["total"], results.len());
    assert_eq!(results[0]["name"], "Amoxisol");
    assert_eq!(results.last().unwrap()["source"], "formulary");
}

#[tokio::test]
async fn repeated_query_is_served_from_cache() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/medicinal-products/public"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"id": 7, "productName": "Metacam"}]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let config = local_config(Profile::Drugs, drug_sources(&upstream.uri()));
    let (_server, base) = start(&config).await;

    let (_, first) = get(&format!("{base}/query?term=metacam&source=urpl")).await;
    let (_, second) = get(&format!("{base}/query?term=METACAM&source=URPL")).await;
    assert_eq!(first["cached"], false);
    assert_eq!(second["cached"], true);
    assert_eq!(first["results"], second["results"]);

    let (_, stats) = get(&format!("{base}/stats")).await;
    assert_eq!(stats["cacheEntries"], 1);
}

#[tokio::test]
async fn upstream_failure_is_reported_not_raised() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;
    let config = local_config(Profile::Drugs, drug_sources(&upstream.uri()));
    let (_server, base) = start(&config).await;

    let (status, body) = get(&format!("{base}/query?term=synulox")).await;
    assert_eq!(status, 200);
    assert_eq!(body["sources"][0]["error"], "upstream_error");
    assert_eq!(body["results"][0]["name"], "Synulox");
}

#[tokio::test]
async fn caller_errors_are_400() {
    let config = local_config(Profile::Drugs, drug_sources("https://urpl.invalid"));
    let (_server, base) = start(&config).await;

    for query in [
        "term=a",
        "source=formulary",
        "term=amoxicillin&source=nope",
        "term=amoxicillin&limit=zero",
    ] {
        let (status, body) = get(&format!("{base}/query?{query}")).await;
        assert_eq!(status, 400, "{query}");
        assert!(body["error"].is_string(), "{query}");
    }
}

#[tokio::test]
async fn alerts_profile_defaults_country_filter() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/events"))
        .and(query_param("country", "POL"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "events": [
                {"eventId": 42, "disease": "African swine fever", "location": "Lublin"}
            ]
        })))
        .expect(1)
        .mount(&upstream)
        .await;
    let sources = vec![
        SourceSpec::new("woah", SourceKind::Wahis, upstream.uri()).named("WOAH"),
        SourceSpec::new("giw", SourceKind::Portal, "https://giw.test/asf").named("GIW"),
    ];
    let config = local_config(Profile::Alerts, sources);
    let (_server, base) = start(&config).await;

    let (status, body) = get(&format!("{base}/query")).await;
    assert_eq!(status, 200);
    assert_eq!(body["query"]["filters"]["country"], "POL");
    assert_eq!(body["results"][0]["name"], "African swine fever (Lublin)");
}

#[tokio::test]
async fn sources_health_and_categories() {
    let config = local_config(Profile::Drugs, drug_sources("https://urpl.invalid"));
    let (_server, base) = start(&config).await;

    let (_, sources) = get(&format!("{base}/sources")).await;
    let sources = sources.as_array().unwrap();
    assert_eq!(sources.len(), 3);
    assert_eq!(sources[1]["supportsLiveQuery"], false);

    let (status, health) = get(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["service"], "drug-service");
    assert_eq!(health["profile"], "drugs");
    assert_eq!(health["sources"][0]["circuit"], "closed");

    let (_, stats) = get(&format!("{base}/stats")).await;
    assert_eq!(stats["sourceCount"], 3);
    assert_eq!(stats["liveSources"], json!(["urpl", "formulary"]));

    let (_, categories) = get(&format!("{base}/categories")).await;
    assert_eq!(categories["categories"][0]["code"], "QA");
}

#[tokio::test]
async fn asf_zones_served_by_alerts_profile_only() {
    let formulary = || vec![SourceSpec::new("formulary", SourceKind::Formulary, "")];

    let alerts = local_config(Profile::Alerts, formulary());
    let (_alerts_server, alerts_base) = start(&alerts).await;
    let (status, body) = get(&format!("{alerts_base}/alerts/asf")).await;
    assert_eq!(status, 200);
    assert_eq!(body["disease"], "ASF");
    assert_eq!(
        body["mapUrl"],
        "https://www.wetgiw.gov.pl/nadzor-weterynaryjny/asf-mapa"
    );
    let zones: Vec<_> = body["zones"]
        .as_array()
        .unwrap()
        .iter()
        .map(|z| (z["type"].as_str().unwrap(), z["color"].as_str().unwrap()))
        .collect();
    assert_eq!(zones, vec![("I", "blue"), ("II", "pink"), ("III", "red")]);

    let drugs = local_config(Profile::Drugs, formulary());
    let (_drugs_server, drugs_base) = start(&drugs).await;
    let (status, body) = get(&format!("{drugs_base}/alerts/asf")).await;
    assert_eq!(status, 404);
    assert!(body["error"].as_str().unwrap().contains("drug-service"));
}

#[tokio::test]
async fn health_reports_failure_streaks() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;
    let config = local_config(Profile::Drugs, drug_sources(&upstream.uri()));
    let (_server, base) = start(&config).await;

    get(&format!("{base}/query?term=synulox&source=urpl")).await;
    let (_, health) = get(&format!("{base}/health")).await;
    assert_eq!(health["sources"][0]["id"], "urpl");
    assert_eq!(health["sources"][0]["failures"], 1);
    assert_eq!(health["sources"][0]["circuit"], "closed");
    assert_eq!(health["sources"][2]["failures"], 0);
}

#[tokio::test]
async fn shutdown_stops_accepting() {
    let config = local_config(Profile::Alerts, vec![SourceSpec::new(
        "formulary",
        SourceKind::Formulary,
        "",
    )]);
    let (server, base) = start(&config).await;
    assert_eq!(server.port(), server.addr().port());
    server.shutdown();
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert!(reqwest::get(format!("{base}/health")).await.is_err());
}
