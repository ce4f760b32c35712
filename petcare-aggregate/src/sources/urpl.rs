//! URPL: the Polish registry of medicinal products (public JSON API).
//!
//! Stable JSON API: `GET {base}/medicinal-products/public?name=<term>&size=<limit>`
//! returning a page of `content` items. Products are normalized with the
//! ATC code as their category.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::GatewayError;
use crate::http;
use crate::source::SourceClient;
use crate::types::{Query, Record, SourceDescriptor, SourceOutcome};

/// Client for the URPL medicinal products API.
pub struct UrplSource {
    descriptor: SourceDescriptor,
    client: reqwest::Client,
    search_url: Url,
}

impl UrplSource {
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
        let search_url = http::endpoint(base_url, "medicinal-products/public")?;
        Ok(Self {
            descriptor,
            client,
            search_url,
        })
    }
}

#[async_trait]
impl SourceClient for UrplSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, query: &Query, budget: Duration) -> SourceOutcome {
        let id = self.descriptor.id.as_str();
        let term = query.term_or_empty().trim();
        if term.is_empty() {
            // The registry only supports name search.
            return SourceOutcome::records(id, Vec::new());
        }

        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("name", term)
            .append_pair("size", &query.limit.to_string());

        match http::get_json::<UrplPage>(&self.client, url, id, budget).await {
            Ok(Some(page)) => {
                tracing::debug!(
                    source = id,
                    total = page.total_elements,
                    returned = page.content.len(),
                    "URPL page received"
                );
                SourceOutcome::records(id, parse_urpl_page(page, id))
            }
            Ok(None) => SourceOutcome::records(id, Vec::new()),
            Err(failure) => SourceOutcome::Failure(failure),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UrplPage {
    #[serde(default)]
    total_elements: u64,
    #[serde(default)]
    content: Vec<UrplProduct>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct UrplProduct {
    id: Option<serde_json::Value>,
    product_name: Option<String>,
    name: Option<String>,
    active_substance: Option<String>,
    pharmaceutical_form: Option<String>,
    responsible_entity: Option<String>,
    manufacturer: Option<String>,
    registration_number: Option<String>,
    atc_code: Option<String>,
    status: Option<String>,
}

/// Normalize a URPL page. Products without an identifier or name are skipped.
pub(crate) fn parse_urpl_page(page: UrplPage, source: &str) -> Vec<Record> {
    page.content
        .into_iter()
        .filter_map(|product| {
            let id = match &product.id {
                Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => product.registration_number.clone().filter(|r| !r.is_empty())?,
            };
            let name = product
                .product_name
                .or(product.name)
                .filter(|n| !n.trim().is_empty())?;
            let category = product
                .atc_code
                .clone()
                .filter(|c| !c.is_empty())
                .or_else(|| product.pharmaceutical_form.clone())
                .unwrap_or_else(|| "unclassified".to_owned());

            Some(
                Record::new(id, name.trim(), category, source)
                    .with_metadata("activeSubstance", product.active_substance.unwrap_or_default())
                    .with_metadata("form", product.pharmaceutical_form.unwrap_or_default())
                    .with_metadata(
                        "manufacturer",
                        product
                            .responsible_entity
                            .or(product.manufacturer)
                            .unwrap_or_default(),
                    )
                    .with_metadata(
                        "registrationNumber",
                        product.registration_number.unwrap_or_default(),
                    )
                    .with_metadata("status", product.status.unwrap_or_else(|| "active".into())),
            )
        })
        .collect()
}
