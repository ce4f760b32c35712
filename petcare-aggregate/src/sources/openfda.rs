//! openFDA animal & veterinary adverse event API.
//!
//! Searched by active ingredient. Every event lists the drugs involved;
//! the adapter flattens them into distinct products, deduplicated by name.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::GatewayError;
use crate::http;
use crate::source::SourceClient;
use crate::types::{Query, Record, SourceDescriptor, SourceOutcome};

/// openFDA refuses page sizes above this.
const MAX_PAGE: usize = 100;

/// Client for `animalandveterinary/event.json`.
pub struct OpenFdaSource {
    descriptor: SourceDescriptor,
    client: reqwest::Client,
    search_url: Url,
}

impl OpenFdaSource {
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
        let search_url = http::endpoint(base_url, "animalandveterinary/event.json")?;
        Ok(Self {
            descriptor,
            client,
            search_url,
        })
    }
}

#[async_trait]
impl SourceClient for OpenFdaSource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, query: &Query, budget: Duration) -> SourceOutcome {
        let id = self.descriptor.id.as_str();
        let term: String = query
            .term_or_empty()
            .trim()
            .chars()
            .filter(|c| *c != '"')
            .collect();
        if term.is_empty() {
            return SourceOutcome::records(id, Vec::new());
        }

        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("search", &format!("drug.active_ingredients.name:\"{term}\""))
            .append_pair("limit", &query.limit.min(MAX_PAGE).to_string());

        match http::get_json::<FdaPage>(&self.client, url, id, budget).await {
            Ok(Some(page)) => SourceOutcome::records(id, parse_events(page, id, query.limit)),
            // openFDA answers 404 when nothing matches.
            Ok(None) => SourceOutcome::records(id, Vec::new()),
            Err(failure) => SourceOutcome::Failure(failure),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FdaPage {
    #[serde(default)]
    results: Vec<FdaEvent>,
}

#[derive(Debug, Deserialize)]
struct FdaEvent {
    #[serde(default)]
    drug: Vec<FdaDrug>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FdaDrug {
    brand_name: Option<String>,
    active_ingredients: Vec<FdaIngredient>,
    manufacturer: Option<FdaManufacturer>,
    dosage_form: Option<String>,
    route: Option<String>,
    atc_vet_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FdaIngredient {
    name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FdaManufacturer {
    name: Option<String>,
}

/// Stable identifier derived from the product name.
fn product_id(name: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..12].to_owned()
}

/// Flatten events into distinct products, keeping first occurrences.
pub(crate) fn parse_events(page: FdaPage, source: &str, limit: usize) -> Vec<Record> {
    let mut seen = HashSet::new();
    let mut records = Vec::new();

    for drug in page.results.into_iter().flat_map(|event| event.drug) {
        let ingredients: Vec<String> = drug
            .active_ingredients
            .iter()
            .filter_map(|i| i.name.clone())
            .collect();
        let name = match drug.brand_name.filter(|n| !n.trim().is_empty()) {
            Some(brand) => brand.trim().to_owned(),
            None => match ingredients.first() {
                Some(first) => first.clone(),
                None => continue,
            },
        };
        if !seen.insert(name.to_lowercase()) {
            continue;
        }

        let category = drug
            .atc_vet_code
            .clone()
            .or_else(|| drug.dosage_form.clone())
            .unwrap_or_else(|| "unclassified".to_owned());

        records.push(
            Record::new(product_id(&name), name, category, source)
                .with_metadata("activeSubstance", ingredients.join(", "))
                .with_metadata(
                    "manufacturer",
                    drug.manufacturer.and_then(|m| m.name).unwrap_or_default(),
                )
                .with_metadata("form", drug.dosage_form.unwrap_or_default())
                .with_metadata("route", drug.route.unwrap_or_default()),
        );
        if records.len() >= limit {
            break;
        }
    }
    records
}
