//! Deployment profiles.
//!
//! The gateway runs either as the drug lookup service or as the disease
//! alert service. A profile supplies the defaults that differ between the
//! two: listening port, cache TTL, whether a term is mandatory, the default
//! source table, the reference categories served on `/categories` and the
//! ASF zone reference served on `/alerts/asf`.

use std::fmt;
use std::str::FromStr;

use petcare_aggregate::{AggregatorConfig, SourceKind, SourceSpec};
use serde::{Deserialize, Serialize};

/// Which service this gateway instance provides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    /// Veterinary medicinal products lookup.
    #[default]
    Drugs,
    /// Animal disease outbreak alerts.
    Alerts,
}

/// One entry of the reference list served on `/categories`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    pub code: &'static str,
    pub name: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub notifiable: bool,
}

const ATC_VET_GROUPS: &[Category] = &[
    Category { code: "QA", name: "Alimentary tract and metabolism", notifiable: false },
    Category { code: "QJ", name: "Antiinfectives for systemic use", notifiable: false },
    Category { code: "QP", name: "Antiparasitic products", notifiable: false },
    Category { code: "QI", name: "Immunologicals", notifiable: false },
    Category { code: "QN", name: "Nervous system", notifiable: false },
    Category { code: "QM", name: "Musculo-skeletal system", notifiable: false },
];

const MONITORED_DISEASES: &[Category] = &[
    Category { code: "asf", name: "African swine fever", notifiable: true },
    Category { code: "hpai", name: "Highly pathogenic avian influenza", notifiable: true },
    Category { code: "rabies", name: "Rabies", notifiable: true },
];

/// One ASF restriction zone as drawn on the GIW map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AsfZone {
    #[serde(rename = "type")]
    pub zone: &'static str,
    pub name: &'static str,
    pub color: &'static str,
}

/// ASF restriction-zone reference served on `/alerts/asf`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsfReference {
    pub source: &'static str,
    pub disease: &'static str,
    pub map_url: &'static str,
    pub zones: &'static [AsfZone],
}

static ASF_REFERENCE: AsfReference = AsfReference {
    source: "GIW",
    disease: "ASF",
    map_url: "https://www.wetgiw.gov.pl/nadzor-weterynaryjny/asf-mapa",
    zones: &[
        AsfZone { zone: "I", name: "Zone I (protection)", color: "blue" },
        AsfZone { zone: "II", name: "Zone II (infected, wild boar)", color: "pink" },
        AsfZone { zone: "III", name: "Zone III (infected, domestic pigs)", color: "red" },
    ],
};

impl Profile {
    /// Service name reported on `/health`.
    pub fn service_name(self) -> &'static str {
        match self {
            Self::Drugs => "drug-service",
            Self::Alerts => "disease-alert-service",
        }
    }

    /// Port used when neither the config file nor `PORT` sets one.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Drugs => 8010,
            Self::Alerts => 8011,
        }
    }

    /// Aggregator defaults for this profile.
    pub fn aggregator_defaults(self) -> AggregatorConfig {
        let base = AggregatorConfig::default();
        match self {
            Self::Drugs => AggregatorConfig {
                deadline_ms: 20_000,
                cache_ttl_secs: 3_600,
                default_limit: 20,
                require_term: true,
                ..base
            },
            Self::Alerts => AggregatorConfig {
                cache_ttl_secs: 1_800,
                default_limit: 50,
                require_term: false,
                ..base
            },
        }
    }

    /// Filters applied to every lookup unless the caller passes them.
    pub fn default_filters(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Drugs => &[],
            Self::Alerts => &[("country", "POL")],
        }
    }

    /// Reference categories for `/categories`.
    pub fn categories(self) -> &'static [Category] {
        match self {
            Self::Drugs => ATC_VET_GROUPS,
            Self::Alerts => MONITORED_DISEASES,
        }
    }

    /// ASF zone reference; only the alerts service publishes it.
    pub fn asf_reference(self) -> Option<&'static AsfReference> {
        match self {
            Self::Drugs => None,
            Self::Alerts => Some(&ASF_REFERENCE),
        }
    }

    /// Source table used when the config file lists none.
    pub fn default_sources(self) -> Vec<SourceSpec> {
        match self {
            Self::Drugs => vec![
                SourceSpec::new(
                    "urpl",
                    SourceKind::Urpl,
                    "https://pub.rejestrymedyczne.csioz.gov.pl/api/rpl",
                )
                .named("URPL - Rejestr Produktów Leczniczych")
                .described("Polish register of medicinal products")
                .in_country("PL"),
                SourceSpec::new("fda", SourceKind::Openfda, "https://api.fda.gov")
                    .named("openFDA Animal & Veterinary")
                    .described("US FDA adverse event reports for veterinary drugs")
                    .in_country("US"),
                SourceSpec::new(
                    "ema",
                    SourceKind::Portal,
                    "https://www.ema.europa.eu/en/medicines/veterinary",
                )
                .named("EMA Union Product Database")
                .described("EU centrally authorised veterinary medicines")
                .in_country("EU")
                .with_note(
                    "EMA publishes no query API; bulk data is available at \
                     https://www.ema.europa.eu/en/medicines/download-medicine-data",
                ),
                SourceSpec::new("giw", SourceKind::Portal, "https://www.wetgiw.gov.pl")
                    .named("GIW - Główny Inspektorat Weterynarii")
                    .described("Polish veterinary inspectorate product registers")
                    .in_country("PL")
                    .with_note(
                        "See the product registers at https://www.wetgiw.gov.pl/handel-eksport-import/rejestry-produktow-leczniczych",
                    ),
                SourceSpec::new("formulary", SourceKind::Formulary, "")
                    .named("Clinic formulary")
                    .described("Common small-animal drugs with species and dosage"),
            ],
            Self::Alerts => vec![
                SourceSpec::new("woah", SourceKind::Wahis, "https://wahis.woah.org/api/v1")
                    .named("WOAH WAHIS")
                    .described("World Organisation for Animal Health outbreak events"),
                SourceSpec::new(
                    "adis",
                    SourceKind::Portal,
                    "https://food.ec.europa.eu/animals/animal-diseases/animal-disease-information-system-adis_en",
                )
                .named("ADNS/ADIS")
                .described("EU animal disease information system")
                .in_country("EU"),
                SourceSpec::new(
                    "giw",
                    SourceKind::Portal,
                    "https://www.wetgiw.gov.pl/nadzor-weterynaryjny/asf-mapa",
                )
                .named("GIW ASF map")
                .described("Polish ASF restriction zones")
                .in_country("PL"),
                SourceSpec::new("efsa", SourceKind::Portal, "https://www.efsa.europa.eu")
                    .named("EFSA")
                    .described("European Food Safety Authority animal health reports")
                    .in_country("EU"),
            ],
        }
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Drugs => "drugs",
            Self::Alerts => "alerts",
        })
    }
}

impl FromStr for Profile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drugs" | "drug" => Ok(Self::Drugs),
            "alerts" | "alert" => Ok(Self::Alerts),
            other => Err(format!("unknown profile {other:?} (expected drugs or alerts)")),
        }
    }
}
