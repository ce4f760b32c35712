//! Built-in reference formulary of common veterinary drugs.
//!
//! Answers from memory without touching the network. The term matches
//! name or category by case-insensitive substring; the `category` filter
//! matches exactly (ignoring case) and `species` must be listed for the drug.

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;

use crate::source::SourceClient;
use crate::types::{Query, Record, SourceDescriptor, SourceOutcome};

/// One formulary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormularyEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub category: &'static str,
    pub species: &'static [&'static str],
    pub dosage: &'static str,
}

/// The built-in entries.
pub const ENTRIES: &[FormularyEntry] = &[
    FormularyEntry {
        id: "1",
        name: "Amoxicillin",
        category: "Antibiotic",
        species: &["dog", "cat"],
        dosage: "10-20mg/kg",
    },
    FormularyEntry {
        id: "2",
        name: "Meloxicam",
        category: "NSAID",
        species: &["dog", "cat"],
        dosage: "0.1-0.2mg/kg",
    },
    FormularyEntry {
        id: "3",
        name: "Nobivac DHPPi",
        category: "Vaccine",
        species: &["dog"],
        dosage: "1ml SC",
    },
    FormularyEntry {
        id: "4",
        name: "Feliway",
        category: "Pheromone",
        species: &["cat"],
        dosage: "Spray/Diffuser",
    },
    FormularyEntry {
        id: "5",
        name: "Metacam",
        category: "NSAID",
        species: &["dog", "cat"],
        dosage: "0.1mg/kg",
    },
    FormularyEntry {
        id: "6",
        name: "Synulox",
        category: "Antibiotic",
        species: &["dog", "cat"],
        dosage: "12.5mg/kg",
    },
    FormularyEntry {
        id: "7",
        name: "Frontline",
        category: "Antiparasitic",
        species: &["dog", "cat"],
        dosage: "1 pipette/month",
    },
];

/// Distinct formulary categories, sorted.
pub fn categories() -> Vec<&'static str> {
    ENTRIES
        .iter()
        .map(|e| e.category)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

impl FormularyEntry {
    fn matches(&self, query: &Query) -> bool {
        let term = query.term_or_empty().trim().to_lowercase();
        if !term.is_empty()
            && !self.name.to_lowercase().contains(&term)
            && !self.category.to_lowercase().contains(&term)
        {
            return false;
        }
        if let Some(category) = query.filter("category") {
            if !self.category.eq_ignore_ascii_case(category) {
                return false;
            }
        }
        if let Some(species) = query.filter("species") {
            if !self.species.iter().any(|s| s.eq_ignore_ascii_case(species)) {
                return false;
            }
        }
        true
    }

    fn to_record(self, source: &str) -> Record {
        Record::new(self.id, self.name, self.category, source)
            .with_metadata("species", self.species.to_vec())
            .with_metadata("dosage", self.dosage)
    }
}

/// In-memory formulary source.
pub struct FormularySource {
    descriptor: SourceDescriptor,
}

impl FormularySource {
    pub fn new(descriptor: SourceDescriptor) -> Self {
        Self { descriptor }
    }
}

#[async_trait]
impl SourceClient for FormularySource {
    fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    async fn fetch(&self, query: &Query, _budget: Duration) -> SourceOutcome {
        let id = self.descriptor.id.as_str();
        let records = ENTRIES
            .iter()
            .filter(|e| e.matches(query))
            .take(query.limit)
            .map(|e| e.to_record(id))
            .collect();
        SourceOutcome::records(id, records)
    }
}
