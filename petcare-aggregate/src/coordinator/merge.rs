//! Merging per-source outcomes into one response.
//!
//! Records are never scored or ranked across sources: the merged list is
//! source order (as requested), then provider order. Within that order a
//! record repeating an earlier `(source, id)` pair is dropped.

use std::collections::HashSet;

use crate::types::{AggregatedResponse, Query, Record, SourceDescriptor, SourceOutcome, SourceStatus};

/// Merge `outcomes` (in request order) into an uncached response.
///
/// `descriptor` looks up display metadata for a source id; sources it does
/// not know are reported with their id as name and an empty url.
pub fn merge<'a, F>(query: &Query, outcomes: Vec<SourceOutcome>, descriptor: F) -> AggregatedResponse
where
    F: Fn(&str) -> Option<&'a SourceDescriptor>,
{
    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut results: Vec<Record> = Vec::new();
    let mut sources = Vec::with_capacity(outcomes.len());

    for outcome in outcomes {
        let id = outcome.source_id().to_owned();
        let (name, url) = descriptor(&id)
            .map(|d| (d.name.clone(), d.url.clone()))
            .unwrap_or_else(|| (id.clone(), String::new()));

        let status = match outcome {
            SourceOutcome::Records { records, note, .. } => {
                let mut count = 0;
                for record in records {
                    if seen.insert((record.source.clone(), record.id.clone())) {
                        count += 1;
                        results.push(record);
                    }
                }
                SourceStatus {
                    id,
                    name,
                    url,
                    count,
                    error: None,
                    message: None,
                    note,
                }
            }
            SourceOutcome::Failure(failure) => SourceStatus {
                id,
                name,
                url,
                count: 0,
                error: Some(failure.kind),
                message: Some(failure.message),
                note: None,
            },
        };
        sources.push(status);
    }

    results.truncate(query.limit);
    AggregatedResponse {
        query: query.clone(),
        total: results.len(),
        sources,
        results,
        cached: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Degradation, ResultKind, SourceErrorKind};

    fn descriptors() -> Vec<SourceDescriptor> {
        ["urpl", "fda"]
            .into_iter()
            .map(|id| SourceDescriptor {
                id: id.into(),
                name: id.to_uppercase(),
                url: format!("https://{id}.test"),
                supports_live_query: true,
                result_kind: ResultKind::Drug,
                description: String::new(),
                country: None,
            })
            .collect()
    }

    fn record(id: &str, source: &str) -> Record {
        Record::new(id, format!("{source}-{id}"), "QJ", source)
    }

    fn run(query: &Query, outcomes: Vec<SourceOutcome>) -> AggregatedResponse {
        let descriptors = descriptors();
        merge(query, outcomes, |id| descriptors.iter().find(|d| d.id == id))
    }

    #[test]
    fn keeps_source_then_provider_order() {
        let response = run(
            &Query::new("x"),
            vec![
                SourceOutcome::records("fda", vec![record("b", "fda"), record("a", "fda")]),
                SourceOutcome::records("urpl", vec![record("z", "urpl")]),
            ],
        );
        let ids: Vec<&str> = response.results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a", "z"]);
        assert_eq!(response.sources[0].id, "fda");
        assert_eq!(response.sources[0].name, "FDA");
        assert_eq!(response.total, 3);
        assert!(!response.cached);
    }

    #[test]
    fn dedups_on_source_and_id() {
        let response = run(
            &Query::new("x"),
            vec![
                SourceOutcome::records(
                    "urpl",
                    vec![record("1", "urpl"), record("1", "urpl"), record("2", "urpl")],
                ),
                SourceOutcome::records("fda", vec![record("1", "fda")]),
            ],
        );
        assert_eq!(response.results.len(), 3);
        assert_eq!(response.sources[0].count, 2);
        assert_eq!(response.sources[1].count, 1);
    }

    #[test]
    fn failures_become_status_entries() {
        let response = run(
            &Query::new("x"),
            vec![
                SourceOutcome::records("urpl", vec![record("1", "urpl")]),
                SourceOutcome::failure("fda", SourceErrorKind::Timeout, "no answer"),
            ],
        );
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.sources[1].error, Some(SourceErrorKind::Timeout));
        assert_eq!(response.sources[1].message.as_deref(), Some("no answer"));
        assert_eq!(response.degradation(), Degradation::Partial);
    }

    #[test]
    fn truncates_after_merge_but_counts_before() {
        let records = (0..10).map(|i| record(&i.to_string(), "urpl")).collect();
        let response = run(
            &Query::new("x").with_limit(4),
            vec![SourceOutcome::records("urpl", records)],
        );
        assert_eq!(response.results.len(), 4);
        assert_eq!(response.total, 4);
        assert_eq!(response.sources[0].count, 10);
    }

    #[test]
    fn unknown_source_uses_id_as_name() {
        let response = run(
            &Query::new("x"),
            vec![SourceOutcome::note("ema", "see portal")],
        );
        assert_eq!(response.sources[0].name, "ema");
        assert_eq!(response.sources[0].note.as_deref(), Some("see portal"));
    }
}
