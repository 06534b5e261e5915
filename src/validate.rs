//! Result validation
//!
//! Timing numbers are only comparable when every runner fetches the same
//! data. Before any timing starts, each implemented scenario is executed once
//! per runner and the number of distinct row ids is compared across runners.

use std::collections::{BTreeMap, HashSet};

use log::{debug, error, info};
use serde_json::{Map, Value};

use crate::errors::{BenchError, Result};
use crate::runner::Runner;
use crate::scenario::Scenario;

/// Output of one runner for one scenario
#[derive(Debug)]
struct ValidationRecord<'r> {
    runner: &'r str,
    data: Vec<Value>,
}

/// Number of rows once deduplicated by their `id` field.
///
/// Rows without an `id` (including `null` rows) all share the same key.
pub fn unique_len(rows: &[Value]) -> usize {
    rows.iter()
        .map(|row| row.get("id").map(Value::to_string))
        .collect::<HashSet<_>>()
        .len()
}

/// Ensure benchmark results are comparable to each other.
///
/// Runs sequentially, runner by runner and scenario by scenario, so the
/// diagnostics stay attributable. The first backend failure or length
/// mismatch aborts validation.
pub async fn validate(runners: &[Box<dyn Runner>]) -> Result<()> {
    info!("Validating benchmarks...");

    let mut results: BTreeMap<Scenario, Vec<ValidationRecord<'_>>> = BTreeMap::new();

    for runner in runners {
        for scenario in runner.scenarios() {
            let Some(execution) = runner.execute(scenario) else {
                continue;
            };

            let result = execution.await.map_err(|e| BenchError::ScenarioFailed {
                scenario: scenario.id(),
                runner: runner.name().to_string(),
                source: Box::new(e),
            })?;

            debug!(
                "{} returned {} rows for {}",
                runner.name(),
                result.len(),
                scenario
            );

            results.entry(scenario).or_default().push(ValidationRecord {
                runner: runner.name(),
                data: result.data,
            });
        }
    }

    for (scenario, records) in &results {
        if find_invalid(records).is_some() {
            error!(
                "Benchmark result lengths: {}",
                serde_json::to_string_pretty(&sample_lengths(records))?
            );
            return Err(BenchError::Mismatch {
                scenario: scenario.id(),
            });
        }
    }

    info!("Validated {} benchmarks", results.len());
    Ok(())
}

/// First record whose unique length differs from the first record's
fn find_invalid<'a, 'r>(records: &'a [ValidationRecord<'r>]) -> Option<&'a ValidationRecord<'r>> {
    let reference = unique_len(&records.first()?.data);

    records
        .iter()
        .find(|record| unique_len(&record.data) != reference)
}

/// Per-runner unique lengths, for diagnostics
fn sample_lengths(records: &[ValidationRecord<'_>]) -> Map<String, Value> {
    records
        .iter()
        .map(|record| (record.runner.to_string(), Value::from(unique_len(&record.data))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fixtures::*;
    use crate::runner::BenchTable;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_unique_len_ignores_duplicate_ids() {
        let rows = vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 1})];
        assert_eq!(unique_len(&rows), 2);
    }

    #[test]
    fn test_unique_len_collapses_rows_without_id() {
        let rows = vec![Value::Null, json!({"title": "x"}), json!({"id": 7})];
        assert_eq!(unique_len(&rows), 2);
    }

    #[test]
    fn test_unique_len_distinguishes_id_types() {
        let rows = vec![json!({"id": 1}), json!({"id": "1"})];
        assert_eq!(unique_len(&rows), 2);
    }

    #[tokio::test]
    async fn test_matching_lengths_pass() {
        let counts = [(Scenario::FindManyAllLimitFilter, 1800)];
        let runners = vec![
            runner("a", full_table(), &counts).boxed(),
            runner("b", full_table(), &counts).boxed(),
        ];

        validate(&runners).await.unwrap();
    }

    #[tokio::test]
    async fn test_mismatch_names_the_scenario() {
        let runners = vec![
            runner("a", full_table(), &[(Scenario::FindManyAllLimitFilter, 1800)]).boxed(),
            runner("b", full_table(), &[(Scenario::FindManyAllLimitFilter, 1799)]).boxed(),
        ];

        let err = validate(&runners).await.unwrap_err();
        assert!(matches!(
            err,
            BenchError::Mismatch { scenario: "FIND_MANY_ALL_LIMIT_FILTER" }
        ));
        assert!(err.to_string().contains("FIND_MANY_ALL_LIMIT_FILTER"));
    }

    #[tokio::test]
    async fn test_scenarios_implemented_by_one_runner_are_not_compared() {
        let partial = BenchTable::new().with(Scenario::FindManyAllLimit, find_many_all_limit);
        let runners = vec![
            runner(
                "full",
                full_table(),
                &[(Scenario::FindManyAllLimit, 2000), (Scenario::ActorDetails, 1)],
            )
            .boxed(),
            runner("partial", partial, &[(Scenario::FindManyAllLimit, 2000)]).boxed(),
        ];

        validate(&runners).await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_failure_is_wrapped() {
        let table = BenchTable::new().with(Scenario::ActorDetails, broken);
        let runners = vec![runner("flaky", table, &[]).boxed()];

        match validate(&runners).await.unwrap_err() {
            BenchError::ScenarioFailed { scenario, runner, .. } => {
                assert_eq!(scenario, "ACTOR_DETAILS");
                assert_eq!(runner, "flaky");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_each_scenario_runs_once_per_runner() {
        let runner = runner("a", full_table(), &[]);
        let calls = runner.client().calls.clone();

        validate(&[runner.boxed()]).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
