//! Runners
//!
//! A runner is one backend configuration: a display name, a table mapping
//! scenarios to implementations, and the live client handle the
//! implementations run against. Runners with different client types are
//! handled uniformly through the [`Runner`] trait.

use std::collections::HashMap;

use futures::future::BoxFuture;
use serde_json::Value;

use crate::errors::{BenchError, Result};
use crate::scenario::Scenario;

/// Normalized output of a scenario: the rows it returned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchResult {
    /// One JSON value per returned row
    pub data: Vec<Value>,
}

impl BenchResult {
    /// Wrap a list of rows
    pub fn new(data: Vec<Value>) -> Self {
        BenchResult { data }
    }

    /// Result of a find-unique style lookup. A missing record is kept as a
    /// single `null` row so every runner reports the same length.
    pub fn unique(row: Option<Value>) -> Self {
        BenchResult {
            data: vec![row.unwrap_or(Value::Null)],
        }
    }

    /// Number of rows, duplicates included
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the scenario returned no rows at all
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// A scenario implementation for clients of type `C`
pub type BenchFn<C> = for<'a> fn(&'a C) -> BoxFuture<'a, Result<BenchResult>>;

/// Scenario implementations of one backend. Scenarios without an entry are
/// not implemented by that backend.
pub struct BenchTable<C> {
    entries: HashMap<Scenario, BenchFn<C>>,
}

impl<C> BenchTable<C> {
    /// Empty table, implementing nothing
    pub fn new() -> Self {
        BenchTable {
            entries: HashMap::new(),
        }
    }

    /// Register (or replace) the implementation of a scenario
    pub fn with(mut self, scenario: Scenario, bench: BenchFn<C>) -> Self {
        self.entries.insert(scenario, bench);
        self
    }

    /// Implementation of a scenario, if the backend has one
    pub fn get(&self, scenario: Scenario) -> Option<BenchFn<C>> {
        self.entries.get(&scenario).copied()
    }

    /// Whether the backend implements a scenario
    pub fn contains(&self, scenario: Scenario) -> bool {
        self.entries.contains_key(&scenario)
    }

    /// Implemented scenarios, in registry order
    pub fn scenarios(&self) -> Vec<Scenario> {
        Scenario::ALL
            .iter()
            .copied()
            .filter(|s| self.entries.contains_key(s))
            .collect()
    }

    /// Number of implemented scenarios
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table implements no scenario
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<C> Default for BenchTable<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Clone for BenchTable<C> {
    fn clone(&self) -> Self {
        BenchTable {
            entries: self.entries.clone(),
        }
    }
}

/// A live client handle owned by a runner
pub trait Client: Send + Sync + 'static {
    /// Close the underlying connection(s). Best effort, never fails.
    fn close(&self) -> BoxFuture<'_, ()>;
}

/// Type-erased view of a backend runner
pub trait Runner: Send + Sync {
    /// Display name, also used by the `--runner` filter
    fn name(&self) -> &str;

    /// Whether this runner has an implementation for the scenario
    fn implements(&self, scenario: Scenario) -> bool;

    /// Implemented scenarios, in registry order
    fn scenarios(&self) -> Vec<Scenario>;

    /// Start executing a scenario, or `None` if it is not implemented
    fn execute(&self, scenario: Scenario) -> Option<BoxFuture<'_, Result<BenchResult>>>;

    /// Close the client handle
    fn close(&self) -> BoxFuture<'_, ()>;
}

/// A runner backed by a client of type `C`
pub struct BackendRunner<C> {
    name: String,
    table: BenchTable<C>,
    client: C,
}

impl<C: Client> BackendRunner<C> {
    /// Create a runner from its display name, its table and an open client
    pub fn new<S: Into<String>>(name: S, table: BenchTable<C>, client: C) -> Self {
        BackendRunner {
            name: name.into(),
            table,
            client,
        }
    }

    /// The client handle the scenarios run against
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Box the runner so it can sit next to runners of other client types
    pub fn boxed(self) -> Box<dyn Runner> {
        Box::new(self)
    }
}

impl<C: Client> Runner for BackendRunner<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn implements(&self, scenario: Scenario) -> bool {
        self.table.contains(scenario)
    }

    fn scenarios(&self) -> Vec<Scenario> {
        self.table.scenarios()
    }

    fn execute(&self, scenario: Scenario) -> Option<BoxFuture<'_, Result<BenchResult>>> {
        self.table.get(scenario).map(|bench| bench(&self.client))
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        self.client.close()
    }
}

/// Keep the items whose name matches one of `filters`, ignoring case.
///
/// An empty filter list keeps everything. Fails with [`BenchError::NoRunners`]
/// when nothing is left.
pub fn select_by_name<T, F>(items: Vec<T>, filters: &[String], name: F) -> Result<Vec<T>>
where
    F: Fn(&T) -> &str,
{
    let selected: Vec<T> = if filters.is_empty() {
        items
    } else {
        let filters: Vec<String> = filters.iter().map(|f| f.to_lowercase()).collect();
        items
            .into_iter()
            .filter(|item| filters.contains(&name(item).to_lowercase()))
            .collect()
    };

    if selected.is_empty() {
        return Err(BenchError::NoRunners);
    }

    Ok(selected)
}

/// In-memory runners used by the stage tests
#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Client answering every scenario with `counts[scenario]` distinct rows
    pub struct FakeClient {
        counts: HashMap<Scenario, usize>,
        pub calls: Arc<AtomicUsize>,
        pub closed: Arc<AtomicBool>,
    }

    impl FakeClient {
        pub fn new(counts: &[(Scenario, usize)]) -> Self {
            FakeClient {
                counts: counts.iter().copied().collect(),
                calls: Arc::new(AtomicUsize::new(0)),
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        fn rows(&self, scenario: Scenario) -> BoxFuture<'_, Result<BenchResult>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = self.counts.get(&scenario).copied().unwrap_or(0);
            Box::pin(async move {
                Ok(BenchResult::new((0..n).map(|id| json!({ "id": id })).collect()))
            })
        }
    }

    impl Client for FakeClient {
        fn close(&self) -> BoxFuture<'_, ()> {
            self.closed.store(true, Ordering::SeqCst);
            Box::pin(async {})
        }
    }

    pub fn find_many_all_limit(client: &FakeClient) -> BoxFuture<'_, Result<BenchResult>> {
        client.rows(Scenario::FindManyAllLimit)
    }

    pub fn find_many_all_limit_filter(client: &FakeClient) -> BoxFuture<'_, Result<BenchResult>> {
        client.rows(Scenario::FindManyAllLimitFilter)
    }

    pub fn actor_details(client: &FakeClient) -> BoxFuture<'_, Result<BenchResult>> {
        client.rows(Scenario::ActorDetails)
    }

    pub fn broken(client: &FakeClient) -> BoxFuture<'_, Result<BenchResult>> {
        client.calls.fetch_add(1, Ordering::SeqCst);
        Box::pin(async {
            Err(BenchError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset",
            )))
        })
    }

    /// Table with the three regular fixture scenarios
    pub fn full_table() -> BenchTable<FakeClient> {
        BenchTable::new()
            .with(Scenario::FindManyAllLimit, find_many_all_limit)
            .with(Scenario::FindManyAllLimitFilter, find_many_all_limit_filter)
            .with(Scenario::ActorDetails, actor_details)
    }

    pub fn runner(
        name: &str,
        table: BenchTable<FakeClient>,
        counts: &[(Scenario, usize)],
    ) -> BackendRunner<FakeClient> {
        BackendRunner::new(name, table, FakeClient::new(counts))
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_table_scenarios_follow_registry_order() {
        let table = BenchTable::<FakeClient>::new()
            .with(Scenario::ActorDetails, actor_details)
            .with(Scenario::FindManyAllLimit, find_many_all_limit);

        assert_eq!(
            table.scenarios(),
            vec![Scenario::FindManyAllLimit, Scenario::ActorDetails]
        );
        assert!(!table.contains(Scenario::FindManyAll));
    }

    #[tokio::test]
    async fn test_execute_runs_registered_scenario() {
        let runner = runner(
            "fake",
            full_table(),
            &[(Scenario::FindManyAllLimit, 3)],
        );

        let result = runner
            .execute(Scenario::FindManyAllLimit)
            .expect("implemented")
            .await
            .unwrap();
        assert_eq!(result.len(), 3);
        assert!(runner.execute(Scenario::FindManyAll).is_none());
        assert_eq!(runner.client().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_reaches_client() {
        let runner = runner("fake", full_table(), &[]);
        let closed = runner.client().closed.clone();

        let boxed = runner.boxed();
        boxed.close().await;
        assert!(closed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_unique_keeps_missing_row_as_null() {
        let result = BenchResult::unique(None);
        assert_eq!(result.data, vec![Value::Null]);
    }

    #[test]
    fn test_select_by_name_is_case_insensitive() {
        let names = vec!["Pooled JSON", "Stitching"];
        let selected =
            select_by_name(names, &["pooled json".to_string()], |n| *n).unwrap();
        assert_eq!(selected, vec!["Pooled JSON"]);
    }

    #[test]
    fn test_select_by_name_without_filter_keeps_all() {
        let names = vec!["a", "b"];
        assert_eq!(select_by_name(names, &[], |n| *n).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_select_by_name_rejects_empty_selection() {
        let names = vec!["a", "b"];
        let err = select_by_name(names, &["nope".to_string()], |n| *n).unwrap_err();
        assert!(matches!(err, BenchError::NoRunners));
    }
}
