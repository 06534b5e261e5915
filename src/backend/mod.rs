//! PostgreSQL backends
//!
//! Each [`BackendKind`] pairs a connection strategy with a scenario table.
//! All of them talk to the same database through `sqlx`.

pub mod json;
pub mod models;
pub mod stitch;

use futures::future::{join_all, try_join_all, BoxFuture};
use log::{debug, info};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;
use crate::errors::Result;
use crate::runner::{BackendRunner, BenchTable, Client, Runner};

impl Client for PgPool {
    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(sqlx::Pool::close(self))
    }
}

/// Known backend configurations, in runner order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    /// JSON built by PostgreSQL, over a connection pool
    PooledJson,
    /// JSON built by PostgreSQL, over a single connection
    SingleConnectionJson,
    /// Typed rows stitched in process, over a connection pool
    PooledStitch,
}

impl BackendKind {
    /// Every backend, in runner order
    pub const ALL: [BackendKind; 3] = [
        BackendKind::PooledJson,
        BackendKind::SingleConnectionJson,
        BackendKind::PooledStitch,
    ];

    /// Display name of the runner
    pub fn name(self) -> &'static str {
        match self {
            BackendKind::PooledJson => "sqlx pool, JSON aggregation",
            BackendKind::SingleConnectionJson => "sqlx single connection, JSON aggregation",
            BackendKind::PooledStitch => "sqlx pool, relation stitching",
        }
    }

    /// Pool size used by this backend
    fn max_connections(self, config: &Config) -> u32 {
        match self {
            BackendKind::SingleConnectionJson => 1,
            BackendKind::PooledJson | BackendKind::PooledStitch => config.pool_size,
        }
    }

    /// Scenario table of this backend
    fn benches(self) -> BenchTable<PgPool> {
        match self {
            BackendKind::PooledJson | BackendKind::SingleConnectionJson => json::benches(),
            BackendKind::PooledStitch => stitch::benches(),
        }
    }

    /// Open the client and wrap it in a runner
    pub async fn connect(self, config: &Config) -> Result<Box<dyn Runner>> {
        // The single connection runner ignores the configured pool size
        let max_connections = self.max_connections(config);
        debug!("Connecting {} with {} connection(s)", self.name(), max_connections);

        // Schema, statement logging and credentials all come from the options
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_with(config.connect_options()?)
            .await?;

        // Both JSON runners share one table, only the pool differs
        Ok(BackendRunner::new(self.name(), self.benches(), pool).boxed())
    }
}

/// Connect every backend concurrently. The first failure wins.
pub async fn connect_all(kinds: &[BackendKind], config: &Config) -> Result<Vec<Box<dyn Runner>>> {
    info!("Connecting {} runner(s)", kinds.len());
    try_join_all(kinds.iter().map(|kind| kind.connect(config))).await
}

/// Close every runner concurrently
pub async fn disconnect_all(runners: &[Box<dyn Runner>]) {
    join_all(runners.iter().map(|runner| async move {
        runner.close().await;
        debug!("Closed {}", runner.name());
    }))
    .await;
    info!("Disconnected {} runner(s)", runners.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::fixtures::{full_table, runner};
    use crate::runner::select_by_name;
    use crate::scenario::Scenario;
    use std::sync::atomic::Ordering;

    fn config() -> Config {
        Config {
            database_url: "postgres://localhost/movies".to_string(),
            schema: None,
            log_queries: false,
            pool_size: 8,
        }
    }

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<&str> = BackendKind::ALL.iter().map(|k| k.name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), BackendKind::ALL.len());
    }

    #[test]
    fn test_single_connection_is_capped() {
        let config = config();
        assert_eq!(BackendKind::PooledJson.max_connections(&config), 8);
        assert_eq!(BackendKind::SingleConnectionJson.max_connections(&config), 1);
        assert_eq!(BackendKind::PooledStitch.max_connections(&config), 8);
    }

    #[test]
    fn test_select_by_name_ignores_case() {
        let filters = vec!["SQLX POOL, RELATION STITCHING".to_string()];
        let kinds = select_by_name(BackendKind::ALL.to_vec(), &filters, |k| k.name()).unwrap();
        assert_eq!(kinds, vec![BackendKind::PooledStitch]);
    }

    #[test]
    fn test_stitching_table_is_partial() {
        let json = BackendKind::PooledJson.benches();
        let stitch = BackendKind::PooledStitch.benches();

        assert!(json.contains(Scenario::ActorDetails));
        assert!(!stitch.contains(Scenario::ActorDetails));
        assert_eq!(json.len(), Scenario::ALL.len());
    }

    #[tokio::test]
    async fn test_connect_all_without_backends() {
        let runners = connect_all(&[], &config()).await.unwrap();
        assert!(runners.is_empty());
        disconnect_all(&runners).await;
    }

    #[tokio::test]
    async fn test_disconnect_all_closes_every_runner() {
        let first = runner("first", full_table(), &[]);
        let second = runner("second", full_table(), &[]);
        let closed = [first.client().closed.clone(), second.client().closed.clone()];

        disconnect_all(&[first.boxed(), second.boxed()]).await;

        assert!(closed.iter().all(|flag| flag.load(Ordering::SeqCst)));
    }
}
