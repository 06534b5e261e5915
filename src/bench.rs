//! Benchmark session
//!
//! Drives connected runners through dispatch, timing and reporting, and
//! closes them once the session is over.

use std::path::PathBuf;

use log::info;
use tokio::runtime::Runtime;

use crate::backend::disconnect_all;
use crate::dispatch::dispatch;
use crate::engine::{self, EngineConfig};
use crate::errors::Result;
use crate::report::{self, RunSummary};
use crate::runner::Runner;
use crate::scenario::Scenario;

/// What a session runs and where it writes its results
#[derive(Debug, Clone, Default)]
pub struct BenchOptions {
    /// Scenarios to run, the whole registry when empty
    pub scenarios: Vec<Scenario>,
    /// Skip result validation before timing
    pub skip_validation: bool,
    /// Where to write the JSON summary, if anywhere
    pub json: Option<PathBuf>,
}

/// Run a full session over `runners`, then close them.
///
/// The runners are closed whether the session succeeds or fails. Must be
/// called outside of `rt.block_on`.
pub fn execute(
    rt: &Runtime,
    runners: Vec<Box<dyn Runner>>,
    options: &BenchOptions,
    engine_config: &EngineConfig,
) -> Result<RunSummary> {
    let result = run(rt, &runners, options, engine_config);

    rt.block_on(disconnect_all(&runners));
    result
}

fn run(
    rt: &Runtime,
    runners: &[Box<dyn Runner>],
    options: &BenchOptions,
    engine_config: &EngineConfig,
) -> Result<RunSummary> {
    let scenarios = (!options.scenarios.is_empty()).then_some(options.scenarios.as_slice());

    // Validation and registration
    let plan = rt.block_on(dispatch(runners, scenarios, options.skip_validation))?;

    // Timing, criterion blocks on the runtime itself
    engine::run(rt, &plan, engine_config)?;

    let summary = report::collect(&plan, &engine_config.output_directory);
    if let Some(path) = &options.json {
        summary.write_json(path)?;
        info!("Results written to {}", path.display());
    }

    Ok(summary)
}
