//! Timed execution of a [`BenchPlan`] with criterion

use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use criterion::Criterion;
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::runtime::Runtime;

use crate::dispatch::BenchPlan;
use crate::errors::{BenchError, Result};

/// Environment variable holding the engine configuration as JSON
pub const CONFIG_VAR: &str = "CRITERION_CONFIG";

/// Settings forwarded to criterion
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub sample_size: usize,
    pub warm_up_time_ms: u64,
    pub measurement_time_ms: u64,
    pub noise_threshold: f64,
    pub output_directory: PathBuf,
    pub plots: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            sample_size: 100,
            warm_up_time_ms: 3_000,
            measurement_time_ms: 5_000,
            noise_threshold: 0.01,
            output_directory: PathBuf::from("target/criterion"),
            plots: false,
        }
    }
}

impl EngineConfig {
    /// Parse a JSON blob. Missing fields keep their defaults.
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(raw)
            .map_err(|e| BenchError::InvalidConfig(format!("{CONFIG_VAR}: {e}")))?;
        config.check()?;
        Ok(config)
    }

    /// Read [`CONFIG_VAR`], falling back to the defaults when unset
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_VAR) {
            Ok(raw) if !raw.trim().is_empty() => Self::from_json(&raw),
            _ => Ok(Self::default()),
        }
    }

    fn check(&self) -> Result<()> {
        if self.sample_size < 10 {
            return Err(BenchError::InvalidConfig(format!(
                "sample_size must be at least 10, got {}",
                self.sample_size
            )));
        }
        if self.warm_up_time_ms == 0 || self.measurement_time_ms == 0 {
            return Err(BenchError::InvalidConfig(
                "warm_up_time_ms and measurement_time_ms must be positive".to_string(),
            ));
        }
        if !(self.noise_threshold >= 0.0) {
            return Err(BenchError::InvalidConfig(format!(
                "noise_threshold must not be negative, got {}",
                self.noise_threshold
            )));
        }
        Ok(())
    }

    /// Build the criterion driver
    pub fn criterion(&self) -> Criterion {
        let criterion = Criterion::default()
            .sample_size(self.sample_size)
            .warm_up_time(Duration::from_millis(self.warm_up_time_ms))
            .measurement_time(Duration::from_millis(self.measurement_time_ms))
            .noise_threshold(self.noise_threshold)
            .output_directory(&self.output_directory);

        if self.plots {
            criterion.with_plots()
        } else {
            criterion.without_plots()
        }
    }
}

/// Time every group of the plan.
///
/// Must be called outside of `runtime.block_on`, criterion drives the
/// runtime itself. The first failure of a group aborts the run once that
/// group has finished.
pub fn run(runtime: &Runtime, plan: &BenchPlan<'_>, config: &EngineConfig) -> Result<()> {
    let mut criterion = config.criterion();
    info!(
        "Timing {} benchmark(s) in {} group(s)",
        plan.entry_count(),
        plan.groups.len()
    );

    for group in &plan.groups {
        let scenario = group.scenario;
        if group.entries.is_empty() {
            warn!("No runner implements {}", scenario);
        }

        // First failure of the group, with the runner that produced it
        let failed: Mutex<Option<(String, BenchError)>> = Mutex::new(None);
        let slot = &failed;

        let mut bench_group = criterion.benchmark_group(scenario.id());
        for &runner in &group.entries {
            debug!("Timing {} on {}", scenario, runner.name());
            bench_group.bench_function(runner.name(), move |b| {
                b.to_async(runtime).iter(move || async move {
                    let Some(execution) = runner.execute(scenario) else {
                        return None;
                    };
                    // The rows go through criterion's black_box
                    match execution.await {
                        Ok(result) => Some(result),
                        Err(source) => {
                            let mut slot = slot.lock().unwrap_or_else(PoisonError::into_inner);
                            if slot.is_none() {
                                *slot = Some((runner.name().to_string(), source));
                            }
                            None
                        }
                    }
                })
            });
        }
        bench_group.finish();

        // Abort only once the whole group is measured
        if let Some((runner, source)) = failed.into_inner().unwrap_or_else(PoisonError::into_inner) {
            return Err(BenchError::ScenarioFailed {
                scenario: scenario.id(),
                runner,
                source: Box::new(source),
            });
        }
    }

    // Writes criterion's report index
    criterion.final_summary();
    Ok(())
}
