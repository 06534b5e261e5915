//! Benchmark dispatch
//!
//! Turns the requested scenarios and the live runners into a [`BenchPlan`]:
//! one group per scenario, one timed entry per runner implementing it.

use log::{debug, info};

use crate::errors::{BenchError, Result};
use crate::runner::Runner;
use crate::scenario::Scenario;
use crate::validate::validate;

/// One benchmark group: a scenario and the runners timed against it
pub struct BenchGroup<'r> {
    pub scenario: Scenario,
    pub entries: Vec<&'r dyn Runner>,
}

impl BenchGroup<'_> {
    /// Names of the runners in this group
    pub fn runner_names(&self) -> Vec<&str> {
        self.entries.iter().map(|runner| runner.name()).collect()
    }
}

/// Benchmarks registered for a run, in registry order
pub struct BenchPlan<'r> {
    pub groups: Vec<BenchGroup<'r>>,
}

impl BenchPlan<'_> {
    /// Total number of timed entries across all groups
    pub fn entry_count(&self) -> usize {
        self.groups.iter().map(|group| group.entries.len()).sum()
    }
}

/// Build the benchmark plan.
///
/// `scenarios` restricts the run to the named scenarios (all of them when
/// `None`). Unless `skip_validation` is set, every runner is validated
/// first; runners lacking a scenario are left out of that scenario's group.
pub async fn dispatch<'r>(
    runners: &'r [Box<dyn Runner>],
    scenarios: Option<&[Scenario]>,
    skip_validation: bool,
) -> Result<BenchPlan<'r>> {
    if runners.is_empty() {
        return Err(BenchError::NoRunners);
    }

    let scenarios = Scenario::resolve(scenarios);

    if skip_validation {
        info!("Skipping validation");
    } else {
        validate(runners).await?;
    }

    let groups: Vec<BenchGroup<'r>> = scenarios
        .into_iter()
        .map(|scenario| {
            let entries: Vec<&'r dyn Runner> = runners
                .iter()
                .map(|runner| runner.as_ref())
                .filter(|runner| runner.implements(scenario))
                .collect();

            debug!("{}: {} runner(s)", scenario, entries.len());
            BenchGroup { scenario, entries }
        })
        .collect();

    let plan = BenchPlan { groups };
    info!(
        "Registered {} benchmark groups ({} entries)",
        plan.groups.len(),
        plan.entry_count()
    );

    Ok(plan)
}
