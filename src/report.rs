//! Run summary
//!
//! Reads the samples criterion saved for every entry of a plan and turns
//! them into per-iteration statistics, printed as a table and optionally
//! written as JSON.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use colored::*;
use log::{debug, warn};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};

use crate::dispatch::BenchPlan;
use crate::errors::Result;

/// Longest directory name criterion produces
const MAX_DIRECTORY_NAME_LEN: usize = 64;

/// Per-iteration timings, in nanoseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub p50: f64,
    pub p75: f64,
    pub p99: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkSummary {
    pub group: String,
    pub name: String,
    pub stats: Stats,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub benchmarks: Vec<BenchmarkSummary>,
}

/// Layout of criterion's `sample.json`
#[derive(Debug, Deserialize)]
struct SavedSample {
    iters: Vec<f64>,
    times: Vec<f64>,
}

/// Same escaping criterion applies to group and function directory names
pub fn filename_safe(name: &str) -> String {
    let mut safe = name.replace(['?', '"', '/', '\\', '*', '<', '>', ':', '|', '^'], "_");

    if safe.len() > MAX_DIRECTORY_NAME_LEN {
        let mut end = MAX_DIRECTORY_NAME_LEN;
        while !safe.is_char_boundary(end) {
            end -= 1;
        }
        safe.truncate(end);
    }

    // Windows drops trailing spaces and ignores case in directory names
    if cfg!(target_os = "windows") {
        safe = safe.trim_end().to_lowercase();
    }

    safe
}

/// Location of the latest samples of `group/name`
pub fn sample_path(output_dir: &Path, group: &str, name: &str) -> PathBuf {
    output_dir
        .join(filename_safe(group))
        .join(filename_safe(name))
        .join("new")
        .join("sample.json")
}

/// Statistics over the per-iteration times of a measurement.
///
/// Returns `None` when there is nothing to measure.
pub fn stats_from_samples(iters: &[f64], times: &[f64]) -> Option<Stats> {
    let mut per_iter: Vec<f64> = iters
        .iter()
        .zip(times)
        .filter(|(iters, _)| **iters > 0.0)
        .map(|(iters, time)| time / iters)
        .collect();

    if per_iter.is_empty() {
        return None;
    }
    per_iter.sort_by(|a, b| a.total_cmp(b));

    let samples = per_iter.len();
    let avg = per_iter.iter().sum::<f64>() / samples as f64;

    Some(Stats {
        avg,
        min: per_iter[0],
        max: per_iter[samples - 1],
        p50: percentile(&per_iter, 50.0),
        p75: percentile(&per_iter, 75.0),
        p99: percentile(&per_iter, 99.0),
        samples,
    })
}

/// Nearest-rank percentile of sorted values
fn percentile(sorted: &[f64], p: f64) -> f64 {
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

fn read_samples(path: &Path) -> Result<SavedSample> {
    let file = File::open(path)?;
    let sample = serde_json::from_reader(BufReader::new(file))?;
    Ok(sample)
}

/// Gather the statistics of every entry in the plan.
///
/// Entries without readable samples are skipped with a warning.
pub fn collect(plan: &BenchPlan<'_>, output_dir: &Path) -> RunSummary {
    let mut benchmarks = Vec::with_capacity(plan.entry_count());

    for group in &plan.groups {
        let group_name = group.scenario.id();
        for runner in &group.entries {
            let path = sample_path(output_dir, group_name, runner.name());
            let stats = match read_samples(&path) {
                Ok(sample) => stats_from_samples(&sample.iters, &sample.times),
                Err(e) => {
                    warn!("Skipping {} / {}: {}", group_name, runner.name(), e);
                    continue;
                }
            };

            match stats {
                Some(stats) => benchmarks.push(BenchmarkSummary {
                    group: group_name.to_string(),
                    name: runner.name().to_string(),
                    stats,
                }),
                None => warn!("No samples for {} / {}", group_name, runner.name()),
            }
        }
    }

    RunSummary {
        generated_at: Utc::now(),
        benchmarks,
    }
}

fn format_ns(ns: f64) -> String {
    if ns >= 1_000_000_000.0 {
        format!("{:.2} s", ns / 1_000_000_000.0)
    } else if ns >= 1_000_000.0 {
        format!("{:.2} ms", ns / 1_000_000.0)
    } else if ns >= 1_000.0 {
        format!("{:.2} µs", ns / 1_000.0)
    } else {
        format!("{:.0} ns", ns)
    }
}

impl RunSummary {
    /// Render the summary, highlighting the fastest runner of each group
    pub fn to_table(&self, colored: bool) -> Table {
        let mut table = Table::new();

        table.add_row(Row::new(
            ["Scenario", "Runner", "avg", "min", "p75", "p99", "samples"]
                .iter()
                .map(|title| {
                    if colored {
                        Cell::new(&title.bold().to_string())
                    } else {
                        Cell::new(title)
                    }
                })
                .collect(),
        ));

        for (index, summary) in self.benchmarks.iter().enumerate() {
            let fastest = self
                .benchmarks
                .iter()
                .filter(|other| other.group == summary.group)
                .map(|other| other.stats.avg)
                .fold(f64::INFINITY, f64::min);
            let is_fastest = summary.stats.avg <= fastest;

            // Only the first row of a group names the scenario
            let first_in_group = index == 0 || self.benchmarks[index - 1].group != summary.group;
            let group = if first_in_group { summary.group.as_str() } else { "" };

            let name = if colored && is_fastest {
                summary.name.green().bold().to_string()
            } else {
                summary.name.clone()
            };
            let avg = if colored && is_fastest {
                format_ns(summary.stats.avg).green().to_string()
            } else {
                format_ns(summary.stats.avg)
            };

            table.add_row(Row::new(vec![
                Cell::new(group),
                Cell::new(&name),
                Cell::new(&avg),
                Cell::new(&format_ns(summary.stats.min)),
                Cell::new(&format_ns(summary.stats.p75)),
                Cell::new(&format_ns(summary.stats.p99)),
                Cell::new(&summary.stats.samples.to_string()),
            ]));
        }

        table
    }

    pub fn print_table(&self) {
        if self.benchmarks.is_empty() {
            println!("{}", "No benchmark results".yellow());
            return;
        }
        self.to_table(true).printstd();
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;
        debug!("Wrote {} result(s) to {}", self.benchmarks.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::BenchGroup;
    use crate::runner::fixtures::{full_table, runner};
    use crate::runner::Runner;
    use crate::scenario::Scenario;
    use std::fs;

    fn summary(group: &str, name: &str, avg: f64) -> BenchmarkSummary {
        BenchmarkSummary {
            group: group.to_string(),
            name: name.to_string(),
            stats: Stats {
                avg,
                min: avg,
                max: avg,
                p50: avg,
                p75: avg,
                p99: avg,
                samples: 1,
            },
        }
    }

    #[test]
    fn test_filename_safe() {
        assert_eq!(filename_safe("a/b:c"), "a_b_c");
        assert_eq!(
            filename_safe("sqlx pool, JSON aggregation"),
            "sqlx pool, JSON aggregation"
        );
        assert_eq!(filename_safe(&"x".repeat(100)).len(), MAX_DIRECTORY_NAME_LEN);
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn test_filename_safe_keeps_surrounding_spaces() {
        assert_eq!(filename_safe(" pooled "), " pooled ");
        assert_eq!(
            sample_path(Path::new("out"), "FIND_MANY_ALL", " pooled "),
            Path::new("out/FIND_MANY_ALL/ pooled /new/sample.json")
        );
    }

    #[test]
    fn test_stats_are_per_iteration() {
        let iters = [1.0, 2.0, 3.0, 4.0];
        let times = [100.0, 400.0, 900.0, 1600.0];
        let stats = stats_from_samples(&iters, &times).unwrap();

        assert_eq!(stats.samples, 4);
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 400.0);
        assert_eq!(stats.avg, 250.0);
        assert_eq!(stats.p50, 200.0);
        assert_eq!(stats.p75, 300.0);
        assert_eq!(stats.p99, 400.0);
    }

    #[test]
    fn test_no_samples() {
        assert!(stats_from_samples(&[], &[]).is_none());
        assert!(stats_from_samples(&[0.0], &[10.0]).is_none());
    }

    #[test]
    fn test_collect_reads_criterion_samples() {
        let dir = tempfile::tempdir().unwrap();
        let runners: Vec<Box<dyn Runner>> = vec![
            runner("sqlx pool, JSON aggregation", full_table(), &[]).boxed(),
            runner("missing", full_table(), &[]).boxed(),
        ];
        let plan = BenchPlan {
            groups: vec![BenchGroup {
                scenario: Scenario::FindManyAllLimit,
                entries: runners.iter().map(|r| &**r).collect(),
            }],
        };

        let path = sample_path(dir.path(), "FIND_MANY_ALL_LIMIT", "sqlx pool, JSON aggregation");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(
            &path,
            r#"{"sampling_mode":"Linear","iters":[10.0,20.0],"times":[1000.0,3000.0]}"#,
        )
        .unwrap();

        let summary = collect(&plan, dir.path());
        assert_eq!(summary.benchmarks.len(), 1);
        assert_eq!(summary.benchmarks[0].group, "FIND_MANY_ALL_LIMIT");
        assert_eq!(summary.benchmarks[0].stats.avg, 125.0);
        assert_eq!(summary.benchmarks[0].stats.samples, 2);
    }

    #[test]
    fn test_json_output_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let run = RunSummary {
            generated_at: Utc::now(),
            benchmarks: vec![summary("FIND_MANY_ALL", "a", 12.0)],
        };

        run.write_json(&path).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["benchmarks"][0]["group"], "FIND_MANY_ALL");
        assert_eq!(written["benchmarks"][0]["name"], "a");
        assert_eq!(written["benchmarks"][0]["stats"]["p99"], 12.0);
        assert!(written["generated_at"].is_string());
    }

    #[test]
    fn test_table_names_group_once() {
        let run = RunSummary {
            generated_at: Utc::now(),
            benchmarks: vec![
                summary("FIND_MANY_ALL", "a", 12.0),
                summary("FIND_MANY_ALL", "b", 8.0),
                summary("ACTOR_DETAILS", "a", 3.0),
            ],
        };

        let rendered = run.to_table(false).to_string();
        assert_eq!(rendered.matches("FIND_MANY_ALL").count(), 1);
        assert!(rendered.contains("ACTOR_DETAILS"));
        assert_eq!(run.to_table(false).len(), 4);
    }
}
