use crate::controllers::controller_ids;
use crate::runner::{run_controller, RunMetrics, RunOutcome};
use crate::util::format_seed;
use anyhow::{anyhow, Context, Result};
use linebot_core::SimConfig;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Debug)]
pub struct BenchmarkConfig {
    pub controllers: Vec<String>,
    pub seeds: Vec<u32>,
    pub max_frames: u32,
    pub sim: SimConfig,
    pub out_dir: PathBuf,
    pub save_top: usize,
    pub jobs: Option<usize>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunRecord {
    pub controller_id: String,
    pub controller_fingerprint: String,
    pub seed: u32,
    pub seed_hex: String,
    pub frame_count: u32,
    pub sim_seconds: f64,
    pub outcome: RunOutcome,
    pub laps: f64,
    pub center_ratio: f64,
    pub search_frames: u32,
    pub lost_events: u32,
    pub steering_reversals: u32,
    pub mean_abs_turn: f64,
    pub distance: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ControllerAggregate {
    pub controller_id: String,
    pub controller_fingerprint: String,
    pub runs: usize,
    pub avg_laps: f64,
    pub min_laps: f64,
    pub avg_frames: f64,
    pub avg_reversals: f64,
    pub avg_mean_abs_turn: f64,
    pub avg_center_ratio: f64,
    pub line_lost_rate: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavedTraceRecord {
    pub rank: usize,
    pub metric: String,
    pub controller_id: String,
    pub seed: u32,
    pub seed_hex: String,
    pub frames: u32,
    pub laps: f64,
    pub path: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub generated_unix_s: u64,
    pub max_frames: u32,
    pub jobs: Option<usize>,
    pub config_digest: u32,
    pub controllers: Vec<String>,
    pub seeds: Vec<u32>,
    pub run_count: usize,
    pub controller_rankings: Vec<ControllerAggregate>,
    pub runs: Vec<RunRecord>,
    pub saved_traces: Vec<SavedTraceRecord>,
}

#[derive(Clone, Debug)]
struct InternalRun {
    metrics: RunMetrics,
    trace: Vec<u8>,
}

impl InternalRun {
    /// Steering reversals per hundred frames.
    fn wobble(&self) -> f64 {
        self.metrics.steering_reversals as f64 * 100.0 / self.metrics.frame_count.max(1) as f64
    }
}

pub fn resolve_controllers(input: Option<&str>) -> Result<Vec<String>> {
    match input {
        None => Ok(controller_ids().iter().map(|id| (*id).to_string()).collect()),
        Some(raw) => {
            let controllers: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect();
            if controllers.is_empty() {
                return Err(anyhow!("--controllers resolved to empty list"));
            }
            Ok(controllers)
        }
    }
}

pub fn run_benchmark(config: BenchmarkConfig) -> Result<BenchmarkReport> {
    if config.seeds.is_empty() {
        return Err(anyhow!("benchmark requires at least one seed"));
    }
    if config.controllers.is_empty() {
        return Err(anyhow!("benchmark requires at least one controller"));
    }
    if let Some(jobs) = config.jobs {
        if jobs == 0 {
            return Err(anyhow!("benchmark --jobs must be >= 1 when provided"));
        }
    }
    fs::create_dir_all(&config.out_dir)
        .with_context(|| format!("failed creating {}", config.out_dir.display()))?;

    let run_jobs: Vec<(String, u32)> = config
        .controllers
        .iter()
        .flat_map(|id| config.seeds.iter().map(move |seed| (id.clone(), *seed)))
        .collect();
    tracing::info!(
        "benchmark: {} controllers x {} seeds, max_frames={}",
        config.controllers.len(),
        config.seeds.len(),
        config.max_frames
    );

    let run_one = |(id, seed): &(String, u32)| -> Result<InternalRun> {
        let artifact = run_controller(id, &config.sim, *seed, config.max_frames)
            .with_context(|| format!("benchmark run failed for controller={id} seed={seed:#x}"))?;
        Ok(InternalRun {
            metrics: artifact.metrics,
            trace: artifact.trace,
        })
    };

    let run_results: Vec<Result<InternalRun>> = if let Some(jobs) = config.jobs {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .context("failed to build rayon threadpool")?;
        pool.install(|| run_jobs.par_iter().map(run_one).collect())
    } else {
        run_jobs.par_iter().map(run_one).collect()
    };
    let runs = run_results.into_iter().collect::<Result<Vec<_>>>()?;

    let mut grouped: BTreeMap<&str, Vec<&InternalRun>> = BTreeMap::new();
    for run in &runs {
        grouped
            .entry(run.metrics.controller_id.as_str())
            .or_default()
            .push(run);
    }

    let mut rankings: Vec<ControllerAggregate> = grouped
        .into_iter()
        .map(|(id, group)| aggregate(id, &group))
        .collect();
    rankings.sort_by(|a, b| {
        a.line_lost_rate
            .total_cmp(&b.line_lost_rate)
            .then_with(|| b.avg_laps.total_cmp(&a.avg_laps))
            .then_with(|| a.avg_reversals.total_cmp(&b.avg_reversals))
    });

    let mut run_records: Vec<RunRecord> = runs.iter().map(run_record).collect();
    run_records.sort_by(|a, b| {
        b.laps
            .total_cmp(&a.laps)
            .then_with(|| a.steering_reversals.cmp(&b.steering_reversals))
            .then_with(|| a.seed.cmp(&b.seed))
    });

    let mut saved_traces = Vec::new();
    if config.save_top > 0 {
        save_top_traces(
            &config.out_dir,
            &runs,
            "laps",
            config.save_top,
            |run| run.metrics.laps,
            &mut saved_traces,
        )?;
        save_top_traces(
            &config.out_dir,
            &runs,
            "smooth",
            config.save_top,
            |run| -run.wobble(),
            &mut saved_traces,
        )?;
    }

    write_runs_csv(&config.out_dir.join("runs.csv"), &run_records)?;

    let report = BenchmarkReport {
        generated_unix_s: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        max_frames: config.max_frames,
        jobs: config.jobs,
        config_digest: config.sim.digest()?,
        controllers: config.controllers,
        seeds: config.seeds,
        run_count: run_records.len(),
        controller_rankings: rankings,
        runs: run_records,
        saved_traces,
    };

    let report_path = config.out_dir.join("summary.json");
    fs::write(
        &report_path,
        serde_json::to_vec_pretty(&report).context("failed to serialize summary json")?,
    )
    .with_context(|| format!("failed writing {}", report_path.display()))?;

    Ok(report)
}

fn aggregate(id: &str, runs: &[&InternalRun]) -> ControllerAggregate {
    let lost = runs
        .iter()
        .filter(|r| r.metrics.outcome == RunOutcome::LineLost)
        .count();

    ControllerAggregate {
        controller_id: id.to_string(),
        controller_fingerprint: runs
            .first()
            .map(|r| r.metrics.controller_fingerprint.clone())
            .unwrap_or_else(|| "unknown".to_string()),
        runs: runs.len(),
        avg_laps: mean(runs, |m| m.laps),
        min_laps: runs
            .iter()
            .map(|r| r.metrics.laps)
            .min_by(f64::total_cmp)
            .unwrap_or_default(),
        avg_frames: mean(runs, |m| m.frame_count as f64),
        avg_reversals: mean(runs, |m| m.steering_reversals as f64),
        avg_mean_abs_turn: mean(runs, |m| m.mean_abs_turn),
        avg_center_ratio: mean(runs, RunMetrics::center_ratio),
        line_lost_rate: lost as f64 / runs.len().max(1) as f64,
    }
}

fn mean(runs: &[&InternalRun], f: impl Fn(&RunMetrics) -> f64) -> f64 {
    runs.iter().map(|r| f(&r.metrics)).sum::<f64>() / runs.len().max(1) as f64
}

fn run_record(run: &InternalRun) -> RunRecord {
    let m = &run.metrics;
    RunRecord {
        controller_id: m.controller_id.clone(),
        controller_fingerprint: m.controller_fingerprint.clone(),
        seed: m.seed,
        seed_hex: format_seed(m.seed),
        frame_count: m.frame_count,
        sim_seconds: m.sim_seconds,
        outcome: m.outcome,
        laps: m.laps,
        center_ratio: m.center_ratio(),
        search_frames: m.search_frames,
        lost_events: m.lost_events,
        steering_reversals: m.steering_reversals,
        mean_abs_turn: m.mean_abs_turn,
        distance: m.distance,
    }
}

fn save_top_traces<F>(
    out_dir: &Path,
    runs: &[InternalRun],
    metric_name: &str,
    count: usize,
    metric: F,
    saved_traces: &mut Vec<SavedTraceRecord>,
) -> Result<()>
where
    F: Fn(&InternalRun) -> f64,
{
    let mut order: Vec<&InternalRun> = runs.iter().collect();
    order.sort_by(|a, b| {
        metric(b)
            .total_cmp(&metric(a))
            .then_with(|| b.metrics.frame_count.cmp(&a.metrics.frame_count))
            .then_with(|| a.metrics.seed.cmp(&b.metrics.seed))
    });

    let save_dir = out_dir.join(format!("top-{metric_name}"));
    fs::create_dir_all(&save_dir)
        .with_context(|| format!("failed creating {}", save_dir.display()))?;

    for (idx, run) in order.into_iter().take(count).enumerate() {
        let rank = idx + 1;
        let base = format!(
            "rank{rank:02}-{}-seed{:08x}-frames{}",
            run.metrics.controller_id, run.metrics.seed, run.metrics.frame_count
        );
        let trace_path = save_dir.join(format!("{base}.trace"));
        fs::write(&trace_path, &run.trace)
            .with_context(|| format!("failed writing {}", trace_path.display()))?;

        let meta_path = save_dir.join(format!("{base}.json"));
        fs::write(
            &meta_path,
            serde_json::to_vec_pretty(&run.metrics).context("failed to serialize run metrics")?,
        )
        .with_context(|| format!("failed writing {}", meta_path.display()))?;

        saved_traces.push(SavedTraceRecord {
            rank,
            metric: metric_name.to_string(),
            controller_id: run.metrics.controller_id.clone(),
            seed: run.metrics.seed,
            seed_hex: format_seed(run.metrics.seed),
            frames: run.metrics.frame_count,
            laps: run.metrics.laps,
            path: trace_path.to_string_lossy().into_owned(),
        });
    }

    Ok(())
}

fn write_runs_csv(path: &Path, rows: &[RunRecord]) -> Result<()> {
    let mut csv = String::from(
        "controller_id,controller_fingerprint,seed_hex,seed,frame_count,sim_seconds,outcome,laps,center_ratio,search_frames,lost_events,steering_reversals,mean_abs_turn,distance\n",
    );
    for row in rows {
        let outcome = match row.outcome {
            RunOutcome::MaxFrames => "max_frames",
            RunOutcome::LineLost => "line_lost",
        };
        csv.push_str(&format!(
            "{},{},{},{},{},{:.3},{},{:.4},{:.4},{},{},{},{:.4},{:.2}\n",
            row.controller_id,
            row.controller_fingerprint,
            row.seed_hex,
            row.seed,
            row.frame_count,
            row.sim_seconds,
            outcome,
            row.laps,
            row.center_ratio,
            row.search_frames,
            row.lost_events,
            row.steering_reversals,
            row.mean_abs_turn,
            row.distance
        ));
    }
    fs::write(path, csv).with_context(|| format!("failed writing {}", path.display()))
}
