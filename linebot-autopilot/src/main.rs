use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use linebot_autopilot::benchmark::{resolve_controllers, run_benchmark, BenchmarkConfig};
use linebot_autopilot::controllers::{
    controller_id_for_tag, controller_ids, controller_manifest_entries, controller_tag,
    describe_controllers, DEFAULT_CONTROLLER,
};
use linebot_autopilot::runner::{
    render_after, run_controller_with_capture, write_artifact, FrameCapture,
};
use linebot_autopilot::settings::load_settings;
use linebot_autopilot::util::{format_seed, parse_seed, parse_seed_csv, parse_seed_file, seed_range};
use linebot_core::verify_trace;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::filter::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "linebot")]
#[command(about = "Deterministic line-following robot simulator, trace recorder and benchmark")]
struct Cli {
    /// Simulation config JSON; missing fields take their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Log filter directive, e.g. `debug` or `linebot_core=debug`
    #[arg(long, global = true)]
    log: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available controllers
    ListControllers {
        /// Print the full manifest with fingerprints as JSON
        #[arg(long)]
        manifest: bool,
    },
    /// Drive one robot and write a verifiable trace
    Run {
        #[arg(long, default_value = DEFAULT_CONTROLLER)]
        controller: String,
        #[arg(long, default_value = "0")]
        seed: String,
        #[arg(long)]
        max_frames: Option<u32>,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Directory for captured PPM frames
        #[arg(long)]
        frames_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 30)]
        capture_every: u32,
    },
    /// Render the world as a PPM image after a number of frames
    Render {
        #[arg(long, default_value = DEFAULT_CONTROLLER)]
        controller: String,
        #[arg(long, default_value = "0")]
        seed: String,
        #[arg(long, default_value_t = 0)]
        frames: u32,
        #[arg(long)]
        output: PathBuf,
    },
    /// Replay a trace against the current config and check it matches
    VerifyTrace {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        max_frames: Option<u32>,
    },
    /// Run every (controller, seed) pair and write a summary
    Benchmark {
        #[arg(long)]
        controllers: Option<String>,
        #[arg(long)]
        seeds: Option<String>,
        #[arg(long)]
        seed_file: Option<PathBuf>,
        #[arg(long)]
        seed_start: Option<String>,
        #[arg(long, default_value_t = 12)]
        seed_count: u32,
        #[arg(long)]
        max_frames: Option<u32>,
        #[arg(long)]
        out_dir: Option<PathBuf>,
        #[arg(long, default_value_t = 2)]
        save_top: usize,
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Print the effective simulation config as JSON
    PrintConfig,
    /// Watch one run live in a window
    #[cfg(feature = "view")]
    View {
        #[arg(long, default_value = DEFAULT_CONTROLLER)]
        controller: String,
        #[arg(long, default_value = "0")]
        seed: String,
        #[arg(long)]
        max_frames: Option<u32>,
    },
}

fn init_tracing(directive: Option<&str>) -> Result<()> {
    let filter = match directive {
        Some(directive) => EnvFilter::try_new(directive)
            .with_context(|| format!("invalid --log directive '{directive}'"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let Cli {
        config,
        log,
        command,
    } = Cli::parse();
    init_tracing(log.as_deref())?;

    let settings = load_settings(config.as_deref())?;
    let sim = settings.sim;

    match command {
        Commands::ListControllers { manifest } => {
            if manifest {
                let entries = controller_manifest_entries(&sim.control);
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for (id, description) in describe_controllers() {
                    println!("{id:12} {description}");
                }
            }
        }
        Commands::Run {
            controller,
            seed,
            max_frames,
            output,
            frames_dir,
            capture_every,
        } => {
            ensure_controller(&controller)?;
            let seed = parse_seed(&seed)?;
            let max_frames = max_frames.unwrap_or(settings.max_frames);
            let capture = frames_dir.map(|dir| FrameCapture {
                dir,
                every: capture_every,
            });

            let artifact =
                run_controller_with_capture(&controller, &sim, seed, max_frames, capture.as_ref())?;
            let metrics = &artifact.metrics;
            let output_path = output.unwrap_or_else(|| {
                PathBuf::from(format!(
                    "traces/{controller}-seed{seed:08x}-frames{}.trace",
                    metrics.frame_count
                ))
            });
            write_artifact(&output_path, &artifact.trace)?;

            println!("controller={}", metrics.controller_id);
            println!("controller_fingerprint={}", metrics.controller_fingerprint);
            println!("seed={}", format_seed(seed));
            println!("frames={}", metrics.frame_count);
            println!("outcome={:?}", metrics.outcome);
            println!(
                "final_pose=({:.3}, {:.3}, {:.3})",
                metrics.final_pose.x, metrics.final_pose.y, metrics.final_pose.heading_deg
            );
            println!("laps={:.3}", metrics.laps);
            println!("center_ratio={:.4}", metrics.center_ratio());
            println!("search_frames={}", metrics.search_frames);
            println!("lost_events={}", metrics.lost_events);
            println!("steering_reversals={}", metrics.steering_reversals);
            println!("config_digest={:#010x}", metrics.config_digest);
            if !artifact.captured_frames.is_empty() {
                println!("captured_frames={}", artifact.captured_frames.len());
            }
            println!("output={}", output_path.display());
        }
        Commands::Render {
            controller,
            seed,
            frames,
            output,
        } => {
            ensure_controller(&controller)?;
            let seed = parse_seed(&seed)?;
            let canvas = render_after(&controller, &sim, seed, frames)?;
            write_artifact(&output, &canvas.to_ppm())?;
            println!("wrote={}", output.display());
        }
        Commands::VerifyTrace { input, max_frames } => {
            let bytes =
                fs::read(&input).with_context(|| format!("failed reading {}", input.display()))?;
            let max_frames = max_frames.unwrap_or(settings.max_frames);
            let journal = verify_trace(&bytes, &sim, max_frames)
                .map_err(|err| anyhow!("trace verification failed: {err}"))?;

            let controller = controller_id_for_tag(journal.controller_tag).unwrap_or("unknown");
            println!("ok=true");
            println!("controller={controller}");
            println!("seed={}", format_seed(journal.seed));
            println!("frames={}", journal.frame_count);
            println!("search_frames={}", journal.search_frames);
            println!(
                "final_pose=({:.3}, {:.3}, {:.3})",
                journal.final_pose.x, journal.final_pose.y, journal.final_pose.heading_deg
            );
            println!("checksum={:#010x}", journal.trace_checksum);
        }
        Commands::Benchmark {
            controllers,
            seeds,
            seed_file,
            seed_start,
            seed_count,
            max_frames,
            out_dir,
            save_top,
            jobs,
        } => {
            let controllers = resolve_controllers(controllers.as_deref())?;
            for controller in &controllers {
                ensure_controller(controller)?;
            }
            let seeds = if let Some(path) = seed_file {
                parse_seed_file(&path)?
            } else if let Some(csv) = seeds {
                parse_seed_csv(&csv)?
            } else {
                let start = match seed_start {
                    Some(raw) => parse_seed(&raw)?,
                    None => 0,
                };
                seed_range(start, seed_count)
            };
            let out_dir = out_dir.unwrap_or_else(|| PathBuf::from("benchmarks/latest"));

            let report = run_benchmark(BenchmarkConfig {
                controllers,
                seeds,
                max_frames: max_frames.unwrap_or(settings.max_frames),
                sim,
                out_dir: out_dir.clone(),
                save_top,
                jobs,
            })?;

            println!("runs={}", report.run_count);
            for (rank, row) in report.controller_rankings.iter().enumerate() {
                println!(
                    "#{} {:12} laps={:.3} reversals={:.1} center_ratio={:.3} line_lost_rate={:.3}",
                    rank + 1,
                    row.controller_id,
                    row.avg_laps,
                    row.avg_reversals,
                    row.avg_center_ratio,
                    row.line_lost_rate
                );
            }
            println!("summary={}", out_dir.join("summary.json").display());
        }
        Commands::PrintConfig => {
            println!("{}", serde_json::to_string_pretty(&sim)?);
        }
        #[cfg(feature = "view")]
        Commands::View {
            controller,
            seed,
            max_frames,
        } => {
            ensure_controller(&controller)?;
            let seed = parse_seed(&seed)?;
            let max_frames = max_frames.unwrap_or(settings.max_frames);
            linebot_autopilot::viewer::run(&controller, &sim, seed, max_frames)?;
        }
    }

    Ok(())
}

fn ensure_controller(id: &str) -> Result<()> {
    if controller_tag(id).is_none() {
        let available = controller_ids().join(", ");
        return Err(anyhow!("unknown controller '{id}'. available: {available}"));
    }
    Ok(())
}
