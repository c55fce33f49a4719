use audiomark_bench::controller::run_benchmark;
use audiomark_bench::harness::Profile;
use audiomark_bench::pipeline::{
    PipelineConfig, SyntheticPipeline, FRAME_SAMPLES, SAMPLE_RATE_HZ, STREAM_SAMPLES,
};
use audiomark_bench::schema::{AudioMarkReport, RunMeta, SCHEMA_VERSION};
use audiomark_bench::ClockSource;
use clap::{Parser, ValueEnum};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Standard,
    Quick,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Standard => Profile::Standard,
            ProfileArg::Quick => Profile::Quick,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "audiomark-bench")]
#[command(about = "Self-calibrating AudioMark throughput run")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Standard)]
    profile: ProfileArg,

    #[arg(long, value_enum, default_value_t = ClockSource::Monotonic)]
    clock: ClockSource,

    /// Seed for the synthetic input stream.
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Make the n-th workload unit fail (exercises the failure paths).
    #[arg(long, value_name = "N")]
    fail_at_unit: Option<u64>,

    /// Print the JSON report instead of the text summary.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Also write the JSON report to this file.
    #[arg(long)]
    out: Option<PathBuf>,
}

fn now_unix_stamp() -> String {
    // Avoid adding chrono dependency; seconds since the epoch are enough here.
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    // Best-effort: read from environment set by CI/build scripts.
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn emit(args: &Args, report: &AudioMarkReport) -> io::Result<()> {
    if let Some(out) = &args.out {
        report.write_json(out)?;
    }
    if args.json {
        println!("{}", report.to_json_pretty()?);
    } else {
        println!("{}", report.summary());
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let profile: Profile = args.profile.into();
    let policy = profile.policy();
    let clock = args.clock.build();

    let mut pipeline = SyntheticPipeline::new(PipelineConfig {
        seed: args.seed,
        fail_at_unit: args.fail_at_unit,
    });

    let result = match run_benchmark(&mut pipeline, &*clock, &policy) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let report = AudioMarkReport::new(
        RunMeta {
            schema_version: SCHEMA_VERSION,
            bench_version: env!("CARGO_PKG_VERSION").to_string(),
            profile: profile.as_str().to_string(),
            clock: args.clock.as_str().to_string(),
            seed: args.seed,
            timestamp_utc: now_unix_stamp(),
            git_sha: git_sha_short(),
        },
        policy.calibration_threshold_us,
        policy.target_us,
        &result,
        json!({
            "name": pipeline.name(),
            "sample_rate_hz": SAMPLE_RATE_HZ,
            "stream_samples": STREAM_SAMPLES,
            "frame_samples": FRAME_SAMPLES,
            "units_run": pipeline.units_run(),
            "output_sha256": pipeline.output_digest(),
        }),
    );

    match emit(&args, &report) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("failed to write report: {e}");
            ExitCode::FAILURE
        }
    }
}
