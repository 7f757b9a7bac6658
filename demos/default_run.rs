//! Runs the default scenario, or the JSON configuration given as the first
//! argument, and prints where the results went.
//!
//! ```text
//! cargo run --example default_run -- [config.json]
//! ```
use anyhow::Context;
use ecotox::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,ecotox=info"));
    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::from_json_file(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => RunConfig::default(),
    };

    let report = run(&config).context("simulation run failed")?;
    let (t, state) = report
        .trajectory
        .last()
        .context("trajectory has no samples")?;

    println!("run id:   {}", report.id);
    println!("output:   {}", report.location.display());
    println!("t = {t}:  {state}");
    Ok(())
}
