use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use neo_watch::api_client::{feed_day, NeoWsClient};
use neo_watch::config::Config;
use neo_watch::dashboard::{
    format_impact_report, format_orbital_elements, format_strategies, format_tracker, AsciiRaster,
    TerminalSurface,
};
use neo_watch::orbital_motion::{build_scene, compute_frame};
use neo_watch::physics_engine::{ImpactParameters, ImpactResult};
use neo_watch::state_manager::{AppState, FeedPoller, FeedStatus, ImpactSimulator, OrbitAnimator};

#[derive(Parser)]
#[command(name = "neo-watch")]
#[command(about = "Near-Earth object tracker and impact scenario calculator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one impact scenario
    Impact {
        /// Asteroid diameter (m), 10-1000 in steps of 10
        #[arg(short, long, default_value = "100")]
        diameter: f64,

        /// Impact velocity (km/s), 5-72
        #[arg(short, long, default_value = "20")]
        velocity: f64,

        /// Impact angle (degrees), 0-90 in steps of 5. Recorded, not modelled.
        #[arg(short, long, default_value = "45")]
        angle: f64,

        /// Use the values as given instead of snapping them to the controls
        #[arg(long)]
        raw: bool,

        /// Years of warning, used to rank deflection strategies
        #[arg(long)]
        warning_years: Option<f64>,

        #[arg(long)]
        json: bool,
    },

    /// Fetch the NeoWs feed and list close approaches
    Feed {
        /// First day (YYYY-MM-DD), defaults to today in UTC
        #[arg(long)]
        start: Option<String>,

        /// Last day (YYYY-MM-DD), defaults to the start day
        #[arg(long)]
        end: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Draw the heliocentric view
    Orbit {
        /// Print a single frame at this time step instead of animating
        #[arg(long)]
        step: Option<u64>,

        /// How long to animate (seconds)
        #[arg(long, default_value = "5")]
        seconds: f64,

        #[arg(long, default_value = "60")]
        cols: usize,

        #[arg(long, default_value = "30")]
        rows: usize,
    },

    /// Live view: orbit animation plus the tracker, refreshed periodically
    Watch {
        #[arg(long, default_value = "60")]
        cols: usize,

        #[arg(long, default_value = "30")]
        rows: usize,
    },

    /// List planetary defense strategies
    Strategies {
        #[arg(long)]
        warning_years: Option<f64>,
    },
}

#[derive(Serialize)]
struct ImpactOutput<'a> {
    parameters: &'a ImpactParameters,
    result: &'a ImpactResult,
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(neo_watch::NeoError::from)
        .with_context(|| format!("invalid date {:?}", raw))
}

fn run_impact(
    diameter: f64,
    velocity: f64,
    angle: f64,
    raw: bool,
    warning_years: Option<f64>,
    json: bool,
) -> Result<()> {
    let mut simulator = ImpactSimulator::new();
    if raw {
        simulator.set_parameters(ImpactParameters::new(diameter, velocity, angle));
    } else {
        simulator.set_diameter(diameter)?;
        simulator.set_velocity(velocity)?;
        simulator.set_angle(angle)?;
    }
    let result = simulator.run()?;
    let params = simulator.parameters();

    if json {
        let output = ImpactOutput {
            parameters: params,
            result: &result,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", format_impact_report(params, &result));
        println!();
        print!("{}", format_strategies(warning_years));
    }
    Ok(())
}

async fn run_feed(config: &Config, start: Option<String>, end: Option<String>, json: bool) -> Result<()> {
    let start_date = match start {
        Some(s) => parse_date(&s)?,
        None => feed_day(&Utc::now()),
    };
    let end_date = match end {
        Some(s) => parse_date(&s)?,
        None => start_date,
    };

    let client = NeoWsClient::with_base_url(config.api_key.clone(), config.feed_base_url.clone());
    // Feed failures become the unavailable state, not an exit error
    let status = FeedStatus::from_result(client.fetch_feed(start_date, end_date).await);

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", format_tracker(&status));
    }
    Ok(())
}

async fn run_orbit(config: &Config, step: Option<u64>, seconds: f64, cols: usize, rows: usize) -> Result<()> {
    let state = AppState::new(config.clone());
    let geometry = state.geometry()?;
    let mut raster = AsciiRaster::new(cols, rows, config.canvas_width, config.canvas_height)?;

    if let Some(step) = step {
        raster.draw(&build_scene(&compute_frame(step, &geometry), &geometry));
        let mut stdout = std::io::stdout().lock();
        for line in raster.lines() {
            writeln!(stdout, "{}", line)?;
        }
        write!(stdout, "{}", format_orbital_elements())?;
        return Ok(());
    }

    if !(seconds.is_finite() && seconds >= 0.0) {
        anyhow::bail!("seconds must be a non-negative number, got {}", seconds);
    }

    let animator = OrbitAnimator::new(geometry, config.frame_interval);
    let running = animator.start(TerminalSurface::new(raster, std::io::stdout()))?;
    tokio::time::sleep(Duration::from_secs_f64(seconds)).await;

    let report = running.stop()?;
    if let Some(e) = report.last_error {
        return Err(e).context("animation ended early");
    }
    tracing::info!("Drew {} frames", report.frames_drawn);
    Ok(())
}

async fn run_watch(config: &Config, cols: usize, rows: usize) -> Result<()> {
    let state = AppState::new(config.clone());
    let geometry = state.geometry()?;

    let client = Arc::new(NeoWsClient::with_base_url(
        config.api_key.clone(),
        config.feed_base_url.clone(),
    ));
    let poller = FeedPoller::start(client, state.feed.clone(), config.refresh_interval);

    let raster = AsciiRaster::new(cols, rows, config.canvas_width, config.canvas_height)?;
    let surface = TerminalSurface::new(raster, std::io::stdout()).with_feed(state.feed.clone());
    let running = OrbitAnimator::new(geometry, config.frame_interval).start(surface)?;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    tracing::info!("Shutting down");

    let report = running.stop()?;
    poller.stop().await?;
    tracing::info!("Drew {} frames", report.frames_drawn);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}

/// Dispatch a parsed command line. Only the commands that talk to the
/// feed or draw the canvas read the environment.
async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Impact {
            diameter,
            velocity,
            angle,
            raw,
            warning_years,
            json,
        } => run_impact(diameter, velocity, angle, raw, warning_years, json),
        Commands::Strategies { warning_years } => {
            print!("{}", format_strategies(warning_years));
            Ok(())
        }
        Commands::Feed { start, end, json } => {
            run_feed(&Config::from_env()?, start, end, json).await
        }
        Commands::Orbit {
            step,
            seconds,
            cols,
            rows,
        } => run_orbit(&Config::from_env()?, step, seconds, cols, rows).await,
        Commands::Watch { cols, rows } => run_watch(&Config::from_env()?, cols, rows).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["neo-watch"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[tokio::test]
    async fn test_config_only_loaded_when_needed() {
        std::env::set_var("NEO_REFRESH_SECS", "not-a-number");

        run(cli(&["impact", "--diameter", "250", "--json"])).await.unwrap();
        run(cli(&["strategies", "--warning-years", "3"])).await.unwrap();

        let err = run(cli(&["orbit", "--step", "10"])).await.unwrap_err();
        assert!(err.to_string().contains("NEO_REFRESH_SECS"), "{:#}", err);
    }
}
