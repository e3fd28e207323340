//! hexstar - fly a descending, shrinking multi-layer six-pointed star.
//!
//! Usage:
//!   hexstar plan --layers 4
//!   hexstar fly --link sim

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use hexstar_core::{seconds, ConfigError, FlightPlan, MissionConfig, StallPolicy, StallTimeouts};
use hexstar_flight::{MissionController, MissionOutcome};
use hexstar_link::{Connector, LinkAddress, SimConfig, SimConnector};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Layered six-pointed star flight
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the flight plan without connecting
    Plan {
        #[command(flatten)]
        mission: MissionArgs,

        /// Print the plan as JSON
        #[arg(long)]
        json: bool,
    },
    /// Connect to the vehicle and fly the plan
    Fly {
        #[command(flatten)]
        mission: MissionArgs,

        /// Seconds before the simulated vehicle becomes armable
        #[arg(long, default_value_t = 2.0)]
        sim_warmup: f64,

        /// Print the mission report as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Mission parameters. Unset flags fall back to HEXSTAR_* variables, then defaults.
#[derive(Args, Debug)]
struct MissionArgs {
    /// Vehicle link address (udp:host:port, tcp:host:port or sim)
    #[arg(long)]
    link: Option<String>,

    /// Takeoff altitude and first layer altitude (m)
    #[arg(long)]
    altitude: Option<f64>,

    /// Outer star radius of the first layer (m)
    #[arg(long)]
    outer_radius: Option<f64>,

    /// Inner star radius of the first layer (m)
    #[arg(long)]
    inner_radius: Option<f64>,

    /// Speed between star vertices (m/s)
    #[arg(long)]
    cruise_speed: Option<f64>,

    /// Speed onto each layer's start point (m/s)
    #[arg(long)]
    approach_speed: Option<f64>,

    /// Number of layers
    #[arg(long)]
    layers: Option<u32>,

    /// Altitude drop per layer (m)
    #[arg(long)]
    altitude_decrement: Option<f64>,

    /// Radius multiplier per layer
    #[arg(long)]
    radius_decay: Option<f64>,

    /// Lowest altitude any layer is flown at (m)
    #[arg(long)]
    altitude_floor: Option<f64>,

    /// One-time pause before the first layer is drawn (s)
    #[arg(long)]
    draw_delay: Option<f64>,

    /// Base time allowed to reach each waypoint before failing (s)
    #[arg(long, conflicts_with = "unbounded")]
    arrival_timeout: Option<f64>,

    /// Wait indefinitely instead of timing out stalled stages
    #[arg(long)]
    unbounded: bool,
}

impl MissionArgs {
    fn into_config(self) -> Result<MissionConfig, ConfigError> {
        let mut config = MissionConfig::from_env();

        if let Some(link) = self.link {
            config.link_address = link;
        }
        if let Some(altitude) = self.altitude {
            config.initial_altitude_m = altitude;
        }
        if let Some(radius) = self.outer_radius {
            config.outer_radius_m = radius;
        }
        if let Some(radius) = self.inner_radius {
            config.inner_radius_m = radius;
        }
        if let Some(speed) = self.cruise_speed {
            config.cruise_speed_mps = speed;
        }
        if let Some(speed) = self.approach_speed {
            config.approach_speed_mps = speed;
        }
        if let Some(layers) = self.layers {
            config.layers = layers;
        }
        if let Some(decrement) = self.altitude_decrement {
            config.altitude_decrement_m = decrement;
        }
        if let Some(decay) = self.radius_decay {
            config.radius_decay = decay;
        }
        if let Some(floor) = self.altitude_floor {
            config.altitude_floor_m = floor;
        }
        if let Some(secs) = self.draw_delay {
            config.timing.draw_delay = seconds("draw delay", secs)?;
        }
        if let Some(secs) = self.arrival_timeout {
            let arrival = seconds("arrival timeout", secs)?;
            let timeouts = match config.timing.stall {
                StallPolicy::Bounded(timeouts) => timeouts,
                StallPolicy::Unbounded => StallTimeouts::default(),
            };
            config.timing.stall = StallPolicy::Bounded(StallTimeouts { arrival, ..timeouts });
        }
        if self.unbounded {
            config.timing.stall = StallPolicy::Unbounded;
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hexstar=info".parse()?)
                .add_directive("hexstar_flight=info".parse()?)
                .add_directive("hexstar_link=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Plan { mission, json } => print_plan(mission.into_config()?, json),
        Command::Fly {
            mission,
            sim_warmup,
            json,
        } => fly(mission.into_config()?, sim_warmup, json).await,
    }
}

fn print_plan(config: MissionConfig, json: bool) -> Result<()> {
    let plan = FlightPlan::build(&config).context("Invalid flight plan parameters")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    println!(
        "{} layers, {} waypoints (approach {:.1} m/s, cruise {:.1} m/s)",
        plan.len(),
        plan.total_waypoints(),
        plan.approach_speed_mps,
        plan.cruise_speed_mps
    );
    for layer in plan.layers() {
        println!();
        println!(
            "Layer {}: altitude {:.1}m, outer radius {:.2}m, inner radius {:.2}m",
            layer.index + 1,
            layer.altitude_m,
            layer.outer_radius_m,
            layer.inner_radius_m
        );
        for (i, point) in layer.points.iter().enumerate() {
            println!("  {:>2}  N:{:>8.2}  E:{:>8.2}", i + 1, point.north, point.east);
        }
    }
    Ok(())
}

async fn fly(config: MissionConfig, sim_warmup: f64, json: bool) -> Result<()> {
    config.validate().context("Invalid mission configuration")?;
    let address: LinkAddress = config.link_address.parse()?;

    let connector = SimConnector::new(SimConfig {
        warmup: seconds("simulator warm-up", sim_warmup)?,
        ..SimConfig::default()
    });

    tracing::info!("Connecting to vehicle ({})...", address);
    let link = connector
        .connect(&address)
        .await
        .with_context(|| format!("Failed to connect to {}", address))?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted by operator");
            trigger.cancel();
        }
    });

    let report = MissionController::new(link, config)?.run(cancel).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        match report.outcome {
            MissionOutcome::Completed => println!(
                "Mission complete: {} layers, {} waypoints in {:.0?}",
                report.layers_completed, report.waypoints_reached, report.elapsed
            ),
            MissionOutcome::Aborted { during } => println!(
                "Mission aborted during {} after {} waypoints; LAND commanded",
                during, report.waypoints_reached
            ),
        }
        println!("Commands sent: {}", connector.log.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "hexstar", "plan", "--layers", "5", "--outer-radius", "60", "--unbounded",
        ])
        .unwrap();

        let Command::Plan { mission, json } = cli.command else {
            panic!("expected plan command");
        };
        assert!(!json);

        let config = mission.into_config().unwrap();
        assert_eq!(config.layers, 5);
        assert_eq!(config.outer_radius_m, 60.0);
        assert_eq!(config.timing.stall, StallPolicy::Unbounded);
    }

    #[test]
    fn test_fly_accepts_sim_link() {
        let cli = Cli::try_parse_from(["hexstar", "fly", "--link", "sim", "--draw-delay", "0"]).unwrap();

        let Command::Fly { mission, sim_warmup, .. } = cli.command else {
            panic!("expected fly command");
        };
        assert_eq!(sim_warmup, 2.0);

        let config = mission.into_config().unwrap();
        assert_eq!(config.link_address, "sim");
        assert!(config.timing.draw_delay.is_zero());
    }

    #[test]
    fn test_unrepresentable_delay_is_an_error() {
        for flag in ["--draw-delay=inf", "--draw-delay=1e30", "--draw-delay=-1"] {
            let cli = Cli::try_parse_from(["hexstar", "plan", flag]).unwrap();
            let Command::Plan { mission, .. } = cli.command else {
                panic!("expected plan command");
            };
            assert!(matches!(
                mission.into_config(),
                Err(ConfigError::InvalidDuration { which: "draw delay", .. })
            ));
        }
    }

    #[test]
    fn test_arrival_timeout_flag() {
        let cli = Cli::try_parse_from(["hexstar", "fly", "--arrival-timeout", "600"]).unwrap();
        let Command::Fly { mission, .. } = cli.command else {
            panic!("expected fly command");
        };

        let config = mission.into_config().unwrap();
        assert_eq!(
            config.timing.stall.limit(hexstar_core::Stage::Arrival),
            Some(Duration::from_secs(600))
        );

        let conflicting =
            Cli::try_parse_from(["hexstar", "fly", "--arrival-timeout", "600", "--unbounded"]);
        assert!(conflicting.is_err());
    }
}
