// route_probe: plan a route on a JSON tile map from the command line.
//
// Loads a `TileMapDef` JSON file (and optionally a `WalkConfig` JSON file),
// places an idle avatar at `--start`, requests a route to `--target` and
// prints each step, or the whole route as JSON with `--json`. Search
// diagnostics go through `tracing`; set `RUST_LOG=wayfarer_walk=debug` to
// see them.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::PathBuf;
use wayfarer_walk::avatar::{Avatar, AvatarStatus, StepLimiter};
use wayfarer_walk::config::WalkConfig;
use wayfarer_walk::session::PathfindingSession;
use wayfarer_walk::types::{Direction, Position};
use wayfarer_walk::world::TileMap;

#[derive(Parser)]
#[command(name = "route_probe", about = "Plan an autonomous walk on a JSON tile map")]
struct Cli {
    /// Tile map definition (JSON)
    #[arg(long, short)]
    map: PathBuf,
    /// Walk configuration (JSON); defaults are used when omitted
    #[arg(long, short)]
    config: Option<PathBuf>,
    /// Start position (3 integers: X Y Z)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
    start: Vec<i32>,
    /// Target position (3 integers: X Y Z)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
    target: Vec<i32>,
    /// Accept any tile within this distance of the target
    #[arg(long, default_value_t = 0)]
    tolerance: u32,
    /// Plan as a ghost (dead or game master)
    #[arg(long, default_value_t = false)]
    dead: bool,
    /// Print the route as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

/// Avatar that never moves; only its status matters for planning.
struct ProbeAvatar {
    status: AvatarStatus,
}

impl Avatar for ProbeAvatar {
    fn status(&self) -> AvatarStatus {
        self.status.clone()
    }

    fn end_position(&self) -> (Position, Direction) {
        (self.status.position, Direction::North)
    }

    fn limiter(&self) -> StepLimiter {
        StepLimiter::default()
    }

    fn walk(&mut self, _direction: Direction, _run: bool) -> bool {
        false
    }
}

fn position(values: &[i32], name: &str) -> Result<Position> {
    match values {
        [x, y, z] => Ok(Position::new(*x, *y, *z)),
        _ => bail!("--{name} takes exactly three values"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let start = position(&cli.start, "start")?;
    let target = position(&cli.target, "target")?;

    let map = TileMap::load(&cli.map)
        .with_context(|| format!("loading map {}", cli.map.display()))?;
    tracing::info!(width = map.width(), height = map.height(), "map loaded");
    let config = match &cli.config {
        Some(path) => WalkConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => WalkConfig::default(),
    };

    let mut status = AvatarStatus::standing_at(start);
    status.dead = cli.dead;
    let avatar = ProbeAvatar { status };

    let mut session = PathfindingSession::new(config);
    let found = session.request_route(&map, &avatar, target, cli.tolerance);
    let stats = session.last_stats().unwrap_or_default();
    tracing::info!(
        opened = stats.opened,
        closed = stats.closed,
        goal_found = stats.goal_found,
        "search finished"
    );

    let Some(route) = session.route().filter(|_| found) else {
        bail!("no route from {start} to {target} (tolerance {})", cli.tolerance);
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(route)?);
        return Ok(());
    }

    println!(
        "{} steps, cost {:.3}, {}",
        route.len(),
        route.total_cost(),
        if route.run() { "running" } else { "walking" }
    );
    for (i, step) in route.steps().iter().enumerate() {
        println!("{:>4}  {:<2}  {}", i + 1, step.direction, step.position);
    }
    Ok(())
}
