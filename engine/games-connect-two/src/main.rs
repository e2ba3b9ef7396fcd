//! connect-two - MCTS self-play driver
//!
//! Plays one game of Connect-Two where both sides are driven by the same
//! search tree. After every move the tree is re-rooted at the chosen child so
//! statistics carry over to the next decision.
//!
//! Configuration priority: CLI flags, then `MCTS_*` environment variables,
//! then the optional TOML file, then built-in defaults.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use games_connect_two::{ConnectTwo, Player, DEFAULT_BOARD_SIZE};
use mcts_core::{MctsConfig, MctsSearch, Objective, State};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[command(name = "connect-two", about = "Play Connect-Two against itself with MCTS")]
struct Args {
    /// Iterations per move
    #[arg(long)]
    iterations: Option<u32>,

    /// Wall-clock budget per move in milliseconds (overrides --iterations)
    #[arg(long)]
    time_ms: Option<u64>,

    /// UCB1 exploration constant
    #[arg(long)]
    exploration: Option<f64>,

    /// Cap on rollout length
    #[arg(long)]
    max_rollout_depth: Option<u32>,

    /// RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Number of cells on the board
    #[arg(long, default_value_t = DEFAULT_BOARD_SIZE)]
    board_size: usize,

    /// Path to a TOML file with MCTS settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn mcts_config(&self) -> Result<MctsConfig> {
        let mut config = match &self.config {
            Some(path) => MctsConfig::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => MctsConfig::default().apply_env_overrides(),
        };

        if let Some(c) = self.exploration {
            config = config.with_exploration_constant(c);
        }
        if let Some(n) = self.iterations {
            config = config.with_iterations(n);
        }
        if let Some(ms) = self.time_ms {
            config = config.with_time_limit(Duration::from_millis(ms));
        }
        if let Some(depth) = self.max_rollout_depth {
            config = config.with_max_rollout_depth(depth);
        }

        config.validate()?;
        Ok(config)
    }
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    if args.board_size < 2 {
        bail!("board size must be at least 2, got {}", args.board_size);
    }

    let config = args.mcts_config()?;
    info!(
        board_size = args.board_size,
        seed = args.seed,
        budget = ?config.budget(),
        exploration = config.exploration_constant,
        "Starting self-play"
    );

    let mut rng = ChaCha20Rng::seed_from_u64(args.seed);
    let mut search = MctsSearch::with_config(ConnectTwo::new(args.board_size), config)?;
    println!("{}", search.root_state());

    while !search.root_state().is_terminal() {
        // Rewards are from X's perspective
        let objective = match search.root_state().current_player() {
            Player::X => Objective::Maximize,
            Player::O => Objective::Minimize,
        };

        let result = search.run(objective, &mut rng)?;
        info!(
            action = %result.action,
            value = result.value,
            visits = result.visits,
            iterations = result.iterations,
            elapsed_ms = result.elapsed.as_millis() as u64,
            "Move selected"
        );

        search = search.create_tree_from_action(&result.action)?;
        debug!(stats = ?search.tree().stats(), "Tree after move");
        println!("{}", search.root_state());
    }

    match search.root_state().winner() {
        Some(player) => println!("Player {player} wins"),
        None => println!("Draw"),
    }

    Ok(())
}
