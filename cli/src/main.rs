//! Autonomous Minesweeper bot and batch experiment runner.
//!
//! Plays one or more games end to end: certain deductions are applied first
//! (open safe cells, flag mined ones); when the position is ambiguous the
//! probability scorer picks the least risky cell. Reports per-game outcomes
//! and an aggregate win rate.

use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use minesweeper_solver::{Board, BoardState, CellStatus, SolverError, Verdict, solve, score};

#[derive(Parser, Debug)]
#[command(name = "minesweeper-cli", about = "Plays Minesweeper with the constraint solver")]
struct Args {
    /// Board width in cells.
    #[arg(long, default_value_t = 10)]
    width: usize,

    /// Board height in cells.
    #[arg(long, default_value_t = 10)]
    height: usize,

    /// Number of mines on the board.
    #[arg(long, default_value_t = 15)]
    mines: usize,

    /// Number of games to play.
    #[arg(long, default_value_t = 1)]
    games: usize,

    /// RNG seed for reproducible runs; random when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Wall-clock budget for a single guess computation, in milliseconds.
    /// Exceeding it aborts the game instance.
    #[arg(long, default_value_t = 5_000)]
    move_budget_ms: u64,

    /// Render the board after every move.
    #[arg(long)]
    show_board: bool,

    /// Emit the run summary as a single JSON object instead of plain text.
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
enum Outcome {
    Won,
    Lost,
    TimedOut,
}

#[derive(Debug, serde::Serialize)]
struct RunSummary {
    games: usize,
    won: usize,
    lost: usize,
    timed_out: usize,
    win_rate: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut rng = match args.seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };

    let mut won = 0;
    let mut lost = 0;
    let mut timed_out = 0;
    for game in 0..args.games {
        let outcome = play_one(&args, &mut rng)
            .with_context(|| format!("game {game} failed"))?;
        match outcome {
            Outcome::Won => won += 1,
            Outcome::Lost => lost += 1,
            Outcome::TimedOut => timed_out += 1,
        }
        info!(game, ?outcome, "game finished");
    }

    let summary = RunSummary {
        games: args.games,
        won,
        lost,
        timed_out,
        win_rate: won as f64 / args.games.max(1) as f64,
    };
    if args.json {
        println!("{}", serde_json::to_string(&summary)?);
    } else {
        println!(
            "{} games: {} won, {} lost, {} timed out ({:.1}% win rate)",
            summary.games,
            summary.won,
            summary.lost,
            summary.timed_out,
            summary.win_rate * 100.0
        );
    }
    Ok(())
}

/// Plays one full game. A guess timeout is an outcome, not a crash: the game
/// instance is abandoned, matching the rule that no safe fallback move exists
/// once the budget is gone.
fn play_one(args: &Args, rng: &mut SmallRng) -> anyhow::Result<Outcome> {
    // Open near the middle; the board generator keeps the opening safe.
    let first_click = (args.height / 2) * args.width + args.width / 2;
    let mut board = Board::generate_safe(args.width, args.height, args.mines, first_click, rng)?;
    board.open(first_click);

    let budget = Duration::from_millis(args.move_budget_ms);
    let mut moves = 0usize;

    while board.state() == BoardState::Ongoing {
        moves += 1;
        let snapshot = board.snapshot();

        let solutions = solve(&snapshot)?;
        if !solutions.is_empty() {
            debug!(moves, deduced = solutions.len(), "applying certain deductions");
            for solution in solutions {
                match solution.verdict {
                    Verdict::Safe => {
                        board.open(solution.cell);
                    }
                    Verdict::Mined => board.flag(solution.cell),
                }
                if board.state() != BoardState::Ongoing {
                    break;
                }
            }
        } else {
            let deadline = Instant::now() + budget;
            let card = match score(&snapshot, Some(deadline)) {
                Ok(card) => card,
                Err(SolverError::GuessTimeout) => {
                    warn!(moves, "guess computation blew its budget; abandoning game");
                    return Ok(Outcome::TimedOut);
                }
                Err(err) => return Err(err.into()),
            };
            let Some(cell) = card.best() else {
                anyhow::bail!("ongoing game produced no candidate move");
            };
            debug!(
                moves,
                cell,
                safety = card.safety_of(cell).unwrap_or(0.0),
                "guessing"
            );
            board.open(cell);
        }

        if args.show_board {
            print_board(&board);
        }
    }

    Ok(match board.state() {
        BoardState::Won => Outcome::Won,
        _ => Outcome::Lost,
    })
}

fn print_board(board: &Board) {
    print!("   ");
    for x in 0..board.width() {
        print!("{:^3}", x);
    }
    println!("\n  +{}", "---".repeat(board.width()));

    for y in 0..board.height() {
        print!("{:^2}|", y);
        for x in 0..board.width() {
            let display = match board.status(y * board.width() + x) {
                CellStatus::Unknown => " ■ ".to_string(),
                CellStatus::Flagged => " F ".to_string(),
                CellStatus::Opened(n) => format!(" {} ", n),
            };
            print!("{display}");
        }
        println!();
    }
    println!();
}
