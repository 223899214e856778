//! # Minesweeper Solver Library
//!
//! An automatic Minesweeper player. Given a snapshot of a partially revealed
//! board it deduces every provably safe or provably mined cell, and when no
//! certain deduction exists it estimates each unknown cell's probability of
//! being safe and selects the least risky guess.
//!
//! The deduction core is a small constraint solver over binary "is-mined"
//! variables with sum constraints: constraint propagation by trivial
//! resolution and pairwise subtraction, connected-component decomposition of
//! the residue, depth-bounded case-split enumeration per component, and
//! binomial weighting of the enumerated configurations against the remaining
//! mine budget.
//!
//! ## Modules
//! - `board`: the board model (`Board`) and the immutable per-cycle view
//!   (`Snapshot`) the solver consumes.
//! - `constraint`: the `Constraint` and `Solution` value types.
//! - `config`: the `Configuration` hypothesis type.
//! - `infer`: the `Inferrer` fixpoint engine and the [`solve`] entry point.
//! - `group`: partitioning of residual constraints into disjoint groups.
//! - `enumerate`: per-group configuration enumeration.
//! - `score`: probability estimation and guess selection ([`score`]).
//! - `error`: the [`SolverError`] type.
//!
//! Everything is single-threaded and deterministic: the solver is a pure
//! function of the snapshot, and all board mutation happens between cycles.

pub mod board;
pub mod config;
pub mod constraint;
pub mod enumerate;
pub mod error;
pub mod group;
pub mod infer;
pub mod score;

pub use board::{Board, BoardState, CellStatus, Snapshot, SnapshotCell};
pub use config::{Assignment, Configuration};
pub use constraint::{Constraint, Solution, Verdict};
pub use error::SolverError;
pub use infer::solve;
pub use score::{Scorecard, score};

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    /// Full cycle on a real board: deduce, apply, guess, repeat. Seeded, so
    /// the run is reproducible; the game must end in a win or a loss rather
    /// than stalling.
    #[test]
    fn solver_plays_a_full_game_to_completion() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut board = Board::generate_safe(6, 6, 5, 14, &mut rng).unwrap();
        board.open(14);

        let mut cycles = 0;
        while board.state() == BoardState::Ongoing {
            cycles += 1;
            assert!(cycles < 200, "solver made no progress");

            let snapshot = board.snapshot();
            let solutions = solve(&snapshot).unwrap();
            if solutions.is_empty() {
                let card = score(&snapshot, None).unwrap();
                let guess = card.best().expect("ongoing game must leave a move");
                board.open(guess);
            } else {
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
            }
        }

        assert!(matches!(board.state(), BoardState::Won | BoardState::Lost));
    }

    /// Deduced-safe cells must never lose the game when opened.
    #[test]
    fn certain_deductions_are_sound() {
        let mut rng = SmallRng::seed_from_u64(7);
        for seed_cell in [0, 12, 24] {
            let mut board = Board::generate_safe(5, 5, 4, seed_cell, &mut rng).unwrap();
            board.open(seed_cell);
            while board.state() == BoardState::Ongoing {
                let solutions = solve(&board.snapshot()).unwrap();
                if solutions.is_empty() {
                    break;
                }
                for solution in solutions {
                    match solution.verdict {
                        Verdict::Safe => {
                            let state = board.open(solution.cell);
                            assert_ne!(state, BoardState::Lost, "deduced-safe cell was mined");
                        }
                        Verdict::Mined => board.flag(solution.cell),
                    }
                    if board.state() != BoardState::Ongoing {
                        break;
                    }
                }
            }
        }
    }
}
