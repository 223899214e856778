use thiserror::Error;

/// Failures surfaced by the board model and the solver core.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SolverError {
    /// The constraint system derived from the board admits no consistent
    /// assignment. A consistent board can never produce this; hitting it
    /// means an internal invariant was violated upstream.
    #[error("constraint system is contradictory")]
    Contradiction,

    /// A guess computation ran past its wall-clock budget. There is no safe
    /// fallback move once this happens, so the game instance is lost.
    #[error("guess computation exceeded its time budget")]
    GuessTimeout,

    /// Board parameters rejected before the solver is ever invoked.
    #[error("invalid board parameters: {width}x{height} with {mines} mines")]
    InvalidBoard {
        width: usize,
        height: usize,
        mines: usize,
    },
}
