mod helpers;
pub mod simplex;

pub use extended_number::{ExtendedNumber, NotReal};
pub use simplex::{LinearProgram, Simplex, Solution, SolutionError, SolutionResult, SolverConfig};

/// Solves `program` with the default configuration.
pub fn solve(program: LinearProgram) -> Result<SolutionResult, simplex::Error> {
    Ok(Simplex::new(program)?.solve())
}
