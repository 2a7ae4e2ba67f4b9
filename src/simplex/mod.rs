mod config;
mod driver;
mod error;
mod problem;
mod restriction;
mod table;

pub use config::{AlternatePolicy, DegeneracyPolicy, SolverConfig};
pub use driver::Simplex;
pub use error::{ConfigError, Error, ProblemError};
pub use problem::LinearProgram;
pub use restriction::{
    Column, ColumnKind, Entry, ObjectiveKind, Relation, Restriction, SyntheticColumn,
};
pub use table::{BasicValue, BasisEntry, Report, Status, Tableau};

use std::borrow::Cow;

use derive_more::{Display, IsVariant};
use extended_number::NotReal;
use nalgebra::DVector;

#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    pub variables: DVector<f64>,
    pub function_value: f64,
    /// Alternate optima met during the run
    pub alternates: usize,
}

impl Solution {
    pub fn as_str(&self) -> Cow<'static, str> {
        let mut text = format!(
            "Variables:\n{}\nFunction value: {}",
            self.variables, self.function_value
        );
        if self.alternates > 0 {
            text += &format!("\nAlternate optima: {}", self.alternates);
        }
        text.into()
    }
}

#[derive(Debug, Clone, PartialEq, Display, derive_more::Error, IsVariant)]
pub enum SolutionError {
    #[display(fmt = "The solution is infinite")]
    Infinite,
    #[display(fmt = "The solution is absent")]
    Absent,
    #[display(fmt = "The run stopped on a degenerate pivot")]
    Degenerate,
    #[display(fmt = "The iteration cap ran out before an optimum was reached")]
    Cyclic,
    #[display(fmt = "The run has not finished yet")]
    Unfinished,
    #[display(fmt = "The optimum is not a real number: {}", source)]
    NotReal { source: NotReal },
}

impl From<NotReal> for SolutionError {
    fn from(source: NotReal) -> Self {
        Self::NotReal { source }
    }
}

pub type SolutionResult = Result<Solution, SolutionError>;

impl TryFrom<Report> for Solution {
    type Error = SolutionError;

    fn try_from(report: Report) -> Result<Self, Self::Error> {
        match report.status {
            Status::Done | Status::AlternateOptimal => Ok(Solution {
                variables: DVector::from_vec(
                    report
                        .variables
                        .iter()
                        .map(|value| f64::try_from(*value))
                        .collect::<Result<Vec<_>, _>>()?,
                ),
                function_value: f64::try_from(report.objective_value)?,
                alternates: report.alternates,
            }),
            Status::NoFrontier => Err(SolutionError::Infinite),
            Status::NonViable => Err(SolutionError::Absent),
            Status::Degenerate => Err(SolutionError::Degenerate),
            Status::Cyclic => Err(SolutionError::Cyclic),
            Status::Work => Err(SolutionError::Unfinished),
        }
    }
}
