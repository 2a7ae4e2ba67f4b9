use std::fmt;

use derive_more::{Display, IsVariant};
use derive_new::new;
use extended_number::ExtendedNumber;
use nalgebra::{DMatrix, DVector, RowDVector};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use crate::dbg_display;

use super::{Column, ColumnKind, LinearProgram, ProblemError, Restriction, SyntheticColumn};

const ZERO: ExtendedNumber = ExtendedNumber::ZERO;

/// Width of every rendered tableau cell.
const CELL_WIDTH: usize = 14;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant, Display, Serialize, Deserialize,
)]
pub enum Status {
    /// Another pivot is needed
    Work,
    /// Optimum reached, every non-basic Cj - Zj is negative
    Done,
    /// The objective grows without bound along the pivot column
    NoFrontier,
    /// An artificial column kept a nonzero value at the optimum
    NonViable,
    /// The ratio test ended in a tie
    Degenerate,
    /// Optimum reached with a zero non-basic Cj - Zj
    AlternateOptimal,
    /// The iteration cap ran out
    Cyclic,
}

impl Status {
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Status::Done | Status::AlternateOptimal | Status::NoFrontier | Status::NonViable
        )
    }
}

/// A basic variable: its objective coefficient and its 1-based column index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, new)]
pub struct BasisEntry {
    pub objective_coefficient: ExtendedNumber,
    pub column_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, new)]
pub struct BasicValue {
    pub column_index: usize,
    pub value: ExtendedNumber,
}

/// Snapshot of the tableau's outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub status: Status,
    /// Objective value in the user's sense, so minimization is negated back
    pub objective_value: ExtendedNumber,
    pub basic: Vec<BasicValue>,
    /// Values of the decision variables, zero for the non-basic ones
    pub variables: DVector<ExtendedNumber>,
    pub alternates: usize,
}

/// Preference order in which unit columns are taken into the initial basis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BasisSearch {
    Penalty,
    Synthetic,
    Natural,
}

impl BasisSearch {
    const ORDER: [BasisSearch; 3] = [
        BasisSearch::Penalty,
        BasisSearch::Synthetic,
        BasisSearch::Natural,
    ];

    fn admits(self, objective: &Column) -> bool {
        match self {
            BasisSearch::Penalty => objective.value.has_penalty(),
            BasisSearch::Synthetic => {
                objective.kind.is_synthetic() && !objective.value.has_penalty()
            }
            BasisSearch::Natural => objective.kind == ColumnKind::Plain,
        }
    }
}

/// Big-M simplex tableau.
///
/// `matrix` has one row per restriction plus the Cj - Zj row, and one column per variable plus
/// the right-hand side and Theta columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tableau {
    program: LinearProgram,
    decision_variables: usize,
    basis: Vec<BasisEntry>,
    matrix: DMatrix<ExtendedNumber>,
    pivot_column: usize,
    pivot_line: usize,
    status: Status,
    alternates: usize,
    epsilon: f64,
}

impl Tableau {
    pub const DEFAULT_EPSILON: f64 = 1e-9;

    pub fn new(program: LinearProgram) -> Result<Self, ProblemError> {
        Self::with_epsilon(program, Self::DEFAULT_EPSILON)
    }

    pub fn with_epsilon(mut program: LinearProgram, epsilon: f64) -> Result<Self, ProblemError> {
        program.validate()?;
        program.normalize_signs();
        log::info!("Program:\n{program}");

        let mut tableau = Self {
            decision_variables: program.variable_count(),
            program,
            basis: Vec::new(),
            matrix: DMatrix::from_element(0, 0, ZERO),
            pivot_column: 0,
            pivot_line: 0,
            status: Status::Work,
            alternates: 0,
            epsilon,
        };
        tableau.standardize();
        tableau.choose_initial_basis();
        tableau.build_matrix();
        log::debug!("Initial tableau:\n{tableau}");
        Ok(tableau)
    }

    /// Appends the slack, surplus and artificial columns every restriction needs, turning each
    /// of them into an equality.
    fn standardize(&mut self) {
        let columns = self
            .program
            .restrictions()
            .iter()
            .enumerate()
            .flat_map(|(row, restriction)| restriction.synthetic_columns(row))
            .collect::<Vec<SyntheticColumn>>();

        self.program
            .objective_mut()
            .append_synthetic_columns_to_objective(&columns);
        for (row, restriction) in self.program.restrictions_mut().iter_mut().enumerate() {
            restriction.append_synthetic_columns(&columns, row);
        }

        let variable_count = self.program.objective().variable_count();
        for restriction in self.program.restrictions() {
            assert_eq!(
                restriction.variable_count(),
                variable_count,
                "Restriction {} is out of shape after standardization",
                restriction.number()
            );
        }
        self.program.set_variable_count(variable_count);
        log::info!(
            "Standardized with {} synthetic column(s):\n{}",
            columns.len(),
            self.program
        );
    }

    fn choose_initial_basis(&mut self) {
        let objective = self.program.objective().columns();
        let restrictions = self.program.restrictions();
        let mut used = vec![false; objective.len()];
        let mut basis = Vec::with_capacity(restrictions.len());

        for row in 0..restrictions.len() {
            let column_index = BasisSearch::ORDER
                .into_iter()
                .find_map(|search| {
                    (0..objective.len()).find(|&j| {
                        !used[j]
                            && search.admits(&objective[j])
                            && is_unit_column(restrictions, row, j)
                    })
                })
                .unwrap_or_else(|| {
                    panic!("Restriction {} has no unit column to enter the basis", row + 1)
                });
            used[column_index] = true;
            basis.push(BasisEntry::new(
                objective[column_index].value,
                column_index + 1,
            ));
        }

        log::info!(
            "Initial basis: {}",
            basis
                .iter()
                .map(|entry| format!("x{}", entry.column_index))
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.basis = basis;
    }

    fn build_matrix(&mut self) {
        let restrictions = self.program.restrictions();
        let n = self.program.variable_count();
        let m = restrictions.len();
        self.matrix = DMatrix::from_fn(m + 1, n + 2, |i, j| {
            if i == m || j == n + 1 {
                ZERO
            } else if j == n {
                restrictions[i].rhs()
            } else {
                restrictions[i].columns()[j].value
            }
        });
    }

    /// Fills the Cj - Zj row. Its right-hand side cell holds the current objective value.
    pub fn calculate_cj_zj(&mut self) {
        let m = self.restriction_count();
        let n = self.variable_count();
        let row = (0..=n)
            .map(|j| {
                let zj = self
                    .basis
                    .iter()
                    .enumerate()
                    .map(|(i, entry)| self.matrix[(i, j)] * entry.objective_coefficient)
                    .sum::<ExtendedNumber>();
                if j == n {
                    zj
                } else {
                    self.program.objective().columns()[j].value - zj
                }
            })
            .map(|value| value.snap(self.epsilon))
            .collect::<Vec<_>>();

        for (j, value) in row.into_iter().enumerate() {
            self.matrix[(m, j)] = value;
        }
    }

    /// Picks the pivot column and classifies the tableau. Calling it again without a pivot in
    /// between gives the same result.
    pub fn evaluate(&mut self) -> Status {
        let m = self.restriction_count();
        let best = (0..self.variable_count())
            .filter(|&j| !self.is_basic(j))
            .fold(None, |best: Option<(usize, ExtendedNumber)>, j| {
                let value = self.matrix[(m, j)];
                match best {
                    Some((_, current)) if current >= value => best,
                    _ => Some((j, value)),
                }
            });

        // there are always more columns than rows, so some column is non-basic
        let Some((column, value)) = best else {
            unreachable!("a standardized tableau has at least one non-basic column")
        };
        self.pivot_column = column;
        // a basic artificial with a nonzero value outranks a zero Cj - Zj
        self.status = if value <= ZERO && self.has_penalized_basis() {
            Status::NonViable
        } else if value < ZERO {
            Status::Done
        } else if value.is_zero() {
            Status::AlternateOptimal
        } else {
            Status::Work
        };

        log::info!(
            "Pivot column: x{} with Cj - Zj = {value}, status: {}",
            self.pivot_column + 1,
            self.status
        );
        self.status
    }

    /// Fills the Theta column for the current pivot column and picks the pivot line.
    pub fn ratio_test(&mut self) -> Status {
        let m = self.restriction_count();
        let rhs = self.rhs_column();
        let theta = self.theta_column();
        let column = self.pivot_column;

        for i in 0..m {
            let element = self.matrix[(i, column)];
            self.matrix[(i, theta)] = if element > ZERO {
                (self.matrix[(i, rhs)] / element).snap(self.epsilon)
            } else {
                ExtendedNumber::Unbounded
            };
        }

        let minimum = (0..m)
            .map(|i| self.matrix[(i, theta)])
            .fold(ExtendedNumber::Unbounded, |minimum, value| {
                if value < minimum {
                    value
                } else {
                    minimum
                }
            });
        if minimum.is_unbounded() {
            self.status = Status::NoFrontier;
            log::info!("No restriction limits x{}", column + 1);
            return self.status;
        }

        let tied = (0..m)
            .filter(|&i| self.matrix[(i, theta)] == minimum)
            .collect::<Vec<_>>();
        self.pivot_line = tied[0];
        self.status = if tied.len() > 1 {
            log::warn!(
                "Theta = {minimum} is shared by rows {}",
                tied.iter()
                    .map(|i| (i + 1).to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
            Status::Degenerate
        } else {
            Status::Work
        };
        log::info!("Pivot line: {}, Theta = {minimum}", self.pivot_line + 1);
        self.status
    }

    /// Swaps the pivot column into the basis in place of the pivot line's variable.
    pub fn pivot(&mut self) {
        let m = self.restriction_count();
        let theta = self.theta_column();
        let coefficient = self.program.objective().columns()[self.pivot_column].value;
        let leaving = std::mem::replace(
            &mut self.basis[self.pivot_line],
            BasisEntry::new(coefficient, self.pivot_column + 1),
        );
        log::info!(
            "x{} enters the basis, x{} leaves",
            self.pivot_column + 1,
            leaving.column_index
        );

        self.matrix.column_mut(theta).fill(ZERO);
        self.matrix.row_mut(m).fill(ZERO);
    }

    /// Gauss-Jordan step around the pivot element.
    pub fn reduce(&mut self) {
        let line = self.pivot_line;
        let column = self.pivot_column;
        // coefficients and the right-hand side
        let width = self.variable_count() + 1;
        let epsilon = self.epsilon;

        let element = dbg_display!(self.matrix[(line, column)]);
        self.matrix
            .row_mut(line)
            .columns_mut(0, width)
            .apply(|el| *el = (*el / element).snap(epsilon));

        let pivot_row = self.matrix.row(line).columns(0, width).into_owned();
        for i in (0..self.restriction_count()).filter(|&i| i != line) {
            let factor = self.matrix[(i, column)];
            if factor.is_zero() {
                continue;
            }
            self.matrix
                .row_mut(i)
                .columns_mut(0, width)
                .zip_apply(&pivot_row, |el, pivot_el| {
                    *el = (*el - pivot_el * factor).snap(epsilon)
                });
        }
        log::debug!("Reduced tableau:\n{self}");
    }

    /// Summarizes the current tableau. `is_alternate` counts the report as one more alternate
    /// optimum.
    pub fn report(&mut self, is_alternate: bool) -> Report {
        if is_alternate {
            self.alternates += 1;
        }
        let rhs = self.rhs_column();
        let value = self.matrix[(self.restriction_count(), rhs)];
        let objective_value = if self.program.action().is_min() {
            -value
        } else {
            value
        };

        Report {
            status: self.status,
            objective_value,
            basic: self
                .basis
                .iter()
                .enumerate()
                .map(|(i, entry)| BasicValue::new(entry.column_index, self.matrix[(i, rhs)]))
                .collect(),
            variables: DVector::from_fn(self.decision_variables, |j, _| {
                self.basic_row(j).map_or(ZERO, |i| self.matrix[(i, rhs)])
            }),
            alternates: self.alternates,
        }
    }

    fn has_penalized_basis(&self) -> bool {
        let rhs = self.rhs_column();
        self.basis.iter().enumerate().any(|(i, entry)| {
            entry.objective_coefficient.has_penalty() && !self.matrix[(i, rhs)].is_zero()
        })
    }

    /// Row in which the 0-based column `j` is basic.
    fn basic_row(&self, j: usize) -> Option<usize> {
        self.basis
            .iter()
            .position(|entry| entry.column_index == j + 1)
    }

    pub fn is_basic(&self, j: usize) -> bool {
        self.basic_row(j).is_some()
    }

    /// 1-based column indices of the basis, row by row.
    pub fn basis_indices(&self) -> Vec<usize> {
        self.basis.iter().map(|entry| entry.column_index).collect()
    }

    pub fn basis(&self) -> &[BasisEntry] {
        &self.basis
    }

    pub fn matrix(&self) -> &DMatrix<ExtendedNumber> {
        &self.matrix
    }

    pub fn program(&self) -> &LinearProgram {
        &self.program
    }

    pub const fn pivot_column(&self) -> usize {
        self.pivot_column
    }

    pub const fn pivot_line(&self) -> usize {
        self.pivot_line
    }

    pub const fn status(&self) -> Status {
        self.status
    }

    pub(crate) fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub const fn decision_variables(&self) -> usize {
        self.decision_variables
    }

    /// Variable count after standardization.
    pub fn variable_count(&self) -> usize {
        self.program.variable_count()
    }

    pub fn restriction_count(&self) -> usize {
        self.program.restriction_count()
    }

    pub fn cj_zj(&self) -> RowDVector<ExtendedNumber> {
        self.matrix
            .row(self.restriction_count())
            .columns(0, self.variable_count())
            .into_owned()
    }

    pub fn rhs(&self, i: usize) -> ExtendedNumber {
        self.matrix[(i, self.rhs_column())]
    }

    pub fn theta(&self, i: usize) -> ExtendedNumber {
        self.matrix[(i, self.theta_column())]
    }

    fn rhs_column(&self) -> usize {
        self.variable_count()
    }

    fn theta_column(&self) -> usize {
        self.variable_count() + 1
    }
}

fn is_unit_column(restrictions: &[Restriction], row: usize, j: usize) -> bool {
    restrictions.iter().enumerate().all(|(i, restriction)| {
        let value = restriction.columns()[j].value;
        if i == row {
            value == ExtendedNumber::from(1.)
        } else {
            value.is_zero()
        }
    })
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let m = self.restriction_count();
        let n = self.variable_count();

        write!(f, "|{:<CELL_WIDTH$}", "Base")?;
        for (j, column) in self.program.objective().columns().iter().enumerate() {
            write!(f, "|{:<CELL_WIDTH$}", format!("{}*x{}", column.value, j + 1))?;
        }
        writeln!(f, "|{:<CELL_WIDTH$}|{:<CELL_WIDTH$}|", "b", "Theta")?;
        writeln!(f, "{}", "-".repeat((n + 3) * (CELL_WIDTH + 1) + 1))?;

        for (i, entry) in self.basis.iter().enumerate() {
            write!(
                f,
                "|{:<CELL_WIDTH$}",
                format!("{}*x{}", entry.objective_coefficient, entry.column_index)
            )?;
            for value in self.matrix.row(i).iter() {
                write!(f, "|{value:<CELL_WIDTH$}")?;
            }
            writeln!(f, "|")?;
        }

        write!(f, "|{:<CELL_WIDTH$}", "Cj - Zj")?;
        for value in self.matrix.row(m).columns(0, n + 1).iter() {
            write!(f, "|{value:<CELL_WIDTH$}")?;
        }
        write!(f, "|{:<CELL_WIDTH$}|", "")
    }
}
