use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::ensure_eq;

use super::{
    restriction::parse_number, ObjectiveKind, ProblemError, Relation, Restriction,
};

/// A linear program: one objective row and the restriction rows, in declaration order.
///
/// Every variable is implicitly non-negative.
#[derive(Debug, Clone, PartialEq, Display, Serialize, Deserialize)]
#[display(
    fmt = "{}\n{}",
    objective,
    r#"restrictions.iter().map(|r| format!("{}\n", r)).collect::<String>().trim_end()"#
)]
pub struct LinearProgram {
    objective: Restriction,
    restrictions: Vec<Restriction>,
    variable_count: usize,
}

impl LinearProgram {
    pub fn new(
        objective: Restriction,
        restrictions: Vec<Restriction>,
    ) -> Result<Self, ProblemError> {
        let program = Self {
            variable_count: objective.variable_count(),
            objective,
            restrictions,
        };
        program.validate()?;
        Ok(program)
    }

    pub fn maximize(coefficients: impl IntoIterator<Item = f64>) -> Self {
        Self::with_objective(ObjectiveKind::Max, coefficients)
    }

    pub fn minimize(coefficients: impl IntoIterator<Item = f64>) -> Self {
        Self::with_objective(ObjectiveKind::Min, coefficients)
    }

    fn with_objective(kind: ObjectiveKind, coefficients: impl IntoIterator<Item = f64>) -> Self {
        let objective = Restriction::objective(kind, coefficients);
        Self {
            variable_count: objective.variable_count(),
            objective,
            restrictions: Vec::new(),
        }
    }

    pub fn with_restriction(
        mut self,
        coefficients: impl IntoIterator<Item = f64>,
        relation: Relation,
        rhs: f64,
    ) -> Self {
        self.push_restriction(coefficients, relation, rhs);
        self
    }

    /// Appends a restriction numbered after the existing ones. Missing trailing coefficients are
    /// zero.
    pub fn push_restriction(
        &mut self,
        coefficients: impl IntoIterator<Item = f64>,
        relation: Relation,
        rhs: f64,
    ) {
        let mut restriction =
            Restriction::new(self.restrictions.len() + 1, coefficients, relation, rhs);
        restriction.pad(self.variable_count);
        self.restrictions.push(restriction);
    }

    /// Reads a program from text.
    ///
    /// The first line holds the action (`max` or `min`) followed by the objective coefficients;
    /// every other line is a restriction such as `1 2 <= 5`. Blank lines and lines starting with
    /// `#` are skipped.
    pub fn parse(text: &str) -> Result<Self, ProblemError> {
        let mut lines = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'));

        let mut header = lines
            .next()
            .ok_or(ProblemError::EmptyProgram)?
            .split_whitespace();
        let action = header.next().ok_or(ProblemError::EmptyProgram)?;
        let kind = match action.to_ascii_lowercase().as_str() {
            "max" => ObjectiveKind::Max,
            "min" => ObjectiveKind::Min,
            _ => {
                return Err(ProblemError::UnknownAction {
                    token: action.to_owned(),
                })
            }
        };
        let coefficients = header.map(parse_number).collect::<Result<Vec<_>, _>>()?;
        let variable_count = coefficients.len();

        let restrictions = lines
            .enumerate()
            .map(|(i, line)| {
                let tokens = line.split_whitespace().collect::<Vec<_>>();
                Restriction::parse(i + 1, &tokens, variable_count)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(Restriction::objective(kind, coefficients), restrictions)
    }

    pub fn validate(&self) -> Result<(), ProblemError> {
        if self.variable_count == 0 {
            return Err(ProblemError::NoVariables);
        }
        if self.restrictions.is_empty() {
            return Err(ProblemError::NoRestrictions);
        }
        for restriction in &self.restrictions {
            ensure_eq!(
                restriction.variable_count(),
                self.variable_count,
                ProblemError::VariableCountMismatch {
                    restriction: restriction.number(),
                    expected: self.variable_count,
                    found: restriction.variable_count(),
                }
            );
        }
        Ok(())
    }

    /// Flips every restriction with a negative right-hand side. Returns how many were flipped.
    pub fn normalize_signs(&mut self) -> usize {
        let flipped = self
            .restrictions
            .iter_mut()
            .map(Restriction::normalize_sign)
            .filter(|flipped| *flipped)
            .count();
        if flipped > 0 {
            log::info!("Reversed sign on {flipped} restriction(s) with negative rhs");
        }
        flipped
    }

    pub fn objective(&self) -> &Restriction {
        &self.objective
    }

    pub(crate) fn objective_mut(&mut self) -> &mut Restriction {
        &mut self.objective
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub(crate) fn restrictions_mut(&mut self) -> &mut [Restriction] {
        &mut self.restrictions
    }

    pub const fn variable_count(&self) -> usize {
        self.variable_count
    }

    pub fn restriction_count(&self) -> usize {
        self.restrictions.len()
    }

    pub const fn action(&self) -> ObjectiveKind {
        self.objective.objective_kind()
    }

    pub fn set_variable_count(&mut self, variable_count: usize) {
        self.variable_count = variable_count;
    }
}
