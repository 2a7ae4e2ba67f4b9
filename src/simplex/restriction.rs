use std::{
    collections::HashMap,
    fmt,
    ops::{Mul, MulAssign},
    str::FromStr,
};

use derive_more::{Display, IsVariant};
use derive_new::new;
use extended_number::ExtendedNumber;
use lazy_static::lazy_static;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::ProblemError;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant, Display, Serialize, Deserialize,
)]
pub enum Relation {
    #[display(fmt = "<")]
    Less,
    #[display(fmt = "<=")]
    LessEqual,
    #[display(fmt = ">")]
    Greater,
    #[display(fmt = ">=")]
    GreaterEqual,
    #[display(fmt = "=")]
    Equal,
}

lazy_static! {
    static ref RELATIONS: HashMap<&'static str, Relation> = [
        ("<", Relation::Less),
        ("<=", Relation::LessEqual),
        (">", Relation::Greater),
        (">=", Relation::GreaterEqual),
        ("=", Relation::Equal),
    ]
    .into_iter()
    .collect();
}

impl Relation {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        RELATIONS.get(symbol).copied()
    }

    /// Synthetic columns a restriction with this relation needs, in insertion order.
    ///
    /// Strict relations are standardized like their non-strict counterparts.
    pub const fn synthetic_columns(self) -> &'static [ColumnKind] {
        match self {
            Relation::Less | Relation::LessEqual => &[ColumnKind::Slack],
            Relation::Greater | Relation::GreaterEqual => {
                &[ColumnKind::Surplus, ColumnKind::Artificial]
            }
            Relation::Equal => &[ColumnKind::Artificial],
        }
    }

    pub const fn mirrored(self) -> Self {
        match self {
            Relation::Less => Relation::Greater,
            Relation::LessEqual => Relation::GreaterEqual,
            Relation::Greater => Relation::Less,
            Relation::GreaterEqual => Relation::LessEqual,
            Relation::Equal => Relation::Equal,
        }
    }
}

impl FromStr for Relation {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_symbol(s).ok_or_else(|| ProblemError::MalformedToken {
            token: s.to_owned(),
        })
    }
}

impl Mul<f64> for Relation {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self::Output {
        if rhs >= 0. {
            return self;
        }
        self.mirrored()
    }
}

impl MulAssign<f64> for Relation {
    fn mul_assign(&mut self, rhs: f64) {
        *self = *self * rhs;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant, Serialize, Deserialize)]
pub enum ColumnKind {
    /// Decision variable entered by the user
    Plain,
    Slack,
    Surplus,
    Artificial,
    RelationOperator,
    RightHandSide,
}

impl ColumnKind {
    pub const fn is_synthetic(self) -> bool {
        matches!(
            self,
            ColumnKind::Slack | ColumnKind::Surplus | ColumnKind::Artificial
        )
    }

    /// Coefficient of a synthetic column in the restriction that owns it.
    pub const fn own_coefficient(self) -> f64 {
        match self {
            ColumnKind::Slack | ColumnKind::Artificial => 1.,
            ColumnKind::Surplus => -1.,
            _ => 0.,
        }
    }

    /// Coefficient of a synthetic column in the objective.
    ///
    /// The tableau always maximizes, so artificial columns cost `-M`.
    pub const fn objective_coefficient(self) -> ExtendedNumber {
        match self {
            ColumnKind::Artificial => ExtendedNumber::big(-1.),
            _ => ExtendedNumber::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, new)]
pub struct Column {
    pub kind: ColumnKind,
    pub value: ExtendedNumber,
}

/// A synthetic column required by the restriction at row `owner` (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct SyntheticColumn {
    pub kind: ColumnKind,
    pub owner: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IsVariant, Serialize, Deserialize)]
pub enum ObjectiveKind {
    /// Not an objective, an ordinary restriction
    None,
    Min,
    Max,
}

/// One element of a restriction read left to right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Entry {
    Column(Column),
    Relation(Relation),
    RightHandSide(ExtendedNumber),
}

impl Entry {
    pub const fn kind(&self) -> ColumnKind {
        match self {
            Entry::Column(column) => column.kind,
            Entry::Relation(_) => ColumnKind::RelationOperator,
            Entry::RightHandSide(_) => ColumnKind::RightHandSide,
        }
    }
}

/// A row of a linear program: `a_1*x_1 + ... + a_n*x_n <relation> rhs`.
///
/// The objective is stored as a restriction too, numbered 0, with an `=` relation and a zero
/// right-hand side that take no part in the calculations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Restriction {
    number: usize,
    columns: Vec<Column>,
    relation: Relation,
    rhs: ExtendedNumber,
    objective: ObjectiveKind,
}

impl Restriction {
    pub fn new(
        number: usize,
        coefficients: impl IntoIterator<Item = f64>,
        relation: Relation,
        rhs: f64,
    ) -> Self {
        Self {
            number,
            columns: plain_columns(coefficients),
            relation,
            rhs: rhs.into(),
            objective: ObjectiveKind::None,
        }
    }

    /// Objective row. Minimization is turned into maximization by negating every coefficient.
    pub fn objective(kind: ObjectiveKind, coefficients: impl IntoIterator<Item = f64>) -> Self {
        let mut columns = plain_columns(coefficients);
        if kind.is_min() {
            columns.iter_mut().for_each(|column| column.value = -column.value);
        }
        Self {
            number: 0,
            columns,
            relation: Relation::Equal,
            rhs: ExtendedNumber::ZERO,
            objective: kind,
        }
    }

    /// Builds a restriction from raw tokens: numeric coefficients, exactly one relation symbol
    /// and a trailing numeric right-hand side.
    ///
    /// A relation symbol that arrives before `variable_count` coefficients were read sets the
    /// remaining coefficients to zero.
    pub fn parse<S: AsRef<str>>(
        number: usize,
        tokens: &[S],
        variable_count: usize,
    ) -> Result<Self, ProblemError> {
        let mut coefficients = Vec::with_capacity(variable_count);
        let mut relation = None;
        let mut rhs = None;

        for token in tokens {
            let token: &str = token.as_ref();
            if let Some(symbol) = Relation::from_symbol(token) {
                if relation.is_some() {
                    return Err(ProblemError::DuplicateRelation {
                        restriction: number,
                    });
                }
                relation = Some(symbol);
                continue;
            }

            let value = parse_number(token)?;
            match (relation, rhs) {
                (None, _) => coefficients.push(value),
                (Some(_), None) => rhs = Some(value),
                (Some(_), Some(_)) => {
                    return Err(ProblemError::UnexpectedToken {
                        restriction: number,
                        token: token.to_owned(),
                    })
                }
            }
        }

        if coefficients.len() > variable_count {
            return Err(ProblemError::VariableCountMismatch {
                restriction: number,
                expected: variable_count,
                found: coefficients.len(),
            });
        }
        let relation = relation.ok_or(ProblemError::MissingRelation {
            restriction: number,
        })?;
        let rhs = rhs.ok_or(ProblemError::MissingRightHandSide {
            restriction: number,
        })?;
        coefficients.resize(variable_count, 0.);

        Ok(Self::new(number, coefficients, relation, rhs))
    }

    pub const fn number(&self) -> usize {
        self.number
    }

    pub fn variable_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub const fn relation(&self) -> Relation {
        self.relation
    }

    pub const fn rhs(&self) -> ExtendedNumber {
        self.rhs
    }

    pub const fn objective_kind(&self) -> ObjectiveKind {
        self.objective
    }

    /// Columns followed by the relation operator and the right-hand side.
    pub fn entries(&self) -> impl Iterator<Item = Entry> + '_ {
        self.columns
            .iter()
            .copied()
            .map(Entry::Column)
            .chain([Entry::Relation(self.relation), Entry::RightHandSide(self.rhs)])
    }

    /// Extends the row with zero coefficients up to `variable_count` columns.
    pub(crate) fn pad(&mut self, variable_count: usize) {
        let missing = variable_count.saturating_sub(self.columns.len());
        let zero = Column::new(ColumnKind::Plain, ExtendedNumber::ZERO);
        self.columns.extend(std::iter::repeat(zero).take(missing));
    }

    /// Flips the row when its right-hand side is negative, so that it can start in the basis.
    ///
    /// Returns whether the row was flipped.
    pub fn normalize_sign(&mut self) -> bool {
        if self.rhs < ExtendedNumber::ZERO {
            *self *= -1.;
            return true;
        }
        false
    }

    pub fn synthetic_columns(&self, owner: usize) -> impl Iterator<Item = SyntheticColumn> {
        self.relation
            .synthetic_columns()
            .iter()
            .map(move |kind| SyntheticColumn::new(*kind, owner))
    }

    /// Appends every synthetic column of the program to this restriction, which sits at `row`.
    ///
    /// Columns owned by this row get their own coefficient, the others an explicit zero.
    /// Afterwards the restriction is an equality.
    pub fn append_synthetic_columns(&mut self, columns: &[SyntheticColumn], row: usize) {
        self.columns.extend(columns.iter().map(|column| {
            let value = if column.owner == row {
                column.kind.own_coefficient()
            } else {
                0.
            };
            Column::new(column.kind, value.into())
        }));
        self.relation = Relation::Equal;
    }

    /// Appends the objective coefficient of every synthetic column.
    pub fn append_synthetic_columns_to_objective(&mut self, columns: &[SyntheticColumn]) {
        self.columns.extend(
            columns
                .iter()
                .map(|column| Column::new(column.kind, column.kind.objective_coefficient())),
        );
    }
}

fn plain_columns(coefficients: impl IntoIterator<Item = f64>) -> Vec<Column> {
    coefficients
        .into_iter()
        .map(|value| Column::new(ColumnKind::Plain, value.into()))
        .collect()
}

pub(crate) fn parse_number(token: &str) -> Result<f64, ProblemError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| ProblemError::MalformedToken {
            token: token.to_owned(),
        })
}

impl Mul<f64> for Restriction {
    type Output = Self;

    fn mul(mut self, rhs: f64) -> Self::Output {
        self *= rhs;
        self
    }
}

impl MulAssign<f64> for Restriction {
    fn mul_assign(&mut self, rhs: f64) {
        self.columns
            .iter_mut()
            .for_each(|column| column.value = column.value * rhs);
        self.rhs = self.rhs * rhs;
        self.relation *= rhs;
    }
}

impl fmt::Display for Restriction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.objective {
            ObjectiveKind::None => write!(f, "R{}:", self.number)?,
            ObjectiveKind::Max => write!(f, "Max Z =")?,
            ObjectiveKind::Min => write!(f, "Min Z =")?,
        }
        for (j, column) in self.columns.iter().enumerate() {
            // decision variables of a minimization are shown with the signs the user entered
            let value = if self.objective.is_min() && column.kind == ColumnKind::Plain {
                -column.value
            } else {
                column.value
            };
            if j == 0 {
                write!(f, " {value}*x{}", j + 1)?;
            } else if value < ExtendedNumber::zero() {
                write!(f, " - {}*x{}", -value, j + 1)?;
            } else {
                write!(f, " + {value}*x{}", j + 1)?;
            }
        }
        if self.objective.is_none() {
            write!(f, " {} {}", self.relation, self.rhs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::{assert_eq, assert_str_eq};

    use super::*;

    fn values(restriction: &Restriction) -> Vec<ExtendedNumber> {
        restriction.columns().iter().map(|column| column.value).collect()
    }

    #[test]
    fn relation_lookup() {
        assert_eq!(Relation::from_symbol("<="), Some(Relation::LessEqual));
        assert_eq!(">".parse::<Relation>(), Ok(Relation::Greater));
        assert_eq!(Relation::from_symbol("=>"), None);
        assert_eq!(Relation::GreaterEqual * -2., Relation::LessEqual);
        assert_eq!(Relation::Equal * -1., Relation::Equal);
    }

    #[test]
    fn parse_pads_early_relation() {
        let restriction = Restriction::parse(2, &["3", "<=", "7"], 3).unwrap();

        assert_eq!(
            values(&restriction),
            vec![ExtendedNumber::from(3.), ExtendedNumber::ZERO, ExtendedNumber::ZERO]
        );
        assert_eq!(restriction.relation(), Relation::LessEqual);
        assert_eq!(restriction.rhs(), ExtendedNumber::from(7.));
        assert_str_eq!(restriction.to_string(), "R2: 3*x1 + 0*x2 + 0*x3 <= 7");
    }

    #[test]
    fn parse_rejects_bad_tokens() {
        assert_eq!(
            Restriction::parse(1, &["1", "x", "<=", "4"], 2),
            Err(ProblemError::MalformedToken {
                token: "x".to_owned()
            })
        );
        assert_eq!(
            Restriction::parse(1, &["1", "<=", ">=", "4"], 2),
            Err(ProblemError::DuplicateRelation { restriction: 1 })
        );
        assert_eq!(
            Restriction::parse(3, &["1", "2", "4"], 2),
            Err(ProblemError::MissingRelation { restriction: 3 })
        );
        assert_eq!(
            Restriction::parse(1, &["1", "2", "="], 2),
            Err(ProblemError::MissingRightHandSide { restriction: 1 })
        );
        assert_eq!(
            Restriction::parse(1, &["1", "2", "3", "=", "1"], 2),
            Err(ProblemError::VariableCountMismatch {
                restriction: 1,
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            Restriction::parse(1, &["1", "=", "1", "5"], 2),
            Err(ProblemError::UnexpectedToken {
                restriction: 1,
                token: "5".to_owned()
            })
        );
        assert!(Restriction::parse(1, &["inf", "=", "1"], 1).is_err());
    }

    #[test]
    fn entries_end_with_relation_and_rhs() {
        let restriction = Restriction::new(1, [1., -2.], Relation::GreaterEqual, 5.);
        let kinds = restriction.entries().map(|entry| entry.kind()).collect::<Vec<_>>();

        assert_eq!(
            kinds,
            vec![
                ColumnKind::Plain,
                ColumnKind::Plain,
                ColumnKind::RelationOperator,
                ColumnKind::RightHandSide
            ]
        );
        assert_str_eq!(restriction.to_string(), "R1: 1*x1 - 2*x2 >= 5");
    }

    #[test]
    fn append_synthetic_columns_places_own_coefficients() {
        let columns = [
            SyntheticColumn::new(ColumnKind::Slack, 0),
            SyntheticColumn::new(ColumnKind::Surplus, 1),
            SyntheticColumn::new(ColumnKind::Artificial, 1),
            SyntheticColumn::new(ColumnKind::Artificial, 2),
        ];
        let mut less = Restriction::new(1, [1., 1.], Relation::LessEqual, 4.);
        let mut greater = Restriction::new(2, [1., 0.], Relation::GreaterEqual, 1.);
        let mut equal = Restriction::new(3, [0., 1.], Relation::Equal, 2.);

        less.append_synthetic_columns(&columns, 0);
        greater.append_synthetic_columns(&columns, 1);
        equal.append_synthetic_columns(&columns, 2);

        let row = |values: [f64; 6]| values.map(ExtendedNumber::from).to_vec();
        assert_eq!(values(&less), row([1., 1., 1., 0., 0., 0.]));
        assert_eq!(values(&greater), row([1., 0., 0., -1., 1., 0.]));
        assert_eq!(values(&equal), row([0., 1., 0., 0., 0., 1.]));
        for restriction in [&less, &greater, &equal] {
            assert_eq!(restriction.relation(), Relation::Equal);
            assert_eq!(restriction.variable_count(), 6);
        }
        assert_eq!(greater.columns()[4].kind, ColumnKind::Artificial);
    }

    #[test]
    fn objective_penalizes_artificial_columns() {
        let columns = [
            SyntheticColumn::new(ColumnKind::Surplus, 0),
            SyntheticColumn::new(ColumnKind::Artificial, 0),
            SyntheticColumn::new(ColumnKind::Slack, 1),
        ];
        let mut objective = Restriction::objective(ObjectiveKind::Min, [2., -3.]);

        objective.append_synthetic_columns_to_objective(&columns);

        assert_eq!(
            values(&objective),
            vec![
                ExtendedNumber::from(-2.),
                ExtendedNumber::from(3.),
                ExtendedNumber::ZERO,
                ExtendedNumber::big(-1.),
                ExtendedNumber::ZERO
            ]
        );
        assert_str_eq!(
            objective.to_string(),
            "Min Z = 2*x1 - 3*x2 + 0*x3 - 1*M*x4 + 0*x5"
        );
    }

    #[test]
    fn normalize_sign_flips_negative_rhs() {
        let mut restriction = Restriction::new(1, [1., -1.], Relation::LessEqual, -3.);

        assert!(restriction.normalize_sign());
        assert_eq!(restriction.relation(), Relation::GreaterEqual);
        assert_eq!(restriction.rhs(), ExtendedNumber::from(3.));
        assert_eq!(
            values(&restriction),
            vec![ExtendedNumber::from(-1.), ExtendedNumber::from(1.)]
        );
        assert!(!restriction.normalize_sign());
    }
}
