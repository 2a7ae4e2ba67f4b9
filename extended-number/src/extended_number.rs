use std::{
    cmp::Ordering,
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign},
};

use derive_more::{Display, Error, IsVariant};
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};

/// A number of the form `real + penalty * M`, where `M` is a symbolic constant larger than any
/// finite real.
///
/// `M` itself is never instantiated: the two parts are kept apart and compared with the penalty
/// part first, so that any amount of `M` dominates any real amount. The `Unbounded` variant is
/// the marker produced by a division by zero; it is greater than every finite value and absorbs
/// every arithmetic operation.
#[derive(Debug, Clone, Copy, IsVariant, Serialize, Deserialize)]
pub enum ExtendedNumber {
    Finite { real: f64, penalty: f64 },
    Unbounded,
}

/// The reason an [`ExtendedNumber`] could not be turned into a plain `f64`.
#[derive(Debug, Clone, Copy, PartialEq, Display, Error)]
pub enum NotReal {
    #[display(fmt = "The number carries a penalty term: {}", value)]
    Penalized { value: ExtendedNumber },
    #[display(fmt = "The number is unbounded")]
    Unbounded,
}

impl Default for ExtendedNumber {
    fn default() -> Self {
        Self::ZERO
    }
}

impl ExtendedNumber {
    pub const ZERO: Self = Self::new(0., 0.);

    #[inline(always)]
    pub const fn new(real: f64, penalty: f64) -> Self {
        Self::Finite { real, penalty }
    }

    /// `penalty * M` with no real part.
    #[inline]
    pub const fn big(penalty: f64) -> Self {
        Self::new(0., penalty)
    }

    pub const fn one_big() -> Self {
        Self::big(1.)
    }

    /// Real part, or positive infinity for the unbounded marker.
    pub const fn real(&self) -> f64 {
        match self {
            Self::Finite { real, .. } => *real,
            Self::Unbounded => f64::INFINITY,
        }
    }

    /// Coefficient of `M`, or positive infinity for the unbounded marker.
    pub const fn penalty(&self) -> f64 {
        match self {
            Self::Finite { penalty, .. } => *penalty,
            Self::Unbounded => f64::INFINITY,
        }
    }

    pub const fn finite(self) -> Option<(f64, f64)> {
        if let Self::Finite { real, penalty } = self {
            return Some((real, penalty));
        }
        None
    }

    pub fn has_penalty(&self) -> bool {
        match self {
            Self::Finite { penalty, .. } => *penalty != 0.,
            Self::Unbounded => false,
        }
    }

    /// Clears every component whose magnitude does not exceed `epsilon`.
    ///
    /// Negative zeros are turned into positive ones on the way.
    pub fn snap(self, epsilon: f64) -> Self {
        let clean = |x: f64| if x.abs() <= epsilon { 0. } else { x };
        match self {
            Self::Finite { real, penalty } => Self::new(clean(real), clean(penalty)),
            Self::Unbounded => Self::Unbounded,
        }
    }

    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Unbounded, Self::Unbounded) => Ordering::Equal,
            (Self::Unbounded, _) => Ordering::Greater,
            (_, Self::Unbounded) => Ordering::Less,
            (
                Self::Finite { real, penalty },
                Self::Finite {
                    real: other_real,
                    penalty: other_penalty,
                },
            ) => match penalty.total_cmp(other_penalty) {
                Ordering::Equal => real.total_cmp(other_real),
                ord => ord,
            },
        }
    }
}

impl PartialEq for ExtendedNumber {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unbounded, Self::Unbounded) => true,
            (
                Self::Finite { real, penalty },
                Self::Finite {
                    real: other_real,
                    penalty: other_penalty,
                },
            ) => real == other_real && penalty == other_penalty,
            _ => false,
        }
    }
}

impl PartialOrd for ExtendedNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Unbounded, Self::Unbounded) => Some(Ordering::Equal),
            (Self::Unbounded, _) => Some(Ordering::Greater),
            (_, Self::Unbounded) => Some(Ordering::Less),
            (
                Self::Finite { real, penalty },
                Self::Finite {
                    real: other_real,
                    penalty: other_penalty,
                },
            ) => match penalty.partial_cmp(other_penalty)? {
                Ordering::Equal => real.partial_cmp(other_real),
                ord => Some(ord),
            },
        }
    }
}

fn rounded(value: f64) -> String {
    // collapses -0 into 0
    let value = if value == 0. { 0. } else { value };
    if value.fract() == 0. {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

impl fmt::Display for ExtendedNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (real, penalty) = match self {
            Self::Finite { real, penalty } => (*real, *penalty),
            Self::Unbounded => return f.pad("Inf"),
        };
        let text = if penalty == 0. {
            rounded(real)
        } else if real == 0. {
            format!("{}*M", rounded(penalty))
        } else {
            format!(
                "({} {}{}*M)",
                rounded(real),
                if penalty > 0. { "+" } else { "" },
                rounded(penalty)
            )
        };
        f.pad(&text)
    }
}

impl TryFrom<ExtendedNumber> for f64 {
    type Error = NotReal;

    fn try_from(value: ExtendedNumber) -> Result<Self, Self::Error> {
        match value {
            ExtendedNumber::Finite { real, penalty } if penalty == 0. => Ok(real),
            ExtendedNumber::Finite { .. } => Err(NotReal::Penalized { value }),
            ExtendedNumber::Unbounded => Err(NotReal::Unbounded),
        }
    }
}

impl Add for ExtendedNumber {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (
                Self::Finite { real, penalty },
                Self::Finite {
                    real: rhs_real,
                    penalty: rhs_penalty,
                },
            ) => Self::new(real + rhs_real, penalty + rhs_penalty),
            _ => Self::Unbounded,
        }
    }
}

impl Sub for ExtendedNumber {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (
                Self::Finite { real, penalty },
                Self::Finite {
                    real: rhs_real,
                    penalty: rhs_penalty,
                },
            ) => Self::new(real - rhs_real, penalty - rhs_penalty),
            _ => Self::Unbounded,
        }
    }
}

/// It won't be used for multiplication of two numbers with penalty parts both
impl Mul for ExtendedNumber {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            // (a + bM) * (c + dM) = ac + (ad + bc)M + bdM^2, the last term is always zero
            (
                Self::Finite { real, penalty },
                Self::Finite {
                    real: rhs_real,
                    penalty: rhs_penalty,
                },
            ) => Self::new(real * rhs_real, penalty * rhs_real + rhs_penalty * real),
            _ => Self::Unbounded,
        }
    }
}

/// Divides both parts by the real part of the divisor; a zero divisor gives `Unbounded`.
impl Div for ExtendedNumber {
    type Output = Self;

    fn div(self, rhs: Self) -> Self::Output {
        match (self, rhs) {
            (Self::Finite { real, penalty }, Self::Finite { real: divisor, .. })
                if divisor != 0. =>
            {
                Self::new(real / divisor, penalty / divisor)
            }
            _ => Self::Unbounded,
        }
    }
}

impl Neg for ExtendedNumber {
    type Output = Self;

    fn neg(self) -> Self::Output {
        match self {
            Self::Finite { real, penalty } => Self::new(-real, -penalty),
            Self::Unbounded => Self::Unbounded,
        }
    }
}

impl AddAssign for ExtendedNumber {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for ExtendedNumber {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Sum for ExtendedNumber {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |sum, el| sum + el)
    }
}

impl Zero for ExtendedNumber {
    #[inline]
    fn zero() -> Self {
        Self::ZERO
    }

    fn is_zero(&self) -> bool {
        matches!(self, Self::Finite { real, penalty } if *real == 0. && *penalty == 0.)
    }
}

impl One for ExtendedNumber {
    #[inline]
    fn one() -> Self {
        Self::new(1., 0.)
    }

    fn is_one(&self) -> bool {
        matches!(self, Self::Finite { real, penalty } if *real == 1. && *penalty == 0.)
    }
}

macro_rules! impl_from_number {
    ($($num: ident),+ $(,)?) => {
        $(
            impl From<$num> for ExtendedNumber {
                #[inline]
                fn from(val: $num) -> Self {
                    Self::new(val as f64, 0.)
                }
            }

            impl Add<$num> for ExtendedNumber {
                type Output = Self;

                fn add(self, other: $num) -> Self {
                    self + Self::from(other)
                }
            }

            impl Sub<$num> for ExtendedNumber {
                type Output = Self;

                fn sub(self, other: $num) -> Self {
                    self - Self::from(other)
                }
            }

            impl Mul<$num> for ExtendedNumber {
                type Output = Self;

                fn mul(self, other: $num) -> Self {
                    let other = other as f64;
                    match self {
                        Self::Finite { real, penalty } => Self::new(real * other, penalty * other),
                        Self::Unbounded => Self::Unbounded,
                    }
                }
            }

            impl Div<$num> for ExtendedNumber {
                type Output = Self;

                fn div(self, other: $num) -> Self {
                    self / Self::from(other)
                }
            }
        )+
    };
}

impl_from_number!(f64);
