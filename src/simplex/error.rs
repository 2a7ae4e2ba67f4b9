use derive_more::Display;

/// Everything that can be wrong with a program before the tableau is built.
#[derive(Debug, Clone, PartialEq, Eq, Display, derive_more::Error)]
pub enum ProblemError {
    #[display(fmt = "Malformed numeric token `{}`", token)]
    MalformedToken { token: String },
    #[display(
        fmt = "Restriction {} has more than one relation symbol (<, >, <=, >=, =)",
        restriction
    )]
    DuplicateRelation { restriction: usize },
    #[display(fmt = "Restriction {} has no relation symbol (<, >, <=, >=, =)", restriction)]
    MissingRelation { restriction: usize },
    #[display(fmt = "Restriction {} has no right-hand side", restriction)]
    MissingRightHandSide { restriction: usize },
    #[display(
        fmt = "Unexpected token `{}` after the right-hand side of restriction {}",
        token,
        restriction
    )]
    UnexpectedToken { restriction: usize, token: String },
    #[display(
        fmt = "Restriction {} expects {} coefficients, got {}",
        restriction,
        expected,
        found
    )]
    VariableCountMismatch {
        restriction: usize,
        expected: usize,
        found: usize,
    },
    #[display(fmt = "The objective has no variables")]
    NoVariables,
    #[display(fmt = "The program has no restrictions")]
    NoRestrictions,
    #[display(fmt = "Unknown objective action `{}`, expected `max` or `min`", token)]
    UnknownAction { token: String },
    #[display(fmt = "The program text is empty")]
    EmptyProgram,
}

#[derive(Debug, Display, derive_more::Error)]
pub enum ConfigError {
    #[display(fmt = "Invalid solver configuration: {}", source)]
    Json { source: serde_json::Error },
    #[display(fmt = "The iteration cap must be positive")]
    ZeroIterationCap,
    #[display(fmt = "Epsilon must be a non-negative number, got {}", epsilon)]
    InvalidEpsilon { epsilon: f64 },
}

impl From<serde_json::Error> for ConfigError {
    fn from(source: serde_json::Error) -> Self {
        Self::Json { source }
    }
}

#[derive(Debug, Display, derive_more::Error)]
pub enum Error {
    #[display(fmt = "{}", source)]
    Problem { source: ProblemError },
    #[display(fmt = "{}", source)]
    Config { source: ConfigError },
}

impl From<ProblemError> for Error {
    fn from(source: ProblemError) -> Self {
        Self::Problem { source }
    }
}

impl From<ConfigError> for Error {
    fn from(source: ConfigError) -> Self {
        Self::Config { source }
    }
}
