use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::Display;

// ********* Errors **********

/// Errors that prevent the questions from being built.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum GroupingError {
    /// Splitting on an empty separator is not defined.
    EmptySeparator,
}

impl Error for GroupingError {}

impl Display for GroupingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GroupingError::EmptySeparator => write!(f, "the variable separator may not be empty"),
        }
    }
}

/// Errors that abort the compilation of a whole batch.
///
/// Recoverable problems (malformed statistic requests, rotated blocks of
/// unequal length, labels that cannot be encoded) are only logged.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum CompileError {
    /// The table refers to a question that does not exist.
    UnknownQuestion(String),
    /// The table has no rows to tabulate.
    EmptyTable(String),
}

impl Error for CompileError {}

impl Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::UnknownQuestion(id) => {
                write!(f, "table {} does not refer to a known question", id)
            }
            CompileError::EmptyTable(id) => write!(f, "table {} has no variables", id),
        }
    }
}

// ********* Configuration **********

/// Controls how rotated (looped) question blocks are detected.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct RotationConfig {
    /// The ids are split on the last occurrence of this separator.
    pub separator: String,
    /// Ids that are never split, even if they contain the separator. They
    /// never join a rotation.
    pub independent: BTreeSet<String>,
    /// Ids starting with this prefix never take part in a rotation.
    pub exclude_prefix: String,
}

impl RotationConfig {
    pub const DEFAULT_SEPARATOR: &'static str = "_";
    pub const DEFAULT_EXCLUDE_PREFIX: &'static str = "pre";

    pub fn disabled() -> RotationConfig {
        RotationConfig {
            separator: String::new(),
            ..RotationConfig::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.separator.is_empty()
    }
}

impl Default for RotationConfig {
    fn default() -> Self {
        RotationConfig {
            separator: RotationConfig::DEFAULT_SEPARATOR.to_string(),
            independent: BTreeSet::new(),
            exclude_prefix: RotationConfig::DEFAULT_EXCLUDE_PREFIX.to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct CompileOptions {
    pub rotation: RotationConfig,
}
