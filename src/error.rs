use thiserror::Error;
use crate::Key;

/// Everything that can go wrong while building factors, eliminating a graph
/// or updating an incremental Bayes tree. Construction and ordering errors
/// abort the whole call; numerical failures of a single discrete assignment
/// are not reported here, since they only null the corresponding leaf.
#[derive(Debug, Error)]
pub enum HybridError {

    #[error("Mixture component over keys {found:?} does not match declared continuous keys {expected:?}")]
    ComponentKeys { expected : Vec<Key>, found : Vec<Key> },

    #[error("Expected {expected} leaves for the informed discrete keys, but {found} were given")]
    LeafCount { expected : usize, found : usize },

    #[error("Variable {key} has dimension {found}, but dimension {expected} was seen before")]
    Dimension { key : Key, expected : usize, found : usize },

    #[error("Key {0} is used both as a continuous and as a discrete variable")]
    KeyKind(Key),

    #[error("Discrete variable {discrete} cannot be eliminated while continuous variable {continuous} is still present")]
    Ordering { discrete : Key, continuous : Key },

    #[error("Discrete key {0} informed more than once")]
    DuplicateKey(Key),

    #[error("Key {0} appears more than once in the elimination ordering")]
    DuplicateOrdering(Key),

    #[error("Key {0} is not covered by the elimination ordering")]
    IncompleteOrdering(Key),

    #[error("Continuous variable {frontal} was grouped with a purely discrete factor")]
    UnexpectedFactor { frontal : Key },

    #[error("Index {index} out of bounds for container of length {len}")]
    OutOfBounds { index : usize, len : usize },

    #[error("Key {0} not found")]
    MissingKey(Key),

    #[error("Assignment does not hold a value for discrete key {0}")]
    MissingAssignment(Key),

    #[error("Value {value} is outside the domain of discrete key {key} (cardinality {cardinality})")]
    AssignmentRange { key : Key, value : usize, cardinality : usize },

    #[error("Component selected for discrete key(s) {0:?} was pruned")]
    PrunedComponent(Vec<Key>),

    #[error("Clique of key {0} does not hold a discrete conditional")]
    NotDiscrete(Key),

    #[error("Linear system is singular or rank-deficient at variable {0}")]
    IndeterminantSystem(Key),

    #[error("Invalid discrete table: {0}")]
    Table(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error)

}

pub type Result<T> = std::result::Result<T, HybridError>;
