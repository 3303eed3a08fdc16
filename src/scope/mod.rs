//! Scope iteration: the walk-forward enumeration core.
//!
//! A `Scope` is a stateful position along one dataset column (a time
//! window or a category value). A `ScopeSelector` turns a scope into a
//! row filter, and a `DataSelector` drives a backtracking enumeration over
//! two chains of selectors (training and testing) kept in lockstep,
//! yielding every combination in which all scopes are in range.

pub mod data_selector;
pub mod enumeration;
pub mod selector;
pub mod window;

use thiserror::Error;

use crate::data::DataError;

pub use data_selector::DataSelector;
pub use enumeration::{EnumScope, EnumScopeConfig, ScopeValue};
pub use selector::{Scope, ScopeSelector, ScopeState};
pub use window::{WindowBound, WindowMode, WindowScope, WindowScopeConfig};

#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Scope column must not be empty")]
    EmptyColumn,

    #[error("Stride must be positive to guarantee termination, got {0}")]
    InvalidStride(i64),

    #[error("Window size must be non-negative, got {0}")]
    InvalidSize(i64),

    #[error("Window start and max must both be integers or both be dates")]
    MixedBounds,

    #[error("Enum scope requires at least one value")]
    EmptyEnum,

    #[error("Unsupported enum value in column {col}: {value}")]
    UnsupportedValue { col: String, value: String },

    #[error("Data error: {0}")]
    Data(#[from] DataError),
}
