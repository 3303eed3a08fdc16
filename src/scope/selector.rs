//! Scope dispatch and the scope-to-filter adapter.

use std::fmt;

use polars::prelude::*;

use crate::data::Dataset;

use super::enumeration::{EnumScope, EnumScopeConfig, ScopeValue};
use super::window::{WindowBound, WindowMode, WindowScope, WindowScopeConfig};
use super::ScopeError;

/// A single-dimension stateful iterator over one dataset column.
#[derive(Debug, Clone)]
pub enum Scope {
    Window(WindowScope),
    Enum(EnumScope),
}

impl Scope {
    /// Expanding window: anchored start, width grows by `stride` per shift.
    pub fn expander(config: WindowScopeConfig) -> Result<Self, ScopeError> {
        Ok(Self::Window(WindowScope::new(config, WindowMode::Expander)?))
    }

    /// Rolling window: fixed width, start slides by `stride` per shift.
    pub fn roller(config: WindowScopeConfig) -> Result<Self, ScopeError> {
        Ok(Self::Window(WindowScope::new(config, WindowMode::Roller)?))
    }

    /// Enumeration over a category column's values.
    pub fn enumeration(config: EnumScopeConfig) -> Result<Self, ScopeError> {
        Ok(Self::Enum(EnumScope::new(config)?))
    }

    pub fn col(&self) -> &str {
        match self {
            Self::Window(w) => w.col(),
            Self::Enum(e) => e.col(),
        }
    }

    pub fn shift(&mut self) {
        match self {
            Self::Window(w) => w.shift(),
            Self::Enum(e) => e.shift(),
        }
    }

    pub fn inside(&self) -> bool {
        match self {
            Self::Window(w) => w.inside(),
            Self::Enum(e) => e.inside(),
        }
    }

    pub fn reset_state(&mut self) {
        match self {
            Self::Window(w) => w.reset_state(),
            Self::Enum(e) => e.reset_state(),
        }
    }

    /// Late binding against a dataset; only enum scopes with deferred
    /// value lists do anything here.
    pub fn bind(&mut self, dataset: &Dataset) -> Result<(), ScopeError> {
        match self {
            Self::Window(_) => Ok(()),
            Self::Enum(e) => e.bind(dataset),
        }
    }

    /// The current position, for reporting and logs.
    pub fn current_state(&self) -> ScopeState {
        match self {
            Self::Window(w) => ScopeState::Window {
                col: w.col().to_string(),
                start: w.start(),
                end: w.state_end(),
            },
            Self::Enum(e) => ScopeState::Enum {
                col: e.col().to_string(),
                value: e.current_value().cloned(),
            },
        }
    }

    fn filter_expr(&self) -> Expr {
        match self {
            Self::Window(w) => w.filter_expr(),
            Self::Enum(e) => e.filter_expr(),
        }
    }
}

/// Reportable position of a scope: a window range or a category value.
#[derive(Debug, Clone, PartialEq)]
pub enum ScopeState {
    Window {
        col: String,
        start: WindowBound,
        end: WindowBound,
    },
    Enum {
        col: String,
        /// `None` when the scope is unbound or exhausted.
        value: Option<ScopeValue>,
    },
}

impl fmt::Display for ScopeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Window { col, start, end } => write!(f, "{}=[{}, {}]", col, start, end),
            Self::Enum { col, value } => match value {
                Some(v) => write!(f, "{}={}", col, v),
                None => write!(f, "{}=<unbound>", col),
            },
        }
    }
}

/// Binds one scope to a row-filtering transform.
#[derive(Debug, Clone)]
pub struct ScopeSelector {
    scope: Scope,
}

impl ScopeSelector {
    pub fn new(scope: Scope) -> Self {
        Self { scope }
    }

    /// Carve the subset of `dataset` matching the scope's current
    /// position. Always an independent copy; never mutates the input.
    /// A combination matching no rows yields an empty copy, not an error.
    pub fn transform(&mut self, dataset: &Dataset) -> Result<Dataset, ScopeError> {
        self.scope.bind(dataset)?;
        Ok(dataset.filter(self.scope.filter_expr())?)
    }

    /// Advance the underlying scope.
    pub fn update(&mut self) {
        self.scope.shift();
    }

    /// Whether the underlying scope is still in range.
    pub fn holds(&self) -> bool {
        self.scope.inside()
    }

    /// Restore the underlying scope's initial position.
    pub fn reset_state(&mut self) {
        self.scope.reset_state();
    }

    pub fn current_state(&self) -> ScopeState {
        self.scope.current_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seasons() -> Dataset {
        let frame = df!(
            "Season" => [2000i64, 2001, 2002, 2003],
            "League" => ["A", "A", "B", "B"],
        )
        .unwrap();
        Dataset::new(frame, &[], &[]).unwrap()
    }

    fn window(start: i64, max: i64, size: i64, stride: i64) -> WindowScopeConfig {
        WindowScopeConfig {
            col: "Season".to_string(),
            start: WindowBound::Int(start),
            max: WindowBound::Int(max),
            size,
            stride,
        }
    }

    #[test]
    fn test_window_transform_selects_inclusive_range() {
        let mut sel = ScopeSelector::new(Scope::expander(window(2000, 2003, 1, 1)).unwrap());
        let subset = sel.transform(&seasons()).unwrap();
        let vals: Vec<i64> = subset
            .dataframe()
            .column("Season")
            .unwrap()
            .i64()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(vals, vec![2000, 2001]);
    }

    #[test]
    fn test_enum_transform_selects_current_value() {
        let mut sel = ScopeSelector::new(
            Scope::enumeration(EnumScopeConfig::default()).unwrap(),
        );
        let data = seasons();

        let subset = sel.transform(&data).unwrap();
        assert_eq!(subset.height(), 2);

        sel.update();
        let subset = sel.transform(&data).unwrap();
        let leagues: Vec<&str> = subset
            .dataframe()
            .column("League")
            .unwrap()
            .str()
            .unwrap()
            .into_no_null_iter()
            .collect();
        assert_eq!(leagues, vec!["B", "B"]);
    }

    #[test]
    fn test_transform_out_of_values_matches_nothing() {
        let mut sel = ScopeSelector::new(
            Scope::enumeration(EnumScopeConfig::default()).unwrap(),
        );
        let data = seasons();
        sel.transform(&data).unwrap();
        sel.update();
        sel.update();
        assert!(!sel.holds());
        let subset = sel.transform(&data).unwrap();
        assert!(subset.empty());
    }

    #[test]
    fn test_no_matching_rows_is_empty_not_error() {
        let mut sel = ScopeSelector::new(Scope::roller(window(2010, 2020, 1, 1)).unwrap());
        let subset = sel.transform(&seasons()).unwrap();
        assert!(subset.empty());
    }

    #[test]
    fn test_state_display() {
        let sel = ScopeSelector::new(Scope::expander(window(2000, 2003, 1, 1)).unwrap());
        assert_eq!(sel.current_state().to_string(), "Season=[2000, 2001]");
    }
}
