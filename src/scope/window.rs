//! Window scopes over an ordered column.
//!
//! A window scope tracks a `[start, start + size]` range on one column and
//! advances it by `stride` per shift. Two advance modes exist:
//! - expander: the anchor stays put and the window widens (growing
//!   training history),
//! - roller: the width stays put and the window slides forward (moving
//!   test slice).

use std::fmt;

use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::ScopeError;

/// One endpoint of a window: an integer ordinal (season, round, year) or
/// a calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowBound {
    Int(i64),
    Date(NaiveDate),
}

impl WindowBound {
    /// Move the bound forward by `by` units (days for dates).
    pub fn advance(&self, by: i64) -> Self {
        match self {
            Self::Int(v) => Self::Int(v + by),
            Self::Date(d) => Self::Date(*d + Duration::days(by)),
        }
    }

    /// Whether `other` is the same kind of bound.
    pub fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::Int(_), Self::Int(_)) | (Self::Date(_), Self::Date(_))
        )
    }

    pub fn is_date(&self) -> bool {
        matches!(self, Self::Date(_))
    }

    /// Literal expression for comparisons against the scoped column.
    ///
    /// Dates become `%Y-%m-%d` strings compared lexically, matching how
    /// date columns are stored.
    pub fn to_lit(&self) -> Expr {
        match self {
            Self::Int(v) => lit(*v),
            Self::Date(d) => lit(d.to_string()),
        }
    }
}

impl fmt::Display for WindowBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Date(d) => write!(f, "{}", d),
        }
    }
}

/// Configuration for a window scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowScopeConfig {
    /// Column the window ranges over.
    pub col: String,
    /// Initial window start.
    pub start: WindowBound,
    /// Upper bound the window may not pass.
    pub max: WindowBound,
    /// Initial window width.
    pub size: i64,
    /// Advance per shift.
    pub stride: i64,
}

impl Default for WindowScopeConfig {
    fn default() -> Self {
        Self {
            col: "Season".to_string(),
            start: WindowBound::Int(2000),
            max: WindowBound::Int(2005),
            size: 1,
            stride: 1,
        }
    }
}

impl WindowScopeConfig {
    /// Derive a rolling test-window config that follows a training window:
    /// it starts one unit past the training window's initial end and
    /// shares its ceiling and stride.
    pub fn testing_window(train: &WindowScopeConfig, size: i64) -> Self {
        Self {
            col: train.col.clone(),
            start: train.start.advance(train.size + 1),
            max: train.max,
            size,
            stride: train.stride,
        }
    }

    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.col.is_empty() {
            return Err(ScopeError::EmptyColumn);
        }
        if self.stride <= 0 {
            return Err(ScopeError::InvalidStride(self.stride));
        }
        if self.size < 0 {
            return Err(ScopeError::InvalidSize(self.size));
        }
        if !self.start.same_kind(&self.max) {
            return Err(ScopeError::MixedBounds);
        }
        Ok(())
    }
}

/// How a window scope advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    /// Anchored start, growing width.
    Expander,
    /// Fixed width, sliding start.
    Roller,
}

/// A bounded window position on one column.
#[derive(Debug, Clone)]
pub struct WindowScope {
    col: String,
    start: WindowBound,
    size: i64,
    max: WindowBound,
    stride: i64,
    mode: WindowMode,
    orig_start: WindowBound,
    orig_size: i64,
}

impl WindowScope {
    pub fn new(config: WindowScopeConfig, mode: WindowMode) -> Result<Self, ScopeError> {
        config.validate()?;
        Ok(Self {
            col: config.col,
            start: config.start,
            size: config.size,
            max: config.max,
            stride: config.stride,
            mode,
            orig_start: config.start,
            orig_size: config.size,
        })
    }

    pub fn col(&self) -> &str {
        &self.col
    }

    pub fn start(&self) -> WindowBound {
        self.start
    }

    /// Inclusive end of the current window.
    pub fn end(&self) -> WindowBound {
        self.start.advance(self.size)
    }

    /// Reported end of the window: padded by one day for date bounds so
    /// integer and date windows both read as end-inclusive.
    pub fn state_end(&self) -> WindowBound {
        if self.start.is_date() {
            self.start.advance(self.size + 1)
        } else {
            self.start.advance(self.size)
        }
    }

    /// Advance the window one step.
    pub fn shift(&mut self) {
        match self.mode {
            WindowMode::Expander => self.size += self.stride,
            WindowMode::Roller => self.start = self.start.advance(self.stride),
        }
    }

    /// Whether the window is still within its ceiling.
    pub fn inside(&self) -> bool {
        match self.mode {
            WindowMode::Expander => self.end() <= self.max,
            WindowMode::Roller => self.start <= self.max,
        }
    }

    /// Restore the position captured at construction.
    pub fn reset_state(&mut self) {
        self.start = self.orig_start;
        self.size = self.orig_size;
    }

    /// Row predicate for the current window, inclusive on both ends.
    pub fn filter_expr(&self) -> Expr {
        col(self.col.as_str())
            .gt_eq(self.start.to_lit())
            .and(col(self.col.as_str()).lt_eq(self.end().to_lit()))
    }
}
