//! Enum scopes over a categorical column.

use std::fmt;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::Dataset;

use super::ScopeError;

/// A discrete category value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScopeValue {
    Int(i64),
    Str(String),
}

impl ScopeValue {
    /// Literal expression for equality against the scoped column.
    pub fn to_lit(&self) -> Expr {
        match self {
            Self::Int(v) => lit(*v),
            Self::Str(s) => lit(s.clone()),
        }
    }
}

impl fmt::Display for ScopeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Str(s) => write!(f, "{}", s),
        }
    }
}

/// Configuration for an enum scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumScopeConfig {
    /// Column holding the category.
    pub col: String,
    /// Values to iterate, in order. When `None` the values are inferred
    /// from the first dataset the scope is bound to.
    pub values: Option<Vec<ScopeValue>>,
}

impl Default for EnumScopeConfig {
    fn default() -> Self {
        Self {
            col: "League".to_string(),
            values: None,
        }
    }
}

impl EnumScopeConfig {
    pub fn validate(&self) -> Result<(), ScopeError> {
        if self.col.is_empty() {
            return Err(ScopeError::EmptyColumn);
        }
        if let Some(values) = &self.values {
            if values.is_empty() {
                return Err(ScopeError::EmptyEnum);
            }
        }
        Ok(())
    }
}

/// Iterator over an ordered list of category values.
///
/// The value list may be deferred: an unbound scope infers it from the
/// unique values of its column the first time it sees a dataset, and the
/// inferred list is frozen for the life of the scope. `reset_state` only
/// rewinds the index; it never recomputes the list.
#[derive(Debug, Clone)]
pub struct EnumScope {
    col: String,
    values: Option<Vec<ScopeValue>>,
    cur_index: usize,
}

impl EnumScope {
    pub fn new(config: EnumScopeConfig) -> Result<Self, ScopeError> {
        config.validate()?;
        Ok(Self {
            col: config.col,
            values: config.values,
            cur_index: 0,
        })
    }

    pub fn col(&self) -> &str {
        &self.col
    }

    /// The frozen value list, when bound.
    pub fn values(&self) -> Option<&[ScopeValue]> {
        self.values.as_deref()
    }

    /// The value at the current position, when bound and in range.
    pub fn current_value(&self) -> Option<&ScopeValue> {
        self.values.as_ref().and_then(|v| v.get(self.cur_index))
    }

    /// Infer the value list from `dataset` unless one is already frozen.
    pub fn bind(&mut self, dataset: &Dataset) -> Result<(), ScopeError> {
        if self.values.is_some() {
            return Ok(());
        }
        let unique = dataset.unique_values(&self.col)?;
        let mut values = Vec::with_capacity(unique.len());
        for any in unique.iter() {
            match decode(&any) {
                Some(value) => values.push(value),
                None => {
                    return Err(ScopeError::UnsupportedValue {
                        col: self.col.clone(),
                        value: format!("{:?}", any),
                    })
                }
            }
        }
        debug!(col = %self.col, count = values.len(), "inferred enum scope values");
        self.values = Some(values);
        Ok(())
    }

    pub fn shift(&mut self) {
        self.cur_index += 1;
    }

    /// In range while the index addresses a value. An unbound scope is
    /// optimistically inside at position zero, pending its first bind.
    pub fn inside(&self) -> bool {
        match &self.values {
            Some(values) => self.cur_index < values.len(),
            None => self.cur_index == 0,
        }
    }

    pub fn reset_state(&mut self) {
        self.cur_index = 0;
    }

    /// Row predicate for the current value; matches nothing when no value
    /// is addressable.
    pub fn filter_expr(&self) -> Expr {
        match self.current_value() {
            Some(value) => col(self.col.as_str()).eq(value.to_lit()),
            None => lit(false),
        }
    }
}

fn decode(value: &AnyValue) -> Option<ScopeValue> {
    match value {
        AnyValue::Int64(v) => Some(ScopeValue::Int(*v)),
        AnyValue::Int32(v) => Some(ScopeValue::Int(*v as i64)),
        AnyValue::UInt32(v) => Some(ScopeValue::Int(*v as i64)),
        AnyValue::UInt64(v) => Some(ScopeValue::Int(*v as i64)),
        AnyValue::String(s) => Some(ScopeValue::Str((*s).to_string())),
        AnyValue::StringOwned(s) => Some(ScopeValue::Str(s.to_string())),
        _ => None,
    }
}
