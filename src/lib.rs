pub mod data;
pub mod learner;
pub mod scope;

// Re-export commonly used types
pub use data::{DataError, Dataset, Merger, ROW_ID};
pub use learner::{
    shared_model, Learner, LearnerError, MeanModel, Model, SharedModel, Tester, Trainer,
    UpdatingLearner,
};
pub use scope::{
    DataSelector, EnumScopeConfig, Scope, ScopeError, ScopeSelector, ScopeState, ScopeValue,
    WindowBound, WindowScopeConfig,
};
