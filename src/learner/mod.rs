//! Learners: train/test orchestration over scope enumerations.

pub mod learner;
pub mod model;
pub mod trainer;

pub use learner::{Learner, LearnerError, UpdatingLearner};
pub use model::{shared_model, MeanModel, Model, ModelError, SharedModel};
pub use trainer::{Tester, Trainer, TrainerError};
