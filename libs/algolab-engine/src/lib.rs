//! Execution and grading of user-submitted JavaScript functions.
//!
//! [`engine`] runs one invocation in a fresh interpreter, [`resolver`] decides
//! how a test case input maps onto call arguments, [`evaluator`] judges one
//! result against its expectation and [`executor`] ties them together into a
//! [`TestReport`](algolab_common::types::TestReport).

pub mod canonical;
pub mod engine;
mod error;
pub mod evaluator;
pub mod executor;
pub mod resolver;

#[cfg(test)]
mod engine_tests;

pub use engine::ScriptEngine;
pub use error::EngineError;
pub use executor::Grader;
