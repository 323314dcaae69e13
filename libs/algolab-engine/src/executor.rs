//! Grader - High-Level Orchestration
//!
//! **Responsibility:**
//! Coordinate the script engine, the argument resolver and the evaluator to
//! turn a submission plus test cases into a `TestReport`.
//!
//! **Architecture:**
//! 1. Resolve the call shape for each test case (resolver.rs)
//! 2. Run it in a fresh interpreter context (engine.rs)
//! 3. Judge the result and aggregate verdicts (evaluator.rs)
//!
//! This module is the glue layer - it knows nothing about:
//! - How code executes (engine's job)
//! - How outputs are compared (evaluator's job)
//!
//! Test cases run sequentially in input order. One failing case never stops
//! the others.

use algolab_common::config::EngineConfig;
use algolab_common::types::{CallConvention, ComparisonMode, Exercise, TestCase, TestReport};
use tracing::{info, instrument};

use crate::engine::{self, ScriptEngine};
use crate::evaluator;
use crate::resolver;

#[derive(Debug, Clone)]
pub struct Grader {
    engine: ScriptEngine,
    comparison: ComparisonMode,
    default_function_name: String,
}

impl Default for Grader {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Grader {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            engine: ScriptEngine::new(config),
            comparison: config.comparison,
            default_function_name: config.default_function_name.clone(),
        }
    }

    pub fn engine(&self) -> &ScriptEngine {
        &self.engine
    }

    pub fn comparison(&self) -> ComparisonMode {
        self.comparison
    }

    /// Grade `source` against `test_cases` with the shape heuristic.
    pub fn grade_submission(
        &self,
        source: &str,
        function_name: &str,
        test_cases: &[TestCase],
    ) -> TestReport {
        self.grade_with(source, function_name, test_cases, None, self.comparison)
    }

    /// Grade with an exercise-level calling convention and comparison mode.
    #[instrument(skip(self, source, test_cases), fields(test_count = test_cases.len()))]
    pub fn grade_with(
        &self,
        source: &str,
        function_name: &str,
        test_cases: &[TestCase],
        convention: Option<&CallConvention>,
        comparison: ComparisonMode,
    ) -> TestReport {
        let results = test_cases
            .iter()
            .map(|test_case| {
                let result =
                    resolver::resolve_and_execute(&self.engine, source, function_name, test_case, convention);
                evaluator::evaluate_case(test_case, result, comparison)
            })
            .collect();

        let report = evaluator::aggregate(results);

        info!(
            passed = report.passed_count,
            total = report.total_count,
            all_passed = report.all_passed,
            "Grading complete"
        );

        report
    }

    /// Grade `source` against an exercise record.
    ///
    /// The function name is `function_name` if non-blank, else the exercise's
    /// declared name, else whatever [`Grader::resolve_function_name`] finds.
    pub fn grade_exercise(
        &self,
        exercise: &Exercise,
        source: &str,
        function_name: Option<&str>,
    ) -> TestReport {
        let non_blank = |name: &&str| !name.trim().is_empty();
        let explicit = function_name
            .filter(non_blank)
            .or(exercise.function_name.as_deref().filter(non_blank));
        let name = match explicit.map(str::trim) {
            Some(name) => name.to_string(),
            None => self.resolve_function_name(source, None),
        };

        info!(exercise = %exercise.id, function = %name, "Grading exercise");

        self.grade_with(
            source,
            &name,
            &exercise.test_cases,
            exercise.call_convention.as_ref(),
            exercise.comparison.unwrap_or(self.comparison),
        )
    }

    /// Explicit name if non-blank, else the first declared function, else the
    /// configured default.
    pub fn resolve_function_name(&self, source: &str, explicit: Option<&str>) -> String {
        explicit
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| engine::find_function_name(source))
            .unwrap_or_else(|| self.default_function_name.clone())
    }
}
