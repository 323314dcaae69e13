//! End-to-end grading tests
//!
//! These tests run real submissions through the full pipeline:
//! 1. Call shapes inferred for the classic exercise inputs
//! 2. Hidden cases stay redacted whether they pass or fail
//! 3. Thrown errors, bad syntax and runaway recursion come back as data
//! 4. Inputs are never mutated by user code
//! 5. Report counters always agree with the per-case verdicts
//! 6. Integer-like keys follow JavaScript own-key order

#[cfg(test)]
mod grading_tests {
    use crate::engine::ScriptEngine;
    use crate::resolver::resolve_and_execute;
    use crate::Grader;
    use algolab_common::config::{EngineConfig, ExecutionLimits};
    use algolab_common::types::{TestCase, TestReport};
    use serde_json::{json, Value};

    fn assert_consistent(report: &TestReport) {
        let passed = report.results.iter().filter(|r| r.passed).count();
        assert_eq!(report.passed_count, passed);
        assert_eq!(report.total_count, report.results.len());
        assert_eq!(report.all_passed, report.passed_count == report.total_count);
    }

    /// Homogeneous scalars are one array argument, even for a two-parameter function
    #[test]
    fn test_add_with_homogeneous_pair_gets_one_array() {
        let source = "function add(a,b){return a+b;}";
        let report = Grader::default().grade_submission(
            source,
            "add",
            &[TestCase::new(json!([2, 3]), json!(5))],
        );

        assert!(!report.all_passed);
        // [2,3] + undefined
        assert_eq!(report.results[0].actual_output.as_deref(), Some("\"2,3undefined\""));

        let sum = "function sum(arr){return arr.reduce(function(a,b){return a+b;},0);}";
        let report = Grader::default().grade_submission(
            sum,
            "sum",
            &[TestCase::new(json!([2, 3]), json!(5))],
        );
        assert!(report.all_passed);
    }

    #[test]
    fn test_bubble_sort_single_array() {
        let source = r#"
            function bubbleSort(arr) {
                for (let i = 0; i < arr.length; i++) {
                    for (let j = 0; j < arr.length - i - 1; j++) {
                        if (arr[j] > arr[j + 1]) {
                            const t = arr[j]; arr[j] = arr[j + 1]; arr[j + 1] = t;
                        }
                    }
                }
                return arr;
            }
        "#;
        let report = Grader::default().grade_submission(
            source,
            "bubbleSort",
            &[TestCase::new(json!([5, 3, 8, 1, 9]), json!([1, 3, 5, 8, 9]))],
        );

        assert!(report.all_passed, "{:?}", report.results);
        assert_eq!(report.results[0].input, "[5,3,8,1,9]");
        assert_eq!(report.results[0].actual_output.as_deref(), Some("[1,3,5,8,9]"));
    }

    #[test]
    fn test_two_sum_spreads_leading_array() {
        let source = r#"
            function twoSum(arr, target) {
                const seen = {};
                for (let i = 0; i < arr.length; i++) {
                    const need = target - arr[i];
                    if (seen[need] !== undefined) return [seen[need], i];
                    seen[arr[i]] = i;
                }
                return [];
            }
        "#;
        let report = Grader::default().grade_submission(
            source,
            "twoSum",
            &[TestCase::new(json!([[2, 7, 11, 15], 9]), json!([0, 1]))],
        );

        assert!(report.all_passed, "{:?}", report.results);
    }

    #[test]
    fn test_single_element_input_unwrapped() {
        let source = r#"
            function isValid(s) {
                const stack = [];
                const pairs = { ')': '(', ']': '[', '}': '{' };
                for (const c of s) {
                    if (pairs[c]) {
                        if (stack.pop() !== pairs[c]) return false;
                    } else {
                        stack.push(c);
                    }
                }
                return stack.length === 0;
            }
        "#;
        let report = Grader::default().grade_submission(
            source,
            "isValid",
            &[
                TestCase::new(json!(["()"]), json!(true)),
                TestCase::new(json!(["(]"]), json!(false)),
            ],
        );

        assert!(report.all_passed, "{:?}", report.results);
    }

    #[test]
    fn test_hidden_case_redacted_but_actual_shown() {
        let report = Grader::default().grade_submission(
            "function square(n){return n*n;}",
            "square",
            &[TestCase::new(json!([4]), json!(16)).hidden()],
        );

        let result = &report.results[0];
        assert!(result.passed);
        assert_eq!(result.input, "[Hidden]");
        assert_eq!(result.expected_output, "[Hidden]");
        assert_eq!(result.actual_output.as_deref(), Some("16"));
    }

    #[test]
    fn test_throwing_function_fails_case() {
        let source = r#"function broken(){ throw new Error("boom"); }"#;
        let engine = ScriptEngine::default();
        let test_case = TestCase::new(Value::Null, Value::Null);

        let result = resolve_and_execute(&engine, source, "broken", &test_case, None);
        assert!(!result.success);
        assert_eq!(result.output, None);
        assert_eq!(result.error.as_ref().map(|e| e.message.as_str()), Some("boom"));

        let report = Grader::default().grade_submission(source, "broken", &[test_case]);
        assert!(!report.results[0].passed);
        assert_eq!(report.results[0].actual_output, None);
    }

    #[test]
    fn test_named_args_object_destructured() {
        let source = "function divide(dividend, divisor) { return dividend / divisor; }";
        let report = Grader::default().grade_submission(
            source,
            "divide",
            &[TestCase::new(json!({ "dividend": 12, "divisor": 4 }), json!(3))],
        );

        assert!(report.all_passed, "{:?}", report.results);
    }

    #[test]
    fn test_tree_node_passed_whole() {
        let source = r#"
            function maxDepth(root) {
                if (!root) return 0;
                return 1 + Math.max(maxDepth(root.left), maxDepth(root.right));
            }
        "#;
        let tree = json!({
            "val": 3,
            "left": { "val": 9, "left": null, "right": null },
            "right": { "val": 20, "left": { "val": 15, "left": null, "right": null }, "right": null }
        });
        let report = Grader::default().grade_submission(source, "maxDepth", &[TestCase::new(tree, json!(3))]);

        assert!(report.all_passed, "{:?}", report.results);
    }

    #[test]
    fn test_repeated_execution_is_deterministic() {
        let engine = ScriptEngine::default();
        let source = "function mix(a) { return a.map(function (x) { return x * 3 + 1; }); }";
        let input = json!([1, 2, 3]);

        let first = engine.execute(source, "mix", &input, true);
        for _ in 0..5 {
            let again = engine.execute(source, "mix", &input, true);
            assert_eq!(again.success, first.success);
            assert_eq!(again.output, first.output);
        }
    }

    #[test]
    fn test_mutating_function_leaves_input_untouched() {
        let source = "function clear(arr) { arr.length = 0; arr.push('gone'); return arr.length; }";
        let engine = ScriptEngine::default();
        let input = json!({ "items": [1, 2, 3], "label": "keep" });
        let snapshot = input.clone();

        let result = engine.execute(source, "clear", &json!([1, 2, 3]), true);
        assert_eq!(result.output, Some(json!(1)));

        let mutate = "function poke(obj) { obj.items.push(4); obj.label = 'changed'; return obj; }";
        let result = engine.execute(mutate, "poke", &input, true);
        assert_eq!(result.output, Some(json!({ "items": [1, 2, 3, 4], "label": "changed" })));
        assert_eq!(input, snapshot);

        // the same test case graded twice sees the same input both times
        let shared = TestCase::new(json!([[1, 2], 0]), json!(3));
        let spreader = "function pushLen(arr, x) { arr.push(x); return arr.length; }";
        let report = Grader::default().grade_submission(spreader, "pushLen", &[shared.clone(), shared]);
        assert!(report.all_passed, "{:?}", report.results);
    }

    #[test]
    fn test_grading_never_panics_on_bad_submissions() {
        let grader = Grader::default();
        let cases = vec![
            TestCase::new(json!(1), json!(1)),
            TestCase::new(json!([1, "a"]), json!(null)).hidden(),
        ];

        let submissions = [
            ("function broken( {", "broken"),
            ("function present() { return 1; }", "absent"),
            ("function thrower() { throw 42; }", "thrower"),
            ("function recurse(n) { return recurse(n) + 1; }", "recurse"),
            ("function cyclic() { var a = []; a.push(a); return a; }", "cyclic"),
            ("", "solution"),
        ];

        for (source, name) in submissions {
            let report = grader.grade_submission(source, name, &cases);
            assert_eq!(report.total_count, 2, "{}", source);
            assert_eq!(report.passed_count, 0, "{}", source);
            assert!(report.results.iter().all(|r| r.error.is_some()), "{}", source);
            assert_consistent(&report);
        }
    }

    #[test]
    fn test_report_consistency_with_mixed_outcomes() {
        let source = r#"
            function classify(n) {
                if (n < 0) throw new Error("negative");
                return n % 2 === 0 ? "even" : "odd";
            }
        "#;
        let cases = vec![
            TestCase::new(json!(2), json!("even")),
            TestCase::new(json!(3), json!("odd")),
            TestCase::new(json!(4), json!("odd")),
            TestCase::new(json!(-1), json!("odd")).hidden(),
            TestCase::new(json!(7), json!("odd")).hidden(),
        ];

        let report = Grader::default().grade_submission(source, "classify", &cases);

        assert_consistent(&report);
        assert_eq!(report.passed_count, 3);
        let verdicts: Vec<bool> = report.results.iter().map(|r| r.passed).collect();
        assert_eq!(verdicts, vec![true, true, false, false, true]);
        assert!(report.results[3].error.is_some());
        assert!(report
            .results
            .iter()
            .filter(|r| r.is_hidden)
            .all(|r| r.input == "[Hidden]" && r.expected_output == "[Hidden]"));
    }

    #[test]
    fn test_logs_travel_with_each_case() {
        let source = "function echo(x) { console.log('got', x); return x; }";
        let report = Grader::default().grade_submission(
            source,
            "echo",
            &[TestCase::new(json!("a"), json!("a")), TestCase::new(json!("b"), json!("b"))],
        );

        assert_eq!(report.results[0].logs, vec!["got a".to_string()]);
        assert_eq!(report.results[1].logs, vec!["got b".to_string()]);
    }

    #[test]
    fn test_frequency_map_with_integer_keys_passes() {
        let source = r#"
            function freq(arr) {
                const counts = {};
                for (const x of arr) counts[x] = (counts[x] || 0) + 1;
                return counts;
            }
        "#;
        let expected: Value = serde_json::from_str(r#"{"3":2,"1":1}"#).unwrap();
        let report = Grader::default().grade_submission(
            source,
            "freq",
            &[TestCase::new(json!([3, 1, 3]), expected)],
        );

        assert!(report.all_passed, "{:?}", report.results);
        assert_eq!(report.results[0].expected_output, r#"{"1":1,"3":2}"#);
        assert_eq!(report.results[0].actual_output.as_deref(), Some(r#"{"1":1,"3":2}"#));
    }

    #[test]
    fn test_named_args_integer_keys_bind_first() {
        let source = "function pair(x, y) { return x + '|' + y; }";
        let input: Value = serde_json::from_str(r#"{"b":"B","1":"one"}"#).unwrap();
        let report = Grader::default().grade_submission(
            source,
            "pair",
            &[TestCase::new(input, json!("one|B"))],
        );

        assert!(report.all_passed, "{:?}", report.results);
    }

    #[test]
    fn test_syntax_error_reports_source_line() {
        let source = "function f(a) {\n  var x = 1;\n  return a +;\n}";
        let report = Grader::default().grade_submission(
            source,
            "f",
            &[TestCase::new(json!(1), json!(1))],
        );

        let error = report.results[0].error.as_ref().unwrap();
        assert_eq!(error.line_number, Some(3));

        let thrown = Grader::default().grade_submission(
            "function g() {\n  throw new Error('late');\n}",
            "g",
            &[TestCase::new(Value::Null, Value::Null)],
        );
        assert_eq!(thrown.results[0].error.as_ref().unwrap().line_number, None);
    }

    #[test]
    fn test_logs_survive_loop_limit() {
        let config = EngineConfig {
            limits: ExecutionLimits {
                loop_iteration_limit: Some(10_000),
                ..Default::default()
            },
            ..Default::default()
        };
        let source = "function spin() { console.log('start'); console.warn('looping'); while (true) {} }";
        let report = Grader::new(&config).grade_submission(
            source,
            "spin",
            &[TestCase::new(Value::Null, Value::Null)],
        );

        let result = &report.results[0];
        assert!(!result.passed);
        assert!(result.error.is_some());
        assert_eq!(result.logs, vec!["start".to_string(), "WARN: looping".to_string()]);
        assert_consistent(&report);
    }

    #[test]
    fn test_recursion_depth_5000_passes() {
        let source = "function sum(n) { return n === 0 ? 0 : n + sum(n - 1); }";
        let report = Grader::default().grade_submission(
            source,
            "sum",
            &[
                TestCase::new(json!(5000), json!(12502500)),
                TestCase::new(json!(10), json!(55)).hidden(),
            ],
        );

        assert!(report.all_passed, "{:?}", report.results);
    }
}
