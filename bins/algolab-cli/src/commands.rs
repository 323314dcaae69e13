// CLI commands for running and grading exercises
use algolab_common::config::{EngineConfig, DEFAULT_CONFIG_PATH};
use algolab_common::types::{Exercise, ExecutionResult, TestReport};
use algolab_engine::Grader;
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Read one exercise file: a JSON object or an array of them.
fn read_exercise_file(path: &Path) -> Result<Vec<Exercise>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let exercises = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Exercise>, _>>(),
        other => serde_json::from_value(other).map(|exercise| vec![exercise]),
    };

    exercises.with_context(|| format!("Invalid exercise in {}", path.display()))
}

/// Load exercises from a file, or from every `*.json` file in a directory.
pub fn load_exercises(path: &Path) -> Result<Vec<(PathBuf, Exercise)>> {
    if !path.exists() {
        bail!("Path not found: {}", path.display());
    }

    let files = if path.is_dir() {
        let mut files: Vec<PathBuf> = fs::read_dir(path)
            .with_context(|| format!("Failed to list {}", path.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .collect();
        files.sort();
        files
    } else {
        vec![path.to_path_buf()]
    };

    let mut exercises = Vec::new();
    for file in files {
        debug!(file = %file.display(), "Loading exercises");
        for exercise in read_exercise_file(&file)? {
            exercises.push((file.clone(), exercise));
        }
    }

    Ok(exercises)
}

fn print_report(report: &TestReport) {
    for (idx, result) in report.results.iter().enumerate() {
        let label = if result.is_hidden {
            format!("Case {} (hidden)", idx + 1)
        } else {
            format!("Case {}", idx + 1)
        };

        if result.passed {
            println!("  ✅ {} passed ({:.2} ms)", label, result.execution_time);
            continue;
        }

        match &result.error {
            Some(error) => println!("  ❌ {} errored: {}", label, error.message),
            None => println!(
                "  ❌ {} failed: input {} expected {} got {}",
                label,
                result.input,
                result.expected_output,
                result.actual_output.as_deref().unwrap_or("undefined")
            ),
        }

        for line in &result.logs {
            println!("       │ {}", line);
        }
    }

    println!();
    println!(
        "📊 {}/{} test cases passed",
        report.passed_count, report.total_count
    );
}

/// Grade a submission against an exercise. Returns whether every case passed.
pub fn grade(
    config: &EngineConfig,
    exercise_path: &Path,
    source_path: Option<&Path>,
    function_name: Option<&str>,
    json: bool,
) -> Result<bool> {
    let exercises = read_exercise_file(exercise_path)?;
    let exercise = match exercises.as_slice() {
        [only] => only,
        [] => bail!("No exercise in {}", exercise_path.display()),
        _ => bail!(
            "{} holds {} exercises; grade expects exactly one",
            exercise_path.display(),
            exercises.len()
        ),
    };

    let source = match source_path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => exercise.starter_code.clone(),
    };
    if source.trim().is_empty() {
        bail!("Submission source is empty");
    }

    let grader = Grader::new(config);
    let report = grader.grade_exercise(exercise, &source, function_name);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    } else {
        println!("🧪 Grading: {}", display_name(exercise));
        println!();
        print_report(&report);
    }

    Ok(report.all_passed)
}

/// Run one function call and print the execution result.
pub fn run(
    config: &EngineConfig,
    source_path: &Path,
    function_name: Option<&str>,
    input: &str,
    spread: bool,
) -> Result<bool> {
    let source = fs::read_to_string(source_path)
        .with_context(|| format!("Failed to read {}", source_path.display()))?;
    let input: Value = serde_json::from_str(input).context("--input is not valid JSON")?;

    let grader = Grader::new(config);
    let name = grader.resolve_function_name(&source, function_name);

    let result: ExecutionResult = if spread {
        let Value::Array(args) = &input else {
            bail!("--spread requires a JSON array input");
        };
        grader.engine().execute_with_args(&source, &name, args)
    } else {
        grader.engine().execute(&source, &name, &input, false)
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize execution result")?
    );

    Ok(result.success)
}

fn display_name(exercise: &Exercise) -> &str {
    if !exercise.title.is_empty() {
        &exercise.title
    } else if !exercise.id.is_empty() {
        &exercise.id
    } else {
        "(untitled)"
    }
}

/// Grade every exercise's reference solution. Returns whether all passed.
pub async fn verify(config: &EngineConfig, path: &Path) -> Result<bool> {
    println!("🔍 Verifying reference solutions in {}", path.display());

    let exercises = load_exercises(path)?;
    let timeout = Duration::from_millis(config.request_timeout_ms);
    let grader = Grader::new(config);

    let mut verified = 0;
    let mut failed = 0;
    let mut skipped = 0;

    for (file, exercise) in exercises {
        let name = display_name(&exercise).to_string();

        let Some(solution) = exercise.solution.clone() else {
            println!("  ⏭️  {} - no reference solution", name);
            skipped += 1;
            continue;
        };

        // on timeout the task is abandoned; interpreter limits end it
        let worker = grader.clone();
        let task = tokio::task::spawn_blocking(move || worker.grade_exercise(&exercise, &solution, None));

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(report)) if report.all_passed => {
                println!(
                    "  ✅ {} ({}/{})",
                    name, report.passed_count, report.total_count
                );
                verified += 1;
            }
            Ok(Ok(report)) => {
                println!(
                    "  ❌ {} ({}/{}) in {}",
                    name,
                    report.passed_count,
                    report.total_count,
                    file.display()
                );
                print_report(&report);
                failed += 1;
            }
            Ok(Err(e)) => {
                warn!(exercise = %name, error = %e, "Grading task failed");
                println!("  ❌ {} - grading task failed: {}", name, e);
                failed += 1;
            }
            Err(_) => {
                println!("  ⏱️  {} - timed out after {} ms", name, config.request_timeout_ms);
                failed += 1;
            }
        }
    }

    println!();
    println!(
        "📊 {} verified, {} failed, {} skipped",
        verified, failed, skipped
    );

    Ok(failed == 0)
}

/// Write a default `config/engine.json` under `path`.
pub fn init_project(path: &Path) -> Result<()> {
    let config_path = path.join(DEFAULT_CONFIG_PATH);
    println!("🚀 Initializing AlgoLab project at {}", path.display());

    if config_path.exists() {
        bail!("{} already exists", config_path.display());
    }

    EngineConfig::default().save(&config_path)?;

    println!("✅ Wrote {}", config_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("algolab-cli-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn write_json(path: &Path, value: &Value) {
        fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    }

    fn square_exercise(solution: &str) -> Value {
        json!({
            "id": "square",
            "title": "Square",
            "starterCode": "function square(n) { return 0; }",
            "solution": solution,
            "testCases": [
                { "input": [2], "expectedOutput": 4 },
                { "input": [5], "expectedOutput": 25, "isHidden": true }
            ]
        })
    }

    #[test]
    fn test_load_exercises_from_directory() {
        let dir = temp_dir("load");
        write_json(&dir.join("b.json"), &square_exercise("function square(n) { return n * n; }"));
        write_json(
            &dir.join("a.json"),
            &json!([{ "id": "one" }, { "id": "two" }]),
        );
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let exercises = load_exercises(&dir).unwrap();
        let ids: Vec<&str> = exercises.iter().map(|(_, e)| e.id.as_str()).collect();
        assert_eq!(ids, vec!["one", "two", "square"]);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_exercises_missing_path() {
        assert!(load_exercises(Path::new("no/such/exercises")).is_err());
    }

    #[test]
    fn test_grade_uses_source_file_over_starter_code() {
        let dir = temp_dir("grade");
        let exercise_path = dir.join("square.json");
        write_json(&exercise_path, &square_exercise("function square(n) { return n * n; }"));

        let config = EngineConfig::default();
        assert!(!grade(&config, &exercise_path, None, None, true).unwrap());

        let source_path = dir.join("submission.js");
        fs::write(&source_path, "function square(n) { return n * n; }").unwrap();
        assert!(grade(&config, &exercise_path, Some(&source_path), None, false).unwrap());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_run_spread_requires_array() {
        let dir = temp_dir("run");
        let source_path = dir.join("add.js");
        fs::write(&source_path, "function add(a, b) { return a + b; }").unwrap();

        let config = EngineConfig::default();
        assert!(run(&config, &source_path, None, "[2, 3]", true).unwrap());
        assert!(run(&config, &source_path, Some("add"), "7", true).is_err());
        assert!(run(&config, &source_path, Some("missing"), "1", false).map(|ok| !ok).unwrap());

        let _ = fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_verify_reports_broken_solution() {
        let dir = temp_dir("verify");
        write_json(&dir.join("good.json"), &square_exercise("function square(n) { return n * n; }"));
        write_json(&dir.join("nosolution.json"), &json!({ "id": "draft", "testCases": [] }));

        let config = EngineConfig::default();
        assert!(verify(&config, &dir).await.unwrap());

        write_json(&dir.join("bad.json"), &square_exercise("function square(n) { return n + n; }"));
        assert!(!verify(&config, &dir).await.unwrap());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_init_writes_config_once() {
        let dir = temp_dir("init");

        init_project(&dir).unwrap();
        let loaded = EngineConfig::load(&dir.join(DEFAULT_CONFIG_PATH)).unwrap();
        assert_eq!(loaded, EngineConfig::default());

        assert!(init_project(&dir).is_err());

        let _ = fs::remove_dir_all(&dir);
    }
}
