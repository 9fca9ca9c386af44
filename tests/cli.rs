use assert_cmd::Command;
use tempfile::tempdir;

fn gridemic() -> Command {
    Command::cargo_bin("gridemic").unwrap()
}

fn stdout_of(command: &mut Command) -> String {
    let output = command.output().unwrap();
    assert!(output.status.success(), "{output:?}");
    String::from_utf8(output.stdout).unwrap()
}

#[test]
fn default_run_prints_final_metrics() {
    let stdout = stdout_of(gridemic().args(["--random-seed", "3", "--max-ticks", "10"]));
    assert!(stdout.starts_with("tick 10\n"));
    for metric in [
        "total_susceptible",
        "total_dead",
        "infected_pregnant",
        "vaccinated_elder",
    ] {
        assert!(stdout.contains(&format!("{metric}: ")), "missing {metric}");
    }
}

#[test]
fn same_seed_same_output() {
    let args = ["--config", "tests/data/small_store.json", "-r", "11", "-t", "25"];
    assert_eq!(stdout_of(gridemic().args(args)), stdout_of(gridemic().args(args)));
}

#[test]
fn config_and_output_dir() {
    let temp_dir = tempdir().unwrap();
    let stdout = stdout_of(gridemic().args([
        "--config",
        "tests/data/small_store.json",
        "--output-dir",
        temp_dir.path().to_str().unwrap(),
        "--max-ticks",
        "8",
    ]));
    assert!(stdout.contains("susceptible_child: "));
    assert!(!stdout.contains("pregnant"));

    let mut reader = csv::Reader::from_path(temp_dir.path().join("metrics.csv")).unwrap();
    let rows: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    // 4 totals, 8 strata counts, 3 vaccinated counts per tick.
    assert_eq!(rows.len() % 15, 0);
    assert_eq!(&rows[0][1], "total_susceptible");
    let vaccinated_adult = rows
        .iter()
        .find(|row| &row[1] == "vaccinated_adult")
        .unwrap();
    assert_eq!(&vaccinated_adult[2], "5");
}

#[test]
fn log_level_enables_logging() {
    let stdout = stdout_of(gridemic().args(["--log-level", "info", "--max-ticks", "2"]));
    assert!(stdout.contains("seeded 240 agents and 104 obstacles"));
}

#[test]
fn log_module_enables_one_module() {
    let stdout = stdout_of(gridemic().args([
        "--log-module",
        "simulation=info",
        "--max-ticks",
        "2",
    ]));
    assert!(stdout.contains("gridemic::simulation - simulation initialized with seed 0"));
    assert!(!stdout.contains("seeded 240 agents"));
}

#[test]
fn malformed_log_module_is_rejected() {
    let output = gridemic()
        .args(["--log-module", "health=loud"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("health=loud"), "{stderr}");
}

#[test]
fn invalid_config_fails() {
    let output = gridemic()
        .args(["--config", "tests/data/invalid_store.json"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Configuration error"), "{stderr}");
}
