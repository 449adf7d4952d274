//! Integration tests for the `example run` command.
use chiptrade::cli::RunOpts;
use chiptrade::cli::example::handle_example_run_command;
use chiptrade::settings::Settings;
use tempfile::tempdir;

/// An integration test for the `example run` command.
///
/// The `home_bias` example defines a sensitivity factor, so a sensitivity file should be written
/// along with the per-scenario results.
#[test]
fn test_handle_example_run_command() {
    unsafe { std::env::set_var("CHIPTRADE_LOG_LEVEL", "off") };

    let tempdir = tempdir().unwrap();
    let output_dir = tempdir.path().join("results");
    let opts = RunOpts {
        output_dir: Some(output_dir.clone()),
        debug_model: true,
        scenarios: vec!["baseline".into(), "tariff_plus_subsidy".into()],
        ..Default::default()
    };
    handle_example_run_command("home_bias", &opts, Some(Settings::default())).unwrap();

    for file_name in [
        "baseline.csv",
        "tariff_plus_subsidy.csv",
        "summary.csv",
        "sensitivity.csv",
        "debug_solver.csv",
        "metadata.toml",
    ] {
        assert!(output_dir.join(file_name).is_file(), "Missing {file_name}");
    }
    assert!(!output_dir.join("tariff_only.csv").exists());
}
