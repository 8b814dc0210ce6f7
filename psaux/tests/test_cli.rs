use std::path::{Path, PathBuf};
use std::process::Command;

fn psaux() -> Command {
    Command::new(env!("CARGO_BIN_EXE_psaux"))
}

fn write_capture(dir: &Path) -> PathBuf {
    let mut image = vec![0u8; 0x1000];
    image[0x200..0x213].copy_from_slice(b"/bin/zsh\0\0\0\0zsh\0-l\0");
    std::fs::write(dir.join("memory.raw"), &image).unwrap();

    let manifest = serde_json::json!({
        "image": "memory.raw",
        "layer": { "name": "primary", "architecture": "Intel64" },
        "symbol_tables": ["darwin"],
        "tasks": [
            { "pid": 412, "comm": "zsh", "user_stack": 0x1_0000_0213_u64, "argslen": 0x13, "argc": 2,
              "regions": [ { "address": 0x1_0000_0000_u64, "length": 0x1000, "offset": 0 } ] }
        ]
    });
    let path = dir.join("capture.json");
    std::fs::write(&path, serde_json::to_vec(&manifest).unwrap()).unwrap();
    path
}

#[test]
fn test_cli_prints_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let capture = write_capture(dir.path());

    let output = psaux().arg("--capture").arg(&capture).arg("--quiet").output().unwrap();

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(stdout, "PID\tProcess\tArgc\tArguments\n\n412\tzsh\t2\t/bin/zsh zsh -l\n");
}

#[test]
fn test_cli_config_file_selects_json() {
    let dir = tempfile::tempdir().unwrap();
    let capture = write_capture(dir.path());
    let config = dir.path().join("psaux.json");
    std::fs::write(&config, r#"{ "output": { "renderer": "json" } }"#).unwrap();

    let output = psaux()
        .arg("--capture")
        .arg(&capture)
        .arg("--config")
        .arg(&config)
        .arg("--quiet")
        .output()
        .unwrap();

    assert!(output.status.success());
    let row: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(row["Arguments"], "/bin/zsh zsh -l");
}

#[test]
fn test_cli_list_plugins() {
    let output = psaux().arg("--list").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("mac.psaux"));
    assert!(stdout.contains("mac.pslist"));
}

#[test]
fn test_cli_unknown_plugin_is_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let capture = write_capture(dir.path());

    let output = psaux().arg("windows.pslist").arg("--capture").arg(&capture).output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Unknown plugin"));
}

#[test]
fn test_cli_missing_capture_fails() {
    let output = psaux().arg("--capture").arg("/nonexistent/capture.json").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to load capture"));
}

#[test]
fn test_cli_without_capture_is_usage_error() {
    let output = psaux().arg("mac.psaux").output().unwrap();

    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--capture"));
}
