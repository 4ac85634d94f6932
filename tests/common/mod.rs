use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Config YAML pointing at `base_url` with an in-memory credential store.
#[allow(dead_code)]
pub fn memory_config_yaml(base_url: &str) -> String {
    format!(
        "environment: test\napi:\n  base_url: \"{}\"\n  request_timeout_seconds: 5\nauth:\n  refresh_timeout_seconds: 2\ncredentials:\n  backend: memory\n",
        base_url
    )
}
