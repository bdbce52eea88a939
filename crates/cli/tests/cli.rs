//! Binary-level tests for paths that never open a browser.

use std::path::{Path, PathBuf};
use std::process::Command;

use serde_json::{Value, json};
use tempfile::TempDir;

fn nbd_binary() -> PathBuf {
	let mut path = std::env::current_exe().unwrap();
	path.pop();
	path.pop();
	path.push("nbd");
	path
}

/// Runs `nbd` against an isolated config and profile.
fn run(home: &Path, args: &[&str]) -> (bool, Value, String) {
	let output = Command::new(nbd_binary())
		.arg("--config")
		.arg(home.join("config.json"))
		.arg("--profile-dir")
		.arg(home.join("profile"))
		.args(args)
		.env_remove("NBD_PROFILE_DIR")
		.env_remove("NBD_BASE_URL")
		.env_remove("NBD_HEADLESS")
		.env_remove("NBD_CHROME")
		.env_remove("RUST_LOG")
		.output()
		.expect("failed to execute nbd");

	let stdout = String::from_utf8_lossy(&output.stdout).to_string();
	let stderr = String::from_utf8_lossy(&output.stderr).to_string();
	let parsed = serde_json::from_str::<Value>(&stdout).unwrap_or_else(|_| json!({ "raw": stdout }));
	(output.status.success(), parsed, stderr)
}

#[test]
fn foreign_repository_url_is_rejected_before_launch() {
	let home = TempDir::new().unwrap();
	let (success, json, stderr) = run(home.path(), &["ask", "-r", "https://example.com/notebook/abc", "what is this?"]);

	assert!(!success);
	assert_eq!(json["ok"], false);
	assert_eq!(json["op"], "ask");
	assert_eq!(json["error"]["code"], "INVALID_INPUT");
	assert!(stderr.contains("Error [INVALID_INPUT]"), "stderr: {stderr}");
	assert!(!home.path().join("profile").exists());
}

#[test]
fn search_links_only_is_a_no_op() {
	let home = TempDir::new().unwrap();
	let (success, json, stderr) = run(
		home.path(),
		&[
			"add-urls",
			"-r",
			"abc123",
			"https://www.google.com/search?q=rust",
			"https://vertexaisearch.cloud.google.com/grounding-api-redirect/xyz",
		],
	);

	assert!(success, "add-urls failed: {stderr}");
	assert_eq!(json["ok"], true);
	assert_eq!(json["data"]["added"], false);
	assert_eq!(json["data"]["kind"], "url-list");
	assert_eq!(json["data"]["urls"], json!([]));
}

#[test]
fn config_show_reflects_flags() {
	let home = TempDir::new().unwrap();
	let (success, json, stderr) = run(home.path(), &["config", "show", "--headed"]);

	assert!(success, "config show failed: {stderr}");
	assert_eq!(json["op"], "config.show");
	assert_eq!(json["data"]["exists"], false);
	assert_eq!(
		json["data"]["config"]["profileDir"],
		home.path().join("profile").to_string_lossy().as_ref()
	);
	assert_eq!(json["data"]["config"]["headless"], false);
}

#[test]
fn unreadable_summary_names_the_file() {
	let home = TempDir::new().unwrap();
	let missing = home.path().join("summary.json");
	let (success, json, _) = run(
		home.path(),
		&["add-summary", "-r", "abc123", "--file", missing.to_str().unwrap()],
	);

	assert!(!success);
	assert_eq!(json["error"]["code"], "INVALID_INPUT");
	assert!(json["error"]["message"].as_str().unwrap().contains("summary.json"));
}

#[test]
fn text_mode_prints_plain_values_and_no_envelope() {
	let home = TempDir::new().unwrap();
	let (success, json, _) = run(home.path(), &["-f", "text", "config", "path"]);
	assert!(success);
	assert_eq!(json["raw"].as_str().unwrap().trim(), home.path().join("config.json").to_string_lossy());

	let (success, json, stderr) = run(home.path(), &["-f", "text", "ask", "-r", "https://example.com/x", "hi"]);
	assert!(!success);
	assert_eq!(json["raw"], "");
	assert!(stderr.contains("Error [INVALID_INPUT]"), "stderr: {stderr}");
}
