use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn write_config(dir: &Path, file_name: &str, extra: &str) -> PathBuf {
    let content_dir = dir.join("wp-content");
    fs::create_dir_all(&content_dir).expect("create content dir");

    let config_path = dir.join(file_name);
    fs::write(
        &config_path,
        format!(
            r#"
name = "tenancy-cli-test"
env = "dev"
install_secret = "0123456789abcdef0123456789abcdef"

[host]
content_dir = "{content}"
content_url = "https://main.example.com/wp-content"
{extra}

[observability]
filter_level = "warn"

[observability.log]
output = "console"
"#,
            content = content_dir.display(),
        ),
    )
    .expect("write config");

    config_path
}

fn run_tenancy(args: &[&str], current_dir: Option<&Path>) -> Output {
    let mut cmd = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_tenancy")));
    cmd.args(args);
    if let Some(dir) = current_dir {
        cmd.current_dir(dir);
    }
    cmd.env_remove("RUST_LOG");
    cmd.output().expect("run tenancy command")
}

fn run_json(config: &Path, args: &[&str]) -> serde_json::Value {
    let mut full = vec!["--config", config.to_str().expect("utf8 path")];
    full.extend_from_slice(args);
    let output = run_tenancy(&full, None);
    assert!(
        output.status.success(),
        "command {args:?} should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("json output")
}

#[test]
fn tenancy_test_command_accepts_explicit_valid_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_config(temp.path(), "valid.toml", "");
    let output = run_tenancy(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn tenancy_test_command_finds_default_config_in_current_directory() {
    let temp = tempfile::tempdir().expect("temp dir");
    write_config(temp.path(), "tenancy.toml", "");
    let output = run_tenancy(&["test"], Some(temp.path()));

    assert!(
        output.status.success(),
        "command should succeed, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn tenancy_test_command_rejects_invalid_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config_path = write_config(temp.path(), "bad.toml", "default_table_prefix = \"wp-\"");
    let output = run_tenancy(&["test", config_path.to_str().expect("utf8 path")], None);

    assert!(!output.status.success());
}

#[test]
fn tenancy_fails_for_missing_explicit_config() {
    let temp = tempfile::tempdir().expect("temp dir");
    let missing = temp.path().join("missing.toml");
    let output = run_tenancy(
        &["--config", missing.to_str().expect("utf8 path"), "status"],
        None,
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("not found"));
}

#[test]
fn tenancy_install_and_status() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config = write_config(temp.path(), "tenancy.toml", "");

    let before = run_json(&config, &["status"]);
    let kinds: Vec<_> = before["notices"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["kind"]["kind"].as_str().unwrap().to_string())
        .collect();
    assert!(kinds.contains(&"base_dir_missing".to_string()));
    assert!(kinds.contains(&"mapping_file_missing".to_string()));

    let report = run_json(&config, &["install"]);
    assert_eq!(report["created_base"], true);

    let after = run_json(&config, &["status"]);
    assert_eq!(after["tenant_count"], 0);
    assert_eq!(after["token_state"], "absent");
    assert_eq!(after["paths"]["structure_kind"], "current");
    assert_eq!(after["notices"].as_array().unwrap().len(), 0);
}

#[test]
fn tenancy_tenant_lifecycle() {
    let temp = tempfile::tempdir().expect("temp dir");
    let config = write_config(temp.path(), "tenancy.toml", "");
    run_json(&config, &["install"]);

    let created = run_json(&config, &["tenant", "create", "Shop.Example.com", "www.shop.example.com"]);
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 6);
    assert_eq!(
        created["domains"],
        serde_json::json!(["shop.example.com", "www.shop.example.com"])
    );

    // 重复域名被拒绝
    let config_str = config.to_str().unwrap();
    let duplicate = run_tenancy(
        &["--config", config_str, "tenant", "create", "shop.example.com"],
        None,
    );
    assert!(!duplicate.status.success());
    assert!(String::from_utf8_lossy(&duplicate.stderr).contains("shop.example.com"));

    let resolved = run_json(&config, &["resolve", "--host", "shop.example.com"]);
    assert_eq!(resolved["is_tenant"], true);
    assert_eq!(resolved["tenant_id"], id.as_str());
    assert_eq!(resolved["table_prefix"], format!("{id}_"));
    assert_eq!(resolved["original_prefix"], "wp_");
    assert_eq!(resolved["write_protection"]["disallow_file_mods"], true);

    let preset = run_json(&config, &["resolve", "--tenant", &id]);
    assert_eq!(preset["binding"]["source"], "preset");
    assert_eq!(preset["binding"]["domain"], "shop.example.com");
    assert_eq!(preset["write_protection"]["disallow_file_mods"], false);

    let url = Command::new(PathBuf::from(env!("CARGO_BIN_EXE_tenancy")))
        .args(["--config", config_str, "admin-url", &id])
        .output()
        .expect("run admin-url");
    assert!(url.status.success());
    let url = String::from_utf8_lossy(&url.stdout).trim().to_string();
    assert!(url.starts_with("https://shop.example.com/wp-admin/?token="));
    assert!(url.contains("&hash="));

    let updated = run_json(&config, &["tenant", "update", &id, "blog.example.com"]);
    assert_eq!(updated["domains"], serde_json::json!(["blog.example.com"]));

    let listed = run_json(&config, &["tenant", "list"]);
    assert_eq!(listed.as_array().unwrap().len(), 1);
    assert_eq!(listed[0]["primary_domain"], "blog.example.com");

    run_json(&config, &["tenant", "delete", &id]);
    let shared = run_json(&config, &["resolve", "--host", "blog.example.com"]);
    assert_eq!(shared["is_tenant"], false);
    assert_eq!(shared["tenant_id"], "");
    assert_eq!(shared["table_prefix"], "wp_");

    let missing = run_tenancy(&["--config", config_str, "tenant", "show", &id], None);
    assert!(!missing.status.success());
}
