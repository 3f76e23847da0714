use crate::common::VicHome;
use predicates::prelude::*;

#[test]
fn test_help_lists_commands() {
    let home = VicHome::new();
    home.command()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("which"));
}

#[test]
fn test_unknown_exec_command() {
    let home = VicHome::new();
    home.command()
        .args(["exec", "deploy"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown command 'deploy'"));
}

#[test]
fn test_invalid_config_file_is_reported() {
    let home = VicHome::new();
    home.write_config("check_updates = \"sometimes\"\n");
    home.command()
        .args(["exec", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_exec_local_target_prints_entry() {
    let home = VicHome::new();
    let project = home.home_dir().join("work").join("my-init");
    std::fs::create_dir_all(project.join("bin")).unwrap();
    std::fs::write(
        project.join("package.json"),
        r#"{"name": "@vic-cli-test/init", "version": "0.0.1", "main": "bin/index.js"}"#,
    )
    .unwrap();

    let expected = vic_cli::utils::normalize_path_for_storage(project.join("bin").join("index.js"));
    home.command()
        .args(["--target-path"])
        .arg(&project)
        .args(["exec", "init", "my-app"])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected));

    // the store is never touched in local mode
    assert!(!home.store_dir().exists());
}

#[test]
fn test_exec_local_target_from_env() {
    let home = VicHome::new();
    let project = home.home_dir().join("my-init");
    std::fs::create_dir_all(&project).unwrap();
    std::fs::write(project.join("package.json"), r#"{"name": "my-init"}"#).unwrap();

    // no `main`: nothing to run, but not an error
    home.command()
        .env("CLI_TARGET_PATH", &project)
        .args(["exec", "init"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn test_bad_registry_flag() {
    let home = VicHome::new();
    home.command()
        .args(["--registry", "ftp://registry.example", "update", "left-pad"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("http or https"));
}

#[cfg(unix)]
mod scripted_installer {
    use crate::common::{VicHome, mount_package, package_document};
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::process::Output;
    use wiremock::MockServer;

    const NAME: &str = "@vic-cli-test/init";

    /// An npminstall stand-in that writes the entry it was asked for and logs each call.
    const INSTALLER: &str = r#"#!/bin/sh
for arg in "$@"; do
  case "$arg" in
    --storeDir=*) store="${arg#--storeDir=}" ;;
    --*) ;;
    *) spec="$arg" ;;
  esac
done
name="${spec%@*}"
version="${spec##*@}"
prefix=$(printf '%s' "$name" | tr '/' '_')
dir="$store/_${prefix}@${version}@${name}"
mkdir -p "$dir"
printf '{"name":"%s","version":"%s","main":"index.js"}' "$name" "$version" > "$dir/package.json"
echo 'module.exports = () => {}' > "$dir/index.js"
echo "$spec" >> "$store/../install.log"
"#;

    fn write_installer(dir: &Path) -> PathBuf {
        let script = dir.join("fake-npminstall");
        std::fs::write(&script, INSTALLER).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn setup(server: &MockServer) -> VicHome {
        let home = VicHome::new();
        let installer = write_installer(home.home_dir());
        home.write_config(&format!(
            "check_updates = false\nregistry = \"{}\"\ninstaller = \"{}\"\n",
            server.uri(),
            installer.display()
        ));
        home
    }

    async fn run(home: &VicHome, args: &[&str]) -> Output {
        let mut cmd = home.command();
        cmd.args(args);
        tokio::task::spawn_blocking(move || cmd.output().unwrap()).await.unwrap()
    }

    fn installs(home: &VicHome) -> Vec<String> {
        std::fs::read_to_string(home.cli_home().join("dependencies").join("install.log"))
            .unwrap_or_default()
            .lines()
            .map(ToString::to_string)
            .collect()
    }

    fn entry(home: &VicHome, version: &str) -> String {
        let path = home
            .store_dir()
            .join(format!("_@vic-cli-test_init@{version}@@vic-cli-test"))
            .join("init")
            .join("index.js");
        vic_cli::utils::normalize_path_for_storage(path)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_exec_installs_then_reuses_then_updates() {
        let server = MockServer::start().await;
        mount_package(&server, NAME, package_document(NAME, Some("1.0.2"), &["1.0.2"])).await;
        let home = setup(&server);

        let output = run(&home, &["exec", "init"]).await;
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), entry(&home, "1.0.2"));
        assert_eq!(installs(&home), vec!["@vic-cli-test/init@1.0.2".to_string()]);

        let output = run(&home, &["exec", "init"]).await;
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), entry(&home, "1.0.2"));
        assert_eq!(installs(&home).len(), 1);

        server.reset().await;
        mount_package(&server, NAME, package_document(NAME, Some("1.1.0"), &["1.0.2", "1.1.0"]))
            .await;

        let output = run(&home, &["exec", "init"]).await;
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), entry(&home, "1.1.0"));
        assert_eq!(installs(&home).len(), 2);
        assert!(Path::new(&entry(&home, "1.0.2")).exists());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_install_and_which_specific_version() {
        let server = MockServer::start().await;
        mount_package(&server, NAME, package_document(NAME, Some("1.1.0"), &["1.0.2", "1.1.0"]))
            .await;
        let home = setup(&server);

        let output = run(&home, &["which", NAME, "--version", "1.0.2"]).await;
        assert!(!output.status.success());
        assert!(String::from_utf8_lossy(&output.stderr).contains("is not installed"));

        let output = run(&home, &["install", NAME, "--version", "~1.0"]).await;
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
        assert_eq!(installs(&home), vec!["@vic-cli-test/init@1.0.2".to_string()]);

        let output = run(&home, &["which", NAME, "--version", "1.0.2"]).await;
        assert!(output.status.success());
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), entry(&home, "1.0.2"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_missing_package_fails_with_suggestion() {
        let server = MockServer::start().await;
        let home = setup(&server);

        let output = run(&home, &["exec", "init"]).await;
        assert!(!output.status.success());
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Package not found in registry: @vic-cli-test/init"));
        assert!(installs(&home).is_empty());
    }
}
