//! Shared helpers for the integration tests.

use assert_cmd::Command;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A package document as npm serves it for the abbreviated metadata format.
pub fn package_document(name: &str, latest: Option<&str>, versions: &[&str]) -> Value {
    let versions: serde_json::Map<String, Value> = versions
        .iter()
        .map(|v| ((*v).to_string(), json!({"name": name, "version": v})))
        .collect();
    let mut document = json!({ "name": name, "versions": versions });
    if let Some(latest) = latest {
        document["dist-tags"] = json!({ "latest": latest });
    }
    document
}

/// Registry path for `name`, scoped names percent-encoded.
pub fn document_path(name: &str) -> String {
    format!("/{}", name.replace('/', "%2f"))
}

/// Serve `document` for `name` on `server`.
pub async fn mount_package(server: &MockServer, name: &str, document: Value) {
    Mock::given(method("GET"))
        .and(path(document_path(name)))
        .respond_with(ResponseTemplate::new(200).set_body_json(document))
        .mount(server)
        .await;
}

/// Isolated home directory for one `vic` invocation.
pub struct VicHome {
    pub temp: TempDir,
}

impl VicHome {
    /// A fresh home with a config that disables the startup update check.
    pub fn new() -> Self {
        let home = Self {
            temp: TempDir::new().unwrap(),
        };
        home.write_config("check_updates = false\n");
        home
    }

    pub fn home_dir(&self) -> &Path {
        self.temp.path()
    }

    pub fn cli_home(&self) -> PathBuf {
        self.temp.path().join(".vic-cli")
    }

    pub fn store_dir(&self) -> PathBuf {
        self.cli_home().join("dependencies").join("node_modules")
    }

    pub fn write_config(&self, content: &str) {
        std::fs::create_dir_all(self.cli_home()).unwrap();
        std::fs::write(self.cli_home().join("config.toml"), content).unwrap();
    }

    /// `vic` with a clean environment pointing at this home.
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("vic").unwrap();
        cmd.env("HOME", self.home_dir())
            .env("USERPROFILE", self.home_dir())
            .env_remove("CLI_HOME")
            .env_remove("CLI_TARGET_PATH")
            .env_remove("VIC_REGISTRY")
            .env_remove("LOG_LEVEL")
            .env_remove("RUST_LOG");
        cmd
    }
}
