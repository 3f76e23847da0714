use crate::common::{mount_package, package_document};
use semver::Version;
use std::path::PathBuf;
use tempfile::TempDir;
use url::Url;
use vic_cli::cache::{PackageCache, PackageOptions};
use vic_cli::installer::PackageSpec;
use vic_cli::registry::NpmRegistry;
use vic_cli::test_utils::{RecordingInstaller, init_test_logging};
use vic_cli::utils::normalize_path_for_storage;
use wiremock::MockServer;

const NAME: &str = "@vic-cli-test/init";

fn options(temp: &TempDir) -> PackageOptions {
    PackageOptions::new(NAME, "latest")
        .with_target_path(temp.path().join("dependencies"))
        .with_store_dir(temp.path().join("dependencies").join("node_modules"))
}

#[tokio::test]
async fn test_install_update_and_resolve_entry() {
    init_test_logging(None);
    let server = MockServer::start().await;
    mount_package(&server, NAME, package_document(NAME, Some("1.0.2"), &["1.0.0", "1.0.2"])).await;

    let temp = TempDir::new().unwrap();
    let installer = RecordingInstaller::new();
    let registry = NpmRegistry::with_url(&server.uri()).unwrap();
    let mut package = PackageCache::new(options(&temp), registry, installer.clone()).unwrap();

    assert!(!package.exists().await.unwrap());
    package.install().await.unwrap();

    let requests = installer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].registry, Url::parse(&format!("{}/", server.uri())).unwrap());
    assert_eq!(requests[0].root, temp.path().join("dependencies"));
    assert_eq!(requests[0].packages, vec![PackageSpec::new(NAME, Version::new(1, 0, 2))]);

    let entry_dir: PathBuf = temp
        .path()
        .join("dependencies")
        .join("node_modules")
        .join("_@vic-cli-test_init@1.0.2@@vic-cli-test")
        .join("init");
    assert!(entry_dir.is_dir());
    assert_eq!(
        package.root_file_path().await.unwrap(),
        Some(PathBuf::from(normalize_path_for_storage(entry_dir.join("lib").join("index.js"))))
    );

    // a fresh cache for the same request sees the entry and does not reinstall
    let registry = NpmRegistry::with_url(&server.uri()).unwrap();
    let mut again = PackageCache::new(options(&temp), registry, installer.clone()).unwrap();
    assert!(again.exists().await.unwrap());
    let outcome = again.update().await.unwrap();
    assert!(!outcome.installed);
    assert_eq!(installer.call_count(), 1);
}

#[tokio::test]
async fn test_update_to_new_release_keeps_old_entry() {
    let server = MockServer::start().await;
    mount_package(&server, NAME, package_document(NAME, Some("1.0.2"), &["1.0.2"])).await;

    let temp = TempDir::new().unwrap();
    let installer = RecordingInstaller::new();
    let registry = NpmRegistry::with_url(&server.uri()).unwrap();
    let mut package = PackageCache::new(options(&temp), registry, installer.clone()).unwrap();
    package.install().await.unwrap();
    let old_entry = package.cache_path().unwrap();

    server.reset().await;
    mount_package(&server, NAME, package_document(NAME, Some("1.1.0"), &["1.0.2", "1.1.0"])).await;

    let outcome = package.update().await.unwrap();
    assert_eq!(outcome.version, Version::new(1, 1, 0));
    assert!(outcome.installed);
    assert!(old_entry.is_dir());
    assert!(package.cache_path().unwrap().is_dir());
    assert!(
        package
            .root_file_path()
            .await
            .unwrap()
            .unwrap()
            .to_string_lossy()
            .contains("_@vic-cli-test_init@1.1.0@@vic-cli-test/init/lib/index.js")
    );
}
