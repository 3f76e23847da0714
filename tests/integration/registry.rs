use crate::common::{document_path, mount_package, package_document};
use semver::Version;
use vic_cli::core::VicError;
use vic_cli::registry::{NpmRegistry, RegistryClient};
use vic_cli::version::VersionRange;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> NpmRegistry {
    NpmRegistry::with_url(&server.uri()).unwrap()
}

#[tokio::test]
async fn test_resolve_latest_uses_dist_tag() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/left-pad"))
        .and(header("accept", "application/vnd.npm.install-v1+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(package_document(
            "left-pad",
            Some("1.2.0"),
            &["1.0.0", "1.2.0", "2.0.0-beta.1"],
        )))
        .expect(1)
        .mount(&server)
        .await;

    let latest = client(&server).resolve_latest("left-pad").await.unwrap();
    assert_eq!(latest, Version::new(1, 2, 0));
}

#[tokio::test]
async fn test_resolve_latest_without_dist_tag_picks_highest_stable() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "left-pad",
        package_document("left-pad", None, &["1.0.0", "1.3.0", "2.0.0-rc.1"]),
    )
    .await;

    let latest = client(&server).resolve_latest("left-pad").await.unwrap();
    assert_eq!(latest, Version::new(1, 3, 0));
}

#[tokio::test]
async fn test_scoped_package_is_encoded() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "@vic-cli-test/init",
        package_document("@vic-cli-test/init", Some("1.0.2"), &["1.0.0", "1.0.2"]),
    )
    .await;

    let registry = client(&server);
    assert_eq!(
        registry.package_url("@vic-cli-test/init").unwrap().path(),
        document_path("@vic-cli-test/init")
    );
    let latest = registry.resolve_latest("@vic-cli-test/init").await.unwrap();
    assert_eq!(latest, Version::new(1, 0, 2));
}

#[tokio::test]
async fn test_resolve_range() {
    let server = MockServer::start().await;
    mount_package(
        &server,
        "left-pad",
        package_document("left-pad", Some("2.1.0"), &["1.0.0", "1.4.2", "2.1.0"]),
    )
    .await;

    let registry = client(&server);
    let range = VersionRange::parse("^1.0").unwrap();
    assert_eq!(registry.resolve_range("left-pad", &range).await.unwrap(), Version::new(1, 4, 2));

    let range = VersionRange::parse("1.0 || >=2.0.0 <2.1.0").unwrap();
    assert_eq!(registry.resolve_range("left-pad", &range).await.unwrap(), Version::new(1, 0, 0));

    let range = VersionRange::parse("^3").unwrap();
    let err = registry.resolve_range("left-pad", &range).await.unwrap_err();
    assert!(matches!(err, VicError::VersionNotFound { .. }));
    assert!(err.to_string().contains("^3"));
}

#[tokio::test]
async fn test_missing_package() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/no-such-package"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client(&server).resolve_latest("no-such-package").await.unwrap_err();
    assert_eq!(
        err,
        VicError::PackageNotFound {
            name: "no-such-package".to_string()
        }
    );
}

#[tokio::test]
async fn test_package_without_versions() {
    let server = MockServer::start().await;
    mount_package(&server, "empty", package_document("empty", None, &[])).await;

    let registry = client(&server);
    assert!(matches!(
        registry.resolve_latest("empty").await.unwrap_err(),
        VicError::PackageNotFound { .. }
    ));
    let range = VersionRange::parse("*").unwrap();
    assert!(matches!(
        registry.resolve_range("empty", &range).await.unwrap_err(),
        VicError::PackageNotFound { .. }
    ));
}

#[tokio::test]
async fn test_server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).versions("left-pad").await.unwrap_err();
    match err {
        VicError::RegistryUnavailable { registry, reason } => {
            assert_eq!(registry, format!("{}/", server.uri()));
            assert!(reason.contains("503"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_document_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/left-pad"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client(&server).resolve_latest("left-pad").await.unwrap_err();
    assert!(matches!(err, VicError::RegistryUnavailable { .. }));
}

#[tokio::test]
async fn test_unreachable_registry() {
    // nothing listens on a port that was just released
    let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();

    let registry = NpmRegistry::with_url(&format!("http://127.0.0.1:{port}")).unwrap();
    let err = registry.resolve_latest("left-pad").await.unwrap_err();
    assert!(matches!(err, VicError::RegistryUnavailable { .. }));
}
