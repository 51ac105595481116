use std::fs;
use std::sync::Arc;

use dectest::annotate;
use dectest::config::ConfigLoader;
use dectest::registry::MetadataRegistry;
use dectest::runner::{RunSummary, SuiteRunner, TestReporter};
use dectest::suite::{Declarations, RunFilter, Suite};
use dectest::{Assertion, HttpTransport};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct UsersApi;

impl Suite for UsersApi {
    fn create() -> Self {
        UsersApi
    }

    fn declare(d: &mut Declarations<'_, Self>) {
        d.suite().describe("Users API").tag("users");

        d.test("list_users", |_s, cx| async move {
            let users = cx.json()?;
            anyhow::ensure!(users["users"].as_array().map(Vec::len) == Some(2));
            anyhow::Ok(())
        })
        .get("/api/users")
        .query("tag", json!(["admin", "staff"]))
        .query("page", 2)
        .tag("smoke")
        .expect_status(200)
        .expect_body("users.0.name", Assertion::equals("Alice"))
        .expect_body("users", Assertion::contains(json!({"id": 2, "name": "Bob"})));

        d.test("create_user", |_s, _cx| async { anyhow::Ok(()) })
            .post("/api/users")
            .header("X-Request-Id", "42")
            .body(json!({"name": "Carol"}))
            .expect_status(201)
            .expect_body("id", Assertion::defined());

        // 路径和参数来自不同的片段
        d.test("get_user", |_s, _cx| async { anyhow::Ok(()) });
        annotate::key(d.registry(), "get_user")
            .get("/api/users/{id}")
            .path_param("id", 9);
        annotate::key(d.registry(), "get_user")
            .expect_status(404)
            .expect_body("error", Assertion::contains("not found"));
    }
}

struct OrdersApi;

impl Suite for OrdersApi {
    fn create() -> Self {
        OrdersApi
    }

    fn declare(d: &mut Declarations<'_, Self>) {
        d.test("list_orders", |_s, _cx| async { anyhow::Ok(()) })
            .get("/api/orders")
            .expect_status(200);
    }
}

async fn mount_users(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(query_param("tag", "admin"))
        .and(query_param("tag", "staff"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "users": [
                {"id": 1, "name": "Alice"},
                {"id": 2, "name": "Bob"}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/users"))
        .and(header("content-type", "application/json"))
        .and(header("x-request-id", "42"))
        .and(body_json(json!({"name": "Carol"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 3, "name": "Carol"})))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/users/9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "user not found"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_suite_against_http_server() {
    dectest::logger::init_logger();
    let server = MockServer::start().await;
    mount_users(&server).await;

    let registry = MetadataRegistry::new();
    let transport = HttpTransport::new().unwrap().with_base_url(&server.uri()).unwrap();
    let mut runner = SuiteRunner::new(&registry, Arc::new(transport));
    runner.add_suite::<UsersApi>();

    let reports = runner.run().await;
    assert_eq!(reports.len(), 1);

    let report = &reports[0];
    assert_eq!(report.suite, "Users API");
    for result in &report.results {
        assert!(result.is_passed(), "{}: {:?}", result.name, result.outcome);
    }
    assert_eq!(report.result("create_user").unwrap().status, Some(201));
    assert_eq!(report.result("get_user").unwrap().status, Some(404));

    let summary = RunSummary::from_reports(&reports);
    assert_eq!(summary.passed, 3);
    assert!(summary.is_success());

    let reporter = TestReporter::new(true);
    reporter.print_report(report);
    reporter.print_summary(&summary);
}

#[tokio::test]
async fn test_runner_from_config_file() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .and(header("authorization", "Bearer staging-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("dectest.toml");
    let content = format!(
        r#"
base_url = "http://localhost:1"
timeout_secs = 5

[environments.staging]
base_url = "{}"

[environments.staging.headers]
Authorization = "Bearer staging-token"
"#,
        server.uri()
    );
    fs::write(&config_path, content).unwrap();

    let config = ConfigLoader::load_from_path(&config_path)
        .unwrap()
        .for_environment(Some("staging"))
        .unwrap();

    let registry = MetadataRegistry::new();
    let mut runner = SuiteRunner::from_config(&registry, &config).unwrap();
    runner.add_suite::<OrdersApi>();

    let reports = runner.run().await;
    let result = reports[0].result("list_orders").unwrap();
    assert!(result.is_passed(), "{:?}", result.outcome);
}

#[tokio::test]
async fn test_tag_filter_and_cross_suite_only() {
    let server = MockServer::start().await;
    mount_users(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let transport = Arc::new(HttpTransport::new().unwrap().with_base_url(&server.uri()).unwrap());

    // 标签过滤：只有 list_users 带 smoke
    let registry = MetadataRegistry::new();
    let mut runner = SuiteRunner::new(&registry, transport.clone())
        .with_filter(RunFilter::new().with_tag("smoke"));
    runner.add_suite::<UsersApi>().add_suite::<OrdersApi>();
    let reports = runner.run().await;

    let summary = RunSummary::from_reports(&reports);
    assert_eq!(summary.suites, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.skipped, 3);

    // 一个套件里的 only 让其它套件的测试也被跳过
    let registry = MetadataRegistry::new();
    annotate::member::<OrdersApi>(&registry, "list_orders").only();
    let mut runner = SuiteRunner::new(&registry, transport);
    runner.add_suite::<UsersApi>().add_suite::<OrdersApi>();
    let reports = runner.run().await;

    assert!(reports[0].results.iter().all(|r| r.is_skipped()));
    assert!(reports[1].result("list_orders").unwrap().is_passed());
}

#[tokio::test]
async fn test_connection_failure_is_reported_per_test() {
    let registry = MetadataRegistry::new();
    let transport = HttpTransport::new()
        .unwrap()
        .with_base_url("http://127.0.0.1:9")
        .unwrap();
    let mut runner = SuiteRunner::new(&registry, Arc::new(transport));
    runner.add_suite::<OrdersApi>();

    let reports = runner.run().await;
    let result = reports[0].result("list_orders").unwrap();
    assert!(result.is_failed());
    let error = result.error().unwrap();
    assert!(error.contains("GET /api/orders"));
    // 错误里带上实际请求的完整 URL
    assert!(error.contains("http://127.0.0.1:9/api/orders"), "{}", error);
}
