use crate::TestApp;

#[test_log::test(tokio::test(flavor = "multi_thread"))]
#[ignore = "requires a local PostgreSQL server"]
pub async fn health_check() {
    let app = TestApp::start().await;
    let client = app.connect_anonymous().await;

    let response = client
        .get_string("/health")
        .await
        .expect("failed to perform health check");

    assert_eq!("UP", response);
}
