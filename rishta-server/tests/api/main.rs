use axum::http::{HeaderMap, HeaderValue};
use lazy_static::lazy_static;
use openssl::rsa::Rsa;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Connection, PgConnection};
use std::{
    error::Error,
    net::{Ipv4Addr, SocketAddr, SocketAddrV4, TcpListener},
    time::Duration,
};
use thiserror::Error;
use tracing::Level;
use url::Url;
use uuid::Uuid;

use rishta_core::jwks::Jwks;
use rishta_core::{JWKS_ENV, SIGNING_KEY_ENV};
use rishta_server::{
    api::v1::auth::LoginResponse,
    app::{App, Args},
    auth::{ADMIN_EMAIL_ENV, ADMIN_PASSWORD_ENV},
    database::Database,
};

const BASE_DATABASE_URL: &str = "postgres://127.0.0.1:5432";

pub const ADMIN_EMAIL: &str = "admin@rishta.test";
pub const ADMIN_PASSWORD: &str = "bootstrap-admin-passphrase";

pub mod admin;
pub mod health;
pub mod profiles;

lazy_static! {
    static ref SIGNING_KEY_PEM: Vec<u8> = Rsa::generate(2048)
        .expect("failed to generate test signing key")
        .private_key_to_pem()
        .expect("failed to encode test signing key");
}

/// Every test app shares one generated signing keypair; the environment
/// variables the server reads at startup are process-wide.
fn export_auth_environment() {
    let jwks = Jwks::from_pem(&SIGNING_KEY_PEM)
        .expect("failed to derive JWKS from test signing key")
        .to_string();

    std::env::set_var(
        SIGNING_KEY_ENV,
        std::str::from_utf8(&SIGNING_KEY_PEM).unwrap(),
    );
    std::env::set_var(JWKS_ENV, jwks);
    std::env::set_var(ADMIN_EMAIL_ENV, ADMIN_EMAIL);
    std::env::set_var(ADMIN_PASSWORD_ENV, ADMIN_PASSWORD);
}

pub struct TestApp {
    database_name: String,
    database: Database,
    url: Url,
}

#[derive(Error, Debug)]
pub enum TestError {
    #[error("failed to connect to test server: {0}")]
    ConnectError(#[source] reqwest::Error),
    #[error("failed to check test server health")]
    HealthCheckError,
    #[error("failed to parse URL: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("failed to execute request: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("failed to serialize/deserialize JSON: {0}")]
    JSONSerializationError(#[from] serde_json::Error),
}

pub type TestResult<T> = Result<T, TestError>;

impl TestApp {
    pub async fn start() -> Self {
        dotenv::dotenv().ok();
        export_auth_environment();

        let database_name = format!("it_{}", Uuid::new_v4());
        let mut conn = PgConnection::connect(BASE_DATABASE_URL)
            .await
            .expect("failed to connect to database");
        sqlx::query(&format!("CREATE DATABASE \"{}\"", database_name))
            .execute(&mut conn)
            .await
            .expect("failed to create test database");
        conn.close()
            .await
            .expect("failed to close temporary connection");

        tracing::trace!("created test database {}", database_name);

        let database_url = format!("{}/{}", BASE_DATABASE_URL, database_name);
        let database = Database::new(&database_url, 1, 1)
            .await
            .expect("failed to connect to test database");
        database
            .migrate()
            .await
            .expect("failed to migrate test database");

        let port = next_available_port();
        let listen_address = SocketAddr::from(([127, 0, 0, 1], port));

        let app = App::with_args(Args {
            listen_address,
            database_url,
            ..Args::default()
        });

        let _ = tokio::spawn(async move { app.run().await });

        let url =
            Url::parse(&format!("http://127.0.0.1:{}", port)).expect("failed to generate URL");

        Self {
            database_name,
            database,
            url,
        }
    }

    pub async fn connect_anonymous(&self) -> TestClient {
        self.wait_until_healthy().await.unwrap();
        TestClient(reqwest::Client::new(), self.url.clone(), None)
    }

    pub async fn connect_administrator(&self) -> TestClient {
        self.login(ADMIN_EMAIL, ADMIN_PASSWORD)
            .await
            .expect("failed to log in as bootstrap administrator")
    }

    /// Registers a member account through the API and logs it in.
    pub async fn register_member(
        &self,
        name: &str,
        email: &str,
        password: &str,
        gender: &str,
    ) -> TestClient {
        let anonymous = self.connect_anonymous().await;
        let _: serde_json::Value = anonymous
            .post(
                "/api/v1/auth/register",
                serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": password,
                    "gender": gender,
                }),
            )
            .await
            .expect("failed to register member account");

        self.login(email, password)
            .await
            .expect("failed to log in registered member")
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResult<TestClient> {
        let anonymous = self.connect_anonymous().await;
        let response: LoginResponse = anonymous
            .post(
                "/api/v1/auth/login",
                serde_json::json!({
                    "email": email,
                    "password": password,
                }),
            )
            .await?;

        Ok(TestClient(
            reqwest::Client::new(),
            self.url.clone(),
            Some(response.token),
        ))
    }

    async fn wait_until_healthy(&self) -> TestResult<()> {
        let mut remaining_tries = 50;
        let client = reqwest::Client::new();

        while remaining_tries > 0 {
            let result = client
                .request(reqwest::Method::GET, self.url.join("/health").unwrap())
                .send()
                .await;
            match result {
                Ok(res) => {
                    if res.text().await.unwrap().trim() == "UP" {
                        return Ok(());
                    } else {
                        return Err(TestError::HealthCheckError);
                    }
                }
                Err(e) => {
                    if let Some(source) = e.source() {
                        if let Some(hyper_error) = source.downcast_ref::<hyper::Error>() {
                            if hyper_error.is_connect() {
                                std::thread::sleep(Duration::from_millis(20));
                                remaining_tries -= 1;
                                continue;
                            }
                        }
                    }
                    return Err(TestError::ConnectError(e));
                }
            }
        }

        Err(TestError::HealthCheckError)
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

pub struct TestClient(reqwest::Client, Url, Option<String>);

impl TestClient {
    pub async fn get_string(&self, path: &str) -> TestResult<String> {
        Ok(self
            .0
            .request(reqwest::Method::GET, self.1.join(path)?)
            .headers(self.headers())
            .send()
            .await?
            .text()
            .await?)
    }

    /// Issues a GET and hands back the raw response, status untouched, for
    /// tests asserting on status codes and headers.
    pub async fn get_raw(&self, path: &str) -> TestResult<reqwest::Response> {
        Ok(self
            .0
            .request(reqwest::Method::GET, self.1.join(path)?)
            .headers(self.headers())
            .send()
            .await?)
    }

    pub async fn get<RS: DeserializeOwned>(&self, path: &str) -> TestResult<RS> {
        self.execute_json_request_response(reqwest::Method::GET, path, None::<()>)
            .await
    }

    pub async fn post<RQ: Serialize, RS: DeserializeOwned>(
        &self,
        path: &str,
        body: RQ,
    ) -> TestResult<RS> {
        self.execute_json_request_response(reqwest::Method::POST, path, Some(body))
            .await
    }

    pub async fn post_empty<RS: DeserializeOwned>(&self, path: &str) -> TestResult<RS> {
        self.execute_json_request_response(reqwest::Method::POST, path, None::<()>)
            .await
    }

    pub async fn patch<RQ: Serialize, RS: DeserializeOwned>(
        &self,
        path: &str,
        body: RQ,
    ) -> TestResult<RS> {
        self.execute_json_request_response(reqwest::Method::PATCH, path, Some(body))
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResult<()> {
        let req = self
            .0
            .request(reqwest::Method::DELETE, self.1.join(path)?)
            .headers(self.headers());
        let response = self.0.execute(req.build()?).await?;
        response
            .error_for_status_ref()
            .map_err(TestError::RequestError)?;
        Ok(())
    }

    async fn execute_json_request_response<RQ: Serialize, RS: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<RQ>,
    ) -> Result<RS, TestError> {
        let mut req = self.0.request(method, self.1.join(path)?);
        req = req.headers(self.headers());
        if let Some(body) = body {
            if tracing::event_enabled!(Level::DEBUG) {
                tracing::debug!(
                    body = serde_json::to_string(&body).unwrap(),
                    "sending request"
                );
            }
            req = req.json(&body);
        }
        let response = self.0.execute(req.build()?).await?;
        response
            .error_for_status_ref()
            .map_err(TestError::RequestError)?;
        if tracing::event_enabled!(Level::DEBUG) {
            let bytes = response.bytes().await?;
            let json: serde_json::Value = serde_json::from_slice(&bytes)?;
            tracing::debug!(
                body = serde_json::to_string(&json).unwrap(),
                "received response"
            );
            Ok(serde_json::from_value(json)?)
        } else {
            Ok(response.json().await?)
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(token) = &self.2 {
            headers.insert(
                "Authorization",
                HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
            );
        }
        headers
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        tokio::task::block_in_place(|| {
            futures::executor::block_on(async {
                self.database.close().await;
                if let Ok(mut conn) = PgConnection::connect(BASE_DATABASE_URL).await {
                    if let Err(e) = sqlx::query(&format!(
                        "DROP DATABASE IF EXISTS \"{}\" WITH (FORCE)",
                        self.database_name
                    ))
                    .execute(&mut conn)
                    .await
                    {
                        tracing::error!(
                            "failed to drop test database {}: {}",
                            self.database_name,
                            e
                        )
                    }
                    conn.close()
                        .await
                        .expect("failed to close temporary connection");
                }
            })
        });

        tracing::trace!("test database {} dropped", self.database_name);
    }
}

fn next_available_port() -> u16 {
    for _ in 0..10 {
        if let Some(port) = bind_os_available_port() {
            return port;
        }
    }

    panic!("no port available")
}

fn bind_os_available_port() -> Option<u16> {
    TcpListener::bind(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|l| l.local_addr())
        .map(|a| a.port())
        .ok()
}
