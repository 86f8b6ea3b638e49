//! In-process stand-in for Resource Manager and a managed identity endpoint.
//!
//! The server binds to an ephemeral loopback port and serves the three VM
//! routes, the two long-running operation monitors, and an App Service style
//! token endpoint. Behaviour is scripted through [`Scenario`] and every
//! request is recorded for later assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const SUBSCRIPTION: &str = "sub-1";
pub const RESOURCE_GROUP: &str = "rg-1";
pub const VM_NAME: &str = "vm-1";
pub const TOKEN: &str = "fake-token";
pub const IDENTITY_SECRET: &str = "identity-secret";

const VM_PATH: &str =
    "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Compute/virtualMachines/vm-1";

/// Scripted behaviour of the fake endpoints.
#[derive(Debug, Default)]
pub struct Scenario {
    /// Error returned by the start call instead of accepting it.
    pub start_rejection: Option<(StatusCode, Value)>,
    /// Statuses reported by successive async operation polls. Once drained,
    /// polls keep answering `InProgress`.
    pub operation_statuses: VecDeque<&'static str>,
    /// Number of `202` answers the location monitor gives before `200`.
    pub location_pending_polls: u32,
    /// Instance view document returned for status queries.
    pub instance_view: Value,
    /// Makes the token endpoint answer with a server error.
    pub token_failure: bool,
    /// `Retry-After` seconds sent with accepted operations and async polls.
    pub retry_after_secs: u64,
}

/// Requests observed by the fake.
#[derive(Debug, Default)]
pub struct Recorded {
    pub requests: Vec<String>,
    pub token_resources: Vec<String>,
    pub token_api_versions: Vec<String>,
    pub token_client_ids: Vec<Option<String>>,
    pub metadata_headers: Vec<Option<String>>,
    pub api_versions: Vec<String>,
    pub unauthorised: u32,
}

#[derive(Debug, Default)]
struct Inner {
    base: String,
    scenario: Scenario,
    recorded: Recorded,
}

/// Handle to a running fake server.
#[derive(Clone, Debug)]
pub struct FakeArm {
    base: String,
    inner: Arc<Mutex<Inner>>,
}

impl FakeArm {
    /// Binds the fake on `127.0.0.1:0` and starts serving in the background.
    pub async fn start(scenario: Scenario) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback listener");
        let address = listener.local_addr().expect("listener address");
        let base = format!("http://{address}");
        let inner = Arc::new(Mutex::new(Inner {
            base: base.clone(),
            scenario,
            recorded: Recorded::default(),
        }));

        let app = Router::new()
            .route(&format!("{VM_PATH}/start"), post(start))
            .route(&format!("{VM_PATH}/deallocate"), post(deallocate))
            .route(&format!("{VM_PATH}/instanceView"), get(instance_view))
            .route("/operations/start", get(operation_status))
            .route("/results/deallocate", get(location_result))
            .route("/msi/token", get(issue_token))
            .with_state(Arc::clone(&inner));

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self { base, inner }
    }

    /// Base URL used as the management endpoint.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Token endpoint URL, shared by the IMDS and App Service sources.
    pub fn token_url(&self) -> String {
        format!("{}/msi/token", self.base)
    }

    /// Runs `inspect` against the recorded requests.
    pub fn recorded<T>(&self, inspect: impl FnOnce(&Recorded) -> T) -> T {
        let inner = self.inner.lock().expect("fake state lock");
        inspect(&inner.recorded)
    }
}

type Shared = State<Arc<Mutex<Inner>>>;

fn authorise(inner: &mut Inner, headers: &HeaderMap, label: &str) -> bool {
    inner.recorded.requests.push(label.to_owned());
    let expected = format!("Bearer {TOKEN}");
    let authorised = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        == Some(expected.as_str());
    if !authorised {
        inner.recorded.unauthorised += 1;
    }
    authorised
}

fn record_api_version(inner: &mut Inner, query: &HashMap<String, String>) {
    if let Some(version) = query.get("api-version") {
        inner.recorded.api_versions.push(version.clone());
    }
}

fn retry_after(inner: &Inner) -> String {
    inner.scenario.retry_after_secs.to_string()
}

fn unauthorised() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": { "code": "InvalidAuthenticationToken", "message": "bad token" } })),
    )
        .into_response()
}

async fn start(
    State(inner): Shared,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut inner = inner.lock().expect("fake state lock");
    if !authorise(&mut inner, &headers, "POST start") {
        return unauthorised();
    }
    record_api_version(&mut inner, &query);
    if let Some((status, body)) = inner.scenario.start_rejection.clone() {
        return (status, Json(body)).into_response();
    }
    let monitor = format!("{}/operations/start", inner.base);
    (
        StatusCode::ACCEPTED,
        [
            ("azure-asyncoperation", monitor),
            (header::RETRY_AFTER.as_str(), retry_after(&inner)),
        ],
    )
        .into_response()
}

async fn deallocate(
    State(inner): Shared,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut inner = inner.lock().expect("fake state lock");
    if !authorise(&mut inner, &headers, "POST deallocate") {
        return unauthorised();
    }
    record_api_version(&mut inner, &query);
    let monitor = format!("{}/results/deallocate", inner.base);
    (
        StatusCode::ACCEPTED,
        [
            (header::LOCATION.as_str(), monitor),
            (header::RETRY_AFTER.as_str(), retry_after(&inner)),
        ],
    )
        .into_response()
}

async fn instance_view(
    State(inner): Shared,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut inner = inner.lock().expect("fake state lock");
    if !authorise(&mut inner, &headers, "GET instanceView") {
        return unauthorised();
    }
    record_api_version(&mut inner, &query);
    Json(inner.scenario.instance_view.clone()).into_response()
}

async fn operation_status(State(inner): Shared, headers: HeaderMap) -> Response {
    let mut inner = inner.lock().expect("fake state lock");
    if !authorise(&mut inner, &headers, "GET operation") {
        return unauthorised();
    }
    let status = inner
        .scenario
        .operation_statuses
        .pop_front()
        .unwrap_or("InProgress");
    let body = if status == "Failed" {
        json!({
            "status": status,
            "error": { "code": "AllocationFailed", "message": "no capacity in region" }
        })
    } else {
        json!({ "status": status })
    };
    if inner.scenario.retry_after_secs > 0 {
        return ([(header::RETRY_AFTER, retry_after(&inner))], Json(body)).into_response();
    }
    Json(body).into_response()
}

async fn location_result(State(inner): Shared, headers: HeaderMap) -> Response {
    let mut inner = inner.lock().expect("fake state lock");
    if !authorise(&mut inner, &headers, "GET location") {
        return unauthorised();
    }
    if inner.scenario.location_pending_polls > 0 {
        inner.scenario.location_pending_polls -= 1;
        StatusCode::ACCEPTED.into_response()
    } else {
        StatusCode::OK.into_response()
    }
}

async fn issue_token(
    State(inner): Shared,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let mut inner = inner.lock().expect("fake state lock");
    inner.recorded.requests.push(String::from("GET token"));
    if let Some(resource) = query.get("resource") {
        inner.recorded.token_resources.push(resource.clone());
    }
    if let Some(version) = query.get("api-version") {
        inner.recorded.token_api_versions.push(version.clone());
    }
    inner
        .recorded
        .token_client_ids
        .push(query.get("client_id").cloned());
    let metadata = headers
        .get("metadata")
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);
    inner.recorded.metadata_headers.push(metadata.clone());
    let secret_matches = headers
        .get("x-identity-header")
        .and_then(|value| value.to_str().ok())
        == Some(IDENTITY_SECRET);
    let imds_request = metadata.as_deref() == Some("true");
    if inner.scenario.token_failure || !(secret_matches || imds_request) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "identity endpoint unavailable")
            .into_response();
    }

    let expires_on = SystemTime::now()
        .checked_add(Duration::from_secs(3600))
        .and_then(|instant| instant.duration_since(UNIX_EPOCH).ok())
        .map(|elapsed| elapsed.as_secs())
        .expect("future expiry");
    Json(json!({
        "access_token": TOKEN,
        "expires_on": expires_on.to_string(),
        "resource": query.get("resource"),
        "token_type": "Bearer"
    }))
    .into_response()
}
