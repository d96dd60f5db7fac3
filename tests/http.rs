use once_cell::sync::Lazy;
use reqwest::{redirect::Policy, Client, StatusCode};
use serde::Deserialize;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

#[derive(Debug, Deserialize)]
struct CategoryRow {
    category: String,
    value: f64,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    category: String,
    value: f64,
    kind: Option<String>,
    updated: bool,
}

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Once;

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_path(name: &str) -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("ghg_tracker_http_{}_{}", std::process::id(), nanos));
    path.push(name);
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let child = Command::new(env!("CARGO_BIN_EXE_ghg_tracker"))
        .env("PORT", port.to_string())
        .env("GHG_DATA_PATH", unique_path("main_data.xlsx"))
        .env("GHG_USER_DB", unique_path("users.csv"))
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

/// A browser-like client: keeps cookies, does not follow redirects.
fn browser() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(Policy::none())
        .build()
        .unwrap()
}

fn location(resp: &reqwest::Response) -> String {
    resp.headers()
        .get(reqwest::header::LOCATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn sign_up(client: &Client, base: &str, user: &str, pass: &str, key: &str) -> reqwest::Response {
    client
        .post(format!("{base}/signup"))
        .form(&[("username", user), ("password", pass), ("recovery_key", key)])
        .send()
        .await
        .unwrap()
}

async fn log_in(client: &Client, base: &str, user: &str, pass: &str) -> reqwest::Response {
    client
        .post(format!("{base}/login"))
        .form(&[("username", user), ("password", pass)])
        .send()
        .await
        .unwrap()
}

async fn recover(client: &Client, base: &str, user: &str, key: &str) -> reqwest::Response {
    client
        .post(format!("{base}/recover"))
        .form(&[("username", user), ("recovery_key", key)])
        .send()
        .await
        .unwrap()
}

async fn categories(client: &Client, base: &str) -> Vec<CategoryRow> {
    client
        .get(format!("{base}/api/categories"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_full_account_and_update_scenario() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = server.base_url.as_str();
    let client = browser();

    let resp = sign_up(&client, base, "alice", "pw123", "blue").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Account created! Please switch to Login."));

    let resp = log_in(&client, base, "alice", "pw123").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/status");

    let page = client.get(format!("{base}/status")).send().await.unwrap();
    assert_eq!(page.status(), StatusCode::OK);
    let body = page.text().await.unwrap();
    assert!(body.contains("Carbon Contribution by Category"));
    assert!(body.contains("<h2>Alice</h2>"));

    let resp = client
        .post(format!("{base}/input"))
        .form(&[("category", "Waste"), ("value", "120")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .text()
        .await
        .unwrap()
        .contains("Successfully updated Waste in the Excel sheet!"));

    let rows = categories(&client, base).await;
    let waste = rows.iter().find(|row| row.category == "Waste").unwrap();
    assert_eq!(waste.value, 120.0);
    assert_eq!(waste.kind, "Indirect");

    let resp = client.post(format!("{base}/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let resp = client.get(format!("{base}/status")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");
    let resp = client.get(format!("{base}/api/categories")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = recover(&client, base, "alice", "blue").await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.text().await.unwrap().contains("Your password is: pw123"));
}

#[tokio::test]
async fn http_duplicate_signup_conflicts() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = server.base_url.as_str();
    let client = browser();

    let first = sign_up(&client, base, "dupe_user", "pw", "key").await;
    assert_eq!(first.status(), StatusCode::OK);

    let second = sign_up(&client, base, "  DUPE_USER ", "other", "").await;
    assert_eq!(second.status(), StatusCode::CONFLICT);
    assert!(second.text().await.unwrap().contains("User already exists!"));

    let resp = log_in(&client, base, "dupe_user", "other").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = log_in(&client, base, "dupe_user", "pw").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn http_invalid_login_stays_anonymous() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = server.base_url.as_str();
    let client = browser();

    let resp = log_in(&client, base, "ghost", "nope").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert!(resp.text().await.unwrap().contains("Invalid Username or Password"));

    let resp = client.get(format!("{base}/tracker")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn http_recovery_failure_does_not_say_which_field() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = server.base_url.as_str();
    let client = browser();

    sign_up(&client, base, "bob", "hunter2", "green").await;

    let wrong_key = recover(&client, base, "bob", "red").await;
    let wrong_user = recover(&client, base, "nobody", "green").await;
    assert_eq!(wrong_key.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_user.status(), StatusCode::UNAUTHORIZED);

    let message = "No account matches that username and recovery key";
    let key_body = wrong_key.text().await.unwrap();
    let user_body = wrong_user.text().await.unwrap();
    assert!(key_body.contains(message));
    assert!(user_body.contains(message));
    assert!(!key_body.contains("hunter2"));
}

#[tokio::test]
async fn http_api_update_keeps_exact_value_and_type() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = server.base_url.as_str();
    let client = browser();

    sign_up(&client, base, "carol", "pw", "").await;
    log_in(&client, base, "carol", "pw").await;

    let updated: UpdateResponse = client
        .post(format!("{base}/api/categories"))
        .json(&serde_json::json!({ "category": "Electricity", "value": 999.5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(updated.updated);
    assert_eq!(updated.value, 999.5);
    assert_eq!(updated.kind.as_deref(), Some("Direct"));

    let rows = categories(&client, base).await;
    let electricity = rows.iter().find(|row| row.category == "Electricity").unwrap();
    assert_eq!(electricity.value, 999.5);
    assert_eq!(electricity.kind, "Direct");

    let ignored: UpdateResponse = client
        .post(format!("{base}/api/categories"))
        .json(&serde_json::json!({ "category": "Aviation", "value": 5.0 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!ignored.updated);
    assert_eq!(ignored.category, "Aviation");
    assert_eq!(categories(&client, base).await.len(), rows.len());

    let resp = client
        .post(format!("{base}/api/categories"))
        .json(&serde_json::json!({ "category": "Waste", "value": -1.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let export = client.get(format!("{base}/export.xlsx")).send().await.unwrap();
    assert_eq!(export.status(), StatusCode::OK);
    let bytes = export.bytes().await.unwrap();
    assert!(bytes.starts_with(b"PK"));
}

#[tokio::test]
async fn http_form_update_of_unknown_category_reports_success_without_writing() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = server.base_url.as_str();
    let client = browser();

    sign_up(&client, base, "dana", "pw", "").await;
    log_in(&client, base, "dana", "pw").await;
    let before = categories(&client, base).await;

    let resp = client
        .post(format!("{base}/input"))
        .form(&[("category", "Aviation"), ("value", "75")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp
        .text()
        .await
        .unwrap()
        .contains("Successfully updated Aviation in the Excel sheet!"));

    let after = categories(&client, base).await;
    assert_eq!(after.len(), before.len());
    assert!(after.iter().all(|row| row.category != "Aviation"));
    for (old, new) in before.iter().zip(&after) {
        assert_eq!(old.category, new.category);
        assert_eq!(old.value, new.value);
        assert_eq!(old.kind, new.kind);
    }
}

#[tokio::test]
async fn http_form_update_rejects_bad_values() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = server.base_url.as_str();
    let client = browser();

    sign_up(&client, base, "erin", "pw", "").await;
    log_in(&client, base, "erin", "pw").await;
    let before = categories(&client, base).await;

    for bad in ["-3", "abc", ""] {
        let resp = client
            .post(format!("{base}/input"))
            .form(&[("category", "Waste"), ("value", bad)])
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "value {bad:?}");
        assert!(resp
            .text()
            .await
            .unwrap()
            .contains("New Value must be a number of at least 0"));
    }

    let after = categories(&client, base).await;
    let waste = |rows: &[CategoryRow]| {
        rows.iter()
            .find(|row| row.category == "Waste")
            .map(|row| row.value)
    };
    assert_eq!(waste(&after), waste(&before));
}

#[tokio::test]
async fn http_signup_with_missing_fields_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let base = server.base_url.as_str();
    let client = browser();

    let resp = sign_up(&client, base, "frank", "", "key").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(resp
        .text()
        .await
        .unwrap()
        .contains("Please fill in both username and password"));

    let resp = sign_up(&client, base, "   ", "pw", "").await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = log_in(&client, base, "frank", "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}
