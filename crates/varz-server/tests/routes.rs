//! In-process HTTP tests for the greeting and exposition routes.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures_util::future::join_all;
use serde_json::{json, Value};
use tower::ServiceExt;

use varz_core::{MemStats, ProcessRuntime, Registry, RuntimeSource};
use varz_server::app_state::AppState;
use varz_server::config::Config;
use varz_server::router::build_router;

fn app_with(registry: Arc<Registry>, runtime: Arc<dyn RuntimeSource>) -> Router {
    let state = AppState::new(Config::default(), registry, runtime).expect("state");
    build_router(state)
}

fn app() -> Router {
    let runtime = ProcessRuntime::with_cmdline(vec!["varz-server".into()]);
    app_with(Arc::new(Registry::new()), Arc::new(runtime))
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Option<String>, Vec<u8>) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let ctype = resp
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec();
    (status, ctype, body)
}

async fn vars(app: &Router) -> Value {
    let (status, ctype, body) = get(app, "/debug/vars").await;
    assert_eq!(status, StatusCode::OK);
    assert!(ctype.unwrap().starts_with("application/json"));
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn greeting_echoes_user() {
    let app = app();
    let (status, _, body) = get(&app, "/?user=lassie").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"G'day lassie\n");
}

#[tokio::test]
async fn missing_user_degrades_to_empty() {
    let app = app();
    let (status, _, body) = get(&app, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"G'day \n");

    // Duplicate keys fail query parsing; still not an error.
    let (status, _, body) = get(&app, "/?user=a&user=b").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"G'day \n");

    let doc = vars(&app).await;
    assert_eq!(doc["num_calls"], json!(2));
    assert_eq!(doc["last_user"], json!(""));
}

#[tokio::test]
async fn fresh_document_has_initial_values_and_system_keys() {
    let doc = vars(&app()).await;
    let obj = doc.as_object().unwrap();

    let mut keys: Vec<&str> = obj.keys().map(String::as_str).collect();
    keys.sort();
    assert_eq!(keys, vec!["cmdline", "last_user", "memstats", "num_calls"]);

    assert_eq!(doc["num_calls"], json!(0));
    assert_eq!(doc["last_user"], json!(""));
    assert_eq!(doc["cmdline"], json!(["varz-server"]));
    assert!(doc["memstats"]["PauseNs"].is_array());
    assert!(doc["memstats"]["NumGC"].is_u64());
    assert!(doc["memstats"]["BySize"][1]["Mallocs"].is_u64());
}

#[tokio::test]
async fn sequential_calls_are_counted() {
    let app = app();
    for _ in 0..3 {
        let (status, _, _) = get(&app, "/?user=lassie").await;
        assert_eq!(status, StatusCode::OK);
    }

    let doc = vars(&app).await;
    assert_eq!(doc["num_calls"], json!(3));
    assert_eq!(doc["last_user"], json!("lassie"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_calls_are_all_counted() {
    let app = app();
    let users: Vec<String> = (0..100).map(|i| format!("user{i}")).collect();

    let tasks = users.iter().map(|u| {
        let app = app.clone();
        let uri = format!("/?user={u}");
        tokio::spawn(async move { get(&app, &uri).await.0 })
    });
    for status in join_all(tasks).await {
        assert_eq!(status.unwrap(), StatusCode::OK);
    }

    let doc = vars(&app).await;
    assert_eq!(doc["num_calls"], json!(100));

    let last = doc["last_user"].as_str().unwrap();
    let supplied: HashSet<&str> = users.iter().map(String::as_str).collect();
    assert!(supplied.contains(last), "last_user {last:?} was never supplied");
}

#[tokio::test]
async fn exposition_is_idempotent_without_mutation() {
    let app = app();
    get(&app, "/?user=bob").await;

    let mut first = vars(&app).await;
    let mut second = vars(&app).await;
    let first = first.as_object_mut().unwrap();
    let second = second.as_object_mut().unwrap();

    // Runtime figures may move between calls; metric values may not.
    first.remove("memstats");
    second.remove("memstats");
    assert_eq!(first, second);
}

#[tokio::test]
async fn extra_metrics_and_custom_runtime_are_rendered() {
    struct FixedRuntime;

    impl RuntimeSource for FixedRuntime {
        fn mem_stats(&self) -> MemStats {
            MemStats {
                num_gc: 7,
                ..MemStats::default()
            }
        }

        fn cmdline(&self) -> Vec<String> {
            vec!["fixed".into(), "--flag".into()]
        }
    }

    let registry = Arc::new(Registry::new());
    registry.new_float("ratio").unwrap().set(0.5);
    registry.new_map("by_route").unwrap().add("/", 2).unwrap();
    let app = app_with(Arc::clone(&registry), Arc::new(FixedRuntime));

    let doc = vars(&app).await;
    assert_eq!(doc["ratio"], json!(0.5));
    assert_eq!(doc["by_route"], json!({"/": 2}));
    assert_eq!(doc["cmdline"], json!(["fixed", "--flag"]));
    assert_eq!(doc["memstats"]["NumGC"], json!(7));
}

#[test]
fn conflicting_registration_fails_state_build() {
    let registry = Arc::new(Registry::new());
    registry.new_counter("num_calls").unwrap();

    let runtime: Arc<dyn RuntimeSource> = Arc::new(ProcessRuntime::with_cmdline(Vec::new()));
    let err = AppState::new(Config::default(), registry, runtime)
        .err()
        .expect("duplicate num_calls must fail");
    assert_eq!(err.code().as_str(), "DUPLICATE_NAME");
}

#[test]
fn state_exposes_config() {
    let runtime: Arc<dyn RuntimeSource> = Arc::new(ProcessRuntime::with_cmdline(Vec::new()));
    let state = AppState::new(Config::default(), Arc::new(Registry::new()), runtime).unwrap();
    assert_eq!(state.cfg().server.listen, "0.0.0.0:8079");
    assert_eq!(state.registry().len(), 2);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let (status, _, _) = get(&app(), "/debug/varz").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test(flavor = "current_thread")]
async fn exposition_renders_off_the_request_thread() {
    let registry = Arc::new(Registry::new());
    let seen = Arc::new(std::sync::Mutex::new(None));
    let slot = Arc::clone(&seen);
    registry
        .publish_func("render_thread", move || {
            *slot.lock().unwrap() = Some(std::thread::current().id());
            json!("seen")
        })
        .unwrap();
    let app = app_with(registry, Arc::new(ProcessRuntime::with_cmdline(Vec::new())));

    let doc = vars(&app).await;
    assert_eq!(doc["render_thread"], json!("seen"));
    let render_thread = seen.lock().unwrap().expect("func ran");
    assert_ne!(render_thread, std::thread::current().id());
}
