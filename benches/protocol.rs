//! Protocol benchmark suite.
//!
//! Benchmarks the hot paths of every message exchange:
//! - Inbound classification (`parse_rpc_object`)
//! - Outbound validation (`validate_request`)
//! - A full iframe round trip through a `Session`
//!
//! Run with: cargo bench --bench protocol
//! Results saved to: target/criterion/
//!
//! Set `RUST_LOG=account_chooser_relay=trace` to watch the session log.

use std::hint::black_box;

use account_chooser_relay::protocol::{CLIENT_INBOUND_KINDS, parse_rpc_object};
use account_chooser_relay::transport::popup_features;
use account_chooser_relay::validation::validate_request;
use account_chooser_relay::{
    Account, ClientBuilder, ClientConfig, ClientRequest, FrameHandle, Host, HostEvent,
    IframeSpec, MessageTarget, PopupHandle, ServerSpec,
};
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Configuration
// ============================================================================

const DOMAIN: &str = "https://ac.test";
const ORIGIN: &str = "site.com";
const ACCOUNT_COUNTS: &[usize] = &[1, 10, 100];

/// Initialize tracing/logging from `RUST_LOG`.
fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init();
}

// ============================================================================
// Host
// ============================================================================

/// A host that accepts everything and records nothing.
struct NullHost;

impl Host for NullHost {
    fn post_message(&self, _target: MessageTarget, message: &str, _target_origin: &str) {
        black_box(message);
    }

    fn create_iframe(&self, _spec: &IframeSpec) -> FrameHandle {
        FrameHandle::new(1)
    }

    fn remove_iframe(&self, _frame: FrameHandle) {}

    fn open_popup(&self, _url: &str, _name: &str, features: &str) -> Option<PopupHandle> {
        black_box(features);
        Some(PopupHandle::new(2))
    }

    fn focus_popup(&self, _popup: PopupHandle) {}

    fn navigate_popup(&self, _popup: PopupHandle, _url: &str) {}

    fn close_popup(&self, _popup: PopupHandle) {}

    fn is_popup_closed(&self, _popup: PopupHandle) -> bool {
        false
    }

    fn navigate_top(&self, _url: &str) {}

    fn current_url(&self) -> String {
        format!("https://{ORIGIN}/login")
    }

    fn viewport_size(&self) -> (u32, u32) {
        (1280, 800)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn accounts(count: usize) -> Vec<Account> {
    (0..count)
        .map(|i| {
            Account::new(format!("user{i}@example.com"))
                .with_display_name(format!("<b>User</b> {i}"))
                .with_photo_url(format!("https://{ORIGIN}/photo/{i}.png"))
        })
        .collect()
}

fn store_request(count: usize) -> ClientRequest {
    let config = ClientConfig {
        client_callback_url: Some(format!("https://{ORIGIN}/callback")),
        keep_popup: Some(false),
        language: Some("zh-HK".to_string()),
        ..Default::default()
    };
    ClientRequest::store("store", accounts(count), config).expect("valid store request")
}

fn inbound_messages() -> Vec<(&'static str, Value)> {
    vec![
        (
            "response",
            json!({"jsonrpc": "2.0", "id": "select", "result": {"email": "a@b.com"}}),
        ),
        (
            "error",
            json!({"jsonrpc": "2.0", "id": "select", "error": {"code": -32000, "message": "x"}}),
        ),
        (
            "ack",
            json!({"jsonrpc": "2.0", "method": "requestAckNotification", "params": {"requestId": "store"}}),
        ),
        (
            "unknown",
            json!({"jsonrpc": "2.0", "method": "somethingElse"}),
        ),
    ]
}

// ============================================================================
// Benchmark: Inbound Parsing
// ============================================================================

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_rpc_object");

    for (name, raw) in inbound_messages() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &raw, |b, raw| {
            b.iter(|| parse_rpc_object(black_box(raw), &CLIENT_INBOUND_KINDS));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Outbound Validation
// ============================================================================

fn bench_validate(c: &mut Criterion) {
    let mut group = c.benchmark_group("validate_request");

    for &count in ACCOUNT_COUNTS {
        let request = store_request(count);
        group.bench_with_input(BenchmarkId::new("store", count), &request, |b, request| {
            b.iter(|| validate_request(black_box(request.clone()), ORIGIN));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Session Round Trip
// ============================================================================

fn bench_session(c: &mut Criterion) {
    init_logging();

    let mut session = ClientBuilder::new()
        .server_spec(ServerSpec::for_domain(DOMAIN))
        .handler(|object| {
            black_box(object);
        })
        .build_session(NullHost)
        .expect("session");
    session.handle_event(HostEvent::FrameLoaded(FrameHandle::new(1)));

    let request = store_request(10);
    let response = json!({"jsonrpc": "2.0", "id": "store", "result": {"stored": 10}}).to_string();

    c.bench_function("session_round_trip", |b| {
        b.iter(|| {
            session
                .call_server(black_box(request.clone()))
                .expect("valid request");
            session.handle_message(DOMAIN, black_box(&response));
        });
    });

    c.bench_function("popup_features", |b| {
        b.iter(|| popup_features(black_box(520), black_box(550), black_box((1280, 800))));
    });
}

criterion_group!(benches, bench_parse, bench_validate, bench_session);
criterion_main!(benches);
