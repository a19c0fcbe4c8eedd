//! Shutdown sequence against a live server
//!
//! Graceful: no connection outlives the grace period, exit status 0.
//! Forced: a client that never hangs up is destroyed once the grace period ends,
//! exit status 1. Either way `on_close` runs exactly once.

use std::io::Read;
use std::net::TcpStream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use routegate::app::App;
use routegate::config::AppConfig;
use routegate::gate::{BaseResponse, HandlerResult, RequestContext};
use routegate::lifecycle::ShutdownOutcome;
use routegate::router::RouteSchemas;

mod common;
use common::http::get;
use common::test_server::{start, wait_until};

fn ok(_ctx: RequestContext) -> HandlerResult {
    Ok(BaseResponse::ok())
}

fn app_with_grace(grace_ms: u64) -> App {
    let mut config = AppConfig::default();
    config.shutdown.grace_ms = grace_ms;
    config.shutdown.poll_ms = 10;
    let mut app = App::new(config);
    app.get("/ping", ok, RouteSchemas::new());
    app
}

fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    (calls, move || {
        seen.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn test_graceful_shutdown_with_no_open_connections() {
    let running = start(app_with_grace(2_000));
    let addr = running.addr();
    assert_eq!(get(&addr, "/ping").status, 200);
    assert!(wait_until(Duration::from_secs(2), || running
        .connections()
        .is_empty()));

    let (calls, on_close) = counter();
    let started = Instant::now();
    let outcome = running.shutdown(on_close);

    assert_eq!(outcome, ShutdownOutcome::Graceful);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Never waited for the grace period.
    assert!(started.elapsed() < Duration::from_millis(1_500));
}

#[test]
fn test_forced_shutdown_destroys_lingering_connections() {
    let running = start(app_with_grace(150));
    let addr = running.addr();
    assert!(wait_until(Duration::from_secs(2), || running
        .connections()
        .is_empty()));

    let mut idle = TcpStream::connect(addr).unwrap();
    assert!(wait_until(Duration::from_secs(2), || running.connections().len()
        == 1));

    let (calls, on_close) = counter();
    let started = Instant::now();
    let outcome = running.shutdown(on_close);

    assert_eq!(outcome, ShutdownOutcome::Forced { destroyed: 1 });
    assert_eq!(outcome.exit_code(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() >= Duration::from_millis(150));

    // The server side of the socket is gone.
    idle.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    let mut buf = [0u8; 16];
    match idle.read(&mut buf) {
        Ok(n) => assert_eq!(n, 0),
        Err(e) => assert_ne!(e.kind(), std::io::ErrorKind::WouldBlock),
    }
}

#[test]
fn test_connection_closing_within_grace_is_graceful() {
    let running = start(app_with_grace(3_000));
    let addr = running.addr();
    assert!(wait_until(Duration::from_secs(2), || running
        .connections()
        .is_empty()));

    let idle = TcpStream::connect(addr).unwrap();
    assert!(wait_until(Duration::from_secs(2), || running.connections().len()
        == 1));
    let closer = std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        drop(idle);
    });

    let (calls, on_close) = counter();
    let outcome = running.shutdown(on_close);
    closer.join().unwrap();

    assert_eq!(outcome, ShutdownOutcome::Graceful);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
