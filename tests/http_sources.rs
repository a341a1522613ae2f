use std::fs;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use cfb_predictions::error::{ReconcileError, ScheduleError};
use cfb_predictions::http_cache::HttpCache;
use cfb_predictions::model::{GameRequest, ScheduleStatus};
use cfb_predictions::predictor::{HttpPredictor, Predictor};
use cfb_predictions::reconcile::PredictionReconciler;
use cfb_predictions::schedule::{HttpScheduleSource, ScheduleSource};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

struct Reply {
    status: u16,
    headers: Vec<(&'static str, &'static str)>,
    body: String,
}

impl Reply {
    fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    fn header(mut self, name: &'static str, value: &'static str) -> Self {
        self.headers.push((name, value));
        self
    }
}

/// Answers one connection per reply, in order, and hands back each raw request.
fn serve(replies: Vec<Reply>) -> (String, mpsc::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for reply in replies {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let request = read_request(&mut stream);
            let _ = tx.send(request);

            let reason = match reply.status {
                200 => "OK",
                304 => "Not Modified",
                404 => "Not Found",
                500 => "Internal Server Error",
                _ => "Status",
            };
            let mut head = format!(
                "HTTP/1.1 {} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
                reply.status,
                reply.body.len()
            );
            for (name, value) in &reply.headers {
                head.push_str(&format!("{name}: {value}\r\n"));
            }
            head.push_str("\r\n");
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(reply.body.as_bytes());
            let _ = stream.flush();
        }
    });
    (format!("http://{addr}"), rx)
}

fn read_request(stream: &mut TcpStream) -> String {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let mut expected = None;
    loop {
        if let Some(total) = expected {
            if buf.len() >= total {
                break;
            }
        }
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if expected.is_none() {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let body_len = head
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                expected = Some(end + 4 + body_len);
            }
        }
    }
    String::from_utf8_lossy(&buf).to_string()
}

fn private_cache() -> (tempfile::TempDir, Arc<HttpCache>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let cache = Arc::new(HttpCache::new(Some(dir.path().join("http_cache.json"))));
    (dir, cache)
}

fn request() -> GameRequest {
    GameRequest::new(2025, "LSU", "UCLA").expect("valid request")
}

#[test]
fn schedule_404_is_not_found() {
    let (base, requests) = serve(vec![Reply::new(404, "not here")]);
    let (_dir, cache) = private_cache();
    let source = HttpScheduleSource::new(format!("{base}/schedules"), 5).with_cache(cache);

    let err = source.load_season(2031).expect_err("missing season");
    assert_eq!(err, ScheduleError::NotFound(2031));

    let seen = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(seen.starts_with("GET /schedules/2031.json "), "{seen}");
}

#[test]
fn schedule_500_is_unreachable() {
    let (base, _requests) = serve(vec![Reply::new(500, "boom")]);
    let (_dir, cache) = private_cache();
    let source = HttpScheduleSource::new(base, 5).with_cache(cache);

    match source.load_season(2025) {
        Err(ScheduleError::Unreachable(reason)) => assert!(reason.contains("500"), "{reason}"),
        other => panic!("expected unreachable, got {other:?}"),
    }
}

#[test]
fn schedule_revalidates_with_etag() {
    let schedule = read_fixture("schedule_2025.json");
    let (base, requests) = serve(vec![
        Reply::new(200, schedule).header("ETag", "\"v1\""),
        Reply::new(304, ""),
    ]);
    let (_dir, cache) = private_cache();
    let source = HttpScheduleSource::new(base, 5).with_cache(cache);

    let first = source.load_season(2025).expect("fresh body");
    let second = source.load_season(2025).expect("body from cache");
    assert_eq!(first, second);
    assert_eq!(first.games.len(), 4);

    let _ = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    let revalidation = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(
        revalidation.to_lowercase().contains("if-none-match: \"v1\""),
        "{revalidation}"
    );
}

#[test]
fn predictor_500_is_unavailable() {
    let (base, requests) = serve(vec![Reply::new(500, "engine down")]);
    let predictor = HttpPredictor::new(base, Some("secret".to_string()), 5);

    let err = predictor.predict(&request()).expect_err("5xx is fatal");
    assert_eq!(
        err,
        ReconcileError::PredictionUnavailable("HTTP 500: engine down".to_string())
    );

    let seen = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    let lower = seen.to_lowercase();
    assert!(seen.starts_with("POST /predict "), "{seen}");
    assert!(lower.contains("authorization: bearer secret"), "{seen}");
    assert!(lower.contains("x-client:"), "{seen}");
    assert!(seen.contains("\"homeTeam\":\"LSU\""), "{seen}");
}

#[test]
fn live_prediction_with_missing_schedule_is_unknown() {
    let (predict_base, _p) = serve(vec![Reply::new(200, read_fixture("predict_response.json"))]);
    let (schedule_base, _s) = serve(vec![Reply::new(404, "")]);
    let (_dir, cache) = private_cache();

    let reconciler = PredictionReconciler::new(
        HttpPredictor::new(predict_base, None, 5),
        HttpScheduleSource::new(schedule_base, 5).with_cache(cache),
    );
    let result = reconciler.reconcile(&request()).expect("prediction available");
    assert_eq!(result.schedule_status, ScheduleStatus::Unknown);
    assert_eq!(result.predicted.home_points, 24.4);
    assert!(result.actual.is_none());
    assert!(result.deltas.is_none());
}

#[test]
fn live_prediction_against_final_game() {
    let (predict_base, _p) = serve(vec![Reply::new(200, read_fixture("predict_response.json"))]);
    let (schedule_base, _s) = serve(vec![Reply::new(200, read_fixture("schedule_2025.json"))]);
    let (_dir, cache) = private_cache();

    let reconciler = PredictionReconciler::new(
        HttpPredictor::new(predict_base, None, 5),
        HttpScheduleSource::new(schedule_base, 5).with_cache(cache),
    );
    let result = reconciler.reconcile(&request()).expect("prediction available");
    assert_eq!(result.schedule_status, ScheduleStatus::ScheduledFinal);
    let actual = result.actual.expect("final game has actuals");
    assert_eq!(actual.home_points, Some(30.0));
    assert_eq!(actual.away_points, Some(20.0));
}

#[test]
fn health_check_reports_status_and_reason() {
    let (base, requests) = serve(vec![Reply::new(200, "{}"), Reply::new(503, "")]);
    let predictor = HttpPredictor::new(base, None, 5);
    assert!(predictor.health_check().expect("engine reachable"));
    assert!(!predictor.health_check().expect("engine reachable"));
    let seen = requests.recv_timeout(Duration::from_secs(5)).unwrap();
    assert!(seen.starts_with("GET /health "), "{seen}");

    let closed = TcpListener::bind("127.0.0.1:0").expect("bind local port");
    let addr = closed.local_addr().unwrap();
    drop(closed);
    let offline = HttpPredictor::new(format!("http://{addr}"), None, 5);
    let err = offline.health_check().expect_err("nothing listening");
    assert!(format!("{err:#}").contains("/health"), "{err:#}");
}
