use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;
use esp_println::println;

use super::super::super::capture;
use super::super::super::settings::{format_capture_json, parse_capture_body, SharedSettingsStore};
use super::super::http::write_reply;
use super::body_lines;

/// `/api/timer/{start,stop,settings}`. Start and settings-POST share the
/// single-flight claim on the idle phase; stop only raises the
/// cancellation signal and never touches the shutter line itself.
pub(super) async fn handle(
    socket: &mut TcpSocket<'_>,
    method: &str,
    action: &str,
    body: &str,
    store: &'static SharedSettingsStore,
    spawner: Spawner,
) -> bool {
    match action {
        "start" if method == "POST" => {
            start(socket, body, store, spawner).await;
            true
        }
        "stop" if method == "POST" => {
            stop(socket).await;
            true
        }
        "settings" => {
            settings(socket, method, body, store).await;
            true
        }
        _ => false,
    }
}

async fn start(
    socket: &mut TcpSocket<'_>,
    body: &str,
    store: &'static SharedSettingsStore,
    spawner: Spawner,
) {
    if !capture::try_claim_idle() {
        println!("timer: start rejected, busy");
        write_reply(socket, "200 OK", "text/plain", "NOT OK: capture already running").await;
        return;
    }
    let current = store.lock().await.capture();
    match parse_capture_body(body_lines(body), &current) {
        Err(err) => {
            capture::release_claim();
            println!("timer: start rejected, {}", err.message());
            write_reply(socket, "200 OK", "text/plain", err.message()).await;
        }
        Ok(new) => {
            store.lock().await.save_capture(&new);
            capture::commit_running();
            if spawner.spawn(capture::capture_run_task(new)).is_err() {
                capture::finish_run();
                println!("timer: capture task unavailable");
                write_reply(socket, "200 OK", "text/plain", "NOT OK: capture task unavailable")
                    .await;
            } else {
                write_reply(socket, "200 OK", "text/plain", "OK").await;
            }
        }
    }
}

async fn stop(socket: &mut TcpSocket<'_>) {
    if capture::request_stop() {
        write_reply(socket, "200 OK", "text/plain", "OK").await;
    } else {
        println!("timer: stop rejected, nothing running");
        write_reply(socket, "200 OK", "text/plain", "NOT OK: no capture running").await;
    }
}

async fn settings(
    socket: &mut TcpSocket<'_>,
    method: &str,
    body: &str,
    store: &'static SharedSettingsStore,
) {
    if method == "POST" {
        if !capture::try_claim_idle() {
            println!("timer: settings rejected, busy");
            write_reply(socket, "200 OK", "text/plain", "NOT OK: capture already running").await;
            return;
        }
        let current = store.lock().await.capture();
        match parse_capture_body(body_lines(body), &current) {
            Err(err) => {
                capture::release_claim();
                println!("timer: settings rejected, {}", err.message());
                write_reply(socket, "200 OK", "text/plain", err.message()).await;
            }
            Ok(new) => {
                store.lock().await.save_capture(&new);
                capture::release_claim();
                write_reply(socket, "200 OK", "text/plain", "OK").await;
            }
        }
    } else {
        let current = store.lock().await.capture();
        let json = format_capture_json(&current);
        write_reply(socket, "200 OK", "application/json", json.as_str()).await;
    }
}
