use embassy_net::tcp::TcpSocket;
use esp_println::println;

use super::super::super::config::channels::RESTART_REQUESTS;
use super::super::super::settings::{format_network_json, parse_network_body, SharedSettingsStore};
use super::super::http::write_reply;
use super::body_lines;

/// `/api/settings`: GET returns the persisted network identity, POST
/// replaces it wholesale and schedules the restart that applies it. A
/// malformed body never touches flash.
pub(super) async fn handle(
    socket: &mut TcpSocket<'_>,
    method: &str,
    body: &str,
    store: &'static SharedSettingsStore,
) {
    if method == "POST" {
        let current = store.lock().await.network();
        match parse_network_body(body_lines(body), &current) {
            Err(err) => {
                println!("settings: rejected, {}", err.message());
                write_reply(socket, "200 OK", "text/plain", err.message()).await;
            }
            Ok(new) => {
                store.lock().await.save_network(&new);
                println!("settings: saved, restart pending");
                write_reply(socket, "200 OK", "text/plain", "OK").await;
                RESTART_REQUESTS.signal(());
            }
        }
    } else {
        let current = store.lock().await.network();
        let json = format_network_json(&current);
        write_reply(socket, "200 OK", "application/json", json.as_str()).await;
    }
}
