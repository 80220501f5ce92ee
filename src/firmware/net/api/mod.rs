mod settings;
mod timer;

use embassy_executor::Spawner;
use embassy_net::tcp::TcpSocket;

use super::super::settings::SharedSettingsStore;
use super::super::telemetry;
use super::http::write_reply;

/// Routes a parsed request to its endpoint. Returns whether the request
/// was handled; logical failures still count as handled and carry their
/// reason in a `200` body, matching what the web UI expects.
pub(super) async fn dispatch(
    socket: &mut TcpSocket<'_>,
    method: &str,
    path: &str,
    body: &str,
    store: &'static SharedSettingsStore,
    spawner: Spawner,
) -> bool {
    if path == "/api/settings" {
        settings::handle(socket, method, body, store).await;
        return true;
    }
    if let Some(action) = path.strip_prefix("/api/timer/") {
        return timer::handle(socket, method, action, body, store, spawner).await;
    }
    if path == "/api/stream" {
        handle_stream(socket, method).await;
        return true;
    }
    false
}

async fn handle_stream(socket: &mut TcpSocket<'_>, method: &str) {
    if method != "GET" {
        write_reply(socket, "405 Method Not Allowed", "text/plain", "stream is GET only").await;
        return;
    }
    if !telemetry::try_acquire_session() {
        write_reply(socket, "503 Service Unavailable", "text/plain", "too many streams").await;
        return;
    }
    telemetry::run_sse_session(socket).await;
    telemetry::release_session();
}

/// The transport delivers POST payloads as one flat JSON object per line.
pub(super) fn body_lines(body: &str) -> impl Iterator<Item = &str> {
    body.split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_lines_strip_carriage_returns_and_blanks() {
        let mut lines = body_lines("{\"a\":1}\r\n\r\n{\"b\":2}\n");
        assert_eq!(lines.next(), Some("{\"a\":1}"));
        assert_eq!(lines.next(), Some("{\"b\":2}"));
        assert_eq!(lines.next(), None);
    }
}
