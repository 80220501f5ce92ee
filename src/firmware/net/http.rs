mod helpers;

use embassy_executor::Spawner;
use embassy_net::{tcp::TcpSocket, IpListenEndpoint, Stack};
use embassy_time::{with_timeout, Duration};
use esp_println::println;

use super::super::config::{
    HTTP_BODY_MAX, HTTP_HEADER_MAX, HTTP_HEADER_READ_TIMEOUT_MS, HTTP_PORT, HTTP_RW_BUF,
};
use super::super::settings::SharedSettingsStore;
use super::api;
use helpers::{find_header_end, parse_content_length, parse_request_line, target_path};

pub(super) use helpers::write_reply;

/// One connection at a time per worker; the worker pool provides the
/// concurrency. A worker that serves `/api/stream` stays on that
/// connection until the peer disconnects.
pub(super) async fn run_http_worker(
    stack: Stack<'static>,
    store: &'static SharedSettingsStore,
    spawner: Spawner,
) {
    let mut rx_buffer = [0u8; HTTP_RW_BUF];
    let mut tx_buffer = [0u8; HTTP_RW_BUF];

    stack.wait_config_up().await;

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(Duration::from_secs(20)));

        if let Err(err) = socket
            .accept(IpListenEndpoint {
                addr: None,
                port: HTTP_PORT,
            })
            .await
        {
            println!("http: accept err={:?}", err);
            continue;
        }

        if let Err(err) = handle_connection(&mut socket, store, spawner).await {
            println!("http: request err={}", err);
        }

        let _ = with_timeout(Duration::from_millis(250), socket.flush()).await;
        socket.close();
    }
}

async fn handle_connection(
    socket: &mut TcpSocket<'_>,
    store: &'static SharedSettingsStore,
    spawner: Spawner,
) -> Result<(), &'static str> {
    let mut header_buf = [0u8; HTTP_HEADER_MAX];
    let mut filled = 0usize;
    let header_end = loop {
        if filled == header_buf.len() {
            write_reply(socket, "413 Payload Too Large", "text/plain", "header too large").await;
            return Err("header too large");
        }

        let n = match with_timeout(
            Duration::from_millis(HTTP_HEADER_READ_TIMEOUT_MS),
            socket.read(&mut header_buf[filled..]),
        )
        .await
        {
            Ok(Ok(n)) => n,
            Ok(Err(_)) => return Err("read"),
            Err(_) => {
                write_reply(socket, "408 Request Timeout", "text/plain", "request header timeout")
                    .await;
                return Err("header timeout");
            }
        };
        if n == 0 {
            return Err("eof");
        }
        filled += n;

        if let Some(end) = find_header_end(&header_buf[..filled]) {
            break end;
        }
    };

    let header = core::str::from_utf8(&header_buf[..header_end]).map_err(|_| "header utf8")?;
    let (method, target) = parse_request_line(header).ok_or("bad request line")?;
    let content_length = match parse_content_length(header) {
        Ok(value) => value.unwrap_or(0),
        Err(err) => {
            write_reply(socket, "400 Bad Request", "text/plain", "invalid Content-Length").await;
            return Err(err);
        }
    };

    let mut body_buf = [0u8; HTTP_BODY_MAX];
    if content_length > body_buf.len() {
        write_reply(socket, "413 Payload Too Large", "text/plain", "body too large").await;
        return Err("body too large");
    }
    let body_start = header_end + 4;
    let already = filled.saturating_sub(body_start).min(content_length);
    body_buf[..already].copy_from_slice(&header_buf[body_start..body_start + already]);
    let mut body_len = already;
    while body_len < content_length {
        let n = socket
            .read(&mut body_buf[body_len..content_length])
            .await
            .map_err(|_| "read body")?;
        if n == 0 {
            return Err("incomplete body");
        }
        body_len += n;
    }
    let body = core::str::from_utf8(&body_buf[..body_len]).map_err(|_| "body utf8")?;

    let path = target_path(target);
    if !api::dispatch(socket, method, path, body, store, spawner).await {
        write_reply(socket, "404 Not Found", "text/plain", "not found").await;
    }
    Ok(())
}
