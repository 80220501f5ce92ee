use embassy_net::tcp::TcpSocket;
use embedded_io_async::Write;

pub(super) fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|window| window == b"\r\n\r\n")
}

pub(super) fn parse_request_line(header: &str) -> Option<(&str, &str)> {
    let first_line = header.lines().next()?;
    let mut parts = first_line.split_ascii_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    let _version = parts.next()?;
    Some((method, target))
}

pub(super) fn parse_content_length(header: &str) -> Result<Option<usize>, &'static str> {
    let mut content_length = None;

    for line in header.lines().skip(1) {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };

        if !name.eq_ignore_ascii_case("content-length") {
            continue;
        }

        let parsed = value
            .trim()
            .parse::<usize>()
            .map_err(|_| "invalid content-length")?;

        if content_length.is_some() {
            return Err("duplicate content-length");
        }

        content_length = Some(parsed);
    }

    Ok(content_length)
}

pub(super) fn target_path(target: &str) -> &str {
    target.split('?').next().unwrap_or(target)
}

pub(crate) async fn write_reply(
    socket: &mut TcpSocket<'_>,
    status: &str,
    content_type: &str,
    body: &str,
) {
    let mut content_length = [0u8; 20];
    let mut idx = content_length.len();
    let mut remaining = body.len();
    loop {
        idx -= 1;
        content_length[idx] = b'0' + (remaining % 10) as u8;
        remaining /= 10;
        if remaining == 0 {
            break;
        }
    }

    let _ = socket.write_all(b"HTTP/1.0 ").await;
    let _ = socket.write_all(status.as_bytes()).await;
    let _ = socket.write_all(b"\r\nContent-Type: ").await;
    let _ = socket.write_all(content_type.as_bytes()).await;
    let _ = socket
        .write_all(b"\r\nConnection: close\r\nContent-Length: ")
        .await;
    let _ = socket.write_all(&content_length[idx..]).await;
    let _ = socket.write_all(b"\r\n\r\n").await;
    let _ = socket.write_all(body.as_bytes()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_header_terminator() {
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\nHost: x\r\n\r\nbody"), Some(23));
        assert_eq!(find_header_end(b"GET / HTTP/1.1\r\nHost: x"), None);
    }

    #[test]
    fn parses_request_line() {
        let header = "POST /api/timer/start HTTP/1.1\r\nHost: astrotimer";
        assert_eq!(parse_request_line(header), Some(("POST", "/api/timer/start")));
    }

    #[test]
    fn rejects_short_request_line() {
        assert_eq!(parse_request_line("GET /\r\n"), None);
    }

    #[test]
    fn parses_content_length_case_insensitively() {
        let header = "POST / HTTP/1.1\r\ncontent-LENGTH: 42\r\n";
        assert_eq!(parse_content_length(header), Ok(Some(42)));
    }

    #[test]
    fn missing_content_length_is_none() {
        assert_eq!(parse_content_length("GET / HTTP/1.1\r\nHost: x\r\n"), Ok(None));
    }

    #[test]
    fn duplicate_content_length_is_an_error() {
        let header = "POST / HTTP/1.1\r\nContent-Length: 1\r\nContent-Length: 2\r\n";
        assert!(parse_content_length(header).is_err());
    }

    #[test]
    fn strips_query_from_target() {
        assert_eq!(target_path("/api/stream?x=1"), "/api/stream");
        assert_eq!(target_path("/api/stream"), "/api/stream");
    }
}
