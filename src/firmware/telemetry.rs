use core::fmt::Write as _;
use core::sync::atomic::Ordering;

use embassy_net::tcp::TcpSocket;
use embassy_time::{Duration, Instant, Timer};
use embedded_io_async::Write;
use esp_hal::tsens::TemperatureSensor;
use esp_println::println;
use heapless::String;

use super::config::channels::{SSE_SESSIONS, TEMPERATURE_SENSOR};
use super::config::{BATTERY_PERIOD_MS, SSE_SESSIONS_MAX, TEMPERATURE_PERIOD_MS};

const SSE_PREAMBLE: &[u8] = b"HTTP/1.0 200 OK\r\n\
Content-Type: text/event-stream\r\n\
Cache-Control: no-cache\r\n\
Connection: close\r\n\r\n";

pub(crate) fn install_temperature_sensor(sensor: TemperatureSensor<'static>) {
    TEMPERATURE_SENSOR.lock(|cell| {
        cell.borrow_mut().replace(sensor);
    });
}

/// Bounded SSE sessions so streams cannot starve the API workers.
pub(crate) fn try_acquire_session() -> bool {
    SSE_SESSIONS
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            (count < SSE_SESSIONS_MAX).then(|| count + 1)
        })
        .is_ok()
}

pub(crate) fn release_session() {
    SSE_SESSIONS.fetch_sub(1, Ordering::AcqRel);
}

/// Emits temperature and battery frames on their own absolute-deadline
/// cadences until a write fails (the only disconnect signal an SSE peer
/// gives us). The caller releases the session slot and the socket.
pub(crate) async fn run_sse_session(socket: &mut TcpSocket<'_>) {
    if socket.write_all(SSE_PREAMBLE).await.is_err() {
        return;
    }
    println!("stream: session open");
    let start = Instant::now();
    let mut temperature_deadline = start + Duration::from_millis(TEMPERATURE_PERIOD_MS);
    let mut battery_deadline = start + Duration::from_millis(BATTERY_PERIOD_MS);
    loop {
        let temperature_next = temperature_deadline <= battery_deadline;
        let deadline = if temperature_next {
            temperature_deadline
        } else {
            battery_deadline
        };
        Timer::at(deadline).await;
        let sent = if temperature_next {
            temperature_deadline += Duration::from_millis(TEMPERATURE_PERIOD_MS);
            let frame = format_temperature_frame(read_temperature_celsius());
            socket.write_all(frame.as_bytes()).await
        } else {
            battery_deadline += Duration::from_millis(BATTERY_PERIOD_MS);
            let frame = format_battery_frame(battery_percent());
            socket.write_all(frame.as_bytes()).await
        };
        if sent.is_err() || socket.flush().await.is_err() {
            println!("stream: peer gone");
            return;
        }
    }
}

fn read_temperature_celsius() -> f32 {
    TEMPERATURE_SENSOR.lock(|cell| {
        cell.borrow()
            .as_ref()
            .map(|sensor| sensor.get_temperature().to_celsius())
            .unwrap_or(0.0)
    })
}

fn battery_percent() -> u32 {
    // No battery sense divider on this board revision; report a slow
    // synthetic ramp so the UI has something to plot.
    let minutes = Instant::now().as_secs() / 60;
    100 - (minutes % 96) as u32
}

fn format_temperature_frame(celsius: f32) -> String<96> {
    let mut out = String::new();
    let _ = write!(
        out,
        "event: Temperature\ndata: {{\"temperature\": {celsius:.1}}}\n\n"
    );
    out
}

fn format_battery_frame(percent: u32) -> String<64> {
    let mut out = String::new();
    let _ = write!(out, "event: Battery\ndata: {{\"battery\": {percent}}}\n\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_frame_is_sse_shaped() {
        let frame = format_temperature_frame(23.5);
        assert_eq!(
            frame.as_str(),
            "event: Temperature\ndata: {\"temperature\": 23.5}\n\n"
        );
    }

    #[test]
    fn battery_frame_is_sse_shaped() {
        let frame = format_battery_frame(87);
        assert_eq!(frame.as_str(), "event: Battery\ndata: {\"battery\": 87}\n\n");
    }

    #[test]
    fn frames_end_with_a_blank_line() {
        assert!(format_temperature_frame(0.0).ends_with("\n\n"));
        assert!(format_battery_frame(0).ends_with("\n\n"));
    }
}
