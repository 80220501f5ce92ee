use core::fmt::Write;

use heapless::String;

use super::super::config::{
    CAPTURE_STORE_MAGIC, CAPTURE_STORE_RECORD_LEN, CAPTURE_STORE_VERSION,
};
use super::super::json::{self, JsonError, JsonResult};
use super::checksum8;

/// Parameters of a capture run. Milliseconds internally, float seconds on
/// the wire. Takes effect on the next run, no restart needed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct CaptureSettings {
    pub(crate) picture_count: u32,
    pub(crate) exposure_ms: u32,
    pub(crate) delay_ms: u32,
}

impl CaptureSettings {
    pub(crate) fn defaults() -> Self {
        Self {
            picture_count: 3,
            exposure_ms: 2000,
            delay_ms: 1000,
        }
    }

    pub(crate) fn record_bytes(&self) -> [u8; CAPTURE_STORE_RECORD_LEN] {
        let mut record = [0xFFu8; CAPTURE_STORE_RECORD_LEN];
        record[0..4].copy_from_slice(&CAPTURE_STORE_MAGIC.to_le_bytes());
        record[4] = CAPTURE_STORE_VERSION;
        record[5..9].copy_from_slice(&self.picture_count.to_le_bytes());
        record[9..13].copy_from_slice(&self.exposure_ms.to_le_bytes());
        record[13..17].copy_from_slice(&self.delay_ms.to_le_bytes());
        record[CAPTURE_STORE_RECORD_LEN - 1] = checksum8(&record[..CAPTURE_STORE_RECORD_LEN - 1]);
        record
    }

    pub(crate) fn from_record(record: &[u8; CAPTURE_STORE_RECORD_LEN]) -> Option<Self> {
        if record.iter().all(|&byte| byte == 0xFF) {
            return None;
        }
        if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != CAPTURE_STORE_MAGIC {
            return None;
        }
        if record[4] != CAPTURE_STORE_VERSION {
            return None;
        }
        let expected = checksum8(&record[..CAPTURE_STORE_RECORD_LEN - 1]);
        if record[CAPTURE_STORE_RECORD_LEN - 1] != expected {
            return None;
        }
        let settings = Self {
            picture_count: u32::from_le_bytes([record[5], record[6], record[7], record[8]]),
            exposure_ms: u32::from_le_bytes([record[9], record[10], record[11], record[12]]),
            delay_ms: u32::from_le_bytes([record[13], record[14], record[15], record[16]]),
        };
        (settings.picture_count >= 1 && settings.exposure_ms > 0).then_some(settings)
    }
}

/// Parses a timer POST body (one flat JSON object per line). Pure; range
/// violations reject before anything is persisted. A zero delay is legal
/// (back-to-back exposures).
pub(crate) fn parse_capture_body<'a, I>(
    lines: I,
    current: &CaptureSettings,
) -> JsonResult<CaptureSettings>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut next = *current;
    let mut count = 0usize;
    for line in lines {
        count += 1;
        next.picture_count = json::get_u32(line, "picture")?;
        next.exposure_ms = json::get_millis(line, "exposure")?;
        next.delay_ms = json::get_millis(line, "delay")?;
    }
    if count == 0 {
        return Err(JsonError::Failed);
    }
    if next.picture_count == 0 {
        return Err(JsonError::InvalidInteger);
    }
    if next.exposure_ms == 0 {
        return Err(JsonError::InvalidFloat);
    }
    Ok(next)
}

/// Seconds with two decimals on the wire, like the capture form expects.
pub(crate) fn format_capture_json(settings: &CaptureSettings) -> String<96> {
    let mut out = String::new();
    let _ = write!(
        out,
        "{{\"picture\":{},\"exposure\":{}.{:02},\"delay\":{}.{:02}}}",
        settings.picture_count,
        settings.exposure_ms / 1000,
        (settings.exposure_ms % 1000) / 10,
        settings.delay_ms / 1000,
        (settings.delay_ms % 1000) / 10,
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_roundtrip() {
        let settings = CaptureSettings {
            picture_count: 12,
            exposure_ms: 30_000,
            delay_ms: 0,
        };
        let record = settings.record_bytes();
        assert_eq!(CaptureSettings::from_record(&record), Some(settings));
    }

    #[test]
    fn record_rejects_zero_exposure() {
        let settings = CaptureSettings {
            picture_count: 1,
            exposure_ms: 0,
            delay_ms: 0,
        };
        let record = settings.record_bytes();
        assert!(CaptureSettings::from_record(&record).is_none());
    }

    #[test]
    fn format_then_parse_is_identity() {
        let settings = CaptureSettings {
            picture_count: 5,
            exposure_ms: 2500,
            delay_ms: 1000,
        };
        let text = format_capture_json(&settings);
        assert_eq!(text.as_str(), "{\"picture\":5,\"exposure\":2.50,\"delay\":1.00}");
        let reparsed = parse_capture_body([text.as_str()], &CaptureSettings::defaults());
        assert_eq!(reparsed, Ok(settings));
    }

    #[test]
    fn parse_accepts_zero_delay() {
        let parsed = parse_capture_body(
            ["{\"picture\":2,\"exposure\":1.5,\"delay\":0}"],
            &CaptureSettings::defaults(),
        )
        .expect("parse");
        assert_eq!(parsed.delay_ms, 0);
    }

    #[test]
    fn parse_rejects_zero_pictures() {
        assert_eq!(
            parse_capture_body(
                ["{\"picture\":0,\"exposure\":1.5,\"delay\":0}"],
                &CaptureSettings::defaults(),
            ),
            Err(JsonError::InvalidInteger)
        );
    }

    #[test]
    fn parse_rejects_zero_exposure() {
        assert_eq!(
            parse_capture_body(
                ["{\"picture\":3,\"exposure\":0,\"delay\":1}"],
                &CaptureSettings::defaults(),
            ),
            Err(JsonError::InvalidFloat)
        );
    }

    #[test]
    fn parse_rejects_empty_body() {
        let lines: [&str; 0] = [];
        assert_eq!(
            parse_capture_body(lines, &CaptureSettings::defaults()),
            Err(JsonError::Failed)
        );
    }

    #[test]
    fn last_line_wins() {
        let parsed = parse_capture_body(
            [
                "{\"picture\":2,\"exposure\":1,\"delay\":0}",
                "{\"picture\":7,\"exposure\":4,\"delay\":0.5}",
            ],
            &CaptureSettings::defaults(),
        )
        .expect("parse");
        assert_eq!(parsed.picture_count, 7);
        assert_eq!(parsed.exposure_ms, 4000);
        assert_eq!(parsed.delay_ms, 500);
    }
}
