pub(crate) mod channels;

/// Capacity of every persisted name/credential field (SSID, password,
/// hostname, domain). Matches the fixed-width slots in the flash records.
pub(crate) const NAME_MAX: usize = 31;

pub(crate) const NETWORK_STORE_MAGIC: u32 = 0x4E54_5341; // "ASTN"
pub(crate) const NETWORK_STORE_VERSION: u8 = 1;
pub(crate) const NETWORK_STORE_RECORD_LEN: usize = 147;

pub(crate) const CAPTURE_STORE_MAGIC: u32 = 0x4354_5341; // "ASTC"
pub(crate) const CAPTURE_STORE_VERSION: u8 = 1;
pub(crate) const CAPTURE_STORE_RECORD_LEN: usize = 18;

pub(crate) const HTTP_PORT: u16 = 80;
pub(crate) const HTTP_WORKERS: usize = 4;
pub(crate) const HTTP_RW_BUF: usize = 1024;
pub(crate) const HTTP_HEADER_MAX: usize = 1024;
/// Settings POST bodies are a handful of short flat-JSON lines.
pub(crate) const HTTP_BODY_MAX: usize = 768;
pub(crate) const HTTP_HEADER_READ_TIMEOUT_MS: u64 = 10_000;

pub(crate) const DNS_PORT: u16 = 53;
pub(crate) const DNS_FRAME_MAX: usize = 512;
pub(crate) const DNS_TTL_SECONDS: u32 = 60;
pub(crate) const DNS_NAME_MAX: usize = 128;

pub(crate) const SSE_SESSIONS_MAX: u8 = 2;
pub(crate) const TEMPERATURE_PERIOD_MS: u64 = 3_000;
pub(crate) const BATTERY_PERIOD_MS: u64 = 4_000;

/// Grace delay between acknowledging a network-settings POST and the
/// software reset, so the reply can reach the peer first.
pub(crate) const RESTART_GRACE_MS: u64 = 500;

pub(crate) const AP_CHANNEL: u8 = 6;

pub(crate) const HEAP_BYTES: usize = 96 * 1024;
