use core::fmt::{self, Write};

use heapless::String;

use super::super::config::{
    NAME_MAX, NETWORK_STORE_MAGIC, NETWORK_STORE_RECORD_LEN, NETWORK_STORE_VERSION,
};
use super::super::json::{self, JsonError, JsonResult};
use super::checksum8;

pub(crate) type Name = String<NAME_MAX>;

/// Access-point identity and addressing. Replaced wholesale by a settings
/// POST; applying a change requires a restart because the WiFi/IP stack is
/// configured once at boot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct NetworkSettings {
    pub(crate) ssid: Name,
    /// Empty means an open network.
    pub(crate) password: Name,
    pub(crate) hostname: Name,
    /// Empty means the DNS domain is disabled.
    pub(crate) domain: Name,
    /// Octet `a` of `a.b.c.d` in the low byte, as on the wire.
    pub(crate) ip_addr: u32,
    pub(crate) netmask: u32,
    /// Zero disables the captive-portal redirect target.
    pub(crate) secondary_addr: u32,
    pub(crate) dns_ignores_network_suffix: bool,
}

impl NetworkSettings {
    pub(crate) fn defaults() -> Self {
        Self {
            ssid: name_from(option_env!("ASTROTIMER_SSID").unwrap_or("AstroTimer")),
            password: name_from(option_env!("ASTROTIMER_PASSWORD").unwrap_or("")),
            hostname: name_from("astrotimer"),
            domain: name_from("astro.local"),
            ip_addr: u32::from_le_bytes([172, 24, 1, 1]),
            netmask: u32::from_le_bytes([255, 255, 255, 0]),
            secondary_addr: 0,
            dns_ignores_network_suffix: true,
        }
    }

    pub(crate) fn record_bytes(&self) -> [u8; NETWORK_STORE_RECORD_LEN] {
        let mut record = [0xFFu8; NETWORK_STORE_RECORD_LEN];
        record[0..4].copy_from_slice(&NETWORK_STORE_MAGIC.to_le_bytes());
        record[4] = NETWORK_STORE_VERSION;
        let mut at = 5;
        at = put_name(&mut record, at, &self.ssid);
        at = put_name(&mut record, at, &self.password);
        at = put_name(&mut record, at, &self.hostname);
        at = put_name(&mut record, at, &self.domain);
        record[at..at + 4].copy_from_slice(&self.ip_addr.to_le_bytes());
        record[at + 4..at + 8].copy_from_slice(&self.netmask.to_le_bytes());
        record[at + 8..at + 12].copy_from_slice(&self.secondary_addr.to_le_bytes());
        record[at + 12] = self.dns_ignores_network_suffix as u8;
        record[NETWORK_STORE_RECORD_LEN - 1] = checksum8(&record[..NETWORK_STORE_RECORD_LEN - 1]);
        record
    }

    pub(crate) fn from_record(record: &[u8; NETWORK_STORE_RECORD_LEN]) -> Option<Self> {
        if record.iter().all(|&byte| byte == 0xFF) {
            return None;
        }
        if u32::from_le_bytes([record[0], record[1], record[2], record[3]]) != NETWORK_STORE_MAGIC {
            return None;
        }
        if record[4] != NETWORK_STORE_VERSION {
            return None;
        }
        let expected = checksum8(&record[..NETWORK_STORE_RECORD_LEN - 1]);
        if record[NETWORK_STORE_RECORD_LEN - 1] != expected {
            return None;
        }
        let (ssid, at) = take_name(record, 5)?;
        let (password, at) = take_name(record, at)?;
        let (hostname, at) = take_name(record, at)?;
        let (domain, at) = take_name(record, at)?;
        let ip_addr = read_u32(record, at);
        let netmask = read_u32(record, at + 4);
        let secondary_addr = read_u32(record, at + 8);
        let settings = Self {
            ssid,
            password,
            hostname,
            domain,
            ip_addr,
            netmask,
            secondary_addr,
            dns_ignores_network_suffix: record[at + 12] != 0,
        };
        settings.addressing_valid().then_some(settings)
    }

    fn addressing_valid(&self) -> bool {
        self.ip_addr != 0
            && self.ip_addr != u32::MAX
            && self.netmask != 0
            && self.netmask != u32::MAX
    }
}

/// Parses a settings POST body (one flat JSON object per line) into a
/// prospective record. Pure: a malformed body never reaches flash. The
/// cross-field policy mirrors the submission form: the password, domain
/// and secondary address are only honored when their "use" flag is set,
/// and a set flag requires a usable secondary address.
pub(crate) fn parse_network_body<'a, I>(
    lines: I,
    current: &NetworkSettings,
) -> JsonResult<NetworkSettings>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut next = current.clone();
    let mut has_password = false;
    let mut use_domain = false;
    let mut use_second_ip = false;
    let mut count = 0usize;
    for line in lines {
        count += 1;
        next.ssid = json::get_str(line, "ssid")?;
        has_password = json::get_bool(line, "has_password")?;
        next.password = json::get_str(line, "password")?;
        next.hostname = json::get_str(line, "hostname")?;
        use_domain = json::get_bool(line, "use_domain")?;
        next.domain = json::get_str(line, "domain")?;
        next.ip_addr = json::get_ipv4(line, "ipaddr")?;
        next.netmask = json::get_ipv4(line, "netmask")?;
        use_second_ip = json::get_bool(line, "use_second_ip")?;
        next.secondary_addr = json::get_ipv4(line, "ipaddr2")?;
        next.dns_ignores_network_suffix = json::get_bool(line, "dns_ignores_network_suffix")?;
    }
    if count == 0 {
        return Err(JsonError::Failed);
    }
    if !has_password {
        next.password.clear();
    }
    if !use_domain {
        next.domain.clear();
    }
    if !use_second_ip {
        next.secondary_addr = 0;
    } else if next.secondary_addr == 0 || next.secondary_addr == u32::MAX {
        return Err(JsonError::InvalidType);
    }
    if !next.addressing_valid() {
        return Err(JsonError::InvalidIpAddress);
    }
    Ok(next)
}

pub(crate) fn format_network_json(settings: &NetworkSettings) -> String<512> {
    let mut out = String::new();
    let _ = write!(
        out,
        "{{\"ssid\":\"{}\", \"has_password\":{}, \"password\":\"{}\", \"hostname\":\"{}\", \
         \"use_domain\":{}, \"domain\":\"{}\", \"ipaddr\":\"{}\", \"netmask\":\"{}\", \
         \"use_second_ip\":{}, \"ipaddr2\":\"{}\", \"dns_ignores_network_suffix\":{}}}",
        settings.ssid,
        !settings.password.is_empty(),
        settings.password,
        settings.hostname,
        !settings.domain.is_empty(),
        settings.domain,
        Ipv4Text(settings.ip_addr),
        Ipv4Text(settings.netmask),
        settings.secondary_addr != 0,
        Ipv4Text(settings.secondary_addr),
        settings.dns_ignores_network_suffix,
    );
    out
}

/// Dotted-quad rendering of a packed address.
pub(crate) struct Ipv4Text(pub(crate) u32);

impl fmt::Display for Ipv4Text {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d] = self.0.to_le_bytes();
        write!(f, "{a}.{b}.{c}.{d}")
    }
}

fn name_from(text: &str) -> Name {
    let mut name = Name::new();
    let take = text.len().min(NAME_MAX);
    let _ = name.push_str(&text[..take]);
    name
}

fn put_name(record: &mut [u8], at: usize, name: &Name) -> usize {
    record[at] = name.len() as u8;
    record[at + 1..at + 1 + name.len()].copy_from_slice(name.as_bytes());
    at + 1 + NAME_MAX
}

fn take_name(record: &[u8], at: usize) -> Option<(Name, usize)> {
    let len = record[at] as usize;
    if len > NAME_MAX {
        return None;
    }
    let text = core::str::from_utf8(&record[at + 1..at + 1 + len]).ok()?;
    Some((name_from(text), at + 1 + NAME_MAX))
}

fn read_u32(record: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([record[at], record[at + 1], record[at + 2], record[at + 3]])
}
