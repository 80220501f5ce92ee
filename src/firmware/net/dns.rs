use embassy_net::{
    udp::{PacketMetadata, UdpSocket},
    Stack,
};
use esp_println::println;
use heapless::String;

use super::super::config::{DNS_FRAME_MAX, DNS_NAME_MAX, DNS_PORT, DNS_TTL_SECONDS};
use super::super::settings::NetworkSettings;

/// Name-resolution policy distilled from the network settings. Queries
/// for the device's own name answer with the primary address; every
/// other name answers with the secondary address when the captive-portal
/// trick is enabled, so client OSes see an "external" host and surface
/// the sign-in page.
struct DnsAuthority {
    hostname: String<DNS_NAME_MAX>,
    fqdn: String<DNS_NAME_MAX>,
    domain_enabled: bool,
    ignore_suffix: bool,
    primary: u32,
    secondary: u32,
}

impl DnsAuthority {
    fn from_settings(settings: &NetworkSettings) -> Self {
        let hostname = lowercase(settings.hostname.as_str());
        let mut fqdn = hostname.clone();
        let domain_enabled = !settings.domain.is_empty();
        if domain_enabled {
            let _ = fqdn.push('.');
            let _ = fqdn.push_str(lowercase(settings.domain.as_str()).as_str());
        }
        Self {
            hostname,
            fqdn,
            domain_enabled,
            ignore_suffix: settings.dns_ignores_network_suffix,
            primary: settings.ip_addr,
            secondary: settings.secondary_addr,
        }
    }

    /// `name` must already be lowercase dotted form.
    fn resolve(&self, name: &str) -> Option<u32> {
        let own = if !self.domain_enabled {
            name == self.hostname
        } else if self.ignore_suffix {
            name == self.hostname || name == self.fqdn
        } else {
            name == self.fqdn
        };
        if own {
            return Some(self.primary);
        }
        (self.secondary != 0).then_some(self.secondary)
    }
}

pub(super) async fn run_dns_server(stack: Stack<'static>, settings: &NetworkSettings) {
    let authority = DnsAuthority::from_settings(settings);

    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; DNS_FRAME_MAX];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0u8; DNS_FRAME_MAX];
    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );
    if socket.bind(DNS_PORT).is_err() {
        println!("dns: bind failed");
        return;
    }
    println!("dns: responder up for \"{}\"", authority.fqdn);

    let mut frame = [0u8; DNS_FRAME_MAX];
    loop {
        let (len, meta) = match socket.recv_from(&mut frame).await {
            Ok(received) => received,
            Err(_) => continue,
        };
        let Some(reply_len) = build_reply(&mut frame, len, &authority) else {
            continue;
        };
        let _ = socket.send_to(&frame[..reply_len], meta).await;
    }
}

/// Rewrites the query in place into a response: either one A record
/// appended after the echoed question, or an NXDOMAIN header. Returns
/// the response length, or `None` for frames not worth answering.
fn build_reply(frame: &mut [u8], len: usize, authority: &DnsAuthority) -> Option<usize> {
    if len < 12 {
        return None;
    }
    let flags = u16::from_be_bytes([frame[2], frame[3]]);
    if flags & 0x8000 != 0 {
        // A response; not ours to answer.
        return None;
    }
    if u16::from_be_bytes([frame[4], frame[5]]) != 1 {
        return None;
    }
    let (name, question_end, qtype, qclass) = parse_question(&frame[..len])?;
    let answer = if qtype == 1 && qclass == 1 {
        authority.resolve(name.as_str())
    } else {
        None
    };

    // QR + AA, keep the requester's RD bit, drop everything else.
    let mut out_flags = 0x8400 | (flags & 0x0100);
    frame[8..12].fill(0);
    match answer {
        Some(addr) => {
            frame[6..8].copy_from_slice(&1u16.to_be_bytes());
            let at = question_end;
            if at + 16 > frame.len() {
                return None;
            }
            frame[at..at + 2].copy_from_slice(&0xC00Cu16.to_be_bytes());
            frame[at + 2..at + 4].copy_from_slice(&1u16.to_be_bytes());
            frame[at + 4..at + 6].copy_from_slice(&1u16.to_be_bytes());
            frame[at + 6..at + 10].copy_from_slice(&DNS_TTL_SECONDS.to_be_bytes());
            frame[at + 10..at + 12].copy_from_slice(&4u16.to_be_bytes());
            frame[at + 12..at + 16].copy_from_slice(&addr.to_le_bytes());
            frame[2..4].copy_from_slice(&out_flags.to_be_bytes());
            Some(at + 16)
        }
        None => {
            out_flags |= 3; // NXDOMAIN
            frame[6..8].fill(0);
            frame[2..4].copy_from_slice(&out_flags.to_be_bytes());
            Some(question_end)
        }
    }
}

/// Reads the single question: lowercase dotted name, offset past
/// QTYPE/QCLASS, and those two fields. Compressed names never appear in
/// questions, so a pointer label rejects the frame.
fn parse_question(frame: &[u8]) -> Option<(String<DNS_NAME_MAX>, usize, u16, u16)> {
    let mut name: String<DNS_NAME_MAX> = String::new();
    let mut at = 12usize;
    loop {
        let label_len = *frame.get(at)? as usize;
        if label_len == 0 {
            at += 1;
            break;
        }
        if label_len > 63 {
            return None;
        }
        let label = frame.get(at + 1..at + 1 + label_len)?;
        if !name.is_empty() {
            name.push('.').ok()?;
        }
        for &byte in label {
            name.push(byte.to_ascii_lowercase() as char).ok()?;
        }
        at += 1 + label_len;
    }
    let qtype = u16::from_be_bytes([*frame.get(at)?, *frame.get(at + 1)?]);
    let qclass = u16::from_be_bytes([*frame.get(at + 2)?, *frame.get(at + 3)?]);
    Some((name, at + 4, qtype, qclass))
}

fn lowercase(text: &str) -> String<DNS_NAME_MAX> {
    let mut out = String::new();
    for byte in text.bytes() {
        let _ = out.push(byte.to_ascii_lowercase() as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authority(ignore_suffix: bool, secondary: u32) -> DnsAuthority {
        let mut settings = NetworkSettings::defaults();
        settings.dns_ignores_network_suffix = ignore_suffix;
        settings.secondary_addr = secondary;
        DnsAuthority::from_settings(&settings)
    }

    fn query_for(name: &[&str]) -> ([u8; DNS_FRAME_MAX], usize) {
        let mut frame = [0u8; DNS_FRAME_MAX];
        frame[0] = 0xAB;
        frame[1] = 0xCD;
        frame[2] = 0x01; // RD
        frame[5] = 1; // one question
        let mut at = 12;
        for label in name {
            frame[at] = label.len() as u8;
            frame[at + 1..at + 1 + label.len()].copy_from_slice(label.as_bytes());
            at += 1 + label.len();
        }
        frame[at] = 0;
        at += 1;
        frame[at + 1] = 1; // QTYPE A
        frame[at + 3] = 1; // QCLASS IN
        (frame, at + 4)
    }

    #[test]
    fn own_hostname_resolves_to_primary() {
        let authority = authority(true, 0);
        assert_eq!(authority.resolve("astrotimer"), Some(authority.primary));
        assert_eq!(authority.resolve("astrotimer.astro.local"), Some(authority.primary));
    }

    #[test]
    fn suffix_required_when_not_ignored() {
        let authority = authority(false, 0);
        assert_eq!(authority.resolve("astrotimer"), None);
        assert_eq!(authority.resolve("astrotimer.astro.local"), Some(authority.primary));
    }

    #[test]
    fn foreign_names_redirect_to_secondary_when_enabled() {
        let secondary = u32::from_le_bytes([10, 100, 10, 1]);
        let authority = authority(true, secondary);
        assert_eq!(authority.resolve("connectivitycheck.example"), Some(secondary));
    }

    #[test]
    fn foreign_names_are_nxdomain_without_secondary() {
        let authority = authority(true, 0);
        assert_eq!(authority.resolve("connectivitycheck.example"), None);
    }

    #[test]
    fn reply_carries_one_a_record() {
        let authority = authority(true, 0);
        let (mut frame, len) = query_for(&["AstroTimer"]);
        let reply_len = build_reply(&mut frame, len, &authority).expect("reply");
        assert_eq!(reply_len, len + 16);
        // Answer count is one, response bit set.
        assert_eq!(frame[2] & 0x80, 0x80);
        assert_eq!(u16::from_be_bytes([frame[6], frame[7]]), 1);
        // The record ends with the primary address, first octet first.
        assert_eq!(&frame[reply_len - 4..reply_len], &authority.primary.to_le_bytes());
    }

    #[test]
    fn unknown_name_yields_nxdomain() {
        let authority = authority(true, 0);
        let (mut frame, len) = query_for(&["elsewhere", "example"]);
        let reply_len = build_reply(&mut frame, len, &authority).expect("reply");
        assert_eq!(reply_len, len);
        assert_eq!(frame[3] & 0x0F, 3);
        assert_eq!(u16::from_be_bytes([frame[6], frame[7]]), 0);
    }

    #[test]
    fn responses_are_ignored() {
        let authority = authority(true, 0);
        let (mut frame, len) = query_for(&["astrotimer"]);
        frame[2] |= 0x80;
        assert!(build_reply(&mut frame, len, &authority).is_none());
    }
}
