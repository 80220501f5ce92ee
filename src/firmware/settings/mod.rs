mod capture;
mod network;
mod store;

pub(crate) use capture::{format_capture_json, parse_capture_body, CaptureSettings};
pub(crate) use network::{format_network_json, parse_network_body, Ipv4Text, NetworkSettings};
pub(crate) use store::{SettingsStore, SharedSettingsStore};

pub(crate) fn checksum8(bytes: &[u8]) -> u8 {
    let mut acc = 0x5Au8;
    for &byte in bytes {
        acc ^= byte.rotate_left(1);
    }
    acc
}
