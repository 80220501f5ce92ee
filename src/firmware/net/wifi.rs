use esp_println::println;
use esp_radio::wifi::{
    ApConfig, AuthMethod, Config as WifiRuntimeConfig, ModeConfig, WifiController, WifiEvent,
};

use super::super::config::AP_CHANNEL;
use super::super::settings::{Ipv4Text, NetworkSettings};

pub(super) fn wifi_runtime_config() -> WifiRuntimeConfig {
    WifiRuntimeConfig::default()
}

/// Brings the softAP up from the persisted identity and keeps it up.
/// Network settings are not hot-reconfigurable; changes arrive here only
/// through the restart path.
pub(super) async fn run_access_point(
    mut controller: WifiController<'static>,
    settings: NetworkSettings,
) {
    let auth_method = if settings.password.is_empty() {
        AuthMethod::None
    } else {
        AuthMethod::Wpa2Personal
    };
    let ap = ApConfig::default()
        .with_ssid(settings.ssid.as_str().into())
        .with_password(settings.password.as_str().into())
        .with_auth_method(auth_method)
        .with_channel(AP_CHANNEL);

    if let Err(err) = controller.set_config(&ModeConfig::Ap(ap)) {
        println!("net: ap config err={:?}", err);
        return;
    }
    if let Err(err) = controller.start_async().await {
        println!("net: ap start err={:?}", err);
        return;
    }
    println!(
        "net: ap \"{}\" up at {}",
        settings.ssid,
        Ipv4Text(settings.ip_addr)
    );

    loop {
        controller.wait_for_event(WifiEvent::ApStaconnected).await;
        println!("net: station joined");
    }
}
