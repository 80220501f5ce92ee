mod api;
mod dns;
mod http;
mod wifi;

use embassy_executor::Spawner;
use embassy_net::{Runner, Stack, StackResources};
use esp_hal::rng::Rng;
use esp_radio::wifi::{WifiController, WifiDevice};
use static_cell::StaticCell;

use super::config::HTTP_WORKERS;
use super::settings::{NetworkSettings, SharedSettingsStore};

pub(crate) struct NetRuntime {
    pub(crate) wifi_controller: WifiController<'static>,
    pub(crate) net_runner: Runner<'static, WifiDevice<'static>>,
    pub(crate) stack: Stack<'static>,
}

pub(crate) fn setup(
    wifi: esp_hal::peripherals::WIFI<'static>,
    settings: &NetworkSettings,
) -> Result<NetRuntime, &'static str> {
    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STACK_RESOURCES: StaticCell<StackResources<8>> = StaticCell::new();

    let radio_ctrl = esp_radio::init().map_err(|err| {
        esp_println::println!("net: esp_radio::init err={:?}", err);
        "net: esp_radio::init failed"
    })?;
    let radio_ctrl = RADIO_CTRL.init(radio_ctrl);
    let (wifi_controller, ifaces) =
        esp_radio::wifi::new(radio_ctrl, wifi, wifi::wifi_runtime_config())
            .map_err(|_| "net: wifi init failed")?;

    let rng = Rng::new();
    let seed = (rng.random() as u64) << 32 | rng.random() as u64;

    let (stack, net_runner) = embassy_net::new(
        ifaces.ap,
        static_v4_config(settings),
        STACK_RESOURCES.init(StackResources::<8>::new()),
        seed,
    );

    Ok(NetRuntime {
        wifi_controller,
        net_runner,
        stack,
    })
}

/// The device is the network: its address and mask come straight from the
/// persisted settings, no DHCP client involved.
fn static_v4_config(settings: &NetworkSettings) -> embassy_net::Config {
    let [a, b, c, d] = settings.ip_addr.to_le_bytes();
    let address = embassy_net::Ipv4Address::new(a, b, c, d);
    let prefix = settings.netmask.count_ones() as u8;
    embassy_net::Config::ipv4_static(embassy_net::StaticConfigV4 {
        address: embassy_net::Ipv4Cidr::new(address, prefix),
        gateway: None,
        dns_servers: heapless::Vec::new(),
    })
}

#[embassy_executor::task]
pub(crate) async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

#[embassy_executor::task]
pub(crate) async fn access_point_task(
    controller: WifiController<'static>,
    settings: NetworkSettings,
) {
    wifi::run_access_point(controller, settings).await;
}

#[embassy_executor::task(pool_size = HTTP_WORKERS)]
pub(crate) async fn http_server_task(
    stack: Stack<'static>,
    store: &'static SharedSettingsStore,
    spawner: Spawner,
) {
    http::run_http_worker(stack, store, spawner).await;
}

#[embassy_executor::task]
pub(crate) async fn dns_server_task(stack: Stack<'static>, settings: NetworkSettings) {
    dns::run_dns_server(stack, &settings).await;
}
