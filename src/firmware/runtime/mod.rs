use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};
use esp_hal::{
    gpio::{Level, Output, OutputConfig},
    timer::timg::TimerGroup,
    tsens::{Config as TsensConfig, TemperatureSensor},
};
use esp_println::println;
use static_cell::StaticCell;

use super::capture;
use super::config::channels::RESTART_REQUESTS;
use super::config::{HEAP_BYTES, HTTP_WORKERS, RESTART_GRACE_MS};
use super::net;
use super::settings::{Ipv4Text, SettingsStore, SharedSettingsStore};
use super::telemetry;

pub fn run() -> ! {
    let peripherals = esp_hal::init(esp_hal::Config::default());
    esp_alloc::heap_allocator!(size: HEAP_BYTES);
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let mut store = SettingsStore::new(peripherals.FLASH);
    let network = store.network();
    let capture_settings = store.capture();
    println!(
        "astrotimer: boot ssid=\"{}\" addr={} picture={} exposure_ms={} delay_ms={}",
        network.ssid,
        Ipv4Text(network.ip_addr),
        capture_settings.picture_count,
        capture_settings.exposure_ms,
        capture_settings.delay_ms
    );

    static SETTINGS: StaticCell<SharedSettingsStore> = StaticCell::new();
    let settings_store: &'static SharedSettingsStore = SETTINGS.init(Mutex::new(store));

    capture::install_shutter(Output::new(
        peripherals.GPIO4,
        Level::Low,
        OutputConfig::default(),
    ));

    match TemperatureSensor::new(peripherals.TSENS, TsensConfig::default()) {
        Ok(sensor) => telemetry::install_temperature_sensor(sensor),
        Err(err) => println!("astrotimer: temperature sensor unavailable err={:?}", err),
    }

    let runtime = match net::setup(peripherals.WIFI, &network) {
        Ok(runtime) => runtime,
        Err(err) => {
            println!("astrotimer: {}", err);
            halt_forever();
        }
    };

    let mut executor = esp_rtos::embassy::Executor::new();
    let executor = unsafe { make_static(&mut executor) };
    executor.run(move |spawner| {
        spawner.must_spawn(net::net_task(runtime.net_runner));
        spawner.must_spawn(net::access_point_task(
            runtime.wifi_controller,
            network.clone(),
        ));
        for _ in 0..HTTP_WORKERS {
            spawner.must_spawn(net::http_server_task(runtime.stack, settings_store, spawner));
        }
        spawner.must_spawn(net::dns_server_task(runtime.stack, network));
        spawner.must_spawn(restart_task());
    })
}

/// Consumes the pending-restart transition raised by a network-settings
/// POST. The grace delay lets the `OK` reply reach the peer before the
/// stack disappears.
#[embassy_executor::task]
async fn restart_task() {
    RESTART_REQUESTS.wait().await;
    Timer::after(Duration::from_millis(RESTART_GRACE_MS)).await;
    println!("astrotimer: restarting to apply network settings");
    esp_hal::system::software_reset();
}

fn halt_forever() -> ! {
    loop {
        // No network stack, nothing to serve.
    }
}

unsafe fn make_static<T>(value: &mut T) -> &'static mut T {
    unsafe { core::mem::transmute(value) }
}
