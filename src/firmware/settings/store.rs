use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, mutex::Mutex};
use embedded_storage::{ReadStorage, Storage};
use esp_storage::FlashStorage;

use super::super::config::{CAPTURE_STORE_RECORD_LEN, NETWORK_STORE_RECORD_LEN};
use super::{CaptureSettings, NetworkSettings};

/// Handlers run on independent worker tasks; the store lives behind one
/// async mutex so flash writes serialize.
pub(crate) type SharedSettingsStore = Mutex<CriticalSectionRawMutex, SettingsStore>;

/// Both persisted records live in the last two flash sectors: network
/// settings in the last, capture settings in the one before it. Each
/// `save` rewrites its whole sector; the erase+program runs under the
/// flash driver's critical section, so a concurrent `read` only ever
/// observes the previous or the new record.
pub(crate) struct SettingsStore {
    flash: FlashStorage<'static>,
    network_offset: u32,
    capture_offset: u32,
}

impl SettingsStore {
    pub(crate) fn new(flash_peripheral: esp_hal::peripherals::FLASH<'static>) -> Self {
        let flash = FlashStorage::new(flash_peripheral).multicore_auto_park();
        let capacity = flash.capacity() as u32;
        let network_offset = capacity.saturating_sub(FlashStorage::SECTOR_SIZE);
        let capture_offset = capacity.saturating_sub(2 * FlashStorage::SECTOR_SIZE);
        Self {
            flash,
            network_offset,
            capture_offset,
        }
    }

    /// Current network record, or the compiled-in defaults until the first
    /// successful save (or after a corrupt record).
    pub(crate) fn network(&mut self) -> NetworkSettings {
        let mut record = [0u8; NETWORK_STORE_RECORD_LEN];
        if self.flash.read(self.network_offset, &mut record).is_err() {
            return NetworkSettings::defaults();
        }
        NetworkSettings::from_record(&record).unwrap_or_else(NetworkSettings::defaults)
    }

    pub(crate) fn save_network(&mut self, settings: &NetworkSettings) {
        if self.network() == *settings {
            return;
        }
        let record = settings.record_bytes();
        let _ = self.flash.write(self.network_offset, &record);
    }

    pub(crate) fn capture(&mut self) -> CaptureSettings {
        let mut record = [0u8; CAPTURE_STORE_RECORD_LEN];
        if self.flash.read(self.capture_offset, &mut record).is_err() {
            return CaptureSettings::defaults();
        }
        CaptureSettings::from_record(&record).unwrap_or_else(CaptureSettings::defaults)
    }

    pub(crate) fn save_capture(&mut self, settings: &CaptureSettings) {
        if self.capture() == *settings {
            return;
        }
        let record = settings.record_bytes();
        let _ = self.flash.write(self.capture_offset, &record);
    }
}
