use core::cell::{Cell, RefCell};
use core::sync::atomic::AtomicU8;

use embassy_sync::{
    blocking_mutex::{raw::CriticalSectionRawMutex, Mutex},
    signal::Signal,
};
use esp_hal::gpio::Output;
use esp_hal::tsens::TemperatureSensor;

use super::super::capture::CapturePhase;

/// Single source of truth for the capture state machine. All transitions
/// happen under this mutex; there is no separately tracked task handle.
pub(crate) static CAPTURE_PHASE: Mutex<CriticalSectionRawMutex, Cell<CapturePhase>> =
    Mutex::new(Cell::new(CapturePhase::Idle));

/// Raised by the stop handler, observed by the capture task at every
/// deadline wait. Reset before each run so a stale stop cannot cancel
/// the next one.
pub(crate) static CAPTURE_CANCEL: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// The shutter line. Only the capture task writes it after boot.
pub(crate) static SHUTTER_OUTPUT: Mutex<CriticalSectionRawMutex, RefCell<Option<Output<'static>>>> =
    Mutex::new(RefCell::new(None));

/// Pending-restart transition: the settings handler signals, the restart
/// task performs the reset after a grace delay.
pub(crate) static RESTART_REQUESTS: Signal<CriticalSectionRawMutex, ()> = Signal::new();

pub(crate) static TEMPERATURE_SENSOR: Mutex<
    CriticalSectionRawMutex,
    RefCell<Option<TemperatureSensor<'static>>>,
> = Mutex::new(RefCell::new(None));

pub(crate) static SSE_SESSIONS: AtomicU8 = AtomicU8::new(0);
