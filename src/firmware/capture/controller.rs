use esp_hal::gpio::Output;

use super::super::config::channels::{CAPTURE_CANCEL, CAPTURE_PHASE, SHUTTER_OUTPUT};

/// The whole capture life cycle in one value. `Starting` doubles as the
/// single-flight token while a start or settings-update request is being
/// processed, so "another request is in flight" and "a run is active" can
/// never disagree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CapturePhase {
    Idle,
    Starting,
    Running,
    Stopping,
}

impl CapturePhase {
    fn accepts_start(self) -> bool {
        self == CapturePhase::Idle
    }

    fn accepts_stop(self) -> bool {
        self == CapturePhase::Running
    }
}

pub(crate) fn install_shutter(pin: Output<'static>) {
    SHUTTER_OUTPUT.lock(|cell| {
        cell.borrow_mut().replace(pin);
    });
}

/// Only the capture task calls this after boot; a rejected stop never
/// reaches it.
pub(crate) fn set_shutter(high: bool) {
    SHUTTER_OUTPUT.lock(|cell| {
        if let Some(pin) = cell.borrow_mut().as_mut() {
            if high {
                pin.set_high();
            } else {
                pin.set_low();
            }
        }
    });
}

/// `Idle -> Starting`. Fails while any start, run or stop is in flight.
pub(crate) fn try_claim_idle() -> bool {
    CAPTURE_PHASE.lock(|phase| {
        if phase.get().accepts_start() {
            phase.set(CapturePhase::Starting);
            true
        } else {
            false
        }
    })
}

/// `Starting -> Idle`, for requests that validated-and-persisted without
/// spawning a run, or whose body failed to parse.
pub(crate) fn release_claim() {
    CAPTURE_PHASE.lock(|phase| {
        if phase.get() == CapturePhase::Starting {
            phase.set(CapturePhase::Idle);
        }
    });
}

/// `Starting -> Running`, just before the capture task is spawned. Clears
/// any stale cancellation left by a stop that raced a completing run.
pub(crate) fn commit_running() {
    CAPTURE_CANCEL.reset();
    CAPTURE_PHASE.lock(|phase| {
        phase.set(CapturePhase::Running);
    });
}

/// `Running -> Stopping` plus the cancellation signal the capture task
/// observes at its next deadline wait. Returns false (and signals
/// nothing) when no run is active.
pub(crate) fn request_stop() -> bool {
    let accepted = CAPTURE_PHASE.lock(|phase| {
        if phase.get().accepts_stop() {
            phase.set(CapturePhase::Stopping);
            true
        } else {
            false
        }
    });
    if accepted {
        CAPTURE_CANCEL.signal(());
    }
    accepted
}

/// Any phase `-> Idle`; called by the capture task on every exit path.
pub(crate) fn finish_run() {
    CAPTURE_PHASE.lock(|phase| {
        phase.set(CapturePhase::Idle);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_only_accepted_from_idle() {
        assert!(CapturePhase::Idle.accepts_start());
        assert!(!CapturePhase::Starting.accepts_start());
        assert!(!CapturePhase::Running.accepts_start());
        assert!(!CapturePhase::Stopping.accepts_start());
    }

    #[test]
    fn stop_only_accepted_while_running() {
        assert!(CapturePhase::Running.accepts_stop());
        assert!(!CapturePhase::Idle.accepts_stop());
        assert!(!CapturePhase::Starting.accepts_stop());
        assert!(!CapturePhase::Stopping.accepts_stop());
    }
}
