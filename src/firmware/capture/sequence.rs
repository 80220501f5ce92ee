use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Instant, Timer};
use esp_println::println;

use super::super::config::channels::CAPTURE_CANCEL;
use super::super::settings::CaptureSettings;
use super::controller;

/// One step of the shutter sequence: drive the line to `shutter_high`,
/// then hold until the previous deadline plus `hold_ms`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ShutterStep {
    shutter_high: bool,
    hold_ms: u32,
}

/// Expands capture parameters into the exposure/delay schedule: each of
/// the first `picture_count - 1` frames is exposure then inter-shot
/// delay; the final frame is exposure with the shutter dropped right away
/// and no trailing delay.
struct ShutterPlan {
    settings: CaptureSettings,
    step: u64,
}

impl ShutterPlan {
    fn new(settings: CaptureSettings) -> Self {
        Self { settings, step: 0 }
    }
}

impl Iterator for ShutterPlan {
    type Item = ShutterStep;

    fn next(&mut self) -> Option<ShutterStep> {
        let total = self.settings.picture_count as u64 * 2;
        if self.step >= total {
            return None;
        }
        let index = self.step;
        self.step += 1;
        if index % 2 == 0 {
            Some(ShutterStep {
                shutter_high: true,
                hold_ms: self.settings.exposure_ms,
            })
        } else if index == total - 1 {
            Some(ShutterStep {
                shutter_high: false,
                hold_ms: 0,
            })
        } else {
            Some(ShutterStep {
                shutter_high: false,
                hold_ms: self.settings.delay_ms,
            })
        }
    }
}

/// Runs one capture sequence with its own parameter snapshot. Deadlines
/// accumulate from the sequence start so scheduling jitter never drifts
/// the cadence. Cancellation is observed at every wait; the task drops
/// the shutter itself before exiting, and always returns the phase to
/// idle.
#[embassy_executor::task]
pub(crate) async fn capture_run_task(run: CaptureSettings) {
    println!(
        "capture: run picture={} exposure_ms={} delay_ms={}",
        run.picture_count, run.exposure_ms, run.delay_ms
    );
    let mut deadline = Instant::now();
    for step in ShutterPlan::new(run) {
        controller::set_shutter(step.shutter_high);
        if step.hold_ms == 0 {
            continue;
        }
        deadline += Duration::from_millis(step.hold_ms as u64);
        if let Either::Second(()) = select(Timer::at(deadline), CAPTURE_CANCEL.wait()).await {
            controller::set_shutter(false);
            controller::finish_run();
            println!("capture: stopped");
            return;
        }
    }
    controller::finish_run();
    println!("capture: complete");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(picture_count: u32, exposure_ms: u32, delay_ms: u32) -> ShutterPlan {
        ShutterPlan::new(CaptureSettings {
            picture_count,
            exposure_ms,
            delay_ms,
        })
    }

    #[test]
    fn single_picture_is_one_pair_with_no_delay_phase() {
        let steps: heapless::Vec<ShutterStep, 8> = plan(1, 2000, 1000).collect();
        assert_eq!(
            steps.as_slice(),
            &[
                ShutterStep { shutter_high: true, hold_ms: 2000 },
                ShutterStep { shutter_high: false, hold_ms: 0 },
            ]
        );
    }

    #[test]
    fn three_pictures_have_two_gaps_and_no_trailing_gap() {
        let steps: heapless::Vec<ShutterStep, 8> = plan(3, 2000, 1000).collect();
        assert_eq!(
            steps.as_slice(),
            &[
                ShutterStep { shutter_high: true, hold_ms: 2000 },
                ShutterStep { shutter_high: false, hold_ms: 1000 },
                ShutterStep { shutter_high: true, hold_ms: 2000 },
                ShutterStep { shutter_high: false, hold_ms: 1000 },
                ShutterStep { shutter_high: true, hold_ms: 2000 },
                ShutterStep { shutter_high: false, hold_ms: 0 },
            ]
        );
    }

    #[test]
    fn zero_delay_runs_back_to_back() {
        let steps: heapless::Vec<ShutterStep, 8> = plan(2, 500, 0).collect();
        assert_eq!(
            steps.as_slice(),
            &[
                ShutterStep { shutter_high: true, hold_ms: 500 },
                ShutterStep { shutter_high: false, hold_ms: 0 },
                ShutterStep { shutter_high: true, hold_ms: 500 },
                ShutterStep { shutter_high: false, hold_ms: 0 },
            ]
        );
    }

    #[test]
    fn total_exposure_time_matches_schedule() {
        let held: u64 = plan(3, 2000, 1000).map(|step| step.hold_ms as u64).sum();
        // 3 exposures plus 2 gaps.
        assert_eq!(held, 3 * 2000 + 2 * 1000);
    }
}
