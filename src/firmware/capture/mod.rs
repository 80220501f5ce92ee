mod controller;
mod sequence;

pub(crate) use controller::{
    commit_running, finish_run, install_shutter, release_claim, request_stop, try_claim_idle,
    CapturePhase,
};
pub(crate) use sequence::capture_run_task;
