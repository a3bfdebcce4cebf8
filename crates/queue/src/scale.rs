// SPDX-License-Identifier: MIT

//! The auto-scaler's pure decision rule, kept free of any `tokio::time` so
//! it can be unit-tested without pausing a runtime clock.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleDecision {
    Up,
    Down,
    Hold,
}

/// One evaluation of the scaler per spec §4.4.
///
/// `cooldown_elapsed` is computed by the caller from a [`scriberr_core::Clock`]
/// so tests can drive it deterministically instead of sleeping.
pub fn decide(
    queue_size: usize,
    running_jobs: usize,
    current_workers: usize,
    min_workers: usize,
    max_workers: usize,
    cooldown_elapsed: bool,
) -> ScaleDecision {
    if !cooldown_elapsed {
        return ScaleDecision::Hold;
    }
    if queue_size > 10 && current_workers < max_workers {
        return ScaleDecision::Up;
    }
    if queue_size == 0 && running_jobs <= 1 && current_workers > min_workers {
        return ScaleDecision::Down;
    }
    ScaleDecision::Hold
}
