use std::thread;
use std::time::Duration;

use crate::api::run_withdrawal_cancellable;
use crate::error::KernelError;
use crate::simulation::CancelToken;

use super::common::*;

#[test]
fn cancelled_token_aborts_before_work() {
    let config = withdrawal_config(
        all_stocks(1_000_000.0),
        noisy_scenario(),
        fixed_swr(0.04),
        50,
        10_000,
        1,
    );
    let token = CancelToken::new();
    token.cancel();

    let err = run_withdrawal_cancellable(&config, &token).unwrap_err();
    assert!(matches!(err, KernelError::Cancelled));
}

/// Cancelling mid-run never yields a partial result: the call either fails
/// with `Cancelled` or returns the complete report set.
#[test]
fn mid_run_cancellation_discards_partial_work() {
    let config = withdrawal_config(
        all_stocks(1_000_000.0),
        noisy_scenario(),
        fixed_swr(0.04),
        100,
        10_000,
        1,
    );
    let token = CancelToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(2));
            token.cancel();
        })
    };

    match run_withdrawal_cancellable(&config, &token) {
        Err(KernelError::Cancelled) => {}
        Err(other) => panic!("unexpected error: {other}"),
        Ok(result) => {
            // The run outpaced the cancel; it must still be complete.
            assert_eq!(result.runs[0].reports.len(), 10_000);
        }
    }

    canceller.join().unwrap();
}
