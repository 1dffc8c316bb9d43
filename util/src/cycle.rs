//! Fixed period cyclic execution

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, warn};
use std::{
    fmt::Display,
    time::{Duration, Instant},
};

use crate::shutdown::Shutdown;

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Execute `cycle` once every `period` until the shutdown is triggered.
///
/// The time spent in `cycle` is subtracted from the following sleep. A cycle lasting longer than
/// the period is reported as an overrun and the next cycle starts immediately.
///
/// If `cycle` returns an error it is logged, the shutdown is triggered with the error as its
/// cause and the error is returned. No further cycles are executed.
pub fn run_cyclic<F, E>(
    name: &str,
    period: Duration,
    shutdown: &Shutdown,
    mut cycle: F,
) -> Result<(), E>
where
    F: FnMut() -> Result<(), E>,
    E: Display,
{
    while !shutdown.is_triggered() {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        if let Err(e) = cycle() {
            error!("{} cycle failed: {}", name, e);
            shutdown.trigger(format!("{} failed: {}", name, e));
            return Err(e);
        }

        let cycle_dur = cycle_start_instant.elapsed();

        // Get sleep duration
        match period.checked_sub(cycle_dur) {
            Some(d) => {
                if shutdown.wait_timeout(d) {
                    break;
                }
            }
            None => warn!(
                "{} cycle overran by {:.06} s",
                name,
                (cycle_dur - period).as_secs_f64()
            ),
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stops_on_shutdown() {
        let shutdown = Shutdown::new();
        let mut count = 0;

        let res: Result<(), String> =
            run_cyclic("test", Duration::from_millis(1), &shutdown, || {
                count += 1;
                if count == 3 {
                    shutdown.trigger("done");
                }
                Ok(())
            });

        assert!(res.is_ok());
        assert_eq!(count, 3);
    }

    #[test]
    fn test_stops_on_error() {
        let shutdown = Shutdown::new();
        let mut count = 0;

        let res = run_cyclic("test", Duration::from_millis(1), &shutdown, || {
            count += 1;
            if count == 2 {
                Err(String::from("broken"))
            } else {
                Ok(())
            }
        });

        assert_eq!(res, Err(String::from("broken")));
        assert_eq!(count, 2);
        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.cause().as_deref(), Some("test failed: broken"));
    }

    #[test]
    fn test_no_cycle_after_shutdown() {
        let shutdown = Shutdown::new();
        shutdown.trigger("already stopped");

        let mut count = 0;
        let res: Result<(), String> =
            run_cyclic("test", Duration::from_millis(1), &shutdown, || {
                count += 1;
                Ok(())
            });

        assert!(res.is_ok());
        assert_eq!(count, 0);
    }
}
