//! Overall session stopwatch.
//!
//! A pure counter advanced by one-second ticks. Pausing freezes it; repeated
//! pause/resume calls are no-ops.

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Elapsed-time stopwatch for a workout session
#[derive(Clone, Debug, Default)]
pub struct SessionTimer {
    phase: Phase,
    elapsed: u64,
}

impl SessionTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start counting; a timer that is already running or paused is left alone
    pub fn start(&mut self) {
        if self.phase == Phase::Stopped {
            self.phase = Phase::Running;
        }
    }

    pub fn pause(&mut self) {
        if self.phase == Phase::Running {
            self.phase = Phase::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.phase == Phase::Paused {
            self.phase = Phase::Running;
        }
    }

    /// Stop counting for good, keeping the elapsed total
    pub fn stop(&mut self) {
        self.phase = Phase::Stopped;
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == Phase::Paused
    }

    /// One second of real time has passed
    pub fn tick(&mut self) {
        if self.phase == Phase::Running {
            self.elapsed += 1;
        }
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick_n(timer: &mut SessionTimer, n: u32) {
        for _ in 0..n {
            timer.tick();
        }
    }

    #[test]
    fn test_starts_at_zero_and_ignores_ticks_before_start() {
        let mut timer = SessionTimer::new();
        tick_n(&mut timer, 5);
        assert_eq!(timer.elapsed_seconds(), 0);

        timer.start();
        tick_n(&mut timer, 3);
        assert_eq!(timer.elapsed_seconds(), 3);
    }

    #[test]
    fn test_paused_time_is_not_counted() {
        let mut timer = SessionTimer::new();
        timer.start();
        tick_n(&mut timer, 10);
        timer.pause();
        tick_n(&mut timer, 30);
        timer.resume();
        tick_n(&mut timer, 5);
        timer.pause();
        tick_n(&mut timer, 7);
        timer.resume();
        tick_n(&mut timer, 1);

        assert_eq!(timer.elapsed_seconds(), 16);
    }

    #[test]
    fn test_pause_and_resume_are_idempotent() {
        let mut timer = SessionTimer::new();
        timer.start();
        timer.resume();
        assert!(timer.is_running());
        tick_n(&mut timer, 2);

        timer.pause();
        timer.pause();
        assert!(timer.is_paused());
        tick_n(&mut timer, 2);

        timer.resume();
        timer.resume();
        tick_n(&mut timer, 2);
        assert_eq!(timer.elapsed_seconds(), 4);
    }

    #[test]
    fn test_stop_freezes_total() {
        let mut timer = SessionTimer::new();
        timer.start();
        tick_n(&mut timer, 61);
        timer.stop();
        tick_n(&mut timer, 10);
        assert_eq!(timer.elapsed_seconds(), 61);
        assert!(!timer.is_running());
    }
}
