//! Lap counting and race timing.

use std::time::Duration;

use podracer_core::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Race progress fed once per simulated frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceProgress {
    laps_target: u32,
    lap_times: Vec<Duration>,
    lap_start: SimTime,
    elapsed: SimTime,
    speed_sum: f64,
    frames: u64,
    finished: bool,
}

impl RaceProgress {
    pub fn new(laps_target: u32) -> Self {
        Self {
            laps_target,
            lap_times: Vec::new(),
            lap_start: SimTime::new(),
            elapsed: SimTime::new(),
            speed_sum: 0.0,
            frames: 0,
            finished: false,
        }
    }

    /// Account one frame ending at `now`. Returns the lap time if this frame
    /// completed a lap. Frames after the finish are ignored.
    pub fn record(&mut self, now: SimTime, speed_kmh: f32, contacts: &ContactEvent) -> Option<Duration> {
        if self.finished {
            return None;
        }
        self.elapsed = now;
        self.speed_sum += f64::from(speed_kmh);
        self.frames += 1;

        if !contacts.lap_advance {
            return None;
        }
        let lap = now - self.lap_start;
        self.lap_start = now;
        self.lap_times.push(lap);
        info!(lap = self.laps_done(), time = ?lap, "lap completed");

        if self.laps_done() >= self.laps_target {
            self.finished = true;
            info!(total = %self.elapsed, "race finished");
        }
        Some(lap)
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn laps_done(&self) -> u32 {
        self.lap_times.len() as u32
    }

    pub const fn laps_target(&self) -> u32 {
        self.laps_target
    }

    pub fn lap_times(&self) -> &[Duration] {
        &self.lap_times
    }

    pub fn best_lap(&self) -> Option<Duration> {
        self.lap_times.iter().min().copied()
    }

    /// Race time so far, frozen at the finish.
    pub const fn total_time(&self) -> SimTime {
        self.elapsed
    }

    /// Mean reported speed over every recorded frame.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn average_speed(&self) -> f32 {
        if self.frames == 0 {
            0.0
        } else {
            (self.speed_sum / self.frames as f64) as f32
        }
    }

    pub const fn finished(&self) -> bool {
        self.finished
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.laps_target);
    }
}

impl Default for RaceProgress {
    fn default() -> Self {
        Self::new(3)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
