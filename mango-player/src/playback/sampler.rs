//! Playback state sampler
//!
//! Polls a `PlaybackProbe` on a fixed cadence and publishes readings to the
//! `PlaybackStateHolder`.
//!
//! A non-forced tick publishes only when the play state read now matches
//! the one remembered from the previous tick. When it differs, the tick just
//! remembers the new value, so a play/pause change reaches observers one
//! tick after it is detected. Forced ticks always publish and leave the
//! remembered value alone.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

use super::engine::PlaybackProbe;
use super::state::PlaybackStateHolder;

pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Tick decision logic, independent of timers
#[derive(Debug, Default)]
pub struct SamplerCore {
    last_play_state: bool,
}

impl SamplerCore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_play_state(&self) -> bool {
        self.last_play_state
    }

    /// Run one tick; returns the `(is_playing, position_ms)` pair to publish
    pub fn tick(&mut self, source: &dyn PlaybackProbe, force: bool) -> Option<(bool, u64)> {
        let is_playing = source.is_playing();
        if force || is_playing == self.last_play_state {
            Some((is_playing, source.position_ms()))
        } else {
            self.last_play_state = is_playing;
            None
        }
    }
}

/// Recurring sampling task bound to one probe at a time
pub struct PlaybackSampler {
    holder: Arc<PlaybackStateHolder>,
    period: Duration,
    core: Arc<Mutex<SamplerCore>>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackSampler {
    pub fn new(holder: Arc<PlaybackStateHolder>, period: Duration) -> Self {
        Self {
            holder,
            period,
            core: Arc::new(Mutex::new(SamplerCore::new())),
            task: None,
        }
    }

    /// Sample `source` from now on
    ///
    /// Any running loop is cancelled first, so no tick for the previous
    /// source can fire afterwards. The new loop starts with a forced tick.
    pub fn set_source(&mut self, source: Arc<dyn PlaybackProbe>) {
        self.stop();
        debug!("Sampler source replaced, period {:?}", self.period);
        self.task = Some(tokio::spawn(run_sampler(
            self.core.clone(),
            source,
            self.holder.clone(),
            self.period,
        )));
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel the loop; pending ticks never fire
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PlaybackSampler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_sampler(
    core: Arc<Mutex<SamplerCore>>,
    source: Arc<dyn PlaybackProbe>,
    holder: Arc<PlaybackStateHolder>,
    period: Duration,
) {
    let tick = |force: bool| {
        let reading = core
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .tick(source.as_ref(), force);
        if let Some((is_playing, position_ms)) = reading {
            holder.publish_sample(is_playing, position_ms);
        }
    };

    tick(true);

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = ticker.tick() => tick(false),
            _ = holder.sample_requested() => tick(true),
        }
    }
}
