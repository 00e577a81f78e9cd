use super::frame::LandmarkFrame;
use super::{DetectorSettings, LandmarkSource};
use crate::error::SourceError;
use crate::gesture::HandLandmarks;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

/// Plays back a fixed list of frames. Used by tests and by `--source scripted`.
pub struct ScriptedSource {
    script: Vec<LandmarkFrame>,
    pending: VecDeque<LandmarkFrame>,
    repeat: bool,
    pacer: Option<Interval>,
    applied: Arc<Mutex<Vec<DetectorSettings>>>,
}

impl ScriptedSource {
    pub fn new(frames: Vec<LandmarkFrame>) -> Self {
        Self {
            pending: frames.iter().cloned().collect(),
            script: frames,
            repeat: false,
            pacer: None,
            applied: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// A loop that walks through every lane and gesture
    pub fn demo() -> Self {
        const HOLD: usize = 20;
        const CURLED: [bool; 5] = [false; 5];

        let steps: [(Option<[bool; 5]>, f64); 9] = [
            (Some(CURLED), 0.5),
            (Some(CURLED), 0.2),
            (Some(CURLED), 0.5),
            (Some(CURLED), 0.8),
            (Some(CURLED), 0.5),
            (Some([true; 5]), 0.5),
            (None, 0.5),
            (Some([true, false, false, false, true]), 0.5),
            (Some([false, true, true, false, false]), 0.5),
        ];

        let frames = steps
            .iter()
            .flat_map(|(fingers, center)| {
                let frame = match fingers {
                    Some(fingers) => {
                        LandmarkFrame::single(HandLandmarks::synthetic(*fingers, *center))
                    }
                    None => LandmarkFrame::empty(),
                };
                std::iter::repeat(frame).take(HOLD)
            })
            .collect();

        Self::new(frames).repeating()
    }

    /// Start over instead of ending the stream
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    pub fn with_frame_interval(mut self, period: Duration) -> Self {
        if !period.is_zero() {
            let mut pacer = interval(period);
            pacer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.pacer = Some(pacer);
        }
        self
    }

    /// Settings pushed so far, shared with the caller
    pub fn applied_settings(&self) -> Arc<Mutex<Vec<DetectorSettings>>> {
        Arc::clone(&self.applied)
    }
}

#[async_trait]
impl LandmarkSource for ScriptedSource {
    async fn next_frame(&mut self) -> Result<Option<LandmarkFrame>, SourceError> {
        if self.pending.is_empty() && self.repeat {
            self.pending.extend(self.script.iter().cloned());
        }
        let Some(frame) = self.pending.pop_front() else {
            return Ok(None);
        };
        match self.pacer.as_mut() {
            Some(pacer) => {
                pacer.tick().await;
            }
            // an unpaced repeating script would otherwise never give up the worker
            None => tokio::task::yield_now().await,
        }
        Ok(Some(frame))
    }

    async fn apply_detector_settings(
        &mut self,
        settings: DetectorSettings,
    ) -> Result<(), SourceError> {
        self.applied.lock().push(settings);
        Ok(())
    }

    fn describe(&self) -> String {
        format!("scripted({} frames)", self.script.len())
    }
}
