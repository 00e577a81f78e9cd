use super::action::{Action, Lane};
use super::lane::LaneState;
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use tracing::debug;

/// Decides whether a classified action should reach input emission.
///
/// Discrete actions need an open latch (the gesture was released since it
/// last fired) and an elapsed cooldown; LEFT and RIGHT need a lane change and
/// an elapsed cooldown, CENTER only a lane change. State only moves when the gate fires, except for the
/// latch release that happens whenever a discrete gesture is no longer held.
#[derive(Debug, Clone)]
pub struct ActionGate {
    cooldown: Duration,
    last_fired: HashMap<Action, Instant>,
    latched: HashSet<Action>,
    lane: LaneState,
}

impl ActionGate {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            cooldown,
            last_fired: HashMap::new(),
            latched: HashSet::new(),
            lane: LaneState::new(),
        }
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn lane_state(&self) -> &LaneState {
        &self.lane
    }

    pub fn is_latched(&self, action: Action) -> bool {
        self.latched.contains(&action)
    }

    pub fn should_fire(&mut self, action: Action, now: Instant) -> bool {
        if action == Action::Idle {
            self.latched.clear();
            return false;
        }

        // any discrete gesture other than the current one counts as released
        self.latched.retain(|held| *held == action);

        if action.is_discrete() {
            if self.latched.contains(&action) {
                return false;
            }
            if !self.cooldown_elapsed(action, now) {
                debug!("{} held back by cooldown", action);
                return false;
            }
            self.latched.insert(action);
            self.last_fired.insert(action, now);
            return true;
        }

        let Some(lane) = action.lane() else {
            return false;
        };
        if !self.lane.is_transition(lane) {
            return false;
        }
        // returning to the center always commits so the next side lane can fire
        if lane != Lane::Center && !self.cooldown_elapsed(action, now) {
            debug!("Lane change to {} held back by cooldown", action);
            return false;
        }
        self.lane.commit(lane);
        self.last_fired.insert(action, now);
        true
    }

    fn cooldown_elapsed(&self, action: Action, now: Instant) -> bool {
        self.last_fired
            .get(&action)
            .map_or(true, |fired| now.saturating_duration_since(*fired) >= self.cooldown)
    }
}
