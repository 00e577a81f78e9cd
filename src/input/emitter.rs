use super::keymap::{KeyMap, KeyToken};
use crate::error::Result;
use crate::gesture::Action;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Something that can produce one key-down + key-up pulse
pub trait InputEmitter: Send {
    fn pulse(&mut self, key: KeyToken) -> Result<()>;

    fn name(&self) -> &str;
}

/// Dry-run emitter that only logs
#[derive(Debug, Default)]
pub struct LogEmitter;

impl InputEmitter for LogEmitter {
    fn pulse(&mut self, key: KeyToken) -> Result<()> {
        info!("Key pulse: {}", key);
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// Records pulses in memory; clones share the same record
#[derive(Debug, Clone, Default)]
pub struct RecordingEmitter {
    pulses: Arc<Mutex<Vec<KeyToken>>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> Vec<KeyToken> {
        self.pulses.lock().clone()
    }
}

impl InputEmitter for RecordingEmitter {
    fn pulse(&mut self, key: KeyToken) -> Result<()> {
        self.pulses.lock().push(key);
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Turns approved actions into key pulses through the key map. Every call
/// pulses; repeat suppression is the gate's job.
pub struct ActionDispatcher {
    keymap: KeyMap,
    emitter: Box<dyn InputEmitter>,
}

impl ActionDispatcher {
    pub fn new(keymap: KeyMap, emitter: Box<dyn InputEmitter>) -> Self {
        Self { keymap, emitter }
    }

    pub fn emitter_name(&self) -> &str {
        self.emitter.name()
    }

    /// Returns the pressed key, or `None` when the action has no binding
    pub fn dispatch(&mut self, action: Action) -> Result<Option<KeyToken>> {
        let Some(key) = self.keymap.binding(action) else {
            debug!("No key bound to {}, skipping", action);
            return Ok(None);
        };
        self.emitter.pulse(key)?;
        debug!("{} -> {} via {}", action, key, self.emitter.name());
        Ok(Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GesturepadConfig;

    fn dispatcher() -> (ActionDispatcher, RecordingEmitter) {
        let recorder = RecordingEmitter::new();
        let keymap = KeyMap::from_config(&GesturepadConfig::default().keys).unwrap();
        (
            ActionDispatcher::new(keymap, Box::new(recorder.clone())),
            recorder,
        )
    }

    #[test]
    fn test_every_dispatch_pulses() {
        let (mut dispatcher, recorder) = dispatcher();
        dispatcher.dispatch(Action::Jump).unwrap();
        dispatcher.dispatch(Action::Jump).unwrap();
        dispatcher.dispatch(Action::Left).unwrap();

        assert_eq!(
            recorder.pulses(),
            vec![KeyToken::Up, KeyToken::Up, KeyToken::Left]
        );
        assert_eq!(dispatcher.emitter_name(), "recording");
    }

    #[test]
    fn test_unbound_actions_are_skipped() {
        let (mut dispatcher, recorder) = dispatcher();
        assert_eq!(dispatcher.dispatch(Action::Center).unwrap(), None);
        assert_eq!(dispatcher.dispatch(Action::Idle).unwrap(), None);
        assert!(recorder.pulses().is_empty());
    }
}
