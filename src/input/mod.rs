mod emitter;
mod keymap;
#[cfg(all(target_os = "linux", feature = "uinput"))]
mod uinput;

pub use emitter::{ActionDispatcher, InputEmitter, LogEmitter, RecordingEmitter};
pub use keymap::{KeyMap, KeyToken};
#[cfg(all(target_os = "linux", feature = "uinput"))]
pub use uinput::UinputEmitter;

use crate::error::Result;

/// The emitter for this build: uinput when available and not a dry run,
/// otherwise the logging emitter
pub fn create_emitter(keymap: &KeyMap, dry_run: bool) -> Result<Box<dyn InputEmitter>> {
    if dry_run {
        return Ok(Box::new(LogEmitter));
    }

    #[cfg(all(target_os = "linux", feature = "uinput"))]
    {
        Ok(Box::new(UinputEmitter::new(keymap)?))
    }

    #[cfg(not(all(target_os = "linux", feature = "uinput")))]
    {
        let _ = keymap;
        tracing::warn!("uinput support not compiled in, key pulses will only be logged");
        Ok(Box::new(LogEmitter))
    }
}
