use super::emitter::InputEmitter;
use super::keymap::{KeyMap, KeyToken};
use crate::error::{InputError, Result};
use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent, Key};
use tracing::{debug, info};

const DEVICE_NAME: &str = "gesturepad virtual keyboard";

/// Virtual keyboard backed by `/dev/uinput`. Needs write access to the device
/// node (root or the `input` group).
pub struct UinputEmitter {
    device: VirtualDevice,
}

impl UinputEmitter {
    /// Register a virtual keyboard that can press every key in the map
    pub fn new(keymap: &KeyMap) -> Result<Self> {
        let mut keys = AttributeSet::<Key>::new();
        for token in keymap.keys() {
            keys.insert(evdev_key(token)?);
        }

        let device = VirtualDeviceBuilder::new()
            .and_then(|builder| builder.name(DEVICE_NAME).with_keys(&keys))
            .and_then(|builder| builder.build())
            .map_err(|e| InputError::DeviceUnavailable {
                details: format!("cannot create uinput keyboard: {}", e),
            })?;

        info!("Created uinput device '{}'", DEVICE_NAME);
        Ok(Self { device })
    }
}

impl InputEmitter for UinputEmitter {
    fn pulse(&mut self, key: KeyToken) -> Result<()> {
        let code = evdev_key(key)?.code();
        for value in [1, 0] {
            // emit() terminates each batch with SYN_REPORT
            self.device
                .emit(&[InputEvent::new(EventType::KEY, code, value)])
                .map_err(|e| InputError::EmitFailed {
                    details: format!("{} ({}): {}", key, if value == 1 { "down" } else { "up" }, e),
                })?;
        }
        debug!("uinput pulse {}", key);
        Ok(())
    }

    fn name(&self) -> &str {
        "uinput"
    }
}

fn evdev_key(token: KeyToken) -> std::result::Result<Key, InputError> {
    let key = match token {
        KeyToken::Up => Key::KEY_UP,
        KeyToken::Down => Key::KEY_DOWN,
        KeyToken::Left => Key::KEY_LEFT,
        KeyToken::Right => Key::KEY_RIGHT,
        KeyToken::Space => Key::KEY_SPACE,
        KeyToken::Char(c) => match c {
            'a' => Key::KEY_A,
            'b' => Key::KEY_B,
            'c' => Key::KEY_C,
            'd' => Key::KEY_D,
            'e' => Key::KEY_E,
            'f' => Key::KEY_F,
            'g' => Key::KEY_G,
            'h' => Key::KEY_H,
            'i' => Key::KEY_I,
            'j' => Key::KEY_J,
            'k' => Key::KEY_K,
            'l' => Key::KEY_L,
            'm' => Key::KEY_M,
            'n' => Key::KEY_N,
            'o' => Key::KEY_O,
            'p' => Key::KEY_P,
            'q' => Key::KEY_Q,
            'r' => Key::KEY_R,
            's' => Key::KEY_S,
            't' => Key::KEY_T,
            'u' => Key::KEY_U,
            'v' => Key::KEY_V,
            'w' => Key::KEY_W,
            'x' => Key::KEY_X,
            'y' => Key::KEY_Y,
            'z' => Key::KEY_Z,
            '0' => Key::KEY_0,
            '1' => Key::KEY_1,
            '2' => Key::KEY_2,
            '3' => Key::KEY_3,
            '4' => Key::KEY_4,
            '5' => Key::KEY_5,
            '6' => Key::KEY_6,
            '7' => Key::KEY_7,
            '8' => Key::KEY_8,
            '9' => Key::KEY_9,
            _ => {
                return Err(InputError::UnknownKey {
                    token: token.to_string(),
                })
            }
        },
    };
    Ok(key)
}
