use crate::config::KeyConfig;
use crate::error::InputError;
use crate::gesture::Action;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A key the emitter knows how to pulse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Up,
    Down,
    Left,
    Right,
    Space,
    /// Lower-case ASCII letter or digit
    Char(char),
}

impl FromStr for KeyToken {
    type Err = InputError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        let token = match normalized.as_str() {
            "up" => KeyToken::Up,
            "down" => KeyToken::Down,
            "left" => KeyToken::Left,
            "right" => KeyToken::Right,
            "space" => KeyToken::Space,
            other => {
                let mut chars = other.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) if c.is_ascii_alphanumeric() => KeyToken::Char(c),
                    _ => {
                        return Err(InputError::UnknownKey {
                            token: value.to_string(),
                        })
                    }
                }
            }
        };
        Ok(token)
    }
}

impl fmt::Display for KeyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyToken::Up => f.write_str("up"),
            KeyToken::Down => f.write_str("down"),
            KeyToken::Left => f.write_str("left"),
            KeyToken::Right => f.write_str("right"),
            KeyToken::Space => f.write_str("space"),
            KeyToken::Char(c) => write!(f, "{}", c),
        }
    }
}

/// Action to key bindings. `Idle` is never bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    bindings: HashMap<Action, KeyToken>,
}

impl KeyMap {
    pub fn from_config(keys: &KeyConfig) -> Result<Self, InputError> {
        let mut bindings = HashMap::new();
        bindings.insert(Action::Jump, keys.jump.parse()?);
        bindings.insert(Action::Slide, keys.slide.parse()?);
        bindings.insert(Action::Left, keys.left.parse()?);
        bindings.insert(Action::Right, keys.right.parse()?);
        bindings.insert(Action::Hoverboard, keys.hoverboard.parse()?);
        if let Some(center) = &keys.center {
            bindings.insert(Action::Center, center.parse()?);
        }
        Ok(Self { bindings })
    }

    pub fn binding(&self, action: Action) -> Option<KeyToken> {
        self.bindings.get(&action).copied()
    }

    /// Every distinct key in the map, for registering with a virtual device
    pub fn keys(&self) -> Vec<KeyToken> {
        let mut keys: Vec<KeyToken> = self.bindings.values().copied().collect();
        keys.sort_by_key(|k| k.to_string());
        keys.dedup();
        keys
    }
}
