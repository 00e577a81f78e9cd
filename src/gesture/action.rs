use serde::{Deserialize, Serialize};
use std::fmt;

/// Every action the controller can report for a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    /// No hand detected
    Idle,
    Center,
    Left,
    Right,
    Jump,
    Slide,
    Hoverboard,
}

impl Action {
    pub const DISCRETE: [Action; 3] = [Action::Jump, Action::Slide, Action::Hoverboard];

    /// Edge-triggered actions, fired once per gesture activation
    pub fn is_discrete(&self) -> bool {
        matches!(self, Action::Jump | Action::Slide | Action::Hoverboard)
    }

    /// The lane this action steers to, if it is a lane action
    pub fn lane(&self) -> Option<Lane> {
        match self {
            Action::Left => Some(Lane::Left),
            Action::Center => Some(Lane::Center),
            Action::Right => Some(Lane::Right),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Idle => "IDLE",
            Action::Center => "CENTER",
            Action::Left => "LEFT",
            Action::Right => "RIGHT",
            Action::Jump => "JUMP",
            Action::Slide => "SLIDE",
            Action::Hoverboard => "HOVERBOARD",
        }
    }

    /// Lenient parse: case-insensitive, anything unknown maps to `Idle`
    pub fn parse_lenient(value: &str) -> Action {
        match value.trim().to_ascii_uppercase().as_str() {
            "CENTER" => Action::Center,
            "LEFT" => Action::Left,
            "RIGHT" => Action::Right,
            "JUMP" => Action::Jump,
            "SLIDE" => Action::Slide,
            "HOVERBOARD" => Action::Hoverboard,
            _ => Action::Idle,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the three horizontal zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lane {
    Left,
    #[default]
    Center,
    Right,
}

impl Lane {
    pub fn action(&self) -> Action {
        match self {
            Lane::Left => Action::Left,
            Lane::Center => Action::Center,
            Lane::Right => Action::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_groups() {
        for action in Action::DISCRETE {
            assert!(action.is_discrete());
            assert!(action.lane().is_none());
        }
        assert_eq!(Action::Left.lane(), Some(Lane::Left));
        assert_eq!(Action::Center.lane(), Some(Lane::Center));
        assert!(!Action::Idle.is_discrete());
        assert!(Action::Idle.lane().is_none());
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Action::parse_lenient("jump"), Action::Jump);
        assert_eq!(Action::parse_lenient(" Hoverboard "), Action::Hoverboard);
        assert_eq!(Action::parse_lenient("cartwheel"), Action::Idle);
    }

    #[test]
    fn test_serde_uses_upper_case_names() {
        assert_eq!(serde_json::to_string(&Action::Slide).unwrap(), "\"SLIDE\"");
        let action: Action = serde_json::from_str("\"RIGHT\"").unwrap();
        assert_eq!(action, Action::Right);
    }
}
