use super::*;
use crate::profile::Profile;
use std::time::{Duration, Instant};

fn controller(cooldown_ms: u64, smoothing: f64) -> GestureController {
    let mut profile = Profile::new("test");
    profile.cooldown_ms = cooldown_ms;
    GestureController::from_profile(&profile, smoothing).unwrap()
}

fn hand(fingers: [bool; 5], center_x: f64) -> Vec<HandLandmarks> {
    vec![HandLandmarks::synthetic(fingers, center_x)]
}

const CURLED: [bool; 5] = [false; 5];
const OPEN: [bool; 5] = [true; 5];

#[test]
fn test_curled_hand_on_the_right() {
    let mut interpreter = GestureInterpreter::new(0.35, 0.65, 0.0).unwrap();
    let snapshot = interpreter.interpret(&hand(CURLED, 0.8));

    assert_eq!(snapshot.action, Action::Right);
    assert!((snapshot.center_x - 0.8).abs() < 1e-9);
    assert!(snapshot.has_hand);
    assert_eq!(snapshot.fingers, FingerState::new(CURLED));
}

#[test]
fn test_gestures_ignore_hand_position() {
    let mut interpreter = GestureInterpreter::new(0.35, 0.65, 0.0).unwrap();
    for center in [0.1, 0.5, 0.9] {
        assert_eq!(interpreter.interpret(&hand(OPEN, center)).action, Action::Jump);
        assert_eq!(
            interpreter
                .interpret(&hand([true, false, false, false, true], center))
                .action,
            Action::Slide
        );
        assert_eq!(
            interpreter
                .interpret(&hand([false, true, true, false, false], center))
                .action,
            Action::Hoverboard
        );
    }
}

#[test]
fn test_only_first_hand_is_used() {
    let mut interpreter = GestureInterpreter::new(0.35, 0.65, 0.0).unwrap();
    let hands = vec![
        HandLandmarks::synthetic(CURLED, 0.2),
        HandLandmarks::synthetic(OPEN, 0.8),
    ];
    assert_eq!(interpreter.interpret(&hands).action, Action::Left);
}

#[test]
fn test_constant_input_stays_constant() {
    let mut interpreter = GestureInterpreter::new(0.35, 0.65, 0.22).unwrap();
    for _ in 0..20 {
        let snapshot = interpreter.interpret(&hand(CURLED, 0.42));
        assert!((snapshot.center_x - 0.42).abs() < 1e-9);
    }
}

#[test]
fn test_smoothing_delays_lane_change() {
    let mut interpreter = GestureInterpreter::new(0.35, 0.65, 0.22).unwrap();
    interpreter.interpret(&hand(CURLED, 0.5));

    // one jittery frame far left is not enough to leave the center
    let snapshot = interpreter.interpret(&hand(CURLED, 0.1));
    assert_eq!(snapshot.action, Action::Center);

    let mut action = snapshot.action;
    for _ in 0..10 {
        action = interpreter.interpret(&hand(CURLED, 0.1)).action;
    }
    assert_eq!(action, Action::Left);
}

#[test]
fn test_inverted_bounds_rejected() {
    assert!(matches!(
        GestureInterpreter::new(0.7, 0.3, 0.22),
        Err(crate::error::GesturepadError::InvalidConfiguration { .. })
    ));

    let mut profile = Profile::new("inverted");
    profile.left_bound = 0.7;
    profile.right_bound = 0.3;
    assert!(GestureController::from_profile(&profile, 0.22).is_err());
}

#[test]
fn test_held_jump_fires_once_then_again_after_idle() {
    let mut controller = controller(220, 0.22);
    let start = Instant::now();
    let mut fired = Vec::new();

    for i in 0..30u64 {
        let now = start + Duration::from_millis(i * 33);
        fired.extend(controller.process(&hand(OPEN, 0.5), now).fire);
    }
    assert_eq!(fired, vec![Action::Jump]);

    let decision = controller.process(&[], start + Duration::from_millis(1000));
    assert_eq!(decision.fire, None);
    assert_eq!(decision.snapshot, GestureSnapshot::no_hand());

    let decision = controller.process(&hand(OPEN, 0.5), start + Duration::from_millis(1033));
    assert_eq!(decision.fire, Some(Action::Jump));
}

#[test]
fn test_lane_sequence_fires_left_once() {
    let mut controller = controller(220, 0.0);
    let start = Instant::now();

    let fired: Vec<Action> = [0.5, 0.5, 0.2, 0.2]
        .iter()
        .enumerate()
        .filter_map(|(i, center)| {
            let now = start + Duration::from_millis(i as u64 * 100);
            controller.process(&hand(CURLED, *center), now).fire
        })
        .collect();

    assert_eq!(fired, vec![Action::Left]);
}

#[test]
fn test_rebuilt_controller_starts_fresh() {
    let start = Instant::now();
    let mut controller = controller(220, 0.0);
    assert_eq!(
        controller.process(&hand(OPEN, 0.5), start).fire,
        Some(Action::Jump)
    );
    assert_eq!(
        controller
            .process(&hand(OPEN, 0.5), start + Duration::from_millis(500))
            .fire,
        None
    );

    let mut profile = Profile::new("fast");
    profile.cooldown_ms = 80;
    let mut controller = GestureController::from_profile(&profile, 0.0).unwrap();
    assert_eq!(controller.profile_name(), "fast");
    assert_eq!(controller.cooldown(), Duration::from_millis(80));
    assert_eq!(
        controller
            .process(&hand(OPEN, 0.5), start + Duration::from_millis(510))
            .fire,
        Some(Action::Jump)
    );
}

#[test]
fn test_update_bounds_moves_lanes() {
    let mut controller = controller(80, 0.0);
    let start = Instant::now();

    assert_eq!(controller.process(&hand(CURLED, 0.3), start).fire, Some(Action::Left));
    controller.update_bounds(0.2, 0.8).unwrap();
    assert_eq!(
        controller
            .process(&hand(CURLED, 0.3), start + Duration::from_millis(100))
            .fire,
        Some(Action::Center)
    );
    assert!(controller.update_bounds(0.9, 0.1).is_err());
    assert_eq!(controller.bounds().left(), 0.2);
}
