//! Integration tests for the challenge sequencer: full multi-step sessions
//! driven with a simulated clock

use std::time::{Duration, Instant};

use rand::rngs::SmallRng;
use rand::SeedableRng;

use vida::core::{ChallengeSequencer, StepTrigger};
use vida::types::{
    ChallengeConfig, DetectionSample, FailReason, MovementType, Outcome, Phase, Thresholds,
};

fn centered() -> DetectionSample {
    DetectionSample {
        nose_x: 0.5,
        nose_y: 0.5,
        left_eye_aperture: 0.02,
        right_eye_aperture: 0.02,
        inter_eye_distance: 0.10,
    }
}

fn matching(movement: MovementType) -> DetectionSample {
    let mut sample = centered();
    match movement {
        MovementType::Up => sample.nose_y = 0.20,
        MovementType::Down => sample.nose_y = 0.80,
        MovementType::Left => sample.nose_x = 0.80,
        MovementType::Right => sample.nose_x = 0.20,
        MovementType::Approach => sample.inter_eye_distance = 0.20,
    }
    sample
}

/// Center, run the countdown down, land in AwaitingMovement
fn walk_to_awaiting(seq: &mut ChallengeSequencer, mut now: Instant) -> Instant {
    assert!(seq.on_sample(&centered(), now).is_none());
    assert_eq!(seq.phase().name(), "preparing");
    while seq.phase().name() == "preparing" {
        now += Duration::from_secs(1);
        assert!(seq.on_tick(now).is_none());
    }
    assert_eq!(seq.phase().name(), "awaiting_movement");
    now
}

#[test]
fn test_full_session_walkthrough() {
    let mut rng = SmallRng::seed_from_u64(11);
    let mut seq = ChallengeSequencer::new(ChallengeConfig::default(), Thresholds::default());
    let mut now = Instant::now();

    let sequence = seq.start(&mut rng, Some("walkthrough".to_string())).sequence.clone();
    assert_eq!(seq.session().unwrap().id, "walkthrough");

    for (i, movement) in sequence.iter().enumerate() {
        now = walk_to_awaiting(&mut seq, now);

        // Noise frames: wrong movements never complete the step
        for other in MovementType::ALL {
            if other != *movement && other != MovementType::Approach {
                assert!(seq.on_sample(&matching(other), now).is_none());
            }
        }
        assert_eq!(seq.phase().name(), "awaiting_movement");

        if *movement == MovementType::Approach {
            // Baseline frame first so the reference distance exists
            assert!(seq.on_sample(&centered(), now).is_none());
        }
        let completion = seq.on_sample(&matching(*movement), now).unwrap();
        assert_eq!(completion.step_index, i as u32 + 1);
        assert_eq!(completion.movement, *movement);
        assert_eq!(completion.is_final, i == sequence.len() - 1);
        assert_eq!(completion.trigger, StepTrigger::MovementDetected);

        seq.mark_dispatched(&completion);
    }

    assert_eq!(
        seq.phase(),
        Phase::Completed {
            outcome: Outcome::Pending
        }
    );
    seq.resolve_outcome(true);
    assert!(seq.phase().is_terminal());
}

#[test]
fn test_recentering_required_between_steps() {
    let mut rng = SmallRng::seed_from_u64(12);
    let mut seq = ChallengeSequencer::new(ChallengeConfig::default(), Thresholds::default());
    seq.start(&mut rng, None);
    let mut now = Instant::now();

    now = walk_to_awaiting(&mut seq, now);
    let movement = seq.current_movement().unwrap();
    if movement == MovementType::Approach {
        seq.on_sample(&centered(), now);
    }
    let completion = seq.on_sample(&matching(movement), now).unwrap();
    seq.mark_dispatched(&completion);
    assert_eq!(seq.phase(), Phase::Centering);

    // The next movement performed straight away, without re-centering,
    // does not count
    let next = seq.current_movement().unwrap();
    assert!(seq.on_sample(&matching(next), now).is_none());
    assert_eq!(seq.phase(), Phase::Centering);
    assert_eq!(seq.session().unwrap().current_index, 1);

    // Re-center, then it proceeds normally
    now = walk_to_awaiting(&mut seq, now);
    assert_eq!(seq.phase().name(), "awaiting_movement");
    let _ = now;
}

#[test]
fn test_stale_tick_after_transition_is_noop() {
    let mut rng = SmallRng::seed_from_u64(13);
    let mut seq = ChallengeSequencer::new(ChallengeConfig::default(), Thresholds::default());
    seq.start(&mut rng, None);
    let now = walk_to_awaiting(&mut seq, Instant::now());

    let old_deadline = seq.armed_deadline().unwrap();
    let movement = seq.current_movement().unwrap();
    if movement == MovementType::Approach {
        seq.on_sample(&centered(), now);
    }
    let completion = seq.on_sample(&matching(movement), now).unwrap();
    seq.mark_dispatched(&completion);
    assert_eq!(seq.phase(), Phase::Centering);

    // A tick carrying the old deadline arrives late: the phase holds no
    // armed instant, so nothing fires
    assert!(seq.on_tick(old_deadline + Duration::from_secs(1)).is_none());
    assert_eq!(seq.phase(), Phase::Centering);
    assert_eq!(seq.session().unwrap().current_index, 1);
}

#[test]
fn test_timeout_is_terminal_and_frames_are_then_inert() {
    let config = ChallengeConfig {
        movement_timeout: Duration::from_secs(2),
        ..ChallengeConfig::default()
    };
    let mut rng = SmallRng::seed_from_u64(14);
    let mut seq = ChallengeSequencer::new(config, Thresholds::default());
    seq.start(&mut rng, None);
    let now = walk_to_awaiting(&mut seq, Instant::now());

    let completion = seq.on_tick(now + Duration::from_secs(2)).unwrap();
    assert!(!completion.success);
    assert_eq!(completion.trigger, StepTrigger::Timeout);
    assert_eq!(
        seq.phase(),
        Phase::Failed {
            reason: FailReason::Timeout
        }
    );

    // The movement performed after the deadline changes nothing
    let movement = completion.movement;
    assert!(seq
        .on_sample(&matching(movement), now + Duration::from_secs(3))
        .is_none());
    assert!(seq.phase().is_terminal());

    // Only reset leaves the terminal phase
    seq.reset();
    assert_eq!(seq.phase(), Phase::Idle);
}

#[test]
fn test_reset_mid_session_discards_everything() {
    let mut rng = SmallRng::seed_from_u64(15);
    let mut seq = ChallengeSequencer::new(ChallengeConfig::default(), Thresholds::default());
    seq.start(&mut rng, None);
    let now = walk_to_awaiting(&mut seq, Instant::now());

    seq.reset();
    assert_eq!(seq.phase(), Phase::Idle);
    assert!(seq.session().is_none());
    assert!(seq.armed_deadline().is_none());

    // Frames and ticks after reset are inert
    assert!(seq.on_sample(&centered(), now).is_none());
    assert!(seq.on_tick(now + Duration::from_secs(60)).is_none());
    assert_eq!(seq.phase(), Phase::Idle);
}
