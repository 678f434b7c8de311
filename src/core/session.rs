//! Challenge session: id, randomized movement sequence, step cursor
//!
//! One instance per active validation attempt; destroyed and replaced on
//! restart, never mutated by more than one event at a time.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::MovementType;

/// Generate an opaque session id: millis since epoch plus a random suffix
pub fn generate_session_id<R: Rng>(rng: &mut R) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
    let suffix: String = (0..8)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", millis, suffix)
}

/// Shuffle the movement set and take the first `count`, so the sequence is
/// sampled without replacement and never holds duplicates
pub fn generate_movement_sequence<R: Rng>(rng: &mut R, count: usize) -> Vec<MovementType> {
    let mut pool = MovementType::ALL.to_vec();
    pool.shuffle(rng);
    pool.truncate(count.clamp(1, MovementType::ALL.len()));
    pool
}

/// State owned exclusively by the challenge sequencer
#[derive(Debug, Clone)]
pub struct ChallengeSession {
    pub id: String,
    pub sequence: Vec<MovementType>,
    /// Completed steps so far; monotonically non-decreasing, resets only
    /// with the session itself
    pub current_index: usize,
    /// Inter-eye distance captured at the first sample of an APPROACH step
    pub reference_distance: Option<f64>,
}

impl ChallengeSession {
    pub fn new<R: Rng>(rng: &mut R, steps: usize) -> Self {
        Self {
            id: generate_session_id(rng),
            sequence: generate_movement_sequence(rng, steps),
            current_index: 0,
            reference_distance: None,
        }
    }

    /// Movement currently being worked on, until the sequence is exhausted
    pub fn current_movement(&self) -> Option<MovementType> {
        self.sequence.get(self.current_index).copied()
    }

    /// Would completing the current movement finish the sequence?
    pub fn on_last_step(&self) -> bool {
        self.current_index + 1 >= self.sequence.len()
    }

    pub fn total_steps(&self) -> usize {
        self.sequence.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_sequence_has_no_duplicates() {
        for seed in 0..200 {
            let mut rng = SmallRng::seed_from_u64(seed);
            for count in 1..=5 {
                let seq = generate_movement_sequence(&mut rng, count);
                assert_eq!(seq.len(), count);
                for (i, a) in seq.iter().enumerate() {
                    for b in seq.iter().skip(i + 1) {
                        assert_ne!(a, b, "duplicate in sequence {:?}", seq);
                    }
                }
            }
        }
    }

    #[test]
    fn test_sequence_length_clamped() {
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(generate_movement_sequence(&mut rng, 12).len(), 5);
        assert_eq!(generate_movement_sequence(&mut rng, 0).len(), 1);
    }

    #[test]
    fn test_session_ids_differ() {
        let mut rng = SmallRng::seed_from_u64(1);
        let a = generate_session_id(&mut rng);
        let b = generate_session_id(&mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_cursor_walk() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut session = ChallengeSession::new(&mut rng, 3);
        assert_eq!(session.total_steps(), 3);
        assert!(!session.on_last_step());

        session.current_index = 2;
        assert!(session.on_last_step());
        assert!(session.current_movement().is_some());

        session.current_index = 3;
        assert!(session.current_movement().is_none());
    }
}
