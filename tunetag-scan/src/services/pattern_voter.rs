//! Five-neighbor voting over comparison sign patterns
//!
//! Each probed window contributes the sign of its comparison's
//! `frame_start_time`: negative reads N, zero and positive read P. Exactly
//! three sign sequences over the five probes mark a trigger, and each one
//! names which probe is the canonical hit. A sequence only counts when the
//! probes outside the flipped position agree exactly on their frame start
//! time.

use crate::services::window_collector::{WindowGroup, PROBE_COUNT};

/// Recognized trigger patterns, carrying the canonical hit position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerPattern {
    /// N P N N N; the second probe holds the trigger
    Pattern8,
    /// N P P P P; the first probe holds the trigger
    Pattern15,
    /// P P P P N; the last probe holds the trigger
    Pattern30,
}

impl TriggerPattern {
    /// Index of the canonical hit within the five-probe group.
    pub fn hit_index(self) -> usize {
        match self {
            TriggerPattern::Pattern8 => 1,
            TriggerPattern::Pattern15 => 0,
            TriggerPattern::Pattern30 => 4,
        }
    }
}

/// Outcome of voting on one window group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Hit(TriggerPattern),
    NoHit,
}

/// Exact-equality predicate over frame start times.
///
/// Windows probed from the same trigger reproduce bit-identical values, so
/// the comparison is exact with no epsilon.
pub fn frame_start_time_eq(a: f64, b: f64) -> bool {
    a == b
}

/// Applies the five-neighbor voting rules.
pub struct PatternVoter;

impl PatternVoter {
    /// Vote on a window group. Incomplete groups never produce a hit.
    pub fn vote(group: &WindowGroup) -> Vote {
        if group.pairs.len() != PROBE_COUNT {
            return Vote::NoHit;
        }

        let t = |i: usize| group.pairs[i].1.frame_start_time;
        let negative = |i: usize| t(i) < 0.0;

        let signs = [
            negative(0),
            negative(1),
            negative(2),
            negative(3),
            negative(4),
        ];

        // N P N N N, with the four N probes sharing one frame start time
        if signs == [true, false, true, true, true]
            && frame_start_time_eq(t(0), t(2))
            && frame_start_time_eq(t(2), t(3))
            && frame_start_time_eq(t(3), t(4))
        {
            return Vote::Hit(TriggerPattern::Pattern8);
        }

        // N P P P P, with the four P probes sharing one frame start time
        if signs == [true, false, false, false, false]
            && frame_start_time_eq(t(2), t(1))
            && frame_start_time_eq(t(1), t(3))
            && frame_start_time_eq(t(3), t(4))
        {
            return Vote::Hit(TriggerPattern::Pattern15);
        }

        // P P P P N, with the four P probes sharing one frame start time
        if signs == [false, false, false, false, true]
            && frame_start_time_eq(t(0), t(1))
            && frame_start_time_eq(t(1), t(2))
            && frame_start_time_eq(t(2), t(3))
        {
            return Vote::Hit(TriggerPattern::Pattern30);
        }

        Vote::NoHit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FingerprintComparison, FingerprintDescriptor};

    fn fcr(frame_start_time: f64) -> FingerprintComparison {
        FingerprintComparison {
            score: 10.0,
            similarity: 0.9,
            frame_start_time,
            most_similar_frame_position: 3,
        }
    }

    fn group(times: &[f64]) -> WindowGroup {
        WindowGroup {
            pairs: times
                .iter()
                .map(|&t| (FingerprintDescriptor::from_bytes(vec![0]), fcr(t)))
                .collect(),
        }
    }

    #[test]
    fn pattern_8_hits_second_probe() {
        let g = group(&[-2.0, 1.5, -2.0, -2.0, -2.0]);
        assert_eq!(PatternVoter::vote(&g), Vote::Hit(TriggerPattern::Pattern8));
        assert_eq!(TriggerPattern::Pattern8.hit_index(), 1);
    }

    #[test]
    fn pattern_15_hits_first_probe() {
        let g = group(&[-2.0, 1.5, 1.5, 1.5, 1.5]);
        assert_eq!(PatternVoter::vote(&g), Vote::Hit(TriggerPattern::Pattern15));
        assert_eq!(TriggerPattern::Pattern15.hit_index(), 0);
    }

    #[test]
    fn pattern_30_hits_last_probe() {
        let g = group(&[1.5, 1.5, 1.5, 1.5, -2.0]);
        assert_eq!(PatternVoter::vote(&g), Vote::Hit(TriggerPattern::Pattern30));
        assert_eq!(TriggerPattern::Pattern30.hit_index(), 4);
    }

    #[test]
    fn unrecognized_sequences_never_hit() {
        let sequences: &[&[f64]] = &[
            &[-1.0, -1.0, -1.0, -1.0, -1.0], // all N
            &[1.0, 1.0, 1.0, 1.0, 1.0],      // all P
            &[-1.0, -1.0, 1.0, -1.0, -1.0],  // P in the middle
            &[1.0, -1.0, -1.0, -1.0, -1.0],  // P leading
            &[-1.0, 1.0, 1.0, -1.0, -1.0],   // two Ps
        ];
        for times in sequences {
            assert_eq!(PatternVoter::vote(&group(times)), Vote::NoHit);
        }
    }

    #[test]
    fn pattern_8_requires_equal_negative_times() {
        // last N differs from the others
        let g = group(&[-2.0, 1.5, -2.0, -2.0, -2.5]);
        assert_eq!(PatternVoter::vote(&g), Vote::NoHit);
    }

    #[test]
    fn pattern_15_requires_equal_positive_times() {
        let g = group(&[-2.0, 1.5, 1.5, 1.6, 1.5]);
        assert_eq!(PatternVoter::vote(&g), Vote::NoHit);
    }

    #[test]
    fn pattern_30_requires_equal_positive_times() {
        let g = group(&[1.5, 1.5, 1.4, 1.5, -2.0]);
        assert_eq!(PatternVoter::vote(&g), Vote::NoHit);
    }

    #[test]
    fn equality_is_exact() {
        assert!(frame_start_time_eq(1.5, 1.5));
        assert!(!frame_start_time_eq(1.5, 1.5 + 1e-9));

        let g = group(&[-2.0, 1.5, -2.0, -2.0, -2.0 - 1e-12]);
        assert_eq!(PatternVoter::vote(&g), Vote::NoHit);
    }

    #[test]
    fn zero_frame_start_time_reads_positive() {
        let g = group(&[-2.0, 0.0, -2.0, -2.0, -2.0]);
        assert_eq!(PatternVoter::vote(&g), Vote::Hit(TriggerPattern::Pattern8));
    }

    #[test]
    fn incomplete_group_never_hits() {
        let g = group(&[-2.0, 1.5, -2.0, -2.0]);
        assert_eq!(PatternVoter::vote(&g), Vote::NoHit);
    }
}
