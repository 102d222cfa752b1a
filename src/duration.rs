//! Whole-notes durations as exact rationals
//!
//! Musical time throughout the engine is a fraction of a whole note:
//! 1/4 is a quarter note, 3/8 a dotted quarter. `num_rational` keeps
//! every value in lowest terms after construction and arithmetic, and
//! comparisons are exact rational comparisons, never floating point.

use num_rational::Rational32;

/// Re-export Rational for duration calculations
pub type Rational = Rational32;

/// A duration or position expressed as a fraction of a whole note
pub type WholeNotes = Rational;

/// Zero whole notes
pub fn zero() -> WholeNotes {
    WholeNotes::new(0, 1)
}

/// Capacity sentinel for senza-misura measures: the measure accepts any
/// amount of music without ever filling up.
pub fn cadenza_capacity() -> WholeNotes {
    WholeNotes::new(i32::MAX, 1)
}

/// Whether a measure capacity is the senza-misura sentinel
pub fn is_cadenza_capacity(capacity: WholeNotes) -> bool {
    capacity == cadenza_capacity()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_notes_are_reduced() {
        let half = WholeNotes::new(2, 4);
        assert_eq!(*half.numer(), 1);
        assert_eq!(*half.denom(), 2);
    }

    #[test]
    fn test_exact_sum() {
        // 1/4 + 1/4 + 1/2 fills a 4/4 measure exactly
        let sum = WholeNotes::new(1, 4) + WholeNotes::new(1, 4) + WholeNotes::new(1, 2);
        assert_eq!(sum, WholeNotes::new(1, 1));
    }

    #[test]
    fn test_cadenza_sentinel() {
        assert!(is_cadenza_capacity(cadenza_capacity()));
        assert!(!is_cadenza_capacity(WholeNotes::new(1, 1)));
        // Any realistic duration stays below the sentinel
        assert!(WholeNotes::new(64, 1) < cadenza_capacity());
    }
}
