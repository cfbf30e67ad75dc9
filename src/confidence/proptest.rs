//! Property-based tests for the confidence pipeline using proptest.
//!
//! These tests check the scoring invariants over generated answers:
//!
//! - Heuristic and final scores always fall in [0, 1]
//! - The citation bonus grows by 0.03 per source up to its 0.15 cap
//! - Repeating a pattern type never changes its contribution
//! - Categorical claims are reported once per occurrence
//! - A final score equal to the threshold is accepted
