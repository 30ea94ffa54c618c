//! Shared arbitrary generators for property-based testing.

use proptest::prelude::*;

use crate::tracker::RoundCell;
use crate::types::{Color, ROUND_COLORS};

/// Round names as they turn up in real trackers: header cells, blanks, the
/// event bucket, and the same round typed several ways.
pub fn arb_round_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("Round".to_string()),
        Just("Hunt".to_string()),
        Just("Event".to_string()),
        Just("Round A".to_string()),
        Just("round-a".to_string()),
        Just("Round B".to_string()),
        Just("The Ocean".to_string()),
        Just("Meta".to_string()),
        "[A-Z][a-z]{2,8}( [A-Z][a-z]{2,8})?",
    ]
}

pub fn arb_color() -> impl Strategy<Value = Color> {
    prop_oneof![
        prop::sample::select(ROUND_COLORS.to_vec()),
        (0u8..=255, 0u8..=255, 0u8..=255).prop_map(|(r, g, b)| Color::new(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0
        )),
    ]
}

pub fn arb_round_cell() -> impl Strategy<Value = RoundCell> {
    (arb_round_name(), prop::option::of(arb_color()))
        .prop_map(|(name, background)| RoundCell { name, background })
}

/// A whole round column, header rows included.
pub fn arb_round_column() -> impl Strategy<Value = Vec<RoundCell>> {
    prop::collection::vec(arb_round_cell(), 0..24)
}
