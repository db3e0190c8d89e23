//! Property-based test generators using proptest.
//!
//! Addresses are drawn from small grids so that generated selections
//! overlap often enough to exercise conflict detection.

use gridtx_core::{CellAddress, CellValue, Selection};
use proptest::prelude::*;
use std::collections::BTreeMap;

/// Strategy for addresses inside a `rows` x `cols` grid.
pub fn address_strategy(rows: u32, cols: u32) -> impl Strategy<Value = CellAddress> {
    (0..rows, 0..cols).prop_map(|(row, col)| CellAddress::new(row, col))
}

/// Strategy for cell values of every kind.
///
/// Text is lowercase ASCII, so it never collides with fixed markers such as
/// `"__batch__"` that tests write.
pub fn cell_value_strategy() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        3 => prop::string::string_regex("[a-z]{1,8}")
            .expect("Invalid regex")
            .prop_map(CellValue::text),
        2 => (-1.0e6..1.0e6f64).prop_map(CellValue::number),
        1 => any::<bool>().prop_map(CellValue::from),
        1 => (0..9u32, 1..9u32).prop_map(|(col, row)| {
            let letter = char::from(b'A' + col as u8);
            CellValue::formula(format!("={letter}{row}+1"))
        }),
    ]
}

/// Strategy for a sparse grid of values inside `rows` x `cols`.
pub fn grid_strategy(
    rows: u32,
    cols: u32,
) -> impl Strategy<Value = BTreeMap<CellAddress, CellValue>> {
    prop::collection::btree_map(
        address_strategy(rows, cols),
        cell_value_strategy(),
        0..(rows * cols) as usize,
    )
}

/// Strategy for non-empty selections inside `rows` x `cols`.
pub fn selection_strategy(
    rows: u32,
    cols: u32,
    max_cells: usize,
) -> impl Strategy<Value = Selection> {
    prop::collection::vec(address_strategy(rows, cols), 1..=max_cells.max(1))
        .prop_map(|cells| cells.into_iter().collect())
}

/// Strategy for rectangular selections inside `rows` x `cols`.
pub fn range_selection_strategy(rows: u32, cols: u32) -> impl Strategy<Value = Selection> {
    (address_strategy(rows, cols), address_strategy(rows, cols))
        .prop_map(|(a, b)| Selection::range(a, b))
}

/// Strategy for `1..=max_count` pairwise-disjoint rectangular selections.
///
/// Each selection occupies its own band of rows, starting at row 0, and
/// spans at most `max_cols` columns.
pub fn disjoint_selections_strategy(
    max_count: usize,
    max_rows_each: u32,
    max_cols: u32,
) -> impl Strategy<Value = Vec<Selection>> {
    prop::collection::vec(
        (1..=max_rows_each.max(1), 1..=max_cols.max(1)),
        1..=max_count.max(1),
    )
    .prop_map(|bands| {
        let mut next_row = 0;
        bands
            .into_iter()
            .map(|(height, width)| {
                let top = next_row;
                next_row += height;
                Selection::range(
                    CellAddress::new(top, 0),
                    CellAddress::new(top + height - 1, width - 1),
                )
            })
            .collect()
    })
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Creates a configuration for thorough tests.
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            cases: 1024,
            max_shrink_iters: 10000,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}
