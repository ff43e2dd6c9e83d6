//! Synthetic sub-second ordering for same-second prints
//!
//! Tapes only carry whole seconds. Prints sharing a second are spread evenly
//! across it, keeping their known relative order: in a group of `n` (input
//! order, newest first) the print at position `i` gets
//! `1000 * (n - 1 - i) / n` ms, so the oldest lands on `.000` and the newest
//! on the largest offset.

use std::collections::HashMap;

use crate::types::{TapeRecord, parse_time_fields};

/// Assign `millisecond` to every record whose time parses. Order is unchanged.
pub fn assign_milliseconds(records: &mut [TapeRecord]) {
    let mut groups: HashMap<(&str, u32, u32, u32), Vec<usize>> = HashMap::new();

    for (index, record) in records.iter().enumerate() {
        if let Some((hour, minute, second)) = parse_time_fields(&record.time) {
            groups
                .entry((record.date.trim(), hour, minute, second))
                .or_default()
                .push(index);
        }
    }

    let offsets: Vec<(usize, u16)> = groups
        .into_values()
        .flat_map(|members| {
            let n = members.len();
            members
                .into_iter()
                .enumerate()
                .map(move |(position, index)| (index, spread_offset(position, n)))
        })
        .collect();

    for (index, millisecond) in offsets {
        records[index].millisecond = Some(millisecond);
    }
}

/// Offset for the `position`-th newest of `n` prints in one second.
fn spread_offset(position: usize, n: usize) -> u16 {
    // Integer form of floor((1000 / n) * (n - 1 - position)), exact for every n
    ((1000 * (n - 1 - position)) / n) as u16
}
