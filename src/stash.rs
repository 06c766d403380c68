//! STASH code extraction from free-text mapping expressions
//!
//! A STASH code names one model output diagnostic as `m01s<section>i<item>`,
//! e.g. `m01s03i236`. Mapping expressions combine codes arithmetically and may
//! also give an inclusive item range within one section, `m01s30i201:i205`.

use crate::record::CellValue;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static STASH_RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"m01s(\d\d)i(\d\d\d):i(\d\d\d)").expect("invalid stash range pattern")
});

static STASH_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"m01s(\d\d)i(\d\d\d)").expect("invalid stash pattern"));

/// Canonical zero-padded form of a code
pub fn format_stash(section: u32, item: u32) -> String {
    format!("m01s{:02}i{:03}", section, item)
}

/// Sorted, de-duplicated codes mentioned in `expression`, with ranges expanded.
pub fn stash_codes(expression: &str) -> Vec<String> {
    let mut codes = BTreeSet::new();

    for caps in STASH_RANGE_PATTERN.captures_iter(expression) {
        let (Some(section), Some(first), Some(last)) =
            (parse_group(&caps, 1), parse_group(&caps, 2), parse_group(&caps, 3))
        else {
            continue;
        };
        for item in first..=last {
            codes.insert(format_stash(section, item));
        }
    }

    // Also picks up the first code of every range; the set absorbs the duplicate
    for caps in STASH_PATTERN.captures_iter(expression) {
        if let (Some(section), Some(item)) = (parse_group(&caps, 1), parse_group(&caps, 2)) {
            codes.insert(format_stash(section, item));
        }
    }

    codes.into_iter().collect()
}

/// Extract codes from a spreadsheet cell.
///
/// Returns `None` for an empty cell, and for a non-text cell (which is
/// logged and otherwise ignored).
pub fn stash_codes_from_cell(value: Option<&CellValue>) -> Option<Vec<String>> {
    match value? {
        CellValue::Text(text) => Some(stash_codes(text)),
        other => {
            log::warn!("ignoring non-text mapping entry {}", other);
            None
        }
    }
}

fn parse_group(caps: &regex::Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index)?.as_str().parse().ok()
}
