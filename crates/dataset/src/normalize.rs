//! Categorical normalization with median repair.
//!
//! Each raw value is looked up in its field's code table. Values that are not
//! in the table are replaced by the median of the values that did map, taken
//! over the whole column. Malformed input never aborts the pipeline.

use clinical_schema::CategoricalField;

/// A normalized categorical column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedColumn {
    /// One code per input value, in input order.
    pub codes: Vec<u8>,
    /// Code substituted for unmapped values.
    pub repair_code: u8,
    /// How many values were repaired.
    pub repaired: usize,
}

/// Maps a whole column of raw values onto `field` codes.
///
/// The repair code is the median of the mapped codes, truncated to an integer
/// (`0` if nothing in the column mapped).
#[must_use]
pub fn normalize_column<S: AsRef<str>>(
    field: CategoricalField,
    values: &[Option<S>],
) -> NormalizedColumn {
    let mapped: Vec<Option<u8>> = values
        .iter()
        .map(|value| value.as_ref().and_then(|raw| field.lookup(raw.as_ref())))
        .collect();

    let mut known: Vec<f64> = mapped.iter().flatten().map(|&code| f64::from(code)).collect();
    let repair_code = median(&mut known).map_or(0, |m| m as u8);

    let mut repaired = 0;
    let codes = mapped
        .into_iter()
        .map(|code| {
            code.unwrap_or_else(|| {
                repaired += 1;
                repair_code
            })
        })
        .collect();

    NormalizedColumn {
        codes,
        repair_code,
        repaired,
    }
}

/// Median of `values`, averaging the two middle elements for even counts.
///
/// Sorts `values` in place. Returns `None` for an empty slice.
#[must_use]
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
