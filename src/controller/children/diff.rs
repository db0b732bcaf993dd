//! # Owned-Field Diff
//!
//! Comparison helpers for the fields a child resource's owner manages.
//!
//! Live objects come back from the API server with defaulted fields filled in
//! (`terminationMessagePath`, `dnsPolicy`, `sessionAffinity`, ...). Comparing them
//! for equality against a freshly generated object would report drift on every
//! pass, so owned fields are compared with a "desired is a subset of live" rule.
//!
//! The API server also rewrites resource quantities into canonical form
//! (`1000m` comes back as `1`), so values under quantity keys are compared by amount.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Object keys whose values (or map values) are resource quantities.
const QUANTITY_KEYS: &[&str] = &["limits", "requests", "overhead", "sizeLimit"];

/// Structural subset check over JSON values.
///
/// Every field present in `desired` must be present and equal in `live`.
/// Arrays must have the same length and match element-wise. A `null` in
/// `desired` means "unset" and matches anything. Resource quantities are equal
/// when they denote the same amount.
#[must_use]
pub fn is_subset(desired: &Value, live: &Value) -> bool {
    subset(desired, live, false)
}

fn subset(desired: &Value, live: &Value, quantities: bool) -> bool {
    match (desired, live) {
        (Value::Null, _) => true,
        (Value::Object(want), Value::Object(have)) => want.iter().all(|(key, value)| {
            match have.get(key) {
                Some(found) => {
                    subset(value, found, quantities || QUANTITY_KEYS.contains(&key.as_str()))
                }
                None => value.is_null(),
            }
        }),
        (Value::Array(want), Value::Array(have)) => {
            want.len() == have.len()
                && want.iter().zip(have).all(|(w, h)| subset(w, h, quantities))
        }
        (Value::String(want), Value::String(have)) if quantities => same_quantity(want, have),
        (want, have) => want == have,
    }
}

/// True when both strings are the same quantity, spelled the same or not.
#[must_use]
pub fn same_quantity(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    matches!((parse_quantity(a), parse_quantity(b)), (Some(x), Some(y)) if x == y)
}

/// `sign * mantissa * 10^exponent`, mantissa without trailing zeros.
#[derive(Debug, PartialEq, Eq)]
struct Amount {
    negative: bool,
    mantissa: u128,
    exponent: i32,
}

/// Parse a Kubernetes quantity (`500m`, `1.5Gi`, `2e3`, `128974848`).
/// `None` for anything malformed or too large to hold exactly.
fn parse_quantity(raw: &str) -> Option<Amount> {
    let raw = raw.trim();
    let (negative, rest) = match raw.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, raw.strip_prefix('+').unwrap_or(raw)),
    };

    let split = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    let (number, suffix) = rest.split_at(split);
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }

    let mut mantissa: u128 = 0;
    for digit in whole.bytes().chain(fraction.bytes()) {
        if !digit.is_ascii_digit() {
            return None;
        }
        mantissa = mantissa
            .checked_mul(10)?
            .checked_add(u128::from(digit - b'0'))?;
    }

    let (scale10, scale2) = suffix_scale(suffix)?;
    let mut exponent = scale10.checked_sub(i32::try_from(fraction.len()).ok()?)?;
    mantissa = mantissa.checked_mul(1u128.checked_shl(scale2)?)?;

    if mantissa == 0 {
        return Some(Amount {
            negative: false,
            mantissa: 0,
            exponent: 0,
        });
    }
    while mantissa % 10 == 0 {
        mantissa /= 10;
        exponent = exponent.checked_add(1)?;
    }
    Some(Amount {
        negative,
        mantissa,
        exponent,
    })
}

/// Decimal and binary exponents of a quantity suffix.
fn suffix_scale(suffix: &str) -> Option<(i32, u32)> {
    let scale = match suffix {
        "" => (0, 0),
        "n" => (-9, 0),
        "u" => (-6, 0),
        "m" => (-3, 0),
        "k" => (3, 0),
        "M" => (6, 0),
        "G" => (9, 0),
        "T" => (12, 0),
        "P" => (15, 0),
        "E" => (18, 0),
        "Ki" => (0, 10),
        "Mi" => (0, 20),
        "Gi" => (0, 30),
        "Ti" => (0, 40),
        "Pi" => (0, 50),
        "Ei" => (0, 60),
        _ => (suffix.strip_prefix(['e', 'E'])?.parse().ok()?, 0),
    };
    Some(scale)
}

/// [`is_subset`] over anything serializable.
///
/// A value that fails to serialize is treated as drift.
#[must_use]
pub fn serialized_subset<T: Serialize>(desired: &T, live: &T) -> bool {
    match (serde_json::to_value(desired), serde_json::to_value(live)) {
        (Ok(want), Ok(have)) => is_subset(&want, &have),
        _ => false,
    }
}

/// `base` with every entry of `overlay` merged in. Overlay wins on key collisions.
#[must_use]
pub fn merge_labels(
    base: Option<&BTreeMap<String, String>>,
    overlay: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = base.cloned().unwrap_or_default();
    merged.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Union `wanted` into `live`. Returns true if `live` had to change.
///
/// Labels already on `live` that `wanted` does not mention are kept.
pub fn union_labels(
    wanted: Option<&BTreeMap<String, String>>,
    live: &mut Option<BTreeMap<String, String>>,
) -> bool {
    let Some(wanted) = wanted else {
        return false;
    };
    let satisfied = wanted
        .iter()
        .all(|(k, v)| live.as_ref().and_then(|l| l.get(k)) == Some(v));
    if satisfied {
        return false;
    }
    *live = Some(merge_labels(live.as_ref(), wanted));
    true
}
