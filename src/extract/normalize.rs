//! Raw cell → canonical value conversion.
//!
//! Every function returns `Ok(None)` for "no value this month" (blank, dash,
//! zero) and `Err(CellError::InvalidNumeric)` for content that cannot be the
//! expected KPI. Callers treat both as a missing month value; only the latter
//! is reported.

use crate::error::CellError;
use crate::extract::grid::CellValue;
use crate::extract::variant::SalesUnit;

/// Placeholders used for "not reported".
const MISSING_MARKERS: [&str; 8] = ["-", "－", "―", "—", "ー", "‐", "*", "n/a"];

/// Plausible range for a per-room yen figure; anything outside is a misread cell.
const YEN_RANGE: std::ops::RangeInclusive<f64> = 1_000.0..=100_000.0;

/// Characters stripped before parsing numeric text.
const NUMERIC_NOISE: [char; 6] = [',', '，', '¥', '￥', '円', ' '];

/// A parsed number and whether it carried a percent sign.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Numeric {
    value: f64,
    percent: bool,
}

fn numeric(raw: &CellValue) -> Result<Option<Numeric>, CellError> {
    match raw {
        CellValue::Empty => Ok(None),
        CellValue::Number(v) => Ok(Some(Numeric {
            value: *v,
            percent: false,
        })),
        CellValue::Text(s) => parse_numeric_text(s),
    }
}

fn parse_numeric_text(raw: &str) -> Result<Option<Numeric>, CellError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || MISSING_MARKERS.iter().any(|m| trimmed.eq_ignore_ascii_case(m)) {
        return Ok(None);
    }

    let percent = trimmed.ends_with('%') || trimmed.ends_with('％');
    let cleaned: String = trimmed
        .trim_end_matches(['%', '％'])
        .chars()
        .filter(|c| !NUMERIC_NOISE.contains(c) && !c.is_whitespace())
        .collect();

    let value = cleaned.parse::<f64>().map_err(|_| CellError::InvalidNumeric {
        raw: raw.to_string(),
        reason: "not a number",
    })?;
    if !value.is_finite() {
        return Err(CellError::InvalidNumeric {
            raw: raw.to_string(),
            reason: "not finite",
        });
    }
    Ok(Some(Numeric { value, percent }))
}

fn invalid(n: Numeric, reason: &'static str) -> CellError {
    CellError::InvalidNumeric {
        raw: n.value.to_string(),
        reason,
    }
}

/// Round to one decimal place.
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Occupancy as percentage points with one decimal.
///
/// Fractions in `[0, 1]` are scaled by 100 (so `1.0` means a full house);
/// values in `(1, 100]` are already percentages and pass through.
pub fn occupancy_pct(raw: &CellValue) -> Result<Option<f64>, CellError> {
    let Some(n) = numeric(raw)? else {
        return Ok(None);
    };
    if n.value == 0.0 {
        return Ok(None);
    }
    if n.value < 0.0 {
        return Err(invalid(n, "negative occupancy"));
    }
    let pct = if n.percent || n.value > 1.0 { n.value } else { n.value * 100.0 };
    if pct > 100.0 {
        return Err(invalid(n, "occupancy above 100%"));
    }
    Ok(Some(round1(pct)))
}

/// ADR / RevPAR as integer yen, within `YEN_RANGE`.
pub fn yen(raw: &CellValue) -> Result<Option<u64>, CellError> {
    let Some(n) = numeric(raw)? else {
        return Ok(None);
    };
    if n.percent {
        return Err(invalid(n, "percentage where yen expected"));
    }
    if n.value == 0.0 {
        return Ok(None);
    }
    if n.value < 0.0 {
        return Err(invalid(n, "negative yen amount"));
    }
    if !YEN_RANGE.contains(&n.value) {
        return Err(invalid(n, "yen amount out of range"));
    }
    Ok(Some(n.value.round() as u64))
}

/// Sales in millions of yen, unrounded.
pub fn sales_mil_jpy(raw: &CellValue, unit: SalesUnit) -> Result<Option<f64>, CellError> {
    let Some(n) = numeric(raw)? else {
        return Ok(None);
    };
    if n.percent {
        return Err(invalid(n, "percentage where sales expected"));
    }
    if n.value == 0.0 {
        return Ok(None);
    }
    if n.value < 0.0 {
        return Err(invalid(n, "negative sales"));
    }
    Ok(Some(n.value / unit.per_million()))
}

/// Round an aggregated sales figure to whole millions.
pub fn whole_millions(v: f64) -> u64 {
    v.max(0.0).round() as u64
}
