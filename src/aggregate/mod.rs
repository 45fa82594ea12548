//! Per-hotel → portfolio monthly figures.
//!
//! `aggregate_month` is pure: it only sees the contributions and a weighting
//! policy, never the layout that produced them.

use chrono::NaiveDate;
use tracing::debug;

use crate::domain::{HotelContribution, MonthQuality, MonthlyRecord};
use crate::extract::normalize::{round1, whole_millions};
use crate::extract::Weighting;

/// Number of days in `month` of `year` (used for room-night weights).
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1);
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 30,
    }
}

/// Weighted mean of `(value, weight)` pairs; `None` when nothing carries weight.
fn weighted_mean(pairs: impl Iterator<Item = (f64, f64)>) -> Option<f64> {
    let (sum, weight) = pairs.fold((0.0, 0.0), |(s, w), (v, wt)| (s + v * wt, w + wt));
    (weight > 0.0).then(|| sum / weight)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    weighted_mean(values.map(|v| (v, 1.0)))
}

/// Room counts for every hotel that reported `value`, or `None` if any is missing.
fn room_weights(
    contributions: &[HotelContribution],
    value: impl Fn(&HotelContribution) -> Option<f64>,
) -> Option<Vec<(f64, f64)>> {
    contributions
        .iter()
        .filter_map(|c| value(c).map(|v| (v, c.rooms)))
        .map(|(v, rooms)| rooms.map(|r| (v, f64::from(r))))
        .collect()
}

/// Combine one month's hotel contributions into a portfolio record.
///
/// `expected_hotels` is the number of hotels the sheet lists for the year;
/// fewer contributions mark the month as partial.
pub fn aggregate_month(
    year: i32,
    month: u32,
    contributions: &[HotelContribution],
    expected_hotels: usize,
    weighting: Weighting,
) -> MonthlyRecord {
    let by_rooms = weighting == Weighting::RoomCount;
    let days = f64::from(days_in_month(year, month));

    let occupancy = match room_weights(contributions, |c| c.occupancy_pct).filter(|_| by_rooms) {
        Some(pairs) => weighted_mean(pairs.into_iter()),
        None => {
            if by_rooms {
                debug!(year, month, "room counts incomplete; unweighted occupancy");
            }
            mean(contributions.iter().filter_map(|c| c.occupancy_pct))
        }
    }
    .map(round1);

    let room_nights: Option<Vec<(f64, f64)>> = contributions
        .iter()
        .filter_map(|c| c.adr_jpy.map(|adr| (adr as f64, c)))
        .map(|(adr, c)| match (c.rooms, c.occupancy_pct) {
            (Some(rooms), Some(occ)) => Some((adr, f64::from(rooms) * days * occ / 100.0)),
            _ => None,
        })
        .collect();
    let adr = match room_nights.filter(|_| by_rooms) {
        Some(pairs) => weighted_mean(pairs.into_iter()),
        None => mean(contributions.iter().filter_map(|c| c.adr_jpy.map(|v| v as f64))),
    }
    .map(|v| v.round() as u64);

    let revpar = match (adr, occupancy) {
        (Some(adr), Some(occ)) => Some((adr as f64 * occ / 100.0).round() as u64),
        _ => {
            let reported = room_weights(contributions, |c| c.revpar_jpy.map(|v| v as f64))
                .filter(|_| by_rooms)
                .and_then(|pairs| weighted_mean(pairs.into_iter()));
            reported
                .or_else(|| mean(contributions.iter().filter_map(|c| c.revpar_jpy.map(|v| v as f64))))
                .map(|v| v.round() as u64)
        }
    };

    let sales: Vec<f64> = contributions.iter().filter_map(|c| c.sales_mil_jpy).collect();
    let sales_total = (!sales.is_empty()).then(|| whole_millions(sales.iter().sum()));

    let reporting = contributions.len();
    MonthlyRecord {
        month,
        occupancy_pct: occupancy,
        adr_jpy: adr,
        revpar_jpy: revpar,
        sales_total_mil_jpy: sales_total,
        quality: MonthQuality {
            partial: reporting < expected_hotels,
            reporting_hotels: Some(reporting),
            expected_hotels: Some(expected_hotels),
        },
    }
}
