//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks of a generated document
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - monthly occupancy: `o`
//! - consecutive months joined by a `-` line; gaps stay open

use crate::domain::KpiDocument;

/// One plotted month: running month index (`year * 12 + month - 1`) and occupancy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
    pub index: i64,
    pub occupancy_pct: f64,
}

/// Occupancy for every month that has one, in document order.
pub fn occupancy_series(document: &KpiDocument) -> Vec<SeriesPoint> {
    document
        .years
        .values()
        .flat_map(|record| {
            record.months.values().filter_map(move |m| {
                m.occupancy_pct.map(|occupancy_pct| SeriesPoint {
                    index: i64::from(record.year) * 12 + i64::from(m.month) - 1,
                    occupancy_pct,
                })
            })
        })
        .collect()
}

/// Render the monthly occupancy trend of a document.
pub fn render_occupancy_plot(document: &KpiDocument, width: usize, height: usize) -> String {
    let series = occupancy_series(document);
    let (Some(first), Some(last)) = (series.first(), series.last()) else {
        return "Occupancy: no data\n".to_string();
    };

    let width = width.max(10);
    let height = height.max(5);

    let (t_min, t_max) = if last.index > first.index {
        (first.index as f64, last.index as f64)
    } else {
        (first.index as f64 - 1.0, first.index as f64 + 1.0)
    };
    let (y_min, y_max) = y_range(&series).unwrap_or((first.occupancy_pct - 1.0, first.occupancy_pct + 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Lines first so the markers overlay them.
    for pair in series.windows(2) {
        if pair[1].index - pair[0].index != 1 {
            continue;
        }
        let (x0, y0) = to_cell(pair[0], t_min, t_max, y_min, y_max, width, height);
        let (x1, y1) = to_cell(pair[1], t_min, t_max, y_min, y_max, width, height);
        draw_line(&mut grid, x0, y0, x1, y1, '-');
    }
    for &p in &series {
        let (x, y) = to_cell(p, t_min, t_max, y_min, y_max, width, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Occupancy: {}..{} | occ=[{y_min:.1}, {y_max:.1}]%\n",
        month_label(first.index),
        month_label(last.index),
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn month_label(index: i64) -> String {
    format!("{}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

fn to_cell(
    p: SeriesPoint,
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
    width: usize,
    height: usize,
) -> (usize, usize) {
    (
        map_x(p.index as f64, t_min, t_max, width),
        map_y(p.occupancy_pct, y_min, y_max, height),
    )
}

fn y_range(series: &[SeriesPoint]) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for p in series {
        min_y = min_y.min(p.occupancy_pct);
        max_y = max_y.max(p.occupancy_pct);
    }
    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
