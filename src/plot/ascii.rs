//! ASCII line chart for terminal previews.
//!
//! Fixed-size grid with deterministic output (helpful for golden tests).
//!
//! Chart elements:
//! - observations: one marker per column (`*`, `o`, `+`, `x`, `#`, `@`, then repeating)
//! - consecutive observations of a column are joined with `.`
//! - x is proportional to calendar time, so gaps in the axis show as gaps

use crate::domain::AlignedTable;

const MARKERS: [char; 6] = ['*', 'o', '+', 'x', '#', '@'];
const LINE: char = '.';

/// Render every column of `table` on one chart with a legend underneath.
pub fn render_ascii_chart(table: &AlignedTable, width: usize, height: usize) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (Some(first), Some(last), Some((lo, hi))) = (table.min_date(), table.max_date(), table.value_bounds())
    else {
        return "(nothing to plot)\n".to_string();
    };

    let (y_min, y_max) = if hi > lo {
        pad_range(lo, hi, 0.05)
    } else {
        (lo - 1.0, hi + 1.0)
    };
    let t_max = (last - first).num_days() as f64;

    let mut grid = vec![vec![' '; width]; height];
    for idx in 0..table.columns.len() {
        let points: Vec<(usize, usize)> = table
            .column_values(idx)
            .filter_map(|(date, v)| {
                let t = (date - first).num_days() as f64;
                Some((map_x(t, 0.0, t_max, width), map_y(v?, y_min, y_max, height)))
            })
            .collect();
        draw_series(&mut grid, &points, marker_for(idx));
    }

    let mut out = String::new();
    out.push_str(&format!("Chart: {first} to {last} | y=[{y_min:.4}, {y_max:.4}]\n"));
    for row in grid {
        out.push_str(row.into_iter().collect::<String>().trim_end());
        out.push('\n');
    }
    for (idx, label) in table.columns.iter().enumerate() {
        out.push_str(&format!("  {} {label}\n", marker_for(idx)));
    }

    out
}

fn marker_for(idx: usize) -> char {
    MARKERS[idx % MARKERS.len()]
}

fn draw_series(grid: &mut [Vec<char>], points: &[(usize, usize)], marker: char) {
    for pair in points.windows(2) {
        let ((x0, y0), (x1, y1)) = (pair[0], pair[1]);
        draw_line(grid, x0, y0, x1, y1, LINE);
    }
    for &(x, y) in points {
        grid[y][x] = marker;
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    if t_max <= t_min {
        return 0;
    }
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish). Only fills blank cells.
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

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn chart_golden_snapshot_small() {
        let table = AlignedTable {
            dates: vec![d(2020, 1, 1), d(2020, 1, 2), d(2020, 1, 3)],
            columns: vec!["USD/CAD".to_string()],
            rows: vec![vec![Some(1.0)], vec![Some(2.0)], vec![Some(3.0)]],
            frequency: None,
        };
        let chart = render_ascii_chart(&table, 10, 5);
        let expected = concat!(
            "Chart: 2020-01-01 to 2020-01-03 | y=[0.9000, 3.1000]\n",
            "        .*\n",
            "      ..\n",
            "    .*\n",
            "  ..\n",
            "*.\n",
            "  * USD/CAD\n",
        );
        assert_eq!(chart, expected);
    }

    #[test]
    fn each_column_gets_its_own_marker() {
        let table = AlignedTable {
            dates: vec![d(2020, 1, 1), d(2020, 1, 31)],
            columns: vec!["A".to_string(), "B".to_string()],
            rows: vec![vec![Some(0.0), None], vec![None, Some(10.0)]],
            frequency: None,
        };
        let chart = render_ascii_chart(&table, 20, 6);
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 1 + 6 + 2);
        assert_eq!(lines[1], "                   o");
        assert_eq!(lines[6], "*");
        assert_eq!(lines[7], "  * A");
        assert_eq!(lines[8], "  o B");
    }

    #[test]
    fn flat_or_single_point_series_still_renders() {
        let table = AlignedTable {
            dates: vec![d(2020, 1, 1)],
            columns: vec!["A".to_string()],
            rows: vec![vec![Some(5.0)]],
            frequency: None,
        };
        let chart = render_ascii_chart(&table, 10, 5);
        assert!(chart.contains("y=[4.0000, 6.0000]"));
        assert_eq!(chart.lines().nth(3), Some("*"));
    }

    #[test]
    fn nothing_to_plot() {
        let table = AlignedTable {
            dates: vec![d(2020, 1, 1)],
            columns: vec!["A".to_string()],
            rows: vec![vec![None]],
            frequency: None,
        };
        assert_eq!(render_ascii_chart(&table, 10, 5), "(nothing to plot)\n");
    }
}
