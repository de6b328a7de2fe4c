//! Phase-space portraits, divergence plots, and the frame-by-frame GIF.

use std::path::Path;

use anyhow::{anyhow, Result};
use pendlab_core::params::SystemParameters;
use pendlab_core::trajectory::Trajectory;
use plotters::coord::Shift;
use plotters::prelude::*;

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("plotting failed: {e}")
}

/// Range of a value sequence with a small margin on both sides.
fn padded_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() || !hi.is_finite() {
        return (-1.0, 1.0);
    }
    let pad = ((hi - lo) * 0.05).max(0.1);
    (lo - pad, hi + pad)
}

fn draw_portrait(
    area: &DrawingArea<BitMapBackend, Shift>,
    title: &str,
    points: &[(f64, f64)],
    color: &RGBColor,
) -> Result<()> {
    let (x_lo, x_hi) = padded_range(points.iter().map(|p| p.0));
    let (y_lo, y_hi) = padded_range(points.iter().map(|p| p.1));

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(45)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_desc("theta (rad)")
        .y_desc("omega (rad/s)")
        .draw()
        .map_err(draw_err)?;
    chart
        .draw_series(LineSeries::new(
            points.iter().copied(),
            color.mix(0.8).stroke_width(1),
        ))
        .map_err(draw_err)?;
    Ok(())
}

/// Static theta-omega portrait for each link, side by side.
pub fn phase_space(path: &Path, trajectory: &Trajectory) -> Result<()> {
    let root = BitMapBackend::new(path, (1200, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;
    let panels = root.split_evenly((1, 2));

    let link1: Vec<(f64, f64)> = trajectory
        .states()
        .iter()
        .map(|s| (s.theta1, s.omega1))
        .collect();
    let link2: Vec<(f64, f64)> = trajectory
        .states()
        .iter()
        .map(|s| (s.theta2, s.omega2))
        .collect();

    draw_portrait(&panels[0], "Link 1 phase space", &link1, &BLUE)?;
    draw_portrait(&panels[1], "Link 2 phase space", &link2, &RED)?;

    root.present().map_err(draw_err)?;
    Ok(())
}

/// Phase-space separation of two runs on a log scale.
pub fn divergence(path: &Path, times: &[f64], separation: &[f64]) -> Result<()> {
    let root = BitMapBackend::new(path, (800, 500)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let t_end = times.last().copied().unwrap_or(1.0);
    // Zeros cannot live on a log axis; clamp to a visible floor.
    let floor = 1e-16;
    let max_sep = separation.iter().copied().fold(floor, f64::max) * 2.0;
    let mut min_sep = separation
        .iter()
        .copied()
        .filter(|&v| v > 0.0)
        .fold(max_sep, f64::min)
        .max(floor);
    if min_sep >= max_sep {
        min_sep = max_sep / 10.0;
    }

    let mut chart = ChartBuilder::on(&root)
        .caption("Phase-space separation", ("sans-serif", 22))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..t_end, (min_sep..max_sep).log_scale())
        .map_err(draw_err)?;
    chart
        .configure_mesh()
        .x_desc("t (s)")
        .y_desc("separation")
        .draw()
        .map_err(draw_err)?;
    chart
        .draw_series(LineSeries::new(
            times
                .iter()
                .zip(separation)
                .map(|(&t, &d)| (t, d.max(floor))),
            MAGENTA.mix(0.9).stroke_width(1),
        ))
        .map_err(draw_err)?;

    root.present().map_err(draw_err)?;
    Ok(())
}

const FRAME_TARGET: usize = 200;
const TRAIL: usize = 40;

/// Renders the two-link configuration frame by frame into an animated GIF.
pub fn animate(path: &Path, trajectory: &Trajectory, params: &SystemParameters) -> Result<()> {
    if trajectory.len() < 2 {
        return Ok(());
    }
    let stride = (trajectory.len() / FRAME_TARGET).max(1);
    let sample_dt = trajectory.times()[1] - trajectory.times()[0];
    let delay_ms = ((sample_dt * stride as f64 * 1000.0).round() as u32).clamp(20, 200);

    let limit = params.l1 + params.l2 + 0.5;
    let root = BitMapBackend::gif(path, (500, 500), delay_ms)
        .map_err(draw_err)?
        .into_drawing_area();

    let positions: Vec<[(f64, f64); 2]> = trajectory
        .states()
        .iter()
        .map(|s| params.bob_positions(s))
        .collect();

    for frame in (0..trajectory.len()).step_by(stride) {
        let t = trajectory.times()[frame];
        root.fill(&WHITE).map_err(draw_err)?;
        let mut chart = ChartBuilder::on(&root)
            .caption(format!("t = {t:.2} s"), ("sans-serif", 18))
            .margin(10)
            .x_label_area_size(20)
            .y_label_area_size(20)
            .build_cartesian_2d(-limit..limit, -limit..limit)
            .map_err(draw_err)?;
        chart.configure_mesh().disable_mesh().draw().map_err(draw_err)?;

        // Fading trail of the far bob.
        let trail_start = frame.saturating_sub(TRAIL);
        chart
            .draw_series(LineSeries::new(
                positions[trail_start..=frame].iter().map(|p| p[1]),
                RED.mix(0.35).stroke_width(1),
            ))
            .map_err(draw_err)?;

        let [(x1, y1), (x2, y2)] = positions[frame];
        chart
            .draw_series(LineSeries::new(
                [(0.0, 0.0), (x1, y1), (x2, y2)],
                BLACK.stroke_width(2),
            ))
            .map_err(draw_err)?;
        chart
            .draw_series([
                Circle::new((x1, y1), 6, BLUE.filled()),
                Circle::new((x2, y2), 6, RED.filled()),
            ])
            .map_err(draw_err)?;

        root.present().map_err(draw_err)?;
    }
    Ok(())
}
