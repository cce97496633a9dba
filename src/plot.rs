// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Plots of power against radial velocity. Only available with the "plotting"
//! feature.

use std::path::Path;

use thiserror::Error;

use crate::observation::{format_time, ObservationRecord};

/// Plot `record` to a PNG at `path`. `y_limits` of `None` fits the y axis to
/// the data.
pub fn plot_record(
    record: &ObservationRecord,
    path: &Path,
    y_limits: Option<(f64, f64)>,
    power_unit: &str,
) -> Result<(), PlotError> {
    let (x_range, y_range) = axis_limits(record, y_limits)?;
    let m = &record.metadata;
    let title = match &m.spectral_line {
        Some(line) => format!("{line} at {} UTC", format_time(m.time)),
        None => format!("{} UTC", format_time(m.time)),
    };
    let caption = format!(
        "l = {:.2}°, b = {:.2}°   RA = {:.2}°, Dec = {:.2}°   LSR correction: {:.2} km/s",
        m.galactic.0, m.galactic.1, m.equatorial.0, m.equatorial.1, m.lsr_correction
    );

    render(record, path, x_range, y_range, &title, &caption, power_unit)
}

#[cfg(feature = "plotting")]
fn render(
    record: &ObservationRecord,
    path: &Path,
    x_range: (f64, f64),
    y_range: (f64, f64),
    title: &str,
    caption: &str,
    power_unit: &str,
) -> Result<(), PlotError> {
    plotting::draw(record, path, x_range, y_range, title, caption, power_unit)?;
    log::info!("Wrote {}", path.display());
    Ok(())
}

#[cfg(not(feature = "plotting"))]
fn render(
    _: &ObservationRecord,
    _: &Path,
    _: (f64, f64),
    _: (f64, f64),
    _: &str,
    _: &str,
    _: &str,
) -> Result<(), PlotError> {
    // Plotting is an optional feature, because its C dependencies can't be
    // compiled statically.
    Err(PlotError::NoPlottingFeature)
}

/// The x (velocity) and y (power) extents of a plot. Non-finite values are
/// ignored.
pub(crate) fn axis_limits(
    record: &ObservationRecord,
    y_limits: Option<(f64, f64)>,
) -> Result<((f64, f64), (f64, f64)), PlotError> {
    let finite_range = |values: &[f64]| {
        values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc: Option<(f64, f64)>, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    };

    let (x_min, x_max) = finite_range(&record.velocities).ok_or(PlotError::Empty)?;
    let x_range = if x_min == x_max {
        (x_min - 1.0, x_max + 1.0)
    } else {
        (x_min, x_max)
    };

    let y_range = match y_limits {
        Some((min, max)) if min < max => (min, max),
        Some((min, max)) => return Err(PlotError::InvalidLimits { min, max }),
        None => {
            let (lo, hi) = finite_range(&record.power).ok_or(PlotError::Empty)?;
            let pad = if hi > lo { 0.05 * (hi - lo) } else { 1.0 };
            (lo - pad, hi + pad)
        }
    };
    Ok((x_range, y_range))
}

#[derive(Error, Debug)]
pub enum PlotError {
    #[cfg(not(feature = "plotting"))]
    #[error("radioline was not compiled with the \"plotting\" feature.\nYou need to compile radioline from source with this feature to make plots")]
    NoPlottingFeature,

    #[error("The observation has no finite values to plot")]
    Empty,

    #[error("The y-axis minimum ({min}) must be less than the maximum ({max})")]
    InvalidLimits { min: f64, max: f64 },

    #[cfg(feature = "plotting")]
    #[error("Error from the plotters library: {0}")]
    Draw(String),
}

#[cfg(feature = "plotting")]
mod plotting {
    use plotters::prelude::*;

    use super::*;

    /// The number of X pixels on the plots.
    const X_PIXELS: u32 = 1600;
    /// The number of Y pixels on the plots.
    const Y_PIXELS: u32 = 1000;
    /// The number of dots in the 0 km/s line.
    const NUM_DOTS: usize = 80;

    #[allow(clippy::too_many_arguments)]
    pub(super) fn draw(
        record: &ObservationRecord,
        path: &Path,
        (x_min, x_max): (f64, f64),
        (y_min, y_max): (f64, f64),
        title: &str,
        caption: &str,
        power_unit: &str,
    ) -> Result<(), PlotError> {
        let root = BitMapBackend::new(path, (X_PIXELS, Y_PIXELS)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| PlotError::Draw(e.to_string()))?;
        let (plot_area, caption_area) = root.split_vertically(Y_PIXELS - 50);
        caption_area
            .draw_text(
                caption,
                &("sans-serif", 26).into_font().color(&BLACK),
                (20, 10),
            )
            .map_err(|e| PlotError::Draw(e.to_string()))?;

        let mut chart = ChartBuilder::on(&plot_area)
            .caption(title, ("sans-serif", 40))
            .margin(20)
            .x_label_area_size(60)
            .y_label_area_size(90)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)
            .map_err(|e| PlotError::Draw(e.to_string()))?;
        chart
            .configure_mesh()
            .x_desc("Radial velocity (km/s)")
            .y_desc(format!("Power ({power_unit})"))
            .light_line_style(&WHITE)
            .draw()
            .map_err(|e| PlotError::Draw(e.to_string()))?;

        chart
            .draw_series(LineSeries::new(
                record
                    .velocities
                    .iter()
                    .zip(&record.power)
                    .filter(|(v, p)| v.is_finite() && p.is_finite())
                    .map(|(&v, &p)| (v, p)),
                &BLUE,
            ))
            .map_err(|e| PlotError::Draw(e.to_string()))?;

        if (x_min..=x_max).contains(&0.0) {
            let step = (y_max - y_min) / NUM_DOTS as f64;
            chart
                .draw_series(PointSeries::of_element(
                    (0..=NUM_DOTS).map(|i| (0.0, y_min + i as f64 * step)),
                    1,
                    ShapeStyle::from(&BLACK).filled(),
                    &|coord, size, style| {
                        EmptyElement::at(coord) + Circle::new((0, 0), size, style)
                    },
                ))
                .map_err(|e| PlotError::Draw(e.to_string()))?;
        }

        root.present().map_err(|e| PlotError::Draw(e.to_string()))?;
        Ok(())
    }
}
