//! # 收敛热图
//!
//! 使用 `plotters` 把收敛数据画成 slab 厚度 × 真空厚度的热图，
//! 每个终止面 index 一个面板，格子里标能量值和可选的耗时。
//!
//! ## 依赖关系
//! - 被 `commands/convergence.rs` 调用
//! - 使用 `convergence/parse.rs` 的 ConvergenceRow
//! - 使用 `plotters` 渲染图表

use crate::convergence::parse::ConvergenceRow;
use crate::error::{Result, SlabgenError};

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::Path;

/// 画哪个量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotMetric {
    SurfaceEnergy,
    EnergyPerAtom,
}

impl PlotMetric {
    fn value(&self, row: &ConvergenceRow) -> f64 {
        match self {
            PlotMetric::SurfaceEnergy => row.surface_energy,
            PlotMetric::EnergyPerAtom => row.slab_per_atom,
        }
    }

    pub fn title_fragment(&self) -> &'static str {
        match self {
            PlotMetric::SurfaceEnergy => "surface energies",
            PlotMetric::EnergyPerAtom => "energies per atom",
        }
    }

    pub fn file_fragment(&self) -> &'static str {
        match self {
            PlotMetric::SurfaceEnergy => "surface_energy",
            PlotMetric::EnergyPerAtom => "energy_per_atom",
        }
    }
}

/// 一个终止面 index 的数据矩阵
pub struct HeatmapPanel {
    pub index: String,
    pub slab_ticks: Vec<String>,
    pub vac_ticks: Vec<String>,
    /// values[slab 行][vac 列]
    pub values: Vec<Vec<Option<f64>>>,
    pub times: Vec<Vec<Option<f64>>>,
}

/// 把数据行按终止面分组、按厚度透视成矩阵
pub fn build_panels(rows: &[ConvergenceRow], metric: PlotMetric) -> Vec<HeatmapPanel> {
    let mut indices: Vec<String> = rows.iter().map(|r| r.slab_index.clone()).collect();
    indices.sort_by_key(|s| s.parse::<usize>().unwrap_or(0));
    indices.dedup();

    let numeric_sort = |ticks: &mut Vec<String>| {
        ticks.sort_by(|a, b| {
            let fa: f64 = a.parse().unwrap_or(0.0);
            let fb: f64 = b.parse().unwrap_or(0.0);
            fa.partial_cmp(&fb).unwrap()
        });
        ticks.dedup();
    };

    indices
        .into_iter()
        .map(|index| {
            let group: Vec<&ConvergenceRow> =
                rows.iter().filter(|r| r.slab_index == index).collect();

            let mut slab_ticks: Vec<String> =
                group.iter().map(|r| r.slab_thickness.clone()).collect();
            numeric_sort(&mut slab_ticks);
            let mut vac_ticks: Vec<String> =
                group.iter().map(|r| r.vac_thickness.clone()).collect();
            numeric_sort(&mut vac_ticks);

            let mut values = vec![vec![None; vac_ticks.len()]; slab_ticks.len()];
            let mut times = vec![vec![None; vac_ticks.len()]; slab_ticks.len()];
            for row in &group {
                let i = slab_ticks.iter().position(|t| *t == row.slab_thickness);
                let j = vac_ticks.iter().position(|t| *t == row.vac_thickness);
                if let (Some(i), Some(j)) = (i, j) {
                    values[i][j] = Some(metric.value(row));
                    times[i][j] = Some(row.time_taken);
                }
            }

            HeatmapPanel {
                index,
                slab_ticks,
                vac_ticks,
                values,
                times,
            }
        })
        .collect()
}

/// 渲染热图到 PNG 或 SVG
#[allow(clippy::too_many_arguments)]
pub fn render_heatmaps(
    panels: &[HeatmapPanel],
    title: &str,
    output_path: &Path,
    width: u32,
    height: u32,
    show_time: bool,
    use_svg: bool,
) -> Result<()> {
    if panels.is_empty() {
        return Err(SlabgenError::Other(
            "No data to plot (empty convergence table)".to_string(),
        ));
    }

    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_panels(&root, panels, title, show_time)?;
        root.present()
            .map_err(|e| SlabgenError::Other(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_panels(&root, panels, title, show_time)?;
        root.present()
            .map_err(|e| SlabgenError::Other(e.to_string()))?;
    }
    Ok(())
}

fn draw_panels<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    panels: &[HeatmapPanel],
    title: &str,
    show_time: bool,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| SlabgenError::Other(format!("{:?}", e)))?;

    let titled = root
        .titled(title, ("sans-serif", 26))
        .map_err(|e| SlabgenError::Other(format!("{:?}", e)))?;

    let areas = titled.split_evenly((1, panels.len()));

    for (area, panel) in areas.iter().zip(panels.iter()) {
        draw_single_panel(area, panel, panels.len() > 1, show_time)?;
    }

    Ok(())
}

fn draw_single_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    panel: &HeatmapPanel,
    label_index: bool,
    show_time: bool,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let err = |e| SlabgenError::Other(format!("{:?}", e));

    let n_rows = panel.slab_ticks.len() as i32;
    let n_cols = panel.vac_ticks.len() as i32;

    // 右侧留出颜色条
    let (w, _) = area.dim_in_pixel();
    let (chart_area, bar_area) = area.split_horizontally(w.saturating_sub(70));

    let caption = if label_index {
        format!("Slab index {}", panel.index)
    } else {
        String::new()
    };

    let mut chart = ChartBuilder::on(&chart_area)
        .caption(caption, ("sans-serif", 18).into_font())
        .margin(15)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d((0..n_cols).into_segmented(), (0..n_rows).into_segmented())
        .map_err(err)?;

    let vac_ticks = panel.vac_ticks.clone();
    let slab_ticks = panel.slab_ticks.clone();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Vacuum thickness")
        .y_desc("Slab thickness")
        .x_label_style(("sans-serif", 14))
        .y_label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .x_label_formatter(&move |v| segment_label(v, &vac_ticks))
        .y_label_formatter(&move |v| segment_label(v, &slab_ticks))
        .draw()
        .map_err(err)?;

    // 颜色归一化范围
    let flat: Vec<f64> = panel
        .values
        .iter()
        .flatten()
        .filter_map(|v| *v)
        .filter(|v| v.is_finite())
        .collect();
    let v_min = flat.iter().cloned().fold(f64::INFINITY, f64::min);
    let v_max = flat.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let span = if (v_max - v_min).abs() < 1e-12 {
        1.0
    } else {
        v_max - v_min
    };

    // 格子
    for (i, row) in panel.values.iter().enumerate() {
        for (j, value) in row.iter().enumerate() {
            let value = match value {
                Some(v) if v.is_finite() => *v,
                _ => continue,
            };
            let t = (value - v_min) / span;
            let color = heat_color(t);

            let (ci, ri) = (j as i32, i as i32);
            chart
                .draw_series(std::iter::once(Rectangle::new(
                    [
                        (SegmentValue::Exact(ci), SegmentValue::Exact(ri)),
                        (SegmentValue::Exact(ci + 1), SegmentValue::Exact(ri + 1)),
                    ],
                    color.filled(),
                )))
                .map_err(err)?;

            // 数值标签：格子中心偏上
            let value_style = ("sans-serif", 13)
                .into_font()
                .color(&BLACK)
                .pos(Pos::new(HPos::Center, VPos::Bottom));
            chart
                .draw_series(std::iter::once(Text::new(
                    format!("{:.3}", value),
                    (SegmentValue::CenterOf(ci), SegmentValue::CenterOf(ri)),
                    value_style,
                )))
                .map_err(err)?;

            // 耗时标签：格子中心偏下
            if show_time {
                if let Some(time) = panel.times[i][j] {
                    let time_style = ("sans-serif", 11)
                        .into_font()
                        .color(&BLACK)
                        .pos(Pos::new(HPos::Center, VPos::Top));
                    chart
                        .draw_series(std::iter::once(Text::new(
                            format!("{:.0} s", time),
                            (SegmentValue::CenterOf(ci), SegmentValue::CenterOf(ri)),
                            time_style,
                        )))
                        .map_err(err)?;
                }
            }
        }
    }

    draw_colorbar(&bar_area, v_min, v_max)?;

    Ok(())
}

/// 分段坐标刻度 -> 厚度标签
fn segment_label(v: &SegmentValue<i32>, ticks: &[String]) -> String {
    let idx = match v {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => *i,
        SegmentValue::Last => return String::new(),
    };
    ticks
        .get(idx as usize)
        .cloned()
        .unwrap_or_default()
}

/// 右侧竖直颜色条，带最大最小值标注
fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    v_min: f64,
    v_max: f64,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let err = |e| SlabgenError::Other(format!("{:?}", e));

    let (w, h) = area.dim_in_pixel();
    if w < 20 || h < 80 {
        return Ok(());
    }

    let bar_x0 = 8i32;
    let bar_x1 = 24i32;
    let bar_y0 = 40i32;
    let bar_y1 = h as i32 - 60;
    let steps = 64;

    for s in 0..steps {
        let t0 = s as f64 / steps as f64;
        let t1 = (s + 1) as f64 / steps as f64;
        // 自上而下由大到小
        let y0 = bar_y0 + ((1.0 - t1) * (bar_y1 - bar_y0) as f64) as i32;
        let y1 = bar_y0 + ((1.0 - t0) * (bar_y1 - bar_y0) as f64) as i32;
        area.draw(&Rectangle::new(
            [(bar_x0, y0), (bar_x1, y1)],
            heat_color((t0 + t1) / 2.0).filled(),
        ))
        .map_err(err)?;
    }

    let label_style = ("sans-serif", 12).into_font().color(&BLACK);
    area.draw(&Text::new(
        format!("{:.3}", v_max),
        (bar_x0 - 4, bar_y0 - 16),
        label_style.clone(),
    ))
    .map_err(err)?;
    area.draw(&Text::new(
        format!("{:.3}", v_min),
        (bar_x0 - 4, bar_y1 + 6),
        label_style,
    ))
    .map_err(err)?;

    Ok(())
}

/// 黄-橙热图配色，t ∈ [0, 1]
fn heat_color(t: f64) -> RGBColor {
    const STOPS: [(u8, u8, u8); 5] = [
        (228, 255, 122),
        (255, 232, 26),
        (255, 189, 0),
        (255, 160, 0),
        (252, 127, 0),
    ];

    let t = t.clamp(0.0, 1.0) * (STOPS.len() - 1) as f64;
    let i = (t.floor() as usize).min(STOPS.len() - 2);
    let f = t - i as f64;

    let lerp = |a: u8, b: u8| -> u8 { (a as f64 + (b as f64 - a as f64) * f).round() as u8 };
    RGBColor(
        lerp(STOPS[i].0, STOPS[i + 1].0),
        lerp(STOPS[i].1, STOPS[i + 1].1),
        lerp(STOPS[i].2, STOPS[i + 1].2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(slab: &str, vac: &str, index: &str, gamma: f64) -> ConvergenceRow {
        ConvergenceRow {
            slab_thickness: slab.to_string(),
            vac_thickness: vac.to_string(),
            slab_index: index.to_string(),
            surface_energy: gamma,
            slab_toten: -10.0,
            slab_per_atom: -5.0,
            time_taken: 60.0,
        }
    }

    #[test]
    fn test_build_panels_pivot() {
        let rows = vec![
            row("20", "10", "0", 0.5),
            row("20", "20", "0", 0.6),
            row("30", "10", "0", 0.7),
            row("30", "20", "0", 0.8),
            row("20", "10", "1", 1.0),
        ];
        let panels = build_panels(&rows, PlotMetric::SurfaceEnergy);

        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].index, "0");
        assert_eq!(panels[0].slab_ticks, vec!["20", "30"]);
        assert_eq!(panels[0].vac_ticks, vec!["10", "20"]);
        assert_eq!(panels[0].values[0][1], Some(0.6));
        assert_eq!(panels[0].values[1][0], Some(0.7));

        // index 1 只有一个点，矩阵 1x1
        assert_eq!(panels[1].values.len(), 1);
        assert_eq!(panels[1].values[0][0], Some(1.0));
    }

    #[test]
    fn test_build_panels_missing_cells() {
        let rows = vec![
            row("20", "10", "0", 0.5),
            row("30", "20", "0", 0.8),
        ];
        let panels = build_panels(&rows, PlotMetric::SurfaceEnergy);
        assert_eq!(panels[0].values[0][1], None);
        assert_eq!(panels[0].values[1][0], None);
    }

    #[test]
    fn test_metric_selection() {
        let rows = vec![row("20", "10", "0", 0.5)];
        let panels = build_panels(&rows, PlotMetric::EnergyPerAtom);
        assert_eq!(panels[0].values[0][0], Some(-5.0));
    }

    #[test]
    fn test_heat_color_endpoints() {
        assert_eq!(heat_color(0.0), RGBColor(228, 255, 122));
        assert_eq!(heat_color(1.0), RGBColor(252, 127, 0));
        // 越界截断
        assert_eq!(heat_color(-0.5), heat_color(0.0));
        assert_eq!(heat_color(1.5), heat_color(1.0));
    }

    #[test]
    fn test_render_svg_smoke() {
        let rows = vec![
            row("20", "10", "0", 0.5),
            row("20", "20", "0", 0.6),
            row("30", "10", "0", 0.7),
            row("30", "20", "0", 0.8),
        ];
        let panels = build_panels(&rows, PlotMetric::SurfaceEnergy);
        let path = std::env::temp_dir().join("slabgen_test_heatmap.svg");
        render_heatmaps(&panels, "101 surface energies", &path, 800, 600, true, true).unwrap();
        assert!(path.exists());
    }
}
