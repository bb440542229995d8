//! Frame Renderer
//! ==============
//!
//! Turns one [`Snapshot`] into one PNG frame, using the run's
//! [`GlobalScale`] so every frame of a run shares the same framing:
//!
//! - only alive records (E > 0) are drawn; an empty scene is still rendered
//! - color = viridis(E / max_energy), size = base + (C / max_charge) * range
//! - axes fixed to `[0, max_coord + 1]` on x, y and z, fixed camera angle
//! - an energy colorbar and a two-point charge size legend on every frame
//!
//! Rendering is split in two steps. [`FrameScene::build`] is pure and
//! computes exactly what will be drawn; [`FrameRenderer::render`]
//! rasterizes a scene with `plotters` and writes it to disk.

use crate::colormap::{viridis, Rgb};
use crate::scale::GlobalScale;
use crate::snapshot::Snapshot;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};
use sedlab_env::VizError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Marker size for a charge of zero.
pub const BASE_MARKER_SIZE: f64 = 10.0;

/// Extra marker size at the run's maximum charge.
pub const MARKER_SIZE_RANGE: f64 = 50.0;

const COLORBAR_STEPS: u32 = 64;
const FONT: &str = "sans-serif";
const LEGEND_GREY: RGBColor = RGBColor(128, 128, 128);

/// DejaVu Sans, bundled with the crate.
static FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Registers the bundled font under [`FONT`] once per process.
fn ensure_font() -> Result<(), String> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| register_font(FONT, FontStyle::Normal, FONT_BYTES).is_ok());
    if ok {
        Ok(())
    } else {
        Err("bundled font could not be loaded".to_string())
    }
}

// =============================================================================
// STYLE
// =============================================================================

/// Visual settings held identical across every frame of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderStyle {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Camera elevation in degrees
    pub elevation_deg: f64,
    /// Camera azimuth in degrees
    pub azimuth_deg: f64,
    /// Marker size at C = 0
    pub base_size: f64,
    /// Marker size added at C = max_charge
    pub size_range: f64,
    /// Marker opacity in [0, 1]
    pub point_alpha: f64,
    /// Draw titles, tick labels and legend text with the bundled font.
    /// When false, the same geometry is drawn with no text.
    pub annotate: bool,
}

impl Default for RenderStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 800,
            elevation_deg: 25.0,
            azimuth_deg: 45.0,
            base_size: BASE_MARKER_SIZE,
            size_range: MARKER_SIZE_RANGE,
            point_alpha: 0.8,
            annotate: true,
        }
    }
}

impl RenderStyle {
    /// Same style without any text.
    pub fn plain() -> Self {
        Self {
            annotate: false,
            ..Self::default()
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Marker size for a charge under the given scale.
    pub fn marker_size(&self, charge: f64, scale: &GlobalScale) -> f64 {
        self.base_size + scale.normalized_charge(charge) * self.size_range
    }
}

/// Marker sizes are areas; the drawn circle radius is the square root.
fn marker_radius(size: f64) -> i32 {
    size.max(0.0).sqrt().round().max(1.0) as i32
}

// =============================================================================
// SCENE
// =============================================================================

/// One drawn marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenePoint {
    /// Data coordinates (x, y, z)
    pub position: [f64; 3],
    pub energy: f64,
    pub charge: f64,
    pub color: Rgb,
    /// Marker area (base + normalized charge * range)
    pub size: f64,
}

/// Everything one frame shows, before rasterization.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameScene {
    pub cycle: u64,
    pub points: Vec<ScenePoint>,
    /// Upper bound of all three axes
    pub axis_limit: f64,
    /// Top of the colorbar
    pub max_energy: f64,
    /// Charge shown on the large legend marker
    pub max_charge: f64,
}

impl FrameScene {
    /// Builds the scene for a snapshot. Deterministic for a given input.
    pub fn build(snapshot: &Snapshot, scale: &GlobalScale, style: &RenderStyle) -> Self {
        let points = snapshot
            .alive()
            .map(|record| ScenePoint {
                position: [record.position.x, record.position.y, record.position.z],
                energy: record.energy,
                charge: record.charge,
                color: viridis(scale.normalized_energy(record.energy)),
                size: style.marker_size(record.charge, scale),
            })
            .collect();

        Self {
            cycle: snapshot.cycle,
            points,
            axis_limit: scale.axis_limit(),
            max_energy: scale.max_energy(),
            max_charge: scale.max_charge(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

// =============================================================================
// RENDERER
// =============================================================================

/// A frame written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedFrame {
    pub cycle: u64,
    pub path: PathBuf,
    /// Number of markers drawn
    pub points: usize,
}

/// Returns the path of the frame for `cycle`.
pub fn frame_path(output_dir: &Path, basename: &str, cycle: u64) -> PathBuf {
    output_dir.join(format!("{}_cycle_{}_visualisation.png", basename, cycle))
}

/// Writes frames of one run into an output directory.
#[derive(Debug, Clone)]
pub struct FrameRenderer {
    output_dir: PathBuf,
    basename: String,
    style: RenderStyle,
}

impl FrameRenderer {
    pub fn new(output_dir: impl Into<PathBuf>, basename: &str, style: RenderStyle) -> Self {
        Self {
            output_dir: output_dir.into(),
            basename: basename.to_string(),
            style,
        }
    }

    pub fn style(&self) -> &RenderStyle {
        &self.style
    }

    /// Renders one snapshot and writes it to its frame path, overwriting
    /// any existing file. Creates the output directory if needed.
    pub fn render(&self, snapshot: &Snapshot, scale: &GlobalScale) -> Result<RenderedFrame, VizError> {
        fs::create_dir_all(&self.output_dir)?;
        if self.style.annotate {
            ensure_font().map_err(|e| VizError::render(snapshot.cycle, e))?;
        }

        let scene = FrameScene::build(snapshot, scale, &self.style);
        let path = frame_path(&self.output_dir, &self.basename, scene.cycle);
        self.rasterize(&scene, &path)?;

        tracing::debug!(
            "Rendered cycle {} ({} alive) to {}",
            scene.cycle,
            scene.points.len(),
            path.display()
        );

        Ok(RenderedFrame {
            cycle: scene.cycle,
            path,
            points: scene.points.len(),
        })
    }

    fn rasterize(&self, scene: &FrameScene, path: &Path) -> Result<(), VizError> {
        let cycle = scene.cycle;
        let style = &self.style;

        let root = BitMapBackend::new(path, (style.width, style.height)).into_drawing_area();
        root.fill(&WHITE).map_err(|e| VizError::render(cycle, e))?;

        let plot_width = (style.width * 4 / 5) as i32;
        let (plot_area, side_area) = root.split_horizontally(plot_width);
        let side_height = side_area.dim_in_pixel().1 as i32;
        let (colorbar_area, legend_area) = side_area.split_vertically(side_height * 2 / 3);

        self.draw_chart(scene, &plot_area)
            .map_err(|e| VizError::render(cycle, e))?;
        self.draw_colorbar(scene, &colorbar_area)
            .map_err(|e| VizError::render(cycle, e))?;
        self.draw_size_legend(scene, &legend_area)
            .map_err(|e| VizError::render(cycle, e))?;

        root.present().map_err(|e| VizError::render(cycle, e))?;
        Ok(())
    }

    fn draw_chart<DB: DrawingBackend>(
        &self,
        scene: &FrameScene,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let style = &self.style;
        let limit = scene.axis_limit;

        let mut builder = ChartBuilder::on(area);
        builder.margin(20);
        if style.annotate {
            builder.caption(
                format!(
                    "Simulation SED - Cycle: {} ({} cellules vivantes)",
                    scene.cycle,
                    scene.points.len()
                ),
                (FONT, 22.0),
            );
        }

        let mut chart = builder.build_cartesian_3d(0.0..limit, 0.0..limit, 0.0..limit)?;

        let pitch = style.elevation_deg.to_radians();
        let yaw = style.azimuth_deg.to_radians();
        chart.with_projection(|mut pb| {
            pb.pitch = pitch;
            pb.yaw = yaw;
            pb.scale = 0.85;
            pb.into_matrix()
        });

        if style.annotate {
            chart
                .configure_axes()
                .light_grid_style(BLACK.mix(0.1))
                .max_light_lines(4)
                .draw()?;
        } else {
            chart.draw_series(
                bounding_box_edges(limit)
                    .into_iter()
                    .map(|(a, b)| PathElement::new(vec![a, b], BLACK.mix(0.4))),
            )?;
        }

        let alpha = style.point_alpha.clamp(0.0, 1.0);
        chart.draw_series(scene.points.iter().map(|p| {
            let [r, g, b] = p.color;
            Circle::new(
                to_chart_coords(p.position),
                marker_radius(p.size),
                RGBColor(r, g, b).mix(alpha).filled(),
            )
        }))?;

        Ok(())
    }

    fn draw_colorbar<DB: DrawingBackend>(
        &self,
        scene: &FrameScene,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let (w, h) = area.dim_in_pixel();
        let (w, h) = (w as i32, h as i32);
        let top = h / 8;
        let bottom = h - h / 12;
        let left = w / 6;
        let right = left + (w / 5).max(8);
        let span = (bottom - top).max(1);

        for step in 0..COLORBAR_STEPS {
            let t0 = step as f64 / COLORBAR_STEPS as f64;
            let t1 = (step + 1) as f64 / COLORBAR_STEPS as f64;
            let y_low = bottom - (t0 * span as f64).round() as i32;
            let y_high = bottom - (t1 * span as f64).round() as i32;
            let [r, g, b] = viridis((t0 + t1) / 2.0);
            area.draw(&Rectangle::new(
                [(left, y_high), (right, y_low)],
                RGBColor(r, g, b).filled(),
            ))?;
        }
        area.draw(&Rectangle::new([(left, top), (right, bottom)], BLACK.stroke_width(1)))?;

        if self.style.annotate {
            let label_x = right + 6;
            for frac in [0.0, 0.5, 1.0] {
                let y = bottom - (frac * span as f64).round() as i32;
                area.draw(&Text::new(
                    format!("{:.2}", frac * scene.max_energy),
                    (label_x, y - 6),
                    (FONT, 14.0).into_font(),
                ))?;
            }
            area.draw(&Text::new("Energie (E)", (left, top / 3), (FONT, 16.0).into_font()))?;
        }

        Ok(())
    }

    fn draw_size_legend<DB: DrawingBackend>(
        &self,
        scene: &FrameScene,
        area: &DrawingArea<DB, Shift>,
    ) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
        let style = &self.style;
        let (w, h) = area.dim_in_pixel();
        let (w, h) = (w as i32, h as i32);
        let x = w / 4;

        let entries = [
            ("C = 0".to_string(), style.base_size),
            (
                format!("C = {:.2}", scene.max_charge),
                style.base_size + style.size_range,
            ),
        ];

        for (i, (label, size)) in entries.iter().enumerate() {
            let y = h / 3 + i as i32 * h / 4;
            area.draw(&Circle::new((x, y), marker_radius(*size), LEGEND_GREY.mix(0.8).filled()))?;
            if style.annotate {
                area.draw(&Text::new(label.clone(), (x + 14, y - 7), (FONT, 14.0).into_font()))?;
            }
        }

        if style.annotate {
            area.draw(&Text::new("Charge (C)", (x / 2, h / 10), (FONT, 16.0).into_font()))?;
        }

        Ok(())
    }
}

/// Data z is vertical; in plotters' 3D coordinates the second axis is up.
fn to_chart_coords(p: [f64; 3]) -> (f64, f64, f64) {
    (p[0], p[2], p[1])
}

/// The twelve edges of the cube `[0, limit]^3`, in chart coordinates.
fn bounding_box_edges(limit: f64) -> Vec<((f64, f64, f64), (f64, f64, f64))> {
    let corners: Vec<(f64, f64, f64)> = (0..8)
        .map(|i| {
            let pick = |bit: u32| if i & (1 << bit) != 0 { limit } else { 0.0 };
            (pick(0), pick(1), pick(2))
        })
        .collect();

    let mut edges = Vec::with_capacity(12);
    for a in 0..8usize {
        for bit in 0..3 {
            let b = a | (1 << bit);
            if b != a {
                edges.push((corners[a], corners[b]));
            }
        }
    }
    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::SnapshotRecord;
    use approx::assert_relative_eq;

    fn snapshot(cycle: u64, records: Vec<SnapshotRecord>) -> Snapshot {
        Snapshot {
            cycle,
            source: PathBuf::from("unused.csv"),
            records,
        }
    }

    #[test]
    fn test_scene_filters_dead_records() {
        let snap = snapshot(
            7,
            vec![
                SnapshotRecord::new(1.0, 1.0, 1.0, 0.5, 0.0),
                SnapshotRecord::new(2.0, 2.0, 2.0, 0.0, 1.0),
                SnapshotRecord::new(3.0, 3.0, 3.0, -0.2, 1.0),
                SnapshotRecord::new(4.0, 4.0, 4.0, 1.0, 1.0),
            ],
        );
        let scale = GlobalScale::estimate(std::slice::from_ref(&snap));
        let scene = FrameScene::build(&snap, &scale, &RenderStyle::default());

        assert_eq!(scene.cycle, 7);
        assert_eq!(scene.points.len(), 2);
        assert!(scene.points.iter().all(|p| p.energy > 0.0));
    }

    #[test]
    fn test_scene_color_and_size_mapping() {
        let snap = snapshot(1, vec![SnapshotRecord::new(1.0, 1.0, 1.0, 2.0, 0.5)]);
        let scale = GlobalScale::from_maxima(1.0, 2.0, 0.5);
        let scene = FrameScene::build(&snap, &scale, &RenderStyle::default());

        let point = &scene.points[0];
        assert_eq!(point.color, viridis(1.0));
        assert_relative_eq!(point.size, 60.0);
        assert_relative_eq!(scene.axis_limit, 2.0);
    }

    #[test]
    fn test_scene_saturates_above_max_energy() {
        let snap = snapshot(1, vec![SnapshotRecord::new(0.0, 0.0, 0.0, 10.0, 0.0)]);
        let scale = GlobalScale::from_maxima(1.0, 2.0, 1.0);
        let scene = FrameScene::build(&snap, &scale, &RenderStyle::default());
        assert_eq!(scene.points[0].color, viridis(1.0));
        assert_relative_eq!(scene.points[0].size, BASE_MARKER_SIZE);
    }

    #[test]
    fn test_scene_is_deterministic() {
        let snap = snapshot(
            3,
            (0..50)
                .map(|i| {
                    let f = i as f64;
                    SnapshotRecord::new(f % 7.0, f % 5.0, f % 3.0, (f - 10.0) / 20.0, f / 50.0)
                })
                .collect(),
        );
        let scale = GlobalScale::estimate(std::slice::from_ref(&snap));
        let style = RenderStyle::default();

        let first = FrameScene::build(&snap, &scale, &style);
        let second = FrameScene::build(&snap, &scale, &style);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_snapshot_gives_empty_scene() {
        let snap = snapshot(2, vec![SnapshotRecord::new(1.0, 1.0, 1.0, 0.0, 0.0)]);
        let scale = GlobalScale::estimate(std::slice::from_ref(&snap));
        let scene = FrameScene::build(&snap, &scale, &RenderStyle::default());
        assert!(scene.is_empty());
        assert_relative_eq!(scene.axis_limit, 2.0);
    }

    #[test]
    fn test_frame_path() {
        let path = frame_path(Path::new("out"), "run", 12);
        assert_eq!(path, PathBuf::from("out/run_cycle_12_visualisation.png"));
    }

    #[test]
    fn test_marker_radius() {
        assert_eq!(marker_radius(BASE_MARKER_SIZE), 3);
        assert_eq!(marker_radius(BASE_MARKER_SIZE + MARKER_SIZE_RANGE), 8);
        assert_eq!(marker_radius(0.0), 1);
    }

    #[test]
    fn test_bounding_box_has_twelve_edges() {
        let edges = bounding_box_edges(4.0);
        assert_eq!(edges.len(), 12);
    }

    #[test]
    fn test_render_writes_png_of_requested_size() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot(
            5,
            vec![
                SnapshotRecord::new(1.0, 2.0, 3.0, 0.8, 0.3),
                SnapshotRecord::new(3.0, 1.0, 0.0, 0.0, 0.9),
            ],
        );
        let scale = GlobalScale::estimate(std::slice::from_ref(&snap));
        let renderer = FrameRenderer::new(dir.path().join("frames"), "r", RenderStyle::plain().with_size(200, 160));

        let frame = renderer.render(&snap, &scale).unwrap();
        assert_eq!(frame.cycle, 5);
        assert_eq!(frame.points, 1);
        assert!(frame.path.ends_with("r_cycle_5_visualisation.png"));

        let img = image::open(&frame.path).unwrap();
        assert_eq!((img.width(), img.height()), (200, 160));

        // Rendering again overwrites in place
        let again = renderer.render(&snap, &scale).unwrap();
        assert_eq!(again.path, frame.path);
    }

    #[test]
    fn test_render_default_style_draws_text() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot(
            12,
            vec![
                SnapshotRecord::new(0.0, 1.0, 2.0, 0.4, 0.1),
                SnapshotRecord::new(2.0, 2.0, 1.0, 1.0, 0.7),
            ],
        );
        let scale = GlobalScale::estimate(std::slice::from_ref(&snap));
        let size = (400, 360);

        let annotated = FrameRenderer::new(dir.path().join("text"), "t", RenderStyle::default().with_size(size.0, size.1))
            .render(&snap, &scale)
            .unwrap();
        let plain = FrameRenderer::new(dir.path().join("plain"), "t", RenderStyle::plain().with_size(size.0, size.1))
            .render(&snap, &scale)
            .unwrap();

        let annotated = image::open(&annotated.path).unwrap().into_rgb8();
        let plain = image::open(&plain.path).unwrap().into_rgb8();
        assert_eq!(annotated.dimensions(), size);

        // Title, ticks and legend labels add dark pixels the plain frame lacks
        let dark = |img: &image::RgbImage| img.pixels().filter(|p| p.0.iter().all(|&c| c < 80)).count();
        assert!(dark(&annotated) > dark(&plain));
    }

    #[test]
    fn test_render_parallel_default_style() {
        use rayon::prelude::*;

        let dir = tempfile::tempdir().unwrap();
        let snaps: Vec<Snapshot> = (1..=4)
            .map(|c| snapshot(c, vec![SnapshotRecord::new(c as f64, 1.0, 1.0, 0.5, 0.5)]))
            .collect();
        let scale = GlobalScale::estimate(&snaps);
        let renderer = FrameRenderer::new(dir.path(), "p", RenderStyle::default().with_size(320, 320));

        let frames: Vec<RenderedFrame> = snaps
            .par_iter()
            .map(|s| renderer.render(s, &scale))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().all(|f| f.path.exists()));
    }

    #[test]
    fn test_render_empty_scene_still_writes_frame() {
        let dir = tempfile::tempdir().unwrap();
        let snap = snapshot(9, vec![]);
        let scale = GlobalScale::estimate(std::slice::from_ref(&snap));
        let renderer = FrameRenderer::new(dir.path(), "e", RenderStyle::plain().with_size(120, 120));

        let frame = renderer.render(&snap, &scale).unwrap();
        assert_eq!(frame.points, 0);
        assert!(frame.path.exists());
    }
}
