use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{register_font, FontStyle};

use crate::error::PersistenceError;
use crate::model::{Compartment, EquationSystem, Transfer};
use crate::simulator::{Overview, Panel};

/// Draws the two figures of a run.
pub trait Renderer {
    /// Diagram of the compartments and the transfers between them.
    fn render_model(&self, system: &EquationSystem, path: &Path) -> Result<(), PersistenceError>;

    /// Three stacked panels: population, contaminant and phase portrait.
    fn render_overview(&self, overview: &Overview, path: &Path) -> Result<(), PersistenceError>;
}

const FONT_FAMILY: &str = "sans-serif";

const FONT_CANDIDATES: [&str; 6] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Font registered with plotters for the lifetime of the process.
static FONT: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Register the first readable font, trying `preferred` before the common
/// system locations. Registration happens once per process; later calls
/// report whether it succeeded.
fn register_text_font(preferred: Option<&Path>) -> bool {
    FONT.get_or_init(|| {
        let candidates = preferred
            .map(Path::to_path_buf)
            .into_iter()
            .chain(FONT_CANDIDATES.iter().map(PathBuf::from));
        for path in candidates {
            let Ok(bytes) = std::fs::read(&path) else {
                continue;
            };
            let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
            match register_font(FONT_FAMILY, FontStyle::Normal, bytes) {
                Ok(()) => {
                    tracing::debug!(font = %path.display(), "Registered plot font");
                    return Some(path);
                }
                Err(_) => tracing::debug!(font = %path.display(), "Skipping unusable font"),
            }
        }
        None
    })
    .is_some()
}

/// [Renderer] writing PNG files through the plotters bitmap backend.
#[derive(Debug, Clone)]
pub struct PlotRenderer {
    text: bool,
    overview_size: (u32, u32),
    model_size: (u32, u32),
}

impl Default for PlotRenderer {
    fn default() -> Self {
        Self::new(None)
    }
}

impl PlotRenderer {
    /// Without a usable font the figures are still produced, minus captions,
    /// tick labels and legends.
    pub fn new(font: Option<&Path>) -> Self {
        let text = register_text_font(font);
        if !text {
            tracing::warn!("No usable font found, figures will be drawn without text");
        }
        Self {
            text,
            overview_size: (1200, 1500),
            model_size: (1000, 760),
        }
    }

    /// Whether captions and labels are drawn.
    pub fn has_text(&self) -> bool {
        self.text
    }
}

impl Renderer for PlotRenderer {
    fn render_model(&self, system: &EquationSystem, path: &Path) -> Result<(), PersistenceError> {
        let root = BitMapBackend::new(path, self.model_size).into_drawing_area();
        draw_model(&root, system, self.text).map_err(|e| render_error(path, e))
    }

    fn render_overview(&self, overview: &Overview, path: &Path) -> Result<(), PersistenceError> {
        let root = BitMapBackend::new(path, self.overview_size).into_drawing_area();
        draw_overview(&root, overview, self.text).map_err(|e| render_error(path, e))
    }
}

fn render_error(path: &Path, err: Box<dyn Error>) -> PersistenceError {
    PersistenceError::Render {
        artifact: path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        reason: err.to_string(),
    }
}

fn draw_overview<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    overview: &Overview,
    text: bool,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let areas = root.split_evenly((3, 1));
    for (area, panel) in areas.iter().zip(overview.panels()) {
        draw_panel(area, panel, text)?;
    }
    root.present()?;
    Ok(())
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    text: bool,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    let mut builder = ChartBuilder::on(area);
    builder.margin(15);
    if text {
        builder
            .caption(panel.title, (FONT_FAMILY, 24))
            .x_label_area_size(40)
            .y_label_area_size(60);
    }
    let mut chart =
        builder.build_cartesian_2d(panel.x_range.clone(), panel.y_range.clone())?;

    if text {
        chart
            .configure_mesh()
            .x_desc(panel.x_label)
            .y_desc(panel.y_label)
            .draw()?;
    } else {
        let (x, y) = (&panel.x_range, &panel.y_range);
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x.start, y.end), (x.start, y.start), (x.end, y.start)],
            BLACK,
        )))?;
    }

    for (i, series) in panel.series.iter().enumerate() {
        let style = Palette99::pick(i).stroke_width(2);
        let drawn = chart.draw_series(LineSeries::new(series.points.iter().copied(), style))?;
        if text {
            drawn
                .label(series.label.clone())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
        }
    }

    if text {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;
    }
    Ok(())
}

const BOX_HALF: (i32, i32) = (60, 30);
const STUB: i32 = 90;

/// Pixel centre of each compartment in the diagram.
fn node(compartment: Compartment) -> (i32, i32) {
    match compartment {
        Compartment::PlantContaminant => (250, 130),
        Compartment::HerbivoreContaminant => (750, 130),
        Compartment::Soil => (500, 300),
        Compartment::Plant => (250, 470),
        Compartment::Herbivore => (750, 470),
    }
}

fn draw_model<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    system: &EquationSystem,
    text: bool,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    for compartment in Compartment::ALL {
        let (cx, cy) = node(compartment);
        let fill = if compartment.is_contaminant() {
            RGBColor(250, 220, 200)
        } else {
            RGBColor(210, 235, 210)
        };
        let corners = [
            (cx - BOX_HALF.0, cy - BOX_HALF.1),
            (cx + BOX_HALF.0, cy + BOX_HALF.1),
        ];
        root.draw(&Rectangle::new(corners, fill.filled()))?;
        root.draw(&Rectangle::new(corners, BLACK.stroke_width(2)))?;
        if text {
            root.draw(&Text::new(
                compartment.symbol().to_string(),
                (cx - 12, cy - 10),
                (FONT_FAMILY, 22.0).into_font(),
            ))?;
        }
    }

    // Parallel arrows between the same pair of boxes, and stubs on the same
    // box, are fanned out by their count so far.
    let mut drawn: Vec<(Option<Compartment>, Option<Compartment>)> = Vec::new();
    for transfer in system.transfers() {
        let key = (transfer.from, transfer.to);
        let lane = drawn
            .iter()
            .filter(|k| **k == key || **k == (key.1, key.0))
            .count() as i32;
        drawn.push(key);

        let (start, end) = arrow_endpoints(&transfer, lane);
        let color = if transfer.is_internal() {
            BLACK.mix(0.8)
        } else {
            BLUE.mix(0.6)
        };
        draw_arrow(root, start, end, color.stroke_width(2))?;

        if text {
            let mid = ((start.0 + end.0) / 2 + 4, (start.1 + end.1) / 2 - 16);
            root.draw(&Text::new(
                transfer.process.name().to_string(),
                mid,
                (FONT_FAMILY, 13.0).into_font(),
            ))?;
        }
    }

    if text {
        let (_, height) = root.dim_in_pixel();
        let top = height as i32 - 26 * (Compartment::ALL.len() as i32) - 20;
        for (i, line) in system.lines().into_iter().enumerate() {
            root.draw(&Text::new(
                line,
                (30, top + 26 * i as i32),
                (FONT_FAMILY, 16.0).into_font(),
            ))?;
        }
    }

    root.present()?;
    Ok(())
}

fn arrow_endpoints(transfer: &Transfer, lane: i32) -> ((i32, i32), (i32, i32)) {
    let offset = 14 * lane;
    match (transfer.from, transfer.to) {
        (Some(from), Some(to)) => {
            let (a, b) = (node(from), node(to));
            let (dx, dy) = ((b.0 - a.0) as f64, (b.1 - a.1) as f64);
            let length = (dx * dx + dy * dy).sqrt().max(1.0);
            let (ux, uy) = (dx / length, dy / length);
            // Perpendicular shift keeps opposite directions apart too.
            let shift = 8.0 + offset as f64;
            let (px, py) = (-uy * shift, ux * shift);
            let inset = 70.0;
            let start = (
                (a.0 as f64 + ux * inset + px) as i32,
                (a.1 as f64 + uy * inset + py) as i32,
            );
            let end = (
                (b.0 as f64 - ux * inset + px) as i32,
                (b.1 as f64 - uy * inset + py) as i32,
            );
            (start, end)
        }
        (None, Some(to)) => {
            let (cx, cy) = node(to);
            let y = cy - BOX_HALF.1 + 10 + offset;
            ((cx - BOX_HALF.0 - STUB, y), (cx - BOX_HALF.0, y))
        }
        (Some(from), None) => {
            let (cx, cy) = node(from);
            let y = cy - BOX_HALF.1 + 10 + offset;
            ((cx + BOX_HALF.0, y), (cx + BOX_HALF.0 + STUB, y))
        }
        (None, None) => ((0, 0), (0, 0)),
    }
}

fn draw_arrow<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    start: (i32, i32),
    end: (i32, i32),
    style: ShapeStyle,
) -> Result<(), Box<dyn Error>>
where
    DB::ErrorType: 'static,
{
    if start == end {
        return Ok(());
    }
    root.draw(&PathElement::new(vec![start, end], style))?;

    let (dx, dy) = ((end.0 - start.0) as f64, (end.1 - start.1) as f64);
    let length = (dx * dx + dy * dy).sqrt();
    let (ux, uy) = (dx / length, dy / length);
    let (size, half) = (12.0, 5.0);
    let base = (end.0 as f64 - ux * size, end.1 as f64 - uy * size);
    let head = vec![
        end,
        ((base.0 - uy * half) as i32, (base.1 + ux * half) as i32),
        ((base.0 + uy * half) as i32, (base.1 - ux * half) as i32),
    ];
    root.draw(&Polygon::new(head, style.color.filled()))?;
    Ok(())
}
