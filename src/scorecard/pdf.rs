//! PDF emission for the composed layout, plus the scoped report artifact.
//!
//! The emitter translates the planner's top-down millimetre coordinates into
//! printpdf's bottom-left origin and draws with the builtin Helvetica faces.

use std::fs;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Local;
use printpdf::utils::{calculate_points_for_circle, calculate_points_for_rect};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfLayerReference, Point,
    Rgb as PdfRgb,
};
use tracing::{info, warn};

use super::layout::{self, DrawOp, FontFace, Page};
use super::policy::Rgb;
use super::AssessmentSubmission;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("failed to prepare output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write report file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("pdf construction failed: {0}")]
    Pdf(String),
}

/// A rendered report on disk, owned exclusively by the request that created
/// it. The file is removed when the value drops, on every exit path.
#[derive(Debug)]
pub struct RenderedReport {
    path: PathBuf,
}

impl RenderedReport {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("report.pdf")
    }

    /// Disarms the drop guard and keeps the file on disk.
    pub fn persist(self) -> PathBuf {
        let this = std::mem::ManuallyDrop::new(self);
        this.path.clone()
    }
}

impl Drop for RenderedReport {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %self.path.display(), %err, "failed to remove report artifact");
            }
        }
    }
}

static RENDER_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_file_name() -> String {
    // Timestamp plus a process-wide sequence keeps concurrent requests from
    // colliding within the same second.
    let seq = RENDER_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "cyber_resilience_report_{}_{seq:04}.pdf",
        Local::now().format("%Y%m%d_%H%M%S")
    )
}

/// Renders submissions into PDF files under a dedicated output directory,
/// created on demand.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    output_dir: PathBuf,
}

impl PdfRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn render(&self, submission: &AssessmentSubmission) -> Result<RenderedReport, RenderError> {
        let generated_on = Local::now().format("%B %-d, %Y").to_string();
        let pages = layout::compose(submission, &generated_on);

        fs::create_dir_all(&self.output_dir).map_err(|source| RenderError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let path = self.output_dir.join(next_file_name());
        let bytes = emit_document(&pages)?;
        fs::write(&path, bytes).map_err(|source| RenderError::Write {
            path: path.clone(),
            source,
        })?;

        info!(path = %path.display(), pages = pages.len(), "scorecard report rendered");
        Ok(RenderedReport { path })
    }
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
}

impl Fonts {
    fn get(&self, face: FontFace) -> &IndirectFontRef {
        match face {
            FontFace::Regular => &self.regular,
            FontFace::Bold => &self.bold,
            FontFace::Oblique => &self.oblique,
        }
    }
}

fn emit_document(pages: &[Page]) -> Result<Vec<u8>, RenderError> {
    let (doc, first_page, first_layer) = PdfDocument::new(
        "Cyber Resilience Scorecard",
        Mm(layout::PAGE_WIDTH),
        Mm(layout::PAGE_HEIGHT),
        "Layer 1",
    );

    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|err| RenderError::Pdf(err.to_string()))?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|err| RenderError::Pdf(err.to_string()))?,
        oblique: doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(|err| RenderError::Pdf(err.to_string()))?,
    };

    let mut layer = doc.get_page(first_page).get_layer(first_layer);
    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            let (page_index, layer_index) =
                doc.add_page(Mm(layout::PAGE_WIDTH), Mm(layout::PAGE_HEIGHT), "Layer 1");
            layer = doc.get_page(page_index).get_layer(layer_index);
        }
        emit_page(&layer, &fonts, page);
    }

    let mut buffer = BufWriter::new(Vec::new());
    doc.save(&mut buffer)
        .map_err(|err| RenderError::Pdf(err.to_string()))?;
    buffer
        .into_inner()
        .map_err(|err| RenderError::Pdf(err.to_string()))
}

fn emit_page(layer: &PdfLayerReference, fonts: &Fonts, page: &Page) {
    for op in &page.ops {
        match op {
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                radius,
                fill,
            } => {
                layer.set_fill_color(pdf_color(*fill));
                layer.add_shape(rect_shape(*x, *y, *width, *height, *radius));
            }
            DrawOp::Circle {
                cx,
                cy,
                radius,
                fill,
            } => {
                layer.set_fill_color(pdf_color(*fill));
                layer.add_shape(filled(calculate_points_for_circle(
                    Mm(*radius),
                    Mm(*cx),
                    Mm(flip_y(*cy)),
                )));
            }
            DrawOp::Text {
                x,
                y,
                size,
                face,
                color,
                content,
            } => {
                layer.set_fill_color(pdf_color(*color));
                layer.use_text(content.clone(), *size, Mm(*x), Mm(flip_y(*y)), fonts.get(*face));
            }
        }
    }
}

/// Converts a top-down y coordinate to printpdf's bottom-left origin.
fn flip_y(y: f64) -> f64 {
    layout::PAGE_HEIGHT - y
}

fn pdf_color(rgb: Rgb) -> Color {
    Color::Rgb(PdfRgb::new(
        f64::from(rgb.r) / 255.0,
        f64::from(rgb.g) / 255.0,
        f64::from(rgb.b) / 255.0,
        None,
    ))
}

fn filled(points: Vec<(Point, bool)>) -> Line {
    Line {
        points,
        is_closed: true,
        has_fill: true,
        has_stroke: false,
        is_clipping_path: false,
    }
}

fn rect_shape(x: f64, y_top: f64, width: f64, height: f64, radius: f64) -> Line {
    let y_bottom = flip_y(y_top + height);
    if radius <= 0.0 {
        return filled(calculate_points_for_rect(
            Mm(width),
            Mm(height),
            Mm(x + width / 2.0),
            Mm(y_bottom + height / 2.0),
        ));
    }
    filled(rounded_rect_points(x, y_bottom, width, height, radius))
}

/// Closed path for a rounded rectangle, corners approximated with cubic
/// beziers (control points flagged `true`). Coordinates are PDF-space,
/// `(x, y)` being the bottom-left corner.
fn rounded_rect_points(x: f64, y: f64, width: f64, height: f64, radius: f64) -> Vec<(Point, bool)> {
    const K: f64 = 0.551_915;
    let r = radius.min(width / 2.0).min(height / 2.0);
    let k = r * K;
    let (x1, y1) = (x + width, y + height);

    vec![
        (Point::new(Mm(x + r), Mm(y)), false),
        (Point::new(Mm(x1 - r), Mm(y)), false),
        (Point::new(Mm(x1 - r + k), Mm(y)), true),
        (Point::new(Mm(x1), Mm(y + r - k)), true),
        (Point::new(Mm(x1), Mm(y + r)), false),
        (Point::new(Mm(x1), Mm(y1 - r)), false),
        (Point::new(Mm(x1), Mm(y1 - r + k)), true),
        (Point::new(Mm(x1 - r + k), Mm(y1)), true),
        (Point::new(Mm(x1 - r), Mm(y1)), false),
        (Point::new(Mm(x + r), Mm(y1)), false),
        (Point::new(Mm(x + r - k), Mm(y1)), true),
        (Point::new(Mm(x), Mm(y1 - r + k)), true),
        (Point::new(Mm(x), Mm(y1 - r)), false),
        (Point::new(Mm(x), Mm(y + r)), false),
        (Point::new(Mm(x), Mm(y + r - k)), true),
        (Point::new(Mm(x + r - k), Mm(y)), true),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scorecard::{CategoryScore, Recommendation, RecommendationStatus};

    fn sample_submission() -> AssessmentSubmission {
        AssessmentSubmission {
            email: "a@b.com".to_string(),
            html_content: None,
            score: 85,
            category_scores: vec![CategoryScore {
                name: "Network".to_string(),
                score: 8.0,
                max: 10.0,
                percentage: 80.0,
            }],
            recommendations: vec![Recommendation {
                category: "Network".to_string(),
                question: String::new(),
                text: "Enable MFA".to_string(),
                status: RecommendationStatus::Missing,
            }],
        }
    }

    #[test]
    fn renders_a_pdf_file_into_the_output_directory() {
        let dir = tempfile::tempdir().expect("temp dir");
        let renderer = PdfRenderer::new(dir.path());

        let report = renderer.render(&sample_submission()).expect("render succeeds");
        assert!(report.path().exists());
        assert!(report.file_name().ends_with(".pdf"));
        assert!(report.file_name().starts_with("cyber_resilience_report_"));

        let bytes = fs::read(report.path()).expect("artifact readable");
        assert!(bytes.starts_with(b"%PDF"), "artifact must be a PDF");
    }

    #[test]
    fn artifact_is_removed_on_drop() {
        let dir = tempfile::tempdir().expect("temp dir");
        let renderer = PdfRenderer::new(dir.path());

        let report = renderer.render(&sample_submission()).expect("render succeeds");
        let path = report.path().to_path_buf();
        assert!(path.exists());
        drop(report);
        assert!(!path.exists(), "drop must delete the artifact");
    }

    #[test]
    fn consecutive_renders_use_distinct_names() {
        let dir = tempfile::tempdir().expect("temp dir");
        let renderer = PdfRenderer::new(dir.path());

        let first = renderer.render(&sample_submission()).expect("first render");
        let second = renderer.render(&sample_submission()).expect("second render");
        assert_ne!(first.path(), second.path());
    }

    #[test]
    fn render_fails_when_output_directory_is_a_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"occupied").expect("write blocker");

        let renderer = PdfRenderer::new(&blocker);
        let err = renderer
            .render(&sample_submission())
            .expect_err("render must fail");
        assert!(matches!(err, RenderError::OutputDir { .. }));
    }
}
