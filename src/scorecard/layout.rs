//! Drawing-free layout planner for the scorecard report.
//!
//! The planner walks the submission with a layout cursor (millimetres from
//! the top edge of an A4 page) and emits positioned draw ops, deciding page
//! breaks purely from the cursor position. Keeping this separate from the
//! PDF emitter makes break points, wrapping, and grouping unit-testable
//! without touching a drawing backend.

use super::policy::{self, Rgb};
use super::{AssessmentSubmission, CategoryScore, Recommendation, RecommendationStatus};

pub const PAGE_WIDTH: f64 = 210.0;
pub const PAGE_HEIGHT: f64 = 297.0;

const MARGIN: f64 = 10.0;
const HEADER_BAND_HEIGHT: f64 = 40.0;
const NEW_PAGE_TOP: f64 = 20.0;
/// Vertical position past which the next recommendation moves to a new page.
const PAGE_BREAK_Y: f64 = 250.0;
const FOOTER_BASELINE: f64 = PAGE_HEIGHT - 12.0;

const SCORE_BOX_WIDTH: f64 = 100.0;
const SCORE_BOX_HEIGHT: f64 = 40.0;
const SCORE_BOX_RADIUS: f64 = 3.0;

const ROW_HEIGHT: f64 = 8.0;
const ROW_BASELINE: f64 = 5.5;
const COLUMN_WIDTHS: [f64; 4] = [80.0, 30.0, 30.0, 50.0];

const BULLET_INDENT: f64 = 15.0;
const BODY_INDENT: f64 = 20.0;
const BODY_WIDTH: f64 = 170.0;
const BODY_LINE_HEIGHT: f64 = 5.0;

const PT_TO_MM: f64 = 0.352_778;
/// Average Helvetica glyph advance as a fraction of the font size. Good
/// enough for wrapping and centering with the builtin (non-embedded) fonts,
/// which expose no exact metrics.
const AVG_GLYPH_ADVANCE_EM: f64 = 0.5;

const WHITE: Rgb = Rgb {
    r: 255,
    g: 255,
    b: 255,
};
const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
const BAND_BLUE: Rgb = Rgb {
    r: 59,
    g: 130,
    b: 246,
};
const TABLE_HEADER_FILL: Rgb = Rgb {
    r: 240,
    g: 240,
    b: 240,
};
const ROW_FILL_EVEN: Rgb = Rgb {
    r: 250,
    g: 250,
    b: 250,
};
const BAR_BACKGROUND: Rgb = Rgb {
    r: 230,
    g: 230,
    b: 230,
};
const FOOTER_GRAY: Rgb = Rgb {
    r: 128,
    g: 128,
    b: 128,
};
const CRITICAL_HEADING: Rgb = Rgb {
    r: 220,
    g: 38,
    b: 38,
};
const ENHANCEMENT_HEADING: Rgb = Rgb {
    r: 245,
    g: 158,
    b: 11,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontFace {
    Regular,
    Bold,
    Oblique,
}

/// A single positioned drawing command. `y` grows downward from the top edge
/// of the page; the emitter converts to the PDF coordinate system.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        radius: f64,
        fill: Rgb,
    },
    Circle {
        cx: f64,
        cy: f64,
        radius: f64,
        fill: Rgb,
    },
    Text {
        x: f64,
        y: f64,
        size: f64,
        face: FontFace,
        color: Rgb,
        content: String,
    },
}

#[derive(Debug, Default, Clone)]
pub struct Page {
    pub ops: Vec<DrawOp>,
}

impl Page {
    /// Text contents in draw order, for assertions on layout structure.
    pub fn texts(&self) -> Vec<&str> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { content, .. } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// Lays out the full report and returns one op list per page, footers
/// included.
pub fn compose(submission: &AssessmentSubmission, generated_on: &str) -> Vec<Page> {
    let mut planner = Planner::new();

    planner.header_band(generated_on, &submission.email);
    planner.score_section(submission.score);
    planner.category_table(&submission.category_scores);

    if !submission.recommendations.is_empty() {
        planner.new_page();
        planner.recommendations_section(&submission.recommendations);
    }

    planner.finish()
}

struct Planner {
    pages: Vec<Page>,
    current: Page,
    cursor: f64,
}

impl Planner {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: Page::default(),
            cursor: NEW_PAGE_TOP,
        }
    }

    fn new_page(&mut self) {
        self.pages.push(std::mem::take(&mut self.current));
        self.cursor = NEW_PAGE_TOP;
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64, fill: Rgb) {
        self.current.ops.push(DrawOp::Rect {
            x,
            y,
            width,
            height,
            radius,
            fill,
        });
    }

    fn text(&mut self, x: f64, y: f64, size: f64, face: FontFace, color: Rgb, content: String) {
        self.current.ops.push(DrawOp::Text {
            x,
            y,
            size,
            face,
            color,
            content,
        });
    }

    fn text_centered(&mut self, y: f64, size: f64, face: FontFace, color: Rgb, content: String) {
        let x = (PAGE_WIDTH - estimated_text_width(&content, size)) / 2.0;
        self.text(x, y, size, face, color, content);
    }

    fn header_band(&mut self, generated_on: &str, email: &str) {
        self.rect(0.0, 0.0, PAGE_WIDTH, HEADER_BAND_HEIGHT, 0.0, BAND_BLUE);
        self.text_centered(
            17.0,
            24.0,
            FontFace::Bold,
            WHITE,
            "Cyber Resilience Scorecard".to_string(),
        );
        self.text_centered(
            28.0,
            12.0,
            FontFace::Regular,
            WHITE,
            "Assessment Results Report".to_string(),
        );

        self.cursor = 50.0;
        self.text(
            MARGIN,
            self.cursor,
            10.0,
            FontFace::Regular,
            BLACK,
            format!("Generated on: {generated_on}"),
        );
        self.cursor += 6.0;
        self.text(
            MARGIN,
            self.cursor,
            10.0,
            FontFace::Regular,
            BLACK,
            format!("Report for: {email}"),
        );
        self.cursor += 12.0;
    }

    fn score_section(&mut self, score: u8) {
        self.text(
            MARGIN,
            self.cursor,
            16.0,
            FontFace::Bold,
            BLACK,
            "Overall Resilience Score".to_string(),
        );
        self.cursor += 12.0;

        let box_x = (PAGE_WIDTH - SCORE_BOX_WIDTH) / 2.0;
        self.rect(
            box_x,
            self.cursor,
            SCORE_BOX_WIDTH,
            SCORE_BOX_HEIGHT,
            SCORE_BOX_RADIUS,
            policy::score_color(score),
        );
        self.text_centered(
            self.cursor + 24.0,
            36.0,
            FontFace::Bold,
            WHITE,
            format!("{score}%"),
        );
        self.cursor += SCORE_BOX_HEIGHT + 8.0;

        self.text(
            MARGIN,
            self.cursor,
            12.0,
            FontFace::Regular,
            BLACK,
            policy::score_interpretation(score).to_string(),
        );
        self.cursor += 18.0;
    }

    fn category_table(&mut self, categories: &[CategoryScore]) {
        self.text(
            MARGIN,
            self.cursor,
            16.0,
            FontFace::Bold,
            BLACK,
            "Category Breakdown".to_string(),
        );
        self.cursor += 10.0;

        let labels = ["Category", "Score", "Maximum", "Percentage"];
        let mut x = MARGIN;
        for (label, width) in labels.iter().zip(COLUMN_WIDTHS) {
            self.rect(x, self.cursor, width, ROW_HEIGHT, 0.0, TABLE_HEADER_FILL);
            self.cell_text(x, width, *label, FontFace::Bold, label == &"Category");
            x += width;
        }
        self.cursor += ROW_HEIGHT;

        for (index, category) in categories.iter().enumerate() {
            let fill = if index % 2 == 0 { ROW_FILL_EVEN } else { WHITE };
            let cells = [
                category.name.clone(),
                format!("{:.1}", category.score),
                format!("{:.1}", category.max),
                format!("{:.1}%", category.percentage),
            ];

            let mut x = MARGIN;
            for (column, content) in cells.iter().enumerate() {
                let width = COLUMN_WIDTHS[column];
                self.rect(x, self.cursor, width, ROW_HEIGHT, 0.0, fill);
                self.cell_text(x, width, content, FontFace::Regular, column == 0);
                x += width;
            }

            self.progress_bar(category.percentage);
            self.cursor += ROW_HEIGHT;
        }
    }

    fn cell_text(&mut self, cell_x: f64, cell_width: f64, content: &str, face: FontFace, left: bool) {
        let x = if left {
            cell_x + 2.0
        } else {
            cell_x + (cell_width - estimated_text_width(content, 10.0)) / 2.0
        };
        self.text(x, self.cursor + ROW_BASELINE, 10.0, face, BLACK, content.to_string());
    }

    /// Mini bar inside the percentage cell; fill width is proportional to
    /// the percentage, fill color comes from the score policy.
    fn progress_bar(&mut self, percentage: f64) {
        let bar_x = MARGIN + COLUMN_WIDTHS[0] + COLUMN_WIDTHS[1] + COLUMN_WIDTHS[2] + 5.0;
        let bar_y = self.cursor + 2.0;
        let bar_width = 40.0;
        let bar_height = 4.0;

        self.rect(bar_x, bar_y, bar_width, bar_height, 0.0, BAR_BACKGROUND);

        let fraction = (percentage / 100.0).clamp(0.0, 1.0);
        let fill = policy::score_color(percentage.clamp(0.0, 100.0) as u8);
        if fraction > 0.0 {
            self.rect(bar_x, bar_y, bar_width * fraction, bar_height, 0.0, fill);
        }
    }

    fn recommendations_section(&mut self, recommendations: &[Recommendation]) {
        self.text(
            MARGIN,
            self.cursor,
            16.0,
            FontFace::Bold,
            BLACK,
            "Recommendations for Improvement".to_string(),
        );
        self.cursor += 10.0;

        let critical: Vec<&Recommendation> = recommendations
            .iter()
            .filter(|rec| rec.status == RecommendationStatus::Missing)
            .collect();
        let enhancement: Vec<&Recommendation> = recommendations
            .iter()
            .filter(|rec| rec.status == RecommendationStatus::Partial)
            .collect();

        if !critical.is_empty() {
            self.text(
                MARGIN,
                self.cursor,
                14.0,
                FontFace::Bold,
                CRITICAL_HEADING,
                "Critical Improvements Needed".to_string(),
            );
            self.cursor += 8.0;
            self.bucket_list(&critical, CRITICAL_HEADING);
            self.cursor += 8.0;
        }

        if !enhancement.is_empty() {
            self.text(
                MARGIN,
                self.cursor,
                14.0,
                FontFace::Bold,
                ENHANCEMENT_HEADING,
                "Areas for Enhancement".to_string(),
            );
            self.cursor += 8.0;
            self.bucket_list(&enhancement, ENHANCEMENT_HEADING);
        }
    }

    fn bucket_list(&mut self, recommendations: &[&Recommendation], bullet: Rgb) {
        for (category, items) in group_by_category(recommendations) {
            self.text(
                MARGIN,
                self.cursor,
                11.0,
                FontFace::Bold,
                BLACK,
                category.to_string(),
            );
            self.cursor += 6.0;

            for rec in items {
                if self.cursor > PAGE_BREAK_Y {
                    self.new_page();
                }

                self.current.ops.push(DrawOp::Circle {
                    cx: BULLET_INDENT + 2.0,
                    cy: self.cursor + 2.5,
                    radius: 1.5,
                    fill: bullet,
                });

                // A paragraph can cross the threshold mid-wrap; the break
                // check runs per line, not just per recommendation.
                for line in wrap_text(&rec.text, BODY_WIDTH, 10.0) {
                    if self.cursor > PAGE_BREAK_Y {
                        self.new_page();
                    }
                    self.text(
                        BODY_INDENT,
                        self.cursor + 4.0,
                        10.0,
                        FontFace::Regular,
                        BLACK,
                        line,
                    );
                    self.cursor += BODY_LINE_HEIGHT;
                }
                self.cursor += 2.0;
            }
            self.cursor += 4.0;
        }
    }

    fn finish(mut self) -> Vec<Page> {
        self.pages.push(self.current);

        let total = self.pages.len();
        for (index, page) in self.pages.iter_mut().enumerate() {
            let content = format!("Page {}", index + 1);
            let x = (PAGE_WIDTH - estimated_text_width(&content, 8.0)) / 2.0;
            page.ops.push(DrawOp::Text {
                x,
                y: FOOTER_BASELINE,
                size: 8.0,
                face: FontFace::Oblique,
                color: FOOTER_GRAY,
                content,
            });
        }
        debug_assert!(total >= 1);

        self.pages
    }
}

/// Groups recommendations by category preserving first-seen category order,
/// so output is deterministic for a given submission.
pub fn group_by_category<'a>(
    recommendations: &[&'a Recommendation],
) -> Vec<(&'a str, Vec<&'a Recommendation>)> {
    let mut groups: Vec<(&str, Vec<&Recommendation>)> = Vec::new();
    for rec in recommendations {
        match groups.iter_mut().find(|(name, _)| *name == rec.category) {
            Some((_, items)) => items.push(rec),
            None => groups.push((rec.category.as_str(), vec![rec])),
        }
    }
    groups
}

pub fn estimated_text_width(text: &str, size_pt: f64) -> f64 {
    text.chars().count() as f64 * size_pt * AVG_GLYPH_ADVANCE_EM * PT_TO_MM
}

/// Greedy word wrap against the estimated glyph advance. A word wider than
/// the line is emitted on its own line rather than dropped.
pub fn wrap_text(text: &str, max_width_mm: f64, size_pt: f64) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        let candidate = if line.is_empty() {
            word.to_string()
        } else {
            format!("{line} {word}")
        };

        if estimated_text_width(&candidate, size_pt) <= max_width_mm || line.is_empty() {
            line = candidate;
        } else {
            lines.push(std::mem::take(&mut line));
            line = word.to_string();
        }
    }

    if !line.is_empty() {
        lines.push(line);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
