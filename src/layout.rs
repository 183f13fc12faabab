//! Grouping of positioned text runs into spans, lines and blocks
//!
//! Runs arrive in content-stream order, which is usually reading order, so
//! nothing is sorted by y. Only consecutive runs sharing a baseline are
//! merged into a line, and consecutive lines stacked close together into a
//! block.

use crate::geometry::Rect;
use crate::page::{TextBlock, TextLine, TextSpan};

/// A run of text produced by one show operator, in page space
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    /// Font display name
    pub font: String,
    /// Rendered font size in points
    pub size: f64,
    /// Packed `0xRRGGBB`
    pub color: Option<u32>,
    /// Left edge
    pub x: f64,
    /// Baseline y (top-left origin)
    pub baseline: f64,
    pub width: f64,
    /// Distance from baseline to the top of the glyph box
    pub ascent: f64,
    /// Distance from baseline to the bottom of the glyph box (negative)
    pub descent: f64,
}

impl TextRun {
    fn bbox(&self) -> Rect {
        Rect::new(
            self.x,
            self.baseline - self.ascent,
            self.x + self.width,
            self.baseline - self.descent,
        )
    }

    fn same_style(&self, span: &TextSpan) -> bool {
        self.font == span.font && (self.size - span.size).abs() < 0.01 && self.color == span.color
    }
}

/// Thresholds for grouping, all relative to the font size
#[derive(Debug, Clone)]
pub struct LayoutOptions {
    /// Maximum baseline difference for runs on one line
    pub baseline_tolerance: f64,
    /// Horizontal gap beyond which a run starts a new line (column break)
    pub column_gap: f64,
    /// Horizontal gap that becomes a space between merged runs
    pub space_gap: f64,
    /// Maximum vertical gap between lines of one block, in line heights
    pub block_gap: f64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            baseline_tolerance: 0.5,
            column_gap: 3.0,
            space_gap: 0.15,
            block_gap: 0.8,
        }
    }
}

struct LineBuilder {
    baseline: f64,
    x0: f64,
    x1: f64,
    size: f64,
    runs: Vec<TextRun>,
}

impl LineBuilder {
    fn new(run: TextRun) -> Self {
        LineBuilder {
            baseline: run.baseline,
            x0: run.x,
            x1: run.x + run.width,
            size: run.size,
            runs: vec![run],
        }
    }

    fn accepts(&self, run: &TextRun, options: &LayoutOptions) -> bool {
        let size = self.size.max(run.size);
        let tolerance = options.baseline_tolerance * size;
        (self.baseline - run.baseline).abs() <= tolerance
            && run.x >= self.x0 - tolerance
            && run.x <= self.x1 + options.column_gap * size
    }

    fn push(&mut self, run: TextRun) {
        self.x0 = self.x0.min(run.x);
        self.x1 = self.x1.max(run.x + run.width);
        self.size = self.size.max(run.size);
        self.runs.push(run);
    }

    fn finish(mut self, options: &LayoutOptions) -> TextLine {
        self.runs
            .sort_by(|a, b| a.x.partial_cmp(&b.x).unwrap_or(std::cmp::Ordering::Equal));

        let mut spans: Vec<TextSpan> = Vec::new();
        for run in self.runs {
            let run_box = run.bbox();
            let Some(last) = spans.last_mut() else {
                spans.push(span_from(run, run_box));
                continue;
            };

            let gap = run.x - last.bbox.x1;
            let needs_space = gap > options.space_gap * run.size
                && !last.text.ends_with(char::is_whitespace)
                && !run.text.starts_with(char::is_whitespace);

            if run.same_style(last) {
                if needs_space {
                    last.text.push(' ');
                }
                last.text.push_str(&run.text);
                last.bbox = last.bbox.union(&run_box);
            } else {
                let mut span = span_from(run, run_box);
                if needs_space {
                    span.text.insert(0, ' ');
                }
                spans.push(span);
            }
        }

        let bbox = spans
            .iter()
            .map(|s| s.bbox)
            .reduce(|a, b| a.union(&b))
            .unwrap_or_else(Rect::empty);
        TextLine { spans, bbox }
    }
}

fn span_from(run: TextRun, bbox: Rect) -> TextSpan {
    TextSpan {
        text: run.text,
        font: run.font,
        size: run.size,
        color: run.color,
        bbox,
    }
}

/// Group runs into lines, preserving stream order between lines and
/// ordering runs left to right within a line
pub fn group_into_lines(runs: Vec<TextRun>, options: &LayoutOptions) -> Vec<TextLine> {
    let mut lines: Vec<LineBuilder> = Vec::new();

    for run in runs {
        if run.text.trim().is_empty() {
            continue;
        }
        match lines.last_mut() {
            Some(line) if line.accepts(&run, options) => line.push(run),
            _ => lines.push(LineBuilder::new(run)),
        }
    }

    lines.into_iter().map(|l| l.finish(options)).collect()
}

/// Group runs into blocks of vertically stacked, horizontally overlapping
/// lines
pub fn group_into_blocks(runs: Vec<TextRun>, options: &LayoutOptions) -> Vec<TextBlock> {
    let mut blocks: Vec<TextBlock> = Vec::new();

    for line in group_into_lines(runs, options) {
        match blocks.last_mut() {
            Some(block) if continues_block(block, &line, options) => {
                block.bbox = block.bbox.union(&line.bbox);
                block.lines.push(line);
            }
            _ => blocks.push(TextBlock {
                bbox: line.bbox,
                lines: vec![line],
            }),
        }
    }

    blocks
}

fn continues_block(block: &TextBlock, line: &TextLine, options: &LayoutOptions) -> bool {
    let gap = line.bbox.y0 - block.bbox.y1;
    gap <= options.block_gap * line.bbox.height()
        && line.bbox.y0 >= block.bbox.y0
        && line.bbox.overlaps_horizontally(&block.bbox)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, x: f64, baseline: f64) -> TextRun {
        TextRun {
            text: text.into(),
            font: "Helvetica".into(),
            size: 12.0,
            color: Some(0),
            x,
            baseline,
            width: text.len() as f64 * 6.0,
            ascent: 9.6,
            descent: -2.4,
        }
    }

    #[test]
    fn test_group_into_lines() {
        let runs = vec![
            run("Hello", 100.0, 100.0),
            run("World", 136.0, 100.0),
            run("Next line", 100.0, 120.0),
        ];

        let lines = group_into_lines(runs, &LayoutOptions::default());
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].text(), "Hello World");
        assert_eq!(lines[0].spans.len(), 1);
        assert_eq!(lines[1].text(), "Next line");
    }

    #[test]
    fn test_adjacent_runs_merge_without_space() {
        let runs = vec![run("Hel", 100.0, 100.0), run("lo", 118.0, 100.0)];
        let lines = group_into_lines(runs, &LayoutOptions::default());
        assert_eq!(lines[0].text(), "Hello");
    }

    #[test]
    fn test_style_change_starts_new_span() {
        let mut bold = run("bold", 136.0, 100.0);
        bold.font = "Helvetica-Bold".into();
        let mut red = run("red", 166.0, 100.0);
        red.color = Some(0xFF0000);
        let runs = vec![run("plain", 100.0, 100.0), bold, red];

        let lines = group_into_lines(runs, &LayoutOptions::default());
        let spans = &lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[1].text, " bold");
        assert_eq!(spans[2].color, Some(0xFF0000));
    }

    #[test]
    fn test_column_gap_breaks_line() {
        let runs = vec![run("Left", 50.0, 100.0), run("Right", 350.0, 100.0)];
        let lines = group_into_lines(runs, &LayoutOptions::default());
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_whitespace_runs_dropped() {
        let runs = vec![run("   ", 50.0, 100.0)];
        assert!(group_into_lines(runs, &LayoutOptions::default()).is_empty());
    }

    #[test]
    fn test_blocks_split_on_vertical_gap() {
        let runs = vec![
            run("Title", 72.0, 100.0),
            run("Para line one", 72.0, 200.0),
            run("Para line two", 72.0, 214.0),
        ];

        let blocks = group_into_blocks(runs, &LayoutOptions::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines.len(), 1);
        assert_eq!(blocks[1].lines.len(), 2);
        assert_eq!(blocks[1].bbox.y0, 200.0 - 9.6);
        assert_eq!(blocks[1].bbox.y1, 214.0 + 2.4);
    }

    #[test]
    fn test_blocks_split_on_columns() {
        let runs = vec![
            run("left one", 50.0, 100.0),
            run("left two", 50.0, 114.0),
            run("right one", 350.0, 100.0),
            run("right two", 350.0, 114.0),
        ];

        let blocks = group_into_blocks(runs, &LayoutOptions::default());
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].lines[1].text(), "left two");
        assert_eq!(blocks[1].lines[0].text(), "right one");
    }
}
