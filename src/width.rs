use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

use crate::terminal::TerminalOutput;

/// A glyph is wide when it renders more than this many reference widths.
pub const WIDE_GLYPH_RATIO: f64 = 1.4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidthModelKind {
    #[default]
    FontMetric,
    UnicodeTable,
}

impl std::str::FromStr for WidthModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "font-metric" | "font" => Ok(WidthModelKind::FontMetric),
            "unicode-table" | "unicode" => Ok(WidthModelKind::UnicodeTable),
            other => Err(format!("Unsupported width model '{}'", other)),
        }
    }
}

/// Column width of glyphs on the terminal grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WidthModel {
    /// Measure each glyph with the output's font against a reference width
    /// captured when the session starts.
    FontMetric { reference: f64 },
    UnicodeTable,
}

impl WidthModel {
    pub fn new(kind: WidthModelKind, output: &dyn TerminalOutput) -> Self {
        match kind {
            WidthModelKind::FontMetric => WidthModel::FontMetric {
                reference: output.reference_char_width(),
            },
            WidthModelKind::UnicodeTable => WidthModel::UnicodeTable,
        }
    }

    /// Number of columns (1 or 2) taken by `glyph`.
    pub fn columns(&self, glyph: &str, output: &dyn TerminalOutput) -> usize {
        let wide = match self {
            WidthModel::FontMetric { reference } => {
                output.measure_glyph(glyph) > WIDE_GLYPH_RATIO * reference
            }
            WidthModel::UnicodeTable => glyph.width() > 1,
        };
        if wide {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingOutput;

    #[test]
    fn test_font_metric_threshold() {
        let output = RecordingOutput::new();
        output.set_glyph_width("漢", 2.0);
        output.set_glyph_width("m", 1.3);
        output.set_glyph_width("w", 1.4);
        let model = WidthModel::new(WidthModelKind::FontMetric, &output);

        assert_eq!(model.columns("a", &output), 1);
        assert_eq!(model.columns("m", &output), 1);
        assert_eq!(model.columns("w", &output), 1);
        assert_eq!(model.columns("漢", &output), 2);
    }

    #[test]
    fn test_reference_width_is_captured_once() {
        let output = RecordingOutput::new();
        let model = WidthModel::new(WidthModelKind::FontMetric, &output);
        output.set_reference_width(10.0);
        output.set_glyph_width("x", 1.5);
        assert_eq!(model.columns("x", &output), 2);
    }

    #[test]
    fn test_unicode_table_model() {
        let output = RecordingOutput::new();
        let model = WidthModel::new(WidthModelKind::UnicodeTable, &output);
        assert_eq!(model.columns("a", &output), 1);
        assert_eq!(model.columns("漢", &output), 2);
        assert_eq!(model.columns("é", &output), 1);
    }

    #[test]
    fn test_width_model_kind_from_str() {
        assert_eq!(
            "unicode".parse::<WidthModelKind>(),
            Ok(WidthModelKind::UnicodeTable)
        );
        assert_eq!(
            "font-metric".parse::<WidthModelKind>(),
            Ok(WidthModelKind::FontMetric)
        );
        assert!("braille".parse::<WidthModelKind>().is_err());
    }
}
