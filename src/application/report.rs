//! Report service: Renders a single prediction as a PDF assessment.

use chrono::{DateTime, Utc};

use crate::adapters::pdf::{Font, PdfDocument};
use crate::domain::{round2, Effect, ReportRequest, FEATURE_ORDER};

pub const REPORT_FILENAME: &str = "Heart_Disease_Report.pdf";

const DISCLAIMER: &str = "This report is for educational purposes only and is not a substitute \
                          for professional medical advice.";

const INCREASING_RGB: (f64, f64, f64) = (0.91, 0.29, 0.24);
const DECREASING_RGB: (f64, f64, f64) = (0.15, 0.66, 0.38);

const MARGIN: f64 = 40.0;
const INDENT: f64 = 60.0;

/// Service for producing assessment reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportService;

impl ReportService {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render `request` stamped with the current time.
    #[must_use]
    pub fn render(&self, request: &ReportRequest) -> Vec<u8> {
        self.render_at(request, Utc::now())
    }

    /// Render `request` stamped with `generated_at`.
    #[must_use]
    pub fn render_at(&self, request: &ReportRequest, generated_at: DateTime<Utc>) -> Vec<u8> {
        let mut doc = PdfDocument::letter();
        let mut y = doc.height() - MARGIN;

        doc.set_font(Font::HelveticaBold, 18.0);
        doc.draw_text(MARGIN, y, "Heart Disease Risk Assessment Report");
        doc.set_font(Font::Helvetica, 10.0);
        doc.draw_text(
            MARGIN,
            y - 20.0,
            &format!("Generated: {}", generated_at.format("%Y-%m-%d %H:%M:%S UTC")),
        );
        y -= 50.0;

        doc.set_font(Font::HelveticaBold, 14.0);
        doc.draw_text(MARGIN, y, "Patient Input Summary");
        y -= 20.0;
        doc.set_font(Font::Helvetica, 10.0);
        for feature in FEATURE_ORDER {
            let value = request.patient.value(feature);
            doc.draw_text(INDENT, y, &format!("{}: {}", feature.summary_label(), value));
            y -= 15.0;
        }
        y -= 10.0;

        doc.set_font(Font::HelveticaBold, 14.0);
        doc.draw_text(MARGIN, y, "Risk Result");
        y -= 20.0;
        doc.set_font(Font::Helvetica, 12.0);
        match request.risk_level() {
            Some(level) => doc.set_fill_rgb8(level.color()),
            None => doc.set_fill_rgb(0.0, 0.0, 0.0),
        }
        doc.draw_text(INDENT, y, &format!("Risk Level: {}", request.risk_level));
        doc.set_fill_rgb(0.0, 0.0, 0.0);
        doc.draw_text(
            200.0,
            y,
            &format!("Probability: {}%", round2(request.risk_probability * 100.0)),
        );
        y -= 20.0;

        doc.set_font(Font::HelveticaBold, 14.0);
        doc.draw_text(MARGIN, y, "Top 5 Risk Factors");
        y -= 20.0;
        doc.set_font(Font::Helvetica, 10.0);
        for factor in request.top_factors() {
            let (r, g, b) = match factor.effect {
                Effect::Increasing => INCREASING_RGB,
                Effect::Decreasing => DECREASING_RGB,
            };
            doc.set_fill_rgb(r, g, b);
            doc.draw_text(
                INDENT,
                y,
                &format!(
                    "{}: {} ({} risk)",
                    factor.label,
                    factor.interpretation,
                    factor.effect.as_str()
                ),
            );
            doc.set_fill_rgb(0.0, 0.0, 0.0);
            y -= 15.0;
        }
        y -= 10.0;

        doc.set_font(Font::HelveticaBold, 12.0);
        doc.draw_text(MARGIN, y, "Disclaimer");
        y -= 15.0;
        doc.set_font(Font::Helvetica, 9.0);
        doc.draw_text(INDENT, y, DISCLAIMER);

        let bytes = doc.finish();
        tracing::debug!(bytes = bytes.len(), "Rendered assessment report");
        bytes
    }
}
