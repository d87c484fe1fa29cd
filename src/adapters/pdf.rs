//! Minimal single-page PDF 1.4 writer.
//!
//! Supports exactly what the assessment report draws: positioned text in
//! Helvetica / Helvetica-Bold with an RGB fill colour. Text outside
//! printable ASCII is replaced with `?` (the standard 14 fonts are used
//! without embedding).

use std::fmt::Write as _;

/// US Letter, in points.
pub const LETTER: (f64, f64) = (612.0, 792.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Self::Helvetica => "F1",
            Self::HelveticaBold => "F2",
        }
    }
}

/// A page under construction.
#[derive(Debug, Clone)]
pub struct PdfDocument {
    width: f64,
    height: f64,
    font: Font,
    font_size: f64,
    content: String,
}

impl PdfDocument {
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            font: Font::Helvetica,
            font_size: 12.0,
            content: String::new(),
        }
    }

    #[must_use]
    pub fn letter() -> Self {
        Self::new(LETTER.0, LETTER.1)
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn set_font(&mut self, font: Font, size: f64) {
        self.font = font;
        self.font_size = size;
    }

    /// Fill colour for subsequent text; components in `[0, 1]`.
    pub fn set_fill_rgb(&mut self, r: f64, g: f64, b: f64) {
        let _ = writeln!(
            self.content,
            "{:.3} {:.3} {:.3} rg",
            r.clamp(0.0, 1.0),
            g.clamp(0.0, 1.0),
            b.clamp(0.0, 1.0)
        );
    }

    pub fn set_fill_rgb8(&mut self, (r, g, b): (u8, u8, u8)) {
        self.set_fill_rgb(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        );
    }

    /// Draw `text` with its baseline starting at `(x, y)` (origin bottom-left).
    pub fn draw_text(&mut self, x: f64, y: f64, text: &str) {
        let _ = writeln!(
            self.content,
            "BT /{} {} Tf {:.2} {:.2} Td ({}) Tj ET",
            self.font.resource(),
            self.font_size,
            x,
            y,
            escape_text(text)
        );
    }

    /// Serialize the document.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 5 0 R /F2 6 0 R >> >> /Contents 4 0 R >>",
                self.width, self.height
            ),
            format!(
                "<< /Length {} >>\nstream\n{}endstream",
                self.content.len(),
                self.content
            ),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica-Bold /Encoding /WinAnsiEncoding >>"
                .to_string(),
        ];

        let mut out: Vec<u8> = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref_offset = out.len();
        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(xref, "{offset:010} 00000 n \n");
        }
        let _ = write!(
            xref,
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        );
        out.extend_from_slice(xref.as_bytes());
        out
    }
}

/// Escape a string for a PDF literal; non-printable or non-ASCII becomes `?`.
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '(' | ')' => {
                out.push('\\');
                out.push(c);
            }
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Byte-for-byte view with the binary header marker masked.
    fn as_text(bytes: &[u8]) -> String {
        let masked = bytes
            .iter()
            .map(|&b| if b.is_ascii() { b } else { b'?' })
            .collect();
        String::from_utf8(masked).unwrap()
    }

    #[test]
    fn test_document_structure() {
        let mut doc = PdfDocument::letter();
        doc.set_font(Font::HelveticaBold, 18.0);
        doc.draw_text(40.0, 752.0, "Title");
        let bytes = doc.finish();
        let text = as_text(&bytes);

        assert!(bytes.starts_with(b"%PDF-1.4"));
        assert!(text.ends_with("%%EOF\n"));
        assert!(text.contains("/MediaBox [0 0 612 792]"));
        assert!(text.contains("BT /F2 18 Tf 40.00 752.00 Td (Title) Tj ET"));
    }

    #[test]
    fn test_xref_offsets_point_at_objects() {
        let mut doc = PdfDocument::letter();
        doc.draw_text(10.0, 10.0, "x");
        let bytes = doc.finish();
        let text = as_text(&bytes);

        let startxref: usize = text
            .rsplit("startxref\n")
            .next()
            .and_then(|tail| tail.lines().next())
            .and_then(|v| v.parse().ok())
            .expect("Should have startxref");
        assert!(text[startxref..].starts_with("xref\n0 7\n"));

        let entries: Vec<&str> = text[startxref..].lines().skip(3).take(6).collect();
        for (i, entry) in entries.iter().enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            assert!(text[offset..].starts_with(&format!("{} 0 obj", i + 1)));
        }
    }

    #[test]
    fn test_stream_length_matches_content() {
        let mut doc = PdfDocument::letter();
        doc.set_fill_rgb8((231, 76, 60));
        doc.draw_text(60.0, 500.0, "Risk Level: High");
        let text = as_text(&doc.finish());

        let start = text.find("stream\n").unwrap() + "stream\n".len();
        let end = text.find("endstream").unwrap();
        let declared: usize = text
            .split("/Length ")
            .nth(1)
            .and_then(|s| s.split(' ').next())
            .and_then(|v| v.parse().ok())
            .unwrap();
        assert_eq!(end - start, declared);
        assert!(text.contains("0.906 0.298 0.235 rg"));
    }

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text(r"a (b) \c"), r"a \(b\) \\c");
        assert_eq!(escape_text("naïve"), "na?ve");
    }
}
