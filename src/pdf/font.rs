//! Font resolution and text encoding for procedural PDFs.
//!
//! A TrueType font with Hangul coverage is embedded as a Type0/CIDFontType2
//! font with Identity-H encoding, so text is written as 2-byte glyph ids.
//! Without one, the built-in Helvetica is used and characters outside
//! ASCII are replaced by `?`.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use ab_glyph::{Font, FontArc};
use pdf_writer::types::{CidFontType, FontFlags, SystemInfo};
use pdf_writer::{Filter, Name, Pdf, Rect, Ref, Str};
use tracing::{debug, info, warn};

use super::deflate;

/// Resource name the page uses for the selected font.
pub const FONT_RESOURCE: &[u8] = b"F1";

/// A font that has been loaded from disk and can be embedded.
#[derive(Clone)]
pub struct EmbeddedFont {
    name: String,
    data: Vec<u8>,
    face: FontArc,
}

impl std::fmt::Debug for EmbeddedFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedFont")
            .field("name", &self.name)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// The font a procedural PDF is drawn with.
#[derive(Debug, Clone)]
pub enum PdfFont {
    /// An embedded CJK-capable TrueType font.
    Embedded(EmbeddedFont),
    /// The standard Helvetica font; ASCII only.
    Builtin,
}

impl PdfFont {
    /// Tries each candidate path in order and returns the first usable font.
    ///
    /// Falls back to [`PdfFont::Builtin`] with a warning when none resolve.
    pub fn resolve(candidates: &[PathBuf]) -> Self {
        for path in candidates {
            match load_font(path) {
                Some(font) => {
                    info!(path = %path.display(), "using embedded font for PDF output");
                    return PdfFont::Embedded(font);
                }
                None => debug!(path = %path.display(), "font candidate unavailable"),
            }
        }
        warn!(
            candidates = candidates.len(),
            "no CJK font found; PDF text falls back to Helvetica and Korean glyphs will not render"
        );
        PdfFont::Builtin
    }

    /// Returns true if the font covers Hangul.
    pub fn is_cjk(&self) -> bool {
        matches!(self, PdfFont::Embedded(_))
    }

    /// Encodes text for a `Tj` operator.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            PdfFont::Embedded(font) => text
                .chars()
                .flat_map(|ch| font.face.glyph_id(ch).0.to_be_bytes())
                .collect(),
            PdfFont::Builtin => text
                .chars()
                .map(|ch| if ch.is_ascii() { ch as u8 } else { b'?' })
                .collect(),
        }
    }

    /// Returns the advance width of `text` in points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        match self {
            PdfFont::Embedded(font) => {
                let units = font.units_per_em();
                text.chars()
                    .map(|ch| font.face.h_advance_unscaled(font.face.glyph_id(ch)))
                    .sum::<f32>()
                    / units
                    * size
            }
            PdfFont::Builtin => {
                text.chars().map(helvetica_width).sum::<f32>() / 1000.0 * size
            }
        }
    }

    /// Writes the font objects and returns the reference the page should use.
    ///
    /// `text` is every string drawn with the font; only those glyphs get
    /// width entries.
    pub fn write_objects<'a>(
        &self,
        pdf: &mut Pdf,
        alloc: &mut impl FnMut() -> Ref,
        text: impl IntoIterator<Item = &'a str>,
    ) -> Ref {
        let font_id = alloc();
        match self {
            PdfFont::Builtin => {
                pdf.type1_font(font_id)
                    .base_font(Name(b"Helvetica"))
                    .encoding_predefined(Name(b"WinAnsiEncoding"));
            }
            PdfFont::Embedded(font) => {
                let cid_id = alloc();
                let descriptor_id = alloc();
                let file_id = alloc();
                let base_name = font.name.as_bytes();

                pdf.type0_font(font_id)
                    .base_font(Name(base_name))
                    .encoding_predefined(Name(b"Identity-H"))
                    .descendant_font(cid_id);

                let used: BTreeSet<u16> = text
                    .into_iter()
                    .flat_map(|s| s.chars())
                    .map(|ch| font.face.glyph_id(ch).0)
                    .collect();
                let units = font.units_per_em();

                {
                    let mut cid = pdf.cid_font(cid_id);
                    cid.subtype(CidFontType::Type2)
                        .base_font(Name(base_name))
                        .system_info(SystemInfo {
                            registry: Str(b"Adobe"),
                            ordering: Str(b"Identity"),
                            supplement: 0,
                        })
                        .font_descriptor(descriptor_id)
                        .default_width(1000.0)
                        .cid_to_gid_map_predefined(Name(b"Identity"));
                    let mut widths = cid.widths();
                    for gid in &used {
                        let advance = font.face.h_advance_unscaled(ab_glyph::GlyphId(*gid));
                        widths.consecutive(*gid, [advance / units * 1000.0]);
                    }
                }

                let ascent = font.face.ascent_unscaled() / units * 1000.0;
                let descent = font.face.descent_unscaled() / units * 1000.0;
                pdf.font_descriptor(descriptor_id)
                    .name(Name(base_name))
                    .flags(FontFlags::SYMBOLIC)
                    .bbox(Rect::new(0.0, descent, 1000.0, ascent))
                    .italic_angle(0.0)
                    .ascent(ascent)
                    .descent(descent)
                    .cap_height(ascent)
                    .stem_v(80.0)
                    .font_file2(file_id);

                write_font_file(pdf, file_id, &font.data);
            }
        }
        font_id
    }
}

/// Writes a TrueType program as a compressed `FontFile2` stream.
///
/// `Length1` records the uncompressed size.
fn write_font_file(pdf: &mut Pdf, id: Ref, data: &[u8]) {
    pdf.stream(id, &deflate(data))
        .filter(Filter::FlateDecode)
        .pair(Name(b"Length1"), data.len() as i32);
}

impl EmbeddedFont {
    fn units_per_em(&self) -> f32 {
        self.face.units_per_em().unwrap_or(1000.0)
    }
}

fn load_font(path: &Path) -> Option<EmbeddedFont> {
    let data = fs::read(path).ok()?;
    let face = match FontArc::try_from_vec(data.clone()) {
        Ok(face) => face,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "font file could not be parsed");
            return None;
        }
    };
    // A font without Hangul would render every label as .notdef boxes.
    if face.glyph_id('급').0 == 0 {
        warn!(path = %path.display(), "font has no Hangul glyphs");
        return None;
    }
    let name = path
        .file_stem()
        .map(|stem| {
            stem.to_string_lossy()
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .collect::<String>()
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "EmbeddedFont".to_string());
    Some(EmbeddedFont { name, data, face })
}

/// Helvetica advance widths in 1/1000 em for the characters payslips use.
fn helvetica_width(ch: char) -> f32 {
    match ch {
        '0'..='9' => 556.0,
        ',' | '.' | ' ' | ':' | '/' => 278.0,
        '-' => 333.0,
        '(' | ')' => 333.0,
        'A'..='Z' => 667.0,
        'i' | 'j' | 'l' => 222.0,
        'm' | 'w' => 833.0,
        _ => 556.0,
    }
}
