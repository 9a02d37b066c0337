//! Text font for the rebuilt PDF.
//!
//! Two flavours:
//!
//! * [`PageFont::Builtin`]: the standard-14 Helvetica with WinAnsi
//!   encoding. Nothing is embedded; characters outside WinAnsi are drawn
//!   as `?`.
//! * [`PageFont::Embedded`]: a TrueType file embedded as a Type0 /
//!   CIDFontType2 font with Identity-H encoding. Text is written as glyph
//!   ids and a ToUnicode CMap maps them back, so the output stays
//!   searchable for every script the font covers.
//!
//! Widths are in PDF glyph space (1/1000 em).

use crate::error::OcrPdfError;
use ab_glyph::{Font, FontVec, GlyphId};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::BTreeMap;
use std::path::Path;

/// Helvetica advance widths for ASCII 0x20..=0x7E (Adobe AFM).
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // sp ! " # $ % & ' ( ) * + , - . /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0-9
    278, 278, 584, 584, 584, 556, 1015, // : ; < = > ? @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A-M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N-Z
    278, 278, 278, 469, 556, 333, // [ \ ] ^ _ `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a-m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n-z
    334, 260, 334, 584, // { | } ~
];

/// Width used for WinAnsi characters outside ASCII.
const HELVETICA_DEFAULT_WIDTH: f32 = 556.0;

/// Map a character to its WinAnsiEncoding byte.
fn win_ansi_byte(c: char) -> Option<u8> {
    let byte = match c {
        ' '..='~' => c as u8,
        '\u{A0}'..='\u{FF}' => c as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

fn helvetica_width(c: char) -> f32 {
    match win_ansi_byte(c) {
        Some(b @ 0x20..=0x7E) => HELVETICA_WIDTHS[(b - 0x20) as usize] as f32,
        Some(_) => HELVETICA_DEFAULT_WIDTH,
        // Drawn as '?'
        None => HELVETICA_WIDTHS[(b'?' - 0x20) as usize] as f32,
    }
}

/// A TrueType font loaded for embedding.
pub struct EmbeddedFont {
    base_name: String,
    data: Vec<u8>,
    font: FontVec,
    units_per_em: f32,
    /// Glyphs written so far, with the character each one came from.
    used: BTreeMap<u16, char>,
}

impl EmbeddedFont {
    fn scale(&self, units: f32) -> f32 {
        units * 1000.0 / self.units_per_em
    }

    fn glyph_width(&self, id: GlyphId) -> f32 {
        self.scale(self.font.h_advance_unscaled(id))
    }
}

/// The font used for every line of recognised text.
pub enum PageFont {
    Builtin,
    Embedded(Box<EmbeddedFont>),
}

impl PageFont {
    /// Load a TrueType/OpenType font from disk for embedding.
    pub fn load(path: &Path) -> Result<Self, OcrPdfError> {
        let unavailable = |detail: String| OcrPdfError::FontUnavailable {
            path: path.to_path_buf(),
            detail,
        };

        let data = std::fs::read(path).map_err(|e| unavailable(e.to_string()))?;
        let font = FontVec::try_from_vec(data.clone()).map_err(|e| unavailable(e.to_string()))?;
        let units_per_em = font
            .units_per_em()
            .filter(|u| *u > 0.0)
            .ok_or_else(|| unavailable("font has no units-per-em".into()))?;

        Ok(PageFont::Embedded(Box::new(EmbeddedFont {
            base_name: base_font_name(path),
            data,
            font,
            units_per_em,
            used: BTreeMap::new(),
        })))
    }

    /// Advance width of `c` in glyph space.
    pub fn char_width(&self, c: char) -> f32 {
        match self {
            PageFont::Builtin => helvetica_width(c),
            PageFont::Embedded(f) => f.glyph_width(f.font.glyph_id(c)),
        }
    }

    /// Width of `text` in points at `size` points.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        text.chars().map(|c| self.char_width(c)).sum::<f32>() * size / 1000.0
    }

    /// Whether `c` can be drawn; anything else is written as `?` (builtin)
    /// or as the missing glyph (embedded).
    pub fn covers(&self, c: char) -> bool {
        match self {
            PageFont::Builtin => win_ansi_byte(c).is_some(),
            PageFont::Embedded(f) => f.font.glyph_id(c).0 != 0,
        }
    }

    /// Characters of `text` the font cannot draw. Line breaks are not counted.
    pub fn unencodable_count(&self, text: &str) -> usize {
        text.chars()
            .filter(|&c| c != '\n' && !self.covers(c))
            .count()
    }

    /// Encode `text` as a PDF string operand for `Tj`.
    pub fn encode(&mut self, text: &str) -> Object {
        let bytes = match self {
            PageFont::Builtin => text
                .chars()
                .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
                .collect(),
            PageFont::Embedded(f) => {
                let mut out = Vec::with_capacity(text.len() * 2);
                for c in text.chars() {
                    let id = f.font.glyph_id(c);
                    if id.0 != 0 {
                        f.used.entry(id.0).or_insert(c);
                    }
                    out.extend_from_slice(&id.0.to_be_bytes());
                }
                out
            }
        };
        Object::String(bytes, StringFormat::Hexadecimal)
    }

    /// Write the font dictionary (and its dependants) as object `font_id`.
    ///
    /// Must run after all text has been encoded so the width table and the
    /// ToUnicode map cover every glyph in use.
    pub fn write_objects(&self, doc: &mut Document, font_id: ObjectId) {
        let font_dict = match self {
            PageFont::Builtin => dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => "Helvetica",
                "Encoding" => "WinAnsiEncoding",
            },
            PageFont::Embedded(f) => embedded_font_dict(f, doc),
        };
        doc.objects.insert(font_id, Object::Dictionary(font_dict));
    }
}

fn embedded_font_dict(f: &EmbeddedFont, doc: &mut Document) -> lopdf::Dictionary {
    let name = Object::Name(f.base_name.clone().into_bytes());
    let ascent = f.scale(f.font.ascent_unscaled());
    let descent = f.scale(f.font.descent_unscaled());

    let font_file = doc.add_object(Stream::new(
        dictionary! { "Length1" => Object::Integer(f.data.len() as i64) },
        f.data.clone(),
    ));

    let descriptor = doc.add_object(dictionary! {
        "Type" => "FontDescriptor",
        "FontName" => name.clone(),
        "Flags" => Object::Integer(32),
        "FontBBox" => vec![
            Object::Integer(0),
            Object::Real(descent),
            Object::Integer(1000),
            Object::Real(ascent),
        ],
        "ItalicAngle" => Object::Integer(0),
        "Ascent" => Object::Real(ascent),
        "Descent" => Object::Real(descent),
        "CapHeight" => Object::Real(ascent),
        "StemV" => Object::Integer(80),
        "FontFile2" => Object::Reference(font_file),
    });

    let mut widths = Vec::with_capacity(f.used.len() * 2);
    for &gid in f.used.keys() {
        widths.push(Object::Integer(gid as i64));
        widths.push(Object::Array(vec![Object::Real(f.glyph_width(GlyphId(gid)))]));
    }

    let cid_font = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "CIDFontType2",
        "BaseFont" => name.clone(),
        "CIDSystemInfo" => dictionary! {
            "Registry" => Object::string_literal("Adobe"),
            "Ordering" => Object::string_literal("Identity"),
            "Supplement" => Object::Integer(0),
        },
        "FontDescriptor" => Object::Reference(descriptor),
        "DW" => Object::Real(f.glyph_width(GlyphId(0))),
        "W" => widths,
        "CIDToGIDMap" => "Identity",
    });

    let to_unicode = doc.add_object(Stream::new(
        dictionary! {},
        to_unicode_cmap(&f.used).into_bytes(),
    ));

    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type0",
        "BaseFont" => name,
        "Encoding" => "Identity-H",
        "DescendantFonts" => vec![Object::Reference(cid_font)],
        "ToUnicode" => Object::Reference(to_unicode),
    }
}

/// ToUnicode CMap mapping 2-byte glyph ids to UTF-16BE.
fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = used.iter().collect();
    // bfchar blocks are limited to 100 entries
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, c) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = c
                .encode_utf16(&mut units)
                .iter()
                .map(|u| format!("{u:04X}"))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, utf16));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap\n\
         CMapName currentdict /CMap defineresource pop\n\
         end\n\
         end\n",
    );
    cmap
}

/// PDF base font name derived from the file stem (letters, digits, `-`).
fn base_font_name(path: &Path) -> String {
    let name: String = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-')
        .collect();
    if name.is_empty() {
        "EmbeddedFont".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_table_spot_checks() {
        assert_eq!(helvetica_width(' '), 278.0);
        assert_eq!(helvetica_width('0'), 556.0);
        assert_eq!(helvetica_width('@'), 1015.0);
        assert_eq!(helvetica_width('W'), 944.0);
        assert_eq!(helvetica_width('i'), 222.0);
        assert_eq!(helvetica_width('~'), 584.0);
    }

    #[test]
    fn builtin_encodes_win_ansi_and_replaces_the_rest() {
        let mut font = PageFont::Builtin;
        match font.encode("Grüße – Ж") {
            Object::String(bytes, StringFormat::Hexadecimal) => {
                assert_eq!(bytes, vec![b'G', b'r', 0xFC, 0xDF, b'e', b' ', 0x96, b' ', b'?']);
            }
            other => panic!("unexpected object: {other:?}"),
        }
    }

    #[test]
    fn builtin_counts_cyrillic_as_unencodable() {
        let font = PageFont::Builtin;
        assert_eq!(font.unencodable_count("Привет мир"), 9);
        assert_eq!(font.unencodable_count("Grüße – café\nline two"), 0);
        assert_eq!(font.unencodable_count("a\nЖ\nb"), 1);
    }

    #[test]
    fn unencodable_char_measures_like_question_mark() {
        assert_eq!(helvetica_width('Ж'), helvetica_width('?'));
    }

    #[test]
    fn text_width_scales_with_size() {
        let font = PageFont::Builtin;
        let w10 = font.text_width("Hello", 10.0);
        let w20 = font.text_width("Hello", 20.0);
        assert!((w20 - 2.0 * w10).abs() < 1e-3);
        // H e l l o = 722 + 556 + 222 + 222 + 556
        assert!((w10 - 22.78).abs() < 1e-3);
    }

    #[test]
    fn missing_font_file_is_fatal() {
        let err = PageFont::load(Path::new("/no/such/DejaVuSans.ttf"))
            .err()
            .expect("load should fail");
        assert!(matches!(err, OcrPdfError::FontUnavailable { .. }));
    }

    #[test]
    fn garbage_font_file_is_fatal() {
        let f = tempfile::Builder::new().suffix(".ttf").tempfile().unwrap();
        std::fs::write(f.path(), b"definitely not a font").unwrap();
        assert!(matches!(
            PageFont::load(f.path()),
            Err(OcrPdfError::FontUnavailable { .. })
        ));
    }

    #[test]
    fn cmap_uses_utf16_and_chunks() {
        let mut used = BTreeMap::new();
        used.insert(3u16, 'A');
        used.insert(0x0120u16, 'Ж');
        used.insert(0x0200u16, '😀');
        let cmap = to_unicode_cmap(&used);
        assert!(cmap.contains("3 beginbfchar"));
        assert!(cmap.contains("<0003> <0041>"));
        assert!(cmap.contains("<0120> <0416>"));
        assert!(cmap.contains("<0200> <D83DDE00>"));
    }

    #[test]
    fn base_name_is_sanitised() {
        assert_eq!(base_font_name(Path::new("fonts/DejaVu Sans.ttf")), "DejaVuSans");
        assert_eq!(base_font_name(Path::new("___.ttf")), "EmbeddedFont");
    }

    #[test]
    fn builtin_writes_type1_dict() {
        let mut doc = Document::with_version("1.5");
        let id = doc.new_object_id();
        PageFont::Builtin.write_objects(&mut doc, id);
        let dict = doc.get_dictionary(id).unwrap();
        assert_eq!(dict.get(b"BaseFont").unwrap().as_name().unwrap(), b"Helvetica");
    }
}
