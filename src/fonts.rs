use lopdf::{Dictionary, Document, Object};

/// Vertical metrics and width model for a standard font family, in
/// 1000-unit glyph space.
#[derive(Debug, Clone, Copy)]
pub struct FamilyMetrics {
    pub ascent: f32,
    pub descent: f32,
    /// Every glyph is this wide when the family is fixed pitch.
    pub fixed_width: Option<f32>,
    /// Stand-in width for glyphs with no entry anywhere.
    pub default_width: f32,
}

pub const COURIER: FamilyMetrics = FamilyMetrics {
    ascent: 629.0,
    descent: -157.0,
    fixed_width: Some(600.0),
    default_width: 600.0,
};

pub const HELVETICA: FamilyMetrics = FamilyMetrics {
    ascent: 718.0,
    descent: -207.0,
    fixed_width: None,
    default_width: 513.0,
};

pub const TIMES: FamilyMetrics = FamilyMetrics {
    ascent: 683.0,
    descent: -217.0,
    fixed_width: None,
    default_width: 500.0,
};

const FALLBACK: FamilyMetrics = FamilyMetrics {
    ascent: 718.0,
    descent: -207.0,
    fixed_width: None,
    default_width: 500.0,
};

pub fn family_metrics(standard_name: &str) -> FamilyMetrics {
    if standard_name.starts_with("Courier") {
        COURIER
    } else if standard_name.starts_with("Helvetica") {
        HELVETICA
    } else if standard_name.starts_with("Times") {
        TIMES
    } else {
        FALLBACK
    }
}

// Sanitization has to handle PDF subset prefixes and vendor aliases.
pub fn sanitize_font_name(raw_name: &str) -> &str {
    let name = raw_name.split('+').last().unwrap_or(raw_name);
    let name = name
        .strip_suffix("PSMT")
        .or_else(|| name.strip_suffix("MT"))
        .or_else(|| name.strip_suffix("PS"))
        .unwrap_or(name);

    if let Some(style) = name.strip_prefix("TimesNewRoman") {
        return match style.trim_start_matches(|c| c == '-' || c == ',') {
            "Bold" => "Times-Bold",
            "Italic" => "Times-Italic",
            "BoldItalic" => "Times-BoldItalic",
            _ => "Times-Roman",
        };
    }
    if let Some(style) = name.strip_prefix("Arial") {
        return match style.trim_start_matches(|c| c == '-' || c == ',') {
            "Bold" => "Helvetica-Bold",
            "Italic" | "Oblique" => "Helvetica-Oblique",
            "BoldItalic" | "BoldOblique" => "Helvetica-BoldOblique",
            _ => "Helvetica",
        };
    }
    if let Some(style) = name.strip_prefix("CourierNew") {
        return match style.trim_start_matches(|c| c == '-' || c == ',') {
            "Bold" => "Courier-Bold",
            "Italic" | "Oblique" => "Courier-Oblique",
            "BoldItalic" | "BoldOblique" => "Courier-BoldOblique",
            _ => "Courier",
        };
    }
    name
}

/// Width model and vertical extent for one font resource on a page.
///
/// Glyph widths resolve from the font dictionary's `/Widths` array when it
/// has one, else from the built-in family table. Ascent and descent come
/// from the font descriptor when present, else from the family table.
#[derive(Debug, Clone)]
pub struct FontInfo {
    pub base_name: String,
    pub ascent: f32,
    pub descent: f32,
    default_width: f32,
    widths: Widths,
}

#[derive(Debug, Clone)]
enum Widths {
    Explicit { first_char: u32, table: Vec<f32> },
    Fixed(f32),
    Default(f32),
}

impl FontInfo {
    pub fn from_dict(doc: &Document, font: &Dictionary) -> Self {
        let base_name = match font.get(b"BaseFont").and_then(Object::as_name) {
            Ok(name) => {
                let raw = String::from_utf8_lossy(name);
                sanitize_font_name(&raw).to_string()
            }
            Err(_) => String::from("Helvetica"),
        };
        let family = family_metrics(&base_name);

        let mut ascent = family.ascent;
        let mut descent = family.descent;
        if let Ok(object) = font.get(b"FontDescriptor") {
            if let Ok(descriptor) = resolve(doc, object).as_dict() {
                if let Ok(value) = descriptor.get(b"Ascent") {
                    let value = object_to_f32(doc, value);
                    if value != 0.0 {
                        ascent = value;
                    }
                }
                if let Ok(value) = descriptor.get(b"Descent") {
                    let value = object_to_f32(doc, value);
                    if value != 0.0 {
                        descent = value;
                    }
                }
            }
        }

        let widths = read_widths(doc, font).unwrap_or(match family.fixed_width {
            Some(width) => Widths::Fixed(width),
            None => Widths::Default(family.default_width),
        });

        FontInfo {
            base_name,
            ascent,
            descent,
            default_width: family.default_width,
            widths,
        }
    }

    /// Width of the glyph for a single-byte character code, in 1000-unit
    /// glyph space.
    pub fn glyph_width(&self, code: u8) -> f32 {
        match &self.widths {
            Widths::Explicit { first_char, table } => (code as u32)
                .checked_sub(*first_char)
                .and_then(|index| table.get(index as usize))
                .copied()
                .unwrap_or(self.default_width),
            Widths::Fixed(width) => *width,
            Widths::Default(width) => *width,
        }
    }
}

fn read_widths(doc: &Document, font: &Dictionary) -> Option<Widths> {
    let first_char = resolve(doc, font.get(b"FirstChar").ok()?).as_i64().ok()?;
    let table: Vec<f32> = resolve(doc, font.get(b"Widths").ok()?)
        .as_array()
        .ok()?
        .iter()
        .map(|width| object_to_f32(doc, width))
        .collect();
    if table.is_empty() {
        return None;
    }
    Some(Widths::Explicit {
        first_char: first_char.max(0) as u32,
        table,
    })
}

fn object_to_f32(doc: &Document, object: &Object) -> f32 {
    match resolve(doc, object) {
        Object::Integer(value) => *value as f32,
        Object::Real(value) => *value,
        _ => 0.0,
    }
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    match object {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(object),
        _ => object,
    }
}
