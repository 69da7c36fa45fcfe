//! Font resources as far as text placement needs them: code widths, the
//! descent used for glyph boxes, and the ToUnicode mapping.

use std::collections::HashMap;

use lopdf::{Dictionary, Object};

use crate::parser::pdf_reader::{number, resolve, stream_bytes};

/// Width used when a font carries no metrics, in glyph units.
const FALLBACK_WIDTH: f64 = 500.0;

#[derive(Debug, Clone, Default)]
pub struct FontInfo {
    pub name: String,
    /// Composite fonts address glyphs with two-byte codes.
    pub two_byte: bool,
    first_char: i64,
    widths: Vec<f64>,
    cid_widths: HashMap<u32, f64>,
    default_width: f64,
    /// Descent in glyph units, negative below the baseline.
    pub descent: f64,
    to_unicode: HashMap<u32, String>,
}

/// One decoded character code.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedGlyph {
    pub code: u32,
    pub text: String,
    /// Advance width in glyph units (1/1000 of the font size).
    pub width: f64,
}

impl FontInfo {
    pub fn load(doc: &lopdf::Document, dict: &Dictionary) -> Self {
        let name = dict
            .get(b"BaseFont")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_name().ok())
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .unwrap_or_default();
        let two_byte = matches!(
            dict.get(b"Subtype").ok().and_then(|obj| obj.as_name().ok()),
            Some(b"Type0")
        );

        let mut font = FontInfo {
            name,
            two_byte,
            default_width: if two_byte { 1000.0 } else { FALLBACK_WIDTH },
            ..Default::default()
        };

        if two_byte {
            if let Some(descendant) = descendant_font(doc, dict) {
                font.load_cid_metrics(doc, descendant);
                font.descent = descriptor_descent(doc, descendant);
            }
        } else {
            font.first_char = dict
                .get(b"FirstChar")
                .ok()
                .and_then(|obj| number(resolve(doc, obj)))
                .map(|v| v as i64)
                .unwrap_or(0);
            if let Ok(obj) = dict.get(b"Widths") {
                if let Ok(widths) = resolve(doc, obj).as_array() {
                    font.widths = widths
                        .iter()
                        .map(|w| number(resolve(doc, w)).unwrap_or(0.0))
                        .collect();
                }
            }
            font.descent = descriptor_descent(doc, dict);
        }

        if let Ok(obj) = dict.get(b"ToUnicode") {
            if let Ok(stream) = resolve(doc, obj).as_stream() {
                if let Ok(bytes) = stream_bytes(stream) {
                    font.to_unicode = parse_to_unicode(&bytes);
                }
            }
        }

        font
    }

    fn load_cid_metrics(&mut self, doc: &lopdf::Document, descendant: &Dictionary) {
        if let Some(dw) = descendant
            .get(b"DW")
            .ok()
            .and_then(|obj| number(resolve(doc, obj)))
        {
            self.default_width = dw;
        }
        let Some(entries) = descendant
            .get(b"W")
            .ok()
            .and_then(|obj| resolve(doc, obj).as_array().ok())
        else {
            return;
        };

        // Either `first [w1 w2 ...]` or `first last w`.
        let mut i = 0;
        while i < entries.len() {
            let Some(first) = number(resolve(doc, &entries[i])) else {
                break;
            };
            let first = first as u32;
            match entries.get(i + 1).map(|obj| resolve(doc, obj)) {
                Some(Object::Array(widths)) => {
                    for (offset, w) in widths.iter().enumerate() {
                        if let Some(w) = number(resolve(doc, w)) {
                            if let Some(code) = first.checked_add(offset as u32) {
                                self.cid_widths.insert(code, w);
                            }
                        }
                    }
                    i += 2;
                }
                Some(last) => {
                    let last = number(last).unwrap_or(first as f64) as u32;
                    let width = entries
                        .get(i + 2)
                        .and_then(|obj| number(resolve(doc, obj)))
                        .unwrap_or(self.default_width);
                    for code in first..=last.min(first.saturating_add(0xFFFF)) {
                        self.cid_widths.insert(code, width);
                    }
                    i += 3;
                }
                None => break,
            }
        }
    }

    fn width(&self, code: u32) -> f64 {
        if self.two_byte {
            return self
                .cid_widths
                .get(&code)
                .copied()
                .unwrap_or(self.default_width);
        }
        let idx = code as i64 - self.first_char;
        if idx >= 0 && (idx as usize) < self.widths.len() {
            self.widths[idx as usize]
        } else {
            self.default_width
        }
    }

    fn text_for(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.get(&code) {
            return text.clone();
        }
        if self.two_byte {
            char::from_u32(code).map(String::from).unwrap_or_default()
        } else {
            // Single-byte fonts without a ToUnicode map are read as Latin-1.
            char::from(code as u8).to_string()
        }
    }

    /// Splits a shown string into character codes.
    pub fn decode(&self, bytes: &[u8]) -> Vec<DecodedGlyph> {
        let codes: Vec<u32> = if self.two_byte {
            bytes
                .chunks(2)
                .map(|pair| match pair {
                    [hi, lo] => u32::from(*hi) << 8 | u32::from(*lo),
                    [single] => u32::from(*single),
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|b| u32::from(*b)).collect()
        };

        codes
            .into_iter()
            .map(|code| DecodedGlyph {
                code,
                text: self.text_for(code),
                width: self.width(code),
            })
            .collect()
    }
}

fn descendant_font<'a>(doc: &'a lopdf::Document, dict: &'a Dictionary) -> Option<&'a Dictionary> {
    let descendants = resolve(doc, dict.get(b"DescendantFonts").ok()?)
        .as_array()
        .ok()?;
    resolve(doc, descendants.first()?).as_dict().ok()
}

fn descriptor_descent(doc: &lopdf::Document, dict: &Dictionary) -> f64 {
    dict.get(b"FontDescriptor")
        .ok()
        .and_then(|obj| resolve(doc, obj).as_dict().ok())
        .and_then(|descriptor| descriptor.get(b"Descent").ok())
        .and_then(|obj| number(resolve(doc, obj)))
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq)]
enum CMapToken {
    Hex(Vec<u8>),
    Open,
    Close,
    Word(String),
}

fn tokenize_cmap(data: &[u8]) -> Vec<CMapToken> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            b'<' if data.get(i + 1) != Some(&b'<') => {
                let end = data[i..]
                    .iter()
                    .position(|b| *b == b'>')
                    .map(|p| i + p)
                    .unwrap_or(data.len());
                let digits: Vec<u8> = data[i + 1..end]
                    .iter()
                    .copied()
                    .filter(u8::is_ascii_hexdigit)
                    .collect();
                tokens.push(CMapToken::Hex(hex_bytes(&digits)));
                i = end + 1;
            }
            b'[' => {
                tokens.push(CMapToken::Open);
                i += 1;
            }
            b']' => {
                tokens.push(CMapToken::Close);
                i += 1;
            }
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'[' | b']')
                {
                    i += 1;
                }
                tokens.push(CMapToken::Word(
                    String::from_utf8_lossy(&data[start..i]).into_owned(),
                ));
                if i == start {
                    i += 1;
                }
            }
        }
    }
    tokens
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    digits
        .chunks(2)
        .map(|pair| {
            let text = std::str::from_utf8(pair).unwrap_or("0");
            let value = u8::from_str_radix(text, 16).unwrap_or(0);
            // A trailing odd digit is padded with zero.
            if pair.len() == 1 {
                value << 4
            } else {
                value
            }
        })
        .collect()
}

fn code_of(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, b| acc << 8 | u32::from(*b))
}

fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from(*hi) << 8 | u16::from(*lo),
            [single] => u16::from(*single),
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// Reads `bfchar` and `bfrange` sections of a ToUnicode CMap.
pub fn parse_to_unicode(data: &[u8]) -> HashMap<u32, String> {
    let tokens = tokenize_cmap(data);
    let mut map = HashMap::new();
    let mut i = 0;
    while i < tokens.len() {
        match &tokens[i] {
            CMapToken::Word(word) if word == "beginbfchar" => {
                i += 1;
                while let (Some(CMapToken::Hex(src)), Some(CMapToken::Hex(dst))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    map.insert(code_of(src), utf16_text(dst));
                    i += 2;
                }
            }
            CMapToken::Word(word) if word == "beginbfrange" => {
                i += 1;
                while let (Some(CMapToken::Hex(lo)), Some(CMapToken::Hex(hi))) =
                    (tokens.get(i), tokens.get(i + 1))
                {
                    let (lo, hi) = (code_of(lo), code_of(hi));
                    match tokens.get(i + 2) {
                        Some(CMapToken::Hex(dst)) => {
                            let base = code_of(dst);
                            for (offset, code) in (lo..=hi.min(lo.saturating_add(0xFFFF))).enumerate() {
                                let text = if dst.len() <= 2 {
                                    base.checked_add(offset as u32)
                                        .and_then(char::from_u32)
                                        .map(String::from)
                                        .unwrap_or_default()
                                } else {
                                    // Only the last UTF-16 unit is incremented.
                                    let mut bytes = dst.clone();
                                    let n = bytes.len();
                                    let last = u16::from(bytes[n - 2]) << 8 | u16::from(bytes[n - 1]);
                                    let next = last.wrapping_add(offset as u16);
                                    bytes[n - 2] = (next >> 8) as u8;
                                    bytes[n - 1] = next as u8;
                                    utf16_text(&bytes)
                                };
                                map.insert(code, text);
                            }
                            i += 3;
                        }
                        Some(CMapToken::Open) => {
                            let mut j = i + 3;
                            let mut code = Some(lo);
                            while let Some(CMapToken::Hex(dst)) = tokens.get(j) {
                                if let Some(c) = code.filter(|c| *c <= hi) {
                                    map.insert(c, utf16_text(dst));
                                }
                                code = code.and_then(|c| c.checked_add(1));
                                j += 1;
                            }
                            // Skip the closing bracket.
                            i = j + 1;
                        }
                        _ => break,
                    }
                }
            }
            _ => i += 1,
        }
    }
    map
}
