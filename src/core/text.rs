use deunicode::deunicode_char;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Compatibility-normalizes extracted text so ligatures such as `ﬁ` read as
/// their letters.
pub fn normalize_extracted(text: &str) -> String {
    text.nfkc().collect()
}

/// Transliterates to ASCII after dropping combining marks. Characters
/// without a transliteration are kept as they are.
pub fn fold_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.nfkd().filter(|c| !is_combining_mark(*c)) {
        match deunicode_char(c) {
            Some(ascii) => out.push_str(ascii),
            None => out.push(c),
        }
    }
    out
}

/// Lower-cased, accent-folded and with everything but letters, digits and
/// underscores removed. Two names are the same when these keys match.
pub fn comparison_key(text: &str) -> String {
    fold_accents(&text.to_lowercase())
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .collect()
}
