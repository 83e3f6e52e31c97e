//! Filename sanitization.
//!
//! Turns an arbitrary client-supplied filename into a short ASCII stem that is
//! safe as a path component and as a URL path segment. Han ideographs are
//! transliterated to pinyin so "报告.docx" becomes "baogao".

use pinyin::ToPinyin;

/// Stem returned when nothing usable survives sanitization.
pub const FALLBACK_STEM: &str = "unnamed_file";

/// Maximum stem length in characters.
pub const MAX_STEM_LENGTH: usize = 20;

/// Maximum extension length in characters.
pub const MAX_EXTENSION_LENGTH: usize = 10;

/// Check whether a character is a CJK unified or compatibility ideograph.
pub fn is_cjk(c: char) -> bool {
    matches!(
        c as u32,
        0x3400..=0x4DBF       // Extension A
            | 0x4E00..=0x9FFF // Unified Ideographs
            | 0xF900..=0xFAFF // Compatibility Ideographs
            | 0x20000..=0x2FA1F // Extensions B-F, compatibility supplement
    )
}

/// Strip any directory components a browser or client may have sent.
fn base_name(name: &str) -> &str {
    name.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(name)
}

/// Split a filename into stem and extension at the last dot.
///
/// A leading dot does not start an extension (".env" has stem ".env").
pub fn split_name(name: &str) -> (&str, &str) {
    let name = base_name(name);
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx + 1..]),
        _ => (name, ""),
    }
}

/// Sanitized, lower-cased extension of `name`, without the dot.
///
/// Returns `None` when the name has no extension or nothing alphanumeric
/// survives.
pub fn extension(name: &str) -> Option<String> {
    let (_, ext) = split_name(name);
    let ext: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_LENGTH)
        .map(|c| c.to_ascii_lowercase())
        .collect();

    (!ext.is_empty()).then_some(ext)
}

/// Replace each ideograph with its toneless pinyin.
///
/// Ideographs without a known reading become `u{codepoint}` so the result
/// stays deterministic.
fn transliterate(stem: &str) -> String {
    let mut out = String::with_capacity(stem.len() * 2);
    for (c, reading) in stem.chars().zip(stem.to_pinyin()) {
        match reading {
            Some(p) => out.push_str(p.plain()),
            None if is_cjk(c) => out.push_str(&format!("u{:x}", c as u32)),
            None => out.push(c),
        }
    }
    out
}

/// Map a proposed filename to a safe storage stem.
///
/// The extension is dropped (see [`extension`]). The result contains only
/// ASCII letters, digits and single underscores, never starts or ends with an
/// underscore, is at most [`MAX_STEM_LENGTH`] characters, and is never empty.
pub fn sanitize(original_name: &str) -> String {
    let (stem, _) = split_name(original_name);

    let stem = if stem.chars().any(is_cjk) {
        transliterate(stem)
    } else {
        stem.to_string()
    };

    let mut out = String::with_capacity(stem.len());
    let mut prev_underscore = false;
    for c in stem.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            prev_underscore = false;
        } else if !prev_underscore {
            out.push('_');
            prev_underscore = true;
        }
    }

    let truncated: String = out
        .trim_matches('_')
        .chars()
        .take(MAX_STEM_LENGTH)
        .collect();
    let stem = truncated.trim_end_matches('_');

    if stem.is_empty() {
        FALLBACK_STEM.to_string()
    } else {
        stem.to_string()
    }
}
