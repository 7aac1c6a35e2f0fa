//! Decoding model output and tidying extracted text.
//!
//! Models are asked for bare JSON but regularly wrap it in a ```` ```json ````
//! fence, prepend a byte-order mark or sprinkle zero-width characters. Those
//! artefacts are removed deterministically here; anything beyond them (prose
//! around the JSON, trailing commas, missing fields) is a decode failure.
//! Nothing is repaired by guessing.
//!
//! ## Rule Order
//!
//! Invisible characters go first so a BOM does not hide the opening fence,
//! line endings are normalised before fence matching, and the fence is
//! stripped before serde sees the text.

use crate::error::PodcastError;
use crate::model::StageOutput;
use once_cell::sync::Lazy;
use regex::Regex;

/// Decode raw model output into `T` and check its invariants.
///
/// # Errors
/// [`PodcastError::SchemaParse`] naming `T::SCHEMA` when the text is not
/// JSON, does not match the shape of `T`, or violates
/// [`StageOutput::validate`].
pub fn decode_json<T: StageOutput>(raw: &str) -> Result<T, PodcastError> {
    let s = remove_invisible_chars(raw);
    let s = normalise_line_endings(&s);
    let s = strip_json_fences(&s);

    let value: T = serde_json::from_str(s.trim()).map_err(|e| PodcastError::SchemaParse {
        schema: T::SCHEMA,
        detail: format!("{e} (output starts with {:?})", preview(&s)),
    })?;
    value.validate().map_err(|detail| PodcastError::SchemaParse {
        schema: T::SCHEMA,
        detail,
    })?;
    Ok(value)
}

/// Clean text extracted from a PDF or an HTML page before it is handed to
/// the prompts.
///
/// 1. Normalise line endings (CRLF → LF)
/// 2. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 1
/// 5. Trim the whole text
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

// ── Fences ───────────────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json|JSON)?[ \t]*\n(.*?)\n?```\s*$").unwrap());

fn strip_json_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Whitespace ───────────────────────────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").into_owned()
}

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

fn preview(s: &str) -> String {
    s.trim().chars().take(40).collect()
}
