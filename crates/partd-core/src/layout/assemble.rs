use crate::model::{PositionedToken, TokenSource};
use std::cmp::Ordering;

/// Merge embedded and OCR tokens of one page into a single sequence sorted
/// top-to-bottom, then left-to-right.
///
/// An OCR token is dropped when an embedded token covers it by at least
/// `overlap_threshold` of the smaller box and reads the same up to case and
/// whitespace. Empty tokens are dropped. Nothing else is touched.
pub fn assemble_tokens(
    embedded: &[PositionedToken],
    ocr: &[PositionedToken],
    overlap_threshold: f32,
) -> Vec<PositionedToken> {
    let embedded_keys: Vec<String> = embedded.iter().map(|t| dedupe_key(&t.text)).collect();

    let kept_ocr = ocr.iter().filter(|o| {
        let key = dedupe_key(&o.text);
        !embedded.iter().zip(&embedded_keys).any(|(e, e_key)| {
            *e_key == key && e.bbox.overlap_fraction(&o.bbox) >= overlap_threshold
        })
    });

    let mut tokens: Vec<PositionedToken> = embedded
        .iter()
        .chain(kept_ocr)
        .filter(|t| !t.text.trim().is_empty())
        .cloned()
        .collect();
    tokens.sort_by(reading_order);
    tokens
}

fn dedupe_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Top edge first, then left edge. Embedded before OCR on exact ties so the
/// order never depends on input order.
fn reading_order(a: &PositionedToken, b: &PositionedToken) -> Ordering {
    a.bbox
        .y0
        .total_cmp(&b.bbox.y0)
        .then(a.bbox.x0.total_cmp(&b.bbox.x0))
        .then_with(|| source_rank(a.source).cmp(&source_rank(b.source)))
        .then_with(|| a.text.cmp(&b.text))
}

fn source_rank(source: TokenSource) -> u8 {
    match source {
        TokenSource::Embedded => 0,
        TokenSource::Ocr => 1,
    }
}
