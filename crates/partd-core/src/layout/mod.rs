pub mod assemble;
pub mod grid;
pub mod region;

use crate::model::{BBox, PositionedToken};

/// Tokens sharing a baseline band, ordered left to right.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Indices into the page's token sequence.
    pub token_ids: Vec<usize>,
    pub bbox: BBox,
}

impl Line {
    pub fn text(&self, tokens: &[PositionedToken]) -> String {
        self.token_ids
            .iter()
            .filter_map(|&i| tokens.get(i))
            .map(|t| t.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Cluster the given tokens into lines by vertical center.
///
/// A token joins the current line while its center lies within `tolerance`
/// of the center of the token that opened the line. Lines come out top to
/// bottom, tokens inside a line left to right.
pub fn group_lines(tokens: &[PositionedToken], ids: &[usize], tolerance: f32) -> Vec<Line> {
    let mut ordered: Vec<usize> = ids.iter().copied().filter(|&i| i < tokens.len()).collect();
    ordered.sort_by(|&a, &b| {
        tokens[a]
            .bbox
            .center_y()
            .total_cmp(&tokens[b].bbox.center_y())
            .then(tokens[a].bbox.x0.total_cmp(&tokens[b].bbox.x0))
            .then(a.cmp(&b))
    });

    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut anchor_y = f32::NEG_INFINITY;
    for id in ordered {
        let cy = tokens[id].bbox.center_y();
        match groups.last_mut() {
            Some(group) if cy - anchor_y <= tolerance => group.push(id),
            _ => {
                anchor_y = cy;
                groups.push(vec![id]);
            }
        }
    }

    groups
        .into_iter()
        .filter_map(|mut group| {
            group.sort_by(|&a, &b| {
                tokens[a]
                    .bbox
                    .x0
                    .total_cmp(&tokens[b].bbox.x0)
                    .then(a.cmp(&b))
            });
            let bbox = BBox::enclosing(group.iter().map(|&i| &tokens[i].bbox))?;
            Some(Line {
                token_ids: group,
                bbox,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::model::{BBox, PositionedToken, TokenSource};

    /// A token of `width` points at (x, y) with the usual 8-point body text height.
    pub fn word(text: &str, x: f32, y: f32, width: f32) -> PositionedToken {
        PositionedToken::new(
            text,
            BBox::new(x, y, x + width, y + 8.0),
            0,
            TokenSource::Embedded,
        )
    }

    /// Lay out rows of cells on a fixed column pitch, one row every 12 points.
    pub fn table_tokens(top: f32, x0: f32, pitch: f32, rows: &[&[&str]]) -> Vec<PositionedToken> {
        let mut out = Vec::new();
        for (r, row) in rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                if cell.is_empty() {
                    continue;
                }
                out.push(word(cell, x0 + c as f32 * pitch, top + r as f32 * 12.0, pitch * 0.6));
            }
        }
        out
    }
}
