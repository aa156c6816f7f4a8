use crate::config::ExtractionConfig;
use crate::layout::{group_lines, Line};
use crate::model::{PositionedToken, RawGrid};

/// A run of tokens close enough horizontally to read as one cell.
#[derive(Debug, Clone, PartialEq)]
struct Cell {
    text: String,
    x0: f32,
    x1: f32,
}

impl Cell {
    fn center(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    fn x_overlap(&self, other: &Cell) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }
}

/// Build the raw grid of a table region.
///
/// Leading lines that start with "Table" or hold a single cell form the
/// title. The next line is the header and fixes the column x-ranges; every
/// later cell goes to the header column it overlaps most, or the nearest one
/// when it overlaps none. Short rows are padded, never dropped.
pub fn extract_grid(tokens: &[PositionedToken], ids: &[usize], config: &ExtractionConfig) -> RawGrid {
    let rows: Vec<Vec<Cell>> = group_lines(tokens, ids, config.row_tolerance)
        .iter()
        .map(|line| line_cells(line, tokens, config.word_gap))
        .filter(|cells| !cells.is_empty())
        .collect();

    let title_len = rows
        .iter()
        .take(rows.len().saturating_sub(1))
        .take_while(|cells| is_title_row(cells))
        .count();

    let title: Vec<String> = rows[..title_len]
        .iter()
        .map(|cells| cells.iter().map(|c| c.text.as_str()).collect::<Vec<_>>().join(" "))
        .collect();
    let mut grid = RawGrid::new(title);

    let Some((header, body)) = rows[title_len..].split_first() else {
        return grid;
    };
    grid.push_row(header.iter().map(|c| Some(c.text.clone())).collect());

    let width = header.len();
    let mut sparse = 0;
    for cells in body {
        let mut row: Vec<Option<String>> = vec![None; width];
        for cell in cells {
            let col = nearest_column(header, cell);
            if let Some(existing) = &mut row[col] {
                existing.push(' ');
                existing.push_str(&cell.text);
            } else {
                row[col] = Some(cell.text.clone());
            }
        }
        let filled = row.iter().filter(|c| c.is_some()).count();
        if (filled as f32) < config.min_row_fill * width as f32 {
            sparse += 1;
        }
        grid.push_row(row);
    }

    if sparse > 0 {
        tracing::debug!(sparse, rows = body.len(), "sparse rows kept and padded");
    }
    grid
}

fn is_title_row(cells: &[Cell]) -> bool {
    cells.len() < 2
        || cells
            .first()
            .is_some_and(|c| c.text.to_lowercase().starts_with("table"))
}

/// Join tokens of a line into cells wherever the gap between neighbours is
/// narrower than `word_gap`.
fn line_cells(line: &Line, tokens: &[PositionedToken], word_gap: f32) -> Vec<Cell> {
    let mut cells: Vec<Cell> = Vec::new();
    for token in line.token_ids.iter().filter_map(|&i| tokens.get(i)) {
        let text = token.text.trim();
        if text.is_empty() {
            continue;
        }
        match cells.last_mut() {
            Some(cell) if token.bbox.x0 - cell.x1 < word_gap => {
                cell.text.push(' ');
                cell.text.push_str(text);
                cell.x1 = cell.x1.max(token.bbox.x1);
            }
            _ => cells.push(Cell {
                text: text.to_string(),
                x0: token.bbox.x0,
                x1: token.bbox.x1,
            }),
        }
    }
    cells
}

/// Index of the header column with the largest x-overlap, falling back to the
/// closest center. Lowest index wins ties.
fn nearest_column(header: &[Cell], cell: &Cell) -> usize {
    let mut best = 0;
    let mut best_overlap = 0.0_f32;
    for (i, h) in header.iter().enumerate() {
        let overlap = h.x_overlap(cell);
        if overlap > best_overlap {
            best = i;
            best_overlap = overlap;
        }
    }
    if best_overlap > 0.0 {
        return best;
    }

    let mut best_distance = f32::INFINITY;
    for (i, h) in header.iter().enumerate() {
        let distance = (h.center() - cell.center()).abs();
        if distance < best_distance {
            best = i;
            best_distance = distance;
        }
    }
    best
}
