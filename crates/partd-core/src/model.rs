use indexmap::IndexMap;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// Axis-aligned box in PDF points, origin top-left, y growing downwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        BBox {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    pub fn width(&self) -> f32 {
        (self.x1 - self.x0).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y1 - self.y0).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn center_x(&self) -> f32 {
        (self.x0 + self.x1) / 2.0
    }

    pub fn center_y(&self) -> f32 {
        (self.y0 + self.y1) / 2.0
    }

    pub fn union(&self, other: &BBox) -> BBox {
        BBox {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    /// Length of the horizontal overlap between the two boxes (0 if disjoint).
    pub fn x_overlap(&self, other: &BBox) -> f32 {
        (self.x1.min(other.x1) - self.x0.max(other.x0)).max(0.0)
    }

    pub fn y_overlap(&self, other: &BBox) -> f32 {
        (self.y1.min(other.y1) - self.y0.max(other.y0)).max(0.0)
    }

    pub fn intersection_area(&self, other: &BBox) -> f32 {
        self.x_overlap(other) * self.y_overlap(other)
    }

    pub fn intersects(&self, other: &BBox) -> bool {
        self.intersection_area(other) > 0.0
    }

    /// Intersection area as a fraction of the smaller box's area.
    ///
    /// Returns 0.0 when either box is degenerate.
    pub fn overlap_fraction(&self, other: &BBox) -> f32 {
        let smaller = self.area().min(other.area());
        if smaller <= 0.0 {
            return 0.0;
        }
        self.intersection_area(other) / smaller
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    /// Bounding box of a sequence of boxes, `None` if empty.
    pub fn enclosing<'a>(boxes: impl IntoIterator<Item = &'a BBox>) -> Option<BBox> {
        boxes.into_iter().fold(None, |acc, b| match acc {
            None => Some(*b),
            Some(a) => Some(a.union(b)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenSource {
    Embedded,
    Ocr,
}

impl fmt::Display for TokenSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenSource::Embedded => write!(f, "embedded"),
            TokenSource::Ocr => write!(f, "ocr"),
        }
    }
}

/// A piece of text with its position on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedToken {
    pub text: String,
    pub bbox: BBox,
    pub page_index: usize,
    pub source: TokenSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
}

impl PositionedToken {
    pub fn new(text: impl Into<String>, bbox: BBox, page_index: usize, source: TokenSource) -> Self {
        PositionedToken {
            text: text.into(),
            bbox,
            page_index,
            source,
            font: None,
        }
    }

    pub fn with_font(mut self, font: impl Into<String>) -> Self {
        self.font = Some(font.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Table,
    Chart,
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionKind::Table => write!(f, "table"),
            RegionKind::Chart => write!(f, "chart"),
        }
    }
}

/// A rectangular area of a page hypothesized to hold one table or chart.
///
/// `token_ids` index into the page's assembled token sequence and are kept
/// in reading order (the order of that sequence).
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub page_index: usize,
    pub bbox: BBox,
    pub kind: RegionKind,
    pub anchor_keywords: BTreeSet<String>,
    pub token_ids: Vec<usize>,
}

impl Region {
    pub fn tokens<'a>(&'a self, page_tokens: &'a [PositionedToken]) -> Vec<&'a PositionedToken> {
        self.token_ids
            .iter()
            .filter_map(|&i| page_tokens.get(i))
            .collect()
    }
}

/// Unclassified, uncleaned cells of one table region.
///
/// `rows[0]` is the header row. Every row has exactly `col_count()` cells;
/// `None` is the missing marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGrid {
    /// Title lines found above the header row.
    pub title: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawGrid {
    pub fn new(title: Vec<String>) -> Self {
        RawGrid {
            title,
            rows: Vec::new(),
        }
    }

    /// Build a grid from literal rows, the first one being the header.
    pub fn from_rows(title: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let mut grid = RawGrid::new(title);
        for row in rows {
            grid.push_row(row.into_iter().map(Some).collect());
        }
        grid
    }

    /// Append a row, padding it with missing markers when it is short and
    /// widening every earlier row when it is long. Rows are never dropped.
    pub fn push_row(&mut self, mut cells: Vec<Option<String>>) {
        let width = self.col_count();
        if self.rows.is_empty() || cells.len() == width {
            self.rows.push(cells);
        } else if cells.len() < width {
            cells.resize(width, None);
            self.rows.push(cells);
        } else {
            let new_width = cells.len();
            for row in &mut self.rows {
                row.resize(new_width, None);
            }
            self.rows.push(cells);
        }
    }

    pub fn header(&self) -> &[Option<String>] {
        self.rows.first().map(|r| r.as_slice()).unwrap_or(&[])
    }

    pub fn body(&self) -> &[Vec<Option<String>>] {
        self.rows.get(1..).unwrap_or(&[])
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of rows including the header.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn title_text(&self) -> Option<String> {
        if self.title.is_empty() {
            None
        } else {
            Some(self.title.join(" "))
        }
    }
}

/// Closed set of schemas every extracted unit is assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaLabel {
    AllowableStress,
    DesignStress,
    MechanicalProperties,
    PhysicalProperties,
    OtherTable,
    IsochronousCurve,
    ExternalPressureChart,
    OtherChart,
    Unclassified,
}

impl SchemaLabel {
    pub const ALL: [SchemaLabel; 9] = [
        SchemaLabel::AllowableStress,
        SchemaLabel::DesignStress,
        SchemaLabel::MechanicalProperties,
        SchemaLabel::PhysicalProperties,
        SchemaLabel::OtherTable,
        SchemaLabel::IsochronousCurve,
        SchemaLabel::ExternalPressureChart,
        SchemaLabel::OtherChart,
        SchemaLabel::Unclassified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SchemaLabel::AllowableStress => "allowable_stress",
            SchemaLabel::DesignStress => "design_stress",
            SchemaLabel::MechanicalProperties => "mechanical_properties",
            SchemaLabel::PhysicalProperties => "physical_properties",
            SchemaLabel::OtherTable => "other_table",
            SchemaLabel::IsochronousCurve => "isochronous_curve",
            SchemaLabel::ExternalPressureChart => "external_pressure_chart",
            SchemaLabel::OtherChart => "other_chart",
            SchemaLabel::Unclassified => "unclassified",
        }
    }

    pub fn from_str_loose(s: &str) -> Option<SchemaLabel> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        SchemaLabel::ALL.into_iter().find(|l| l.as_str() == key)
    }

    pub fn is_table(&self) -> bool {
        matches!(
            self,
            SchemaLabel::AllowableStress
                | SchemaLabel::DesignStress
                | SchemaLabel::MechanicalProperties
                | SchemaLabel::PhysicalProperties
                | SchemaLabel::OtherTable
        )
    }

    pub fn is_chart(&self) -> bool {
        matches!(
            self,
            SchemaLabel::IsochronousCurve
                | SchemaLabel::ExternalPressureChart
                | SchemaLabel::OtherChart
        )
    }

    pub fn is_stress(&self) -> bool {
        matches!(self, SchemaLabel::AllowableStress | SchemaLabel::DesignStress)
    }
}

impl fmt::Display for SchemaLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A normalized cell. `Missing` is the explicit sentinel for absent or
/// unreadable values and is never conflated with zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CellValue {
    Number(Decimal),
    Text(String),
    Missing,
}

impl CellValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_decimal().and_then(|d| d.to_f64())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Raw-grid rendering of the cell; the sentinel maps back to the missing marker.
    pub fn to_raw(&self) -> Option<String> {
        match self {
            CellValue::Number(d) => Some(d.to_string()),
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Missing => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(d) => write!(f, "{d}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Missing => f.write_str("-"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Number(d) => match d.to_f64() {
                Some(f) => serializer.serialize_f64(f),
                None => serializer.serialize_str(&d.to_string()),
            },
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Missing => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CellVisitor;

        impl<'de> Visitor<'de> for CellVisitor {
            type Value = CellValue;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a number, a string or null")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CellValue, E> {
                Ok(CellValue::Number(Decimal::from(v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CellValue, E> {
                Ok(CellValue::Number(Decimal::from(v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<CellValue, E> {
                f64_to_decimal(v)
                    .map(CellValue::Number)
                    .ok_or_else(|| E::custom(format!("number {v} is out of range")))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CellValue, E> {
                Ok(CellValue::Text(v.to_string()))
            }

            fn visit_unit<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Missing)
            }

            fn visit_none<E: de::Error>(self) -> Result<CellValue, E> {
                Ok(CellValue::Missing)
            }
        }

        deserializer.deserialize_any(CellVisitor)
    }
}

/// Convert f64 to Decimal through its shortest display form, so that
/// 19.5_f64 becomes exactly 19.5 rather than a binary approximation.
fn f64_to_decimal(f: f64) -> Option<Decimal> {
    format!("{f}")
        .parse::<Decimal>()
        .ok()
        .or_else(|| Decimal::try_from(f).ok())
}

/// Derived facts about an extracted unit. Recomputable from the owning entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub has_temperature_data: bool,
    pub has_stress_data: bool,
    pub row_count: usize,
    pub col_count: usize,
    /// Cells in numeric columns whose text failed numeric conversion.
    #[serde(default)]
    pub coercion_failures: usize,
}

/// A numeric-column cell that could not be converted and was stored as missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlaggedCell {
    /// Index into the table's `rows`.
    pub row: usize,
    pub column: String,
    pub raw: String,
}

pub type TableRow = IndexMap<String, CellValue>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedTable {
    /// `Page_<n>_Table_<k>`.
    pub id: String,
    /// 1-based page number.
    pub page: usize,
    pub schema: SchemaLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flagged_cells: Vec<FlaggedCell>,
    pub metadata: ExtractionMetadata,
}

impl ExtractedTable {
    /// Render the table back into a raw grid (header first). Used to check that
    /// normalization is idempotent and to re-run it on stored tables.
    pub fn to_raw_grid(&self) -> RawGrid {
        let mut grid = RawGrid::new(self.title.iter().cloned().collect());
        grid.push_row(self.columns.iter().cloned().map(Some).collect());
        for (index, row) in self.rows.iter().enumerate() {
            grid.push_row(
                self.columns
                    .iter()
                    .map(|c| {
                        // A flagged cell gives back the text it failed on.
                        self.flagged_cells
                            .iter()
                            .find(|f| f.row == index && f.column == *c)
                            .map(|f| f.raw.clone())
                            .or_else(|| row.get(c).and_then(CellValue::to_raw))
                    })
                    .collect(),
            );
        }
        grid
    }
}

/// One labelled curve of a chart, as (x, y) points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedChart {
    /// `Page_<n>_Chart_<k>`.
    pub id: String,
    pub page: usize,
    pub schema: SchemaLabel,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub series: Vec<ChartSeries>,
    pub metadata: ExtractionMetadata,
}
