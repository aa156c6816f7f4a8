use crate::error::ExtractError;
use crate::model::{BBox, PositionedToken, TokenSource};
use crate::source::{PageData, PageRaster, PageSource};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::Write;
use std::path::Path;
use std::process::Command;

/// Page source backed by poppler's command line tools.
///
/// `pdftotext -bbox` runs once when the source is opened and yields word
/// boxes for every page. Rasters for OCR are rendered per page with
/// `pdftoppm` only when a DPI has been set.
pub struct PdftotextSource {
    pdf: tempfile::NamedTempFile,
    pages: Vec<Vec<PositionedToken>>,
    raster_dpi: Option<u32>,
}

impl PdftotextSource {
    pub fn open(path: &Path) -> Result<Self, ExtractError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(pdf_bytes: &[u8]) -> Result<Self, ExtractError> {
        let mut pdf =
            tempfile::NamedTempFile::new().map_err(|e| ExtractError::Extraction(e.to_string()))?;
        pdf.write_all(pdf_bytes)
            .map_err(|e| ExtractError::Extraction(e.to_string()))?;

        let stdout = run_tool(
            "pdftotext",
            Command::new("pdftotext").arg("-bbox").arg(pdf.path()).arg("-"),
        )?;
        let pages = parse_bbox_xhtml(&String::from_utf8_lossy(&stdout))?;
        tracing::info!(pages = pages.len(), "pdftotext word boxes loaded");

        Ok(PdftotextSource {
            pdf,
            pages,
            raster_dpi: None,
        })
    }

    /// Render page rasters at `dpi` so that OCR can run on them.
    pub fn with_rasters(mut self, dpi: u32) -> Self {
        self.raster_dpi = Some(dpi);
        self
    }

    /// Check if pdftotext is available on the system.
    pub fn is_available() -> bool {
        Command::new("pdftotext")
            .arg("-v")
            .output()
            .map(|o| o.status.success() || !o.stderr.is_empty())
            .unwrap_or(false)
    }

    fn render(&self, index: usize, dpi: u32) -> Result<PageRaster, ExtractError> {
        let dir = tempfile::tempdir()?;
        let page = (index + 1).to_string();
        run_tool(
            "pdftoppm",
            Command::new("pdftoppm")
                .args(["-f", &page, "-l", &page, "-r", &dpi.to_string(), "-png", "-singlefile"])
                .arg(self.pdf.path())
                .arg(dir.path().join("page")),
        )?;
        Ok(PageRaster::in_temp_dir(dir, "page.png", dpi, index))
    }
}

impl PageSource for PdftotextSource {
    fn page_count(&self) -> Result<usize, ExtractError> {
        Ok(self.pages.len())
    }

    fn get_page(&self, index: usize) -> Result<PageData, ExtractError> {
        let tokens = self.pages.get(index).ok_or(ExtractError::PageUnavailable {
            index,
            page_count: self.pages.len(),
        })?;
        let raster = match self.raster_dpi {
            // Without a raster the page still has its embedded text.
            Some(dpi) => match self.render(index, dpi) {
                Ok(raster) => Some(raster),
                Err(e) => {
                    tracing::warn!(page = index + 1, "page raster unavailable, OCR skipped: {e}");
                    None
                }
            },
            None => None,
        };
        Ok(PageData {
            page_index: index,
            page_number: index + 1,
            embedded_tokens: tokens.clone(),
            raster,
        })
    }

    fn backend_name(&self) -> &str {
        "pdftotext"
    }
}

fn run_tool(tool: &'static str, command: &mut Command) -> Result<Vec<u8>, ExtractError> {
    let output = command.output().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            if tool == "pdftotext" {
                ExtractError::PdftotextNotFound
            } else {
                ExtractError::Extraction(format!("{tool} not found. Install poppler-utils"))
            }
        } else {
            ExtractError::Extraction(format!("{tool} failed: {e}"))
        }
    })?;

    if !output.status.success() {
        return Err(ExtractError::PdftotextFailed {
            tool,
            code: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }
    Ok(output.stdout)
}

/// Parse `pdftotext -bbox` XHTML into one token list per `<page>`, in order.
fn parse_bbox_xhtml(xml: &str) -> Result<Vec<Vec<PositionedToken>>, ExtractError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut pages: Vec<Vec<PositionedToken>> = Vec::new();
    let mut word: Option<(BBox, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"page" => pages.push(Vec::new()),
                b"word" => word = word_bbox(&e).map(|b| (b, String::new())),
                _ => {}
            },
            Ok(Event::Empty(e)) if e.local_name().as_ref() == b"page" => pages.push(Vec::new()),
            Ok(Event::Text(t)) => {
                if let Some((_, text)) = word.as_mut() {
                    match t.unescape() {
                        Ok(s) => text.push_str(&s),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
                    }
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"word" => {
                let page_index = pages.len().saturating_sub(1);
                if let (Some((bbox, text)), Some(page)) = (word.take(), pages.last_mut()) {
                    let text = text.trim();
                    if !text.is_empty() {
                        page.push(PositionedToken::new(text, bbox, page_index, TokenSource::Embedded));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ExtractError::Extraction(format!(
                    "malformed pdftotext output at byte {}: {e}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
    }

    Ok(pages)
}

fn word_bbox(e: &BytesStart<'_>) -> Option<BBox> {
    let mut coords = [None::<f32>; 4];
    for attr in e.attributes().flatten() {
        let slot = match attr.key.local_name().as_ref() {
            b"xMin" => 0,
            b"yMin" => 1,
            b"xMax" => 2,
            b"yMax" => 3,
            _ => continue,
        };
        coords[slot] = attr.unescape_value().ok().and_then(|v| v.parse().ok());
    }
    Some(BBox::new(coords[0]?, coords[1]?, coords[2]?, coords[3]?))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<!DOCTYPE html PUBLIC "-//W3C//DTD XHTML 1.0 Transitional//EN" "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd">
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
<title></title>
<meta name="Producer" content="Acrobat Distiller"/>
</head>
<body>
<doc>
  <page width="612.000000" height="792.000000">
    <word xMin="56.800000" yMin="72.100000" xMax="82.300000" yMax="81.500000">Table</word>
    <word xMin="85.000000" yMin="72.100000" xMax="98.000000" yMax="81.500000">1A</word>
  </page>
  <page width="612.000000" height="792.000000">
  </page>
  <page width="612.000000" height="792.000000">
    <word xMin="56.0" yMin="100.0" xMax="90.0" yMax="108.0">A&amp;B</word>
  </page>
</doc>
</body>
</html>
"#;

    #[test]
    fn test_parse_pages_and_words() {
        let pages = parse_bbox_xhtml(SAMPLE).unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0].len(), 2);
        assert_eq!(pages[0][0].text, "Table");
        assert_eq!(pages[0][0].bbox.x0, 56.8);
        assert_eq!(pages[0][1].page_index, 0);
        assert!(pages[1].is_empty());
        assert_eq!(pages[2][0].text, "A&B");
        assert_eq!(pages[2][0].page_index, 2);
        assert_eq!(pages[2][0].source, TokenSource::Embedded);
    }

    #[test]
    fn test_word_without_coordinates_is_skipped() {
        let xml = r#"<doc><page><word xMin="1">x</word><word xMin="1" yMin="2" xMax="3" yMax="4">y</word></page></doc>"#;
        let pages = parse_bbox_xhtml(xml).unwrap();
        assert_eq!(pages[0].len(), 1);
        assert_eq!(pages[0][0].text, "y");
    }

    #[test]
    fn test_malformed_output_is_an_error() {
        assert!(parse_bbox_xhtml("<doc><page><word xMin=\"1\"></page>").is_err());
    }
}
