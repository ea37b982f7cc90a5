//! Tabular Loader
//!
//! Parses uploaded bytes into a [`RawTable`]. The primary balances upload is
//! tried tab-delimited first and comma-delimited second; every other source
//! has a single delimiter. Bad rows are dropped, a bad source is fatal.

use csv::{ByteRecord, ReaderBuilder};
use pymescore_core::{CellValue, Error, RawTable, Result, SourceKind};
use tracing::{debug, warn};

/// Default name of the free-text column fed to the embedder
pub const DEFAULT_TEXT_COLUMN: &str = "texto_financiero";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Options shared by every source of one request
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Column kept verbatim as text, never numerically coerced
    pub text_column: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            text_column: DEFAULT_TEXT_COLUMN.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableLoader {
    options: LoadOptions,
}

impl TableLoader {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    /// Parse one upload, trying each delimiter the source allows in order
    pub fn load(&self, bytes: &[u8], kind: SourceKind) -> Result<RawTable> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let mut last_reason = String::from("no delimiter configured");

        for (attempt, &delimiter) in kind.delimiters().iter().enumerate() {
            match self.parse_with(bytes, kind, delimiter) {
                Ok(table) => {
                    if attempt > 0 {
                        warn!(
                            source = kind.label(),
                            delimiter = %char::from(delimiter).escape_default(),
                            "parsed with fallback delimiter"
                        );
                    }
                    debug!(source = kind.label(), rows = table.len(), columns = table.width(), "table loaded");
                    return Ok(table);
                }
                Err(reason) => {
                    debug!(
                        source = kind.label(),
                        delimiter = %char::from(delimiter).escape_default(),
                        %reason,
                        "delimiter attempt failed"
                    );
                    last_reason = reason;
                }
            }
        }

        Err(Error::malformed(kind.label(), last_reason))
    }

    fn parse_with(
        &self,
        bytes: &[u8],
        kind: SourceKind,
        delimiter: u8,
    ) -> std::result::Result<RawTable, String> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(bytes);

        let header_record = reader
            .byte_headers()
            .map_err(|e| format!("unreadable header: {}", e))?
            .clone();
        let headers = header_record
            .iter()
            .map(|h| std::str::from_utf8(h).map(|s| s.trim().to_string()))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|_| "header is not valid UTF-8".to_string())?;

        let id_col = kind.identifier_column();
        if !headers.iter().any(|h| h == id_col) {
            return Err(format!("missing identifier column '{}'", id_col));
        }

        let mut table = RawTable::new(headers);
        let text_col = kind
            .text_column()
            .unwrap_or(self.options.text_column.as_str());
        let verbatim: Vec<bool> = table
            .columns()
            .iter()
            .map(|c| c == id_col || c == text_col)
            .collect();
        let width = table.width();

        let mut record = ByteRecord::new();
        let mut dropped = 0usize;
        loop {
            match reader.read_byte_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) if e.is_io_error() => return Err(format!("read failed: {}", e)),
                Err(e) => {
                    debug!(source = kind.label(), error = %e, "skipping unreadable row");
                    dropped += 1;
                    continue;
                }
            }

            if record.len() > width {
                dropped += 1;
                continue;
            }

            let Some(mut row) = parse_record(&record, &verbatim) else {
                dropped += 1;
                continue;
            };
            row.resize(width, CellValue::Missing);
            table.push_row(row).map_err(|e| e.to_string())?;
        }

        if dropped > 0 {
            debug!(source = kind.label(), dropped, "dropped malformed rows");
        }
        Ok(table)
    }
}

fn parse_record(record: &ByteRecord, verbatim: &[bool]) -> Option<Vec<CellValue>> {
    record
        .iter()
        .zip(verbatim)
        .map(|(field, &keep_text)| {
            let s = std::str::from_utf8(field).ok()?;
            Some(if keep_text {
                CellValue::text(s)
            } else {
                CellValue::parse(s)
            })
        })
        .collect()
}
