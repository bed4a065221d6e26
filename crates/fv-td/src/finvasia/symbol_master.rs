//! Instrument reference table and symbol → token resolution.
//!
//! The broker publishes a zipped, delimited master file listing every
//! instrument on the segment:
//!
//! ```text
//! Exchange,Token,LotSize,Symbol,TradingSymbol,Instrument,TickSize,
//! NSE,2885,1,RELIANCE,RELIANCE-EQ,EQ,0.05,
//! NSE,26000,0,Nifty 50,Nifty 50,INDEX,0.05,
//! ```
//!
//! The table is loaded once per calendar day: a same-day copy under the
//! cache directory (`REFDATA_<isoDate>.txt`) is read if present, otherwise
//! the archive is downloaded and its text entry persisted there first.
//! After parsing, only equities and indices are kept and the broker's test
//! fixtures (`NSETEST...`) are dropped.

use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use chrono::NaiveDate;
use fv_core::InstrumentKind;
use fv_core::error::{FvError, Result};
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Marker the broker uses for test instruments in the master file.
const TEST_SYMBOL_MARKER: &str = "NSETEST";

/// Cache file name for a given day.
pub fn cache_file_name(date: NaiveDate) -> String {
    format!("REFDATA_{}.txt", date.format("%Y-%m-%d"))
}

// ---------------------------------------------------------------------------
// InstrumentRow / InstrumentReference
// ---------------------------------------------------------------------------

/// One row of the reference table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InstrumentRow {
    #[serde(rename = "Exchange", default)]
    pub exchange: String,
    #[serde(rename = "Token")]
    pub token: String,
    #[serde(rename = "LotSize", default)]
    pub lot_size: Option<u32>,
    /// Underlying name (`RELIANCE`).
    #[serde(rename = "Symbol", default)]
    pub name: String,
    /// Trading symbol used for lookups (`RELIANCE-EQ`).
    #[serde(rename = "TradingSymbol")]
    pub symbol: String,
    #[serde(rename = "Instrument")]
    pub kind: InstrumentKind,
    #[serde(rename = "TickSize")]
    pub tick_size: f64,
}

impl InstrumentRow {
    fn is_test_fixture(&self) -> bool {
        self.name.contains(TEST_SYMBOL_MARKER) || self.symbol.contains(TEST_SYMBOL_MARKER)
    }
}

/// The filtered, symbol-indexed reference table for one day.
#[derive(Debug, Clone)]
pub struct InstrumentReference {
    /// Calendar day the table was loaded for.
    date: NaiveDate,
    /// Rows in file order.
    rows: Vec<InstrumentRow>,
    /// Trading symbol → index into `rows`.
    index: AHashMap<String, usize>,
}

impl InstrumentReference {
    /// Build a table from already-parsed rows, applying the retention rules.
    ///
    /// When a trading symbol appears more than once the first row wins.
    pub fn from_rows(date: NaiveDate, rows: impl IntoIterator<Item = InstrumentRow>) -> Self {
        let mut kept = Vec::new();
        let mut index = AHashMap::new();
        for row in rows {
            if !row.kind.is_tradeable() || row.is_test_fixture() {
                continue;
            }
            if index.contains_key(&row.symbol) {
                continue;
            }
            index.insert(row.symbol.clone(), kept.len());
            kept.push(row);
        }
        Self {
            date,
            rows: kept,
            index,
        }
    }

    /// Parse the delimited master file text.
    ///
    /// The delimiter (comma or pipe) is taken from the header line. Columns
    /// without a header name are ignored; rows that fail to parse are
    /// skipped and counted in a warning.
    pub fn parse(date: NaiveDate, text: &str) -> Result<Self> {
        let header = text.lines().next().unwrap_or_default();
        let delimiter = if header.contains('|') { b'|' } else { b',' };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| FvError::ReferenceData(format!("unreadable header: {e}")))?;
        for required in ["Token", "TradingSymbol", "Instrument", "TickSize"] {
            if !headers.iter().any(|h| h == required) {
                return Err(FvError::ReferenceData(format!("missing column {required}")));
            }
        }

        let mut rows = Vec::new();
        let mut skipped = 0usize;
        for record in reader.deserialize::<InstrumentRow>() {
            match record {
                Ok(row) => rows.push(row),
                Err(e) => {
                    skipped += 1;
                    debug!("[finvasia] skipping reference row: {e}");
                }
            }
        }
        if skipped > 0 {
            warn!("[finvasia] {skipped} unparsable reference row(s) skipped");
        }

        Ok(Self::from_rows(date, rows))
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// Look up a row by trading symbol.
    pub fn get(&self, symbol: &str) -> Option<&InstrumentRow> {
        self.index.get(symbol).map(|&i| &self.rows[i])
    }

    /// Rows in file order.
    pub fn rows(&self) -> &[InstrumentRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SymbolResolver
// ---------------------------------------------------------------------------

/// Resolves trading symbols to exchange tokens and tick sizes.
///
/// Holds the current day's [`InstrumentReference`] behind a read-mostly
/// lock. A lookup against a table from an earlier day triggers a reload; if
/// that reload fails the stale table keeps serving. Reloads are serialized,
/// so concurrent lookups on a day rollover share a single download.
pub struct SymbolResolver {
    http: reqwest::Client,
    url: String,
    cache_dir: PathBuf,
    table: RwLock<Option<InstrumentReference>>,
    reload: Mutex<()>,
}

impl SymbolResolver {
    pub fn new(http: reqwest::Client, url: impl Into<String>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            url: url.into(),
            cache_dir: cache_dir.into(),
            table: RwLock::new(None),
            reload: Mutex::new(()),
        }
    }

    /// Create a resolver pre-loaded with `table` (no download source).
    pub fn with_table(table: InstrumentReference) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: String::new(),
            cache_dir: PathBuf::from("."),
            table: RwLock::new(Some(table)),
            reload: Mutex::new(()),
        }
    }

    /// Token for `symbol`, or [`FvError::SymbolNotFound`].
    pub async fn resolve_token(&self, symbol: &str) -> Result<String> {
        self.lookup(symbol, |row| row.token.clone()).await
    }

    /// Tick size for `symbol`, or [`FvError::SymbolNotFound`].
    pub async fn resolve_tick_size(&self, symbol: &str) -> Result<f64> {
        self.lookup(symbol, |row| row.tick_size).await
    }

    /// Date of the loaded table, if any.
    pub async fn loaded_date(&self) -> Option<NaiveDate> {
        self.table.read().await.as_ref().map(InstrumentReference::date)
    }

    /// Load today's table (same-day cache or download) and swap it in.
    pub async fn refresh(&self) -> Result<()> {
        let _reload = self.reload.lock().await;
        self.refresh_locked().await
    }

    /// Caller holds `self.reload`.
    async fn refresh_locked(&self) -> Result<()> {
        let today = fv_core::time_util::today_local();
        let table = self.load_for(today).await?;
        info!(
            "[finvasia] instrument reference loaded for {today}: {} rows",
            table.len()
        );
        *self.table.write().await = Some(table);
        Ok(())
    }

    async fn lookup<T>(&self, symbol: &str, f: impl Fn(&InstrumentRow) -> T) -> Result<T> {
        self.ensure_current().await?;
        let guard = self.table.read().await;
        let table = guard
            .as_ref()
            .ok_or_else(|| FvError::ReferenceData("instrument reference not loaded".into()))?;
        table
            .get(symbol)
            .map(f)
            .ok_or_else(|| FvError::SymbolNotFound(symbol.to_string()))
    }

    /// Reload when nothing is loaded or the table is from an earlier day.
    async fn ensure_current(&self) -> Result<()> {
        let today = fv_core::time_util::today_local();
        let is_current = |loaded: Option<NaiveDate>| {
            loaded.is_some_and(|d| d >= today) || (loaded.is_some() && self.url.is_empty())
        };
        if is_current(self.loaded_date().await) {
            return Ok(());
        }

        let _reload = self.reload.lock().await;
        // Another lookup may have reloaded while we waited.
        let loaded = self.loaded_date().await;
        if is_current(loaded) {
            return Ok(());
        }
        match self.refresh_locked().await {
            Ok(()) => Ok(()),
            Err(e) if loaded.is_some() => {
                warn!("[finvasia] reference refresh failed, using table from {loaded:?}: {e}");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn load_for(&self, date: NaiveDate) -> Result<InstrumentReference> {
        let path = self.cache_dir.join(cache_file_name(date));
        let text = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!("[finvasia] reading cached reference {}", path.display());
            tokio::fs::read_to_string(&path).await?
        } else {
            let text = self.download().await?;
            write_cache(&path, &text).await?;
            text
        };
        InstrumentReference::parse(date, &text)
    }

    async fn download(&self) -> Result<String> {
        if self.url.is_empty() {
            return Err(FvError::ReferenceData("no reference download URL".into()));
        }
        info!("[finvasia] downloading instrument reference from {}", self.url);
        let bytes = self
            .http
            .get(&self.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| FvError::Transport(format!("reference download failed: {e}")))?
            .bytes()
            .await
            .map_err(|e| FvError::Transport(format!("reference download failed: {e}")))?;
        extract_text(&bytes)
    }
}

/// Extract the first `.txt` entry (or the first entry) from a zip archive.
pub fn extract_text(zip_bytes: &[u8]) -> Result<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(zip_bytes))
        .map_err(|e| FvError::ReferenceData(format!("invalid archive: {e}")))?;
    if archive.is_empty() {
        return Err(FvError::ReferenceData("empty archive".into()));
    }
    let idx = archive
        .file_names()
        .position(|n| n.to_ascii_lowercase().ends_with(".txt"))
        .unwrap_or(0);
    let mut entry = archive
        .by_index(idx)
        .map_err(|e| FvError::ReferenceData(format!("unreadable archive entry: {e}")))?;
    let mut text = String::new();
    entry.read_to_string(&mut text)?;
    Ok(text)
}

/// Write through a temporary sibling and rename, so readers never see a
/// partial file.
async fn write_cache(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(format!(".{}.tmp", std::process::id()));
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, text).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MASTER: &str = "\
Exchange,Token,LotSize,Symbol,TradingSymbol,Instrument,TickSize,
NSE,2885,1,RELIANCE,RELIANCE-EQ,EQ,0.05,
NSE,26000,0,Nifty 50,Nifty 50,INDEX,0.05,
NSE,11915,1,YESBANK,YESBANK-BE,BE,0.01,
NSE,99999,1,NSETEST,NSETEST-EQ,EQ,0.05,
NSE,2886,1,RELIANCE,RELIANCE-EQ,EQ,0.10,
NSE,1594,1,INFY,INFY-EQ,EQ,0.05,
";

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn filters_kinds_and_test_fixtures() {
        let table = InstrumentReference::parse(day(), MASTER).unwrap();
        let symbols: Vec<&str> = table.rows().iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["RELIANCE-EQ", "Nifty 50", "INFY-EQ"]);
        assert!(table.get("YESBANK-BE").is_none());
        assert!(table.get("NSETEST-EQ").is_none());
    }

    #[test]
    fn first_duplicate_wins() {
        let table = InstrumentReference::parse(day(), MASTER).unwrap();
        let row = table.get("RELIANCE-EQ").unwrap();
        assert_eq!(row.token, "2885");
        assert_eq!(row.tick_size, 0.05);
        assert_eq!(row.lot_size, Some(1));
    }

    #[test]
    fn pipe_delimited() {
        let text = "Exchange|Token|LotSize|Symbol|TradingSymbol|Instrument|TickSize\n\
                    NSE|3045|1|SBIN|SBIN-EQ|EQ|0.05\n";
        let table = InstrumentReference::parse(day(), text).unwrap();
        assert_eq!(table.get("SBIN-EQ").unwrap().token, "3045");
    }

    #[test]
    fn missing_column_is_error() {
        let text = "Exchange,Token,Symbol\nNSE,1,X\n";
        assert!(matches!(
            InstrumentReference::parse(day(), text),
            Err(FvError::ReferenceData(_))
        ));
    }

    #[test]
    fn bad_rows_are_skipped() {
        let text = "Exchange,Token,LotSize,Symbol,TradingSymbol,Instrument,TickSize\n\
                    NSE,1,1,A,A-EQ,EQ,abc\n\
                    NSE,2,1,B,B-EQ,EQ,0.05\n";
        let table = InstrumentReference::parse(day(), text).unwrap();
        assert_eq!(table.len(), 1);
        assert!(table.get("B-EQ").is_some());
    }

    #[test]
    fn cache_name_is_dated() {
        assert_eq!(cache_file_name(day()), "REFDATA_2024-03-01.txt");
    }

    #[tokio::test]
    async fn unknown_symbol_is_not_found() {
        let table = InstrumentReference::parse(day(), MASTER).unwrap();
        let resolver = SymbolResolver::with_table(table);
        assert_eq!(resolver.resolve_token("INFY-EQ").await.unwrap(), "1594");
        assert_eq!(resolver.resolve_tick_size("Nifty 50").await.unwrap(), 0.05);
        assert!(matches!(
            resolver.resolve_token("NOPE-EQ").await,
            Err(FvError::SymbolNotFound(s)) if s == "NOPE-EQ"
        ));
    }

    #[tokio::test]
    async fn reads_same_day_cache_without_download() {
        let dir = tempfile::tempdir().unwrap();
        let today = fv_core::time_util::today_local();
        std::fs::write(dir.path().join(cache_file_name(today)), MASTER).unwrap();

        // Unroutable URL: any download attempt would fail.
        let resolver = SymbolResolver::new(reqwest::Client::new(), "http://127.0.0.1:9/x.zip", dir.path());
        resolver.refresh().await.unwrap();
        assert_eq!(resolver.loaded_date().await, Some(today));
        assert_eq!(resolver.resolve_token("RELIANCE-EQ").await.unwrap(), "2885");
    }

    fn zipped(text: &str) -> Vec<u8> {
        use std::io::Write;
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("NSE_symbols.txt", zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(text.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn day_rollover_downloads_once_for_concurrent_lookups() {
        use std::sync::Arc;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/symbols.zip"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(zipped(MASTER))
                    .set_delay(std::time::Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let today = fv_core::time_util::today_local();
        let yesterday = today.pred_opt().unwrap();
        let stale = InstrumentReference::parse(yesterday, MASTER).unwrap();
        let resolver = Arc::new(SymbolResolver {
            table: RwLock::new(Some(stale)),
            ..SymbolResolver::new(
                reqwest::Client::new(),
                format!("{}/symbols.zip", server.uri()),
                dir.path(),
            )
        });

        let lookups: Vec<_> = (0..8)
            .map(|_| {
                let r = resolver.clone();
                tokio::spawn(async move { r.resolve_token("INFY-EQ").await })
            })
            .collect();
        for lookup in lookups {
            assert_eq!(lookup.await.unwrap().unwrap(), "1594");
        }

        assert_eq!(resolver.loaded_date().await, Some(today));
        let cached = std::fs::read_to_string(dir.path().join(cache_file_name(today))).unwrap();
        assert_eq!(cached, MASTER);
        // Only the final cache file remains; no temporaries left behind.
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn extracts_text_entry_from_zip() {
        use std::io::Write;
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        writer.start_file("README", options).unwrap();
        writer.write_all(b"ignore me").unwrap();
        writer.start_file("NSE_symbols.txt", options).unwrap();
        writer.write_all(MASTER.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(extract_text(&bytes).unwrap(), MASTER);
        assert!(extract_text(b"not a zip").is_err());
    }
}
