// Fallback listing-age estimates, used when the exchange cannot tell us how
// long a symbol has traded. The built-in table goes stale as new coins list, so
// it can be replaced from a CSV file without a rebuild.
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::{EngineError, Result};

const DEFAULT_AGE_DAYS: u32 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct YoungSymbolTable {
    known: HashMap<String, u32>,
    /// Checked in order; first substring hit wins.
    contains: Vec<(String, u32)>,
    default_age_days: u32,
}

impl Default for YoungSymbolTable {
    fn default() -> Self {
        let known = [
            ("1000SATSUSDT", 15),
            ("NEIROUSDT", 20),
            ("DOGSUSDT", 25),
            ("HMSTRUSDT", 18),
            ("BOMEUSDT", 28),
            ("PENGUUSDT", 12),
            ("TURBOUSDT", 22),
            ("RSRUSDT", 30),
            ("CHESSUSDT", 35),
            ("SPKUSDT", 14),
        ]
        .into_iter()
        .map(|(s, d)| (s.to_string(), d))
        .collect();

        // Meme tickers tend to be recent listings; numeric prefixes are usually rebased launches.
        let contains = [("MEME", 45), ("DOG", 45), ("CAT", 45), ("PEPE", 45), ("1000", 25), ("1M", 25)]
            .into_iter()
            .map(|(p, d)| (p.to_string(), d))
            .collect();

        YoungSymbolTable { known, contains, default_age_days: DEFAULT_AGE_DAYS }
    }
}

impl YoungSymbolTable {
    pub fn new(known: HashMap<String, u32>, contains: Vec<(String, u32)>, default_age_days: u32) -> Self {
        YoungSymbolTable { known, contains, default_age_days }
    }

    /// Deterministic, total estimate for `symbol`.
    pub fn estimate(&self, symbol: &str) -> u32 {
        if let Some(&age) = self.known.get(symbol) {
            return age;
        }
        self.contains
            .iter()
            .find(|(pattern, _)| symbol.contains(pattern.as_str()))
            .map(|&(_, age)| age)
            .unwrap_or(self.default_age_days)
    }

    pub fn default_age_days(&self) -> u32 {
        self.default_age_days
    }

    /// Load a replacement table.
    ///
    /// Format: `kind;pattern;age_days` with a header row. `kind` is `symbol`
    /// (exact match), `contains` (substring) or `default` (pattern ignored).
    pub fn load_from_csv(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut rdr = ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(BufReader::new(file));

        let mut known = HashMap::new();
        let mut contains = Vec::new();
        let mut default_age_days = DEFAULT_AGE_DAYS;

        for (idx, result) in rdr.records().enumerate() {
            let record = result?;
            let line = idx + 2;
            let kind = Self::field(&record, 0, "kind", line)?;
            let age_str = Self::field(&record, 2, "age_days", line)?;
            let age = age_str.parse::<u32>().map_err(|e| {
                EngineError::ParseError(format!("Invalid age_days '{}' at line {}: {}", age_str, line, e))
            })?;

            match kind.to_lowercase().as_str() {
                "symbol" => {
                    let pattern = Self::field(&record, 1, "pattern", line)?;
                    known.insert(pattern.to_uppercase(), age);
                }
                "contains" => {
                    let pattern = Self::field(&record, 1, "pattern", line)?;
                    contains.push((pattern.to_uppercase(), age));
                }
                "default" => default_age_days = age,
                other => {
                    return Err(EngineError::ParseError(format!(
                        "Unknown row kind '{}' at line {} (expected symbol, contains or default)",
                        other, line
                    )))
                }
            }
        }

        tracing::info!(
            path = %path.display(),
            symbols = known.len(),
            patterns = contains.len(),
            default_age_days,
            "Loaded young-symbol age table"
        );
        Ok(YoungSymbolTable { known, contains, default_age_days })
    }

    fn field<'a>(record: &'a StringRecord, pos: usize, name: &str, line: usize) -> Result<&'a str> {
        record
            .get(pos)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::ParseError(format!("Missing '{}' field at line {}", name, line)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn builtin_table_prefers_exact_then_substring_then_default() {
        let table = YoungSymbolTable::default();
        assert_eq!(table.estimate("PENGUUSDT"), 12);
        // DOGSUSDT is listed explicitly even though it also contains "DOG".
        assert_eq!(table.estimate("DOGSUSDT"), 25);
        assert_eq!(table.estimate("HOTDOGUSDT"), 45);
        assert_eq!(table.estimate("1000CHEEMSUSDT"), 25);
        assert_eq!(table.estimate("ZZZUSDT"), 30);
    }

    #[test]
    fn estimate_is_deterministic() {
        let table = YoungSymbolTable::default();
        let first = table.estimate("CATPEPEUSDT");
        for _ in 0..10 {
            assert_eq!(table.estimate("CATPEPEUSDT"), first);
        }
    }

    #[test]
    fn loads_replacement_table_from_csv() {
        let tmp = create_test_csv(
            "kind;pattern;age_days\nsymbol;newcoinusdt;3\ncontains;AI;40\ndefault;;60",
        );
        let table = YoungSymbolTable::load_from_csv(tmp.path()).unwrap();
        assert_eq!(table.estimate("NEWCOINUSDT"), 3);
        assert_eq!(table.estimate("AIXBTUSDT"), 40);
        assert_eq!(table.estimate("PENGUUSDT"), 60);
        assert_eq!(table.default_age_days(), 60);
    }

    #[test]
    fn default_row_needs_no_pattern() {
        let tmp = create_test_csv("kind;pattern;age_days\ndefault;;7");
        let table = YoungSymbolTable::load_from_csv(tmp.path()).unwrap();
        assert_eq!(table.estimate("ANYUSDT"), 7);
    }

    #[test]
    fn rejects_bad_age_and_unknown_kind() {
        let bad_age = create_test_csv("kind;pattern;age_days\nsymbol;XUSDT;soon");
        let err = YoungSymbolTable::load_from_csv(bad_age.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid age_days 'soon' at line 2"));

        let bad_kind = create_test_csv("kind;pattern;age_days\nprefix;X;5");
        let err = YoungSymbolTable::load_from_csv(bad_kind.path()).unwrap_err();
        assert!(err.to_string().contains("Unknown row kind 'prefix'"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = YoungSymbolTable::load_from_csv(Path::new("missing_age_table.csv")).unwrap_err();
        assert!(matches!(err, EngineError::IoError { .. }));
    }
}
