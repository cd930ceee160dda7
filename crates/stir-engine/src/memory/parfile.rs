//! Reader for `key := value` reconstruction parameter files.
//!
//! ```text
//! OSMAPOSLParameters :=
//! number of subsets := 12
//! ; comment
//! output filename prefix := recon
//! END :=
//! ```
//!
//! Keys are matched case-insensitively with runs of whitespace collapsed.
//! Lines without a value (section headers, `END :=`) are skipped.

use std::fs;
use std::path::Path;

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::fault::FaultResult;

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct ParFile {
    entries: IndexMap<SmolStr, SmolStr>,
}

impl ParFile {
    pub(crate) fn read(path: &Path) -> FaultResult<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| fault!("cannot open parameter file {}: {}", path.display(), e))?;
        Ok(Self::parse(&text))
    }

    pub(crate) fn parse(text: &str) -> Self {
        let mut entries = IndexMap::new();
        for line in text.lines() {
            let line = match line.find(';') {
                Some(pos) => &line[..pos],
                None => line,
            };
            let Some((key, value)) = line.split_once(":=") else {
                continue;
            };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            entries.insert(normalize_key(key), SmolStr::new(value));
        }
        ParFile { entries }
    }

    pub(crate) fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(&normalize_key(key)).map(|v| v.as_str())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn normalize_key(key: &str) -> SmolStr {
    let joined = key.split_whitespace().collect::<Vec<_>>().join(" ");
    SmolStr::new(joined.to_ascii_lowercase())
}
