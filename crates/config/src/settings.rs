// Application settings
// Loaded from ~/.config/lahimena/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Exchange-rate source settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateSettings {
    /// JSON endpoint returning `{"rates": {"EUR": .., "USD": ..}}` with MGA as base
    pub endpoint: String,

    /// Request timeout
    pub timeout_secs: u64,

    /// Ariary per euro when the endpoint is unreachable
    pub fallback_eur: f64,

    /// Ariary per US dollar when the endpoint is unreachable
    pub fallback_usd: f64,
}

impl Default for RateSettings {
    fn default() -> Self {
        Self {
            endpoint: "https://api.exchangerate-api.com/v4/latest/MGA".to_string(),
            timeout_secs: 5,
            fallback_eur: 5235.0,
            fallback_usd: 4900.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Files
    /// Base directory for relative workbook paths; empty = current directory
    #[serde(rename = "files.dataDir")]
    pub data_dir: PathBuf,

    #[serde(rename = "files.clientWorkbook")]
    pub client_workbook: PathBuf,

    #[serde(rename = "files.hotelWorkbook")]
    pub hotel_workbook: PathBuf,

    // Sheets
    #[serde(rename = "sheets.clients")]
    pub client_sheet: String,

    #[serde(rename = "sheets.clientExtended")]
    pub client_extended_sheet: String,

    #[serde(rename = "sheets.quotations")]
    pub quotation_sheet: String,

    #[serde(rename = "sheets.hotels")]
    pub hotel_sheet: String,

    /// Upper bound for auto-sized column widths, in characters
    #[serde(rename = "sheets.maxColumnWidth")]
    pub max_column_width: f64,

    // Cache lifetimes
    #[serde(rename = "cache.hotelTtlSecs")]
    pub hotel_ttl_secs: u64,

    #[serde(rename = "cache.clientTtlSecs")]
    pub client_ttl_secs: u64,

    #[serde(rename = "cache.quotationTtlSecs")]
    pub quotation_ttl_secs: u64,

    #[serde(rename = "cache.rateTtlSecs")]
    pub rate_ttl_secs: u64,

    // Exchange rates
    #[serde(rename = "rates", default)]
    pub rates: RateSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Files
            data_dir: PathBuf::new(),
            client_workbook: PathBuf::from("data.xlsx"),
            hotel_workbook: PathBuf::from("data-hotel.xlsx"),
            // Sheets
            client_sheet: "DEMANDE_CLIENT".to_string(),
            client_extended_sheet: "INFOS_CLIENT".to_string(),
            quotation_sheet: "COTATION_H".to_string(),
            hotel_sheet: "BDD_HOTEL".to_string(),
            max_column_width: 25.0,
            // Hotel data changes rarely
            hotel_ttl_secs: 24 * 60 * 60,
            client_ttl_secs: 60 * 60,
            quotation_ttl_secs: 60 * 60,
            rate_ttl_secs: 60 * 60,
            // Rates
            rates: RateSettings::default(),
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("lahimena");
        config_dir.join("settings.json")
    }

    /// Load settings from the default location, writing a default file on first run
    pub fn load() -> Self {
        let path = Self::config_path();

        if !path.exists() {
            let settings = Self::default();
            if let Err(e) = settings.save_to(&path) {
                log::warn!("Error writing default settings.json: {}", e);
            }
            return settings;
        }

        Self::load_from(&path)
    }

    /// Load settings from an explicit file, falling back to defaults
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => {
                // Strip comments (lines starting with //)
                let cleaned: String = contents
                    .lines()
                    .filter(|line| !line.trim().starts_with("//"))
                    .collect::<Vec<_>>()
                    .join("\n");

                match serde_json::from_str(&cleaned) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                        Self::default()
                    }
                }
            }
            Err(e) => {
                log::warn!("Error reading {}: {}; using default settings", path.display(), e);
                Self::default()
            }
        }
    }

    /// Save current settings to the default location
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self)
            .map_err(|e| e.to_string())?;

        fs::write(path, json).map_err(|e| e.to_string())
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() || self.data_dir.as_os_str().is_empty() {
            path.to_path_buf()
        } else {
            self.data_dir.join(path)
        }
    }

    /// Clients, extended client info and quotations live in this workbook
    pub fn client_workbook_path(&self) -> PathBuf {
        self.resolve(&self.client_workbook)
    }

    pub fn hotel_workbook_path(&self) -> PathBuf {
        self.resolve(&self.hotel_workbook)
    }

    pub fn hotel_ttl(&self) -> Duration {
        Duration::from_secs(self.hotel_ttl_secs)
    }

    pub fn client_ttl(&self) -> Duration {
        Duration::from_secs(self.client_ttl_secs)
    }

    pub fn quotation_ttl(&self) -> Duration {
        Duration::from_secs(self.quotation_ttl_secs)
    }

    pub fn rate_ttl(&self) -> Duration {
        Duration::from_secs(self.rate_ttl_secs)
    }

    /// Settings rooted at `dir`, defaults otherwise
    pub fn with_data_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: dir.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.client_sheet, "DEMANDE_CLIENT");
        assert_eq!(s.hotel_sheet, "BDD_HOTEL");
        assert_eq!(s.hotel_ttl(), Duration::from_secs(86_400));
        assert_eq!(s.client_ttl(), Duration::from_secs(3_600));
        assert_eq!(s.client_workbook_path(), PathBuf::from("data.xlsx"));
    }

    #[test]
    fn test_relative_paths_resolve_against_data_dir() {
        let s = Settings::with_data_dir("/srv/lahimena");
        assert_eq!(s.client_workbook_path(), PathBuf::from("/srv/lahimena/data.xlsx"));
        assert_eq!(s.hotel_workbook_path(), PathBuf::from("/srv/lahimena/data-hotel.xlsx"));

        let mut abs = s.clone();
        abs.hotel_workbook = PathBuf::from("/elsewhere/hotels.xlsx");
        assert_eq!(abs.hotel_workbook_path(), PathBuf::from("/elsewhere/hotels.xlsx"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            r#"{
    // hotels are refreshed weekly
    "cache.hotelTtlSecs": 60,
    "sheets.hotels": "HOTELS",
    "rates": { "fallback_eur": 5000.0 }
}"#,
        )
        .unwrap();

        let s = Settings::load_from(&path);
        assert_eq!(s.hotel_ttl_secs, 60);
        assert_eq!(s.hotel_sheet, "HOTELS");
        assert_eq!(s.client_sheet, "DEMANDE_CLIENT");
        assert_eq!(s.rates.fallback_eur, 5000.0);
        assert_eq!(s.rates.fallback_usd, 4900.0);
    }

    #[test]
    fn test_malformed_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path).client_ttl_secs, 3_600);
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut s = Settings::default();
        s.quotation_sheet = "DEVIS".to_string();
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).quotation_sheet, "DEVIS");
    }
}
