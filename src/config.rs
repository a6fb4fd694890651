//! Process configuration, read once from the environment at startup

use std::time::Duration;

use thiserror::Error;

use crate::codec::{Codec, SchemaVersion};
use crate::domain::value_objects::SizeRange;
use crate::guard::DuplicateGuard;
use crate::store::sheets::DEFAULT_API_URL;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Sheet (tab) name per record type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetNames { pub products: String, pub sales: String, pub exchanges: String, pub intakes: String }

impl Default for SheetNames {
    fn default() -> Self {
        Self { products: "Productos".into(), sales: "Ventas".into(), exchanges: "Cambios".into(), intakes: "Ingresos".into() }
    }
}

/// What the inventory engine needs: where records live and how they are laid out.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EngineConfig { pub sheets: SheetNames, pub codec: Codec, pub guard: DuplicateGuard }

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SheetsSettings { pub spreadsheet_id: String, pub access_token: String, pub api_url: String, pub timeout: Duration }

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub port: u16,
    pub engine: EngineConfig,
    /// `None` runs on the in-memory store.
    pub sheets: Option<SheetsSettings>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> { Self::from_lookup(|key| std::env::var(key).ok()) }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let text = |key: &str, default: &str| get(key).filter(|v| !v.trim().is_empty()).unwrap_or_else(|| default.to_string());

        let port = number(&get, "PORT", 3000)?;
        let sizes = SizeRange::new(number(&get, "SIZE_MIN", 35)?, number(&get, "SIZE_MAX", 40)?)
            .map_err(|e| ConfigError::Invalid { key: "SIZE_MIN", reason: e.to_string() })?;
        let schema = text("SCHEMA_VERSION", "current")
            .parse::<SchemaVersion>()
            .map_err(|reason| ConfigError::Invalid { key: "SCHEMA_VERSION", reason })?;
        let window: i64 = number(&get, "DUPLICATE_WINDOW_SECS", 5)?;
        let tail: usize = number(&get, "DUPLICATE_TAIL", 5)?;
        let timeout: u64 = number(&get, "STORE_TIMEOUT_SECS", 15)?;
        if timeout == 0 {
            return Err(ConfigError::Invalid { key: "STORE_TIMEOUT_SECS", reason: "must be at least 1".into() });
        }

        let defaults = SheetNames::default();
        let sheets = SheetNames {
            products: text("SHEET_NAME_PRODUCTOS", &defaults.products),
            sales: text("SHEET_NAME_VENTAS", &defaults.sales),
            exchanges: text("SHEET_NAME_CAMBIOS", &defaults.exchanges),
            intakes: text("SHEET_NAME_INGRESOS", &defaults.intakes),
        };

        let remote = match get("GOOGLE_SHEET_ID").filter(|v| !v.trim().is_empty()) {
            None => None,
            Some(spreadsheet_id) => Some(SheetsSettings {
                spreadsheet_id,
                access_token: get("GOOGLE_ACCESS_TOKEN").filter(|v| !v.trim().is_empty()).ok_or(ConfigError::Invalid {
                    key: "GOOGLE_ACCESS_TOKEN",
                    reason: "required when GOOGLE_SHEET_ID is set".into(),
                })?,
                api_url: text("SHEETS_API_URL", DEFAULT_API_URL),
                timeout: Duration::from_secs(timeout),
            }),
        };

        Ok(Self {
            port,
            engine: EngineConfig {
                sheets,
                codec: Codec::new(schema, sizes),
                guard: DuplicateGuard::new(chrono::Duration::seconds(window), tail),
            },
            sheets: remote,
        })
    }
}

fn number<T: std::str::FromStr>(get: &impl Fn(&str) -> Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match get(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid { key, reason: e.to_string() }),
    }
}
