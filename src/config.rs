//! Configuration management for PageScan Server

use std::env;
use std::time::Duration;

use serde::Deserialize;

use crate::pipeline::{default_concurrency, PipelineConfig, DEFAULT_DPI};
use crate::raster::RasterOptions;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub ocr: OcrConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Largest accepted upload, in bytes
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OcrConfig {
    /// Path or name of the tesseract binary
    pub tesseract_path: String,
    /// Default OCR language
    pub language: String,
    /// PDF rendering resolution
    pub dpi: u32,
    /// Pages recognized in parallel
    pub max_concurrency: usize,
    pub page_timeout_secs: u64,
    pub timeout_retries: u32,
    /// Prefer a PDF page's embedded text over OCR
    pub use_text_layer: bool,
    pub raster_timeout_secs: u64,
}

/// Error raised for an environment variable that is set but unparsable
#[derive(Debug, thiserror::Error)]
#[error("Invalid value for {key}: {value:?}")]
pub struct ConfigError {
    pub key: &'static str,
    pub value: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                max_upload_bytes: 100 * 1024 * 1024,
            },
            ocr: OcrConfig {
                tesseract_path: "tesseract".to_string(),
                language: "eng".to_string(),
                dpi: DEFAULT_DPI,
                max_concurrency: default_concurrency(),
                page_timeout_secs: 60,
                timeout_retries: 1,
                use_text_layer: false,
                raster_timeout_secs: 120,
            },
        }
    }
}

impl Config {
    /// Load from the process environment. Unset variables take their
    /// default; a set but unparsable variable is an error.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();
        let parse = |key: &'static str| lookup(key).map(|value| (key, value));
        Ok(Config {
            server: ServerConfig {
                host: lookup("SERVER_HOST").unwrap_or(defaults.server.host),
                port: parse_or(parse("SERVER_PORT"), defaults.server.port)?,
                max_upload_bytes: parse_or(parse("MAX_UPLOAD_BYTES"), defaults.server.max_upload_bytes)?,
            },
            ocr: OcrConfig {
                tesseract_path: lookup("TESSERACT_PATH").unwrap_or(defaults.ocr.tesseract_path),
                language: lookup("OCR_LANGUAGE").unwrap_or(defaults.ocr.language),
                dpi: parse_or(parse("OCR_DPI"), defaults.ocr.dpi)?,
                max_concurrency: parse_or(parse("OCR_MAX_CONCURRENCY"), defaults.ocr.max_concurrency)?,
                page_timeout_secs: parse_or(parse("OCR_PAGE_TIMEOUT_SECS"), defaults.ocr.page_timeout_secs)?,
                timeout_retries: parse_or(parse("OCR_TIMEOUT_RETRIES"), defaults.ocr.timeout_retries)?,
                use_text_layer: parse_or(parse("OCR_USE_TEXT_LAYER"), defaults.ocr.use_text_layer)?,
                raster_timeout_secs: parse_or(parse("RASTER_TIMEOUT_SECS"), defaults.ocr.raster_timeout_secs)?,
            },
        })
    }
}

impl OcrConfig {
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            dpi: self.dpi,
            max_concurrency: self.max_concurrency,
            page_timeout: Duration::from_secs(self.page_timeout_secs),
            timeout_retries: self.timeout_retries,
            language: Some(self.language.clone()),
            use_text_layer: self.use_text_layer,
        }
    }

    pub fn raster_options(&self) -> RasterOptions {
        RasterOptions {
            timeout: Duration::from_secs(self.raster_timeout_secs),
            capture_text_layer: self.use_text_layer,
        }
    }
}

fn parse_or<T: std::str::FromStr>(var: Option<(&'static str, String)>, default: T) -> Result<T, ConfigError> {
    match var {
        Some((key, value)) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_defaults_produce_valid_pipeline_config() {
        let config = Config::default();
        let pipeline = config.ocr.pipeline_config();
        assert!(pipeline.validate().is_ok());
        assert_eq!(pipeline.page_timeout, Duration::from_secs(60));
        assert_eq!(pipeline.language.as_deref(), Some("eng"));
        assert!(!config.ocr.raster_options().capture_text_layer);
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_set_variables_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "8080"),
            ("TESSERACT_PATH", "/opt/tesseract/bin/tesseract"),
            ("OCR_MAX_CONCURRENCY", "3"),
            ("OCR_USE_TEXT_LAYER", "true"),
        ]))
        .unwrap();

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.ocr.tesseract_path, "/opt/tesseract/bin/tesseract");
        assert_eq!(config.ocr.max_concurrency, 3);
        assert!(config.ocr.use_text_layer);
        assert_eq!(config.ocr.dpi, DEFAULT_DPI);
    }

    #[test]
    fn test_malformed_variable_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("SERVER_PORT", "8080"),
            ("OCR_DPI", "high"),
        ]))
        .unwrap_err();

        assert_eq!(err.key, "OCR_DPI");
        assert_eq!(err.value, "high");
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("SERVER_PORT", " 8080 ").unwrap(), 8080);
        assert!(parse_value::<bool>("OCR_USE_TEXT_LAYER", "true").unwrap());

        let err = parse_value::<u32>("OCR_DPI", "high").unwrap_err();
        assert_eq!(err.key, "OCR_DPI");
        assert_eq!(err.to_string(), "Invalid value for OCR_DPI: \"high\"");
    }
}
