use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StampConfig {
    pub extraction: ExtractionConfig,
    pub layout: LayoutConfig,
}

/// Tuning knobs for the SKU/quantity extraction heuristics. Distances are
/// in PDF points, relative to the candidate span's bounding box.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Max horizontal distance to search for a base quantity
    pub quantity_search_range_x: f32,

    /// Max vertical deviation for same line or the line below
    pub quantity_search_range_y: f32,

    /// Extended horizontal range for the external `xN` multiplier search
    pub x_multiplier_search_range_x: f32,

    /// Tight vertical range for the external `xN` search (same line only)
    pub x_multiplier_same_line_y_range: f32,

    /// Max words combined into one multi-word SKU span
    pub max_words_to_look_ahead: usize,

    /// Extra horizontal slack before a rightward scan gives up early
    pub search_overshoot_x: f32,

    /// Base quantities at or above this are rejected as page noise
    pub max_quantity: u32,

    /// Alias table applied after normalization, first match wins
    pub sku_aliases: Vec<(String, String)>,
}

/// Geometry of the stamp boxes and summary pages, in PDF points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub font_size: f32,
    pub min_font_size: f32,
    pub left_margin: f32,
    pub bottom_margin: f32,
    pub top_margin: f32,
    pub stamp_padding_x: f32,
    pub stamp_padding_y: f32,
    pub summary_padding_x: f32,
    pub summary_padding_y: f32,
    pub column_gap: f32,
    pub bullet_radius: f32,
    /// Width reserved for a bullet glyph in every fit computation
    pub bullet_space: f32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            quantity_search_range_x: 100.0,
            quantity_search_range_y: 40.0,
            x_multiplier_search_range_x: 150.0,
            x_multiplier_same_line_y_range: 10.0,
            max_words_to_look_ahead: 5,
            search_overshoot_x: 50.0,
            max_quantity: 1000,
            sku_aliases: vec![
                ("WASH-L".to_string(), "BWL".to_string()),
                ("WASH-M".to_string(), "BWM".to_string()),
                ("BABY WASH - MILK".to_string(), "BWM".to_string()),
                ("BABY WASH LAVENDER".to_string(), "BWL".to_string()),
                ("CBV".to_string(), "CBV".to_string()),
            ],
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            min_font_size: 8.0,
            left_margin: 20.0,
            bottom_margin: 20.0,
            top_margin: 20.0,
            stamp_padding_x: 10.0,
            stamp_padding_y: 5.0,
            summary_padding_x: 10.0,
            summary_padding_y: 10.0,
            column_gap: 20.0,
            bullet_radius: 3.0,
            bullet_space: 15.0,
        }
    }
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            extraction: ExtractionConfig::default(),
            layout: LayoutConfig::default(),
        }
    }
}

impl StampConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| anyhow!("Failed to read config file: {}", e))?;

        let config: StampConfig = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file: {}", e))?;

        Ok(config)
    }

    pub fn load_from_env() -> Self {
        let mut config = Self::default();

        // Override with environment variables
        if let Ok(range) = std::env::var("WAYBILL_QUANTITY_RANGE_X") {
            if let Ok(value) = range.parse::<f32>() {
                config.extraction.quantity_search_range_x = value;
            }
        }

        if let Ok(lookahead) = std::env::var("WAYBILL_MAX_LOOKAHEAD") {
            if let Ok(value) = lookahead.parse::<usize>() {
                config.extraction.max_words_to_look_ahead = value;
            }
        }

        if let Ok(size) = std::env::var("WAYBILL_FONT_SIZE") {
            if let Ok(value) = size.parse::<f32>() {
                config.layout.font_size = value;
            }
        }

        config
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        std::fs::write(path.as_ref(), content)
            .map_err(|e| anyhow!("Failed to write config file: {}", e))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = StampConfig::default();
        assert_eq!(config.extraction.quantity_search_range_x, 100.0);
        assert_eq!(config.extraction.max_words_to_look_ahead, 5);
        assert_eq!(config.layout.font_size, 12.0);
        assert_eq!(config.extraction.sku_aliases.len(), 5);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = StampConfig::default();
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("waybill.toml");

        config.save_to_file(&config_path).unwrap();

        let loaded = StampConfig::load_from_file(&config_path).unwrap();
        assert_eq!(loaded.extraction.quantity_search_range_y, 40.0);
        assert_eq!(loaded.layout.min_font_size, 8.0);
    }
}
