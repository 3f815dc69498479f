mod classify;
mod data;
mod errors;
mod etl;
mod label;
mod overlay;
mod projection;
mod render;

use std::env;
use std::fs::{create_dir_all, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;
use structured_logger::json::new_writer;
use structured_logger::Builder;

use crate::errors::Result;
use crate::etl::draw_map::{theme::ThemeConfig, DrawMapEtl};
use crate::etl::parse_osm::ParseOsmEtl;
use crate::etl::semantic_map::SemanticMapEtl;
use crate::etl::Etl;
use crate::overlay::OverlayConfig;
use crate::projection::BoundingBox;

const DEFAULT_CONFIG_PATH: &str = "config.json";

fn default_output_dir() -> String {
    "output".to_string()
}

fn default_label_size() -> f64 {
    5.0
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Deserialize)]
pub struct UserConfig {
    pub data_path: String,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    pub bbox: BoundingBox,
    pub width_px: u32,
    pub height_px: u32,
    #[serde(default = "default_label_size")]
    pub label_size: f64,
    pub font_path: Option<String>,
    #[serde(default)]
    pub overlays: Vec<OverlayConfig>,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl UserConfig {
    fn validate(&self) -> Result<()> {
        self.bbox.validate()?;
        if self.width_px == 0 || self.height_px == 0 {
            return Err(format!("Output frame {}x{} must not be empty", self.width_px, self.height_px).into());
        }
        if !(self.label_size.is_finite() && self.label_size > 0.0) {
            return Err(format!("Label size {} must be positive", self.label_size).into());
        }
        Ok(())
    }
}

fn load_user_config(path: &str) -> Result<UserConfig> {
    let file = File::open(path)
        .map_err(|err| format!("Could not open config file {}: {}", path, err))?;
    let config: UserConfig = serde_json::from_reader(BufReader::new(file))
        .map_err(|err| format!("Could not parse config {}: {}", path, err))?;
    config.validate()?;
    Ok(config)
}

fn create_output_dir(config: &UserConfig) -> Result<PathBuf> {
    let input_fname = Path::new(&config.data_path)
        .file_name()
        .ok_or("Could not get input file name")?;
    let output_dir = Path::new(&config.output_dir).join(input_fname);
    create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn setup_logging(level: &str) {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stdout()))
        .init();
}

fn main() -> Result<()> {
    let config_path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let user_config = load_user_config(&config_path)?;
    setup_logging(&user_config.log_level);

    let output_dir = create_output_dir(&user_config)?;
    let output_display = output_dir.display().to_string();
    info!(config = config_path.as_str(), output_dir = output_display.as_str(); "Starting run");

    ParseOsmEtl::new(Path::new(&user_config.data_path)).process(&output_dir)?;
    SemanticMapEtl::new(&user_config.overlays).process(&output_dir)?;
    DrawMapEtl::new(
        user_config.bbox,
        (user_config.width_px, user_config.height_px),
        user_config.label_size,
        user_config.font_path.as_deref().map(Path::new),
        &user_config.theme,
    ).process(&output_dir)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config: UserConfig = serde_json::from_str(r#"{
            "data_path": "data/berlin.osm.xz",
            "bbox": [13.3, 52.5, 13.4, 52.55],
            "width_px": 720,
            "height_px": 360
        }"#).unwrap();

        assert_eq!(config.output_dir, "output");
        assert_eq!(config.label_size, 5.0);
        assert_eq!(config.log_level, "info");
        assert!(config.overlays.is_empty());
        assert_eq!(config.bbox.west, 13.3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_transposed_bbox_and_empty_frame() {
        let mut config: UserConfig = serde_json::from_str(r#"{
            "data_path": "data/berlin.osm",
            "bbox": [52.5, 13.3, 52.4, 13.4],
            "width_px": 720,
            "height_px": 360
        }"#).unwrap();
        assert!(config.validate().is_err());

        config.bbox = BoundingBox::from([13.3, 52.5, 13.4, 52.55]);
        config.height_px = 0;
        assert!(config.validate().is_err());
    }
}
