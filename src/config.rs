// config.rs - Mount options handed over by the page
//
// Arrives as a JSON object (camelCase keys, every key optional):
//
//   { "width": 800, "height": 600, "background": "#f5f5f5",
//     "ink": "#000000", "seed": 7, "kind": "ink", "logLevel": "debug" }

use serde::Deserialize;

use crate::color::Color;
use crate::error::{Error, Result};

pub const DEFAULT_BACKGROUND: &str = "#f5f5f5";
pub const DEFAULT_INK: &str = "#000000";

/// Which background to run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    #[default]
    Ink,
    Particles,
    Vortex,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct Config {
    /// Surface width in CSS pixels. `None` or 0 follows the container.
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub background: String,
    pub ink: String,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
    pub kind: EffectKind,
    pub log_level: String,
    pub max_pixel_ratio: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            background: DEFAULT_BACKGROUND.to_string(),
            ink: DEFAULT_INK.to_string(),
            seed: None,
            kind: EffectKind::default(),
            log_level: "info".to_string(),
            max_pixel_ratio: 2.0,
        }
    }
}

/// Validated form of [`Config`].
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub background: Color,
    pub ink: Color,
    pub seed: Option<u64>,
    pub kind: EffectKind,
    pub max_pixel_ratio: f64,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_str(json)?)
    }

    pub fn validate(&self) -> Result<Settings> {
        Ok(Settings {
            width: dimension("width", self.width)?,
            height: dimension("height", self.height)?,
            background: self.background.parse()?,
            ink: self.ink.parse()?,
            seed: self.seed,
            kind: self.kind,
            max_pixel_ratio: if self.max_pixel_ratio.is_finite() && self.max_pixel_ratio >= 1.0 {
                self.max_pixel_ratio
            } else {
                1.0
            },
        })
    }
}

impl Default for Settings {
    fn default() -> Self {
        // Defaults always validate.
        Settings {
            width: None,
            height: None,
            background: Color::from_rgb(0xf5, 0xf5, 0xf5),
            ink: Color::BLACK,
            seed: None,
            kind: EffectKind::Ink,
            max_pixel_ratio: 2.0,
        }
    }
}

/// Zero means "not given"; negatives and NaN are refused.
fn dimension(field: &'static str, value: Option<f64>) -> Result<Option<u32>> {
    match value {
        None => Ok(None),
        Some(v) if !v.is_finite() || v < 0.0 => Err(Error::InvalidDimension { field, value: v }),
        Some(v) if v < 1.0 => Ok(None),
        Some(v) => Ok(Some(v.min(u32::MAX as f64) as u32)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_options_use_defaults() {
        let settings = Config::from_json("").unwrap().validate().unwrap();
        assert_eq!(settings, Settings::default());

        let settings = Config::from_json("{}").unwrap().validate().unwrap();
        assert_eq!(settings.background.to_rgb(), (0xf5, 0xf5, 0xf5));
        assert_eq!(settings.kind, EffectKind::Ink);
    }

    #[test]
    fn reads_camel_case_keys() {
        let json = r##"{"width": 800, "height": 600, "ink": "#ff0000",
                        "seed": 9, "kind": "vortex", "maxPixelRatio": 3}"##;
        let settings = Config::from_json(json).unwrap().validate().unwrap();
        assert_eq!(settings.width, Some(800));
        assert_eq!(settings.height, Some(600));
        assert_eq!(settings.ink.to_rgb(), (255, 0, 0));
        assert_eq!(settings.seed, Some(9));
        assert_eq!(settings.kind, EffectKind::Vortex);
        assert_eq!(settings.max_pixel_ratio, 3.0);
    }

    #[test]
    fn zero_dimensions_follow_the_container() {
        let config = Config { width: Some(0.0), height: Some(0.0), ..Config::default() };
        let settings = config.validate().unwrap();
        assert_eq!(settings.width, None);
        assert_eq!(settings.height, None);
    }

    #[test]
    fn negative_dimensions_are_rejected() {
        let config = Config { width: Some(-1.0), ..Config::default() };
        match config.validate() {
            Err(Error::InvalidDimension { field, .. }) => assert_eq!(field, "width"),
            other => panic!("expected InvalidDimension, got {other:?}"),
        }

        let config = Config { height: Some(f64::NAN), ..Config::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn bad_color_and_unknown_keys_fail() {
        let config = Config { background: "blue".into(), ..Config::default() };
        assert!(matches!(config.validate(), Err(Error::InvalidColor(_))));

        assert!(matches!(Config::from_json(r##"{"colour": "#fff"}"##), Err(Error::Config(_))));
    }
}
