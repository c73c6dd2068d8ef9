use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::scroll::EasingTypeExt;
use crate::sections::SectionId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub header: HeaderConfig,
    #[serde(default)]
    pub proxy: ProxyConfig,
    #[serde(default)]
    pub ui: UiConfig,
    /// Reveal sequences, one entry per gated section
    #[serde(default = "default_gates")]
    pub gates: Vec<GateConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            scroll: ScrollConfig::default(),
            header: HeaderConfig::default(),
            proxy: ProxyConfig::default(),
            ui: UiConfig::default(),
            gates: default_gates(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Data directory path (log file lives here)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Easing curve applied to normalized time
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EasingType {
    /// Jump to the end at t=1
    None,
    Linear,
    /// 1 - (1-t)³
    Cubic,
    /// 1 - (1-t)⁵
    Quintic,
    /// 1 - 2^(-10t)
    EaseOut,
    /// min(1, 1.001 - 2^(-10t)), the smooth-scroll default
    #[default]
    Lenis,
    /// CSS cubic-bezier(x1, y1, x2, y2)
    CubicBezier([f64; 4]),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Enable interpolation; when false every target change lands immediately
    #[serde(default = "default_true")]
    pub smooth_enabled: bool,
    /// Smoothing duration in seconds
    #[serde(default = "default_scroll_duration")]
    pub duration_secs: f64,
    /// Easing curve for the virtual scroll
    #[serde(default)]
    pub easing: EasingType,
    /// Multiplier applied to wheel deltas
    #[serde(default = "default_one")]
    pub wheel_multiplier: f64,
    /// Multiplier applied to touch deltas
    #[serde(default = "default_touch_multiplier")]
    pub touch_multiplier: f64,
    /// Multiplier applied to keyboard deltas
    #[serde(default = "default_one")]
    pub key_multiplier: f64,
    /// Disable clamping and wrap the reported offset around the scroll limit
    #[serde(default)]
    pub infinite: bool,
    /// Virtual pixels per line step (keyboard, terminal rows)
    #[serde(default = "default_line_height")]
    pub line_height_px: f64,
    /// Fraction of the viewport moved by a page step
    #[serde(default = "default_page_fraction")]
    pub page_fraction: f64,
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            smooth_enabled: default_true(),
            duration_secs: default_scroll_duration(),
            easing: EasingType::default(),
            wheel_multiplier: default_one(),
            touch_multiplier: default_touch_multiplier(),
            key_multiplier: default_one(),
            infinite: false,
            line_height_px: default_line_height(),
            page_fraction: default_page_fraction(),
        }
    }
}

/// Activation band for the header's active section
///
/// The band spans `band_top_px` below the viewport origin down to
/// `band_fraction` of the viewport height.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    #[serde(default = "default_band_top")]
    pub band_top_px: f64,
    #[serde(default = "default_band_fraction")]
    pub band_fraction: f64,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            band_top_px: default_band_top(),
            band_fraction: default_band_fraction(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Delay before the one-shot trigger recalculation after setup
    #[serde(default = "default_refresh_delay")]
    pub refresh_delay_ms: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            refresh_delay_ms: default_refresh_delay(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Frame interval in milliseconds
    #[serde(default = "default_tick_rate")]
    pub tick_rate_ms: u64,
    /// Virtual pixels per terminal row
    #[serde(default = "default_row_height")]
    pub row_height_px: f64,
    /// Height of each section in viewports, in document order
    #[serde(default = "default_section_viewports")]
    pub section_viewports: Vec<f64>,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: default_tick_rate(),
            row_height_px: default_row_height(),
            section_viewports: default_section_viewports(),
        }
    }
}

/// How a stage reports that it has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageCompletion {
    /// Completes after delay + duration on the frame clock
    #[default]
    Timeout,
    /// Completes when the host reports the animation finished
    Notified,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    pub name: String,
    pub duration_ms: u64,
    #[serde(default)]
    pub delay_ms: u64,
    #[serde(default = "default_stage_easing")]
    pub easing: EasingType,
    #[serde(default)]
    pub completion: StageCompletion,
}

impl StageConfig {
    pub fn new(name: &str, duration_ms: u64, delay_ms: u64, easing: EasingType) -> Self {
        Self {
            name: name.to_string(),
            duration_ms,
            delay_ms,
            easing,
            completion: StageCompletion::Timeout,
        }
    }

    pub fn notified(mut self) -> Self {
        self.completion = StageCompletion::Notified;
        self
    }
}

/// Reveal sequence for one section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateConfig {
    pub section: SectionId,
    /// Visible fraction of the section required to count as in view
    #[serde(default)]
    pub threshold: f64,
    /// Inset applied to the viewport top and bottom before intersecting
    #[serde(default)]
    pub margin_px: f64,
    pub stages: Vec<StageConfig>,
}

// CSS curves used by the reveal choreography
const EXPO_OUT: EasingType = EasingType::CubicBezier([0.19, 1.0, 0.22, 1.0]);
const SOFT_OUT: EasingType = EasingType::CubicBezier([0.16, 1.0, 0.3, 1.0]);
const CSS_EASE_OUT: EasingType = EasingType::CubicBezier([0.0, 0.0, 0.58, 1.0]);
const BACK_OUT: EasingType = EasingType::CubicBezier([0.68, -0.55, 0.265, 1.55]);

fn default_gates() -> Vec<GateConfig> {
    vec![
        GateConfig {
            section: SectionId::Main,
            threshold: 0.0,
            margin_px: 100.0,
            stages: vec![
                StageConfig::new("intro", 1400, 300, EXPO_OUT),
                StageConfig::new("lead", 1400, 300, EXPO_OUT),
                StageConfig::new("image", 1800, 500, SOFT_OUT),
            ],
        },
        GateConfig {
            section: SectionId::Spark,
            threshold: 0.3,
            margin_px: 0.0,
            stages: vec![
                StageConfig::new("bottom", 600, 0, CSS_EASE_OUT),
                // three lines staggered 150ms apart
                StageConfig::new("text", 800, 0, CSS_EASE_OUT),
                StageConfig::new("fire", 400, 0, BACK_OUT),
            ],
        },
        GateConfig {
            section: SectionId::Building,
            threshold: 0.0,
            margin_px: 100.0,
            stages: vec![
                StageConfig::new("mark", 1400, 200, EXPO_OUT),
                StageConfig::new("first-line", 1400, 200, EXPO_OUT),
                StageConfig::new("second-line", 1400, 200, EXPO_OUT),
                StageConfig::new("third-line", 1400, 200, EXPO_OUT),
            ],
        },
        GateConfig {
            section: SectionId::Footer,
            threshold: 0.0,
            margin_px: 50.0,
            stages: vec![
                StageConfig::new("hugs", 1400, 200, EXPO_OUT),
                StageConfig::new("button", 1400, 200, EXPO_OUT),
                StageConfig::new("copy", 1400, 100, EXPO_OUT),
                StageConfig::new("socials", 1400, 100, EXPO_OUT),
            ],
        },
    ]
}

fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("glidepage")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

fn default_scroll_duration() -> f64 {
    1.3
}

fn default_touch_multiplier() -> f64 {
    2.0
}

fn default_line_height() -> f64 {
    40.0
}

fn default_page_fraction() -> f64 {
    0.9
}

fn default_band_top() -> f64 {
    1.0
}

fn default_band_fraction() -> f64 {
    0.01
}

fn default_refresh_delay() -> u64 {
    100
}

fn default_tick_rate() -> u64 {
    16 // ~60fps
}

fn default_row_height() -> f64 {
    20.0
}

fn default_section_viewports() -> Vec<f64> {
    vec![1.0, 2.0, 1.2, 1.0, 1.0]
}

fn default_stage_easing() -> EasingType {
    EXPO_OUT
}

/// Expand tilde (~) in path to user's home directory
fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(path_str) = path.to_str() {
        if let Some(stripped) = path_str.strip_prefix("~/") {
            if let Some(home) = dirs::home_dir() {
                return home.join(stripped);
            }
        } else if path_str == "~" {
            if let Some(home) = dirs::home_dir() {
                return home;
            }
        }
    }
    path.to_path_buf()
}

/// Cubic-bezier time control points must stay in [0, 1]; other curves pass
fn bezier_x_in_range(easing: &EasingType) -> bool {
    match easing {
        EasingType::CubicBezier(points) => {
            points.iter().all(|p| p.is_finite())
                && (0.0..=1.0).contains(&points[0])
                && (0.0..=1.0).contains(&points[2])
        }
        _ => true,
    }
}

fn finite_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

impl AppConfig {
    /// Load configuration from the default path or return defaults
    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from an explicit path, defaults when it does not exist
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        let config: Self = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| crate::Error::Config(e.to_string()))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> crate::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(&config_path, self.to_toml()?)?;

        Ok(())
    }

    pub fn to_toml(&self) -> crate::Result<String> {
        toml::to_string_pretty(self).map_err(|e| crate::Error::Config(e.to_string()))
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("glidepage")
            .join("config.toml")
    }

    /// Get the data directory (with tilde expansion)
    pub fn data_dir(&self) -> PathBuf {
        expand_tilde(&self.general.data_dir)
    }

    /// Get the log file path used while the TUI owns the terminal
    pub fn log_path(&self) -> PathBuf {
        self.data_dir().join("glidepage.log")
    }

    /// Gate configuration for a section, if it has one
    pub fn gate_for(&self, section: SectionId) -> Option<&GateConfig> {
        self.gates.iter().find(|g| g.section == section)
    }

    /// Reject values the runtime would otherwise have to clamp silently
    pub fn validate(&self) -> crate::Result<()> {
        let scroll = &self.scroll;
        if !scroll.duration_secs.is_finite() || scroll.duration_secs < 0.0 {
            return Err(crate::Error::Config(format!(
                "scroll.duration_secs must be a non-negative number, got {}",
                scroll.duration_secs
            )));
        }
        for (name, value) in [
            ("wheel_multiplier", scroll.wheel_multiplier),
            ("touch_multiplier", scroll.touch_multiplier),
            ("key_multiplier", scroll.key_multiplier),
            ("line_height_px", scroll.line_height_px),
            ("page_fraction", scroll.page_fraction),
        ] {
            if !finite_positive(value) {
                return Err(crate::Error::Config(format!(
                    "scroll.{} must be greater than zero, got {}",
                    name, value
                )));
            }
        }

        if !scroll.easing.is_monotonic() || !bezier_x_in_range(&scroll.easing) {
            return Err(crate::Error::Config(format!(
                "scroll.easing must stay within [0, 1] and never decrease, got {:?}",
                scroll.easing
            )));
        }

        let header = &self.header;
        if !header.band_top_px.is_finite() || header.band_top_px < 0.0 {
            return Err(crate::Error::Config(format!(
                "header.band_top_px must be non-negative, got {}",
                header.band_top_px
            )));
        }
        if !(0.0..=1.0).contains(&header.band_fraction) {
            return Err(crate::Error::Config(format!(
                "header.band_fraction must be within [0, 1], got {}",
                header.band_fraction
            )));
        }

        if !finite_positive(self.ui.row_height_px) {
            return Err(crate::Error::Config(format!(
                "ui.row_height_px must be greater than zero, got {}",
                self.ui.row_height_px
            )));
        }
        if let Some(bad) = self.ui.section_viewports.iter().find(|v| !finite_positive(**v)) {
            return Err(crate::Error::Config(format!(
                "ui.section_viewports entries must be greater than zero, got {}",
                bad
            )));
        }

        let mut seen = HashSet::new();
        for gate in &self.gates {
            let section = gate.section.as_str().to_string();
            if !seen.insert(gate.section) {
                return Err(crate::Error::Config(format!(
                    "duplicate gate for section {}",
                    section
                )));
            }
            if !(0.0..=1.0).contains(&gate.threshold) {
                return Err(crate::Error::InvalidStage {
                    section,
                    reason: format!("threshold {} outside [0, 1]", gate.threshold),
                });
            }
            if !gate.margin_px.is_finite() {
                return Err(crate::Error::InvalidStage {
                    section,
                    reason: "margin_px must be finite".to_string(),
                });
            }
            if gate.stages.is_empty() {
                return Err(crate::Error::InvalidStage {
                    section,
                    reason: "at least one stage is required".to_string(),
                });
            }
            for stage in &gate.stages {
                if !bezier_x_in_range(&stage.easing) {
                    return Err(crate::Error::InvalidStage {
                        section,
                        reason: format!(
                            "stage {} has a cubic-bezier with x outside [0, 1]",
                            stage.name
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_scroll_config() {
        let config = ScrollConfig::default();
        assert!(config.smooth_enabled);
        assert!((config.duration_secs - 1.3).abs() < f64::EPSILON);
        assert_eq!(config.easing, EasingType::Lenis);
        assert!((config.touch_multiplier - 2.0).abs() < f64::EPSILON);
        assert!(!config.infinite);
    }

    #[test]
    fn test_empty_file_gets_default_gates() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.gates.len(), 4);
        let spark = config.gate_for(SectionId::Spark).unwrap();
        assert!((spark.threshold - 0.3).abs() < f64::EPSILON);
        assert_eq!(spark.stages.len(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_config() {
        let content = r#"
[scroll]
duration_secs = 0.8
touch_multiplier = 1.5
easing = "ease_out"

[[gates]]
section = "spark"
threshold = 0.5

[[gates.stages]]
name = "fade"
duration_ms = 250
easing = { cubic_bezier = [0.25, 0.1, 0.25, 1.0] }
completion = "notified"
"#;
        let config: AppConfig = toml::from_str(content).unwrap();
        assert!((config.scroll.duration_secs - 0.8).abs() < f64::EPSILON);
        assert_eq!(config.scroll.easing, EasingType::EaseOut);
        assert!((config.scroll.wheel_multiplier - 1.0).abs() < f64::EPSILON);
        assert_eq!(config.gates.len(), 1);

        let stage = &config.gates[0].stages[0];
        assert_eq!(stage.delay_ms, 0);
        assert_eq!(stage.completion, StageCompletion::Notified);
        assert_eq!(stage.easing, EasingType::CubicBezier([0.25, 0.1, 0.25, 1.0]));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.scroll.touch_multiplier = 0.0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.scroll.duration_secs = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.gates[0].threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        let dup = config.gates[0].clone();
        config.gates.push(dup);
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.gates[1].stages.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overshooting_scroll_easing() {
        let mut config = AppConfig::default();
        config.scroll.easing = BACK_OUT;
        assert!(config.validate().is_err());

        config.scroll.easing = EasingType::CubicBezier([1.4, 0.0, 0.58, 1.0]);
        assert!(config.validate().is_err());

        config.scroll.easing = CSS_EASE_OUT;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_section_is_rejected_by_parser() {
        let content = r#"
[[gates]]
section = "pricing"
stages = [{ name = "a", duration_ms = 10 }]
"#;
        assert!(toml::from_str::<AppConfig>(content).is_err());
    }

    #[test]
    fn test_toml_roundtrip_keeps_gates() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: AppConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed.gates, config.gates);
    }
}
