//! Configuration Model - Validated Presentation Contract
//!
//! Every setter validates eagerly. Render-time code can assume that sizes are
//! positive and that font and logo paths name existing files.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{QrError, Result};

pub const DEFAULT_SIZE: u32 = 300;
pub const DEFAULT_LABEL_FONT_SIZE: u32 = 16;
pub const DEFAULT_ENCODING: &str = "UTF-8";

/// Label font shipped with the crate, used until a label font path is set.
pub fn bundled_label_font_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/fonts/DejaVuSans.ttf")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum ErrorCorrectionLevel {
    #[default]
    Low,
    Medium,
    Quartile,
    High,
}

impl ErrorCorrectionLevel {
    /// Approximate share of codewords the level can recover, in percent.
    pub const fn recovery_percent(self) -> u32 {
        match self {
            Self::Low => 7,
            Self::Medium => 15,
            Self::Quartile => 25,
            Self::High => 30,
        }
    }

    pub fn recovery_fraction(self) -> f64 {
        f64::from(self.recovery_percent()) / 100.0
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::Quartile => "quartile",
            Self::High => "high",
        }
    }
}

impl FromStr for ErrorCorrectionLevel {
    type Err = QrError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "l" | "low" => Ok(Self::Low),
            "m" | "medium" => Ok(Self::Medium),
            "q" | "quartile" => Ok(Self::Quartile),
            "h" | "high" => Ok(Self::High),
            _ => Err(QrError::InvalidArgument(format!(
                "unknown error correction level \"{}\"",
                value
            ))),
        }
    }
}

impl TryFrom<String> for ErrorCorrectionLevel {
    type Error = QrError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl fmt::Display for ErrorCorrectionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum LabelAlignment {
    Left,
    #[default]
    Center,
    Right,
}

impl FromStr for LabelAlignment {
    type Err = QrError;

    fn from_str(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "center" => Ok(Self::Center),
            "right" => Ok(Self::Right),
            _ => Err(QrError::InvalidArgument(format!(
                "unknown label alignment \"{}\"",
                value
            ))),
        }
    }
}

impl TryFrom<String> for LabelAlignment {
    type Error = QrError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Lowercase `#rrggbb`.
    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub const fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl FromStr for Color {
    type Err = QrError;

    fn from_str(value: &str) -> Result<Self> {
        let hex = value.strip_prefix('#').unwrap_or(value);
        let invalid = || QrError::InvalidArgument(format!("invalid color \"{}\"", value));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margin {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Margin {
    pub fn merge(&mut self, patch: &MarginPatch) {
        self.top = patch.top.unwrap_or(self.top);
        self.right = patch.right.unwrap_or(self.right);
        self.bottom = patch.bottom.unwrap_or(self.bottom);
        self.left = patch.left.unwrap_or(self.left);
    }
}

/// Partial margin; `None` sides keep their previous value on merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarginPatch {
    #[serde(default, alias = "t")]
    pub top: Option<u32>,
    #[serde(default, alias = "r")]
    pub right: Option<u32>,
    #[serde(default, alias = "b")]
    pub bottom: Option<u32>,
    #[serde(default, alias = "l")]
    pub left: Option<u32>,
}

/// Optional settings cascaded by [`Configuration::set_label`].
#[derive(Debug, Clone, Default)]
pub struct LabelOptions {
    pub font_size: Option<u32>,
    pub font_path: Option<PathBuf>,
    pub alignment: Option<LabelAlignment>,
    pub margin: Option<MarginPatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    text: String,
    size: u32,
    quiet_zone: u32,
    foreground_color: Color,
    background_color: Color,
    encoding: String,
    error_correction_level: ErrorCorrectionLevel,
    label: Option<String>,
    label_font_size: u32,
    label_font_path: PathBuf,
    label_alignment: LabelAlignment,
    label_margin: Margin,
    logo_path: Option<PathBuf>,
    logo_size: Option<u32>,
    validate_result: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new("")
    }
}

impl Configuration {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            size: DEFAULT_SIZE,
            quiet_zone: 0,
            foreground_color: Color::BLACK,
            background_color: Color::WHITE,
            encoding: DEFAULT_ENCODING.to_string(),
            error_correction_level: ErrorCorrectionLevel::default(),
            label: None,
            label_font_size: DEFAULT_LABEL_FONT_SIZE,
            label_font_path: bundled_label_font_path(),
            label_alignment: LabelAlignment::default(),
            label_margin: Margin::default(),
            logo_path: None,
            logo_size: None,
            validate_result: false,
        }
    }

    /// Load a JSON [`ConfigurationSpec`] and apply it through the setters.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let spec: ConfigurationSpec = serde_json::from_str(&content)?;
        Self::from_spec(&spec)
    }

    pub fn from_spec(spec: &ConfigurationSpec) -> Result<Self> {
        let mut config = Self::default();
        config.apply(spec)?;
        Ok(config)
    }

    /// Apply every field present in `spec`; absent fields keep current values.
    pub fn apply(&mut self, spec: &ConfigurationSpec) -> Result<&mut Self> {
        if let Some(text) = &spec.text {
            self.set_text(text.clone());
        }
        if let Some(size) = spec.size {
            self.set_size(size)?;
        }
        if let Some(quiet_zone) = spec.quiet_zone {
            self.set_quiet_zone(quiet_zone);
        }
        if let Some(color) = spec.foreground_color {
            self.set_foreground_color(color);
        }
        if let Some(color) = spec.background_color {
            self.set_background_color(color);
        }
        if let Some(encoding) = &spec.encoding {
            self.set_encoding(encoding.clone());
        }
        if let Some(level) = spec.error_correction_level {
            self.set_error_correction_level(level);
        }
        if let Some(label) = &spec.label {
            let options = LabelOptions {
                font_size: spec.label_font_size,
                font_path: spec.label_font_path.clone(),
                alignment: spec.label_alignment,
                margin: spec.label_margin,
            };
            self.set_label(label.clone(), options)?;
        } else {
            if let Some(size) = spec.label_font_size {
                self.set_label_font_size(size)?;
            }
            if let Some(path) = &spec.label_font_path {
                self.set_label_font_path(path)?;
            }
            if let Some(alignment) = spec.label_alignment {
                self.set_label_alignment(alignment);
            }
            if let Some(margin) = &spec.label_margin {
                self.set_label_margin(margin);
            }
        }
        if let Some(path) = &spec.logo_path {
            self.set_logo_path(path)?;
        }
        if let Some(size) = spec.logo_size {
            self.set_logo_size(size)?;
        }
        if let Some(validate) = spec.validate_result {
            self.set_validate_result(validate);
        }
        Ok(self)
    }

    pub fn set_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.text = text.into();
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Side of the square symbol block in pixels, quiet zone included.
    pub fn set_size(&mut self, size: u32) -> Result<&mut Self> {
        if size == 0 {
            return Err(QrError::invalid_argument("size must be positive"));
        }
        self.size = size;
        Ok(self)
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn set_quiet_zone(&mut self, quiet_zone: u32) -> &mut Self {
        self.quiet_zone = quiet_zone;
        self
    }

    pub fn quiet_zone(&self) -> u32 {
        self.quiet_zone
    }

    pub fn set_foreground_color(&mut self, color: Color) -> &mut Self {
        self.foreground_color = color;
        self
    }

    pub fn foreground_color(&self) -> Color {
        self.foreground_color
    }

    pub fn set_background_color(&mut self, color: Color) -> &mut Self {
        self.background_color = color;
        self
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn set_encoding(&mut self, encoding: impl Into<String>) -> &mut Self {
        self.encoding = encoding.into();
        self
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn set_error_correction_level(&mut self, level: ErrorCorrectionLevel) -> &mut Self {
        self.error_correction_level = level;
        self
    }

    pub fn error_correction_level(&self) -> ErrorCorrectionLevel {
        self.error_correction_level
    }

    /// Set the label text and cascade any provided options into their setters.
    /// Options are validated before any of them is applied.
    pub fn set_label(&mut self, label: impl Into<String>, options: LabelOptions) -> Result<&mut Self> {
        let font_size = options.font_size.map(check_label_font_size).transpose()?;
        let font_path = options
            .font_path
            .as_deref()
            .map(|path| resolve_file(path, "label font"))
            .transpose()?;

        if let Some(size) = font_size {
            self.label_font_size = size;
        }
        if let Some(path) = font_path {
            self.label_font_path = path;
        }
        if let Some(alignment) = options.alignment {
            self.set_label_alignment(alignment);
        }
        if let Some(margin) = &options.margin {
            self.set_label_margin(margin);
        }
        self.label = Some(label.into());
        Ok(self)
    }

    pub fn clear_label(&mut self) -> &mut Self {
        self.label = None;
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn set_label_font_size(&mut self, size: u32) -> Result<&mut Self> {
        self.label_font_size = check_label_font_size(size)?;
        Ok(self)
    }

    pub fn label_font_size(&self) -> u32 {
        self.label_font_size
    }

    pub fn set_label_font_path(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        self.label_font_path = resolve_file(path.as_ref(), "label font")?;
        Ok(self)
    }

    /// The configured label font, or the bundled one.
    pub fn label_font_path(&self) -> &Path {
        &self.label_font_path
    }

    pub fn set_label_alignment(&mut self, alignment: LabelAlignment) -> &mut Self {
        self.label_alignment = alignment;
        self
    }

    pub fn label_alignment(&self) -> LabelAlignment {
        self.label_alignment
    }

    pub fn set_label_margin(&mut self, patch: &MarginPatch) -> &mut Self {
        self.label_margin.merge(patch);
        self
    }

    pub fn label_margin(&self) -> Margin {
        self.label_margin
    }

    pub fn set_logo_path(&mut self, path: impl AsRef<Path>) -> Result<&mut Self> {
        self.logo_path = Some(resolve_file(path.as_ref(), "logo")?);
        Ok(self)
    }

    pub fn logo_path(&self) -> Option<&Path> {
        self.logo_path.as_deref()
    }

    /// Requested logo side in pixels, subject to the scannability clamp.
    pub fn set_logo_size(&mut self, size: u32) -> Result<&mut Self> {
        if size == 0 {
            return Err(QrError::invalid_argument("logo size must be positive"));
        }
        self.logo_size = Some(size);
        Ok(self)
    }

    pub fn logo_size(&self) -> Option<u32> {
        self.logo_size
    }

    pub fn clear_logo(&mut self) -> &mut Self {
        self.logo_path = None;
        self.logo_size = None;
        self
    }

    pub fn set_validate_result(&mut self, validate: bool) -> &mut Self {
        self.validate_result = validate;
        self
    }

    pub fn validate_result(&self) -> bool {
        self.validate_result
    }
}

fn check_label_font_size(size: u32) -> Result<u32> {
    if size == 0 {
        return Err(QrError::invalid_argument("label font size must be positive"));
    }
    Ok(size)
}

fn resolve_file(path: &Path, what: &str) -> Result<PathBuf> {
    fs::canonicalize(path)
        .ok()
        .filter(|resolved| resolved.is_file())
        .ok_or_else(|| QrError::InvalidPath(format!("Invalid {} path: {}", what, path.display())))
}

/// Persisted configuration shape. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_zone: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Color>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_correction_level: Option<ErrorCorrectionLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_font_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_font_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_alignment: Option<LabelAlignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_margin: Option<MarginPatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validate_result: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::new("hello");
        assert_eq!(config.text(), "hello");
        assert_eq!(config.size(), DEFAULT_SIZE);
        assert_eq!(config.quiet_zone(), 0);
        assert_eq!(config.foreground_color(), Color::BLACK);
        assert_eq!(config.background_color(), Color::WHITE);
        assert_eq!(config.encoding(), "UTF-8");
        assert_eq!(config.error_correction_level(), ErrorCorrectionLevel::Low);
        assert_eq!(config.label_alignment(), LabelAlignment::Center);
        assert_eq!(config.label_font_size(), 16);
        assert_eq!(config.label_margin(), Margin::default());
        assert_eq!(config.label_font_path(), bundled_label_font_path());
        assert!(config.label_font_path().is_file());
        assert!(!config.validate_result());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("H".parse::<ErrorCorrectionLevel>().unwrap(), ErrorCorrectionLevel::High);
        assert_eq!("quartile".parse::<ErrorCorrectionLevel>().unwrap(), ErrorCorrectionLevel::Quartile);
        assert!(matches!("ultra".parse::<ErrorCorrectionLevel>(), Err(QrError::InvalidArgument(_))));
        assert_eq!("RIGHT".parse::<LabelAlignment>().unwrap(), LabelAlignment::Right);
        assert!(matches!("justify".parse::<LabelAlignment>(), Err(QrError::InvalidArgument(_))));
    }

    #[test]
    fn test_recovery_is_monotonic() {
        use ErrorCorrectionLevel::*;
        let percents: Vec<_> = [Low, Medium, Quartile, High]
            .iter()
            .map(|l| l.recovery_percent())
            .collect();
        assert!(percents.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_color_hex() {
        let color: Color = "#FF8000".parse().unwrap();
        assert_eq!(color, Color::rgb(255, 128, 0));
        assert_eq!(color.to_hex(), "#ff8000");
        assert!("#12345".parse::<Color>().is_err());
        assert!("zzzzzz".parse::<Color>().is_err());
    }

    #[test]
    fn test_margin_partial_merge() {
        let mut config = Configuration::default();
        config.set_label_margin(&MarginPatch { top: Some(4), left: Some(2), ..Default::default() });
        config.set_label_margin(&MarginPatch { top: Some(9), ..Default::default() });
        assert_eq!(
            config.label_margin(),
            Margin { top: 9, right: 0, bottom: 0, left: 2 }
        );
    }

    #[test]
    fn test_zero_sizes_rejected() {
        let mut config = Configuration::default();
        assert!(matches!(config.set_size(0), Err(QrError::InvalidArgument(_))));
        assert!(matches!(config.set_label_font_size(0), Err(QrError::InvalidArgument(_))));
        assert!(matches!(config.set_logo_size(0), Err(QrError::InvalidArgument(_))));
        assert_eq!(config.size(), DEFAULT_SIZE);
    }

    #[test]
    fn test_invalid_paths_rejected_eagerly() {
        let mut config = Configuration::default();
        let err = config.set_logo_path("/nonexistent/file.png").unwrap_err();
        assert!(matches!(err, QrError::InvalidPath(_)));
        let dir = std::env::temp_dir();
        assert!(matches!(config.set_label_font_path(&dir), Err(QrError::InvalidPath(_))));
        assert!(config.logo_path().is_none());
        assert_eq!(config.label_font_path(), bundled_label_font_path());
    }

    #[test]
    fn test_failed_label_cascade_changes_nothing() {
        let mut config = Configuration::default();
        let before = config.clone();
        let options = LabelOptions {
            font_size: Some(40),
            font_path: Some(PathBuf::from("/nonexistent/font.ttf")),
            alignment: Some(LabelAlignment::Right),
            ..Default::default()
        };
        let err = config.set_label("Scan me", options).unwrap_err();
        assert!(matches!(err, QrError::InvalidPath(_)));
        assert_eq!(config, before);

        let options = LabelOptions { font_size: Some(0), ..Default::default() };
        assert!(config.set_label("Scan me", options).is_err());
        assert_eq!(config, before);
    }

    #[test]
    fn test_set_label_keeps_unspecified_options() {
        let mut config = Configuration::default();
        config.set_label_font_size(22).unwrap();
        config.set_label_alignment(LabelAlignment::Left);
        config
            .set_label("Scan me", LabelOptions { alignment: Some(LabelAlignment::Right), ..Default::default() })
            .unwrap();
        assert_eq!(config.label(), Some("Scan me"));
        assert_eq!(config.label_font_size(), 22);
        assert_eq!(config.label_alignment(), LabelAlignment::Right);
    }

    #[test]
    fn test_spec_from_json() {
        let spec: ConfigurationSpec = serde_json::from_str(
            r#"{"text":"abc","size":200,"quietZone":8,"errorCorrectionLevel":"high",
                "foregroundColor":{"r":10,"g":20,"b":30},"labelMargin":{"t":5}}"#,
        )
        .unwrap();
        let config = Configuration::from_spec(&spec).unwrap();
        assert_eq!(config.size(), 200);
        assert_eq!(config.quiet_zone(), 8);
        assert_eq!(config.error_correction_level(), ErrorCorrectionLevel::High);
        assert_eq!(config.foreground_color(), Color::rgb(10, 20, 30));
        assert_eq!(config.label_margin().top, 5);
    }

    #[test]
    fn test_spec_enums_share_the_parser() {
        let spec: ConfigurationSpec =
            serde_json::from_str(r#"{"errorCorrectionLevel":"H","labelAlignment":"Left"}"#).unwrap();
        assert_eq!(spec.error_correction_level, Some(ErrorCorrectionLevel::High));
        assert_eq!(spec.label_alignment, Some(LabelAlignment::Left));
        let spec: ConfigurationSpec = serde_json::from_str(r#"{"errorCorrectionLevel":"q"}"#).unwrap();
        assert_eq!(spec.error_correction_level, Some(ErrorCorrectionLevel::Quartile));
        assert!(serde_json::from_str::<ConfigurationSpec>(r#"{"errorCorrectionLevel":"ultra"}"#).is_err());
        assert_eq!(serde_json::to_string(&ErrorCorrectionLevel::High).unwrap(), "\"high\"");
    }
}
