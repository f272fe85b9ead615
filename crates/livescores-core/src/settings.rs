// Operator settings: typed schema over the key-value store.
//
// The structured settings live as one JSON object under `tls-settings`. The
// access password is also mirrored under a legacy key that older overlay
// builds read; it is consulted when the structured value is empty and written
// on every password change. Field values are parsed and validated here, at
// the store boundary, against each field's `ValueKind`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::client::AccessToken;
use crate::projection::CategoryFilter;
use crate::store::{KeyValueStore, StoreError};

pub const SETTINGS_KEY: &str = "tls-settings";
pub const LEGACY_PASSWORD_KEY: &str = "tls_access_password";
pub const SELECTED_CATEGORY_KEY: &str = "tls_selected_category";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unknown setting `{0}`")]
    UnknownField(String),

    #[error("invalid value for `{field}`: {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingField {
    SolidBackground,
    BackgroundColor,
    FontScale,
    LineSpacing,
    AccessPassword,
    DefaultCategory,
}

/// Value type (and constraints) of a setting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValueKind {
    Bool,
    HexColor,
    Number { min: f64, max: f64 },
    Text,
    Secret,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl SettingField {
    pub const ALL: [SettingField; 6] = [
        SettingField::SolidBackground,
        SettingField::BackgroundColor,
        SettingField::FontScale,
        SettingField::LineSpacing,
        SettingField::AccessPassword,
        SettingField::DefaultCategory,
    ];

    /// Key inside the stored settings object.
    pub fn key(self) -> &'static str {
        match self {
            SettingField::SolidBackground => "solidBackground",
            SettingField::BackgroundColor => "backgroundColor",
            SettingField::FontScale => "fontScale",
            SettingField::LineSpacing => "lineSpacing",
            SettingField::AccessPassword => "accessPassword",
            SettingField::DefaultCategory => "defaultCategory",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SettingField::SolidBackground => "Solid background",
            SettingField::BackgroundColor => "Background color",
            SettingField::FontScale => "Font scale",
            SettingField::LineSpacing => "Line spacing",
            SettingField::AccessPassword => "Access password",
            SettingField::DefaultCategory => "Default category",
        }
    }

    pub fn kind(self) -> ValueKind {
        match self {
            SettingField::SolidBackground => ValueKind::Bool,
            SettingField::BackgroundColor => ValueKind::HexColor,
            SettingField::FontScale => ValueKind::Number { min: 0.25, max: 4.0 },
            SettingField::LineSpacing => ValueKind::Number { min: 0.5, max: 3.0 },
            SettingField::AccessPassword => ValueKind::Secret,
            SettingField::DefaultCategory => ValueKind::Text,
        }
    }

    /// The boolean field that must be on for this field to apply.
    pub fn depends_on(self) -> Option<SettingField> {
        match self {
            SettingField::BackgroundColor => Some(SettingField::SolidBackground),
            _ => None,
        }
    }
}

impl fmt::Display for SettingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for SettingField {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SettingField::ALL
            .into_iter()
            .find(|f| f.key() == s)
            .ok_or_else(|| SettingsError::UnknownField(s.to_string()))
    }
}

impl ValueKind {
    /// Parse operator input (command line) into a value of this kind.
    pub fn parse(self, raw: &str) -> Result<SettingValue, String> {
        let value = match self {
            ValueKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => SettingValue::Bool(true),
                "false" | "off" | "no" | "0" => SettingValue::Bool(false),
                other => return Err(format!("expected true/false, got `{other}`")),
            },
            ValueKind::Number { .. } => raw
                .trim()
                .parse::<f64>()
                .map(SettingValue::Number)
                .map_err(|_| format!("expected a number, got `{raw}`"))?,
            ValueKind::HexColor | ValueKind::Text | ValueKind::Secret => {
                SettingValue::Text(raw.to_string())
            }
        };
        self.validate(&value)?;
        Ok(value)
    }

    /// Read a stored JSON value. Numbers saved as strings are accepted.
    fn from_json(self, value: &Value) -> Option<SettingValue> {
        match (self, value) {
            (ValueKind::Bool, Value::Bool(b)) => Some(SettingValue::Bool(*b)),
            (ValueKind::Number { .. }, Value::Number(n)) => n.as_f64().map(SettingValue::Number),
            (ValueKind::Number { .. }, Value::String(s)) => {
                s.trim().parse().ok().map(SettingValue::Number)
            }
            (ValueKind::HexColor | ValueKind::Text | ValueKind::Secret, Value::String(s)) => {
                Some(SettingValue::Text(s.clone()))
            }
            _ => None,
        }
    }

    pub fn validate(self, value: &SettingValue) -> Result<(), String> {
        match (self, value) {
            (ValueKind::Bool, SettingValue::Bool(_)) => Ok(()),
            (ValueKind::Number { min, max }, SettingValue::Number(n)) => {
                if n.is_finite() && (min..=max).contains(n) {
                    Ok(())
                } else {
                    Err(format!("must be between {min} and {max}, got {n}"))
                }
            }
            (ValueKind::HexColor, SettingValue::Text(s)) => parse_hex_color(s)
                .map(|_| ())
                .ok_or_else(|| format!("expected a hex color like #000000, got `{s}`")),
            (ValueKind::Text | ValueKind::Secret, SettingValue::Text(_)) => Ok(()),
            (kind, value) => Err(format!("{value:?} is not a {kind:?} value")),
        }
    }
}

impl SettingValue {
    fn to_json(&self) -> Value {
        match self {
            SettingValue::Bool(b) => Value::Bool(*b),
            SettingValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            SettingValue::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Parse `#rgb` or `#rrggbb`.
pub fn parse_hex_color(s: &str) -> Option<(u8, u8, u8)> {
    let hex = s.strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some((digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub solid_background: bool,
    pub background_color: String,
    pub font_scale: f64,
    pub line_spacing: f64,
    pub access_password: String,
    pub default_category: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            solid_background: false,
            background_color: "#000000".to_string(),
            font_scale: 1.0,
            line_spacing: 1.0,
            access_password: String::new(),
            default_category: String::new(),
        }
    }
}

impl Settings {
    pub fn get(&self, field: SettingField) -> SettingValue {
        match field {
            SettingField::SolidBackground => SettingValue::Bool(self.solid_background),
            SettingField::BackgroundColor => SettingValue::Text(self.background_color.clone()),
            SettingField::FontScale => SettingValue::Number(self.font_scale),
            SettingField::LineSpacing => SettingValue::Number(self.line_spacing),
            SettingField::AccessPassword => SettingValue::Text(self.access_password.clone()),
            SettingField::DefaultCategory => SettingValue::Text(self.default_category.clone()),
        }
    }

    /// Set a field after checking the value against the field's kind.
    pub fn set(&mut self, field: SettingField, value: SettingValue) -> Result<(), SettingsError> {
        field
            .kind()
            .validate(&value)
            .map_err(|message| SettingsError::InvalidValue {
                field: field.key(),
                message,
            })?;

        match (field, value) {
            (SettingField::SolidBackground, SettingValue::Bool(b)) => self.solid_background = b,
            (SettingField::BackgroundColor, SettingValue::Text(s)) => self.background_color = s,
            (SettingField::FontScale, SettingValue::Number(n)) => self.font_scale = n,
            (SettingField::LineSpacing, SettingValue::Number(n)) => self.line_spacing = n,
            (SettingField::AccessPassword, SettingValue::Text(s)) => self.access_password = s,
            (SettingField::DefaultCategory, SettingValue::Text(s)) => self.default_category = s,
            (field, value) => {
                return Err(SettingsError::InvalidValue {
                    field: field.key(),
                    message: format!("unexpected value {value:?}"),
                })
            }
        }
        Ok(())
    }

    /// Build settings from a stored object. Missing or malformed fields keep
    /// their defaults.
    pub fn from_json(value: &Value) -> Settings {
        let mut settings = Settings::default();
        let Some(obj) = value.as_object() else {
            warn!("Stored settings are not an object, using defaults");
            return settings;
        };

        for field in SettingField::ALL {
            let Some(raw) = obj.get(field.key()) else {
                continue;
            };
            let parsed = field.kind().from_json(raw);
            match parsed.map(|v| settings.set(field, v)) {
                Some(Ok(())) => {}
                Some(Err(e)) => warn!("Ignoring stored setting: {}", e),
                None => warn!("Ignoring stored setting `{}`: unexpected type", field.key()),
            }
        }
        settings
    }

    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = SettingField::ALL
            .into_iter()
            .map(|f| (f.key().to_string(), self.get(f).to_json()))
            .collect();
        Value::Object(map)
    }

    pub fn access_token(&self) -> Option<AccessToken> {
        AccessToken::new(self.access_password.clone())
    }

    /// `(r, g, b)` of the background when a solid background is enabled.
    pub fn solid_background_rgb(&self) -> Option<(u8, u8, u8)> {
        if field_enabled(self, SettingField::BackgroundColor) {
            parse_hex_color(&self.background_color)
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Dependency rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldState {
    pub field: SettingField,
    pub enabled: bool,
}

/// Whether `field` applies under the current values: a field with a
/// dependency is enabled only while that boolean field is on.
pub fn field_enabled(settings: &Settings, field: SettingField) -> bool {
    match field.depends_on() {
        None => true,
        Some(dep) => matches!(settings.get(dep), SettingValue::Bool(true)),
    }
}

pub fn field_states(settings: &Settings) -> Vec<FieldState> {
    SettingField::ALL
        .into_iter()
        .map(|field| FieldState {
            field,
            enabled: field_enabled(settings, field),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Repository
// ---------------------------------------------------------------------------

/// Settings and credential access on top of a [`KeyValueStore`].
#[derive(Clone)]
pub struct SettingsRepository {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        SettingsRepository { store }
    }

    /// Load settings, falling back to the legacy password key when the
    /// structured password is empty.
    pub fn load(&self) -> Result<Settings, SettingsError> {
        let mut settings = match self.store.get(SETTINGS_KEY)? {
            Some(value) => Settings::from_json(&value),
            None => Settings::default(),
        };

        if settings.access_password.is_empty() {
            if let Some(Value::String(pw)) = self.store.get(LEGACY_PASSWORD_KEY)? {
                debug!("Using legacy access password key");
                settings.access_password = pw;
            }
        }
        Ok(settings)
    }

    /// Validate and persist one field. Other keys in the stored object are
    /// preserved. Password changes are mirrored to the legacy key.
    pub fn save_field(
        &self,
        field: SettingField,
        value: SettingValue,
    ) -> Result<Settings, SettingsError> {
        let mut settings = self.load()?;
        settings.set(field, value.clone())?;

        let mut stored = match self.store.get(SETTINGS_KEY)? {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        stored.insert(field.key().to_string(), value.to_json());
        self.store.set(SETTINGS_KEY, &Value::Object(stored))?;

        if field == SettingField::AccessPassword {
            self.store
                .set(LEGACY_PASSWORD_KEY, &Value::String(settings.access_password.clone()))?;
        }

        info!("Saved setting {}", field.key());
        Ok(settings)
    }

    /// Parse `raw` for the named field and persist it.
    pub fn set_from_str(&self, key: &str, raw: &str) -> Result<Settings, SettingsError> {
        let field: SettingField = key.parse()?;
        let value = field
            .kind()
            .parse(raw)
            .map_err(|message| SettingsError::InvalidValue {
                field: field.key(),
                message,
            })?;
        self.save_field(field, value)
    }

    pub fn access_token(&self) -> Result<Option<AccessToken>, SettingsError> {
        Ok(self.load()?.access_token())
    }

    /// The last selected filter, else the configured default category.
    pub fn selected_category(&self) -> Result<CategoryFilter, SettingsError> {
        if let Some(Value::String(label)) = self.store.get(SELECTED_CATEGORY_KEY)? {
            return Ok(CategoryFilter::from_label(Some(&label)));
        }
        let settings = self.load()?;
        Ok(CategoryFilter::from_label(Some(&settings.default_category)))
    }

    pub fn save_selected_category(&self, filter: &CategoryFilter) -> Result<(), SettingsError> {
        let label = filter.label().unwrap_or_default().to_string();
        self.store.set(SELECTED_CATEGORY_KEY, &Value::String(label))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
