//! Optional on-disk persistence of the parameter store.
//!
//! Values are written as a flat JSON object keyed by field name. Restoring
//! overlays whatever keys are recognised onto a set of defaults, so a stale
//! or hand-edited file can never produce an invalid [`ParameterSet`].

use std::{fs, io, path::Path};

use bevy::log::warn;
use serde_json::{Map, Value};

use crate::params::{ColorParam, NumericParam, ParameterSet, Pattern};

const TEXTURE_ENABLED_KEY: &str = "texture_enabled";
const ACTIVE_PATTERN_KEY: &str = "active_pattern";

/// Failure to read or write the settings file.
#[derive(Debug)]
pub enum PersistError {
    Io(io::Error),
    Json(serde_json::Error),
    /// The file parsed but its top level is not a JSON object.
    NotAnObject,
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "settings I/O failed: {e}"),
            PersistError::Json(e) => write!(f, "settings are not valid JSON: {e}"),
            PersistError::NotAnObject => write!(f, "settings file must contain a JSON object"),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Io(e) => Some(e),
            PersistError::Json(e) => Some(e),
            PersistError::NotAnObject => None,
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Json(e)
    }
}

/// Flatten `params` into a field-name → value map.
pub fn to_key_values(params: &ParameterSet) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(TEXTURE_ENABLED_KEY.into(), Value::Bool(params.texture_enabled));
    map.insert(
        ACTIVE_PATTERN_KEY.into(),
        Value::from(params.active_pattern.index()),
    );
    for param in NumericParam::ALL {
        map.insert(param.key().into(), Value::from(params.get(param) as f64));
    }
    for param in ColorParam::ALL {
        let rgb = params.color(param).map(|c| Value::from(c as f64));
        map.insert(param.key().into(), Value::Array(rgb.to_vec()));
    }
    map
}

/// Overlay every recognised key of `map` onto `params`.
///
/// Numeric values are clamped through [`ParameterSet::set`]; values of the
/// wrong shape and unknown keys are skipped with a warning.
pub fn apply_key_values(params: &mut ParameterSet, map: &Map<String, Value>) {
    for (key, value) in map {
        if key == TEXTURE_ENABLED_KEY {
            match value.as_bool() {
                Some(on) => params.texture_enabled = on,
                None => warn!("ignoring persisted {key}: expected a bool, got {value}"),
            }
        } else if key == ACTIVE_PATTERN_KEY {
            let pattern = value
                .as_u64()
                .and_then(|i| u8::try_from(i).ok())
                .ok_or(())
                .and_then(|i| Pattern::from_index(i).map_err(|_| ()));
            match pattern {
                Ok(p) => params.active_pattern = p,
                Err(()) => warn!("ignoring persisted {key}: {value} is not a pattern index"),
            }
        } else if let Some(param) = NumericParam::from_key(key) {
            match value.as_f64() {
                Some(v) => {
                    params.set(param, v as f32);
                }
                None => warn!("ignoring persisted {key}: expected a number, got {value}"),
            }
        } else if let Some(param) = ColorParam::ALL.into_iter().find(|c| c.key() == key) {
            match parse_rgb(value) {
                Some(rgb) => params.set_color(param, rgb),
                None => warn!("ignoring persisted {key}: expected [r, g, b], got {value}"),
            }
        } else {
            warn!("ignoring unknown persisted setting {key}");
        }
    }
}

fn parse_rgb(value: &Value) -> Option<[f32; 3]> {
    let items = value.as_array()?;
    if items.len() != 3 {
        return None;
    }
    let mut rgb = [0.0f32; 3];
    for (slot, item) in rgb.iter_mut().zip(items) {
        *slot = item.as_f64()? as f32;
    }
    Some(rgb)
}

/// Write `params` to `path`, creating parent directories as needed.
pub fn save(params: &ParameterSet, path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&Value::Object(to_key_values(params)))?;
    fs::write(path, json)?;
    Ok(())
}

/// Read `path` and overlay it onto `defaults`.
///
/// A missing file is not an error: `defaults` come back unchanged.
pub fn restore(path: &Path, defaults: ParameterSet) -> Result<ParameterSet, PersistError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(defaults),
        Err(e) => return Err(e.into()),
    };
    let Value::Object(map) = serde_json::from_str::<Value>(&text)? else {
        return Err(PersistError::NotAnObject);
    };
    let mut params = defaults;
    apply_key_values(&mut params, &map);
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_values_are_restored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/shading.json");

        let mut params = ParameterSet::default();
        params.texture_enabled = true;
        params.select_pattern(5).unwrap();
        params.set(NumericParam::GridScale, 7.5);
        params.set_color(ColorParam::Grass, [0.1, 0.2, 0.3]);

        save(&params, &path).unwrap();
        let restored = restore(&path, ParameterSet::default()).unwrap();

        assert!(restored.texture_enabled);
        assert_eq!(restored.active_pattern, Pattern::Grid);
        assert_eq!(restored.grid.scale, 7.5);
        assert_eq!(restored.grass_color, [0.1, 0.2, 0.3]);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let restored = restore(&dir.path().join("absent.json"), ParameterSet::default()).unwrap();
        assert_eq!(restored, ParameterSet::default());
    }

    #[test]
    fn bad_entries_are_skipped_and_numbers_clamped() {
        let map: Map<String, Value> = serde_json::from_str(
            r#"{
                "texture_repeat": 9000,
                "active_pattern": 12,
                "grid_scale": "big",
                "hill_color": [1, 2],
                "mystery": true
            }"#,
        )
        .unwrap();
        let mut params = ParameterSet::default();
        apply_key_values(&mut params, &map);

        let defaults = ParameterSet::default();
        assert_eq!(params.texture_repeat, 320.0);
        assert_eq!(params.active_pattern, defaults.active_pattern);
        assert_eq!(params.grid.scale, defaults.grid.scale);
        assert_eq!(params.hill_color, defaults.hill_color);
    }

    #[test]
    fn non_object_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shading.json");
        fs::write(&path, "[1, 2, 3]").unwrap();
        assert!(matches!(
            restore(&path, ParameterSet::default()),
            Err(PersistError::NotAnObject)
        ));
    }
}
