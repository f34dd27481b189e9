//! Device state type definitions

use serde::Serialize;
use serde_json::{json, Value};

/// Attribute names published in change sets
pub mod attributes {
    pub const STATUS: &str = "status";
    pub const ZOOM_PERCENTAGE: &str = "zoom_percentage";
    pub const LIVE_VIEW_READY: &str = "live_view_ready";
    pub const LIVE_VIEW_ORIENTATION: &str = "live_view_orientation";
    pub const RECORDABLE_TIME: &str = "recordable_time";
    pub const RECORDABLE_PHOTOS: &str = "recordable_photos";
    pub const CURRENT_FUNCTION: &str = "current_function";
    pub const SHOOT_MODE: &str = "shoot_mode";
    pub const PROGRAM_SHIFTED: &str = "program_shifted";
    pub const TOUCH_AF_SET: &str = "touch_af_set";
    /// Published whenever option lists may have changed
    pub const AVAILABLE_SETTINGS: &str = "available_settings";
}

/// Camera status values used by the facade
pub mod status {
    pub const IDLE: &str = "IDLE";
    pub const MOVIE_RECORDING: &str = "MovieRecording";
}

/// Device-reported, non-setting attributes
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceState {
    pub status: Option<String>,
    pub zoom_percentage: Option<i64>,
    pub live_view_ready: bool,
    pub live_view_orientation: Option<String>,
    /// Minutes, `None` when unknown
    pub recordable_time: Option<i64>,
    /// `None` when unknown
    pub recordable_photos: Option<i64>,
    pub current_function: Option<String>,
    pub shoot_mode: Option<String>,
    pub program_shifted: Option<bool>,
    pub touch_af_set: bool,
}

impl DeviceState {
    /// Look up an attribute by its change-set name
    pub fn attribute(&self, name: &str) -> Option<Value> {
        use attributes::*;

        let value = match name {
            STATUS => json!(self.status),
            ZOOM_PERCENTAGE => json!(self.zoom_percentage),
            LIVE_VIEW_READY => json!(self.live_view_ready),
            LIVE_VIEW_ORIENTATION => json!(self.live_view_orientation),
            RECORDABLE_TIME => json!(self.recordable_time),
            RECORDABLE_PHOTOS => json!(self.recordable_photos),
            CURRENT_FUNCTION => json!(self.current_function),
            SHOOT_MODE => json!(self.shoot_mode),
            PROGRAM_SHIFTED => json!(self.program_shifted),
            TOUCH_AF_SET => json!(self.touch_af_set),
            _ => return None,
        };

        Some(value)
    }

    pub fn is_status(&self, expected: &str) -> bool {
        self.status.as_deref() == Some(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_lookup() {
        let state = DeviceState {
            status: Some(status::IDLE.to_string()),
            zoom_percentage: Some(40),
            ..Default::default()
        };

        assert_eq!(state.attribute(attributes::STATUS), Some(json!("IDLE")));
        assert_eq!(state.attribute(attributes::ZOOM_PERCENTAGE), Some(json!(40)));
        assert_eq!(state.attribute(attributes::RECORDABLE_TIME), Some(Value::Null));
        assert_eq!(state.attribute("iso"), None);
        assert!(state.is_status(status::IDLE));
    }
}
