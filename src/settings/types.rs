//! Settings type definitions

use serde::Serialize;

/// Setting keys
pub mod keys {
    pub const EXPOSURE_COMPENSATION: &str = "exposure_compensation";
    pub const FLASH_MODE: &str = "flash_mode";
    pub const F_NUMBER: &str = "f_number";
    pub const FOCUS_MODE: &str = "focus_mode";
    pub const ISO: &str = "iso";
    pub const EXPOSURE_MODE: &str = "exposure_mode";
    pub const MOVIE_QUALITY: &str = "movie_quality";
    pub const OIS_MODE: &str = "ois_mode";
    pub const PHOTO_RESOLUTION: &str = "photo_resolution";
    pub const POSTVIEW_IMAGE_SIZE: &str = "postview_image_size";
    pub const SELF_TIMER: &str = "self_timer";
    pub const SHUTTER_SPEED: &str = "shutter_speed";
    pub const VIEW_ANGLE: &str = "view_angle";
    pub const WHITE_BALANCE: &str = "white_balance";
    pub const COLOR_TEMPERATURE: &str = "color_temperature";
}

/// White balance mode that switches to manual Kelvin control
pub const COLOR_TEMPERATURE_MODE: &str = "Color Temperature";

/// Who is assigning a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// User write: changed values are sent to the device
    Idle,
    /// Device-reported value being applied: never sent back
    ApplyingRefresh,
}

/// How a changed value is sent to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteBack {
    /// `method([value])`
    Method(&'static str),
    /// `setExposureMode([value])`, followed by a full status refresh
    ExposureMode,
    /// `setSelfTimer([seconds])`
    SelfTimer,
    /// `setStillSize([aspect, size])`
    StillSize,
    /// `setExposureCompensation([index])`
    ExposureCompensation,
    /// `setWhiteBalance([mode, false, 0])`
    WhiteBalance,
    /// `setWhiteBalance(["Color Temperature", true, kelvin])`
    ColorTemperature,
}

/// A controllable camera setting
#[derive(Debug, Clone, Serialize)]
pub struct Setting {
    pub key: &'static str,
    pub name: &'static str,
    pub group: Option<&'static str>,
    pub description: Option<&'static str>,
    pub value: String,
    /// `None` until the device has reported candidates
    pub options: Option<Vec<String>>,
    #[serde(skip)]
    pub write_back: WriteBack,
}

impl Setting {
    fn new(key: &'static str, name: &'static str, write_back: WriteBack) -> Self {
        Self {
            key,
            name,
            group: None,
            description: None,
            value: String::new(),
            options: None,
            write_back,
        }
    }

    fn group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }

    /// Only settings with known candidates are offered to the user
    pub fn is_settable(&self) -> bool {
        self.options.as_ref().is_some_and(|o| !o.is_empty())
    }
}

/// Outcome of a user write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WriteOutcome {
    /// The value differed and was stored
    pub changed: bool,
    /// The device needs a full status refresh afterwards
    pub requires_refresh: bool,
}

const PHOTOGRAPHIC: &str = "Photographic";
const OUTPUT: &str = "Output";

/// Every setting the registry manages
pub fn catalog() -> Vec<Setting> {
    use keys::*;

    vec![
        Setting::new(
            EXPOSURE_COMPENSATION,
            "Exposure Compensation",
            WriteBack::ExposureCompensation,
        )
        .group(PHOTOGRAPHIC)
        .describe("Brightens or darkens the metered exposure in EV steps."),
        Setting::new(FLASH_MODE, "Flash Mode", WriteBack::Method("setFlashMode"))
            .group(PHOTOGRAPHIC),
        Setting::new(F_NUMBER, "F Number", WriteBack::Method("setFNumber"))
            .group(PHOTOGRAPHIC),
        Setting::new(FOCUS_MODE, "Focus Mode", WriteBack::Method("setFocusMode"))
            .group(PHOTOGRAPHIC),
        Setting::new(ISO, "ISO", WriteBack::Method("setIsoSpeedRate")).group(PHOTOGRAPHIC),
        Setting::new(EXPOSURE_MODE, "Exposure Mode", WriteBack::ExposureMode)
            .describe("Which exposure parameters the camera controls automatically."),
        Setting::new(MOVIE_QUALITY, "Movie Quality", WriteBack::Method("setMovieQuality"))
            .group(OUTPUT),
        Setting::new(OIS_MODE, "SteadyShot Mode", WriteBack::Method("setSteadyMode"))
            .group(PHOTOGRAPHIC),
        Setting::new(
            PHOTO_RESOLUTION,
            "Captured Image Resolution",
            WriteBack::StillSize,
        )
        .group(OUTPUT)
        .describe("Aspect ratio and size of captured photos."),
        Setting::new(
            POSTVIEW_IMAGE_SIZE,
            "Review Image Resolution",
            WriteBack::Method("setPostviewImageSize"),
        )
        .group(OUTPUT)
        .describe("Resolution of the review image downloaded after each shot."),
        Setting::new(SELF_TIMER, "Self Timer", WriteBack::SelfTimer),
        Setting::new(SHUTTER_SPEED, "Shutter Speed", WriteBack::Method("setShutterSpeed"))
            .group(PHOTOGRAPHIC),
        Setting::new(VIEW_ANGLE, "View Angle", WriteBack::Method("setViewAngle")).group(OUTPUT),
        Setting::new(WHITE_BALANCE, "White Balance", WriteBack::WhiteBalance)
            .group(PHOTOGRAPHIC),
        Setting::new(
            COLOR_TEMPERATURE,
            "Color Temperature",
            WriteBack::ColorTemperature,
        )
        .group(PHOTOGRAPHIC)
        .describe("Manual white balance in Kelvin; higher is bluer."),
    ]
}
