//! getEvent slot table
//!
//! Each entry binds one result index to the attribute names it reports and
//! the function that decodes it. Decoders parse every field before writing
//! anything, so a malformed slot leaves state untouched.

use super::types::{attributes, DeviceState};
use crate::error::{Error, Result};
use crate::rpc_channel::RpcSlots;
use crate::settings::{
    keys, ColorTemperatureRange, ExposureScale, RefreshBatch, COLOR_TEMPERATURE_MODE,
};
use serde_json::Value;

/// Destination of decoded slot values
pub struct SlotTarget<'s, 'b> {
    pub device: &'s mut DeviceState,
    pub settings: &'s mut RefreshBatch<'b>,
}

/// Follow-up RPC whose result carries the option list for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondaryFetch {
    StillSizes,
    WhiteBalances,
}

/// `Ok(false)` when the slot was present but reported nothing applicable
type DecodeFn = fn(&Value, &mut SlotTarget<'_, '_>) -> Result<bool>;

pub struct SlotBinding {
    pub index: usize,
    pub attributes: &'static [&'static str],
    pub decode: DecodeFn,
    pub secondary: Option<SecondaryFetch>,
}

const fn bind(index: usize, attributes: &'static [&'static str], decode: DecodeFn) -> SlotBinding {
    SlotBinding {
        index,
        attributes,
        decode,
        secondary: None,
    }
}

pub static SLOT_TABLE: &[SlotBinding] = &[
    bind(1, &[attributes::STATUS], decode_status),
    bind(2, &[attributes::ZOOM_PERCENTAGE], decode_zoom),
    bind(3, &[attributes::LIVE_VIEW_READY], decode_live_view_ready),
    bind(4, &[attributes::LIVE_VIEW_ORIENTATION], decode_live_view_orientation),
    bind(
        10,
        &[attributes::RECORDABLE_TIME, attributes::RECORDABLE_PHOTOS],
        decode_storage,
    ),
    bind(12, &[attributes::CURRENT_FUNCTION], decode_current_function),
    bind(13, &[keys::MOVIE_QUALITY], decode_movie_quality),
    SlotBinding {
        index: 14,
        attributes: &[keys::PHOTO_RESOLUTION],
        decode: decode_still_size,
        secondary: Some(SecondaryFetch::StillSizes),
    },
    bind(16, &[keys::OIS_MODE], decode_steady_mode),
    bind(17, &[keys::VIEW_ANGLE], decode_view_angle),
    bind(18, &[keys::EXPOSURE_MODE], decode_exposure_mode),
    bind(19, &[keys::POSTVIEW_IMAGE_SIZE], decode_postview_size),
    bind(20, &[keys::SELF_TIMER], decode_self_timer),
    bind(21, &[attributes::SHOOT_MODE], decode_shoot_mode),
    bind(25, &[keys::EXPOSURE_COMPENSATION], decode_exposure_compensation),
    bind(26, &[keys::FLASH_MODE], decode_flash_mode),
    bind(27, &[keys::F_NUMBER], decode_f_number),
    bind(28, &[keys::FOCUS_MODE], decode_focus_mode),
    bind(29, &[keys::ISO], decode_iso),
    bind(31, &[attributes::PROGRAM_SHIFTED], decode_program_shift),
    bind(32, &[keys::SHUTTER_SPEED], decode_shutter_speed),
    SlotBinding {
        index: 33,
        attributes: &[keys::WHITE_BALANCE, keys::COLOR_TEMPERATURE],
        decode: decode_white_balance,
        secondary: Some(SecondaryFetch::WhiteBalances),
    },
    bind(34, &[attributes::TOUCH_AF_SET], decode_touch_af),
];

// Field helpers

fn field<'v>(slot: &'v Value, name: &str) -> Result<&'v Value> {
    slot.get(name)
        .filter(|v| !v.is_null())
        .ok_or_else(|| Error::Protocol(format!("missing field '{}'", name)))
}

/// String field; numbers are accepted and rendered as text
fn text(slot: &Value, name: &str) -> Result<String> {
    match field(slot, name)? {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(Error::Protocol(format!(
            "field '{}' is not text: {}",
            name, other
        ))),
    }
}

fn int(slot: &Value, name: &str) -> Result<i64> {
    field(slot, name)?
        .as_i64()
        .ok_or_else(|| Error::Protocol(format!("field '{}' is not an integer", name)))
}

fn boolean(slot: &Value, name: &str) -> Result<bool> {
    field(slot, name)?
        .as_bool()
        .ok_or_else(|| Error::Protocol(format!("field '{}' is not a boolean", name)))
}

/// Candidate list; absent means "unknown"
fn candidates(slot: &Value, name: &str) -> Result<Option<Vec<String>>> {
    let Some(list) = slot.get(name).filter(|v| !v.is_null()) else {
        return Ok(None);
    };

    let items = list
        .as_array()
        .ok_or_else(|| Error::Protocol(format!("field '{}' is not a list", name)))?;

    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            Value::Number(n) => Ok(n.to_string()),
            other => Err(Error::Protocol(format!(
                "candidate in '{}' is not text: {}",
                name, other
            ))),
        })
        .collect::<Result<Vec<_>>>()
        .map(Some)
}

fn apply_setting(
    target: &mut SlotTarget<'_, '_>,
    key: &str,
    value: String,
    options: Option<Vec<String>>,
) -> bool {
    target.settings.set_value(key, &value);
    target.settings.set_options(key, options);
    true
}

fn decode_setting(
    slot: &Value,
    target: &mut SlotTarget<'_, '_>,
    key: &str,
    current: &str,
    candidate_field: &str,
) -> Result<bool> {
    let value = text(slot, current)?;
    let options = candidates(slot, candidate_field)?;
    Ok(apply_setting(target, key, value, options))
}

// Device attributes

fn decode_status(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    target.device.status = Some(text(slot, "cameraStatus")?);
    Ok(true)
}

fn decode_zoom(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    target.device.zoom_percentage = Some(int(slot, "zoomPosition")?);
    Ok(true)
}

fn decode_live_view_ready(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    target.device.live_view_ready = boolean(slot, "liveviewStatus")?;
    Ok(true)
}

fn decode_live_view_orientation(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    target.device.live_view_orientation = Some(text(slot, "liveviewOrientation")?);
    Ok(true)
}

fn decode_storage(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    let entries = slot
        .as_array()
        .ok_or_else(|| Error::Protocol("storage information is not a list".to_string()))?;

    let Some(entry) = entries
        .iter()
        .find(|e| e.get("recordTarget").and_then(Value::as_bool) == Some(true))
    else {
        return Ok(false);
    };

    let time = int(entry, "recordableTime")?;
    let photos = int(entry, "numberOfRecordableImages")?;

    let known = |n: i64| (n != -1).then_some(n);
    target.device.recordable_time = known(time);
    target.device.recordable_photos = known(photos);
    Ok(true)
}

fn decode_current_function(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    target.device.current_function = Some(text(slot, "currentCameraFunction")?);
    Ok(true)
}

fn decode_shoot_mode(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    target.device.shoot_mode = Some(text(slot, "currentShootMode")?);
    Ok(true)
}

fn decode_program_shift(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    target.device.program_shifted = slot.get("isShifted").and_then(Value::as_bool);
    Ok(true)
}

fn decode_touch_af(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    target.device.touch_af_set = boolean(slot, "currentSet")?;
    Ok(true)
}

// Settings

fn decode_movie_quality(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::MOVIE_QUALITY,
        "currentMovieQuality",
        "movieQualityCandidates",
    )
}

fn decode_still_size(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    let aspect = text(slot, "currentAspect")?;
    let size = text(slot, "currentSize")?;
    target
        .settings
        .set_value(keys::PHOTO_RESOLUTION, &format!("{} - {}", aspect, size));
    Ok(true)
}

fn decode_steady_mode(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::OIS_MODE,
        "currentSteadyMode",
        "steadyModeCandidates",
    )
}

fn decode_view_angle(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::VIEW_ANGLE,
        "currentViewAngle",
        "viewAngleCandidates",
    )
}

fn decode_exposure_mode(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::EXPOSURE_MODE,
        "currentExposureMode",
        "exposureModeCandidates",
    )
}

fn decode_postview_size(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::POSTVIEW_IMAGE_SIZE,
        "currentPostviewImageSize",
        "postviewImageSizeCandidates",
    )
}

fn decode_self_timer(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::SELF_TIMER,
        "currentSelfTimer",
        "selfTimerCandidates",
    )
}

fn decode_exposure_compensation(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    let current = int(slot, "currentExposureCompensation")?;
    let scale = ExposureScale::new(
        int(slot, "minExposureCompensation")?,
        int(slot, "maxExposureCompensation")?,
        int(slot, "stepIndexOfExposureCompensation")?,
    );

    target.settings.set_exposure_scale(scale);
    Ok(apply_setting(
        target,
        keys::EXPOSURE_COMPENSATION,
        scale.display(current),
        Some(scale.options()),
    ))
}

fn decode_flash_mode(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::FLASH_MODE,
        "currentFlashMode",
        "flashModeCandidates",
    )
}

fn decode_f_number(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::F_NUMBER,
        "currentFNumber",
        "fNumberCandidates",
    )
}

fn decode_focus_mode(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::FOCUS_MODE,
        "currentFocusMode",
        "focusModeCandidates",
    )
}

fn decode_iso(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::ISO,
        "currentIsoSpeedRate",
        "isoSpeedRateCandidates",
    )
}

fn decode_shutter_speed(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    decode_setting(
        slot,
        target,
        keys::SHUTTER_SPEED,
        "currentShutterSpeed",
        "shutterSpeedCandidates",
    )
}

fn decode_white_balance(slot: &Value, target: &mut SlotTarget<'_, '_>) -> Result<bool> {
    let mode = text(slot, "currentWhiteBalanceMode")?;
    target.settings.set_value(keys::WHITE_BALANCE, &mode);

    // Absent outside the color temperature mode
    if let Ok(kelvin) = text(slot, "currentColorTemperature") {
        target.settings.set_value(keys::COLOR_TEMPERATURE, &kelvin);
    }
    Ok(true)
}

// Secondary fetch results

/// `getAvailableStillSize` -> `"aspect - size"` options
pub fn still_size_options(slots: &RpcSlots) -> Result<Vec<String>> {
    let list = slots
        .slot(1)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Protocol("still size candidates missing".to_string()))?;

    list.iter()
        .map(|item| Ok(format!("{} - {}", text(item, "aspect")?, text(item, "size")?)))
        .collect()
}

/// White balance candidates and the manual Kelvin range, if offered
#[derive(Debug, Clone, PartialEq)]
pub struct WhiteBalanceCandidates {
    pub modes: Vec<String>,
    pub color_temperature: Option<ColorTemperatureRange>,
}

/// `getAvailableWhiteBalance` -> candidates
pub fn white_balance_candidates(slots: &RpcSlots) -> Result<WhiteBalanceCandidates> {
    let list = slots
        .slot(1)
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Protocol("white balance candidates missing".to_string()))?;

    let mut modes = Vec::with_capacity(list.len());
    let mut color_temperature = None;

    for item in list {
        let mode = text(item, "whiteBalanceMode")?;
        if mode == COLOR_TEMPERATURE_MODE {
            color_temperature = item
                .get("colorTemperatureRange")
                .and_then(Value::as_array)
                .and_then(|range| ColorTemperatureRange::from_device(range));
        } else {
            modes.push(mode);
        }
    }

    Ok(WhiteBalanceCandidates {
        modes,
        color_temperature,
    })
}
