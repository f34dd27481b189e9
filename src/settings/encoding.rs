//! Derived value encodings
//!
//! Exposure compensation travels as an integer index whose step size is
//! reported by the device; color temperature as an integer Kelvin value
//! constrained to a reported range. Both are cached from the latest refresh
//! and used in both directions.

use crate::error::{Error, Result};
use serde_json::Value;

/// Exposure compensation index range and step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposureScale {
    pub min: i64,
    pub max: i64,
    /// 1 = 1/3 EV steps, anything else = 1/2 EV steps
    pub step_index: i64,
}

impl ExposureScale {
    pub fn new(min: i64, max: i64, step_index: i64) -> Self {
        Self {
            min,
            max,
            step_index,
        }
    }

    pub fn divisor(&self) -> f64 {
        if self.step_index == 1 {
            3.0
        } else {
            2.0
        }
    }

    /// Device index -> EV string, e.g. -6 -> "-2.0" for 1/3 steps
    pub fn display(&self, index: i64) -> String {
        format!("{:.1}", index as f64 / self.divisor())
    }

    /// Every selectable EV value, lowest first
    pub fn options(&self) -> Vec<String> {
        (self.min..=self.max).map(|i| self.display(i)).collect()
    }

    /// EV string -> device index
    pub fn encode(&self, value: &str) -> Result<i64> {
        let ev: f64 = value
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("invalid exposure compensation '{}'", value)))?;
        if !ev.is_finite() {
            return Err(Error::Parse(format!(
                "invalid exposure compensation '{}'",
                value
            )));
        }

        let index = (ev * self.divisor()).round() as i64;
        if index < self.min || index > self.max {
            return Err(Error::Validation(format!(
                "exposure compensation {} outside {}..={}",
                value,
                self.display(self.min),
                self.display(self.max)
            )));
        }

        Ok(index)
    }
}

/// Selectable color temperatures in Kelvin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorTemperatureRange {
    values: Vec<i64>,
}

impl ColorTemperatureRange {
    /// Decode `colorTemperatureRange`
    ///
    /// Three integers `[max, min, step]` describe a stepped range; any other
    /// integer list is taken as the explicit candidates.
    pub fn from_device(range: &[Value]) -> Option<Self> {
        let ints: Vec<i64> = range.iter().filter_map(Value::as_i64).collect();
        if ints.is_empty() || ints.len() != range.len() {
            return None;
        }

        let stepped = match ints[..] {
            [max, min, step] if step > 0 && max >= min => Some((max, min, step)),
            _ => None,
        };

        let values = match stepped {
            Some((max, min, step)) => (0..)
                .map(|i| min + i * step)
                .take_while(|k| *k <= max)
                .collect(),
            None => ints,
        };

        Some(Self { values })
    }

    pub fn options(&self) -> Vec<String> {
        self.values.iter().map(i64::to_string).collect()
    }

    pub fn encode(&self, value: &str) -> Result<i64> {
        let kelvin: i64 = value
            .trim()
            .parse()
            .map_err(|_| Error::Parse(format!("invalid color temperature '{}'", value)))?;

        if !self.values.contains(&kelvin) {
            return Err(Error::Validation(format!(
                "color temperature {}K not supported",
                kelvin
            )));
        }

        Ok(kelvin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_exposure_third_steps() {
        let scale = ExposureScale::new(-9, 9, 1);
        assert_eq!(scale.encode("1.0").unwrap(), 3);
        assert_eq!(scale.display(-6), "-2.0");
        assert_eq!(scale.display(1), "0.3");
        assert_eq!(scale.encode("0.3").unwrap(), 1);
        assert_eq!(scale.options().len(), 19);
        assert_eq!(scale.options().first().map(String::as_str), Some("-3.0"));
    }

    #[test]
    fn test_exposure_half_steps() {
        let scale = ExposureScale::new(-4, 4, 2);
        assert_eq!(scale.display(3), "1.5");
        assert_eq!(scale.encode("-1.5").unwrap(), -3);
    }

    #[test]
    fn test_exposure_rejects_bad_input() {
        let scale = ExposureScale::new(-9, 9, 1);
        assert!(matches!(scale.encode("bright"), Err(Error::Parse(_))));
        assert!(matches!(scale.encode("5.0"), Err(Error::Validation(_))));
        assert!(matches!(scale.encode("NaN"), Err(Error::Parse(_))));
        assert!(matches!(scale.encode("inf"), Err(Error::Parse(_))));
        assert!(matches!(scale.encode("-infinity"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_color_temperature_stepped_range() {
        let range = ColorTemperatureRange::from_device(&[json!(9900), json!(2500), json!(100)])
            .unwrap();
        let options = range.options();
        assert_eq!(options.first().map(String::as_str), Some("2500"));
        assert_eq!(options.last().map(String::as_str), Some("9900"));
        assert_eq!(options.len(), 75);
        assert_eq!(range.encode("5500").unwrap(), 5500);
        assert!(matches!(range.encode("5550"), Err(Error::Validation(_))));
    }

    #[test]
    fn test_color_temperature_candidates() {
        let range = ColorTemperatureRange::from_device(&[json!(3200), json!(5600)]).unwrap();
        assert_eq!(range.options(), vec!["3200", "5600"]);
        assert!(ColorTemperatureRange::from_device(&[json!("x")]).is_none());
        assert!(ColorTemperatureRange::from_device(&[]).is_none());
    }
}
