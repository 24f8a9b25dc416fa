//! Drone detection reports and their field constraints.
//!
//! A request body is first parsed into a [`RawReport`], where every field is
//! optional, and then checked with [`RawReport::validate`]. Only a body that
//! satisfies every constraint becomes a [`Report`]; there is no other way to
//! construct one, so anything holding a `Report` can rely on it being valid.
//!
//! | field            | constraint                  |
//! |------------------|-----------------------------|
//! | `model`          | required, not blank         |
//! | `speed`          | required, `0 < v <= 600`    |
//! | `latitude`       | required, `-90 <= v <= 90`  |
//! | `longitude`      | required, `-180 <= v <= 180`|
//! | `flightAltitude` | required, `0 < v <= 10000`  |
//! | `detectedBy`     | required, not blank         |

use serde::{Deserialize, Serialize};
use std::fmt;

/// Request body as it arrives on the wire. Absent and `null` fields are both `None`.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RawReport {
    pub model: Option<String>,
    pub speed: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub flight_altitude: Option<f64>,
    pub detected_by: Option<String>,
}

/// A report that passed validation. Serialized as the broker message value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    model: String,
    speed: f64,
    latitude: f64,
    longitude: f64,
    flight_altitude: f64,
    detected_by: String,
}

impl Report {
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn flight_altitude(&self) -> f64 {
        self.flight_altitude
    }

    /// Identifier of the detecting device, used as the partition key.
    pub fn detected_by(&self) -> &str {
        &self.detected_by
    }
}

/// A single failed constraint.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub message: &'static str,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message)
    }
}

/// Every failed constraint of a report, in field declaration order. Never empty
/// when returned from [`RawReport::validate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All messages joined with `"; "`.
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(|v| v.message)
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn push(&mut self, field: &'static str, message: &'static str) {
        self.0.push(Violation { field, message });
    }

    fn text(&mut self, field: &'static str, value: Option<&str>, blank: &'static str) -> String {
        match value {
            Some(v) if !v.trim().is_empty() => v.to_string(),
            _ => {
                self.push(field, blank);
                String::new()
            }
        }
    }

    fn number(&mut self, constraint: &NumberConstraint, value: Option<f64>) -> f64 {
        let Some(v) = value else {
            self.push(constraint.field, constraint.required);
            return 0.0;
        };

        for &(rule, message) in constraint.rules {
            if !rule.holds(v) {
                self.push(constraint.field, message);
            }
        }
        v
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

#[derive(Clone, Copy, Debug)]
enum Rule {
    Positive,
    Min(f64),
    Max(f64),
}

impl Rule {
    // Bounds are inclusive.
    fn holds(self, v: f64) -> bool {
        match self {
            Rule::Positive => v > 0.0,
            Rule::Min(min) => v >= min,
            Rule::Max(max) => v <= max,
        }
    }
}

struct NumberConstraint {
    field: &'static str,
    required: &'static str,
    rules: &'static [(Rule, &'static str)],
}

pub const MODEL_BLANK: &str = "drone model must not be blank";
pub const DETECTED_BY_BLANK: &str = "detecting device must not be blank";

const SPEED: NumberConstraint = NumberConstraint {
    field: "speed",
    required: "speed is required",
    rules: &[
        (Rule::Positive, "speed must be positive"),
        (Rule::Max(600.0), "speed must be less than 600 km/h"),
    ],
};

const LATITUDE: NumberConstraint = NumberConstraint {
    field: "latitude",
    required: "latitude is required",
    rules: &[
        (Rule::Min(-90.0), "latitude must not be less than -90"),
        (Rule::Max(90.0), "latitude must not be greater than 90"),
    ],
};

const LONGITUDE: NumberConstraint = NumberConstraint {
    field: "longitude",
    required: "longitude is required",
    rules: &[
        (Rule::Min(-180.0), "longitude must not be less than -180"),
        (Rule::Max(180.0), "longitude must not be greater than 180"),
    ],
};

const FLIGHT_ALTITUDE: NumberConstraint = NumberConstraint {
    field: "flightAltitude",
    required: "flight altitude is required",
    rules: &[
        (Rule::Positive, "flight altitude must be positive"),
        (
            Rule::Max(10_000.0),
            "flight altitude must not be greater than 10000 meters",
        ),
    ],
};

impl RawReport {
    /// Checks every field and returns either a valid [`Report`] or all of the
    /// violated constraints. Pure: the same input always gives the same result.
    pub fn validate(&self) -> Result<Report, Violations> {
        let mut violations = Violations::default();

        let model = violations.text("model", self.model.as_deref(), MODEL_BLANK);
        let speed = violations.number(&SPEED, self.speed);
        let latitude = violations.number(&LATITUDE, self.latitude);
        let longitude = violations.number(&LONGITUDE, self.longitude);
        let flight_altitude = violations.number(&FLIGHT_ALTITUDE, self.flight_altitude);
        let detected_by =
            violations.text("detectedBy", self.detected_by.as_deref(), DETECTED_BY_BLANK);

        if !violations.is_empty() {
            return Err(violations);
        }

        Ok(Report {
            model,
            speed,
            latitude,
            longitude,
            flight_altitude,
            detected_by,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> RawReport {
        RawReport {
            model: Some("Model".into()),
            speed: Some(50.0),
            latitude: Some(70.0),
            longitude: Some(90.0),
            flight_altitude: Some(120.0),
            detected_by: Some("DetectedBy".into()),
        }
    }

    fn messages(raw: &RawReport) -> Vec<&'static str> {
        raw.validate()
            .unwrap_err()
            .iter()
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_valid_report() {
        let report = valid().validate().unwrap();
        assert_eq!(report.model(), "Model");
        assert_eq!(report.speed(), 50.0);
        assert_eq!(report.latitude(), 70.0);
        assert_eq!(report.longitude(), 90.0);
        assert_eq!(report.flight_altitude(), 120.0);
        assert_eq!(report.detected_by(), "DetectedBy");
    }

    #[test]
    fn test_boundary_values_are_valid() {
        for (speed, latitude, longitude, altitude) in [
            (600.0, 90.0, 180.0, 10_000.0),
            (600.0, -90.0, -180.0, 10_000.0),
            (0.001, 0.0, 0.0, 0.001),
        ] {
            let raw = RawReport {
                speed: Some(speed),
                latitude: Some(latitude),
                longitude: Some(longitude),
                flight_altitude: Some(altitude),
                ..valid()
            };
            assert!(raw.validate().is_ok(), "{raw:?}");
        }
    }

    #[test]
    fn test_single_violations() {
        let cases: Vec<(RawReport, &str)> = vec![
            (
                RawReport {
                    model: Some("".into()),
                    ..valid()
                },
                MODEL_BLANK,
            ),
            (
                RawReport {
                    model: Some("   ".into()),
                    ..valid()
                },
                MODEL_BLANK,
            ),
            (
                RawReport {
                    speed: Some(-10.0),
                    ..valid()
                },
                "speed must be positive",
            ),
            (
                RawReport {
                    speed: Some(0.0),
                    ..valid()
                },
                "speed must be positive",
            ),
            (
                RawReport {
                    speed: Some(700.0),
                    ..valid()
                },
                "speed must be less than 600 km/h",
            ),
            (
                RawReport {
                    latitude: Some(-100.0),
                    ..valid()
                },
                "latitude must not be less than -90",
            ),
            (
                RawReport {
                    latitude: Some(90.5),
                    ..valid()
                },
                "latitude must not be greater than 90",
            ),
            (
                RawReport {
                    longitude: Some(-180.1),
                    ..valid()
                },
                "longitude must not be less than -180",
            ),
            (
                RawReport {
                    longitude: Some(200.0),
                    ..valid()
                },
                "longitude must not be greater than 180",
            ),
            (
                RawReport {
                    flight_altitude: Some(-1.0),
                    ..valid()
                },
                "flight altitude must be positive",
            ),
            (
                RawReport {
                    flight_altitude: Some(15_000.0),
                    ..valid()
                },
                "flight altitude must not be greater than 10000 meters",
            ),
            (
                RawReport {
                    detected_by: Some("".into()),
                    ..valid()
                },
                DETECTED_BY_BLANK,
            ),
        ];

        for (raw, expected) in cases {
            assert_eq!(messages(&raw), vec![expected], "{raw:?}");
        }
    }

    #[test]
    fn test_missing_fields() {
        let violations = RawReport::default().validate().unwrap_err();
        let fields: Vec<_> = violations.iter().map(|v| v.field).collect();
        assert_eq!(
            fields,
            vec![
                "model",
                "speed",
                "latitude",
                "longitude",
                "flightAltitude",
                "detectedBy"
            ]
        );
        assert_eq!(
            violations.joined(),
            "drone model must not be blank; speed is required; latitude is required; \
             longitude is required; flight altitude is required; \
             detecting device must not be blank"
        );
    }

    #[test]
    fn test_violations_follow_field_order() {
        let raw = RawReport {
            detected_by: None,
            speed: Some(601.0),
            longitude: Some(-181.0),
            ..valid()
        };
        assert_eq!(
            messages(&raw),
            vec![
                "speed must be less than 600 km/h",
                "longitude must not be less than -180",
                DETECTED_BY_BLANK,
            ]
        );
    }

    #[test]
    fn test_validation_is_repeatable() {
        let raw = RawReport {
            speed: Some(700.0),
            ..valid()
        };
        assert_eq!(raw.validate(), raw.validate());

        let raw = valid();
        assert_eq!(raw.validate(), raw.validate());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let raw: RawReport = serde_json::from_str(
            r#"{"model": "M", "speed": 1, "latitude": null, "flightAltitude": 2.5, "detectedBy": "radar-1"}"#,
        )
        .unwrap();
        assert_eq!(raw.speed, Some(1.0));
        assert_eq!(raw.latitude, None);
        assert_eq!(raw.longitude, None);
        assert_eq!(raw.flight_altitude, Some(2.5));
        assert_eq!(raw.detected_by.as_deref(), Some("radar-1"));

        assert!(serde_json::from_str::<RawReport>(r#"{"speed": "fast"}"#).is_err());
    }

    #[test]
    fn test_serialize_camel_case() {
        let report = valid().validate().unwrap();
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "model": "Model",
                "speed": 50.0,
                "latitude": 70.0,
                "longitude": 90.0,
                "flightAltitude": 120.0,
                "detectedBy": "DetectedBy",
            })
        );
    }
}
