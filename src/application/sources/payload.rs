// Payload decoder - Lenient, field-level defaulting of bridge JSON
use crate::domain::telemetry::{DeviceMode, LastKnown, Origin, Sample};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

/// A decoded device payload.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedPayload {
    pub sample: Sample,
    /// Output state as reported by the bridge status projection, if present.
    pub device_output_on: Option<bool>,
}

/// Decode a bridge payload into a sample. Never fails: absent or mistyped
/// numeric fields fall back to `last_known`, `mode` to standby, `warnings`
/// to empty and `timestamp` to `received_at`. Timestamps ahead of
/// `received_at` are clamped to it.
///
/// Accepts both the `/read` shape (`voltage`, `current`, `inputVoltage`, ...)
/// and the bridge status shape (`vout`, `iout`, `vin`, `is_simulation`).
pub fn decode_payload(body: &Value, last_known: &LastKnown, received_at: DateTime<Utc>) -> DecodedPayload {
    let empty = Map::new();
    let fields = body.as_object().unwrap_or_else(|| {
        tracing::debug!("Bridge payload is not an object, decoding defaults: {}", body);
        &empty
    });

    let voltage = number(fields, &["voltage", "vout"]).unwrap_or(last_known.voltage);
    let current = number(fields, &["current", "iout"]).unwrap_or(last_known.current);
    let power = number(fields, &["power"]).unwrap_or(voltage * current);
    let temperature = number(fields, &["temperature", "temp"]).unwrap_or(last_known.temperature);
    let input_voltage = number(fields, &["inputVoltage", "input_voltage", "vin"]);

    let mode = fields
        .get("mode")
        .and_then(Value::as_str)
        .and_then(DeviceMode::parse)
        .unwrap_or_default();

    let warnings = fields
        .get("warnings")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let timestamp = fields
        .get("timestamp")
        .and_then(parse_timestamp)
        .map_or(received_at, |stamped| stamped.min(received_at));

    let origin = match fields.get("is_simulation").and_then(Value::as_bool) {
        Some(true) => Origin::Simulated,
        _ => Origin::Real,
    };

    let sample = Sample::new(timestamp, voltage, current, origin)
        .with_power(power)
        .with_temperature(temperature)
        .with_mode(mode)
        .with_warnings(warnings)
        .with_input_voltage(input_voltage);

    DecodedPayload {
        sample,
        device_output_on: fields.get("output_on").and_then(Value::as_bool),
    }
}

/// First finite number found under any of `keys`; numeric strings are accepted.
fn number(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(|value| match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        })
        .filter(|v| v.is_finite())
}

/// Epoch milliseconds or an RFC 3339 string.
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            DateTime::from_timestamp_millis(millis)
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| t.with_timezone(&Utc)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(body: Value) -> DecodedPayload {
        decode_payload(&body, &LastKnown::default(), Utc::now())
    }

    #[test]
    fn test_full_read_payload() {
        let ts = Utc::now();
        let decoded = decode(json!({
            "timestamp": ts.timestamp_millis(),
            "voltage": 5.0,
            "current": 0.6,
            "power": 2.9,
            "temperature": 31.5,
            "mode": "load",
            "warnings": ["OTP"],
            "inputVoltage": 19.8
        }));

        let sample = decoded.sample;
        assert_eq!(sample.timestamp.timestamp_millis(), ts.timestamp_millis());
        assert_eq!(sample.voltage, 5.0);
        assert_eq!(sample.current, 0.6);
        assert_eq!(sample.power, 2.9);
        assert_eq!(sample.temperature, 31.5);
        assert_eq!(sample.mode, DeviceMode::Load);
        assert_eq!(sample.warnings, vec!["OTP".to_string()]);
        assert_eq!(sample.input_voltage, Some(19.8));
        assert_eq!(sample.origin, Origin::Real);
    }

    #[test]
    fn test_missing_fields_default() {
        let received_at = Utc::now();
        let last_known = LastKnown {
            voltage: 12.0,
            current: 1.0,
            temperature: 40.0,
        };
        let decoded = decode_payload(&json!({"current": "0.25"}), &last_known, received_at);

        let sample = decoded.sample;
        assert_eq!(sample.timestamp, received_at);
        assert_eq!(sample.voltage, 12.0);
        assert_eq!(sample.current, 0.25);
        assert!((sample.power - 3.0).abs() < 1e-12);
        assert_eq!(sample.temperature, 40.0);
        assert_eq!(sample.mode, DeviceMode::Standby);
        assert!(sample.warnings.is_empty());
        assert_eq!(sample.input_voltage, None);
        assert_eq!(decoded.device_output_on, None);
    }

    #[test]
    fn test_wrong_types_are_defaulted_not_rejected() {
        let decoded = decode(json!({
            "voltage": "abc",
            "current": null,
            "mode": 3,
            "warnings": "not a list",
            "timestamp": {"nested": true}
        }));

        assert_eq!(decoded.sample.voltage, 0.0);
        assert_eq!(decoded.sample.current, 0.0);
        assert_eq!(decoded.sample.mode, DeviceMode::Standby);
        assert!(decoded.sample.warnings.is_empty());
    }

    #[test]
    fn test_non_object_payload_decodes_to_defaults() {
        let decoded = decode(json!(["VOUT:1.0"]));
        assert_eq!(decoded.sample.voltage, 0.0);
        assert_eq!(decoded.sample.origin, Origin::Real);
    }

    #[test]
    fn test_null_read_decodes_to_defaults() {
        let received_at = Utc::now();
        let last_known = LastKnown {
            voltage: 4.0,
            current: 0.5,
            temperature: 30.0,
        };
        let decoded = decode_payload(&Value::Null, &last_known, received_at);
        assert_eq!(decoded.sample.timestamp, received_at);
        assert_eq!(decoded.sample.voltage, 4.0);
        assert_eq!(decoded.device_output_on, None);
    }

    #[test]
    fn test_future_timestamp_is_clamped_to_receive_time() {
        let received_at = Utc::now();
        let ahead = received_at + chrono::TimeDelta::hours(1);
        let decoded = decode_payload(
            &json!({"timestamp": ahead.timestamp_millis(), "voltage": 1.0}),
            &LastKnown::default(),
            received_at,
        );
        assert_eq!(decoded.sample.timestamp, received_at);
        assert_eq!(decoded.sample.voltage, 1.0);
    }

    #[test]
    fn test_bridge_status_shape() {
        let decoded = decode(json!({
            "vout": 3.3,
            "iout": 0.2,
            "vin": 12.1,
            "last_raw": "VOUT:3.30,IOUT:0.20,VIN:12.10",
            "connected": true,
            "output_on": true,
            "is_simulation": true
        }));

        assert_eq!(decoded.sample.voltage, 3.3);
        assert_eq!(decoded.sample.current, 0.2);
        assert_eq!(decoded.sample.input_voltage, Some(12.1));
        assert_eq!(decoded.sample.origin, Origin::Simulated);
        assert_eq!(decoded.device_output_on, Some(true));
    }

    #[test]
    fn test_rfc3339_timestamp() {
        let decoded = decode(json!({"timestamp": "2026-01-02T03:04:05Z", "voltage": 1.0}));
        assert_eq!(decoded.sample.timestamp.to_rfc3339(), "2026-01-02T03:04:05+00:00");
    }
}
