// Output mode domain model
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const MAX_VOLTAGE: f64 = 30.0;
pub const MAX_CURRENT: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum InvalidSetpoint {
    #[error("voltage must be a finite number, got {0}")]
    Voltage(f64),
    #[error("current must be a finite number, got {0}")]
    Current(f64),
}

/// Voltage/current target configured by the operator.
///
/// Values are clamped to the supply's limits (0-30 V, 0-5 A); non-finite
/// values are rejected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    pub voltage: f64,
    pub current: f64,
}

impl Setpoint {
    pub fn new(voltage: f64, current: f64) -> Result<Self, InvalidSetpoint> {
        Ok(Self {
            voltage: clamp_voltage(voltage)?,
            current: clamp_current(current)?,
        })
    }

    /// Apply a partial update, keeping the fields that are not supplied.
    pub fn updated(self, voltage: Option<f64>, current: Option<f64>) -> Result<Self, InvalidSetpoint> {
        Self::new(
            voltage.unwrap_or(self.voltage),
            current.unwrap_or(self.current),
        )
    }

    pub fn power(&self) -> f64 {
        self.voltage * self.current
    }
}

pub fn clamp_voltage(voltage: f64) -> Result<f64, InvalidSetpoint> {
    if !voltage.is_finite() {
        return Err(InvalidSetpoint::Voltage(voltage));
    }
    Ok(voltage.clamp(0.0, MAX_VOLTAGE))
}

pub fn clamp_current(current: f64) -> Result<f64, InvalidSetpoint> {
    if !current.is_finite() {
        return Err(InvalidSetpoint::Current(current));
    }
    Ok(current.clamp(0.0, MAX_CURRENT))
}

/// Settings for a charge profile (battery or mobile device).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileSettings {
    pub name: String,
    pub setpoint: Setpoint,
}

impl ProfileSettings {
    pub fn new(name: impl Into<String>, setpoint: Setpoint) -> Self {
        Self {
            name: name.into(),
            setpoint,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    Load,
    Battery,
    Mobile,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeKind::Load => "Load",
            ModeKind::Battery => "Battery charge",
            ModeKind::Mobile => "Mobile charge",
        };
        f.write_str(name)
    }
}

/// The output mode currently driving the supply. At most one is live.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    None,
    Load(Setpoint),
    Battery(ProfileSettings),
    Mobile(ProfileSettings),
}

impl OutputMode {
    pub fn kind(&self) -> Option<ModeKind> {
        match self {
            OutputMode::None => None,
            OutputMode::Load(_) => Some(ModeKind::Load),
            OutputMode::Battery(_) => Some(ModeKind::Battery),
            OutputMode::Mobile(_) => Some(ModeKind::Mobile),
        }
    }

    pub fn setpoint(&self) -> Option<Setpoint> {
        match self {
            OutputMode::None => None,
            OutputMode::Load(setpoint) => Some(*setpoint),
            OutputMode::Battery(profile) | OutputMode::Mobile(profile) => Some(profile.setpoint),
        }
    }

    pub fn setpoint_mut(&mut self) -> Option<&mut Setpoint> {
        match self {
            OutputMode::None => None,
            OutputMode::Load(setpoint) => Some(setpoint),
            OutputMode::Battery(profile) | OutputMode::Mobile(profile) => Some(&mut profile.setpoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setpoint_is_clamped_to_supply_limits() {
        let setpoint = Setpoint::new(42.0, -1.0).unwrap();
        assert_eq!(setpoint.voltage, MAX_VOLTAGE);
        assert_eq!(setpoint.current, 0.0);
    }

    #[test]
    fn test_setpoint_rejects_non_finite() {
        assert!(matches!(Setpoint::new(f64::NAN, 1.0), Err(InvalidSetpoint::Voltage(_))));
        assert!(matches!(Setpoint::new(5.0, f64::INFINITY), Err(InvalidSetpoint::Current(_))));
    }

    #[test]
    fn test_partial_update_keeps_other_field() {
        let setpoint = Setpoint::new(12.0, 1.5).unwrap();
        let updated = setpoint.updated(None, Some(2.0)).unwrap();
        assert_eq!(updated, Setpoint::new(12.0, 2.0).unwrap());
        assert!((updated.power() - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_mode_kind_and_setpoint() {
        let profile = ProfileSettings::new("18650", Setpoint::new(4.2, 1.0).unwrap());
        let mode = OutputMode::Battery(profile.clone());
        assert_eq!(mode.kind(), Some(ModeKind::Battery));
        assert_eq!(mode.setpoint(), Some(profile.setpoint));
        assert_eq!(OutputMode::None.setpoint(), None);
    }
}
