// Mode arbiter - Owns the single active output mode
use crate::domain::output_mode::{InvalidSetpoint, ModeKind, OutputMode, Setpoint};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{active} mode is already running; stop it before starting {requested} mode")]
pub struct ModeConflict {
    pub active: ModeKind,
    pub requested: ModeKind,
}

#[derive(Debug, Default)]
pub struct ModeArbiter {
    active: OutputMode,
}

impl ModeArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> &OutputMode {
        &self.active
    }

    /// Start `mode`. Re-starting the active kind is accepted and refreshes its
    /// settings; starting a different kind while one is live is rejected and
    /// leaves state untouched. Requesting `OutputMode::None` changes nothing.
    pub fn request_start(&mut self, mode: OutputMode) -> Result<(), ModeConflict> {
        let Some(requested) = mode.kind() else {
            return Ok(());
        };
        if let Some(active) = self.active.kind() {
            if active != requested {
                return Err(ModeConflict { active, requested });
            }
        }
        self.active = mode;
        Ok(())
    }

    /// Clear the active mode and return what was running.
    pub fn stop(&mut self) -> OutputMode {
        std::mem::take(&mut self.active)
    }

    /// Update the active mode's setpoint. Returns the new setpoint, or `None`
    /// when no mode is active.
    pub fn update_setpoint(
        &mut self,
        voltage: Option<f64>,
        current: Option<f64>,
    ) -> Result<Option<Setpoint>, InvalidSetpoint> {
        let Some(setpoint) = self.active.setpoint_mut() else {
            return Ok(None);
        };
        *setpoint = setpoint.updated(voltage, current)?;
        Ok(Some(*setpoint))
    }

    /// `voltage x current` of the active settings, or 0 with no mode active.
    pub fn compute_setpoint_power(&self) -> f64 {
        self.active.setpoint().map(|s| s.power()).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::output_mode::ProfileSettings;

    fn profile(name: &str, voltage: f64, current: f64) -> ProfileSettings {
        ProfileSettings::new(name, Setpoint::new(voltage, current).unwrap())
    }

    #[test]
    fn test_second_mode_is_rejected_and_state_kept() {
        let mut arbiter = ModeArbiter::new();
        let battery = profile("li-ion", 4.2, 1.0);

        assert!(arbiter.request_start(OutputMode::Battery(battery.clone())).is_ok());
        let err = arbiter
            .request_start(OutputMode::Mobile(profile("phone", 5.0, 2.0)))
            .unwrap_err();

        assert_eq!(err.active, ModeKind::Battery);
        assert_eq!(err.requested, ModeKind::Mobile);
        assert_eq!(arbiter.active(), &OutputMode::Battery(battery));
    }

    #[test]
    fn test_stop_allows_a_different_mode() {
        let mut arbiter = ModeArbiter::new();
        let load = OutputMode::Load(Setpoint::new(12.0, 1.0).unwrap());

        assert!(arbiter.request_start(load.clone()).is_ok());
        assert_eq!(arbiter.stop(), load);
        assert!(arbiter
            .request_start(OutputMode::Mobile(profile("phone", 5.0, 2.0)))
            .is_ok());
    }

    #[test]
    fn test_restarting_same_kind_refreshes_settings() {
        let mut arbiter = ModeArbiter::new();
        arbiter
            .request_start(OutputMode::Load(Setpoint::new(12.0, 1.0).unwrap()))
            .unwrap();
        arbiter
            .request_start(OutputMode::Load(Setpoint::new(5.0, 2.0).unwrap()))
            .unwrap();

        assert_eq!(arbiter.active().setpoint(), Some(Setpoint::new(5.0, 2.0).unwrap()));
        assert!((arbiter.compute_setpoint_power() - 10.0).abs() < 1e-12);
    }

    #[test]
    fn test_stop_when_idle_is_noop() {
        let mut arbiter = ModeArbiter::new();
        assert_eq!(arbiter.stop(), OutputMode::None);
        assert_eq!(arbiter.stop(), OutputMode::None);
        assert_eq!(arbiter.compute_setpoint_power(), 0.0);
    }

    #[test]
    fn test_update_setpoint_targets_active_mode() {
        let mut arbiter = ModeArbiter::new();
        assert_eq!(arbiter.update_setpoint(Some(3.0), None), Ok(None));

        arbiter
            .request_start(OutputMode::Load(Setpoint::new(12.0, 1.0).unwrap()))
            .unwrap();
        let updated = arbiter.update_setpoint(None, Some(0.5)).unwrap();
        assert_eq!(updated, Some(Setpoint::new(12.0, 0.5).unwrap()));
        assert!((arbiter.compute_setpoint_power() - 6.0).abs() < 1e-12);
    }
}
