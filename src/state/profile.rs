//! Mapping from vertical rate to audio parameters

use crate::config::VarioSettings;

/// Beep length (and gap) at the lift threshold, in seconds
pub const BASE_BEEP_SECS: f32 = 0.3;

/// Linear interpolation with `t` clamped to `[0, 1]`
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Position of `value` between `a` and `b`, clamped to `[0, 1]`
///
/// Returns 0 when `a == b`.
pub(crate) fn inverse_lerp(a: f32, b: f32, value: f32) -> f32 {
    if a == b {
        return 0.0;
    }
    ((value - a) / (b - a)).clamp(0.0, 1.0)
}

/// Audio parameters of one beep episode in lift
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LiftProfile {
    /// Normalized climb intensity in `[0, 1]`
    pub t: f32,
    /// Playback pitch of the beep
    pub pitch: f32,
    /// Length of the beep, and of the silence after it, in seconds
    pub beep_duration: f32,
}

impl LiftProfile {
    pub fn for_rate(settings: &VarioSettings, rate: f32) -> Self {
        let t = inverse_lerp(settings.lift_threshold, settings.lift_max, rate);
        Self {
            t,
            pitch: lerp(1.0, settings.lift_max_pitch, t),
            beep_duration: lerp(BASE_BEEP_SECS, BASE_BEEP_SECS / settings.lift_max_beep_rate, t),
        }
    }
}

/// Pitch of the continuous tone for a sink rate
pub fn sink_pitch(settings: &VarioSettings, rate: f32) -> f32 {
    let t = inverse_lerp(settings.sink_threshold, settings.sink_max, rate);
    lerp(1.0, settings.sink_min_pitch, t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_mid_lift() {
        let profile = LiftProfile::for_rate(&VarioSettings::default(), 10.0);
        assert!(close(profile.t, 0.5));
        assert!(close(profile.pitch, 1.25));
        assert!(close(profile.beep_duration, 0.225));
    }

    #[test]
    fn test_lift_above_max_saturates() {
        let settings = VarioSettings::default();
        for rate in [15.0, 15.1, 40.0, 1.0e6] {
            let profile = LiftProfile::for_rate(&settings, rate);
            assert_eq!(profile.t, 1.0);
            assert_eq!(profile.pitch, settings.lift_max_pitch);
            assert!(close(profile.beep_duration, BASE_BEEP_SECS / settings.lift_max_beep_rate));
        }
    }

    #[test]
    fn test_sink_pitch() {
        let settings = VarioSettings::default();
        assert_eq!(sink_pitch(&settings, -20.0), 0.5);
        assert!(close(sink_pitch(&settings, -10.0), 0.75));
        assert_eq!(sink_pitch(&settings, -5.0), 1.0);
    }

    #[test]
    fn test_inverse_lerp_empty_span() {
        assert_eq!(inverse_lerp(3.0, 3.0, 7.0), 0.0);
    }
}
