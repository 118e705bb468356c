/// Outdoor temperature above which the supply target stays flat.
pub const CLAMP_ABOVE_C: f64 = 10.0;
pub const CLAMPED_TARGET_C: f64 = 33.0;

const SLOPE: f64 = -0.233333;
const INTERCEPT: f64 = 35.333333;

/// Heating-circuit supply target for an outdoor temperature.
///
/// The coefficients are the ones the boiler is configured with. They do not pass through the
/// curve's nominal reference points (-20 °C -> 15 °C, 40 °C -> 33 °C), and are kept as-is.
pub fn supply_target(outdoor_c: f64) -> f64 {
    if outdoor_c <= CLAMP_ABOVE_C {
        SLOPE * outdoor_c + INTERCEPT
    } else {
        CLAMPED_TARGET_C
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn linear_branch_below_clamp() {
        assert!(close(supply_target(-5.0), 36.5));
        assert!(close(supply_target(0.0), 35.333333));
        assert!(close(supply_target(-20.0), 40.0));
    }

    #[test]
    fn clamp_boundary_and_above() {
        assert!(close(supply_target(10.0), 33.0));
        assert_eq!(supply_target(15.0), 33.0);
        assert_eq!(supply_target(40.0), 33.0);
    }
}
