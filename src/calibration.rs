//! Calibration engine for the INA219.
//!
//! The chip derives its CURRENT and POWER registers from the shunt voltage
//! and the CALIBRATION register, so the driver has to pick a current
//! resolution (the "current LSB"), turn it into the calibration word, and
//! remember both so raw counts can be scaled back into physical units.
//!
//! [`Calibration`] is a pure value: the three fixed presets and the custom
//! derivation only do arithmetic. Writing the result to the device is
//! [`crate::Ina219::apply_calibration`]'s job, which keeps the numeric core
//! testable without a bus.

use crate::register::config::{BusVoltageRange, Gain};

/// Scaling constant from the datasheet: the calibration word is
/// `trunc(0.04096 / (current_lsb * r_shunt))`.
const CALIBRATION_SCALE: f64 = 0.04096;

/// The POWER register LSB is chip-wired to 20 times the current LSB.
const POWER_LSB_RATIO: f32 = 20.0;

/// Full-scale count of the 15-bit signed CURRENT register.
const FULL_SCALE_COUNTS: f64 = 32767.0;

/// Count at 12-bit effective resolution, the coarse end of the usable range.
const TWELVE_BIT_COUNTS: f64 = 4096.0;

/// Upper bound on the round-LSB decade walk. Twelve decades resolves
/// expected currents down to tens of nanoamps, far below anything the 10 µV
/// shunt ADC step can actually produce.
const MAX_LSB_DECADES: u32 = 12;

/// Why a custom calibration request was rejected.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CalibrationError {
    /// Shunt resistance, voltages and expected current must all be positive.
    NonPositiveParameter,

    /// The round-LSB search ran out of decades without finding a nonzero
    /// integer part. Only reachable with absurdly small expected currents.
    UnresolvableCurrentLsb,
}

/// User-supplied inputs for [`Calibration::custom`].
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CalibrationParams {
    /// Shunt resistor value in ohms
    pub shunt_resistance: f32,
    /// Largest shunt voltage drop the design can produce, in volts
    pub max_shunt_voltage: f32,
    /// Largest bus voltage the design can produce, in volts
    pub max_bus_voltage: f32,
    /// Largest current expected through the shunt, in amps
    pub max_expected_current: f32,
}

/// Checkpoint values reported while a custom calibration is derived.
///
/// Delivered to the sink passed to [`Calibration::custom_traced`]; the plain
/// [`Calibration::custom`] entry point discards them.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TraceEvent {
    /// The validated inputs, plus the overflow bound they imply.
    Inputs {
        shunt_resistance: f32,
        max_shunt_voltage: f32,
        max_bus_voltage: f32,
        max_expected_current: f32,
        /// `max_shunt_voltage / shunt_resistance` - the current at which the
        /// shunt ADC itself saturates, regardless of calibration.
        max_possible_current: f32,
    },
    /// Admissible current-LSB range for the requested expected current.
    LsbBounds {
        /// 15-bit floor; choosing below this overflows the CURRENT register.
        min_lsb: f32,
        /// 12-bit ceiling; informational only, no clamp is applied.
        max_lsb: f32,
    },
    /// A rounding candidate produced by the decade walk.
    LsbCandidate { candidate: f32, decade: u32 },
    /// The final scale factors and calibration word.
    Resolved {
        current_lsb_ma: f32,
        power_lsb_mw: f32,
        value: u16,
    },
}

/// A complete calibration: scale factors plus the register-level values that
/// realize them.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    current_lsb_ma: f32,
    power_lsb_mw: f32,
    value: u16,
    bus_voltage_range: BusVoltageRange,
    gain: Gain,
}

impl Calibration {
    /// Calibration for up to 32 V bus voltage and 2 A of current across the
    /// stock 0.1 Ω shunt. 0.1 mA and 2 mW per count; counter overflow at
    /// 3.2767 A.
    pub fn range_32v_2a() -> Self {
        Self {
            current_lsb_ma: 0.1,
            power_lsb_mw: 2.0,
            value: 4096,
            bus_voltage_range: BusVoltageRange::Range32v,
            gain: Gain::X8,
        }
    }

    /// Calibration for up to 32 V and 1 A across the stock 0.1 Ω shunt.
    /// 0.04 mA and 0.8 mW per count; counter overflow at 1.31068 A.
    pub fn range_32v_1a() -> Self {
        Self {
            current_lsb_ma: 0.04,
            power_lsb_mw: 0.8,
            value: 10240,
            bus_voltage_range: BusVoltageRange::Range32v,
            gain: Gain::X8,
        }
    }

    /// Calibration with the highest preset precision (0.05 mA and 1 mW per
    /// count) at the expense of only supporting 16 V and 400 mA, across the
    /// stock 0.1 Ω shunt.
    pub fn range_16v_400ma() -> Self {
        Self {
            current_lsb_ma: 0.05,
            power_lsb_mw: 1.0,
            value: 8192,
            bus_voltage_range: BusVoltageRange::Range16v,
            gain: Gain::X1,
        }
    }

    /// Derives a calibration for arbitrary shunt/voltage/current targets.
    ///
    /// Use this instead of the presets when the board does not carry the
    /// stock 0.1 Ω shunt, or when the expected current differs enough from
    /// the presets to be worth the extra resolution.
    ///
    /// All inputs must be positive; nothing is written anywhere on failure.
    pub fn custom(params: &CalibrationParams) -> Result<Self, CalibrationError> {
        Self::custom_traced(params, &mut |_| {})
    }

    /// Like [`Calibration::custom`], reporting every derivation checkpoint
    /// to `trace` as a [`TraceEvent`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ina219_rs::calibration::{Calibration, CalibrationParams, TraceEvent};
    ///
    /// let params = CalibrationParams {
    ///     shunt_resistance: 0.1,
    ///     max_shunt_voltage: 0.32,
    ///     max_bus_voltage: 32.0,
    ///     max_expected_current: 2.0,
    /// };
    ///
    /// let cal = Calibration::custom_traced(&params, &mut |event| {
    ///     if let TraceEvent::Resolved { value, .. } = event {
    ///         assert_eq!(5851, value);
    ///     }
    /// }).unwrap();
    /// assert_eq!(5851, cal.value());
    /// ```
    pub fn custom_traced(
        params: &CalibrationParams,
        trace: &mut dyn FnMut(TraceEvent),
    ) -> Result<Self, CalibrationError> {
        if params.shunt_resistance <= 0.0
            || params.max_shunt_voltage <= 0.0
            || params.max_bus_voltage <= 0.0
            || params.max_expected_current <= 0.0
        {
            return Err(CalibrationError::NonPositiveParameter);
        }

        let max_possible_current = params.max_shunt_voltage / params.shunt_resistance;
        trace(TraceEvent::Inputs {
            shunt_resistance: params.shunt_resistance,
            max_shunt_voltage: params.max_shunt_voltage,
            max_bus_voltage: params.max_bus_voltage,
            max_expected_current: params.max_expected_current,
            max_possible_current,
        });

        // The numeric derivation runs in f64: the divider below frequently
        // lands on an exact integer, and f32 rounding can push it just under
        // the truncation boundary.
        let min_lsb = params.max_expected_current as f64 / FULL_SCALE_COUNTS;
        let max_lsb = params.max_expected_current as f64 / TWELVE_BIT_COUNTS;
        trace(TraceEvent::LsbBounds {
            min_lsb: min_lsb as f32,
            max_lsb: max_lsb as f32,
        });

        let current_lsb = round_current_lsb(min_lsb, trace)?;

        let value = (CALIBRATION_SCALE / (current_lsb * params.shunt_resistance as f64)) as u16;
        let current_lsb_ma = (current_lsb * 1000.0) as f32;
        let power_lsb_mw = POWER_LSB_RATIO * current_lsb_ma;
        trace(TraceEvent::Resolved { current_lsb_ma, power_lsb_mw, value });

        let bus_voltage_range = if params.max_bus_voltage > 16.0 {
            BusVoltageRange::Range32v
        } else {
            BusVoltageRange::Range16v
        };

        Ok(Self {
            current_lsb_ma,
            power_lsb_mw,
            value,
            bus_voltage_range,
            gain: gain_for_shunt_voltage(params.max_shunt_voltage),
        })
    }

    /// Current represented by one CURRENT register count, in milliamps.
    pub fn current_lsb_ma(&self) -> f32 { self.current_lsb_ma }

    /// Power represented by one POWER register count, in milliwatts.
    pub fn power_lsb_mw(&self) -> f32 { self.power_lsb_mw }

    /// The CALIBRATION register word realizing these scale factors.
    pub fn value(&self) -> u16 { self.value }

    /// Bus voltage range this calibration was sized for.
    pub fn bus_voltage_range(&self) -> BusVoltageRange { self.bus_voltage_range }

    /// Shunt PGA gain this calibration was sized for.
    pub fn gain(&self) -> Gain { self.gain }
}

/// Picks the smallest "round" decimal current LSB at or above `min_lsb`.
///
/// Scales `min_lsb` up a decade at a time until its integer part becomes
/// nonzero, rounds up to the next integer at that scale and rescales back,
/// e.g. 0.000061 A becomes 0.00007 A. Rounding always lands on the coarser
/// side so the expected current stays representable in the 15-bit register.
fn round_current_lsb(
    min_lsb: f64,
    trace: &mut dyn FnMut(TraceEvent),
) -> Result<f64, CalibrationError> {
    let mut scaled = min_lsb;
    let mut scale = 1.0_f64;

    for decade in 0..=MAX_LSB_DECADES {
        if scaled as u32 > 0 {
            let candidate = (scaled as u32 + 1) as f64 / scale;
            trace(TraceEvent::LsbCandidate { candidate: candidate as f32, decade });

            // Rescaling can land a hair below the bound it was derived
            // from; take one more integer step at the same scale if so.
            if candidate < min_lsb {
                return Ok((scaled as u32 + 2) as f64 / scale);
            }
            return Ok(candidate);
        }

        scaled *= 10.0;
        scale *= 10.0;
    }

    Err(CalibrationError::UnresolvableCurrentLsb)
}

/// Smallest PGA bracket that still contains the expected shunt voltage.
/// Brackets are boundary-inclusive: exactly 40 mV still fits gain ×1.
fn gain_for_shunt_voltage(max_shunt_voltage: f32) -> Gain {
    if max_shunt_voltage <= 0.04 {
        Gain::X1
    } else if max_shunt_voltage <= 0.08 {
        Gain::X2
    } else if max_shunt_voltage <= 0.16 {
        Gain::X4
    } else {
        Gain::X8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(
        shunt_resistance: f32,
        max_shunt_voltage: f32,
        max_bus_voltage: f32,
        max_expected_current: f32,
    ) -> CalibrationParams {
        CalibrationParams {
            shunt_resistance,
            max_shunt_voltage,
            max_bus_voltage,
            max_expected_current,
        }
    }

    #[test]
    fn preset_32v_2a() {
        let cal = Calibration::range_32v_2a();
        assert_eq!(4096, cal.value());
        assert_eq!(0.1, cal.current_lsb_ma());
        assert_eq!(2.0, cal.power_lsb_mw());
        assert_eq!(BusVoltageRange::Range32v, cal.bus_voltage_range());
        assert_eq!(Gain::X8, cal.gain());
    }

    #[test]
    fn preset_32v_1a() {
        let cal = Calibration::range_32v_1a();
        assert_eq!(10240, cal.value());
        assert_eq!(0.04, cal.current_lsb_ma());
        assert_eq!(0.8, cal.power_lsb_mw());
        assert_eq!(BusVoltageRange::Range32v, cal.bus_voltage_range());
        assert_eq!(Gain::X8, cal.gain());
    }

    #[test]
    fn preset_16v_400ma() {
        let cal = Calibration::range_16v_400ma();
        assert_eq!(8192, cal.value());
        assert_eq!(0.05, cal.current_lsb_ma());
        assert_eq!(1.0, cal.power_lsb_mw());
        assert_eq!(BusVoltageRange::Range16v, cal.bus_voltage_range());
        assert_eq!(Gain::X1, cal.gain());
    }

    #[test]
    fn power_lsb_is_twenty_times_current_lsb() {
        for cal in [
            Calibration::range_32v_2a(),
            Calibration::range_32v_1a(),
            Calibration::range_16v_400ma(),
            Calibration::custom(&params(0.1, 0.32, 32.0, 2.0)).unwrap(),
            Calibration::custom(&params(0.01, 0.04, 12.0, 3.5)).unwrap(),
            Calibration::custom(&params(0.5, 0.16, 5.0, 0.25)).unwrap(),
        ] {
            assert_eq!(20.0 * cal.current_lsb_ma(), cal.power_lsb_mw());
        }
    }

    #[test]
    fn custom_derivation_for_stock_shunt() {
        // min_lsb = 2 A / 32767 = 61.04 µA, rounded up to 70 µA, so the
        // divider gives trunc(0.04096 / (7e-5 * 0.1)) = 5851.
        let cal = Calibration::custom(&params(0.1, 0.32, 32.0, 2.0)).unwrap();
        assert!((cal.current_lsb_ma() - 0.07).abs() < 1e-6);
        assert!((cal.power_lsb_mw() - 1.4).abs() < 1e-5);
        assert_eq!(5851, cal.value());
        // Same range and gain selection as the 32V/2A preset
        assert_eq!(BusVoltageRange::Range32v, cal.bus_voltage_range());
        assert_eq!(Gain::X8, cal.gain());
    }

    #[test]
    fn custom_is_idempotent() {
        let p = params(0.1, 0.32, 32.0, 2.0);
        assert_eq!(Calibration::custom(&p).unwrap(), Calibration::custom(&p).unwrap());
    }

    #[test]
    fn round_lsb_matches_datasheet_example() {
        // "This selection allows for good resolution with a rounded LSB,
        // e.g. 0.000610 -> 0.000700"
        let lsb = round_current_lsb(0.000610, &mut |_| {}).unwrap();
        assert!((lsb - 0.0007).abs() < 1e-12);

        let lsb = round_current_lsb(0.000061, &mut |_| {}).unwrap();
        assert!((lsb - 0.00007).abs() < 1e-12);
    }

    #[test]
    fn round_lsb_never_selects_below_minimum() {
        for min_lsb in [3.05e-5, 6.1e-5, 1.0e-4, 2.44e-4, 0.9, 1.0, 12.3] {
            let lsb = round_current_lsb(min_lsb, &mut |_| {}).unwrap();
            assert!(lsb >= min_lsb, "{lsb} < {min_lsb}");
        }
    }

    #[test]
    fn round_lsb_is_bounded() {
        assert_eq!(
            Err(CalibrationError::UnresolvableCurrentLsb),
            round_current_lsb(3.0e-14, &mut |_| {})
        );
    }

    #[test]
    fn gain_brackets_are_boundary_inclusive() {
        assert_eq!(Gain::X1, gain_for_shunt_voltage(0.04));
        assert_eq!(Gain::X2, gain_for_shunt_voltage(0.0400001));
        assert_eq!(Gain::X2, gain_for_shunt_voltage(0.08));
        assert_eq!(Gain::X4, gain_for_shunt_voltage(0.0800001));
        assert_eq!(Gain::X4, gain_for_shunt_voltage(0.16));
        assert_eq!(Gain::X8, gain_for_shunt_voltage(0.1600001));
        assert_eq!(Gain::X8, gain_for_shunt_voltage(0.32));
    }

    #[test]
    fn bus_voltage_range_selection() {
        let cal = Calibration::custom(&params(0.1, 0.32, 16.0, 2.0)).unwrap();
        assert_eq!(BusVoltageRange::Range16v, cal.bus_voltage_range());

        let cal = Calibration::custom(&params(0.1, 0.32, 16.0001, 2.0)).unwrap();
        assert_eq!(BusVoltageRange::Range32v, cal.bus_voltage_range());
    }

    #[test]
    fn non_positive_parameters_are_rejected() {
        for p in [
            params(0.0, 0.32, 32.0, 2.0),
            params(-0.1, 0.32, 32.0, 2.0),
            params(0.1, 0.0, 32.0, 2.0),
            params(0.1, 0.32, 0.0, 2.0),
            params(0.1, 0.32, 32.0, 0.0),
            params(0.1, 0.32, 32.0, -2.0),
        ] {
            assert_eq!(
                Err(CalibrationError::NonPositiveParameter),
                Calibration::custom(&p)
            );
        }
    }

    #[test]
    fn trace_reports_derivation_checkpoints() {
        let mut events = std::vec::Vec::new();
        Calibration::custom_traced(&params(0.1, 0.32, 32.0, 2.0), &mut |e| events.push(e))
            .unwrap();

        assert!(matches!(
            events[0],
            TraceEvent::Inputs { max_possible_current, .. }
                if (max_possible_current - 3.2).abs() < 1e-6
        ));
        assert!(matches!(
            events[1],
            TraceEvent::LsbBounds { min_lsb, .. } if (min_lsb - 6.1037e-5).abs() < 1e-8
        ));
        assert!(matches!(
            events[2],
            TraceEvent::LsbCandidate { candidate, decade: 5 }
                if (candidate - 7.0e-5).abs() < 1e-10
        ));
        assert!(matches!(
            events[3],
            TraceEvent::Resolved { value: 5851, .. }
        ));
    }

    #[test]
    fn custom_rejects_nothing_at_the_overflow_edge() {
        // A caller expecting more current than the shunt can even produce is
        // accepted; the trace carries the saturation bound for inspection.
        let mut saturation = 0.0;
        Calibration::custom_traced(&params(0.1, 0.04, 16.0, 3.0), &mut |e| {
            if let TraceEvent::Inputs { max_possible_current, .. } = e {
                saturation = max_possible_current;
            }
        })
        .unwrap();
        assert!((saturation - 0.4).abs() < 1e-6);
    }
}
