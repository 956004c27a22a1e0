//! Battery housekeeping and input debouncing, pure so it can be tested
//! on the host.

/// Thresholds in 10 mV steps, matching [`vbatt_x100`].
pub const LOW_BATTERY_THRESHOLD: u16 = 340;
pub const CRITICAL_BATTERY_THRESHOLD: u16 = 330;
pub const VUSB_THRESHOLD: u16 = 440;

/// The battery sense pin sits behind a 1:2 resistor divider so a full
/// cell stays inside the ADC reference.
pub const VBATT_DIVIDER: u16 = 2;

/// Ticks a button line must stay quiet before it is re-sampled.
pub const DEBOUNCE_TICKS: u8 = 2;

/// Ticks both volume buttons must be held to power the pi back up.
pub const POWER_ON_HOLD_TICKS: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerSource {
    /// Below the safe discharge floor; shut down now.
    CriticalBattery,
    LowBattery,
    Battery,
    /// VCC above what the cell can deliver, so USB must be attached.
    Vusb,
}

pub fn classify(vcc_x100: u16) -> PowerSource {
    if vcc_x100 >= VUSB_THRESHOLD {
        PowerSource::Vusb
    } else if vcc_x100 <= CRITICAL_BATTERY_THRESHOLD {
        PowerSource::CriticalBattery
    } else if vcc_x100 <= LOW_BATTERY_THRESHOLD {
        PowerSource::LowBattery
    } else {
        PowerSource::Battery
    }
}

/// Battery voltage in 10 mV steps from the volts seen at the sense pin,
/// undoing the divider attenuation. This is what [`classify`] expects.
pub fn vbatt_x100(pin_volts: f32) -> u16 {
    let x = pin_volts * VBATT_DIVIDER as f32 * 100.0;
    if x <= 0.0 {
        0
    } else {
        x as u16
    }
}

/// Temperature in tenths of a degree Celsius from the board sensor,
/// 500 mV at 0 C and 10 mV per degree.
pub fn temp_x10_from_volts(pin_volts: f32) -> i32 {
    ((pin_volts - 0.5) * 1000.0) as i32
}

/// Rail state of the pi, kept apart from the reportable power-on status
/// flag: the flag says "this chip cold-booted" until the pi acknowledges
/// it, while the rail can go up and down many times in between.
#[derive(Debug, Clone, Copy)]
pub struct PiRail {
    powered: bool,
    hold: u16,
}

impl PiRail {
    /// The pi rail comes up together with this chip.
    pub const fn new() -> Self {
        Self {
            powered: true,
            hold: 0,
        }
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    /// Rail cut, by request or by a critical battery.
    pub fn power_off(&mut self) {
        self.powered = false;
        self.hold = 0;
    }

    /// Called every tick with the combined state of the two volume
    /// buttons. Returns `true` on the tick a full hold completes and
    /// the rail should come back up; inert while the rail is powered.
    pub fn hold_tick(&mut self, both_held: bool) -> bool {
        if !both_held || self.powered {
            self.hold = 0;
            return false;
        }
        self.hold += 1;
        if self.hold == POWER_ON_HOLD_TICKS {
            self.powered = true;
            self.hold = 0;
            true
        } else {
            false
        }
    }
}

impl Default for PiRail {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-button debounce state.
///
/// The first edge on a quiet line is reported immediately and arms the
/// counter; [`Self::tick`] says when to re-sample the line, which catches
/// presses shorter than the debounce interval.
#[derive(Debug, Default, Clone, Copy)]
pub struct Debounce {
    ticks: u8,
}

impl Debounce {
    /// Quiet line, usable as a const initializer.
    pub const fn new() -> Self {
        Self { ticks: 0 }
    }

    /// Called on an edge. Returns whether the edge should be acted upon.
    pub fn edge(&mut self) -> bool {
        if self.ticks == 0 {
            self.ticks = DEBOUNCE_TICKS;
            true
        } else {
            false
        }
    }

    /// Called every tick. Returns `true` when the quiet period just
    /// expired and the line should be re-sampled.
    pub fn tick(&mut self) -> bool {
        if self.ticks > 0 {
            self.ticks -= 1;
            self.ticks == 0
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_brackets() {
        assert_eq!(classify(500), PowerSource::Vusb);
        assert_eq!(classify(VUSB_THRESHOLD), PowerSource::Vusb);
        assert_eq!(classify(400), PowerSource::Battery);
        assert_eq!(classify(LOW_BATTERY_THRESHOLD), PowerSource::LowBattery);
        assert_eq!(classify(335), PowerSource::LowBattery);
        assert_eq!(
            classify(CRITICAL_BATTERY_THRESHOLD),
            PowerSource::CriticalBattery
        );
        assert_eq!(classify(0), PowerSource::CriticalBattery);
    }

    #[test]
    fn every_band_reachable_from_the_sense_pin_range() {
        // the sense pin sees half the cell voltage, so 0..3.3 V at the
        // pin must span every band; a raw volts-times-100 reading never
        // got past the critical threshold
        assert_eq!(classify(vbatt_x100(1.65)), PowerSource::CriticalBattery);
        assert_eq!(classify(vbatt_x100(1.70)), PowerSource::LowBattery);
        assert_eq!(classify(vbatt_x100(1.85)), PowerSource::Battery);
        assert_eq!(classify(vbatt_x100(2.25)), PowerSource::Vusb);
        assert_eq!(vbatt_x100(0.0), 0);
    }

    #[test]
    fn temp_conversion_room_temperature() {
        // 750 mV at the sensor is 25.0 C
        assert_eq!(temp_x10_from_volts(0.75), 250);
        assert_eq!(temp_x10_from_volts(0.5), 0);
        assert!(temp_x10_from_volts(0.3) < 0);
    }

    #[test]
    fn sensor_reading_survives_the_status_encoding() {
        let mut estatus = crate::ExtendedStatus::default();
        estatus.set_temp_x10(temp_x10_from_volts(0.75));
        assert_eq!(estatus.temp_x10(), 250);
    }

    #[test]
    fn rail_hold_powers_up_only_while_off() {
        let mut rail = PiRail::new();
        assert!(rail.is_powered());
        // holding the buttons with the rail up does nothing
        for _ in 0..POWER_ON_HOLD_TICKS * 2 {
            assert!(!rail.hold_tick(true));
        }
        assert!(rail.is_powered());

        rail.power_off();
        assert!(!rail.is_powered());
        // released before the hold completes resets the counter
        for _ in 0..10 {
            assert!(!rail.hold_tick(true));
        }
        assert!(!rail.hold_tick(false));
        let mut ticks = 0;
        loop {
            ticks += 1;
            if rail.hold_tick(true) {
                break;
            }
        }
        assert_eq!(ticks, POWER_ON_HOLD_TICKS);
        assert!(rail.is_powered());
    }

    #[test]
    fn boot_flag_ack_leaves_the_rail_alone() {
        let mut rail = PiRail::new();
        let mut status = crate::Status::default();
        status.set_power_on(true);
        // the pi acknowledging the cold-boot flag is a pure report
        // change; the rail stays up and the hold stays inert
        status.set_power_on(false);
        assert!(rail.is_powered());
        for _ in 0..POWER_ON_HOLD_TICKS * 2 {
            assert!(!rail.hold_tick(true));
        }
        assert!(rail.is_powered());
    }

    #[test]
    fn debounce_swallows_bounces() {
        let mut d = Debounce::default();
        assert!(d.edge());
        // bounces inside the interval are ignored
        assert!(!d.edge());
        assert!(!d.edge());
        // interval expires after DEBOUNCE_TICKS ticks
        assert!(!d.tick());
        assert!(d.tick());
        // line is quiet again
        assert!(d.edge());
    }
}
