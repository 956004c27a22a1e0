use serde_derive::{Deserialize, Serialize};

/// Live companion state the pi polls on every attention interrupt.
///
/// Setters for the user inputs report whether the stored value changed so
/// the caller knows when to pull the attention line; the power flags are
/// plain setters since the companion raises those interrupts itself.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    status: u8,
    joy_x: u8,
    joy_y: u8,
    photores: u8,
}

impl Status {
    const BTN_LVOL: u8 = 1 << 0;
    const BTN_RVOL: u8 = 1 << 1;
    const BTN_JOY: u8 = 1 << 2;
    const MIC_LOUD: u8 = 1 << 3;
    const POWER_ON: u8 = 1 << 4;
    const CHARGING: u8 = 1 << 5;
    const VUSB: u8 = 1 << 6;
    const LOW_BATT: u8 = 1 << 7;

    pub fn power_on(&self) -> bool {
        self.status & Self::POWER_ON != 0
    }

    pub fn charging(&self) -> bool {
        self.status & Self::CHARGING != 0
    }

    pub fn vusb(&self) -> bool {
        self.status & Self::VUSB != 0
    }

    pub fn low_battery(&self) -> bool {
        self.status & Self::LOW_BATT != 0
    }

    pub fn set_power_on(&mut self, value: bool) {
        self.set_or_clear(Self::POWER_ON, value);
    }

    pub fn set_charging(&mut self, value: bool) {
        self.set_or_clear(Self::CHARGING, value);
    }

    pub fn set_vusb(&mut self, value: bool) {
        self.set_or_clear(Self::VUSB, value);
    }

    pub fn set_low_battery(&mut self, value: bool) {
        self.set_or_clear(Self::LOW_BATT, value);
    }

    pub fn mic_loud(&self) -> bool {
        self.status & Self::MIC_LOUD != 0
    }

    #[must_use]
    pub fn update_mic_loud(&mut self, value: bool) -> bool {
        self.check_set_or_clear(Self::MIC_LOUD, value)
    }

    pub fn btn_left_volume(&self) -> bool {
        self.status & Self::BTN_LVOL != 0
    }

    pub fn btn_right_volume(&self) -> bool {
        self.status & Self::BTN_RVOL != 0
    }

    pub fn btn_joystick(&self) -> bool {
        self.status & Self::BTN_JOY != 0
    }

    #[must_use]
    pub fn update_btn_left_volume(&mut self, value: bool) -> bool {
        self.check_set_or_clear(Self::BTN_LVOL, value)
    }

    #[must_use]
    pub fn update_btn_right_volume(&mut self, value: bool) -> bool {
        self.check_set_or_clear(Self::BTN_RVOL, value)
    }

    #[must_use]
    pub fn update_btn_joystick(&mut self, value: bool) -> bool {
        self.check_set_or_clear(Self::BTN_JOY, value)
    }

    pub fn joy_x(&self) -> u8 {
        self.joy_x
    }

    pub fn joy_y(&self) -> u8 {
        self.joy_y
    }

    #[must_use]
    pub fn update_joy_x(&mut self, value: u8) -> bool {
        let changed = self.joy_x != value;
        self.joy_x = value;
        changed
    }

    #[must_use]
    pub fn update_joy_y(&mut self, value: u8) -> bool {
        let changed = self.joy_y != value;
        self.joy_y = value;
        changed
    }

    pub fn photores(&self) -> u8 {
        self.photores
    }

    #[must_use]
    pub fn update_photores(&mut self, value: u8) -> bool {
        let changed = self.photores != value;
        self.photores = value;
        changed
    }

    fn set_or_clear(&mut self, mask: u8, value: bool) {
        if value {
            self.status |= mask;
        } else {
            self.status &= !mask;
        }
    }

    fn check_set_or_clear(&mut self, mask: u8, value: bool) -> bool {
        let changed = (self.status & mask != 0) != value;
        self.set_or_clear(mask, value);
        changed
    }
}

/// Slow-changing state and settings, polled on demand rather than on
/// every interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtendedStatus {
    settings: u8,
    vcc: u8,
    batt: u8,
    temp: u8,
    mic_threshold: u8,
    brightness: u8,
}

impl Default for ExtendedStatus {
    fn default() -> Self {
        Self {
            settings: 0,
            vcc: 0,
            batt: 0,
            temp: 0,
            mic_threshold: 255,
            brightness: 64,
        }
    }
}

impl ExtendedStatus {
    const IRQ_PHOTORES: u8 = 1 << 0;
    const IRQ_MIC: u8 = 1 << 1;

    pub fn irq_photores(&self) -> bool {
        self.settings & Self::IRQ_PHOTORES != 0
    }

    pub fn irq_mic(&self) -> bool {
        self.settings & Self::IRQ_MIC != 0
    }

    pub fn set_irq_photores(&mut self, value: bool) {
        if value {
            self.settings |= Self::IRQ_PHOTORES;
        } else {
            self.settings &= !Self::IRQ_PHOTORES;
        }
    }

    pub fn set_irq_mic(&mut self, value: bool) {
        if value {
            self.settings |= Self::IRQ_MIC;
        } else {
            self.settings &= !Self::IRQ_MIC;
        }
    }

    /// VCC in 10 mV steps (battery, or USB when attached). Stored in 20 mV
    /// steps internally, so readings top out at 5.1 V.
    pub fn vcc(&self) -> u16 {
        self.vcc as u16 * 2
    }

    pub fn set_vcc(&mut self, v_x100: u16) {
        self.vcc = (v_x100 / 2).min(255) as u8;
    }

    /// Battery voltage in 10 mV steps, same encoding as [`Self::vcc`].
    pub fn batt(&self) -> u16 {
        self.batt as u16 * 2
    }

    pub fn set_batt(&mut self, v_x100: u16) {
        self.batt = (v_x100 / 2).min(255) as u8;
    }

    /// Temperature in tenths of a degree Celsius.
    ///
    /// -200 = -20.0C or less, 0 = 0C, 1075 = 107.5C or more; half-degree
    /// resolution.
    pub fn temp_x10(&self) -> i16 {
        -200 + (self.temp as i16) * 5
    }

    pub fn set_temp_x10(&mut self, t_x10: i32) {
        self.temp = if t_x10 <= -200 {
            0
        } else if t_x10 >= 1080 {
            255
        } else {
            ((t_x10 + 200) / 5) as u8
        };
    }

    pub fn mic_threshold(&self) -> u8 {
        self.mic_threshold
    }

    pub fn set_mic_threshold(&mut self, value: u8) {
        self.mic_threshold = value;
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn set_brightness(&mut self, value: u8) {
        self.brightness = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_updates_report_change() {
        let mut status = Status::default();
        assert!(status.update_btn_left_volume(true));
        assert!(status.btn_left_volume());
        // same value again is not a change
        assert!(!status.update_btn_left_volume(true));
        assert!(status.update_btn_left_volume(false));
        assert!(!status.btn_left_volume());
    }

    #[test]
    fn power_flags_are_independent() {
        let mut status = Status::default();
        status.set_power_on(true);
        status.set_charging(true);
        status.set_low_battery(true);
        status.set_charging(false);
        assert!(status.power_on());
        assert!(!status.charging());
        assert!(status.low_battery());
        assert!(!status.vusb());
    }

    #[test]
    fn joystick_updates_report_change() {
        let mut status = Status::default();
        assert!(status.update_joy_x(128));
        assert!(!status.update_joy_x(128));
        assert!(status.update_joy_y(1));
        assert_eq!((status.joy_x(), status.joy_y()), (128, 1));
    }

    #[test]
    fn temp_encoding_clamps_and_rounds() {
        let mut estatus = ExtendedStatus::default();
        estatus.set_temp_x10(-500);
        assert_eq!(estatus.temp_x10(), -200);
        estatus.set_temp_x10(0);
        assert_eq!(estatus.temp_x10(), 0);
        estatus.set_temp_x10(217); // 21.7C rounds down to 21.5C
        assert_eq!(estatus.temp_x10(), 215);
        estatus.set_temp_x10(2000);
        assert_eq!(estatus.temp_x10(), 1075);
    }

    #[test]
    fn vcc_encoding_is_20mv_steps() {
        let mut estatus = ExtendedStatus::default();
        estatus.set_vcc(333);
        assert_eq!(estatus.vcc(), 332);
        estatus.set_vcc(4000); // above encodable range
        assert_eq!(estatus.vcc(), 510);
    }

    #[test]
    fn defaults_match_the_companion_boot_state() {
        let estatus = ExtendedStatus::default();
        assert_eq!(estatus.mic_threshold(), 255);
        assert_eq!(estatus.brightness(), 64);
        assert!(!estatus.irq_mic());
        assert!(!estatus.irq_photores());
    }
}
