use serde_derive::{Deserialize, Serialize};

/// Wall clock kept by the companion while the pi is powered down.
///
/// Years count from 2000 so the whole clock marshals into six bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateTime {
    year: u8,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl Default for DateTime {
    fn default() -> Self {
        Self {
            year: 0,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
        }
    }
}

impl DateTime {
    /// `year` is the full year (2000..=2255). Returns `None` for a date
    /// that does not exist.
    pub fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Option<Self> {
        if !(2000..=2255).contains(&year)
            || !(1..=12).contains(&month)
            || day == 0
            || day > days_in_month(year, month)
            || hour > 23
            || minute > 59
            || second > 59
        {
            return None;
        }
        Some(Self {
            year: (year - 2000) as u8,
            month,
            day,
            hour,
            minute,
            second,
        })
    }

    pub fn year(&self) -> u16 {
        2000 + self.year as u16
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    /// Advances the clock by one second, rolling over minutes, hours,
    /// days, months and years as needed.
    pub fn second_tick(&mut self) {
        self.second += 1;
        if self.second < 60 {
            return;
        }
        self.second = 0;
        self.minute += 1;
        if self.minute < 60 {
            return;
        }
        self.minute = 0;
        self.hour += 1;
        if self.hour < 24 {
            return;
        }
        self.hour = 0;
        self.day += 1;
        if self.day <= days_in_month(self.year(), self.month) {
            return;
        }
        self.day = 1;
        self.month += 1;
        if self.month <= 12 {
            return;
        }
        self.month = 1;
        self.year = self.year.wrapping_add(1);
    }
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        _ => 28,
    }
}

fn is_leap_year(year: u16) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_second() {
        let mut t = DateTime::new(2023, 6, 15, 12, 30, 58).unwrap();
        t.second_tick();
        assert_eq!(t, DateTime::new(2023, 6, 15, 12, 30, 59).unwrap());
    }

    #[test]
    fn midnight_rollover() {
        let mut t = DateTime::new(2023, 6, 30, 23, 59, 59).unwrap();
        t.second_tick();
        assert_eq!(t, DateTime::new(2023, 7, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn new_year_rollover() {
        let mut t = DateTime::new(2023, 12, 31, 23, 59, 59).unwrap();
        t.second_tick();
        assert_eq!(t, DateTime::new(2024, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn leap_february() {
        let mut t = DateTime::new(2024, 2, 28, 23, 59, 59).unwrap();
        t.second_tick();
        assert_eq!(t, DateTime::new(2024, 2, 29, 0, 0, 0).unwrap());
        // 2100 is not a leap year
        let mut t = DateTime::new(2100, 2, 28, 23, 59, 59).unwrap();
        t.second_tick();
        assert_eq!(t, DateTime::new(2100, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn rejects_nonexistent_dates() {
        assert!(DateTime::new(2023, 2, 29, 0, 0, 0).is_none());
        assert!(DateTime::new(2023, 13, 1, 0, 0, 0).is_none());
        assert!(DateTime::new(1999, 1, 1, 0, 0, 0).is_none());
        assert!(DateTime::new(2023, 1, 1, 24, 0, 0).is_none());
    }
}
