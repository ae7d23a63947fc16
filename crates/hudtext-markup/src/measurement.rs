//! Numeric tag parameters with units.
//!
//! Measurement tags (`size`, `line-height`) accept a number followed by an
//! optional unit suffix:
//!
//! - bare or `px`: pixels
//! - `%`: percentage of a tag-specific base
//! - `e` or `em`: ems
//!
//! The value may be wrapped in double quotes. Anything else is rejected and
//! the tag is emitted literally.

use crate::metrics::LayoutMetrics;

/// The unit a [`Measurement`] was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasurementUnit {
    Pixels,
    Percentage,
    Ems,
}

/// A parsed `(value, unit)` pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    pub value: f32,
    pub unit: MeasurementUnit,
}

impl Measurement {
    /// Parses a tag parameter such as `50%`, `1.5em` or `"20"`.
    ///
    /// Returns `None` for anything that is not a finite number with a
    /// supported unit.
    pub fn parse(param: &str) -> Option<Self> {
        let param = strip_quotes(param.trim());

        let (number, unit) = if let Some(n) = param.strip_suffix('%') {
            (n, MeasurementUnit::Percentage)
        } else if let Some(n) = param.strip_suffix("em") {
            (n, MeasurementUnit::Ems)
        } else if let Some(n) = param.strip_suffix('e') {
            (n, MeasurementUnit::Ems)
        } else if let Some(n) = param.strip_suffix("px") {
            (n, MeasurementUnit::Pixels)
        } else {
            (param, MeasurementUnit::Pixels)
        };

        let number = number.trim_end();
        let well_formed = !number.is_empty()
            && number
                .bytes()
                .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+'));
        if !well_formed {
            return None;
        }

        let value: f32 = number.parse().ok()?;
        value.is_finite().then_some(Self { value, unit })
    }

    /// Converts to pixels. `percent_base` is what `100%` means for the tag
    /// being handled.
    pub fn to_pixels(self, percent_base: f32, metrics: &LayoutMetrics) -> f32 {
        match self.unit {
            MeasurementUnit::Pixels => self.value,
            MeasurementUnit::Percentage => self.value / 100.0 * percent_base,
            MeasurementUnit::Ems => self.value * metrics.ems_to_pixels,
        }
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(s: &str) -> (f32, MeasurementUnit) {
        let m = Measurement::parse(s).unwrap_or_else(|| panic!("{s:?} should parse"));
        (m.value, m.unit)
    }

    #[test]
    fn bare_number_is_pixels() {
        assert_eq!(parsed("20"), (20.0, MeasurementUnit::Pixels));
        assert_eq!(parsed("12.5px"), (12.5, MeasurementUnit::Pixels));
    }

    #[test]
    fn percent_and_ems() {
        assert_eq!(parsed("50%"), (50.0, MeasurementUnit::Percentage));
        assert_eq!(parsed("2em"), (2.0, MeasurementUnit::Ems));
        assert_eq!(parsed("1.5e"), (1.5, MeasurementUnit::Ems));
    }

    #[test]
    fn quoted_values() {
        assert_eq!(parsed("\"30\""), (30.0, MeasurementUnit::Pixels));
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "px", "abc", "10pt", "1.2.3", "inf", "NaN", "%", "--1"] {
            assert!(Measurement::parse(bad).is_none(), "{bad:?} should not parse");
        }
    }

    #[test]
    fn conversion_uses_tag_base_for_percentages() {
        let metrics = LayoutMetrics::default();
        let half = Measurement::parse("50%").unwrap();
        assert_eq!(half.to_pixels(40.0, &metrics), 20.0);

        let two_em = Measurement::parse("2em").unwrap();
        assert_eq!(two_em.to_pixels(40.0, &metrics), 2.0 * metrics.ems_to_pixels);
    }
}
