/// Ordered historical rainfall values, one per month, for a single district.
///
/// A series may be synthetically extended by tiling its observed values to
/// reach a usable training length. The extension introduces exact periodic
/// repetition, so `observed_len` keeps the genuinely observed prefix
/// distinguishable from the repeats.
#[derive(Debug, Clone, PartialEq)]
pub struct RainfallSeries {
    values: Vec<f64>,
    observed_len: usize,
}

impl RainfallSeries {
    /// Build a series from observed monthly values (mm).
    pub fn from_monthly(values: Vec<f64>) -> Self {
        let observed_len = values.len();
        RainfallSeries { values, observed_len }
    }

    /// Repeat the observed values `cycles` times.
    ///
    /// The result reports the same `observed_len` as the source; everything
    /// past that is tiled repetition, not measurement.
    pub fn tiled(&self, cycles: usize) -> Self {
        let observed = &self.values[..self.observed_len];
        let mut values = Vec::with_capacity(self.observed_len * cycles);
        for _ in 0..cycles {
            values.extend_from_slice(observed);
        }
        RainfallSeries {
            values,
            observed_len: self.observed_len,
        }
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Length of the genuinely observed prefix.
    pub fn observed_len(&self) -> usize {
        self.observed_len
    }

    /// True when the series carries tiled values past the observed prefix.
    pub fn is_extended(&self) -> bool {
        self.values.len() > self.observed_len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiling_extends_and_marks() {
        let monthly: Vec<f64> = (1..=12).map(|m| m as f64 * 10.0).collect();
        let series = RainfallSeries::from_monthly(monthly.clone());
        assert!(!series.is_extended());

        let extended = series.tiled(25);
        assert_eq!(extended.len(), 300);
        assert_eq!(extended.observed_len(), 12);
        assert!(extended.is_extended());

        // Tiled values repeat the observed cycle exactly.
        assert_eq!(&extended.values()[..12], &monthly[..]);
        assert_eq!(&extended.values()[288..], &monthly[..]);
    }

    #[test]
    fn test_single_cycle_is_identity() {
        let series = RainfallSeries::from_monthly(vec![1.0, 2.0, 3.0]);
        let tiled = series.tiled(1);
        assert_eq!(tiled, series);
    }
}
