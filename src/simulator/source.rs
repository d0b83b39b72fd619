use anyhow::{bail, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Generates temperatures in `[min, max]`, either as independent uniform
/// draws or exponentially smoothed: `v = (1 - alpha) * prev + alpha * draw`.
#[derive(Debug)]
pub struct TemperatureSource<R = StdRng> {
    min: f64,
    max: f64,
    smoothing: Option<f64>,
    last: Option<f64>,
    rng: R,
}

impl TemperatureSource<StdRng> {
    pub fn new(min: f64, max: f64, smoothing: Option<f64>) -> Result<Self> {
        Self::with_rng(min, max, smoothing, StdRng::from_entropy())
    }
}

impl<R: Rng> TemperatureSource<R> {
    pub fn with_rng(min: f64, max: f64, smoothing: Option<f64>, rng: R) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            bail!("temperature bounds must be finite with min < max (got {min}..{max})");
        }
        if let Some(alpha) = smoothing {
            if !(alpha > 0.0 && alpha < 1.0) {
                bail!("smoothing coefficient must be in (0, 1), got {alpha}");
            }
        }

        Ok(Self {
            min,
            max,
            smoothing,
            last: None,
            rng,
        })
    }

    pub fn next_value(&mut self) -> f64 {
        let draw = self.rng.gen_range(self.min..=self.max);
        let value = match (self.smoothing, self.last) {
            (Some(alpha), Some(prev)) => (1.0 - alpha) * prev + alpha * draw,
            _ => draw,
        };
        self.last = Some(value);
        value
    }
}

/// Text frame carrying one reading.
pub fn format_frame(value: f64) -> String {
    format!("{value:.6}\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(smoothing: Option<f64>) -> TemperatureSource {
        TemperatureSource::with_rng(10.0, 40.0, smoothing, StdRng::seed_from_u64(7)).unwrap()
    }

    #[test]
    fn uniform_values_stay_in_bounds() {
        let mut source = seeded(None);
        for _ in 0..1000 {
            let value = source.next_value();
            assert!((10.0..=40.0).contains(&value));
        }
    }

    #[test]
    fn smoothed_values_follow_the_recurrence() {
        let alpha = 0.2;
        let mut smoothed = seeded(Some(alpha));
        let mut raw = seeded(None);

        let first = smoothed.next_value();
        assert_eq!(first, raw.next_value());

        let mut prev = first;
        for _ in 0..50 {
            let draw = raw.next_value();
            let value = smoothed.next_value();
            assert!((value - ((1.0 - alpha) * prev + alpha * draw)).abs() < 1e-9);
            assert!((10.0..=40.0).contains(&value));
            prev = value;
        }
    }

    #[test]
    fn smoothing_reduces_step_size() {
        let mut smoothed = seeded(Some(0.1));
        let mut raw = seeded(None);

        let steps = |source: &mut TemperatureSource| {
            let mut prev = source.next_value();
            (0..500)
                .map(|_| {
                    let value = source.next_value();
                    let step = (value - prev).abs();
                    prev = value;
                    step
                })
                .sum::<f64>()
        };

        assert!(steps(&mut smoothed) < steps(&mut raw));
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(TemperatureSource::new(40.0, 10.0, None).is_err());
        assert!(TemperatureSource::new(10.0, 10.0, None).is_err());
        assert!(TemperatureSource::new(f64::NAN, 10.0, None).is_err());
        assert!(TemperatureSource::new(10.0, 40.0, Some(0.0)).is_err());
        assert!(TemperatureSource::new(10.0, 40.0, Some(1.0)).is_err());
        assert!(TemperatureSource::new(10.0, 40.0, Some(0.5)).is_ok());
    }

    #[test]
    fn frames_are_newline_terminated_fixed_point() {
        assert_eq!(format_frame(21.5), "21.500000\n");
        assert_eq!(format_frame(-0.125), "-0.125000\n");
    }
}
