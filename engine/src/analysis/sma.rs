// Simple moving average over candle closes.
use shared::models::Candle;

pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        Self { period }
    }

    /// One value per candle; positions before the first full window are NaN.
    /// A zero period yields all NaN.
    pub fn calculate(&self, data: &[Candle]) -> Vec<f64> {
        if self.period == 0 || data.len() < self.period {
            return vec![f64::NAN; data.len()];
        }

        let mut results = vec![f64::NAN; self.period - 1];
        let mut sum: f64 = data.iter().take(self.period).map(|c| c.close).sum();
        results.push(sum / self.period as f64);

        for i in self.period..data.len() {
            sum = sum - data[i - self.period].close + data[i].close;
            results.push(sum / self.period as f64);
        }
        results
    }

    /// Average of the last full window, if there is one.
    pub fn latest(&self, data: &[Candle]) -> Option<f64> {
        self.calculate(data).last().copied().filter(|v| !v.is_nan())
    }
}
