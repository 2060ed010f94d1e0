//! Technical indicators feeding the trade-signal engine's context flags
//! (§4.6: "RSI regime, MACD crossover, Bollinger squeeze"). Formulas and
//! default periods mirror the reference feature engineer: RSI/ATR period 14,
//! MACD 12/26/9, Bollinger 20-period/2-sigma.
//!
//! Every function takes closes (and, for ATR, highs/lows) ordered oldest to
//! newest — the caller is responsible for reversing `Store::price_bars`'s
//! newest-first rows before calling in here.

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEV: f64 = 2.0;
pub const ATR_PERIOD: usize = 14;

/// Simple moving average of the trailing `period` values (or fewer, if the
/// series is shorter — matches the reference `min_periods=1` rolling mean).
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let window = &values[values.len().saturating_sub(period)..];
    Some(window.iter().sum::<f64>() / window.len() as f64)
}

/// Sample standard deviation (`ddof=1`) of the trailing `period` values.
fn trailing_stddev(values: &[f64], period: usize) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let window = &values[values.len().saturating_sub(period)..];
    if window.len() < 2 {
        return Some(0.0);
    }
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window.len() - 1) as f64;
    Some(variance.sqrt())
}

/// Exponential moving average series, `span`-style with `adjust=False`:
/// `ema[0] = values[0]`, `ema[i] = alpha * values[i] + (1 - alpha) * ema[i-1]`.
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut series = Vec::with_capacity(values.len());
    series.push(values[0]);
    for &value in &values[1..] {
        let prev = *series.last().unwrap();
        series.push(alpha * value + (1.0 - alpha) * prev);
    }
    series
}

/// Latest RSI value, `50.0` (neutral) while fewer than `period` deltas have
/// accumulated or the average loss is zero — matches the reference's
/// `fillna(50)`.
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if closes.len() <= period {
        return 50.0;
    }
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = deltas.iter().map(|d| d.max(0.0)).collect();
    let losses: Vec<f64> = deltas.iter().map(|d| (-d).max(0.0)).collect();

    if gains.len() < period {
        return 50.0;
    }
    let avg_gain = gains[gains.len() - period..].iter().sum::<f64>() / period as f64;
    let avg_loss = losses[losses.len() - period..].iter().sum::<f64>() / period as f64;

    if avg_loss == 0.0 {
        return 50.0;
    }
    let rs = avg_gain / avg_loss;
    100.0 - (100.0 / (1.0 + rs))
}

/// `(macd_line, signal_line, histogram)` at the two most recent points, so
/// callers can detect a histogram sign crossover from `[previous, latest]`.
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<(f64, f64, f64, f64)> {
    if closes.len() < 2 {
        return None;
    }
    let ema_fast = ema_series(closes, fast);
    let ema_slow = ema_series(closes, slow);
    let macd_line: Vec<f64> = ema_fast.iter().zip(ema_slow.iter()).map(|(f, s)| f - s).collect();
    let signal_line = ema_series(&macd_line, signal);
    let histogram: Vec<f64> = macd_line.iter().zip(signal_line.iter()).map(|(m, s)| m - s).collect();

    let n = histogram.len();
    Some((macd_line[n - 1], signal_line[n - 1], histogram[n - 1], histogram[n - 2]))
}

/// `(upper, middle, lower, bandwidth)` where `bandwidth := (upper - lower) / middle`.
pub fn bollinger_bands(closes: &[f64], period: usize, std_dev: f64) -> Option<(f64, f64, f64, f64)> {
    let middle = sma(closes, period)?;
    let std = trailing_stddev(closes, period)?;
    let upper = middle + std * std_dev;
    let lower = middle - std * std_dev;
    let bandwidth = if middle != 0.0 { (upper - lower) / middle } else { 0.0 };
    Some((upper, middle, lower, bandwidth))
}

/// Latest ATR: a trailing simple mean of true range over `period` bars
/// (or fewer, matching `min_periods=1`).
pub fn atr(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Option<f64> {
    if highs.len() != lows.len() || highs.len() != closes.len() || highs.is_empty() {
        return None;
    }
    let mut true_ranges = Vec::with_capacity(highs.len());
    for i in 0..highs.len() {
        let hl = highs[i] - lows[i];
        let tr = if i == 0 {
            hl
        } else {
            let prev_close = closes[i - 1];
            hl.max((highs[i] - prev_close).abs()).max((lows[i] - prev_close).abs())
        };
        true_ranges.push(tr);
    }
    sma(&true_ranges, period)
}

/// Technical-context flags for one symbol at the latest bar (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnicalContext {
    pub rsi: f64,
    pub rsi_oversold: bool,
    pub rsi_overbought: bool,
    pub macd_crossover_bullish: bool,
    pub macd_crossover_bearish: bool,
    pub bollinger_squeeze: bool,
    pub atr: f64,
}

/// Computes every context flag from a closes/highs/lows series ordered
/// oldest to newest. Returns `None` if there isn't at least one bar.
pub fn technical_context(highs: &[f64], lows: &[f64], closes: &[f64], squeeze_threshold: f64) -> Option<TechnicalContext> {
    if closes.is_empty() {
        return None;
    }

    let rsi_value = rsi(closes, RSI_PERIOD);
    let (macd_bullish, macd_bearish) = match macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL) {
        Some((_, _, latest_hist, prev_hist)) => {
            (prev_hist <= 0.0 && latest_hist > 0.0, prev_hist >= 0.0 && latest_hist < 0.0)
        }
        None => (false, false),
    };
    let squeeze = bollinger_bands(closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV)
        .map(|(_, _, _, bandwidth)| bandwidth.abs() < squeeze_threshold)
        .unwrap_or(false);
    let atr_value = atr(highs, lows, closes, ATR_PERIOD).unwrap_or(0.0);

    Some(TechnicalContext {
        rsi: rsi_value,
        rsi_oversold: rsi_value < 30.0,
        rsi_overbought: rsi_value > 70.0,
        macd_crossover_bullish: macd_bullish,
        macd_crossover_bearish: macd_bearish,
        bollinger_squeeze: squeeze,
        atr: atr_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sma_averages_the_trailing_window() {
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2).unwrap(), 3.5);
    }

    #[test]
    fn sma_handles_fewer_values_than_period() {
        assert_eq!(sma(&[5.0], 20).unwrap(), 5.0);
    }

    #[test]
    fn rsi_is_neutral_with_insufficient_history() {
        assert_eq!(rsi(&[1.0, 2.0, 3.0], 14), 50.0);
    }

    /// A pure monotonic trend drives the average loss (gain) to exactly
    /// zero, which the reference feature engineer treats as indeterminate
    /// and reports as neutral (50) rather than 100/0 — so these use a
    /// trend with small pullbacks/bounces to keep both averages nonzero.
    #[test]
    fn rsi_is_high_for_a_mostly_rising_series_with_small_pullbacks() {
        let mut closes = vec![100.0];
        for i in 1..30 {
            let step = if i % 5 == 0 { -0.5 } else { 1.5 };
            closes.push(closes[i - 1] + step);
        }
        assert!(rsi(&closes, RSI_PERIOD) > 70.0);
    }

    #[test]
    fn rsi_is_low_for_a_mostly_falling_series_with_small_bounces() {
        let mut closes = vec![200.0];
        for i in 1..30 {
            let step = if i % 5 == 0 { 0.5 } else { -1.5 };
            closes.push(closes[i - 1] + step);
        }
        assert!(rsi(&closes, RSI_PERIOD) < 30.0);
    }

    #[test]
    fn bollinger_bandwidth_is_zero_for_a_flat_series() {
        let closes = vec![100.0; 25];
        let (_, _, _, bandwidth) = bollinger_bands(&closes, BOLLINGER_PERIOD, BOLLINGER_STD_DEV).unwrap();
        assert_eq!(bandwidth, 0.0);
    }

    #[test]
    fn atr_is_zero_for_a_perfectly_flat_series() {
        let flat = vec![100.0; 20];
        assert_eq!(atr(&flat, &flat, &flat, ATR_PERIOD).unwrap(), 0.0);
    }

    #[test]
    fn technical_context_flags_a_flat_series_as_squeezed() {
        let flat = vec![100.0; 25];
        let ctx = technical_context(&flat, &flat, &flat, 0.05).unwrap();
        assert!(ctx.bollinger_squeeze);
        assert_eq!(ctx.rsi, 50.0);
    }
}
