//! SIMD batch kernels.
//!
//! These use the `wide` crate for portable SIMD and back the batch
//! diagnostic path, where whole series are computed at once.

use wide::f64x4;

use backtest_core::types::Bar;

/// Vectorized sum of a slice.
pub fn sum_simd(data: &[f64]) -> f64 {
    let chunks = data.chunks_exact(4);
    let remainder = chunks.remainder();

    let mut acc = f64x4::splat(0.0);
    for chunk in chunks {
        acc = acc + f64x4::new([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }

    acc.to_array().iter().sum::<f64>() + remainder.iter().sum::<f64>()
}

/// Simple moving average, ready values only.
///
/// The seed window is summed with SIMD; the slide is scalar.
pub fn sma_simd(data: &[f64], period: usize) -> Vec<f64> {
    if data.len() < period || period == 0 {
        return vec![];
    }

    let mut result = Vec::with_capacity(data.len() - period + 1);
    let period_f64 = period as f64;

    let mut sum = sum_simd(&data[..period]);
    result.push(sum / period_f64);

    for i in period..data.len() {
        sum = sum - data[i - period] + data[i];
        result.push(sum / period_f64);
    }

    result
}

/// Typical price (HLC3) for every bar, four bars per lane group.
pub fn hlc3_simd(bars: &[Bar]) -> Vec<f64> {
    let mut result = Vec::with_capacity(bars.len());
    let third = f64x4::splat(1.0 / 3.0);

    let chunks = bars.chunks_exact(4);
    let remainder = chunks.remainder();

    for chunk in chunks {
        let high = f64x4::new([chunk[0].high, chunk[1].high, chunk[2].high, chunk[3].high]);
        let low = f64x4::new([chunk[0].low, chunk[1].low, chunk[2].low, chunk[3].low]);
        let close = f64x4::new([chunk[0].close, chunk[1].close, chunk[2].close, chunk[3].close]);
        result.extend_from_slice(&((high + low + close) * third).to_array());
    }

    for bar in remainder {
        result.push((bar.high + bar.low + bar.close) * (1.0 / 3.0));
    }

    result
}
