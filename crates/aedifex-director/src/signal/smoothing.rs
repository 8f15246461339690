//! Centered moving averages over sampled signals.
//!
//! Both kernels share one window walk: edges only move forward, so a running
//! sum is updated instead of re-summing the window at every sample.

use aedifex_models::EmotionSpectrum;

/// Half-open sample range averaged for sample `i`, clipped at the edges.
fn window_bounds(i: usize, len: usize, window: usize) -> (usize, usize) {
    let pad = window / 2;
    (i.saturating_sub(pad), (i + pad + 1).min(len))
}

/// Centered moving average over the energy curve.
///
/// # Arguments
/// * `data` - Energy samples
/// * `window` - Window size in samples (odd sizes center exactly)
///
/// # Returns
/// Smoothed samples, same length as `data`. Edges average over the part of
/// the window that exists.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || data.is_empty() {
        return data.to_vec();
    }

    let mut running = 0.0;
    let (mut lo, mut hi) = (0, 0);
    (0..data.len())
        .map(|i| {
            let (start, end) = window_bounds(i, data.len(), window);
            running += data[hi..end].iter().sum::<f64>();
            hi = end;
            running -= data[lo..start].iter().sum::<f64>();
            lo = start;
            running / (end - start) as f64
        })
        .collect()
}

/// Centered moving average over a spectrum signal, same windowing as
/// [`moving_average`].
pub fn smooth_spectra(data: &[EmotionSpectrum], window: usize) -> Vec<EmotionSpectrum> {
    if window <= 1 || data.is_empty() {
        return data.to_vec();
    }

    let mut running = EmotionSpectrum::zero();
    let (mut lo, mut hi) = (0, 0);
    let mut result = Vec::with_capacity(data.len());

    for i in 0..data.len() {
        let (start, end) = window_bounds(i, data.len(), window);
        for spectrum in &data[hi..end] {
            running += spectrum;
        }
        hi = end;
        for spectrum in &data[lo..start] {
            running = &running - spectrum;
        }
        lo = start;
        result.push(&running / (end - start) as f64);
    }

    result
}
