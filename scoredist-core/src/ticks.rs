//! Count-axis scaling: axis maximum, a 1-2-5 tick step, and tick positions.

pub const MIN_TICKS: f64 = 4.0;
pub const MAX_TICKS: f64 = 10.0;

const MULTIPLIERS: [f64; 3] = [1.0, 2.0, 5.0];

/// Count-axis maximum for a distribution whose tallest bucket holds `max_count`:
/// a third of headroom above the tallest bar.
pub fn axis_max_for(max_count: u64) -> f64 {
    max_count as f64 * 4.0 / 3.0
}

/// Human-friendly tick step for an axis spanning `[0, axis_max]`.
///
/// The step is drawn from `{1, 2, 5} × 10^k` so that `axis_max / step` lands
/// in `[4, 10]`. Non-positive or non-finite input yields 1.
pub fn select_tick_step(axis_max: f64) -> f64 {
    if !axis_max.is_finite() || axis_max <= 0.0 {
        return 1.0;
    }
    let target = axis_max / MAX_TICKS;
    let magnitude = 10f64.powf(target.log10().floor());

    // ascending and duplicate-free: 0.1m, 0.2m, 0.5m, m, 2m, 5m, 10m, 20m, 50m
    let candidates: Vec<f64> = [magnitude / 10.0, magnitude, magnitude * 10.0]
        .iter()
        .flat_map(|p| MULTIPLIERS.iter().map(move |m| m * p))
        .collect();

    let mut idx = 0;
    for (i, c) in candidates.iter().enumerate() {
        if (c - target).abs() < (candidates[idx] - target).abs() {
            idx = i;
        }
    }

    while axis_max / candidates[idx] > MAX_TICKS && idx < candidates.len() - 1 {
        idx += 1;
    }
    while axis_max / candidates[idx] < MIN_TICKS && idx > 0 {
        idx -= 1;
    }
    candidates[idx]
}

/// Tick positions `0, step, 2·step, …` up to the axis maximum, allowing a
/// fraction of a step of overshoot but never past `1.05 × axis_max`.
pub fn tick_positions(axis_max: f64, step: f64) -> Vec<f64> {
    if !step.is_finite() || step <= 0.0 {
        return vec![0.0];
    }
    let limit = (axis_max + step * 0.1).min(axis_max * 1.05 + f64::EPSILON);
    let mut ticks = Vec::new();
    let mut k = 0u32;
    loop {
        let tick = f64::from(k) * step;
        if k > 0 && tick > limit {
            break;
        }
        ticks.push(tick);
        k += 1;
    }
    ticks
}
