//! Waveshaping kernels
//!
//! A waveshaper applies a transfer function to each sample:
//!   output = f(input * drive)
//!
//! Soft Clip:
//!   f(x) = x / (1 + |x|)
//!   - Smooth saturation, peaks are compressed gradually
//!   - Used by the carrier distortion stage and by `math::distort`
//!
//! Foldback:
//!   When x exceeds the threshold it "folds" back on itself, like a
//!   triangle wave wrapping the input
//!   - Complex, metallic harmonics
//!   - Used by the voice wavefolder
//!
//!   threshold ─────/\──────/\────
//!                 /  \    /  \
//!   ─────────────/────\──/────\──
//!               /      \/      \
//!
//! Drive values:
//!   1.0  = Clean
//!   2-4  = Warm saturation
//!   5-10 = Obvious distortion
//!   10+  = Heavy, aggressive

/// Soft clipping using x / (1 + |x|) transfer function.
#[inline]
pub fn soft_clip(sample: f32, drive: f32) -> f32 {
    let x = sample * drive;
    x / (1.0 + x.abs())
}

/// Foldback distortion: the signal folds back when exceeding the threshold.
///
/// Computed in closed form so that arbitrarily large (or non-finite) input
/// can never stall the audio thread.
#[inline]
pub fn foldback(sample: f32, drive: f32, threshold: f32) -> f32 {
    let x = sample * drive;

    if (-threshold..=threshold).contains(&x) {
        return x;
    }

    let period = 4.0 * threshold;
    let y = (x + threshold).rem_euclid(period);

    if y < 2.0 * threshold {
        y - threshold
    } else {
        3.0 * threshold - y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_clip_unity_drive() {
        // f(0.1) = 0.1 / (1 + 0.1) ≈ 0.0909
        let output = soft_clip(0.1, 1.0);
        assert!((output - 0.0909).abs() < 0.01);
    }

    #[test]
    fn test_soft_clip_high_drive() {
        // At high drive, output approaches ±1 asymptotically
        let output = soft_clip(1.0, 10.0);
        assert!(output > 0.9 && output < 1.0);
    }

    #[test]
    fn test_foldback_below_threshold() {
        let output = foldback(0.3, 1.0, 1.0);
        assert!((output - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_foldback_above_threshold() {
        // 0.7 * 2 = 1.4, folds to 2*1 - 1.4 = 0.6
        let output = foldback(0.7, 2.0, 1.0);
        assert!((output - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_foldback_folds_twice() {
        // 3.5 folds to -1.5, which folds again to -0.5
        let output = foldback(3.5, 1.0, 1.0);
        assert!((output + 0.5).abs() < 1e-6, "got {output}");
    }

    #[test]
    fn test_foldback_stays_bounded() {
        for i in -1000..1000 {
            let output = foldback(i as f32 * 0.37, 5.0, 1.0);
            assert!(output.abs() <= 1.0 + 1e-5, "got {output}");
        }
    }
}
