//! Course completion math and the progress-bar reveal animation.

use std::time::Duration;

/// Delay before the reveal animation starts
pub const ANIMATION_DELAY: Duration = Duration::from_millis(100);

/// Length of the reveal animation
pub const ANIMATION_DURATION: Duration = Duration::from_secs(1);

/// Rounded completion percentage, or `None` when there is nothing to complete.
pub fn completion_percentage(completed: u32, total: u32) -> Option<u16> {
    if total == 0 {
        return None;
    }
    let ratio = f64::from(completed) / f64::from(total);
    Some((ratio * 100.0).round() as u16)
}

/// Width of a progress bar `elapsed` after it scrolled into view.
///
/// Starts at zero, waits `ANIMATION_DELAY`, then eases in and out to
/// `target` over `ANIMATION_DURATION`.
pub fn animated_percent(target: u16, elapsed: Duration) -> u16 {
    let Some(running) = elapsed.checked_sub(ANIMATION_DELAY) else {
        return 0;
    };
    let t = (running.as_secs_f64() / ANIMATION_DURATION.as_secs_f64()).min(1.0);
    let eased = if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    };
    (f64::from(target) * eased).round() as u16
}

/// True once the animation has reached its target
pub fn animation_finished(elapsed: Duration) -> bool {
    elapsed >= ANIMATION_DELAY + ANIMATION_DURATION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(0, 4), Some(0));
        assert_eq!(completion_percentage(1, 3), Some(33));
        assert_eq!(completion_percentage(2, 3), Some(67));
        assert_eq!(completion_percentage(1, 8), Some(13)); // 12.5 rounds up
        assert_eq!(completion_percentage(4, 4), Some(100));
    }

    #[test]
    fn test_completion_percentage_no_items() {
        assert_eq!(completion_percentage(0, 0), None);
        assert_eq!(completion_percentage(3, 0), None);
    }

    #[test]
    fn test_animation_bounds() {
        assert_eq!(animated_percent(80, Duration::ZERO), 0);
        assert_eq!(animated_percent(80, Duration::from_millis(99)), 0);
        assert_eq!(animated_percent(80, Duration::from_millis(600)), 40);
        assert_eq!(animated_percent(80, Duration::from_millis(1100)), 80);
        assert_eq!(animated_percent(80, Duration::from_secs(5)), 80);
    }

    #[test]
    fn test_animation_is_monotonic() {
        let mut last = 0;
        for ms in (0..1200).step_by(50) {
            let value = animated_percent(100, Duration::from_millis(ms));
            assert!(value >= last);
            last = value;
        }
        assert!(animation_finished(Duration::from_millis(1100)));
        assert!(!animation_finished(Duration::from_millis(1099)));
    }
}
