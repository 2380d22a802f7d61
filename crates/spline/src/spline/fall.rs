//! Free-fall timing shared by server and client so falling splines agree.

pub const GRAVITY: f32 = 19.291_105;
pub const TERMINAL_VELOCITY: f32 = 60.148_003;
pub const TERMINAL_SAFE_FALL_VELOCITY: f32 = 7.0;

const TERMINAL_LENGTH: f32 = (TERMINAL_VELOCITY * TERMINAL_VELOCITY) / (2.0 * GRAVITY);
const TERMINAL_SAFE_FALL_LENGTH: f32 =
    (TERMINAL_SAFE_FALL_VELOCITY * TERMINAL_SAFE_FALL_VELOCITY) / (2.0 * GRAVITY);
const TERMINAL_FALL_TIME: f32 = TERMINAL_VELOCITY / GRAVITY;
const TERMINAL_SAFE_FALL_TIME: f32 = TERMINAL_SAFE_FALL_VELOCITY / GRAVITY;

/// Seconds needed to drop `path_length` units starting at rest.
pub fn compute_fall_time(path_length: f32, safe_fall: bool) -> f32 {
    if path_length <= 0.0 {
        return 0.0;
    }

    let (terminal_length, terminal_velocity, terminal_time) = if safe_fall {
        (
            TERMINAL_SAFE_FALL_LENGTH,
            TERMINAL_SAFE_FALL_VELOCITY,
            TERMINAL_SAFE_FALL_TIME,
        )
    } else {
        (TERMINAL_LENGTH, TERMINAL_VELOCITY, TERMINAL_FALL_TIME)
    };

    if path_length >= terminal_length {
        (path_length - terminal_length) / terminal_velocity + terminal_time
    } else {
        (2.0 * path_length / GRAVITY).sqrt()
    }
}

/// Distance fallen after `t` seconds.
pub fn compute_fall_elevation(t: f32, safe_fall: bool, start_velocity: f32) -> f32 {
    let terminal_velocity = if safe_fall {
        TERMINAL_SAFE_FALL_VELOCITY
    } else {
        TERMINAL_VELOCITY
    };
    let start_velocity = start_velocity.min(terminal_velocity);
    let terminal_time = terminal_velocity / GRAVITY - start_velocity / GRAVITY;

    if t > terminal_time {
        terminal_velocity * (t - terminal_time)
            + start_velocity * terminal_time
            + GRAVITY * terminal_time * terminal_time * 0.5
    } else {
        t * (start_velocity + t * GRAVITY * 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_and_elevation_agree() {
        for length in [0.5, 4.0, 30.0, 200.0] {
            for safe_fall in [false, true] {
                let t = compute_fall_time(length, safe_fall);
                let fallen = compute_fall_elevation(t, safe_fall, 0.0);
                assert!((fallen - length).abs() < 0.01 * length.max(1.0), "{length} {safe_fall}");
            }
        }
    }

    #[test]
    fn safe_fall_is_slower() {
        assert!(compute_fall_time(50.0, true) > compute_fall_time(50.0, false));
        assert_eq!(compute_fall_time(-1.0, false), 0.0);
    }
}
