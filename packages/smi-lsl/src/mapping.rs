use crate::types::{GazeEvent, GazeSample};
use chrono::{DateTime, Utc};

/// Number of channels in the raw gaze stream
pub const GAZE_CHANNELS: usize = 13;

/// Number of channels in the event stream
pub const EVENT_CHANNELS: usize = 7;

/// Offset subtracted from Unix milliseconds to form the event reference time
/// (2015-11-07T15:11:06.675Z).
pub const REFERENCE_EPOCH_MS: i64 = 1_446_909_066_675;

/// Milliseconds elapsed since `REFERENCE_EPOCH_MS`.
pub fn reference_millis(now: DateTime<Utc>) -> i64 {
    let micros = now.timestamp_micros();
    // Round to the nearest millisecond
    (micros as f64 / 1000.0).round() as i64 - REFERENCE_EPOCH_MS
}

/// Reference time for the current wall clock.
pub fn reference_millis_now() -> i64 {
    reference_millis(Utc::now())
}

/// Lay a gaze sample out in raw-stream channel order.
pub fn gaze_channels(sample: &GazeSample) -> [f32; GAZE_CHANNELS] {
    let left = &sample.left;
    let right = &sample.right;
    [
        sample.timestamp_us as f32,
        left.gaze_x as f32,
        left.gaze_y as f32,
        left.diameter as f32,
        left.position_x as f32,
        left.position_y as f32,
        left.position_z as f32,
        right.gaze_x as f32,
        right.gaze_y as f32,
        right.diameter as f32,
        right.position_x as f32,
        right.position_y as f32,
        right.position_z as f32,
    ]
}

/// Lay an event out in event-stream channel order, stamping it with `reference_ms`.
pub fn event_channels(event: &GazeEvent, reference_ms: i64) -> [f32; EVENT_CHANNELS] {
    [
        event.eye.code() as f32,
        event.start_time_us as f32,
        event.end_time_us as f32,
        event.duration_us as f32,
        event.position_x as f32,
        event.position_y as f32,
        reference_ms as f32,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Eye, EyeData};
    use chrono::TimeZone;

    #[test]
    fn test_gaze_channel_order() {
        let sample = GazeSample {
            timestamp_us: 1234,
            left: EyeData {
                gaze_x: 1.0,
                gaze_y: 2.0,
                diameter: 3.0,
                position_x: 4.0,
                position_y: 5.0,
                position_z: 6.0,
            },
            right: EyeData {
                gaze_x: 7.0,
                gaze_y: 8.0,
                diameter: 9.0,
                position_x: 10.0,
                position_y: 11.0,
                position_z: 12.0,
            },
            plane_number: 3,
        };

        let channels = gaze_channels(&sample);
        assert_eq!(
            channels,
            [1234.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0]
        );
    }

    #[test]
    fn test_event_channel_order() {
        let event = GazeEvent {
            event_type: 'F',
            eye: Eye::Left,
            start_time_us: 100,
            end_time_us: 400,
            duration_us: 300,
            position_x: 512.5,
            position_y: 384.0,
        };

        let channels = event_channels(&event, 42);
        assert_eq!(channels, [-1.0, 100.0, 400.0, 300.0, 512.5, 384.0, 42.0]);
    }

    #[test]
    fn test_unknown_eye_maps_to_zero() {
        let event = GazeEvent {
            event_type: 'F',
            eye: Eye::Unknown,
            start_time_us: 0,
            end_time_us: 0,
            duration_us: 0,
            position_x: 0.0,
            position_y: 0.0,
        };
        assert_eq!(event_channels(&event, 0)[0], 0.0);
    }

    #[test]
    fn test_reference_millis_at_epoch() {
        let epoch = Utc.timestamp_millis_opt(REFERENCE_EPOCH_MS).unwrap();
        assert_eq!(reference_millis(epoch), 0);

        let later = Utc.timestamp_millis_opt(REFERENCE_EPOCH_MS + 1500).unwrap();
        assert_eq!(reference_millis(later), 1500);
    }

    #[test]
    fn test_reference_millis_rounds() {
        let micros = REFERENCE_EPOCH_MS * 1000 + 2_600;
        let t = Utc.timestamp_micros(micros).unwrap();
        assert_eq!(reference_millis(t), 3);
    }
}
