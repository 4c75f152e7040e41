//! Gain automation for the per-voice envelope stage.
//!
//! Modelled on the WebAudio `AudioParam` timeline: values are scheduled at
//! absolute engine times and read back with [`GainParam::value_at`]. Only the
//! two event kinds the voice lifecycle needs are supported.

#[derive(Debug, Clone, Copy, PartialEq)]
enum Event {
    /// Jump to `value` at `time`.
    Set { time: f64, value: f64 },
    /// Ramp exponentially from the previous event to `value`, arriving at `time`.
    ExpRamp { time: f64, value: f64 },
}

impl Event {
    fn time(&self) -> f64 {
        match *self {
            Event::Set { time, .. } | Event::ExpRamp { time, .. } => time,
        }
    }

    fn value(&self) -> f64 {
        match *self {
            Event::Set { value, .. } | Event::ExpRamp { value, .. } => value,
        }
    }
}

/// A scheduled gain value.
#[derive(Debug, Clone)]
pub struct GainParam {
    default: f64,
    /// Sorted by time; events at equal times keep insertion order.
    events: Vec<Event>,
}

impl GainParam {
    pub fn new(default: f64) -> Self {
        GainParam {
            default,
            events: Vec::new(),
        }
    }

    pub fn set_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(Event::Set { time, value });
    }

    pub fn exponential_ramp_to_value_at_time(&mut self, value: f64, time: f64) {
        self.insert(Event::ExpRamp { time, value });
    }

    /// Drop every event scheduled at or after `time`.
    pub fn cancel_scheduled_values(&mut self, time: f64) {
        self.events.retain(|e| e.time() < time);
    }

    /// Gain at engine time `t`.
    pub fn value_at(&self, t: f64) -> f64 {
        let mut prev_time = 0.0;
        let mut prev_value = self.default;

        for event in &self.events {
            if event.time() > t {
                return match *event {
                    Event::Set { .. } => prev_value,
                    Event::ExpRamp { time, value } => exp_interp(prev_time, prev_value, time, value, t),
                };
            }
            prev_time = event.time();
            prev_value = event.value();
        }
        prev_value
    }

    /// Time of the last scheduled event, if any.
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(Event::time)
    }

    fn insert(&mut self, event: Event) {
        let idx = self.events.partition_point(|e| e.time() <= event.time());
        self.events.insert(idx, event);
    }
}

/// Exponential interpolation between (t0, v0) and (t1, v1).
///
/// As in WebAudio, a ramp from zero or across a sign change holds `v0`
/// until the end time.
fn exp_interp(t0: f64, v0: f64, t1: f64, v1: f64, t: f64) -> f64 {
    if v0 == 0.0 || v0 * v1 < 0.0 || t1 <= t0 {
        return v0;
    }
    let progress = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
    v0 * (v1 / v0).powf(progress)
}
