//! Rotary Encoder Driver
//!
//! Tuning knob and function button. Quadrature transitions are decoded into
//! detents, detents are accumulated into signed step counts for tuning, and
//! the button is debounced with long-press detection.

use embedded_hal::digital::InputPin;

/// Encoder rotation direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Clockwise rotation (increment)
    Clockwise,
    /// Counter-clockwise rotation (decrement)
    CounterClockwise,
}

impl Direction {
    /// Sign of one detent in this direction
    #[must_use]
    pub const fn sign(self) -> i32 {
        match self {
            Self::Clockwise => 1,
            Self::CounterClockwise => -1,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for Direction {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Clockwise => defmt::write!(f, "CW"),
            Self::CounterClockwise => defmt::write!(f, "CCW"),
        }
    }
}

/// Encoder event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EncoderEvent {
    /// Encoder rotated
    Rotate {
        /// Direction of rotation
        direction: Direction,
        /// Number of steps
        steps: u32,
    },
    /// Button pressed
    ButtonPress,
    /// Button released before the long-press threshold
    ButtonRelease,
    /// Button held for long press
    LongPress,
}

impl EncoderEvent {
    /// Signed step count of a rotation
    #[must_use]
    pub fn tune_steps(self) -> Option<i32> {
        match self {
            Self::Rotate { direction, steps } => {
                Some(i32::try_from(steps).unwrap_or(i32::MAX) * direction.sign())
            }
            _ => None,
        }
    }
}

#[cfg(feature = "embedded")]
impl defmt::Format for EncoderEvent {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Self::Rotate { direction, steps } => {
                defmt::write!(f, "Rotate({}, {})", direction, steps);
            }
            Self::ButtonPress => defmt::write!(f, "Press"),
            Self::ButtonRelease => defmt::write!(f, "Release"),
            Self::LongPress => defmt::write!(f, "LongPress"),
        }
    }
}

/// Encoder state machine states
#[derive(Clone, Copy, Debug, Default)]
enum EncoderState {
    #[default]
    Idle,
    CwStart,
    CwNext,
    CwFinal,
    CcwStart,
    CcwNext,
    CcwFinal,
}

/// Quadrature encoder decoder using state machine
#[derive(Clone, Copy, Debug)]
pub struct QuadratureDecoder {
    state: EncoderState,
    last_a: bool,
    last_b: bool,
}

impl QuadratureDecoder {
    /// Create a new quadrature decoder
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: EncoderState::Idle,
            last_a: false,
            last_b: false,
        }
    }

    /// Update with new A/B pin states, returns direction if a detent completed
    pub fn update(&mut self, a: bool, b: bool) -> Option<Direction> {
        use EncoderState::{CcwFinal, CcwNext, CcwStart, CwFinal, CwNext, CwStart, Idle};

        if a == self.last_a && b == self.last_b {
            return None;
        }

        self.last_a = a;
        self.last_b = b;

        let (new_state, result) = match (self.state, a, b) {
            (Idle, false, true) => (CwStart, None),
            (Idle, true, false) => (CcwStart, None),

            // Clockwise: 00 -> 01 -> 11 -> 10 -> 00
            (CwStart, true, true) => (CwNext, None),
            (CwNext, true, false) => (CwFinal, None),
            (CwFinal, false, false) => (Idle, Some(Direction::Clockwise)),

            // Counter-clockwise: 00 -> 10 -> 11 -> 01 -> 00
            (CcwStart, true, true) => (CcwNext, None),
            (CcwNext, false, true) => (CcwFinal, None),
            (CcwFinal, false, false) => (Idle, Some(Direction::CounterClockwise)),

            // Bounce or missed edge
            _ => (Idle, None),
        };

        self.state = new_state;
        result
    }

    /// Reset the decoder state
    pub fn reset(&mut self) {
        self.state = EncoderState::Idle;
    }
}

impl Default for QuadratureDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Acceleration curve for fast tuning
#[derive(Clone, Copy, Debug)]
pub struct AccelerationCurve {
    /// Time threshold for acceleration in milliseconds
    threshold_ms: u32,
    /// Multiplier when accelerating
    multiplier: u32,
    /// Last event timestamp
    last_event_ms: u32,
    /// Accumulated steps for acceleration
    step_count: u32,
}

impl AccelerationCurve {
    /// Create a new acceleration curve
    #[must_use]
    pub const fn new(threshold_ms: u32, multiplier: u32) -> Self {
        Self {
            threshold_ms,
            multiplier,
            last_event_ms: 0,
            step_count: 0,
        }
    }

    /// Process a detent and return the effective step count
    pub fn process(&mut self, current_ms: u32) -> u32 {
        let elapsed = current_ms.wrapping_sub(self.last_event_ms);
        self.last_event_ms = current_ms;

        if elapsed < self.threshold_ms {
            self.step_count = self.step_count.saturating_add(1).min(10);
            1 + (self.step_count * self.multiplier / 10)
        } else {
            self.step_count = 0;
            1
        }
    }

    /// Reset acceleration state
    pub fn reset(&mut self) {
        self.step_count = 0;
    }
}

impl Default for AccelerationCurve {
    fn default() -> Self {
        Self::new(50, 5)
    }
}

/// Sums rotation between control-loop passes into one tuning delta
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepAccumulator {
    pending: i32,
}

impl StepAccumulator {
    /// Create an empty accumulator
    #[must_use]
    pub const fn new() -> Self {
        Self { pending: 0 }
    }

    /// Add a rotation event; other events are ignored
    pub fn push(&mut self, event: EncoderEvent) {
        if let Some(steps) = event.tune_steps() {
            self.pending = self.pending.saturating_add(steps);
        }
    }

    /// Take the accumulated steps, if the knob moved at all
    pub fn take(&mut self) -> Option<i32> {
        let steps = core::mem::take(&mut self.pending);
        (steps != 0).then_some(steps)
    }
}

/// Complete encoder driver with button
pub struct Encoder<A, B, BTN> {
    /// A phase input
    a_pin: A,
    /// B phase input
    b_pin: B,
    /// Push button, active low
    button: BTN,
    /// Quadrature decoder
    decoder: QuadratureDecoder,
    /// Acceleration curve
    acceleration: AccelerationCurve,
    /// Debounced button level
    pressed: bool,
    /// Consecutive polls that disagreed with `pressed`
    bounce: u8,
    /// Button press start time for long press detection
    press_start_ms: Option<u32>,
    /// Long press threshold in milliseconds
    long_press_ms: u32,
    /// Whether long press was triggered
    long_press_triggered: bool,
}

impl<A: InputPin, B: InputPin, BTN: InputPin> Encoder<A, B, BTN> {
    /// Default long press threshold
    pub const DEFAULT_LONG_PRESS_MS: u32 = 500;

    /// Polls a new button level must persist before it is accepted
    pub const DEBOUNCE_POLLS: u8 = 3;

    /// Create a new encoder driver
    #[must_use]
    pub fn new(a_pin: A, b_pin: B, button: BTN) -> Self {
        Self {
            a_pin,
            b_pin,
            button,
            decoder: QuadratureDecoder::new(),
            acceleration: AccelerationCurve::default(),
            pressed: false,
            bounce: 0,
            press_start_ms: None,
            long_press_ms: Self::DEFAULT_LONG_PRESS_MS,
            long_press_triggered: false,
        }
    }

    /// Poll for encoder events (call periodically)
    ///
    /// A pin read failure is treated as no change.
    pub fn poll(&mut self, current_ms: u32) -> Option<EncoderEvent> {
        if let (Ok(a), Ok(b)) = (self.a_pin.is_high(), self.b_pin.is_high()) {
            if let Some(direction) = self.decoder.update(a, b) {
                let steps = self.acceleration.process(current_ms);
                return Some(EncoderEvent::Rotate { direction, steps });
            }
        }

        if self.debounce_button() {
            if self.pressed {
                self.press_start_ms = Some(current_ms);
                self.long_press_triggered = false;
                return Some(EncoderEvent::ButtonPress);
            }
            self.press_start_ms = None;
            if !self.long_press_triggered {
                return Some(EncoderEvent::ButtonRelease);
            }
        }

        if let Some(start) = self.press_start_ms {
            if !self.long_press_triggered && current_ms.wrapping_sub(start) >= self.long_press_ms {
                self.long_press_triggered = true;
                return Some(EncoderEvent::LongPress);
            }
        }

        None
    }

    /// Check if button is currently pressed (debounced)
    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.pressed
    }

    /// Set long press threshold
    pub fn set_long_press_ms(&mut self, ms: u32) {
        self.long_press_ms = ms;
    }

    /// Set acceleration parameters
    pub fn set_acceleration(&mut self, threshold_ms: u32, multiplier: u32) {
        self.acceleration = AccelerationCurve::new(threshold_ms, multiplier);
    }

    /// Returns true when the debounced level changed
    fn debounce_button(&mut self) -> bool {
        let Ok(level) = self.button.is_low() else {
            return false;
        };
        if level == self.pressed {
            self.bounce = 0;
            return false;
        }
        self.bounce += 1;
        if self.bounce < Self::DEBOUNCE_POLLS {
            return false;
        }
        self.bounce = 0;
        self.pressed = level;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_clockwise_cycle_yields_one_detent() {
        let mut dec = QuadratureDecoder::new();
        assert_eq!(dec.update(false, true), None);
        assert_eq!(dec.update(true, true), None);
        assert_eq!(dec.update(true, false), None);
        assert_eq!(dec.update(false, false), Some(Direction::Clockwise));
    }

    #[test]
    fn accumulator_nets_opposite_rotation() {
        let mut acc = StepAccumulator::new();
        acc.push(EncoderEvent::Rotate {
            direction: Direction::Clockwise,
            steps: 3,
        });
        acc.push(EncoderEvent::Rotate {
            direction: Direction::CounterClockwise,
            steps: 1,
        });
        acc.push(EncoderEvent::ButtonPress);
        assert_eq!(acc.take(), Some(2));
        assert_eq!(acc.take(), None);
    }
}
