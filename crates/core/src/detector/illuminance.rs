use tracing::debug;

use super::window::SlidingWindow;
use crate::config::IlluminanceConfig;

/// Outcome of feeding one reading to the [`IlluminanceDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleSignal {
    Nothing,
    /// The light dipped after a bright peak; the next rising edge is a hole.
    Valley,
    NewHole,
    /// The waveform went flat: no more film in the gate. Sticky.
    Finished,
}

/// Finds sprocket holes in the light sensor waveform.
///
/// A hole is reported on the rising edge that follows a valley. A window whose
/// dynamic range has collapsed means the strip has run out.
#[derive(Debug, Clone)]
pub struct IlluminanceDetector {
    window: SlidingWindow,
    min_amplitude: i64,
    had_minimum: bool,
    finished: bool,
}

impl IlluminanceDetector {
    pub fn new(config: &IlluminanceConfig) -> Self {
        Self {
            window: SlidingWindow::new(config.window_size),
            min_amplitude: config.min_amplitude,
            had_minimum: false,
            finished: false,
        }
    }

    pub fn push(&mut self, value: i64) -> HoleSignal {
        if self.finished {
            return HoleSignal::Finished;
        }

        self.window.push(value);

        let (Some(min), Some(max)) = (self.window.min(), self.window.max()) else {
            return HoleSignal::Nothing;
        };
        let amplitude = self.min_amplitude;

        if self.window.is_full() && 2 * (max - min) < amplitude {
            debug!(min, max, "Light waveform is flat, roll finished");
            self.finished = true;
            self.window.clear();
            return HoleSignal::Finished;
        }

        if 2 * self.window.len() < self.window.capacity() {
            return HoleSignal::Nothing;
        }

        let (Some(m0), Some(m1), Some(m2), Some(m3)) = (
            self.window.get(0),
            self.window.get(1),
            self.window.get(2),
            self.window.get(3),
        ) else {
            return HoleSignal::Nothing;
        };
        let d0 = m0 - m1;
        let d1 = m1 - m2;
        let d2 = m2 - m3;

        if !self.had_minimum
            && d0 < 0
            && d1 >= 0
            && d2 >= 0
            && m0 > min + amplitude
            && m0 > max - 2 * amplitude
        {
            self.had_minimum = true;
            return HoleSignal::Valley;
        }

        if self.had_minimum && d0 > 0 && d1 <= 0 && d2 <= 0 && m0 < max - amplitude {
            self.had_minimum = false;
            return HoleSignal::NewHole;
        }

        HoleSignal::Nothing
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn samples(&self) -> usize {
        self.window.len()
    }
}
