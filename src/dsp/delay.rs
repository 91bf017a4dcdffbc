/// Echo time range in seconds.
pub const MIN_TIME: f32 = 0.01;
pub const MAX_TIME: f32 = 2.0;
/// Feedback is capped below 1.0 so the echo tail always dies out.
pub const MAX_FEEDBACK: f32 = 0.95;

/// Magnitude under which a sample counts as silence for tail detection.
const SILENCE_THRESHOLD: f32 = 1e-4;

/// Feedback delay over a circular buffer of two seconds.
pub struct FeedbackDelay {
    buffer: Vec<f32>,
    write_index: usize,
    sample_rate: f32,
    time: f32,
    feedback: f32,
    mix: f32,
    /// Consecutive samples in which both the write and the read were silent.
    silent_samples: usize,
}

impl FeedbackDelay {
    pub fn new(sample_rate: f32) -> Self {
        let size = (2.0 * sample_rate) as usize;
        Self {
            buffer: vec![0.0; size],
            write_index: 0,
            sample_rate,
            time: 0.3,
            feedback: 0.4,
            mix: 0.3,
            silent_samples: size,
        }
    }

    pub fn set_time(&mut self, seconds: f32) {
        self.time = seconds.clamp(MIN_TIME, MAX_TIME);
    }

    pub fn set_feedback(&mut self, feedback: f32) {
        self.feedback = feedback.clamp(0.0, MAX_FEEDBACK);
    }

    pub fn set_mix(&mut self, mix: f32) {
        self.mix = mix.clamp(0.0, 1.0);
    }

    #[inline]
    fn delay_samples(&self) -> usize {
        let samples = (self.time * self.sample_rate) as usize;
        samples.clamp(1, self.buffer.len() - 1)
    }

    pub fn process(&mut self, input: f32) -> f32 {
        let size = self.buffer.len();
        let read_index = (self.write_index + size - self.delay_samples()) % size;
        let delayed = self.buffer[read_index];

        let written = input + delayed * self.feedback.min(MAX_FEEDBACK);
        self.buffer[self.write_index] = written;
        self.write_index = (self.write_index + 1) % size;

        if written.abs() < SILENCE_THRESHOLD && delayed.abs() < SILENCE_THRESHOLD {
            self.silent_samples = self.silent_samples.saturating_add(1);
        } else {
            self.silent_samples = 0;
        }

        input * (1.0 - self.mix) + delayed * self.mix
    }

    pub fn render(&mut self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    /// True while an echo tail may still be audible.
    ///
    /// Goes false once a full buffer length of silence has been written and
    /// read, i.e. nothing non-silent is left anywhere in the line.
    pub fn is_audio_active(&self) -> bool {
        self.silent_samples < self.buffer.len()
    }

    /// Drop any echo tail.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_index = 0;
        self.silent_samples = self.buffer.len();
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn feedback(&self) -> f32 {
        self.feedback
    }

    pub fn mix(&self) -> f32 {
        self.mix
    }
}
