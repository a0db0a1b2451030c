use rodio::Source;
use std::time::Duration;

const SAMPLE_RATE: u32 = 44100;

/// Low sawtooth for the presence alarm. Ends after `duration`.
pub struct AlarmTone {
    frequency: f32,
    amplitude: f32,
    position: u64,
    total_samples: u64,
}

impl AlarmTone {
    pub fn new(frequency: f32, amplitude: f32, duration: Duration) -> Self {
        Self {
            frequency,
            amplitude: amplitude.clamp(0.0, 1.0),
            position: 0,
            total_samples: samples_for(duration),
        }
    }
}

impl Iterator for AlarmTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.total_samples {
            return None;
        }
        let t = self.position as f32 / SAMPLE_RATE as f32;
        self.position += 1;

        // Sawtooth in -1..1
        let phase = (t * self.frequency).fract();
        Some((2.0 * phase - 1.0) * self.amplitude)
    }
}

impl Source for AlarmTone {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_secs_f64(
            self.total_samples as f64 / f64::from(SAMPLE_RATE),
        ))
    }
}

/// Rising three-note chime (800, 1000, 1200 Hz) with an exponential decay on
/// each note, played every chime interval while focusing.
pub struct ChimeTone {
    amplitude: f32,
    position: u64,
}

const CHIME_NOTES: [(f32, u64, u64); 3] = [
    // (frequency, start_ms, length_ms)
    (800.0, 0, 100),
    (1000.0, 150, 100),
    (1200.0, 300, 200),
];

impl ChimeTone {
    pub fn new(amplitude: f32) -> Self {
        Self {
            amplitude: amplitude.clamp(0.0, 1.0),
            position: 0,
        }
    }

    fn total_samples() -> u64 {
        let (_, start, len) = CHIME_NOTES[CHIME_NOTES.len() - 1];
        samples_for(Duration::from_millis(start + len))
    }
}

impl Iterator for ChimeTone {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= Self::total_samples() {
            return None;
        }
        let position = self.position;
        self.position += 1;

        let ms = position * 1000 / u64::from(SAMPLE_RATE);
        let note = CHIME_NOTES
            .iter()
            .find(|(_, start, len)| ms >= *start && ms < start + len);

        let Some((frequency, start, len)) = note else {
            return Some(0.0);
        };

        let local = (position - samples_for(Duration::from_millis(*start))) as f32
            / SAMPLE_RATE as f32;
        let length = *len as f32 / 1000.0;
        // Decays from full amplitude to ~1% over the note, like an
        // exponential gain ramp.
        let envelope = (0.01_f32).powf(local / length);
        let wave = (2.0 * std::f32::consts::PI * frequency * local).sin();
        Some(wave * envelope * self.amplitude)
    }
}

impl Source for ChimeTone {
    fn current_frame_len(&self) -> Option<usize> {
        None
    }

    fn channels(&self) -> u16 {
        1
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<Duration> {
        Some(Duration::from_millis(500))
    }
}

fn samples_for(duration: Duration) -> u64 {
    (duration.as_secs_f64() * f64::from(SAMPLE_RATE)) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alarm_is_bounded() {
        let tone = AlarmTone::new(200.0, 0.5, Duration::from_millis(10));
        assert_eq!(tone.count(), 441);
    }

    #[test]
    fn alarm_respects_amplitude() {
        let tone = AlarmTone::new(200.0, 0.5, Duration::from_millis(50));
        assert!(tone.into_iter().all(|s| s.abs() <= 0.5 + f32::EPSILON));
    }

    #[test]
    fn chime_has_gaps_between_notes() {
        let samples: Vec<f32> = ChimeTone::new(0.3).collect();
        assert_eq!(samples.len() as u64, ChimeTone::total_samples());

        // 120ms falls between the first and second notes.
        let gap = samples_for(Duration::from_millis(120)) as usize;
        assert_eq!(samples[gap], 0.0);
    }
}
