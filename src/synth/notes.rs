use std::collections::HashMap;

/*
Note Names
==========

Collaborators (piano keys, sequencer rows) address pitches by name. The
table maps every name from C0 to B8 to its equal-tempered frequency.

Naming Convention:
- Natural notes: C4, D4, E4, ...
- Sharps: C#4, D#4, ...
- Flats: Db4, Eb4, ... (same frequency as the matching sharp)

The MIDI formula: note_number = 12 * (octave + 1) + semitone
Where semitone: C=0, C#=1, D=2, D#=3, E=4, F=5, F#=6, G=7, G#=8, A=9, A#=10, B=11

A4 = MIDI 69 = 440 Hz.
*/

const NAMES: [(&str, &[&str]); 12] = [
    ("C", &["B#"]),
    ("C#", &["Db"]),
    ("D", &[]),
    ("D#", &["Eb"]),
    ("E", &["Fb"]),
    ("F", &["E#"]),
    ("F#", &["Gb"]),
    ("G", &[]),
    ("G#", &["Ab"]),
    ("A", &[]),
    ("A#", &["Bb"]),
    ("B", &["Cb"]),
];

/// Convert MIDI note number to frequency in Hz.
#[inline]
pub fn midi_note_to_freq(note: u8) -> f64 {
    440.0 * 2.0_f64.powf((note as f64 - 69.0) / 12.0)
}

/// Immutable name → frequency map, built once.
#[derive(Debug, Clone)]
pub struct NoteTable {
    frequencies: HashMap<String, f64>,
}

impl NoteTable {
    pub fn new() -> Self {
        let mut frequencies = HashMap::with_capacity(9 * 20);

        for octave in 0..=8u8 {
            for (semitone, (name, aliases)) in NAMES.iter().enumerate() {
                let midi = 12 * (octave + 1) + semitone as u8;
                let freq = midi_note_to_freq(midi);

                frequencies.insert(format!("{name}{octave}"), freq);
                for alias in aliases.iter() {
                    // Enharmonic spellings that cross the octave boundary keep
                    // the written octave: B#3 is C4, Cb4 is B3.
                    let alias_octave = match *alias {
                        "B#" => octave.checked_sub(1),
                        "Cb" => Some(octave + 1),
                        _ => Some(octave),
                    };
                    if let Some(o) = alias_octave.filter(|o| *o <= 8) {
                        frequencies.insert(format!("{alias}{o}"), freq);
                    }
                }
            }
        }

        Self { frequencies }
    }

    /// Frequency for a note name such as "A4", "C#3" or "Bb2".
    pub fn frequency(&self, name: &str) -> Option<f64> {
        self.frequencies.get(name.trim()).copied()
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }
}

impl Default for NoteTable {
    fn default() -> Self {
        Self::new()
    }
}
