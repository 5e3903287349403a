//! Neutrino-generator event summaries, one JSON object per line.
//!
//! The fields mirror the generator's fixed summary schema: the projectile,
//! target, outgoing lepton, residual nucleus and up to eight final-state
//! particles. Energies in MeV, momenta in MeV/c.

use std::io::BufRead;

use crate::error::{Error, Result};
use crate::sources::SourceSpec;
use crate::Vector;

/// Capacity of the final-state arrays in the summary schema.
pub const MAX_FINAL_STATE: usize = 8;

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub pdg:            i32,
    pub energy:         f64,
    pub kinetic_energy: f64,
    pub px:             f64,
    pub py:             f64,
    pub pz:             f64,
}

impl Kinematics {
    pub fn momentum(&self) -> Vector<f64> {
        Vector::new(self.px, self.py, self.pz)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorEvent {
    pub neutrino:          Kinematics,
    pub target_pdg:        i32,
    pub target_mass:       f64,
    pub lepton:            Kinematics,
    pub residual:          Kinematics,
    /// Residual nucleus excitation energy.
    pub excitation_energy: f64,
    pub two_j:             i32,
    pub parity:            i32,
    #[serde(default)]
    pub final_state:       Vec<Kinematics>,
    /// Total cross section, 1e-42 cm^2 units as written by the generator.
    pub xsec:              f64,
}

impl GeneratorEvent {
    /// One source per final-state particle, all at `vertex`.
    pub fn sources(&self, vertex: Vector<f64>) -> Result<Vec<SourceSpec>> {
        self.final_state
            .iter()
            .map(|k| SourceSpec::new(vertex, k.pdg, k.kinetic_energy))
            .collect()
    }

    fn validate(self) -> Result<Self> {
        if self.final_state.len() > MAX_FINAL_STATE {
            return Err(Error::TooManyParticles(self.final_state.len()));
        }
        Ok(self)
    }
}

/// Iterates over events; blank lines are skipped.
pub struct EventReader<R> {
    reader: R,
    line:   usize,
    buf:    String,
}

impl<R: BufRead> EventReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for EventReader<R> {
    type Item = Result<GeneratorEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line += 1,
                Err(e) => return Some(Err(Error::Io(e))),
            }
            let text = self.buf.trim();
            if text.is_empty() {
                continue;
            }
            let line = self.line;
            return Some(
                serde_json::from_str::<GeneratorEvent>(text)
                    .map_err(|source| Error::Record { line, source })
                    .and_then(GeneratorEvent::validate),
            );
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::particle::Species;
    use std::io::Cursor;

    fn kin(pdg: i32, ke: f64) -> String {
        format!(
            r#"{{"pdg": {}, "energy": {}, "kinetic_energy": {}, "px": 0.0, "py": 0.0, "pz": {}}}"#,
            pdg, ke, ke, ke
        )
    }

    fn event(final_state: &[String]) -> String {
        format!(
            r#"{{"neutrino": {}, "target_pdg": 1000180400, "target_mass": 37215.5, "lepton": {}, "residual": {}, "excitation_energy": 2.29, "two_j": 2, "parity": 1, "final_state": [{}], "xsec": 1.7}}"#,
            kin(12, 10.0),
            kin(11, 5.0),
            kin(1_000_190_400, 0.01),
            final_state.join(", ")
        )
    }

    #[test]
    fn reads_events_and_skips_blank_lines() {
        let input = format!("{}\n\n{}\n", event(&[kin(22, 2.29), kin(11, 1.0)]), event(&[]));
        let events: Vec<GeneratorEvent> = EventReader::new(Cursor::new(input)).collect::<Result<_>>().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].final_state.len(), 2);
        assert_eq!(events[0].residual.pdg, 1_000_190_400);
        assert_eq!(events[0].lepton.momentum(), Vector::new(0.0, 0.0, 5.0));
        assert!(events[1].final_state.is_empty());

        let sources = events[0].sources(Vector::new(1.0, 2.0, 3.0)).unwrap();
        assert_eq!(sources[0].species, Species::Gamma);
        assert_eq!(sources[0].kinetic_energy, 2.29);
        assert_eq!(sources[1].position, Vector::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn reports_line_of_bad_record() {
        let input = format!("{}\n{{\"neutrino\": 3}}\n", event(&[]));
        let mut reader = EventReader::new(Cursor::new(input));
        assert!(reader.next().unwrap().is_ok());
        match reader.next().unwrap() {
            Err(Error::Record { line, .. }) => assert_eq!(line, 2),
            other => panic!("{:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn caps_final_state() {
        let many: Vec<String> = (0..9).map(|_| kin(22, 1.0)).collect();
        let mut reader = EventReader::new(Cursor::new(event(&many)));
        assert!(matches!(reader.next(), Some(Err(Error::TooManyParticles(9)))));
    }

    #[test]
    fn unknown_final_state_species() {
        let mut reader = EventReader::new(Cursor::new(event(&[kin(3122, 1.0)])));
        let ev = reader.next().unwrap().unwrap();
        assert!(matches!(ev.sources(Vector::ZERO), Err(Error::UnknownSpecies(3122))));
    }
}
