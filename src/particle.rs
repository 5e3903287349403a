use std::convert::TryFrom;

use crate::error::{Error, Result};

/// Particle species understood by the transport engine's particle table,
/// identified by PDG Monte Carlo code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Species {
    OpticalPhoton,
    Gamma,
    Electron,
    Positron,
    MuonMinus,
    MuonPlus,
    PionPlus,
    PionMinus,
    PionZero,
    Proton,
    Neutron,
    Neutrino(Flavour),
    AntiNeutrino(Flavour),
    Alpha,
    /// Ground-state nucleus, `10LZZZAAAI` encoding with `L = I = 0`.
    Ion { z: u32, a: u32 },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Flavour {
    Electron,
    Muon,
    Tau,
}

const ION_BASE: i32 = 1_000_000_000;

impl Species {
    pub fn from_pdg(pdg: i32) -> Result<Self> {
        use Species::*;
        Ok(match pdg {
            -22 => OpticalPhoton,
            22 => Gamma,
            11 => Electron,
            -11 => Positron,
            13 => MuonMinus,
            -13 => MuonPlus,
            211 => PionPlus,
            -211 => PionMinus,
            111 => PionZero,
            2212 => Proton,
            2112 => Neutron,
            12 => Neutrino(Flavour::Electron),
            14 => Neutrino(Flavour::Muon),
            16 => Neutrino(Flavour::Tau),
            -12 => AntiNeutrino(Flavour::Electron),
            -14 => AntiNeutrino(Flavour::Muon),
            -16 => AntiNeutrino(Flavour::Tau),
            1_000_020_040 => Alpha,
            code if code > ION_BASE && code % 10 == 0 => {
                let body = code - ION_BASE;
                // no strange content (L digit)
                if body / 10_000_000 != 0 {
                    return Err(Error::UnknownSpecies(pdg));
                }
                let z = (body / 10_000) as u32;
                let a = ((body / 10) % 1000) as u32;
                if z == 0 || a < z {
                    return Err(Error::UnknownSpecies(pdg));
                }
                Ion { z, a }
            }
            _ => return Err(Error::UnknownSpecies(pdg)),
        })
    }

    pub fn pdg(self) -> i32 {
        use Species::*;
        match self {
            OpticalPhoton => -22,
            Gamma => 22,
            Electron => 11,
            Positron => -11,
            MuonMinus => 13,
            MuonPlus => -13,
            PionPlus => 211,
            PionMinus => -211,
            PionZero => 111,
            Proton => 2212,
            Neutron => 2112,
            Neutrino(f) => f.lepton_number(),
            AntiNeutrino(f) => -f.lepton_number(),
            Alpha => 1_000_020_040,
            Ion { z, a } => ION_BASE + (z * 10_000 + a * 10) as i32,
        }
    }

    pub fn name(self) -> String {
        use Species::*;
        let name = match self {
            OpticalPhoton => "opticalphoton",
            Gamma => "gamma",
            Electron => "e-",
            Positron => "e+",
            MuonMinus => "mu-",
            MuonPlus => "mu+",
            PionPlus => "pi+",
            PionMinus => "pi-",
            PionZero => "pi0",
            Proton => "proton",
            Neutron => "neutron",
            Neutrino(Flavour::Electron) => "nu_e",
            Neutrino(Flavour::Muon) => "nu_mu",
            Neutrino(Flavour::Tau) => "nu_tau",
            AntiNeutrino(Flavour::Electron) => "anti_nu_e",
            AntiNeutrino(Flavour::Muon) => "anti_nu_mu",
            AntiNeutrino(Flavour::Tau) => "anti_nu_tau",
            Alpha => "alpha",
            Ion { z, a } => return format!("ion(Z={}, A={})", z, a),
        };
        name.to_owned()
    }
}

impl Flavour {
    fn lepton_number(self) -> i32 {
        match self {
            Flavour::Electron => 12,
            Flavour::Muon => 14,
            Flavour::Tau => 16,
        }
    }
}

impl TryFrom<i32> for Species {
    type Error = Error;

    fn try_from(pdg: i32) -> Result<Self> {
        Species::from_pdg(pdg)
    }
}

impl From<Species> for i32 {
    fn from(s: Species) -> i32 {
        s.pdg()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn pdg_round_trip() {
        for &code in &[-22, 22, 11, -11, 13, -13, 211, -211, 111, 2212, 2112, 12, -14, 16, 1_000_020_040] {
            assert_eq!(Species::from_pdg(code).unwrap().pdg(), code);
        }
    }

    #[test]
    fn nuclei() {
        let k40 = Species::from_pdg(1_000_190_400).unwrap();
        assert_eq!(k40, Species::Ion { z: 19, a: 40 });
        assert_eq!(k40.pdg(), 1_000_190_400);
        assert_eq!(Species::from_pdg(1_000_020_040).unwrap(), Species::Alpha);
        // excited state and hypernucleus are not in the table
        assert!(Species::from_pdg(1_000_190_401).is_err());
        assert!(Species::from_pdg(1_010_190_400).is_err());
    }

    #[test]
    fn unknown_codes_fail() {
        for &code in &[0, 1, 99, 3122, -2212] {
            match Species::from_pdg(code) {
                Err(Error::UnknownSpecies(c)) => assert_eq!(c, code),
                other => panic!("{:?}", other),
            }
        }
    }

    #[test]
    fn serde_uses_pdg_codes() {
        let s: Species = serde_json::from_str("11").unwrap();
        assert_eq!(s, Species::Electron);
        assert_eq!(s.name(), "e-");
        assert_eq!(serde_json::to_string(&Species::OpticalPhoton).unwrap(), "-22");
        assert!(serde_json::from_str::<Species>("4").is_err());
    }
}
