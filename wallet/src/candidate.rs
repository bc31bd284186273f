//! Candidate catalog

use serde::{Deserialize, Serialize};

/// A candidate on the ballot
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    /// Index encrypted into predictions
    pub id: u32,
    pub name: String,
    pub party: String,
    /// Decimal odds as displayed
    pub odds: String,
    /// Polling support in percent
    pub support: f64,
}

impl CandidateProfile {
    pub fn new(id: u32, name: &str, party: &str, odds: &str, support: f64) -> Self {
        Self {
            id,
            name: name.to_string(),
            party: party.to_string(),
            odds: odds.to_string(),
            support,
        }
    }
}

/// Candidates of one market
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateBook {
    profiles: Vec<CandidateProfile>,
}

impl CandidateBook {
    pub fn new(profiles: Vec<CandidateProfile>) -> Self {
        Self { profiles }
    }

    pub fn get(&self, id: u32) -> Option<&CandidateProfile> {
        self.profiles.iter().find(|p| p.id == id)
    }

    /// Candidate name, or `Candidate #<id>` if the id is not in the book
    pub fn display_name(&self, id: u32) -> String {
        self.get(id)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("Candidate #{id}"))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CandidateProfile> {
        self.profiles.iter()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl Default for CandidateBook {
    fn default() -> Self {
        Self::new(vec![
            CandidateProfile::new(0, "John Anderson", "Democratic Party", "1.95", 48.2),
            CandidateProfile::new(1, "Sarah Mitchell", "Republican Party", "2.05", 46.8),
            CandidateProfile::new(2, "Michael Chen", "Independent", "15.00", 5.0),
        ])
    }
}
