//! Marker-file rules.
//!
//! Primary markers confirm a platform on their own. Ambiguous markers only
//! suggest it, and any exclusion marker present vetoes the suggestion.

use crate::repo::SourceRepo;

#[derive(Debug, Clone, Copy)]
pub struct MarkerRules {
    pub primary: &'static [&'static str],
    pub ambiguous: &'static [&'static str],
    pub exclusions: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerMatch {
    Primary(&'static str),
    Ambiguous(&'static str),
    /// An ambiguous marker was found but this exclusion vetoed it.
    Excluded(&'static str),
    None,
}

impl MarkerMatch {
    pub fn is_detected(&self) -> bool {
        matches!(self, Self::Primary(_) | Self::Ambiguous(_))
    }
}

impl MarkerRules {
    pub fn evaluate(&self, repo: &dyn SourceRepo) -> MarkerMatch {
        if let Some(marker) = first_present(repo, self.primary) {
            return MarkerMatch::Primary(marker);
        }

        let Some(suggested) = first_present(repo, self.ambiguous) else {
            return MarkerMatch::None;
        };

        match first_present(repo, self.exclusions) {
            Some(exclusion) => MarkerMatch::Excluded(exclusion),
            None => MarkerMatch::Ambiguous(suggested),
        }
    }
}

fn first_present(repo: &dyn SourceRepo, markers: &[&'static str]) -> Option<&'static str> {
    markers.iter().copied().find(|m| repo.file_exists(m))
}
