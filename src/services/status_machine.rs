//! Application status transitions.
//!
//! HR historically could set any status from any other status, so the default
//! policy is [`TransitionPolicy::Permissive`]. The forward-only policy encodes
//! the intended pipeline (`Applied → Interviewing → Offered | Rejected`) and can
//! be switched on through configuration.
//!
//! Whether a stale offer letter should be dropped when an application leaves
//! `Offered` is still an open product decision, hence [`OfferLetterPolicy`].

use crate::error::{Error, Result};
use crate::models::application::{ApplicationPatch, ApplicationStatus, OfferLetterChange};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    /// Any status may be written over any other status.
    #[default]
    Permissive,
    /// Only moves along the hiring pipeline, plus same-status writes.
    Forward,
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" | "any" => Ok(Self::Permissive),
            "forward" | "forward-only" => Ok(Self::Forward),
            other => Err(format!("unknown transition policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OfferLetterPolicy {
    /// Leave a previously written offer URL in place.
    #[default]
    Retain,
    /// Drop the offer URL when the new status is not `Offered`.
    ClearOnExit,
}

impl FromStr for OfferLetterPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" | "keep" => Ok(Self::Retain),
            "clear" | "clear-on-exit" => Ok(Self::ClearOnExit),
            other => Err(format!("unknown offer letter policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatusMachine {
    pub transitions: TransitionPolicy,
    pub offer_letter: OfferLetterPolicy,
}

impl StatusMachine {
    pub fn new(transitions: TransitionPolicy, offer_letter: OfferLetterPolicy) -> Self {
        Self {
            transitions,
            offer_letter,
        }
    }

    pub fn allows(&self, from: ApplicationStatus, to: ApplicationStatus) -> bool {
        use ApplicationStatus::*;

        match self.transitions {
            TransitionPolicy::Permissive => true,
            TransitionPolicy::Forward => {
                from == to
                    || matches!(
                        (from, to),
                        (Applied, Interviewing)
                            | (Applied, Rejected)
                            | (Interviewing, Offered)
                            | (Interviewing, Rejected)
                            | (Offered, Rejected)
                    )
            }
        }
    }

    /// Builds the patch for an HR status edit.
    ///
    /// The offer URL is written only when the target is `Offered` and a URL was
    /// supplied with the same edit. Nothing else is ever part of the patch.
    pub fn transition(
        &self,
        from: ApplicationStatus,
        to: ApplicationStatus,
        offer_letter_url: Option<String>,
    ) -> Result<ApplicationPatch> {
        if !self.allows(from, to) {
            return Err(Error::ValidationFailed(format!(
                "invalid status transition from {} to {}",
                from, to
            )));
        }

        let offer_letter_url = match (to, offer_letter_url) {
            (ApplicationStatus::Offered, Some(url)) => OfferLetterChange::Set(url),
            (ApplicationStatus::Offered, None) => OfferLetterChange::Keep,
            (_, _) => match self.offer_letter {
                OfferLetterPolicy::Retain => OfferLetterChange::Keep,
                OfferLetterPolicy::ClearOnExit => OfferLetterChange::Clear,
            },
        };

        Ok(ApplicationPatch {
            status: Some(to),
            offer_letter_url,
        })
    }
}
