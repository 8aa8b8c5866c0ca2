use crate::recognition::domain::identity::KnownIdentities;
use crate::shared::frame::Frame;

/// Outcome of asking a person about a face nobody recognised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Create a new identity from this face.
    Enroll { name: String, group: String },
    /// The face belongs to an existing identity; keep it as another sample.
    AttachTo(String),
    /// Leave the face unresolved for now.
    Decline,
}

/// Interactive fallback for unmatched faces.
///
/// Blocking from the caller's point of view: the resolver waits for the
/// answer before moving on to the next face.
pub trait DecisionSurface: Send {
    fn decide(
        &mut self,
        face: &Frame,
        known: &KnownIdentities,
    ) -> Result<Decision, Box<dyn std::error::Error>>;
}

/// Surface for unattended runs: never enrolls anyone.
pub struct DeclineAllSurface;

impl DecisionSurface for DeclineAllSurface {
    fn decide(
        &mut self,
        _face: &Frame,
        _known: &KnownIdentities,
    ) -> Result<Decision, Box<dyn std::error::Error>> {
        Ok(Decision::Decline)
    }
}
