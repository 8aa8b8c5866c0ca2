use std::io::{BufRead, Write};

use rollcall_core::recognition::domain::decision_surface::{Decision, DecisionSurface};
use rollcall_core::recognition::domain::identity::KnownIdentities;
use rollcall_core::shared::frame::Frame;
use rollcall_core::video::infrastructure::face_snapshot_writer::FaceSnapshotWriter;

pub(crate) const THUMBNAIL_SIZE: u32 = 224;

/// Asks on the terminal who an unrecognised face is.
///
/// The crop is saved as a JPEG so it can be opened alongside the prompt.
/// Answers: `0` enrolls a new person, `n` attaches to the n-th known
/// identity, an empty line (or end of input) skips the face.
pub struct TerminalDecisionSurface<R, W> {
    input: R,
    output: W,
    snapshots: FaceSnapshotWriter,
    default_group: String,
}

impl<R, W> TerminalDecisionSurface<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    pub fn new(input: R, output: W, snapshots: FaceSnapshotWriter) -> Self {
        Self {
            input,
            output,
            snapshots,
            default_group: String::new(),
        }
    }

    /// Group used when enrollment leaves the group blank.
    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = group.into();
        self
    }

    fn prompt(&mut self, text: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        write!(self.output, "{text}")?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    fn enroll(&mut self) -> Result<Decision, Box<dyn std::error::Error>> {
        let name = match self.prompt("Name: ")? {
            Some(name) if !name.is_empty() => name,
            _ => return Ok(Decision::Decline),
        };
        let group = match self.prompt("Group: ")? {
            Some(group) if !group.is_empty() => group,
            _ => self.default_group.clone(),
        };
        Ok(Decision::Enroll { name, group })
    }
}

impl<R, W> DecisionSurface for TerminalDecisionSurface<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn decide(
        &mut self,
        face: &Frame,
        known: &KnownIdentities,
    ) -> Result<Decision, Box<dyn std::error::Error>> {
        let path = self.snapshots.write(face)?;
        writeln!(self.output)?;
        writeln!(self.output, "Unrecognised face saved to {}", path.display())?;
        if known.is_empty() {
            writeln!(self.output, "No known identities yet.")?;
        } else {
            writeln!(self.output, "Known identities:")?;
            for (i, identity) in known.iter().enumerate() {
                writeln!(self.output, "  {}. {} ({})", i + 1, identity.name(), identity.group())?;
            }
        }

        let Some(choice) = self.prompt("0 = new person, number = known identity, Enter = skip: ")?
        else {
            return Ok(Decision::Decline);
        };
        if choice.is_empty() {
            return Ok(Decision::Decline);
        }
        match choice.parse::<usize>() {
            Ok(0) => self.enroll(),
            Ok(n) => match known.iter().nth(n - 1) {
                Some(identity) => Ok(Decision::AttachTo(identity.name().to_string())),
                None => {
                    writeln!(self.output, "No identity number {n}; skipping.")?;
                    Ok(Decision::Decline)
                }
            },
            Err(_) => {
                writeln!(self.output, "Not a number: '{choice}'; skipping.")?;
                Ok(Decision::Decline)
            }
        }
    }
}
