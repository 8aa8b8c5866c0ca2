use std::fmt::Write as _;
use std::path::Path;

use crate::attendance::attendance_session::AttendanceSession;

const UNKNOWN: &str = "Unknown";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Plain-text attendance report for a finished session.
pub struct AttendanceReport<'a> {
    session: &'a AttendanceSession,
}

impl<'a> AttendanceReport<'a> {
    pub fn new(session: &'a AttendanceSession) -> Self {
        Self { session }
    }

    pub fn render(&self) -> String {
        let subject = self.session.subject().unwrap_or(UNKNOWN);
        let group = self.session.group().unwrap_or(UNKNOWN);
        let date = self.session.started_at().format(DATE_FORMAT);

        let mut out = String::new();
        let _ = writeln!(out, "Generated attendance report for {subject} (Group: {group})");
        let _ = writeln!(out, "Date: {date}");
        let _ = writeln!(out);
        let _ = writeln!(out, "------------------ Recognized students: ------------------");
        for (i, attendee) in self.session.list().iter().enumerate() {
            let _ = writeln!(out, "{}. {} ({})", i + 1, attendee.name, attendee.group);
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.render())
    }
}
