use std::io::Write;

use anyhow::Result;

use super::SessionType;

/// Completion sound and system notification. Both are best-effort: callers
/// log failures and carry on.
pub trait CompletionNotifier: Send + Sync {
    fn play_sound(&self) -> Result<()>;
    fn notify(&self, title: &str, body: &str) -> Result<()>;
}

pub struct NoopNotifier;

impl CompletionNotifier for NoopNotifier {
    fn play_sound(&self) -> Result<()> {
        Ok(())
    }

    fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

/// Rings the terminal bell. Notifications are left to the UI, which shows
/// them in its status line.
pub struct TerminalBell;

impl CompletionNotifier for TerminalBell {
    fn play_sound(&self) -> Result<()> {
        let mut out = std::io::stderr();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }

    fn notify(&self, _title: &str, _body: &str) -> Result<()> {
        Ok(())
    }
}

/// Title and body announcing the end of a session.
pub fn completion_message(finished: SessionType) -> (&'static str, &'static str) {
    match finished {
        SessionType::Work => ("Focus session complete", "Time for a break."),
        SessionType::ShortBreak | SessionType::LongBreak => {
            ("Break is over", "Ready for the next focus session?")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_message() {
        assert_eq!(completion_message(SessionType::Work).0, "Focus session complete");
        assert_eq!(completion_message(SessionType::LongBreak).0, "Break is over");
    }
}
