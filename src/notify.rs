use std::io::{self, Write};

use tracing::warn;

use crate::record::SessionType;
use crate::timer::Completion;

/// Something that tells the user a phase has run out.
pub trait Notifier {
    fn phase_completed(&self, module: &str, completion: &Completion);
}

/// Terminal bell plus an optional desktop notification.
#[derive(Debug, Clone, Copy)]
pub struct Chime {
    pub bell: bool,
    pub desktop: bool,
}

impl Chime {
    pub fn new(bell: bool, desktop: bool) -> Self {
        Self { bell, desktop }
    }

    fn ring(&self) {
        let mut out = io::stdout();
        if let Err(e) = out.write_all(b"\x07").and_then(|_| out.flush()) {
            warn!(error = %e, "failed to ring terminal bell");
        }
    }

    fn send_desktop(&self, title: &str, body: &str) {
        if let Err(e) = notify_rust::Notification::new()
            .summary(title)
            .body(body)
            .appname("tomatick")
            .show()
        {
            warn!(error = %e, "failed to send desktop notification");
        }
    }
}

impl Notifier for Chime {
    fn phase_completed(&self, module: &str, completion: &Completion) {
        if self.bell {
            self.ring();
        }
        if self.desktop {
            let (title, body) = completion_message(module, completion);
            self.send_desktop(&title, &body);
        }
    }
}

/// Does nothing; for headless runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Notifier for Silent {
    fn phase_completed(&self, _module: &str, _completion: &Completion) {}
}

pub fn completion_message(module: &str, completion: &Completion) -> (String, String) {
    let title = format!("{} session completed", completion.phase);
    let body = match completion.next {
        Some(SessionType::Rest) => format!("{module}: time for a break."),
        Some(SessionType::Work) => format!("{module}: back to work."),
        None => format!("{module}: all work sessions completed!"),
    };
    (title, body)
}
