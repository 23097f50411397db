//! Raw coordinate trace.
//!
//! Every contact gets its own 40-character column, indexed from the lowest
//! identifier seen since the last moment no touch was active. An update of that
//! lowest contact starts a new line, so one row roughly corresponds to one frame.

use crate::touch::error::TouchError;
use crate::touch::model::{TouchEvent, TouchEventKind, TouchId};
use std::io::Write;

const COLUMN_WIDTH: u64 = 40;
const MAX_COLUMN: u64 = 16;

pub struct CoordinateTrace<W: Write> {
    out: W,
    min_id: Option<TouchId>,
    active: usize,
}

impl<W: Write> CoordinateTrace<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            min_id: None,
            active: 0,
        }
    }

    pub fn active(&self) -> usize {
        self.active
    }

    /// Records one event. Output failures are swallowed and reported at debug level;
    /// only the active-count underflow is returned.
    pub fn record(&mut self, event: &TouchEvent) -> Result<(), TouchError> {
        let mut underflow = None;
        let line = match event.kind {
            TouchEventKind::Begin => {
                let min = *self.min_id.get_or_insert(event.id);
                self.active += 1;
                self.column_line(min, event, "begin")
            }
            TouchEventKind::Update => {
                let min = self.min_id.unwrap_or(event.id);
                let prefix = if Some(event.id) == self.min_id { "\n" } else { "" };
                format!("{prefix}{}", self.column_line(min, event, ""))
            }
            TouchEventKind::End | TouchEventKind::Cancel => {
                let min = self.min_id.unwrap_or(event.id);
                let label = if event.kind == TouchEventKind::End {
                    "end"
                } else {
                    "cancel"
                };
                let line = self.column_line(min, event, label);
                match self.active.checked_sub(1) {
                    Some(active) => self.active = active,
                    None => {
                        self.active = 0;
                        underflow = Some(TouchError::ActiveCountUnderflow { id: event.id });
                    }
                }
                if self.active == 0 {
                    self.min_id = None;
                }
                line
            }
        };

        if let Err(err) = self.out.write_all(line.as_bytes()).and_then(|_| self.out.flush()) {
            tracing::debug!(?err, "coordinate trace write failed");
        }

        match underflow {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn column_line(&self, min: TouchId, event: &TouchEvent, annotation: &str) -> String {
        let column = event.id.0.saturating_sub(min.0).min(MAX_COLUMN);
        format!(
            "\x1b[{}G{}:{:6.1},{:6.1} ({:6.1},{:6.1}) {}",
            column * COLUMN_WIDTH,
            event.id,
            event.position.x,
            event.position.y,
            event.root.x,
            event.root.y,
            annotation
        )
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
