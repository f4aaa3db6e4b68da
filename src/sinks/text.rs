//! Text payload assembly
//!
//! The exact length of a payload is computed before anything is rendered, so the
//! text lands in one buffer of the right size, usually a `String` recycled with its
//! pooled entry.

use super::config::{CategoryHandling, EventIdHandling};
use crate::core::{EventId, LogMessage};
use std::fmt;

/// Parts of a text payload: `[id] [category] message\nerror`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextPayload<'a> {
    event_id: Option<i32>,
    category: Option<&'a str>,
    message: &'a str,
    error: Option<&'a str>,
}

impl<'a> TextPayload<'a> {
    pub fn new(message: &'a str) -> Self {
        Self {
            event_id: None,
            category: None,
            message,
            error: None,
        }
    }

    /// Payload of `message` under the given handling rules. `error` is the
    /// rendered error chain, if any.
    pub fn for_message(
        message: &'a LogMessage,
        error: Option<&'a str>,
        event_ids: EventIdHandling,
        categories: CategoryHandling,
    ) -> Self {
        Self {
            event_id: event_id_prefix(event_ids, message.event_id()),
            category: match categories {
                CategoryHandling::IncludeInMessage if !message.category().is_empty() => {
                    Some(message.category())
                }
                _ => None,
            },
            message: message.message(),
            error: error.filter(|e| !e.is_empty()),
        }
    }

    /// Exact length in bytes.
    pub fn len(&self) -> usize {
        let mut total = self.message.len();
        if let Some(id) = self.event_id {
            total += 3 + decimal_len(id);
        }
        if let Some(category) = self.category {
            total += 3 + category.len();
        }
        if let Some(error) = self.error {
            total += 1 + error.len();
        }
        total
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn write_to<W: fmt::Write + ?Sized>(&self, out: &mut W) -> fmt::Result {
        if let Some(id) = self.event_id {
            write!(out, "[{}] ", id)?;
        }
        if let Some(category) = self.category {
            out.write_char('[')?;
            out.write_str(category)?;
            out.write_str("] ")?;
        }
        out.write_str(self.message)?;
        if let Some(error) = self.error {
            out.write_char('\n')?;
            out.write_str(error)?;
        }
        Ok(())
    }

    /// Replace the contents of `out`, keeping its allocation.
    pub fn render_into(&self, out: &mut String) {
        out.clear();
        out.reserve(self.len());
        // writing to a String cannot fail
        let _ = self.write_to(out);
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.len());
        let _ = self.write_to(&mut out);
        out
    }
}

fn event_id_prefix(handling: EventIdHandling, event_id: &EventId) -> Option<i32> {
    match handling {
        EventIdHandling::IncludeAlways => Some(event_id.id),
        EventIdHandling::IncludeValidIds if event_id.is_valid() => Some(event_id.id),
        _ => None,
    }
}

/// Number of characters `value` takes in decimal, sign included.
pub(crate) fn decimal_len(value: i32) -> usize {
    let sign = usize::from(value < 0);
    let mut magnitude = value.unsigned_abs();
    let mut digits = 1;
    while magnitude >= 10 {
        magnitude /= 10;
        digits += 1;
    }
    digits + sign
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::LogLevel;

    fn message(category: &str, id: i32, text: &str) -> LogMessage {
        LogMessage::new(category, LogLevel::Info, EventId::new(id), None, text)
    }

    #[test]
    fn test_defaults_produce_bare_message() {
        let msg = message("svc", 7, "hello");
        let payload = TextPayload::for_message(
            &msg,
            None,
            EventIdHandling::default(),
            CategoryHandling::default(),
        );
        assert_eq!(payload.render(), "hello");
        assert_eq!(payload.len(), 5);
    }

    #[test]
    fn test_all_parts() {
        let msg = message("svc", -42, "failed");
        let payload = TextPayload::for_message(
            &msg,
            Some("boom\nCaused by: io"),
            EventIdHandling::IncludeAlways,
            CategoryHandling::IncludeInMessage,
        );
        let text = payload.render();
        assert_eq!(text, "[-42] [svc] failed\nboom\nCaused by: io");
        assert_eq!(payload.len(), text.len());
    }

    #[test]
    fn test_valid_ids_only() {
        for (id, expected) in [(0, "x"), (-1, "x"), (12, "[12] x")] {
            let msg = message("", id, "x");
            let payload = TextPayload::for_message(
                &msg,
                None,
                EventIdHandling::IncludeValidIds,
                CategoryHandling::IncludeInMessage,
            );
            assert_eq!(payload.render(), expected);
        }
    }

    #[test]
    fn test_decimal_len() {
        assert_eq!(decimal_len(0), 1);
        assert_eq!(decimal_len(9), 1);
        assert_eq!(decimal_len(10), 2);
        assert_eq!(decimal_len(-10), 3);
        assert_eq!(decimal_len(i32::MIN), i32::MIN.to_string().len());
        assert_eq!(decimal_len(i32::MAX), 10);
    }

    #[test]
    fn test_render_into_reuses_buffer() {
        let mut out = String::with_capacity(64);
        TextPayload::new("first").render_into(&mut out);
        TextPayload::new("second").render_into(&mut out);
        assert_eq!(out, "second");
        assert!(out.capacity() >= 64);
    }
}
