//! Conversation transcript with typing placeholders.
//!
//! The transcript is an ordered list of lines. While a peer is typing, one
//! placeholder line for that peer sits in the list, and a side map records its
//! index. Removing a placeholder shifts every later line up by one, so the
//! map is compacted in the same call that edits the list.
//!
//! # Invariants
//!
//! - Every mapped index is in bounds and points at a [`LineKind::Typing`] line
//!   whose `from` is the mapped peer.
//! - Mapped indices are distinct, and each peer has at most one placeholder.

use std::collections::HashMap;

use duet_proto::{ChatEvent, ColorTag, UserId};

/// What a line represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Chat from a peer.
    Received,
    /// Our own chat, echoed locally.
    Sent,
    /// A peer is typing. Text is the animation glyph.
    Typing,
}

/// One transcript line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Line kind
    pub kind: LineKind,
    /// Author
    pub from: UserId,
    /// Body, or the spinner glyph for placeholders
    pub text: String,
    /// Author's colour
    pub color: ColorTag,
    /// Local time the line was added, `[HH:MM]`
    pub stamp: String,
}

/// Ordered conversation lines plus the placeholder index.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    lines: Vec<Line>,
    placeholders: HashMap<UserId, usize>,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// All lines, oldest first.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Number of lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True if there are no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Index of `peer`'s placeholder, if they are typing.
    pub fn placeholder(&self, peer: &UserId) -> Option<usize> {
        self.placeholders.get(peer).copied()
    }

    /// All tracked placeholders as `(peer, index)`.
    pub fn placeholders(&self) -> impl Iterator<Item = (&UserId, usize)> {
        self.placeholders.iter().map(|(peer, index)| (peer, *index))
    }

    /// True if any peer is typing.
    pub fn has_placeholders(&self) -> bool {
        !self.placeholders.is_empty()
    }

    /// Append a chat line from a peer.
    pub fn push_received(&mut self, chat: &ChatEvent) {
        self.push(LineKind::Received, chat.from.clone(), chat.text.clone(), chat.color);
    }

    /// Append our own chat line.
    pub fn push_sent(&mut self, chat: &ChatEvent) {
        self.push(LineKind::Sent, chat.from.clone(), chat.text.clone(), chat.color);
    }

    /// Show that `peer` is typing.
    ///
    /// Appends a placeholder unless one is already tracked. Returns `true` if
    /// a line was added.
    pub fn begin_typing(&mut self, peer: &UserId, color: ColorTag, glyph: &str) -> bool {
        if self.placeholders.contains_key(peer) {
            return false;
        }
        let index = self.lines.len();
        self.push(LineKind::Typing, peer.clone(), glyph.to_owned(), color);
        self.placeholders.insert(peer.clone(), index);
        true
    }

    /// Remove `peer`'s placeholder, if any. Returns `true` if a line was removed.
    pub fn end_typing(&mut self, peer: &UserId) -> bool {
        let Some(removed) = self.placeholders.remove(peer) else {
            return false;
        };
        self.lines.remove(removed);
        for index in self.placeholders.values_mut() {
            if *index >= removed {
                *index -= 1;
            }
        }
        true
    }

    /// Redraw every placeholder with `glyph`. Indices do not move.
    pub fn animate(&mut self, glyph: &str) {
        for &index in self.placeholders.values() {
            if let Some(line) = self.lines.get_mut(index) {
                line.text.clear();
                line.text.push_str(glyph);
            }
        }
    }

    /// Check the placeholder invariants, describing the first violation.
    pub fn verify(&self) -> Result<(), String> {
        let mut seen = vec![false; self.lines.len()];
        for (peer, &index) in &self.placeholders {
            let Some(line) = self.lines.get(index) else {
                return Err(format!("{peer}: index {index} out of bounds ({})", self.lines.len()));
            };
            if line.kind != LineKind::Typing || &line.from != peer {
                return Err(format!("{peer}: index {index} points at {:?} by {}", line.kind, line.from));
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(format!("{peer}: index {index} shared"));
            }
        }
        let typing_lines = self.lines.iter().filter(|line| line.kind == LineKind::Typing).count();
        if typing_lines != self.placeholders.len() {
            return Err(format!(
                "{typing_lines} placeholder lines but {} tracked",
                self.placeholders.len()
            ));
        }
        Ok(())
    }

    fn push(&mut self, kind: LineKind, from: UserId, text: String, color: ColorTag) {
        self.lines.push(Line { kind, from, text, color, stamp: stamp() });
    }
}

fn stamp() -> String {
    chrono::Local::now().format("[%H:%M]").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> UserId {
        UserId::parse(s).unwrap()
    }

    fn chat(from: &str, text: &str) -> ChatEvent {
        ChatEvent { to: id("me"), from: id(from), text: text.into(), color: 3 }
    }

    #[test]
    fn repeated_typing_true_is_noop() {
        let mut transcript = Transcript::new();
        assert!(transcript.begin_typing(&id("bob"), 1, "."));
        assert!(!transcript.begin_typing(&id("bob"), 1, "."));

        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.placeholder(&id("bob")), Some(0));
    }

    #[test]
    fn typing_false_without_placeholder_is_noop() {
        let mut transcript = Transcript::new();
        transcript.push_received(&chat("bob", "hello"));

        assert!(!transcript.end_typing(&id("bob")));
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn removal_shifts_later_placeholders() {
        let mut transcript = Transcript::new();
        transcript.begin_typing(&id("bob"), 1, ".");
        transcript.push_received(&chat("dave", "between"));
        transcript.begin_typing(&id("carol"), 2, ".");
        assert_eq!(transcript.placeholder(&id("carol")), Some(2));

        transcript.end_typing(&id("bob"));

        assert_eq!(transcript.placeholder(&id("carol")), Some(1));
        assert_eq!(transcript.lines()[1].from, id("carol"));
        transcript.verify().unwrap();
    }

    #[test]
    fn removal_leaves_earlier_placeholders() {
        let mut transcript = Transcript::new();
        transcript.begin_typing(&id("bob"), 1, ".");
        transcript.begin_typing(&id("carol"), 2, ".");

        transcript.end_typing(&id("carol"));

        assert_eq!(transcript.placeholder(&id("bob")), Some(0));
        transcript.verify().unwrap();
    }

    #[test]
    fn animate_rewrites_only_placeholders() {
        let mut transcript = Transcript::new();
        transcript.push_received(&chat("bob", "hi"));
        transcript.begin_typing(&id("bob"), 1, ".");

        transcript.animate("...");

        assert_eq!(transcript.lines()[0].text, "hi");
        assert_eq!(transcript.lines()[1].text, "...");
        assert_eq!(transcript.placeholder(&id("bob")), Some(1));
    }

    #[test]
    fn sent_and_received_lines_keep_author() {
        let mut transcript = Transcript::new();
        transcript.push_received(&chat("bob", "hi"));
        transcript.push_sent(&ChatEvent { to: id("bob"), from: id("me"), text: "yo".into(), color: 9 });

        let kinds: Vec<_> = transcript.lines().iter().map(|l| (l.kind, l.from.as_str())).collect();
        assert_eq!(kinds, vec![(LineKind::Received, "bob"), (LineKind::Sent, "me")]);
        assert!(transcript.lines()[0].stamp.starts_with('['));
    }
}
