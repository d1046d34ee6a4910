//! Message templates with named slots.
//!
//! A template is a fixed sequence of literal text and slots. Rendering walks
//! the sequence once and writes the value bound to each slot, so a value can
//! never be mistaken for a marker. A slot without a value renders as nothing.

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Node,
    Name,
    Image,
    Time,
    Id,
    Action,
    ExitCode,
    Signal,
    Destination,
    Propagation,
    NetworkName,
    NetworkType,
    RuntimeVersion,
    ApiVersion,
    Os,
    KernelVersion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Piece {
    Text(&'static str),
    Slot(Slot),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pieces: &'static [Piece],
}

impl Template {
    pub const fn new(pieces: &'static [Piece]) -> Self {
        Self { pieces }
    }

    pub fn render(&self, values: &Values<'_>) -> String {
        let mut out = String::new();
        self.render_into(&mut out, values);
        out
    }

    pub fn render_into(&self, out: &mut String, values: &Values<'_>) {
        for piece in self.pieces {
            match piece {
                Piece::Text(text) => out.push_str(text),
                Piece::Slot(slot) => out.push_str(values.get(*slot)),
            }
        }
    }
}

/// Values bound to slots for one render.
#[derive(Debug, Default)]
pub struct Values<'a> {
    bound: Vec<(Slot, Cow<'a, str>)>,
}

impl<'a> Values<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a value to a slot, replacing any earlier binding.
    pub fn set(mut self, slot: Slot, value: impl Into<Cow<'a, str>>) -> Self {
        let value = value.into();
        match self.bound.iter_mut().find(|(s, _)| *s == slot) {
            Some(entry) => entry.1 = value,
            None => self.bound.push((slot, value)),
        }
        self
    }

    pub fn get(&self, slot: Slot) -> &str {
        self.bound
            .iter()
            .find(|(s, _)| *s == slot)
            .map(|(_, v)| v.as_ref())
            .unwrap_or("")
    }
}
