//! The three binary targets and their 3-bit tuple encoding.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of independent binary labels.
pub const NUM_LABELS: usize = 3;

/// Number of distinct label tuples, `2^NUM_LABELS`.
pub const NUM_TUPLES: usize = 1 << NUM_LABELS;

/// One of the binary targets predicted for every change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    /// The edit was made by a flagged bot account.
    Bot,
    /// The editor marked the change as minor.
    Minor,
    /// The change created a new page.
    New,
}

impl Label {
    /// All labels in tuple order.
    pub const ALL: [Label; NUM_LABELS] = [Label::Bot, Label::Minor, Label::New];

    /// Position of this label inside a [`LabelSet`] and the weight matrix.
    pub fn index(self) -> usize {
        match self {
            Label::Bot => 0,
            Label::Minor => 1,
            Label::New => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Label::Bot => "bot",
            Label::Minor => "minor",
            Label::New => "new",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A `(bot, minor, new)` tuple of binary labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelSet {
    pub bot: bool,
    pub minor: bool,
    pub new: bool,
}

impl LabelSet {
    pub fn new(bot: bool, minor: bool, new: bool) -> Self {
        Self { bot, minor, new }
    }

    /// Read a single label.
    pub fn get(&self, label: Label) -> bool {
        match label {
            Label::Bot => self.bot,
            Label::Minor => self.minor,
            Label::New => self.new,
        }
    }

    /// Set a single label.
    pub fn set(&mut self, label: Label, value: bool) {
        match label {
            Label::Bot => self.bot = value,
            Label::Minor => self.minor = value,
            Label::New => self.new = value,
        }
    }

    /// Target value of a label as `0.0` or `1.0`.
    pub fn target(&self, label: Label) -> f64 {
        if self.get(label) { 1.0 } else { 0.0 }
    }

    /// Lexicographic position of the tuple in `{0,1}^3`, i.e.
    /// `4*bot + 2*minor + new`.
    pub fn tuple_index(&self) -> usize {
        (self.bot as usize) << 2 | (self.minor as usize) << 1 | self.new as usize
    }

    /// Inverse of [`LabelSet::tuple_index`]. Only the low three bits are read.
    pub fn from_tuple_index(index: usize) -> Self {
        Self {
            bot: index & 0b100 != 0,
            minor: index & 0b010 != 0,
            new: index & 0b001 != 0,
        }
    }

    /// Every tuple in lexicographic order.
    pub fn all() -> impl Iterator<Item = LabelSet> {
        (0..NUM_TUPLES).map(LabelSet::from_tuple_index)
    }
}

impl fmt::Display for LabelSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({},{},{})",
            self.bot as u8, self.minor as u8, self.new as u8
        )
    }
}
