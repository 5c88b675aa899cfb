//! Phonetic transcription parsing
//!
//! A transcription is split into elements: phones plus the pseudo-elements
//! that mark stress, syllable boundaries and word boundaries. Diacritics,
//! modifier letters, length marks and tie bars never stand alone; they are
//! attached to the phone they follow.

use std::fmt;
use std::ops::Range;

pub const PRIMARY_STRESS: char = 'ˈ';
pub const SECONDARY_STRESS: char = 'ˌ';
pub const SYLLABLE_BOUNDARY: char = '.';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpaElementKind {
    Phone,
    PrimaryStress,
    SecondaryStress,
    SyllableBoundary,
    WordBoundary,
}

impl IpaElementKind {
    pub fn is_stress(self) -> bool {
        matches!(self, IpaElementKind::PrimaryStress | IpaElementKind::SecondaryStress)
    }

    /// Stress and boundary pseudo-elements
    pub fn is_marker(self) -> bool {
        self != IpaElementKind::Phone
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpaElement {
    pub kind: IpaElementKind,
    pub text: String,
}

impl IpaElement {
    fn new(kind: IpaElementKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// Parsed phonetic transcription of one group
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IpaTranscript {
    elements: Vec<IpaElement>,
}

/// Characters that modify the preceding phone
fn attaches_to_previous(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'   // combining diacritics, including tie bars
        | '\u{1DC0}'..='\u{1DFF}' // combining diacritics supplement
        | '\u{02B0}'..='\u{02FF}' // modifier letters, length marks
        | '\u{1D2C}'..='\u{1D6A}' // superscript modifiers
        | '\u{2071}' | '\u{207F}'
    ) && c != PRIMARY_STRESS
        && c != SECONDARY_STRESS
}

fn is_tie(c: char) -> bool {
    matches!(c, '\u{0361}' | '\u{035C}' | '\u{203F}')
}

impl IpaTranscript {
    pub fn parse(text: &str) -> Self {
        let mut elements: Vec<IpaElement> = Vec::new();
        let mut tie_pending = false;

        for c in text.trim().chars() {
            let kind = if c.is_whitespace() {
                Some(IpaElementKind::WordBoundary)
            } else if c == PRIMARY_STRESS {
                Some(IpaElementKind::PrimaryStress)
            } else if c == SECONDARY_STRESS {
                Some(IpaElementKind::SecondaryStress)
            } else if c == SYLLABLE_BOUNDARY {
                Some(IpaElementKind::SyllableBoundary)
            } else {
                None
            };

            match kind {
                Some(IpaElementKind::WordBoundary) => {
                    tie_pending = false;
                    // runs of whitespace collapse into one boundary
                    if elements.last().map(|e| e.kind) != Some(IpaElementKind::WordBoundary) {
                        elements.push(IpaElement::new(IpaElementKind::WordBoundary, " "));
                    }
                }
                Some(kind) => {
                    tie_pending = false;
                    elements.push(IpaElement::new(kind, c.to_string()));
                }
                None => {
                    let joins = tie_pending || attaches_to_previous(c) || is_tie(c);
                    match elements.last_mut() {
                        Some(last) if joins && last.kind == IpaElementKind::Phone => {
                            last.text.push(c);
                        }
                        _ => elements.push(IpaElement::new(IpaElementKind::Phone, c.to_string())),
                    }
                    tie_pending = is_tie(c);
                }
            }
        }
        Self { elements }
    }

    pub fn elements(&self) -> &[IpaElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Element ranges of the words, split at word boundaries
    pub fn words(&self) -> Vec<Range<usize>> {
        self.split_ranges(|kind| match kind {
            IpaElementKind::WordBoundary => Split::Drop,
            _ => Split::Keep,
        })
    }

    /// Element ranges of the syllables. A syllable ends at a syllable or
    /// word boundary; a stress marker opens a new syllable and belongs to it.
    pub fn syllables(&self) -> Vec<Range<usize>> {
        self.split_ranges(|kind| match kind {
            IpaElementKind::WordBoundary | IpaElementKind::SyllableBoundary => Split::Drop,
            k if k.is_stress() => Split::Start,
            _ => Split::Keep,
        })
    }

    fn split_ranges(&self, rule: impl Fn(IpaElementKind) -> Split) -> Vec<Range<usize>> {
        let mut ranges = Vec::new();
        let mut start = 0;
        for (i, element) in self.elements.iter().enumerate() {
            match rule(element.kind) {
                Split::Keep => {}
                Split::Drop => {
                    if start < i {
                        ranges.push(start..i);
                    }
                    start = i + 1;
                }
                Split::Start => {
                    if start < i {
                        ranges.push(start..i);
                    }
                    start = i;
                }
            }
        }
        if start < self.elements.len() {
            ranges.push(start..self.elements.len());
        }
        ranges
    }

    /// Text of a range of elements
    pub fn render(&self, range: Range<usize>) -> String {
        self.elements[range].iter().map(|e| e.text.as_str()).collect()
    }

    /// Label a phone is matched against: the phone itself, preceded by the
    /// stress marker right before it if there is one.
    pub fn phone_label(&self, index: usize) -> Option<String> {
        let element = self.elements.get(index)?;
        if element.kind != IpaElementKind::Phone {
            return None;
        }
        let stress = index
            .checked_sub(1)
            .and_then(|i| self.elements.get(i))
            .filter(|e| e.kind.is_stress());
        Some(match stress {
            Some(s) => format!("{}{}", s.text, element.text),
            None => element.text.clone(),
        })
    }

    /// First and last phone inside `range`, skipping marker elements
    pub fn phone_span(&self, range: Range<usize>) -> Option<(usize, usize)> {
        let first = range
            .clone()
            .find(|&i| self.elements[i].kind == IpaElementKind::Phone)?;
        let last = range
            .rev()
            .find(|&i| self.elements[i].kind == IpaElementKind::Phone)?;
        Some((first, last))
    }
}

enum Split {
    Keep,
    Drop,
    Start,
}

impl fmt::Display for IpaTranscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for element in &self.elements {
            f.write_str(&element.text)?;
        }
        Ok(())
    }
}
