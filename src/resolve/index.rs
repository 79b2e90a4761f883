//! Reverse lookup from reference strings to tree elements.

use crate::ast::{BodyItem, Book, SectionItem};
use crate::reference::Reference;
use std::collections::HashMap;

/// An addressable element of a compiled book.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target<'a> {
    Container(&'a SectionItem),
    Item(&'a BodyItem),
}

impl<'a> Target<'a> {
    /// Verbatim source of the element.
    pub fn content(&self) -> &'a str {
        match self {
            Target::Container(section) => &section.content,
            Target::Item(item) => item.content(),
        }
    }
}

/// Every referenced element of a book, in document order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceIndex<'a> {
    order: Vec<(&'a str, Target<'a>)>,
    positions: HashMap<&'a str, usize>,
    duplicates: Vec<&'a str>,
}

impl<'a> ReferenceIndex<'a> {
    /// Walk the book and record every element that carries a reference.
    pub fn build(book: &'a Book) -> Self {
        let mut index = Self::default();
        for chapter in &book.chapters {
            index.add_container(chapter);
        }
        index
    }

    fn add_container(&mut self, section: &'a SectionItem) {
        self.insert(&section.reference, Target::Container(section));
        for item in &section.body {
            self.add_item(item);
        }
        for child in &section.sections {
            self.add_container(child);
        }
    }

    fn add_item(&mut self, item: &'a BodyItem) {
        if let Some(reference) = item.reference() {
            self.insert(reference, Target::Item(item));
        }
        for child in item.children() {
            self.add_item(child);
        }
    }

    fn insert(&mut self, reference: &'a str, target: Target<'a>) {
        if self.positions.contains_key(reference) {
            self.duplicates.push(reference);
        } else {
            self.positions.insert(reference, self.order.len());
        }
        self.order.push((reference, target));
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Find an element by its reference string.
    pub fn get(&self, reference: &str) -> Option<Target<'a>> {
        self.positions.get(reference).map(|&pos| self.order[pos].1)
    }

    /// Find the first element a reference addresses.
    pub fn lookup(&self, reference: &Reference) -> Option<Target<'a>> {
        self.get(&reference.start_reference())
    }

    /// All elements from the start of a range to its end, in document order.
    ///
    /// A reference without a range yields its single target. Returns `None`
    /// when either end is missing or the end precedes the start.
    pub fn lookup_range(&self, reference: &Reference) -> Option<Vec<Target<'a>>> {
        let start = *self.positions.get(reference.start_reference().as_str())?;
        let end = match reference.end_reference() {
            Some(end) => *self.positions.get(end.as_str())?,
            None => start,
        };

        if end < start {
            return None;
        }

        Some(
            self.order[start..=end]
                .iter()
                .enumerate()
                .filter(|(offset, (r, _))| self.positions.get(r) == Some(&(start + offset)))
                .map(|(_, (_, target))| *target)
                .collect(),
        )
    }

    /// Reference strings that occur more than once, in the order the
    /// repeats were found. Lookups return the first occurrence.
    pub fn duplicates(&self) -> &[&'a str] {
        &self.duplicates
    }
}
