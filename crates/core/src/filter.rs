//! Item stack filters.

use crate::item::ItemStack;
use serde::{Deserialize, Serialize};

/// A two-field equality predicate over item stacks.
///
/// Matches by item kind; when `match_data` is set the candidate's payload
/// must also equal the filter stack's payload. An empty candidate never
/// matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackFilter {
    filter: ItemStack,
    match_data: bool,
}

impl StackFilter {
    /// Create a filter matching by kind only.
    pub fn new(filter: ItemStack) -> Self {
        Self::with_match_data(filter, false)
    }

    /// Create a filter, optionally requiring payload equality.
    pub fn with_match_data(filter: ItemStack, match_data: bool) -> Self {
        Self { filter, match_data }
    }

    /// Rebuild a filter from its serialized form.
    ///
    /// A filter whose stack is empty matches nothing and is dropped here.
    pub fn from_parts(filter: ItemStack, match_data: bool) -> Option<Self> {
        if filter.is_empty() {
            return None;
        }
        Some(Self { filter, match_data })
    }

    /// Whether payload equality is required.
    pub fn match_data(&self) -> bool {
        self.match_data
    }

    /// Set whether payload equality is required.
    pub fn set_match_data(&mut self, match_data: bool) {
        self.match_data = match_data;
    }

    /// The stack this filter compares against.
    pub fn filter_stack(&self) -> &ItemStack {
        &self.filter
    }

    /// Replace the stack this filter compares against.
    pub fn set_filter_stack(&mut self, filter: ItemStack) {
        self.filter = filter;
    }

    /// Whether `stack` passes the filter.
    pub fn matches(&self, stack: &ItemStack) -> bool {
        if stack.is_empty() {
            return false;
        }
        if self.match_data && stack.data != self.filter.data {
            return false;
        }
        stack.kind == self.filter.kind
    }
}
