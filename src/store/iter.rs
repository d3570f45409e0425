use std::vec;

use crate::group::MessageGroup;

/// One-shot iterator over the groups found by `iterate_groups`.
///
/// Not lazy: every group is read in full before the iterator is returned.
/// That makes it a snapshot, so later writes to the store are not reflected.
#[derive(Debug)]
pub struct GroupIter {
    groups: vec::IntoIter<MessageGroup>,
}

impl GroupIter {
    pub(crate) fn new(groups: Vec<MessageGroup>) -> Self {
        Self {
            groups: groups.into_iter(),
        }
    }
}

impl Iterator for GroupIter {
    type Item = MessageGroup;

    fn next(&mut self) -> Option<MessageGroup> {
        self.groups.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.groups.size_hint()
    }
}

impl ExactSizeIterator for GroupIter {}
