use std::iter::Peekable;

use crate::reduce_partition::record::KeyValue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyGroup {
    pub key: String,
    pub values: Vec<String>,
}

/// Groups adjacent records with equal keys.
pub struct KeyGroups<I: Iterator<Item = KeyValue>> {
    records: Peekable<I>,
}

impl<I: Iterator<Item = KeyValue>> KeyGroups<I> {
    pub fn new(records: I) -> Self {
        Self {
            records: records.peekable(),
        }
    }
}

impl<I: Iterator<Item = KeyValue>> Iterator for KeyGroups<I> {
    type Item = KeyGroup;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.records.next()?;
        let mut values = vec![first.value];
        while let Some(record) = self.records.next_if(|r| r.key == first.key) {
            values.push(record.value);
        }
        Some(KeyGroup {
            key: first.key,
            values,
        })
    }
}
