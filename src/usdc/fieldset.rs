//! Field set assembly.

use std::{collections::BTreeMap, io};

use anyhow::Result;
use tracing::trace;

use crate::sdf::Value;

use super::{CrateFile, Error};

/// Ordered `(name, value)` pairs of one field set.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LiveFieldSet {
    /// Position of the first field in the FIELDSETS stream.
    pub index: usize,
    pub fields: Vec<(String, Value)>,
}

impl LiveFieldSet {
    /// First value stored under `name`.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find_map(|(field, value)| (field == name).then_some(value))
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl<R: io::Read + io::Seek> CrateFile<R> {
    /// Split FIELDSETS into terminated runs and unpack every field.
    ///
    /// Runs are keyed by their start index, which is what specs refer to.
    pub fn live_fieldsets(&mut self) -> Result<BTreeMap<usize, LiveFieldSet>> {
        let mut sets = BTreeMap::new();
        let mut current = LiveFieldSet::default();

        for position in 0..self.fieldsets.len() {
            let Some(field_index) = self.fieldsets[position] else {
                let next = LiveFieldSet {
                    index: position + 1,
                    fields: Vec::new(),
                };

                let set = std::mem::replace(&mut current, next);
                trace!("fieldset[{}] = {} fields", set.index, set.fields.len());
                sets.insert(set.index, set);

                continue;
            };

            let field = *self.fields.get(field_index).ok_or_else(|| {
                Error::format(format!(
                    "Field index {} is out of range ({})",
                    field_index,
                    self.fields.len()
                ))
            })?;

            let name = self.token(field.token_index)?.to_string();
            let value = self.value(field.value_rep)?;

            current.fields.push((name, value));
        }

        // Trailing fields without a terminator don't form a set.
        if !current.fields.is_empty() {
            trace!("Ignoring {} unterminated fields", current.fields.len());
        }

        Ok(sets)
    }
}
