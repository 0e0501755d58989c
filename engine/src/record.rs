//! A record: the root [`Hash`] of one input item.
//!
//! Besides its regular fields a record carries virtual fields (set by the
//! host, e.g. `_id`) and a reject flag. Virtual fields are visible to reads
//! but are only emitted once a `retain` promotes them to regular fields.

use std::ops::{Deref, DerefMut};

use crate::error::FixResult;
use crate::value::path;
use crate::value::{FixPath, Hash, Value};

/// Virtual field holding the record identifier.
pub const ID_FIELD: &str = "_id";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Hash,
    virtual_fields: Hash,
    reject: bool,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a record with the `_id` virtual field set.
    pub fn with_id(id: impl Into<String>) -> Self {
        let mut record = Self::new();
        record.put_virtual_field(ID_FIELD, id.into());
        record
    }

    /// Copy of this record for a transform pass.
    ///
    /// Nested values are duplicated along with the top-level entries, so
    /// later writes to the clone never reach the original.
    pub fn shallow_clone(&self) -> Self {
        self.clone()
    }

    pub fn is_rejected(&self) -> bool {
        self.reject
    }

    pub fn set_reject(&mut self, reject: bool) {
        self.reject = reject;
    }

    pub fn virtual_fields(&self) -> &Hash {
        &self.virtual_fields
    }

    pub fn put_virtual_field(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.virtual_fields.put(field, value);
    }

    /// Regular fields.
    pub fn as_hash(&self) -> &Hash {
        &self.fields
    }

    pub fn into_hash(self) -> Hash {
        self.fields
    }

    /// Regular field(s) matching `pattern`, falling back to virtual fields.
    pub fn get(&self, pattern: &str) -> Option<Value> {
        if self.fields.contains_field(pattern) {
            self.fields.get(pattern)
        } else {
            self.virtual_fields.get(pattern)
        }
    }

    /// Resolve a dotted path; the first segment may name a virtual field.
    pub fn find(&self, path: &str) -> Option<Value> {
        let fix_path = FixPath::new(path);
        let head = self.get(fix_path.head())?;
        path::find_in_value(&head, fix_path.tail())
    }

    pub fn contains_path(&self, path: &str) -> bool {
        self.find(path).is_some()
    }

    /// Append every value resolved from `old_path` at `new_path`.
    pub fn copy(&mut self, old_path: &str, new_path: &str) -> FixResult<()> {
        let values = self.find(old_path);
        path::copy_values(&mut self.fields, values, &FixPath::new(new_path))
    }

    /// Keep only fields matching `patterns`, promoting matching virtual fields.
    pub fn retain_fields<S: AsRef<str>>(&mut self, patterns: &[S]) {
        self.virtual_fields.retain_fields(patterns);
        for (field, value) in self.virtual_fields.iter() {
            if !self.fields.contains_field(field) {
                self.fields.put(field.clone(), value.clone());
            }
        }
        self.fields.retain_fields(patterns);
    }
}

impl Deref for Record {
    type Target = Hash;

    fn deref(&self) -> &Hash {
        &self.fields
    }
}

impl DerefMut for Record {
    fn deref_mut(&mut self) -> &mut Hash {
        &mut self.fields
    }
}

impl From<Hash> for Record {
    fn from(fields: Hash) -> Self {
        Self {
            fields,
            ..Self::default()
        }
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.fields, f)
    }
}
