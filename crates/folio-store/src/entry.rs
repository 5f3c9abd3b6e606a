use std::collections::{BTreeMap, BTreeSet};

use folio_types::{props, Acl, BaseType, ContentStream, ObjectId, Value};

/// The mutable record for one object.
///
/// An entry without an id is transient: it belongs to whoever built it and
/// becomes durable only when inserted into the store, which assigns the id.
/// Absent properties are absent keys, never empty values.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    id: Option<ObjectId>,
    base_type: BaseType,
    type_id: String,
    properties: BTreeMap<String, Value>,
    policies: BTreeSet<ObjectId>,
    acl: Acl,
    content: Option<ContentStream>,
}

impl Entry {
    /// A transient entry of the given type.
    pub fn new(base_type: BaseType, type_id: impl Into<String>) -> Self {
        let type_id = type_id.into();
        let mut properties = BTreeMap::new();
        properties.insert(props::BASE_TYPE_ID.to_string(), Value::string(base_type.id()));
        properties.insert(props::OBJECT_TYPE_ID.to_string(), Value::string(type_id.clone()));
        Self {
            id: None,
            base_type,
            type_id,
            properties,
            policies: BTreeSet::new(),
            acl: Acl::new(),
            content: None,
        }
    }

    pub fn id(&self) -> Option<&ObjectId> {
        self.id.as_ref()
    }

    /// Returns `true` until the store has assigned an id.
    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }

    pub(crate) fn assign_id(&mut self, id: ObjectId) {
        self.properties
            .insert(props::OBJECT_ID.to_string(), Value::string(id.as_str()));
        if self.content.is_some() {
            self.properties.insert(
                props::CONTENT_STREAM_ID.to_string(),
                Value::string(format!("{id}-content")),
            );
        }
        self.id = Some(id);
    }

    pub fn base_type(&self) -> BaseType {
        self.base_type
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    // ---- Properties ----

    pub fn value(&self, property_id: &str) -> Option<&Value> {
        self.properties.get(property_id)
    }

    /// Replace a property wholesale. `None` unsets it; so does an empty value.
    pub fn set_value(&mut self, property_id: &str, value: Option<Value>) {
        match value {
            Some(v) if !v.is_empty() => {
                self.properties.insert(property_id.to_string(), v);
            }
            _ => {
                self.properties.remove(property_id);
            }
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        &self.properties
    }

    /// First string element of a property.
    pub fn string(&self, property_id: &str) -> Option<&str> {
        self.value(property_id).and_then(Value::as_str)
    }

    /// Boolean flag, treating an absent property as `false`.
    pub fn flag(&self, property_id: &str) -> bool {
        self.value(property_id)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    pub fn name(&self) -> Option<&str> {
        self.string(props::NAME)
    }

    // ---- Policies ----

    pub fn policies(&self) -> &BTreeSet<ObjectId> {
        &self.policies
    }

    pub fn add_policy(&mut self, policy: ObjectId) -> bool {
        self.policies.insert(policy)
    }

    pub fn remove_policy(&mut self, policy: &ObjectId) -> bool {
        self.policies.remove(policy)
    }

    // ---- ACL ----

    pub fn acl(&self) -> &Acl {
        &self.acl
    }

    pub fn set_acl(&mut self, acl: Acl) {
        self.acl = acl;
    }

    // ---- Content ----

    pub fn content(&self) -> Option<&ContentStream> {
        self.content.as_ref()
    }

    pub fn content_len(&self) -> u64 {
        self.content.as_ref().map(ContentStream::len).unwrap_or(0)
    }

    /// Attach or clear content, keeping the content-stream properties in step.
    pub fn set_content(&mut self, content: Option<ContentStream>) {
        match &content {
            Some(cs) => {
                self.set_value(
                    props::CONTENT_STREAM_LENGTH,
                    Some(Value::integer(cs.len() as i64)),
                );
                self.set_value(
                    props::CONTENT_STREAM_MIME_TYPE,
                    Some(Value::string(cs.mime_type.clone())),
                );
                self.set_value(
                    props::CONTENT_STREAM_FILE_NAME,
                    cs.file_name.clone().map(Value::string),
                );
                let stream_id = self.id.as_ref().map(|id| format!("{id}-content"));
                self.set_value(props::CONTENT_STREAM_ID, stream_id.map(Value::string));
            }
            None => {
                for key in [
                    props::CONTENT_STREAM_LENGTH,
                    props::CONTENT_STREAM_MIME_TYPE,
                    props::CONTENT_STREAM_FILE_NAME,
                    props::CONTENT_STREAM_ID,
                ] {
                    self.properties.remove(key);
                }
            }
        }
        self.content = content;
    }

    /// Copy of this entry with no id, suitable for persisting as a new object.
    pub fn detached_copy(&self) -> Entry {
        let mut copy = self.clone();
        copy.id = None;
        copy.properties.remove(props::OBJECT_ID);
        copy
    }
}
