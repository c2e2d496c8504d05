//! Format descriptors and capabilities.
//!
//! A stream's format is described by a [`Structure`]: a media type name such
//! as `video/x-h264` plus an ordered set of typed fields (`width`, `rate`,
//! `stream-format`, ...). [`Caps`] is an ordered list of structures (or ANY)
//! and is used both as a format descriptor on a stream and as the set of
//! formats a decoder factory accepts.
//!
//! # Matching
//!
//! Two structures intersect when their names are equal and every field
//! present in both carries compatible values. Fields present on only one side
//! are unconstrained.
//!
//! ```rust
//! use decproxy::format::{Caps, Structure};
//!
//! let accepted = Caps::from_names("video/x-h264;video/x-vp9");
//! let stream = Caps::from_structure(
//!     Structure::builder("video/x-h264").field("width", 1920).build(),
//! );
//!
//! assert!(accepted.can_intersect(&stream));
//! assert_eq!(stream.media_type(), Some("video/x-h264"));
//! ```

use smallvec::SmallVec;
use std::fmt;

// ============================================================================
// Value
// ============================================================================

/// A typed field value inside a [`Structure`] or tag list.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// String value.
    Str(String),
    /// Signed integer.
    Int(i64),
    /// Unsigned integer (bitrates, durations).
    UInt(u64),
    /// Floating point value.
    Double(f64),
    /// Boolean value.
    Bool(bool),
    /// Rational number (framerates, aspect ratios).
    Fraction(i32, i32),
    /// Alternatives; matches any contained value.
    List(Vec<Value>),
    /// Nested structure.
    Structure(Box<Structure>),
}

impl Value {
    /// Get as string if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 for `Int` and in-range `UInt` values.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Get as u64 for `UInt` and non-negative `Int` values.
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::UInt(n) => Some(*n),
            Value::Int(n) => u64::try_from(*n).ok(),
            _ => None,
        }
    }

    /// Get as f64 if this is a `Double`.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as bool if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as structure if this is a nested `Structure`.
    pub fn as_structure(&self) -> Option<&Structure> {
        match self {
            Value::Structure(s) => Some(s),
            _ => None,
        }
    }

    /// Short type name used in the serialized form.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Double(_) => "double",
            Value::Bool(_) => "boolean",
            Value::Fraction(..) => "fraction",
            Value::List(_) => "list",
            Value::Structure(_) => "structure",
        }
    }

    /// Whether two values have a non-empty intersection.
    ///
    /// A `List` matches when any member matches the other side.
    pub fn intersects(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(items), other) => items.iter().any(|v| v.intersects(other)),
            (this, Value::List(items)) => items.iter().any(|v| this.intersects(v)),
            (Value::Int(_) | Value::UInt(_), Value::Int(_) | Value::UInt(_)) => {
                self.as_int().is_some() && self.as_int() == other.as_int()
            }
            (Value::Fraction(an, ad), Value::Fraction(bn, bd)) => {
                i64::from(*an) * i64::from(*bd) == i64::from(*bn) * i64::from(*ad)
            }
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "\"{}\"", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::UInt(n) => write!(f, "{}", n),
            Value::Double(n) => write!(f, "{}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Fraction(n, d) => write!(f, "{}/{}", n, d),
            Value::List(items) => {
                f.write_str("{ ")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(" }")
            }
            Value::Structure(s) => write!(f, "\"{}\"", s),
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(i64::from(n))
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::UInt(n)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::UInt(u64::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Structure> for Value {
    fn from(s: Structure) -> Self {
        Value::Structure(Box::new(s))
    }
}

// ============================================================================
// Structure
// ============================================================================

/// A named, ordered collection of typed fields.
///
/// Field order is preserved; setting an existing field replaces its value in
/// place.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    name: String,
    fields: Vec<(String, Value)>,
}

impl Structure {
    /// Create an empty structure with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Start building a structure.
    pub fn builder(name: impl Into<String>) -> StructureBuilder {
        StructureBuilder {
            inner: Self::new(name),
        }
    }

    /// The structure name (media type for format descriptors).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Check the structure name.
    pub fn has_name(&self, name: &str) -> bool {
        self.name == name
    }

    /// Replace the structure name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Set a field, replacing an existing value of the same name.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == field) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((field, value)),
        }
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == field).map(|(_, v)| v)
    }

    /// Get a string field.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    /// Get an integer field.
    pub fn get_int(&self, field: &str) -> Option<i64> {
        self.get(field).and_then(Value::as_int)
    }

    /// Get a boolean field.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.get(field).and_then(Value::as_bool)
    }

    /// Check whether a field is present.
    pub fn has_field(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Remove a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(k, _)| k == field)?;
        Some(self.fields.remove(idx).1)
    }

    /// Iterate over fields in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the structure has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copy every field of `other` into this structure, overwriting
    /// fields with the same name and keeping all others.
    pub fn merge_from(&mut self, other: &Structure) {
        for (k, v) in other.iter() {
            self.set(k, v.clone());
        }
    }

    /// Whether this structure and `other` can describe the same stream.
    pub fn can_intersect(&self, other: &Structure) -> bool {
        if self.name != other.name {
            return false;
        }
        self.fields.iter().all(|(k, v)| match other.get(k) {
            Some(ov) => v.intersects(ov),
            None => true,
        })
    }
}

impl fmt::Display for Structure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for (k, v) in &self.fields {
            write!(f, ", {}=({}){}", k, v.type_name(), v)?;
        }
        Ok(())
    }
}

/// Builder for [`Structure`].
#[derive(Debug, Clone)]
pub struct StructureBuilder {
    inner: Structure,
}

impl StructureBuilder {
    /// Add a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.set(name, value);
        self
    }

    /// Finish building.
    pub fn build(self) -> Structure {
        self.inner
    }
}

// ============================================================================
// Caps
// ============================================================================

/// An ordered list of acceptable formats, or ANY.
#[derive(Debug, Clone, PartialEq)]
pub struct Caps {
    any: bool,
    structures: SmallVec<[Structure; 1]>,
}

impl Caps {
    /// Caps matching every format.
    pub fn any() -> Self {
        Self {
            any: true,
            structures: SmallVec::new(),
        }
    }

    /// Caps matching nothing.
    pub fn empty() -> Self {
        Self {
            any: false,
            structures: SmallVec::new(),
        }
    }

    /// Caps holding a single structure.
    pub fn from_structure(structure: Structure) -> Self {
        let mut caps = Self::empty();
        caps.structures.push(structure);
        caps
    }

    /// Caps holding a single field-less structure.
    pub fn new_simple(name: &str) -> Self {
        Self::from_structure(Structure::new(name))
    }

    /// Parse a `;`-separated list of media type names.
    ///
    /// Empty entries are skipped and duplicates are kept only once.
    pub fn from_names(names: &str) -> Self {
        let mut caps = Self::empty();
        for name in names.split(';').map(str::trim).filter(|n| !n.is_empty()) {
            if !caps.structures.iter().any(|s| s.has_name(name)) {
                caps.structures.push(Structure::new(name));
            }
        }
        caps
    }

    /// Whether these are ANY caps.
    pub fn is_any(&self) -> bool {
        self.any
    }

    /// Whether these caps match nothing.
    pub fn is_empty(&self) -> bool {
        !self.any && self.structures.is_empty()
    }

    /// Number of structures.
    pub fn len(&self) -> usize {
        self.structures.len()
    }

    /// Get a structure by index.
    pub fn structure(&self, index: usize) -> Option<&Structure> {
        self.structures.get(index)
    }

    /// Get a mutable structure by index.
    pub fn structure_mut(&mut self, index: usize) -> Option<&mut Structure> {
        self.structures.get_mut(index)
    }

    /// Name of the first structure, i.e. the stream's media type.
    pub fn media_type(&self) -> Option<&str> {
        self.structures.first().map(Structure::name)
    }

    /// Append a structure.
    pub fn append(&mut self, structure: Structure) {
        self.any = false;
        self.structures.push(structure);
    }

    /// Merge another caps' structures into this one.
    pub fn extend(&mut self, other: &Caps) {
        if other.any {
            *self = Caps::any();
            return;
        }
        if self.any {
            return;
        }
        for s in &other.structures {
            if !self.structures.contains(s) {
                self.structures.push(s.clone());
            }
        }
    }

    /// Iterate over structures.
    pub fn iter(&self) -> impl Iterator<Item = &Structure> {
        self.structures.iter()
    }

    /// Whether any structure of `self` intersects any structure of `other`.
    pub fn can_intersect(&self, other: &Caps) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        if self.any || other.any {
            return true;
        }
        self.structures
            .iter()
            .any(|a| other.structures.iter().any(|b| a.can_intersect(b)))
    }
}

impl Default for Caps {
    fn default() -> Self {
        Self::any()
    }
}

impl fmt::Display for Caps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.any {
            return f.write_str("ANY");
        }
        if self.structures.is_empty() {
            return f.write_str("EMPTY");
        }
        for (i, s) in self.structures.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", s)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_set_replaces_in_place() {
        let mut s = Structure::builder("audio/mpeg")
            .field("rate", 44100)
            .field("channels", 2)
            .build();
        s.set("rate", 48000);

        let names: Vec<&str> = s.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["rate", "channels"]);
        assert_eq!(s.get_int("rate"), Some(48000));
    }

    #[test]
    fn test_merge_keeps_existing_fields() {
        let mut a = Structure::builder("r").field("video-port", 1).build();
        let b = Structure::builder("r").field("active", true).build();
        a.merge_from(&b);

        assert_eq!(a.get_int("video-port"), Some(1));
        assert_eq!(a.get_bool("active"), Some(true));
    }

    #[test]
    fn test_from_names_dedups() {
        let caps = Caps::from_names("video/x-pn-realvideo; video/x-pn-realvideo;;image/jpeg");
        assert_eq!(caps.len(), 2);
        assert_eq!(caps.media_type(), Some("video/x-pn-realvideo"));
    }

    #[test]
    fn test_intersection_by_name_and_fields() {
        let template = Caps::from_structure(
            Structure::builder("audio/mpeg")
                .field("mpegversion", Value::List(vec![2.into(), 4.into()]))
                .build(),
        );
        let aac = Caps::from_structure(
            Structure::builder("audio/mpeg")
                .field("mpegversion", 4)
                .field("rate", 48000)
                .build(),
        );
        let mp3 = Caps::from_structure(
            Structure::builder("audio/mpeg").field("mpegversion", 1).build(),
        );

        assert!(template.can_intersect(&aac));
        assert!(!template.can_intersect(&mp3));
        assert!(!template.can_intersect(&Caps::new_simple("audio/x-ac3")));
    }

    #[test]
    fn test_any_and_empty() {
        let h264 = Caps::new_simple("video/x-h264");
        assert!(Caps::any().can_intersect(&h264));
        assert!(!Caps::empty().can_intersect(&h264));
        assert!(!Caps::any().can_intersect(&Caps::empty()));
    }

    #[test]
    fn test_display() {
        let s = Structure::builder("video/x-raw")
            .field("width", 1280)
            .field("framerate", Value::Fraction(30, 1))
            .build();
        assert_eq!(
            s.to_string(),
            "video/x-raw, width=(int)1280, framerate=(fraction)30/1"
        );
        assert_eq!(Caps::any().to_string(), "ANY");
    }
}
