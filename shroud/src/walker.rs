//! Tagged-field traversal of PII-bearing records.
//!
//! A reflection-free struct walker: each record type declares its tagged
//! fields through [`SensitiveRecord::fields_mut`], and [`walk`] validates the
//! declaration while flattening nested records into a single ordered list of
//! field handles. The declaration mirrors the tag grammar — exactly one
//! subject id, any number of `data` fields (each with an optional
//! replacement fallback), and `dive` fields recursing into nested records.
//!
//! Implementations are usually written by hand next to the struct; a code
//! generator can emit them just as well. Cyclic `dive` chains cannot be
//! constructed: the walker holds `&mut` borrows of every visited record, and
//! Rust's aliasing rules reject any structure that would make it visit one
//! twice.

use std::fmt;

// ---------------------------------------------------------------------------
// Declarations
// ---------------------------------------------------------------------------

/// How a declared field participates in protection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// The one field holding the subject identifier.
    SubjectId,
    /// A PII field, encrypted in place. `replace` is written back when the
    /// subject's key is gone.
    Data { replace: Option<&'static str> },
    /// A nested record traversed recursively.
    Dive,
}

/// Mutable access to a declared field.
pub enum FieldSlot<'a> {
    Text(&'a mut String),
    Nested(&'a mut dyn SensitiveRecord),
    /// A tagged field whose type the walker cannot protect.
    Unsupported,
}

/// One declared field of a record.
pub struct FieldMut<'a> {
    pub name: &'static str,
    pub kind: FieldKind,
    pub slot: FieldSlot<'a>,
}

impl<'a> FieldMut<'a> {
    pub fn subject_id(name: &'static str, value: &'a mut String) -> Self {
        Self {
            name,
            kind: FieldKind::SubjectId,
            slot: FieldSlot::Text(value),
        }
    }

    pub fn data(name: &'static str, value: &'a mut String) -> Self {
        Self {
            name,
            kind: FieldKind::Data { replace: None },
            slot: FieldSlot::Text(value),
        }
    }

    pub fn data_with_replace(
        name: &'static str,
        value: &'a mut String,
        replace: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Data { replace: Some(replace) },
            slot: FieldSlot::Text(value),
        }
    }

    pub fn dive(name: &'static str, nested: &'a mut dyn SensitiveRecord) -> Self {
        Self {
            name,
            kind: FieldKind::Dive,
            slot: FieldSlot::Nested(nested),
        }
    }
}

/// A record whose PII fields can be walked.
///
/// A record declaring no tagged fields at all is valid and is skipped by
/// the protector.
pub trait SensitiveRecord: Send {
    fn fields_mut(&mut self) -> Vec<FieldMut<'_>>;
}

// ---------------------------------------------------------------------------
// Traversal
// ---------------------------------------------------------------------------

/// A flattened PII field handle.
#[derive(Debug)]
pub struct PiiField<'a> {
    pub name: &'static str,
    pub value: &'a mut String,
    /// Written back in place of ciphertext when the subject is forgotten.
    /// Empty unless the field declared a replacement.
    pub replace: &'static str,
}

/// The outcome of walking one record.
#[derive(Debug)]
pub struct Traversal<'a> {
    pub subject_id: String,
    pub fields: Vec<PiiField<'a>>,
}

/// Errors reported while walking a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    /// The target is not a walkable record.
    UnsupportedType(String),
    /// A tagged field holds a type the walker cannot protect.
    UnsupportedFieldType { field: String },
    /// Zero or multiple subject id fields.
    InvalidTagConfiguration(String),
}

impl fmt::Display for WalkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedType(detail) => write!(f, "unsupported type: {}", detail),
            Self::UnsupportedFieldType { field } => {
                write!(f, "unsupported field type: {}", field)
            }
            Self::InvalidTagConfiguration(detail) => {
                write!(f, "invalid tag configuration: {}", detail)
            }
        }
    }
}

impl std::error::Error for WalkError {}

/// Walks `record`, validating its declaration and flattening nested dives.
///
/// Returns `None` for records declaring no tagged fields — those are
/// ignored rather than rejected. A record declaring data fields without a
/// subject id, or more than one subject id, is a configuration error.
pub fn walk(record: &mut dyn SensitiveRecord) -> Result<Option<Traversal<'_>>, WalkError> {
    let mut subject: Option<String> = None;
    let mut fields = Vec::new();
    collect(record, &mut subject, &mut fields)?;

    match subject {
        Some(subject_id) => Ok(Some(Traversal { subject_id, fields })),
        None if fields.is_empty() => Ok(None),
        None => Err(WalkError::InvalidTagConfiguration(
            "subject id field not found".into(),
        )),
    }
}

fn collect<'a>(
    record: &'a mut dyn SensitiveRecord,
    subject: &mut Option<String>,
    fields: &mut Vec<PiiField<'a>>,
) -> Result<(), WalkError> {
    for field in record.fields_mut() {
        match (field.kind, field.slot) {
            (FieldKind::SubjectId, FieldSlot::Text(value)) => {
                if subject.is_some() {
                    return Err(WalkError::InvalidTagConfiguration(
                        "multiple subject id fields".into(),
                    ));
                }
                *subject = Some(value.clone());
            }
            (FieldKind::Data { replace }, FieldSlot::Text(value)) => {
                fields.push(PiiField {
                    name: field.name,
                    value,
                    replace: replace.unwrap_or(""),
                });
            }
            (FieldKind::Dive, FieldSlot::Nested(nested)) => {
                collect(nested, subject, fields)?;
            }
            (_, _) => {
                return Err(WalkError::UnsupportedFieldType {
                    field: field.name.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Inner {
        street: String,
    }

    impl SensitiveRecord for Inner {
        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            vec![FieldMut::data("street", &mut self.street)]
        }
    }

    struct Outer {
        id: String,
        name: String,
        inner: Inner,
    }

    impl SensitiveRecord for Outer {
        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            vec![
                FieldMut::subject_id("id", &mut self.id),
                FieldMut::data_with_replace("name", &mut self.name, "gone"),
                FieldMut::dive("inner", &mut self.inner),
            ]
        }
    }

    struct NoTags;

    impl SensitiveRecord for NoTags {
        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            Vec::new()
        }
    }

    struct NoSubject {
        val: String,
    }

    impl SensitiveRecord for NoSubject {
        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            vec![FieldMut::data("val", &mut self.val)]
        }
    }

    struct TwoSubjects {
        a: String,
        b: String,
    }

    impl SensitiveRecord for TwoSubjects {
        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            vec![
                FieldMut::subject_id("a", &mut self.a),
                FieldMut::subject_id("b", &mut self.b),
            ]
        }
    }

    struct BadSubjectType {
        val: String,
    }

    impl SensitiveRecord for BadSubjectType {
        fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
            let _ = &mut self.val;
            vec![FieldMut {
                name: "val",
                kind: FieldKind::SubjectId,
                slot: FieldSlot::Unsupported,
            }]
        }
    }

    #[test]
    fn flattens_nested_dives_in_order() {
        let mut outer = Outer {
            id: "kal5430".into(),
            name: "Idir Moore".into(),
            inner: Inner { street: "56559 Von Divide".into() },
        };

        let traversal = walk(&mut outer).unwrap().unwrap();
        assert_eq!(traversal.subject_id, "kal5430");

        let names: Vec<_> = traversal.fields.iter().map(|f| f.name).collect();
        assert_eq!(names, ["name", "street"]);
        let replaces: Vec<_> = traversal.fields.iter().map(|f| f.replace).collect();
        assert_eq!(replaces, ["gone", ""]);
    }

    #[test]
    fn handles_mutate_the_record() {
        let mut outer = Outer {
            id: "kal5430".into(),
            name: "Idir Moore".into(),
            inner: Inner { street: "56559 Von Divide".into() },
        };

        {
            let traversal = walk(&mut outer).unwrap().unwrap();
            for field in traversal.fields {
                *field.value = "X".to_string();
            }
        }
        assert_eq!(outer.name, "X");
        assert_eq!(outer.inner.street, "X");
        assert_eq!(outer.id, "kal5430");
    }

    #[test]
    fn untagged_records_are_skipped() {
        let mut none = NoTags;
        assert!(walk(&mut none).unwrap().is_none());
    }

    #[test]
    fn data_without_subject_is_invalid() {
        let mut target = NoSubject { val: "v".into() };
        assert_eq!(
            walk(&mut target).unwrap_err(),
            WalkError::InvalidTagConfiguration("subject id field not found".into()),
        );
    }

    #[test]
    fn multiple_subjects_are_invalid() {
        let mut target = TwoSubjects { a: "a".into(), b: "b".into() };
        assert!(matches!(
            walk(&mut target).unwrap_err(),
            WalkError::InvalidTagConfiguration(_),
        ));
    }

    #[test]
    fn non_string_subject_is_unsupported() {
        let mut target = BadSubjectType { val: "v".into() };
        assert_eq!(
            walk(&mut target).unwrap_err(),
            WalkError::UnsupportedFieldType { field: "val".into() },
        );
    }
}
