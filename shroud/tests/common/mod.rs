//! Shared test fixtures: the profile family exercised by the protector and
//! factory scenarios.
#![allow(dead_code)]

use shroud::{FieldMut, SensitiveRecord};

#[derive(Clone, Debug, PartialEq)]
pub struct Address {
    pub street: String,
}

impl SensitiveRecord for Address {
    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![FieldMut::data("street", &mut self.street)]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Profile {
    pub user_id: String,
    pub fullname: String,
    pub gender: String,
    pub address: Address,
    pub country: String,
}

impl Profile {
    pub fn sample(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            fullname: "Idir Moore".into(),
            gender: "M".into(),
            address: Address { street: "56559 Von Divide".into() },
            country: "MA".into(),
        }
    }
}

impl SensitiveRecord for Profile {
    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::subject_id("user_id", &mut self.user_id),
            FieldMut::data_with_replace("fullname", &mut self.fullname, "deleted pii"),
            FieldMut::data("gender", &mut self.gender),
            FieldMut::dive("address", &mut self.address),
        ]
    }
}

/// A record with no tagged fields at all; the protector skips it.
#[derive(Clone, Debug, PartialEq)]
pub struct NotPii {
    pub val: String,
}

impl SensitiveRecord for NotPii {
    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        Vec::new()
    }
}

/// Data fields without a subject id: a tag-configuration error.
pub struct NoSubject {
    pub val: String,
}

impl SensitiveRecord for NoSubject {
    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![FieldMut::data("val", &mut self.val)]
    }
}

/// Two subject ids: a tag-configuration error.
pub struct TwoSubjects {
    pub a: String,
    pub b: String,
}

impl SensitiveRecord for TwoSubjects {
    fn fields_mut(&mut self) -> Vec<FieldMut<'_>> {
        vec![
            FieldMut::subject_id("a", &mut self.a),
            FieldMut::subject_id("b", &mut self.b),
        ]
    }
}
