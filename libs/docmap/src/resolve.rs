//! Type Descriptor Resolver: inspects a record type once and validates it.

use std::any::TypeId;
use std::collections::HashSet;

use crate::error::UnsupportedTypeError;
use crate::schema::{Record, RecordRef, TypeDescriptor};

/// Describe `T`'s fields in declaration order.
///
/// Fails when the type exposes no convertible field or when two fields map
/// to the same attribute name. Pure; the result is safe to keep forever.
pub fn resolve<T: Record>() -> Result<TypeDescriptor<T>, UnsupportedTypeError> {
    let type_name = T::type_name();
    let fields = T::fields();

    if fields.is_empty() {
        return Err(UnsupportedTypeError::new(type_name, "record exposes no fields"));
    }
    if fields.iter().all(|f| f.is_ignored()) {
        return Err(UnsupportedTypeError::new(type_name, "every field is ignored"));
    }

    let mut seen = HashSet::new();
    for field in fields.iter().filter(|f| !f.is_ignored()) {
        if !seen.insert(field.name()) {
            return Err(UnsupportedTypeError::new(
                type_name,
                format!("attribute name '{}' is used by more than one field", field.name()),
            )
            .on_field(field.member_name()));
        }
    }

    Ok(TypeDescriptor::new(type_name, fields))
}

/// Reject record types that can reach themselves through nested fields.
///
/// Runs over shapes only, so it never touches the codec cache and cannot
/// deadlock on a half-built entry.
pub fn check_acyclic<T: Record>() -> Result<(), UnsupportedTypeError> {
    let mut path = Vec::new();
    let mut done = HashSet::new();
    visit(RecordRef::of::<T>(), &mut path, &mut done)
}

fn visit(
    record: RecordRef,
    path: &mut Vec<RecordRef>,
    done: &mut HashSet<TypeId>,
) -> Result<(), UnsupportedTypeError> {
    if let Some(start) = path.iter().position(|r| *r == record) {
        let cycle = path[start..]
            .iter()
            .chain(std::iter::once(&record))
            .map(|r| r.name())
            .collect::<Vec<_>>()
            .join(" -> ");
        return Err(UnsupportedTypeError::new(
            path[0].name(),
            format!("recursive record types are not supported: {cycle}"),
        ));
    }
    if done.contains(&record.type_id()) {
        return Ok(());
    }

    path.push(record);
    for shape in record.nested() {
        if let Some(child) = shape.nested_record() {
            visit(child, path, done)?;
        }
    }
    path.pop();
    done.insert(record.type_id());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Category, FieldDescriptor};

    #[derive(Default)]
    struct Pair {
        left: i32,
        right: Option<String>,
    }

    impl Record for Pair {
        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![
                FieldDescriptor::<Pair>::new::<i32>("L", |p| &p.left, |p| &mut p.left).member("left"),
                FieldDescriptor::<Pair>::new::<Option<String>>("R", |p| &p.right, |p| &mut p.right)
                    .member("right"),
            ]
        }
    }

    #[derive(Default)]
    struct Clash {
        a: u8,
        b: u8,
    }

    impl Record for Clash {
        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![
                FieldDescriptor::<Clash>::new::<u8>("x", |c| &c.a, |c| &mut c.a).member("a"),
                FieldDescriptor::<Clash>::new::<u8>("x", |c| &c.b, |c| &mut c.b).member("b"),
            ]
        }
    }

    #[derive(Default)]
    struct Link {
        next: Option<Box<Link>>,
    }

    impl Record for Link {
        fn fields() -> Vec<FieldDescriptor<Self>> {
            vec![FieldDescriptor::<Link>::new::<Option<Box<Link>>>("next", |l| &l.next, |l| &mut l.next)]
        }

        fn type_name() -> &'static str {
            "Link"
        }
    }

    impl crate::Attribute for Link {
        fn shape() -> crate::Shape {
            crate::Shape::Record(RecordRef::of::<Self>())
        }

        fn plan(cache: &crate::CodecCache) -> Result<crate::ValuePlan<Self>, UnsupportedTypeError> {
            crate::synth::record::<Self>(cache)
        }
    }

    #[test]
    fn fields_keep_declaration_order() {
        let descriptor = resolve::<Pair>().unwrap();
        let names: Vec<_> = descriptor.attribute_names().collect();
        assert_eq!(names, vec!["L", "R"]);
        assert_eq!(descriptor.field("R").unwrap().category(), Category::Scalar);
        assert_eq!(descriptor.field("L").unwrap().member_name(), "left");
    }

    #[test]
    fn duplicate_names_point_at_second_member() {
        let err = resolve::<Clash>().unwrap_err();
        assert_eq!(err.field.as_deref(), Some("b"));
    }

    #[test]
    fn flat_records_are_acyclic() {
        assert!(check_acyclic::<Pair>().is_ok());
    }

    #[test]
    fn self_reference_is_a_cycle() {
        let err = check_acyclic::<Link>().unwrap_err();
        assert_eq!(err.reason, "recursive record types are not supported: Link -> Link");
    }
}
