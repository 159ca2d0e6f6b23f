//! Nested path writer
//!
//! Writes a value at a dotted path below a [`FieldTarget`], creating
//! intermediate containers as needed and preserving sibling fields.
//!
//! A setter governing an intermediate segment never receives an empty
//! placeholder: when the segment holds no container yet, a fresh one is
//! populated off to the side and handed to the setter once, complete.
//!
//! Two variants:
//! - [`write`] reassigns every container on the way back up the chain, so
//!   setters along the path observe the updated container.
//! - [`write_mutate`] writes in place and only assigns containers it had to
//!   create.

use remap_types::{FieldTarget, MappingError, MappingResult, ObjectRef, PropertyPath, Value};

/// Write `value` at `path`, reassigning each container along the chain.
///
/// The empty path is a no-op.
pub fn write<T>(target: &T, path: &PropertyPath, value: Value) -> MappingResult<()>
where
    T: FieldTarget + ?Sized,
{
    assign(target, path, path.segments(), value)
}

/// Write `value` at `path` in place.
///
/// The empty path is a no-op.
pub fn write_mutate<T>(target: &T, path: &PropertyPath, value: Value) -> MappingResult<()>
where
    T: FieldTarget + ?Sized,
{
    mutate(target, path, path.segments(), value)
}

fn assign<T>(target: &T, full: &PropertyPath, segments: &[String], value: Value) -> MappingResult<()>
where
    T: FieldTarget + ?Sized,
{
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        return target.write_field(head, value);
    }

    let (child, _) = container_at(target, full, head)?;
    assign(&child, full, rest, value)?;
    target.write_field(head, Value::Object(child))
}

fn mutate<T>(target: &T, full: &PropertyPath, segments: &[String], value: Value) -> MappingResult<()>
where
    T: FieldTarget + ?Sized,
{
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        return target.write_field(head, value);
    }

    let (child, attached) = container_at(target, full, head)?;
    mutate(&child, full, rest, value)?;
    if !attached {
        target.write_field(head, Value::Object(child))?;
    }
    Ok(())
}

/// The container held at `head`, and whether it is already attached there.
///
/// A missing (or null) container is created. Without a setter it is
/// attached immediately so later reads see it; under a setter it stays
/// detached until the caller has filled it.
fn container_at<T>(target: &T, full: &PropertyPath, head: &str) -> MappingResult<(ObjectRef, bool)>
where
    T: FieldTarget + ?Sized,
{
    match target.read_field(head)? {
        Value::Object(child) => Ok((child, true)),
        Value::Null if target.setter_governs(head) => Ok((ObjectRef::new(), false)),
        Value::Null => {
            let child = ObjectRef::new();
            target.write_field(head, Value::Object(child.clone()))?;
            Ok((child, true))
        }
        other => Err(MappingError::NotTraversable {
            path: full.to_string(),
            segment: head.to_string(),
            found: other.kind_name(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use proptest::prelude::*;
    use remap_types::Shape;
    use serde_json::json;
    use std::sync::Arc;

    fn json_of(obj: &ObjectRef) -> serde_json::Value {
        Value::from(obj).to_json().unwrap()
    }

    /// Shape whose `address` setter records every value it receives.
    fn recording_shape(seen: Arc<Mutex<Vec<serde_json::Value>>>) -> Shape {
        Shape::builder("Recorder")
            .accessor(
                "address",
                |this| Ok(this.get_own("_address").unwrap_or_default()),
                move |this, value| {
                    seen.lock().push(value.to_json()?);
                    this.set_own("_address", value);
                    Ok(())
                },
            )
            .build()
    }

    #[test]
    fn test_creates_missing_containers() {
        let target = ObjectRef::new();
        write(&target, &"a.b.c".into(), Value::from("v")).unwrap();
        assert_eq!(json_of(&target), json!({"a": {"b": {"c": "v"}}}));
    }

    #[test]
    fn test_preserves_siblings() {
        let target = Value::from_json(json!({"a": {"b": {"c": 1, "d": 2}, "e": 3}}));
        let target = target.as_object().unwrap();
        let inner = target.get("a").unwrap();

        write(target, &"a.b.c".into(), Value::from(9)).unwrap();
        assert_eq!(json_of(target), json!({"a": {"b": {"c": 9, "d": 2}, "e": 3}}));
        // Existing containers are reused, not replaced.
        assert_eq!(target.get("a").unwrap(), inner);
    }

    #[test]
    fn test_mutate_preserves_siblings() {
        let target = Value::from_json(json!({"a": {"b": 1}, "z": true}));
        let target = target.as_object().unwrap();
        write_mutate(target, &"a.c".into(), Value::from(2)).unwrap();
        write_mutate(target, &"x.y".into(), Value::from(3)).unwrap();
        assert_eq!(
            json_of(target),
            json!({"a": {"b": 1, "c": 2}, "z": true, "x": {"y": 3}})
        );
    }

    #[test]
    fn test_single_segment_is_direct_assignment() {
        let target = ObjectRef::new();
        write(&target, &"name".into(), Value::from("A")).unwrap();
        assert_eq!(target.get("name").unwrap(), Value::from("A"));
    }

    #[test]
    fn test_empty_path_is_noop() {
        let target = ObjectRef::from_fields([("keep", 1)]);
        write(&target, &PropertyPath::default(), Value::from(2)).unwrap();
        write_mutate(&target, &"".into(), Value::from(2)).unwrap();
        assert_eq!(json_of(&target), json!({"keep": 1}));
    }

    #[test]
    fn test_setter_never_sees_placeholder() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let target = recording_shape(seen.clone()).instantiate();

        write(&target, &"address.city".into(), Value::from("X")).unwrap();

        assert_eq!(*seen.lock(), vec![json!({"city": "X"})]);
        assert_eq!(
            target.get("address").unwrap().to_json().unwrap(),
            json!({"city": "X"})
        );
    }

    #[test]
    fn test_mutate_setter_never_sees_placeholder() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let target = recording_shape(seen.clone()).instantiate();

        write_mutate(&target, &"address.city".into(), Value::from("X")).unwrap();
        assert_eq!(*seen.lock(), vec![json!({"city": "X"})]);

        // Container now exists: written in place, setter not called again.
        write_mutate(&target, &"address.zip".into(), Value::from(1)).unwrap();
        assert_eq!(seen.lock().len(), 1);
        assert_eq!(
            target.get("address").unwrap().to_json().unwrap(),
            json!({"city": "X", "zip": 1})
        );
    }

    #[test]
    fn test_assign_reassigns_existing_container_through_setter() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let target = recording_shape(seen.clone()).instantiate();
        target.set_own("_address", ObjectRef::from_fields([("city", "X")]));

        write(&target, &"address.zip".into(), Value::from(1)).unwrap();
        assert_eq!(*seen.lock(), vec![json!({"city": "X", "zip": 1})]);
    }

    #[test]
    fn test_scalar_in_the_way_is_not_traversable() {
        let target = ObjectRef::from_fields([("a", 5)]);
        let err = write(&target, &"a.b".into(), Value::from(1)).unwrap_err();
        assert!(matches!(
            err,
            MappingError::NotTraversable { ref segment, found: "int", .. } if segment == "a"
        ));
    }

    #[test]
    fn test_descends_through_getter_only_container() {
        let settings = ObjectRef::new();
        let held = settings.clone();
        let shape = Shape::builder("Configured")
            .getter("settings", move |_| Ok(Value::from(&held)))
            .build();
        let target = shape.instantiate();

        write_mutate(&target, &"settings.mode".into(), Value::from("fast")).unwrap();
        assert_eq!(settings.get("mode").unwrap(), Value::from("fast"));
    }

    proptest! {
        #[test]
        fn property_written_value_reads_back(
            segments in proptest::collection::vec("[a-c]", 1..5),
            n in any::<i64>(),
        ) {
            let path = PropertyPath::from_segments(segments);
            let target = ObjectRef::new();
            write(&target, &path, Value::from(n)).unwrap();
            prop_assert_eq!(path.read(&Value::from(&target)).unwrap(), Value::Int(n));
        }

        #[test]
        fn property_mutate_matches_assign(
            segments in proptest::collection::vec("[a-c]", 1..5),
            n in any::<i64>(),
        ) {
            let path = PropertyPath::from_segments(segments);
            let assigned = ObjectRef::new();
            let mutated = ObjectRef::new();
            write(&assigned, &path, Value::from(n)).unwrap();
            write_mutate(&mutated, &path, Value::from(n)).unwrap();
            prop_assert_eq!(json_of(&assigned), json_of(&mutated));
        }
    }
}
