//! End-to-end behaviour of the public mapper API

use parking_lot::Mutex;
use remap_engine::{ErrorHandler, MapOptions, Mapper, MapperConfig, Mapping, Transform};
use remap_types::{MappingError, MappingResult, ModelRef, ObjectRef, Shape, Value};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
}

impl ErrorHandler for CountingHandler {
    fn handle(&self, _error: &MappingError) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

fn json_of(value: &Value) -> serde_json::Value {
    value.to_json().unwrap()
}

#[test]
fn test_flat_and_nested_destination_fields() {
    let mapper = Mapper::new();
    mapper.create_map("Source", "Dest", |map| {
        map.for_member("name", Transform::path("name"))
            .for_member("address.city", Transform::path("address.city"))
    });

    let source = Value::from_json(json!({"name": "A", "address": {"city": "X"}}));
    let dest = mapper.map(&source, "Source", "Dest").unwrap();

    assert_eq!(json_of(&dest), json!({"name": "A", "address": {"city": "X"}}));
    // Nested containers are new objects, never the source's.
    let source_address = source.as_object().unwrap().get("address").unwrap();
    let dest_address = dest.as_object().unwrap().get("address").unwrap();
    assert_ne!(source_address, dest_address);
}

#[test]
fn test_missing_mapping_notifies_handler_once() {
    let handler = Arc::new(CountingHandler::default());
    let mapper = Mapper::with_error_handler(handler.clone());

    let err = mapper
        .map(&Value::object([("a", 1)]), "Unregistered", "Nowhere")
        .unwrap_err();

    assert!(err.is_not_found());
    assert_eq!(
        err.to_string(),
        "Mapping Error: Mapping is not found for Unregistered and Nowhere"
    );
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

    assert!(!mapper.has_mapping("Unregistered", "Nowhere"));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_missing_nested_mapping_fails_the_call() {
    let handler = Arc::new(CountingHandler::default());
    let mapper = Mapper::with_error_handler(handler.clone());
    mapper.create_map("Order", "OrderDto", |map| {
        map.for_member("customer", Transform::map_with("customer", "Customer", "CustomerDto"))
    });

    let order = Value::from_json(json!({"customer": {"name": "c"}}));
    let err = mapper.map(&order, "Order", "OrderDto").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

    // A null reference never needs the nested mapping.
    let order = Value::from_json(json!({"customer": null}));
    let dto = mapper.map(&order, "Order", "OrderDto").unwrap();
    assert_eq!(json_of(&dto), json!({"customer": null}));
}

#[test]
fn test_registering_again_replaces_previous_definition() {
    let mapper = Mapper::new();
    mapper.create_map("S", "D", |map| map.for_member("v", Transform::from_value("first")));
    mapper.create_map("S", "D", |map| map.for_member("v", Transform::from_value("second")));

    let dest = mapper.map(&Value::object([("x", 1)]), "S", "D").unwrap();
    assert_eq!(json_of(&dest), json!({"v": "second"}));
    assert_eq!(mapper.registry().len(), 1);
}

#[test]
fn test_null_and_list_sources() {
    let mapper = Mapper::new();
    mapper.create_map("S", "D", |map| map.for_member("n", Transform::path("n")));

    assert_eq!(mapper.map(&Value::Null, "S", "D").unwrap(), Value::Null);

    let list = Value::from_json(json!([{"n": 1}, {"n": 2}]));
    let mapped = mapper.map(&list, "S", "D").unwrap();
    assert_eq!(json_of(&mapped), json!([{"n": 1}, {"n": 2}]));

    let err = mapper.map(&Value::from("text"), "S", "D").unwrap_err();
    assert!(matches!(err, MappingError::InvalidSource { found: "string", .. }));
}

#[test]
fn test_transforms() {
    let mapper = Mapper::new();
    mapper.create_map("Product", "ProductDto", |map| {
        map.for_member("title", Transform::path("name"))
            .for_member("kind", Transform::from_value("product"))
            .for_member(
                "label",
                Transform::map_from(|source| {
                    let name = source.as_object().unwrap().get("name")?;
                    Ok(Value::from(format!("#{}", name.as_str().unwrap_or_default())))
                }),
            )
            .for_member(
                "discount",
                Transform::condition(|source| Ok(is_on_sale(source)), "discount"),
            )
            .for_member(
                "badge",
                Transform::condition_or(|source| Ok(is_on_sale(source)), "badge", "none"),
            )
            .for_member("note", Transform::null_substitution("note", "n/a"))
            .for_member(
                "cents",
                Transform::convert_using("price", |price| {
                    Ok(Value::Int((price.as_f64().unwrap_or(0.0) * 100.0).round() as i64))
                }),
            )
            .for_member("internal", Transform::Ignore)
            .for_member_when(
                "stock",
                |source| Ok(source.as_object().map_or(false, |o| o.has_own("stock"))),
                Transform::path("stock"),
            )
    });

    let regular = Value::from_json(json!({
        "name": "lamp", "price": 1.25, "discount": 10, "badge": "hot",
        "on_sale": false, "internal": "x"
    }));
    assert_eq!(
        json_of(&mapper.map(&regular, "Product", "ProductDto").unwrap()),
        json!({
            "title": "lamp", "kind": "product", "label": "#lamp",
            "badge": "none", "note": "n/a", "cents": 125
        })
    );

    let on_sale = Value::from_json(json!({
        "name": "desk", "price": 2, "discount": 10, "badge": "hot",
        "on_sale": true, "note": "fragile", "stock": 4
    }));
    assert_eq!(
        json_of(&mapper.map(&on_sale, "Product", "ProductDto").unwrap()),
        json!({
            "title": "desk", "kind": "product", "label": "#desk", "discount": 10,
            "badge": "hot", "note": "fragile", "cents": 200, "stock": 4
        })
    );
}

fn is_on_sale(source: &Value) -> bool {
    source
        .as_object()
        .and_then(|o| o.get("on_sale").ok())
        .and_then(|v| v.as_bool())
        .unwrap_or(false)
}

#[test]
fn test_for_self_flattens_a_nested_source() {
    let mapper = Mapper::new();
    let customer = mapper.create_map("Customer", "OrderSummary", |map| {
        map.for_member("customerName", Transform::path("name"))
    });
    mapper.create_map("Order", "OrderSummary", |map| {
        map.for_member("total", Transform::path("total"))
            .for_self(&customer, |order| match order {
                Value::Object(order) => order.get("customer"),
                _ => Ok(Value::Null),
            })
    });

    let order = Value::from_json(json!({"total": 30, "customer": {"name": "Ada"}}));
    let summary = mapper.map(&order, "Order", "OrderSummary").unwrap();
    assert_eq!(json_of(&summary), json!({"total": 30, "customerName": "Ada"}));
}

#[test]
fn test_hooks_run_around_steps_and_only_top_level_sees_call_hooks() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mapper = Mapper::new();
    let log = |label: &'static str| {
        let events = events.clone();
        move |source: &ObjectRef, _dest: &ObjectRef| -> MappingResult<()> {
            let name = source.get("name")?;
            events
                .lock()
                .push(format!("{}:{}", label, name.as_str().unwrap_or_default()));
            Ok(())
        }
    };

    mapper.create_map("Folder", "FolderDto", |map| {
        map.for_member("name", Transform::path("name"))
            .for_member("parent", Transform::map_with("parent", "Folder", "FolderDto"))
            .before_map(log("before"))
            .after_map(log("after"))
    });

    let folder = Value::from_json(json!({"name": "child", "parent": {"name": "root", "parent": null}}));
    let options = MapOptions::new()
        .before_map(log("call-before"))
        .after_map(log("call-after"));
    mapper
        .map_with_options(&folder, "Folder", "FolderDto", &options)
        .unwrap();

    assert_eq!(
        *events.lock(),
        vec![
            "before:child",
            "call-before:child",
            "before:root",
            "after:root",
            "after:child",
            "call-after:child",
        ]
    );
}

#[test]
fn test_before_hook_can_prepare_destination() {
    let mapper = Mapper::new();
    mapper.create_map("S", "Stamped", |map| {
        map.before_map(|_, dest| dest.set("version", 1))
            .for_member("id", Transform::path("id"))
    });

    let dest = mapper.map(&Value::object([("id", 7)]), "S", "Stamped").unwrap();
    assert_eq!(json_of(&dest), json!({"version": 1, "id": 7}));
}

#[test]
fn test_map_array_shares_one_call() {
    let mapper = Mapper::new();
    mapper.create_map("Pet", "PetDto", |map| {
        map.for_member("owner", Transform::map_with("owner", "Owner", "OwnerDto"))
    });
    mapper.create_map("Owner", "OwnerDto", |map| map.for_member("name", Transform::path("name")));

    let owner = ObjectRef::from_fields([("name", "Sam")]);
    let pets = vec![
        Value::object([("owner", &owner)]),
        Value::object([("owner", &owner)]),
    ];
    let mapped = mapper.map_array(&pets, "Pet", "PetDto").unwrap();

    assert_eq!(mapped.len(), 2);
    let first_owner = mapped[0].as_object().unwrap().get("owner").unwrap();
    let second_owner = mapped[1].as_object().unwrap().get("owner").unwrap();
    assert_eq!(first_owner, second_owner);
}

#[test]
fn test_map_mutate_writes_in_place() {
    let mapper = Mapper::new();
    mapper.create_map("Form", "Profile", |map| {
        map.for_member("name", Transform::path("name"))
            .for_member("address.city", Transform::path("city"))
    });

    let profile = Value::from_json(json!({"id": 9, "address": {"zip": "1010"}}));
    let profile = profile.as_object().unwrap();
    let address = profile.get("address").unwrap();

    mapper
        .map_mutate(
            &Value::from_json(json!({"name": "B", "city": "Y"})),
            profile,
            "Form",
            "Profile",
        )
        .unwrap();

    assert_eq!(
        json_of(&Value::from(profile)),
        json!({"id": 9, "address": {"zip": "1010", "city": "Y"}, "name": "B"})
    );
    assert_eq!(profile.get("address").unwrap(), address);

    // A null source leaves the destination alone.
    mapper
        .map_mutate(&Value::Null, profile, "Form", "Profile")
        .unwrap();
    assert_eq!(profile.get("name").unwrap(), Value::from("B"));
}

#[test]
fn test_failing_step_fails_the_whole_call() {
    let mapper = Mapper::new();
    mapper.create_map("S", "D", |map| {
        map.for_member("ok", Transform::from_value(1))
            .for_member(
                "bad",
                Transform::map_from(|_| Err(MappingError::custom("selector failed"))),
            )
    });

    let err = mapper.map(&Value::object([("x", 1)]), "S", "D").unwrap_err();
    assert!(matches!(err, MappingError::Custom(ref message) if message == "selector failed"));
}

#[test]
fn test_writing_through_a_scalar_fails() {
    let mapper = Mapper::new();
    mapper.create_map("S", "D", |map| {
        map.for_member("address", Transform::from_value("flat"))
            .for_member("address.city", Transform::from_value("X"))
    });

    let err = mapper.map(&Value::object([("x", 1)]), "S", "D").unwrap_err();
    assert!(matches!(err, MappingError::NotTraversable { .. }));
}

#[test]
fn test_destination_setters_are_honoured() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let recorded = seen.clone();
    let account = Shape::builder("Account")
        .accessor(
            "owner",
            |this| Ok(this.get_own("_owner").unwrap_or_default()),
            move |this, value| {
                recorded.lock().push(value.to_json()?);
                this.set_own("_owner", value);
                Ok(())
            },
        )
        .build();

    let mapper = Mapper::new();
    mapper.create_map("AccountRow", &account, |map| {
        map.for_member("owner.first", Transform::path("first"))
            .for_member("owner.last", Transform::path("last"))
    });

    let row = Value::from_json(json!({"first": "Grace", "last": "Hopper"}));
    let mapped = mapper.map(&row, "AccountRow", &account).unwrap();

    assert!(mapped.as_object().unwrap().shape().unwrap().ptr_eq(&account));
    // The setter never sees an empty placeholder.
    assert_eq!(
        *seen.lock(),
        vec![
            json!({"first": "Grace"}),
            json!({"first": "Grace", "last": "Hopper"}),
        ]
    );
}

struct Invoice;
struct InvoiceView;

#[test]
fn test_rust_types_as_model_references() {
    let mapper = Mapper::new();
    mapper.create_map(ModelRef::of::<Invoice>(), ModelRef::of::<InvoiceView>(), |map| {
        map.for_member("number", Transform::path("no"))
    });

    assert!(mapper.has_mapping(ModelRef::of::<Invoice>(), ModelRef::of::<InvoiceView>()));
    assert!(!mapper.has_mapping(ModelRef::of::<InvoiceView>(), ModelRef::of::<Invoice>()));

    let view = mapper
        .map(
            &Value::object([("no", 42)]),
            ModelRef::of::<Invoice>(),
            ModelRef::of::<InvoiceView>(),
        )
        .unwrap();
    assert_eq!(json_of(&view), json!({"number": 42}));
}

#[test]
fn test_aliased_shape_matches_string_name() {
    let mapper = Mapper::new();
    let user = Shape::builder("User").alias("e2e-user").build();
    mapper.create_map(&user, "UserDto", |map| map.for_member("id", Transform::path("id")));

    assert!(mapper.has_mapping("e2e-user", "UserDto"));
    let dto = mapper
        .map(&Value::object([("id", 3)]), "e2e-user", "UserDto")
        .unwrap();
    assert_eq!(json_of(&dto), json!({"id": 3}));
}

#[test]
fn test_prebuilt_mapping_and_removal() {
    let mapper = Mapper::new();
    let mapping = Mapping::builder("S", "D")
        .for_member("v", Transform::path("v"))
        .build();
    mapper.add_mapping(mapping);
    assert!(mapper.has_mapping("S", "D"));

    assert!(mapper.remove_mapping("S", "D").is_some());
    assert!(mapper.remove_mapping("S", "D").is_none());
    assert!(mapper.map(&Value::object([("v", 1)]), "S", "D").is_err());
}

#[test]
fn test_config_from_json() {
    let config = MapperConfig::from_json(r#"{"max_depth": 2, "deduplicate_instances": true}"#).unwrap();
    let mapper = Mapper::with_config(config);
    mapper.create_map("N", "M", |map| map.for_member("next", Transform::map_with("next", "N", "M")));

    let deep = Value::from_json(json!({"next": {"next": {"next": null}}}));
    let err = mapper.map(&deep, "N", "M").unwrap_err();
    assert!(matches!(err, MappingError::DepthExceeded { limit: 2, .. }));
}

#[test]
fn test_concurrent_mapping_on_a_shared_mapper() {
    let mapper = Mapper::new();
    mapper.create_map("S", "D", |map| {
        map.for_member("n", Transform::path("n"))
            .for_member("meta.thread", Transform::path("t"))
    });

    std::thread::scope(|scope| {
        for t in 0..4 {
            let mapper = &mapper;
            scope.spawn(move || {
                for n in 0..50 {
                    let source = Value::object([("n", Value::from(n)), ("t", Value::from(t))]);
                    let dest = mapper.map(&source, "S", "D").unwrap();
                    assert_eq!(json_of(&dest), json!({"n": n, "meta": {"thread": t}}));
                }
            });
        }
    });
}
