use super::*;
use pretty_assertions::assert_eq;

#[test]
fn test_shadowing_and_pop() {
    let outer = Env::empty().push().assign("x", 1.0).unwrap();
    let inner = outer.push().assign("x", 2.0).unwrap();

    assert_eq!(inner.try_get::<f64>("x"), Some(2.0));
    assert_eq!(inner.pop().unwrap().try_get::<f64>("x"), Some(1.0));
}

#[test]
fn test_assign_to_root_fails() {
    assert_eq!(
        Env::empty().assign("x", 1.0).unwrap_err(),
        EnvError::AssignToRoot
    );
}

#[test]
fn test_pop_at_root_is_none() {
    assert!(Env::empty().pop().is_none());
    assert!(Env::empty().push().pop().unwrap().is_root());
}

#[test]
fn test_assign_is_persistent() {
    let before = Env::empty().push();
    let after = before.assign("x", true).unwrap();

    assert!(!before.is_defined("x"));
    assert!(after.is_defined("x"));
    assert_ne!(before.id(), after.id());
}

#[test]
fn test_names_are_case_insensitive() {
    let env = Env::empty().push().assign("Zone Temp", 21.5).unwrap();
    assert!(env.is_defined("zone temp"));
    assert_eq!(env.try_get::<f64>("ZONE TEMP"), Some(21.5));
    assert_eq!(env.variables(), vec!["Zone Temp".to_owned()]);
}

#[test]
fn test_try_get_type_mismatch_is_none() {
    let env = Env::empty().push().assign("flag", true).unwrap();
    assert_eq!(env.try_get::<f64>("flag"), None);
    assert_eq!(env.try_get::<bool>("flag"), Some(true));
    assert_eq!(env.try_get::<bool>("missing"), None);
}

#[test]
fn test_expr_bindings_convert_to_values_when_constant() {
    let env = Env::empty()
        .push()
        .assign("limit", Expr::double(4.0))
        .unwrap()
        .assign("sum", Expr::add(vec![Expr::variable("a"), Expr::double(1.0)]))
        .unwrap();

    assert_eq!(env.try_get::<Value>("limit"), Some(Value::Double(4.0)));
    assert_eq!(env.try_get::<Value>("sum"), None);
    assert!(env.try_get::<Expr>("sum").is_some());
}

#[test]
fn test_bound_values_nearest_wins() {
    let env = Env::empty()
        .push()
        .assign("a", 1.0)
        .unwrap()
        .assign("b", 2.0)
        .unwrap()
        .push()
        .assign("a", 3.0)
        .unwrap();

    let names: Vec<_> = env
        .bound_values()
        .into_iter()
        .map(|bv| (bv.name, bv.value))
        .collect();
    assert_eq!(
        names,
        vec![
            ("a".to_owned(), Binding::from(3.0)),
            ("b".to_owned(), Binding::from(2.0)),
        ]
    );
}

#[test]
fn test_bound_value_equality_ignores_units() {
    let celsius = Env::empty()
        .push()
        .assign_with_units("t", 20.0, Some("degC"))
        .unwrap();
    let bare = Env::empty().push().assign("t", 20.0).unwrap();

    let a = celsius.bound_value("t").unwrap();
    let b = bare.bound_value("t").unwrap();
    assert_eq!(a.units.as_deref(), Some("degC"));
    assert_eq!(a, b);
}

#[test]
fn test_merge_other_wins_in_one_frame() {
    let base = Env::empty().push().assign("a", 1.0).unwrap();
    let other = Env::empty()
        .push()
        .assign("a", 5.0)
        .unwrap()
        .push()
        .assign("b", 6.0)
        .unwrap();

    let merged = base.merge(&other);
    assert_eq!(merged.depth(), base.depth() + 1);
    assert_eq!(merged.try_get::<f64>("a"), Some(5.0));
    assert_eq!(merged.try_get::<f64>("b"), Some(6.0));
    assert_eq!(merged.pop().unwrap(), base);
}

#[test]
fn test_equality_is_frame_by_frame() {
    let a = Env::empty().push().assign("x", 1.0).unwrap();
    let b = Env::empty().push().assign("X", 1.0).unwrap();
    let c = Env::empty().push().push().assign("x", 1.0).unwrap();

    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn test_env_value_object() {
    let value = EnvValue::new(1.0).with_text(r#"{"limit": 4, "name": "AHU"}"#);
    let object = value.object().unwrap();
    assert_eq!(object.get("limit"), Some(&serde_json::json!(4)));
    assert!(EnvValue::new(1.0).with_text("not json").object().is_none());
}

#[test]
fn test_functions_are_bindings() {
    let function = RegisteredFunction::new("twice", vec!["x".to_owned()], Expr::variable("x"));
    let env = Env::empty().push().assign("twice", function.clone()).unwrap();
    assert_eq!(env.try_get::<RegisteredFunction>("TWICE"), Some(function));
    assert_eq!(env.try_get::<Expr>("twice"), None);
}

#[test]
fn test_debug_dump_lists_frames() {
    let env = Env::empty()
        .push()
        .assign_with_units("t", 20.0, Some("degC"))
        .unwrap();
    assert_eq!(env.debug_dump(), "frame 0:\n  t = 20 [degC]\nframe 1:\n");
}
