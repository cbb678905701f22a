use super::*;
use crate::twin::Twin;
use pretty_assertions::assert_eq;

#[test]
fn test_equality_ignores_source_text() {
    let a = Expr::variable("x").with_text("[x]");
    let b = Expr::variable("x");
    assert_eq!(a, b);
}

#[test]
fn test_equality_includes_unit() {
    let celsius = Expr::double(21.0).with_unit("degC");
    assert_ne!(celsius, Expr::double(21.0));
    assert_eq!(celsius, Expr::double(21.0).with_unit("degC"));
    assert_eq!(Expr::double(1.0).with_unit(""), Expr::double(1.0));
}

#[test]
fn test_children_in_order() {
    let e = Expr::if_(
        Expr::variable("c"),
        Expr::double(1.0),
        Expr::double(2.0),
    );
    let kids: Vec<_> = e.children().into_iter().cloned().collect();
    assert_eq!(
        kids,
        vec![Expr::variable("c"), Expr::double(1.0), Expr::double(2.0)]
    );
    assert!(Expr::variable("x").children().is_empty());
}

#[test]
fn test_map_children_keeps_unit_and_kind() {
    let e = Expr::add(vec![Expr::variable("a"), Expr::variable("b")]).with_unit("degC");
    let mapped = e.map_children(|c| match c.as_variable() {
        Some("a") => Expr::double(1.0),
        _ => c.clone(),
    });
    assert_eq!(
        mapped,
        Expr::add(vec![Expr::double(1.0), Expr::variable("b")]).with_unit("degC")
    );
}

#[test]
fn test_value_types() {
    assert_eq!(
        Expr::binary(BinaryOp::Gt, Expr::variable("a"), Expr::double(1.0)).value_type(),
        ValueType::Bool
    );
    assert_eq!(
        Expr::mul(vec![Expr::variable("a"), Expr::double(2.0)]).value_type(),
        ValueType::Double
    );
    assert_eq!(
        Expr::aggregate(AggregateFn::Any, Expr::variable("a")).value_type(),
        ValueType::Bool
    );
    assert_eq!(
        Expr::failed("x", Expr::double(1.0)).value_type(),
        ValueType::Double
    );
    assert_eq!(Expr::variable("a").value_type(), ValueType::Unknown);
}

#[test]
fn test_priorities() {
    let add = Expr::add(vec![Expr::double(1.0), Expr::double(2.0)]);
    let mul = Expr::mul(vec![Expr::double(1.0), Expr::double(2.0)]);
    let and = Expr::and(vec![Expr::bool(true), Expr::bool(false)]);
    assert!(mul.priority() > add.priority());
    assert!(add.priority() > and.priority());
    assert!(add.is_commutative());
    assert!(!Expr::binary(BinaryOp::Sub, Expr::double(1.0), Expr::double(2.0)).is_commutative());
}

#[test]
fn test_first_failed_is_preorder() {
    let inner = Expr::failed("inner", Expr::variable("b"));
    let e = Expr::add(vec![
        Expr::variable("a"),
        inner.clone(),
        Expr::failed("later", Expr::variable("c")),
    ]);
    assert_eq!(e.first_failed(), Some(&inner));
    assert_eq!(Expr::variable("a").first_failed(), None);
}

#[test]
fn test_from_property_value_drops_nulls_in_arrays() {
    let value = PropertyValue::Array(vec![PropertyValue::Number(1.0), PropertyValue::Null]);
    assert_eq!(
        Expr::from_property_value(&value),
        Some(Expr::array(vec![Expr::double(1.0)]))
    );
    assert_eq!(Expr::from_property_value(&PropertyValue::Null), None);
}

#[test]
fn test_from_value() {
    let twin = Twin::new("ahu-1", "dtmi:x;1").into_ref();
    assert_eq!(
        Expr::from_value(&Value::Twin(twin.clone())),
        Some(Expr::twin(twin))
    );
    assert_eq!(Expr::from_value(&Value::Undefined), None);
    assert_eq!(
        Expr::from_value(&Value::Array(vec![Value::Bool(true)])),
        Some(Expr::array(vec![Expr::bool(true)]))
    );
}

#[test]
fn test_display_is_fully_parenthesized() {
    let sum = Expr::add(vec![
        Expr::add(vec![
            Expr::add(vec![Expr::double(1.0), Expr::double(2.0)]),
            Expr::double(3.0),
        ]),
        Expr::variable("B"),
    ]);
    assert_eq!(sum.to_string(), "(((1 + 2) + 3) + B)");
    assert_eq!(
        Expr::binary(BinaryOp::Gt, Expr::variable("a"), Expr::variable("b")).to_string(),
        "(a > b)"
    );
    assert_eq!(
        Expr::binary(BinaryOp::Pow, Expr::variable("A"), Expr::double(3.0)).to_string(),
        "(A^3)"
    );
    assert_eq!(Expr::not(Expr::variable("x")).to_string(), "!(x)");
}

#[test]
fn test_display_calls_and_failures() {
    let option = Expr::call(
        "TOLERANTOPTION",
        vec![
            Expr::double(2.0),
            Expr::add(vec![Expr::double(3.0), Expr::double(1.0)]),
        ],
    );
    assert_eq!(option.to_string(), "TOLERANTOPTION(2, (3 + 1))");

    let failed = Expr::failed(
        "Could not resolve property",
        Expr::property(Expr::property(Expr::variable("this"), "fan"), "x"),
    );
    assert_eq!(
        failed.to_string(),
        "FAILED('Could not resolve property',this.fan.x)"
    );
    assert_eq!(Expr::double(5.0).with_unit("degC").to_string(), "5[degC]");
    assert_eq!(
        Expr::array(vec![Expr::variable("a"), Expr::variable("b")]).to_string(),
        "{a,b}"
    );
}
