use super::*;
use crate::env::Env;
use pretty_assertions::assert_eq;
use tx_ir::PropertyMap;

fn parse(source: &str) -> Expr {
    tx_parse::parse(source).unwrap()
}

fn readings(speed: f64, running: bool) -> PropertyMap {
    let mut map = PropertyMap::new();
    map.insert("speed", speed);
    map.insert("running", running);
    map
}

#[test]
fn test_compiled_predicate_runs_against_many_sources() {
    let predicate = compile::<bool>(&parse("running & speed > 30")).unwrap();

    assert_eq!(predicate.evaluate(&readings(40.0, true)), Some(true));
    assert_eq!(predicate.evaluate(&readings(20.0, true)), Some(false));
    assert_eq!(predicate.evaluate(&readings(40.0, false)), Some(false));
}

#[test]
fn test_undefined_result_is_none() {
    let predicate = compile::<bool>(&parse("missing > 30")).unwrap();
    assert_eq!(predicate.evaluate(&readings(40.0, true)), None);
}

#[test]
fn test_numeric_results() {
    let compiled = compile::<f64>(&parse("IF(running, speed * 2, 0) + ABS(-1)")).unwrap();
    assert_eq!(compiled.evaluate(&readings(10.0, true)), Some(21.0));
    assert_eq!(compiled.evaluate(&readings(10.0, false)), Some(1.0));
}

#[test]
fn test_string_results() {
    let compiled = compile::<String>(&parse("TOUPPER('ahu')")).unwrap();
    let env = Env::empty();
    assert_eq!(compiled.evaluate(&env), Some("AHU".to_owned()));
}

#[test]
fn test_type_mismatch_names_the_expression() {
    let err = compile::<String>(&parse("speed > 30")).unwrap_err();
    assert_eq!(
        err,
        CompileError::TypeMismatch {
            source_type: ValueType::Bool,
            dest_type: ValueType::String,
            expr: "speed > 30".to_owned(),
        }
    );
    assert_eq!(
        err.to_string(),
        "expression 'speed > 30' has type bool, expected string"
    );
}

#[test]
fn test_booleans_do_not_compile_as_numbers() {
    let err = compile::<f64>(&parse("1 < 2")).unwrap_err();
    assert_eq!(
        err,
        CompileError::TypeMismatch {
            source_type: ValueType::Bool,
            dest_type: ValueType::Double,
            expr: "1 < 2".to_owned(),
        }
    );
    // Numbers still compile as predicates.
    assert!(compile::<bool>(&parse("speed * 2")).is_ok());
}

#[test]
fn test_failed_subtree_evaluates_to_none() {
    let compiled = compile::<bool>(&parse("FAILED('gone', x) > 1")).unwrap();
    assert_eq!(compiled.evaluate(&readings(1.0, true)), None);
}

#[test]
fn test_aggregates_and_properties_fall_back_to_the_evaluator() {
    let mut fan = PropertyMap::new();
    fan.insert("speed", 12.0);
    let mut source = PropertyMap::new();
    source.insert("fan", fan);

    let compiled = compile::<f64>(&parse("SUM({fan.speed, 3})")).unwrap();
    assert_eq!(compiled.evaluate(&source), Some(15.0));
}
