use std::sync::Arc;

use super::*;
use crate::env::{EnvValue, RegisteredFunction};
use crate::source::{MlModel, MlModels, TemporalSource, WithServices};
use pretty_assertions::assert_eq;
use tx_ir::{PropertyMap, Twin};

fn parse(source: &str) -> Expr {
    tx_parse::parse(source).unwrap()
}

fn env() -> Env {
    Env::empty()
        .push()
        .assign("temp", 22.0)
        .unwrap()
        .assign("setpoint", 20.0)
        .unwrap()
        .assign("occupied", true)
        .unwrap()
        .assign("name", "AHU-01")
        .unwrap()
}

fn eval(source: &str) -> Value {
    evaluate_with_env(&parse(source), &env()).unwrap()
}

#[test]
fn test_arithmetic_and_comparison() {
    assert_eq!(eval("temp - setpoint"), Value::Double(2.0));
    assert_eq!(eval("temp * 2 + 1"), Value::Double(45.0));
    assert_eq!(eval("temp > setpoint + 1"), Value::Bool(true));
    assert_eq!(eval("2^10"), Value::Double(1024.0));
}

#[test]
fn test_logic_short_circuits() {
    assert_eq!(eval("occupied & temp > 30"), Value::Bool(false));
    assert_eq!(eval("occupied | missing"), Value::Bool(true));
    assert_eq!(eval("!occupied"), Value::Bool(false));
}

#[test]
fn test_unresolved_names_are_undefined() {
    assert_eq!(eval("missing"), Value::Undefined);
    assert_eq!(eval("missing + 1"), Value::Undefined);
    assert_eq!(eval("missing & occupied"), Value::Undefined);
    assert_eq!(eval("IF(missing, 1, 2)"), Value::Undefined);
}

#[test]
fn test_if_selects_branch() {
    assert_eq!(eval("IF(temp > 21, 'hot', 'ok')"), Value::from("hot"));
}

#[test]
fn test_string_comparison_and_functions() {
    assert_eq!(eval("name = 'AHU-01'"), Value::Bool(true));
    assert_eq!(eval("STARTSWITH(name, 'AHU')"), Value::Bool(true));
    assert_eq!(eval("TOLOWER(name)"), Value::from("ahu-01"));
}

#[test]
fn test_math_functions() {
    assert_eq!(eval("ABS(setpoint - temp)"), Value::Double(2.0));
    assert_eq!(eval("ROUND(2.5)"), Value::Double(2.0));
    assert_eq!(eval("unknownFunction(1)"), Value::Undefined);
}

#[test]
fn test_aggregates() {
    assert_eq!(eval("SUM({1, 2, temp})"), Value::Double(25.0));
    assert_eq!(eval("AVERAGE({1, 2, 3})"), Value::Double(2.0));
    assert_eq!(eval("MAX({1, 5, 3})"), Value::Double(5.0));
    assert_eq!(eval("MIN({4, 2, 3})"), Value::Double(2.0));
    assert_eq!(eval("COUNT({True, False, True})"), Value::Double(2.0));
    assert_eq!(eval("ANY({False, occupied})"), Value::Bool(true));
    assert_eq!(eval("ALL({False, occupied})"), Value::Bool(false));
    assert_eq!(eval("FIRST({7, 8})"), Value::Double(7.0));
    assert_eq!(eval("MAX(temp)"), Value::Double(22.0));
}

#[test]
fn test_min_of_empty_array_is_an_error() {
    let err = evaluate_with_env(&Expr::aggregate(AggregateFn::Min, Expr::array(vec![])), &env())
        .unwrap_err();
    assert_eq!(err, EvalError::EmptyAggregate(AggregateFn::Min));
}

#[test]
fn test_failed_and_each_cannot_be_evaluated() {
    assert_eq!(
        evaluate_with_env(&parse("FAILED('no twin', x)"), &env()).unwrap_err(),
        EvalError::FailedExpression {
            reason: "no twin".to_owned()
        }
    );
    assert_eq!(
        evaluate_with_env(&parse("EACH(fans, f, f.speed)"), &env()).unwrap_err(),
        EvalError::Unbound { what: "EACH" }
    );
}

#[test]
fn test_option_takes_first_defined_argument() {
    assert_eq!(eval("OPTION(missing, FAILED('x', y), temp)"), Value::Double(22.0));
    assert_eq!(eval("TOLERANTOPTION(missing)"), Value::Undefined);
}

#[test]
fn test_exists() {
    assert_eq!(eval("EXISTS(temp)"), Value::Bool(true));
    assert_eq!(eval("EXISTS(missing)"), Value::Bool(false));
}

#[test]
fn test_unit_coercion() {
    assert_eq!(eval("FAHRENHEIT(100[degC])"), Value::Double(212.0));
    assert_eq!(eval("PERCENTAGE(50[%100])"), Value::Double(0.5));
    assert_eq!(eval("METRIC(5[%])"), Value::Undefined);
    assert_eq!(eval("CELSIUS(temp)"), Value::Double(22.0));
}

#[test]
fn test_property_of_env_value_reads_json_text() {
    let env = Env::empty()
        .push()
        .assign(
            "ahu",
            EnvValue::new(1.0).with_text(r#"{"limits": {"high": 26}, "tag": "supply"}"#),
        )
        .unwrap();
    let eval = |s: &str| evaluate_with_env(&parse(s), &env).unwrap();

    assert_eq!(eval("ahu"), Value::Double(1.0));
    assert_eq!(eval("ahu.tag"), Value::from("supply"));
    assert_eq!(eval("ahu.limits.high"), Value::Double(26.0));
    assert_eq!(eval("ahu.missing"), Value::Undefined);
}

#[test]
fn test_objects_evaluate_to_json_text() {
    let mut limits = PropertyMap::new();
    limits.insert("high", 26.0);
    let mut map = PropertyMap::new();
    map.insert("mode", "cool");
    map.insert("limits", limits);
    let object = Expr::object(map.clone());

    let env = Env::empty();
    assert_eq!(
        evaluate_with_env(&object, &env).unwrap(),
        Value::String(map.to_json())
    );
    assert_eq!(
        evaluate_with_env(&Expr::property(object.clone(), "mode"), &env).unwrap(),
        Value::from("cool")
    );

    let env = env.push().assign("settings", object).unwrap();
    let eval = |s: &str| evaluate_with_env(&parse(s), &env).unwrap();
    assert_eq!(eval("settings.limits.high"), Value::Double(26.0));
    assert_eq!(eval("settings.missing"), Value::Undefined);
}

#[test]
fn test_property_of_twin() {
    let twin = Twin::new("ahu-1", "dtmi:com:willowinc:AirHandlingUnit;1")
        .with_property("maxCurrent", 12.5)
        .into_ref();
    let env = Env::empty()
        .push()
        .assign("ahu", Expr::twin(twin))
        .unwrap();

    let value = evaluate_with_env(&parse("ahu.maxCurrent * 2"), &env).unwrap();
    assert_eq!(value, Value::Double(25.0));
    let id = evaluate_with_env(&parse("ahu.id"), &env).unwrap();
    assert_eq!(id, Value::from("ahu-1"));
}

#[test]
fn test_property_bag_is_a_source() {
    let mut map = PropertyMap::new();
    map.insert("speed", 40.0);
    let value = evaluate_direct(&parse("speed > 30"), &map).unwrap();
    assert_eq!(value, Value::Bool(true));
}

#[test]
fn test_macros_substitute_arguments() {
    let twice = RegisteredFunction::new(
        "twice",
        vec!["x".to_owned()],
        parse("x * 2"),
    );
    let env = env().assign("twice", twice).unwrap();
    let eval = |s: &str| evaluate_with_env(&parse(s), &env).unwrap();

    assert_eq!(eval("twice(temp) + 1"), Value::Double(45.0));
    assert_eq!(eval("twice(1, 2)"), Value::Undefined);
}

struct History;

impl TemporalSource for History {
    fn window(&self, func: TemporalFn, name: &str, period: f64, until: f64) -> Option<Value> {
        (name == "temp").then(|| Value::from(format!("{}:{period}:{until}", func.name())))
    }
}

struct Doubler;

impl MlModel for Doubler {
    fn run(&self, inputs: &[Value]) -> Value {
        Value::Double(inputs.iter().filter_map(|v| v.as_f64().ok()).sum::<f64>() * 2.0)
    }
}

struct Models;

impl MlModels for Models {
    fn model(&self, name: &str) -> Option<Arc<dyn MlModel>> {
        (name == "predict").then(|| Arc::new(Doubler) as Arc<dyn MlModel>)
    }
}

#[test]
fn test_temporal_reads_history_window() {
    let env = env();
    let source = WithServices::new(&env).with_temporal(&History);
    let eval = |s: &str| evaluate_direct(&parse(s), &source).unwrap();

    assert_eq!(eval("AVERAGE(temp, 1h)"), Value::from("AVERAGE:3600:0"));
    assert_eq!(eval("DELTA(temp, 15min, 1h)"), Value::from("DELTA:900:3600"));
}

#[test]
fn test_temporal_without_history() {
    assert_eq!(eval("AVERAGE(temp, 1h)"), Value::Double(22.0));
    assert_eq!(eval("DELTA(temp, 1h)"), Value::Double(0.0));
    assert_eq!(eval("STND({1, 3}, 1h)"), Value::Double(1.0));
    assert_eq!(
        evaluate_with_env(&parse("AVERAGE({1, 3}, 1h)"), &env()).unwrap_err(),
        EvalError::TemporalOverArray(TemporalFn::Average)
    );
}

#[test]
fn test_ml_models_are_a_fallback() {
    let env = env();
    let source = WithServices::new(&env).with_ml_models(&Models);
    let value = evaluate_direct(&parse("predict(temp, 1)"), &source).unwrap();
    assert_eq!(value, Value::Double(46.0));
}
