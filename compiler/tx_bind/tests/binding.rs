//! Binding rule expressions against a small building.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use pretty_assertions::{assert_eq, assert_ne};
use tx_bind::graph::relation;
use tx_bind::testing::{services, InMemoryModels, InMemoryTwins};
use tx_bind::{BindError, BindOptions, BindToTwins, TwinGraph};
use tx_eval::{evaluate_with_env, Env, RegisteredFunction};
use tx_ir::{AggregateFn, BinaryOp, Expr, ExprKind, PropertyMap, Twin, TwinRef, Value};

const AHU: &str = "dtmi:com:willowinc:AirHandlingUnit;1";
const FAN: &str = "dtmi:com:willowinc:Fan;1";
const SAT: &str = "dtmi:com:willowinc:SupplyAirTemperatureSensor;1";
const ZAT: &str = "dtmi:com:willowinc:ZoneAirTemperatureSensor;1";
const AIR_TEMP: &str = "dtmi:com:willowinc:AirTemperatureSensor;1";
const SENSOR: &str = "dtmi:com:willowinc:Sensor;1";
const EQUIPMENT: &str = "dtmi:com:willowinc:Equipment;1";
const DAMPER: &str = "dtmi:com:willowinc:DamperPositionSensor;1";
const VAV: &str = "dtmi:com:willowinc:VAVBox;1";
const EVENT: &str = "dtmi:com:willowinc:FaultEvent;1";

const ZONES: usize = 12;

fn parse(source: &str) -> Expr {
    tx_parse::parse(source).unwrap()
}

/// One air handler with a fan, a supply temperature sensor, a damper and an
/// event point, feeding twelve VAV boxes with a zone sensor each.
fn building() -> Arc<InMemoryTwins> {
    let mut nameplate = PropertyMap::new();
    nameplate.insert("manufacturer", "Acme");

    let mut graph = TwinGraph::new();
    graph.add_twin(
        Twin::new("AHU-01", AHU)
            .with_name("Air handler 1")
            .with_property("maxAirflowRating", 1930.0)
            .with_property("nameplate", nameplate)
            .into_ref(),
    );
    graph.add_twin(
        Twin::new("FAN-01", FAN)
            .with_property("maxCurrent", 12.5)
            .into_ref(),
    );
    graph.add_twin(
        Twin::new("SAT-01", SAT)
            .with_unit("degF")
            .with_tags(["supply", "air", "temp", "sensor"])
            .into_ref(),
    );
    graph.add_twin(Twin::new("DMP-01", DAMPER).with_unit("percentage100").into_ref());
    graph.add_twin(Twin::new("EVT-01", EVENT).into_ref());
    for capability in ["FAN-01", "SAT-01", "DMP-01", "EVT-01"] {
        graph.relate(capability, relation::IS_CAPABILITY_OF, "AHU-01");
    }
    // The same fan reached over two more relationships.
    graph.relate("FAN-01", relation::IS_CAPABILITY_OF, "AHU-01");
    graph.relate("FAN-01", "hostedBy", "AHU-01");

    for zone in 1..=ZONES {
        let vav = format!("VAV-{zone:02}");
        let zat = format!("ZAT-{zone:02}");
        graph.add_twin(Twin::new(&vav, VAV).into_ref());
        graph.add_twin(
            Twin::new(&zat, ZAT)
                .with_unit("degC")
                .with_tags(["zone", "air", "temp", "sensor"])
                .into_ref(),
        );
        graph.relate("AHU-01", relation::FEEDS, &vav);
        graph.relate(&zat, relation::IS_CAPABILITY_OF, &vav);
    }
    Arc::new(InMemoryTwins::new(graph))
}

fn models() -> InMemoryModels {
    InMemoryModels::new()
        .with_extends(SAT, AIR_TEMP)
        .with_extends(ZAT, AIR_TEMP)
        .with_extends(AIR_TEMP, SENSOR)
        .with_extends(AHU, EQUIPMENT)
        .with_extends(FAN, EQUIPMENT)
        .with_text_based(EVENT)
}

struct Fixture {
    twins: Arc<InMemoryTwins>,
    env: Env,
}

impl Fixture {
    fn new() -> Self {
        Fixture {
            twins: building(),
            env: Env::empty().push(),
        }
    }

    fn with(mut self, name: &str, value: impl Into<tx_eval::Binding>) -> Self {
        self.env = self.env.assign(name, value).unwrap();
        self
    }

    fn twin(&self, id: &str) -> TwinRef {
        let graph = self.twins.building();
        graph.twin(graph.find(id).unwrap()).clone()
    }

    fn binder(&self, twin: TwinRef) -> BindToTwins {
        BindToTwins::new(&self.env, twin, services(&self.twins, models()))
    }

    fn bind_with(&self, id: &str, source: &str, options: BindOptions) -> (Expr, bool) {
        let mut binder = BindToTwins::with_options(
            &self.env,
            self.twin(id),
            services(&self.twins, models()),
            options,
        );
        let bound = binder.bind(&parse(source));
        (bound, binder.success())
    }

    fn bind_on(&self, twin: TwinRef, source: &str) -> (Expr, bool) {
        let mut binder = self.binder(twin);
        let bound = binder.bind(&parse(source));
        (bound, binder.success())
    }

    fn bind_at(&self, id: &str, source: &str) -> (Expr, bool) {
        self.bind_on(self.twin(id), source)
    }

    fn bind(&self, source: &str) -> (Expr, bool) {
        self.bind_at("AHU-01", source)
    }
}

/// A twin that is not in the building.
fn mock() -> TwinRef {
    let mut fan = PropertyMap::new();
    fan.insert("maxCurrent", 3.0);
    Twin::new("mock", AHU)
        .with_property("maxAirflowRating", 1930.0)
        .with_property("fan", fan)
        .into_ref()
}

fn ids(expr: &Expr) -> Vec<String> {
    expr.as_array()
        .unwrap()
        .iter()
        .map(|item| item.as_twin().unwrap().id.clone())
        .collect()
}

fn number(expr: &Expr) -> f64 {
    match evaluate_with_env(expr, &Env::empty()).unwrap() {
        Value::Double(d) => d,
        other => panic!("expected a number, got {other:?}"),
    }
}

// Observed behaviour of existing rules

#[test]
fn test_this_property_binds_to_content() {
    let (bound, ok) = Fixture::new().bind_on(mock(), "this.maxAirflowRating");
    assert!(ok);
    assert_eq!(bound, Expr::double(1930.0));
}

#[test]
fn test_metric_rejects_percentages() {
    let setpoint = Expr::variable("airflow setpoint").with_unit("percentage");
    let fixture = Fixture::new().with("airflow setpoint", setpoint.clone());
    let (bound, ok) = fixture.bind_on(mock(), "METRIC([airflow setpoint])");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed(
            "Cannot coerce % to METRIC",
            Expr::call("METRIC", vec![setpoint])
        )
    );
}

#[test]
fn test_option_recovers_from_a_failed_alternative() {
    let fixture = Fixture::new()
        .with("a", Expr::failed("No twin", Expr::variable("x")))
        .with("c", Expr::variable("delta_sensor"));
    let (bound, ok) = fixture.bind_on(mock(), "OPTION(a - b, c)");
    assert!(ok);
    assert_eq!(bound, Expr::variable("delta_sensor"));
}

#[test]
fn test_fold_keeps_failures_local_to_their_element() {
    let (bound, ok) = Fixture::new().bind_on(mock(), "{2,3,4,sat} > 0");
    assert!(!ok);
    assert_eq!(
        bound,
        parse("{2 > 0, 3 > 0, 4 > 0, FAILED('Could not resolve variable', sat) > 0}")
    );
}

#[test]
fn test_each_over_a_twin_without_the_property() {
    let invalid = Twin::new("invalid", FAN).into_ref();
    let fixture = Fixture::new().with("myvar", Expr::twin(invalid));
    let (bound, ok) = fixture.bind_on(mock(), "MAX(EACH(myvar, item, item.notfound))");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::aggregate(
            AggregateFn::Max,
            Expr::failed(
                "EACH Argument is empty. 1 failed.",
                Expr::array(vec![Expr::failed(
                    "Missing property for twin invalid",
                    parse("item.notfound")
                )])
            )
        )
    );
}

// Properties

#[test]
fn test_missing_twin_property_fails_at_the_twin() {
    let (bound, ok) = Fixture::new().bind_on(mock(), "this.fanMissing.maxCurrent");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed("Missing property for twin mock", parse("this.fanMissing"))
    );
}

#[test]
fn test_missing_object_key_fails_at_the_access() {
    let fixture = Fixture::new();
    let (bound, ok) = fixture.bind_on(mock(), "this.fan.maxCurrent");
    assert!(ok);
    assert_eq!(bound, Expr::double(3.0));

    let (bound, ok) = fixture.bind_on(mock(), "this.fan.maxCurrentMissing");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed(
            "Could not resolve property",
            parse("this.fan.maxCurrentMissing")
        )
    );
}

#[test]
fn test_nested_content_by_dotted_path() {
    let fixture = Fixture::new();
    let (bound, ok) = fixture.bind("this.[nameplate.manufacturer]");
    assert!(ok);
    assert_eq!(bound, Expr::string("Acme"));
    assert_eq!(fixture.bind("this.nameplate.manufacturer").0, Expr::string("Acme"));
}

#[test]
fn test_built_in_fields() {
    let fixture = Fixture::new();
    assert_eq!(fixture.bind("this.name").0, Expr::string("Air handler 1"));
    assert_eq!(fixture.bind("this.modelId").0, Expr::string(AHU));
    assert_eq!(
        fixture.bind(&format!("[{SAT}].unit")).0,
        Expr::string("degF")
    );

    let (bound, ok) = fixture.bind("this.contents");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed("Cannot evaluate the Contents property", parse("this.contents"))
    );
}

#[test]
fn test_parent_follows_capability_edges() {
    let fixture = Fixture::new();
    let (bound, ok) = fixture.bind_at("FAN-01", "this.parent");
    assert!(ok);
    assert_eq!(bound.as_twin().unwrap().id, "AHU-01");

    let (bound, _) = fixture.bind_at("ZAT-03", "this.parent");
    assert_eq!(bound.as_twin().unwrap().id, "VAV-03");

    let (bound, ok) = fixture.bind("this.parent");
    assert!(!ok);
    assert_eq!(bound, Expr::failed("Could not resolve property", parse("this.parent")));
}

#[test]
fn test_text_based_telemetry_keeps_unknown_properties() {
    let (bound, ok) = Fixture::new().bind(&format!("[{EVENT}].faultCode"));
    assert!(ok);
    let ExprKind::Property { target, name } = bound.kind() else {
        panic!("expected a property access, got {bound}");
    };
    assert_eq!(target.as_twin().unwrap().id, "EVT-01");
    assert_eq!(name, "faultCode");
}

#[test]
fn test_property_over_an_array_drops_elements_without_it() {
    let fixture = Fixture::new()
        .with("fan", Expr::twin(fixture_twin("FAN-01")))
        .with("sat", Expr::twin(fixture_twin("SAT-01")));
    let (bound, ok) = fixture.bind("{fan, sat}.maxCurrent");
    assert!(ok);
    assert_eq!(bound, Expr::double(12.5));

    let (bound, ok) = fixture.bind("{sat, sat}.maxCurrent");
    assert!(!ok);
    let ExprKind::Failed { reason, .. } = bound.kind() else {
        panic!("expected a failure, got {bound}");
    };
    assert_eq!(reason, "Property access as Array no valid children (out of 2)");
}

fn fixture_twin(id: &str) -> TwinRef {
    Fixture::new().twin(id)
}

// Model ids

#[test]
fn test_model_id_resolves_a_capability_once() {
    let fixture = Fixture::new();
    let (bound, ok) = fixture.bind(&format!("[{FAN}]"));
    assert!(ok);
    assert_eq!(bound.as_twin().unwrap().id, "FAN-01");

    let (bound, ok) = fixture.bind(&format!("[{FAN}].maxCurrent"));
    assert!(ok);
    assert_eq!(bound, Expr::double(12.5));
}

#[test]
fn test_model_id_prefers_exact_over_inherited() {
    let fixture = Fixture::new();
    let (bound, _) = fixture.bind(&format!("[{AIR_TEMP}]"));
    assert_eq!(bound.as_twin().unwrap().id, "SAT-01");

    let (bound, _) = fixture.bind(&format!("[{SAT}]"));
    assert_eq!(bound.as_twin().unwrap().id, "SAT-01");
}

#[test]
fn test_model_id_searches_further_rings() {
    let fixture = Fixture::new();
    let (bound, ok) = fixture.bind(&format!("[{ZAT}]"));
    assert!(ok);
    assert_eq!(ids(&bound).len(), ZONES);
    assert_eq!(ids(&bound)[0], "ZAT-01");

    let (bound, ok) = fixture.bind_at("VAV-01", &format!("[{AHU}]"));
    assert!(ok);
    assert_eq!(bound.as_twin().unwrap().id, "AHU-01");
}

#[test]
fn test_model_id_without_matches_fails() {
    let (bound, ok) = Fixture::new().bind("[dtmi:com:willowinc:Chiller;1]");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed(
            "No twin matches found",
            Expr::variable("dtmi:com:willowinc:Chiller;1")
        )
    );

    let (bound, _) = Fixture::new().bind_on(mock(), &format!("[{FAN}]"));
    assert_eq!(
        bound,
        Expr::failed(
            "Could not find twin id in graph 'mock'",
            Expr::variable(FAN)
        )
    );
}

#[test]
fn test_is_checks_the_model_hierarchy() {
    let fixture = Fixture::new();
    assert_eq!(fixture.bind(&format!("this is [{EQUIPMENT}]")).0, Expr::bool(true));
    assert_eq!(fixture.bind(&format!("this is [{SENSOR}]")).0, Expr::bool(false));
    assert_eq!(
        fixture.bind(&format!("[{ZAT}] is [{SENSOR}]")).0,
        Expr::array(vec![Expr::bool(true); ZONES])
    );
}

// Folding

#[test]
fn test_fold_limit_is_ten_elements() {
    let fixture = Fixture::new();
    let ten = (1..=10).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
    let (bound, ok) = fixture.bind(&format!("{{{ten}}} > 0"));
    assert!(ok);
    assert!(bound.first_failed().is_none());

    let (bound, ok) = fixture.bind(&format!("{{{ten},11}} > 0"));
    assert!(!ok);
    assert_eq!(bound, Expr::failed("Max array count of 10 reached", parse("{1}")));

    let (bound, _) = fixture.bind(&format!("[{VAV}] > 0"));
    let ExprKind::Failed { reason, .. } = bound.kind() else {
        panic!("expected a failure, got {bound}");
    };
    assert_eq!(reason, "Max array count of 10 reached");
}

#[test]
fn test_wider_limit_by_option() {
    let fixture = Fixture::new();
    let options = BindOptions {
        max_array_count: ZONES,
        ..BindOptions::default()
    };
    let mut binder = BindToTwins::with_options(
        &fixture.env,
        fixture.twin("AHU-01"),
        services(&fixture.twins, models()),
        options,
    );
    let bound = binder.bind(&parse(&format!("[{ZAT}] > 20")));
    assert!(binder.success());
    assert_eq!(bound.as_array().unwrap().len(), ZONES);
}

#[test]
fn test_aggregates_see_the_whole_array() {
    let (bound, ok) = Fixture::new().bind(&format!("AVERAGE([{ZAT}])"));
    assert!(ok);
    let ExprKind::Aggregate { arg, .. } = bound.kind() else {
        panic!("expected an aggregate, got {bound}");
    };
    assert_eq!(ids(arg).len(), ZONES);
}

#[test]
fn test_small_any_and_all_become_logical_operators() {
    let fixture = Fixture::new().with("x", 2.0).with("y", 3.0);
    assert_eq!(
        fixture.bind("ALL({x > 1, y > 1})").0,
        Expr::and(vec![parse("2 > 1"), parse("3 > 1")])
    );
    assert_eq!(fixture.bind("ANY({x > 1})").0, parse("2 > 1"));
}

#[test]
fn test_function_calls_fold_over_array_arguments() {
    let fixture = Fixture::new().with("temps", parse("{20, 22}"));
    let (bound, ok) = fixture.bind("ABS(temps)");
    assert!(ok);
    assert_eq!(bound, parse("{ABS(20), ABS(22)}"));
}

#[test]
fn test_temporal_over_one_point() {
    let (bound, ok) = Fixture::new().bind_at("VAV-01", &format!("AVERAGE([{ZAT}], 1h)"));
    assert!(ok);
    let ExprKind::Temporal { arg, .. } = bound.kind() else {
        panic!("expected a temporal function, got {bound}");
    };
    assert_eq!(arg.as_twin().unwrap().id, "ZAT-01");
}

// Functions

#[test]
fn test_tolerant_option() {
    let fixture = Fixture::new().with("b", 2.0).with("c", parse("3 + 1"));
    let (bound, ok) = fixture.bind_on(mock(), "TOLERANTOPTION(a, b, c)");
    assert!(ok);
    assert_eq!(
        bound,
        Expr::call("TOLERANTOPTION", vec![Expr::double(2.0), parse("3 + 1")])
    );

    let (bound, ok) = fixture.bind_on(mock(), "TOLERANTOPTION(a, d)");
    assert!(!ok);
    assert_eq!(
        bound,
        parse(
            "TOLERANTOPTION(FAILED('Could not resolve variable', a), \
             FAILED('Could not resolve variable', d))"
        )
    );
}

#[test]
fn test_tolerant_option_collapses_constants() {
    let fixture = Fixture::new().with("b", 2.0).with("c", 5.0);
    let (bound, ok) = fixture.bind_on(mock(), "TOLERANTOPTION(a, b, c)");
    assert!(ok);
    assert_eq!(bound, Expr::double(2.0));
}

#[test]
fn test_exists_and_count_bindings() {
    let fixture = Fixture::new();
    assert_eq!(fixture.bind(&format!("EXISTS([{FAN}])")), (Expr::bool(true), true));
    assert_eq!(fixture.bind("EXISTS(nowhere)"), (Expr::bool(false), true));
    assert_eq!(
        fixture.bind(&format!("COUNT_BINDINGS([{ZAT}])")).0,
        Expr::double(12.0)
    );
    assert_eq!(
        fixture.bind(&format!("COUNT_BINDINGS([{FAN}])")).0,
        Expr::double(1.0)
    );
}

#[test]
fn test_macros_expand_with_bound_arguments() {
    let fixture = Fixture::new()
        .with(
            "spread",
            RegisteredFunction::new("spread", vec!["hi".into(), "lo".into()], parse("hi - lo")),
        )
        .with("limit", RegisteredFunction::new("limit", vec![], parse("20 + 2")))
        .with("sp", 21.0);

    let (bound, ok) = fixture.bind("spread(sp, 2) > limit");
    assert!(ok);
    assert_eq!(bound, parse("(21 - 2) > (20 + 2)"));

    let (bound, ok) = fixture.bind("spread(sp)");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed(
            "Function 'spread' parameter count mismatch source count 1 and function count 2",
            parse("spread(sp)")
        )
    );
}

#[test]
fn test_each_over_twins() {
    let (bound, ok) = Fixture::new().bind(&format!("EACH([{ZAT}], z, z.unit)"));
    assert!(ok);
    assert_eq!(bound, Expr::array(vec![Expr::string("degC"); ZONES]));
}

// Units

#[test]
fn test_celsius_of_a_fahrenheit_sensor() {
    let fixture = Fixture::new();
    let (bound, ok) = fixture.bind(&format!("CELSIUS([{SAT}])"));
    assert!(ok);
    assert_eq!(bound.unit(), Some("degC"));
    let ExprKind::Nary { children, .. } = bound.kind() else {
        panic!("expected a product, got {bound}");
    };
    let ExprKind::Binary { op, left, .. } = children[0].kind() else {
        panic!("expected a difference, got {}", children[0]);
    };
    assert_eq!(*op, BinaryOp::Sub);
    assert_eq!(left.as_twin().unwrap().id, "SAT-01");
    assert_eq!(children[1], Expr::double(0.555_555_555_555_556));
}

#[test]
fn test_fahrenheit_of_a_celsius_reading() {
    let fixture = Fixture::new().with("t", Expr::double(20.0).with_unit("degrees-celsius"));
    let (bound, ok) = fixture.bind("FAHRENHEIT(t)");
    assert!(ok);
    assert_eq!(bound.unit(), Some("degF"));
    assert!((number(&bound) - 68.0).abs() < 1e-9);

    let (bound, _) = fixture.bind("CELSIUS(t)");
    assert_eq!(bound, Expr::double(20.0).with_unit("degC"));
    assert_eq!(bound.unit(), Some("degC"));
}

#[test]
fn test_metric_and_percentage_conversions() {
    let fixture = Fixture::new().with("flow", Expr::double(100.0).with_unit("cfm"));
    let (bound, ok) = fixture.bind("METRIC(flow)");
    assert!(ok);
    assert_eq!(bound.unit(), Some("l/s"));
    assert!((number(&bound) - 47.194_745).abs() < 1e-9);

    let (bound, ok) = fixture.bind(&format!("PERCENTAGE([{DAMPER}])"));
    assert!(ok);
    assert_eq!(bound.unit(), Some("%"));

    let (bound, ok) = fixture.bind("PERCENTAGE(flow)");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed(
            "Cannot coerce % to METRIC",
            Expr::call("PERCENTAGE", vec![Expr::double(100.0).with_unit("cfm")])
        )
    );

    let (bound, ok) = fixture.bind("CELSIUS()");
    assert!(!ok);
    assert_eq!(bound, Expr::failed("Argument expected", parse("CELSIUS()")));
}

// Batches

#[test]
fn test_bind_all_stops_when_cancelled() {
    let fixture = Fixture::new();
    let rules = [parse("this.maxAirflowRating"), parse(&format!("[{FAN}]"))];

    let mut binder = fixture.binder(fixture.twin("AHU-01"));
    let bound = binder.bind_all(&rules, Some(&AtomicBool::new(false))).unwrap();
    assert_eq!(bound.len(), 2);
    assert!(binder.success());

    let mut binder = fixture.binder(fixture.twin("AHU-01"));
    let cancelled = binder.bind_all(&rules, Some(&AtomicBool::new(true)));
    assert_eq!(cancelled, Err(BindError::Cancelled { completed: 0 }));
}

// Tags and ignored names

#[test]
fn test_names_resolve_by_tags() {
    let fixture = Fixture::new();
    let (bound, ok) = fixture.bind("[supply air temp]");
    assert!(ok);
    assert_eq!(bound.as_twin().unwrap().id, "SAT-01");

    // Any order, any case.
    let (bound, ok) = fixture.bind("[Temp SUPPLY] > 50");
    assert!(ok);
    let ExprKind::Binary { left, .. } = bound.kind() else {
        panic!("expected a comparison, got {bound}");
    };
    assert_eq!(left.as_twin().unwrap().id, "SAT-01");

    let (bound, ok) = fixture.bind("[supply water temp]");
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed("Could not resolve variable", parse("[supply water temp]"))
    );
}

#[test]
fn test_ignored_twins_are_never_matched() {
    let fixture = Fixture::new();
    let ignore_sat = BindOptions::default().with_ignored_twins(["SAT-01"]);

    let (bound, ok) = fixture.bind_with("AHU-01", "[supply air temp]", ignore_sat.clone());
    assert!(!ok);
    assert!(bound.is_failed());

    let (bound, ok) = fixture.bind_with("AHU-01", &format!("[{AIR_TEMP}]"), ignore_sat);
    assert!(!ok);
    assert_eq!(
        bound,
        Expr::failed("No twin matches found", parse(&format!("[{AIR_TEMP}]")))
    );

    let (bound, ok) = fixture.bind_with(
        "AHU-01",
        &format!("[{ZAT}]"),
        BindOptions::default().with_ignored_twins(["ZAT-01"]),
    );
    assert!(ok);
    let zones = ids(&bound);
    assert_eq!(zones.len(), ZONES - 1);
    assert!(!zones.contains(&"ZAT-01".to_owned()));
}

#[test]
fn test_ignored_name_is_not_expanded_from_its_own_earlier_value() {
    let fixture = Fixture::new();
    let (earlier, ok) = fixture.bind_at("VAV-01", &format!("[{ZAT}] + {{1, 2}}"));
    assert!(ok);

    let fixture = fixture.with("zat", earlier);
    let (bound, ok) = fixture.bind_with(
        "VAV-01",
        "zat > 1",
        BindOptions::default().with_ignored(["zat"]),
    );
    assert!(ok);
    assert_eq!(bound, parse("zat > 1"));

    // Without the guard the stored value is substituted.
    let (bound, ok) = fixture.bind_at("VAV-01", "zat > 1");
    assert!(ok);
    assert_ne!(bound, parse("zat > 1"));
}
