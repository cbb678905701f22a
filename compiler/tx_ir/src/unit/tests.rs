use super::*;

#[test]
fn test_temperature_aliases() {
    assert_eq!(kind_of("degC"), UnitKind::Celsius);
    assert_eq!(kind_of("degrees-celsius"), UnitKind::Celsius);
    assert_eq!(kind_of("°C"), UnitKind::Celsius);
    assert_eq!(kind_of("DEGF"), UnitKind::Fahrenheit);
    assert_eq!(canonical("degrees-fahrenheit"), "degF");
}

#[test]
fn test_flow_and_percentage_aliases() {
    assert_eq!(canonical("lps"), LPS);
    assert_eq!(kind_of("cfm"), UnitKind::CubicFeetPerMinute);
    assert_eq!(canonical("percentage"), PERCENT);
    assert_eq!(kind_of("percentage100"), UnitKind::Percentage100);
}

#[test]
fn test_unknown_units_pass_through() {
    assert_eq!(kind_of("occ"), UnitKind::Other);
    assert_eq!(canonical("occ"), "occ");
    assert_eq!(kind_of_opt(None), UnitKind::Other);
}

#[test]
fn test_time_spans() {
    assert_eq!(to_seconds(1.0, "h"), Some(3_600.0));
    assert_eq!(to_seconds(15.0, "min"), Some(900.0));
    assert_eq!(to_seconds(2.0, "days"), Some(172_800.0));
    assert_eq!(to_seconds(1.0, "degC"), None);
}

#[test]
fn test_describe_respects_measurement_system() {
    assert_eq!(describe("degF", false), "°F");
    assert_eq!(describe("degF", true), "°C");
    assert_eq!(describe("degC", false), "°F");
    assert_eq!(describe("h", true), "hours");
}

#[test]
fn test_to_system_converts_temperatures_only() {
    assert_eq!(to_system(100.0, "degC", false), 212.0);
    assert_eq!(to_system(21.0, "degC", true), 21.0);
    assert!((to_system(212.0, "degF", true) - 100.0).abs() < 1e-9);
    assert_eq!(to_system(3.0, "h", false), 3.0);
}

#[test]
fn test_conversion_constants_render_as_used_in_rules() {
    assert_eq!(CELSIUS_FACTOR.to_string(), "0.555555555555556");
    assert_eq!(CFM_TO_LPS.to_string(), "0.47194745");
}

#[test]
fn test_coercion_names_include_misspellings() {
    assert_eq!(Coercion::from_name("celcius"), Some(Coercion::Celsius));
    assert_eq!(Coercion::from_name("FARHENHEIT"), Some(Coercion::Fahrenheit));
    assert_eq!(Coercion::from_name("PERCENT"), Some(Coercion::Percentage));
    assert_eq!(Coercion::from_name("ABS"), None);
}

#[test]
fn test_coercion_conversions() {
    assert_eq!(
        Coercion::Fahrenheit.conversion(Some("degrees-celsius")),
        Conversion::CelsiusToFahrenheit
    );
    assert_eq!(Coercion::Fahrenheit.conversion(Some("degF")), Conversion::Keep);
    assert_eq!(Coercion::Metric.conversion(Some("cfm")), Conversion::CfmToLps);
    assert_eq!(Coercion::Metric.conversion(Some("%")), Conversion::Reject);
    assert_eq!(Coercion::Metric.conversion(None), Conversion::Keep);
    assert_eq!(Coercion::Percentage.conversion(Some("%100")), Conversion::Percent100ToPercent);
    assert_eq!(Coercion::Percentage.conversion(Some("degC")), Conversion::Reject);
}

#[test]
fn test_conversion_apply() {
    assert_eq!(Conversion::CelsiusToFahrenheit.apply(100.0), Some(212.0));
    assert!((Conversion::FahrenheitToCelsius.apply(212.0).unwrap() - 100.0).abs() < 1e-9);
    assert_eq!(Conversion::Percent100ToPercent.apply(50.0), Some(0.5));
    assert_eq!(Conversion::Reject.apply(1.0), None);
    assert_eq!(Conversion::CfmToLps.target_unit(), Some("l/s"));
}
