use super::*;
use pretty_assertions::assert_eq;

fn scan(source: &str) -> Vec<UnboundVariableOrFunction> {
    unbound(&tx_parse::parse(source).unwrap())
}

#[test]
fn test_variables_are_distinct_and_ordered() {
    assert_eq!(
        scan("a + b * a > [zone air temp]"),
        vec![
            UnboundVariableOrFunction::variable("a"),
            UnboundVariableOrFunction::variable("b"),
            UnboundVariableOrFunction::variable("zone air temp"),
        ]
    );
}

#[test]
fn test_functions_are_flagged() {
    assert_eq!(
        scan("OPTION(x, myMacro(y))"),
        vec![
            UnboundVariableOrFunction::function("OPTION"),
            UnboundVariableOrFunction::variable("x"),
            UnboundVariableOrFunction::function("myMacro"),
            UnboundVariableOrFunction::variable("y"),
        ]
    );
}

#[test]
fn test_builtins_excluded_from_unbound_functions() {
    let expr = tx_parse::parse("ABS(x) + myMacro(2) + option(y)").unwrap();
    assert_eq!(unbound_functions(&expr), vec!["myMacro".to_owned()]);
    assert_eq!(unbound_variables(&expr), vec!["x".to_owned(), "y".to_owned()]);
}

#[test]
fn test_this_and_loop_variables_are_bound() {
    assert_eq!(
        scan("EACH(fans, f, f.speed > this.limit + other)"),
        vec![
            UnboundVariableOrFunction::variable("fans"),
            UnboundVariableOrFunction::variable("other"),
        ]
    );
}

#[test]
fn test_property_names_are_not_variables() {
    assert_eq!(
        scan("zone.temperature"),
        vec![UnboundVariableOrFunction::variable("zone")]
    );
}
