//! Evaluation Tests
//!
//! End-to-end passes over postfix expressions:
//! - Operand order of non-commutative operators
//! - Timestamp propagation and special values
//! - Windowed aggregates across passes
//! - Error propagation without losing aggregate state

#![allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable

use voltage_expr::date::NANOS_PER_SECOND;
use voltage_expr::{
    parse_postfix_str, CursorSettings, CursorStart, ExprError, Expression, ExpressionConfig,
    TimedValue, Value, FALSE, TRUE,
};

fn expr(source: &str) -> Expression {
    parse_postfix_str(source, ExpressionConfig::default()).unwrap()
}

fn float(value: &Value) -> f64 {
    match value {
        Value::Float(f) => *f,
        Value::Int(i) => *i as f64,
        other => panic!("expected a number, got {other:?}"),
    }
}

/// Feed `(timestamp, value)` samples into variable `name`, collecting results
fn feed(expr: &mut Expression, name: &str, samples: &[(i64, f64)]) -> Vec<f64> {
    samples
        .iter()
        .map(|(t, v)| {
            expr.set_variable(name, *v, *t).unwrap();
            float(&expr.evaluate_simple().unwrap().value)
        })
        .collect()
}

// ============================================================================
// Operand Order
// ============================================================================

#[test]
fn test_addition_is_commutative() {
    let pairs = [(1.5, 2.25), (-3.0, 7.0), (1e10, 1e-3), (0.0, -0.0)];
    for (a, b) in pairs {
        let mut ab = expr("A B +");
        let mut ba = expr("B A +");
        for e in [&mut ab, &mut ba] {
            e.set_variable("A", a, 1).unwrap();
            e.set_variable("B", b, 2).unwrap();
        }
        assert_eq!(
            ab.evaluate_simple().unwrap(),
            ba.evaluate_simple().unwrap(),
            "A + B != B + A for {a}, {b}"
        );
    }
}

#[test]
fn test_subtraction_pops_subtrahend_first() {
    let mut e = expr("A B -");
    e.set_variable("A", 10_i64, 1).unwrap();
    e.set_variable("B", 4_i64, 2).unwrap();
    assert_eq!(e.evaluate_simple().unwrap().value, Value::Int(6));

    let mut e = expr("A B /");
    e.set_variable("A", 1_i64, 1).unwrap();
    e.set_variable("B", 4_i64, 2).unwrap();
    assert_eq!(e.evaluate_simple().unwrap().value, Value::Float(0.25));
}

#[test]
fn test_relational_left_side_is_later_operand() {
    let cases = [
        ("<", TRUE),
        (">", FALSE),
        ("<=", TRUE),
        (">=", FALSE),
        ("=", FALSE),
        ("<>", TRUE),
    ];
    for (op, expected) in cases {
        // pushed 5 then 3: every relation reads `3 op 5`
        let mut e = expr(&format!("5 3 {op}"));
        assert_eq!(
            e.evaluate_simple().unwrap().value,
            Value::Int(expected),
            "operator {op}"
        );
    }
}

// ============================================================================
// Timestamps and Special Values
// ============================================================================

#[test]
fn test_division_by_zero_carries_newest_timestamp() {
    let mut e = expr("X Y /");
    e.set_variable("X", 7.0, 100).unwrap();
    e.set_variable("Y", 0.0, 40).unwrap();
    let result = e.evaluate_simple().unwrap();
    assert_eq!(result.value, Value::Float(f64::INFINITY));
    assert_eq!(result.timestamp, 100);

    e.set_variable("X", 0.0, 100).unwrap();
    e.set_variable("Y", 0.0, 400).unwrap();
    let result = e.evaluate_simple().unwrap();
    assert!(float(&result.value).is_nan());
    assert_eq!(result.timestamp, 400);
}

#[test]
fn test_constants_do_not_move_timestamps() {
    let mut e = expr("P 2 * 10 +");
    e.set_variable("P", 3_i64, 55).unwrap();
    assert_eq!(e.evaluate_simple().unwrap(), TimedValue::new(16_i64, 55));
}

#[test]
fn test_is_equal_tolerance() {
    let mut e = expr("A B =");
    e.set_variable("A", 0.300_000_000_000_000_04, 0).unwrap();
    e.set_variable("B", 0.3, 0).unwrap();
    assert_eq!(e.evaluate_simple().unwrap().value, Value::Int(TRUE));
}

#[test]
fn test_nan_propagates_without_error() {
    let mut e = expr("A Sqr 1 +");
    e.set_variable("A", -4.0, 0).unwrap();
    assert!(float(&e.evaluate_simple().unwrap().value).is_nan());
}

#[test]
fn test_pure_expression_is_idempotent() {
    let mut e = expr("A B * C - 2 ^ Sqr");
    e.set_variable("A", 1.1, 1).unwrap();
    e.set_variable("B", 3.3, 2).unwrap();
    e.set_variable("C", 0.7, 3).unwrap();
    assert!(!e.is_stateful());

    let first = e.evaluate_simple().unwrap();
    let second = e.evaluate_simple().unwrap();
    assert_eq!(float(&first.value).to_bits(), float(&second.value).to_bits());
    assert_eq!(first.timestamp, second.timestamp);
}

// ============================================================================
// Aggregates Across Passes
// ============================================================================

#[test]
fn test_running_average_window_of_three() {
    let mut e = expr("V 3 RunningAverage");
    let outputs = feed(&mut e, "V", &[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]);
    assert_eq!(outputs, vec![1.0, 1.5, 2.0, 3.0]);
}

#[test]
fn test_time_total_sixty_second_window() {
    let mut e = expr("V 60 Seconds TimeTotal");
    let s = NANOS_PER_SECOND;
    let outputs = feed(&mut e, "V", &[(0, 10.0), (30 * s, 20.0), (90 * s, 30.0)]);
    assert_eq!(outputs, vec![10.0, 30.0, 50.0]);
}

#[test]
fn test_population_standard_deviation() {
    let mut e = expr("V 0 RunningStdDev");
    let samples: Vec<(i64, f64)> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
        .iter()
        .enumerate()
        .map(|(i, v)| (i as i64, *v))
        .collect();
    let outputs = feed(&mut e, "V", &samples);
    assert_eq!(outputs.last(), Some(&2.0));
}

#[test]
fn test_running_median() {
    let mut e = expr("V 4 RunningMedian");
    let outputs = feed(&mut e, "V", &[(1, 5.0), (2, 1.0), (3, 3.0), (4, 10.0)]);
    assert_eq!(outputs, vec![5.0, 3.0, 3.0, 4.0]);
}

#[test]
fn test_running_window_recovers_after_outlier() {
    let samples: Vec<(i64, f64)> = [230.0, 230.0, 1e20, 230.0, 230.0, 230.0, 230.0]
        .iter()
        .enumerate()
        .map(|(i, v)| (i as i64, *v))
        .collect();

    let mut average = expr("V 3 RunningAverage");
    let outputs = feed(&mut average, "V", &samples);
    assert_eq!(&outputs[5..], &[230.0, 230.0]);

    let mut total = expr("V 3 RunningTotal");
    assert_eq!(feed(&mut total, "V", &samples).last(), Some(&690.0));

    let mut std_dev = expr("V 3 RunningStdDev");
    let outputs = feed(&mut std_dev, "V", &[(0, 1e9), (1, 5.0), (2, 7.0), (3, 9.0)]);
    let last = outputs[3];
    assert!((last - (8.0_f64 / 3.0).sqrt()).abs() < 1e-9, "got {last}");
}

#[test]
fn test_time_window_recovers_after_outlier() {
    let s = NANOS_PER_SECOND;
    let samples = [(0, 1e20), (5 * s, 2.0), (12 * s, 4.0)];

    let mut average = expr("V 10 Seconds TimeAverage");
    assert_eq!(feed(&mut average, "V", &samples).last(), Some(&3.0));

    let mut total = expr("V 10 Seconds TimeTotal");
    assert_eq!(feed(&mut total, "V", &samples).last(), Some(&6.0));

    let mut std_dev = expr("V 10 Seconds TimeStdDev");
    assert_eq!(feed(&mut std_dev, "V", &samples).last(), Some(&1.0));
}

#[test]
fn test_time_median_even_and_odd_windows() {
    let s = NANOS_PER_SECOND;
    let mut e = expr("V 60 Seconds TimeMedian");
    let outputs = feed(
        &mut e,
        "V",
        &[(0, 4.0), (10 * s, 1.0), (20 * s, 3.0), (30 * s, 10.0), (75 * s, 2.0)],
    );
    // four retained samples average the middle pair; at 75s the 0s and 10s samples leave
    assert_eq!(outputs, vec![4.0, 2.5, 3.0, 3.5, 3.0]);
}

#[test]
fn test_daily_reset_std_dev() {
    let day = 86_400 * NANOS_PER_SECOND;
    let mut e = expr("V 2 ResetStdDev");
    let samples: Vec<(i64, f64)> = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]
        .iter()
        .enumerate()
        .map(|(i, v)| (i as i64 * NANOS_PER_SECOND, *v))
        .collect();
    assert_eq!(feed(&mut e, "V", &samples).last(), Some(&2.0));

    // the next calendar day starts a fresh history
    let outputs = feed(&mut e, "V", &[(day, 100.0), (day + 1, 104.0)]);
    assert_eq!(outputs, vec![0.0, 2.0]);
}

#[test]
fn test_flag_reset_std_dev() {
    let mut e = expr("V F FlagResetStdDev");
    let mut pass = |v: f64, flag: i64, t: i64| {
        e.set_variable("V", v, t).unwrap();
        e.set_variable("F", flag, t).unwrap();
        float(&e.evaluate_simple().unwrap().value)
    };
    assert_eq!(pass(1.0, FALSE, 1), 0.0);
    assert_eq!(pass(3.0, FALSE, 2), 1.0);
    assert_eq!(pass(5.0, TRUE, 3), 0.0);
    assert_eq!(pass(7.0, FALSE, 4), 1.0);
}

#[test]
fn test_unset_variable_is_skipped_by_aggregates() {
    let mut e = expr("V 0 RunningTotal");
    assert!(float(&e.evaluate_simple().unwrap().value).is_nan());
    e.set_variable("V", 2.5, 1).unwrap();
    assert_eq!(e.evaluate_simple().unwrap().value, Value::Float(2.5));
}

#[test]
fn test_failed_pass_keeps_aggregate_state() {
    let mut e = expr("P 0 RunningTotal Q *");
    e.set_variable("P", 1.0, 1).unwrap();
    e.set_variable("Q", "not a number", 1).unwrap();
    let err = e.evaluate_simple().unwrap_err();
    assert!(matches!(err, ExprError::TypeMismatch { function: "Multiplication", .. }));
    assert!(!err.is_recoverable());

    e.set_variable("P", 2.0, 2).unwrap();
    e.set_variable("Q", 1_i64, 2).unwrap();
    assert_eq!(e.evaluate_simple().unwrap().value, Value::Float(3.0));
}

// ============================================================================
// Structure and Directives
// ============================================================================

#[test]
fn test_unbalanced_sequences() {
    let mut e = expr("1 2");
    assert_eq!(
        e.evaluate_simple().unwrap_err(),
        ExprError::UnbalancedStack { remaining: 2 }
    );

    let mut e = expr("1 +");
    assert_eq!(
        e.evaluate_simple().unwrap_err(),
        ExprError::stack_underflow("Addition", 2, 1)
    );
}

#[test]
fn test_directives_configure_cursor() {
    let mut e = expr("#2024-03-01# StartAtTime 1 OrderOption P");
    e.set_variable("P", 5_i64, 9).unwrap();
    let mut settings = CursorSettings::new();
    let result = e.evaluate(&mut settings).unwrap();

    assert_eq!(result, TimedValue::new(5_i64, 9));
    assert!(matches!(settings.start, Some(CursorStart::AtTime { .. })));
    assert_eq!(settings.order_option, Some(1));
}

#[test]
fn test_text_and_date_functions_compose() {
    let mut e = expr(r#""Day " #2024-03-01 08:00:00# DayOfYear & "." &"#);
    assert_eq!(e.evaluate_simple().unwrap().value, Value::text("Day 61."));
}
