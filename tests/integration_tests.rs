// tests/integration_tests.rs

use std::{collections::HashMap, sync::Arc};

use reshape_lang::{
    Arity, DataObject, EvalContext, Evaluator, FunctionContainer, FunctionEntry, PropertySource,
    UserError, Value, Variables,
};
use serde_json::json;

fn eval_with(evaluator: &Evaluator, text: &str, ctx: &EvalContext<'_>) -> Value {
    let expr = evaluator.compile(text).unwrap();
    evaluator.evaluate(&expr, ctx).unwrap()
}

fn eval(text: &str, data: serde_json::Value) -> serde_json::Value {
    let evaluator = Evaluator::new();
    eval_with(&evaluator, text, &EvalContext::new(Value::from(data))).to_json()
}

fn order() -> serde_json::Value {
    json!({
        "Id": 1001,
        "Region": "West",
        "Customer": {"Name": "Ada", "Age": 36, "Tags": ["vip", "early"]},
        "Lines": [
            {"Sku": "A-1", "Qty": 2, "Price": 9.5},
            {"Sku": "B-7", "Qty": 1, "Price": 120},
            {"Sku": "C-3", "Qty": 5, "Price": 1.25, "Discount": null}
        ]
    })
}

// ============================================================================
// Paths
// ============================================================================

#[test]
fn test_property_lookup() {
    assert_eq!(eval("Region", order()), json!("West"));
    assert_eq!(eval("Customer.Name", order()), json!("Ada"));
    assert_eq!(eval("Missing", order()), json!(null));
}

#[test]
fn test_path_maps_over_arrays() {
    assert_eq!(eval("Lines.Sku", order()), json!(["A-1", "B-7", "C-3"]));
    assert_eq!(eval("Lines.Discount", order()), json!([]));
}

#[test]
fn test_path_flattens_nested_arrays() {
    let data = json!({
        "Orders": [
            {"Items": [1, 2]},
            {"Items": []},
            {"Items": [3]}
        ]
    });
    assert_eq!(eval("Orders.Items", data), json!([1, 2, 3]));
}

#[test]
fn test_path_descends_into_nested_arrays() {
    let data = json!({"Matrix": [[{"Name": "a"}, {"Name": "b"}], [], [[{"Name": "c"}]]]});
    assert_eq!(eval("Matrix.Name", data), json!(["a", "b", "c"]));
}

#[test]
fn test_current_data() {
    assert_eq!(eval("@", json!(5)), json!(5));
    assert_eq!(eval("@.Region", order()), json!("West"));
}

#[test]
fn test_ancestor_axis() {
    let evaluator = Evaluator::new();
    let root = EvalContext::new(Value::from(json!({"Region": "West"})));
    let order = root.child(Value::from(json!({"Id": 7})));
    let line = order.child(Value::from(json!({"Sku": "A-1"})));

    assert_eq!(eval_with(&evaluator, "/Id", &line), Value::from(7i64));
    assert_eq!(eval_with(&evaluator, "//Region", &line), Value::from("West"));
    assert_eq!(eval_with(&evaluator, "//Region", &order), Value::Null);
    assert_eq!(
        eval_with(&evaluator, "Sku + '@' + //Region", &line),
        Value::from("A-1@West")
    );
}

#[derive(Debug)]
struct Account {
    owner: &'static str,
    balance: i64,
}

impl PropertySource for Account {
    fn property(&self, name: &str) -> Option<Value> {
        match name {
            "Owner" => Some(Value::from(self.owner)),
            "Balance" => Some(Value::from(self.balance)),
            _ => None,
        }
    }
}

impl DataObject for Account {
    fn keys(&self) -> Vec<String> {
        vec!["Owner".to_string(), "Balance".to_string()]
    }
}

#[test]
fn test_host_objects() {
    let evaluator = Evaluator::new();
    let accounts = Value::Array(vec![
        Value::Host(Arc::new(Account { owner: "Ada", balance: 120 })),
        Value::Host(Arc::new(Account { owner: "Bo", balance: -5 })),
    ]);
    let ctx = EvalContext::new(accounts);

    assert_eq!(
        eval_with(&evaluator, "@[Balance < 0].Owner", &ctx),
        Value::from(vec![Value::from("Bo")])
    );
    assert_eq!(
        eval_with(&evaluator, "@[0]", &ctx).to_json(),
        json!({"Owner": "Ada", "Balance": 120})
    );
}

// ============================================================================
// Indexers
// ============================================================================

#[test]
fn test_positional_indexer() {
    assert_eq!(eval("Lines[0].Sku", order()), json!("A-1"));
    assert_eq!(eval("Lines[-1].Sku", order()), json!("C-3"));
    assert_eq!(eval("Lines[9]", order()), json!(null));
}

#[test]
fn test_property_indexer() {
    assert_eq!(eval("Customer['Name']", order()), json!("Ada"));
    assert_eq!(eval("Lookup[2]", json!({"Lookup": {"2": "two"}})), json!("two"));
}

#[test]
fn test_predicate_indexer() {
    assert_eq!(eval("Lines[Qty > 1].Sku", order()), json!(["A-1", "C-3"]));
    assert_eq!(eval("Customer.Tags[@ == 'vip']", order()), json!(["vip"]));
    assert_eq!(eval("count(Lines[Price >= 100])", order()), json!(1));
}

#[test]
fn test_predicate_indexer_on_single_value() {
    assert_eq!(eval("Customer[Age > 30].Name", order()), json!("Ada"));
    assert_eq!(eval("Customer[Age > 40]", order()), json!(null));
}

#[test]
fn test_indexer_on_null() {
    assert_eq!(eval("Missing[0]", order()), json!(null));
    assert_eq!(eval("Missing[Qty > 1]", order()), json!(null));
}

// ============================================================================
// Variables
// ============================================================================

#[test]
fn test_variables() {
    let evaluator = Evaluator::new();
    let mut vars = Variables::new();
    vars.set("limit", 100i64);
    vars.set("customer", Value::from(json!({"Address": {"City": "Oslo"}})));

    let ctx = EvalContext::new(Value::from(order())).with_variables(&vars);

    assert_eq!(
        eval_with(&evaluator, "Lines[Price > $limit].Sku", &ctx),
        Value::from(vec![Value::from("B-7")])
    );
    assert_eq!(eval_with(&evaluator, "$customer.Address.City", &ctx), Value::from("Oslo"));
    assert_eq!(eval_with(&evaluator, "$unknown", &ctx), Value::Null);
}

#[test]
fn test_variables_reach_child_contexts() {
    let evaluator = Evaluator::new();
    let vars: Variables = [("rate", Value::from(2i64))].into_iter().collect();
    let root = EvalContext::new(Value::Null).with_variables(&vars);
    let child = root.child(Value::from(json!({"Qty": 4})));

    assert_eq!(eval_with(&evaluator, "Qty * $rate", &child), Value::from(8i64));
}

// ============================================================================
// Operators
// ============================================================================

#[test]
fn test_arithmetic() {
    assert_eq!(eval("Lines[0].Qty * Lines[0].Price", order()), json!(19));
    assert_eq!(eval("7 / 2", json!(null)), json!(3.5));
    assert_eq!(eval("7 % 3", json!(null)), json!(1));
    assert_eq!(eval("0.1 + 0.2 == 0.3", json!(null)), json!(true));
}

#[test]
fn test_string_concatenation() {
    assert_eq!(eval("Customer.Name + ' #' + Id", order()), json!("Ada #1001"));
    assert_eq!(eval("'n/a' + Missing", order()), json!("n/a"));
}

#[test]
fn test_integer_limits() {
    assert_eq!(
        eval("-9223372036854775808 / -1 == 9223372036854775808", json!(null)),
        json!(true)
    );
    assert_eq!(eval("-9223372036854775808 % -1", json!(null)), json!(0));
    assert_eq!(
        eval("9223372036854775807 + 1 == 9223372036854775808", json!(null)),
        json!(true)
    );
    assert_eq!(
        eval("9223372036854775807 * 2 == 18446744073709551614", json!(null)),
        json!(true)
    );
}

#[test]
fn test_decimal_overflow_is_null() {
    assert_eq!(eval("79228162514264337593543950335 + 1", json!(null)), json!(null));
    assert_eq!(
        eval("79228162514264337593543950335 * 79228162514264337593543950335", json!(null)),
        json!(null)
    );
}

#[test]
fn test_non_numeric_arithmetic_is_null() {
    assert_eq!(eval("'abc' * 2", json!(null)), json!(null));
    assert_eq!(eval("1 / 0", json!(null)), json!(null));
}

#[test]
fn test_comparisons_coerce() {
    assert_eq!(eval("Id == '1001'", order()), json!(true));
    assert_eq!(eval("'2024-03-01' > '2024-02-28'", json!(null)), json!(true));
    assert_eq!(eval("'apple' < 'banana'", json!(null)), json!(true));
    assert_eq!(eval("Missing == ''", order()), json!(true));
}

#[test]
fn test_logical_operators() {
    assert_eq!(eval("Id > 1000 and Region == 'West'", order()), json!(true));
    assert_eq!(eval("Id < 1000 || Region == 'West'", order()), json!(true));
    assert_eq!(eval("Id < 1000 AND Region == 'West'", order()), json!(false));
}

#[test]
fn test_logical_operators_short_circuit() {
    // The right side would fail to resolve
    assert_eq!(eval("false && nosuchfunction()", json!(null)), json!(false));
    assert_eq!(eval("true || nosuchfunction()", json!(null)), json!(true));
}

#[test]
fn test_tertiary() {
    assert_eq!(eval("Customer.Age >= 18 ? 'adult' : 'minor'", order()), json!("adult"));
    assert_eq!(
        eval("Id < 10 ? 'small' : Id < 5000 ? 'medium' : 'large'", order()),
        json!("medium")
    );
}

#[test]
fn test_evaluate_to_bool() {
    let evaluator = Evaluator::new();
    let ctx = EvalContext::new(Value::from(order()));

    let expr = evaluator.compile("Lines[Qty > 4]").unwrap();
    assert!(evaluator.evaluate_to_bool(&expr, &ctx).unwrap());

    let expr = evaluator.compile("Lines[Qty > 5]").unwrap();
    assert!(!evaluator.evaluate_to_bool(&expr, &ctx).unwrap());
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_unknown_function_fails_at_evaluation() {
    let evaluator = Evaluator::new();
    let expr = evaluator.compile("frobnicate(1)").unwrap();
    let err = evaluator
        .evaluate(&expr, &EvalContext::new(Value::Null))
        .unwrap_err();
    assert!(err.is_syntax());
    assert!(err.to_string().contains("frobnicate"));
}

#[test]
fn test_required_raises_user_error() {
    let evaluator = Evaluator::new();
    let expr = evaluator
        .compile("required(Customer.Email, 'Email is missing', 'E042')")
        .unwrap();
    let err = evaluator
        .evaluate(&expr, &EvalContext::new(Value::from(order())))
        .unwrap_err();

    assert!(err.is_user());
    let reshape_lang::Error::User(user) = err else {
        panic!("expected a user error");
    };
    assert_eq!(user.message, "Email is missing");
    assert_eq!(user.code.as_deref(), Some("E042"));
}

#[test]
fn test_error_functions_read_the_handled_error() {
    let evaluator = Evaluator::new();
    let error = UserError::new("Email is missing", Some("E042".to_string()));
    let ctx = EvalContext::new(Value::Null).with_user_error(&error);

    assert_eq!(
        eval_with(&evaluator, "errorcode() + ': ' + errormessage()", &ctx),
        Value::from("E042: Email is missing")
    );
    assert_eq!(
        eval_with(&evaluator, "errormessage()", &EvalContext::new(Value::Null)),
        Value::Null
    );
}

// ============================================================================
// Context Functions
// ============================================================================

#[test]
fn test_position_and_name() {
    let evaluator = Evaluator::new();
    let ctx = EvalContext::new(Value::from("x")).with_position(3).with_name("Sku");

    assert_eq!(eval_with(&evaluator, "position()", &ctx), Value::from(3i64));
    assert_eq!(eval_with(&evaluator, "name()", &ctx), Value::from("Sku"));
}

#[test]
fn test_position_inside_predicates() {
    assert_eq!(eval("Lines[position() > 1].Sku", order()), json!(["B-7", "C-3"]));
}

#[test]
fn test_current_group() {
    let evaluator = Evaluator::new();
    let group = vec![Value::from(1i64), Value::from(2i64), Value::from(3i64)];
    let ctx = EvalContext::new(Value::Null).with_group(&group);

    assert_eq!(eval_with(&evaluator, "sum(currentgroup())", &ctx), Value::from(6i64));
    assert_eq!(
        eval_with(&evaluator, "currentgroup()", &EvalContext::new(Value::Null)),
        Value::Null
    );
}

#[test]
fn test_document_resolver() {
    let evaluator = Evaluator::new();
    let mut repository = HashMap::new();
    repository.insert("rates", Value::from(json!({"EUR": 1.1})));

    let resolver = |repo: &str, name: &str| -> Result<Option<Value>, String> {
        match repo {
            "lookups" => Ok(repository.get(name).cloned()),
            _ => Err(format!("no repository '{}'", repo)),
        }
    };
    let ctx = EvalContext::new(Value::from(json!({"Doc": "rates"}))).with_documents(&resolver);

    assert_eq!(
        eval_with(&evaluator, "document(lookups, Doc).EUR", &ctx),
        Value::from_f64(1.1)
    );
    assert_eq!(eval_with(&evaluator, "document(lookups, 'other')", &ctx), Value::Null);
    assert_eq!(eval_with(&evaluator, "document(archive, Doc)", &ctx), Value::Null);
    assert_eq!(
        eval_with(&evaluator, "document(lookups, Doc)", &EvalContext::new(Value::Null)),
        Value::Null
    );
}

// ============================================================================
// Extensions
// ============================================================================

struct Shop;

impl FunctionContainer for Shop {
    fn functions(&self) -> Vec<FunctionEntry> {
        vec![
            FunctionEntry::new("vat", Arity::Fixed(1), |args, _| {
                let net = args[0].as_decimal().unwrap_or_default();
                Ok(Value::from_decimal(net * rust_decimal::Decimal::new(125, 2)))
            }),
            // Shadows the built-in one-argument `trim`
            FunctionEntry::new("trim", Arity::Fixed(1), |_, _| Ok(Value::from("shadowed"))),
            FunctionEntry::new("field", Arity::Fixed(1), |args, _| Ok(args[0].clone()))
                .with_literal_params(&[0]),
        ]
    }
}

#[test]
fn test_host_functions() {
    let evaluator = Evaluator::builder().with_container(Shop).build();
    let ctx = EvalContext::new(Value::from(json!({"Net": 100})));

    assert_eq!(eval_with(&evaluator, "vat(Net)", &ctx), Value::from(125i64));
    assert_eq!(eval_with(&evaluator, "_VAT(Net)", &ctx), Value::from(125i64));
}

#[test]
fn test_later_registration_shadows_builtins() {
    let evaluator = Evaluator::builder().with_container(Shop).build();
    let ctx = EvalContext::new(Value::Null);

    assert_eq!(eval_with(&evaluator, "trim(' x ')", &ctx), Value::from("shadowed"));
    // Other built-ins stay reachable
    assert_eq!(eval_with(&evaluator, "uppercase('x')", &ctx), Value::from("X"));
}

#[test]
fn test_literal_parameters_receive_source_text() {
    let evaluator = Evaluator::builder().with_container(Shop).build();
    let ctx = EvalContext::new(Value::from(json!({"Net": 100})));

    assert_eq!(eval_with(&evaluator, "field(Net)", &ctx), Value::from("Net"));
    assert_eq!(eval_with(&evaluator, "field(Net > 5)", &ctx), Value::from("(Net > 5)"));
    assert_eq!(eval_with(&evaluator, "field('as is')", &ctx), Value::from("as is"));
}

#[test]
fn test_evaluator_without_builtins() {
    let evaluator = Evaluator::builder().with_builtins(false).build();
    let expr = evaluator.compile("count(Items)").unwrap();
    assert!(evaluator.evaluate(&expr, &EvalContext::new(Value::Null)).is_err());
}

// ============================================================================
// Caching and Sharing
// ============================================================================

#[test]
fn test_compile_cached_shares_tree() {
    let evaluator = Evaluator::new();
    let first = evaluator.compile_cached("Lines.Qty").unwrap();
    let second = evaluator.compile_cached("Lines.Qty").unwrap();

    assert!(first.ptr_eq(&second));
    assert_eq!(first.source(), "Lines.Qty");
}

#[test]
fn test_cache_disabled() {
    let evaluator = Evaluator::builder().with_cache(false).build();
    let first = evaluator.compile_cached("a").unwrap();
    let second = evaluator.compile_cached("a").unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(first, second);
}

#[test]
fn test_syntax_errors_are_not_cached() {
    let evaluator = Evaluator::new();
    assert!(evaluator.compile_cached("a +").is_err());
    assert!(evaluator.compile_cached("a +").is_err());
}

#[test]
fn test_shared_across_threads() {
    let evaluator = Evaluator::new();
    let expr = evaluator.compile_cached("sum(Lines.Qty) * $factor").unwrap();

    let results: Vec<Value> = std::thread::scope(|scope| {
        let handles: Vec<_> = (1..=4i64)
            .map(|factor| {
                let evaluator = &evaluator;
                let expr = &expr;
                scope.spawn(move || {
                    let vars: Variables = [("factor", Value::from(factor))].into_iter().collect();
                    let ctx = EvalContext::new(Value::from(order())).with_variables(&vars);
                    evaluator.evaluate(expr, &ctx).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(
        results,
        vec![
            Value::from(8i64),
            Value::from(16i64),
            Value::from(24i64),
            Value::from(32i64)
        ]
    );
}
