//! Fix interpretation: expression tree, capabilities and the interpreter.

pub mod conditionals;
pub mod context;
pub mod expression;
pub mod function;
pub mod methods;
pub mod transformer;

pub use conditionals::FixConditional;
pub use context::{is_namespaced, FixContext, NAMESPACE_SEPARATOR};
pub use expression::{options_map, Call, Do, ElsIf, Expression, If, Options, Unless};
pub use function::{FixFunction, FixPredicate};
pub use methods::FixMethod;
pub use transformer::RecordTransformer;

/// Whether `name` resolves to a function, built-in or registered.
pub fn resolves_function(context: &FixContext, name: &str) -> bool {
    if is_namespaced(name) {
        context.has_function(name)
    } else {
        FixMethod::from_name(name).is_some()
    }
}

/// Whether `name` resolves to a predicate, built-in or registered.
pub fn resolves_predicate(context: &FixContext, name: &str) -> bool {
    if is_namespaced(name) {
        context.has_predicate(name)
    } else {
        FixConditional::from_name(name).is_some()
    }
}

/// Names in `fix` that resolve to no operation, in order of appearance.
pub fn unresolved_names(context: &FixContext, fix: &[Expression]) -> Vec<String> {
    let mut unresolved = Vec::new();
    let mut report = |name: &str, resolves: bool| {
        if !resolves && !unresolved.iter().any(|n| n == name) {
            unresolved.push(name.to_string());
        }
    };

    for root in fix {
        root.walk(&mut |expression| match expression {
            Expression::Call(call) => report(&call.name, resolves_function(context, &call.name)),
            Expression::Do(bind) => report(&bind.name, bind.name == transformer::LIST_BIND),
            Expression::Unless(node) => report(&node.name, resolves_predicate(context, &node.name)),
            Expression::If(node) => {
                report(&node.name, resolves_predicate(context, &node.name));
                if let Some(elsif) = &node.elsif {
                    report(&elsif.name, resolves_predicate(context, &elsif.name));
                }
            }
        });
    }
    unresolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unresolved_names() {
        let fix = vec![
            Expression::call("upcase", &["a"]),
            If::new("exists", &["a"], vec![Expression::call("shout", &["a"])])
                .with_elsif("is_blue", &["a"], vec![])
                .into(),
            Do::new("forever", vec![Expression::call("shout", &[])]).into(),
            Expression::call("org.example.Missing", &[]),
        ];
        assert_eq!(
            unresolved_names(&FixContext::new(), &fix),
            vec!["is_blue", "shout", "forever", "org.example.Missing"]
        );
    }
}
