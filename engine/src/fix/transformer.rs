//! Record Transformer - interprets a fix against one record
//!
//! ```text
//! Expression ──┬── Call   ── FixMethod / extension function
//!              ├── If     ── predicate ? body : elsif ? body : else
//!              ├── Unless ── !predicate ? body
//!              └── Do     ── list: body once per array element
//! ```
//!
//! Parameters and option values are variable-resolved right before
//! dispatch. The first error aborts the remaining expressions; the record
//! keeps whatever changes were made up to that point.

use tracing::{debug, warn};

use super::conditionals::FixConditional;
use super::context::{is_namespaced, FixContext};
use super::expression::{options_map, Do, Expression, If, Options};
use super::function::{FixFunction, FixPredicate};
use super::methods::FixMethod;
use crate::error::{FixError, FixResult};
use crate::record::Record;
use crate::value::Value;

/// Name of the iterating bind.
pub const LIST_BIND: &str = "list";

pub struct RecordTransformer<'a> {
    context: &'a mut FixContext,
    record: Record,
}

impl<'a> RecordTransformer<'a> {
    pub fn new(context: &'a mut FixContext, record: Record) -> Self {
        Self { context, record }
    }

    /// Run `expressions` in order against the current record.
    pub fn process(&mut self, expressions: &[Expression]) -> FixResult<()> {
        for expression in expressions {
            self.process_expression(expression)?;
        }
        Ok(())
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    fn process_expression(&mut self, expression: &Expression) -> FixResult<()> {
        match expression {
            Expression::Call(call) => self.call(&call.name, &call.params, &call.options),
            Expression::Do(bind) => self.bind(bind),
            Expression::If(conditional) => self.conditional(conditional),
            Expression::Unless(conditional) => {
                if !self.test(&conditional.name, &conditional.params, &conditional.options)? {
                    self.process(&conditional.elements)?;
                }
                Ok(())
            }
        }
    }

    // =========================================================================
    // Dispatch
    // =========================================================================

    fn call(&mut self, name: &str, params: &[String], options: &[(String, String)]) -> FixResult<()> {
        let params = self.resolve_params(params);
        let options = self.resolve_options(options);
        debug!(function = %name, params = ?params, "Applying function");

        if is_namespaced(name) {
            let function = self.context.function(name)?;
            function.apply(&mut *self.context, &mut self.record, &params, &options)
        } else {
            let method: FixMethod = name.parse()?;
            method.apply(&mut *self.context, &mut self.record, &params, &options)
        }
    }

    fn test(&self, name: &str, params: &[String], options: &[(String, String)]) -> FixResult<bool> {
        let params = self.resolve_params(params);
        let options = self.resolve_options(options);

        let result = if is_namespaced(name) {
            let predicate = self.context.predicate(name)?;
            predicate.test(&*self.context, &self.record, &params, &options)?
        } else {
            let conditional: FixConditional = name.parse()?;
            conditional.test(&*self.context, &self.record, &params, &options)?
        };
        debug!(predicate = %name, params = ?params, result, "Tested predicate");
        Ok(result)
    }

    fn resolve_params(&self, params: &[String]) -> Vec<String> {
        params
            .iter()
            .map(|param| self.context.resolve_vars(param))
            .collect()
    }

    fn resolve_options(&self, options: &[(String, String)]) -> Options {
        options_map(options)
            .into_iter()
            .map(|(key, value)| {
                let value = self.context.resolve_vars(&value);
                (key, value)
            })
            .collect()
    }

    // =========================================================================
    // Control flow
    // =========================================================================

    fn conditional(&mut self, node: &If) -> FixResult<()> {
        if self.test(&node.name, &node.params, &node.options)? {
            return self.process(&node.elements);
        }
        if let Some(elsif) = &node.elsif {
            if self.test(&elsif.name, &elsif.params, &elsif.options)? {
                return self.process(&elsif.elements);
            }
        }
        if let Some(elements) = &node.else_elements {
            self.process(elements)?;
        }
        Ok(())
    }

    fn bind(&mut self, node: &Do) -> FixResult<()> {
        let options = self.resolve_options(&node.options);
        debug!(bind = %node.name, options = ?options, "Entering bind");
        match node.name.as_str() {
            LIST_BIND => self.list(&options, &node.elements),
            other => Err(FixError::UnknownOperation(other.to_string())),
        }
    }

    /// `do list(path, var)`: run `elements` once per element of `path`.
    ///
    /// With `var`, the element is visible as a temporary field of the full
    /// record. Without it, each element must be a hash and becomes the
    /// record while the body runs. When `path` names an array directly the
    /// element is written back to its slot afterwards; elements collected
    /// across arrays or wildcards are iterated as copies.
    fn list(&mut self, options: &Options, elements: &[Expression]) -> FixResult<()> {
        let path = options
            .get("path")
            .ok_or_else(|| FixError::invalid_argument(LIST_BIND, "missing option 'path'"))?;

        let items = match self.record.find(path) {
            None => return Ok(()),
            Some(Value::Array(items)) => items,
            Some(other) => {
                warn!(path = %path, kind = %other.kind(), "Bind path does not address a list");
                return Ok(());
            }
        };
        let in_place = self.record.array_mut(path).is_some();

        for (index, item) in items.into_iter().enumerate() {
            let updated = match options.get("var") {
                Some(var) => {
                    self.record.put(var.clone(), item);
                    let result = self.process(elements);
                    let updated = self.record.take_field(var);
                    result?;
                    updated
                }
                None => {
                    let scope = Record::from(item.into_hash()?);
                    let outer = std::mem::replace(&mut self.record, scope);
                    let result = self.process(elements);
                    let scope = std::mem::replace(&mut self.record, outer);
                    result?;
                    Some(Value::Hash(scope.into_hash()))
                }
            };
            if in_place {
                if let Some(updated) = updated {
                    self.write_back(path, index, updated);
                }
            }
        }
        Ok(())
    }

    /// Store `value` at `index` of the array at `path`, if both still exist.
    fn write_back(&mut self, path: &str, index: usize, value: Value) {
        match self.record.array_mut(path).and_then(|array| array.get_mut(index)) {
            Some(slot) => *slot = value,
            None => debug!(path = %path, index, "List element gone, not written back"),
        }
    }
}
