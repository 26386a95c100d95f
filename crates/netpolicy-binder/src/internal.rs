//! Accessors the runtime uses to fetch built-in globals by name.
//!
//! Required lookups fail with a [`FatalError`]: the runtime assumes these
//! globals exist, so a miss means the base environment is broken. Optional
//! lookups return a default instead.

use std::rc::Rc;

use netpolicy_core::{FatalError, FuncVal, GLOBAL_MODULE_NAME, TableRef, TypeRef, Value};
use netpolicy_registry::HandlerRef;

use crate::context::BindContext;

fn wrong_kind(name: &str, expected: &'static str) -> FatalError {
    FatalError::RequiredGlobalWrongKind {
        name: name.to_string(),
        expected,
    }
}

impl BindContext {
    fn internal_value(&self, name: &str) -> Option<&Value> {
        let id = self.lookup_id(name, GLOBAL_MODULE_NAME, false, false)?;
        self.symbols.get(id).value()
    }

    /// Value of a mandatory global.
    pub fn lookup_required(&self, name: &str) -> Result<Value, FatalError> {
        let id = self
            .lookup_id(name, GLOBAL_MODULE_NAME, false, false)
            .ok_or_else(|| FatalError::RequiredGlobalMissing {
                name: name.to_string(),
            })?;
        self.symbols
            .get(id)
            .value()
            .cloned()
            .ok_or_else(|| wrong_kind(name, "initialized"))
    }

    /// Value of a mandatory global that must also be constant.
    pub fn lookup_required_const(&self, name: &str) -> Result<Value, FatalError> {
        let id = self
            .lookup_id(name, GLOBAL_MODULE_NAME, false, false)
            .ok_or_else(|| FatalError::RequiredGlobalMissing {
                name: name.to_string(),
            })?;
        let ident = self.symbols.get(id);
        if !ident.is_const() {
            return Err(wrong_kind(name, "constant"));
        }
        ident
            .value()
            .cloned()
            .ok_or_else(|| wrong_kind(name, "initialized"))
    }

    /// Value of a global, or `None` when it is unbound.
    pub fn lookup_optional(&self, name: &str) -> Option<Value> {
        self.internal_value(name).cloned()
    }

    /// `0.0` when unbound.
    pub fn lookup_optional_double(&self, name: &str) -> Result<f64, FatalError> {
        match self.internal_value(name) {
            None => Ok(0.0),
            Some(Value::Double(d) | Value::Time(d) | Value::Interval(d)) => Ok(d.into_inner()),
            Some(_) => Err(wrong_kind(name, "double")),
        }
    }

    /// `0` when unbound.
    pub fn lookup_optional_int(&self, name: &str) -> Result<i64, FatalError> {
        match self.internal_value(name) {
            None => Ok(0),
            Some(Value::Int(i)) => Ok(*i),
            Some(Value::Enum { value, .. }) => Ok(*value),
            Some(_) => Err(wrong_kind(name, "int")),
        }
    }

    /// `0` when unbound.
    pub fn lookup_optional_count(&self, name: &str) -> Result<u64, FatalError> {
        match self.internal_value(name) {
            None => Ok(0),
            Some(v) => v.as_count().map_err(|_| wrong_kind(name, "count")),
        }
    }

    pub fn lookup_optional_string(&self, name: &str) -> Result<Option<Rc<str>>, FatalError> {
        match self.internal_value(name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(_) => Err(wrong_kind(name, "string")),
        }
    }

    pub fn lookup_optional_table(&self, name: &str) -> Result<Option<TableRef>, FatalError> {
        match self.internal_value(name) {
            None => Ok(None),
            Some(Value::Table(t)) => Ok(Some(t.clone())),
            Some(_) => Err(wrong_kind(name, "table")),
        }
    }

    /// Members of a mandatory set (its keys) or vector (its elements).
    pub fn lookup_list(&self, name: &str) -> Result<Vec<Value>, FatalError> {
        match self.lookup_required(name)? {
            Value::Table(t) => Ok(t.borrow().to_pure_list()),
            Value::Vector(v) => Ok(v.borrow().iter().cloned().collect()),
            _ => Err(wrong_kind(name, "set or vector")),
        }
    }

    /// A mandatory function value.
    pub fn lookup_func(&self, name: &str) -> Result<Rc<FuncVal>, FatalError> {
        match self.lookup_required(name)? {
            Value::Func(f) => Ok(f),
            _ => Err(wrong_kind(name, "function")),
        }
    }

    /// A mandatory named type.
    pub fn lookup_type(&self, name: &str) -> Result<TypeRef, FatalError> {
        self.lookup_id(name, GLOBAL_MODULE_NAME, false, false)
            .filter(|id| self.symbols.get(*id).is_type())
            .and_then(|id| self.symbols.get(id).ty().cloned())
            .ok_or_else(|| FatalError::RequiredTypeMissing {
                name: name.to_string(),
            })
    }

    /// The registry entry for an event, created on first use and marked
    /// as raised.
    pub fn lookup_handler(&mut self, name: &str) -> HandlerRef {
        let handler = self.handlers.register(name);
        handler.set_used();
        handler
    }
}
