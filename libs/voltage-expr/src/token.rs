//! Tokens of a compiled postfix sequence and the variable table they share

use crate::functions::Function;
use crate::synch::SynchVariable;
use crate::value::{TimedValue, Value};
use std::borrow::Cow;
use std::collections::HashMap;

/// Index of a variable in its expression's table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) usize);

/// A named, mutable input set by the host once per record
#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    value: TimedValue,
    has_been_set: bool,
}

impl Variable {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            // unset inputs read as NaN, which aggregates skip
            value: TimedValue::constant(Value::Float(f64::NAN)),
            has_been_set: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &TimedValue {
        &self.value
    }

    /// True once the host has assigned a real sample
    pub fn has_been_set(&self) -> bool {
        self.has_been_set
    }
}

/// Variables of one expression, shared by every token that names them
#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    variables: Vec<Variable>,
    index: HashMap<String, VarId>,
}

impl VariableTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `name`, registering it on first use
    pub fn intern(&mut self, name: &str) -> VarId {
        if let Some(id) = self.index.get(name) {
            return *id;
        }
        let id = VarId(self.variables.len());
        self.variables.push(Variable::new(name));
        self.index.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<VarId> {
        self.index.get(name).copied()
    }

    pub fn get(&self, id: VarId) -> Option<&Variable> {
        self.variables.get(id.0)
    }

    pub fn set(&mut self, id: VarId, value: TimedValue) {
        if let Some(variable) = self.variables.get_mut(id.0) {
            variable.value = value;
            variable.has_been_set = true;
        }
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }
}

/// One element of the postfix arena
#[derive(Debug, Clone)]
pub enum Token {
    Constant(TimedValue),
    Variable(VarId),
    /// Variable wrapped by the link phase for time alignment
    Synch(SynchVariable),
    Function(Function),
}

impl Token {
    /// Operands consumed and results produced
    pub fn arity(&self) -> (usize, usize) {
        match self {
            Self::Constant(_) | Self::Variable(_) | Self::Synch(_) => (0, 1),
            Self::Function(f) => f.arity(),
        }
    }

    /// Human-readable name used in logs
    pub fn describe<'a>(&'a self, variables: &'a VariableTable) -> Cow<'a, str> {
        match self {
            Self::Constant(tv) => Cow::Owned(tv.value.to_text()),
            Self::Variable(id) => variables
                .get(*id)
                .map_or(Cow::Borrowed("?"), |v| Cow::Borrowed(v.name())),
            Self::Synch(s) => variables
                .get(s.variable())
                .map_or(Cow::Borrowed("?"), |v| Cow::Owned(format!("synch({})", v.name()))),
            Self::Function(f) => Cow::Borrowed(f.name()),
        }
    }
}
