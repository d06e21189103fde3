//! Variable synchronization
//!
//! `ValueSynch` marks a variable whose samples must be aligned with the other
//! synchronized variables of the expression. The link phase wraps every
//! reference to such a variable in a [`SynchVariable`]. Each pass:
//!
//! 1. every `SynchVariable` ingests its variable's current sample, keyed by
//!    the timestamp truncated to the configured resolution (whole seconds by
//!    default);
//! 2. the common timestamp is the oldest of the instances' newest keys;
//! 3. each instance reports its sample at the common timestamp, or the pass
//!    fails with `SynchronizationUnavailable`;
//! 4. the last instance in sequence order trims every history at or before
//!    the common timestamp.

use crate::config::ExpressionConfig;
use crate::date;
use crate::error::{ExprError, Result};
use crate::functions::{ALIAS, VALUE_SYNCH};
use crate::token::{Token, VarId, Variable, VariableTable};
use crate::value::{TimedValue, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// A variable reference that reports time-aligned samples
#[derive(Debug, Clone)]
pub struct SynchVariable {
    variable: VarId,
    history: BTreeMap<i64, TimedValue>,
    last_observed: Option<i64>,
    resolution: i64,
    limit: usize,
    cap_warned: bool,
}

impl SynchVariable {
    pub fn new(variable: VarId, config: &ExpressionConfig) -> Self {
        Self {
            variable,
            history: BTreeMap::new(),
            last_observed: None,
            resolution: config.synch_resolution_ns.max(1),
            limit: config.history_limit.max(1),
            cap_warned: false,
        }
    }

    pub fn variable(&self) -> VarId {
        self.variable
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    /// Buffer the variable's current sample; each sample is taken once
    pub fn observe(&mut self, variable: &Variable) {
        if !variable.has_been_set() {
            return;
        }
        let sample = variable.value();
        if self.last_observed == Some(sample.timestamp) {
            return;
        }
        self.last_observed = Some(sample.timestamp);
        let key = date::truncate(sample.timestamp, self.resolution);
        self.history.insert(key, sample.clone());

        while self.history.len() > self.limit {
            self.history.pop_first();
            if !self.cap_warned {
                self.cap_warned = true;
                warn!(
                    variable = variable.name(),
                    limit = self.limit,
                    "Synchronization history reached its limit, evicting oldest samples"
                );
            }
        }
    }

    pub fn newest_key(&self) -> Option<i64> {
        self.history.last_key_value().map(|(key, _)| *key)
    }

    /// Sample buffered at `key`, stamped with that key
    pub fn report(&self, key: i64) -> Result<TimedValue> {
        self.history
            .get(&key)
            .map(|tv| TimedValue::new(tv.value.clone(), key))
            .ok_or(ExprError::SynchronizationUnavailable)
    }

    /// Drop every sample keyed at or before `key`
    pub fn trim_through(&mut self, key: i64) {
        match key.checked_add(1) {
            Some(next) => self.history = self.history.split_off(&next),
            None => self.history.clear(),
        }
    }
}

/// Let every `SynchVariable` ingest its variable and compute the common timestamp
///
/// `None` when there are no synchronized variables or one of them has no
/// sample yet.
pub(crate) fn observe_all(tokens: &mut [Token], variables: &VariableTable) -> Option<i64> {
    let mut common: Option<i64> = None;
    let mut any = false;
    let mut complete = true;
    for token in tokens.iter_mut() {
        let Token::Synch(synch) = token else {
            continue;
        };
        any = true;
        if let Some(variable) = variables.get(synch.variable()) {
            synch.observe(variable);
        }
        match synch.newest_key() {
            Some(key) => common = Some(common.map_or(key, |c| c.min(key))),
            None => complete = false,
        }
    }
    (any && complete).then_some(common).flatten()
}

/// Trim every `SynchVariable` history at or before `key`
pub(crate) fn trim_all(tokens: &mut [Token], key: i64) {
    for token in tokens.iter_mut() {
        if let Token::Synch(synch) = token {
            synch.trim_through(key);
        }
    }
}

/// One-time rewrite of Alias and ValueSynch operands
///
/// Returns the index of the last `SynchVariable` after rewriting.
pub(crate) fn link(
    tokens: &mut [Token],
    variables: &VariableTable,
    config: &ExpressionConfig,
) -> Result<Option<usize>> {
    let aliases = alias_targets(tokens, variables)?;
    for (placeholder, target) in aliases {
        for token in tokens.iter_mut() {
            if matches!(token, Token::Variable(id) if *id == placeholder) {
                *token = Token::Variable(target);
            }
        }
        debug!(?placeholder, ?target, "alias linked");
    }

    let synchronized = synch_targets(tokens)?;
    for target in synchronized {
        for token in tokens.iter_mut() {
            if matches!(token, Token::Variable(id) if *id == target) {
                *token = Token::Synch(SynchVariable::new(target, config));
            }
        }
        debug!(?target, "variable synchronized");
    }

    Ok(tokens
        .iter()
        .rposition(|token| matches!(token, Token::Synch(_))))
}

fn is_function(token: &Token, name: &str) -> bool {
    matches!(token, Token::Function(f) if f.name() == name)
}

fn alias_targets(tokens: &[Token], variables: &VariableTable) -> Result<Vec<(VarId, VarId)>> {
    let mut pairs = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !is_function(token, ALIAS) {
            continue;
        }
        let (Some(operand), Some(name)) = (
            i.checked_sub(2).and_then(|j| tokens.get(j)),
            i.checked_sub(1).and_then(|j| tokens.get(j)),
        ) else {
            return Err(ExprError::invalid_link(ALIAS, "missing operands"));
        };
        let target = match operand {
            Token::Variable(id) => *id,
            _ => return Err(ExprError::invalid_link(ALIAS, "first operand must be a variable")),
        };
        let name = match name {
            Token::Constant(TimedValue {
                value: Value::Text(name),
                ..
            }) => name,
            _ => {
                return Err(ExprError::invalid_link(
                    ALIAS,
                    "second operand must be a text constant",
                ))
            },
        };
        if let Some(placeholder) = variables.lookup(name) {
            if placeholder != target {
                pairs.push((placeholder, target));
            }
        }
    }
    Ok(pairs)
}

fn synch_targets(tokens: &[Token]) -> Result<Vec<VarId>> {
    let mut targets = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !is_function(token, VALUE_SYNCH) {
            continue;
        }
        let target = match i.checked_sub(1).and_then(|j| tokens.get(j)) {
            Some(Token::Variable(id)) => *id,
            Some(Token::Synch(synch)) => synch.variable(),
            // `v "name" Alias ValueSynch` synchronizes v
            Some(t) if is_function(t, ALIAS) => {
                match i.checked_sub(3).and_then(|j| tokens.get(j)) {
                    Some(Token::Variable(id)) => *id,
                    Some(Token::Synch(synch)) => synch.variable(),
                    _ => return Err(ExprError::invalid_link(VALUE_SYNCH, "alias has no variable")),
                }
            },
            Some(_) => {
                return Err(ExprError::invalid_link(
                    VALUE_SYNCH,
                    "operand must be a variable",
                ))
            },
            None => return Err(ExprError::invalid_link(VALUE_SYNCH, "missing operand")),
        };
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    Ok(targets)
}
