//! In-memory rule storage.
//!
//! Rules are kept in insertion order; the engine evaluates them in exactly
//! this order and the first match wins. Reads happen on the request path, so
//! the list sits behind a non-poisoning `parking_lot` lock.

use chrono::Utc;
use parking_lot::RwLock;

use crate::error::RuleStoreError;
use crate::models::{NetworkRule, RuleInput};

#[derive(Default)]
pub struct RuleStore {
    rules: RwLock<Vec<NetworkRule>>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule from the given input. The rule is appended, i.e. it has
    /// the lowest precedence among existing matches.
    pub fn create_rule(&self, input: RuleInput) -> Result<NetworkRule, RuleStoreError> {
        if input.name.trim().is_empty() {
            return Err(RuleStoreError::EmptyName);
        }
        let rule = NetworkRule::from_input(input);
        self.rules.write().push(rule.clone());
        Ok(rule)
    }

    /// Update everything but the mode, which is fixed at creation.
    pub fn update_rule(&self, id: &str, input: RuleInput) -> Result<NetworkRule, RuleStoreError> {
        if input.name.trim().is_empty() {
            return Err(RuleStoreError::EmptyName);
        }
        let mut rules = self.rules.write();
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RuleStoreError::NotFound(id.to_string()))?;
        if input.mode != rule.mode {
            return Err(RuleStoreError::ModeImmutable);
        }
        rule.name = input.name;
        rule.is_enabled = input.is_enabled;
        rule.origin = input.origin;
        rule.request_modifications = input.request_modifications;
        rule.response_modifications = input.response_modifications;
        rule.last_modified = Utc::now().timestamp_millis();
        Ok(rule.clone())
    }

    pub fn delete_rule(&self, id: &str) -> Result<(), RuleStoreError> {
        let mut rules = self.rules.write();
        let before = rules.len();
        rules.retain(|r| r.id != id);
        if rules.len() == before {
            return Err(RuleStoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<NetworkRule, RuleStoreError> {
        let mut rules = self.rules.write();
        let rule = rules
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RuleStoreError::NotFound(id.to_string()))?;
        rule.is_enabled = enabled;
        rule.last_modified = Utc::now().timestamp_millis();
        Ok(rule.clone())
    }

    pub fn get_rule(&self, id: &str) -> Option<NetworkRule> {
        self.rules.read().iter().find(|r| r.id == id).cloned()
    }

    /// Snapshot of all rules in precedence order.
    pub fn list_rules(&self) -> Vec<NetworkRule> {
        self.rules.read().clone()
    }

    /// Upsert imported rules by id; new rules keep the incoming order.
    pub fn import_rules(&self, imported: Vec<NetworkRule>) -> usize {
        let mut rules = self.rules.write();
        let mut count = 0;
        for rule in imported {
            count += 1;
            if let Some(existing) = rules.iter_mut().find(|r| r.id == rule.id) {
                *existing = rule;
            } else {
                rules.push(rule);
            }
        }
        count
    }

    pub fn clear(&self) {
        self.rules.write().clear();
    }

    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}
