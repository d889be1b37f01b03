// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event operator trees: the boolean expressions attached to a job class's
//! `start_on`/`stop_on` that match against incoming events.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Matches a single event by name and, optionally, by positional argument
/// and environment variable glob patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMatcher {
    pub name: String,
    /// Positional argument patterns; `None` entries match anything.
    #[serde(default)]
    pub args: Vec<Option<String>>,
    /// `KEY=glob-pattern` environment matches.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl EventMatcher {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, pattern: impl Into<String>) -> Self {
        self.args.push(Some(pattern.into()));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.env.insert(key.into(), pattern.into());
        self
    }

    /// Whether this matcher matches the given event name, positional
    /// arguments, and environment. Glob wildcards (`*`, `?`, `[...]`) are
    /// honored in both `args` and `env` patterns.
    pub fn matches(&self, name: &str, args: &[String], env: &HashMap<String, String>) -> bool {
        if self.name != name {
            return false;
        }
        for (i, pattern) in self.args.iter().enumerate() {
            let Some(pattern) = pattern else { continue };
            match args.get(i) {
                Some(value) if glob_match(pattern, value) => {}
                _ => return false,
            }
        }
        for (key, pattern) in &self.env {
            match env.get(key) {
                Some(value) if glob_match(pattern, value) => {}
                _ => return false,
            }
        }
        true
    }
}

fn glob_match(pattern: &str, value: &str) -> bool {
    glob::Pattern::new(pattern)
        .map(|p| p.matches(value))
        .unwrap_or(pattern == value)
}

/// A node in the boolean operator tree: a leaf event matcher, or an `and`/
/// `or` combination of subtrees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperatorNode {
    Event(EventMatcher),
    And(Vec<OperatorNode>),
    Or(Vec<OperatorNode>),
}

impl OperatorNode {
    /// Collect the distinct event names referenced anywhere in this subtree,
    /// used by the Event Queue to decide which jobs to even consider for a
    /// given incoming event.
    pub fn referenced_events<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            OperatorNode::Event(matcher) => out.push(matcher.name.as_str()),
            OperatorNode::And(children) | OperatorNode::Or(children) => {
                for child in children {
                    child.referenced_events(out);
                }
            }
        }
    }
}

/// Progress of one leaf matcher within a tree evaluation: whether it has
/// been satisfied by an event seen so far in the current "blocking" pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorState {
    /// Indices (in tree-walk order) of leaves already satisfied.
    pub satisfied_leaves: Vec<usize>,
}

/// The full expression attached to a job class, plus the transient state
/// tracking which leaves have already fired for the instance currently
/// being evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorTree {
    pub root: OperatorNode,
    #[serde(default)]
    pub state: OperatorState,
}

impl OperatorTree {
    pub fn new(root: OperatorNode) -> Self {
        Self {
            root,
            state: OperatorState::default(),
        }
    }

    pub fn referenced_events(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.referenced_events(&mut out);
        out
    }

    /// Feed one event into the tree, marking any leaf it satisfies. Returns
    /// whether the whole tree is now satisfied.
    pub fn feed(&mut self, name: &str, args: &[String], env: &HashMap<String, String>) -> bool {
        let mut index = 0usize;
        feed_node(&mut self.root, name, args, env, &mut index, &mut self.state);
        evaluate(&self.root, &mut 0, &self.state)
    }

    /// Whether the tree is satisfied given the leaves marked so far, without
    /// feeding a new event.
    pub fn is_satisfied(&self) -> bool {
        evaluate(&self.root, &mut 0, &self.state)
    }

    /// Clear all recorded progress, e.g. after the blocked job starts or the
    /// blocking window otherwise resets.
    pub fn reset(&mut self) {
        self.state.satisfied_leaves.clear();
    }
}

fn feed_node(
    node: &OperatorNode,
    name: &str,
    args: &[String],
    env: &HashMap<String, String>,
    index: &mut usize,
    state: &mut OperatorState,
) {
    match node {
        OperatorNode::Event(matcher) => {
            let leaf_index = *index;
            *index += 1;
            if matcher.matches(name, args, env) && !state.satisfied_leaves.contains(&leaf_index) {
                state.satisfied_leaves.push(leaf_index);
            }
        }
        OperatorNode::And(children) | OperatorNode::Or(children) => {
            for child in children {
                feed_node(child, name, args, env, index, state);
            }
        }
    }
}

fn evaluate(node: &OperatorNode, index: &mut usize, state: &OperatorState) -> bool {
    match node {
        OperatorNode::Event(_) => {
            let leaf_index = *index;
            *index += 1;
            state.satisfied_leaves.contains(&leaf_index)
        }
        OperatorNode::And(children) => {
            let mut all = true;
            for child in children {
                if !evaluate(child, index, state) {
                    all = false;
                }
            }
            all
        }
        OperatorNode::Or(children) => {
            let mut any = false;
            for child in children {
                if evaluate(child, index, state) {
                    any = true;
                }
            }
            any
        }
    }
}

#[cfg(test)]
#[path = "operator_tests.rs"]
mod tests;
