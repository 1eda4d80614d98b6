//! Parameterization Expander
//!
//! A [`ParameterSet`] is an ordered list of `(input, expected)` rows. Expanding a
//! template over a set yields one independent case per row, in row order, named
//! `<template>[<label>]` for labelled rows and `<template>[<index>]` otherwise.
//! Expansion is pure: the same rows always produce the same names in the same order.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::case::{CaseContext, CaseResult};

/// One row of a parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row<I, E> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub input: I,
    pub expected: E,
}

/// Ordered rows bound to one template.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet<I, E> {
    rows: Vec<Row<I, E>>,
}

impl<I, E> Default for ParameterSet<I, E> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<I, E> ParameterSet<I, E> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<Row<I, E>>) -> Self {
        Self { rows }
    }

    /// Append an unlabelled row; it is identified by its index.
    pub fn row(mut self, input: I, expected: E) -> Self {
        self.rows.push(Row {
            label: None,
            input,
            expected,
        });
        self
    }

    pub fn labelled(mut self, label: impl Into<String>, input: I, expected: E) -> Self {
        self.rows.push(Row {
            label: Some(label.into()),
            input,
            expected,
        });
        self
    }

    pub fn rows(&self) -> &[Row<I, E>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<I, E> ParameterSet<I, E>
where
    I: serde::de::DeserializeOwned,
    E: serde::de::DeserializeOwned,
{
    /// Parse a YAML list of `{ label?, input, expected }` rows.
    pub fn from_yaml_str(source: &str) -> Result<Self, serde_yaml::Error> {
        Ok(Self::from_rows(serde_yaml::from_str(source)?))
    }

    /// Parse a JSON array of `{ label?, input, expected }` rows.
    pub fn from_json_str(source: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::from_rows(serde_json::from_str(source)?))
    }
}

/// Identifier suffix of row `index`.
pub fn discriminator<I, E>(index: usize, row: &Row<I, E>) -> String {
    match &row.label {
        Some(label) => label.clone(),
        None => index.to_string(),
    }
}

// ============================================================================
// EXPANSION
// ============================================================================

/// A template body: fixture, context, then the row's input and expected output.
pub type Template<C, I, E> = Arc<dyn Fn(&mut C, &mut CaseContext, &I, &E) -> CaseResult + Send + Sync>;

/// A row-bound body, awaiting only its fixture and context.
pub type ExpandedBody<C> = Arc<dyn Fn(&mut C, &mut CaseContext) -> CaseResult + Send + Sync>;

pub struct Expanded<C> {
    pub name: String,
    pub body: ExpandedBody<C>,
}

/// Expand `template` over `set`: exactly one body per row, in row order.
pub fn expand<C, I, E>(template_name: &str, set: &ParameterSet<I, E>, template: &Template<C, I, E>) -> Vec<Expanded<C>>
where
    C: 'static,
    I: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    set.rows
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let name = format!("{template_name}[{}]", discriminator(index, row));
            let template = Arc::clone(template);
            let (input, expected) = (row.input.clone(), row.expected.clone());
            let body: ExpandedBody<C> =
                Arc::new(move |fixture: &mut C, cx: &mut CaseContext| template(fixture, cx, &input, &expected));
            Expanded { name, body }
        })
        .collect()
}
