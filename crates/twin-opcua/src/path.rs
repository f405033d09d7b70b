// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Relative browse paths.
//!
//! A [`BrowsePath`] is a list of elements, each naming a target browse name
//! and the references to follow to reach it.
//!
//! # Element grammar
//!
//! ```text
//! element    := qualifier* target
//! qualifier  := '/'                  hierarchical references (with subtypes)
//!             | '.'                  aggregates (with subtypes)
//!             | '<' flags ref '>'    named reference type
//!             | '!'                  inverse direction
//!             | '#'                  exclude subtypes
//! flags      := ('!' | '#')*
//! target     := [ uri '#' | index ':' ] name
//! ```
//!
//! An element without `/`, `.` or `<..>` follows any reference. `&` escapes
//! the next character of a name.
//!
//! ```text
//! /Objects/Boiler/.Temperature
//! <HasComponent>2:Drum
//! <!#Organizes>Objects
//! urn:plant#Boiler
//! ```

use std::collections::BTreeSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::address::{looks_like_uri, AddressFormat, NamespaceRef, NamespaceTable, NodeAddress};
use crate::error::{AddressError, OpcUaResult};
use crate::types::{well_known, NodeId, NodeIdentifier, QualifiedName};

const ESCAPED: &[char] = &['&', '<', '>', '/', '.', '!', '#', ':'];

// =============================================================================
// TargetName
// =============================================================================

/// Browse name to match at a path step.
///
/// A name without namespace matches a node in any namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetName {
    /// Namespace of the name, if qualified.
    pub namespace: Option<NamespaceRef>,
    /// Name.
    pub name: String,
}

impl TargetName {
    /// Creates an unqualified name.
    pub fn any(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    /// Parses `uri#name`, `N:name` or `name`.
    pub fn parse(text: &str, table: &NamespaceTable) -> Self {
        if let Some(pos) = find_unescaped(text, '#') {
            let uri = &text[..pos];
            if looks_like_uri(uri) {
                let namespace = match table.index_of(uri) {
                    Some(index) => table.namespace_ref(index),
                    None => NamespaceRef::Uri(uri.to_string()),
                };
                return Self {
                    namespace: Some(namespace),
                    name: unescape(&text[pos + 1..]),
                };
            }
        }

        if let Some(pos) = find_unescaped(text, ':') {
            if let Ok(index) = text[..pos].parse::<u16>() {
                return Self {
                    namespace: Some(table.namespace_ref(index)),
                    name: unescape(&text[pos + 1..]),
                };
            }
        }

        Self::any(unescape(text))
    }

    /// Renders the name in the form accepted by [`TargetName::parse`].
    pub fn render(&self, table: &NamespaceTable) -> String {
        let name = escape(&self.name);
        match &self.namespace {
            None => name,
            Some(namespace) if namespace.is_standard() => name,
            Some(NamespaceRef::Uri(uri)) => format!("{}#{}", uri, name),
            Some(NamespaceRef::Index(index)) => match table.uri(*index) {
                Some(uri) => format!("{}#{}", uri, name),
                None => format!("{}:{}", index, name),
            },
        }
    }

    /// Returns `true` if `browse_name` satisfies this name.
    pub fn matches(&self, browse_name: &QualifiedName, table: &NamespaceTable) -> bool {
        if browse_name.name != self.name {
            return false;
        }
        match &self.namespace {
            None => true,
            Some(namespace) => table.resolve(namespace) == Some(browse_name.namespace_index),
        }
    }
}

impl fmt::Display for TargetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&NamespaceTable::new()))
    }
}

// =============================================================================
// PathElement
// =============================================================================

/// One step of a browse path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathElement {
    /// Reference type to follow.
    pub reference_type: NodeAddress,
    /// Follow inverse references.
    pub inverse: bool,
    /// Include subtypes of the reference type.
    pub include_subtypes: bool,
    /// Browse name of the target.
    pub target: TargetName,
}

impl PathElement {
    /// Creates a hierarchical forward step to `name` in any namespace.
    pub fn child(name: impl Into<String>) -> Self {
        Self {
            reference_type: standard(well_known::HIERARCHICAL_REFERENCES),
            inverse: false,
            include_subtypes: true,
            target: TargetName::any(name),
        }
    }

    /// Parses one element.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidAddress`] if qualifiers conflict, the
    /// reference type is unterminated or unknown, or the target is empty.
    pub fn parse(text: &str, table: &NamespaceTable) -> OpcUaResult<Self> {
        let mut reference_type: Option<NodeAddress> = None;
        let mut inverse = false;
        let mut include_subtypes = true;

        let mut rest = text;
        loop {
            let Some(c) = rest.chars().next() else {
                break;
            };
            match c {
                '!' => inverse = true,
                '#' => include_subtypes = false,
                '/' | '.' | '<' if reference_type.is_some() => {
                    return Err(AddressError::invalid(text, "Reference type already set").into());
                }
                '/' => reference_type = Some(standard(well_known::HIERARCHICAL_REFERENCES)),
                '.' => reference_type = Some(standard(well_known::AGGREGATES)),
                '<' => {
                    let inner = &rest[1..];
                    let mut flags = 0;
                    for flag in inner.chars() {
                        match flag {
                            '!' => inverse = true,
                            '#' => include_subtypes = false,
                            _ => break,
                        }
                        flags += 1;
                    }
                    let inner = &inner[flags..];
                    let end = find_unescaped(inner, '>').ok_or_else(|| {
                        AddressError::invalid(text, "Reference type starts with '<' but does not end with '>'")
                    })?;
                    let reference = unescape(&inner[..end]);
                    reference_type = Some(resolve_reference_type(&reference, table).map_err(
                        |_| AddressError::invalid(text, format!("Unknown reference type '{}'", reference)),
                    )?);
                    rest = &inner[end + 1..];
                    continue;
                }
                _ => break,
            }
            rest = &rest[c.len_utf8()..];
        }

        if rest.is_empty() {
            return Err(AddressError::invalid(text, "Target name is empty").into());
        }

        Ok(Self {
            reference_type: reference_type.unwrap_or_else(|| standard(well_known::REFERENCES)),
            inverse,
            include_subtypes,
            target: TargetName::parse(rest, table),
        })
    }

    /// Renders the element in the form accepted by [`PathElement::parse`].
    pub fn render(&self, table: &NamespaceTable) -> String {
        let mut out = String::new();
        let reference = self.standard_reference();

        let named = match reference {
            Some(33) => {
                out.push('/');
                false
            }
            Some(44) => {
                out.push('.');
                false
            }
            Some(31) => false,
            _ => {
                out.push('<');
                true
            }
        };
        if self.inverse {
            out.push('!');
        }
        if !self.include_subtypes {
            out.push('#');
        }
        if named {
            let name = reference
                .and_then(well_known::reference_type_name)
                .map(str::to_string)
                .unwrap_or_else(|| self.reference_type.render(table, AddressFormat::Expanded));
            out.push_str(&name.replace('&', "&&").replace('>', "&>"));
            out.push('>');
        }

        out.push_str(&self.target.render(table));
        out
    }

    /// Resolves the reference type against a session's namespace table.
    pub fn reference_type_id(&self, table: &NamespaceTable) -> OpcUaResult<NodeId> {
        self.reference_type.to_node_id(table)
    }

    fn standard_reference(&self) -> Option<u32> {
        match (&self.reference_type.identifier, self.reference_type.is_standard()) {
            (NodeIdentifier::Numeric(id), true) => Some(*id),
            _ => None,
        }
    }
}

// =============================================================================
// BrowsePath
// =============================================================================

/// Ordered list of path elements.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct BrowsePath {
    /// Elements in traversal order.
    pub elements: Vec<PathElement>,
}

impl BrowsePath {
    /// Parses path elements. Empty elements are skipped.
    pub fn parse<S: AsRef<str>>(elements: &[S], table: &NamespaceTable) -> OpcUaResult<Self> {
        let elements = elements
            .iter()
            .map(AsRef::as_ref)
            .filter(|e| !e.is_empty())
            .map(|e| PathElement::parse(e, table))
            .collect::<OpcUaResult<Vec<_>>>()?;
        Ok(Self { elements })
    }

    /// Renders each element.
    pub fn render(&self, table: &NamespaceTable) -> Vec<String> {
        self.elements.iter().map(|e| e.render(table)).collect()
    }

    /// Returns `true` if the path has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    fn describe(&self, steps: usize, table: &NamespaceTable) -> String {
        self.elements[..steps.min(self.elements.len())]
            .iter()
            .map(|e| e.render(table))
            .collect::<Vec<_>>()
            .join("")
    }
}

// =============================================================================
// Resolution
// =============================================================================

/// One reference returned by a single-level lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildReference {
    /// Target node.
    pub node_id: NodeId,
    /// Browse name of the target.
    pub browse_name: QualifiedName,
}

/// Parameters of a single-level lookup.
#[derive(Debug, Clone, Copy)]
pub struct LookupRequest<'a> {
    /// Node to browse from.
    pub node_id: &'a NodeId,
    /// Reference type to follow.
    pub reference_type_id: &'a NodeId,
    /// Include subtypes of the reference type.
    pub include_subtypes: bool,
    /// Follow inverse references.
    pub inverse: bool,
}

/// Single-level browse used to resolve paths.
#[async_trait]
pub trait ReferenceLookup: Send + Sync {
    /// Returns every target reachable through one matching reference.
    async fn children(&self, request: LookupRequest<'_>) -> OpcUaResult<Vec<ChildReference>>;
}

/// Resolves `path` from `start` to exactly one node.
///
/// # Errors
///
/// - [`AddressError::NoMatch`] if a step matches no node
/// - [`AddressError::Ambiguous`] if a step matches more than one node
/// - lookup errors are propagated unchanged
pub async fn resolve_browse_path<L>(
    start: &NodeId,
    path: &BrowsePath,
    lookup: &L,
    table: &NamespaceTable,
) -> OpcUaResult<NodeId>
where
    L: ReferenceLookup + ?Sized,
{
    let mut current = start.clone();

    for (step, element) in path.elements.iter().enumerate() {
        let mut matches = step_targets(&current, element, lookup, table).await?;
        let described = || path.describe(step + 1, table);

        match matches.len() {
            0 => return Err(AddressError::no_match(described()).into()),
            1 => {
                if let Some(next) = matches.pop_first() {
                    debug!(step = step, node_id = %next, "Browse path step resolved");
                    current = next;
                }
            }
            count => return Err(AddressError::ambiguous(described(), count).into()),
        }
    }

    Ok(current)
}

/// Resolves `path` from `start`, following every match at every step.
///
/// Returns all nodes reached by the complete path (possibly none).
pub async fn collect_path_targets<L>(
    start: &NodeId,
    path: &BrowsePath,
    lookup: &L,
    table: &NamespaceTable,
) -> OpcUaResult<Vec<NodeId>>
where
    L: ReferenceLookup + ?Sized,
{
    let mut frontier = BTreeSet::from([start.clone()]);

    for element in &path.elements {
        let mut next = BTreeSet::new();
        for node in &frontier {
            next.extend(step_targets(node, element, lookup, table).await?);
        }
        if next.is_empty() {
            return Ok(Vec::new());
        }
        frontier = next;
    }

    Ok(frontier.into_iter().collect())
}

async fn step_targets<L>(
    node: &NodeId,
    element: &PathElement,
    lookup: &L,
    table: &NamespaceTable,
) -> OpcUaResult<BTreeSet<NodeId>>
where
    L: ReferenceLookup + ?Sized,
{
    let reference_type_id = element.reference_type_id(table)?;
    let children = lookup
        .children(LookupRequest {
            node_id: node,
            reference_type_id: &reference_type_id,
            include_subtypes: element.include_subtypes,
            inverse: element.inverse,
        })
        .await?;

    Ok(children
        .into_iter()
        .filter(|child| element.target.matches(&child.browse_name, table))
        .map(|child| child.node_id)
        .collect())
}

// =============================================================================
// Helpers
// =============================================================================

fn standard(node_id: NodeId) -> NodeAddress {
    NodeAddress::standard(node_id.identifier)
}

fn resolve_reference_type(text: &str, table: &NamespaceTable) -> OpcUaResult<NodeAddress> {
    match well_known::reference_type_id(text) {
        Some(id) => Ok(NodeAddress::standard(NodeIdentifier::Numeric(id))),
        None => NodeAddress::parse(text, table),
    }
}

fn find_unescaped(text: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (pos, c) in text.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '&' {
            escaped = true;
        } else if c == needle {
            return Some(pos);
        }
    }
    None
}

fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c == '&' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if ESCAPED.contains(&c) {
            out.push('&');
        }
        out.push(c);
    }
    out
}

impl fmt::Display for BrowsePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = NamespaceTable::new();
        for element in &self.elements {
            f.write_str(&element.render(&table))?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
