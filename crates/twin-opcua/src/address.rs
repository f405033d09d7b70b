// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Portable node addresses.
//!
//! A [`NodeAddress`] identifies a node independently of the session it was
//! obtained from: whenever the namespace URI is known the address carries the
//! URI instead of the session-local namespace index.
//!
//! # Textual forms
//!
//! ```text
//! ns=2;s=Boiler.Temperature          numeric-namespace form
//! nsu=urn:plant;i=1001               namespace-URI form
//! urn:plant#s=Boiler%20Temperature   URI-expanded form (string ids percent-encoded)
//! urn:plant#i=1001&srv=urn:server    URI-expanded form with server URI
//! i=85                               standard namespace (ns=0)
//! Double                             built-in data type name (ns=0)
//! ```
//!
//! Rendering prefers the URI-expanded form. The numeric form is only used
//! when no URI is known for the namespace index, or when asked for.
//!
//! # Examples
//!
//! ```
//! use twin_opcua::address::{AddressFormat, NamespaceTable, NodeAddress};
//!
//! let table = NamespaceTable::from_uris(["http://opcfoundation.org/UA/", "urn:plant"]);
//!
//! let address = NodeAddress::parse("ns=1;s=Boiler", &table).unwrap();
//! assert_eq!(address.render(&table, AddressFormat::Expanded), "urn:plant#s=Boiler");
//! assert_eq!(address.render(&table, AddressFormat::Numeric), "ns=1;s=Boiler");
//! assert_eq!(NodeAddress::parse("urn:plant#s=Boiler", &table).unwrap(), address);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{AddressError, OpcUaResult};
use crate::types::{well_known, NodeId, NodeIdentifier};

/// URI of the OPC UA standard namespace (index 0).
pub const OPC_UA_NAMESPACE: &str = "http://opcfoundation.org/UA/";

// =============================================================================
// NamespaceTable
// =============================================================================

/// Ordered namespace URIs of a session.
///
/// Index 0 is always the OPC UA standard namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceTable {
    uris: Vec<String>,
}

impl NamespaceTable {
    /// Creates a table holding only the standard namespace.
    pub fn new() -> Self {
        Self {
            uris: vec![OPC_UA_NAMESPACE.to_string()],
        }
    }

    /// Creates a table from the server's namespace array.
    ///
    /// The standard namespace is inserted at index 0 if the array lacks it.
    pub fn from_uris<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut uris: Vec<String> = uris.into_iter().map(Into::into).collect();
        if uris.first().map(String::as_str) != Some(OPC_UA_NAMESPACE) {
            uris.insert(0, OPC_UA_NAMESPACE.to_string());
        }
        Self { uris }
    }

    /// Returns the URI registered at `index`.
    pub fn uri(&self, index: u16) -> Option<&str> {
        self.uris.get(index as usize).map(String::as_str)
    }

    /// Returns the index of `uri`.
    pub fn index_of(&self, uri: &str) -> Option<u16> {
        self.uris
            .iter()
            .position(|u| u == uri)
            .and_then(|i| u16::try_from(i).ok())
    }

    /// Returns the index of `uri`, registering it if unknown.
    pub fn index_or_append(&mut self, uri: &str) -> u16 {
        if let Some(index) = self.index_of(uri) {
            return index;
        }
        self.uris.push(uri.to_string());
        u16::try_from(self.uris.len() - 1).unwrap_or(u16::MAX)
    }

    /// Returns the number of registered namespaces.
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Returns `true` if no namespace is registered.
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }

    /// Iterates the registered URIs in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.uris.iter().map(String::as_str)
    }

    /// Normalises a namespace index to its URI when known.
    pub fn namespace_ref(&self, index: u16) -> NamespaceRef {
        match self.uri(index) {
            Some(uri) => NamespaceRef::Uri(uri.to_string()),
            None => NamespaceRef::Index(index),
        }
    }

    /// Resolves a namespace reference to an index of this table.
    pub fn resolve(&self, namespace: &NamespaceRef) -> Option<u16> {
        match namespace {
            NamespaceRef::Uri(uri) => self.index_of(uri),
            NamespaceRef::Index(index) => Some(*index),
        }
    }
}

impl Default for NamespaceTable {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// NamespaceRef
// =============================================================================

/// Namespace identity of an address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamespaceRef {
    /// Stable namespace URI.
    Uri(String),
    /// Session-local index whose URI is not known.
    Index(u16),
}

impl NamespaceRef {
    /// Returns `true` for the standard namespace.
    pub fn is_standard(&self) -> bool {
        match self {
            Self::Uri(uri) => uri == OPC_UA_NAMESPACE,
            Self::Index(index) => *index == 0,
        }
    }
}

impl fmt::Display for NamespaceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri(uri) => f.write_str(uri),
            Self::Index(index) => write!(f, "{}", index),
        }
    }
}

// =============================================================================
// AddressFormat
// =============================================================================

/// Rendering preference for addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AddressFormat {
    /// `<uri>#<kind>=<value>`.
    #[default]
    Expanded,
    /// `ns=<index>;<kind>=<value>`.
    Numeric,
}

impl std::str::FromStr for AddressFormat {
    type Err = crate::error::OpcUaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "expanded" | "uri" => Ok(Self::Expanded),
            "numeric" | "index" => Ok(Self::Numeric),
            _ => Err(crate::error::ConfigurationError::invalid_value(
                "address_format",
                format!("unknown address format '{}'", s),
            )
            .into()),
        }
    }
}

// =============================================================================
// NodeAddress
// =============================================================================

/// Session-independent node address.
///
/// Parsing normalises known namespace indices to URIs, so two addresses are
/// equal iff their resolved namespace, identifier kind and value are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress {
    /// Namespace identity.
    pub namespace: NamespaceRef,
    /// Identifier.
    pub identifier: NodeIdentifier,
    /// Server URI for addresses on another server.
    pub server_uri: Option<String>,
}

impl NodeAddress {
    /// Creates an address in the standard namespace.
    pub fn standard(identifier: NodeIdentifier) -> Self {
        Self {
            namespace: NamespaceRef::Uri(OPC_UA_NAMESPACE.to_string()),
            identifier,
            server_uri: None,
        }
    }

    /// Creates an address in the namespace `uri`.
    pub fn with_uri(uri: impl Into<String>, identifier: NodeIdentifier) -> Self {
        Self {
            namespace: NamespaceRef::Uri(uri.into()),
            identifier,
            server_uri: None,
        }
    }

    /// Parses any of the accepted textual forms.
    ///
    /// A namespace URI that is not in `table` is kept as a URI; its index is
    /// resolved when the address is first used against the server.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidAddress`] for malformed text.
    pub fn parse(text: &str, table: &NamespaceTable) -> OpcUaResult<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(AddressError::invalid(text, "Address is empty").into());
        }

        if text.starts_with("ns=") {
            let node_id: NodeId = text.parse()?;
            return Ok(Self::from_node_id(&node_id, table));
        }

        if let Some(rest) = text.strip_prefix("nsu=") {
            let (uri, id) = rest
                .split_once(';')
                .ok_or_else(|| AddressError::invalid(text, "Missing identifier after namespace"))?;
            let identifier = NodeIdentifier::parse(id)
                .map_err(|reason| AddressError::invalid(text, reason))?;
            return Ok(Self::with_uri(normalize_uri(uri), identifier));
        }

        let (namespace, fragment) = match text.split_once('#') {
            Some((uri, fragment)) if looks_like_uri(uri) => (normalize_uri(uri), fragment),
            _ => (OPC_UA_NAMESPACE.to_string(), text),
        };

        let (id_text, server_uri) = match fragment.find('&') {
            Some(pos) => match fragment[pos..].strip_prefix("&srv=") {
                Some(server) if !server.is_empty() => (&fragment[..pos], Some(server.to_string())),
                _ => {
                    return Err(
                        AddressError::invalid(text, "Expected '&srv=<server uri>' suffix").into(),
                    )
                }
            },
            None => (fragment, None),
        };

        let identifier = parse_uri_identifier(id_text)
            .ok_or_else(|| AddressError::invalid(text, "Unrecognised node identifier"))?;

        let namespace = match table.index_of(&namespace) {
            Some(index) => table.namespace_ref(index),
            None => NamespaceRef::Uri(namespace),
        };

        Ok(Self {
            namespace,
            identifier,
            server_uri,
        })
    }

    /// Renders the address.
    pub fn render(&self, table: &NamespaceTable, format: AddressFormat) -> String {
        if format == AddressFormat::Numeric && self.server_uri.is_none() {
            if let Some(index) = table.resolve(&self.namespace) {
                return NodeId {
                    namespace_index: index,
                    identifier: self.identifier.clone(),
                }
                .to_opc_string();
            }
        }

        let uri = match &self.namespace {
            NamespaceRef::Uri(uri) => Some(uri.as_str()),
            NamespaceRef::Index(index) => table.uri(*index),
        };

        let mut out = match uri {
            Some(OPC_UA_NAMESPACE) => {
                if self.server_uri.is_none() {
                    if let Some(name) = self.data_type_name() {
                        return name.to_string();
                    }
                }
                render_uri_identifier(&self.identifier)
            }
            Some(uri) => format!("{}#{}", uri, render_uri_identifier(&self.identifier)),
            None => {
                let index = table.resolve(&self.namespace).unwrap_or_default();
                NodeId {
                    namespace_index: index,
                    identifier: self.identifier.clone(),
                }
                .to_opc_string()
            }
        };

        if let (Some(server), Some(_)) = (&self.server_uri, uri) {
            out.push_str("&srv=");
            out.push_str(server);
        }
        out
    }

    /// Resolves the address against a session's namespace table.
    ///
    /// # Errors
    ///
    /// Returns [`AddressError::InvalidAddress`] when the namespace URI is not
    /// registered with the server.
    pub fn to_node_id(&self, table: &NamespaceTable) -> OpcUaResult<NodeId> {
        let namespace_index = table.resolve(&self.namespace).ok_or_else(|| {
            AddressError::invalid(
                self.render(table, AddressFormat::Expanded),
                format!("Namespace '{}' is not known to the server", self.namespace),
            )
        })?;

        Ok(NodeId {
            namespace_index,
            identifier: self.identifier.clone(),
        })
    }

    /// Creates the portable address of a session-local node id.
    pub fn from_node_id(node_id: &NodeId, table: &NamespaceTable) -> Self {
        Self {
            namespace: table.namespace_ref(node_id.namespace_index),
            identifier: node_id.identifier.clone(),
            server_uri: None,
        }
    }

    /// Returns `true` for the standard namespace.
    pub fn is_standard(&self) -> bool {
        self.namespace.is_standard()
    }

    fn data_type_name(&self) -> Option<&'static str> {
        match self.identifier {
            NodeIdentifier::Numeric(id) => well_known::data_type_name(id),
            _ => None,
        }
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&NamespaceTable::new(), AddressFormat::Expanded))
    }
}

/// Parses text as an address and resolves it in one step.
pub fn parse_node_id(text: &str, table: &NamespaceTable) -> OpcUaResult<NodeId> {
    NodeAddress::parse(text, table)?.to_node_id(table)
}

/// Renders a session-local node id in the preferred format.
pub fn render_node_id(node_id: &NodeId, table: &NamespaceTable, format: AddressFormat) -> String {
    NodeAddress::from_node_id(node_id, table).render(table, format)
}

// =============================================================================
// Helpers
// =============================================================================

/// A namespace part is a URI when it has a scheme (`http:`, `urn:`, ...).
pub(crate) fn looks_like_uri(text: &str) -> bool {
    match text.split_once(':') {
        Some((scheme, _)) => {
            !scheme.is_empty()
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
                && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

/// Namespace URIs compare without a trailing query.
fn normalize_uri(uri: &str) -> String {
    uri.split('?').next().unwrap_or(uri).to_string()
}

/// Parses the identifier of a URI-expanded address.
///
/// Accepts `<kind>=<value>` and `<kind>_<value>`; string identifiers are
/// percent-decoded. Falls back to a standard data type name.
fn parse_uri_identifier(text: &str) -> Option<NodeIdentifier> {
    let mut chars = text.chars();
    if let (Some(kind), Some(sep)) = (chars.next(), chars.next()) {
        if sep == '=' || sep == '_' {
            let value = chars.as_str();
            let parsed = match kind {
                's' => urlencoding::decode(value)
                    .ok()
                    .map(|v| NodeIdentifier::String(v.into_owned())),
                'i' | 'g' | 'b' => NodeIdentifier::parse(&format!("{}={}", kind, value)).ok(),
                _ => None,
            };
            if parsed.is_some() {
                return parsed;
            }
        }
    }

    well_known::data_type_id(text).map(NodeIdentifier::Numeric)
}

fn render_uri_identifier(identifier: &NodeIdentifier) -> String {
    match identifier {
        NodeIdentifier::String(value) => format!("s={}", urlencoding::encode(value)),
        other => other.to_string(),
    }
}

// =============================================================================
// Tests
// =============================================================================
