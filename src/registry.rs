// ABOUTME: Static SSMI command registries mapping command names, wire ids and field schemas
// ABOUTME: Keeps request (client to server) and response (server to client) numbering spaces apart

use crate::codec::CodecError;
use crate::commands::{request, response};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Registry entry describing one SSMI command.
///
/// Descriptors are defined once at compile time by the `ssmi_commands!`
/// tables and never change at runtime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CommandDescriptor {
    /// Human readable command name, e.g. `LOGIN`
    pub name: &'static str,
    /// Wire identifier carried as the second token of a line
    pub wire_id: &'static str,
    /// Field names in wire order
    pub fields: &'static [&'static str],
}

impl CommandDescriptor {
    /// Position of `field` within the wire order, if the command declares it
    pub fn position(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| *f == field)
    }
}

/// Which side of the connection originates a command.
///
/// Both sides number their commands independently, so a wire id is only
/// meaningful together with its direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server
    Request,
    /// Server to client
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => write!(f, "request"),
            Direction::Response => write!(f, "response"),
        }
    }
}

/// Lookup table over one direction's descriptors.
#[derive(Debug)]
pub struct Registry {
    direction: Direction,
    by_id: HashMap<&'static str, CommandDescriptor>,
    by_name: HashMap<&'static str, CommandDescriptor>,
}

impl Registry {
    fn new(direction: Direction, descriptors: &'static [CommandDescriptor]) -> Self {
        let by_id = descriptors.iter().map(|d| (d.wire_id, *d)).collect();
        let by_name = descriptors.iter().map(|d| (d.name, *d)).collect();
        Self {
            direction,
            by_id,
            by_name,
        }
    }

    /// Registry for the given direction
    pub fn for_direction(direction: Direction) -> &'static Registry {
        match direction {
            Direction::Request => &REQUESTS,
            Direction::Response => &RESPONSES,
        }
    }

    /// Client-originated commands
    pub fn requests() -> &'static Registry {
        &REQUESTS
    }

    /// Server-originated commands
    pub fn responses() -> &'static Registry {
        &RESPONSES
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn lookup_by_id(&self, wire_id: &str) -> Result<CommandDescriptor, CodecError> {
        self.by_id
            .get(wire_id)
            .copied()
            .ok_or_else(|| CodecError::UnknownCommandId(wire_id.to_owned()))
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<CommandDescriptor, CodecError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| CodecError::UnknownCommandName(name.to_owned()))
    }

    /// All descriptors in this registry, in no particular order
    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

static REQUESTS: LazyLock<Registry> =
    LazyLock::new(|| Registry::new(Direction::Request, request::DESCRIPTORS));

static RESPONSES: LazyLock<Registry> =
    LazyLock::new(|| Registry::new(Direction::Response, response::DESCRIPTORS));
