// SSMI Codec - Separates the wire format from the command registry
//
// Every SSMI command is one `Command` value parameterised by its registry
// descriptor. Typed views over a command (e.g. `request::Login`) are
// generated from the same tables, so encoding and decoding never depend on
// per-command code.

use crate::commands::Defaults;
use crate::registry::{CommandDescriptor, Direction, Registry};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Literal header token opening every SSMI line
pub const HEADER: &str = "SSMI";

/// Field separator. Values are never escaped.
pub const SEPARATOR: char = ',';

/// Codec errors with enough context to report back to the caller
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Construction-time field mismatch; both lists are sorted
    #[error("{}", schema_message(.command, .unsupported, .missing))]
    Schema {
        command: &'static str,
        unsupported: Vec<String>,
        missing: Vec<String>,
    },

    #[error("Unknown header: {0}")]
    UnknownHeader(String),

    #[error("Unknown command id: {0}")]
    UnknownCommandId(String),

    #[error("Unknown command name: {0}")]
    UnknownCommandName(String),

    #[error("Too few parameters for command: {command} (expected {expected} got {actual})")]
    TooFewParameters {
        command: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Command {command} has no field '{field}'")]
    MissingField { command: &'static str, field: String },

    #[error("Unexpected command: expected {expected}, got {actual}")]
    UnexpectedCommand {
        expected: &'static str,
        actual: String,
    },

    #[error("Field '{field}' validation failed: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

impl CodecError {
    /// Raised while building an outbound command
    pub fn is_schema(&self) -> bool {
        matches!(
            self,
            CodecError::Schema { .. } | CodecError::InvalidField { .. }
        )
    }

    /// Raised while decoding an inbound line
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            CodecError::UnknownHeader(_)
                | CodecError::UnknownCommandId(_)
                | CodecError::TooFewParameters { .. }
        )
    }
}

fn schema_message(command: &str, unsupported: &[String], missing: &[String]) -> String {
    let mut parts = Vec::new();
    if !unsupported.is_empty() {
        parts.push(format!("Unsupported fields: {}", unsupported.join(", ")));
    }
    if !missing.is_empty() {
        parts.push(format!("Missing fields: {}", missing.join(", ")));
    }
    format!("{command}: {}", parts.join("; "))
}

/// Typed view over one registered command
///
/// Implemented by the structs generated in [`crate::commands`]; conversion
/// checks the descriptor so a `LOGIN` can never be read as an `ACK`.
pub trait TypedCommand: Sized {
    const DIRECTION: Direction;
    const DESCRIPTOR: CommandDescriptor;

    fn from_command(command: &Command) -> Result<Self, CodecError>;

    fn into_command(self) -> Command;
}

/// A single SSMI command instance.
///
/// Holds exactly one value per descriptor field, in wire order. Instances
/// are immutable once built and compare equal when their wire forms match.
#[derive(Clone, Debug)]
pub struct Command {
    descriptor: CommandDescriptor,
    values: Vec<String>,
}

impl Command {
    /// Build a command from explicit values layered over `defaults`.
    ///
    /// The merged key set must equal the descriptor's field set exactly;
    /// otherwise a `Schema` error names every unsupported and every missing
    /// field.
    pub fn build<I, K, V>(
        descriptor: CommandDescriptor,
        values: I,
        defaults: Defaults,
    ) -> Result<Self, CodecError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut merged: BTreeMap<String, String> = defaults
            .iter()
            .map(|(field, value)| ((*field).to_owned(), (*value).to_owned()))
            .collect();
        merged.extend(values.into_iter().map(|(k, v)| (k.into(), v.into())));

        let unsupported: Vec<String> = merged
            .keys()
            .filter(|field| descriptor.position(field).is_none())
            .cloned()
            .collect();
        let mut missing: Vec<String> = descriptor
            .fields
            .iter()
            .filter(|field| !merged.contains_key(**field))
            .map(|field| (*field).to_owned())
            .collect();
        missing.sort();

        if !unsupported.is_empty() || !missing.is_empty() {
            return Err(CodecError::Schema {
                command: descriptor.name,
                unsupported,
                missing,
            });
        }

        let values = descriptor
            .fields
            .iter()
            .map(|field| merged.remove(*field).unwrap_or_default())
            .collect();

        Ok(Self { descriptor, values })
    }

    /// Build from values already in wire order. Callers guarantee the count.
    pub(crate) fn from_ordered(descriptor: CommandDescriptor, values: Vec<String>) -> Self {
        debug_assert_eq!(descriptor.fields.len(), values.len());
        Self { descriptor, values }
    }

    /// Decode one wire line (without its terminator).
    ///
    /// The final field absorbs any remaining separators, so free-text
    /// payloads may contain commas.
    pub fn decode(line: &str, direction: Direction) -> Result<Self, CodecError> {
        let mut tokens = line.splitn(3, SEPARATOR);

        let header = tokens.next().unwrap_or_default();
        if header != HEADER {
            return Err(CodecError::UnknownHeader(header.to_owned()));
        }

        let wire_id = tokens.next().unwrap_or_default();
        let descriptor = Registry::for_direction(direction).lookup_by_id(wire_id)?;

        let expected = descriptor.fields.len();
        let values: Vec<String> = match tokens.next() {
            Some(rest) if expected > 0 => {
                rest.splitn(expected, SEPARATOR).map(str::to_owned).collect()
            }
            // Trailing tokens on a field-less command carry nothing
            _ => Vec::new(),
        };

        if values.len() < expected {
            return Err(CodecError::TooFewParameters {
                command: descriptor.name,
                expected,
                actual: values.len(),
            });
        }

        Ok(Self { descriptor, values })
    }

    /// Wire form: `SSMI,<id>,<field_1>,...,<field_n>`, unterminated
    pub fn encode(&self) -> String {
        let mut line = String::with_capacity(
            HEADER.len() + 8 + self.values.iter().map(|v| v.len() + 1).sum::<usize>(),
        );
        line.push_str(HEADER);
        line.push(SEPARATOR);
        line.push_str(self.descriptor.wire_id);
        for value in &self.values {
            line.push(SEPARATOR);
            line.push_str(value);
        }
        line
    }

    pub fn descriptor(&self) -> CommandDescriptor {
        self.descriptor
    }

    pub fn name(&self) -> &'static str {
        self.descriptor.name
    }

    pub fn wire_id(&self) -> &'static str {
        self.descriptor.wire_id
    }

    pub fn get_field(&self, field: &str) -> Result<&str, CodecError> {
        self.descriptor
            .position(field)
            .and_then(|index| self.values.get(index))
            .map(String::as_str)
            .ok_or_else(|| CodecError::MissingField {
                command: self.descriptor.name,
                field: field.to_owned(),
            })
    }

    /// `(field, value)` pairs in wire order
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.descriptor
            .fields
            .iter()
            .copied()
            .zip(self.values.iter().map(String::as_str))
    }

    pub fn to_typed<T: TypedCommand>(&self) -> Result<T, CodecError> {
        T::from_command(self)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl PartialEq for Command {
    fn eq(&self, other: &Self) -> bool {
        self.encode() == other.encode()
    }
}

impl Eq for Command {}
