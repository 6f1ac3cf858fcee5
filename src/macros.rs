// ABOUTME: Declarative macros that turn SSMI command tables into descriptors and typed accessors
// ABOUTME: One table per direction yields the registry entries plus one struct per command

/// Wire name of a field: the identifier itself, or an explicit override for
/// names that are Rust keywords (`type`).
macro_rules! ssmi_field_name {
    ($field:ident) => {
        stringify!($field)
    };
    ($field:ident, $wire:literal) => {
        $wire
    };
}

/// Macro for declaring one direction's SSMI command table
///
/// Each row declares a typed struct, the command name, its wire id and the
/// ordered field list. A field may be renamed on the wire with
/// `ident as "wire_name"`.
///
/// # Generated code
/// - `DESCRIPTORS`: the static descriptor table consumed by the registry
/// - one `pub struct` per row with a `String` per field
/// - a `TypedCommand` implementation converting to and from `Command`
macro_rules! ssmi_commands {
    (
        direction: $direction:ident;
        $(
            $(#[$meta:meta])*
            $ty:ident => $name:literal, $id:literal, [$($field:ident $(as $wire:literal)?),* $(,)?];
        )*
    ) => {
        /// Descriptor table for every command declared in this module
        pub static DESCRIPTORS: &[$crate::registry::CommandDescriptor] =
            &[$(<$ty as $crate::codec::TypedCommand>::DESCRIPTOR),*];

        $(
            $(#[$meta])*
            #[derive(Clone, Debug, Default, PartialEq, Eq)]
            pub struct $ty {
                $(pub $field: String,)*
            }

            impl $crate::codec::TypedCommand for $ty {
                const DIRECTION: $crate::registry::Direction = $crate::registry::Direction::$direction;

                const DESCRIPTOR: $crate::registry::CommandDescriptor =
                    $crate::registry::CommandDescriptor {
                        name: $name,
                        wire_id: $id,
                        fields: &[$(ssmi_field_name!($field $(, $wire)?)),*],
                    };

                fn from_command(
                    command: &$crate::codec::Command,
                ) -> Result<Self, $crate::codec::CodecError> {
                    if command.descriptor() != Self::DESCRIPTOR {
                        return Err($crate::codec::CodecError::UnexpectedCommand {
                            expected: $name,
                            actual: command.name().to_owned(),
                        });
                    }

                    Ok($ty {
                        $($field: command.get_field(ssmi_field_name!($field $(, $wire)?))?.to_owned(),)*
                    })
                }

                fn into_command(self) -> $crate::codec::Command {
                    $crate::codec::Command::from_ordered(Self::DESCRIPTOR, vec![$(self.$field),*])
                }
            }
        )*
    };
}

/// Macro for enumerated codes that travel as decimal strings
///
/// Generates `Display` (the numeric wire form) and `FromStr` (decimal text
/// validated through `num_enum`'s `TryFromPrimitive`) for a `#[repr]` enum.
macro_rules! impl_wire_code {
    ($code:ident, $repr:ty) => {
        impl std::fmt::Display for $code {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", *self as $repr)
            }
        }

        impl std::str::FromStr for $code {
            type Err = $crate::codec::CodecError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                let invalid = || $crate::codec::CodecError::InvalidField {
                    field: stringify!($code),
                    reason: format!("'{value}' is not a known code"),
                };
                let raw: $repr = value.trim().parse().map_err(|_| invalid())?;
                <$code as num_enum::TryFromPrimitive>::try_from_primitive(raw).map_err(|_| invalid())
            }
        }
    };
}
