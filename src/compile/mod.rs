//! Compilers for the legacy XML authoring formats.
//!
//! Two document kinds are supported:
//! - **Levels** (`<levels>` of `<level>`): see [`level`]
//! - **Sprite-sheets** (`<spritesheets>` of `<spritesheet>`): see [`spritesheet`]
//!
//! Each compiler maps the generic XML tree onto typed structures field by
//! field. Anything that does not match the expected shape is a
//! [`CompileError`]; problems that still leave a usable result (such as a
//! malformed `vars` payload) are returned as [`Warning`]s next to the value.
//!
//! # Example
//!
//! ```
//! use clockwork::compile::compile_levels;
//!
//! let xml = br#"<levels><level id="1"><object name="dog" type="Dog" x="1" y="2"/></level></levels>"#;
//! let output = compile_levels(xml).unwrap();
//! assert_eq!(output.value[0].objects.len(), 1);
//! assert!(output.warnings.is_empty());
//! ```

pub mod level;
pub mod spritesheet;
mod xml;

pub use level::{compile_levels, Level, LevelObject, ObjectType};
pub use spritesheet::{compile_spritesheets, Frame, FrameKind, Layer, Spritesheet, State};

use serde::Serialize;

/// Error that prevents a document from compiling.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CompileError {
    /// Input is not valid UTF-8
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[source] std::str::Utf8Error),
    /// Input is not well-formed XML
    #[error("malformed XML: {0}")]
    Xml(#[source] roxmltree::Error),
    /// Root element has the wrong tag
    #[error("expected root element <{expected}>, found <{found}>")]
    UnexpectedRoot { expected: String, found: String },
    /// A required child element is missing
    #[error("{parent} has no <{element}> element")]
    MissingElement { parent: String, element: String },
    /// A required attribute is missing
    #[error("{element} is missing the '{attribute}' attribute")]
    MissingAttribute { element: String, attribute: String },
    /// An attribute could not be converted
    #[error("{element} has {attribute}=\"{value}\", expected {expected}")]
    InvalidValue { element: String, attribute: String, value: String, expected: &'static str },
    /// Two entries of a keyed map share a name
    #[error("{kind} '{name}' is declared more than once in spritesheet '{sheet}'")]
    DuplicateName { kind: &'static str, name: String, sheet: String },
    /// The compiled value could not be encoded as JSON
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Non-fatal problem found while compiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    /// Human-readable message naming the offending element or value
    pub message: String,
}

impl Warning {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// A compiled value plus the warnings produced along the way.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileOutput<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

/// The two authoring formats a manifest can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetKind {
    Level,
    Spritesheet,
}

impl AssetKind {
    /// Manifest key listing files of this kind.
    pub fn manifest_key(self) -> &'static str {
        match self {
            AssetKind::Level => "levels",
            AssetKind::Spritesheet => "spritesheets",
        }
    }
}

impl std::fmt::Display for AssetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetKind::Level => write!(f, "level"),
            AssetKind::Spritesheet => write!(f, "spritesheet"),
        }
    }
}

/// Compile a document of the given kind straight to its JSON text.
pub fn compile_to_json(
    kind: AssetKind,
    bytes: &[u8],
) -> Result<CompileOutput<String>, CompileError> {
    match kind {
        AssetKind::Level => to_json(compile_levels(bytes)?),
        AssetKind::Spritesheet => to_json(compile_spritesheets(bytes)?),
    }
}

fn to_json<T: Serialize>(output: CompileOutput<T>) -> Result<CompileOutput<String>, CompileError> {
    let value = serde_json::to_string(&output.value)?;
    Ok(CompileOutput { value, warnings: output.warnings })
}
