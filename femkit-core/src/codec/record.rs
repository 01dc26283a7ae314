//! Single-record tokenizer, field writer and cross-reference context.

use crate::element::Element;
use crate::error::{Error, Result};
use crate::mesh::Mesh;
use crate::types::{ElementId, MaterialId, NodeId};
use std::fmt::{Display, Write as _};
use std::str::SplitWhitespace;

/// Field-by-field reader over one record line.
///
/// Every parse failure carries the record's line number.
pub struct RecordReader<'a> {
    line: usize,
    tokens: SplitWhitespace<'a>,
}

impl<'a> RecordReader<'a> {
    /// Create a reader over the fields of a record.
    pub fn new(line: usize, fields: &'a str) -> Self {
        Self {
            line,
            tokens: fields.split_whitespace(),
        }
    }

    /// 1-based line number of this record.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Build a [`Error::MalformedRecord`] for this record.
    pub fn error(&self, message: impl Into<String>) -> Error {
        Error::malformed(self.line, message)
    }

    /// Next raw token.
    pub fn next_token(&mut self, what: &str) -> Result<&'a str> {
        self.tokens
            .next()
            .ok_or_else(|| Error::malformed(self.line, format!("missing {}", what)))
    }

    /// Next token as an unsigned identity or count.
    pub fn next_u32(&mut self, what: &str) -> Result<u32> {
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|_| self.error(format!("invalid {} '{}'", what, token)))
    }

    /// Next token as an index.
    pub fn next_usize(&mut self, what: &str) -> Result<usize> {
        let token = self.next_token(what)?;
        token
            .parse()
            .map_err(|_| self.error(format!("invalid {} '{}'", what, token)))
    }

    /// Next token as a finite float.
    pub fn next_f64(&mut self, what: &str) -> Result<f64> {
        let token = self.next_token(what)?;
        parse_finite(token).ok_or_else(|| self.error(format!("invalid {} '{}'", what, token)))
    }

    /// Next `name=value` pair, or `None` once the record is exhausted.
    pub fn next_property(&mut self) -> Result<Option<(&'a str, f64)>> {
        let Some(token) = self.tokens.next() else {
            return Ok(None);
        };
        let (name, value) = token
            .split_once('=')
            .ok_or_else(|| self.error(format!("expected name=value, found '{}'", token)))?;
        let value = parse_finite(value)
            .ok_or_else(|| self.error(format!("invalid value for property '{}'", name)))?;
        Ok(Some((name, value)))
    }

    /// Require that every field has been consumed.
    pub fn finish(mut self) -> Result<()> {
        match self.tokens.next() {
            None => Ok(()),
            Some(extra) => Err(self.error(format!("unexpected trailing field '{}'", extra))),
        }
    }
}

fn parse_finite(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Field accumulator for one record body.
///
/// Floats are written in Rust's shortest round-trip form, so reading a
/// written record reproduces every value bit for bit.
#[derive(Debug, Default)]
pub struct RecordWriter {
    buf: String,
}

impl RecordWriter {
    /// Create an empty record body.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one field.
    pub fn field(&mut self, value: impl Display) -> &mut Self {
        if !self.buf.is_empty() {
            self.buf.push(' ');
        }
        // Writing into a String cannot fail.
        let _ = write!(self.buf, "{}", value);
        self
    }

    /// Append a `name=value` field.
    pub fn property(&mut self, name: &str, value: f64) -> &mut Self {
        self.field(format_args!("{}={}", name, value))
    }

    /// The fields written so far.
    pub fn as_str(&self) -> &str {
        &self.buf
    }
}

/// Entities already read, handed to each variant so it can check its
/// cross-references while it parses.
pub struct ReadContext<'m> {
    mesh: &'m Mesh,
}

impl<'m> ReadContext<'m> {
    /// Context over the entities loaded into `mesh` so far.
    pub fn new(mesh: &'m Mesh) -> Self {
        Self { mesh }
    }

    /// Require a node read earlier in the stream.
    pub fn require_node(&self, id: NodeId) -> Result<NodeId> {
        match self.mesh.node_slot(id) {
            Some(_) => Ok(id),
            None => Err(Error::DanglingReference {
                kind: NodeId::KIND,
                id: id.0,
            }),
        }
    }

    /// Require a material read earlier in the stream.
    pub fn require_material(&self, id: MaterialId) -> Result<MaterialId> {
        match self.mesh.material_slot(id) {
            Some(_) => Ok(id),
            None => Err(Error::DanglingReference {
                kind: MaterialId::KIND,
                id: id.0,
            }),
        }
    }

    /// Require an element read earlier in the stream.
    pub fn require_element(&self, id: ElementId) -> Result<&'m dyn Element> {
        self.mesh
            .element_by_id(id)
            .ok_or(Error::DanglingReference {
                kind: ElementId::KIND,
                id: id.0,
            })
    }
}
