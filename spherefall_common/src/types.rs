use std::fmt;

/// Stable identifier handed out by the object manager.
///
/// Replay files store it as a signed 16-bit integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(pub u16);

impl ObjectId {
    /// Identifier that follows this one
    pub const fn next(self) -> Self {
        ObjectId(self.0.wrapping_add(1))
    }

    pub const fn to_wire(self) -> i16 {
        self.0 as i16
    }

    pub const fn from_wire(raw: i16) -> Self {
        ObjectId(raw as u16)
    }
}

impl From<u16> for ObjectId {
    fn from(id: u16) -> Self {
        ObjectId(id)
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Sequential identifier of a template declared by a level, in document order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub u16);

impl TemplateId {
    pub const fn to_wire(self) -> i16 {
        self.0 as i16
    }

    /// Negative ids mark templates that were never declared by a level
    pub const fn from_wire(raw: i16) -> Option<Self> {
        if raw < 0 { None } else { Some(TemplateId(raw as u16)) }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "template {}", self.0)
    }
}
