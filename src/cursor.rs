//! Cursors over a message body.
//!
//! [`AppendCursor`] writes values into a [`Message`], keeping an explicit
//! stack of open containers so that every append can be checked against
//! what the enclosing container allows. [`ReadCursor`] walks an existing
//! body in lock-step with its signature; stepping into a container gives a
//! new cursor scoped to that container's contents.

use std::convert::TryFrom;
use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::str;

use byteorder::ByteOrder;
use log::trace;

use crate::align::align;
use crate::error::{CodingPath, Error, Result};
use crate::message::Message;
use crate::primitives::{check_string_like, FixedPrimitive};
use crate::signature::{BasicKind, TypeKind, TypeNode, TypeSignature, MAX_DEPTH};
use crate::value::BasicValue;

/// Largest array payload the wire format allows: 64 MiB.
pub const MAX_ARRAY_LEN: usize = 64 * 1024 * 1024;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    Array,
    Struct,
    DictEntry,
    Variant,
}

impl ContainerKind {
    pub fn type_kind(self) -> TypeKind {
        match self {
            ContainerKind::Array => TypeKind::Array,
            ContainerKind::Struct => TypeKind::Struct,
            ContainerKind::DictEntry => TypeKind::DictEntry,
            ContainerKind::Variant => TypeKind::Variant,
        }
    }
}

impl Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.type_kind(), f)
    }
}

/// Proof that a container was opened. It must be handed back to
/// [`AppendCursor::close_container`] once the contents are written.
#[must_use = "an open container has to be closed"]
#[derive(Debug)]
pub struct ContainerHandle {
    id: usize,
    kind: ContainerKind,
}

impl ContainerHandle {
    pub fn kind(&self) -> ContainerKind {
        self.kind
    }
}

// What the values inside an open container must look like.
enum Layout {
    // Array: every element has this type.
    Repeat(TypeNode),
    // Known fields, and the type the container has once they are written.
    Fields(Vec<TypeNode>, TypeNode),
    // A struct whose fields are collected as they are appended.
    Free(Vec<TypeNode>),
}

struct OpenContainer {
    id: usize,
    kind: ContainerKind,
    layout: Layout,
    count: usize,
    // Arrays only: where the length goes and where the elements start.
    length_at: usize,
    start: usize,
}

impl OpenContainer {
    fn expected(&self) -> Result<Option<&TypeNode>> {
        match &self.layout {
            Layout::Repeat(element) => Ok(Some(element)),
            Layout::Fields(fields, _) => fields.get(self.count).map(Some).ok_or_else(|| {
                Error::container_mismatch(format!(
                    "{} already holds all {} of its values",
                    self.kind,
                    fields.len()
                ))
            }),
            Layout::Free(_) => Ok(None),
        }
    }

    fn admit(&self, kind: TypeKind) -> Result<()> {
        if let Some(expected) = self.expected()? {
            if expected.kind() != kind {
                return Err(Error::type_mismatch(
                    &CodingPath::root(),
                    expected.to_string(),
                    kind.to_string(),
                ));
            }
        }
        Ok(())
    }

    fn complete(&mut self, ty: TypeNode) -> Result<()> {
        if let Some(expected) = self.expected()? {
            if *expected != ty {
                return Err(Error::type_mismatch(
                    &CodingPath::root(),
                    expected.to_string(),
                    ty.to_string(),
                ));
            }
        }
        if let Layout::Free(fields) = &mut self.layout {
            fields.push(ty);
        }
        self.count += 1;
        Ok(())
    }

    fn closed_type(&self) -> Result<TypeNode> {
        match &self.layout {
            Layout::Repeat(element) => Ok(TypeNode::array(element.clone())),
            Layout::Fields(fields, closed) => {
                if self.count != fields.len() {
                    return Err(Error::container_mismatch(format!(
                        "{} closed after {} of its {} values",
                        self.kind,
                        self.count,
                        fields.len()
                    )));
                }
                Ok(closed.clone())
            }
            Layout::Free(fields) => {
                if fields.is_empty() {
                    return Err(Error::container_mismatch("struct closed without any fields"));
                }
                Ok(TypeNode::Struct(fields.clone()))
            }
        }
    }
}

/// Append-mode cursor.
///
/// Each complete top-level value appends its type to the message
/// signature. Any error raised while a container is open abandons the
/// message, as does dropping the cursor before every container is closed.
pub struct AppendCursor<'m, B: ByteOrder> {
    message: &'m mut Message,
    stack: Vec<OpenContainer>,
    next_id: usize,
    phantom: PhantomData<B>,
}

impl<'m, B: ByteOrder> AppendCursor<'m, B> {
    pub fn new(message: &'m mut Message) -> Self {
        AppendCursor {
            message,
            stack: Vec::new(),
            next_id: 0,
            phantom: PhantomData,
        }
    }

    pub fn message(&self) -> &Message {
        self.message
    }

    /// Number of currently open containers.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn fail(&mut self, err: Error) -> Error {
        if !self.stack.is_empty() {
            self.message.abandon();
        }
        err
    }

    fn admit(&self, kind: TypeKind) -> Result<()> {
        match self.stack.last() {
            Some(top) => top.admit(kind),
            None => Ok(()),
        }
    }

    fn expected(&self) -> Result<Option<TypeNode>> {
        match self.stack.last() {
            Some(top) => Ok(top.expected()?.cloned()),
            None => Ok(None),
        }
    }

    fn complete(&mut self, ty: TypeNode) -> Result<()> {
        match self.stack.last_mut() {
            Some(top) => top.complete(ty),
            None => {
                self.message.push_signature(&ty.signature());
                Ok(())
            }
        }
    }

    fn write_fixed<T: FixedPrimitive>(&mut self, value: T) -> Result<usize> {
        let mut buf = [0u8; 8];
        let size = T::size();
        value.write::<B>(&mut buf[..size]);
        self.message.append_raw(&buf[..size], size)
    }

    fn write_text(&mut self, prefix: usize, text: &str) -> Result<()> {
        let mut bytes = Vec::with_capacity(text.len() + 1);
        bytes.extend_from_slice(text.as_bytes());
        bytes.push(0);
        self.message.append_raw(&bytes, 1)?;
        trace!("appended {:?} after length prefix at {}", text, prefix);
        Ok(())
    }

    fn write_basic(&mut self, value: &BasicValue) -> Result<()> {
        let offset = match value {
            BasicValue::Byte(v) => self.write_fixed(*v)?,
            BasicValue::Boolean(v) => self.write_fixed(u32::from(*v))?,
            BasicValue::Int16(v) => self.write_fixed(*v)?,
            BasicValue::UInt16(v) => self.write_fixed(*v)?,
            BasicValue::Int32(v) => self.write_fixed(*v)?,
            BasicValue::UInt32(v) | BasicValue::UnixFd(v) => self.write_fixed(*v)?,
            BasicValue::Int64(v) => self.write_fixed(*v)?,
            BasicValue::UInt64(v) => self.write_fixed(*v)?,
            BasicValue::Double(v) => self.write_fixed(*v)?,
            BasicValue::String(text) | BasicValue::ObjectPath(text) => {
                let kind = value.kind();
                check_text(kind, text)?;
                let len = u32::try_from(text.len())
                    .map_err(|_| Error::value_range(&CodingPath::root(), text.len(), kind.name()))?;
                let offset = self.write_fixed(len)?;
                self.write_text(offset, text)?;
                offset
            }
            BasicValue::Signature(text) => {
                check_text(BasicKind::Signature, text)?;
                let len = u8::try_from(text.len()).map_err(|_| {
                    Error::value_range(&CodingPath::root(), text.len(), "signature length")
                })?;
                let offset = self.write_fixed(len)?;
                self.write_text(offset, text)?;
                offset
            }
        };
        trace!("appended {} {} at {}", value.kind(), value, offset);
        Ok(())
    }

    fn try_append_basic(&mut self, value: &BasicValue) -> Result<()> {
        let kind = value.kind();
        self.admit(TypeKind::Basic(kind))?;
        self.write_basic(value)?;
        self.complete(TypeNode::Basic(kind))
    }

    /// Appends one basic value at the current position.
    pub fn append_basic(&mut self, value: &BasicValue) -> Result<()> {
        self.try_append_basic(value).map_err(|err| self.fail(err))
    }

    fn try_open(
        &mut self,
        kind: ContainerKind,
        contained: Option<&TypeNode>,
    ) -> Result<ContainerHandle> {
        if self.stack.len() >= MAX_DEPTH {
            return Err(Error::DepthLimitExceeded {
                path: CodingPath::root(),
                limit: MAX_DEPTH,
            });
        }
        self.admit(kind.type_kind())?;
        let expected = self.expected()?;

        let mut length_at = 0;
        let mut start = 0;
        let layout = match kind {
            ContainerKind::Array => {
                let element = match expected {
                    Some(TypeNode::Array(element)) => *element,
                    _ => contained.cloned().ok_or_else(|| {
                        Error::container_mismatch("array opened without an element type")
                    })?,
                };
                if let Some(hint) = contained {
                    if *hint != element {
                        return Err(Error::type_mismatch(
                            &CodingPath::root(),
                            format!("array of {}", element),
                            format!("array of {}", hint),
                        ));
                    }
                }
                TypeNode::array(element.clone()).check_limits()?;
                length_at = self.write_fixed(0u32)?;
                start = self.message.append_raw(&[], element.alignment())?;
                Layout::Repeat(element)
            }
            ContainerKind::Struct => {
                let layout = match expected.as_ref().or(contained) {
                    Some(TypeNode::Struct(fields)) => {
                        Layout::Fields(fields.clone(), TypeNode::Struct(fields.clone()))
                    }
                    Some(other) => {
                        return Err(Error::type_mismatch(
                            &CodingPath::root(),
                            other.to_string(),
                            "struct",
                        ))
                    }
                    None => Layout::Free(Vec::new()),
                };
                self.message.append_raw(&[], 8)?;
                layout
            }
            ContainerKind::DictEntry => {
                let entry = match expected {
                    Some(entry) if entry.kind() == TypeKind::DictEntry => entry,
                    _ => {
                        return Err(Error::container_mismatch(
                            "dict-entry opened outside of a dictionary array",
                        ))
                    }
                };
                self.message.append_raw(&[], 8)?;
                Layout::Fields(entry.children().to_vec(), entry)
            }
            ContainerKind::Variant => {
                let inner = contained.ok_or_else(|| {
                    Error::container_mismatch("variant opened without a contained signature")
                })?;
                let signature = inner.signature();
                TypeSignature::parse_single(&signature)?;
                self.write_basic(&BasicValue::Signature(signature))?;
                Layout::Fields(vec![inner.clone()], TypeNode::Variant)
            }
        };

        let id = self.next_id;
        self.next_id += 1;
        trace!(
            "opened {} #{} at depth {}, body position {}",
            kind,
            id,
            self.stack.len(),
            self.message.position()
        );
        self.stack.push(OpenContainer {
            id,
            kind,
            layout,
            count: 0,
            length_at,
            start,
        });
        Ok(ContainerHandle { id, kind })
    }

    /// Opens a container at the current position.
    ///
    /// `contained` is the element type for an array and the contained
    /// type for a variant; both are required unless the enclosing
    /// container already fixes them. Structs and dict-entries take their
    /// layout from the enclosing container, or from `contained` at the
    /// top level.
    pub fn open_container(
        &mut self,
        kind: ContainerKind,
        contained: Option<&TypeNode>,
    ) -> Result<ContainerHandle> {
        self.try_open(kind, contained).map_err(|err| self.fail(err))
    }

    fn try_close(&mut self, handle: &ContainerHandle) -> Result<()> {
        let top = match self.stack.last() {
            Some(top) if top.id == handle.id => top,
            Some(top) => {
                return Err(Error::container_mismatch(format!(
                    "closing {} #{} while {} #{} is the innermost open container",
                    handle.kind, handle.id, top.kind, top.id
                )))
            }
            None => {
                return Err(Error::container_mismatch(format!(
                    "closing {} #{} with no container open",
                    handle.kind, handle.id
                )))
            }
        };
        let ty = top.closed_type()?;
        let (kind, length_at, start) = (top.kind, top.length_at, top.start);

        if kind == ContainerKind::Array {
            let len = self.message.position() - start;
            if len > MAX_ARRAY_LEN {
                return Err(Error::value_range(
                    &CodingPath::root(),
                    format!("{} bytes", len),
                    "array (at most 64 MiB)",
                ));
            }
            let mut buf = [0u8; 4];
            (len as u32).write::<B>(&mut buf);
            self.message.patch(length_at, &buf);
            trace!("closed array #{}: {} bytes", handle.id, len);
        } else {
            trace!("closed {} #{}", kind, handle.id);
        }

        self.stack.pop();
        self.complete(ty)
    }

    /// Closes the innermost open container, which must be the one
    /// `handle` was issued for.
    pub fn close_container(&mut self, handle: ContainerHandle) -> Result<()> {
        self.try_close(&handle).map_err(|err| self.fail(err))
    }

    fn abandon(&mut self, handle: ContainerHandle) {
        self.message.abandon();
        if let Some(ix) = self.stack.iter().position(|open| open.id == handle.id) {
            self.stack.truncate(ix);
        }
    }

    /// Opens a container, runs `f` to fill it and closes it. If `f`
    /// fails the message is abandoned and the error passed on.
    pub fn with_container<R>(
        &mut self,
        kind: ContainerKind,
        contained: Option<&TypeNode>,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let handle = self.open_container(kind, contained)?;
        match f(self) {
            Ok(out) => {
                self.close_container(handle)?;
                Ok(out)
            }
            Err(err) => {
                self.abandon(handle);
                Err(err)
            }
        }
    }

    /// Ends the encode. Fails, abandoning the message, if any container
    /// is still open.
    pub fn finish(mut self) -> Result<()> {
        if let Some(top) = self.stack.last() {
            let err = Error::container_mismatch(format!("{} #{} was never closed", top.kind, top.id));
            return Err(self.fail(err));
        }
        Ok(())
    }
}

impl<'m, B: ByteOrder> Drop for AppendCursor<'m, B> {
    fn drop(&mut self) {
        if !self.stack.is_empty() {
            self.message.abandon();
        }
    }
}

fn check_text(kind: BasicKind, text: &str) -> Result<()> {
    check_string_like(kind, text).map_err(|reason| {
        Error::value_range(
            &CodingPath::root(),
            format!("{:?}", text),
            format!("{} ({})", kind, reason),
        )
    })
}

#[derive(Clone, Debug)]
enum Scope {
    // A fixed run of sibling types: top-level arguments, struct fields,
    // dict-entry key and value, variant contents.
    Fields { types: Vec<TypeNode>, index: usize },
    // Array elements up to a body offset.
    Elements { element: TypeNode, end: usize },
}

/// Read-mode cursor.
///
/// Inspecting the current value never moves the cursor; only
/// [`advance`](ReadCursor::advance) does.
pub struct ReadCursor<'m, B: ByteOrder> {
    message: &'m Message,
    pos: usize,
    scope: Scope,
    depth: usize,
    phantom: PhantomData<B>,
}

impl<'m, B: ByteOrder> ReadCursor<'m, B> {
    /// A cursor over the top-level arguments, typed by the message's own
    /// signature.
    pub fn new(message: &'m Message) -> Result<Self> {
        let signature = TypeSignature::parse(message.signature())?;
        Ok(ReadCursor {
            message,
            pos: 0,
            scope: Scope::Fields {
                types: signature.nodes().to_vec(),
                index: 0,
            },
            depth: 0,
            phantom: PhantomData,
        })
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn current_type(&self) -> Option<&TypeNode> {
        match &self.scope {
            Scope::Fields { types, index } => types.get(*index),
            Scope::Elements { element, end } => {
                if self.pos < *end {
                    Some(element)
                } else {
                    None
                }
            }
        }
    }

    /// The number of sibling types at this level, such as the top-level
    /// arguments or the fields of a struct. `None` inside an array.
    pub fn field_count(&self) -> Option<usize> {
        match &self.scope {
            Scope::Fields { types, .. } => Some(types.len()),
            Scope::Elements { .. } => None,
        }
    }

    pub fn current_wire_type(&self) -> Option<TypeKind> {
        self.current_type().map(TypeNode::kind)
    }

    pub fn has_current(&self) -> bool {
        self.current_type().is_some()
    }

    fn require_current(&self) -> Result<&TypeNode> {
        self.current_type()
            .ok_or_else(|| Error::container_mismatch("no value left at this level"))
    }

    fn read_fixed<T: FixedPrimitive>(&self, pos: usize) -> Result<(T, usize)> {
        let size = T::size();
        let bytes = self.message.read_raw(pos, size, size)?;
        Ok((T::read::<B>(bytes), align(pos, size) + size))
    }

    fn read_text(&self, pos: usize, start: usize, len: usize, kind: BasicKind) -> Result<(String, usize)> {
        let bytes = self.message.read_raw(start, len + 1, 1)?;
        if bytes[len] != 0 {
            return Err(Error::corrupted(pos, format!("{} lacks its NUL terminator", kind)));
        }
        let text = str::from_utf8(&bytes[..len])
            .map_err(|e| Error::corrupted(pos, format!("{} is not UTF-8: {}", kind, e)))?;
        check_string_like(kind, text)
            .map_err(|reason| Error::corrupted(pos, format!("invalid {}: {}", kind, reason)))?;
        Ok((text.to_owned(), start + len + 1))
    }

    fn read_basic_at(&self, kind: BasicKind, pos: usize) -> Result<(BasicValue, usize)> {
        let (value, end) = match kind {
            BasicKind::Byte => self
                .read_fixed::<u8>(pos)
                .map(|(v, end)| (BasicValue::Byte(v), end))?,
            BasicKind::Boolean => {
                let (raw, end) = self.read_fixed::<u32>(pos)?;
                let v = match raw {
                    0 => false,
                    1 => true,
                    other => {
                        return Err(Error::corrupted(
                            pos,
                            format!("boolean holds {}", other),
                        ))
                    }
                };
                (BasicValue::Boolean(v), end)
            }
            BasicKind::Int16 => self
                .read_fixed::<i16>(pos)
                .map(|(v, end)| (BasicValue::Int16(v), end))?,
            BasicKind::UInt16 => self
                .read_fixed::<u16>(pos)
                .map(|(v, end)| (BasicValue::UInt16(v), end))?,
            BasicKind::Int32 => self
                .read_fixed::<i32>(pos)
                .map(|(v, end)| (BasicValue::Int32(v), end))?,
            BasicKind::UInt32 => self
                .read_fixed::<u32>(pos)
                .map(|(v, end)| (BasicValue::UInt32(v), end))?,
            BasicKind::Int64 => self
                .read_fixed::<i64>(pos)
                .map(|(v, end)| (BasicValue::Int64(v), end))?,
            BasicKind::UInt64 => self
                .read_fixed::<u64>(pos)
                .map(|(v, end)| (BasicValue::UInt64(v), end))?,
            BasicKind::Double => self
                .read_fixed::<f64>(pos)
                .map(|(v, end)| (BasicValue::Double(v), end))?,
            BasicKind::UnixFd => self
                .read_fixed::<u32>(pos)
                .map(|(v, end)| (BasicValue::UnixFd(v), end))?,
            BasicKind::String | BasicKind::ObjectPath => {
                let (len, start) = self.read_fixed::<u32>(pos)?;
                let (text, end) = self.read_text(pos, start, len as usize, kind)?;
                let value = if kind == BasicKind::String {
                    BasicValue::String(text)
                } else {
                    BasicValue::ObjectPath(text)
                };
                (value, end)
            }
            BasicKind::Signature => {
                let (len, start) = self.read_fixed::<u8>(pos)?;
                let (text, end) = self.read_text(pos, start, usize::from(len), kind)?;
                (BasicValue::Signature(text), end)
            }
        };
        trace!("read {} {} at {}", kind, value, pos);
        Ok((value, end))
    }

    /// Reads the current value, which must be of a basic type.
    pub fn get_basic(&self) -> Result<BasicValue> {
        match self.require_current()? {
            TypeNode::Basic(kind) => Ok(self.read_basic_at(*kind, self.pos)?.0),
            other => Err(Error::container_mismatch(format!(
                "{} is not a basic value",
                other.kind()
            ))),
        }
    }

    /// A cursor over the contents of the current container value: array
    /// elements, struct fields, dict-entry key and value, or the single
    /// value inside a variant.
    pub fn recurse_into(&self) -> Result<ReadCursor<'m, B>> {
        let node = self.require_current()?;
        if self.depth >= MAX_DEPTH {
            return Err(Error::DepthLimitExceeded {
                path: CodingPath::root(),
                limit: MAX_DEPTH,
            });
        }

        let (pos, scope) = match node {
            TypeNode::Basic(kind) => {
                return Err(Error::container_mismatch(format!(
                    "cannot recurse into {}",
                    kind
                )))
            }
            TypeNode::Array(element) => {
                let (len, after) = self.read_fixed::<u32>(self.pos)?;
                let len = len as usize;
                if len > MAX_ARRAY_LEN {
                    return Err(Error::corrupted(
                        self.pos,
                        format!("array length {} exceeds 64 MiB", len),
                    ));
                }
                self.message.read_raw(after, 0, element.alignment())?;
                let start = align(after, element.alignment());
                let end = start + len;
                if end > self.message.body().len() {
                    return Err(Error::corrupted(
                        self.pos,
                        format!(
                            "array of {} bytes runs past the end of the body",
                            len
                        ),
                    ));
                }
                let element = (**element).clone();
                (start, Scope::Elements { element, end })
            }
            TypeNode::Struct(_) | TypeNode::DictEntry(_) => {
                self.message.read_raw(self.pos, 0, 8)?;
                let types = node.children().to_vec();
                (align(self.pos, 8), Scope::Fields { types, index: 0 })
            }
            TypeNode::Variant => {
                let (signature, after) = self.read_basic_at(BasicKind::Signature, self.pos)?;
                let text = signature.as_str().unwrap_or_default();
                let inner = TypeSignature::parse_single(text).map_err(|e| {
                    Error::corrupted(self.pos, format!("bad variant signature: {}", e))
                })?;
                (
                    after,
                    Scope::Fields {
                        types: vec![inner],
                        index: 0,
                    },
                )
            }
        };

        Ok(ReadCursor {
            message: self.message,
            pos,
            scope,
            depth: self.depth + 1,
            phantom: PhantomData,
        })
    }

    // Body offset just past the current value.
    fn current_end(&self) -> Result<usize> {
        if let TypeNode::Basic(kind) = self.require_current()? {
            return Ok(self.read_basic_at(*kind, self.pos)?.1);
        }
        let mut inner = self.recurse_into()?;
        if let Scope::Elements { end, .. } = inner.scope {
            return Ok(end);
        }
        while inner.advance()? {}
        Ok(inner.pos)
    }

    /// Skips the current value. Returns whether another value follows at
    /// this level; when it does not, the position is just past the last
    /// value.
    pub fn advance(&mut self) -> Result<bool> {
        if !self.has_current() {
            return Ok(false);
        }
        self.pos = self.current_end()?;
        match &mut self.scope {
            Scope::Fields { types, index } => {
                *index += 1;
                Ok(*index < types.len())
            }
            Scope::Elements { end, .. } => {
                if self.pos > *end {
                    return Err(Error::corrupted(
                        self.pos,
                        format!("array element overruns the array ending at {}", end),
                    ));
                }
                Ok(self.pos < *end)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppendCursor, ContainerKind, ReadCursor};
    use crate::error::{Error, Result};
    use crate::message::{Endianness, Message, MessageKind};
    use crate::signature::{BasicKind, TypeKind, TypeNode};
    use crate::value::BasicValue;
    use byteorder::{BE, LE};
    use test_log::test;

    fn string_type() -> TypeNode {
        TypeNode::Basic(BasicKind::String)
    }

    #[test]
    fn basic_append() -> Result<()> {
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        cursor.append_basic(&BasicValue::Int32(37))?;
        cursor.append_basic(&BasicValue::Byte(1))?;
        cursor.append_basic(&BasicValue::UInt16(2))?;
        cursor.finish()?;
        assert_eq!(mesg.signature(), "iyq");
        assert_eq!(mesg.body(), &[37, 0, 0, 0, 1, 0, 2, 0]);
        Ok(())
    }

    #[test]
    fn string_array() -> Result<()> {
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        cursor.with_container(ContainerKind::Array, Some(&string_type()), |c| {
            c.append_basic(&BasicValue::from("Foo"))?;
            c.append_basic(&BasicValue::from("Bar"))
        })?;
        cursor.finish()?;
        assert_eq!(mesg.signature(), "as");
        assert_eq!(
            mesg.body(),
            &[
                16, 0, 0, 0, // array length
                3, 0, 0, 0, b'F', b'o', b'o', 0, // "Foo"
                3, 0, 0, 0, b'B', b'a', b'r', 0, // "Bar"
            ]
        );

        let cursor = ReadCursor::<LE>::new(&mesg)?;
        assert_eq!(cursor.current_wire_type(), Some(TypeKind::Array));
        assert_eq!(cursor.field_count(), Some(1));
        let mut elements = cursor.recurse_into()?;
        assert_eq!(elements.field_count(), None);
        assert_eq!(elements.get_basic()?, BasicValue::from("Foo"));
        assert!(elements.advance()?);
        assert_eq!(elements.get_basic()?, BasicValue::from("Bar"));
        assert!(!elements.advance()?);
        assert!(!elements.has_current());
        Ok(())
    }

    #[test]
    fn empty_array_keeps_element_padding() -> Result<()> {
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        cursor.append_basic(&BasicValue::Byte(9))?;
        cursor.with_container(
            ContainerKind::Array,
            Some(&TypeNode::Basic(BasicKind::Int64)),
            |_| Ok(()),
        )?;
        cursor.finish()?;
        assert_eq!(mesg.signature(), "yax");
        assert_eq!(mesg.body(), &[9, 0, 0, 0, 0, 0, 0, 0]);

        let mut cursor = ReadCursor::<LE>::new(&mesg)?;
        assert!(cursor.advance()?);
        assert!(!cursor.recurse_into()?.has_current());
        assert!(!cursor.advance()?);
        assert_eq!(cursor.position(), 8);
        Ok(())
    }

    #[test]
    fn variant_contents() -> Result<()> {
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        cursor.with_container(
            ContainerKind::Variant,
            Some(&TypeNode::Basic(BasicKind::Int32)),
            |c| c.append_basic(&BasicValue::Int32(5)),
        )?;
        cursor.finish()?;
        assert_eq!(mesg.signature(), "v");
        assert_eq!(mesg.body(), &[1, b'i', 0, 0, 5, 0, 0, 0]);

        let cursor = ReadCursor::<LE>::new(&mesg)?;
        let inner = cursor.recurse_into()?;
        assert_eq!(inner.current_type(), Some(&TypeNode::Basic(BasicKind::Int32)));
        assert_eq!(inner.get_basic()?, BasicValue::Int32(5));
        Ok(())
    }

    #[test]
    fn appends_are_type_checked() -> Result<()> {
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        let handle = cursor.open_container(
            ContainerKind::Array,
            Some(&TypeNode::Basic(BasicKind::Int32)),
        )?;
        assert!(matches!(
            cursor.append_basic(&BasicValue::from("nope")),
            Err(Error::TypeMismatch { .. })
        ));
        drop(handle);
        drop(cursor);
        assert!(mesg.is_abandoned());
        Ok(())
    }

    #[test]
    fn variant_holds_one_value() -> Result<()> {
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        let result = cursor.with_container(
            ContainerKind::Variant,
            Some(&TypeNode::Basic(BasicKind::Byte)),
            |c| {
                c.append_basic(&BasicValue::Byte(1))?;
                c.append_basic(&BasicValue::Byte(2))
            },
        );
        assert!(matches!(result, Err(Error::ContainerMismatch { .. })));
        assert_eq!(cursor.depth(), 0);
        drop(cursor);
        assert!(mesg.is_abandoned());
        Ok(())
    }

    #[test]
    fn out_of_order_close() -> Result<()> {
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        let outer = cursor.open_container(ContainerKind::Struct, None)?;
        let _inner = cursor.open_container(ContainerKind::Array, Some(&string_type()))?;
        assert!(matches!(
            cursor.close_container(outer),
            Err(Error::ContainerMismatch { .. })
        ));
        assert!(matches!(cursor.finish(), Err(Error::ContainerMismatch { .. })));
        assert!(mesg.is_abandoned());
        Ok(())
    }

    #[test]
    fn dict_entries_only_inside_arrays() -> Result<()> {
        let mut mesg = Message::default();
        let mut cursor = AppendCursor::<LE>::new(&mut mesg);
        assert!(matches!(
            cursor.open_container(ContainerKind::DictEntry, None),
            Err(Error::ContainerMismatch { .. })
        ));
        assert!(matches!(
            cursor.open_container(ContainerKind::Variant, None),
            Err(Error::ContainerMismatch { .. })
        ));
        cursor.finish()?;
        assert!(!mesg.is_abandoned());
        Ok(())
    }

    #[test]
    fn big_endian_body() -> Result<()> {
        let mut mesg = Message::with_endianness(MessageKind::Signal, Endianness::Big);
        let mut cursor = AppendCursor::<BE>::new(&mut mesg);
        cursor.append_basic(&BasicValue::UInt32(0x0102_0304))?;
        cursor.append_basic(&BasicValue::Boolean(true))?;
        cursor.finish()?;
        assert_eq!(mesg.body(), &[1, 2, 3, 4, 0, 0, 0, 1]);

        let mut cursor = ReadCursor::<BE>::new(&mesg)?;
        assert_eq!(cursor.get_basic()?, BasicValue::UInt32(0x0102_0304));
        assert!(cursor.advance()?);
        assert_eq!(cursor.get_basic()?, BasicValue::Boolean(true));
        Ok(())
    }

    #[test]
    fn corrupted_reads() -> Result<()> {
        let bad_bool = Message::from_parts(
            MessageKind::MethodCall,
            Endianness::Little,
            "b",
            vec![2, 0, 0, 0],
        );
        assert!(matches!(
            ReadCursor::<LE>::new(&bad_bool)?.get_basic(),
            Err(Error::DataCorrupted { .. })
        ));

        let no_nul = Message::from_parts(
            MessageKind::MethodCall,
            Endianness::Little,
            "s",
            vec![1, 0, 0, 0, b'a', b'b'],
        );
        assert!(matches!(
            ReadCursor::<LE>::new(&no_nul)?.get_basic(),
            Err(Error::DataCorrupted { .. })
        ));

        let long_array = Message::from_parts(
            MessageKind::MethodCall,
            Endianness::Little,
            "ay",
            vec![200, 0, 0, 0, 1, 2],
        );
        assert!(matches!(
            ReadCursor::<LE>::new(&long_array)?.recurse_into(),
            Err(Error::DataCorrupted { .. })
        ));

        let bad_path = Message::from_parts(
            MessageKind::MethodCall,
            Endianness::Little,
            "o",
            vec![2, 0, 0, 0, b'a', b'b', 0],
        );
        assert!(matches!(
            ReadCursor::<LE>::new(&bad_path)?.get_basic(),
            Err(Error::DataCorrupted { .. })
        ));
        Ok(())
    }
}
