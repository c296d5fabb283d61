//! The DBus type signature grammar.
//!
//! A signature such as `a{sv}` or `(ixs)` is parsed once, up front, into a
//! [`TypeSignature`]: an immutable sequence of [`TypeNode`] trees. Parsing
//! either validates the whole string or fails; there are no partial
//! results. [`SignatureIter`] then walks the tree the way the encoder and
//! decoder need to: look at the current type, step into a container,
//! move on to the next sibling.

use std::fmt::{self, Display};
use std::slice;
use std::str::FromStr;

use crate::error::{Error, Result, SignatureProblem};

/// Longest signature the wire format can carry (it has a one-byte length).
pub const MAX_SIGNATURE_LEN: usize = 255;

/// Maximum nesting of arrays within one signature.
pub const MAX_ARRAY_DEPTH: usize = 32;

/// Maximum nesting of structs and dict-entries within one signature.
pub const MAX_STRUCT_DEPTH: usize = 32;

/// Maximum number of containers (including variants) a value may be
/// nested in, counted from the top-level argument.
pub const MAX_DEPTH: usize = MAX_ARRAY_DEPTH + MAX_STRUCT_DEPTH;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BasicKind {
    Byte,
    Boolean,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    UnixFd,
    String,
    ObjectPath,
    Signature,
}

impl BasicKind {
    pub fn code(self) -> u8 {
        match self {
            BasicKind::Byte => b'y',
            BasicKind::Boolean => b'b',
            BasicKind::Int16 => b'n',
            BasicKind::UInt16 => b'q',
            BasicKind::Int32 => b'i',
            BasicKind::UInt32 => b'u',
            BasicKind::Int64 => b'x',
            BasicKind::UInt64 => b't',
            BasicKind::Double => b'd',
            BasicKind::UnixFd => b'h',
            BasicKind::String => b's',
            BasicKind::ObjectPath => b'o',
            BasicKind::Signature => b'g',
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        let kind = match code {
            b'y' => BasicKind::Byte,
            b'b' => BasicKind::Boolean,
            b'n' => BasicKind::Int16,
            b'q' => BasicKind::UInt16,
            b'i' => BasicKind::Int32,
            b'u' => BasicKind::UInt32,
            b'x' => BasicKind::Int64,
            b't' => BasicKind::UInt64,
            b'd' => BasicKind::Double,
            b'h' => BasicKind::UnixFd,
            b's' => BasicKind::String,
            b'o' => BasicKind::ObjectPath,
            b'g' => BasicKind::Signature,
            _ => return None,
        };
        Some(kind)
    }

    pub fn alignment(self) -> usize {
        match self {
            BasicKind::Byte | BasicKind::Signature => 1,
            BasicKind::Int16 | BasicKind::UInt16 => 2,
            BasicKind::Boolean
            | BasicKind::Int32
            | BasicKind::UInt32
            | BasicKind::UnixFd
            | BasicKind::String
            | BasicKind::ObjectPath => 4,
            BasicKind::Int64 | BasicKind::UInt64 | BasicKind::Double => 8,
        }
    }

    /// Size on the wire, for kinds that do not carry a length prefix.
    pub fn fixed_size(self) -> Option<usize> {
        match self {
            BasicKind::String | BasicKind::ObjectPath | BasicKind::Signature => None,
            fixed => Some(fixed.alignment()),
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            BasicKind::Byte
                | BasicKind::Int16
                | BasicKind::UInt16
                | BasicKind::Int32
                | BasicKind::UInt32
                | BasicKind::Int64
                | BasicKind::UInt64
                | BasicKind::UnixFd
        )
    }

    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            BasicKind::String | BasicKind::ObjectPath | BasicKind::Signature
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Byte => "byte",
            BasicKind::Boolean => "boolean",
            BasicKind::Int16 => "int16",
            BasicKind::UInt16 => "uint16",
            BasicKind::Int32 => "int32",
            BasicKind::UInt32 => "uint32",
            BasicKind::Int64 => "int64",
            BasicKind::UInt64 => "uint64",
            BasicKind::Double => "double",
            BasicKind::UnixFd => "unix fd",
            BasicKind::String => "string",
            BasicKind::ObjectPath => "object path",
            BasicKind::Signature => "signature",
        }
    }
}

impl Display for BasicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The flat tag of a [`TypeNode`], without its contents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Basic(BasicKind),
    Array,
    Struct,
    DictEntry,
    Variant,
}

impl TypeKind {
    pub fn is_container(self) -> bool {
        !matches!(self, TypeKind::Basic(_))
    }
}

impl Display for TypeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeKind::Basic(kind) => Display::fmt(kind, f),
            TypeKind::Array => f.write_str("array"),
            TypeKind::Struct => f.write_str("struct"),
            TypeKind::DictEntry => f.write_str("dict-entry"),
            TypeKind::Variant => f.write_str("variant"),
        }
    }
}

/// One complete type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeNode {
    Basic(BasicKind),
    Array(Box<TypeNode>),
    Struct(Vec<TypeNode>),
    /// Key and value. The key is always `Basic`.
    DictEntry(Box<[TypeNode; 2]>),
    Variant,
}

impl TypeNode {
    pub fn array(element: TypeNode) -> Self {
        TypeNode::Array(Box::new(element))
    }

    /// `a{kv}`: an array of dict-entries.
    pub fn dict(key: BasicKind, value: TypeNode) -> Self {
        TypeNode::array(TypeNode::DictEntry(Box::new([TypeNode::Basic(key), value])))
    }

    pub fn kind(&self) -> TypeKind {
        match self {
            TypeNode::Basic(kind) => TypeKind::Basic(*kind),
            TypeNode::Array(_) => TypeKind::Array,
            TypeNode::Struct(_) => TypeKind::Struct,
            TypeNode::DictEntry(_) => TypeKind::DictEntry,
            TypeNode::Variant => TypeKind::Variant,
        }
    }

    pub fn alignment(&self) -> usize {
        match self {
            TypeNode::Basic(kind) => kind.alignment(),
            TypeNode::Array(_) => 4,
            TypeNode::Struct(_) | TypeNode::DictEntry(_) => 8,
            TypeNode::Variant => 1,
        }
    }

    /// The nodes one level down: the element of an array, the fields of a
    /// struct, key and value of a dict-entry. Empty for everything else.
    pub fn children(&self) -> &[TypeNode] {
        match self {
            TypeNode::Array(element) => slice::from_ref(&**element),
            TypeNode::Struct(fields) => fields,
            TypeNode::DictEntry(entry) => &entry[..],
            TypeNode::Basic(_) | TypeNode::Variant => &[],
        }
    }

    /// For an `a{..}` node, the key kind and value type.
    pub fn dict_types(&self) -> Option<(BasicKind, &TypeNode)> {
        match self {
            TypeNode::Array(element) => match &**element {
                TypeNode::DictEntry(entry) => match &entry[0] {
                    TypeNode::Basic(key) => Some((*key, &entry[1])),
                    _ => None,
                },
                _ => None,
            },
            _ => None,
        }
    }

    fn write_signature(&self, out: &mut String) {
        match self {
            TypeNode::Basic(kind) => out.push(char::from(kind.code())),
            TypeNode::Array(element) => {
                out.push('a');
                element.write_signature(out);
            }
            TypeNode::Struct(fields) => {
                out.push('(');
                for field in fields {
                    field.write_signature(out);
                }
                out.push(')');
            }
            TypeNode::DictEntry(entry) => {
                out.push('{');
                entry[0].write_signature(out);
                entry[1].write_signature(out);
                out.push('}');
            }
            TypeNode::Variant => out.push('v'),
        }
    }

    pub fn signature(&self) -> String {
        let mut out = String::new();
        self.write_signature(&mut out);
        out
    }

    /// How deeply arrays and structs nest within this type, counting
    /// dict-entries as structs.
    pub fn nesting(&self) -> (usize, usize) {
        match self {
            TypeNode::Basic(_) | TypeNode::Variant => (0, 0),
            TypeNode::Array(element) => {
                let (arrays, structs) = element.nesting();
                (arrays + 1, structs)
            }
            TypeNode::Struct(_) | TypeNode::DictEntry(_) => {
                let (arrays, structs) = self
                    .children()
                    .iter()
                    .map(TypeNode::nesting)
                    .fold((0, 0), |(a, s), (ca, cs)| (a.max(ca), s.max(cs)));
                (arrays, structs + 1)
            }
        }
    }

    fn signature_len(&self) -> usize {
        match self {
            TypeNode::Basic(_) | TypeNode::Variant => 1,
            TypeNode::Array(element) => 1 + element.signature_len(),
            TypeNode::Struct(_) | TypeNode::DictEntry(_) => {
                2 + self.children().iter().map(TypeNode::signature_len).sum::<usize>()
            }
        }
    }

    /// Checks a type built in code against the nesting and length limits
    /// that parsing enforces.
    pub fn check_limits(&self) -> Result<()> {
        let (arrays, structs) = self.nesting();
        let len = self.signature_len();
        let problem = if arrays > MAX_ARRAY_DEPTH || structs > MAX_STRUCT_DEPTH {
            SignatureProblem::TooDeep
        } else if len > MAX_SIGNATURE_LEN {
            SignatureProblem::TooLong(len)
        } else {
            return Ok(());
        };
        Err(Error::Signature {
            signature: self.signature(),
            offset: 0,
            problem,
        })
    }
}

impl Display for TypeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.signature())
    }
}

/// A validated signature: zero or more complete types.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TypeSignature {
    nodes: Vec<TypeNode>,
}

impl TypeSignature {
    pub fn parse(signature: &str) -> Result<Self> {
        if signature.len() > MAX_SIGNATURE_LEN {
            return Err(Error::Signature {
                signature: signature.to_owned(),
                offset: MAX_SIGNATURE_LEN,
                problem: SignatureProblem::TooLong(signature.len()),
            });
        }

        let mut parser = Parser {
            source: signature,
            bytes: signature.as_bytes(),
            pos: 0,
        };
        let mut nodes = Vec::new();
        while parser.pos < parser.bytes.len() {
            nodes.push(parser.parse_type(0, 0)?);
        }
        Ok(TypeSignature { nodes })
    }

    /// Parses a signature that must hold exactly one complete type, as the
    /// contents of a variant do.
    pub fn parse_single(signature: &str) -> Result<TypeNode> {
        let mut parsed = Self::parse(signature)?;
        if parsed.nodes.len() != 1 {
            return Err(Error::Signature {
                signature: signature.to_owned(),
                offset: 0,
                problem: SignatureProblem::NotSingleType(parsed.nodes.len()),
            });
        }
        Ok(parsed.nodes.remove(0))
    }

    pub fn nodes(&self) -> &[TypeNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> SignatureIter<'_> {
        SignatureIter::new(&self.nodes)
    }
}

impl Display for TypeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in &self.nodes {
            Display::fmt(node, f)?;
        }
        Ok(())
    }
}

impl FromStr for TypeSignature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

struct Parser<'s> {
    source: &'s str,
    bytes: &'s [u8],
    pos: usize,
}

impl<'s> Parser<'s> {
    fn error(&self, offset: usize, problem: SignatureProblem) -> Error {
        Error::Signature {
            signature: self.source.to_owned(),
            offset,
            problem,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn parse_type(&mut self, arrays: usize, structs: usize) -> Result<TypeNode> {
        let offset = self.pos;
        let code = match self.peek() {
            Some(code) => code,
            None => return Err(self.error(offset, SignatureProblem::MissingArrayElement)),
        };
        self.pos += 1;

        if let Some(kind) = BasicKind::from_code(code) {
            return Ok(TypeNode::Basic(kind));
        }

        match code {
            b'v' => Ok(TypeNode::Variant),
            b'a' => {
                if arrays + 1 > MAX_ARRAY_DEPTH {
                    return Err(self.error(offset, SignatureProblem::TooDeep));
                }
                match self.peek() {
                    None | Some(b')') | Some(b'}') => {
                        Err(self.error(offset, SignatureProblem::MissingArrayElement))
                    }
                    Some(b'{') => self.parse_dict_entry(arrays + 1, structs),
                    Some(_) => Ok(TypeNode::array(self.parse_type(arrays + 1, structs)?)),
                }
            }
            b'(' => {
                if structs + 1 > MAX_STRUCT_DEPTH {
                    return Err(self.error(offset, SignatureProblem::TooDeep));
                }
                let mut fields = Vec::new();
                loop {
                    match self.peek() {
                        None => return Err(self.error(offset, SignatureProblem::UnbalancedStruct)),
                        Some(b')') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => fields.push(self.parse_type(arrays, structs + 1)?),
                    }
                }
                if fields.is_empty() {
                    return Err(self.error(offset, SignatureProblem::EmptyStruct));
                }
                Ok(TypeNode::Struct(fields))
            }
            b'{' => Err(self.error(offset, SignatureProblem::DictEntryOutsideArray)),
            b')' => Err(self.error(offset, SignatureProblem::UnbalancedStruct)),
            b'}' => Err(self.error(offset, SignatureProblem::UnbalancedDictEntry)),
            other => Err(self.error(
                offset,
                SignatureProblem::UnknownTypeCode(char::from(other)),
            )),
        }
    }

    // Called with `pos` on the '{' of an `a{..}`.
    fn parse_dict_entry(&mut self, arrays: usize, structs: usize) -> Result<TypeNode> {
        let offset = self.pos;
        self.pos += 1;
        if structs + 1 > MAX_STRUCT_DEPTH {
            return Err(self.error(offset, SignatureProblem::TooDeep));
        }

        let key = match self.peek() {
            None => return Err(self.error(offset, SignatureProblem::UnbalancedDictEntry)),
            Some(b'}') => return Err(self.error(self.pos, SignatureProblem::DictEntryArity)),
            Some(code) => match BasicKind::from_code(code) {
                Some(kind) => {
                    self.pos += 1;
                    kind
                }
                None => return Err(self.error(self.pos, SignatureProblem::NonBasicDictKey)),
            },
        };

        let value = match self.peek() {
            None => return Err(self.error(offset, SignatureProblem::UnbalancedDictEntry)),
            Some(b'}') => return Err(self.error(self.pos, SignatureProblem::DictEntryArity)),
            Some(_) => self.parse_type(arrays, structs + 1)?,
        };

        match self.peek() {
            Some(b'}') => self.pos += 1,
            None => return Err(self.error(offset, SignatureProblem::UnbalancedDictEntry)),
            Some(_) => return Err(self.error(self.pos, SignatureProblem::DictEntryArity)),
        }

        Ok(TypeNode::dict(key, value))
    }
}

/// Stateful walk over a run of sibling types.
///
/// Created by [`TypeSignature::iter`] for the top-level types, or by
/// [`SignatureIter::recurse`] for the contents of a container.
#[derive(Clone, Debug)]
pub struct SignatureIter<'s> {
    nodes: &'s [TypeNode],
    index: usize,
}

impl<'s> SignatureIter<'s> {
    pub fn new(nodes: &'s [TypeNode]) -> Self {
        SignatureIter { nodes, index: 0 }
    }

    pub fn current_type(&self) -> Option<&'s TypeNode> {
        self.nodes.get(self.index)
    }

    /// Signature text of the current type, empty when exhausted.
    pub fn signature(&self) -> String {
        self.current_type()
            .map(TypeNode::signature)
            .unwrap_or_default()
    }

    /// The element type of the current array.
    pub fn element_type(&self) -> Result<&'s TypeNode> {
        match self.current_type() {
            Some(TypeNode::Array(element)) => Ok(&**element),
            Some(other) => Err(Error::container_mismatch(format!(
                "element type requested for non-array {}",
                other.kind()
            ))),
            None => Err(Error::container_mismatch("signature exhausted")),
        }
    }

    /// Steps into the current container type.
    ///
    /// A bare `v` has no statically known contents, so recursing into it
    /// fails just like recursing into a basic type does.
    pub fn recurse(&self) -> Result<SignatureIter<'s>> {
        let node = self
            .current_type()
            .ok_or_else(|| Error::container_mismatch("signature exhausted"))?;
        match node {
            TypeNode::Array(_) | TypeNode::Struct(_) | TypeNode::DictEntry(_) => {
                Ok(SignatureIter::new(node.children()))
            }
            TypeNode::Basic(_) | TypeNode::Variant => Err(Error::container_mismatch(format!(
                "cannot recurse into {}",
                node.kind()
            ))),
        }
    }

    /// Moves to the next sibling. Returns false, without moving, when
    /// there is none.
    pub fn advance(&mut self) -> bool {
        if self.index + 1 < self.nodes.len() {
            self.index += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BasicKind, TypeKind, TypeNode, TypeSignature, MAX_SIGNATURE_LEN};
    use crate::error::{Error, Result, SignatureProblem};
    use test_log::test;

    fn problem(signature: &str) -> SignatureProblem {
        match TypeSignature::parse(signature) {
            Err(Error::Signature { problem, .. }) => problem,
            other => panic!("expected signature error for {:?}, got {:?}", signature, other),
        }
    }

    #[test]
    fn single_string() -> Result<()> {
        let sig = TypeSignature::parse("s")?;
        let mut iter = sig.iter();
        assert_eq!(iter.current_type(), Some(&TypeNode::Basic(BasicKind::String)));
        assert!(!iter.advance());
        Ok(())
    }

    #[test]
    fn array_walk() -> Result<()> {
        let sig = TypeSignature::parse("as")?;
        let mut iter = sig.iter();
        assert_eq!(iter.current_type().map(TypeNode::kind), Some(TypeKind::Array));
        assert_eq!(iter.element_type()?, &TypeNode::Basic(BasicKind::String));
        let mut sub = iter.recurse()?;
        assert_eq!(sub.current_type(), Some(&TypeNode::Basic(BasicKind::String)));
        assert!(!sub.advance());
        assert!(!iter.advance());
        Ok(())
    }

    #[test]
    fn dictionary_walk() -> Result<()> {
        let sig = TypeSignature::parse("a{sv}")?;
        let mut iter = sig.iter();
        assert_eq!(iter.current_type().map(TypeNode::kind), Some(TypeKind::Array));

        let mut entries = iter.recurse()?;
        assert_eq!(
            entries.current_type().map(TypeNode::kind),
            Some(TypeKind::DictEntry)
        );

        let mut entry = entries.recurse()?;
        assert_eq!(entry.current_type(), Some(&TypeNode::Basic(BasicKind::String)));
        assert!(entry.advance());
        assert_eq!(entry.current_type(), Some(&TypeNode::Variant));
        assert!(!entry.advance());
        assert!(!entries.advance());
        assert!(!iter.advance());

        assert_eq!(TypeSignature::parse("a{sv}")?, sig);
        assert_eq!(sig.to_string(), "a{sv}");
        Ok(())
    }

    #[test]
    fn render_matches_source() -> Result<()> {
        for text in &["", "y", "(sd(sd))", "aa{t(ov)}", "a{oa{sa{sv}}}", "hgb"] {
            assert_eq!(&TypeSignature::parse(text)?.to_string(), text);
        }
        Ok(())
    }

    #[test]
    fn top_level_siblings() -> Result<()> {
        let sig = TypeSignature::parse("ia(ss)v")?;
        assert_eq!(sig.len(), 3);
        let mut iter = sig.iter();
        assert!(iter.advance());
        assert_eq!(iter.signature(), "a(ss)");
        assert!(iter.advance());
        assert_eq!(iter.current_type(), Some(&TypeNode::Variant));
        assert!(!iter.advance());
        Ok(())
    }

    #[test]
    fn recurse_into_non_container() -> Result<()> {
        let sig = TypeSignature::parse("iv")?;
        let mut iter = sig.iter();
        assert!(matches!(iter.recurse(), Err(Error::ContainerMismatch { .. })));
        assert!(matches!(iter.element_type(), Err(Error::ContainerMismatch { .. })));
        assert!(iter.advance());
        assert!(matches!(iter.recurse(), Err(Error::ContainerMismatch { .. })));
        Ok(())
    }

    #[test]
    fn malformed_signatures() {
        assert_eq!(problem("z"), SignatureProblem::UnknownTypeCode('z'));
        assert_eq!(problem("(ii"), SignatureProblem::UnbalancedStruct);
        assert_eq!(problem("ii)"), SignatureProblem::UnbalancedStruct);
        assert_eq!(problem("a{si"), SignatureProblem::UnbalancedDictEntry);
        assert_eq!(problem("{si}"), SignatureProblem::DictEntryOutsideArray);
        assert_eq!(problem("a{vs}"), SignatureProblem::NonBasicDictKey);
        assert_eq!(problem("a{(i)s}"), SignatureProblem::NonBasicDictKey);
        assert_eq!(problem("a{s}"), SignatureProblem::DictEntryArity);
        assert_eq!(problem("a{sii}"), SignatureProblem::DictEntryArity);
        assert_eq!(problem("()"), SignatureProblem::EmptyStruct);
        assert_eq!(problem("a"), SignatureProblem::MissingArrayElement);
        assert_eq!(problem("(a)"), SignatureProblem::MissingArrayElement);
    }

    #[test]
    fn depth_and_length_limits() -> Result<()> {
        let ok_arrays = format!("{}y", "a".repeat(32));
        TypeSignature::parse(&ok_arrays)?;
        let deep_arrays = format!("{}y", "a".repeat(33));
        assert_eq!(problem(&deep_arrays), SignatureProblem::TooDeep);

        let ok_structs = format!("{}y{}", "(".repeat(32), ")".repeat(32));
        TypeSignature::parse(&ok_structs)?;
        let deep_structs = format!("{}y{}", "(".repeat(33), ")".repeat(33));
        assert_eq!(problem(&deep_structs), SignatureProblem::TooDeep);

        let long = "y".repeat(MAX_SIGNATURE_LEN + 1);
        assert_eq!(problem(&long), SignatureProblem::TooLong(MAX_SIGNATURE_LEN + 1));
        Ok(())
    }

    #[test]
    fn built_types_obey_the_limits() -> Result<()> {
        let mut node = TypeNode::Basic(BasicKind::Byte);
        for _ in 0..32 {
            node = TypeNode::array(node);
        }
        assert_eq!(node.nesting(), (32, 0));
        node.check_limits()?;
        let too_deep = TypeNode::array(node);
        match too_deep.check_limits() {
            Err(Error::Signature { problem, .. }) => assert_eq!(problem, SignatureProblem::TooDeep),
            other => panic!("unexpected {:?}", other),
        }

        let entry = TypeNode::dict(BasicKind::String, TypeNode::Struct(vec![TypeNode::Variant]));
        assert_eq!(entry.nesting(), (1, 2));

        let wide = TypeNode::Struct(vec![TypeNode::Basic(BasicKind::Int32); 254]);
        match wide.check_limits() {
            Err(Error::Signature { problem, .. }) => {
                assert_eq!(problem, SignatureProblem::TooLong(256))
            }
            other => panic!("unexpected {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn single_type() -> Result<()> {
        assert_eq!(
            TypeSignature::parse_single("a{sv}")?,
            TypeNode::dict(BasicKind::String, TypeNode::Variant)
        );
        assert!(matches!(
            TypeSignature::parse_single("ii"),
            Err(Error::Signature {
                problem: SignatureProblem::NotSingleType(2),
                ..
            })
        ));
        Ok(())
    }
}
