//! Restriction expression trees for filtered table loading.

use crate::buffer::IoBuffer;
use crate::error::ProtocolError;
use crate::propval::TaggedPropval;

/// Comparison operators used by restrictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RestrictOp {
    Lt = 0x00,
    Le = 0x01,
    Gt = 0x02,
    Ge = 0x03,
    Eq = 0x04,
    Ne = 0x05,
}

/// Match precision for CONTENT restrictions.
///
/// One of the low-word values, optionally combined with the high-word flags.
pub struct FuzzyLevel;

impl FuzzyLevel {
    pub const FULLSTRING: u32 = 0;
    pub const SUBSTRING: u32 = 1;
    pub const PREFIX: u32 = 2;
    pub const IGNORECASE: u32 = 1 << 16;
    pub const IGNORENONSPACE: u32 = 1 << 17;
    pub const LOOSE: u32 = 1 << 18;
}

mod type_code {
    pub const AND: u8 = 0x00;
    pub const OR: u8 = 0x01;
    pub const NOT: u8 = 0x02;
    pub const CONTENT: u8 = 0x03;
    pub const PROPERTY: u8 = 0x04;
    pub const PROPCOMP: u8 = 0x05;
    pub const BITMASK: u8 = 0x06;
    pub const SIZE: u8 = 0x07;
    pub const EXIST: u8 = 0x08;
    pub const SUBRES: u8 = 0x09;
    pub const COMMENT: u8 = 0x0a;
    pub const COUNT: u8 = 0x0b;
}

/// Server-side filter applied when loading a table.
///
/// [`Restriction::Null`] is a virtual "no filter" marker that serializes to
/// nothing; request writers emit a presence byte before the tree.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Restriction<'a> {
    /// Matches iff all sub-restrictions match.
    And(Vec<Restriction<'a>>),
    /// Matches iff at least one sub-restriction matches.
    Or(Vec<Restriction<'a>>),
    /// Matches iff the sub-restriction does not match.
    Not(Box<Restriction<'a>>),
    /// String match against a property, with configurable precision.
    Content {
        fuzzy_level: u32,
        proptag: u32,
        propval: TaggedPropval<'a>,
    },
    /// Compares a property against a fixed value.
    Property {
        op: RestrictOp,
        proptag: u32,
        propval: TaggedPropval<'a>,
    },
    /// Compares two properties against each other.
    PropCompare {
        op: RestrictOp,
        proptag1: u32,
        proptag2: u32,
    },
    /// Tests bits of a 32-bit property.
    Bitmask {
        all: bool,
        proptag: u32,
        mask: u32,
    },
    /// Compares the stored size of a property.
    Size {
        op: RestrictOp,
        proptag: u32,
        size: u32,
    },
    /// Matches iff the property exists.
    Exist { proptag: u32 },
    /// Applies a restriction to a subobject (recipients, attachments).
    Sub {
        subobject: u32,
        res: Box<Restriction<'a>>,
    },
    /// Carries arbitrary metadata propvals plus an optional restriction.
    Comment {
        propvals: Vec<TaggedPropval<'a>>,
        res: Option<Box<Restriction<'a>>>,
    },
    /// Matches the sub-restriction at most `count` times.
    Count {
        count: u32,
        res: Box<Restriction<'a>>,
    },
    /// No filter; never serialized.
    #[default]
    Null,
}

impl<'a> Restriction<'a> {
    pub fn and(elements: Vec<Restriction<'a>>) -> Self {
        Restriction::And(elements)
    }

    pub fn or(elements: Vec<Restriction<'a>>) -> Self {
        Restriction::Or(elements)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(res: Restriction<'a>) -> Self {
        Restriction::Not(Box::new(res))
    }

    /// CONTENT restriction; a zero `proptag` is substituted by the propval's
    /// own tag.
    pub fn content(fuzzy_level: u32, proptag: u32, propval: TaggedPropval<'a>) -> Self {
        Restriction::Content {
            fuzzy_level,
            proptag: if proptag != 0 { proptag } else { propval.tag() },
            propval,
        }
    }

    /// PROPERTY restriction; a zero `proptag` is substituted by the propval's
    /// own tag.
    pub fn property(op: RestrictOp, proptag: u32, propval: TaggedPropval<'a>) -> Self {
        Restriction::Property {
            op,
            proptag: if proptag != 0 { proptag } else { propval.tag() },
            propval,
        }
    }

    pub fn prop_compare(op: RestrictOp, proptag1: u32, proptag2: u32) -> Self {
        Restriction::PropCompare {
            op,
            proptag1,
            proptag2,
        }
    }

    pub fn bitmask(all: bool, proptag: u32, mask: u32) -> Self {
        Restriction::Bitmask { all, proptag, mask }
    }

    pub fn size(op: RestrictOp, proptag: u32, size: u32) -> Self {
        Restriction::Size { op, proptag, size }
    }

    pub fn exist(proptag: u32) -> Self {
        Restriction::Exist { proptag }
    }

    pub fn sub_object(subobject: u32, res: Restriction<'a>) -> Self {
        Restriction::Sub {
            subobject,
            res: Box::new(res),
        }
    }

    pub fn comment(propvals: Vec<TaggedPropval<'a>>, res: Option<Restriction<'a>>) -> Self {
        Restriction::Comment {
            propvals,
            res: res.map(Box::new),
        }
    }

    pub fn count(count: u32, res: Restriction<'a>) -> Self {
        Restriction::Count {
            count,
            res: Box::new(res),
        }
    }

    /// Whether the restriction is an actual filter.
    pub fn is_some(&self) -> bool {
        !matches!(self, Restriction::Null)
    }

    /// Writes the tagged tree. [`Restriction::Null`] produces no bytes.
    pub fn serialize(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        match self {
            Restriction::Null => Ok(()),
            Restriction::And(elements) | Restriction::Or(elements) => {
                buf.push_u8(if matches!(self, Restriction::And(_)) {
                    type_code::AND
                } else {
                    type_code::OR
                });
                if elements.len() > u32::MAX as usize {
                    return Err(ProtocolError::Serialization(format!(
                        "too many sub-restrictions ({})",
                        elements.len()
                    )));
                }
                buf.push_u32(elements.len() as u32);
                for res in elements {
                    res.serialize(buf)?;
                }
                Ok(())
            }
            Restriction::Not(res) => {
                buf.push_u8(type_code::NOT);
                res.serialize(buf)
            }
            Restriction::Content {
                fuzzy_level,
                proptag,
                propval,
            } => {
                buf.push_u8(type_code::CONTENT);
                buf.push_u32(*fuzzy_level);
                buf.push_u32(*proptag);
                propval.serialize(buf)
            }
            Restriction::Property {
                op,
                proptag,
                propval,
            } => {
                buf.push_u8(type_code::PROPERTY);
                buf.push_u8(*op as u8);
                buf.push_u32(*proptag);
                propval.serialize(buf)
            }
            Restriction::PropCompare {
                op,
                proptag1,
                proptag2,
            } => {
                buf.push_u8(type_code::PROPCOMP);
                buf.push_u8(*op as u8);
                buf.push_u32(*proptag1);
                buf.push_u32(*proptag2);
                Ok(())
            }
            Restriction::Bitmask { all, proptag, mask } => {
                buf.push_u8(type_code::BITMASK);
                // Wire semantics are inverted: 0 means "all bits".
                buf.push_u8(!*all as u8);
                buf.push_u32(*proptag);
                buf.push_u32(*mask);
                Ok(())
            }
            Restriction::Size { op, proptag, size } => {
                buf.push_u8(type_code::SIZE);
                buf.push_u8(*op as u8);
                buf.push_u32(*proptag);
                buf.push_u32(*size);
                Ok(())
            }
            Restriction::Exist { proptag } => {
                buf.push_u8(type_code::EXIST);
                buf.push_u32(*proptag);
                Ok(())
            }
            Restriction::Sub { subobject, res } => {
                buf.push_u8(type_code::SUBRES);
                buf.push_u32(*subobject);
                res.serialize(buf)
            }
            Restriction::Comment { propvals, res } => {
                buf.push_u8(type_code::COMMENT);
                if propvals.is_empty() || propvals.len() > 255 {
                    return Err(ProtocolError::Serialization(format!(
                        "invalid COMMENT restriction propval count {}",
                        propvals.len()
                    )));
                }
                buf.push_u8(propvals.len() as u8);
                for propval in propvals {
                    propval.serialize(buf)?;
                }
                match res {
                    Some(res) => {
                        buf.push_u8(1);
                        res.serialize(buf)
                    }
                    None => {
                        buf.push_u8(0);
                        Ok(())
                    }
                }
            }
            Restriction::Count { count, res } => {
                buf.push_u8(type_code::COUNT);
                buf.push_u32(*count);
                res.serialize(buf)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG_DISPLAYNAME: u32 = 0x3001_001f;
    const TAG_MESSAGECLASS: u32 = 0x001a_001f;

    fn serialized(res: &Restriction<'_>) -> Vec<u8> {
        let mut buf = IoBuffer::new();
        res.serialize(&mut buf).unwrap();
        buf.as_slice().to_vec()
    }

    fn name_filter(name: &str) -> Restriction<'_> {
        Restriction::property(
            RestrictOp::Eq,
            0,
            TaggedPropval::string(TAG_DISPLAYNAME, name).unwrap(),
        )
    }

    #[test]
    fn test_null_serializes_to_nothing() {
        assert!(serialized(&Restriction::Null).is_empty());
        assert!(!Restriction::Null.is_some());
    }

    #[test]
    fn test_property_wire_format() {
        let bytes = serialized(&name_filter("devicedata"));
        assert_eq!(bytes[0], 0x04);
        assert_eq!(bytes[1], RestrictOp::Eq as u8);
        assert_eq!(&bytes[2..6], &TAG_DISPLAYNAME.to_le_bytes());
        // tag again (from the propval), then the NUL-terminated string
        assert_eq!(&bytes[6..10], &TAG_DISPLAYNAME.to_le_bytes());
        assert_eq!(&bytes[10..], b"devicedata\0");
    }

    #[test]
    fn test_proptag_substitution() {
        let res = Restriction::content(
            FuzzyLevel::SUBSTRING | FuzzyLevel::IGNORECASE,
            0,
            TaggedPropval::string(TAG_DISPLAYNAME, "Sync").unwrap(),
        );
        let Restriction::Content { proptag, .. } = res else {
            panic!("expected CONTENT");
        };
        assert_eq!(proptag, TAG_DISPLAYNAME);
    }

    #[test]
    fn test_content_wire_format() {
        let res = Restriction::content(
            FuzzyLevel::PREFIX,
            0,
            TaggedPropval::string(TAG_DISPLAYNAME, "a").unwrap(),
        );
        let bytes = serialized(&res);
        assert_eq!(bytes[0], 0x03);
        assert_eq!(&bytes[1..5], &2u32.to_le_bytes());
        assert_eq!(&bytes[5..9], &TAG_DISPLAYNAME.to_le_bytes());
    }

    #[test]
    fn test_and_chain() {
        let res = Restriction::and(vec![name_filter("devicedata"), {
            Restriction::property(
                RestrictOp::Eq,
                0,
                TaggedPropval::string(TAG_MESSAGECLASS, "IPM.Note").unwrap(),
            )
        }]);
        let bytes = serialized(&res);
        assert_eq!(bytes[0], 0x00);
        assert_eq!(&bytes[1..5], &2u32.to_le_bytes());
        assert_eq!(bytes[5], 0x04);
    }

    #[test]
    fn test_or_and_not_codes() {
        assert_eq!(serialized(&Restriction::or(vec![]))[0], 0x01);
        let bytes = serialized(&Restriction::not(name_filter("x")));
        assert_eq!(bytes[0], 0x02);
        assert_eq!(bytes[1], 0x04);
    }

    #[test]
    fn test_bitmask_negated_on_wire() {
        let all = serialized(&Restriction::bitmask(true, 0x6673_0003, 0x8));
        assert_eq!(all[0], 0x06);
        assert_eq!(all[1], 0);
        let any = serialized(&Restriction::bitmask(false, 0x6673_0003, 0x8));
        assert_eq!(any[1], 1);
        assert_eq!(&any[2..6], &0x6673_0003u32.to_le_bytes());
        assert_eq!(&any[6..10], &8u32.to_le_bytes());
    }

    #[test]
    fn test_propcomp_size_exist() {
        let bytes = serialized(&Restriction::prop_compare(RestrictOp::Gt, 1, 2));
        assert_eq!(bytes, [0x05, 0x02, 1, 0, 0, 0, 2, 0, 0, 0]);

        let bytes = serialized(&Restriction::size(RestrictOp::Le, 3, 128));
        assert_eq!(bytes, [0x07, 0x01, 3, 0, 0, 0, 128, 0, 0, 0]);

        let bytes = serialized(&Restriction::exist(TAG_DISPLAYNAME));
        assert_eq!(bytes[0], 0x08);
        assert_eq!(&bytes[1..5], &TAG_DISPLAYNAME.to_le_bytes());
    }

    #[test]
    fn test_subres_and_count() {
        let bytes = serialized(&Restriction::sub_object(0x0e12_000d, name_filter("x")));
        assert_eq!(bytes[0], 0x09);
        assert_eq!(&bytes[1..5], &0x0e12_000du32.to_le_bytes());

        let bytes = serialized(&Restriction::count(5, Restriction::exist(1)));
        assert_eq!(bytes[0], 0x0b);
        assert_eq!(&bytes[1..5], &5u32.to_le_bytes());
        assert_eq!(bytes[5], 0x08);
    }

    #[test]
    fn test_comment_with_and_without_child() {
        let propvals = vec![TaggedPropval::string(TAG_DISPLAYNAME, "note").unwrap()];
        let with = serialized(&Restriction::comment(
            propvals.clone(),
            Some(Restriction::exist(1)),
        ));
        assert_eq!(with[0], 0x0a);
        assert_eq!(with[1], 1);
        // the single propval occupies 9 bytes (tag + "note\0"), then the
        // presence byte and the child tree
        assert_eq!(with[11], 1);
        assert_eq!(with[12], 0x08);
        assert_eq!(with.len(), 17);

        let without = serialized(&Restriction::comment(propvals, None));
        assert_eq!(without.len(), 12);
        assert_eq!(*without.last().unwrap(), 0);
    }

    #[test]
    fn test_comment_propval_count_limits() {
        let mut buf = IoBuffer::new();
        let res = Restriction::comment(vec![], None);
        assert!(matches!(
            res.serialize(&mut buf),
            Err(ProtocolError::Serialization(_))
        ));

        let many = (0..256)
            .map(|_| TaggedPropval::string(TAG_DISPLAYNAME, "x").unwrap())
            .collect();
        let res = Restriction::comment(many, None);
        assert!(res.serialize(&mut buf).is_err());
    }
}
