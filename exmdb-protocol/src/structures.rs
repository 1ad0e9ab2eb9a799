//! Fixed-shape records with custom wire encodings.

use crate::buffer::IoBuffer;
use crate::error::ProtocolError;
use crate::propval::TaggedPropval;
use std::fmt;
use std::str::FromStr;

/// 128-bit Microsoft GUID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Guid {
    pub time_low: u32,
    pub time_mid: u16,
    pub time_hi_version: u16,
    pub clock_seq: [u8; 2],
    pub node: [u8; 6],
}

impl Guid {
    pub const fn new(
        time_low: u32,
        time_mid: u16,
        time_hi_version: u16,
        clock_seq: [u8; 2],
        node: [u8; 6],
    ) -> Self {
        Self {
            time_low,
            time_mid,
            time_hi_version,
            clock_seq,
            node,
        }
    }

    /// GUID of a public store, derived by substituting the domain id as
    /// `time_low` of a fixed base GUID.
    pub const fn from_domain_id(domain_id: u32) -> Self {
        Self::new(
            domain_id,
            0x0afb,
            0x7df6,
            [0x91, 0x92],
            [0x49, 0x88, 0x6a, 0xa7, 0x38, 0xce],
        )
    }

    pub fn serialize(&self, buf: &mut IoBuffer) {
        buf.push_u32(self.time_low);
        buf.push_u16(self.time_mid);
        buf.push_u16(self.time_hi_version);
        buf.push_raw(&self.clock_seq);
        buf.push_raw(&self.node);
    }

    pub fn deserialize(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            time_low: buf.pop_u32()?,
            time_mid: buf.pop_u16()?,
            time_hi_version: buf.pop_u16()?,
            clock_seq: buf.pop_raw(2)?.try_into().unwrap(),
            node: buf.pop_raw(6)?.try_into().unwrap(),
        })
    }
}

impl FromStr for Guid {
    type Err = ProtocolError;

    /// Parses the canonical form `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProtocolError::InvalidGuid(s.to_owned());
        if !s.is_ascii() {
            return Err(invalid());
        }
        let parts: Vec<&str> = s.split('-').collect();
        let &[a, b, c, d, e] = parts.as_slice() else {
            return Err(invalid());
        };
        if a.len() != 8 || b.len() != 4 || c.len() != 4 || d.len() != 4 || e.len() != 12 {
            return Err(invalid());
        }
        let byte = |src: &str, i: usize| u8::from_str_radix(&src[2 * i..2 * i + 2], 16);
        let mut guid = Guid {
            time_low: u32::from_str_radix(a, 16).map_err(|_| invalid())?,
            time_mid: u16::from_str_radix(b, 16).map_err(|_| invalid())?,
            time_hi_version: u16::from_str_radix(c, 16).map_err(|_| invalid())?,
            clock_seq: [0; 2],
            node: [0; 6],
        };
        for i in 0..2 {
            guid.clock_seq[i] = byte(d, i).map_err(|_| invalid())?;
        }
        for i in 0..6 {
            guid.node[i] = byte(e, i).map_err(|_| invalid())?;
        }
        Ok(guid)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            self.time_low,
            self.time_mid,
            self.time_hi_version,
            self.clock_seq[0],
            self.clock_seq[1],
            self.node[0],
            self.node[1],
            self.node[2],
            self.node[3],
            self.node[4],
            self.node[5],
        )
    }
}

/// XID with size information, written into change keys.
///
/// Serialized as `size ‖ guid ‖ first (size - 16) bytes of the local id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizedXid {
    pub size: u8,
    pub guid: Guid,
    pub local_id: u64,
}

impl SizedXid {
    pub const fn new(size: u8, guid: Guid, local_id: u64) -> Self {
        Self {
            size,
            guid,
            local_id,
        }
    }

    /// Writes GUID and local id prefix, without the leading size byte.
    pub fn write_xid(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        if !(17..=24).contains(&self.size) {
            return Err(ProtocolError::Serialization(format!(
                "invalid XID size: {}",
                self.size
            )));
        }
        self.guid.serialize(buf);
        buf.push_raw(&self.local_id.to_le_bytes()[..self.size as usize - 16]);
        Ok(())
    }

    pub fn serialize(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        if !(17..=24).contains(&self.size) {
            return Err(ProtocolError::Serialization(format!(
                "invalid XID size: {}",
                self.size
            )));
        }
        buf.push_u8(self.size);
        self.write_xid(buf)
    }
}

/// A single folder permission table edit.
#[derive(Debug, Clone, Default)]
pub struct PermissionData<'a> {
    pub flags: u8,
    pub propvals: Vec<TaggedPropval<'a>>,
}

impl<'a> PermissionData<'a> {
    pub const ADD_ROW: u8 = 0x01;
    pub const MODIFY_ROW: u8 = 0x02;
    pub const REMOVE_ROW: u8 = 0x04;

    pub fn new(flags: u8, propvals: Vec<TaggedPropval<'a>>) -> Self {
        Self { flags, propvals }
    }

    pub fn serialize(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_u8(self.flags);
        buf.push_u16(self.propvals.len() as u16);
        for propval in &self.propvals {
            propval.serialize(buf)?;
        }
        Ok(())
    }
}

/// Specification of a named property, either by numeric lid or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyName {
    pub kind: u8,
    pub guid: Guid,
    pub lid: u32,
    pub name: String,
}

impl PropertyName {
    pub const ID: u8 = 0;
    pub const NAME: u8 = 1;

    pub fn by_lid(guid: Guid, lid: u32) -> Self {
        Self {
            kind: Self::ID,
            guid,
            lid,
            name: String::new(),
        }
    }

    pub fn by_name(guid: Guid, name: impl Into<String>) -> Self {
        Self {
            kind: Self::NAME,
            guid,
            lid: 0,
            name: name.into(),
        }
    }

    pub fn serialize(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_u8(self.kind);
        self.guid.serialize(buf);
        match self.kind {
            Self::ID => buf.push_u32(self.lid),
            Self::NAME => {
                if self.name.len() > u8::MAX as usize - 1 {
                    return Err(ProtocolError::Serialization(format!(
                        "named property name too long ({} vs 254 chars)",
                        self.name.len()
                    )));
                }
                buf.push_u8(self.name.len() as u8 + 1);
                buf.push_str(&self.name);
            }
            _ => {}
        }
        Ok(())
    }
}

/// Problem reported by the server while setting properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyProblem {
    /// Index into the submitted proptag array.
    pub index: u16,
    /// Tag that caused the error.
    pub proptag: u32,
    /// Exchange error code.
    pub err: u32,
}

impl PropertyProblem {
    pub fn deserialize(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            index: buf.pop_u16()?,
            proptag: buf.pop_u32()?,
            err: buf.pop_u32()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propval::proptype;
    use crate::util;

    #[test]
    fn test_guid_parse_display_roundtrip() {
        let text = "1de937e2-85c6-40a1-bd9d-a6e2b7b787b1";
        let guid: Guid = text.parse().unwrap();
        assert_eq!(guid.time_low, 0x1de937e2);
        assert_eq!(guid.time_mid, 0x85c6);
        assert_eq!(guid.time_hi_version, 0x40a1);
        assert_eq!(guid.clock_seq, [0xbd, 0x9d]);
        assert_eq!(guid.node, [0xa6, 0xe2, 0xb7, 0xb7, 0x87, 0xb1]);
        assert_eq!(guid.to_string(), text);
    }

    #[test]
    fn test_guid_parse_errors() {
        assert!("".parse::<Guid>().is_err());
        assert!("1234".parse::<Guid>().is_err());
        assert!("1de937e2-85c6-40a1-bd9d".parse::<Guid>().is_err());
        assert!("zzzzzzzz-85c6-40a1-bd9d-a6e2b7b787b1".parse::<Guid>().is_err());
    }

    #[test]
    fn test_guid_from_domain_id() {
        let guid = Guid::from_domain_id(42);
        assert_eq!(guid.time_low, 42);
        assert_eq!(guid.time_mid, 0x0afb);
        assert_eq!(guid.time_hi_version, 0x7df6);
        assert_eq!(guid.clock_seq, [0x91, 0x92]);
        assert_eq!(guid.node, [0x49, 0x88, 0x6a, 0xa7, 0x38, 0xce]);
    }

    #[test]
    fn test_guid_wire_roundtrip() {
        let guid = Guid::from_domain_id(7);
        let mut buf = IoBuffer::new();
        guid.serialize(&mut buf);
        assert_eq!(buf.len(), 16);
        assert_eq!(Guid::deserialize(&mut buf).unwrap(), guid);
    }

    #[test]
    fn test_sized_xid_layout() {
        let xid = SizedXid::new(22, Guid::from_domain_id(42), util::value_to_gc(1));
        let mut buf = IoBuffer::new();
        xid.serialize(&mut buf).unwrap();
        // size byte + 16 GUID bytes + 6 local id bytes
        assert_eq!(buf.len(), 23);
        assert_eq!(buf.as_slice()[0], 22);
        assert_eq!(&buf.as_slice()[1..5], &42u32.to_le_bytes());
        // GC bytes: counter 1 in big-endian order
        assert_eq!(&buf.as_slice()[17..23], &[0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_sized_xid_size_validation() {
        for size in [16u8, 25] {
            let xid = SizedXid::new(size, Guid::default(), 0);
            let mut buf = IoBuffer::new();
            assert!(matches!(
                xid.serialize(&mut buf),
                Err(ProtocolError::Serialization(_))
            ));
        }
    }

    #[test]
    fn test_permission_data_serialization() {
        let propvals = vec![TaggedPropval::long(0x6673_0003, 5).unwrap()];
        let pd = PermissionData::new(PermissionData::ADD_ROW, propvals);
        let mut buf = IoBuffer::new();
        pd.serialize(&mut buf).unwrap();
        assert_eq!(buf.pop_u8().unwrap(), PermissionData::ADD_ROW);
        assert_eq!(buf.pop_u16().unwrap(), 1);
        let tp = TaggedPropval::deserialize(&mut buf).unwrap();
        assert_eq!(tp.prop_type(), proptype::LONG);
        assert_eq!(tp.as_u32(), Some(5));
    }

    #[test]
    fn test_property_name_by_lid() {
        let pn = PropertyName::by_lid(Guid::from_domain_id(1), 0x8501);
        let mut buf = IoBuffer::new();
        pn.serialize(&mut buf).unwrap();
        assert_eq!(buf.pop_u8().unwrap(), PropertyName::ID);
        Guid::deserialize(&mut buf).unwrap();
        assert_eq!(buf.pop_u32().unwrap(), 0x8501);
    }

    #[test]
    fn test_property_name_by_name() {
        let pn = PropertyName::by_name(Guid::default(), "Keywords");
        let mut buf = IoBuffer::new();
        pn.serialize(&mut buf).unwrap();
        assert_eq!(buf.pop_u8().unwrap(), PropertyName::NAME);
        Guid::deserialize(&mut buf).unwrap();
        assert_eq!(buf.pop_u8().unwrap(), 9);
        assert_eq!(buf.pop_str().unwrap(), "Keywords");
    }

    #[test]
    fn test_property_name_too_long() {
        let pn = PropertyName::by_name(Guid::default(), "x".repeat(255));
        let mut buf = IoBuffer::new();
        assert!(matches!(
            pn.serialize(&mut buf),
            Err(ProtocolError::Serialization(_))
        ));
    }

    #[test]
    fn test_property_problem_deserialization() {
        let mut buf = IoBuffer::new();
        buf.push_u16(2);
        buf.push_u32(0x3001_001f);
        buf.push_u32(0x8004_0102);
        let problem = PropertyProblem::deserialize(&mut buf).unwrap();
        assert_eq!(problem.index, 2);
        assert_eq!(problem.proptag, 0x3001_001f);
        assert_eq!(problem.err, 0x8004_0102);
    }
}
