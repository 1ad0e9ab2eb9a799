//! RPC request and response catalog.
//!
//! Every request body starts with the 1-byte call id, followed by
//! call-specific arguments. Responses are parsed from the payload that
//! follows the 5-byte status header; requests whose payload is empty map to
//! [`NullResponse`].

use crate::buffer::IoBuffer;
use crate::error::ProtocolError;
use crate::propval::TaggedPropval;
use crate::restriction::Restriction;
use crate::structures::{PermissionData, PropertyName, PropertyProblem};
use rand::Rng;

/// Call ids published by the exmdb server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CallId {
    Connect = 0x00,
    GetNamedPropIds = 0x04,
    GetStoreAllProptags = 0x08,
    GetStoreProperties = 0x09,
    SetStoreProperties = 0x0a,
    RemoveStoreProperties = 0x0b,
    GetFolderByName = 0x13,
    CreateFolderByProperties = 0x15,
    GetFolderAllProptags = 0x16,
    GetFolderProperties = 0x17,
    SetFolderProperties = 0x18,
    DeleteFolder = 0x1a,
    EmptyFolder = 0x1b,
    DeleteMessages = 0x23,
    LoadHierarchyTable = 0x26,
    LoadContentTable = 0x28,
    LoadPermissionTable = 0x2a,
    UnloadTable = 0x2c,
    QueryTable = 0x2e,
    GetMessageProperties = 0x5a,
    AllocateCn = 0x5f,
    UpdateFolderPermission = 0x6d,
    UnloadStore = 0x80,
}

/// A serializable RPC call with a typed response.
pub trait Request {
    const CALL_ID: CallId;
    type Response: ResponsePayload;

    /// Writes the call-specific arguments (everything after the call id).
    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError>;

    /// Writes the full request body: call id, then arguments.
    fn encode(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_u8(Self::CALL_ID as u8);
        self.write_args(buf)
    }
}

/// A response payload parser.
pub trait ResponsePayload: Sized {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError>;
}

// =============================================================================
// Collection helpers
// =============================================================================

fn count_u16(len: usize) -> Result<u16, ProtocolError> {
    u16::try_from(len)
        .map_err(|_| ProtocolError::Serialization(format!("array size {len} exceeds u16 range")))
}

fn count_u32(len: usize) -> Result<u32, ProtocolError> {
    u32::try_from(len)
        .map_err(|_| ProtocolError::Serialization(format!("array size {len} exceeds u32 range")))
}

/// Proptag arrays travel as a u16 count followed by 32-bit tags.
fn push_proptags(buf: &mut IoBuffer, proptags: &[u32]) -> Result<(), ProtocolError> {
    buf.push_u16(count_u16(proptags.len())?);
    proptags.iter().for_each(|tag| buf.push_u32(*tag));
    Ok(())
}

fn push_propvals(buf: &mut IoBuffer, propvals: &[TaggedPropval<'_>]) -> Result<(), ProtocolError> {
    buf.push_u16(count_u16(propvals.len())?);
    for propval in propvals {
        propval.serialize(buf)?;
    }
    Ok(())
}

/// Optional restriction: presence byte, then the tree if present.
fn push_restriction(buf: &mut IoBuffer, res: &Restriction<'_>) -> Result<(), ProtocolError> {
    buf.push_bool(res.is_some());
    res.serialize(buf)
}

// =============================================================================
// Response payloads
// =============================================================================

/// Response without payload; success is conveyed by the status header.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullResponse;

impl ResponsePayload for NullResponse {
    fn read(_buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        Ok(NullResponse)
    }
}

/// A single folder id.
#[derive(Debug, Clone, Copy)]
pub struct FolderResponse {
    pub folder_id: u64,
}

impl ResponsePayload for FolderResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            folder_id: buf.pop_u64()?,
        })
    }
}

/// Handle and row count of a freshly loaded table.
#[derive(Debug, Clone, Copy)]
pub struct LoadTableResponse {
    pub table_id: u32,
    pub row_count: u32,
}

impl ResponsePayload for LoadTableResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            table_id: buf.pop_u32()?,
            row_count: buf.pop_u32()?,
        })
    }
}

/// Problems encountered while setting properties.
#[derive(Debug, Clone, Default)]
pub struct ProblemsResponse {
    pub problems: Vec<PropertyProblem>,
}

impl ResponsePayload for ProblemsResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        let count = buf.pop_u16()?;
        let mut problems = Vec::with_capacity(count as usize);
        for _ in 0..count {
            problems.push(PropertyProblem::deserialize(buf)?);
        }
        Ok(Self { problems })
    }
}

/// List of property tags.
#[derive(Debug, Clone, Default)]
pub struct ProptagResponse {
    pub proptags: Vec<u32>,
}

impl ResponsePayload for ProptagResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        let count = buf.pop_u16()?;
        let mut proptags = Vec::with_capacity(count as usize);
        for _ in 0..count {
            proptags.push(buf.pop_u32()?);
        }
        Ok(Self { proptags })
    }
}

/// List of tagged property values.
#[derive(Debug, Clone, Default)]
pub struct PropvalResponse {
    pub propvals: Vec<TaggedPropval<'static>>,
}

impl ResponsePayload for PropvalResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        let count = buf.pop_u16()?;
        let mut propvals = Vec::with_capacity(count as usize);
        for _ in 0..count {
            propvals.push(TaggedPropval::deserialize(buf)?);
        }
        Ok(Self { propvals })
    }
}

/// Boolean outcome of an operation.
#[derive(Debug, Clone, Copy)]
pub struct SuccessResponse {
    pub success: bool,
}

impl ResponsePayload for SuccessResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            success: buf.pop_bool()?,
        })
    }
}

/// Whether a bulk deletion completed only partially.
#[derive(Debug, Clone, Copy)]
pub struct PartialResponse {
    pub partial: bool,
}

impl ResponsePayload for PartialResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        Ok(Self {
            partial: buf.pop_bool()?,
        })
    }
}

/// Rows returned by a table query: u32 row count, then per row a u16
/// propval count and the propvals.
#[derive(Debug, Clone, Default)]
pub struct TableResponse {
    pub entries: Vec<Vec<TaggedPropval<'static>>>,
}

impl ResponsePayload for TableResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        let rows = buf.pop_u32()?;
        let mut entries = Vec::with_capacity(rows as usize);
        for _ in 0..rows {
            let count = buf.pop_u16()?;
            let mut entry = Vec::with_capacity(count as usize);
            for _ in 0..count {
                entry.push(TaggedPropval::deserialize(buf)?);
            }
            entries.push(entry);
        }
        Ok(Self { entries })
    }
}

/// A freshly allocated change number.
#[derive(Debug, Clone, Copy)]
pub struct AllocateCnResponse {
    /// Change number in host numeric order.
    pub change_num: u64,
}

impl ResponsePayload for AllocateCnResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        // The server emits this one field big-endian; normalize here so
        // callers never see the swapped form.
        Ok(Self {
            change_num: buf.pop_u64()?.swap_bytes(),
        })
    }
}

/// Ids of resolved named properties (type codes are not included).
#[derive(Debug, Clone, Default)]
pub struct NamedPropIdsResponse {
    pub prop_ids: Vec<u16>,
}

impl ResponsePayload for NamedPropIdsResponse {
    fn read(buf: &mut IoBuffer) -> Result<Self, ProtocolError> {
        let count = buf.pop_u16()?;
        let mut prop_ids = Vec::with_capacity(count as usize);
        for _ in 0..count {
            prop_ids.push(buf.pop_u16()?);
        }
        Ok(Self { prop_ids })
    }
}

// =============================================================================
// Requests
// =============================================================================

const SESSION_ID_LEN: usize = 15;
const SESSION_ID_CHARS: &[u8] = b"0123456789abcdefghjklmnopqrstvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

fn make_session_id() -> String {
    let mut rng = rand::thread_rng();
    (0..SESSION_ID_LEN)
        .map(|_| SESSION_ID_CHARS[rng.gen_range(0..SESSION_ID_CHARS.len())] as char)
        .collect()
}

/// Prepares the session; must be the first call on a connection.
#[derive(Debug, Clone)]
pub struct Connect<'a> {
    /// Server-side path scope of the store area.
    pub prefix: &'a str,
    /// Selects per-mailbox stores instead of the public store.
    pub private_store: bool,
}

impl Request for Connect<'_> {
    const CALL_ID: CallId = CallId::Connect;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.prefix);
        buf.push_str(&make_session_id());
        buf.push_bool(self.private_store);
        Ok(())
    }
}

/// Allocates a new change number for the store.
#[derive(Debug, Clone)]
pub struct AllocateCn<'a> {
    pub homedir: &'a str,
}

impl Request for AllocateCn<'_> {
    const CALL_ID: CallId = CallId::AllocateCn;
    type Response = AllocateCnResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        Ok(())
    }
}

/// Loads the subfolders of a folder into a table.
///
/// The table holds a server-side handle that must be released with
/// [`UnloadTable`] on every path.
#[derive(Debug, Clone)]
pub struct LoadHierarchyTable<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub username: &'a str,
    pub table_flags: u8,
    pub restriction: Restriction<'a>,
}

impl Request for LoadHierarchyTable<'_> {
    const CALL_ID: CallId = CallId::LoadHierarchyTable;
    type Response = LoadTableResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u64(self.folder_id);
        buf.push_str(self.username);
        buf.push_u8(self.table_flags);
        push_restriction(buf, &self.restriction)
    }
}

/// Loads the messages of a folder into a table.
#[derive(Debug, Clone)]
pub struct LoadContentTable<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub username: &'a str,
    pub table_flags: u8,
    pub restriction: Restriction<'a>,
}

impl Request for LoadContentTable<'_> {
    const CALL_ID: CallId = CallId::LoadContentTable;
    type Response = LoadTableResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.cpid);
        buf.push_u64(self.folder_id);
        buf.push_str(self.username);
        buf.push_u8(self.table_flags);
        push_restriction(buf, &self.restriction)?;
        // No sort order.
        buf.push_u8(0);
        Ok(())
    }
}

/// Loads the permission entries of a folder into a table.
#[derive(Debug, Clone)]
pub struct LoadPermissionTable<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub table_flags: u32,
}

impl Request for LoadPermissionTable<'_> {
    const CALL_ID: CallId = CallId::LoadPermissionTable;
    type Response = LoadTableResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u64(self.folder_id);
        buf.push_u32(self.table_flags);
        Ok(())
    }
}

/// Retrieves rows from a previously loaded table.
#[derive(Debug, Clone)]
pub struct QueryTable<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub table_id: u32,
    pub proptags: &'a [u32],
    pub start_pos: u32,
    pub row_needed: u32,
}

impl Request for QueryTable<'_> {
    const CALL_ID: CallId = CallId::QueryTable;
    type Response = TableResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_str(self.username);
        buf.push_u32(self.cpid);
        buf.push_u32(self.table_id);
        push_proptags(buf, self.proptags)?;
        buf.push_u32(self.start_pos);
        buf.push_u32(self.row_needed);
        Ok(())
    }
}

/// Releases a table handle.
#[derive(Debug, Clone)]
pub struct UnloadTable<'a> {
    pub homedir: &'a str,
    pub table_id: u32,
}

impl Request for UnloadTable<'_> {
    const CALL_ID: CallId = CallId::UnloadTable;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.table_id);
        Ok(())
    }
}

/// Resolves a folder name below a parent folder to its id.
#[derive(Debug, Clone)]
pub struct GetFolderByName<'a> {
    pub homedir: &'a str,
    pub parent_id: u64,
    pub name: &'a str,
}

impl Request for GetFolderByName<'_> {
    const CALL_ID: CallId = CallId::GetFolderByName;
    type Response = FolderResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u64(self.parent_id);
        buf.push_str(self.name);
        Ok(())
    }
}

/// Creates a folder described by a list of properties.
#[derive(Debug, Clone)]
pub struct CreateFolderByProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for CreateFolderByProperties<'_> {
    const CALL_ID: CallId = CallId::CreateFolderByProperties;
    type Response = FolderResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.cpid);
        push_propvals(buf, self.propvals)
    }
}

/// Deletes a folder.
#[derive(Debug, Clone)]
pub struct DeleteFolder<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub hard: bool,
}

impl Request for DeleteFolder<'_> {
    const CALL_ID: CallId = CallId::DeleteFolder;
    type Response = SuccessResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.cpid);
        buf.push_u64(self.folder_id);
        buf.push_bool(self.hard);
        Ok(())
    }
}

/// Removes contents of a folder.
#[derive(Debug, Clone)]
pub struct EmptyFolder<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub username: &'a str,
    pub folder_id: u64,
    /// Delete permanently instead of moving to deleted items.
    pub hard: bool,
    /// Delete normal messages.
    pub normal: bool,
    /// Delete associated (FAI) messages.
    pub associated: bool,
    /// Delete subfolders.
    pub subfolders: bool,
}

impl Request for EmptyFolder<'_> {
    const CALL_ID: CallId = CallId::EmptyFolder;
    type Response = PartialResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.cpid);
        buf.push_str(self.username);
        buf.push_u64(self.folder_id);
        buf.push_bool(self.hard);
        buf.push_bool(self.normal);
        buf.push_bool(self.associated);
        buf.push_bool(self.subfolders);
        Ok(())
    }
}

/// Lists every property tag present on a folder.
#[derive(Debug, Clone)]
pub struct GetFolderAllProptags<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
}

impl Request for GetFolderAllProptags<'_> {
    const CALL_ID: CallId = CallId::GetFolderAllProptags;
    type Response = ProptagResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u64(self.folder_id);
        Ok(())
    }
}

/// Reads selected folder properties.
#[derive(Debug, Clone)]
pub struct GetFolderProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub proptags: &'a [u32],
}

impl Request for GetFolderProperties<'_> {
    const CALL_ID: CallId = CallId::GetFolderProperties;
    type Response = PropvalResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.cpid);
        buf.push_u64(self.folder_id);
        push_proptags(buf, self.proptags)
    }
}

/// Updates folder properties.
#[derive(Debug, Clone)]
pub struct SetFolderProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub folder_id: u64,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for SetFolderProperties<'_> {
    const CALL_ID: CallId = CallId::SetFolderProperties;
    type Response = ProblemsResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.cpid);
        buf.push_u64(self.folder_id);
        push_propvals(buf, self.propvals)
    }
}

/// Reads selected store properties.
#[derive(Debug, Clone)]
pub struct GetStoreProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub proptags: &'a [u32],
}

impl Request for GetStoreProperties<'_> {
    const CALL_ID: CallId = CallId::GetStoreProperties;
    type Response = PropvalResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.cpid);
        push_proptags(buf, self.proptags)
    }
}

/// Updates store properties.
#[derive(Debug, Clone)]
pub struct SetStoreProperties<'a> {
    pub homedir: &'a str,
    pub cpid: u32,
    pub propvals: &'a [TaggedPropval<'a>],
}

impl Request for SetStoreProperties<'_> {
    const CALL_ID: CallId = CallId::SetStoreProperties;
    type Response = ProblemsResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.cpid);
        push_propvals(buf, self.propvals)
    }
}

/// Lists every property tag present on the store.
#[derive(Debug, Clone)]
pub struct GetStoreAllProptags<'a> {
    pub homedir: &'a str,
}

impl Request for GetStoreAllProptags<'_> {
    const CALL_ID: CallId = CallId::GetStoreAllProptags;
    type Response = ProptagResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        Ok(())
    }
}

/// Deletes property tags from the store.
#[derive(Debug, Clone)]
pub struct RemoveStoreProperties<'a> {
    pub homedir: &'a str,
    pub proptags: &'a [u32],
}

impl Request for RemoveStoreProperties<'_> {
    const CALL_ID: CallId = CallId::RemoveStoreProperties;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        push_proptags(buf, self.proptags)
    }
}

/// Reads selected message properties.
#[derive(Debug, Clone)]
pub struct GetMessageProperties<'a> {
    pub homedir: &'a str,
    pub username: &'a str,
    pub cpid: u32,
    pub message_id: u64,
    pub proptags: &'a [u32],
}

impl Request for GetMessageProperties<'_> {
    const CALL_ID: CallId = CallId::GetMessageProperties;
    type Response = PropvalResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_str(self.username);
        buf.push_u32(self.cpid);
        buf.push_u64(self.message_id);
        push_proptags(buf, self.proptags)
    }
}

/// Deletes messages from a folder.
#[derive(Debug, Clone)]
pub struct DeleteMessages<'a> {
    pub homedir: &'a str,
    pub account_id: u32,
    pub cpid: u32,
    pub username: &'a str,
    pub folder_id: u64,
    pub message_ids: &'a [u64],
    pub hard: bool,
}

impl Request for DeleteMessages<'_> {
    const CALL_ID: CallId = CallId::DeleteMessages;
    type Response = PartialResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u32(self.account_id);
        buf.push_u32(self.cpid);
        buf.push_str(self.username);
        buf.push_u64(self.folder_id);
        buf.push_u32(count_u32(self.message_ids.len())?);
        self.message_ids.iter().for_each(|id| buf.push_u64(*id));
        buf.push_bool(self.hard);
        Ok(())
    }
}

/// Resolves named properties to their 16-bit ids, optionally creating them.
#[derive(Debug, Clone)]
pub struct GetNamedPropIds<'a> {
    pub homedir: &'a str,
    pub create: bool,
    pub propnames: &'a [PropertyName],
}

impl Request for GetNamedPropIds<'_> {
    const CALL_ID: CallId = CallId::GetNamedPropIds;
    type Response = NamedPropIdsResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_bool(self.create);
        buf.push_u16(count_u16(self.propnames.len())?);
        for propname in self.propnames {
            propname.serialize(buf)?;
        }
        Ok(())
    }
}

/// Applies a batch of permission table edits to a folder.
#[derive(Debug, Clone)]
pub struct UpdateFolderPermission<'a> {
    pub homedir: &'a str,
    pub folder_id: u64,
    pub freebusy: bool,
    pub permissions: &'a [PermissionData<'a>],
}

impl Request for UpdateFolderPermission<'_> {
    const CALL_ID: CallId = CallId::UpdateFolderPermission;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        buf.push_u64(self.folder_id);
        buf.push_bool(self.freebusy);
        buf.push_u16(count_u16(self.permissions.len())?);
        for permission in self.permissions {
            permission.serialize(buf)?;
        }
        Ok(())
    }
}

/// Closes a store database.
#[derive(Debug, Clone)]
pub struct UnloadStore<'a> {
    pub homedir: &'a str,
}

impl Request for UnloadStore<'_> {
    const CALL_ID: CallId = CallId::UnloadStore;
    type Response = NullResponse;

    fn write_args(&self, buf: &mut IoBuffer) -> Result<(), ProtocolError> {
        buf.push_str(self.homedir);
        Ok(())
    }
}
