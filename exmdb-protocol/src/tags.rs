//! Well-known property tags and store constants.

/// Property tags used by the administrative queries.
pub mod proptag {
    pub const MESSAGE_CLASS: u32 = 0x001a_001f;
    pub const BODY: u32 = 0x1000_001f;
    pub const DISPLAY_NAME: u32 = 0x3001_001f;
    pub const COMMENT: u32 = 0x3004_001f;
    pub const CREATION_TIME: u32 = 0x3007_0040;
    pub const LAST_MODIFICATION_TIME: u32 = 0x3008_0040;
    pub const FOLDER_TYPE: u32 = 0x3601_0003;
    pub const CONTAINER_CLASS: u32 = 0x3613_001f;
    pub const SMTP_ADDRESS: u32 = 0x39fe_001f;
    pub const CHANGE_KEY: u32 = 0x65e2_0102;
    pub const PREDECESSOR_CHANGE_LIST: u32 = 0x65e3_0102;
    pub const MEMBER_ID: u32 = 0x6671_0014;
    pub const MEMBER_NAME: u32 = 0x6672_001f;
    pub const MEMBER_RIGHTS: u32 = 0x6673_0003;
    pub const FOLDER_ID: u32 = 0x6748_0014;
    pub const PARENT_FOLDER_ID: u32 = 0x6749_0014;
    pub const MID: u32 = 0x674a_0014;
    pub const CHANGE_NUMBER: u32 = 0x67a4_0014;
}

/// Flags accepted by the table-loading calls.
pub struct TableFlags;

impl TableFlags {
    /// Include associated (FAI) messages.
    pub const ASSOCIATED: u8 = 0x02;
    /// Recurse into subfolders.
    pub const DEPTH: u8 = 0x04;
}

/// Folder type codes for FOLDER_TYPE properties.
pub struct FolderType;

impl FolderType {
    pub const ROOT: u32 = 0;
    pub const GENERIC: u32 = 1;
    pub const SEARCH: u32 = 2;
}

/// Fixed folder ids of private stores (counter part of the entity id).
pub struct PrivateFid;

impl PrivateFid {
    pub const ROOT: u64 = 0x01;
}

/// Fixed folder ids of the public store (counter part of the entity id).
pub struct PublicFid;

impl PublicFid {
    pub const ROOT: u64 = 0x01;
    pub const IPMSUBTREE: u64 = 0x02;
    pub const NONIPMSUBTREE: u64 = 0x03;
    pub const EFORMSREGISTRY: u64 = 0x04;
}
