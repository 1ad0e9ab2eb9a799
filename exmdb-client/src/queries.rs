//! Higher-level multi-request operations.
//!
//! Every operation that loads a server-side table releases its handle with
//! `UnloadTable` on success and error paths alike.

use crate::client::{ClientFlags, ExmdbClient};
use crate::error::ClientError;
use exmdb_protocol::requests::{
    AllocateCn, CreateFolderByProperties, DeleteFolder, DeleteMessages, EmptyFolder,
    GetFolderAllProptags, GetFolderByName, GetFolderProperties, GetMessageProperties,
    GetNamedPropIds, GetStoreAllProptags, GetStoreProperties, LoadContentTable,
    LoadHierarchyTable, LoadPermissionTable, QueryTable, RemoveStoreProperties,
    SetFolderProperties, SetStoreProperties, TableResponse, UnloadStore, UnloadTable,
    UpdateFolderPermission,
};
use exmdb_protocol::tags::{proptag, FolderType, PrivateFid, PublicFid, TableFlags};
use exmdb_protocol::{
    util, Guid, IoBuffer, PermissionData, PropertyName, PropertyProblem, Restriction, RestrictOp,
    SizedXid, TaggedPropval,
};
use std::collections::HashMap;

/// List of tagged propvals.
pub type PropvalList = Vec<TaggedPropval<'static>>;
/// Table of tagged propvals.
pub type PropvalTable = Vec<PropvalList>;
/// List of problems reported while setting properties.
pub type ProblemList = Vec<PropertyProblem>;
/// List of property tags.
pub type ProptagList = Vec<u32>;
/// Device id to state body mapping.
pub type SyncData = HashMap<String, String>;

/// Default properties when querying folders.
pub const DEFAULT_FOLDER_PROPS: [u32; 6] = [
    proptag::FOLDER_ID,
    proptag::PARENT_FOLDER_ID,
    proptag::DISPLAY_NAME,
    proptag::COMMENT,
    proptag::CREATION_TIME,
    proptag::CONTAINER_CLASS,
];

/// Rights bitmask granted to folder owners.
pub const OWNER_RIGHTS: u32 = 0x0000_07e3;

/// Display name of device state messages.
const DEVICE_DATA_NAME: &str = "devicedata";
/// Message class of device state messages.
const SYNC_STATE_CLASS: &str = "IPM.Note.GrommunioState";

/// How [`ExmdbQueries::set_folder_member`] combines the requested rights
/// with a member's existing ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    /// Grant the rights on top of the existing ones.
    Add,
    /// Revoke the rights; the member is dropped when none remain.
    Remove,
    /// Replace the existing rights.
    Set,
}

/// Convenience view of a folder row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Folder {
    pub folder_id: u64,
    pub parent_id: u64,
    pub display_name: String,
    pub comment: String,
    pub creation_time: u64,
    pub container: String,
}

impl Folder {
    pub fn from_propvals(propvals: &[TaggedPropval<'_>]) -> Self {
        let mut folder = Folder::default();
        for tp in propvals {
            match tp.tag() {
                proptag::FOLDER_ID => folder.folder_id = tp.as_u64().unwrap_or(0),
                proptag::PARENT_FOLDER_ID => folder.parent_id = tp.as_u64().unwrap_or(0),
                proptag::DISPLAY_NAME => {
                    folder.display_name = tp.as_str().unwrap_or_default().to_owned()
                }
                proptag::COMMENT => folder.comment = tp.as_str().unwrap_or_default().to_owned(),
                proptag::CREATION_TIME => folder.creation_time = tp.as_u64().unwrap_or(0),
                proptag::CONTAINER_CLASS => {
                    folder.container = tp.as_str().unwrap_or_default().to_owned()
                }
                _ => {}
            }
        }
        folder
    }
}

/// Structured view of a folder table.
#[derive(Debug, Clone, Default)]
pub struct FolderList {
    pub folders: Vec<Folder>,
}

impl From<&PropvalTable> for FolderList {
    fn from(table: &PropvalTable) -> Self {
        Self {
            folders: table.iter().map(|row| Folder::from_propvals(row)).collect(),
        }
    }
}

/// A folder permission table row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FolderMember {
    pub id: u64,
    pub name: String,
    pub mail: String,
    pub rights: u32,
}

impl FolderMember {
    /// Placeholder and group rows that permission edits must never touch.
    pub fn special(&self) -> bool {
        self.id == 0 || self.id == u64::MAX
    }
}

/// Structured view of a permission table.
#[derive(Debug, Clone, Default)]
pub struct FolderMemberList {
    pub members: Vec<FolderMember>,
}

impl From<&PropvalTable> for FolderMemberList {
    fn from(table: &PropvalTable) -> Self {
        let members = table
            .iter()
            .map(|row| {
                let mut member = FolderMember::default();
                for tp in row {
                    match tp.tag() {
                        proptag::MEMBER_ID => member.id = tp.as_u64().unwrap_or(0),
                        proptag::MEMBER_NAME => {
                            member.name = tp.as_str().unwrap_or_default().to_owned()
                        }
                        proptag::SMTP_ADDRESS => {
                            member.mail = tp.as_str().unwrap_or_default().to_owned()
                        }
                        proptag::MEMBER_RIGHTS => member.rights = tp.as_u32().unwrap_or(0),
                        _ => {}
                    }
                }
                member
            })
            .collect();
        Self { members }
    }
}

/// [`ExmdbClient`] wrapper providing frequently used multi-request queries.
#[derive(Debug)]
pub struct ExmdbQueries {
    client: ExmdbClient,
}

impl ExmdbQueries {
    pub fn new(client: ExmdbClient) -> Self {
        Self { client }
    }

    /// Connects a fresh client; see [`ExmdbClient::connect`].
    pub async fn connect(
        host: &str,
        port: u16,
        prefix: &str,
        private_store: bool,
        flags: ClientFlags,
    ) -> Result<Self, ClientError> {
        Ok(Self::new(
            ExmdbClient::connect(host, port, prefix, private_store, flags).await?,
        ))
    }

    /// Access to the underlying client for raw requests.
    pub fn client(&mut self) -> &mut ExmdbClient {
        &mut self.client
    }

    pub fn into_client(self) -> ExmdbClient {
        self.client
    }

    /// Queries a loaded table and releases its handle, also when the query
    /// fails.
    async fn drain_table(
        &mut self,
        homedir: &str,
        table_id: u32,
        proptags: &[u32],
        start_pos: u32,
        row_needed: u32,
    ) -> Result<TableResponse, ClientError> {
        let rows = self
            .client
            .send(&QueryTable {
                homedir,
                username: "",
                cpid: 0,
                table_id,
                proptags,
                start_pos,
                row_needed,
            })
            .await;
        let unload = self.client.send(&UnloadTable { homedir, table_id }).await;
        let rows = rows?;
        unload?;
        Ok(rows)
    }

    /// Lists the folders below `parent`.
    ///
    /// With both `offset` and `limit` zero, all rows reported by the server
    /// are fetched; otherwise `limit` rows starting at `offset`.
    #[allow(clippy::too_many_arguments)]
    pub async fn list_folders(
        &mut self,
        homedir: &str,
        parent: u64,
        recursive: bool,
        proptags: &[u32],
        offset: u32,
        limit: u32,
        restriction: Restriction<'_>,
    ) -> Result<PropvalTable, ClientError> {
        let table = self
            .client
            .send(&LoadHierarchyTable {
                homedir,
                folder_id: parent,
                username: "",
                table_flags: if recursive { TableFlags::DEPTH } else { 0 },
                restriction,
            })
            .await?;
        let row_needed = if offset == 0 && limit == 0 {
            table.row_count
        } else {
            limit
        };
        let rows = self
            .drain_table(homedir, table.table_id, proptags, offset, row_needed)
            .await?;
        Ok(rows.entries)
    }

    /// Finds folders by display name. A zero `parent` searches below the
    /// private root folder.
    pub async fn find_folder(
        &mut self,
        homedir: &str,
        name: &str,
        parent: u64,
        recursive: bool,
        fuzzy_level: u32,
        proptags: &[u32],
    ) -> Result<PropvalTable, ClientError> {
        let parent = if parent != 0 {
            parent
        } else {
            util::make_eid_ex(1, PrivateFid::ROOT)
        };
        let filter = Restriction::content(
            fuzzy_level,
            0,
            TaggedPropval::string(proptag::DISPLAY_NAME, name)?,
        );
        self.list_folders(homedir, parent, recursive, proptags, 0, 0, filter)
            .await
    }

    /// Creates a public folder below the IPM subtree.
    ///
    /// Returns the new folder id, or 0 when the server rejected the
    /// creation.
    pub async fn create_folder(
        &mut self,
        homedir: &str,
        domain_id: u32,
        folder_name: &str,
        container: &str,
        comment: &str,
    ) -> Result<u64, ClientError> {
        let change_num = self.client.send(&AllocateCn { homedir }).await?.change_num;
        let now = util::nt_now();

        let xid = SizedXid::new(
            22,
            Guid::from_domain_id(domain_id),
            util::value_to_gc(change_num),
        );
        let mut xid_buf = IoBuffer::with_capacity(64);
        xid.write_xid(&mut xid_buf)?;
        let change_key = xid_buf.as_slice().to_vec();
        let offset = xid_buf.len();
        xid.serialize(&mut xid_buf)?;
        let predecessor_list = xid_buf.as_slice()[offset..].to_vec();

        let mut propvals = Vec::with_capacity(10);
        propvals.push(TaggedPropval::longlong(
            proptag::PARENT_FOLDER_ID,
            util::make_eid_ex(1, PublicFid::IPMSUBTREE),
        )?);
        propvals.push(TaggedPropval::long(
            proptag::FOLDER_TYPE,
            FolderType::GENERIC,
        )?);
        propvals.push(TaggedPropval::string(proptag::DISPLAY_NAME, folder_name)?);
        propvals.push(TaggedPropval::string(proptag::COMMENT, comment)?);
        propvals.push(TaggedPropval::longlong(proptag::CREATION_TIME, now)?);
        propvals.push(TaggedPropval::longlong(
            proptag::LAST_MODIFICATION_TIME,
            now,
        )?);
        propvals.push(TaggedPropval::longlong(proptag::CHANGE_NUMBER, change_num)?);
        propvals.push(TaggedPropval::binary(proptag::CHANGE_KEY, change_key)?);
        propvals.push(TaggedPropval::binary(
            proptag::PREDECESSOR_CHANGE_LIST,
            predecessor_list,
        )?);
        if !container.is_empty() {
            propvals.push(TaggedPropval::string(proptag::CONTAINER_CLASS, container)?);
        }

        let response = self
            .client
            .send(&CreateFolderByProperties {
                homedir,
                cpid: 0,
                propvals: &propvals,
            })
            .await?;
        Ok(response.folder_id)
    }

    /// Deletes a folder, optionally clearing its contents first.
    pub async fn delete_folder(
        &mut self,
        homedir: &str,
        folder_id: u64,
        clear: bool,
    ) -> Result<bool, ClientError> {
        if clear {
            self.client
                .send(&EmptyFolder {
                    homedir,
                    cpid: 0,
                    username: "",
                    folder_id,
                    hard: true,
                    normal: true,
                    associated: true,
                    subfolders: true,
                })
                .await?;
        }
        let response = self
            .client
            .send(&DeleteFolder {
                homedir,
                cpid: 0,
                folder_id,
                hard: true,
            })
            .await?;
        Ok(response.success)
    }

    /// Retrieves the permission table of a folder.
    pub async fn get_folder_member_list(
        &mut self,
        homedir: &str,
        folder_id: u64,
    ) -> Result<FolderMemberList, ClientError> {
        let table = self
            .client
            .send(&LoadPermissionTable {
                homedir,
                folder_id,
                table_flags: 0,
            })
            .await?;
        let proptags = [
            proptag::MEMBER_ID,
            proptag::MEMBER_NAME,
            proptag::SMTP_ADDRESS,
            proptag::MEMBER_RIGHTS,
        ];
        let rows = self
            .drain_table(homedir, table.table_id, &proptags, 0, table.row_count)
            .await?;
        Ok(FolderMemberList::from(&rows.entries))
    }

    /// Adjusts the rights of a single folder member.
    ///
    /// Members are matched by their SMTP address. Unknown users are added
    /// (unless removing); members whose rights drop to zero are removed.
    pub async fn set_folder_member(
        &mut self,
        homedir: &str,
        folder_id: u64,
        username: &str,
        rights: u32,
        mode: PermissionMode,
    ) -> Result<(), ClientError> {
        let members = self.get_folder_member_list(homedir, folder_id).await?;
        let existing = members
            .members
            .iter()
            .find(|m| !m.special() && m.mail == username);

        let op = match existing {
            Some(member) => {
                let new_rights = match mode {
                    PermissionMode::Add => member.rights | rights,
                    PermissionMode::Remove => member.rights & !rights,
                    PermissionMode::Set => rights,
                };
                if new_rights == member.rights {
                    return Ok(());
                }
                if new_rights == 0 {
                    PermissionData::new(
                        PermissionData::REMOVE_ROW,
                        vec![TaggedPropval::longlong(proptag::MEMBER_ID, member.id)?],
                    )
                } else {
                    PermissionData::new(
                        PermissionData::MODIFY_ROW,
                        vec![
                            TaggedPropval::string(proptag::SMTP_ADDRESS, username)?,
                            TaggedPropval::long(proptag::MEMBER_RIGHTS, new_rights)?,
                            TaggedPropval::longlong(proptag::MEMBER_ID, member.id)?,
                        ],
                    )
                }
            }
            None => {
                if mode == PermissionMode::Remove || rights == 0 {
                    return Ok(());
                }
                PermissionData::new(
                    PermissionData::ADD_ROW,
                    vec![
                        TaggedPropval::string(proptag::SMTP_ADDRESS, username)?,
                        TaggedPropval::long(proptag::MEMBER_RIGHTS, rights)?,
                    ],
                )
            }
        };

        let permissions = [op];
        self.client
            .send(&UpdateFolderPermission {
                homedir,
                folder_id,
                freebusy: false,
                permissions: &permissions,
            })
            .await?;
        Ok(())
    }

    /// Grants `rights` to every user in `usernames` and revokes them from
    /// every other regular member, batching all edits into a single
    /// permission update.
    ///
    /// Members whose rights drop to zero are removed; special rows are
    /// never touched.
    pub async fn set_folder_members(
        &mut self,
        homedir: &str,
        folder_id: u64,
        usernames: &[&str],
        rights: u32,
    ) -> Result<(), ClientError> {
        let members = self.get_folder_member_list(homedir, folder_id).await?;

        let mut ops = Vec::new();
        for member in &members.members {
            if member.special() {
                continue;
            }
            let requested = usernames.contains(&member.mail.as_str());
            let new_rights = if requested {
                member.rights | rights
            } else {
                member.rights & !rights
            };
            if new_rights == member.rights {
                continue;
            }
            if new_rights == 0 {
                ops.push(PermissionData::new(
                    PermissionData::REMOVE_ROW,
                    vec![TaggedPropval::longlong(proptag::MEMBER_ID, member.id)?],
                ));
            } else {
                ops.push(PermissionData::new(
                    PermissionData::MODIFY_ROW,
                    vec![
                        TaggedPropval::string(proptag::SMTP_ADDRESS, member.mail.as_str())?,
                        TaggedPropval::long(proptag::MEMBER_RIGHTS, new_rights)?,
                        TaggedPropval::longlong(proptag::MEMBER_ID, member.id)?,
                    ],
                ));
            }
        }
        for username in usernames {
            let known = members
                .members
                .iter()
                .any(|m| !m.special() && m.mail == *username);
            if !known && rights != 0 {
                ops.push(PermissionData::new(
                    PermissionData::ADD_ROW,
                    vec![
                        TaggedPropval::string(proptag::SMTP_ADDRESS, *username)?,
                        TaggedPropval::long(proptag::MEMBER_RIGHTS, rights)?,
                    ],
                ));
            }
        }

        if ops.is_empty() {
            return Ok(());
        }
        self.client
            .send(&UpdateFolderPermission {
                homedir,
                folder_id,
                freebusy: false,
                permissions: &ops,
            })
            .await?;
        Ok(())
    }

    pub async fn get_folder_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        folder_id: u64,
        proptags: &[u32],
    ) -> Result<PropvalList, ClientError> {
        let response = self
            .client
            .send(&GetFolderProperties {
                homedir,
                cpid,
                folder_id,
                proptags,
            })
            .await?;
        Ok(response.propvals)
    }

    pub async fn set_folder_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        folder_id: u64,
        propvals: &[TaggedPropval<'_>],
    ) -> Result<ProblemList, ClientError> {
        let response = self
            .client
            .send(&SetFolderProperties {
                homedir,
                cpid,
                folder_id,
                propvals,
            })
            .await?;
        Ok(response.problems)
    }

    pub async fn get_all_folder_properties(
        &mut self,
        homedir: &str,
        folder_id: u64,
    ) -> Result<ProptagList, ClientError> {
        let response = self
            .client
            .send(&GetFolderAllProptags { homedir, folder_id })
            .await?;
        Ok(response.proptags)
    }

    pub async fn get_store_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        proptags: &[u32],
    ) -> Result<PropvalList, ClientError> {
        let response = self
            .client
            .send(&GetStoreProperties {
                homedir,
                cpid,
                proptags,
            })
            .await?;
        Ok(response.propvals)
    }

    pub async fn set_store_properties(
        &mut self,
        homedir: &str,
        cpid: u32,
        propvals: &[TaggedPropval<'_>],
    ) -> Result<ProblemList, ClientError> {
        let response = self
            .client
            .send(&SetStoreProperties {
                homedir,
                cpid,
                propvals,
            })
            .await?;
        Ok(response.problems)
    }

    pub async fn get_all_store_properties(
        &mut self,
        homedir: &str,
    ) -> Result<ProptagList, ClientError> {
        let response = self.client.send(&GetStoreAllProptags { homedir }).await?;
        Ok(response.proptags)
    }

    pub async fn remove_store_properties(
        &mut self,
        homedir: &str,
        proptags: &[u32],
    ) -> Result<(), ClientError> {
        self.client
            .send(&RemoveStoreProperties { homedir, proptags })
            .await?;
        Ok(())
    }

    /// Resolves named properties to their 16-bit ids, optionally creating
    /// missing entries.
    pub async fn resolve_named_properties(
        &mut self,
        homedir: &str,
        create: bool,
        propnames: &[PropertyName],
    ) -> Result<Vec<u16>, ClientError> {
        let response = self
            .client
            .send(&GetNamedPropIds {
                homedir,
                create,
                propnames,
            })
            .await?;
        Ok(response.prop_ids)
    }

    /// Collects per-device synchronization state from a user's sync folder.
    ///
    /// Each subfolder of `folder_name` represents a device; its state is the
    /// body of the contained `devicedata` message.
    pub async fn get_sync_data(
        &mut self,
        homedir: &str,
        folder_name: &str,
    ) -> Result<SyncData, ClientError> {
        let root = util::make_eid_ex(1, PublicFid::ROOT);
        let fid_tags = [proptag::FOLDER_ID, proptag::DISPLAY_NAME];
        let mid_tag = [proptag::MID];
        let body_tag = [proptag::BODY];

        let folder = self
            .client
            .send(&GetFolderByName {
                homedir,
                parent_id: root,
                name: folder_name,
            })
            .await?;
        let subfolders = self
            .client
            .send(&LoadHierarchyTable {
                homedir,
                folder_id: folder.folder_id,
                username: "",
                table_flags: 0,
                restriction: Restriction::Null,
            })
            .await?;
        let rows = self
            .drain_table(
                homedir,
                subfolders.table_id,
                &fid_tags,
                0,
                subfolders.row_count,
            )
            .await?;

        let mut data = SyncData::with_capacity(rows.entries.len());
        for subfolder in &rows.entries {
            let [fid, name] = &subfolder[..] else {
                continue;
            };
            if fid.tag() != proptag::FOLDER_ID || name.tag() != proptag::DISPLAY_NAME {
                continue;
            }
            let (Some(folder_id), Some(device)) = (fid.as_u64(), name.as_str()) else {
                continue;
            };

            let dd_filter = Restriction::and(vec![
                Restriction::property(
                    RestrictOp::Eq,
                    0,
                    TaggedPropval::string(proptag::DISPLAY_NAME, DEVICE_DATA_NAME)?,
                ),
                Restriction::property(
                    RestrictOp::Eq,
                    0,
                    TaggedPropval::string(proptag::MESSAGE_CLASS, SYNC_STATE_CLASS)?,
                ),
            ]);
            let content = self
                .client
                .send(&LoadContentTable {
                    homedir,
                    cpid: 0,
                    folder_id,
                    username: "",
                    table_flags: TableFlags::ASSOCIATED,
                    restriction: dd_filter,
                })
                .await?;
            let messages = self
                .drain_table(homedir, content.table_id, &mid_tag, 0, content.row_count)
                .await?;

            let Some([mid]) = messages.entries.first().map(|row| &row[..]) else {
                continue;
            };
            let Some(message_id) = mid.as_u64().filter(|_| mid.tag() == proptag::MID) else {
                continue;
            };

            let message = self
                .client
                .send(&GetMessageProperties {
                    homedir,
                    username: "",
                    cpid: 0,
                    message_id,
                    proptags: &body_tag,
                })
                .await?;
            let [body] = &message.propvals[..] else {
                continue;
            };
            if body.tag() != proptag::BODY {
                continue;
            }
            if let Some(body) = body.as_str() {
                data.insert(device.to_owned(), body.to_owned());
            }
        }
        Ok(data)
    }

    /// Deletes a device's sync folder entirely. A running device re-syncs
    /// on next contact.
    pub async fn remove_device(
        &mut self,
        homedir: &str,
        folder_name: &str,
        device_id: &str,
    ) -> Result<bool, ClientError> {
        let folder_id = self
            .find_device_folder(homedir, folder_name, device_id)
            .await?;
        self.client
            .send(&EmptyFolder {
                homedir,
                cpid: 0,
                username: "",
                folder_id,
                hard: true,
                normal: true,
                associated: true,
                subfolders: true,
            })
            .await?;
        let response = self
            .client
            .send(&DeleteFolder {
                homedir,
                cpid: 0,
                folder_id,
                hard: true,
            })
            .await?;
        Ok(response.success)
    }

    /// Deletes a device's sync state messages (keeping its `devicedata`
    /// entry), forcing a full re-sync.
    ///
    /// Returns whether all messages were deleted.
    pub async fn resync_device(
        &mut self,
        homedir: &str,
        folder_name: &str,
        device_id: &str,
        user_id: u32,
    ) -> Result<bool, ClientError> {
        let folder_id = self
            .find_device_folder(homedir, folder_name, device_id)
            .await?;

        let filter = Restriction::not(Restriction::property(
            RestrictOp::Eq,
            0,
            TaggedPropval::string(proptag::DISPLAY_NAME, DEVICE_DATA_NAME)?,
        ));
        let content = self
            .client
            .send(&LoadContentTable {
                homedir,
                cpid: 0,
                folder_id,
                username: "",
                table_flags: TableFlags::ASSOCIATED,
                restriction: filter,
            })
            .await?;
        let mid_tag = [proptag::MID];
        let rows = self
            .drain_table(homedir, content.table_id, &mid_tag, 0, content.row_count)
            .await?;

        let message_ids: Vec<u64> = rows
            .entries
            .iter()
            .filter_map(|row| row.first())
            .filter(|tp| tp.tag() == proptag::MID)
            .filter_map(|tp| tp.as_u64())
            .collect();
        if message_ids.is_empty() {
            return Ok(true);
        }

        let response = self
            .client
            .send(&DeleteMessages {
                homedir,
                account_id: user_id,
                cpid: 0,
                username: "",
                folder_id,
                message_ids: &message_ids,
                hard: true,
            })
            .await?;
        Ok(!response.partial)
    }

    /// Closes a store database.
    pub async fn unload_store(&mut self, homedir: &str) -> Result<(), ClientError> {
        self.client.send(&UnloadStore { homedir }).await?;
        Ok(())
    }

    async fn find_device_folder(
        &mut self,
        homedir: &str,
        folder_name: &str,
        device_id: &str,
    ) -> Result<u64, ClientError> {
        let root = util::make_eid_ex(1, PublicFid::ROOT);
        let sync_folder = self
            .client
            .send(&GetFolderByName {
                homedir,
                parent_id: root,
                name: folder_name,
            })
            .await?;
        let device_folder = self
            .client
            .send(&GetFolderByName {
                homedir,
                parent_id: sync_folder.folder_id,
                name: device_id,
            })
            .await?;
        Ok(device_folder.folder_id)
    }
}
