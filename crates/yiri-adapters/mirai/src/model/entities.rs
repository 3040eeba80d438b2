//! Contacts that appear in events and API responses.

use serde::{Deserialize, Serialize};

/// A member's rank in a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Permission {
    #[default]
    Member,
    Administrator,
    Owner,
}

impl Permission {
    /// Whether the rank allows managing the group.
    pub fn is_operator(self) -> bool {
        matches!(self, Self::Administrator | Self::Owner)
    }
}

/// A friend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Friend {
    pub id: i64,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl Friend {
    /// Returns the nickname, falling back to the remark.
    pub fn name(&self) -> &str {
        self.nickname
            .as_deref()
            .or(self.remark.as_deref())
            .unwrap_or_default()
    }

    /// Returns the avatar url.
    pub fn avatar_url(&self) -> String {
        format!("http://q4.qlogo.cn/g?b=qq&nk={}&s=140", self.id)
    }
}

/// A group, with the bot's own permission in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    pub permission: Permission,
}

impl Group {
    /// Returns the avatar url.
    pub fn avatar_url(&self) -> String {
        format!("https://p.qlogo.cn/gh/{0}/{0}/", self.id)
    }
}

/// A member of a group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupMember {
    pub id: i64,
    pub member_name: String,
    pub permission: Permission,
    pub group: Group,
    #[serde(default)]
    pub special_title: String,
    #[serde(default)]
    pub join_timestamp: i64,
    #[serde(default)]
    pub last_speak_timestamp: i64,
    /// Seconds until the member may speak again.
    #[serde(default)]
    pub mute_time_remaining: i64,
}

/// A user on another client of the bot account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub platform: String,
}

/// Where a nudge happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    /// Account or group number.
    pub id: i64,
    pub kind: SubjectKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubjectKind {
    Friend,
    Group,
    Stranger,
}
