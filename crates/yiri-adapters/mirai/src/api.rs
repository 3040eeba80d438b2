//! The mirai-api-http API table.
//!
//! Each [`ApiSpec`] records the wire name of an API, a snake_case alias, the
//! method it is invoked with and the parameters it cannot do without.
//! [`MiraiBot::invoke`](crate::MiraiBot::invoke) looks APIs up here so callers
//! do not have to remember which ones are GET and which are POST.
//!
//! Parameters use the server's camelCase names (`memberId`, `messageChain`).

use serde_json::Value;
use yiri_core::{AdapterError, AdapterResult, ApiMethod};

/// Description of one API endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiSpec {
    /// Path below the server root, e.g. `"file/list"`.
    pub name: &'static str,
    /// snake_case alias, e.g. `"file_list"`.
    pub alias: &'static str,
    /// Method used for a plain call. RESTful APIs read with `RestGet` and
    /// write with `RestPost`.
    pub method: ApiMethod,
    /// Parameters that must be present.
    pub required: &'static [&'static str],
}

impl ApiSpec {
    const fn new(
        name: &'static str,
        alias: &'static str,
        method: ApiMethod,
        required: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            alias,
            method,
            required,
        }
    }

    /// Whether the API has separate read and write forms.
    pub fn is_rest(&self) -> bool {
        matches!(self.method, ApiMethod::RestGet | ApiMethod::RestPost)
    }

    /// Returns the method for a write call. Only RESTful APIs switch.
    pub fn write_method(&self) -> ApiMethod {
        if self.is_rest() {
            ApiMethod::RestPost
        } else {
            self.method
        }
    }

    /// Checks that every required parameter is present and not null.
    pub fn validate(&self, params: &Value) -> AdapterResult<()> {
        let missing: Vec<&str> = self
            .required
            .iter()
            .copied()
            .filter(|key| params.get(key).is_none_or(Value::is_null))
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(AdapterError::InvalidParams(format!(
                "{} is missing parameters: {}",
                self.name,
                missing.join(", ")
            )))
        }
    }
}

use ApiMethod::{Get, Post, RestGet};

/// Every API the bot knows how to call.
pub const APIS: &[ApiSpec] = &[
    // Information
    ApiSpec::new("about", "about", Get, &[]),
    ApiSpec::new("sessionInfo", "session_info", Get, &[]),
    ApiSpec::new("messageFromId", "message_from_id", Get, &["id"]),
    ApiSpec::new("friendList", "friend_list", Get, &[]),
    ApiSpec::new("groupList", "group_list", Get, &[]),
    ApiSpec::new("memberList", "member_list", Get, &["target"]),
    ApiSpec::new("botProfile", "bot_profile", Get, &[]),
    ApiSpec::new("friendProfile", "friend_profile", Get, &["target"]),
    ApiSpec::new("memberProfile", "member_profile", Get, &["target", "memberId"]),
    // Messages
    ApiSpec::new("sendFriendMessage", "send_friend_message", Post, &["target", "messageChain"]),
    ApiSpec::new("sendGroupMessage", "send_group_message", Post, &["target", "messageChain"]),
    ApiSpec::new("sendTempMessage", "send_temp_message", Post, &["qq", "group", "messageChain"]),
    ApiSpec::new("sendNudge", "send_nudge", Post, &["target", "subject", "kind"]),
    ApiSpec::new("recall", "recall", Post, &["target"]),
    // Group files
    ApiSpec::new("file/list", "file_list", Get, &["id", "target"]),
    ApiSpec::new("file/info", "file_info", Get, &["id", "target"]),
    ApiSpec::new("file/mkdir", "file_mkdir", Post, &["id", "target", "directoryName"]),
    ApiSpec::new("file/delete", "file_delete", Post, &["id", "target"]),
    ApiSpec::new("file/move", "file_move", Post, &["id", "target", "moveTo"]),
    ApiSpec::new("file/rename", "file_rename", Post, &["id", "target", "renameTo"]),
    // Accounts and groups
    ApiSpec::new("deleteFriend", "delete_friend", Post, &["target"]),
    ApiSpec::new("mute", "mute", Post, &["target", "memberId", "time"]),
    ApiSpec::new("unmute", "unmute", Post, &["target", "memberId"]),
    ApiSpec::new("kick", "kick", Post, &["target", "memberId"]),
    ApiSpec::new("quit", "quit", Post, &["target"]),
    ApiSpec::new("muteAll", "mute_all", Post, &["target"]),
    ApiSpec::new("unmuteAll", "unmute_all", Post, &["target"]),
    ApiSpec::new("setEssence", "set_essence", Post, &["target"]),
    ApiSpec::new("groupConfig", "group_config", RestGet, &["target"]),
    ApiSpec::new("memberInfo", "member_info", RestGet, &["target", "memberId"]),
    ApiSpec::new("memberAdmin", "member_admin", Post, &["target", "memberId", "assign"]),
    // Requests
    ApiSpec::new(
        "resp/newFriendRequestEvent",
        "resp_new_friend_request_event",
        Post,
        &["eventId", "fromId", "groupId", "operate"],
    ),
    ApiSpec::new(
        "resp/memberJoinRequestEvent",
        "resp_member_join_request_event",
        Post,
        &["eventId", "fromId", "groupId", "operate"],
    ),
    ApiSpec::new(
        "resp/botInvitedJoinGroupRequestEvent",
        "resp_bot_invited_join_group_request_event",
        Post,
        &["eventId", "fromId", "groupId", "operate"],
    ),
    // Console commands
    ApiSpec::new("cmd/execute", "cmd_execute", Post, &["command"]),
    ApiSpec::new("cmd/register", "cmd_register", Post, &["name", "usage", "description"]),
];

/// Finds an API by wire name or alias.
pub fn lookup(name: &str) -> Option<&'static ApiSpec> {
    APIS.iter().find(|api| api.name == name || api.alias == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lookup_by_name_and_alias() {
        let by_name = lookup("sendGroupMessage").unwrap();
        let by_alias = lookup("send_group_message").unwrap();
        assert_eq!(by_name, by_alias);
        assert_eq!(by_name.method, ApiMethod::Post);

        assert_eq!(lookup("file_list").unwrap().name, "file/list");
        assert!(lookup("sendGuildMessage").is_none());
    }

    #[test]
    fn test_names_are_unique() {
        for (i, api) in APIS.iter().enumerate() {
            for other in &APIS[i + 1..] {
                assert_ne!(api.name, other.name);
                assert_ne!(api.alias, other.alias);
            }
        }
    }

    #[test]
    fn test_validate_required() {
        let api = lookup("mute").unwrap();
        assert!(api.validate(&json!({"target": 1, "memberId": 2, "time": 60})).is_ok());

        let err = api
            .validate(&json!({"target": 1, "memberId": null}))
            .unwrap_err()
            .to_string();
        assert!(err.contains("memberId, time"), "{err}");
    }

    #[test]
    fn test_rest_write_method() {
        let api = lookup("groupConfig").unwrap();
        assert!(api.is_rest());
        assert_eq!(api.method, ApiMethod::RestGet);
        assert_eq!(api.write_method(), ApiMethod::RestPost);
        assert_eq!(lookup("recall").unwrap().write_method(), ApiMethod::Post);
    }
}
