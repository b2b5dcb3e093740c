// ABOUTME: Fixed AMXBans 5.x to 6.x table catalogue
// ABOUTME: Lists tables to clear, tables to count, and the ordered column mappings

use super::transform::{Expr, LoadMode, TableTransform};

/// Target tables emptied before loading
///
/// Ten of these (logs through reasons_to_set) are never repopulated by the
/// migration; the web application's own setup re-seeds them or leaves them
/// empty. `webconfig` is deliberately absent so an existing row survives.
pub const TRUNCATE_TABLES: &[&str] = &[
    "amxadmins",
    "webadmins",
    "levels",
    "bans",
    "bans_edit",
    "serverinfo",
    "reasons",
    "admins_servers",
    "logs",
    "comments",
    "files",
    "flagged",
    "bbcode",
    "smilies",
    "usermenu",
    "modulconfig",
    "reasons_set",
    "reasons_to_set",
];

/// Tables counted on the source before and on the target after the load
pub const INVENTORY_TABLES: &[&str] = &["amxadmins", "webadmins", "bans", "reasons"];

/// Source table holding ban records, audited for unreadable durations
pub const BANS_TABLE: &str = "bans";

/// Nickname substituted when a ban or ban edit has none
pub const UNKNOWN_NICK: &str = "Unknown";

/// Default ban type (steam id ban) for records without one
pub const DEFAULT_BAN_TYPE: &str = "S";

/// Default reason for ban records without one
pub const DEFAULT_BAN_REASON: &str = "No reason given";

/// Default reason for ban history rows without an unban reason
pub const DEFAULT_EDIT_REASON: &str = "tempban expired";

/// Capability flags shared by both schemas' `levels` tables
const LEVEL_CAPABILITIES: &[&str] = &[
    "bans_add",
    "bans_edit",
    "bans_delete",
    "bans_unban",
    "bans_import",
    "bans_export",
    "amxadmins_view",
    "amxadmins_edit",
    "webadmins_view",
    "webadmins_edit",
    "permissions_edit",
    "prune_db",
    "servers_edit",
    "ip_view",
];

/// Every transform, in load order
pub fn transforms() -> Vec<TableTransform> {
    vec![
        admins(),
        web_admins(),
        levels(),
        bans(),
        ban_edits(),
        server_info(),
        reasons(),
        admin_servers(),
        web_config(),
    ]
}

fn admins() -> TableTransform {
    TableTransform {
        label: "admins",
        source: Some("amxadmins"),
        target: "amxadmins",
        columns: vec![
            ("id", Expr::Column("id")),
            ("username", Expr::Column("username")),
            ("password", Expr::Column("password")),
            ("access", Expr::Column("access")),
            ("flags", Expr::Column("flags")),
            ("steamid", Expr::Column("steamid")),
            (
                "nickname",
                Expr::CoalesceText {
                    column: "nickname",
                    default: "",
                },
            ),
            ("ashow", Expr::Int(0)),
            ("created", Expr::UnixNow),
            ("expired", Expr::Int(0)),
            ("days", Expr::Int(0)),
        ],
        filter: None,
        mode: LoadMode::Replace,
    }
}

fn web_admins() -> TableTransform {
    TableTransform {
        label: "web admins",
        source: Some("webadmins"),
        target: "webadmins",
        columns: vec![
            ("id", Expr::Column("id")),
            ("username", Expr::Column("username")),
            ("password", Expr::Column("password")),
            ("level", Expr::CastUnsigned("level")),
            ("logcode", Expr::Column("logcode")),
            ("email", Expr::Text("")),
            ("last_action", Expr::Int(0)),
            ("try", Expr::Int(0)),
        ],
        filter: None,
        mode: LoadMode::Replace,
    }
}

fn levels() -> TableTransform {
    let mut columns = vec![("level", Expr::Column("level"))];
    columns.extend(
        LEVEL_CAPABILITIES
            .iter()
            .map(|&capability| (capability, Expr::Column(capability))),
    );
    // No source equivalent; web settings stay locked until granted in the UI.
    columns.push(("websettings_view", Expr::Text("no")));
    columns.push(("websettings_edit", Expr::Text("no")));

    TableTransform {
        label: "permission levels",
        source: Some("levels"),
        target: "levels",
        columns,
        filter: None,
        mode: LoadMode::Replace,
    }
}

fn bans() -> TableTransform {
    TableTransform {
        label: "bans",
        source: Some("bans"),
        target: "bans",
        columns: vec![
            ("bid", Expr::Column("bid")),
            ("player_ip", Expr::Column("player_ip")),
            ("player_id", Expr::Column("player_id")),
            (
                "player_nick",
                Expr::CoalesceText {
                    column: "player_nick",
                    default: UNKNOWN_NICK,
                },
            ),
            ("admin_ip", Expr::Column("admin_ip")),
            ("admin_id", Expr::Column("admin_id")),
            (
                "admin_nick",
                Expr::CoalesceText {
                    column: "admin_nick",
                    default: UNKNOWN_NICK,
                },
            ),
            (
                "ban_type",
                Expr::DefaultIfBlank {
                    column: "ban_type",
                    default: DEFAULT_BAN_TYPE,
                },
            ),
            (
                "ban_reason",
                Expr::DefaultIfBlank {
                    column: "ban_reason",
                    default: DEFAULT_BAN_REASON,
                },
            ),
            ("ban_created", Expr::Column("ban_created")),
            ("ban_length", Expr::BanLengthSeconds("ban_length")),
            ("server_ip", Expr::Column("server_ip")),
            ("server_name", Expr::Column("server_name")),
            ("ban_kicks", Expr::Int(0)),
            ("expired", Expr::Int(0)),
            ("imported", Expr::Int(1)),
        ],
        filter: None,
        mode: LoadMode::Replace,
    }
}

fn ban_edits() -> TableTransform {
    TableTransform {
        label: "ban edits",
        source: Some("banhistory"),
        target: "bans_edit",
        columns: vec![
            ("id", Expr::Column("bhid")),
            ("bid", Expr::Column("bhid")),
            ("edit_time", Expr::Column("unban_created")),
            (
                "admin_nick",
                Expr::CoalesceText {
                    column: "unban_admin_nick",
                    default: UNKNOWN_NICK,
                },
            ),
            (
                "edit_reason",
                Expr::DefaultIfBlank {
                    column: "unban_reason",
                    default: DEFAULT_EDIT_REASON,
                },
            ),
        ],
        filter: Some("s.`bhid` > 0"),
        mode: LoadMode::Replace,
    }
}

fn server_info() -> TableTransform {
    TableTransform {
        label: "servers",
        source: Some("serverinfo"),
        target: "serverinfo",
        columns: vec![
            ("id", Expr::Column("id")),
            ("timestamp", Expr::Column("timestamp")),
            ("hostname", Expr::Column("hostname")),
            ("address", Expr::Column("address")),
            ("gametype", Expr::Column("gametype")),
            ("rcon", Expr::Column("rcon")),
            ("amxban_version", Expr::Column("amxban_version")),
            ("amxban_motd", Expr::Column("amxban_motd")),
            (
                "motd_delay",
                Expr::CoalesceInt {
                    column: "motd_delay",
                    default: 10,
                },
            ),
            ("amxban_menu", Expr::Int(1)),
            ("reasons", Expr::Int(0)),
            ("timezone_fixx", Expr::Int(0)),
        ],
        filter: None,
        mode: LoadMode::Replace,
    }
}

fn reasons() -> TableTransform {
    TableTransform {
        label: "reasons",
        source: Some("reasons"),
        target: "reasons",
        columns: vec![
            ("id", Expr::Column("id")),
            ("reason", Expr::Column("reason")),
            ("static_bantime", Expr::Int(0)),
        ],
        filter: None,
        mode: LoadMode::Replace,
    }
}

fn admin_servers() -> TableTransform {
    TableTransform {
        label: "admin servers",
        source: Some("admins_servers"),
        target: "admins_servers",
        columns: vec![
            ("admin_id", Expr::Column("admin_id")),
            ("server_id", Expr::Column("server_id")),
            ("custom_flags", Expr::Text("")),
            ("use_static_bantime", Expr::Text("yes")),
        ],
        filter: None,
        mode: LoadMode::Replace,
    }
}

fn web_config() -> TableTransform {
    TableTransform {
        label: "web config",
        source: None,
        target: "webconfig",
        columns: vec![
            ("cookie", Expr::Text("amxbans")),
            ("design", Expr::Text("default")),
            ("bans_per_page", Expr::Int(50)),
            ("banner", Expr::Text("amxbans.png")),
            ("banner_url", Expr::Text("http://www.amxbans.net")),
            ("default_lang", Expr::Text("english")),
            ("start_page", Expr::Text("ban_list.php")),
            ("show_comment_count", Expr::Int(1)),
            ("show_demo_count", Expr::Int(1)),
            ("show_kick_count", Expr::Int(1)),
            ("demo_all", Expr::Int(0)),
            ("comment_all", Expr::Int(0)),
            ("use_capture", Expr::Int(1)),
            ("max_file_size", Expr::Int(2)),
            ("file_type", Expr::Text("dem,zip,rar,jpg,gif")),
            ("auto_prune", Expr::Int(0)),
            ("max_offences", Expr::Int(10)),
            ("max_offences_reason", Expr::Text("max offences reached")),
            ("use_demo", Expr::Int(1)),
            ("use_comment", Expr::Int(1)),
        ],
        filter: None,
        mode: LoadMode::InsertIfAbsent,
    }
}
