//! Menu copy, button labels, and keyboard construction.
//!
//! Everything user-visible lives here: the handlers in `mod.rs` only decide
//! *which* menu or document to show. Keyboards come in two flavors per the
//! user's persisted preference -- inline buttons under the message, or a
//! reply keyboard below the input field.

use courier_core::orders::{ReceiptRecord, TtnRecord};
use courier_types::flow::{BroadcastAudience, OrderDocKind};
use courier_types::keyboard::{InlineButton, KeyboardButton, ReplyMarkup};
use courier_types::user::{KeyboardType, User, UserStats};

// ---------------------------------------------------------------------------
// Button labels (reply-keyboard presses arrive as plain text)
// ---------------------------------------------------------------------------

pub const LABEL_GET_TTN: &str = "📦 Get TTN";
pub const LABEL_GET_RECEIPT: &str = "🧾 Get receipt";
pub const LABEL_TTN: &str = "📦 TTN";
pub const LABEL_RECEIPT: &str = "🧾 Receipt";
pub const LABEL_BONUSES: &str = "🎁 Bonuses";
pub const LABEL_PROMOTIONS: &str = "🎯 Promotions";
pub const LABEL_INSTAGRAM: &str = "📷 Instagram";
pub const LABEL_MANAGER: &str = "💬 Manager";
pub const LABEL_ADMIN: &str = "👑 Admin";
pub const LABEL_START: &str = "🚀 Start";
pub const LABEL_SETTINGS: &str = "⚙️ Settings";

/// Callback actions shared between inline buttons and the router.
pub mod action {
    pub const GET_TTN: &str = "get_ttn";
    pub const GET_RECEIPT: &str = "get_receipt";
    pub const MENU_TTN: &str = "menu_ttn";
    pub const MENU_RECEIPT: &str = "menu_receipt";
    pub const MENU_BONUSES: &str = "menu_bonuses";
    pub const MENU_PROMOTIONS: &str = "menu_promotions";
    pub const MENU_INSTAGRAM: &str = "menu_instagram";
    pub const MENU_MANAGER: &str = "menu_manager";
    pub const MENU_START: &str = "menu_start";
    pub const MENU_SETTINGS: &str = "menu_settings";
    pub const MENU_BACK: &str = "menu_back";
    pub const SETTINGS_KEYBOARD_REPLY: &str = "settings_keyboard_reply";
    pub const SETTINGS_KEYBOARD_INLINE: &str = "settings_keyboard_inline";
    pub const ADMIN_MENU: &str = "admin_menu";
    pub const ADMIN_BROADCAST: &str = "admin_broadcast";
    pub const ADMIN_BROADCAST_VIP: &str = "admin_broadcast_vip";
    pub const ADMIN_STATISTICS: &str = "admin_statistics";
}

// ---------------------------------------------------------------------------
// Onboarding and main menu
// ---------------------------------------------------------------------------

pub fn onboarding_text(user: &User) -> String {
    let role_line = if user.is_admin() {
        "👑 Your role: Administrator"
    } else {
        "👤 Your role: User"
    };
    format!(
        "👋 Welcome, {}! 🎉\n\n{}\n\nChoose an action:",
        user.display_name(),
        role_line
    )
}

/// Onboarding menu: the document teasers (and the admin entry for admins).
pub fn onboarding_keyboard(user: &User) -> ReplyMarkup {
    let mut items = vec![
        (LABEL_GET_TTN, action::GET_TTN),
        (LABEL_GET_RECEIPT, action::GET_RECEIPT),
    ];
    if user.is_admin() {
        items.push((LABEL_ADMIN, action::ADMIN_MENU));
    }

    match user.keyboard_type {
        KeyboardType::Inline => ReplyMarkup::inline(
            items
                .into_iter()
                .map(|(label, data)| vec![InlineButton::callback(label, data)])
                .collect(),
        ),
        KeyboardType::Reply => ReplyMarkup::keyboard_of(
            items.into_iter().map(|(label, _)| vec![label]).collect(),
        ),
    }
}

pub const MAIN_MENU_TEXT: &str = "👋 Choose an action:";

pub fn main_menu_keyboard(user: &User) -> ReplyMarkup {
    match user.keyboard_type {
        KeyboardType::Inline => {
            let mut items = vec![
                (LABEL_TTN, action::MENU_TTN),
                (LABEL_RECEIPT, action::MENU_RECEIPT),
                (LABEL_BONUSES, action::MENU_BONUSES),
                (LABEL_PROMOTIONS, action::MENU_PROMOTIONS),
                (LABEL_INSTAGRAM, action::MENU_INSTAGRAM),
                (LABEL_MANAGER, action::MENU_MANAGER),
            ];
            if user.is_admin() {
                items.push((LABEL_ADMIN, action::ADMIN_MENU));
            }
            items.push((LABEL_START, action::MENU_START));
            items.push((LABEL_SETTINGS, action::MENU_SETTINGS));

            ReplyMarkup::inline(
                items
                    .into_iter()
                    .map(|(label, data)| vec![InlineButton::callback(label, data)])
                    .collect(),
            )
        }
        KeyboardType::Reply => {
            let mut rows = vec![
                vec![LABEL_TTN, LABEL_RECEIPT, LABEL_BONUSES],
                vec![LABEL_PROMOTIONS, LABEL_INSTAGRAM, LABEL_MANAGER],
            ];
            if user.is_admin() {
                rows.push(vec![LABEL_ADMIN, LABEL_START, LABEL_SETTINGS]);
            } else {
                rows.push(vec![LABEL_START, LABEL_SETTINGS]);
            }
            ReplyMarkup::keyboard_of(rows)
        }
    }
}

// ---------------------------------------------------------------------------
// Static info pages
// ---------------------------------------------------------------------------

pub const BONUSES_TEXT: &str =
    "🎁 Bonus program\n\nYou earn 5% of every order back in bonus points.\nPoints can cover up to half of a future order.";

pub const PROMOTIONS_TEXT: &str =
    "🎯 Current promotions\n\n• Free delivery on orders over 1000 UAH\n• -10% on your first order with code WELCOME";

pub const INSTAGRAM_TEXT: &str =
    "📷 Follow us on Instagram for new arrivals and giveaways:\n\nhttps://instagram.com/courier.shop";

pub const MANAGER_TEXT: &str =
    "💬 Our manager is happy to help:\n\n@courier_support (9:00-18:00, Mon-Fri)";

pub const NO_ADMIN_ACCESS_TEXT: &str = "❌ You don't have access to the admin panel";

// ---------------------------------------------------------------------------
// Order document flows
// ---------------------------------------------------------------------------

/// Ask the user to share a phone number before a document lookup.
pub fn phone_prompt(kind: OrderDocKind) -> &'static str {
    match kind {
        OrderDocKind::Ttn => {
            "📦 Sharing your phone number is required to look up a TTN\n\n🔐 Your data is protected and only used to find your orders"
        }
        OrderDocKind::Receipt => {
            "🧾 Sharing your phone number is required to look up a receipt\n\n🔐 Your data is protected and only used to find your orders"
        }
    }
}

pub fn contact_request_keyboard() -> ReplyMarkup {
    ReplyMarkup::keyboard(vec![vec![KeyboardButton::contact_request(
        "📱 Share phone number",
    )]])
}

/// Ask the user for the order number.
pub fn order_prompt(kind: OrderDocKind) -> &'static str {
    match kind {
        OrderDocKind::Ttn => {
            "📦 Enter the order number to get your TTN:\n\n📝 Just send the order number in your next message"
        }
        OrderDocKind::Receipt => {
            "🧾 Enter the order number to get your receipt:\n\n📝 Just send the order number in your next message"
        }
    }
}

pub fn ttn_text(record: &TtnRecord) -> String {
    format!(
        "📦 TTN for order {}\n\n🚚 TTN: {}\n📍 Status: {}\n📅 Delivery date: {}\n👤 Recipient: {}\n🏠 Address: {}",
        record.order_number,
        record.ttn,
        record.status,
        record.delivery_date,
        record.recipient,
        record.address
    )
}

pub fn receipt_text(record: &ReceiptRecord) -> String {
    format!(
        "🧾 Receipt for order {}\n\n🔢 Number: {}\n💰 Amount: {:.2} UAH\n📅 Date: {}\n🛒 Items: {}",
        record.order_number,
        record.receipt_number,
        record.amount,
        record.date,
        record.items.join(", ")
    )
}

pub fn order_not_found_text(kind: OrderDocKind, order_number: &str) -> String {
    let what = match kind {
        OrderDocKind::Ttn => "TTN",
        OrderDocKind::Receipt => "receipt",
    };
    format!(
        "❌ No {what} found for order \"{}\".\n\nCheck the number and try again.",
        order_number.trim()
    )
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

pub fn settings_text(current: KeyboardType) -> String {
    let current_name = match current {
        KeyboardType::Reply => "Reply",
        KeyboardType::Inline => "Inline",
    };
    format!(
        "⚙️ Settings\n\nChoose a keyboard type:\n\nCurrent type: {current_name}\n• Reply - buttons below the input field\n• Inline - buttons under the message"
    )
}

pub fn settings_keyboard(current: KeyboardType) -> ReplyMarkup {
    let reply_label = if current == KeyboardType::Reply {
        "✅ Reply"
    } else {
        "Reply"
    };
    let inline_label = if current == KeyboardType::Inline {
        "✅ Inline"
    } else {
        "Inline"
    };
    ReplyMarkup::inline(vec![
        vec![
            InlineButton::callback(reply_label, action::SETTINGS_KEYBOARD_REPLY),
            InlineButton::callback(inline_label, action::SETTINGS_KEYBOARD_INLINE),
        ],
        vec![InlineButton::callback("⬅️ Back", action::MENU_BACK)],
    ])
}

// ---------------------------------------------------------------------------
// Admin panel
// ---------------------------------------------------------------------------

pub const ADMIN_MENU_TEXT: &str = "👑 Admin panel\n\nChoose an action:";

pub fn admin_menu_keyboard() -> ReplyMarkup {
    ReplyMarkup::inline(vec![
        vec![InlineButton::callback(
            "📢 Broadcast to everyone",
            action::ADMIN_BROADCAST,
        )],
        vec![InlineButton::callback(
            "⭐ Broadcast to VIP",
            action::ADMIN_BROADCAST_VIP,
        )],
        vec![InlineButton::callback(
            "📊 Statistics",
            action::ADMIN_STATISTICS,
        )],
    ])
}

pub fn broadcast_prompt(audience: BroadcastAudience) -> &'static str {
    match audience {
        BroadcastAudience::All => {
            "📢 Send the text to broadcast to all users:\n\n✍️ Your next message will be delivered as-is"
        }
        BroadcastAudience::Vip => {
            "⭐ Send the text to broadcast to VIP users:\n\n✍️ Your next message will be delivered as-is"
        }
    }
}

pub fn broadcast_started_text(audience: BroadcastAudience) -> &'static str {
    match audience {
        BroadcastAudience::All => "⏳ Starting broadcast to all users...",
        BroadcastAudience::Vip => "⏳ Starting broadcast to VIP users...",
    }
}

pub fn broadcast_report_text(
    audience: BroadcastAudience,
    outcome: courier_types::broadcast::BroadcastOutcome,
) -> String {
    let icon = match audience {
        BroadcastAudience::All => "📢",
        BroadcastAudience::Vip => "⭐",
    };
    format!(
        "{icon} Broadcast finished!\n\n✅ Sent: {}\n❌ Failed: {}\n📊 Recipients: {}",
        outcome.success, outcome.failed, outcome.total
    )
}

pub const BROADCAST_FAILED_TEXT: &str = "❌ Broadcast failed, please try again later";

pub fn stats_text(stats: &UserStats) -> String {
    format!(
        "📊 Statistics\n\n📈 Visits today: {}\n👥 Total users: {}\n⭐ Total VIP users: {}\n🆕 New users today: {}\n⭐ New VIP users today: {}",
        stats.visits_today,
        stats.total_users,
        stats.total_vip,
        stats.new_users_today,
        stats.new_vip_today
    )
}

pub const STATS_FAILED_TEXT: &str = "❌ Could not load statistics";

pub fn stats_keyboard() -> ReplyMarkup {
    ReplyMarkup::inline(vec![
        vec![InlineButton::callback("🔄 Refresh", action::ADMIN_STATISTICS)],
        vec![InlineButton::callback("⬅️ Back", action::ADMIN_MENU)],
    ])
}
