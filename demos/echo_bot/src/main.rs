//! Echo Bot Example
//!
//! Connects to mirai-api-http through the bots listed in `yiri.toml` and
//! answers a few commands:
//!
//! - `/echo <text>` sends the text back
//! - `/ping` answers `Pong!`, quoting the command in groups
//! - `/code` sends back the mirai code of the message
//!
//! Every message is logged by a handler subscribed to the `MessageEvent`
//! parent name, so it sees friend, group and temp messages alike. Parent
//! names are dispatched after the concrete one, so it logs after the reply.
//!
//! # Usage
//!
//! ```bash
//! cargo run --package echo-bot -- --config demos/echo_bot/yiri.toml
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Weak};

use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use yiri_adapter_mirai::{
    ADAPTER_NAME, FriendMessage, GroupMessage, MessageChain, MiraiBot, TempMessage,
};
use yiri_core::{BoxedEvent, EventBus, Propagation};
use yiri_runtime::YiriRuntime;

#[derive(Parser, Debug)]
#[command(about = "Echo bot for mirai-api-http")]
struct Args {
    /// Configuration file to load instead of searching the current directory.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `production`.
    #[arg(short, long)]
    profile: Option<String>,
}

/// Builds the reply for a command, if the text is one.
fn reply_for(chain: &MessageChain) -> Option<MessageChain> {
    let text = chain.plain_text();
    let text = text.trim();

    if let Some(content) = text.strip_prefix("/echo ") {
        return Some(MessageChain::text(content));
    }
    match text {
        "/ping" => Some(MessageChain::text("Pong!")),
        "/code" => Some(MessageChain::text(chain.to_code_string())),
        _ => None,
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn log_message(event: BoxedEvent) -> Propagation {
    if let Some(msg) = event.downcast_ref::<FriendMessage>() {
        info!("[Friend {}] {}", msg.sender.id, msg.message_chain.to_display_string());
    } else if let Some(msg) = event.downcast_ref::<GroupMessage>() {
        info!(
            "[Group {}] {} ({}): {}",
            msg.group().id,
            msg.sender.member_name,
            msg.sender.id,
            msg.message_chain.to_display_string()
        );
    } else if let Some(msg) = event.downcast_ref::<TempMessage>() {
        info!("[Temp {}] {}", msg.sender.id, msg.message_chain.to_display_string());
    }
    Propagation::Continue
}

/// Subscribes the command handlers of one bot.
///
/// The bus is shared by every bot, so each handler only answers events its
/// own bot received.
fn subscribe_commands(bus: &EventBus, bot: Weak<MiraiBot>, qq: i64) {
    let friend_bot = bot.clone();
    bus.on::<FriendMessage, _, _, _>(0, move |msg| {
        let bot = friend_bot.clone();
        async move {
            if msg.received_by != Some(qq) {
                return;
            }
            let (Some(bot), Some(reply)) = (bot.upgrade(), reply_for(&msg.message_chain)) else {
                return;
            };
            if let Err(e) = bot.send_friend_message(msg.sender.id, &reply).await {
                error!("Failed to send friend reply: {e}");
            }
        }
    });

    bus.on::<GroupMessage, _, _, _>(0, move |msg| {
        let bot = bot.clone();
        async move {
            if msg.received_by != Some(qq) {
                return;
            }
            let (Some(bot), Some(reply)) = (bot.upgrade(), reply_for(&msg.message_chain)) else {
                return;
            };
            let quote = Some(msg.message_chain.message_id()).filter(|id| *id >= 0);
            if let Err(e) = bot.send_group_message(msg.group().id, &reply, quote).await {
                error!("Failed to send group reply: {e}");
            }
        }
    });
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = YiriRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }
    let runtime = builder.build()?;

    runtime.bus().subscribe("MessageEvent", 0, log_message);

    runtime.register_factory(ADAPTER_NAME, |config, bus| {
        let bot = Arc::new(MiraiBot::from_settings(
            &config.id,
            config.qq,
            &config.settings,
            Arc::clone(&bus),
        )?);
        subscribe_commands(&bus, Arc::downgrade(&bot), config.qq);
        Ok(bot)
    });

    runtime.run().await?;

    Ok(())
}
