use anyhow::Result;
use dotenvy::dotenv;
use log::{error, info, warn};
use serenity::async_trait;
use serenity::http::Http;
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::ChannelId;
use serenity::prelude::*;
use std::sync::Arc;

use remindbot::commands::{create_all_handlers, CommandContext, CommandRegistry, CommandRequest};
use remindbot::core::{replies, Config};
use remindbot::database::Database;
use remindbot::features::reminders::{Notifier, SchedulingEngine};

/// Notifier that sends through the Discord REST API.
struct DiscordNotifier {
    http: Arc<Http>,
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn deliver(&self, chat_id: i64, text: &str) -> Result<()> {
        ChannelId(chat_id as u64).say(&self.http, text).await?;
        Ok(())
    }
}

struct Handler {
    ctx: Arc<CommandContext>,
    registry: CommandRegistry,
    prefix: String,
}

impl Handler {
    /// Whether the sender passes the admin gate: DMs always do, guild
    /// members need ownership or the administrator permission.
    async fn is_admin(ctx: &Context, msg: &Message) -> bool {
        let Some(guild_id) = msg.guild_id else {
            return true;
        };
        let Some(guild) = ctx.cache.guild(guild_id) else {
            return false;
        };
        if guild.owner_id == msg.author.id {
            return true;
        }
        match guild.member(&ctx.http, msg.author.id).await {
            Ok(member) => member
                .permissions(&ctx.cache)
                .map(|p| p.administrator())
                .unwrap_or(false),
            Err(e) => {
                warn!("Failed to look up member {}: {e}", msg.author.id);
                false
            }
        }
    }

    async fn chat_title(ctx: &Context, msg: &Message) -> String {
        msg.channel_id
            .name(&ctx.cache)
            .await
            .unwrap_or_else(|| "direct message".to_string())
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }
        let chat_id = msg.channel_id.0 as i64;

        let Some(rest) = msg.content.trim().strip_prefix(&self.prefix) else {
            // Any ordinary message disarms a pending stopall confirmation.
            if let Err(e) = self.ctx.database.set_stop_armed(chat_id, false).await {
                error!("Failed to disarm stop latch for chat {chat_id}: {e}");
            }
            return;
        };

        let mut tokens = rest.split_whitespace();
        let Some(command) = tokens.next().map(str::to_lowercase) else {
            return;
        };
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let request = CommandRequest {
            chat_id,
            chat_title: Self::chat_title(&ctx, &msg).await,
            from_user: msg.author.name.clone(),
            is_admin: Self::is_admin(&ctx, &msg).await,
            command,
            args,
        };

        let reply = match self.registry.get(&request.command) {
            Some(handler) => match handler.handle(self.ctx.clone(), &request).await {
                Ok(reply) => reply,
                Err(e) => {
                    error!("Error handling {} in chat {chat_id}: {e}", request.command);
                    "Sorry, I encountered an error processing your command.".to_string()
                }
            },
            None => replies::UNKNOWN_COMMAND.to_string(),
        };

        if let Err(why) = msg.channel_id.say(&ctx.http, reply).await {
            error!("Failed to send reply to chat {chat_id}: {why}");
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected and ready!", ready.user.name);
        info!("Connected to {} guilds", ready.guilds.len());
        info!("{} commands registered", self.registry.len());
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting reminder bot...");

    let database = Database::new(&config.database_path).await?;

    // The notifier keeps its own REST handle so reminder timers can fire
    // independently of the gateway connection.
    let http = Arc::new(Http::new(&config.discord_token));
    let engine = SchedulingEngine::new(database.clone(), Arc::new(DiscordNotifier { http }));

    // Re-arm everything that survived the restart before accepting traffic.
    let chats = database.all_chats().await?;
    let rearmed = engine.reload(&chats).await?;
    info!("Re-armed {rearmed} reminder(s) across {} chat(s)", chats.len());

    let command_context = Arc::new(CommandContext::new(
        database,
        engine,
        config.default_time_zone.clone(),
    ));
    let mut registry = CommandRegistry::new();
    for handler in create_all_handlers() {
        registry.register(handler);
    }

    let handler = Handler {
        ctx: command_context,
        registry,
        prefix: config.command_prefix.clone(),
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Bot configured successfully. Connecting to Discord gateway...");

    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
