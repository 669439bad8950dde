//! Telegram update handlers.

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::utils::command::BotCommands;
use tracing::{debug, warn};

use crate::event::Event;
use crate::state::SessionMachine;
use crate::transport::{Conversation, TelegramConversation};
use crate::views;

/// Bot commands that can be invoked with /.
#[derive(BotCommands, Clone, Debug)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Open the main menu")]
    Start,

    #[command(description = "End the conversation")]
    Cancel,

    #[command(description = "Show help message")]
    Help,
}

/// Handle a command message.
pub async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    machine: Arc<SessionMachine>,
) -> ResponseResult<()> {
    let chat_id = msg.chat.id;
    let mut conversation = TelegramConversation::from_message(bot, &msg);

    let event = match cmd {
        Command::Start => Event::Start,
        Command::Cancel => Event::Cancel,
        Command::Help => {
            if let Err(e) = conversation.render(views::help()).await {
                warn!(chat_id = %chat_id, error = %e, "Failed to send help");
            }
            return Ok(());
        }
    };

    machine.handle(chat_id.0, event, &mut conversation).await;
    Ok(())
}

/// Handle a button press.
pub async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    machine: Arc<SessionMachine>,
) -> ResponseResult<()> {
    let event = q.data.as_deref().and_then(Event::from_payload);

    let (Some(event), Some(mut conversation)) =
        (event, TelegramConversation::from_callback(bot.clone(), &q))
    else {
        warn!(data = ?q.data, "Ignoring callback");
        bot.answer_callback_query(q.id).await?;
        return Ok(());
    };

    debug!(chat_id = %conversation.chat_id(), event = event.name(), "Callback received");
    let chat_id = conversation.chat_id().0;
    machine.handle(chat_id, event, &mut conversation).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parsing() {
        assert!(matches!(
            Command::parse("/start", "stormwatch_bot"),
            Ok(Command::Start)
        ));
        assert!(matches!(
            Command::parse("/cancel", "stormwatch_bot"),
            Ok(Command::Cancel)
        ));
        assert!(Command::parse("/connect foo", "stormwatch_bot").is_err());
    }

    #[test]
    fn test_command_descriptions() {
        let text = Command::descriptions().to_string();
        assert!(text.contains("/start"));
        assert!(text.contains("/cancel"));
        assert!(text.contains("/help"));
    }
}
