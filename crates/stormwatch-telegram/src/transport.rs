//! Delivery of views to one Telegram conversation.

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{
    CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup, MessageId, ParseMode,
};
use teloxide::{ApiError, RequestError};
use tracing::debug;

use crate::error::Result;
use crate::views::View;

/// The reply side of one inbound event.
///
/// The state machine calls `acknowledge` once, then `render` any number of
/// times; each render replaces what the user saw before.
#[async_trait]
pub trait Conversation: Send {
    async fn acknowledge(&mut self) -> Result<()>;

    async fn render(&mut self, view: View) -> Result<()>;
}

/// Build the inline keyboard for a view.
pub fn keyboard_markup(view: &View) -> Option<InlineKeyboardMarkup> {
    if view.keyboard.is_empty() {
        return None;
    }

    let rows = view.keyboard.iter().map(|row| {
        row.iter()
            .map(|button| InlineKeyboardButton::callback(button.label.clone(), button.payload.clone()))
            .collect::<Vec<_>>()
    });
    Some(InlineKeyboardMarkup::new(rows))
}

/// [`Conversation`] over a teloxide bot.
///
/// A command conversation sends a fresh message on first render and edits it
/// afterwards. A callback conversation answers the query and edits the
/// message the button belonged to.
pub struct TelegramConversation {
    bot: Bot,
    chat_id: ChatId,
    callback_id: Option<String>,
    message_id: Option<MessageId>,
}

impl TelegramConversation {
    /// Conversation for a command message.
    pub fn from_message(bot: Bot, msg: &Message) -> Self {
        Self {
            bot,
            chat_id: msg.chat.id,
            callback_id: None,
            message_id: None,
        }
    }

    /// Conversation for a button press. `None` when the originating message
    /// is not available to the bot anymore.
    pub fn from_callback(bot: Bot, q: &CallbackQuery) -> Option<Self> {
        let message = q.message.as_ref()?;
        Some(Self {
            bot,
            chat_id: message.chat().id,
            callback_id: Some(q.id.clone()),
            message_id: Some(message.id()),
        })
    }

    pub fn chat_id(&self) -> ChatId {
        self.chat_id
    }

    async fn edit(&self, message_id: MessageId, view: &View) -> Result<()> {
        let mut req = self
            .bot
            .edit_message_text(self.chat_id, message_id, &view.text)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = keyboard_markup(view) {
            req = req.reply_markup(markup);
        }

        match req.await {
            Ok(_) => Ok(()),
            // Same text and keyboard as before; nothing to do.
            Err(RequestError::Api(ApiError::MessageNotModified)) => {
                debug!(chat_id = %self.chat_id, "Message not modified");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn send(&self, view: &View) -> Result<MessageId> {
        let mut req = self
            .bot
            .send_message(self.chat_id, &view.text)
            .parse_mode(ParseMode::Html);
        if let Some(markup) = keyboard_markup(view) {
            req = req.reply_markup(markup);
        }
        let sent = req.await?;
        Ok(sent.id)
    }
}

#[async_trait]
impl Conversation for TelegramConversation {
    async fn acknowledge(&mut self) -> Result<()> {
        if let Some(id) = self.callback_id.take() {
            self.bot.answer_callback_query(id).await?;
        }
        Ok(())
    }

    async fn render(&mut self, view: View) -> Result<()> {
        match self.message_id {
            Some(message_id) => self.edit(message_id, &view).await,
            None => {
                self.message_id = Some(self.send(&view).await?);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::views;

    #[test]
    fn test_keyboard_markup_rows() {
        let markup = keyboard_markup(&views::sector_menu()).unwrap();
        assert_eq!(markup.inline_keyboard.len(), 4);
        assert_eq!(markup.inline_keyboard[0][0].text, "Central sector");
    }

    #[test]
    fn test_plain_view_has_no_markup() {
        assert!(keyboard_markup(&views::cancelled()).is_none());
    }
}
