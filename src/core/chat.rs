/// Chat channels — one per faction, with history and an unread marker.
use crate::schema::case::ChatMessage;
use crate::schema::faction::Faction;

#[derive(Debug, Clone, Default)]
struct Channel {
    history: Vec<String>,
    unread: bool,
}

#[derive(Debug, Clone)]
pub struct ChatLog {
    channels: [Channel; 4],
    active: Faction,
}

impl Default for ChatLog {
    fn default() -> Self {
        Self {
            channels: Default::default(),
            active: Faction::Truth,
        }
    }
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Faction {
        self.active
    }

    /// Append a message to its sender's channel. Returns true when the
    /// channel was inactive and is now flagged unread.
    pub fn post(&mut self, message: &ChatMessage) -> bool {
        let is_active = message.sender == self.active;
        let channel = self.channel_mut(message.sender);
        channel.history.push(message.content.clone());
        if !is_active && !channel.unread {
            channel.unread = true;
            return true;
        }
        false
    }

    /// Make `faction` the active channel and clear its unread marker.
    pub fn open(&mut self, faction: Faction) -> &[String] {
        self.active = faction;
        let channel = self.channel_mut(faction);
        channel.unread = false;
        &channel.history
    }

    pub fn history(&self, faction: Faction) -> &[String] {
        &self.channel(faction).history
    }

    pub fn is_unread(&self, faction: Faction) -> bool {
        self.channel(faction).unread
    }

    fn channel(&self, faction: Faction) -> &Channel {
        &self.channels[faction.slot()]
    }

    fn channel_mut(&mut self, faction: Faction) -> &mut Channel {
        &mut self.channels[faction.slot()]
    }
}
