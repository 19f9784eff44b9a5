use std::time::{Duration, Instant};

use log::{debug, info};
use serde::Deserialize;

use crate::session::models::{Account, Character};
use crate::session::normalize::{AccountPayload, normalize_account};
use crate::session::state::UserAction;
use crate::util::{IdGenerator, non_blank};

pub mod models;
pub mod normalize;
pub mod state;

pub const DEFAULT_LOGIN_LABEL: &str = "Add Jagex Account";
/// How long a character stays in the launching state after "play".
pub const PLAY_LAUNCH_INTERVAL: Duration = Duration::from_secs(2);

/// What to do when an `account-added` notification names an email we already hold.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    #[default]
    Append,
    MergeByEmail,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct PlaySlot {
    account_id: String,
    character_id: String,
    deadline: Instant,
}

/// Owned state for the accounts screen. Every mutation goes through a method here.
#[derive(Debug)]
pub struct SessionStore {
    accounts: Vec<Account>,
    expanded: Option<String>,
    playing: Option<PlaySlot>,
    login_status_text: String,
    duplicate_policy: DuplicatePolicy,
    ids: IdGenerator,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DuplicatePolicy::default())
    }
}

impl SessionStore {
    pub fn new(duplicate_policy: DuplicatePolicy) -> Self {
        Self {
            accounts: Vec::new(),
            expanded: None,
            playing: None,
            login_status_text: DEFAULT_LOGIN_LABEL.to_owned(),
            duplicate_policy,
            ids: IdGenerator::new(),
        }
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    #[cfg(test)]
    pub fn account(&self, account_id: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == account_id)
    }

    #[cfg(test)]
    pub fn expanded(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    pub fn is_expanded(&self, account_id: &str) -> bool {
        self.expanded.as_deref() == Some(account_id)
    }

    /// `(account_id, character_id)` of the character currently launching.
    pub fn playing(&self) -> Option<(&str, &str)> {
        self.playing
            .as_ref()
            .map(|slot| (slot.account_id.as_str(), slot.character_id.as_str()))
    }

    /// Character ids come from the backend and repeat across duplicate accounts,
    /// so the owning account is part of the key.
    pub fn is_playing(&self, account_id: &str, character_id: &str) -> bool {
        self.playing() == Some((account_id, character_id))
    }

    pub fn play_deadline(&self) -> Option<Instant> {
        self.playing.as_ref().map(|slot| slot.deadline)
    }

    pub fn login_status_text(&self) -> &str {
        &self.login_status_text
    }

    pub fn handle_action(&mut self, action: UserAction) {
        match action {
            UserAction::AddAccount {
                account_name,
                email,
            } => {
                self.add_account(&account_name, &email);
            }
            UserAction::RemoveAccount { account_id } => self.remove_account(&account_id),
            UserAction::ToggleExpand { account_id } => self.toggle_expand(&account_id),
            UserAction::CreateCharacter { account_id } => self.create_character(&account_id),
            UserAction::Play {
                account_id,
                character_id,
            } => self.begin_play(&account_id, &character_id),
            UserAction::CancelPlay => self.end_play(),
        }
    }

    /// Append a user-entered account. Blank name or email is rejected without touching state.
    pub fn add_account(&mut self, account_name: &str, email: &str) -> Option<String> {
        let (Some(account_name), Some(email)) = (non_blank(account_name), non_blank(email)) else {
            debug!("add_account: rejected blank name or email");
            return None;
        };
        let id = self.ids.next_id();
        self.accounts.push(Account {
            id: id.clone(),
            account_name: account_name.to_owned(),
            email: email.to_owned(),
            characters: Vec::new(),
        });
        info!("add_account: added {} ({})", account_name, id);
        Some(id)
    }

    pub fn remove_account(&mut self, account_id: &str) {
        let before = self.accounts.len();
        self.accounts.retain(|a| a.id != account_id);
        if self.accounts.len() == before {
            debug!("remove_account: {} not present", account_id);
            return;
        }
        if self.is_expanded(account_id) {
            self.expanded = None;
        }
        info!("remove_account: removed {}", account_id);
    }

    pub fn toggle_expand(&mut self, account_id: &str) {
        if self.is_expanded(account_id) {
            self.expanded = None;
        } else {
            self.expanded = Some(account_id.to_owned());
        }
        debug!("toggle_expand: expanded={:?}", self.expanded);
    }

    pub fn create_character(&mut self, account_id: &str) {
        let Some(index) = self.accounts.iter().position(|a| a.id == account_id) else {
            debug!("create_character: account {} not present", account_id);
            return;
        };
        let character = Character::placeholder(self.ids.next_id());
        debug!(
            "create_character: {} on account {}",
            character.id, account_id
        );
        self.accounts[index].characters.push(character);
    }

    pub fn begin_play(&mut self, account_id: &str, character_id: &str) {
        self.begin_play_at(account_id, character_id, Instant::now());
    }

    /// Mark a character as launching; the slot carries its own deadline so an
    /// earlier launch can never clear a newer one.
    pub fn begin_play_at(&mut self, account_id: &str, character_id: &str, now: Instant) {
        self.playing = Some(PlaySlot {
            account_id: account_id.to_owned(),
            character_id: character_id.to_owned(),
            deadline: now + PLAY_LAUNCH_INTERVAL,
        });
        info!("begin_play: launching {} on {}", character_id, account_id);
    }

    pub fn end_play(&mut self) {
        if let Some(slot) = self.playing.take() {
            debug!(
                "end_play: cleared {} on {}",
                slot.character_id, slot.account_id
            );
        }
    }

    /// Clear the playing selector once its launch interval has elapsed.
    pub fn expire_play(&mut self, now: Instant) {
        if self
            .playing
            .as_ref()
            .is_some_and(|slot| now >= slot.deadline)
        {
            self.end_play();
        }
    }

    pub fn apply_account_added(&mut self, payload: &AccountPayload) {
        let account = normalize_account(payload, &mut self.ids);
        if self.duplicate_policy == DuplicatePolicy::MergeByEmail
            && let Some(existing) = self
                .accounts
                .iter_mut()
                .find(|a| a.email.eq_ignore_ascii_case(&account.email))
        {
            merge_account(existing, account);
            info!("account-added: merged into {}", existing.id);
            return;
        }
        info!(
            "account-added: {} with {} character(s)",
            account.account_name,
            account.characters.len()
        );
        self.accounts.push(account);
    }

    pub fn set_login_status_text(&mut self, text: &str) {
        self.login_status_text = text.to_owned();
    }

    pub fn reset_login_status_text(&mut self) {
        self.login_status_text = DEFAULT_LOGIN_LABEL.to_owned();
    }
}

fn merge_account(existing: &mut Account, incoming: Account) {
    existing.account_name = incoming.account_name;
    for character in incoming.characters {
        match existing.characters.iter_mut().find(|c| c.id == character.id) {
            Some(slot) => *slot = character,
            None => existing.characters.push(character),
        }
    }
}
