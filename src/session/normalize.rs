use serde::Deserialize;

use crate::session::models::{Account, Character, ClassLabel, NEVER_PLAYED, UNKNOWN_PLAYTIME};
use crate::util::IdGenerator;

/// The backend sends this literal string, not an absent field, for unnamed characters.
pub const DISPLAY_NAME_UNSET: &str = "null";

#[derive(Clone, Debug, Deserialize)]
pub struct CharacterPayload {
    pub account_id: String,
    pub display_name: String,
    #[allow(dead_code)]
    pub user_hash: String,
    pub is_members: bool,
}

/// Wire shape of an `account-added` notification.
#[derive(Clone, Debug, Deserialize)]
pub struct AccountPayload {
    pub email: String,
    pub account_name: String,
    pub characters: Vec<CharacterPayload>,
}

pub fn normalize_character(payload: &CharacterPayload) -> Character {
    if payload.display_name == DISPLAY_NAME_UNSET {
        return Character::placeholder(payload.account_id.clone());
    }
    Character {
        id: payload.account_id.clone(),
        name: payload.display_name.clone(),
        level: 1,
        class_label: ClassLabel::for_membership(payload.is_members),
        last_played: NEVER_PLAYED.into(),
        // Playtime is not reported by the backend yet.
        total_playtime: UNKNOWN_PLAYTIME.into(),
    }
}

/// Map an `account-added` payload onto a local account with a freshly generated id.
pub fn normalize_account(payload: &AccountPayload, ids: &mut IdGenerator) -> Account {
    Account {
        id: ids.next_id(),
        account_name: payload.account_name.clone(),
        email: payload.email.clone(),
        characters: payload.characters.iter().map(normalize_character).collect(),
    }
}
