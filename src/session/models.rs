pub const NEVER_PLAYED: &str = "Never";
pub const NO_PLAYTIME: &str = "0h 0m";
pub const UNKNOWN_PLAYTIME: &str = "Unknown";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassLabel {
    NewCharacter,
    Member,
    FreePlayer,
}

impl ClassLabel {
    pub fn label(self) -> &'static str {
        match self {
            ClassLabel::NewCharacter => "New Character",
            ClassLabel::Member => "Member",
            ClassLabel::FreePlayer => "Free Player",
        }
    }

    pub fn for_membership(is_members: bool) -> Self {
        if is_members {
            ClassLabel::Member
        } else {
            ClassLabel::FreePlayer
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Character {
    pub id: String,
    /// Empty until the character is named in-game.
    pub name: String,
    pub level: u32,
    pub class_label: ClassLabel,
    pub last_played: String,
    pub total_playtime: String,
}

impl Character {
    /// Blank record for a character that has not been created in-game yet.
    pub fn placeholder(id: String) -> Self {
        Self {
            id,
            name: String::new(),
            level: 1,
            class_label: ClassLabel::NewCharacter,
            last_played: NEVER_PLAYED.into(),
            total_playtime: NO_PLAYTIME.into(),
        }
    }

    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            "Unnamed character"
        } else {
            &self.name
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: String,
    pub account_name: String,
    pub email: String,
    pub characters: Vec<Character>,
}

impl Account {
    pub fn initials(&self) -> String {
        self.account_name
            .split_whitespace()
            .filter_map(|word| word.chars().next())
            .flat_map(char::to_uppercase)
            .take(2)
            .collect()
    }
}
