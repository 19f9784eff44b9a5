// Actions triggered by the user from the UI layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserAction {
    AddAccount {
        account_name: String,
        email: String,
    },
    RemoveAccount {
        account_id: String,
    },
    ToggleExpand {
        account_id: String,
    },
    CreateCharacter {
        account_id: String,
    },
    Play {
        account_id: String,
        character_id: String,
    },
    CancelPlay,
}
