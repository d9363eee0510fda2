use thiserror::Error;

/// Precondition conflicts. These are rejected before any state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("character is dead")]
    Dead,

    #[error("opponent is already defeated")]
    OpponentDead,

    #[error("character is jailed")]
    Jailed,

    #[error("cannot attack yourself")]
    SelfTarget,

    #[error("cannot attack characters below level {min_level}")]
    LevelFloor { min_level: u32 },

    #[error("rematch cooldown: {remaining_secs}s remaining")]
    RematchCooldown { remaining_secs: i64 },

    #[error("an undecided battle with this opponent already exists")]
    UndecidedBattle,

    #[error("a quest is already in progress")]
    QuestAlreadyActive,

    #[error("no quest is in progress")]
    NoActiveQuest,

    #[error("unique quest already completed")]
    UniqueQuestCompleted,

    #[error("quest is not available")]
    QuestUnavailable,

    #[error("character name already taken")]
    NameTaken,

    #[error("account already owns a character")]
    CharacterExists,

    #[error("character is retired")]
    Retired,
}

/// Errors that can arise while running the game engine or its store.
#[derive(Debug, Error)]
pub enum GameError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, config files).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Faction configuration could not be parsed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Insufficient gold, resource, level or attribute; bad amounts.
    #[error("invalid action: {0}")]
    Validation(String),

    #[error("precondition failed: {0}")]
    Precondition(#[from] Conflict),

    /// Internal error (task join errors, unexpected conditions)
    #[error("internal error: {0}")]
    Internal(String),
}

impl GameError {
    pub fn validation(message: impl Into<String>) -> Self {
        GameError::Validation(message.into())
    }

    /// True for errors that were rejected before any mutation and should be shown to the player.
    pub fn is_user_facing(&self) -> bool {
        matches!(self, GameError::Validation(_) | GameError::Precondition(_))
    }
}

pub type GameResult<T> = Result<T, GameError>;

impl From<crate::validation::NameError> for GameError {
    fn from(err: crate::validation::NameError) -> Self {
        GameError::Validation(err.to_string())
    }
}

impl From<crate::validation::ContentError> for GameError {
    fn from(err: crate::validation::ContentError) -> Self {
        GameError::Validation(err.to_string())
    }
}
