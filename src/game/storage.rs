use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::game::catalog;
use crate::game::errors::{GameError, GameResult};
use crate::game::types::{
    normalize_name, BattleId, BattleRecord, Character, CharacterId, ItemRecord, JailRecord,
    LotteryEntry, LotteryPool, LotteryWinner, MailId, MailMessage, NpcRecord, PlayerQuest,
    QuestRecord, BATTLE_SCHEMA_VERSION, CHARACTER_SCHEMA_VERSION, ITEM_SCHEMA_VERSION,
    JAIL_SCHEMA_VERSION, MAIL_SCHEMA_VERSION, NPC_SCHEMA_VERSION, QUEST_SCHEMA_VERSION,
};

const TREE_PRIMARY: &str = "warbound";

const CHARACTERS: &str = "characters:";
const CHARACTER_NAMES: &str = "character_names:";
const CHARACTER_USERS: &str = "character_users:";
const ITEMS: &str = "items:";
const NPCS: &str = "npcs:";
const BATTLES: &str = "battles:";
const BATTLE_INDEX: &str = "battle_index:";
const BATTLE_PAIRS: &str = "battle_pairs:";
const QUESTS: &str = "quests:";
const PLAYER_QUESTS: &str = "player_quests:";
const ACTIVE_QUESTS: &str = "active_quest:";
const MAIL: &str = "mail:";
const JAILS: &str = "jails:";
const LOTTERY_POOL: &str = "lottery:pool";
const LOTTERY_ENTRIES: &str = "lottery_entries:";
const LOTTERY_WINNERS: &str = "lottery_winners:";

fn character_key(id: CharacterId) -> Vec<u8> {
    format!("{}{:020}", CHARACTERS, id).into_bytes()
}

fn name_key(name: &str) -> Vec<u8> {
    format!("{}{}", CHARACTER_NAMES, normalize_name(name)).into_bytes()
}

fn user_key(user_id: u64) -> Vec<u8> {
    format!("{}{:020}", CHARACTER_USERS, user_id).into_bytes()
}

fn item_key(key: &str) -> Vec<u8> {
    format!("{}{}", ITEMS, key).into_bytes()
}

fn npc_key(key: &str) -> Vec<u8> {
    format!("{}{}", NPCS, key).into_bytes()
}

fn battle_key(id: BattleId) -> Vec<u8> {
    format!("{}{:020}", BATTLES, id).into_bytes()
}

fn battle_index_prefix(character: CharacterId) -> Vec<u8> {
    format!("{}{:020}:", BATTLE_INDEX, character).into_bytes()
}

fn battle_index_key(character: CharacterId, battle: BattleId) -> Vec<u8> {
    format!("{}{:020}:{:020}", BATTLE_INDEX, character, battle).into_bytes()
}

/// Unordered pair key: the latest battle between two characters, whoever attacked.
fn battle_pair_key(a: CharacterId, b: CharacterId) -> Vec<u8> {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    format!("{}{:020}:{:020}", BATTLE_PAIRS, low, high).into_bytes()
}

fn quest_key(key: &str) -> Vec<u8> {
    format!("{}{}", QUESTS, key).into_bytes()
}

fn player_quest_prefix(character: CharacterId) -> Vec<u8> {
    format!("{}{:020}:", PLAYER_QUESTS, character).into_bytes()
}

fn player_quest_key(character: CharacterId, id: u64) -> Vec<u8> {
    format!("{}{:020}:{:020}", PLAYER_QUESTS, character, id).into_bytes()
}

fn active_quest_key(character: CharacterId) -> Vec<u8> {
    format!("{}{:020}", ACTIVE_QUESTS, character).into_bytes()
}

fn mail_prefix(recipient: CharacterId) -> Vec<u8> {
    format!("{}{:020}:", MAIL, recipient).into_bytes()
}

fn mail_key(recipient: CharacterId, id: MailId) -> Vec<u8> {
    format!("{}{:020}:{:020}", MAIL, recipient, id).into_bytes()
}

fn jail_key(id: u64) -> Vec<u8> {
    format!("{}{:020}", JAILS, id).into_bytes()
}

fn lottery_entry_key(id: u64) -> Vec<u8> {
    format!("{}{:020}", LOTTERY_ENTRIES, id).into_bytes()
}

fn lottery_winner_key(id: u64) -> Vec<u8> {
    format!("{}{:020}", LOTTERY_WINNERS, id).into_bytes()
}

fn encode_id(id: u64) -> Vec<u8> {
    id.to_be_bytes().to_vec()
}

fn decode_id(bytes: &[u8]) -> GameResult<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| GameError::Internal(format!("corrupt id index entry ({} bytes)", bytes.len())))?;
    Ok(u64::from_be_bytes(array))
}

/// A persisted record type with a schema version checked on every read.
pub trait Versioned {
    const ENTITY: &'static str;
    const VERSION: u8;
    fn schema_version(&self) -> u8;
}

macro_rules! versioned {
    ($ty:ty, $entity:literal, $version:expr) => {
        impl Versioned for $ty {
            const ENTITY: &'static str = $entity;
            const VERSION: u8 = $version;
            fn schema_version(&self) -> u8 {
                self.schema_version
            }
        }
    };
}

versioned!(Character, "character", CHARACTER_SCHEMA_VERSION);
versioned!(ItemRecord, "item", ITEM_SCHEMA_VERSION);
versioned!(NpcRecord, "npc", NPC_SCHEMA_VERSION);
versioned!(BattleRecord, "battle", BATTLE_SCHEMA_VERSION);
versioned!(QuestRecord, "quest", QUEST_SCHEMA_VERSION);
versioned!(PlayerQuest, "player quest", QUEST_SCHEMA_VERSION);
versioned!(MailMessage, "mail", MAIL_SCHEMA_VERSION);
versioned!(JailRecord, "jail", JAIL_SCHEMA_VERSION);

fn serialize<T: Serialize>(value: &T) -> GameResult<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> GameResult<T> {
    Ok(bincode::deserialize::<T>(bytes)?)
}

fn decode<T: DeserializeOwned + Versioned>(bytes: &[u8]) -> GameResult<T> {
    let record: T = deserialize(bytes)?;
    if record.schema_version() != T::VERSION {
        return Err(GameError::SchemaMismatch {
            entity: T::ENTITY,
            expected: T::VERSION,
            found: record.schema_version(),
        });
    }
    Ok(record)
}

/// Entity-level reads shared by the store and an open [`UnitOfWork`].
///
/// Implementors only provide raw key access; inside a unit of work the staged
/// writes shadow the committed state.
pub trait Records {
    fn get_raw(&self, key: &[u8]) -> GameResult<Option<Vec<u8>>>;

    /// All entries under `prefix`, in key order.
    fn scan_raw(&self, prefix: &[u8]) -> GameResult<Vec<(Vec<u8>, Vec<u8>)>>;

    fn fetch<T: DeserializeOwned + Versioned>(&self, key: &[u8]) -> GameResult<Option<T>> {
        match self.get_raw(key)? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn fetch_all<T: DeserializeOwned + Versioned>(&self, prefix: &str) -> GameResult<Vec<T>> {
        self.scan_raw(prefix.as_bytes())?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }

    fn count_prefix(&self, prefix: &str) -> GameResult<usize> {
        Ok(self.scan_raw(prefix.as_bytes())?.len())
    }

    fn character(&self, id: CharacterId) -> GameResult<Character> {
        self.fetch(&character_key(id))?
            .ok_or_else(|| GameError::NotFound(format!("character: {}", id)))
    }

    fn character_by_name(&self, name: &str) -> GameResult<Option<Character>> {
        match self.get_raw(&name_key(name))? {
            Some(bytes) => self.character(decode_id(&bytes)?).map(Some),
            None => Ok(None),
        }
    }

    fn character_for_user(&self, user_id: u64) -> GameResult<Option<Character>> {
        match self.get_raw(&user_key(user_id))? {
            Some(bytes) => self.character(decode_id(&bytes)?).map(Some),
            None => Ok(None),
        }
    }

    /// Every stored character, retired ones included.
    fn list_characters(&self) -> GameResult<Vec<Character>> {
        self.fetch_all(CHARACTERS)
    }

    fn item(&self, key: &str) -> GameResult<ItemRecord> {
        self.fetch(&item_key(key))?
            .ok_or_else(|| GameError::NotFound(format!("item: {}", key)))
    }

    fn find_item(&self, key: &str) -> GameResult<Option<ItemRecord>> {
        self.fetch(&item_key(key))
    }

    fn list_items(&self) -> GameResult<Vec<ItemRecord>> {
        self.fetch_all(ITEMS)
    }

    /// Catalog records for a character's equipped items. Items missing from
    /// the catalog are skipped.
    fn equipped_items(&self, character: &Character) -> GameResult<Vec<ItemRecord>> {
        let mut equipped = Vec::new();
        for key in character.equipped_item_keys() {
            match self.find_item(key)? {
                Some(item) => equipped.push(item),
                None => warn!("character {} has unknown item '{}' equipped", character.id, key),
            }
        }
        Ok(equipped)
    }

    fn npc(&self, key: &str) -> GameResult<NpcRecord> {
        self.fetch(&npc_key(key))?
            .ok_or_else(|| GameError::NotFound(format!("npc: {}", key)))
    }

    fn list_npcs(&self) -> GameResult<Vec<NpcRecord>> {
        self.fetch_all(NPCS)
    }

    fn battle(&self, id: BattleId) -> GameResult<BattleRecord> {
        self.fetch(&battle_key(id))?
            .ok_or_else(|| GameError::NotFound(format!("battle: {}", id)))
    }

    /// Most recent battle between two characters in either role.
    fn latest_battle_between(&self, a: CharacterId, b: CharacterId) -> GameResult<Option<BattleRecord>> {
        match self.get_raw(&battle_pair_key(a, b))? {
            Some(bytes) => self.battle(decode_id(&bytes)?).map(Some),
            None => Ok(None),
        }
    }

    /// Battles involving `character`, newest first.
    fn battles_for(&self, character: CharacterId, offset: usize, limit: usize) -> GameResult<Vec<BattleRecord>> {
        let prefix = battle_index_prefix(character);
        let entries = self.scan_raw(&prefix)?;
        entries
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .map(|(key, _)| {
                let text = String::from_utf8_lossy(&key[prefix.len()..]).to_string();
                let id = text
                    .parse::<u64>()
                    .map_err(|_| GameError::Internal(format!("corrupt battle index key: {}", text)))?;
                self.battle(id)
            })
            .collect()
    }

    fn quest(&self, key: &str) -> GameResult<QuestRecord> {
        self.fetch(&quest_key(key))?
            .ok_or_else(|| GameError::NotFound(format!("quest: {}", key)))
    }

    fn find_quest(&self, key: &str) -> GameResult<Option<QuestRecord>> {
        self.fetch(&quest_key(key))
    }

    fn list_quests(&self) -> GameResult<Vec<QuestRecord>> {
        self.fetch_all(QUESTS)
    }

    fn player_quest(&self, character: CharacterId, id: u64) -> GameResult<PlayerQuest> {
        self.fetch(&player_quest_key(character, id))?
            .ok_or_else(|| GameError::NotFound(format!("player quest: {}", id)))
    }

    /// The character's single non-terminal quest, if any.
    fn active_quest(&self, character: CharacterId) -> GameResult<Option<PlayerQuest>> {
        match self.get_raw(&active_quest_key(character))? {
            Some(bytes) => self.player_quest(character, decode_id(&bytes)?).map(Some),
            None => Ok(None),
        }
    }

    fn player_quests(&self, character: CharacterId) -> GameResult<Vec<PlayerQuest>> {
        self.scan_raw(&player_quest_prefix(character))?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }

    /// Active quests across every character.
    fn list_active_quests(&self) -> GameResult<Vec<PlayerQuest>> {
        let mut active = Vec::new();
        for (key, bytes) in self.scan_raw(ACTIVE_QUESTS.as_bytes())? {
            let text = String::from_utf8_lossy(&key[ACTIVE_QUESTS.len()..]).to_string();
            let character = text
                .parse::<u64>()
                .map_err(|_| GameError::Internal(format!("corrupt active quest key: {}", text)))?;
            active.push(self.player_quest(character, decode_id(&bytes)?)?);
        }
        Ok(active)
    }

    fn mail(&self, recipient: CharacterId, id: MailId) -> GameResult<MailMessage> {
        self.fetch(&mail_key(recipient, id))?
            .ok_or_else(|| GameError::NotFound(format!("mail: {}", id)))
    }

    /// A recipient's mail, oldest first.
    fn mailbox(&self, recipient: CharacterId) -> GameResult<Vec<MailMessage>> {
        self.scan_raw(&mail_prefix(recipient))?
            .iter()
            .map(|(_, bytes)| decode(bytes))
            .collect()
    }

    fn list_mail(&self) -> GameResult<Vec<MailMessage>> {
        self.fetch_all(MAIL)
    }

    fn jail(&self, id: u64) -> GameResult<JailRecord> {
        self.fetch(&jail_key(id))?
            .ok_or_else(|| GameError::NotFound(format!("jail: {}", id)))
    }

    fn list_jails(&self) -> GameResult<Vec<JailRecord>> {
        self.fetch_all(JAILS)
    }

    fn lottery_pool(&self) -> GameResult<LotteryPool> {
        match self.get_raw(LOTTERY_POOL.as_bytes())? {
            Some(bytes) => deserialize(&bytes),
            None => Ok(LotteryPool::default()),
        }
    }

    fn lottery_entries(&self) -> GameResult<Vec<LotteryEntry>> {
        self.scan_raw(LOTTERY_ENTRIES.as_bytes())?
            .iter()
            .map(|(_, bytes)| deserialize(bytes))
            .collect()
    }

    fn lottery_winners(&self) -> GameResult<Vec<LotteryWinner>> {
        self.scan_raw(LOTTERY_WINNERS.as_bytes())?
            .iter()
            .map(|(_, bytes)| deserialize(bytes))
            .collect()
    }
}

/// Helper builder so tests can easily create throwaway stores with custom paths.
pub struct GameStoreBuilder {
    path: PathBuf,
    seed_catalog: bool,
}

impl GameStoreBuilder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seed_catalog: true,
        }
    }

    /// Skip inserting the starter items, quests and NPCs (useful for targeted tests).
    pub fn without_catalog_seed(mut self) -> Self {
        self.seed_catalog = false;
        self
    }

    pub fn open(self) -> GameResult<GameStore> {
        GameStore::open_with_options(self.path, self.seed_catalog)
    }
}

/// Sled-backed persistence for characters, catalog, battles, quests and mail.
pub struct GameStore {
    db: sled::Db,
    primary: sled::Tree,
}

impl GameStore {
    /// Open (or create) the store rooted at `path`, seeding the starter catalog
    /// if the store has no items yet.
    pub fn open<P: AsRef<Path>>(path: P) -> GameResult<Self> {
        Self::open_with_options(path, true)
    }

    fn open_with_options<P: AsRef<Path>>(path: P, seed_catalog: bool) -> GameResult<Self> {
        let path_ref = path.as_ref();
        std::fs::create_dir_all(path_ref)?;
        let db = sled::open(path_ref)?;
        let primary = db.open_tree(TREE_PRIMARY)?;
        let store = Self { db, primary };

        if seed_catalog {
            store.seed_catalog_if_needed()?;
        }

        Ok(store)
    }

    /// Start a unit of work. Nothing is written until [`UnitOfWork::commit`];
    /// dropping it discards every staged change.
    pub fn begin(&self) -> UnitOfWork<'_> {
        UnitOfWork {
            store: self,
            staged: BTreeMap::new(),
        }
    }

    /// Fresh id, never 0 (reserved for the system sender).
    pub fn next_id(&self) -> GameResult<u64> {
        Ok(self.db.generate_id()? + 1)
    }

    pub fn seed_catalog_if_needed(&self) -> GameResult<usize> {
        if self.primary.scan_prefix(ITEMS.as_bytes()).next().is_some() {
            return Ok(0);
        }
        let mut uow = self.begin();
        let mut inserted = 0usize;
        for item in catalog::starter_items() {
            uow.put_item(&item)?;
            inserted += 1;
        }
        for quest in catalog::starter_quests() {
            uow.put_quest(&quest)?;
            inserted += 1;
        }
        for npc in catalog::starter_npcs() {
            uow.put_npc(&npc)?;
            inserted += 1;
        }
        uow.commit()?;
        Ok(inserted)
    }

    /// Counts used by the `status` command.
    pub fn stats(&self) -> GameResult<StoreStats> {
        Ok(StoreStats {
            characters: self.count_prefix(CHARACTERS)?,
            battles: self.count_prefix(BATTLES)?,
            quests: self.count_prefix(QUESTS)?,
            active_quests: self.count_prefix(ACTIVE_QUESTS)?,
            mail: self.count_prefix(MAIL)?,
            items: self.count_prefix(ITEMS)?,
            npcs: self.count_prefix(NPCS)?,
        })
    }

    // Single-record conveniences, each committed on its own.

    pub fn put_character(&self, character: &Character) -> GameResult<()> {
        let mut uow = self.begin();
        uow.put_character(character)?;
        uow.commit()
    }

    pub fn put_item(&self, item: &ItemRecord) -> GameResult<()> {
        let mut uow = self.begin();
        uow.put_item(item)?;
        uow.commit()
    }

    pub fn put_npc(&self, npc: &NpcRecord) -> GameResult<()> {
        let mut uow = self.begin();
        uow.put_npc(npc)?;
        uow.commit()
    }

    pub fn put_quest(&self, quest: &QuestRecord) -> GameResult<()> {
        let mut uow = self.begin();
        uow.put_quest(quest)?;
        uow.commit()
    }

    /// Overwrite a catalog item with undecodable bytes.
    #[cfg(test)]
    pub(crate) fn corrupt_item(&self, key: &str) -> GameResult<()> {
        self.primary.insert(item_key(key), b"garbage".to_vec())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreStats {
    pub characters: usize,
    pub battles: usize,
    pub quests: usize,
    pub active_quests: usize,
    pub mail: usize,
    pub items: usize,
    pub npcs: usize,
}

impl Records for GameStore {
    fn get_raw(&self, key: &[u8]) -> GameResult<Option<Vec<u8>>> {
        Ok(self.primary.get(key)?.map(|bytes| bytes.to_vec()))
    }

    fn scan_raw(&self, prefix: &[u8]) -> GameResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.primary
            .scan_prefix(prefix)
            .map(|entry| {
                entry
                    .map(|(key, value)| (key.to_vec(), value.to_vec()))
                    .map_err(GameError::from)
            })
            .collect()
    }
}

/// Staged writes that commit atomically as one sled batch.
///
/// Reads go through the staged map first, so later steps of an operation see
/// earlier steps' writes.
pub struct UnitOfWork<'s> {
    store: &'s GameStore,
    staged: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'s> UnitOfWork<'s> {
    pub fn store(&self) -> &'s GameStore {
        self.store
    }

    pub fn next_id(&self) -> GameResult<u64> {
        self.store.next_id()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    fn put_raw(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.staged.insert(key, Some(value));
    }

    fn delete_raw(&mut self, key: Vec<u8>) {
        self.staged.insert(key, None);
    }

    /// Apply every staged write in one atomic batch and flush.
    pub fn commit(self) -> GameResult<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut batch = sled::Batch::default();
        let writes = self.staged.len();
        for (key, value) in self.staged {
            match value {
                Some(value) => batch.insert(key, value),
                None => batch.remove(key),
            }
        }
        self.store.primary.apply_batch(batch)?;
        self.store.primary.flush()?;
        debug!("committed unit of work with {} writes", writes);
        Ok(())
    }

    pub fn put_character(&mut self, character: &Character) -> GameResult<()> {
        let mut record = character.clone();
        record.schema_version = CHARACTER_SCHEMA_VERSION;
        self.put_raw(character_key(record.id), serialize(&record)?);
        // Retired records no longer own their name and account slot.
        if !record.is_retired() {
            self.put_raw(name_key(&record.name), encode_id(record.id));
            self.put_raw(user_key(record.user_id), encode_id(record.id));
        }
        Ok(())
    }

    /// Free a retired character's name and account slot. The record itself stays.
    pub fn release_character_indexes(&mut self, character: &Character) {
        self.delete_raw(name_key(&character.name));
        self.delete_raw(user_key(character.user_id));
    }

    pub fn put_item(&mut self, item: &ItemRecord) -> GameResult<()> {
        let mut record = item.clone();
        record.schema_version = ITEM_SCHEMA_VERSION;
        self.put_raw(item_key(&record.key), serialize(&record)?);
        Ok(())
    }

    pub fn put_npc(&mut self, npc: &NpcRecord) -> GameResult<()> {
        let mut record = npc.clone();
        record.schema_version = NPC_SCHEMA_VERSION;
        self.put_raw(npc_key(&record.key), serialize(&record)?);
        Ok(())
    }

    /// Persist a new battle record, assigning its id and updating both
    /// participants' history and the pair index.
    pub fn insert_battle(&mut self, mut battle: BattleRecord) -> GameResult<BattleId> {
        let id = self.next_id()?;
        battle.id = id;
        battle.schema_version = BATTLE_SCHEMA_VERSION;
        self.put_raw(battle_key(id), serialize(&battle)?);
        self.put_raw(battle_index_key(battle.attacker_id, id), Vec::new());
        self.put_raw(battle_index_key(battle.defender_id, id), Vec::new());
        self.put_raw(battle_pair_key(battle.attacker_id, battle.defender_id), encode_id(id));
        Ok(id)
    }

    pub fn put_quest(&mut self, quest: &QuestRecord) -> GameResult<()> {
        let mut record = quest.clone();
        record.schema_version = QUEST_SCHEMA_VERSION;
        self.put_raw(quest_key(&record.key), serialize(&record)?);
        Ok(())
    }

    /// Write a player quest and keep the active-quest index in step with its state.
    pub fn put_player_quest(&mut self, quest: &PlayerQuest) -> GameResult<()> {
        let mut record = quest.clone();
        record.schema_version = QUEST_SCHEMA_VERSION;
        self.put_raw(player_quest_key(record.character_id, record.id), serialize(&record)?);

        let active_key = active_quest_key(record.character_id);
        if record.is_active() {
            self.put_raw(active_key, encode_id(record.id));
        } else if let Some(bytes) = self.get_raw(&active_key)? {
            if decode_id(&bytes)? == record.id {
                self.delete_raw(active_key);
            }
        }
        Ok(())
    }

    /// Persist a new mail message, assigning its id.
    pub fn insert_mail(&mut self, mut mail: MailMessage) -> GameResult<MailId> {
        let id = self.next_id()?;
        mail.id = id;
        mail.schema_version = MAIL_SCHEMA_VERSION;
        self.put_raw(mail_key(mail.recipient_id, id), serialize(&mail)?);
        Ok(id)
    }

    pub fn put_mail(&mut self, mail: &MailMessage) -> GameResult<()> {
        self.put_raw(mail_key(mail.recipient_id, mail.id), serialize(mail)?);
        Ok(())
    }

    pub fn delete_mail(&mut self, recipient: CharacterId, id: MailId) {
        self.delete_raw(mail_key(recipient, id));
    }

    pub fn insert_jail(&mut self, mut jail: JailRecord) -> GameResult<u64> {
        let id = self.next_id()?;
        jail.id = id;
        jail.schema_version = JAIL_SCHEMA_VERSION;
        self.put_raw(jail_key(id), serialize(&jail)?);
        Ok(id)
    }

    pub fn put_jail(&mut self, jail: &JailRecord) -> GameResult<()> {
        self.put_raw(jail_key(jail.id), serialize(jail)?);
        Ok(())
    }

    pub fn put_lottery_pool(&mut self, pool: &LotteryPool) -> GameResult<()> {
        self.put_raw(LOTTERY_POOL.as_bytes().to_vec(), serialize(pool)?);
        Ok(())
    }

    pub fn insert_lottery_entry(&mut self, mut entry: LotteryEntry) -> GameResult<u64> {
        let id = self.next_id()?;
        entry.id = id;
        self.put_raw(lottery_entry_key(id), serialize(&entry)?);
        Ok(id)
    }

    pub fn clear_lottery_entries(&mut self) -> GameResult<usize> {
        let keys: Vec<Vec<u8>> = self
            .scan_raw(LOTTERY_ENTRIES.as_bytes())?
            .into_iter()
            .map(|(key, _)| key)
            .collect();
        let cleared = keys.len();
        for key in keys {
            self.delete_raw(key);
        }
        Ok(cleared)
    }

    pub fn insert_lottery_winner(&mut self, mut winner: LotteryWinner) -> GameResult<u64> {
        let id = self.next_id()?;
        winner.id = id;
        self.put_raw(lottery_winner_key(id), serialize(&winner)?);
        Ok(id)
    }
}

impl Records for UnitOfWork<'_> {
    fn get_raw(&self, key: &[u8]) -> GameResult<Option<Vec<u8>>> {
        match self.staged.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.get_raw(key),
        }
    }

    fn scan_raw(&self, prefix: &[u8]) -> GameResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = self.store.scan_raw(prefix)?.into_iter().collect();
        for (key, value) in self.staged.range(prefix.to_vec()..) {
            if !key.starts_with(prefix) {
                break;
            }
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}
