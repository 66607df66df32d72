//! Economy rules: default player, shop prices, rewards, ascension and artifacts
//!
//! Click and auto-clicker income are computed by the game page and reported
//! through `/api/save`. The rules here cover only the server-side mutations
//! (purchases, daily reward, ascension, artifact discovery), which are always
//! priced from the *stored* row, never from request fields.

use serde::Serialize;
use sha3::{Digest, Sha3_256};
use std::str::FromStr;

// ============================================================================
// Default Player
// ============================================================================

pub const DEFAULT_USERNAME: &str = "Player";
pub const DEFAULT_COINS: i64 = 100;
pub const DEFAULT_POWER: i64 = 1;
pub const DEFAULT_AUTOS: i64 = 0;
pub const DEFAULT_MULTIPLIER: i64 = 1;
pub const DEFAULT_LEVEL: i64 = 1;

/// Seconds between two daily reward claims
pub const DAILY_COOLDOWN_SECS: i64 = 86_400;

/// Auto-clickers pay out on this period in the game page
pub const AUTO_INCOME_PERIOD_SECS: u64 = 5;

// ============================================================================
// Shop
// ============================================================================

/// Items sold by `/api/purchase`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopItem {
    /// +1 coin per click
    Power,
    /// +1 auto-clicker
    Auto,
    /// +1 income multiplier
    Multiplier,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown shop item '{0}'")]
pub struct UnknownItem(pub String);

impl ShopItem {
    pub const ALL: [ShopItem; 3] = [ShopItem::Power, ShopItem::Auto, ShopItem::Multiplier];

    pub fn id(self) -> &'static str {
        match self {
            ShopItem::Power => "power",
            ShopItem::Auto => "auto",
            ShopItem::Multiplier => "multiplier",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ShopItem::Power => "Stronger Paws",
            ShopItem::Auto => "Auto-Clicker",
            ShopItem::Multiplier => "Golden Wheel",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            ShopItem::Power => "+1 coin per click",
            ShopItem::Auto => "+1 coin every 5 seconds",
            ShopItem::Multiplier => "x+1 to all income",
        }
    }

    /// Players column incremented by one when the item is bought
    pub fn column(self) -> &'static str {
        match self {
            ShopItem::Power => "power",
            ShopItem::Auto => "autos",
            ShopItem::Multiplier => "multiplier",
        }
    }

    /// Price of the next unit.
    ///
    /// `owned` is the number already bought since the last ascension.
    /// Prices saturate at `i64::MAX`, which makes the item unaffordable.
    pub fn cost(self, power: i64, autos: i64, owned: i64) -> i64 {
        match self {
            ShopItem::Power => 50i64.saturating_mul(power.max(1)),
            ShopItem::Auto => 100i64.saturating_add(50i64.saturating_mul(autos.max(0))),
            ShopItem::Multiplier => {
                let exp = u32::try_from(owned.max(0)).unwrap_or(u32::MAX);
                3i64.checked_pow(exp)
                    .map_or(i64::MAX, |f| 1000i64.saturating_mul(f))
            }
        }
    }
}

impl FromStr for ShopItem {
    type Err = UnknownItem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "power" | "click" | "upgrade" => Ok(ShopItem::Power),
            "auto" | "autos" | "auto_clicker" => Ok(ShopItem::Auto),
            "multiplier" => Ok(ShopItem::Multiplier),
            other => Err(UnknownItem(other.to_string())),
        }
    }
}

// ============================================================================
// Daily Reward & Ascension
// ============================================================================

pub fn daily_reward(level: i64, prestige: i64) -> i64 {
    500i64
        .saturating_mul(level.max(1))
        .saturating_mul(prestige.max(0).saturating_add(1))
}

/// Coins required to ascend from the given prestige tier
pub fn ascend_threshold(prestige: i64) -> i64 {
    1_000_000i64.saturating_mul(prestige.max(0).saturating_add(1))
}

/// Multiplier granted after ascending, before artifact bonuses
pub fn ascension_multiplier(prestige: i64) -> i64 {
    DEFAULT_MULTIPLIER.saturating_add(prestige.max(0))
}

// ============================================================================
// Artifacts
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub id: &'static str,
    pub name: &'static str,
    pub rarity: Rarity,
    /// Relative chance of being discovered
    #[serde(skip)]
    pub weight: u64,
    /// Added to the player's multiplier on discovery
    pub multiplier_bonus: i64,
}

pub static ARTIFACTS: [Artifact; 5] = [
    Artifact {
        id: "golden_seed",
        name: "Golden Seed",
        rarity: Rarity::Common,
        weight: 40,
        multiplier_bonus: 0,
    },
    Artifact {
        id: "lucky_clover",
        name: "Lucky Clover",
        rarity: Rarity::Common,
        weight: 30,
        multiplier_bonus: 0,
    },
    Artifact {
        id: "ancient_wheel",
        name: "Ancient Wheel",
        rarity: Rarity::Rare,
        weight: 15,
        multiplier_bonus: 1,
    },
    Artifact {
        id: "crystal_cheek",
        name: "Crystal Cheek Pouch",
        rarity: Rarity::Rare,
        weight: 10,
        multiplier_bonus: 1,
    },
    Artifact {
        id: "cosmic_acorn",
        name: "Cosmic Acorn",
        rarity: Rarity::Legendary,
        weight: 5,
        multiplier_bonus: 3,
    },
];

pub fn artifact_by_id(id: &str) -> Option<&'static Artifact> {
    ARTIFACTS.iter().find(|a| a.id == id)
}

/// Price of the next discovery given how many artifacts were found so far
pub fn artifact_cost(discovered: i64) -> i64 {
    10_000i64.saturating_mul(discovered.max(0).saturating_add(1))
}

/// Weighted pick seeded by SHA3(player_id || discovered).
///
/// The same player and discovery count always yield the same artifact.
pub fn pick_artifact(player_id: &str, discovered: i64) -> &'static Artifact {
    let mut hasher = Sha3_256::new();
    hasher.update(player_id.as_bytes());
    hasher.update(discovered.to_le_bytes());
    let digest = hasher.finalize();

    let mut seed = [0u8; 8];
    seed.copy_from_slice(&digest[..8]);
    let total: u64 = ARTIFACTS.iter().map(|a| a.weight).sum();
    let mut roll = u64::from_le_bytes(seed) % total;

    for artifact in &ARTIFACTS {
        if roll < artifact.weight {
            return artifact;
        }
        roll -= artifact.weight;
    }
    &ARTIFACTS[0]
}

/// Sum of multiplier bonuses for `(artifact_id, quantity)` pairs
pub fn artifact_bonus<'a, I>(owned: I) -> i64
where
    I: IntoIterator<Item = (&'a str, i64)>,
{
    owned
        .into_iter()
        .filter_map(|(id, qty)| artifact_by_id(id).map(|a| a.multiplier_bonus.saturating_mul(qty)))
        .fold(0i64, |acc, b| acc.saturating_add(b))
}
