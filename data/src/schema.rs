use std::fmt;

use serde::{Deserialize, Serialize};

/// Public Pokémon TCG Pocket card database.
pub const URL: &str =
	"https://raw.githubusercontent.com/flibustier/pokemon-tcg-pocket-database/refs/heads/main/dist/cards.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
	pub set: String,
	pub number: CardNumber,
	pub name: String,
	pub rarity: String,
}

/// Card numbers are plain integers in the database, but some exports quote them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CardNumber {
	Int(u64),
	Text(String),
}

impl fmt::Display for CardNumber {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Int(n) => write!(f, "{n}"),
			Self::Text(s) => f.write_str(s),
		}
	}
}
