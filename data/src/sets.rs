/// Known set codes and their names, in release order.
pub const SETS: [(&str, &str); 16] = [
	("A1", "Genetic Apex"),
	("A1a", "Mythical Island"),
	("A2", "Space-Time Smackdown"),
	("A2a", "Triumphant Light"),
	("A2b", "Shining Revelry"),
	("A3", "Celestial Guardians"),
	("A3a", "Extradimensional Crisis"),
	("A3b", "Eevee Grove"),
	("A4", "Wisdom of Sea and Sky"),
	("A4a", "Secluded Springs"),
	("A4b", "Deluxe Pack Ex"),
	("B1", "Mega Rising"),
	("B1a", "Crimson Blaze"),
	("B2", "Fantastical Parade"),
	("P-A", "Promo A"),
	("P-B", "Promo B"),
];

/// Display name of a set; unknown codes are returned unchanged.
pub fn set_name(code: &str) -> &str {
	SETS.iter()
		.find(|(c, _)| *c == code)
		.map_or(code, |&(_, name)| name)
}

/// Set codes use `P-` for promos where the card database writes `PROMO-`.
pub fn normalize_set_code(code: &str) -> String {
	code.replace("PROMO", "P")
}
