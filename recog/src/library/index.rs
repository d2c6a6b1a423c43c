//! Batched search structures over the loaded templates.
//!
//! Built in one pass from the full template list and never patched: any
//! change to the templates means building a new `SearchIndex`. The index is
//! the only copy of the template data once loading is done; `templates()`
//! reads it back out.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2, ArrayView1, Axis};

use crate::{CardId, CardTemplate, Error, PerceptualHash, Result};

/// One set's normalized feature vectors, one row per card.
#[derive(Debug, Clone)]
pub struct SetMatrix {
	cards: Vec<String>,
	features: Array2<f32>,
}

impl SetMatrix {
	pub fn cards(&self) -> &[String] {
		&self.cards
	}

	pub fn len(&self) -> usize {
		self.cards.len()
	}

	pub fn is_empty(&self) -> bool {
		self.cards.is_empty()
	}

	/// Feature row of `card_code`, if the card is part of the matrix.
	pub fn features_of(&self, card_code: &str) -> Option<ArrayView1<'_, f32>> {
		let row = self.cards.iter().position(|c| c == card_code)?;
		Some(self.features.row(row))
	}

	/// Correlation of `query` against every card of the set.
	pub fn correlate(&self, query: ArrayView1<f32>) -> Result<Array1<f32>> {
		let expected = self.features.ncols();
		if query.len() != expected {
			return Err(Error::FeatureShape {
				expected,
				found: query.len(),
			});
		}
		Ok(self.features.dot(&query))
	}
}

#[derive(Debug, Clone)]
pub struct SearchIndex {
	/// N x 64 matrix of hash bits (0/1).
	hash_bits: Array2<u8>,
	/// Row of `hash_bits` -> card.
	rows: Vec<CardId>,
	sets: BTreeMap<String, SetMatrix>,
}

impl SearchIndex {
	pub fn build(templates: &[CardTemplate]) -> Self {
		let rows = templates.iter().map(|t| t.id.clone()).collect::<Vec<_>>();

		let mut hash_bits = Array2::<u8>::zeros((templates.len(), PerceptualHash::BITS as usize));
		for (mut row, t) in hash_bits.axis_iter_mut(Axis(0)).zip(templates) {
			row.assign(&ArrayView1::from(&t.hash.bits()[..]));
		}

		let mut grouped: BTreeMap<&str, Vec<&CardTemplate>> = BTreeMap::new();
		for t in templates {
			grouped.entry(t.id.set_id.as_str()).or_default().push(t);
		}

		let mut sets = BTreeMap::new();
		for (set_id, members) in grouped {
			let dim = feature_len(&members);
			let members = members
				.into_iter()
				.filter(|t| {
					let ok = t.features.len() == dim;
					if !ok {
						tracing::warn!(set = set_id, card = %t.id.card_code, found = t.features.len(), expected = dim, "feature length mismatch; card left out of correlation search");
					}
					ok
				})
				.collect::<Vec<_>>();

			let mut features = Array2::<f32>::zeros((members.len(), dim));
			for (mut row, t) in features.axis_iter_mut(Axis(0)).zip(&members) {
				row.assign(&t.features);
			}
			let cards = members.iter().map(|t| t.id.card_code.clone()).collect();
			sets.insert(set_id.to_string(), SetMatrix { cards, features });
		}

		Self { hash_bits, rows, sets }
	}

	pub fn rows(&self) -> &[CardId] {
		&self.rows
	}

	pub fn set(&self, set_id: &str) -> Option<&SetMatrix> {
		self.sets.get(set_id)
	}

	pub fn set_ids(&self) -> impl Iterator<Item = &str> {
		self.sets.keys().map(String::as_str)
	}

	/// The indexed templates, in row order.
	///
	/// A card left out of its set matrix comes back with an empty feature
	/// vector.
	pub fn templates(&self) -> Vec<CardTemplate> {
		self.rows
			.iter()
			.zip(self.hash_bits.axis_iter(Axis(0)))
			.map(|(id, bits)| {
				let hash = bits.iter().fold(0u64, |acc, &b| (acc << 1) | u64::from(b & 1));
				let features = self
					.set(&id.set_id)
					.and_then(|set| set.features_of(&id.card_code))
					.map_or_else(|| Array1::zeros(0), |row| row.to_owned());
				CardTemplate {
					id: id.clone(),
					hash: PerceptualHash(hash),
					features,
				}
			})
			.collect()
	}

	/// Hamming distance from `query` to every template, in row order.
	pub fn hash_distances(&self, query: PerceptualHash) -> Array1<u32> {
		let query = Array1::from(query.bits().to_vec());
		let differing = &self.hash_bits ^ &query;
		differing.mapv(u32::from).sum_axis(Axis(1))
	}
}

/// Most common non-empty feature length in a set; the first seen wins ties.
fn feature_len(members: &[&CardTemplate]) -> usize {
	let mut counts: Vec<(usize, usize)> = Vec::new();
	for len in members.iter().map(|t| t.features.len()).filter(|&len| len > 0) {
		match counts.iter_mut().find(|(l, _)| *l == len) {
			Some((_, n)) => *n += 1,
			None => counts.push((len, 1)),
		}
	}

	counts
		.into_iter()
		.fold(None, |best: Option<(usize, usize)>, (len, n)| match best {
			Some((_, m)) if m >= n => best,
			_ => Some((len, n)),
		})
		.map_or(0, |(len, _)| len)
}
