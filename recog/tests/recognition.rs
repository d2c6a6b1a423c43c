mod common;

use common::{TempDir, card_art, pack_screenshot, save_screenshot, write_corpus, write_numbered};
use recog::{CardId, Color, DetectedCard, LayoutConfig, MatchConfig, MatchOptions, OwnedImage, Recognizer};

fn recognizer(root: &std::path::Path) -> Recognizer {
	Recognizer::try_new(root, MatchConfig::default(), LayoutConfig::default()).unwrap()
}

fn codes(cards: &[DetectedCard]) -> Vec<(String, String)> {
	cards.iter().map(|c| (c.set_id.clone(), c.card_code.clone())).collect()
}

fn pair(set: &str, code: &str) -> (String, String) {
	(set.to_string(), code.to_string())
}

#[test]
fn exact_copies_are_recognized() {
	let dir = TempDir::new("exact");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 8, 100), ("A2", 8, 200), ("A4b", 4, 400)]);

	let shot = pack_screenshot(&[card_art(103), card_art(101), card_art(108), card_art(102), card_art(105)]);
	let path = save_screenshot(dir.path(), "pack.png", &shot);

	let cards = recognizer(&root).process_screenshot(&path);
	assert_eq!(
		codes(&cards),
		vec![pair("A1", "3"), pair("A1", "1"), pair("A1", "8"), pair("A1", "2"), pair("A1", "5")]
	);
	for (i, card) in cards.iter().enumerate() {
		assert_eq!(card.position, i + 1);
		assert!(card.confidence >= 0.9, "{card:?}");
		assert_eq!(card.display_name, card.card_code);
	}
	assert_eq!(cards[3].bounding_box, recog::Rect::new(39, 121, 75, 106));
}

#[test]
fn six_card_packs_are_recognized() {
	let dir = TempDir::new("six");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 8, 100), ("A2", 8, 200)]);

	let shot = pack_screenshot(&[201, 202, 203, 204, 205, 206].map(card_art));
	let path = save_screenshot(dir.path(), "pack.png", &shot);

	let cards = recognizer(&root).process_screenshot(&path);
	let expected = (1..=6).map(|i| pair("A2", &i.to_string())).collect::<Vec<_>>();
	assert_eq!(codes(&cards), expected);
}

#[test]
fn scaled_screenshots_are_recognized() {
	let dir = TempDir::new("scaled");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 8, 100), ("A2", 8, 200)]);

	let shot = pack_screenshot(&[card_art(104), card_art(106), card_art(107), card_art(101), card_art(102)]);
	let shot = image::imageops::resize(&shot, 480, 454, image::imageops::FilterType::Nearest);
	let path = save_screenshot(dir.path(), "pack.png", &shot);

	let cards = recognizer(&root).process_screenshot(&path);
	assert_eq!(
		codes(&cards),
		vec![pair("A1", "4"), pair("A1", "6"), pair("A1", "7"), pair("A1", "1"), pair("A1", "2")]
	);
}

#[test]
fn four_card_packs_only_come_from_the_special_set() {
	let dir = TempDir::new("four");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 8, 100), ("A4b", 6, 400)]);
	let recognizer = recognizer(&root);

	let special = pack_screenshot(&[401, 403, 405, 406].map(card_art));
	let path = save_screenshot(dir.path(), "special.png", &special);
	let cards = recognizer.process_screenshot(&path);
	assert_eq!(
		codes(&cards),
		vec![pair("A4b", "1"), pair("A4b", "3"), pair("A4b", "5"), pair("A4b", "6")]
	);

	// Regular cards laid out as a 4-card pack still only resolve to the special set.
	let regular = pack_screenshot(&[101, 102, 103, 104].map(card_art));
	let path = save_screenshot(dir.path(), "regular.png", &regular);
	for card in recognizer.process_screenshot(&path) {
		assert_eq!(card.set_id, "A4b", "{card:?}");
	}
}

#[test]
fn five_card_packs_never_come_from_the_special_set() {
	let dir = TempDir::new("five");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 8, 100), ("A2", 8, 200), ("A3", 8, 300), ("A4b", 6, 400)]);

	let shot = pack_screenshot(&[401, 402, 403, 404, 405].map(card_art));
	let path = save_screenshot(dir.path(), "pack.png", &shot);

	for card in recognizer(&root).process_screenshot(&path) {
		assert_ne!(card.set_id, "A4b", "{card:?}");
	}
}

#[test]
fn outliers_are_rescanned_in_the_majority_set() {
	let dir = TempDir::new("outlier");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("B1", 6, 100)]);
	// "A3" sorts before "B1" and holds an identical reprint of B1/5, so the
	// first pass resolves that slot to the reprint.
	write_corpus(&root, &[("A3", "1", 105), ("A3", "2", 301), ("A3", "3", 302)]);

	let shot = pack_screenshot(&[101, 102, 103, 104, 105].map(card_art));
	let path = save_screenshot(dir.path(), "pack.png", &shot);

	let recognizer = recognizer(&root);
	let reprint = recognizer
		.matcher()
		.find_best(OwnedImage::open(root.join("B1/5.png")).unwrap().as_image(), &MatchOptions::default())
		.unwrap();
	assert_eq!(reprint.card, CardId::new("A3", "1"));

	let cards = recognizer.process_screenshot(&path);
	assert_eq!(
		codes(&cards),
		vec![pair("B1", "1"), pair("B1", "2"), pair("B1", "3"), pair("B1", "4"), pair("B1", "5")]
	);
	assert!(cards[4].confidence > 0.9, "{:?}", cards[4]);
}

#[test]
fn forced_and_excluded_sets_are_respected() {
	let dir = TempDir::new("forced");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 6, 100), ("A2", 6, 200), ("A3", 6, 300)]);
	let recognizer = recognizer(&root);
	let matcher = recognizer.matcher();

	for code in 1..=6 {
		let art = OwnedImage::open(root.join(format!("A1/{code}.png"))).unwrap();

		let own = matcher.find_best(art.as_image(), &MatchOptions::default()).unwrap();
		assert_eq!(own.card, CardId::new("A1", code.to_string()));

		if let Some(m) = matcher.find_best(art.as_image(), &MatchOptions::only("A2")) {
			assert_eq!(m.card.set_id, "A2");
		}
		if let Some(m) = matcher.find_best(art.as_image(), &MatchOptions::only("A2").detailed()) {
			assert_eq!(m.card.set_id, "A2");
		}

		let excluded = vec!["A1".to_string()];
		if let Some(m) = matcher.find_best(art.as_image(), &MatchOptions::excluding(&excluded)) {
			assert_ne!(m.card.set_id, "A1");
		}

		assert_eq!(matcher.find_best(art.as_image(), &MatchOptions::only("ZZ")), None);
	}
}

#[test]
fn forced_sets_without_a_close_match_find_nothing() {
	let dir = TempDir::new("forced-floor");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 6, 100), ("A2", 6, 200)]);
	let recognizer = recognizer(&root);
	let matcher = recognizer.matcher();
	let floor = MatchConfig::default().low_floor;

	let flat = OwnedImage::filled(75, 106, Color::new(90, 60, 140));
	assert_eq!(matcher.find_best(flat.as_image(), &MatchOptions::only("A2")), None);
	assert_eq!(matcher.find_best(flat.as_image(), &MatchOptions::only("A2").detailed()), None);

	for seed in 900..960 {
		let art = OwnedImage::from_dynamic(&image::DynamicImage::ImageRgb8(card_art(seed)));
		for options in [MatchOptions::only("A2"), MatchOptions::only("A2").detailed()] {
			if let Some(m) = matcher.find_best(art.as_image(), &options) {
				assert_eq!(m.card.set_id, "A2");
				assert!(m.confidence > floor, "seed {seed}: {m:?}");
			}
		}
	}
}

#[test]
fn processing_is_idempotent() {
	let dir = TempDir::new("idempotent");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 8, 100), ("A2", 8, 200)]);

	let shot = pack_screenshot(&[card_art(202), card_art(207), card_art(103), card_art(201), card_art(205)]);
	let path = save_screenshot(dir.path(), "pack.png", &shot);

	let recognizer = recognizer(&root);
	let first = serde_json::to_string(&recognizer.process_screenshot(&path)).unwrap();
	let second = serde_json::to_string(&recognizer.process_screenshot(&path)).unwrap();
	assert_eq!(first, second);
	assert!(first.contains("\"cardCode\""));
	assert!(first.contains("\"boundingBox\""));
}

#[test]
fn names_come_from_the_resolver() {
	let dir = TempDir::new("names");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 6, 100)]);

	let shot = pack_screenshot(&[101, 102, 103, 104, 105].map(card_art));
	let path = save_screenshot(dir.path(), "pack.png", &shot);

	let recognizer = recognizer(&root)
		.with_names(|card: &CardId| (card.card_code != "2").then(|| format!("Card #{}", card.card_code)));
	let names = recognizer
		.process_screenshot(&path)
		.into_iter()
		.map(|c| c.display_name)
		.collect::<Vec<_>>();
	assert_eq!(names, vec!["Card #1", "2", "Card #3", "Card #4", "Card #5"]);
}

#[test]
fn blank_screenshots_have_no_cards() {
	let dir = TempDir::new("blank");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 6, 100), ("A4b", 4, 400)]);

	let blank = image::RgbImage::from_pixel(240, 227, common::BACKGROUND);
	let path = save_screenshot(dir.path(), "blank.png", &blank);

	let recognizer = recognizer(&root);
	assert_eq!(recognizer.detect_regions(OwnedImage::open(&path).unwrap().as_image()).len(), 4);
	assert!(recognizer.process_screenshot(&path).is_empty());
}

#[test]
fn unreadable_screenshots_have_no_cards() {
	let dir = TempDir::new("unreadable");
	let root = dir.path().join("cards");
	write_numbered(&root, &[("A1", 4, 100)]);
	let recognizer = recognizer(&root);

	assert!(recognizer.process_screenshot(dir.path().join("missing.png")).is_empty());

	let garbage = dir.path().join("garbage.png");
	std::fs::write(&garbage, b"definitely not a png").unwrap();
	assert!(recognizer.process_screenshot(&garbage).is_empty());
}
