// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod memory;

pub use memory::MemoryStore;

use anyhow::{Context, Result};
use europharm_app::{BrochureFormInput, Item, ItemId, NewCycle, NewItem};
use std::path::PathBuf;
use time::{Date, Duration, Month, OffsetDateTime, Time};

const MOLECULES: [&str; 20] = [
    "Amoxicillin",
    "Azithromycin",
    "Ibuprofen",
    "Paracetamol",
    "Omeprazole",
    "Metformin",
    "Atorvastatin",
    "Amlodipine",
    "Lisinopril",
    "Levothyroxine",
    "Cetirizine",
    "Salbutamol",
    "Ciprofloxacin",
    "Diclofenac",
    "Pantoprazole",
    "Losartan",
    "Clopidogrel",
    "Montelukast",
    "Simvastatin",
    "Prednisolone",
];

const FORMS: [&str; 8] = [
    "Tablets",
    "Capsules",
    "Syrup",
    "Suspension",
    "Cream",
    "Injection",
    "Drops",
    "Inhaler",
];

const STRENGTHS: [&str; 8] = ["5mg", "10mg", "20mg", "50mg", "100mg", "250mg", "500mg", "1g"];

const BROCHURE_CATEGORIES: [&str; 6] = [
    "Cardiology",
    "Immunization",
    "Respiratory",
    "Gastroenterology",
    "Pain Management",
    "Dermatology",
];

const BROCHURE_TOPICS: [&str; 8] = [
    "Product Overview",
    "Dosage Guide",
    "Patient Leaflet",
    "Clinical Summary",
    "Safety Information",
    "Storage Guidelines",
    "Prescribing Notes",
    "Launch Kit",
];

const CYCLE_THEMES: [&str; 6] = [
    "Winter Respiratory",
    "Spring Allergy",
    "Cardio Focus",
    "Back to School",
    "Antibiotic Stewardship",
    "Year End",
];

struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn chance(&mut self, percent: u64) -> bool {
        self.next_u64() % 100 < percent
    }
}

/// Seeded generator for catalog fixtures. The same seed always yields the
/// same sequence.
pub struct PharmaFaker {
    rng: DeterministicRng,
    serial: u32,
}

impl PharmaFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            serial: 0,
        }
    }

    pub fn int_n(&mut self, n: usize) -> usize {
        self.rng.int_n(n)
    }

    /// Codes are unique per faker: a three-letter molecule prefix plus a
    /// running serial.
    pub fn new_item(&mut self) -> NewItem {
        let molecule = self.pick(&MOLECULES);
        let form = self.pick(&FORMS);
        let strength = self.pick(&STRENGTHS);
        self.serial += 1;
        NewItem {
            code: format!("{}-{:04}", code_prefix(molecule), self.serial),
            name: format!("{molecule} {strength} {form}"),
            is_active: self.rng.chance(80),
        }
    }

    /// `count` stored rows, newest first, with decimal ids counting down
    /// from `count`.
    pub fn items(&mut self, count: usize) -> Vec<Item> {
        let base = reference_now();
        let mut rows: Vec<Item> = (1..=count)
            .map(|index| {
                let seed = self.new_item();
                let created_at = base + Duration::minutes(index as i64);
                Item {
                    id: ItemId::new(index.to_string()),
                    code: seed.code,
                    name: seed.name,
                    alt_name: None,
                    is_active: seed.is_active,
                    created_at,
                    updated_at: created_at,
                }
            })
            .collect();
        rows.reverse();
        rows
    }

    pub fn brochure(&mut self) -> BrochureFormInput {
        let category = self.pick(&BROCHURE_CATEGORIES);
        let topic = self.pick(&BROCHURE_TOPICS);
        let molecule = self.pick(&MOLECULES);
        BrochureFormInput {
            title: format!("{molecule} {topic}"),
            description: format!("{topic} for {molecule} in {}.", category.to_lowercase()),
            category: category.to_owned(),
        }
    }

    pub fn cycle(&mut self, year: i32) -> NewCycle {
        let theme = self.pick(&CYCLE_THEMES);
        let month = Month::try_from(self.rng.int_n(12) as u8 + 1).unwrap_or(Month::January);
        let date_from = Date::from_calendar_date(year, month, 1).unwrap_or(Date::MIN);
        let length = 14 + self.rng.int_n(45) as i64;
        self.serial += 1;
        NewCycle {
            name: format!("{theme} {year}"),
            alt_name: format!("CY-{year}-{:02}", self.serial % 100),
            coefficient: 1 + self.rng.int_n(5) as i64,
            date_from,
            date_to: date_from + Duration::days(length - 1),
        }
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }
}

fn code_prefix(molecule: &str) -> String {
    molecule
        .chars()
        .filter(char::is_ascii_alphabetic)
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase()
}

pub fn temp_db_path() -> Result<(tempfile::TempDir, PathBuf)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let db_path = dir.path().join("europharm.db");
    Ok((dir, db_path))
}

pub fn fixture_datetime() -> &'static str {
    "2026-01-15T09:30:00Z"
}

pub fn molecules() -> &'static [&'static str] {
    &MOLECULES
}

fn reference_now() -> OffsetDateTime {
    Date::from_calendar_date(2026, Month::January, 15)
        .map(|date| date.with_time(Time::MIDNIGHT).assume_utc())
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::{PharmaFaker, code_prefix, molecules};
    use std::collections::BTreeSet;

    #[test]
    fn new_deterministic_seed() {
        let mut left = PharmaFaker::new(42);
        let mut right = PharmaFaker::new(42);
        assert_eq!(left.new_item(), right.new_item());
        assert_eq!(left.brochure(), right.brochure());
    }

    #[test]
    fn item_codes_are_unique() {
        let mut faker = PharmaFaker::new(7);
        let codes: BTreeSet<String> = (0..50).map(|_| faker.new_item().code).collect();
        assert_eq!(codes.len(), 50);
    }

    #[test]
    fn items_are_newest_first() {
        let mut faker = PharmaFaker::new(3);
        let rows = faker.items(5);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].id.as_str(), "5");
        assert!(rows.windows(2).all(|pair| pair[0].created_at > pair[1].created_at));
    }

    #[test]
    fn cycles_have_forward_ranges() {
        let mut faker = PharmaFaker::new(9);
        for _ in 0..20 {
            let cycle = faker.cycle(2026);
            assert!(cycle.date_to > cycle.date_from);
            assert!((1..=5).contains(&cycle.coefficient));
        }
    }

    #[test]
    fn brochures_fill_every_field() {
        let mut faker = PharmaFaker::new(11);
        let brochure = faker.brochure();
        assert!(brochure.validate().is_ok());
    }

    #[test]
    fn code_prefix_uses_first_letters() {
        assert_eq!(code_prefix("Amoxicillin"), "AMO");
        assert!(molecules().iter().all(|m| code_prefix(m).len() == 3));
    }

    #[test]
    fn int_n() {
        let mut faker = PharmaFaker::new(1);
        for _ in 0..100 {
            assert!(faker.int_n(5) < 5);
        }
        assert_eq!(faker.int_n(0), 0);
    }
}
