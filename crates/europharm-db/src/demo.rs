// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use europharm_app::{BrochureFormInput, ItemStore, NewCycle, NewItem};
use time::{Date, Duration, Month};
use tracing::info;

use crate::Store;

const ITEMS: [(&str, &str, bool); 24] = [
    ("AMX-500", "Amoxicillin 500mg Capsules", true),
    ("AZM-250", "Azithromycin 250mg Tablets", true),
    ("CIP-500", "Ciprofloxacin 500mg Tablets", true),
    ("IBU-400", "Ibuprofen 400mg Tablets", true),
    ("PCM-500", "Paracetamol 500mg Tablets", true),
    ("PCM-SYR", "Paracetamol 120mg/5ml Syrup", false),
    ("DCL-050", "Diclofenac 50mg Tablets", true),
    ("DCL-GEL", "Diclofenac 1% Gel", true),
    ("ATV-020", "Atorvastatin 20mg Tablets", true),
    ("SMV-040", "Simvastatin 40mg Tablets", false),
    ("AML-005", "Amlodipine 5mg Tablets", true),
    ("LSN-010", "Lisinopril 10mg Tablets", true),
    ("LSR-050", "Losartan 50mg Tablets", true),
    ("CLP-075", "Clopidogrel 75mg Tablets", true),
    ("MET-850", "Metformin 850mg Tablets", true),
    ("LEV-100", "Levothyroxine 100mcg Tablets", true),
    ("OMP-020", "Omeprazole 20mg Capsules", true),
    ("PNT-040", "Pantoprazole 40mg Tablets", false),
    ("SAL-INH", "Salbutamol 100mcg Inhaler", true),
    ("MTK-010", "Montelukast 10mg Tablets", true),
    ("CTZ-010", "Cetirizine 10mg Tablets", true),
    ("PRD-005", "Prednisolone 5mg Tablets", true),
    ("VIT-D3", "Vitamin D3 1000IU Capsules", true),
    ("ORS-SAC", "Oral Rehydration Salts Sachet", false),
];

const BROCHURES: [(&str, &str, &str); 5] = [
    (
        "Antibiotics Overview",
        "Complete guide to modern antibiotics and their applications",
        "Medications",
    ),
    (
        "Cardiovascular Treatments",
        "Latest treatments and medications for cardiovascular diseases",
        "Cardiology",
    ),
    (
        "Pain Management Solutions",
        "Comprehensive overview of pain management medications",
        "Analgesics",
    ),
    (
        "Vaccine Information",
        "Detailed information about available vaccines and protocols",
        "Immunization",
    ),
    (
        "Diabetes Management",
        "Guide to medications and treatments for diabetes patients",
        "Endocrinology",
    ),
];

const CYCLES: [(&str, &str, i64, Month, i64); 6] = [
    ("Antibiotic Cycle", "ABX", 3, Month::January, 31),
    ("Pain Management", "PAIN", 2, Month::February, 28),
    ("Cardiovascular Therapy", "CARDIO", 4, Month::March, 31),
    ("Respiratory Solutions", "RESP", 2, Month::April, 30),
    ("Metabolic Management", "META", 3, Month::May, 31),
    ("Neurological Therapy", "NEURO", 1, Month::June, 30),
];

const DEMO_YEAR: i32 = 2026;

pub(crate) fn seed(store: &Store) -> Result<()> {
    for (code, name, is_active) in ITEMS {
        store
            .insert_item(&NewItem {
                code: code.to_owned(),
                name: name.to_owned(),
                is_active,
            })
            .with_context(|| format!("seed demo item {code}"))?;
    }

    for (title, description, category) in BROCHURES {
        store
            .create_brochure(&BrochureFormInput {
                title: title.to_owned(),
                description: description.to_owned(),
                category: category.to_owned(),
            })
            .with_context(|| format!("seed demo brochure {title}"))?;
    }

    for (name, alt, coefficient, month, days) in CYCLES {
        let date_from = Date::from_calendar_date(DEMO_YEAR, month, 1)
            .with_context(|| format!("build start date for demo cycle {name}"))?;
        store
            .create_cycle(&NewCycle {
                name: name.to_owned(),
                alt_name: format!("{alt}-{DEMO_YEAR}"),
                coefficient,
                date_from,
                date_to: date_from + Duration::days(days - 1),
            })
            .with_context(|| format!("seed demo cycle {name}"))?;
    }

    info!(
        items = ITEMS.len(),
        brochures = BROCHURES.len(),
        cycles = CYCLES.len(),
        "seeded demo data"
    );
    Ok(())
}
