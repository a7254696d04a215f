#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Provider listing record and the field vocabulary shared by the extractor,
//! the batch driver and the output sinks.
//!
//! Every [`ProviderRecord`] carries every column. Fields whose extraction
//! failed hold the sentinel declared for them in the site profile, so a
//! record is never partial.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Summary written to `creneaux_disponibles` when the agenda visit failed.
pub const SLOTS_ERROR: &str = "Erreur de consultation";

/// `nb_creneaux` value for a failed agenda visit.
pub const SLOT_COUNT_ERROR: i64 = -1;

/// Separator between slots in the `creneaux_disponibles` summary.
pub const SLOT_SEPARATOR: &str = "; ";

/// Sentinel for the postal code column when the address has none.
pub const POSTAL_CODE_NOT_FOUND: &str = "Code postal non trouvé";

/// Sentinel for the city column when the address has none.
pub const CITY_NOT_FOUND: &str = "Ville non trouvée";

/// Format of the `timestamp` column.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A field extracted from a listing or a detail page.
///
/// The serialized names double as the keys of the `[fields]` table in a
/// site profile.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
pub enum FieldName {
    /// Provider name.
    #[serde(rename = "nom")]
    #[strum(serialize = "nom")]
    Name,
    /// Medical specialty.
    #[serde(rename = "specialite")]
    #[strum(serialize = "specialite")]
    Specialty,
    /// Street line and postal code + city line.
    #[serde(rename = "adresse")]
    #[strum(serialize = "adresse")]
    Address,
    /// Distance from the searched location.
    #[serde(rename = "distance")]
    #[strum(serialize = "distance")]
    Distance,
    /// Conventioning status fragment.
    #[serde(rename = "conventionnement")]
    #[strum(serialize = "conventionnement")]
    Conventioning,
    /// Rating text.
    #[serde(rename = "note")]
    #[strum(serialize = "note")]
    Rating,
    /// Link to the provider's detail page.
    #[serde(rename = "lien_profil")]
    #[strum(serialize = "lien_profil")]
    ProfileLink,
    /// Visible appointment time slots.
    #[serde(rename = "creneaux")]
    #[strum(serialize = "creneaux")]
    Slots,
    /// Consultation pricing (detail page).
    #[serde(rename = "tarifs")]
    #[strum(serialize = "tarifs")]
    Pricing,
    /// Accepted payment methods (detail page).
    #[serde(rename = "moyens_paiement")]
    #[strum(serialize = "moyens_paiement")]
    PaymentMethods,
    /// Skill / service tags (detail page).
    #[serde(rename = "competences")]
    #[strum(serialize = "competences")]
    Skills,
}

impl FieldName {
    /// Whether the field is extracted from the detail page rather than from
    /// the listing card.
    #[must_use]
    pub const fn is_detail(self) -> bool {
        matches!(self, Self::Pricing | Self::PaymentMethods | Self::Skills)
    }

    /// Whether an absent value is written as the field's sentinel. Rating
    /// and conventioning are typed columns (empty cell, `false`) instead.
    #[must_use]
    pub const fn uses_sentinel(self) -> bool {
        !matches!(self, Self::Rating | Self::Conventioning)
    }
}

/// Outcome of resolving a locator chain.
///
/// Absence is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    /// The first matching locator produced this text.
    Found(String),
    /// No locator matched.
    NotFound,
}

/// One provider listing, serialized as one output row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    #[serde(rename = "nom")]
    pub name: String,
    #[serde(rename = "specialite")]
    pub specialty: String,
    #[serde(rename = "adresse")]
    pub address: String,
    #[serde(rename = "code_postal")]
    pub postal_code: String,
    #[serde(rename = "ville")]
    pub city: String,
    /// Rating on a 0-5 scale. `None` when the listing shows no rating.
    #[serde(rename = "note")]
    pub rating: Option<f64>,
    #[serde(rename = "distance")]
    pub distance: String,
    #[serde(rename = "lien_profil")]
    pub profile_link: String,
    #[serde(rename = "conventionnement")]
    pub conventioned: bool,
    /// Slots joined with [`SLOT_SEPARATOR`], or a sentinel.
    #[serde(rename = "creneaux_disponibles")]
    pub slot_summary: String,
    /// Number of visible slots: `0` when none are shown,
    /// [`SLOT_COUNT_ERROR`] when the agenda could not be read.
    #[serde(rename = "nb_creneaux")]
    pub slot_count: i64,
    #[serde(rename = "tarifs")]
    pub pricing: String,
    #[serde(rename = "moyens_paiement")]
    pub payment_methods: String,
    #[serde(rename = "competences")]
    pub skills: String,
    #[serde(rename = "timestamp", with = "capture_time")]
    pub captured_at: NaiveDateTime,
    /// Ordered, de-duplicated slot texts behind `slot_summary`.
    #[serde(skip)]
    pub slots: Vec<String>,
}

impl ProviderRecord {
    /// Column names in output order.
    pub const COLUMNS: &[&str] = &[
        "nom",
        "specialite",
        "adresse",
        "code_postal",
        "ville",
        "note",
        "distance",
        "lien_profil",
        "conventionnement",
        "creneaux_disponibles",
        "nb_creneaux",
        "tarifs",
        "moyens_paiement",
        "competences",
        "timestamp",
    ];

    /// Creates a record stamped with `captured_at` whose text columns are
    /// filled from `sentinel`.
    ///
    /// The slot columns start in the "no visible availability" state using
    /// the sentinel of [`FieldName::Slots`].
    #[must_use]
    pub fn with_sentinels(captured_at: NaiveDateTime, sentinel: impl Fn(FieldName) -> String) -> Self {
        let no_slots = sentinel(FieldName::Slots);
        Self {
            name: sentinel(FieldName::Name),
            specialty: sentinel(FieldName::Specialty),
            address: sentinel(FieldName::Address),
            postal_code: POSTAL_CODE_NOT_FOUND.to_owned(),
            city: CITY_NOT_FOUND.to_owned(),
            rating: None,
            distance: sentinel(FieldName::Distance),
            profile_link: sentinel(FieldName::ProfileLink),
            conventioned: false,
            slot_summary: no_slots,
            slot_count: 0,
            pricing: sentinel(FieldName::Pricing),
            payment_methods: sentinel(FieldName::PaymentMethods),
            skills: sentinel(FieldName::Skills),
            captured_at,
            slots: Vec::new(),
        }
    }

    /// Stores the visible slots. An empty list records the
    /// `no_slots_sentinel` summary with a count of zero.
    pub fn set_slots(&mut self, slots: Vec<String>, no_slots_sentinel: &str) {
        if slots.is_empty() {
            no_slots_sentinel.clone_into(&mut self.slot_summary);
            self.slot_count = 0;
        } else {
            self.slot_summary = slots.join(SLOT_SEPARATOR);
            self.slot_count = i64::try_from(slots.len()).unwrap_or(i64::MAX);
        }
        self.slots = slots;
    }

    /// Records that the agenda could not be read.
    pub fn mark_slots_error(&mut self) {
        SLOTS_ERROR.clone_into(&mut self.slot_summary);
        self.slot_count = SLOT_COUNT_ERROR;
        self.slots.clear();
    }

    /// Mutable access to a plain-text column.
    ///
    /// Returns `None` for fields stored in typed columns (rating,
    /// conventioning, slots).
    pub fn text_mut(&mut self, field: FieldName) -> Option<&mut String> {
        match field {
            FieldName::Name => Some(&mut self.name),
            FieldName::Specialty => Some(&mut self.specialty),
            FieldName::Address => Some(&mut self.address),
            FieldName::Distance => Some(&mut self.distance),
            FieldName::ProfileLink => Some(&mut self.profile_link),
            FieldName::Pricing => Some(&mut self.pricing),
            FieldName::PaymentMethods => Some(&mut self.payment_methods),
            FieldName::Skills => Some(&mut self.skills),
            FieldName::Conventioning | FieldName::Rating | FieldName::Slots => None,
        }
    }
}

/// Batch of records in encounter order.
///
/// Records are only ever appended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    records: Vec<ProviderRecord>,
}

impl Batch {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    pub fn push(&mut self, record: ProviderRecord) {
        self.records.push(record);
    }

    #[must_use]
    pub fn records(&self) -> &[ProviderRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn into_records(self) -> Vec<ProviderRecord> {
        self.records
    }
}

mod capture_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize as _, Deserializer, Serializer};

    use crate::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr as _;

    use chrono::NaiveDate;
    use strum::IntoEnumIterator as _;

    use super::*;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    fn record() -> ProviderRecord {
        ProviderRecord::with_sentinels(stamp(), |field| format!("{field} absent"))
    }

    #[test]
    fn field_names_round_trip_through_strum() {
        for field in FieldName::iter() {
            assert_eq!(FieldName::from_str(field.as_ref()).unwrap(), field);
        }
        assert_eq!(FieldName::ProfileLink.to_string(), "lien_profil");
    }

    #[test]
    fn only_three_fields_come_from_the_detail_page() {
        let detail: Vec<_> = FieldName::iter().filter(|f| f.is_detail()).collect();
        assert_eq!(
            detail,
            vec![FieldName::Pricing, FieldName::PaymentMethods, FieldName::Skills]
        );
    }

    #[test]
    fn new_record_holds_sentinels() {
        let r = record();
        assert_eq!(r.name, "nom absent");
        assert_eq!(r.slot_summary, "creneaux absent");
        assert_eq!(r.slot_count, 0);
        assert!(r.rating.is_none());
        assert!(!r.conventioned);
    }

    #[test]
    fn set_slots_joins_and_counts() {
        let mut r = record();
        r.set_slots(vec!["10h30".to_string(), "11h00".to_string()], "none");
        assert_eq!(r.slot_summary, "10h30; 11h00");
        assert_eq!(r.slot_count, 2);

        r.set_slots(Vec::new(), "none");
        assert_eq!(r.slot_summary, "none");
        assert_eq!(r.slot_count, 0);
    }

    #[test]
    fn slot_error_is_distinct_from_empty() {
        let mut r = record();
        r.mark_slots_error();
        assert_eq!(r.slot_summary, SLOTS_ERROR);
        assert_eq!(r.slot_count, SLOT_COUNT_ERROR);
    }

    #[test]
    fn serializes_with_output_column_names() {
        let value = serde_json::to_value(record()).unwrap();
        let object = value.as_object().unwrap();
        let mut keys: Vec<&str> = object.keys().map(String::as_str).collect();
        let mut expected = ProviderRecord::COLUMNS.to_vec();
        keys.sort_unstable();
        expected.sort_unstable();
        assert_eq!(keys, expected);
        assert_eq!(object["timestamp"], "2024-03-01 09:15:00");
        assert!(object["note"].is_null());
    }

    #[test]
    fn typed_columns_have_no_sentinel() {
        let without: Vec<_> = FieldName::iter().filter(|f| !f.uses_sentinel()).collect();
        assert_eq!(without, vec![FieldName::Conventioning, FieldName::Rating]);
    }
}
