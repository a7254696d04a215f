//! Record assembly.
//!
//! Every field spec of the table runs against the same listing scope and the
//! results are merged into one [`ProviderRecord`]. A field whose page probe
//! faults keeps its sentinel; the record is never dropped.

use chrono::NaiveDateTime;
use slot_scout_listing_models::{ExtractionResult, FieldName, ProviderRecord};
use strum::IntoEnumIterator as _;
use url::Url;

use crate::ProbeError;
use crate::dom::Node;
use crate::fields::{absolute_link, is_conventioned, parse_rating, postal_code_and_city};
use crate::profile::FieldTable;

/// Run-wide values some fields depend on.
#[derive(Debug, Clone, Copy)]
pub struct ExtractContext<'a> {
    /// The search query; substituted into sentinels.
    pub query: &'a str,
    /// Base for relative profile links.
    pub base_url: &'a Url,
}

/// Builds a record from one listing scope.
///
/// Detail fields are left at their sentinels.
#[must_use]
pub fn assemble_listing<N: Node>(
    scope: &N,
    fields: &FieldTable,
    ctx: ExtractContext<'_>,
    captured_at: NaiveDateTime,
) -> ProviderRecord {
    let mut record =
        ProviderRecord::with_sentinels(captured_at, |f| fields.get(f).sentinel_for(ctx.query));

    for field in FieldName::iter().filter(|f| !f.is_detail()) {
        if let Err(e) = apply_field(&mut record, field, scope, fields, ctx) {
            log::warn!("'{field}' extraction faulted, keeping sentinel: {e}");
        }
    }

    record
}

/// Replaces the record's slots with those visible in `scope`.
///
/// Used after the agenda of a listing has been expanded.
///
/// # Errors
///
/// Returns [`ProbeError`] if the page layer faults; the record is left
/// untouched in that case.
pub fn refresh_slots<N: Node>(
    record: &mut ProviderRecord,
    scope: &N,
    fields: &FieldTable,
    ctx: ExtractContext<'_>,
) -> Result<(), ProbeError> {
    apply_field(record, FieldName::Slots, scope, fields, ctx)
}

/// Merges the detail fields found on a provider page into `record`.
///
/// Listing fields are never touched. A detail field whose probe faults is set
/// to its sentinel.
pub fn augment_with_detail<N: Node>(
    record: &mut ProviderRecord,
    scope: &N,
    fields: &FieldTable,
    ctx: ExtractContext<'_>,
) {
    for field in FieldName::iter().filter(|f| f.is_detail()) {
        if let Err(e) = apply_field(record, field, scope, fields, ctx) {
            log::warn!("detail '{field}' extraction faulted: {e}");
            reset_field(record, field, fields, ctx);
        }
    }
}

/// Sets the three detail fields back to their sentinels.
pub fn reset_detail(record: &mut ProviderRecord, fields: &FieldTable, ctx: ExtractContext<'_>) {
    for field in FieldName::iter().filter(|f| f.is_detail()) {
        reset_field(record, field, fields, ctx);
    }
}

fn reset_field(
    record: &mut ProviderRecord,
    field: FieldName,
    fields: &FieldTable,
    ctx: ExtractContext<'_>,
) {
    if let Some(slot) = record.text_mut(field) {
        *slot = fields.get(field).sentinel_for(ctx.query);
    }
}

/// Extracts one field and stores its typed value. Nothing is written unless
/// extraction succeeds.
fn apply_field<N: Node>(
    record: &mut ProviderRecord,
    field: FieldName,
    scope: &N,
    fields: &FieldTable,
    ctx: ExtractContext<'_>,
) -> Result<(), ProbeError> {
    let spec = fields.get(field);

    match field {
        FieldName::Rating => {
            record.rating = match spec.extract_first(scope)? {
                ExtractionResult::Found(text) => parse_rating(&text),
                ExtractionResult::NotFound => None,
            };
        }
        FieldName::ProfileLink => {
            if let ExtractionResult::Found(href) = spec.extract_first(scope)? {
                record.profile_link = absolute_link(ctx.base_url, &href);
            }
        }
        FieldName::Conventioning => {
            record.conventioned = spec.extract(scope)?.iter().any(|v| is_conventioned(v));
        }
        FieldName::Slots => {
            record.set_slots(spec.extract(scope)?, &spec.sentinel_for(ctx.query));
        }
        FieldName::Address => {
            let values = spec.extract(scope)?;
            if !values.is_empty() {
                let address = values.join(&spec.joiner);
                if let Some((postal_code, city)) = postal_code_and_city(&address) {
                    record.postal_code = postal_code;
                    record.city = city;
                }
                record.address = address;
            }
        }
        other => {
            let values = spec.extract(scope)?;
            if let Some(slot) = record.text_mut(other).filter(|_| !values.is_empty()) {
                *slot = values.join(&spec.joiner);
            }
        }
    }

    Ok(())
}
