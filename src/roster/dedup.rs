use std::collections::HashSet;

use super::normalize::{normalize_batch, NormalizeReport};
use super::types::{MemberRecord, RawRecord};

/// Keep the first record per identity key, in order of first occurrence.
/// Records without an identity key are always kept.
pub fn dedup_records(records: Vec<MemberRecord>) -> Vec<MemberRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(records.len());

    for record in records {
        match record.identity_key() {
            Some(key) => {
                if seen.insert(key.to_string()) {
                    kept.push(record);
                } else {
                    tracing::trace!(key, name = %record.name, "dropping repeated member");
                }
            }
            None => kept.push(record),
        }
    }

    kept
}

/// Normalize every batch, concatenate in batch order and deduplicate.
///
/// Batch order decides which duplicate survives, so callers that fetch
/// sources concurrently must still hand batches over in source order.
pub fn merge_batches(batches: &[Vec<RawRecord>]) -> (Vec<MemberRecord>, NormalizeReport) {
    let mut total = NormalizeReport::default();
    let mut all = Vec::new();

    for (index, batch) in batches.iter().enumerate() {
        let (records, report) = normalize_batch(batch);
        tracing::debug!(
            batch = index,
            records = report.records,
            malformed = report.malformed,
            "normalized batch"
        );
        total.records += report.records;
        total.malformed += report.malformed;
        all.extend(records);
    }

    let merged = dedup_records(all);
    tracing::debug!(
        before = total.records,
        after = merged.len(),
        "deduplicated members"
    );
    (merged, total)
}
