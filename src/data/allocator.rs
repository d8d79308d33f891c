use rand::Rng;
use tracing::{error, info, warn};

use crate::config::datasets::AllocationOptions;
use crate::data::dataset::{Dataset, Row};
use crate::errors::KitError;
use crate::helpers::execution::ExecutionContext;
use crate::observability::metrics::METRICS;

/// `(worker_id - 1) * max_rows_per_worker + sequence`
///
/// Injective across workers as long as every sequence stays below
/// `max_rows_per_worker`. `None` when the index does not fit in a `u64`.
pub fn allocation_index(ctx: &ExecutionContext, max_rows_per_worker: u64) -> Option<u64> {
    ctx.worker_id
        .saturating_sub(1)
        .checked_mul(max_rows_per_worker)?
        .checked_add(ctx.sequence)
}

/// Row reserved for this run, never shared with another worker's run.
///
/// Past the end of the dataset (or past the per-worker bound, which would
/// collide with the next worker's rows) this returns
/// [`KitError::DataExhausted`] when `abort_on_exhaustion`, `Ok(None)`
/// otherwise.
pub fn get_unique<'d>(
    dataset: &'d Dataset,
    ctx: &ExecutionContext,
    options: &AllocationOptions,
) -> Result<Option<&'d Row>, KitError> {
    let index = match allocation_index(ctx, options.max_rows_per_worker) {
        Some(index) => index,
        None => {
            warn!(
                dataset = dataset.name(),
                %ctx,
                max_rows_per_worker = options.max_rows_per_worker,
                "allocation index overflows u64"
            );
            return exhausted(dataset, u64::MAX, options);
        }
    };

    if ctx.sequence >= options.max_rows_per_worker {
        warn!(
            dataset = dataset.name(),
            %ctx,
            max_rows_per_worker = options.max_rows_per_worker,
            "sequence exceeds per-worker bound, row would collide with the next worker"
        );
        return exhausted(dataset, index, options);
    }

    match usize::try_from(index).ok().and_then(|idx| dataset.get(idx)) {
        Some(row) => Ok(Some(row)),
        None => exhausted(dataset, index, options),
    }
}

fn exhausted<'d>(
    dataset: &'d Dataset,
    index: u64,
    options: &AllocationOptions,
) -> Result<Option<&'d Row>, KitError> {
    METRICS
        .data_exhaustions
        .with_label_values(&[dataset.name()])
        .inc();
    error!(
        dataset = dataset.name(),
        index,
        len = dataset.len(),
        "dataset exhausted"
    );
    if options.abort_on_exhaustion {
        Err(KitError::DataExhausted {
            dataset: dataset.name().to_owned(),
            index,
            len: dataset.len(),
        })
    } else {
        Ok(None)
    }
}

/// Uniformly chosen row; rows may repeat across runs.
pub fn get_random(dataset: Option<&Dataset>) -> Option<&Row> {
    let dataset = dataset?;
    if dataset.is_empty() {
        return None;
    }
    let idx = rand::rng().random_range(0..dataset.len());
    dataset.get(idx)
}

/// Whether the dataset covers `workers * runs_per_worker` unique allocations.
pub fn check_sufficiency(dataset: &Dataset, workers: u64, runs_per_worker: u64) -> bool {
    let required = workers.saturating_mul(runs_per_worker);
    let available = dataset.len() as u64;
    if available >= required {
        info!(
            dataset = dataset.name(),
            available,
            required,
            surplus = available - required,
            "dataset capacity sufficient"
        );
        true
    } else {
        warn!(
            dataset = dataset.name(),
            available,
            required,
            deficit = required - available,
            "dataset capacity insufficient"
        );
        false
    }
}

/// Check that the first row carries every required field.
///
/// Later rows are not inspected.
pub fn validate_schema(dataset: &Dataset, required_fields: &[&str]) -> Result<(), KitError> {
    let missing: Vec<String> = match dataset.get(0) {
        Some(first) => required_fields
            .iter()
            .filter(|field| !first.contains_key(**field))
            .map(|field| field.to_string())
            .collect(),
        None => required_fields.iter().map(|field| field.to_string()).collect(),
    };

    if missing.is_empty() {
        Ok(())
    } else {
        error!(dataset = dataset.name(), missing = ?missing, "dataset schema check failed");
        Err(KitError::Schema {
            dataset: dataset.name().to_owned(),
            missing,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::datasets::LoadOptions;
    use crate::data::loader::load_str;

    fn three_rows(name: &str) -> Dataset {
        load_str(name, "user\nu0\nu1\nu2\n", &LoadOptions::default()).unwrap()
    }

    #[test]
    fn indices_are_disjoint_across_workers() {
        let max = 1000;
        for (w1, w2) in [(1, 2), (2, 3), (1, 7)] {
            for s1 in [0, 1, 500, 999] {
                for s2 in [0, 1, 500, 999] {
                    let a = allocation_index(&ExecutionContext::new(w1, s1), max).unwrap();
                    let b = allocation_index(&ExecutionContext::new(w2, s2), max).unwrap();
                    assert_ne!(a, b);
                }
            }
        }
        assert_eq!(allocation_index(&ExecutionContext::new(3, 4), 10), Some(24));
    }

    #[test]
    fn hands_out_rows_in_file_order_then_aborts() {
        let ds = three_rows("alloc_order_case");
        let options = AllocationOptions::default();
        for seq in 0..3 {
            let row = get_unique(&ds, &ExecutionContext::new(1, seq), &options).unwrap().unwrap();
            assert_eq!(row["user"], format!("u{}", seq));
        }
        match get_unique(&ds, &ExecutionContext::new(1, 3), &options) {
            Err(KitError::DataExhausted { index, len, .. }) => {
                assert_eq!(index, 3);
                assert_eq!(len, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            METRICS.data_exhaustions.with_label_values(&["alloc_order_case"]).get(),
            1
        );
    }

    #[test]
    fn exhaustion_can_be_non_fatal() {
        let ds = three_rows("alloc_soft_case");
        let options = AllocationOptions {
            abort_on_exhaustion: false,
            ..AllocationOptions::default()
        };
        assert!(get_unique(&ds, &ExecutionContext::new(2, 0), &options).unwrap().is_none());
    }

    #[test]
    fn sequence_past_bound_is_treated_as_exhaustion() {
        let ds = load_str("alloc_bound_case", "n\n0\n1\n2\n3\n4\n", &LoadOptions::default()).unwrap();
        let options = AllocationOptions {
            max_rows_per_worker: 2,
            abort_on_exhaustion: true,
        };
        // worker 1 seq 2 would read worker 2's first row
        assert!(get_unique(&ds, &ExecutionContext::new(1, 2), &options).is_err());
        let row = get_unique(&ds, &ExecutionContext::new(2, 0), &options).unwrap().unwrap();
        assert_eq!(row["n"], "2");
    }

    #[test]
    fn oversized_bound_is_exhaustion_not_overflow() {
        let ds = load_str("alloc_overflow_case", "n\na\nb\n", &LoadOptions::default()).unwrap();
        let options = AllocationOptions {
            max_rows_per_worker: 1 << 63,
            abort_on_exhaustion: true,
        };
        assert_eq!(allocation_index(&ExecutionContext::new(3, 0), 1 << 63), None);

        let row = get_unique(&ds, &ExecutionContext::new(1, 0), &options).unwrap().unwrap();
        assert_eq!(row["n"], "a");
        match get_unique(&ds, &ExecutionContext::new(3, 0), &options) {
            Err(KitError::DataExhausted { index, .. }) => assert_eq!(index, u64::MAX),
            other => panic!("unexpected {:?}", other),
        }

        let lenient = AllocationOptions {
            abort_on_exhaustion: false,
            ..options
        };
        assert!(get_unique(&ds, &ExecutionContext::new(3, 0), &lenient).unwrap().is_none());
    }

    #[test]
    fn random_row_handles_absent_and_empty() {
        assert!(get_random(None).is_none());
        assert!(get_random(Some(&Dataset::empty("none"))).is_none());
        let ds = three_rows("alloc_random_case");
        let row = get_random(Some(&ds)).unwrap();
        assert!(["u0", "u1", "u2"].contains(&row["user"].as_str()));
    }

    #[test]
    fn sufficiency_compares_capacity() {
        let ds = three_rows("alloc_capacity_case");
        assert!(check_sufficiency(&ds, 3, 1));
        assert!(!check_sufficiency(&ds, 2, 2));
    }

    #[test]
    fn schema_checks_first_row_only() {
        let ds = load_str("accounts", "id,email\n1,a@x\n", &LoadOptions::default()).unwrap();
        assert!(validate_schema(&ds, &["id", "email"]).is_ok());
        match validate_schema(&ds, &["id", "password", "otp"]) {
            Err(KitError::Schema { missing, .. }) => assert_eq!(missing, vec!["password", "otp"]),
            other => panic!("unexpected {:?}", other),
        }
        assert!(validate_schema(&Dataset::empty("none"), &["id"]).is_err());
    }
}
