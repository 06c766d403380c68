//! Record filters and the inclusion pipeline

use crate::config::DreqConfig;
use crate::record::{CellExt, CellValue, Record};
use std::fmt;

type Predicate = Box<dyn Fn(&Record) -> bool>;

/// A named predicate over records
pub struct RecordFilter {
    name: String,
    predicate: Predicate,
}

impl RecordFilter {
    pub fn new(name: impl Into<String>, predicate: impl Fn(&Record) -> bool + 'static) -> Self {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test(&self, record: &Record) -> bool {
        (self.predicate)(record)
    }
}

impl fmt::Debug for RecordFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordFilter").field("name", &self.name).finish()
    }
}

/// Wrap a filter so every rejection is logged. The result is unchanged.
pub fn logged(filter: RecordFilter) -> RecordFilter {
    let name = filter.name.clone();
    RecordFilter::new(name, move |record| {
        let accepted = filter.test(record);
        if !accepted {
            log::info!("{}", rejection_line(&filter.name, record));
        }
        accepted
    })
}

/// `FILTER "<name>": <miptable> <cmor_label>`
pub fn rejection_line(name: &str, record: &Record) -> String {
    format!(
        "FILTER \"{}\": {} {}",
        name,
        record.raw().miptable.display_or_empty(),
        record.raw().cmor_label.display_or_empty()
    )
}

/// Conjunction of filters, evaluated in order
#[derive(Debug, Default)]
pub struct FilterPipeline {
    filters: Vec<RecordFilter>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// The inclusion test used when loading a filtered request
    pub fn standard(config: &DreqConfig) -> Self {
        Self::new()
            .with(is_available(config))
            .with(logged(acceptable_frequency(config)))
            .with(not_site_dimension())
            .with(has_codes())
            .with(logged(is_applicable()))
            .with(logged(not_excluded_manually()))
    }

    pub fn with(mut self, filter: RecordFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: RecordFilter) {
        self.filters.push(filter);
    }

    pub fn accepts(&self, record: &Record) -> bool {
        self.filters.iter().all(|f| f.test(record))
    }

    pub fn names(&self) -> Vec<&str> {
        self.filters.iter().map(RecordFilter::name).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Trimmed inferred plan is one of `plans`; no plan means unavailable
pub fn plan_is_available(record: &Record, plans: &[String]) -> bool {
    record
        .inferred_plan()
        .map(|plan| plan.to_string())
        .is_some_and(|plan| plans.iter().any(|p| p == plan.trim()))
}

fn producing(plan: Option<&CellValue>, non_producing: &[String]) -> bool {
    match plan {
        Some(plan) => {
            let plan = plan.to_string();
            !non_producing.iter().any(|p| p == plan.trim())
        }
        None => true,
    }
}

/// Plan is not one of `non_producing`; no plan counts as producing
pub fn plan_is_produced(record: &Record, non_producing: &[String]) -> bool {
    producing(record.raw().plan.as_ref(), non_producing)
}

/// As [`plan_is_produced`], but a manual edit makes the record producing
pub fn inferred_plan_is_produced(record: &Record, non_producing: &[String]) -> bool {
    producing(record.inferred_plan(), non_producing)
}

/// `last_update` carries no deletion marker
pub fn is_not_deleted(record: &Record, marker: &str) -> bool {
    !record
        .raw()
        .last_update
        .text()
        .is_some_and(|update| update.contains(marker))
}

pub fn is_available(config: &DreqConfig) -> RecordFilter {
    let plans = config.available_plans.clone();
    RecordFilter::new("available", move |record| plan_is_available(record, &plans))
}

pub fn acceptable_frequency(config: &DreqConfig) -> RecordFilter {
    let excluded = config.excluded_frequencies.clone();
    RecordFilter::new("good_freq", move |record| {
        !record
            .frequency()
            .is_some_and(|freq| excluded.iter().any(|e| e == freq))
    })
}

pub fn not_site_dimension() -> RecordFilter {
    RecordFilter::new("not_site", |record| {
        !record.dimension().is_some_and(|d| d.contains("site"))
    })
}

pub fn has_codes() -> RecordFilter {
    RecordFilter::new("has_stash", |record| record.stash_codes_needed().is_some())
}

pub fn is_applicable() -> RecordFilter {
    RecordFilter::new("applicable", Record::is_applicable)
}

/// Hook for records that cannot be processed for some temporary reason.
/// Nothing is excluded at present.
pub fn not_excluded_manually() -> RecordFilter {
    RecordFilter::new("not_rogue", |_record| true)
}

pub fn not_deleted(config: &DreqConfig) -> RecordFilter {
    let marker = config.deletion_marker.clone();
    RecordFilter::new("not_deleted", move |record| is_not_deleted(record, &marker))
}

pub fn is_produced(config: &DreqConfig) -> RecordFilter {
    let plans = config.non_producing_plans.clone();
    RecordFilter::new("produce", move |record| plan_is_produced(record, &plans))
}

const REQUIRED_COMPONENTS: [&str; 16] = [
    "aerosol",
    "atmos-physics",
    "boundary layer",
    "carbon",
    "cftables",
    "chemistry",
    "cloud",
    "dust",
    "icesheet",
    "land",
    "land-use",
    "obgc",
    "ocean",
    "radiation",
    "seaice",
    "snow-permafrost",
];

/// Component is one of the known UKESM components
pub fn required_component() -> RecordFilter {
    RecordFilter::new("required_components", |record| {
        record
            .ukesm_component()
            .is_some_and(|c| REQUIRED_COMPONENTS.contains(&c))
    })
}
