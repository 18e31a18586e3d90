// Copyright 2025 Fleetlens Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Built-in endpoint catalog for the telematics monitoring exports.
//!
//! Three exports feed the dashboards:
//!
//! - `blt`: background location tracking pipeline metrics
//! - `di`: data-ingestion pipeline metrics
//! - `sdk`: on-device SDK metrics
//!
//! Each endpoint below is one row of the declarative aggregation table.

use crate::endpoint::{EndpointSpec, FilterField, GroupingMode, MatchKind, MetricFieldPolicy};

/// Export consumed by the BLT metrics endpoint.
pub const BLT_EXPORT: &str = "telematics/aggregation/telematics_blt/telematics_monitoring_metrics_blt.csv";

/// Export consumed by the DI metrics, regional distribution, and
/// distinct-field-values endpoints.
pub const DI_EXPORT: &str = "telematics/aggregation/telematics_di/telematics_monitoring_metrics_di.csv";

/// Export consumed by the SDK metrics and daily pipeline report endpoints.
pub const SDK_EXPORT: &str = "telematics/aggregation/telematics_sdk/telematics_monitoring_metrics_sdk.csv";

const DI_FILTERS: &[FilterField] = &[
    FilterField {
        param: "phoneModel",
        column: "phone_model",
        matching: MatchKind::Exact,
    },
    FilterField {
        param: "sdkVersion",
        column: "sdk_version",
        matching: MatchKind::Exact,
    },
    FilterField {
        param: "pipelineComponent",
        column: "pipeline_component",
        matching: MatchKind::Exact,
    },
    FilterField {
        param: "ratingRegion",
        column: "rating_region",
        matching: MatchKind::Exact,
    },
    FilterField {
        param: "deviceOS",
        column: "device_os",
        matching: MatchKind::CaseInsensitive,
    },
];

const SDK_FILTERS: &[FilterField] = &[
    FilterField {
        param: "phoneModel",
        column: "phone_model",
        matching: MatchKind::FuzzyModel,
    },
    FilterField {
        param: "ratingRegion",
        column: "rating_region",
        matching: MatchKind::Exact,
    },
    FilterField {
        param: "deviceOS",
        column: "device_os",
        matching: MatchKind::CaseInsensitive,
    },
];

const PIPELINE_REPORT_FILTERS: &[FilterField] = &[
    FilterField {
        param: "phoneModel",
        column: "phone_model",
        matching: MatchKind::FuzzyModel,
    },
    FilterField {
        param: "sdkVersion",
        column: "sdk_version",
        matching: MatchKind::Exact,
    },
    FilterField {
        param: "pipelineComponent",
        column: "pipeline_component",
        matching: MatchKind::Exact,
    },
    FilterField {
        param: "ratingRegion",
        column: "rating_region",
        matching: MatchKind::Exact,
    },
    FilterField {
        param: "deviceOS",
        column: "device_os",
        matching: MatchKind::CaseInsensitive,
    },
];

/// Fleet-wide BLT pipeline totals. Metric columns are pinned: the export
/// also carries per-trip diagnostic columns that must not be summed.
pub static BLT_METRICS: EndpointSpec = EndpointSpec {
    name: "blt-metrics",
    export: BLT_EXPORT,
    date_column: "date",
    driver_column: "driver_id",
    trip_column: "trip_id",
    filters: &[FilterField {
        param: "deviceOS",
        column: "os_category",
        matching: MatchKind::CaseInsensitive,
    }],
    grouping: GroupingMode::Single,
    metrics: MetricFieldPolicy::Explicit(&["failed_process_count", "successful_process_count"]),
};

/// Fleet-wide DI pipeline totals. Metric columns are inferred because the
/// ingestion pipeline adds counters per release; everything that is not a
/// known dimension or identifier is summed.
pub static DI_METRICS: EndpointSpec = EndpointSpec {
    name: "di-metrics",
    export: DI_EXPORT,
    date_column: "date",
    driver_column: "driver_id",
    trip_column: "trip_id",
    filters: DI_FILTERS,
    grouping: GroupingMode::Single,
    metrics: MetricFieldPolicy::Infer {
        exclude: &[
            "date",
            "phone_model",
            "sdk_version",
            "device_os",
            "pipeline_component",
            "rating_region",
            "driver_id",
            "trip_id",
        ],
    },
};

/// Fleet-wide SDK totals, with the lossy phone-model filter.
pub static SDK_METRICS: EndpointSpec = EndpointSpec {
    name: "sdk-metrics",
    export: SDK_EXPORT,
    date_column: "date",
    driver_column: "driver_id",
    trip_column: "trip_id",
    filters: SDK_FILTERS,
    grouping: GroupingMode::Single,
    metrics: MetricFieldPolicy::Infer {
        exclude: &[
            "date",
            "phone_model",
            "device_os",
            "rating_region",
            "driver_id",
            "trip_id",
            "code_long_description",
        ],
    },
};

/// Top-10 rating regions by record count over the DI export.
pub static DI_REGION: EndpointSpec = EndpointSpec {
    name: "di-region-metrics",
    export: DI_EXPORT,
    date_column: "date",
    driver_column: "driver_id",
    trip_column: "trip_id",
    filters: DI_FILTERS,
    grouping: GroupingMode::ByCategory {
        column: "rating_region",
        top_n: 10,
    },
    metrics: MetricFieldPolicy::Explicit(&[]),
};

/// Daily pipeline report over the SDK export.
pub static PIPELINE_REPORT: EndpointSpec = EndpointSpec {
    name: "pipeline-report",
    export: SDK_EXPORT,
    date_column: "date",
    driver_column: "driver_id",
    trip_column: "trip_id",
    filters: PIPELINE_REPORT_FILTERS,
    grouping: GroupingMode::ByDay,
    metrics: MetricFieldPolicy::Explicit(&[
        "Segment_upload_failed",
        "Segment_upload_succeeded",
        "segment_size",
        "operation_time",
    ]),
};

/// All built-in endpoints.
pub fn all() -> [&'static EndpointSpec; 5] {
    [
        &BLT_METRICS,
        &DI_METRICS,
        &SDK_METRICS,
        &DI_REGION,
        &PIPELINE_REPORT,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_names_are_unique() {
        let mut names: Vec<&str> = all().iter().map(|e| e.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), all().len());
    }

    #[test]
    fn fuzzy_matching_only_on_phone_model() {
        for spec in all() {
            for field in spec.filters {
                if field.matching == MatchKind::FuzzyModel {
                    assert_eq!(field.column, "phone_model");
                }
            }
        }
    }
}
