//! Property-based tests for the per-service cost calculators
//!
//! Randomized non-negative usage is priced by each calculator variant and the
//! results are checked for internal consistency.

use chrono::{Duration, TimeZone, Utc};
use coststream::calculator::{
    monthly_estimate, ComputeFunctionCost, CostCalculator, DatabaseInstanceCost, StorageTableCost,
};
use coststream::dimension::{Metric, MetricDimension};
use coststream::pricing::{PriceCatalogEntry, PricingCatalog};
use coststream::provider::{Resource, ServiceKind};
use coststream::window::TimeWindow;
use proptest::prelude::*;

fn window(minutes: i64) -> TimeWindow {
    let start = Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap();
    TimeWindow::new(start, start + Duration::minutes(minutes)).unwrap()
}

fn table_calculator(read: f64, write: f64, storage: f64) -> CostCalculator {
    CostCalculator::StorageTable(
        StorageTableCost::from_catalog(PricingCatalog::from_entries(
            "AmazonDynamoDB",
            "eu-west-1",
            vec![
                PriceCatalogEntry::new("ReadRequestUnits", read, "USD", "Throughput"),
                PriceCatalogEntry::new("WriteRequestUnits", write, "USD", "Throughput"),
                PriceCatalogEntry::new("GB-Mo", storage, "USD", "Database Storage"),
            ],
        ))
        .unwrap(),
    )
}

fn function_calculator() -> CostCalculator {
    let transfer = PricingCatalog::from_entries(
        "AWSDataTransfer",
        "eu-west-1",
        vec![
            PriceCatalogEntry::new("GB", 0.0, "USD", "Data Transfer")
                .with_attribute("transferType", "AWS Outbound")
                .with_range(0.0, Some(100.0)),
            PriceCatalogEntry::new("GB", 0.09, "USD", "Data Transfer")
                .with_attribute("transferType", "AWS Outbound")
                .with_range(100.0, None),
            PriceCatalogEntry::new("GB", 0.01, "USD", "Data Transfer")
                .with_attribute("transferType", "IntraRegion"),
            PriceCatalogEntry::new("GB", 0.02, "USD", "Data Transfer")
                .with_attribute("transferType", "InterRegion Outbound"),
        ],
    );
    CostCalculator::ComputeFunction(
        ComputeFunctionCost::from_catalogs(
            PricingCatalog::from_entries(
                "AWSLambda",
                "eu-west-1",
                vec![
                    PriceCatalogEntry::new("Requests", 0.0000002, "USD", "Serverless"),
                    PriceCatalogEntry::new("Lambda-GB-Second", 0.0000166667, "USD", "Serverless"),
                ],
            ),
            transfer,
        )
        .unwrap(),
    )
}

fn database_calculator() -> CostCalculator {
    CostCalculator::DatabaseInstance(
        DatabaseInstanceCost::from_catalog(PricingCatalog::from_entries(
            "AmazonRDS",
            "eu-west-1",
            vec![
                PriceCatalogEntry::new("Hrs", 0.18, "USD", "Database Instance")
                    .with_attribute("instanceType", "db.t3.large"),
                PriceCatalogEntry::new("GB-Mo", 0.115, "USD", "Database Storage"),
                PriceCatalogEntry::new("IOs", 0.0000002, "USD", "System Operation"),
            ],
        ))
        .unwrap(),
    )
}

fn table_dimension(minutes: i64, read: f64, write: f64, bytes: f64) -> MetricDimension {
    MetricDimension::builder(Resource::new("orders", ServiceKind::KeyValueTable), window(minutes))
        .set(Metric::ReadCapacityUnits, read)
        .set(Metric::WriteCapacityUnits, write)
        .set(Metric::StorageBytes, bytes)
        .build()
        .unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

proptest! {
    #[test]
    fn test_table_breakdown_sums_to_total(
        minutes in 1i64..120,
        read in 0.0f64..1e6,
        write in 0.0f64..1e6,
        bytes in 0.0f64..1e13,
    ) {
        let result = table_calculator(0.00025, 0.00125, 0.25)
            .calculate_for_dimension(&table_dimension(minutes, read, write, bytes))
            .unwrap();
        let sum: f64 = result.breakdown.values().sum();
        prop_assert!(close(sum, result.total_cost));
        prop_assert_eq!(result.cost_window_seconds, 60.0);
    }

    #[test]
    fn test_function_breakdown_sums_to_total(
        requests in 0.0f64..1e7,
        duration in 0.0f64..900_000.0,
        memory in prop_oneof![Just(128.0), Just(512.0), Just(1769.0), Just(10240.0)],
        internet in 0.0f64..1e4,
        intra in 0.0f64..1e4,
    ) {
        let dimension = MetricDimension::builder(
            Resource::new("checkout", ServiceKind::ComputeFunction),
            window(5),
        )
        .set(Metric::RequestCount, requests)
        .set(Metric::AverageDurationMs, duration)
        .set(Metric::MemoryMb, memory)
        .set(Metric::DataTransferOutInternetGb, internet)
        .set(Metric::DataTransferOutIntraRegionGb, intra)
        .build()
        .unwrap();

        let result = function_calculator().calculate_for_dimension(&dimension).unwrap();
        let sum: f64 = result.breakdown.values().sum();
        prop_assert!(close(sum, result.total_cost));
        prop_assert!(result.total_cost >= 0.0);
    }

    #[test]
    fn test_database_breakdown_sums_to_total(
        storage_gb in 0.0f64..65_536.0,
        ios in 0.0f64..1e9,
    ) {
        let dimension = MetricDimension::builder(
            Resource::new("orders-db", ServiceKind::ManagedDatabaseInstance),
            window(5),
        )
        .set(Metric::StorageBytes, storage_gb * 1e9)
        .set(Metric::IoRequests, ios)
        .instance_class("db.t3.large")
        .build()
        .unwrap();

        let result = database_calculator().calculate_for_dimension(&dimension).unwrap();
        let sum: f64 = result.breakdown.values().sum();
        prop_assert!(close(sum, result.total_cost));
        // An idle instance still bills its hours
        prop_assert!(result.component("instanceCharges") > 0.0);
    }

    #[test]
    fn test_zero_usage_is_free_at_any_price(
        read_price in 0.0f64..1.0,
        write_price in 0.0f64..1.0,
        storage_price in 0.0f64..10.0,
        minutes in 1i64..60,
    ) {
        let result = table_calculator(read_price, write_price, storage_price)
            .calculate_for_dimension(&table_dimension(minutes, 0.0, 0.0, 0.0))
            .unwrap();
        prop_assert_eq!(result.total_cost, 0.0);
        prop_assert_eq!(result.estimated_monthly_charge, 0.0);
    }

    #[test]
    fn test_storage_cost_monotonic_in_bytes(
        bytes in 1.0f64..1e12,
        extra in 1.0f64..1e12,
        write in 0.0f64..1e4,
    ) {
        let calc = table_calculator(0.00025, 0.00125, 0.25);
        let smaller = calc.calculate_for_dimension(&table_dimension(5, 0.0, write, bytes)).unwrap();
        let larger = calc
            .calculate_for_dimension(&table_dimension(5, 0.0, write, bytes + extra))
            .unwrap();
        prop_assert!(larger.component("storageCharges") > smaller.component("storageCharges"));
    }

    #[test]
    fn test_storage_cost_monotonic_in_writes(
        bytes in 1.0f64..1e12,
        write in 0.0f64..1e4,
        extra in 1.0f64..1e4,
    ) {
        let calc = table_calculator(0.00025, 0.00125, 0.25);
        let fewer = calc.calculate_for_dimension(&table_dimension(5, 0.0, write, bytes)).unwrap();
        let more = calc
            .calculate_for_dimension(&table_dimension(5, 0.0, write + extra, bytes))
            .unwrap();
        prop_assert!(more.component("storageCharges") > fewer.component("storageCharges"));
    }

    #[test]
    fn test_monthly_estimate_scales_linearly(
        total in 0.0f64..1e4,
        cost_window in 1.0f64..3600.0,
    ) {
        let month = 2_592_000.0;
        let single = monthly_estimate(total, cost_window, month);
        let doubled = monthly_estimate(2.0 * total, cost_window, month);
        prop_assert!(close(doubled, 2.0 * single));
    }

    #[test]
    fn test_doubling_usage_doubles_request_charges(
        read in 0.0f64..1e6,
        write in 0.0f64..1e6,
    ) {
        let calc = table_calculator(0.00025, 0.00125, 0.25);
        let once = calc.calculate_for_dimension(&table_dimension(5, read, write, 0.0)).unwrap();
        let twice = calc
            .calculate_for_dimension(&table_dimension(5, 2.0 * read, 2.0 * write, 0.0))
            .unwrap();
        prop_assert!(close(
            twice.component("readRequestCharges"),
            2.0 * once.component("readRequestCharges")
        ));
        prop_assert!(close(
            twice.component("writeRequestCharges"),
            2.0 * once.component("writeRequestCharges")
        ));
    }
}
