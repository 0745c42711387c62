//! Online retail transactions
//!
//! One row per invoice line: invoice number (prefixed `C` when canceled),
//! stock code, description, signed quantity, timestamp, unit price, customer
//! and country.

use super::DatasetProfile;
use crate::config::PipelineConfig;
use crate::derive::{DerivedColumn, Formula, UndefinedPolicy};
use crate::metric::{Aggregation, GroupKey, GroupOrder, MetricDefinition, Predicate, SortOrder};

const INVOICE: &str = "InvoiceNo";
const STOCK_CODE: &str = "StockCode";
const DESCRIPTION: &str = "Description";
const QUANTITY: &str = "Quantity";
const INVOICE_DATE: &str = "InvoiceDate";
const UNIT_PRICE: &str = "UnitPrice";
const CUSTOMER: &str = "CustomerID";
const COUNTRY: &str = "Country";

/// Quantity × unit price
pub const REVENUE: &str = "Revenue";

/// Profile for invoice-line exports of an online store
#[derive(Debug, Clone, Copy, Default)]
pub struct RetailProfile;

impl DatasetProfile for RetailProfile {
    fn name(&self) -> &'static str {
        "retail"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[
            INVOICE,
            STOCK_CODE,
            DESCRIPTION,
            QUANTITY,
            INVOICE_DATE,
            UNIT_PRICE,
            CUSTOMER,
            COUNTRY,
        ]
    }

    fn derived_columns(&self, _config: &PipelineConfig) -> Vec<DerivedColumn> {
        // A product never divides, so the policy is never consulted
        vec![DerivedColumn::new(
            REVENUE,
            Formula::product(QUANTITY, UNIT_PRICE),
            UndefinedPolicy::Fail,
        )]
    }

    fn metrics(&self, config: &PipelineConfig) -> Vec<MetricDefinition> {
        let top = config.top_n;
        let bins = config.histogram_bins;
        let returns = || Aggregation::count_matching(QUANTITY, Predicate::LessThan(0.0));

        vec![
            // invoices
            MetricDefinition::new("total_invoices", Aggregation::count_distinct(INVOICE)),
            MetricDefinition::new(
                "canceled_orders",
                Aggregation::count_matching(INVOICE, Predicate::StartsWith("C".to_string())),
            ),
            MetricDefinition::new("invoices_per_day", Aggregation::count_distinct(INVOICE))
                .grouped_by(GroupKey::date_of(INVOICE_DATE))
                .ordered(GroupOrder::KeyAscending),
            // products
            MetricDefinition::new("unique_products", Aggregation::count_distinct(STOCK_CODE)),
            MetricDefinition::new("top_products", Aggregation::Count)
                .grouped_by(GroupKey::column(STOCK_CODE))
                .top(top, SortOrder::Descending),
            MetricDefinition::new("top_descriptions", Aggregation::sum(QUANTITY))
                .grouped_by(GroupKey::column(DESCRIPTION))
                .top(top, SortOrder::Descending),
            MetricDefinition::new(
                "missing_descriptions",
                Aggregation::count_matching(DESCRIPTION, Predicate::IsNull),
            ),
            // quantities
            MetricDefinition::new("total_quantity", Aggregation::sum(QUANTITY)),
            MetricDefinition::new("negative_quantities", returns()),
            MetricDefinition::new("quantity_distribution", Aggregation::histogram(QUANTITY, bins)),
            MetricDefinition::new("daily_sales", Aggregation::sum(QUANTITY))
                .grouped_by(GroupKey::date_of(INVOICE_DATE))
                .ordered(GroupOrder::KeyAscending),
            // prices
            MetricDefinition::new("unit_price_summary", Aggregation::describe(UNIT_PRICE)),
            MetricDefinition::new(
                "unit_price_distribution",
                Aggregation::histogram(UNIT_PRICE, bins),
            ),
            // customers
            MetricDefinition::new("unique_customers", Aggregation::count_distinct(CUSTOMER)),
            MetricDefinition::new("purchases_per_customer", Aggregation::Count)
                .grouped_by(GroupKey::column(CUSTOMER))
                .ordered(GroupOrder::ValueDescending),
            MetricDefinition::new("sales_by_country", Aggregation::sum(QUANTITY))
                .grouped_by(GroupKey::column(COUNTRY))
                .ordered(GroupOrder::ValueDescending),
            // revenue
            MetricDefinition::new("total_revenue", Aggregation::sum(REVENUE)),
            MetricDefinition::new("top_customers", Aggregation::sum(REVENUE))
                .grouped_by(GroupKey::column(CUSTOMER))
                .top(top, SortOrder::Descending),
            MetricDefinition::new("return_rate", Aggregation::ratio(returns(), Aggregation::Count)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_order() {
        let names: Vec<String> = RetailProfile
            .metrics(&PipelineConfig::default())
            .into_iter()
            .map(|m| m.name)
            .collect();
        assert_eq!(names.first().map(String::as_str), Some("total_invoices"));
        assert_eq!(names.last().map(String::as_str), Some("return_rate"));
        assert_eq!(names.len(), 19);
    }

    #[test]
    fn test_top_n_follows_config() {
        let config = PipelineConfig::default().with_top_n(3);
        let metrics = RetailProfile.metrics(&config);
        let top = metrics.iter().find(|m| m.name == "top_customers").unwrap();
        assert_eq!(top.limit, Some(3));
        assert_eq!(top.order, GroupOrder::ValueDescending);
    }

    #[test]
    fn test_revenue_derivation() {
        let derived = RetailProfile.derived_columns(&PipelineConfig::default());
        assert_eq!(derived.len(), 1);
        assert_eq!(derived[0].name, REVENUE);
        assert_eq!(derived[0].formula.inputs(), vec![QUANTITY, UNIT_PRICE]);
    }
}
