//! World population by country
//!
//! One row per country or territory with its continent, population
//! snapshots from 1970 to 2022, land area, growth rate and share of the
//! world population.

use super::DatasetProfile;
use crate::config::PipelineConfig;
use crate::derive::{DerivedColumn, Formula};
use crate::metric::{Aggregation, GroupKey, GroupOrder, MetricDefinition, SortOrder};

const COUNTRY: &str = "Country/Territory";
const CONTINENT: &str = "Continent";
const POPULATION_2022: &str = "2022 Population";
const POPULATION_1970: &str = "1970 Population";
const AREA: &str = "Area (km²)";
const GROWTH_RATE: &str = "Growth Rate";
const WORLD_SHARE: &str = "World Population Percentage";

/// Population snapshots, oldest first
pub const YEARS: [&str; 8] = [
    "1970 Population",
    "1980 Population",
    "1990 Population",
    "2000 Population",
    "2010 Population",
    "2015 Population",
    "2020 Population",
    "2022 Population",
];

const REQUIRED: &[&str] = &[
    COUNTRY,
    CONTINENT,
    YEARS[0],
    YEARS[1],
    YEARS[2],
    YEARS[3],
    YEARS[4],
    YEARS[5],
    YEARS[6],
    YEARS[7],
    AREA,
    GROWTH_RATE,
    WORLD_SHARE,
];

/// Percent change of population between 1970 and 2022
pub const GROWTH_1970_2022: &str = "Growth_1970_2022";

/// 2022 population per km²
pub const PRESSURE_INDEX: &str = "Population Pressure Index";

/// Profile for the per-country world population table
#[derive(Debug, Clone, Copy, Default)]
pub struct PopulationProfile;

impl PopulationProfile {
    /// Countries ranked by `column`
    fn ranking(name: &str, column: &str, top: usize, order: SortOrder) -> MetricDefinition {
        MetricDefinition::new(name, Aggregation::sum(column))
            .grouped_by(GroupKey::column(COUNTRY))
            .top(top, order)
    }
}

impl DatasetProfile for PopulationProfile {
    fn name(&self) -> &'static str {
        "population"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        REQUIRED
    }

    fn derived_columns(&self, config: &PipelineConfig) -> Vec<DerivedColumn> {
        vec![
            DerivedColumn::new(
                GROWTH_1970_2022,
                Formula::percent_change(POPULATION_1970, POPULATION_2022),
                config.ratio_policy,
            ),
            DerivedColumn::new(
                PRESSURE_INDEX,
                Formula::quotient(POPULATION_2022, AREA),
                config.ratio_policy,
            ),
        ]
    }

    fn metrics(&self, config: &PipelineConfig) -> Vec<MetricDefinition> {
        let top = config.top_n;
        let ranking = |name: &str, column: &str, order| Self::ranking(name, column, top, order);

        vec![
            // overview
            MetricDefinition::new("total_countries", Aggregation::count_distinct(COUNTRY)),
            MetricDefinition::new("unique_continents", Aggregation::count_distinct(CONTINENT)),
            MetricDefinition::new("missing_values", Aggregation::NullCounts),
            MetricDefinition::new("summary_statistics", Aggregation::DescribeAll),
            // top-level rankings
            ranking("top_10_populous", POPULATION_2022, SortOrder::Descending),
            ranking("highest_growth", GROWTH_RATE, SortOrder::Descending),
            ranking("highest_contribution", WORLD_SHARE, SortOrder::Descending),
            // growth over time
            ranking("fastest_growth", GROWTH_1970_2022, SortOrder::Descending),
            ranking("slowest_growth", GROWTH_1970_2022, SortOrder::Ascending),
            MetricDefinition::new(
                "global_population_trend",
                Aggregation::ColumnSums {
                    columns: YEARS.iter().map(|year| year.to_string()).collect(),
                },
            ),
            // continents
            MetricDefinition::new("population_by_continent", Aggregation::sum(POPULATION_2022))
                .grouped_by(GroupKey::column(CONTINENT))
                .ordered(GroupOrder::ValueDescending),
            // area and density
            ranking("largest_area", AREA, SortOrder::Descending),
            ranking("smallest_area", AREA, SortOrder::Ascending),
            MetricDefinition::new("correlation_matrix", Aggregation::Correlation),
            ranking("high_pressure_countries", PRESSURE_INDEX, SortOrder::Descending),
        ]
    }
}
