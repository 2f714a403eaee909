//! Two-phase aggregation kernels.
//!
//! Every report aggregates in two phases: a partial state folds rows with
//! `update`, independent partials combine with `merge`, and `finalize` sorts
//! with the report's deterministic ordering and emits the typed rows. The
//! in-memory engine is the single-partition case; the partitioned engine
//! builds one state per slice and merges, producing identical rows by
//! construction.

use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, NaiveDate};

use crate::reports::{
    category_for_product, CategorySummary, CustomerOrderStats, MonthlyRevenue, ProductRecord,
    ProductRevenue, RegionalSummary,
};
use crate::schema::{CustomerRecord, SalesRecord};

/// Partial aggregation state over sales rows.
pub trait SalesAgg: Default + Send + 'static {
    fn update(&mut self, row: &SalesRecord);

    /// Fold another partial state into this one. Merging is commutative and
    /// associative, so partials may arrive in any order.
    fn merge(&mut self, other: Self);

    fn update_all<'a>(&mut self, rows: impl IntoIterator<Item = &'a SalesRecord>) {
        for row in rows {
            self.update(row);
        }
    }
}

/// Count, quantity and revenue sums for one group.
#[derive(Debug, Default, Clone, PartialEq)]
struct GroupAgg {
    order_count: i64,
    total_quantity: i64,
    total_revenue: f64,
}

impl GroupAgg {
    fn update(&mut self, row: &SalesRecord) {
        self.order_count += 1;
        self.total_quantity += row.quantity as i64;
        self.total_revenue += row.revenue();
    }

    fn merge(&mut self, other: &GroupAgg) {
        self.order_count += other.order_count;
        self.total_quantity += other.total_quantity;
        self.total_revenue += other.total_revenue;
    }
}

/// Groups by (product_id, product_name).
#[derive(Debug, Default)]
pub struct ProductAggState {
    groups: HashMap<(i32, String), GroupAgg>,
}

impl SalesAgg for ProductAggState {
    fn update(&mut self, row: &SalesRecord) {
        self.groups
            .entry((row.product_id, row.product_name.clone()))
            .or_default()
            .update(row);
    }

    fn merge(&mut self, other: Self) {
        for (key, agg) in other.groups {
            self.groups.entry(key).or_default().merge(&agg);
        }
    }
}

impl ProductAggState {
    pub fn finalize(self) -> Vec<ProductRevenue> {
        let mut out: Vec<_> = self
            .groups
            .into_iter()
            .map(|((product_id, product_name), agg)| ProductRevenue {
                product_id,
                product_name,
                total_quantity: agg.total_quantity,
                total_revenue: agg.total_revenue,
            })
            .collect();
        out.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then(a.product_id.cmp(&b.product_id))
        });
        out
    }
}

/// Groups by derived category.
#[derive(Debug, Default)]
pub struct CategoryAggState {
    groups: HashMap<&'static str, GroupAgg>,
}

impl SalesAgg for CategoryAggState {
    fn update(&mut self, row: &SalesRecord) {
        self.groups
            .entry(category_for_product(&row.product_name))
            .or_default()
            .update(row);
    }

    fn merge(&mut self, other: Self) {
        for (key, agg) in other.groups {
            self.groups.entry(key).or_default().merge(&agg);
        }
    }
}

impl CategoryAggState {
    pub fn finalize(self) -> Vec<CategorySummary> {
        let mut out: Vec<_> = self
            .groups
            .into_iter()
            .map(|(category, agg)| CategorySummary {
                category: category.to_string(),
                order_count: agg.order_count,
                total_quantity: agg.total_quantity,
                total_revenue: agg.total_revenue,
                avg_order_value: agg.total_revenue / agg.order_count as f64,
            })
            .collect();
        out.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then_with(|| a.category.cmp(&b.category))
        });
        out
    }
}

/// Groups by (region, derived category).
#[derive(Debug, Default)]
pub struct RegionalAggState {
    groups: HashMap<(String, &'static str), GroupAgg>,
}

impl SalesAgg for RegionalAggState {
    fn update(&mut self, row: &SalesRecord) {
        self.groups
            .entry((row.region.clone(), category_for_product(&row.product_name)))
            .or_default()
            .update(row);
    }

    fn merge(&mut self, other: Self) {
        for (key, agg) in other.groups {
            self.groups.entry(key).or_default().merge(&agg);
        }
    }
}

impl RegionalAggState {
    pub fn finalize(self) -> Vec<RegionalSummary> {
        let mut out: Vec<_> = self
            .groups
            .into_iter()
            .map(|((region, category), agg)| RegionalSummary {
                region,
                category: category.to_string(),
                order_count: agg.order_count,
                total_quantity: agg.total_quantity,
                total_revenue: agg.total_revenue,
            })
            .collect();
        out.sort_by(|a, b| {
            a.region
                .cmp(&b.region)
                .then_with(|| a.category.cmp(&b.category))
        });
        out
    }
}

/// Groups by calendar month of the sale date.
#[derive(Debug, Default)]
pub struct MonthlyAggState {
    groups: HashMap<(i32, u32), GroupAgg>,
}

impl SalesAgg for MonthlyAggState {
    fn update(&mut self, row: &SalesRecord) {
        self.groups
            .entry((row.sale_date.year(), row.sale_date.month()))
            .or_default()
            .update(row);
    }

    fn merge(&mut self, other: Self) {
        for (key, agg) in other.groups {
            self.groups.entry(key).or_default().merge(&agg);
        }
    }
}

impl MonthlyAggState {
    pub fn finalize(self) -> Vec<MonthlyRevenue> {
        let mut out: Vec<_> = self
            .groups
            .into_iter()
            .map(|((year, month), agg)| MonthlyRevenue {
                month: NaiveDate::from_ymd_opt(year, month, 1).expect("first of month"),
                order_count: agg.order_count,
                total_revenue: agg.total_revenue,
            })
            .collect();
        out.sort_by_key(|m| m.month);
        out
    }
}

/// Groups by customer id; sales without a customer are skipped.
#[derive(Debug, Default)]
pub struct CustomerAggState {
    groups: HashMap<i32, GroupAgg>,
}

impl SalesAgg for CustomerAggState {
    fn update(&mut self, row: &SalesRecord) {
        if let Some(customer_id) = row.customer_id {
            self.groups.entry(customer_id).or_default().update(row);
        }
    }

    fn merge(&mut self, other: Self) {
        for (key, agg) in other.groups {
            self.groups.entry(key).or_default().merge(&agg);
        }
    }
}

impl CustomerAggState {
    /// Hash join against the customers relation. Only customers present on
    /// both sides appear, matching the SQL inner join.
    pub fn finalize(self, customers: &[CustomerRecord]) -> Vec<CustomerOrderStats> {
        let mut out: Vec<_> = customers
            .iter()
            .filter_map(|customer| {
                self.groups
                    .get(&customer.customer_id)
                    .map(|agg| CustomerOrderStats {
                        customer_id: customer.customer_id,
                        name: customer.name.clone(),
                        order_count: agg.order_count,
                        total_spent: agg.total_revenue,
                    })
            })
            .collect();
        out.sort_by(|a, b| {
            b.total_spent
                .total_cmp(&a.total_spent)
                .then(a.customer_id.cmp(&b.customer_id))
        });
        out
    }
}

/// Collects the distinct products seen in the sales rows.
#[derive(Debug, Default)]
pub struct ProductCatalogState {
    products: BTreeSet<(i32, String)>,
}

impl SalesAgg for ProductCatalogState {
    fn update(&mut self, row: &SalesRecord) {
        self.products
            .insert((row.product_id, row.product_name.clone()));
    }

    fn merge(&mut self, other: Self) {
        self.products.extend(other.products);
    }
}

impl ProductCatalogState {
    pub fn finalize(self) -> Vec<ProductRecord> {
        self.products
            .into_iter()
            .map(|(product_id, product_name)| ProductRecord {
                category: category_for_product(&product_name).to_string(),
                product_id,
                product_name,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::{SEED_CUSTOMERS, SEED_SALES};

    fn folded<S: SalesAgg>() -> S {
        let mut state = S::default();
        state.update_all(SEED_SALES.iter());
        state
    }

    /// Aggregate in three chunks and merge, in the given chunk order.
    fn folded_chunked<S: SalesAgg>(chunk_order: &[usize]) -> S {
        let chunks: Vec<&[SalesRecord]> =
            vec![&SEED_SALES[0..3], &SEED_SALES[3..6], &SEED_SALES[6..10]];
        let mut acc = S::default();
        for &idx in chunk_order {
            let mut part = S::default();
            part.update_all(chunks[idx]);
            acc.merge(part);
        }
        acc
    }

    #[test]
    fn product_revenue_over_seed() {
        let rows = folded::<ProductAggState>().finalize();
        assert_eq!(rows.len(), 7);

        let top = &rows[0];
        assert_eq!(top.product_id, 1);
        assert_eq!(top.product_name, "Laptop");
        assert_eq!(top.total_quantity, 8);
        assert_eq!(top.total_revenue, 9600.00);

        let last = &rows[6];
        assert_eq!(last.product_name, "Mouse");
        assert_eq!(last.total_revenue, 750.00);
    }

    #[test]
    fn category_summary_over_seed() {
        let rows = folded::<CategoryAggState>().finalize();
        assert_eq!(rows.len(), 2);

        let electronics = &rows[0];
        assert_eq!(electronics.category, "Electronics");
        assert_eq!(electronics.order_count, 6);
        assert_eq!(electronics.total_quantity, 33);
        assert_eq!(electronics.total_revenue, 21200.00);
        assert_eq!(electronics.avg_order_value, 21200.00 / 6.0);

        let accessories = &rows[1];
        assert_eq!(accessories.category, "Accessories");
        assert_eq!(accessories.order_count, 4);
        assert_eq!(accessories.total_quantity, 82);
        assert_eq!(accessories.total_revenue, 3708.50);
        assert_eq!(accessories.avg_order_value, 927.125);
    }

    #[test]
    fn regional_matrix_over_seed() {
        let rows = folded::<RegionalAggState>().finalize();
        assert_eq!(rows.len(), 8);

        // regions alphabetical, category alphabetical within each
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.region.as_str(), r.category.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("East", "Accessories"),
                ("East", "Electronics"),
                ("North", "Accessories"),
                ("North", "Electronics"),
                ("South", "Accessories"),
                ("South", "Electronics"),
                ("West", "Accessories"),
                ("West", "Electronics"),
            ]
        );

        let north_electronics = &rows[3];
        assert_eq!(north_electronics.total_revenue, 9600.00);
        assert_eq!(north_electronics.order_count, 2);
    }

    #[test]
    fn monthly_revenue_over_seed() {
        let rows = folded::<MonthlyAggState>().finalize();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].month, NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());
        assert_eq!(rows[0].order_count, 3);
        assert_eq!(rows[0].total_revenue, 10137.50);

        assert_eq!(rows[1].total_revenue, 5625.00);
        assert_eq!(rows[2].order_count, 4);
        assert_eq!(rows[2].total_revenue, 9146.00);
    }

    #[test]
    fn customer_stats_over_seed() {
        let rows = folded::<CustomerAggState>().finalize(&SEED_CUSTOMERS);
        // 10 sales minus the NULL-customer one, each customer with one order
        assert_eq!(rows.len(), 9);

        let top = &rows[0];
        assert_eq!(top.customer_id, 101);
        assert_eq!(top.name, "John Smith");
        assert_eq!(top.order_count, 1);
        assert_eq!(top.total_spent, 6000.00);

        assert!(rows.iter().all(|r| r.customer_id != 110));
        let spent: f64 = rows.iter().map(|r| r.total_spent).sum();
        assert_eq!(spent, 24908.50 - 3000.00);
    }

    #[test]
    fn product_catalog_over_seed() {
        let rows = folded::<ProductCatalogState>().finalize();
        assert_eq!(rows.len(), 7);
        let ids: Vec<i32> = rows.iter().map(|p| p.product_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7]);
        assert_eq!(rows[0].category, "Electronics");
        assert_eq!(rows[2].product_name, "Keyboard");
        assert_eq!(rows[2].category, "Accessories");
    }

    #[test]
    fn merged_partials_match_single_pass() {
        let single = folded::<ProductAggState>().finalize();
        assert_eq!(folded_chunked::<ProductAggState>(&[0, 1, 2]).finalize(), single);

        let single = folded::<CategoryAggState>().finalize();
        assert_eq!(folded_chunked::<CategoryAggState>(&[0, 1, 2]).finalize(), single);

        let single = folded::<MonthlyAggState>().finalize();
        assert_eq!(folded_chunked::<MonthlyAggState>(&[0, 1, 2]).finalize(), single);
    }

    #[test]
    fn merge_order_does_not_matter() {
        let forward = folded_chunked::<RegionalAggState>(&[0, 1, 2]).finalize();
        let backward = folded_chunked::<RegionalAggState>(&[2, 1, 0]).finalize();
        assert_eq!(forward, backward);

        let forward = folded_chunked::<CustomerAggState>(&[0, 1, 2]).finalize(&SEED_CUSTOMERS);
        let backward = folded_chunked::<CustomerAggState>(&[2, 0, 1]).finalize(&SEED_CUSTOMERS);
        assert_eq!(forward, backward);
    }
}
