//! The built-in demo dataset.
//!
//! Ten customers and ten sales spanning the first quarter of 2023. The rows
//! are fixed so that every report over them has a known answer; tests across
//! the workspace assert against these values.

use chrono::NaiveDate;
use once_cell::sync::Lazy;

use crate::schema::{CustomerRecord, SalesRecord};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid seed date")
}

fn sale(
    id: i32,
    sale_date: NaiveDate,
    product_id: i32,
    product_name: &str,
    quantity: i32,
    unit_price: f64,
    customer_id: Option<i32>,
    region: &str,
) -> SalesRecord {
    SalesRecord {
        id,
        sale_date,
        product_id,
        product_name: product_name.to_string(),
        quantity,
        unit_price,
        customer_id,
        region: region.to_string(),
    }
}

fn customer(customer_id: i32, name: &str, email: &str, signup_date: NaiveDate) -> CustomerRecord {
    CustomerRecord {
        customer_id,
        name: name.to_string(),
        email: email.to_string(),
        signup_date,
    }
}

pub static SEED_CUSTOMERS: Lazy<Vec<CustomerRecord>> = Lazy::new(|| {
    vec![
        customer(101, "John Smith", "john.smith@example.com", date(2022, 3, 14)),
        customer(102, "Emma Johnson", "emma.johnson@example.com", date(2022, 5, 2)),
        customer(103, "Michael Brown", "michael.brown@example.com", date(2022, 6, 21)),
        customer(104, "Olivia Davis", "olivia.davis@example.com", date(2022, 7, 9)),
        customer(105, "William Wilson", "william.wilson@example.com", date(2022, 8, 30)),
        customer(106, "James Taylor", "james.taylor@example.com", date(2022, 9, 18)),
        customer(107, "Sophia Martinez", "sophia.martinez@example.com", date(2022, 10, 5)),
        customer(108, "Daniel Anderson", "daniel.anderson@example.com", date(2022, 11, 27)),
        customer(109, "Ava Thomas", "ava.thomas@example.com", date(2022, 12, 12)),
        customer(110, "Robert Garcia", "robert.garcia@example.com", date(2023, 1, 8)),
    ]
});

pub static SEED_SALES: Lazy<Vec<SalesRecord>> = Lazy::new(|| {
    vec![
        sale(1, date(2023, 1, 5), 1, "Laptop", 5, 1200.00, Some(101), "North"),
        sale(2, date(2023, 1, 12), 2, "Monitor", 10, 300.00, Some(102), "South"),
        sale(3, date(2023, 1, 19), 3, "Keyboard", 25, 45.50, Some(103), "East"),
        sale(4, date(2023, 2, 2), 4, "Mouse", 30, 25.00, Some(104), "West"),
        sale(5, date(2023, 2, 10), 1, "Laptop", 3, 1200.00, Some(105), "North"),
        sale(6, date(2023, 2, 17), 5, "Headphones", 15, 85.00, Some(106), "South"),
        sale(7, date(2023, 3, 3), 2, "Monitor", 6, 300.00, Some(107), "East"),
        sale(8, date(2023, 3, 11), 6, "Smartphone", 4, 950.00, Some(108), "West"),
        sale(9, date(2023, 3, 20), 3, "Keyboard", 12, 45.50, Some(109), "North"),
        sale(10, date(2023, 3, 28), 7, "Tablet", 5, 600.00, None, "South"),
    ]
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seed_counts() {
        assert_eq!(SEED_SALES.len(), 10);
        assert_eq!(SEED_CUSTOMERS.len(), 10);
    }

    #[test]
    fn first_sale_arithmetic() {
        let first = &SEED_SALES[0];
        assert_eq!(first.product_id, 1);
        assert_eq!(first.product_name, "Laptop");
        assert_eq!(first.revenue(), 6000.00);
    }

    #[test]
    fn total_revenue() {
        let total: f64 = SEED_SALES.iter().map(|s| s.revenue()).sum();
        assert_eq!(total, 24908.50);
    }

    #[test]
    fn exactly_one_sale_without_customer() {
        let nulls: Vec<_> = SEED_SALES.iter().filter(|s| s.customer_id.is_none()).collect();
        assert_eq!(nulls.len(), 1);
        assert_eq!(nulls[0].id, 10);
    }

    #[test]
    fn sale_customers_exist() {
        for sale in SEED_SALES.iter() {
            if let Some(id) = sale.customer_id {
                assert!(
                    SEED_CUSTOMERS.iter().any(|c| c.customer_id == id),
                    "sale {} references unknown customer {id}",
                    sale.id
                );
            }
        }
    }

    #[test]
    fn customer_110_has_no_sales() {
        assert!(SEED_SALES.iter().all(|s| s.customer_id != Some(110)));
    }

    #[test]
    fn customer_101_is_john_smith() {
        let c = SEED_CUSTOMERS.iter().find(|c| c.customer_id == 101).unwrap();
        assert_eq!(c.name, "John Smith");
    }
}
