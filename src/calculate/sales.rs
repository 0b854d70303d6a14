//! Order totals and sales statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Sale, SaleStatus};

pub fn line_total(unit_price: f64, quantity: u32) -> f64 {
    unit_price * quantity as f64
}

/// Subtotal, discount and total of an order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: f64,
    /// Percentage applied
    pub discount: f64,
    /// Money taken off the subtotal
    pub discount_amount: f64,
    pub total: f64,
}

impl OrderTotals {
    /// Totals for `(unit_price, quantity)` lines under a percentage discount.
    pub fn compute(lines: impl IntoIterator<Item = (f64, u32)>, discount_percent: f64) -> Self {
        let subtotal: f64 = lines
            .into_iter()
            .map(|(price, qty)| line_total(price, qty))
            .sum();
        let discount_amount = if discount_percent > 0.0 {
            subtotal * discount_percent / 100.0
        } else {
            0.0
        };
        Self {
            subtotal,
            discount: discount_percent.max(0.0),
            discount_amount,
            total: subtotal - discount_amount,
        }
    }
}

/// Aggregates over every stored sale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesStatistics {
    pub total_sales: usize,
    pub total_revenue: f64,
    pub sales_by_status: BTreeMap<String, usize>,
    pub sales_by_payment_method: BTreeMap<String, usize>,
    pub recent_sales: Vec<Sale>,
}

impl SalesStatistics {
    pub fn from_sales(sales: &[Sale], recent_limit: usize) -> Self {
        let mut sales_by_status = BTreeMap::new();
        let mut sales_by_payment_method = BTreeMap::new();
        for sale in sales {
            *sales_by_status
                .entry(sale.status.as_str().to_string())
                .or_insert(0) += 1;
            *sales_by_payment_method
                .entry(sale.payment_method.as_str().to_string())
                .or_insert(0) += 1;
        }

        let mut recent_sales = sales.to_vec();
        recent_sales.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        recent_sales.truncate(recent_limit);

        Self {
            total_sales: sales.len(),
            total_revenue: sales.iter().map(|s| s.total).sum(),
            sales_by_status,
            sales_by_payment_method,
            recent_sales,
        }
    }

    pub fn count_with_status(&self, status: SaleStatus) -> usize {
        self.sales_by_status
            .get(status.as_str())
            .copied()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DeliveryAddress, EntityId, PaymentMethod, SaleItem};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn sale(total_price: f64, method: PaymentMethod, minutes_ago: i64) -> Sale {
        let mut s = Sale::new(
            EntityId::from("u1"),
            vec![SaleItem {
                item_id: EntityId::from("i1"),
                item_name: "Ball".to_string(),
                quantity: 1,
                unit_price: total_price,
                selected_color: None,
                selected_size: None,
                image: None,
            }],
            0.0,
            None,
            method,
            DeliveryAddress {
                street: "Rua A".to_string(),
                number: "1".to_string(),
                complement: None,
                neighborhood: "Centro".to_string(),
                city: "Recife".to_string(),
                state: "PE".to_string(),
                zip_code: "50000-000".to_string(),
            },
        );
        s.created_at = s.created_at - Duration::minutes(minutes_ago);
        s
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(19.5, 4), 78.0);
        assert_eq!(line_total(19.5, 0), 0.0);
    }

    #[test]
    fn test_totals_without_discount() {
        let t = OrderTotals::compute([(100.0, 2), (50.0, 1)], 0.0);
        assert_eq!(t.subtotal, 250.0);
        assert_eq!(t.discount_amount, 0.0);
        assert_eq!(t.total, 250.0);
    }

    #[test]
    fn test_totals_with_percentage_discount() {
        let t = OrderTotals::compute([(80.0, 5)], 25.0);
        assert_eq!(t.subtotal, 400.0);
        assert_eq!(t.discount_amount, 100.0);
        assert_eq!(t.total, 300.0);
    }

    #[test]
    fn test_full_discount_and_empty_order() {
        assert_eq!(OrderTotals::compute([(10.0, 3)], 100.0).total, 0.0);
        let empty = OrderTotals::compute(Vec::<(f64, u32)>::new(), 10.0);
        assert_eq!(empty.subtotal, 0.0);
        assert_eq!(empty.total, 0.0);
    }

    #[test]
    fn test_statistics() {
        let mut cancelled = sale(30.0, PaymentMethod::Cash, 1);
        cancelled.cancel();
        let sales = vec![
            sale(100.0, PaymentMethod::Pix, 30),
            sale(50.0, PaymentMethod::Pix, 10),
            cancelled,
        ];

        let stats = SalesStatistics::from_sales(&sales, 2);
        assert_eq!(stats.total_sales, 3);
        assert_eq!(stats.total_revenue, 180.0);
        assert_eq!(stats.count_with_status(SaleStatus::Pending), 2);
        assert_eq!(stats.count_with_status(SaleStatus::Cancelled), 1);
        assert_eq!(stats.count_with_status(SaleStatus::Delivered), 0);
        assert_eq!(stats.sales_by_payment_method.get("PIX"), Some(&2));
        assert_eq!(stats.recent_sales.len(), 2);
        assert_eq!(stats.recent_sales[0].total, 30.0);
        assert_eq!(stats.recent_sales[1].total, 50.0);
    }

    #[test]
    fn test_statistics_empty() {
        let stats = SalesStatistics::from_sales(&[], 10);
        assert_eq!(stats.total_sales, 0);
        assert_eq!(stats.total_revenue, 0.0);
        assert!(stats.recent_sales.is_empty());
    }
}
