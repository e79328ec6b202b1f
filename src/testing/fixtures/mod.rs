//! Test fixtures and data builders
//!
//! The same ten orders are available in all three record representations so
//! that a scenario can be checked against static, map and dynamic records
//! alike.

pub mod builders;
pub mod orders;

pub use builders::OrderBuilder;
pub use orders::{CustomerAddress, Order, OrderStatus, ORDER_STATUS};

use crate::query::{Dynamic, DynamicObject, Record, Value};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

pub const CUSTOMERS: &[&str] = &["ALFKI", "ANANTR", "BLONP", "ANTON", "BOLID"];

const SHIPPING: &[(&str, &str)] = &[
    ("Berlin", "Germany"),
    ("Madrid", "Spain"),
    ("Cork", "Ireland"),
    ("Berlin", "Germany"),
    ("Lyon", "France"),
    ("Reims", "France"),
    ("Berlin", "Germany"),
    ("Graz", "Austria"),
    ("Madrid", "Spain"),
    ("Lyon", "France"),
];

const FREIGHT: &[f64] = &[32.5, 11.25, 65.75, 41.5, 51.25, 58.0, 23.0, 148.25, 14.0, 82.5];

/// Sum of every order's freight
pub const TOTAL_FREIGHT: f64 = 528.0;

/// Midnight on the given day of July 1996
pub fn july_1996(day: u32) -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1996, 7, day).and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Ten orders, IDs 1001 to 1010.
///
/// Customers cycle through [`CUSTOMERS`], so each appears twice; three
/// orders ship to Berlin; every third order is verified.
pub fn orders() -> Vec<Order> {
    (0..10usize)
        .map(|i| {
            let (city, country) = SHIPPING[i];
            OrderBuilder::new(1001 + i as i32)
                .customer(CUSTOMERS[i % CUSTOMERS.len()])
                .freight(FREIGHT[i])
                .ordered(july_1996(4 + i as u32))
                .verified(i % 3 == 0)
                .quantity((i as i16 * 7) % 20 + 1)
                .status(match i % 3 {
                    0 => OrderStatus::Pending,
                    1 => OrderStatus::InTransit,
                    _ => OrderStatus::Delivered,
                })
                .ship_to(city, country)
                .build()
        })
        .collect()
}

/// [`orders`] as JSON rows
pub fn orders_json() -> Vec<serde_json::Value> {
    orders().iter().map(|o| o.to_value().to_json()).collect()
}

/// [`orders`] as late-bound objects
pub fn orders_dynamic() -> Vec<Dynamic<PropertyBag>> {
    orders()
        .iter()
        .map(|o| match o.to_value() {
            Value::Object(members) => Dynamic(PropertyBag { members }),
            _ => Dynamic(PropertyBag::default()),
        })
        .collect()
}

/// A late-bound object that accepts any member except those starting with `_`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyBag {
    members: BTreeMap<String, Value>,
}

impl DynamicObject for PropertyBag {
    fn dyn_get(&self, name: &str) -> Option<Value> {
        self.members.get(name).cloned()
    }

    fn dyn_set(&mut self, name: &str, value: Value) -> bool {
        if name.starts_with('_') {
            return false;
        }
        self.members.insert(name.to_string(), value);
        true
    }

    fn dyn_member_names(&self) -> Vec<String> {
        self.members.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shape() {
        let orders = orders();
        assert_eq!(orders.len(), 10);
        assert_eq!(orders.iter().map(|o| o.freight).sum::<f64>(), TOTAL_FREIGHT);
        assert_eq!(orders.iter().filter(|o| o.ship_city() == Some("Berlin")).count(), 3);
        assert_eq!(
            orders
                .iter()
                .filter(|o| o.customer_id.as_deref() == Some("ALFKI"))
                .count(),
            2
        );
    }

    #[test]
    fn test_representations_agree() {
        let json = orders_json();
        let dynamic = orders_dynamic();
        assert_eq!(json[0]["OrderID"], serde_json::json!(1001));
        assert_eq!(json[0]["Address"]["ShipCity"], serde_json::json!("Berlin"));
        assert_eq!(json[1]["Status"], serde_json::json!("In Transit"));
        assert_eq!(dynamic[9].to_value().to_json(), json[9]);
    }
}
