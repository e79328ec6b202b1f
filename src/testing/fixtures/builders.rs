//! Test data builders for order scenarios

use super::orders::{CustomerAddress, Order, OrderStatus};
use chrono::NaiveDateTime;

/// Builder for creating test orders
pub struct OrderBuilder {
    order: Order,
}

impl Default for OrderBuilder {
    fn default() -> Self {
        Self::new(1)
    }
}

impl OrderBuilder {
    pub fn new(order_id: i32) -> Self {
        Self {
            order: Order::new(order_id),
        }
    }

    pub fn customer(mut self, customer_id: &str) -> Self {
        self.order.customer_id = Some(customer_id.to_string());
        self
    }

    pub fn freight(mut self, freight: f64) -> Self {
        self.order.freight = freight;
        self
    }

    pub fn ordered(mut self, date: Option<NaiveDateTime>) -> Self {
        self.order.order_date = date;
        self
    }

    pub fn verified(mut self, verified: bool) -> Self {
        self.order.verified = verified;
        self
    }

    pub fn quantity(mut self, quantity: i16) -> Self {
        self.order.quantity = quantity;
        self
    }

    pub fn status(mut self, status: OrderStatus) -> Self {
        self.order.status = status;
        self
    }

    pub fn ship_to(mut self, city: &str, country: &str) -> Self {
        self.order.address = Some(CustomerAddress::new(city, country));
        self
    }

    pub fn build(self) -> Order {
        self.order
    }
}
