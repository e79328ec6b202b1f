//! A statically typed order shape, exposed to the engine by hand

use crate::query::record::{assign, enum_from_value, enum_to_value};
use crate::query::{
    AccessError, CoercionError, EnumDescriptor, EnumMember, FieldKind, FieldValue, Member, Record,
    Representation, TypeInfo, Value,
};
use chrono::NaiveDateTime;
use serde::Serialize;

pub static ORDER_STATUS: EnumDescriptor = EnumDescriptor {
    name: "OrderStatus",
    members: &[
        EnumMember::new("Pending", 0),
        EnumMember::with_wire_name("InTransit", "In Transit", 1),
        EnumMember::new("Delivered", 2),
    ],
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum OrderStatus {
    #[default]
    Pending,
    #[serde(rename = "In Transit")]
    InTransit,
    Delivered,
}

impl OrderStatus {
    pub fn underlying(self) -> i64 {
        match self {
            OrderStatus::Pending => 0,
            OrderStatus::InTransit => 1,
            OrderStatus::Delivered => 2,
        }
    }

    pub fn from_underlying(value: i64) -> Option<Self> {
        match value {
            0 => Some(OrderStatus::Pending),
            1 => Some(OrderStatus::InTransit),
            2 => Some(OrderStatus::Delivered),
            _ => None,
        }
    }
}

const ADDRESS_MEMBERS: &[&str] = &["ShipCity", "ShipCountry"];

const ORDER_MEMBERS: &[&str] = &[
    "OrderID",
    "CustomerID",
    "Freight",
    "OrderDate",
    "Verified",
    "Quantity",
    "Status",
    "Address",
];

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomerAddress {
    pub ship_city: String,
    pub ship_country: String,
}

impl CustomerAddress {
    pub fn new(city: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            ship_city: city.into(),
            ship_country: country.into(),
        }
    }
}

impl Record for CustomerAddress {
    fn representation(&self) -> Representation {
        Representation::Static
    }

    fn member(&self, name: &str) -> Option<Member<'_>> {
        let value = match name {
            "ShipCity" => self.ship_city.to_value(),
            "ShipCountry" => self.ship_country.to_value(),
            _ => return None,
        };
        Some(Member::Value(value))
    }

    fn member_type(&self, name: &str) -> Option<TypeInfo> {
        ADDRESS_MEMBERS
            .contains(&name)
            .then(<String as FieldValue>::type_info)
    }

    fn member_names(&self) -> Vec<String> {
        ADDRESS_MEMBERS.iter().map(|s| s.to_string()).collect()
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
        match name {
            "ShipCity" => assign(&mut self.ship_city, name, value),
            "ShipCountry" => assign(&mut self.ship_country, name, value),
            _ => Err(AccessError::NoSuchMember(name.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Order {
    #[serde(rename = "OrderID")]
    pub order_id: i32,
    #[serde(rename = "CustomerID")]
    pub customer_id: Option<String>,
    pub freight: f64,
    pub order_date: Option<NaiveDateTime>,
    pub verified: bool,
    pub quantity: i16,
    pub status: OrderStatus,
    pub address: Option<CustomerAddress>,
}

impl Order {
    pub fn new(order_id: i32) -> Self {
        Self {
            order_id,
            customer_id: None,
            freight: 0.0,
            order_date: None,
            verified: false,
            quantity: 0,
            status: OrderStatus::default(),
            address: None,
        }
    }

    pub fn ship_city(&self) -> Option<&str> {
        self.address.as_ref().map(|a| a.ship_city.as_str())
    }
}

impl Record for Order {
    fn representation(&self) -> Representation {
        Representation::Static
    }

    fn member(&self, name: &str) -> Option<Member<'_>> {
        let value = match name {
            "OrderID" => self.order_id.to_value(),
            "CustomerID" => self.customer_id.to_value(),
            "Freight" => self.freight.to_value(),
            "OrderDate" => self.order_date.to_value(),
            "Verified" => self.verified.to_value(),
            "Quantity" => self.quantity.to_value(),
            "Status" => enum_to_value(&ORDER_STATUS, self.status.underlying()),
            "Address" => return Some(Member::nested(self.address.as_ref())),
            _ => return None,
        };
        Some(Member::Value(value))
    }

    fn member_type(&self, name: &str) -> Option<TypeInfo> {
        let info = match name {
            "OrderID" => <i32 as FieldValue>::type_info(),
            "CustomerID" => <Option<String> as FieldValue>::type_info(),
            "Freight" => <f64 as FieldValue>::type_info(),
            "OrderDate" => <Option<NaiveDateTime> as FieldValue>::type_info(),
            "Verified" => <bool as FieldValue>::type_info(),
            "Quantity" => <i16 as FieldValue>::type_info(),
            "Status" => TypeInfo::of(FieldKind::Enum(&ORDER_STATUS)),
            "Address" => TypeInfo::of(FieldKind::Object).nullable(),
            _ => return None,
        };
        Some(info)
    }

    fn member_names(&self) -> Vec<String> {
        ORDER_MEMBERS.iter().map(|s| s.to_string()).collect()
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
        match name {
            "OrderID" => assign(&mut self.order_id, name, value),
            "CustomerID" => assign(&mut self.customer_id, name, value),
            "Freight" => assign(&mut self.freight, name, value),
            "OrderDate" => assign(&mut self.order_date, name, value),
            "Verified" => assign(&mut self.verified, name, value),
            "Quantity" => assign(&mut self.quantity, name, value),
            "Status" => {
                let mismatch = |source: CoercionError| AccessError::TypeMismatch {
                    member: name.to_string(),
                    source,
                };
                let underlying = enum_from_value(&ORDER_STATUS, value).map_err(mismatch)?;
                self.status = OrderStatus::from_underlying(underlying).ok_or_else(|| {
                    mismatch(CoercionError::Enum {
                        input: underlying.to_string(),
                        target: ORDER_STATUS.name,
                    })
                })?;
                Ok(())
            }
            "Address" if value.is_null() => {
                self.address = None;
                Ok(())
            }
            "Address" => Err(AccessError::TypeMismatch {
                member: name.to_string(),
                source: CoercionError::Unsupported {
                    input: value.to_string(),
                    target: "CustomerAddress",
                },
            }),
            _ => Err(AccessError::NoSuchMember(name.to_string())),
        }
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut dyn Record> {
        match name {
            "Address" => self.address.as_mut().map(|a| a as &mut dyn Record),
            _ => None,
        }
    }

    fn materialize_member(&mut self, name: &str) -> Result<(), AccessError> {
        match name {
            "Address" => {
                self.address.get_or_insert_with(CustomerAddress::default);
                Ok(())
            }
            _ => Err(AccessError::NotMaterializable(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::PathResolver;

    #[test]
    fn test_members_and_types() {
        let mut order = Order::new(1);
        order.status = OrderStatus::InTransit;
        assert_eq!(order.representation(), Representation::Static);
        assert_eq!(
            order.member("Status").map(Member::into_value).map(|v| v.to_string()),
            Some("In Transit".to_string())
        );
        assert!(order.member("Address").is_some_and(|m| m.is_null()));
        assert_eq!(
            order.member_type("CustomerID"),
            Some(TypeInfo::of(FieldKind::String).nullable())
        );
        assert_eq!(order.member_type("Quantity"), Some(TypeInfo::of(FieldKind::Int16)));
        assert!(order.member("Nope").is_none());
    }

    #[test]
    fn test_set_member_coerces() {
        let mut order = Order::new(1);
        order.set_member("Freight", Value::from("12.5")).unwrap();
        order.set_member("Status", Value::from("Delivered")).unwrap();
        order.set_member("CustomerID", Value::Null).unwrap();
        assert_eq!(order.freight, 12.5);
        assert_eq!(order.status, OrderStatus::Delivered);
        assert!(order.set_member("Status", Value::Int64(9)).is_err());
        assert!(order.set_member("OrderID", Value::Null).is_err());
    }

    #[test]
    fn test_nested_set_materializes_address() {
        let mut order = Order::new(1);
        assert!(PathResolver::set(&mut order, "Address.ShipCity", "Berlin"));
        assert_eq!(order.ship_city(), Some("Berlin"));
    }
}
