//! Cart snapshot taken when the customer confirms checkout.

use common::RestaurantId;
use domain::{LineItem, Money, OrderTotals, ProductRef};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// One cart line, priced as displayed to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_ref: ProductRef,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartLine {
    pub fn new(
        product_ref: impl Into<ProductRef>,
        name: impl Into<String>,
        quantity: u32,
        unit_price: Money,
    ) -> Self {
        Self {
            product_ref: product_ref.into(),
            name: name.into(),
            quantity,
            unit_price,
        }
    }
}

/// The cart contents at checkout confirmation.
///
/// Prices and totals come from this snapshot only, never from a live cart,
/// so the amount charged matches what was displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSnapshot {
    pub restaurant_id: RestaurantId,
    pub lines: Vec<CartLine>,
    #[serde(default)]
    pub delivery_fee: Money,
}

impl CartSnapshot {
    pub fn new(restaurant_id: RestaurantId, delivery_fee: Money) -> Self {
        Self {
            restaurant_id,
            lines: Vec::new(),
            delivery_fee,
        }
    }

    pub fn with_line(mut self, line: CartLine) -> Self {
        self.lines.push(line);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Checks the snapshot can be turned into an order.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.lines.is_empty() {
            return Err(ValidationError::EmptyCart);
        }
        for line in &self.lines {
            if line.quantity == 0 {
                return Err(ValidationError::InvalidQuantity {
                    product_ref: line.product_ref.to_string(),
                    quantity: line.quantity,
                });
            }
            if line.unit_price.is_negative() {
                return Err(ValidationError::InvalidPrice {
                    product_ref: line.product_ref.to_string(),
                    price: line.unit_price.minor(),
                });
            }
        }
        if self.delivery_fee.is_negative() {
            return Err(ValidationError::NegativeDeliveryFee);
        }
        self.totals()?;
        Ok(())
    }

    /// The order lines for this snapshot.
    pub fn line_items(&self) -> Vec<LineItem> {
        self.lines
            .iter()
            .map(|line| {
                LineItem::new(
                    line.product_ref.clone(),
                    line.name.clone(),
                    line.quantity,
                    line.unit_price,
                )
            })
            .collect()
    }

    /// Subtotal, delivery fee and total computed from the snapshot.
    pub fn totals(&self) -> Result<OrderTotals, ValidationError> {
        OrderTotals::compute(&self.line_items(), self.delivery_fee)
            .ok_or(ValidationError::AmountOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_item_cart() -> CartSnapshot {
        CartSnapshot::new(RestaurantId::new(), Money::from_minor(5000))
            .with_line(CartLine::new("p-1", "Hamburguesa", 2, Money::from_minor(15000)))
            .with_line(CartLine::new("p-2", "Gaseosa", 2, Money::from_minor(5000)))
    }

    #[test]
    fn test_totals_from_snapshot() {
        let totals = two_item_cart().totals().unwrap();

        assert_eq!(totals.subtotal.minor(), 40000);
        assert_eq!(totals.delivery_fee.minor(), 5000);
        assert_eq!(totals.total.minor(), 45000);
    }

    #[test]
    fn test_empty_cart_is_invalid() {
        let cart = CartSnapshot::new(RestaurantId::new(), Money::zero());
        assert_eq!(cart.validate(), Err(ValidationError::EmptyCart));
    }

    #[test]
    fn test_zero_quantity_is_invalid() {
        let cart = CartSnapshot::new(RestaurantId::new(), Money::zero())
            .with_line(CartLine::new("p-1", "Sopa", 0, Money::from_minor(9000)));

        assert!(matches!(
            cart.validate(),
            Err(ValidationError::InvalidQuantity { quantity: 0, .. })
        ));
    }

    #[test]
    fn test_negative_values_are_invalid() {
        let cart = CartSnapshot::new(RestaurantId::new(), Money::zero())
            .with_line(CartLine::new("p-1", "Sopa", 1, Money::from_minor(-1)));
        assert!(matches!(
            cart.validate(),
            Err(ValidationError::InvalidPrice { price: -1, .. })
        ));

        let cart = CartSnapshot::new(RestaurantId::new(), Money::from_minor(-100))
            .with_line(CartLine::new("p-1", "Sopa", 1, Money::from_minor(100)));
        assert_eq!(cart.validate(), Err(ValidationError::NegativeDeliveryFee));
    }

    #[test]
    fn test_overflowing_amounts_are_invalid() {
        let unit_price = Money::from_minor(i64::MAX / 2 + 1);
        let cart = CartSnapshot::new(RestaurantId::new(), Money::zero())
            .with_line(CartLine::new("p-1", "Banquete", 2, unit_price));
        assert_eq!(cart.validate(), Err(ValidationError::AmountOverflow));
        assert_eq!(cart.totals(), Err(ValidationError::AmountOverflow));

        let cart = CartSnapshot::new(RestaurantId::new(), Money::from_minor(1))
            .with_line(CartLine::new("p-1", "Banquete", 1, Money::from_minor(i64::MAX)));
        assert_eq!(cart.validate(), Err(ValidationError::AmountOverflow));
    }

    #[test]
    fn test_deserializes_camel_case() {
        let restaurant_id = RestaurantId::new();
        let json = serde_json::json!({
            "restaurantId": restaurant_id,
            "lines": [
                {"productRef": "p-1", "name": "Pan", "quantity": 3, "unitPrice": 1200}
            ],
            "deliveryFee": 2000
        });

        let cart: CartSnapshot = serde_json::from_value(json).unwrap();

        assert_eq!(cart.restaurant_id, restaurant_id);
        assert_eq!(cart.lines[0].unit_price.minor(), 1200);
        assert_eq!(cart.totals().unwrap().total.minor(), 5600);
    }
}
