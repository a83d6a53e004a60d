//! Value objects for the order domain.

use common::OrderId;
use serde::{Deserialize, Serialize};

/// Money amount in minor currency units (e.g. cents).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new amount from minor units.
    pub fn from_minor(minor: i64) -> Self {
        Self(minor)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    /// Returns the amount in minor units.
    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity. `None` on overflow.
    pub fn checked_multiply(&self, quantity: u32) -> Option<Money> {
        self.0.checked_mul(i64::from(quantity)).map(Money)
    }

    /// Adds two amounts. `None` on overflow.
    pub fn checked_add(&self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

/// Catalog product reference. Opaque to this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductRef(String);

impl ProductRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductRef {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductRef {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A line of an order, priced at checkout time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_ref: ProductRef,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl LineItem {
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

    /// Returns quantity times unit price, or `None` if it does not fit.
    pub fn line_total(&self) -> Option<Money> {
        self.unit_price.checked_multiply(self.quantity)
    }
}

/// Subtotal, delivery fee and total of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

impl OrderTotals {
    /// Computes totals from line items and a delivery fee.
    ///
    /// Returns `None` if any line, the subtotal or the total overflows.
    pub fn compute(items: &[LineItem], delivery_fee: Money) -> Option<Self> {
        let subtotal = items.iter().try_fold(Money::zero(), |acc, item| {
            acc.checked_add(item.line_total()?)
        })?;
        Some(Self {
            subtotal,
            delivery_fee,
            total: subtotal.checked_add(delivery_fee)?,
        })
    }
}

/// Where and to whom an order is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeliveryInfo {
    pub address: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl DeliveryInfo {
    pub fn new(address: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            phone: phone.into(),
            instructions: None,
            email: None,
        }
    }

    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Names of required fields that are blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.address.trim().is_empty() {
            missing.push("address");
        }
        if self.phone.trim().is_empty() {
            missing.push("phone");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Gateway,
}

impl PaymentMethod {
    pub fn is_gateway(&self) -> bool {
        matches!(self, PaymentMethod::Gateway)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::BankTransfer => "bank_transfer",
            PaymentMethod::Gateway => "gateway",
        }
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payment reference shared with the gateway, `ORDER-{order id}`.
///
/// Doubles as the lookup key for incoming gateway events and as the
/// reference shown to the customer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GatewayReference(String);

impl GatewayReference {
    pub const PREFIX: &'static str = "ORDER-";

    /// Derives the reference for an order.
    pub fn for_order(order_id: OrderId) -> Self {
        Self(format!("{}{}", Self::PREFIX, order_id))
    }

    /// Parses a reference received from the gateway.
    ///
    /// Returns `None` unless the value is exactly what [`Self::for_order`]
    /// produces: the prefix followed by the lowercase hyphenated order id.
    pub fn parse(value: &str) -> Option<Self> {
        let order_id = OrderId::parse(value.strip_prefix(Self::PREFIX)?)?;
        let reference = Self::for_order(order_id);
        (reference.0 == value).then_some(reference)
    }

    /// The order id embedded in the reference.
    pub fn order_id(&self) -> Option<OrderId> {
        self.0
            .strip_prefix(Self::PREFIX)
            .and_then(OrderId::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for GatewayReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
