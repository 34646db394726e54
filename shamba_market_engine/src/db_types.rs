//! The record types and status enumerations shared by the engine and its storage backends.
//!
//! Every status domain (item, order, payment, delivery) is a closed enumeration. String conversions reject unknown
//! values, so caller-supplied statuses are validated at the boundary instead of being trusted as free text. The
//! legal transition graphs for orders and deliveries live here as data ([`OrderStatusType::allowed_next`] and
//! [`DeliveryStatusType::allowed_next`]) so they can be tested without touching persistence.

use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smp_common::{Money, KES_CURRENCY_CODE};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid {0}: {1}")]
pub struct ConversionError(pub &'static str, pub String);

//--------------------------------------       ItemId        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct ItemId(pub String);

impl From<String> for ItemId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ItemId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------       OrderId       ---------------------------------------------------------
/// The human-readable order reference (`ORD-XXXXXXXXXX`). Globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderId(pub String);

impl FromStr for OrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl OrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      DeliveryId     ---------------------------------------------------------
/// The human-readable delivery reference (`DEL-XXXXXXXXXX`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct DeliveryId(pub String);

impl From<String> for DeliveryId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for DeliveryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl DeliveryId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------      ItemStatus     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ItemStatus {
    /// The listing is being drafted by its owner and cannot be ordered yet.
    Draft,
    /// The item is live and has stock available.
    Available,
    /// Stock has run out. Flipped automatically when the last unit is reserved, and back to `Available` on release.
    SoldOut,
    /// The listing has been removed. Releases against a deleted item are logged no-ops.
    Deleted,
}

impl ItemStatus {
    /// Whether stock may be reserved against an item in this status.
    pub fn is_sellable(&self) -> bool {
        matches!(self, ItemStatus::Available)
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemStatus::Draft => write!(f, "Draft"),
            ItemStatus::Available => write!(f, "Available"),
            ItemStatus::SoldOut => write!(f, "SoldOut"),
            ItemStatus::Deleted => write!(f, "Deleted"),
        }
    }
}

impl FromStr for ItemStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Draft" => Ok(Self::Draft),
            "Available" => Ok(Self::Available),
            "SoldOut" => Ok(Self::SoldOut),
            "Deleted" => Ok(Self::Deleted),
            s => Err(ConversionError("item status", s.to_string())),
        }
    }
}

//--------------------------------------   OrderStatusType   ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum OrderStatusType {
    /// The order has been placed and stock reserved, but payment has not been confirmed.
    Pending,
    /// Payment has been confirmed (or the seller has accepted a collect-on-delivery order).
    Confirmed,
    /// The seller is assembling the order.
    Preparing,
    /// The order is packed and ready for collection by the buyer or a courier.
    Ready,
    /// The goods have left the seller. A shipped order can no longer be cancelled.
    Shipped,
    /// Terminal. The goods have reached the buyer.
    Delivered,
    /// Terminal. The order was cancelled and its stock released.
    Cancelled,
}

impl OrderStatusType {
    /// The set of statuses this status may legally transition to. The graph is the single source of truth for
    /// order transitions; the storage layer consults it before every update.
    pub fn allowed_next(&self) -> &'static [OrderStatusType] {
        use OrderStatusType::*;
        match self {
            Pending => &[Confirmed, Cancelled],
            Confirmed => &[Preparing, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[Shipped, Cancelled],
            Shipped => &[Delivered],
            Delivered | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatusType) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "Pending"),
            OrderStatusType::Confirmed => write!(f, "Confirmed"),
            OrderStatusType::Preparing => write!(f, "Preparing"),
            OrderStatusType::Ready => write!(f, "Ready"),
            OrderStatusType::Shipped => write!(f, "Shipped"),
            OrderStatusType::Delivered => write!(f, "Delivered"),
            OrderStatusType::Cancelled => write!(f, "Cancelled"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Preparing" => Ok(Self::Preparing),
            "Ready" => Ok(Self::Ready),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            s => Err(ConversionError("order status", s.to_string())),
        }
    }
}

//--------------------------------------  PaymentStatusType  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentStatusType {
    /// No settlement has been reported yet.
    Pending,
    /// A checkout session is open at the gateway.
    Processing,
    /// Terminal. Funds have settled.
    Completed,
    /// Terminal. The gateway reported a failed settlement.
    Failed,
    /// Terminal. The settled amount was returned to the buyer.
    Refunded,
}

impl PaymentStatusType {
    /// Terminal payment statuses are written at most once; a callback for an already-terminal payment is a
    /// duplicate and must be swallowed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatusType::Completed | PaymentStatusType::Failed | PaymentStatusType::Refunded)
    }
}

impl Display for PaymentStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatusType::Pending => write!(f, "Pending"),
            PaymentStatusType::Processing => write!(f, "Processing"),
            PaymentStatusType::Completed => write!(f, "Completed"),
            PaymentStatusType::Failed => write!(f, "Failed"),
            PaymentStatusType::Refunded => write!(f, "Refunded"),
        }
    }
}

impl FromStr for PaymentStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Processing" => Ok(Self::Processing),
            "Completed" => Ok(Self::Completed),
            "Failed" => Ok(Self::Failed),
            "Refunded" => Ok(Self::Refunded),
            s => Err(ConversionError("payment status", s.to_string())),
        }
    }
}

//--------------------------------------    PaymentMethod    ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum PaymentMethod {
    /// Settled up-front through the external payment gateway.
    Gateway,
    /// Cash handed over when the goods arrive.
    CashOnDelivery,
    /// Mobile-money transfer made when the goods arrive.
    MobileMoneyOnDelivery,
}

impl PaymentMethod {
    /// Collect-on-delivery methods settle when the goods change hands, so reaching `Delivered` completes payment.
    pub fn is_collect_on_delivery(&self) -> bool {
        matches!(self, PaymentMethod::CashOnDelivery | PaymentMethod::MobileMoneyOnDelivery)
    }
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Gateway => write!(f, "Gateway"),
            PaymentMethod::CashOnDelivery => write!(f, "CashOnDelivery"),
            PaymentMethod::MobileMoneyOnDelivery => write!(f, "MobileMoneyOnDelivery"),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gateway" => Ok(Self::Gateway),
            "CashOnDelivery" => Ok(Self::CashOnDelivery),
            "MobileMoneyOnDelivery" => Ok(Self::MobileMoneyOnDelivery),
            s => Err(ConversionError("payment method", s.to_string())),
        }
    }
}

//-------------------------------------- DeliveryStatusType  ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum DeliveryStatusType {
    Pending,
    Accepted,
    PickedUp,
    InTransit,
    OutForDelivery,
    /// Terminal. Sets `actual_delivery` and completes collect-on-delivery payment on the owning order.
    Delivered,
    /// Terminal.
    Cancelled,
    /// The delivery is held up; it can resume to any forward state.
    Delayed,
    /// Terminal. The goods went back to the seller.
    Returned,
}

impl DeliveryStatusType {
    pub fn allowed_next(&self) -> &'static [DeliveryStatusType] {
        use DeliveryStatusType::*;
        match self {
            Pending => &[Accepted, Cancelled, Delayed, Returned],
            Accepted => &[PickedUp, Cancelled, Delayed, Returned],
            PickedUp => &[InTransit, Cancelled, Delayed, Returned],
            InTransit => &[OutForDelivery, Cancelled, Delayed, Returned],
            OutForDelivery => &[Delivered, Cancelled, Delayed, Returned],
            Delayed => &[Accepted, PickedUp, InTransit, OutForDelivery, Delivered, Cancelled, Returned],
            Delivered | Cancelled | Returned => &[],
        }
    }

    pub fn can_transition_to(&self, next: DeliveryStatusType) -> bool {
        self.allowed_next().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl Display for DeliveryStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatusType::Pending => write!(f, "Pending"),
            DeliveryStatusType::Accepted => write!(f, "Accepted"),
            DeliveryStatusType::PickedUp => write!(f, "PickedUp"),
            DeliveryStatusType::InTransit => write!(f, "InTransit"),
            DeliveryStatusType::OutForDelivery => write!(f, "OutForDelivery"),
            DeliveryStatusType::Delivered => write!(f, "Delivered"),
            DeliveryStatusType::Cancelled => write!(f, "Cancelled"),
            DeliveryStatusType::Delayed => write!(f, "Delayed"),
            DeliveryStatusType::Returned => write!(f, "Returned"),
        }
    }
}

impl FromStr for DeliveryStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Accepted" => Ok(Self::Accepted),
            "PickedUp" => Ok(Self::PickedUp),
            "InTransit" => Ok(Self::InTransit),
            "OutForDelivery" => Ok(Self::OutForDelivery),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Delayed" => Ok(Self::Delayed),
            "Returned" => Ok(Self::Returned),
            s => Err(ConversionError("delivery status", s.to_string())),
        }
    }
}

//--------------------------------------      ActorRole      ---------------------------------------------------------
/// Who asked for a state change. Recorded in the audit log and in cancellation metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
pub enum ActorRole {
    Buyer,
    Seller,
    Courier,
    System,
}

impl Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorRole::Buyer => write!(f, "Buyer"),
            ActorRole::Seller => write!(f, "Seller"),
            ActorRole::Courier => write!(f, "Courier"),
            ActorRole::System => write!(f, "System"),
        }
    }
}

impl FromStr for ActorRole {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Buyer" => Ok(Self::Buyer),
            "Seller" => Ok(Self::Seller),
            "Courier" => Ok(Self::Courier),
            "System" => Ok(Self::System),
            s => Err(ConversionError("actor role", s.to_string())),
        }
    }
}

//--------------------------------------        Item         ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub owner_id: String,
    pub name: String,
    pub category: String,
    /// The unit stock is counted in, e.g. "kg", "crate", "bag".
    pub unit: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub id: ItemId,
    pub owner_id: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    pub status: ItemStatus,
}

impl NewItem {
    pub fn new<S: Into<String>>(id: ItemId, owner_id: S, name: S, unit_price: Money, quantity: i64) -> Self {
        Self {
            id,
            owner_id: owner_id.into(),
            name: name.into(),
            category: String::new(),
            unit: "unit".to_string(),
            image_url: None,
            unit_price,
            quantity,
            status: ItemStatus::Available,
        }
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: i64,
    pub order_id: OrderId,
    pub buyer_id: String,
    pub seller_id: String,
    pub status: OrderStatusType,
    pub payment_status: PaymentStatusType,
    pub payment_method: PaymentMethod,
    /// The unique reference correlating this order with a gateway payment record. Set at checkout.
    pub gateway_reference: Option<String>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub tax: Money,
    pub discount: Money,
    pub total: Money,
    pub currency: String,
    pub delivery_address: Option<String>,
    pub delivery_method: Option<String>,
    pub notes: Option<String>,
    pub cancelled_reason: Option<String>,
    pub cancelled_by: Option<ActorRole>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------      OrderLine      ---------------------------------------------------------
/// A snapshot of one cart line, frozen at placement time. Later catalogue edits never touch these rows.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub item_id: ItemId,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

/// An order together with its line snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

//--------------------------------------      CartLine       ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub item_id: ItemId,
    pub quantity: i64,
}

impl CartLine {
    pub fn new<I: Into<ItemId>>(item_id: I, quantity: i64) -> Self {
        Self { item_id: item_id.into(), quantity }
    }
}

//--------------------------------------   NewOrderRequest   ---------------------------------------------------------
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderRequest {
    pub buyer_id: String,
    /// Processed in the order supplied. Must be non-empty, with every quantity >= 1.
    pub lines: Vec<CartLine>,
    pub payment_method: PaymentMethod,
    pub delivery_fee: Money,
    pub discount: Money,
    pub tax: Money,
    pub delivery_address: Option<String>,
    pub delivery_method: Option<String>,
    pub notes: Option<String>,
}

impl NewOrderRequest {
    pub fn new<S: Into<String>>(buyer_id: S, lines: Vec<CartLine>) -> Self {
        Self {
            buyer_id: buyer_id.into(),
            lines,
            payment_method: PaymentMethod::Gateway,
            delivery_fee: Money::default(),
            discount: Money::default(),
            tax: Money::default(),
            delivery_address: None,
            delivery_method: None,
            notes: None,
        }
    }

    pub fn with_payment_method(mut self, method: PaymentMethod) -> Self {
        self.payment_method = method;
        self
    }

    pub fn with_delivery_fee(mut self, fee: Money) -> Self {
        self.delivery_fee = fee;
        self
    }

    pub fn with_discount(mut self, discount: Money) -> Self {
        self.discount = discount;
        self
    }

    pub fn with_delivery_address<S: Into<String>>(mut self, address: S) -> Self {
        self.delivery_address = Some(address.into());
        self
    }
}

//--------------------------------------  OrderStatusEntry   ---------------------------------------------------------
/// One row of the append-only per-order audit log. Never edited.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OrderStatusEntry {
    pub id: i64,
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub actor: ActorRole,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Payment       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Payment {
    pub id: i64,
    /// The idempotence key. Unique; every gateway callback is resolved through this reference.
    pub gateway_reference: String,
    pub order_id: Option<OrderId>,
    pub amount: Money,
    pub currency: String,
    pub status: PaymentStatusType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub gateway_reference: String,
    pub order_id: Option<OrderId>,
    pub amount: Money,
    pub currency: String,
}

impl NewPayment {
    pub fn new<S: Into<String>>(gateway_reference: S, amount: Money) -> Self {
        Self {
            gateway_reference: gateway_reference.into(),
            order_id: None,
            amount,
            currency: KES_CURRENCY_CODE.to_string(),
        }
    }

    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }
}

//--------------------------------------  SettlementOutcome  ---------------------------------------------------------
/// What the gateway reported for a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementOutcome {
    Success,
    Failed,
}

impl FromStr for SettlementOutcome {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "success" | "Success" => Ok(Self::Success),
            "failed" | "Failed" => Ok(Self::Failed),
            s => Err(ConversionError("settlement outcome", s.to_string())),
        }
    }
}

impl Display for SettlementOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettlementOutcome::Success => write!(f, "success"),
            SettlementOutcome::Failed => write!(f, "failed"),
        }
    }
}

//--------------------------------------      Delivery       ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Delivery {
    pub id: i64,
    pub delivery_id: DeliveryId,
    pub order_id: OrderId,
    pub courier_id: String,
    pub status: DeliveryStatusType,
    pub cold_chain_required: bool,
    pub min_temperature: Option<f64>,
    pub max_temperature: Option<f64>,
    pub actual_delivery: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub order_id: OrderId,
    pub courier_id: String,
    pub cold_chain: Option<ColdChainConfig>,
}

impl NewDelivery {
    pub fn new<S: Into<String>>(order_id: OrderId, courier_id: S) -> Self {
        Self { order_id, courier_id: courier_id.into(), cold_chain: None }
    }

    pub fn with_cold_chain(mut self, min_temperature: f64, max_temperature: f64) -> Self {
        self.cold_chain = Some(ColdChainConfig { min_temperature, max_temperature });
        self
    }
}

/// The acceptable temperature band for a cold-chain delivery, in degrees Celsius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColdChainConfig {
    pub min_temperature: f64,
    pub max_temperature: f64,
}

//--------------------------------------   TrackingEvent     ---------------------------------------------------------
/// One row of a delivery's append-only tracking log.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TrackingEvent {
    pub id: i64,
    pub delivery_id: DeliveryId,
    pub event: String,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     Telemetry       ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewTelemetry {
    pub temperature: f64,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub id: i64,
    pub delivery_id: DeliveryId,
    pub temperature: f64,
    pub humidity: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// An out-of-band temperature reading. Informational only; alerts never block delivery transitions.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ColdChainAlert {
    pub id: i64,
    pub delivery_id: DeliveryId,
    pub message: String,
    pub temperature: f64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn order_transition_table() {
        use OrderStatusType::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Shipped));
        assert!(Ready.can_transition_to(Shipped));
        assert!(Shipped.can_transition_to(Delivered));
        // Goods in transit cannot be recalled
        assert!(!Shipped.can_transition_to(Cancelled));
        assert!(Delivered.is_terminal());
        assert!(Cancelled.is_terminal());
        for status in [Pending, Confirmed, Preparing, Ready] {
            assert!(status.can_transition_to(Cancelled), "{status} should be cancellable");
        }
    }

    #[test]
    fn delivery_transition_table() {
        use DeliveryStatusType::*;
        assert!(Pending.can_transition_to(Accepted));
        assert!(OutForDelivery.can_transition_to(Delivered));
        assert!(!Pending.can_transition_to(Delivered));
        for status in [Pending, Accepted, PickedUp, InTransit, OutForDelivery] {
            assert!(status.can_transition_to(Cancelled));
            assert!(status.can_transition_to(Delayed));
            assert!(status.can_transition_to(Returned));
        }
        assert!(Delayed.can_transition_to(InTransit));
        assert!(Delivered.is_terminal());
        assert!(Returned.is_terminal());
        assert!(Cancelled.is_terminal());
    }

    #[test]
    fn statuses_reject_unknown_values() {
        assert!("Shipped".parse::<OrderStatusType>().is_ok());
        assert!("shipped".parse::<OrderStatusType>().is_err());
        assert!("Teleported".parse::<OrderStatusType>().is_err());
        assert!("Completed".parse::<PaymentStatusType>().is_ok());
        assert!("Settled".parse::<PaymentStatusType>().is_err());
        assert!("OutForDelivery".parse::<DeliveryStatusType>().is_ok());
        assert!("Lost".parse::<DeliveryStatusType>().is_err());
        assert!("Gardener".parse::<ActorRole>().is_err());
    }

    #[test]
    fn collect_on_delivery_methods() {
        assert!(!PaymentMethod::Gateway.is_collect_on_delivery());
        assert!(PaymentMethod::CashOnDelivery.is_collect_on_delivery());
        assert!(PaymentMethod::MobileMoneyOnDelivery.is_collect_on_delivery());
    }
}
