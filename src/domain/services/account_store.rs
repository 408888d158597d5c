//! AccountStore - in-memory cache of one account's balance, positions,
//! orders, leverage and per-symbol metadata
//!
//! The store has no internal locking. Callers serialize access, typically by
//! wrapping it in `Arc<tokio::sync::Mutex<_>>` when a persister shares it.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::DEFAULT_LEVERAGE;
use crate::domain::entities::balance::WalletBalance;
use crate::domain::entities::leverage::SymbolLeverage;
use crate::domain::entities::order::{Order, OrderSide, OrderStatus, OrderType};
use crate::domain::entities::position::{Position, PositionSide};
use crate::domain::errors::StoreError;
use crate::domain::services::reports::{
    DepthSummary, PositionDepth, PositionWithLeverage, SessionSummary,
};
use crate::domain::value_objects::price_event::PriceEvent;
use crate::domain::value_objects::sort::SortDirection;

/// Both position slots of one symbol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolPositions {
    pub long: Option<Position>,
    pub short: Option<Position>,
}

impl SymbolPositions {
    fn slot(&self, side: PositionSide) -> &Option<Position> {
        match side {
            PositionSide::Long => &self.long,
            PositionSide::Short => &self.short,
        }
    }

    fn slot_mut(&mut self, side: PositionSide) -> &mut Option<Position> {
        match side {
            PositionSide::Long => &mut self.long,
            PositionSide::Short => &mut self.short,
        }
    }

    fn is_active(&self, side: PositionSide) -> bool {
        self.slot(side).as_ref().is_some_and(Position::is_active)
    }

    fn is_hedged(&self) -> bool {
        self.is_active(PositionSide::Long) && self.is_active(PositionSide::Short)
    }
}

/// Counts returned by `get_total_active_positions`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalPositions {
    /// Active (symbol, side) slots
    pub total: usize,
    /// Symbols with both LONG and SHORT active
    pub total_hedged: usize,
}

/// Account state cache, generic over the caller's per-symbol metadata record
#[derive(Debug, Clone)]
pub struct AccountStore<M> {
    balance: WalletBalance,
    leverage: HashMap<String, SymbolLeverage>,
    positions: HashMap<String, SymbolPositions>,
    orders: HashMap<String, Order>,
    metadata: HashMap<String, M>,
    pending_persist: bool,
    total_hedged: usize,
    default_leverage: f64,
}

impl<M> Default for AccountStore<M>
where
    M: Clone + Serialize + DeserializeOwned,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M> AccountStore<M>
where
    M: Clone + Serialize + DeserializeOwned,
{
    pub fn new() -> Self {
        Self::with_default_leverage(DEFAULT_LEVERAGE)
    }

    /// Create a store that assumes `default_leverage` for symbols with no
    /// known leverage when building depth reports
    pub fn with_default_leverage(default_leverage: f64) -> Self {
        Self {
            balance: WalletBalance::default(),
            leverage: HashMap::new(),
            positions: HashMap::new(),
            orders: HashMap::new(),
            metadata: HashMap::new(),
            pending_persist: false,
            total_hedged: 0,
            default_leverage,
        }
    }

    pub fn default_leverage(&self) -> f64 {
        self.default_leverage
    }

    // ========== Balance ==========

    pub fn set_wallet_balance(&mut self, amount: f64) {
        debug!("Wallet balance set: {} -> {}", self.balance.current, amount);
        self.balance.current = amount;
    }

    pub fn get_wallet_balance(&self) -> f64 {
        self.balance.current
    }

    /// Copy the current balance aside, for diffing around an event
    pub fn store_previous_balance(&mut self) {
        self.balance.snapshot();
    }

    pub fn get_previous_balance(&self) -> f64 {
        self.balance.previous
    }

    /// Balance change since the last `store_previous_balance`
    pub fn get_balance_diff(&self) -> f64 {
        self.balance.diff()
    }

    // ========== Positions ==========

    /// Stored position for the slot, if any.
    ///
    /// First access to a symbol creates its empty record, see `tracked_symbols`.
    pub fn get_active_position(&mut self, symbol: &str, side: PositionSide) -> Option<&Position> {
        self.positions
            .entry(symbol.to_string())
            .or_default()
            .slot(side)
            .as_ref()
    }

    pub fn set_active_position(&mut self, symbol: &str, side: PositionSide, position: Position) {
        debug!(
            "Position set: {} {} qty={} entry={}",
            symbol, side, position.asset_qty, position.entry_price
        );
        *self
            .positions
            .entry(symbol.to_string())
            .or_default()
            .slot_mut(side) = Some(position);
    }

    /// Clear one slot; the opposite side is left untouched
    pub fn delete_active_position(&mut self, symbol: &str, side: PositionSide) {
        if let Some(record) = self.positions.get_mut(symbol) {
            if record.slot_mut(side).take().is_some() {
                debug!("Position deleted: {} {}", symbol, side);
            }
        }
    }

    /// Every position holding a non-zero quantity. Order is not meaningful.
    pub fn get_all_positions(&self) -> Vec<&Position> {
        self.positions
            .values()
            .flat_map(|record| [record.long.as_ref(), record.short.as_ref()])
            .flatten()
            .filter(|position| position.is_active())
            .collect()
    }

    /// Count active slots and hedged symbols, caching the hedged count
    pub fn get_total_active_positions(&mut self) -> TotalPositions {
        let mut totals = TotalPositions::default();
        for record in self.positions.values() {
            for side in [PositionSide::Long, PositionSide::Short] {
                if record.is_active(side) {
                    totals.total += 1;
                }
            }
            if record.is_hedged() {
                totals.total_hedged += 1;
            }
        }
        self.total_hedged = totals.total_hedged;
        totals
    }

    /// Hedged count from the last `get_total_active_positions` call
    pub fn get_total_hedged_positions(&self) -> usize {
        self.total_hedged
    }

    pub fn is_symbol_side_in_position(&self, symbol: &str, side: PositionSide) -> bool {
        self.positions
            .get(symbol)
            .is_some_and(|record| record.is_active(side))
    }

    pub fn is_symbol_in_any_position(&self, symbol: &str) -> bool {
        self.is_symbol_side_in_position(symbol, PositionSide::Long)
            || self.is_symbol_side_in_position(symbol, PositionSide::Short)
    }

    /// Symbols with a position record, including empty ones created on lookup
    pub fn tracked_symbols(&self) -> Vec<&str> {
        self.positions.keys().map(String::as_str).collect()
    }

    /// Recompute unrealized PnL in place for both sides of the symbol
    pub fn process_price_event(&mut self, event: &PriceEvent) {
        let Some(record) = self.positions.get_mut(&event.symbol) else {
            return;
        };
        for position in [record.long.as_mut(), record.short.as_mut()].into_iter().flatten() {
            position.mark_to_market(event.price);
        }
    }

    // ========== Leverage ==========

    /// Record a leverage that applies to both sides
    pub fn set_symbol_leverage(&mut self, symbol: &str, leverage: f64) {
        debug!("Leverage set: {} {}x", symbol, leverage);
        self.leverage
            .insert(symbol.to_string(), SymbolLeverage::symmetric(leverage));
    }

    /// Headline leverage of the symbol (the higher side in hedge mode)
    pub fn get_symbol_leverage(&self, symbol: &str) -> Option<f64> {
        self.leverage.get(symbol).map(SymbolLeverage::headline)
    }

    pub fn get_symbol_leverage_cache(&self) -> &HashMap<String, SymbolLeverage> {
        &self.leverage
    }

    /// Record leverage for one side. With nothing known yet, the other side
    /// starts from the same figure.
    pub fn set_symbol_side_leverage(&mut self, symbol: &str, side: OrderSide, leverage: f64) {
        debug!("Leverage set: {} {} {}x", symbol, side, leverage);
        self.leverage
            .entry(symbol.to_string())
            .or_insert_with(|| SymbolLeverage::symmetric(leverage))
            .set_order_side(side, leverage);
    }

    pub fn get_symbol_side_leverage(&self, symbol: &str, side: OrderSide) -> Option<f64> {
        self.leverage
            .get(symbol)
            .map(|leverage| leverage.for_order_side(side))
    }

    /// Leverage backing a position on the given side
    pub fn get_position_leverage(&self, symbol: &str, side: PositionSide) -> Option<f64> {
        self.leverage
            .get(symbol)
            .map(|leverage| leverage.for_position_side(side))
    }

    // ========== Orders ==========

    /// Store a live order, or evict it once it reaches any other status.
    ///
    /// No sequence reconciliation: the last applied update wins.
    pub fn upsert_active_order(&mut self, order: Order) {
        if order.order_status.is_live() {
            debug!(
                "Order upserted: {} {} {}",
                order.exchange_order_id, order.symbol, order.order_status
            );
            self.orders.insert(order.exchange_order_id.clone(), order);
        } else if self.orders.remove(&order.exchange_order_id).is_some() {
            debug!(
                "Order removed: {} {} {}",
                order.exchange_order_id, order.symbol, order.order_status
            );
        }
    }

    /// Store an order as given, whatever its status
    pub fn set_order(&mut self, order: Order) {
        self.orders.insert(order.exchange_order_id.clone(), order);
    }

    pub fn delete_order(&mut self, exchange_order_id: &str) -> Option<Order> {
        self.orders.remove(exchange_order_id)
    }

    pub fn clear_all_orders(&mut self) {
        debug!("Clearing {} orders", self.orders.len());
        self.orders.clear();
    }

    pub fn get_order(&self, exchange_order_id: &str) -> Option<&Order> {
        self.orders.get(exchange_order_id)
    }

    pub fn get_orders(&self) -> Vec<&Order> {
        self.orders.values().collect()
    }

    pub fn get_active_orders(&self) -> Vec<&Order> {
        self.filter_orders(|order| order.order_status.is_live())
    }

    pub fn get_orders_for_symbol(&self, symbol: &str) -> Vec<&Order> {
        self.filter_orders(|order| order.symbol == symbol)
    }

    pub fn get_orders_for_symbol_side(&self, symbol: &str, side: OrderSide) -> Vec<&Order> {
        self.filter_orders(|order| order.symbol == symbol && order.order_side == side)
    }

    pub fn get_orders_by_status(&self, status: OrderStatus) -> Vec<&Order> {
        self.filter_orders(|order| order.order_status == status)
    }

    pub fn get_orders_by_type(&self, order_type: OrderType) -> Vec<&Order> {
        self.filter_orders(|order| order.order_type == order_type)
    }

    pub fn get_orders_sorted_by_price(&self, direction: SortDirection) -> Vec<&Order> {
        self.sorted_orders(direction, |a, b| a.price.total_cmp(&b.price))
    }

    pub fn get_orders_sorted_by_id(&self, direction: SortDirection) -> Vec<&Order> {
        self.sorted_orders(direction, |a, b| {
            compare_order_ids(&a.exchange_order_id, &b.exchange_order_id)
        })
    }

    pub fn get_orders_sorted_by_symbol(&self, direction: SortDirection) -> Vec<&Order> {
        self.sorted_orders(direction, |a, b| a.symbol.cmp(&b.symbol))
    }

    pub fn get_orders_sorted_by_timestamp(&self, direction: SortDirection) -> Vec<&Order> {
        self.sorted_orders(direction, |a, b| a.created_at.cmp(&b.created_at))
    }

    fn filter_orders(&self, predicate: impl Fn(&Order) -> bool) -> Vec<&Order> {
        self.orders.values().filter(|order| predicate(order)).collect()
    }

    fn sorted_orders(
        &self,
        direction: SortDirection,
        compare: impl Fn(&Order, &Order) -> Ordering,
    ) -> Vec<&Order> {
        let mut orders = self.get_orders();
        orders.sort_by(|a, b| direction.apply(compare(a, b)));
        orders
    }

    // ========== Metadata ==========

    /// Replace the symbol's metadata and flag it for persistence
    pub fn set_symbol_metadata(&mut self, symbol: &str, data: M) {
        debug!("Metadata set for {}", symbol);
        self.metadata.insert(symbol.to_string(), data);
        self.pending_persist = true;
    }

    /// Update one field of existing metadata.
    ///
    /// # Errors
    /// `MetadataNotInitialized` when the symbol has no metadata yet, and
    /// `InvalidMetadataValue` when the record is not keyed or the new value
    /// does not fit it. Store and flag are unchanged on error.
    pub fn set_symbol_metadata_value<V: Serialize>(
        &mut self,
        symbol: &str,
        key: &str,
        value: V,
    ) -> Result<(), StoreError> {
        let current = self
            .metadata
            .get(symbol)
            .ok_or_else(|| StoreError::MetadataNotInitialized {
                symbol: symbol.to_string(),
            })?;

        let invalid = |reason: String| StoreError::InvalidMetadataValue {
            symbol: symbol.to_string(),
            key: key.to_string(),
            reason,
        };

        let mut record = serde_json::to_value(current).map_err(|e| invalid(e.to_string()))?;
        let fields = record
            .as_object_mut()
            .ok_or_else(|| invalid("metadata is not a keyed record".to_string()))?;
        let value = serde_json::to_value(value).map_err(|e| invalid(e.to_string()))?;
        fields.insert(key.to_string(), value);
        let updated: M = serde_json::from_value(record).map_err(|e| invalid(e.to_string()))?;

        debug!("Metadata value set for {}: {}", symbol, key);
        self.metadata.insert(symbol.to_string(), updated);
        self.pending_persist = true;
        Ok(())
    }

    pub fn get_symbol_metadata(&self, symbol: &str) -> Option<&M> {
        self.metadata.get(symbol)
    }

    pub fn get_all_symbol_metadata(&self) -> &HashMap<String, M> {
        &self.metadata
    }

    /// Replace all metadata, e.g. when restoring from storage.
    ///
    /// Does not raise the pending flag: the data came from the persisted copy.
    pub fn set_all_symbol_metadata(&mut self, metadata: HashMap<String, M>) {
        debug!("Metadata restored for {} symbols", metadata.len());
        self.metadata = metadata;
    }

    pub fn get_symbols_with_metadata(&self) -> Vec<&str> {
        self.metadata.keys().map(String::as_str).collect()
    }

    /// Drop the symbol's metadata and flag the change for persistence
    pub fn delete_position_metadata(&mut self, symbol: &str) {
        debug!("Metadata deleted for {}", symbol);
        self.metadata.remove(symbol);
        self.pending_persist = true;
    }

    pub fn is_pending_persist(&self) -> bool {
        self.pending_persist
    }

    pub fn set_is_pending_persist(&mut self, pending: bool) {
        self.pending_persist = pending;
    }

    // ========== Reports ==========

    /// Balance, positions and PnL relative to `starting_balance`
    pub fn get_session_summary(&self, starting_balance: f64) -> SessionSummary {
        let positions = self
            .get_all_positions()
            .into_iter()
            .map(|position| PositionWithLeverage {
                leverage: self.get_position_leverage(&position.symbol, position.side),
                position: position.clone(),
            })
            .collect();

        SessionSummary::build(starting_balance, self.balance.current, positions)
    }

    /// Exposure of every active position against `available_balance`.
    ///
    /// # Errors
    /// `DivideByZero` when `available_balance` (or the balance after open PnL)
    /// is zero.
    pub fn get_account_depth(&self, available_balance: f64) -> Result<DepthSummary, StoreError> {
        let positions = self
            .get_all_positions()
            .into_iter()
            .map(|position| {
                PositionDepth::build(
                    position,
                    self.get_position_leverage(&position.symbol, position.side),
                    self.default_leverage,
                    available_balance,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        DepthSummary::build(available_balance, positions)
    }
}

/// Exchange ids are usually numeric; compare them as numbers when both parse
fn compare_order_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}
