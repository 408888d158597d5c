//! End-to-end scenarios: adapter-style updates flowing into one store, reports
//! read back out, and metadata surviving a restart through SQLite.

use account_state::domain::entities::order::{
    Order, OrderPositionSide, OrderSide, OrderStatus, OrderType,
};
use account_state::domain::entities::position::{Position, PositionOrderSide, PositionSide};
use account_state::domain::value_objects::price_event::PriceEvent;
use account_state::persistence::init_database;
use account_state::persistence::metadata_repository::SqliteMetadataRepository;
use account_state::persistence::persister::{persist_if_pending, restore_metadata};
use account_state::{AccountStore, StoreError, TotalPositions};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CopyTradeMetadata {
    leader: String,
    stop_loss_pct: f64,
}

fn limit_order(id: &str, status: OrderStatus, executed_qty: f64) -> Order {
    Order {
        exchange_order_id: id.to_string(),
        custom_order_id: format!("bot-{}", id),
        symbol: "BTCUSDT".to_string(),
        order_side: OrderSide::Buy,
        position_side: OrderPositionSide::Long,
        order_type: OrderType::Limit,
        order_status: status,
        price: 50000.0,
        orig_qty: 0.2,
        executed_qty,
        avg_price: 50000.0,
        created_at: 1_700_000_000_000,
        updated_at: 1_700_000_000_500,
        reduce_only: Some(false),
    }
}

#[test]
fn test_fill_lifecycle_updates_orders_positions_and_reports() {
    let mut store: AccountStore<CopyTradeMetadata> = AccountStore::new();
    store.set_wallet_balance(10_000.0);
    store.store_previous_balance();
    store.set_symbol_leverage("BTCUSDT", 10.0);

    // Order rests, partially fills, then fills
    store.upsert_active_order(limit_order("5001", OrderStatus::New, 0.0));
    store.upsert_active_order(limit_order("5001", OrderStatus::PartiallyFilled, 0.1));
    assert_eq!(store.get_active_orders().len(), 1);
    store.upsert_active_order(limit_order("5001", OrderStatus::Filled, 0.2));
    assert!(store.get_orders().is_empty());

    let position = Position::new(
        "BTCUSDT",
        PositionSide::Long,
        PositionOrderSide::Long,
        0.2,
        50000.0,
        1_700_000_000_500,
    )
    .with_margin_value(1000.0);
    store.set_active_position("BTCUSDT", PositionSide::Long, position);
    store.set_wallet_balance(9_996.0); // fees

    store.process_price_event(&PriceEvent::new("BTCUSDT", 51000.0));

    let summary = store.get_session_summary(10_000.0);
    assert_eq!(summary.total_unrealised_pnl, 200.0);
    assert_eq!(summary.pnl.realised_pnl, -4.0);
    assert_eq!(summary.balance_if_closed_at_market, 10_200.0);
    assert_eq!(summary.positions[0].leverage, Some(10.0));
    assert_eq!(store.get_balance_diff(), -4.0);

    let depth = store.get_account_depth(10_000.0).unwrap();
    // 0.2 * 50000 / 10x = 1000 against 10000
    assert_eq!(depth.total_depth_pct, 10.0);
    // 1000 against 10000 + 200 unrealised
    assert!((depth.pnl_adjusted_depth_pct - 1000.0 / 10_200.0 * 100.0).abs() < 1e-9);

    assert_eq!(
        store.get_total_active_positions(),
        TotalPositions {
            total: 1,
            total_hedged: 0
        }
    );
}

#[test]
fn test_metadata_precondition_does_not_touch_flag() {
    let mut store: AccountStore<CopyTradeMetadata> = AccountStore::new();

    let result = store.set_symbol_metadata_value("BTCUSDT", "stop_loss_pct", 0.05);

    assert!(matches!(result, Err(StoreError::MetadataNotInitialized { .. })));
    assert!(!store.is_pending_persist());
}

#[tokio::test]
async fn test_metadata_survives_restart_through_sqlite() {
    let pool = init_database("sqlite::memory:").await.unwrap();
    let backend = SqliteMetadataRepository::new(pool);

    let session = Mutex::new(AccountStore::<CopyTradeMetadata>::new());
    {
        let mut store = session.lock().await;
        store.set_symbol_metadata(
            "BTCUSDT",
            CopyTradeMetadata {
                leader: "leader-1".to_string(),
                stop_loss_pct: 0.05,
            },
        );
        store
            .set_symbol_metadata_value("BTCUSDT", "stop_loss_pct", 0.02)
            .unwrap();
    }
    assert!(persist_if_pending(&session, &backend, "acct-1").await.unwrap());
    assert!(!persist_if_pending(&session, &backend, "acct-1").await.unwrap());

    let restarted = Mutex::new(AccountStore::<CopyTradeMetadata>::new());
    let restored = restore_metadata(&restarted, &backend, "acct-1").await.unwrap();

    assert_eq!(restored, 1);
    let store = restarted.lock().await;
    assert_eq!(
        store.get_symbol_metadata("BTCUSDT"),
        Some(&CopyTradeMetadata {
            leader: "leader-1".to_string(),
            stop_loss_pct: 0.02,
        })
    );
    assert!(!store.is_pending_persist());
}
