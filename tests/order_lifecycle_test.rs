//! End-to-end tests for the order lifecycle and its stock bookkeeping:
//! creation against live inventory, completion against a revised item
//! list, cancellation, and the non-negative stock invariant under
//! concurrent orders.

mod common;

use ardoise_api::entities::order::OrderStatus;
use ardoise_api::errors::ServiceError;
use ardoise_api::services::boundaries::Period;
use ardoise_api::services::orders::{NewOrderItem, RevisedItem};
use assert_matches::assert_matches;
use common::TestApp;
use rust_decimal_macros::dec;
use uuid::Uuid;

fn item(product_id: Uuid, quantity: i32, unit_price: rust_decimal::Decimal) -> NewOrderItem {
    NewOrderItem {
        product_id,
        quantity,
        unit_price,
    }
}

fn revised(product_id: Uuid, quantity: i32) -> RevisedItem {
    RevisedItem {
        product_id,
        quantity,
    }
}

// ==================== Launch ====================

#[tokio::test]
async fn launch_creates_pending_order_and_consumes_stock() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let steak = app.seed_product(cat.id, "Steak frites", dec!(18.50), 10).await;

    let record = app
        .services
        .orders
        .launch(
            &app.ctx,
            None,
            Some("Ada".to_string()),
            vec![item(steak.id, 3, dec!(18.50))],
        )
        .await
        .expect("launch should succeed");

    assert_eq!(record.order.status, OrderStatus::Pending);
    assert_eq!(record.order.total, dec!(55.50));
    assert_eq!(record.items.len(), 1);
    assert_eq!(record.items[0].quantity, 3);
    assert_eq!(record.items[0].price, dec!(18.50));

    assert_eq!(app.product(steak.id).await.stock, 7);

    // Round-trip: the status query reports PENDING immediately.
    let status = app
        .services
        .orders
        .get_status(record.order.id)
        .await
        .expect("status query");
    assert_eq!(status, OrderStatus::Pending);
}

#[tokio::test]
async fn launch_with_no_items_is_rejected() {
    let app = TestApp::new().await;

    let err = app
        .services
        .orders
        .launch(&app.ctx, None, None, Vec::new())
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::EmptyOrder);
}

#[tokio::test]
async fn launch_rejects_non_positive_quantity_and_duplicates() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Drinks").await;
    let soda = app.seed_product(cat.id, "Soda", dec!(3.00), 10).await;

    let err = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(soda.id, 0, dec!(3.00))])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    let err = app
        .services
        .orders
        .launch(
            &app.ctx,
            None,
            None,
            vec![item(soda.id, 1, dec!(3.00)), item(soda.id, 2, dec!(3.00))],
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));

    assert_eq!(app.product(soda.id).await.stock, 10);
}

#[tokio::test]
async fn launch_with_insufficient_stock_changes_nothing() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Desserts").await;
    let tart = app.seed_product(cat.id, "Tarte tatin", dec!(7.00), 2).await;

    let err = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(tart.id, 5, dec!(7.00))])
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::InsufficientStock(id) if id == tart.id);
    assert_eq!(app.product(tart.id).await.stock, 2);

    // No order or items survived the failed launch.
    let orders = app
        .services
        .statistics
        .orders(Period::AllTime)
        .await
        .expect("order list");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn launch_without_table_uses_the_default_table() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Gratin", dec!(11.00), 4).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 1, dec!(11.00))])
        .await
        .expect("launch should succeed");

    let default_table = app
        .services
        .tables
        .default_table(&app.ctx)
        .await
        .expect("default table");
    assert_eq!(record.order.table_id, default_table.id);
    assert!(default_table.is_default);
}

#[tokio::test]
async fn launch_with_unknown_table_is_not_found() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Risotto", dec!(13.00), 4).await;

    let err = app
        .services
        .orders
        .launch(
            &app.ctx,
            Some(Uuid::new_v4()),
            None,
            vec![item(dish.id, 1, dec!(13.00))],
        )
        .await
        .unwrap_err();

    assert_matches!(err, ServiceError::NotFound(_));
    assert_eq!(app.product(dish.id).await.stock, 4);
}

#[tokio::test]
async fn exhausting_stock_blocks_the_next_order() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Specials").await;
    let special = app.seed_product(cat.id, "Catch of the day", dec!(21.00), 5).await;

    app.services
        .orders
        .launch(&app.ctx, None, None, vec![item(special.id, 5, dec!(21.00))])
        .await
        .expect("first launch should succeed");
    assert_eq!(app.product(special.id).await.stock, 0);

    let err = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(special.id, 1, dec!(21.00))])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(id) if id == special.id);
    assert_eq!(app.product(special.id).await.stock, 0);
}

// ==================== Complete ====================

#[tokio::test]
async fn complete_with_increased_quantity_consumes_the_difference() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Burger", dec!(10.00), 5).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 2, dec!(10.00))])
        .await
        .expect("launch");
    assert_eq!(app.product(dish.id).await.stock, 3);

    // Revising 2 -> 5 needs three more units; exactly the three remaining.
    let completed = app
        .services
        .orders
        .complete(record.order.id, vec![revised(dish.id, 5)])
        .await
        .expect("completion should succeed");

    assert_eq!(completed.order.status, OrderStatus::Completed);
    assert_eq!(completed.order.total, dec!(50.00));
    assert_eq!(app.product(dish.id).await.stock, 0);
}

#[tokio::test]
async fn complete_with_empty_revision_restores_all_stock() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Salad", dec!(10.00), 5).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 2, dec!(10.00))])
        .await
        .expect("launch");
    assert_eq!(app.product(dish.id).await.stock, 3);

    let completed = app
        .services
        .orders
        .complete(record.order.id, Vec::new())
        .await
        .expect("completion should succeed");

    assert_eq!(completed.order.status, OrderStatus::Completed);
    assert_eq!(completed.order.total, dec!(0.00));
    assert!(completed.items.is_empty());
    assert_eq!(app.product(dish.id).await.stock, 5);
}

#[tokio::test]
async fn complete_reducing_a_line_returns_stock() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Drinks").await;
    let wine = app.seed_product(cat.id, "House red", dec!(6.00), 10).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(wine.id, 4, dec!(6.00))])
        .await
        .expect("launch");
    assert_eq!(app.product(wine.id).await.stock, 6);

    let completed = app
        .services
        .orders
        .complete(record.order.id, vec![revised(wine.id, 1)])
        .await
        .expect("completion should succeed");

    assert_eq!(completed.order.total, dec!(6.00));
    assert_eq!(app.product(wine.id).await.stock, 9);
}

#[tokio::test]
async fn complete_keeps_the_frozen_price_for_existing_lines() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Soup", dec!(5.00), 10).await;

    // Ordered at 5.00, then the menu price goes up.
    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 2, dec!(5.00))])
        .await
        .expect("launch");

    app.services
        .products
        .update(
            dish.id,
            ardoise_api::services::products::UpdateProduct {
                price: Some(dec!(9.00)),
                ..Default::default()
            },
        )
        .await
        .expect("price update");

    let completed = app
        .services
        .orders
        .complete(record.order.id, vec![revised(dish.id, 3)])
        .await
        .expect("completion should succeed");

    // Still the captured price, not the new menu price.
    assert_eq!(completed.items[0].price, dec!(5.00));
    assert_eq!(completed.order.total, dec!(15.00));
}

#[tokio::test]
async fn complete_resolves_live_price_for_new_lines() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Pasta", dec!(12.00), 10).await;
    let side = app.seed_product(cat.id, "Garlic bread", dec!(4.50), 8).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 1, dec!(12.00))])
        .await
        .expect("launch");

    let completed = app
        .services
        .orders
        .complete(
            record.order.id,
            vec![revised(dish.id, 1), revised(side.id, 2)],
        )
        .await
        .expect("completion should succeed");

    let side_line = completed
        .items
        .iter()
        .find(|i| i.product_id == side.id)
        .expect("new line present");
    assert_eq!(side_line.price, dec!(4.50));
    assert_eq!(completed.order.total, dec!(21.00));
    assert_eq!(app.product(side.id).await.stock, 6);
}

#[tokio::test]
async fn complete_rejects_a_revision_exceeding_stock() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Quiche", dec!(8.00), 5).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 2, dec!(8.00))])
        .await
        .expect("launch");
    assert_eq!(app.product(dish.id).await.stock, 3);

    // 2 -> 6 needs four more units; only three remain.
    let err = app
        .services
        .orders
        .complete(record.order.id, vec![revised(dish.id, 6)])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(id) if id == dish.id);

    // Nothing moved: stock, status, items and total are untouched.
    assert_eq!(app.product(dish.id).await.stock, 3);
    let details = app
        .services
        .statistics
        .order_details(record.order.id)
        .await
        .expect("details");
    assert_eq!(details.status, OrderStatus::Pending);
    assert_eq!(details.total, dec!(16.00));
    assert_eq!(details.items.len(), 1);
    assert_eq!(details.items[0].quantity, 2);
}

#[tokio::test]
async fn complete_is_rejected_on_terminal_orders() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Omelette", dec!(7.00), 5).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 1, dec!(7.00))])
        .await
        .expect("launch");

    app.services
        .orders
        .complete(record.order.id, vec![revised(dish.id, 1)])
        .await
        .expect("first completion");

    let err = app
        .services
        .orders
        .complete(record.order.id, vec![revised(dish.id, 2)])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

#[tokio::test]
async fn complete_unknown_order_is_not_found() {
    let app = TestApp::new().await;

    let err = app
        .services
        .orders
        .complete(Uuid::new_v4(), Vec::new())
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::NotFound(_));
}

// ==================== Cancel ====================

#[tokio::test]
async fn cancel_restores_consumed_stock_and_keeps_history() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Curry", dec!(14.00), 6).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 3, dec!(14.00))])
        .await
        .expect("launch");
    assert_eq!(app.product(dish.id).await.stock, 3);

    let canceled = app
        .services
        .orders
        .cancel(record.order.id)
        .await
        .expect("cancellation should succeed");

    assert_eq!(canceled.order.status, OrderStatus::Canceled);
    // History survives: the lines and the total stay on the record.
    assert_eq!(canceled.items.len(), 1);
    assert_eq!(canceled.order.total, dec!(42.00));
    assert_eq!(app.product(dish.id).await.stock, 6);

    let err = app.services.orders.cancel(record.order.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

// ==================== Preparation ====================

#[tokio::test]
async fn start_preparation_moves_pending_to_in_progress() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Mains").await;
    let dish = app.seed_product(cat.id, "Stew", dec!(9.00), 5).await;

    let record = app
        .services
        .orders
        .launch(&app.ctx, None, None, vec![item(dish.id, 1, dec!(9.00))])
        .await
        .expect("launch");

    let updated = app
        .services
        .orders
        .start_preparation(record.order.id)
        .await
        .expect("start preparation");
    assert_eq!(updated.status, OrderStatus::InProgress);

    // In-progress orders can still be completed.
    let completed = app
        .services
        .orders
        .complete(record.order.id, vec![revised(dish.id, 1)])
        .await
        .expect("completion from in-progress");
    assert_eq!(completed.order.status, OrderStatus::Completed);

    // But a second start is invalid.
    let err = app
        .services
        .orders
        .start_preparation(record.order.id)
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InvalidStatus(_));
}

// ==================== Concurrency ====================

#[tokio::test]
async fn concurrent_launches_never_overdraw_stock() {
    let app = TestApp::new().await;
    let cat = app.seed_category("Specials").await;
    let special = app.seed_product(cat.id, "Souffle", dec!(9.00), 10).await;

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let orders = app.services.orders.clone();
        let ctx = app.ctx.clone();
        let product_id = special.id;
        tasks.push(tokio::spawn(async move {
            orders
                .launch(
                    &ctx,
                    None,
                    None,
                    vec![NewOrderItem {
                        product_id,
                        quantity: 1,
                        unit_price: dec!(9.00),
                    }],
                )
                .await
                .is_ok()
        }));
    }

    let mut successes = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            successes += 1;
        }
    }

    assert_eq!(
        successes, 10,
        "exactly 10 single-unit orders should fit into stock of 10"
    );
    assert_eq!(app.product(special.id).await.stock, 0);
}
