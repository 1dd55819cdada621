//! Order views

use shared::models::{Order, OrderPage, OrderStatus, OrderTracking, Pagination};

use super::{OrderError, OrderResult, OrderService};
use crate::db::OrderFilter;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Normalized paging parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl PageRequest {
    /// `page` defaults to 1, `limit` to 20 and is capped at 100
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    fn slice(&self, orders: Vec<Order>) -> OrderPage {
        let total = orders.len() as u64;
        let skip = (self.page as usize - 1) * self.limit as usize;
        let items = orders
            .into_iter()
            .skip(skip)
            .take(self.limit as usize)
            .collect();
        OrderPage {
            items,
            pagination: Pagination::new(self.page, self.limit, total),
        }
    }
}

impl OrderService {
    /// Visible to the order's buyer and seller only; anyone else sees "not found"
    pub async fn get_order(&self, order_id: &str, user_id: &str) -> OrderResult<Order> {
        let order = self.load_order(order_id).await?;
        if !order.is_party(user_id) {
            return Err(OrderError::OrderNotFound(order_id.to_string()));
        }
        Ok(order)
    }

    pub async fn track_order(&self, order_id: &str, user_id: &str) -> OrderResult<OrderTracking> {
        let order = self.get_order(order_id, user_id).await?;
        Ok(OrderTracking::from(&order))
    }

    pub async fn list_buyer_orders(
        &self,
        buyer_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> OrderResult<OrderPage> {
        let filter = OrderFilter {
            buyer_id: Some(buyer_id.to_string()),
            status,
            ..Default::default()
        };
        let orders = self.stores.orders.list_orders(&filter).await?;
        Ok(page.slice(orders))
    }

    pub async fn list_seller_orders(
        &self,
        seller_id: &str,
        status: Option<OrderStatus>,
        page: PageRequest,
    ) -> OrderResult<OrderPage> {
        let filter = OrderFilter {
            seller_id: Some(seller_id.to_string()),
            status,
            ..Default::default()
        };
        let orders = self.stores.orders.list_orders(&filter).await?;
        Ok(page.slice(orders))
    }
}
