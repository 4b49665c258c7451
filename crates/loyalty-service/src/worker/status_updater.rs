//! 订单状态对账任务
//!
//! 单个常驻任务，循环执行一次「扫描」：
//!
//! 1. 从存储分页取状态为 NEW / PROCESSING 的订单（每页 10 条，
//!    游标只在查询落空时重置回 0，成功页不前移 —— 对账本身会
//!    改变待处理集合，从头重扫即可完成循环遍历）；
//! 2. 逐单查询 accrual 服务；429 时先把手头批次落库再等待，
//!    等待可被退出信号打断；
//! 3. 结果按订单号去重后整批写回，同一页里被多次观察到的订单
//!    只写一次。
//!
//! 批次写回无论成败都清空：失败的订单仍处于待处理状态，下一轮
//! 扫描会重新覆盖。进程退出时不保证最后一批落库，丢弃的批次同
//! 样会在下次启动后被重新扫到。

use std::collections::HashMap;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing::{debug, error, info};

use crate::accrual::{AccrualClient, AccrualUpdate};
use crate::error::AppError;
use crate::models::{OrderUpdate, PendingOrder};
use crate::repository::Storage;

/// 每页扫描条数，同时也是批次的目标大小
const FLUSH_BUF_LEN: usize = 10;

/// 存储读超时
const READ_TIMEOUT: Duration = Duration::from_secs(3);

/// 存储写超时
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// 订单状态对账任务
pub struct StatusUpdater {
    storage: Storage,
    accrual: AccrualClient,
    /// 本轮扫描累积的写回批次，按订单号去重。任务私有，从不外借。
    batch: HashMap<String, OrderUpdate>,
    limit: i64,
    offset: i64,
}

impl StatusUpdater {
    pub fn new(storage: Storage, accrual: AccrualClient) -> Self {
        Self {
            storage,
            accrual,
            batch: HashMap::with_capacity(FLUSH_BUF_LEN),
            limit: FLUSH_BUF_LEN as i64,
            offset: 0,
        }
    }

    /// 主循环，直到收到退出信号
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(limit = self.limit, "订单对账任务已启动");

        loop {
            let page = tokio::select! {
                _ = shutdown.recv() => break,
                page = self.fetch_page() => page,
            };

            if self.process_page(page, &mut shutdown).await.is_break() {
                break;
            }

            self.flush().await;
        }

        info!("订单对账任务已退出");
    }

    /// 拉取一页待对账订单
    ///
    /// 查询落空时把游标重置回开头；出错只记日志，下一轮重试。
    async fn fetch_page(&mut self) -> Vec<PendingOrder> {
        let result = timeout(
            READ_TIMEOUT,
            self.storage.get_orders_for_update(self.limit, self.offset),
        )
        .await;

        match result {
            Ok(Ok(orders)) => orders,
            Ok(Err(AppError::OrdersForUpdateNotFound)) => {
                self.offset = 0;
                Vec::new()
            }
            Ok(Err(e)) => {
                error!(error = %e, "拉取待对账订单失败");
                Vec::new()
            }
            Err(_) => {
                error!("拉取待对账订单超时");
                Vec::new()
            }
        }
    }

    /// 逐单查询 accrual 并累积进批次
    ///
    /// 返回 `Break` 表示等待限流窗口时收到了退出信号。
    async fn process_page(
        &mut self,
        page: Vec<PendingOrder>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> ControlFlow<()> {
        for order in page {
            let update = match self.accrual.order_status(&order.number).await {
                Ok(update) => update,
                Err(e) => {
                    error!(number = %order.number, error = %e, "查询 accrual 失败，本轮跳过");
                    continue;
                }
            };

            match update {
                AccrualUpdate::NotRegistered => {
                    debug!(number = %order.number, "订单尚未在 accrual 注册，留待下一轮");
                }
                AccrualUpdate::Paused { retry_after } => {
                    // 先落库再等待，限流前的观察结果不跟着一起延迟
                    self.flush().await;

                    info!(
                        seconds = retry_after.as_secs(),
                        "accrual 限流，暂停请求"
                    );
                    tokio::select! {
                        _ = shutdown.recv() => return ControlFlow::Break(()),
                        _ = tokio::time::sleep(retry_after) => {}
                    }
                    // 被限流的这一单没拿到结果，下一轮扫描会重试
                }
                AccrualUpdate::Ok {
                    number,
                    status,
                    accrual,
                } => {
                    self.batch.insert(
                        number.clone(),
                        OrderUpdate {
                            user_id: order.user_id,
                            number,
                            status: status.into_order_status(),
                            accrual,
                        },
                    );
                }
            }
        }

        ControlFlow::Continue(())
    }

    /// 把批次整批写回存储
    ///
    /// 无论成败都清空批次；空批次是 no-op。
    async fn flush(&mut self) {
        if self.batch.is_empty() {
            return;
        }

        let updates: Vec<OrderUpdate> = self.batch.drain().map(|(_, update)| update).collect();

        match timeout(WRITE_TIMEOUT, self.storage.update_orders(&updates)).await {
            Ok(Ok(())) => debug!(count = updates.len(), "订单批次已落库"),
            Ok(Err(e)) => error!(error = %e, "批量写回订单失败"),
            Err(_) => error!("批量写回订单超时"),
        }
    }
}
