//! 单飞（single-flight）调度器
//!
//! # 设计思路
//!
//! 任一时刻最多只有一个调用处于 Running。
//! 运行标志与 RAII 守卫绑定：工作线程无论正常返回、出错还是 panic，
//! 守卫在线程退出时 `Drop`，标志随之清除。
//!
//! # 实现思路
//!
//! - `AtomicBool::compare_exchange` 完成 Idle → Running 的原子切换。
//! - 每次调用一个专用 `std::thread`，不使用线程池；发起方只收事件，从不 join。
//! - 事件通过 `tokio::sync::mpsc::UnboundedSender` 投递，发送端不会阻塞。

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tokio::sync::mpsc::UnboundedSender;

use super::invoke::run_filter;
use super::{FilterError, FilterEvent, InvocationSnapshot};
use crate::clipboard::ClipboardProvider;
use crate::transport::Transport;

/// `trigger` 的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Started,
    AlreadyRunning,
}

/// 正在执行的调用（进度界面的数据来源）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub title: String,
    pub elapsed: Duration,
}

#[derive(Debug)]
struct ActiveInvocation {
    title: String,
    started_at: Instant,
}

#[derive(Debug, Default)]
struct RunState {
    running: AtomicBool,
    active: Mutex<Option<ActiveInvocation>>,
}

impl RunState {
    fn set_active(&self, active: Option<ActiveInvocation>) {
        match self.active.lock() {
            Ok(mut slot) => *slot = active,
            Err(poisoned) => *poisoned.into_inner() = active,
        }
    }

    fn progress(&self) -> Option<Progress> {
        let slot = match self.active.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.as_ref().map(|active| Progress {
            title: active.title.clone(),
            elapsed: active.started_at.elapsed(),
        })
    }
}

/// 运行标志的 RAII 守卫：`Drop` 时回到 Idle。
struct RunningGuard {
    state: Arc<RunState>,
}

impl RunningGuard {
    fn acquire(state: &Arc<RunState>, title: &str) -> Option<Self> {
        state
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        state.set_active(Some(ActiveInvocation {
            title: title.to_string(),
            started_at: Instant::now(),
        }));
        Some(Self {
            state: Arc::clone(state),
        })
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.state.set_active(None);
        self.state.running.store(false, Ordering::SeqCst);
        log::debug!("🔓 过滤器运行标志已清除");
    }
}

/// 过滤器调度器。
pub struct FilterRunner<C, T> {
    clipboard: Arc<C>,
    transport: Arc<T>,
    events: UnboundedSender<FilterEvent>,
    state: Arc<RunState>,
}

impl<C, T> FilterRunner<C, T>
where
    C: ClipboardProvider,
    T: Transport + 'static,
{
    pub fn new(clipboard: Arc<C>, transport: Arc<T>, events: UnboundedSender<FilterEvent>) -> Self {
        Self {
            clipboard,
            transport,
            events,
            state: Arc::new(RunState::default()),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// 当前调用的标题与已耗时；空闲时为 `None`。
    pub fn progress(&self) -> Option<Progress> {
        if !self.is_running() {
            return None;
        }
        self.state.progress()
    }

    /// 发起一次调用。
    ///
    /// 已有调用在执行时不做任何新工作，只投递 `AlreadyRunning`。
    pub fn trigger(&self, snapshot: InvocationSnapshot) -> Result<TriggerOutcome, FilterError> {
        let title = snapshot.filter.title.clone();

        let Some(guard) = RunningGuard::acquire(&self.state, &title) else {
            let running = self.progress();
            log::warn!("⏳ 已有过滤器在执行，忽略新的触发: {}", title);
            let (title, elapsed) = match running {
                Some(p) => (p.title, p.elapsed),
                None => (title, Duration::ZERO),
            };
            self.emit(FilterEvent::AlreadyRunning { title, elapsed });
            return Ok(TriggerOutcome::AlreadyRunning);
        };

        let clipboard = Arc::clone(&self.clipboard);
        let transport = Arc::clone(&self.transport);
        let events = self.events.clone();
        let worker_title = title.clone();

        self.emit(FilterEvent::Started {
            title: title.clone(),
        });

        thread::Builder::new()
            .name("cbfilter-worker".to_string())
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| {
                    run_filter(&snapshot, clipboard.as_ref(), transport.as_ref())
                }))
                .unwrap_or(Err(FilterError::WorkerPanicked));

                let event = match result {
                    Ok(output) => FilterEvent::Completed {
                        title: worker_title,
                        output,
                    },
                    Err(err) => {
                        log::error!("❌ 过滤器失败: {} ({})", worker_title, err);
                        FilterEvent::Failed {
                            title: worker_title,
                            reason: err.to_string(),
                        }
                    }
                };
                // 先释放运行标志，再通知发起方
                drop(guard);
                if events.send(event).is_err() {
                    log::warn!("⚠️ 事件接收端已关闭，丢弃过滤器结果");
                }
            })
            .map_err(|e| {
                let err = FilterError::Spawn(e.to_string());
                self.emit(FilterEvent::Failed {
                    title,
                    reason: err.to_string(),
                });
                err
            })?;

        Ok(TriggerOutcome::Started)
    }

    fn emit(&self, event: FilterEvent) {
        if self.events.send(event).is_err() {
            log::warn!("⚠️ 事件接收端已关闭");
        }
    }
}
